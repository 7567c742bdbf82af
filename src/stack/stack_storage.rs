use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    sync::Arc,
};

use derive_more::Display;
use ndarray::{ArrayD, ArrayViewMutD, IxDyn};
use parking_lot::Mutex;

use crate::{
    layer::LayerKey,
    source::{open_and_read, SourceError, SourceFormat, SourceHandle},
    window::ReadRegion,
};

use super::StackError;

/// When the source file of a file-backed stack is opened.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Display)]
pub enum HandlePolicy {
    /// Open the source for each read and close it afterwards.
    #[default]
    OpenPerRead,
    /// Keep one open handle, owned by the stack and closed when the stack is dropped.
    ///
    /// Reads through the handle are serialised by a mutex.
    /// The handle is closed after a failed read and reopened by the next read.
    KeepOpen,
}

/// Storage that can read a region of a layer.
pub(crate) trait StackStorageTraits {
    /// Read `region` of the layer `key` into a row-major array with the shape of the region.
    fn read_region(&self, key: &LayerKey, region: &ReadRegion) -> Result<ArrayD<f64>, StackError>;
}

fn into_array(region: &ReadRegion, elements: Vec<f64>) -> Result<ArrayD<f64>, StackError> {
    Ok(ArrayD::from_shape_vec(IxDyn(&region.shape()), elements)?)
}

/// Layers held in memory.
#[derive(Debug, Clone, Default)]
pub(crate) struct MemoryStorage {
    arrays: HashMap<LayerKey, ArrayD<f64>>,
}

impl MemoryStorage {
    pub(crate) fn new(arrays: HashMap<LayerKey, ArrayD<f64>>) -> Self {
        Self { arrays }
    }

    pub(crate) fn array_mut(&mut self, key: &LayerKey) -> Option<ArrayViewMutD<'_, f64>> {
        self.arrays.get_mut(key).map(|array| array.view_mut())
    }
}

impl StackStorageTraits for MemoryStorage {
    fn read_region(&self, key: &LayerKey, region: &ReadRegion) -> Result<ArrayD<f64>, StackError> {
        let array = self
            .arrays
            .get(key)
            .ok_or_else(|| StackError::KeyNotFound(key.clone()))?;
        Ok(region.extract(&array.view())?)
    }
}

/// A layer stored in its own file.
#[derive(Debug, Clone)]
pub(crate) struct FileLayer {
    pub(crate) path: PathBuf,
    pub(crate) format: Arc<dyn SourceFormat>,
    pub(crate) source_key: LayerKey,
}

/// Layers stored one per file, opened for every read.
#[derive(Debug, Clone, Default)]
pub(crate) struct FilesStorage {
    files: HashMap<LayerKey, FileLayer>,
}

impl FilesStorage {
    pub(crate) fn new(files: HashMap<LayerKey, FileLayer>) -> Self {
        Self { files }
    }
}

impl StackStorageTraits for FilesStorage {
    fn read_region(&self, key: &LayerKey, region: &ReadRegion) -> Result<ArrayD<f64>, StackError> {
        let file = self
            .files
            .get(key)
            .ok_or_else(|| StackError::KeyNotFound(key.clone()))?;
        let elements = open_and_read(file.format.as_ref(), &file.path, |handle| {
            handle.read(&file.source_key, region)
        })?;
        into_array(region, elements)
    }
}

/// A single multi-layer source file.
pub(crate) struct FileSource {
    path: PathBuf,
    format: Arc<dyn SourceFormat>,
    policy: HandlePolicy,
    handle: Mutex<Option<Box<dyn SourceHandle>>>,
}

impl std::fmt::Debug for FileSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileSource")
            .field("path", &self.path)
            .field("format", &self.format.name())
            .field("policy", &self.policy)
            .field("open", &self.handle.try_lock().map(|handle| handle.is_some()))
            .finish()
    }
}

impl FileSource {
    /// Create a file source, keeping `handle` open if the policy is [`HandlePolicy::KeepOpen`].
    pub(crate) fn new(
        path: &Path,
        format: Arc<dyn SourceFormat>,
        policy: HandlePolicy,
        handle: Box<dyn SourceHandle>,
    ) -> Self {
        let handle = match policy {
            HandlePolicy::KeepOpen => Some(handle),
            HandlePolicy::OpenPerRead => {
                drop(handle);
                tracing::trace!(path = %path.display(), "closed source");
                None
            }
        };
        Self {
            path: path.to_path_buf(),
            format,
            policy,
            handle: Mutex::new(handle),
        }
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    pub(crate) fn policy(&self) -> HandlePolicy {
        self.policy
    }

    fn read_kept_open(&self, key: &LayerKey, region: &ReadRegion) -> Result<Vec<f64>, SourceError> {
        let mut guard = self.handle.lock();
        let mut handle = match guard.take() {
            Some(handle) => handle,
            None => {
                let handle = self.format.open(&self.path)?;
                tracing::trace!(
                    path = %self.path.display(),
                    format = self.format.name(),
                    "opened source"
                );
                handle
            }
        };
        match handle.read(key, region) {
            Ok(elements) => {
                *guard = Some(handle);
                Ok(elements)
            }
            Err(err) => {
                drop(handle);
                tracing::trace!(path = %self.path.display(), "closed source after failed read");
                Err(err)
            }
        }
    }
}

impl StackStorageTraits for FileSource {
    fn read_region(&self, key: &LayerKey, region: &ReadRegion) -> Result<ArrayD<f64>, StackError> {
        let elements = match self.policy {
            HandlePolicy::OpenPerRead => {
                open_and_read(self.format.as_ref(), &self.path, |handle| {
                    handle.read(key, region)
                })?
            }
            HandlePolicy::KeepOpen => self.read_kept_open(key, region)?,
        };
        into_array(region, elements)
    }
}

/// The storage of a stack.
#[derive(Debug, Clone)]
pub(crate) enum StackStorage {
    /// Layers held in memory.
    Memory(MemoryStorage),
    /// One file per layer.
    Files(FilesStorage),
    /// One multi-layer file.
    Source(Arc<FileSource>),
}

impl StackStorageTraits for StackStorage {
    fn read_region(&self, key: &LayerKey, region: &ReadRegion) -> Result<ArrayD<f64>, StackError> {
        match self {
            Self::Memory(storage) => storage.read_region(key, region),
            Self::Files(storage) => storage.read_region(key, region),
            Self::Source(storage) => storage.read_region(key, region),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        dimension::Dimension,
        layer::DimArray,
        source::{MemoryDataset, MemoryFormat},
        window::AxisIndex,
    };

    use super::*;

    fn format() -> Arc<MemoryFormat> {
        let layer = DimArray::new(
            ArrayD::from_shape_vec(vec![4], vec![1.0, 2.0, 3.0, 4.0]).unwrap(),
            vec![Dimension::new("x", vec![0i64, 1, 2, 3])],
        )
        .unwrap();
        let format = Arc::new(MemoryFormat::new());
        format.insert("a.mem", MemoryDataset::new().with_layer("a", layer).unwrap());
        format
    }

    #[test]
    fn file_source_keep_open() {
        let format = format();
        let handle = format.open(Path::new("a.mem")).unwrap();
        let source = FileSource::new(
            Path::new("a.mem"),
            format.clone(),
            HandlePolicy::KeepOpen,
            handle,
        );
        let region = ReadRegion::new(vec![AxisIndex::Slice(vec![1, 2])]);
        for _ in 0..3 {
            let array = source.read_region(&"a".into(), &region).unwrap();
            assert_eq!(array.as_slice().unwrap(), &[2.0, 3.0]);
        }
        assert_eq!(format.opens(), 1);

        // A failed read closes the handle, the next read reopens it
        assert!(source.read_region(&"b".into(), &region).is_err());
        assert!(source.read_region(&"a".into(), &region).is_ok());
        assert_eq!(format.opens(), 2);
    }

    #[test]
    fn file_source_open_per_read() {
        let format = format();
        let handle = format.open(Path::new("a.mem")).unwrap();
        let source = FileSource::new(
            Path::new("a.mem"),
            format.clone(),
            HandlePolicy::OpenPerRead,
            handle,
        );
        let region = ReadRegion::new(vec![AxisIndex::Scalar(3)]);
        let array = source.read_region(&"a".into(), &region).unwrap();
        assert_eq!(array.shape(), &[] as &[usize]);
        assert_eq!(array.first(), Some(&4.0));
        source.read_region(&"a".into(), &region).unwrap();
        assert_eq!(format.opens(), 3);
        assert_eq!(source.policy(), HandlePolicy::OpenPerRead);
    }
}
