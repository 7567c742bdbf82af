use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
};

use parking_lot::RwLock;

use crate::{
    dimension::{combine_dimensions, Dimension},
    layer::{DimArray, LayerKey},
    metadata::Metadata,
    window::ReadRegion,
};

use super::{DataType, LayerInfo, PathCoordinateParser, SourceError, SourceFormat, SourceHandle};

/// A multi-layer dataset held in memory by a [`MemoryFormat`].
#[derive(Clone, Debug, Default)]
pub struct MemoryDataset {
    dimensions: Vec<Dimension>,
    attributes: Metadata,
    layers: Vec<(LayerKey, DimArray)>,
}

impl MemoryDataset {
    /// Create an empty dataset.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the dataset attributes.
    #[must_use]
    pub fn with_attributes(mut self, attributes: Metadata) -> Self {
        self.attributes = attributes;
        self
    }

    /// Add a layer, replacing any layer with the same key.
    ///
    /// # Errors
    /// Returns [`SourceError::DimensionError`] if a dimension of `layer` differs from a dataset dimension with the same name.
    pub fn with_layer(
        mut self,
        key: impl Into<LayerKey>,
        layer: DimArray,
    ) -> Result<Self, SourceError> {
        let key = key.into();
        self.dimensions = combine_dimensions([self.dimensions.as_slice(), layer.dims()])?;
        self.layers.retain(|(existing, _)| existing != &key);
        self.layers.push((key, layer));
        Ok(self)
    }

    /// The dataset dimensions.
    #[must_use]
    pub fn dimensions(&self) -> &[Dimension] {
        &self.dimensions
    }
}

#[derive(Debug, Default)]
struct MemoryMetrics {
    opens: AtomicUsize,
    reads: AtomicUsize,
    elements_read: AtomicUsize,
}

/// An in-memory source format.
///
/// Datasets are inserted under virtual paths and opened like files.
/// The format counts opens and reads, so callers can check which data an operation touched.
#[derive(Debug)]
pub struct MemoryFormat {
    extensions: Vec<&'static str>,
    datasets: RwLock<BTreeMap<PathBuf, Arc<MemoryDataset>>>,
    path_parser: Option<PathCoordinateParser>,
    metrics: Arc<MemoryMetrics>,
}

impl Default for MemoryFormat {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryFormat {
    /// Create a new in-memory format, with the extension `mem`.
    #[must_use]
    pub fn new() -> Self {
        Self {
            extensions: vec!["mem"],
            datasets: RwLock::default(),
            path_parser: None,
            metrics: Arc::default(),
        }
    }

    /// Set the file extensions.
    #[must_use]
    pub fn with_extensions(mut self, extensions: &[&'static str]) -> Self {
        self.extensions = extensions.to_vec();
        self
    }

    /// Set the parser for series coordinates in file names.
    #[must_use]
    pub fn with_path_parser(mut self, path_parser: PathCoordinateParser) -> Self {
        self.path_parser = Some(path_parser);
        self
    }

    /// Insert `dataset` at `path`, replacing any existing dataset.
    pub fn insert(&self, path: impl Into<PathBuf>, dataset: MemoryDataset) {
        self.datasets.write().insert(path.into(), Arc::new(dataset));
    }

    /// The number of times a dataset has been opened.
    #[must_use]
    pub fn opens(&self) -> usize {
        self.metrics.opens.load(Ordering::Relaxed)
    }

    /// The number of reads.
    #[must_use]
    pub fn reads(&self) -> usize {
        self.metrics.reads.load(Ordering::Relaxed)
    }

    /// The total number of elements read.
    #[must_use]
    pub fn elements_read(&self) -> usize {
        self.metrics.elements_read.load(Ordering::Relaxed)
    }
}

impl SourceFormat for MemoryFormat {
    fn name(&self) -> &str {
        "memory"
    }

    fn extensions(&self) -> &[&'static str] {
        &self.extensions
    }

    fn open(&self, path: &Path) -> Result<Box<dyn SourceHandle>, SourceError> {
        let dataset = self.datasets.read().get(path).cloned().ok_or_else(|| {
            std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("no in-memory dataset at {}", path.display()),
            )
        })?;
        self.metrics.opens.fetch_add(1, Ordering::Relaxed);
        Ok(Box::new(MemoryHandle {
            path: path.to_path_buf(),
            dataset,
            metrics: self.metrics.clone(),
        }))
    }

    fn path_parser(&self) -> Option<&PathCoordinateParser> {
        self.path_parser.as_ref()
    }
}

struct MemoryHandle {
    path: PathBuf,
    dataset: Arc<MemoryDataset>,
    metrics: Arc<MemoryMetrics>,
}

impl MemoryHandle {
    fn layer(&self, key: &LayerKey) -> Result<&DimArray, SourceError> {
        self.dataset
            .layers
            .iter()
            .find_map(|(existing, layer)| (existing == key).then_some(layer))
            .ok_or_else(|| SourceError::UnknownLayer {
                path: self.path.clone(),
                layer: key.clone(),
            })
    }
}

impl SourceHandle for MemoryHandle {
    fn path(&self) -> &Path {
        &self.path
    }

    fn layer_keys(&self) -> Result<Vec<LayerKey>, SourceError> {
        Ok(self.dataset.layers.iter().map(|(key, _)| key.clone()).collect())
    }

    fn dimensions(&self) -> Result<Vec<Dimension>, SourceError> {
        Ok(self.dataset.dimensions.clone())
    }

    fn attributes(&self) -> Result<Metadata, SourceError> {
        Ok(self.dataset.attributes.clone())
    }

    fn layer_info(&self, layer: &LayerKey) -> Result<LayerInfo, SourceError> {
        let layer = self.layer(layer)?;
        Ok(LayerInfo {
            dimensions: layer.dims().iter().map(|d| d.name().clone()).collect(),
            shape: layer.shape().to_vec(),
            data_type: DataType::Float64,
            missing_value: layer.missing_value(),
            metadata: layer.metadata().clone(),
        })
    }

    fn read(&mut self, layer: &LayerKey, region: &ReadRegion) -> Result<Vec<f64>, SourceError> {
        let elements: Vec<f64> = region
            .extract(&self.layer(layer)?.data().view())?
            .into_iter()
            .collect();
        self.metrics.reads.fetch_add(1, Ordering::Relaxed);
        self.metrics
            .elements_read
            .fetch_add(elements.len(), Ordering::Relaxed);
        Ok(elements)
    }
}
