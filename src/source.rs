//! Data sources.
//!
//! A source is a file holding one or more named layers, read through a [`SourceFormat`].
//! A format opens a path into a [`SourceHandle`], which exposes:
//! - the layer keys of the file,
//! - the shared [`Dimension`]s and file attributes,
//! - per-layer [`LayerInfo`] (dimension names, data type, missing value, attributes), and
//! - windowed reads of a layer through a [`ReadRegion`].
//!
//! A handle is closed when it is dropped.
//! [`open_and_read`] scopes a handle to a single operation.
//!
//! Formats are looked up by file extension in an explicit [`FormatRegistry`].
//! This crate includes:
//! - [`GridStackFormat`]: a single-file multi-layer format (extension `gsf`), and
//! - [`MemoryFormat`]: an in-memory format holding datasets under virtual paths.
//!
//! Formats may also parse a series coordinate from a file name with a [`PathCoordinateParser`].

mod data_type;
mod format_registry;
mod grid_stack_file;
mod memory_format;
mod path_coordinate;

pub use data_type::DataType;
pub use format_registry::FormatRegistry;
pub use grid_stack_file::{
    BoundMetadata, CoordinatesMetadata, DimensionMetadata, GridStackFormat, GridStackHandle,
    GridStackHeader, GridStackLayerMetadata, SamplingMetadata, SpanMetadata, StepMetadata,
    GRID_STACK_MAGIC,
};
pub use memory_format::{MemoryDataset, MemoryFormat};
pub use path_coordinate::{MalformedPathError, PathCoordinateParser};

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::{
    byte_range::InvalidByteRangeError,
    dimension::{CoordinateValue, Dimension, DimensionError, DimensionName},
    layer::LayerKey,
    metadata::Metadata,
    window::{ReadRegion, WindowError},
};

/// A file format.
pub trait SourceFormat: Send + Sync + std::fmt::Debug {
    /// The name of the format.
    fn name(&self) -> &str;

    /// The file extensions of the format, without a leading `.`.
    fn extensions(&self) -> &[&'static str];

    /// Open the source at `path`.
    ///
    /// # Errors
    /// Returns a [`SourceError`] if the source cannot be opened or its header is invalid.
    fn open(&self, path: &Path) -> Result<Box<dyn SourceHandle>, SourceError>;

    /// The parser for series coordinates in file names, if the format has one.
    fn path_parser(&self) -> Option<&PathCoordinateParser> {
        None
    }

    /// Parse a series coordinate from the file name of `path`.
    ///
    /// # Errors
    /// Returns a [`MalformedPathError`] if the file name does not contain a coordinate or the format has no path parser.
    fn parse_path_coordinate(&self, path: &Path) -> Result<CoordinateValue, MalformedPathError> {
        self.path_parser()
            .ok_or_else(|| {
                MalformedPathError::new(
                    path,
                    format!("format {} has no path coordinate parser", self.name()),
                )
            })?
            .parse(path)
    }

    /// Returns true if the extension of `path` is one of the format extensions, ignoring case.
    fn matches_extension(&self, path: &Path) -> bool {
        path.extension()
            .and_then(std::ffi::OsStr::to_str)
            .is_some_and(|extension| {
                self.extensions()
                    .iter()
                    .any(|candidate| candidate.eq_ignore_ascii_case(extension))
            })
    }
}

/// An open source.
pub trait SourceHandle: Send {
    /// The path of the source.
    fn path(&self) -> &Path;

    /// The layer keys, in file order.
    ///
    /// # Errors
    /// Returns a [`SourceError`] if there is an underlying read error.
    fn layer_keys(&self) -> Result<Vec<LayerKey>, SourceError>;

    /// The dimensions shared by the layers of the source.
    ///
    /// # Errors
    /// Returns a [`SourceError`] if there is an underlying read error.
    fn dimensions(&self) -> Result<Vec<Dimension>, SourceError>;

    /// The attributes of the source.
    ///
    /// # Errors
    /// Returns a [`SourceError`] if there is an underlying read error.
    fn attributes(&self) -> Result<Metadata, SourceError>;

    /// Information about the layer `layer`.
    ///
    /// # Errors
    /// Returns [`SourceError::UnknownLayer`] if the layer does not exist.
    fn layer_info(&self, layer: &LayerKey) -> Result<LayerInfo, SourceError>;

    /// Read `region` of the layer `layer`.
    ///
    /// `region` is in terms of the native axes of the layer.
    /// Elements are returned row-major over the region and decoded to [`f64`].
    /// Only the elements of `region` are read.
    ///
    /// # Errors
    /// Returns a [`SourceError`] if the layer does not exist, the region does not fit the layer, or there is an underlying read error.
    fn read(&mut self, layer: &LayerKey, region: &ReadRegion) -> Result<Vec<f64>, SourceError>;
}

/// Information about a layer of a source.
#[derive(Clone, Debug, PartialEq)]
pub struct LayerInfo {
    /// The names of the layer dimensions, one per axis.
    pub dimensions: Vec<DimensionName>,
    /// The shape of the layer.
    pub shape: Vec<usize>,
    /// The stored data type.
    pub data_type: DataType,
    /// The missing-value sentinel.
    pub missing_value: Option<f64>,
    /// The layer attributes.
    pub metadata: Metadata,
}

impl LayerInfo {
    /// The storage size of the layer in bytes.
    #[must_use]
    pub fn size_bytes(&self) -> u64 {
        (self.shape.iter().product::<usize>() * self.data_type.size()) as u64
    }
}

/// Open the source at `path` with `format`, pass the handle to `f`, and close the handle.
///
/// The handle is closed on every exit path of `f`.
///
/// # Errors
/// Returns an error if the source cannot be opened or `f` fails.
pub fn open_and_read<T, E: From<SourceError>>(
    format: &dyn SourceFormat,
    path: &Path,
    f: impl FnOnce(&mut dyn SourceHandle) -> Result<T, E>,
) -> Result<T, E> {
    let mut handle = format.open(path)?;
    tracing::trace!(path = %path.display(), format = format.name(), "opened source");
    let result = f(handle.as_mut());
    drop(handle);
    tracing::trace!(path = %path.display(), "closed source");
    result
}

/// A source error.
#[derive(Debug, Error)]
pub enum SourceError {
    /// An IO error.
    #[error(transparent)]
    IOError(#[from] std::io::Error),
    /// An invalid source header.
    #[error("invalid header in {path:?}: {reason}")]
    InvalidHeader {
        /// The source path.
        path: PathBuf,
        /// The reason the header is invalid.
        reason: String,
    },
    /// An error deserializing the metadata.
    #[error(transparent)]
    MetadataDeserializationError(#[from] serde_json::Error),
    /// The layer does not exist in the source.
    #[error("layer {layer} does not exist in {path:?}")]
    UnknownLayer {
        /// The source path.
        path: PathBuf,
        /// The layer key.
        layer: LayerKey,
    },
    /// No registered format handles the path.
    #[error("no registered format handles {0:?}")]
    UnsupportedFormat(PathBuf),
    /// A read returned the wrong number of elements.
    #[error("expected {expected} elements, got {got}")]
    UnexpectedLength {
        /// The number of elements requested.
        expected: usize,
        /// The number of elements read.
        got: usize,
    },
    /// A dimension error.
    #[error(transparent)]
    DimensionError(#[from] DimensionError),
    /// A window error.
    #[error(transparent)]
    WindowError(#[from] WindowError),
    /// An invalid byte range.
    #[error(transparent)]
    InvalidByteRangeError(#[from] InvalidByteRangeError),
}
