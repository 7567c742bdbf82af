use std::path::PathBuf;

use thiserror::Error;

use crate::{
    dimension::{DimensionError, DimensionName},
    layer::LayerKey,
    source::SourceError,
    window::WindowError,
};

/// A stack error.
#[derive(Debug, Error)]
pub enum StackError {
    /// The layer does not exist in the stack.
    #[error("layer {0} not found")]
    KeyNotFound(LayerKey),
    /// A concatenated layer is missing from one of the input stacks.
    #[error("layer {key} is missing from input stack {stack}")]
    MissingLayer {
        /// The layer key.
        key: LayerKey,
        /// The position of the stack in the inputs.
        stack: usize,
    },
    /// Two layers have the same key after normalisation.
    #[error("duplicate layer key {0}")]
    DuplicateKey(LayerKey),
    /// A layer key is empty after normalisation.
    #[error("layer {0} has an empty key")]
    EmptyLayerKey(usize),
    /// A layer without a name was supplied where keys are taken from layer names.
    #[error("layer {0} has no name")]
    UnnamedLayer(usize),
    /// A file holds several layers and none matches the requested key.
    #[error("{path:?} holds several layers and none is named {key}")]
    AmbiguousLayer {
        /// The source path.
        path: PathBuf,
        /// The requested layer key.
        key: LayerKey,
    },
    /// A layer uses a dimension that is not a stack dimension.
    #[error("layer {layer} uses dimension {dimension} which is not a stack dimension")]
    UnknownLayerDimension {
        /// The layer key.
        layer: LayerKey,
        /// The dimension name.
        dimension: DimensionName,
    },
    /// The operation is not supported by the stack.
    #[error("unsupported operation: {0}")]
    UnsupportedOperation(String),
    /// A dimension error.
    #[error(transparent)]
    DimensionError(#[from] DimensionError),
    /// A window error.
    #[error(transparent)]
    WindowError(#[from] WindowError),
    /// A source error.
    #[error(transparent)]
    SourceError(#[from] SourceError),
    /// An array shape error.
    #[error(transparent)]
    ShapeError(#[from] ndarray::ShapeError),
}
