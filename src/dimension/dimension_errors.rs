use thiserror::Error;

use super::{DimensionName, Step};

/// A dimension error.
#[derive(Debug, Error)]
pub enum DimensionError {
    /// The operation is not supported by the dimension.
    #[error("unsupported operation: {0}")]
    UnsupportedOperation(String),
    /// The step cannot be applied to the coordinates of a dimension.
    #[error("step {step} is incompatible with the coordinates of dimension {dimension}")]
    IncompatibleStep {
        /// The dimension name.
        dimension: DimensionName,
        /// The step.
        step: Step,
    },
    /// The interval bounds are of a different kind to the coordinates of a dimension.
    #[error("interval bounds are incompatible with the coordinates of dimension {0}")]
    IncompatibleBounds(DimensionName),
    /// Coordinates of different kinds cannot be combined.
    #[error("coordinates of dimension {0} cannot be combined")]
    IncompatibleCoordinates(DimensionName),
    /// Dimensions with the same name differ.
    #[error("dimension {0} differs between sources")]
    DimensionMismatch(DimensionName),
    /// The coordinate count does not match the length of an array axis.
    #[error("dimension {dimension} has {expected} coordinates but the array axis has length {got}")]
    LengthMismatch {
        /// The dimension name.
        dimension: DimensionName,
        /// The number of coordinates.
        expected: usize,
        /// The axis length.
        got: usize,
    },
    /// The number of dimensions does not match the dimensionality of an array.
    #[error("{got} dimensions were supplied for an array with {expected} axes")]
    DimensionalityMismatch {
        /// The array dimensionality.
        expected: usize,
        /// The number of dimensions.
        got: usize,
    },
    /// A dimension name occurs more than once.
    #[error("dimension {0} occurs more than once")]
    DuplicateDimension(DimensionName),
    /// Dimensions with different names cannot be concatenated.
    #[error("cannot concatenate dimension {0} with dimension {1}")]
    NameMismatch(DimensionName, DimensionName),
    /// Shifting or extending coordinates overflows the coordinate type.
    #[error("coordinates of dimension {0} overflow")]
    CoordinateOverflow(DimensionName),
    /// There were no dimensions to concatenate.
    #[error("no dimensions to concatenate")]
    EmptyConcat,
}
