use thiserror::Error;

use crate::dimension::{DimensionError, DimensionName};

/// A window or selector error.
#[derive(Debug, Error)]
pub enum WindowError {
    /// An index is beyond the end of a dimension.
    #[error("index {index} is out of bounds for dimension {dimension} of length {length}")]
    IndexOutOfBounds {
        /// The dimension name.
        dimension: DimensionName,
        /// The index.
        index: usize,
        /// The dimension length.
        length: usize,
    },
    /// A range is reversed or extends beyond the end of a dimension.
    #[error("range {start}..{end} is invalid for dimension {dimension} of length {length}")]
    InvalidRange {
        /// The dimension name.
        dimension: DimensionName,
        /// The start of the range.
        start: usize,
        /// The exclusive end of the range.
        end: usize,
        /// The dimension length.
        length: usize,
    },
    /// No coordinate matched a selector.
    #[error("no coordinate of dimension {dimension} matches {value}")]
    CoordinateNotFound {
        /// The dimension name.
        dimension: DimensionName,
        /// The requested coordinate.
        value: String,
    },
    /// A selector value is of a different kind to the coordinates of a dimension.
    #[error("{value} cannot select from the coordinates of dimension {dimension}")]
    IncompatibleCoordinate {
        /// The dimension name.
        dimension: DimensionName,
        /// The requested coordinate.
        value: String,
    },
    /// More positional selectors were supplied than there are axes.
    #[error("{got} positional selectors were supplied for {max} axes")]
    TooManyIndices {
        /// The number of selectors.
        got: usize,
        /// The number of axes.
        max: usize,
    },
    /// A selector targets an axis already removed by a scalar selector.
    #[error("dimension {0} has already been indexed by a scalar selector")]
    AxisDropped(DimensionName),
    /// A selector names a dimension that does not exist.
    #[error("unknown dimension {0}")]
    UnknownDimension(DimensionName),
    /// A read region does not fit an array shape.
    #[error("read region with {dimensionality} axes is incompatible with array shape {shape:?}")]
    IncompatibleShape {
        /// The dimensionality of the read region.
        dimensionality: usize,
        /// The array shape.
        shape: Vec<usize>,
    },
    /// A dimension error.
    #[error(transparent)]
    DimensionError(#[from] DimensionError),
    /// An array shape error.
    #[error(transparent)]
    ShapeError(#[from] ndarray::ShapeError),
}
