use std::collections::BTreeSet;

use thiserror::Error;

use crate::{dimension::DimensionError, layer::LayerKey, source::SourceError, stack::StackError};

/// A series error.
#[derive(Debug, Error)]
pub enum SeriesError {
    /// No file of a series scan had a parseable coordinate.
    #[error("no series coordinates could be parsed ({skipped} files skipped)")]
    EmptySeries {
        /// The number of skipped files.
        skipped: usize,
    },
    /// An element index is beyond the end of the series.
    #[error("series element {index} is out of bounds for a series of length {len}")]
    IndexOutOfBounds {
        /// The element index.
        index: usize,
        /// The series length.
        len: usize,
    },
    /// The layers of a series element differ from the layers of the first element.
    #[error("series element {index} has layers {got:?}, expected {expected:?}")]
    LayerMismatch {
        /// The element index.
        index: usize,
        /// The layer keys of the first element.
        expected: BTreeSet<LayerKey>,
        /// The layer keys of the element.
        got: BTreeSet<LayerKey>,
    },
    /// The number of stacks does not match the length of the series dimension.
    #[error("series dimension has {expected} coordinates but {got} stacks were supplied")]
    LengthMismatch {
        /// The length of the series dimension.
        expected: usize,
        /// The number of stacks.
        got: usize,
    },
    /// A stack error.
    #[error(transparent)]
    StackError(#[from] StackError),
    /// A source error.
    #[error(transparent)]
    SourceError(#[from] SourceError),
    /// A dimension error.
    #[error(transparent)]
    DimensionError(#[from] DimensionError),
    /// A directory listing error.
    #[error(transparent)]
    WalkDirError(#[from] walkdir::Error),
}
