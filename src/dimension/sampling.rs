use derive_more::Display;
use serde::{Deserialize, Serialize};

use super::{CoordinateValue, Step};

/// The position of a coordinate within its interval cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Display, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Locus {
    /// The coordinate is the lower edge of the cell.
    Start,
    /// The coordinate is the middle of the cell.
    #[default]
    Center,
    /// The coordinate is the upper edge of the cell.
    End,
}

impl Locus {
    /// The position of the locus within a cell, in half cells from the start.
    pub(crate) fn half_cells(self) -> i32 {
        match self {
            Self::Start => 0,
            Self::Center => 1,
            Self::End => 2,
        }
    }
}

/// The extent of interval cells.
#[derive(Clone, Debug, PartialEq)]
pub enum Span {
    /// Cells of a constant size, equal to the coordinate step.
    Regular(Step),
    /// Cells of varying size.
    ///
    /// Cell edges are derived from the coordinates and the outer bounds of the axis.
    Irregular {
        /// The outer edge of the first cell.
        lower: CoordinateValue,
        /// The outer edge of the last cell.
        upper: CoordinateValue,
    },
}

/// How coordinates sample the underlying space.
#[derive(Clone, Debug, PartialEq, Default)]
pub enum Sampling {
    /// Each coordinate is a point sample.
    #[default]
    Points,
    /// Each coordinate anchors an interval cell.
    Intervals {
        /// The position of the coordinate within each cell.
        locus: Locus,
        /// The extent of the cells.
        span: Span,
    },
}

impl Sampling {
    /// Create regular interval sampling.
    #[must_use]
    pub fn regular(step: impl Into<Step>, locus: Locus) -> Self {
        Self::Intervals {
            locus,
            span: Span::Regular(step.into()),
        }
    }

    /// Create irregular interval sampling with the outer bounds of the axis.
    #[must_use]
    pub fn irregular(
        lower: impl Into<CoordinateValue>,
        upper: impl Into<CoordinateValue>,
        locus: Locus,
    ) -> Self {
        Self::Intervals {
            locus,
            span: Span::Irregular {
                lower: lower.into(),
                upper: upper.into(),
            },
        }
    }

    /// Returns true for point sampling.
    #[must_use]
    pub fn is_points(&self) -> bool {
        matches!(self, Self::Points)
    }

    /// The locus of interval sampling.
    #[must_use]
    pub fn locus(&self) -> Option<Locus> {
        match self {
            Self::Points => None,
            Self::Intervals { locus, .. } => Some(*locus),
        }
    }

    /// The span of interval sampling.
    #[must_use]
    pub fn span(&self) -> Option<&Span> {
        match self {
            Self::Points => None,
            Self::Intervals { span, .. } => Some(span),
        }
    }
}

/// The order of the coordinates of a dimension.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Display)]
pub enum Order {
    /// Coordinates never decrease.
    Forward,
    /// Coordinates never increase.
    Reverse,
    /// Coordinates are neither forward nor reverse ordered.
    Unordered,
}
