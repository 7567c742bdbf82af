//! Windows and selectors.
//!
//! A [`Selector`] picks indices along one dimension, by position or by coordinate.
//! An [`Indexer`] applies selectors to a layer by dimension name or by position, and a [`Window`] is a standing set of named selectors applied to every layer of a [`Stack`](crate::stack::Stack).
//!
//! [`resolve_region`] composes a window and an indexer into one [`ReadRegion`] of concrete indices along every axis of a layer, so a file-backed layer can be read once, reading only what is requested.
//! Selectors of an indexer are resolved against the windowed view of each axis.
//!
//! ```
//! # use rasterstack::dimension::Dimension;
//! # use rasterstack::window::{resolve_region, AxisIndex, Indexer, Selector, Window};
//! let dimensions = [
//!     Dimension::new("y", vec![0.0, 1.0, 2.0, 3.0]),
//!     Dimension::new("x", vec![10.0, 20.0, 30.0]),
//! ];
//! let window = Window::named([("y", Selector::Range(1..4))]);
//! let indexer = Indexer::positional([Selector::Index(2), Selector::Between(15.0.into(), 35.0.into())]);
//! let resolved = resolve_region(&dimensions, Some(&window), &indexer)?;
//! assert_eq!(resolved.region().axes(), &[AxisIndex::Scalar(3), AxisIndex::Slice(vec![1, 2])]);
//! assert_eq!(resolved.refdims()[0].coordinates().first(), Some(3.0.into()));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod read_region;
mod window_errors;

pub use read_region::{AxisIndex, ReadRegion};
pub use window_errors::WindowError;

use std::ops::Range;

use derive_more::From;

use crate::dimension::{CoordinateValue, Dimension, DimensionName};

/// Selects indices along one dimension.
#[derive(Clone, Debug, PartialEq, From)]
pub enum Selector {
    /// Every index.
    All,
    /// A single index. The dimension is removed from the result.
    #[from]
    Index(usize),
    /// A range of indices.
    #[from]
    Range(Range<usize>),
    /// A list of indices, in result order.
    #[from]
    Indices(Vec<usize>),
    /// The first index with a coordinate equal to a value. The dimension is removed from the result.
    At(CoordinateValue),
    /// The index with the coordinate nearest to a value. The dimension is removed from the result.
    Near(CoordinateValue),
    /// All indices with coordinates within an inclusive interval, in axis order.
    Between(CoordinateValue, CoordinateValue),
    /// The index of the interval cell containing a value. The dimension is removed from the result.
    ///
    /// Cells include their lower edge and exclude their upper edge.
    /// For point sampled dimensions this is equivalent to [`Selector::At`].
    Contains(CoordinateValue),
}

impl Selector {
    /// Create a [`Selector::At`] selector.
    #[must_use]
    pub fn at(value: impl Into<CoordinateValue>) -> Self {
        Self::At(value.into())
    }

    /// Create a [`Selector::Near`] selector.
    #[must_use]
    pub fn near(value: impl Into<CoordinateValue>) -> Self {
        Self::Near(value.into())
    }

    /// Create a [`Selector::Between`] selector.
    #[must_use]
    pub fn between(lower: impl Into<CoordinateValue>, upper: impl Into<CoordinateValue>) -> Self {
        Self::Between(lower.into(), upper.into())
    }

    /// Create a [`Selector::Contains`] selector.
    #[must_use]
    pub fn contains(value: impl Into<CoordinateValue>) -> Self {
        Self::Contains(value.into())
    }

    /// Resolve the selector to indices of `dimension`.
    ///
    /// # Errors
    /// Returns a [`WindowError`] if
    /// - an index or range is out of bounds,
    /// - a coordinate value is of a different kind to the coordinates, or
    /// - no coordinate matches an [`At`](Selector::At), [`Near`](Selector::Near) or [`Contains`](Selector::Contains) selector.
    pub fn resolve(&self, dimension: &Dimension) -> Result<AxisIndex, WindowError> {
        let length = dimension.len();
        let not_found = |value: &CoordinateValue| WindowError::CoordinateNotFound {
            dimension: dimension.name().clone(),
            value: value.to_string(),
        };
        match self {
            Self::All => Ok(AxisIndex::full(length)),
            Self::Index(index) => {
                check_index(dimension, *index)?;
                Ok(AxisIndex::Scalar(*index))
            }
            Self::Range(range) => {
                if range.start > range.end || range.end > length {
                    return Err(WindowError::InvalidRange {
                        dimension: dimension.name().clone(),
                        start: range.start,
                        end: range.end,
                        length,
                    });
                }
                Ok(AxisIndex::Slice(range.clone().collect()))
            }
            Self::Indices(indices) => {
                for index in indices {
                    check_index(dimension, *index)?;
                }
                Ok(AxisIndex::Slice(indices.clone()))
            }
            Self::At(value) => {
                check_kind(dimension, value)?;
                dimension
                    .coordinates()
                    .position(value)
                    .map(AxisIndex::Scalar)
                    .ok_or_else(|| not_found(value))
            }
            Self::Near(value) => {
                check_kind(dimension, value)?;
                dimension
                    .coordinates()
                    .nearest(value)
                    .map(AxisIndex::Scalar)
                    .ok_or_else(|| not_found(value))
            }
            Self::Between(lower, upper) => {
                check_kind(dimension, lower)?;
                check_kind(dimension, upper)?;
                let (lower, upper) = if lower <= upper {
                    (lower, upper)
                } else {
                    (upper, lower)
                };
                Ok(AxisIndex::Slice(
                    dimension
                        .coordinates()
                        .iter()
                        .enumerate()
                        .filter(|(_, coordinate)| lower <= coordinate && coordinate <= upper)
                        .map(|(index, _)| index)
                        .collect(),
                ))
            }
            Self::Contains(value) => {
                check_kind(dimension, value)?;
                if dimension.sampling().is_points() {
                    return Self::At(*value).resolve(dimension);
                }
                let edges = dimension.cell_edges()?;
                (0..length)
                    .find(|index| match (edges.get(*index), edges.get(index + 1)) {
                        (Some(a), Some(b)) => {
                            let (lower, upper) = if a <= b { (a, b) } else { (b, a) };
                            lower <= *value && *value < upper
                        }
                        _ => false,
                    })
                    .map(AxisIndex::Scalar)
                    .ok_or_else(|| not_found(value))
            }
        }
    }
}

fn check_index(dimension: &Dimension, index: usize) -> Result<(), WindowError> {
    if index < dimension.len() {
        Ok(())
    } else {
        Err(WindowError::IndexOutOfBounds {
            dimension: dimension.name().clone(),
            index,
            length: dimension.len(),
        })
    }
}

fn check_kind(dimension: &Dimension, value: &CoordinateValue) -> Result<(), WindowError> {
    if value.is_time() == dimension.coordinates().is_time() {
        Ok(())
    } else {
        Err(WindowError::IncompatibleCoordinate {
            dimension: dimension.name().clone(),
            value: value.to_string(),
        })
    }
}

/// A selector for a named dimension.
#[derive(Clone, Debug, PartialEq)]
pub struct DimSelector {
    dimension: DimensionName,
    selector: Selector,
}

impl DimSelector {
    /// Create a new dimension selector.
    #[must_use]
    pub fn new(dimension: impl Into<DimensionName>, selector: impl Into<Selector>) -> Self {
        Self {
            dimension: dimension.into(),
            selector: selector.into(),
        }
    }

    /// The dimension name.
    #[must_use]
    pub fn dimension(&self) -> &DimensionName {
        &self.dimension
    }

    /// The selector.
    #[must_use]
    pub fn selector(&self) -> &Selector {
        &self.selector
    }
}

/// An index request for a layer.
#[derive(Clone, Debug, PartialEq, From)]
pub enum Indexer {
    /// Selectors matched to dimensions by name.
    ///
    /// Selectors for dimensions a layer does not have are ignored by that layer.
    Named(Vec<DimSelector>),
    /// Selectors applied to the remaining axes of a layer in order.
    ///
    /// Axes without a selector are read in full.
    Positional(Vec<Selector>),
}

impl Default for Indexer {
    /// Read every axis in full.
    fn default() -> Self {
        Self::Positional(Vec::new())
    }
}

impl Indexer {
    /// An indexer reading every axis in full.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Create a named indexer.
    #[must_use]
    pub fn named<N: Into<DimensionName>, S: Into<Selector>>(
        selectors: impl IntoIterator<Item = (N, S)>,
    ) -> Self {
        Self::Named(
            selectors
                .into_iter()
                .map(|(dimension, selector)| DimSelector::new(dimension, selector))
                .collect(),
        )
    }

    /// Create a positional indexer.
    #[must_use]
    pub fn positional<S: Into<Selector>>(selectors: impl IntoIterator<Item = S>) -> Self {
        Self::Positional(selectors.into_iter().map(Into::into).collect())
    }

    /// Check that every named selector refers to one of `dimensions`.
    ///
    /// # Errors
    /// Returns [`WindowError::UnknownDimension`] for the first selector naming an unknown dimension.
    pub fn check_dimensions<'a>(
        &self,
        dimensions: impl IntoIterator<Item = &'a Dimension> + Clone,
    ) -> Result<(), WindowError> {
        if let Self::Named(selectors) = self {
            for selector in selectors {
                if !dimensions
                    .clone()
                    .into_iter()
                    .any(|dimension| dimension.name() == selector.dimension())
                {
                    return Err(WindowError::UnknownDimension(selector.dimension().clone()));
                }
            }
        }
        Ok(())
    }
}

/// A standing set of named selectors applied to every layer of a stack.
#[derive(Clone, Debug, PartialEq, Default)]
pub struct Window {
    selectors: Vec<DimSelector>,
}

impl Window {
    /// Create a new window.
    #[must_use]
    pub fn new(selectors: Vec<DimSelector>) -> Self {
        Self { selectors }
    }

    /// Create a new window from dimension names and selectors.
    #[must_use]
    pub fn named<N: Into<DimensionName>, S: Into<Selector>>(
        selectors: impl IntoIterator<Item = (N, S)>,
    ) -> Self {
        Self::new(
            selectors
                .into_iter()
                .map(|(dimension, selector)| DimSelector::new(dimension, selector))
                .collect(),
        )
    }

    /// The selectors of the window.
    #[must_use]
    pub fn selectors(&self) -> &[DimSelector] {
        &self.selectors
    }

    /// Returns true if the window selects nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.selectors.is_empty()
    }
}

/// A read region of a layer and the dimensions of the result.
#[derive(Clone, Debug)]
pub struct ResolvedRegion {
    region: ReadRegion,
    dims: Vec<Dimension>,
    refdims: Vec<Dimension>,
}

impl ResolvedRegion {
    /// The read region, in terms of the native axes of the layer.
    #[must_use]
    pub fn region(&self) -> &ReadRegion {
        &self.region
    }

    /// The dimensions of the result.
    #[must_use]
    pub fn dims(&self) -> &[Dimension] {
        &self.dims
    }

    /// The dimensions removed by scalar selectors, each sliced to the selected coordinate.
    #[must_use]
    pub fn refdims(&self) -> &[Dimension] {
        &self.refdims
    }

    /// Decompose into the read region, result dimensions and reference dimensions.
    #[must_use]
    pub fn into_parts(self) -> (ReadRegion, Vec<Dimension>, Vec<Dimension>) {
        (self.region, self.dims, self.refdims)
    }
}

/// Compose `window` and `indexer` into a read region of a layer with `dimensions`.
///
/// The window is applied first.
/// The indexer is then resolved against the windowed view of each remaining axis.
/// Named selectors for dimensions not in `dimensions` are ignored.
///
/// # Errors
/// Returns a [`WindowError`] if a selector cannot be resolved, if a selector targets an axis already removed by a scalar selector, or if there are more positional selectors than remaining axes.
pub fn resolve_region(
    dimensions: &[Dimension],
    window: Option<&Window>,
    indexer: &Indexer,
) -> Result<ResolvedRegion, WindowError> {
    let mut axes: Vec<AxisIndex> = dimensions
        .iter()
        .map(|dimension| AxisIndex::full(dimension.len()))
        .collect();

    let named = window
        .map(Window::selectors)
        .unwrap_or_default()
        .iter()
        .chain(match indexer {
            Indexer::Named(selectors) => selectors.as_slice(),
            Indexer::Positional(_) => &[][..],
        });
    for selector in named {
        if let Some(axis) = dimensions
            .iter()
            .position(|dimension| dimension.name() == selector.dimension())
        {
            apply_selector(&mut axes[axis], &dimensions[axis], selector.selector())?;
        }
    }

    if let Indexer::Positional(selectors) = indexer {
        let remaining: Vec<usize> = axes
            .iter()
            .enumerate()
            .filter(|(_, axis)| !axis.is_scalar())
            .map(|(axis, _)| axis)
            .collect();
        if selectors.len() > remaining.len() {
            return Err(WindowError::TooManyIndices {
                got: selectors.len(),
                max: remaining.len(),
            });
        }
        for (selector, axis) in std::iter::zip(selectors, remaining) {
            apply_selector(&mut axes[axis], &dimensions[axis], selector)?;
        }
    }

    let mut dims = Vec::new();
    let mut refdims = Vec::new();
    for (axis, dimension) in std::iter::zip(&axes, dimensions) {
        match axis {
            AxisIndex::Slice(indices) => dims.push(dimension.select(indices)),
            AxisIndex::Scalar(index) => refdims.push(dimension.select(&[*index])),
        }
    }
    Ok(ResolvedRegion {
        region: ReadRegion::new(axes),
        dims,
        refdims,
    })
}

fn apply_selector(
    axis: &mut AxisIndex,
    dimension: &Dimension,
    selector: &Selector,
) -> Result<(), WindowError> {
    let AxisIndex::Slice(current) = axis else {
        return Err(WindowError::AxisDropped(dimension.name().clone()));
    };
    let view = dimension.select(current);
    let resolved = selector.resolve(&view)?;
    let composed =
        AxisIndex::compose(current, &resolved).ok_or_else(|| WindowError::InvalidRange {
            dimension: dimension.name().clone(),
            start: 0,
            end: resolved.len(),
            length: current.len(),
        })?;
    *axis = composed;
    Ok(())
}
