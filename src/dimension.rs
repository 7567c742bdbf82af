//! Dimensions.
//!
//! A [`Dimension`] describes one axis of a layer:
//! - a [`DimensionName`], which identifies the axis across layers,
//! - ordered [`Coordinates`] (integer, floating point or date-time),
//! - its [`Sampling`]: point samples, or interval cells anchored at a [`Locus`] with a regular or irregular [`Span`],
//! - an optional coordinate reference system ([`Crs`]).
//!
//! Dimensions are immutable once attached to a layer.
//! Operations like [`Dimension::shift_locus`] and [`Dimension::select`] return a new dimension.

mod coordinates;
mod dimension_errors;
mod dimension_name;
mod locus;
mod merge;
mod sampling;

pub use coordinates::{CoordinateValue, Coordinates, Step};
pub use dimension_errors::DimensionError;
pub use dimension_name::DimensionName;
pub use merge::combine_dimensions;
pub use sampling::{Locus, Order, Sampling, Span};

use derive_more::Display;
use itertools::Itertools;

/// A coordinate reference system.
///
/// The definition (e.g. `EPSG:4326` or WKT) is carried through untouched and compared for identity only.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Display)]
pub struct Crs(String);

impl Crs {
    /// Create a new coordinate reference system from its definition.
    #[must_use]
    pub fn new(definition: impl Into<String>) -> Self {
        Self(definition.into())
    }

    /// The definition of the coordinate reference system.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Crs {
    fn from(definition: &str) -> Self {
        Self::new(definition)
    }
}

impl From<String> for Crs {
    fn from(definition: String) -> Self {
        Self::new(definition)
    }
}

/// A dimension of a layer.
#[derive(Clone, Debug, PartialEq)]
pub struct Dimension {
    name: DimensionName,
    coordinates: Coordinates,
    order: Order,
    sampling: Sampling,
    crs: Option<Crs>,
}

impl Dimension {
    /// Create a new point sampled dimension.
    #[must_use]
    pub fn new(name: impl Into<DimensionName>, coordinates: impl Into<Coordinates>) -> Self {
        let coordinates = coordinates.into();
        Self {
            name: name.into(),
            order: coordinates.order(),
            coordinates,
            sampling: Sampling::Points,
            crs: None,
        }
    }

    /// Create a new dimension with `sampling`.
    ///
    /// # Errors
    /// Returns [`DimensionError::IncompatibleStep`] or [`DimensionError::IncompatibleBounds`] if the span of `sampling` does not suit the coordinates.
    /// Integer and floating point coordinates accept integer and floating point steps and bounds, date-time coordinates need a duration step or date-time bounds.
    pub fn new_with_sampling(
        name: impl Into<DimensionName>,
        coordinates: impl Into<Coordinates>,
        sampling: Sampling,
    ) -> Result<Self, DimensionError> {
        let dimension = Self::new(name, coordinates);
        validate_sampling(&dimension.name, &dimension.coordinates, &sampling)?;
        Ok(Self {
            sampling,
            ..dimension
        })
    }

    /// Create a new regular interval sampled dimension.
    ///
    /// # Errors
    /// Returns [`DimensionError::IncompatibleStep`] if `step` does not suit the coordinates.
    pub fn regular(
        name: impl Into<DimensionName>,
        coordinates: impl Into<Coordinates>,
        step: impl Into<Step>,
        locus: Locus,
    ) -> Result<Self, DimensionError> {
        Self::new_with_sampling(name, coordinates, Sampling::regular(step, locus))
    }

    /// Create a new irregular interval sampled dimension, with the outer bounds of the axis.
    ///
    /// # Errors
    /// Returns [`DimensionError::IncompatibleBounds`] if the bounds do not suit the coordinates.
    pub fn irregular(
        name: impl Into<DimensionName>,
        coordinates: impl Into<Coordinates>,
        lower: impl Into<CoordinateValue>,
        upper: impl Into<CoordinateValue>,
        locus: Locus,
    ) -> Result<Self, DimensionError> {
        Self::new_with_sampling(name, coordinates, Sampling::irregular(lower, upper, locus))
    }

    /// Set the coordinate reference system.
    #[must_use]
    pub fn with_crs(mut self, crs: impl Into<Crs>) -> Self {
        self.crs = Some(crs.into());
        self
    }

    /// The dimension name.
    #[must_use]
    pub fn name(&self) -> &DimensionName {
        &self.name
    }

    /// The coordinates.
    #[must_use]
    pub fn coordinates(&self) -> &Coordinates {
        &self.coordinates
    }

    /// The number of coordinates.
    #[must_use]
    pub fn len(&self) -> usize {
        self.coordinates.len()
    }

    /// Returns true if the dimension has no coordinates.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.coordinates.is_empty()
    }

    /// The coordinate order.
    #[must_use]
    pub fn order(&self) -> Order {
        self.order
    }

    /// The sampling.
    #[must_use]
    pub fn sampling(&self) -> &Sampling {
        &self.sampling
    }

    /// The locus of interval sampling, [`None`] for point sampling.
    #[must_use]
    pub fn locus(&self) -> Option<Locus> {
        self.sampling.locus()
    }

    /// The coordinate reference system.
    #[must_use]
    pub fn crs(&self) -> Option<&Crs> {
        self.crs.as_ref()
    }

    /// Select the coordinates at `indices`, keeping the remaining properties of the dimension.
    ///
    /// A regular span stays regular if the indices are evenly strided, with the step multiplied by the stride.
    /// Otherwise interval sampling becomes irregular, bounded by the outer edges of the first and last selected cells.
    /// Out of bounds indices are skipped.
    #[must_use]
    pub fn select(&self, indices: &[usize]) -> Self {
        let coordinates = self.coordinates.select(indices);
        let sampling = match &self.sampling {
            Sampling::Points => Sampling::Points,
            Sampling::Intervals { locus, span } => {
                let strided = match span {
                    Span::Regular(step) => uniform_stride(indices)
                        .and_then(|stride| step.multiply(stride))
                        .map(Span::Regular),
                    Span::Irregular { .. } => None,
                };
                Sampling::Intervals {
                    locus: *locus,
                    span: strided
                        .or_else(|| self.selected_bounds(indices))
                        .unwrap_or_else(|| span.clone()),
                }
            }
        };
        Self {
            name: self.name.clone(),
            order: coordinates.order(),
            coordinates,
            sampling,
            crs: self.crs.clone(),
        }
    }

    fn selected_bounds(&self, indices: &[usize]) -> Option<Span> {
        let first = *indices.first()?;
        let last = *indices.last()?;
        let edges = self.cell_edges().ok()?;
        Some(Span::Irregular {
            lower: edges.get(first)?,
            upper: edges.get(last + 1)?,
        })
    }

    /// Join dimensions end to end.
    ///
    /// Regular spans stay regular if every dimension has the same step and the joined coordinates are evenly spaced.
    /// Otherwise interval sampling becomes irregular, bounded by the outer edges of the first and last dimension.
    ///
    /// # Errors
    /// Returns a [`DimensionError`] if
    /// - `dimensions` is empty,
    /// - the dimension names differ,
    /// - the coordinates are of incompatible kinds, or
    /// - the sampling kind, locus or coordinate reference system differ.
    pub fn concat(dimensions: &[&Self]) -> Result<Self, DimensionError> {
        let (first, rest) = dimensions.split_first().ok_or(DimensionError::EmptyConcat)?;
        let mut coordinates = first.coordinates.clone();
        for dimension in rest {
            if dimension.name != first.name {
                return Err(DimensionError::NameMismatch(
                    first.name.clone(),
                    dimension.name.clone(),
                ));
            }
            if dimension.crs != first.crs
                || dimension.sampling.locus() != first.sampling.locus()
            {
                return Err(DimensionError::DimensionMismatch(first.name.clone()));
            }
            coordinates = coordinates
                .concat(&dimension.coordinates)
                .ok_or_else(|| DimensionError::IncompatibleCoordinates(first.name.clone()))?;
        }

        let sampling = match &first.sampling {
            Sampling::Points => Sampling::Points,
            Sampling::Intervals { locus, span } => {
                let regular = match span {
                    Span::Regular(step) => dimensions
                        .iter()
                        .all(|dimension| dimension.sampling.span() == Some(span))
                        && coordinates.is_regular(step),
                    Span::Irregular { .. } => false,
                };
                if regular {
                    Sampling::Intervals {
                        locus: *locus,
                        span: span.clone(),
                    }
                } else {
                    let first_edges = first.cell_edges()?;
                    let last = dimensions.last().unwrap_or(first);
                    let last_edges = last.cell_edges()?;
                    let (Some(lower), Some(upper)) = (first_edges.first(), last_edges.last())
                    else {
                        return Err(DimensionError::UnsupportedOperation(format!(
                            "cannot concatenate empty interval dimension {}",
                            first.name
                        )));
                    };
                    Sampling::Intervals {
                        locus: *locus,
                        span: Span::Irregular { lower, upper },
                    }
                }
            }
        };

        Ok(Self {
            name: first.name.clone(),
            order: coordinates.order(),
            coordinates,
            sampling,
            crs: first.crs.clone(),
        })
    }
}

fn uniform_stride(indices: &[usize]) -> Option<usize> {
    if indices.len() < 2 {
        return Some(1);
    }
    let strides: Vec<usize> = indices
        .iter()
        .tuple_windows()
        .map(|(a, b)| b.checked_sub(*a))
        .collect::<Option<_>>()?;
    match strides.first() {
        Some(stride) if *stride > 0 && strides.iter().all_equal() => Some(*stride),
        _ => None,
    }
}

fn validate_sampling(
    name: &DimensionName,
    coordinates: &Coordinates,
    sampling: &Sampling,
) -> Result<(), DimensionError> {
    match sampling.span() {
        None => Ok(()),
        Some(Span::Regular(step)) => {
            if coordinates.is_time() == matches!(step, Step::Duration(_)) {
                Ok(())
            } else {
                Err(DimensionError::IncompatibleStep {
                    dimension: name.clone(),
                    step: *step,
                })
            }
        }
        Some(Span::Irregular { lower, upper }) => {
            if lower.is_time() == coordinates.is_time() && upper.is_time() == coordinates.is_time()
            {
                Ok(())
            } else {
                Err(DimensionError::IncompatibleBounds(name.clone()))
            }
        }
    }
}
