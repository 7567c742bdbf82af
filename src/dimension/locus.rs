use std::iter::once;

use chrono::{Duration, NaiveDateTime};
use itertools::Itertools;

use super::{
    CoordinateValue, Coordinates, Dimension, DimensionError, DimensionName, Locus, Sampling,
    Span, Step,
};

impl Dimension {
    /// Re-anchor the coordinates of an interval sampled dimension at `target`.
    ///
    /// For a regular span with step `s`, coordinates move by a multiple of `s/2`: `Start`→`Center` adds `s/2`, `Start`→`End` adds `s`, and the reverse shifts subtract.
    /// For an irregular span, the cell edges are derived from the coordinates and the outer bounds, and the lower edges, upper edges or edge midpoints are returned.
    ///
    /// Integer coordinates stay integers if the shift is integral, otherwise they become floating point.
    /// Shifting to the current locus returns an equal dimension.
    ///
    /// # Errors
    /// Returns [`DimensionError::UnsupportedOperation`] if the dimension is point sampled, or [`DimensionError::IncompatibleStep`]/[`DimensionError::IncompatibleBounds`] if the span does not match the coordinates.
    pub fn shift_locus(&self, target: Locus) -> Result<Self, DimensionError> {
        let Sampling::Intervals { locus, span } = &self.sampling else {
            return Err(DimensionError::UnsupportedOperation(format!(
                "dimension {} is point sampled and has no locus to shift",
                self.name
            )));
        };
        let coordinates = if *locus == target {
            self.coordinates.clone()
        } else {
            match span {
                Span::Regular(step) => shift_regular(
                    &self.name,
                    &self.coordinates,
                    *step,
                    target.half_cells() - locus.half_cells(),
                )?,
                Span::Irregular { .. } => {
                    let integer = matches!(self.coordinates, Coordinates::Int(_));
                    anchors_at(&self.cell_edges()?, target, integer)
                }
            }
        };
        Ok(Self {
            name: self.name.clone(),
            coordinates,
            order: self.order,
            sampling: Sampling::Intervals {
                locus: target,
                span: span.clone(),
            },
            crs: self.crs.clone(),
        })
    }

    /// The edges of the interval cells of the dimension.
    ///
    /// There is one more edge than there are coordinates, except for an empty dimension which has no edges.
    ///
    /// # Errors
    /// Returns [`DimensionError::UnsupportedOperation`] if the dimension is point sampled, or [`DimensionError::IncompatibleStep`]/[`DimensionError::IncompatibleBounds`] if the span does not match the coordinates.
    pub fn cell_edges(&self) -> Result<Coordinates, DimensionError> {
        let Sampling::Intervals { locus, span } = &self.sampling else {
            return Err(DimensionError::UnsupportedOperation(format!(
                "dimension {} is point sampled and has no cells",
                self.name
            )));
        };
        if self.coordinates.is_empty() {
            return Ok(self.coordinates.clone());
        }
        let incompatible_step = |step: &Step| DimensionError::IncompatibleStep {
            dimension: self.name.clone(),
            step: *step,
        };
        let incompatible_bounds = || DimensionError::IncompatibleBounds(self.name.clone());

        if let Coordinates::Time(values) = &self.coordinates {
            let (lower, upper) = match span {
                Span::Regular(Step::Duration(step)) => {
                    let overflow = || DimensionError::CoordinateOverflow(self.name.clone());
                    let (before, after) = duration_split(*step, *locus).ok_or_else(overflow)?;
                    (
                        values[0].checked_sub_signed(before).ok_or_else(overflow)?,
                        values[values.len() - 1]
                            .checked_add_signed(after)
                            .ok_or_else(overflow)?,
                    )
                }
                Span::Regular(step) => return Err(incompatible_step(step)),
                Span::Irregular { lower, upper } => (
                    lower.as_time().ok_or_else(incompatible_bounds)?,
                    upper.as_time().ok_or_else(incompatible_bounds)?,
                ),
            };
            return Ok(Coordinates::Time(edges_from_anchors(
                values,
                *locus,
                lower,
                upper,
                time_midpoint,
            )));
        }

        let integer = matches!(self.coordinates, Coordinates::Int(_));
        let values = self.coordinates.to_f64().ok_or_else(incompatible_bounds)?;
        let (lower, upper) = match span {
            Span::Regular(step) => {
                let step_f64 = step.as_f64().ok_or_else(|| incompatible_step(step))?;
                let before = f64::from(locus.half_cells()) / 2.0 * step_f64;
                (values[0] - before, values[values.len() - 1] + step_f64 - before)
            }
            Span::Irregular { lower, upper } => (
                lower.as_f64().ok_or_else(incompatible_bounds)?,
                upper.as_f64().ok_or_else(incompatible_bounds)?,
            ),
        };
        Ok(narrow(
            edges_from_anchors(&values, *locus, lower, upper, |a, b| (a + b) / 2.0),
            integer,
        ))
    }

    /// The lower and upper edge of the cell at `index`.
    ///
    /// Returns [`None`] if the dimension is point sampled or `index` is out of bounds.
    #[must_use]
    pub fn cell_bounds(&self, index: usize) -> Option<(CoordinateValue, CoordinateValue)> {
        let edges = self.cell_edges().ok()?;
        Some((edges.get(index)?, edges.get(index + 1)?))
    }
}

fn shift_regular(
    name: &DimensionName,
    coordinates: &Coordinates,
    step: Step,
    half_cells: i32,
) -> Result<Coordinates, DimensionError> {
    let incompatible = || DimensionError::IncompatibleStep {
        dimension: name.clone(),
        step,
    };
    let overflow = || DimensionError::CoordinateOverflow(name.clone());
    Ok(match (coordinates, step) {
        (Coordinates::Int(values), Step::Int(step)) => {
            let offset = i64::from(half_cells)
                .checked_mul(step)
                .ok_or_else(overflow)?;
            if offset % 2 == 0 {
                Coordinates::Int(
                    values
                        .iter()
                        .map(|value| value.checked_add(offset / 2))
                        .collect::<Option<_>>()
                        .ok_or_else(overflow)?,
                )
            } else {
                Coordinates::Float(widen(values, f64::from(half_cells) * step_f64(step) / 2.0))
            }
        }
        (Coordinates::Time(values), Step::Duration(step)) => {
            let offset = step.checked_mul(half_cells).ok_or_else(overflow)? / 2;
            Coordinates::Time(
                values
                    .iter()
                    .map(|value| value.checked_add_signed(offset))
                    .collect::<Option<_>>()
                    .ok_or_else(overflow)?,
            )
        }
        (Coordinates::Time(_), _) | (_, Step::Duration(_)) => return Err(incompatible()),
        (coordinates, step) => {
            let integer = matches!(coordinates, Coordinates::Int(_));
            let offset = f64::from(half_cells) * step.as_f64().ok_or_else(incompatible)? / 2.0;
            let values = coordinates.to_f64().ok_or_else(incompatible)?;
            narrow(
                values.into_iter().map(|value| value + offset).collect(),
                integer && offset.fract() == 0.0,
            )
        }
    })
}

#[allow(clippy::cast_precision_loss)]
fn step_f64(step: i64) -> f64 {
    step as f64
}

#[allow(clippy::cast_precision_loss)]
fn widen(values: &[i64], offset: f64) -> Vec<f64> {
    values.iter().map(|value| *value as f64 + offset).collect()
}

/// Integral values become integer coordinates if `integer` is set.
#[allow(clippy::cast_possible_truncation)]
fn narrow(values: Vec<f64>, integer: bool) -> Coordinates {
    if integer && values.iter().all(|value| value.is_finite() && value.fract() == 0.0) {
        Coordinates::Int(values.into_iter().map(|value| value as i64).collect())
    } else {
        Coordinates::Float(values)
    }
}

/// The distance from the lower edge of a cell to its locus, and from the locus to the upper edge.
fn duration_split(step: Duration, locus: Locus) -> Option<(Duration, Duration)> {
    let before = step.checked_mul(locus.half_cells())? / 2;
    Some((before, step.checked_sub(&before)?))
}

fn time_midpoint(a: NaiveDateTime, b: NaiveDateTime) -> NaiveDateTime {
    a + (b - a) / 2
}

fn edges_from_anchors<T: Copy>(
    anchors: &[T],
    locus: Locus,
    lower: T,
    upper: T,
    midpoint: impl Fn(T, T) -> T,
) -> Vec<T> {
    match locus {
        Locus::Start => anchors.iter().copied().chain(once(upper)).collect(),
        Locus::End => once(lower).chain(anchors.iter().copied()).collect(),
        Locus::Center => once(lower)
            .chain(
                anchors
                    .iter()
                    .tuple_windows()
                    .map(|(a, b)| midpoint(*a, *b)),
            )
            .chain(once(upper))
            .collect(),
    }
}

fn anchors_from_edges<T: Copy>(edges: &[T], locus: Locus, midpoint: impl Fn(T, T) -> T) -> Vec<T> {
    match locus {
        Locus::Start => edges.iter().copied().take(edges.len().saturating_sub(1)).collect(),
        Locus::End => edges.iter().copied().skip(1).collect(),
        Locus::Center => edges
            .iter()
            .tuple_windows()
            .map(|(a, b)| midpoint(*a, *b))
            .collect(),
    }
}

fn anchors_at(edges: &Coordinates, locus: Locus, integer: bool) -> Coordinates {
    match edges {
        Coordinates::Time(edges) => {
            Coordinates::Time(anchors_from_edges(edges, locus, time_midpoint))
        }
        Coordinates::Int(_) | Coordinates::Float(_) => {
            let edges = edges.to_f64().unwrap_or_default();
            narrow(
                anchors_from_edges(&edges, locus, |a, b| (a + b) / 2.0),
                integer,
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    #[test]
    fn shift_regular_float() -> Result<(), Box<dyn std::error::Error>> {
        let dimension = Dimension::regular("x", vec![1.0, 2.0, 3.0], 1.0, Locus::Center)?;
        assert_eq!(
            dimension.shift_locus(Locus::Start)?.coordinates(),
            &Coordinates::Float(vec![0.5, 1.5, 2.5])
        );
        assert_eq!(
            dimension.shift_locus(Locus::End)?.coordinates(),
            &Coordinates::Float(vec![1.5, 2.5, 3.5])
        );
        Ok(())
    }

    #[test]
    fn shift_regular_integer() -> Result<(), Box<dyn std::error::Error>> {
        let dimension = Dimension::regular("x", vec![3i64, 4, 5], 1i64, Locus::Start)?;
        let end = dimension.shift_locus(Locus::End)?;
        assert!(matches!(end.coordinates(), Coordinates::Int(values) if values == &[4, 5, 6]));
        let center = dimension.shift_locus(Locus::Center)?;
        assert!(
            matches!(center.coordinates(), Coordinates::Float(values) if values == &[3.5, 4.5, 5.5])
        );
        assert_eq!(center.locus(), Some(Locus::Center));

        let even = Dimension::regular("x", vec![0i64, 2, 4], 2i64, Locus::Start)?;
        assert!(matches!(
            even.shift_locus(Locus::Center)?.coordinates(),
            Coordinates::Int(values) if values == &[1, 3, 5]
        ));
        Ok(())
    }

    #[test]
    fn shift_regular_cycle() -> Result<(), Box<dyn std::error::Error>> {
        let dimension = Dimension::regular("x", vec![10.0, 20.0, 30.0], 10.0, Locus::Start)?;
        let cycled = dimension
            .shift_locus(Locus::Center)?
            .shift_locus(Locus::End)?
            .shift_locus(Locus::Start)?;
        assert_eq!(cycled, dimension);

        let integer = Dimension::regular("x", vec![3i64, 4, 5], 1i64, Locus::Start)?;
        let cycled = integer
            .shift_locus(Locus::Center)?
            .shift_locus(Locus::End)?
            .shift_locus(Locus::Start)?;
        assert_eq!(cycled.coordinates(), integer.coordinates());
        Ok(())
    }

    #[test]
    fn shift_to_current_locus() -> Result<(), Box<dyn std::error::Error>> {
        let dimension = Dimension::regular("x", vec![1.0, 2.0], 1.0, Locus::End)?;
        assert_eq!(dimension.shift_locus(Locus::End)?, dimension);
        Ok(())
    }

    #[test]
    fn shift_points_unsupported() {
        let dimension = Dimension::new("x", vec![1.0, 2.0]);
        assert!(matches!(
            dimension.shift_locus(Locus::Start),
            Err(DimensionError::UnsupportedOperation(_))
        ));
        assert!(dimension.cell_edges().is_err());
        assert!(dimension.cell_bounds(0).is_none());
    }

    #[test]
    fn shift_irregular() -> Result<(), Box<dyn std::error::Error>> {
        let dimension =
            Dimension::irregular("x", vec![1.0, 2.0, 4.0], 0.5, 5.0, Locus::Center)?;
        assert_eq!(
            dimension.cell_edges()?,
            Coordinates::Float(vec![0.5, 1.5, 3.0, 5.0])
        );
        let start = dimension.shift_locus(Locus::Start)?;
        assert_eq!(start.coordinates(), &Coordinates::Float(vec![0.5, 1.5, 3.0]));
        let end = start.shift_locus(Locus::End)?;
        assert_eq!(end.coordinates(), &Coordinates::Float(vec![1.5, 3.0, 5.0]));
        assert_eq!(end.shift_locus(Locus::Start)?, start);
        Ok(())
    }

    #[test]
    fn shift_irregular_integer() -> Result<(), Box<dyn std::error::Error>> {
        let dimension = Dimension::irregular("x", vec![0i64, 10, 30], 0i64, 60i64, Locus::Start)?;
        let end = dimension.shift_locus(Locus::End)?;
        assert!(matches!(end.coordinates(), Coordinates::Int(values) if values == &[10, 30, 60]));
        let center = dimension.shift_locus(Locus::Center)?;
        assert_eq!(center.coordinates(), &Coordinates::Float(vec![5.0, 20.0, 45.0]));
        Ok(())
    }

    #[test]
    fn shift_time() -> Result<(), Box<dyn std::error::Error>> {
        let day = |d| {
            NaiveDate::from_ymd_opt(2001, 3, d)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap()
        };
        let dimension = Dimension::regular(
            "time",
            vec![day(1), day(2)],
            Duration::days(1),
            Locus::Start,
        )?;
        let center = dimension.shift_locus(Locus::Center)?;
        assert_eq!(
            center.coordinates(),
            &Coordinates::Time(vec![
                day(1) + Duration::hours(12),
                day(2) + Duration::hours(12)
            ])
        );
        assert_eq!(
            dimension.cell_bounds(1),
            Some((CoordinateValue::Time(day(2)), CoordinateValue::Time(day(3))))
        );
        Ok(())
    }

    #[test]
    fn shift_overflow() -> Result<(), Box<dyn std::error::Error>> {
        let dimension = Dimension::regular("x", vec![0i64, i64::MAX - 1], 2i64, Locus::Start)?;
        assert!(matches!(
            dimension.shift_locus(Locus::End),
            Err(DimensionError::CoordinateOverflow(_))
        ));
        let huge_step = Dimension::regular("x", vec![0i64, 1], i64::MAX, Locus::Start)?;
        assert!(matches!(
            huge_step.shift_locus(Locus::End),
            Err(DimensionError::CoordinateOverflow(_))
        ));

        let time = Dimension::regular(
            "time",
            vec![NaiveDateTime::MAX - Duration::hours(1)],
            Duration::days(1),
            Locus::Start,
        )?;
        assert!(matches!(
            time.shift_locus(Locus::End),
            Err(DimensionError::CoordinateOverflow(_))
        ));
        assert!(matches!(
            time.cell_edges(),
            Err(DimensionError::CoordinateOverflow(_))
        ));
        Ok(())
    }

    #[test]
    fn cell_edges_regular() -> Result<(), Box<dyn std::error::Error>> {
        let dimension = Dimension::regular("x", vec![1i64, 2, 3], 1i64, Locus::End)?;
        assert_eq!(dimension.cell_edges()?, Coordinates::Int(vec![0, 1, 2, 3]));
        let reverse = Dimension::regular("y", vec![2.5, 1.5, 0.5], -1.0, Locus::Center)?;
        assert_eq!(
            reverse.cell_edges()?,
            Coordinates::Float(vec![3.0, 2.0, 1.0, 0.0])
        );
        Ok(())
    }
}
