use std::cmp::Ordering;

use chrono::{Duration, NaiveDateTime};
use derive_more::{Display, From};
use itertools::Itertools;

use super::Order;

/// A single coordinate value.
///
/// Integer and floating point values compare numerically with each other.
/// Date-times only compare with date-times.
#[derive(Clone, Copy, Debug, Display, From)]
pub enum CoordinateValue {
    /// An integer coordinate.
    #[display("{_0}")]
    Int(i64),
    /// A floating point coordinate.
    #[display("{_0}")]
    Float(f64),
    /// A date-time coordinate.
    #[display("{_0}")]
    Time(NaiveDateTime),
}

impl CoordinateValue {
    /// Return the value as a [`f64`] if it is numeric.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(value) => Some(*value as f64),
            Self::Float(value) => Some(*value),
            Self::Time(_) => None,
        }
    }

    /// Return the value as a [`NaiveDateTime`] if it is a date-time.
    #[must_use]
    pub fn as_time(&self) -> Option<NaiveDateTime> {
        match self {
            Self::Time(value) => Some(*value),
            Self::Int(_) | Self::Float(_) => None,
        }
    }

    /// Returns true if the value is a date-time.
    #[must_use]
    pub fn is_time(&self) -> bool {
        matches!(self, Self::Time(_))
    }

    /// The absolute distance between two values.
    ///
    /// Distances between date-times are measured in seconds.
    /// Returns [`None`] if the values are of incompatible kinds.
    #[must_use]
    pub fn distance(&self, other: &Self) -> Option<f64> {
        match (self, other) {
            (Self::Time(a), Self::Time(b)) => Some(duration_seconds(*a - *b).abs()),
            _ => Some((self.as_f64()? - other.as_f64()?).abs()),
        }
    }
}

impl PartialEq for CoordinateValue {
    fn eq(&self, other: &Self) -> bool {
        self.partial_cmp(other) == Some(Ordering::Equal)
    }
}

impl PartialOrd for CoordinateValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Self::Int(a), Self::Int(b)) => a.partial_cmp(b),
            (Self::Time(a), Self::Time(b)) => a.partial_cmp(b),
            _ => self.as_f64()?.partial_cmp(&other.as_f64()?),
        }
    }
}

#[allow(clippy::cast_precision_loss)]
pub(crate) fn duration_seconds(duration: Duration) -> f64 {
    duration.num_milliseconds() as f64 / 1000.0
}

/// A coordinate step, the spacing of a regularly sampled dimension.
#[derive(Clone, Copy, Debug, PartialEq, Display, From)]
pub enum Step {
    /// An integer step.
    #[display("{_0}")]
    Int(i64),
    /// A floating point step.
    #[display("{_0}")]
    Float(f64),
    /// A duration step for date-time coordinates.
    #[display("{_0}")]
    Duration(Duration),
}

impl Step {
    /// Return the step as a [`f64`] if it is numeric.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(step) => Some(*step as f64),
            Self::Float(step) => Some(*step),
            Self::Duration(_) => None,
        }
    }

    /// Multiply the step by `factor`.
    ///
    /// Returns [`None`] on overflow.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn multiply(&self, factor: usize) -> Option<Self> {
        match self {
            Self::Int(step) => step.checked_mul(i64::try_from(factor).ok()?).map(Self::Int),
            Self::Float(step) => Some(Self::Float(step * factor as f64)),
            Self::Duration(step) => step
                .checked_mul(i32::try_from(factor).ok()?)
                .map(Self::Duration),
        }
    }
}

/// The ordered coordinates of a dimension.
#[derive(Clone, Debug, From)]
pub enum Coordinates {
    /// Integer coordinates.
    Int(Vec<i64>),
    /// Floating point coordinates.
    Float(Vec<f64>),
    /// Date-time coordinates.
    Time(Vec<NaiveDateTime>),
}

impl Coordinates {
    /// Collect coordinates from individual values.
    ///
    /// Integer values collect as integers, a mix of integer and floating point values as floating point.
    /// Returns [`None`] if date-times are mixed with numbers.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn from_values(values: &[CoordinateValue]) -> Option<Self> {
        if let Some(values) = values
            .iter()
            .map(|value| match value {
                CoordinateValue::Int(value) => Some(*value),
                _ => None,
            })
            .collect::<Option<Vec<_>>>()
        {
            Some(Self::Int(values))
        } else if let Some(values) = values
            .iter()
            .map(CoordinateValue::as_time)
            .collect::<Option<Vec<_>>>()
        {
            Some(Self::Time(values))
        } else {
            values
                .iter()
                .map(CoordinateValue::as_f64)
                .collect::<Option<Vec<_>>>()
                .map(Self::Float)
        }
    }

    /// The number of coordinates.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Int(values) => values.len(),
            Self::Float(values) => values.len(),
            Self::Time(values) => values.len(),
        }
    }

    /// Returns true if there are no coordinates.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns true if the coordinates are date-times.
    #[must_use]
    pub fn is_time(&self) -> bool {
        matches!(self, Self::Time(_))
    }

    /// Get the coordinate at `index`.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<CoordinateValue> {
        match self {
            Self::Int(values) => values.get(index).copied().map(CoordinateValue::Int),
            Self::Float(values) => values.get(index).copied().map(CoordinateValue::Float),
            Self::Time(values) => values.get(index).copied().map(CoordinateValue::Time),
        }
    }

    /// The first coordinate.
    #[must_use]
    pub fn first(&self) -> Option<CoordinateValue> {
        self.get(0)
    }

    /// The last coordinate.
    #[must_use]
    pub fn last(&self) -> Option<CoordinateValue> {
        self.len().checked_sub(1).and_then(|index| self.get(index))
    }

    /// Iterate over the coordinates.
    pub fn iter(&self) -> impl Iterator<Item = CoordinateValue> + '_ {
        (0..self.len()).filter_map(move |index| self.get(index))
    }

    /// Return numeric coordinates as [`f64`]s, or [`None`] for date-times.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn to_f64(&self) -> Option<Vec<f64>> {
        match self {
            Self::Int(values) => Some(values.iter().map(|value| *value as f64).collect()),
            Self::Float(values) => Some(values.clone()),
            Self::Time(_) => None,
        }
    }

    /// Position of the first coordinate equal to `value`.
    #[must_use]
    pub fn position(&self, value: &CoordinateValue) -> Option<usize> {
        self.iter().position(|coordinate| coordinate == *value)
    }

    /// Position of the coordinate closest to `value`, the first on ties.
    #[must_use]
    pub fn nearest(&self, value: &CoordinateValue) -> Option<usize> {
        self.iter()
            .enumerate()
            .filter_map(|(index, coordinate)| Some((index, coordinate.distance(value)?)))
            .min_by(|(_, a), (_, b)| a.total_cmp(b))
            .map(|(index, _)| index)
    }

    /// Select the coordinates at `indices`.
    ///
    /// Indices beyond the end of the coordinates are skipped.
    #[must_use]
    pub fn select(&self, indices: &[usize]) -> Self {
        match self {
            Self::Int(values) => Self::Int(pick(values, indices)),
            Self::Float(values) => Self::Float(pick(values, indices)),
            Self::Time(values) => Self::Time(pick(values, indices)),
        }
    }

    /// Append `other` to these coordinates.
    ///
    /// Integer and floating point coordinates combine as floating point.
    /// Returns [`None`] if date-times are combined with numbers.
    #[must_use]
    pub fn concat(&self, other: &Self) -> Option<Self> {
        match (self, other) {
            (Self::Int(a), Self::Int(b)) => Some(Self::Int([a.as_slice(), b.as_slice()].concat())),
            (Self::Time(a), Self::Time(b)) => {
                Some(Self::Time([a.as_slice(), b.as_slice()].concat()))
            }
            (Self::Time(_), _) | (_, Self::Time(_)) => None,
            _ => Some(Self::Float([self.to_f64()?, other.to_f64()?].concat())),
        }
    }

    /// The order of the coordinates.
    #[must_use]
    pub fn order(&self) -> Order {
        if self.iter().tuple_windows().all(|(a, b)| a <= b) {
            Order::Forward
        } else if self.iter().tuple_windows().all(|(a, b)| a >= b) {
            Order::Reverse
        } else {
            Order::Unordered
        }
    }

    /// Returns true if consecutive coordinates are separated by exactly `step`.
    ///
    /// Floating point spacing is compared with a small relative tolerance.
    #[must_use]
    pub fn is_regular(&self, step: &Step) -> bool {
        match (self, step) {
            (Self::Int(values), Step::Int(step)) => values
                .iter()
                .tuple_windows()
                .all(|(a, b)| b.checked_sub(*a) == Some(*step)),
            (Self::Time(values), Step::Duration(step)) => values
                .iter()
                .tuple_windows()
                .all(|(a, b)| *b - *a == *step),
            (Self::Time(_), _) | (_, Step::Duration(_)) => false,
            _ => {
                let (Some(values), Some(step)) = (self.to_f64(), step.as_f64()) else {
                    return false;
                };
                let tolerance = 1e-9 * step.abs().max(1.0);
                values
                    .iter()
                    .tuple_windows()
                    .all(|(a, b)| (b - a - step).abs() <= tolerance)
            }
        }
    }
}

fn pick<T: Copy>(values: &[T], indices: &[usize]) -> Vec<T> {
    indices
        .iter()
        .filter_map(|index| values.get(*index).copied())
        .collect()
}

/// Coordinates are equal if they have the same length and equal values.
///
/// Integer coordinates equal floating point coordinates with the same values.
impl PartialEq for Coordinates {
    #[allow(clippy::float_cmp)]
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::Time(a), Self::Time(b)) => a == b,
            _ => match (self.to_f64(), other.to_f64()) {
                (Some(a), Some(b)) => a == b,
                _ => false,
            },
        }
    }
}
