use chrono::{Duration, NaiveDateTime};
use derive_more::Display;
use serde::{Deserialize, Serialize};

use crate::{
    dimension::{
        CoordinateValue, Coordinates, Dimension, DimensionError, DimensionName, Locus, Sampling,
        Span, Step,
    },
    metadata::Metadata,
    source::DataType,
};

/// The JSON header of a grid stack file.
///
/// An example header:
/// ```json
/// {
///     "attributes": { "title": "soil moisture" },
///     "dimensions": [
///         {
///             "name": "y",
///             "coordinates": { "range": { "start": 45.0, "step": -0.5, "len": 4 } },
///             "sampling": { "type": "intervals", "locus": "center", "span": { "regular": -0.5 } },
///             "crs": "EPSG:4326"
///         },
///         { "name": "x", "coordinates": { "int": [100, 110, 120] } },
///         { "name": "time", "coordinates": { "time": ["2016-01-01T00:00:00", "2016-01-02T00:00:00"] } }
///     ],
///     "layers": [
///         {
///             "name": "sm_surface",
///             "dimensions": ["y", "x"],
///             "data_type": "float32",
///             "missing_value": -9999.0,
///             "attributes": { "units": "m3 m-3" },
///             "offset": 0
///         }
///     ]
/// }
/// ```
#[derive(Serialize, Deserialize, Clone, PartialEq, Debug, Display)]
#[display("{}", serde_json::to_string(self).unwrap_or_default())]
pub struct GridStackHeader {
    /// File attributes.
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub attributes: Metadata,
    /// The dimensions shared by the layers.
    pub dimensions: Vec<DimensionMetadata>,
    /// The layers, in file order.
    pub layers: Vec<GridStackLayerMetadata>,
}

/// The metadata of a dimension.
#[derive(Serialize, Deserialize, Clone, PartialEq, Debug)]
pub struct DimensionMetadata {
    /// The dimension name.
    pub name: DimensionName,
    /// The coordinates.
    pub coordinates: CoordinatesMetadata,
    /// The sampling. Defaults to points.
    #[serde(default, skip_serializing_if = "SamplingMetadata::is_points")]
    pub sampling: SamplingMetadata,
    /// The coordinate reference system.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crs: Option<String>,
}

/// The coordinates of a dimension, as explicit values or a range.
#[derive(Serialize, Deserialize, Clone, PartialEq, Debug)]
#[serde(rename_all = "snake_case")]
pub enum CoordinatesMetadata {
    /// Integer coordinates.
    Int(Vec<i64>),
    /// Floating point coordinates.
    Float(Vec<f64>),
    /// Date-time coordinates, as ISO 8601 strings without a time zone.
    Time(Vec<NaiveDateTime>),
    /// `len` coordinates from `start` in increments of `step`.
    Range {
        /// The first coordinate.
        start: BoundMetadata,
        /// The increment.
        step: StepMetadata,
        /// The number of coordinates.
        len: usize,
    },
}

/// The sampling of a dimension.
#[derive(Serialize, Deserialize, Clone, PartialEq, Debug, Default)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SamplingMetadata {
    /// Point sampling.
    #[default]
    Points,
    /// Interval sampling.
    Intervals {
        /// The locus. Defaults to center.
        #[serde(default)]
        locus: Locus,
        /// The span.
        span: SpanMetadata,
    },
}

impl SamplingMetadata {
    fn is_points(&self) -> bool {
        matches!(self, Self::Points)
    }
}

/// The span of interval sampling.
#[derive(Serialize, Deserialize, Clone, PartialEq, Debug)]
#[serde(rename_all = "lowercase")]
pub enum SpanMetadata {
    /// A constant step.
    Regular(StepMetadata),
    /// Irregular cells, with the outer bounds of the axis.
    Irregular {
        /// The outer edge of the first cell.
        lower: BoundMetadata,
        /// The outer edge of the last cell.
        upper: BoundMetadata,
    },
}

/// A numeric step, or a duration in seconds.
#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Debug)]
#[serde(untagged)]
pub enum StepMetadata {
    /// An integer step.
    Int(i64),
    /// A floating point step.
    Float(f64),
    /// A duration step.
    Duration {
        /// The duration in seconds.
        seconds: i64,
    },
}

/// A coordinate value.
#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Debug)]
#[serde(untagged)]
pub enum BoundMetadata {
    /// An integer value.
    Int(i64),
    /// A floating point value.
    Float(f64),
    /// A date-time value.
    Time(NaiveDateTime),
}

/// The metadata of a layer.
#[derive(Serialize, Deserialize, Clone, PartialEq, Debug)]
pub struct GridStackLayerMetadata {
    /// The layer name.
    pub name: String,
    /// The names of the layer dimensions, a subset of the file dimensions.
    pub dimensions: Vec<DimensionName>,
    /// The stored data type.
    pub data_type: DataType,
    /// The missing-value sentinel.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub missing_value: Option<f64>,
    /// Layer attributes.
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub attributes: Metadata,
    /// The offset of the layer data from the end of the header, in bytes.
    pub offset: u64,
}

impl From<StepMetadata> for Step {
    fn from(step: StepMetadata) -> Self {
        match step {
            StepMetadata::Int(step) => Self::Int(step),
            StepMetadata::Float(step) => Self::Float(step),
            StepMetadata::Duration { seconds } => Self::Duration(Duration::seconds(seconds)),
        }
    }
}

impl From<BoundMetadata> for CoordinateValue {
    fn from(bound: BoundMetadata) -> Self {
        match bound {
            BoundMetadata::Int(value) => Self::Int(value),
            BoundMetadata::Float(value) => Self::Float(value),
            BoundMetadata::Time(value) => Self::Time(value),
        }
    }
}

impl From<SamplingMetadata> for Sampling {
    fn from(sampling: SamplingMetadata) -> Self {
        match sampling {
            SamplingMetadata::Points => Self::Points,
            SamplingMetadata::Intervals { locus, span } => Self::Intervals {
                locus,
                span: match span {
                    SpanMetadata::Regular(step) => Span::Regular(step.into()),
                    SpanMetadata::Irregular { lower, upper } => Span::Irregular {
                        lower: lower.into(),
                        upper: upper.into(),
                    },
                },
            },
        }
    }
}

impl CoordinatesMetadata {
    /// The number of coordinates.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Int(values) => values.len(),
            Self::Float(values) => values.len(),
            Self::Time(values) => values.len(),
            Self::Range { len, .. } => *len,
        }
    }

    /// Returns true if there are no coordinates.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Convert to [`Coordinates`].
    ///
    /// # Errors
    /// Returns [`DimensionError::IncompatibleStep`] if the step of a range does not suit its start.
    #[allow(clippy::cast_precision_loss)]
    pub fn to_coordinates(&self, name: &DimensionName) -> Result<Coordinates, DimensionError> {
        Ok(match self {
            Self::Int(values) => Coordinates::Int(values.clone()),
            Self::Float(values) => Coordinates::Float(values.clone()),
            Self::Time(values) => Coordinates::Time(values.clone()),
            Self::Range { start, step, len } => {
                let incompatible = || DimensionError::IncompatibleStep {
                    dimension: name.clone(),
                    step: (*step).into(),
                };
                match (start, step) {
                    (BoundMetadata::Int(start), StepMetadata::Int(step)) => Coordinates::Int(
                        (0..*len)
                            .map(|i| {
                                i64::try_from(i)
                                    .ok()
                                    .and_then(|i| step.checked_mul(i))
                                    .and_then(|offset| start.checked_add(offset))
                            })
                            .collect::<Option<_>>()
                            .ok_or_else(incompatible)?,
                    ),
                    (BoundMetadata::Time(start), StepMetadata::Duration { seconds }) => {
                        Coordinates::Time(
                            (0..*len)
                                .map(|i| {
                                    i32::try_from(i)
                                        .ok()
                                        .and_then(|i| Duration::seconds(*seconds).checked_mul(i))
                                        .and_then(|offset| start.checked_add_signed(offset))
                                })
                                .collect::<Option<_>>()
                                .ok_or_else(incompatible)?,
                        )
                    }
                    (BoundMetadata::Time(_), _) | (_, StepMetadata::Duration { .. }) => {
                        return Err(incompatible());
                    }
                    (start, step) => {
                        let start = CoordinateValue::from(*start)
                            .as_f64()
                            .ok_or_else(incompatible)?;
                        let step = Step::from(*step).as_f64().ok_or_else(incompatible)?;
                        Coordinates::Float((0..*len).map(|i| start + step * i as f64).collect())
                    }
                }
            }
        })
    }
}

impl DimensionMetadata {
    /// Convert to a [`Dimension`].
    ///
    /// # Errors
    /// Returns a [`DimensionError`] if the coordinates are invalid or the sampling does not suit them.
    pub fn to_dimension(&self) -> Result<Dimension, DimensionError> {
        let coordinates = self.coordinates.to_coordinates(&self.name)?;
        let dimension = Dimension::new_with_sampling(
            self.name.clone(),
            coordinates,
            self.sampling.clone().into(),
        )?;
        Ok(match &self.crs {
            Some(crs) => dimension.with_crs(crs.as_str()),
            None => dimension,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grid_stack_header_parse() {
        let json = r#"{
            "dimensions": [
                {
                    "name": "y",
                    "coordinates": { "range": { "start": 45.0, "step": -0.5, "len": 4 } },
                    "sampling": { "type": "intervals", "span": { "regular": -0.5 } },
                    "crs": "EPSG:4326"
                },
                { "name": "x", "coordinates": { "int": [100, 110, 120] } },
                {
                    "name": "time",
                    "coordinates": { "range": { "start": "2016-01-01T00:00:00", "step": { "seconds": 3600 }, "len": 3 } },
                    "sampling": { "type": "intervals", "locus": "start", "span": { "regular": { "seconds": 3600 } } }
                }
            ],
            "layers": [
                { "name": "sm", "dimensions": ["y", "x"], "data_type": "float32", "offset": 0 }
            ]
        }"#;
        let header: GridStackHeader = serde_json::from_str(json).unwrap();
        assert!(header.attributes.is_empty());
        assert_eq!(header.layers[0].missing_value, None);

        let y = header.dimensions[0].to_dimension().unwrap();
        assert_eq!(y.coordinates(), &Coordinates::Float(vec![45.0, 44.5, 44.0, 43.5]));
        assert_eq!(y.locus(), Some(Locus::Center));
        assert_eq!(y.crs().map(|crs| crs.as_str()), Some("EPSG:4326"));

        let x = header.dimensions[1].to_dimension().unwrap();
        assert!(x.sampling().is_points());

        let time = header.dimensions[2].to_dimension().unwrap();
        assert_eq!(time.len(), 3);
        assert!(time.coordinates().is_time());
        assert_eq!(
            time.sampling(),
            &Sampling::regular(Duration::hours(1), Locus::Start)
        );
    }

    #[test]
    fn grid_stack_header_range_int() {
        let coordinates = CoordinatesMetadata::Range {
            start: BoundMetadata::Int(10),
            step: StepMetadata::Int(-5),
            len: 3,
        };
        assert_eq!(
            coordinates.to_coordinates(&"x".into()).unwrap(),
            Coordinates::Int(vec![10, 5, 0])
        );
    }

    #[test]
    fn grid_stack_header_range_invalid() {
        let coordinates = CoordinatesMetadata::Range {
            start: BoundMetadata::Float(1.0),
            step: StepMetadata::Duration { seconds: 60 },
            len: 3,
        };
        assert!(matches!(
            coordinates.to_coordinates(&"x".into()),
            Err(DimensionError::IncompatibleStep { .. })
        ));

        // A duration step on numeric coordinates
        let dimension = DimensionMetadata {
            name: "x".into(),
            coordinates: CoordinatesMetadata::Int(vec![0, 1]),
            sampling: SamplingMetadata::Intervals {
                locus: Locus::Center,
                span: SpanMetadata::Regular(StepMetadata::Duration { seconds: 1 }),
            },
            crs: None,
        };
        assert!(dimension.to_dimension().is_err());
    }
}
