//! The grid stack file format (`gsf`).
//!
//! A grid stack file holds several named layers sharing one set of dimensions:
//!
//! | Bytes                     | Content                                           |
//! |---------------------------|---------------------------------------------------|
//! | `0..4`                    | The magic [`GRID_STACK_MAGIC`] (`GSF1`)           |
//! | `4..12`                   | The header length `n`, a little-endian [`u64`]    |
//! | `12..12+n`                | The JSON [`GridStackHeader`]                      |
//! | `12+n..`                  | Layer data, little-endian and row-major           |
//!
//! Each layer records the offset of its data from the end of the header.
//! Windowed reads only read the contiguous runs of elements in the requested region.

mod grid_stack_metadata;

pub use grid_stack_metadata::{
    BoundMetadata, CoordinatesMetadata, DimensionMetadata, GridStackHeader,
    GridStackLayerMetadata, SamplingMetadata, SpanMetadata, StepMetadata,
};

use std::{
    collections::HashSet,
    fs::File,
    path::{Path, PathBuf},
};

use crate::{
    byte_range::{read_byte_ranges_concat, validate_byte_ranges, ByteRange},
    dimension::{Dimension, DimensionError},
    layer::LayerKey,
    metadata::Metadata,
    window::ReadRegion,
};

use super::{
    LayerInfo, PathCoordinateParser, SourceError, SourceFormat, SourceHandle,
};

/// The magic bytes at the start of a grid stack file.
pub const GRID_STACK_MAGIC: &[u8; 4] = b"GSF1";

const PREAMBLE_LENGTH: u64 = 12;

/// The grid stack file format.
#[derive(Clone, Debug, Default)]
pub struct GridStackFormat {
    path_parser: Option<PathCoordinateParser>,
}

impl GridStackFormat {
    /// Create a new grid stack file format.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the parser for series coordinates in file names.
    #[must_use]
    pub fn with_path_parser(mut self, path_parser: PathCoordinateParser) -> Self {
        self.path_parser = Some(path_parser);
        self
    }
}

impl SourceFormat for GridStackFormat {
    fn name(&self) -> &str {
        "gsf"
    }

    fn extensions(&self) -> &[&'static str] {
        &["gsf"]
    }

    fn open(&self, path: &Path) -> Result<Box<dyn SourceHandle>, SourceError> {
        Ok(Box::new(GridStackHandle::open(path)?))
    }

    fn path_parser(&self) -> Option<&PathCoordinateParser> {
        self.path_parser.as_ref()
    }
}

#[derive(Debug)]
struct GridStackLayer {
    key: LayerKey,
    info: LayerInfo,
    offset: u64,
}

/// An open grid stack file.
#[derive(Debug)]
pub struct GridStackHandle {
    path: PathBuf,
    file: File,
    attributes: Metadata,
    dimensions: Vec<Dimension>,
    layers: Vec<GridStackLayer>,
    data_start: u64,
}

impl GridStackHandle {
    /// Open a grid stack file and read its header.
    ///
    /// # Errors
    /// Returns a [`SourceError`] if the file cannot be read, the header is invalid, or a layer extends past the end of the file.
    pub fn open(path: &Path) -> Result<Self, SourceError> {
        let invalid = |reason: String| SourceError::InvalidHeader {
            path: path.to_path_buf(),
            reason,
        };

        let mut file = File::open(path)?;
        let file_length = file.metadata()?.len();
        if file_length < PREAMBLE_LENGTH {
            return Err(invalid(format!("file is only {file_length} bytes")));
        }
        let preamble = read_byte_ranges_concat(&mut file, &[ByteRange::new(0, PREAMBLE_LENGTH)])?;
        let (magic, header_length) = preamble.split_at(GRID_STACK_MAGIC.len());
        if magic != GRID_STACK_MAGIC {
            return Err(invalid("missing GSF1 magic".to_string()));
        }
        let header_length = u64::from_le_bytes(bytemuck::pod_read_unaligned(header_length));
        if header_length > file_length - PREAMBLE_LENGTH {
            return Err(invalid(format!(
                "header length {header_length} exceeds the file length {file_length}"
            )));
        }
        let header_range = ByteRange::new(PREAMBLE_LENGTH, header_length);
        let header = read_byte_ranges_concat(&mut file, &[header_range])?;
        let header: GridStackHeader = serde_json::from_slice(&header)?;

        // Every coordinate of a dimension needs at least one byte of layer data
        for dimension in &header.dimensions {
            let len = dimension.coordinates.len();
            if u64::try_from(len).map_or(true, |len| len > file_length) {
                return Err(invalid(format!(
                    "dimension {} has {len} coordinates, more than the file length {file_length}",
                    dimension.name
                )));
            }
        }

        let dimensions = header
            .dimensions
            .iter()
            .map(DimensionMetadata::to_dimension)
            .collect::<Result<Vec<_>, _>>()?;
        let mut names = HashSet::new();
        for dimension in &dimensions {
            if !names.insert(dimension.name()) {
                return Err(DimensionError::DuplicateDimension(dimension.name().clone()).into());
            }
        }

        let data_start = header_range.end();
        let mut keys = HashSet::new();
        let mut layers = Vec::with_capacity(header.layers.len());
        for layer in header.layers {
            let key = LayerKey::new(&layer.name);
            if !key.is_valid() || !keys.insert(key.clone()) {
                return Err(invalid(format!("invalid or duplicate layer name {:?}", layer.name)));
            }
            let shape = layer
                .dimensions
                .iter()
                .map(|name| {
                    dimensions
                        .iter()
                        .find(|dimension| dimension.name() == name)
                        .map(Dimension::len)
                        .ok_or_else(|| {
                            invalid(format!("layer {key} has unknown dimension {name}"))
                        })
                })
                .collect::<Result<Vec<_>, _>>()?;
            let size_bytes = shape
                .iter()
                .try_fold(layer.data_type.size() as u64, |size, len| {
                    size.checked_mul(u64::try_from(*len).ok()?)
                })
                .ok_or_else(|| invalid(format!("layer {key} size overflows")))?;
            let offset = data_start
                .checked_add(layer.offset)
                .ok_or_else(|| invalid(format!("layer {key} offset {} overflows", layer.offset)))?;
            validate_byte_ranges(&[ByteRange::new(offset, size_bytes)], file_length)?;
            let info = LayerInfo {
                dimensions: layer.dimensions,
                shape,
                data_type: layer.data_type,
                missing_value: layer.missing_value,
                metadata: layer.attributes,
            };
            layers.push(GridStackLayer {
                key,
                info,
                offset: layer.offset,
            });
        }

        Ok(Self {
            path: path.to_path_buf(),
            file,
            attributes: header.attributes,
            dimensions,
            layers,
            data_start,
        })
    }

    fn layer(&self, key: &LayerKey) -> Result<&GridStackLayer, SourceError> {
        self.layers
            .iter()
            .find(|layer| &layer.key == key)
            .ok_or_else(|| SourceError::UnknownLayer {
                path: self.path.clone(),
                layer: key.clone(),
            })
    }
}

impl SourceHandle for GridStackHandle {
    fn path(&self) -> &Path {
        &self.path
    }

    fn layer_keys(&self) -> Result<Vec<LayerKey>, SourceError> {
        Ok(self.layers.iter().map(|layer| layer.key.clone()).collect())
    }

    fn dimensions(&self) -> Result<Vec<Dimension>, SourceError> {
        Ok(self.dimensions.clone())
    }

    fn attributes(&self) -> Result<Metadata, SourceError> {
        Ok(self.attributes.clone())
    }

    fn layer_info(&self, layer: &LayerKey) -> Result<LayerInfo, SourceError> {
        Ok(self.layer(layer)?.info.clone())
    }

    fn read(&mut self, layer: &LayerKey, region: &ReadRegion) -> Result<Vec<f64>, SourceError> {
        let (info, base) = {
            let layer = self.layer(layer)?;
            (layer.info.clone(), self.data_start + layer.offset)
        };
        let byte_ranges: Vec<ByteRange> = region
            .byte_ranges(&info.shape, info.data_type.size())?
            .iter()
            .map(|byte_range| byte_range.shifted(base))
            .collect();
        tracing::trace!(
            path = %self.path.display(),
            %layer,
            elements = region.num_elements(),
            runs = byte_ranges.len(),
            "windowed read"
        );
        let bytes = read_byte_ranges_concat(&mut self.file, &byte_ranges)?;
        let elements = info.data_type.decode_le(&bytes);
        if elements.len() == region.num_elements() {
            Ok(elements)
        } else {
            Err(SourceError::UnexpectedLength {
                expected: region.num_elements(),
                got: elements.len(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use crate::{
        dimension::CoordinateValue,
        source::{open_and_read, DataType},
        window::AxisIndex,
    };

    use super::*;

    fn write_gsf(path: &Path, header: &serde_json::Value, data: &[u8]) {
        let header = serde_json::to_vec(header).unwrap();
        let mut file = File::create(path).unwrap();
        file.write_all(GRID_STACK_MAGIC).unwrap();
        file.write_all(&(header.len() as u64).to_le_bytes()).unwrap();
        file.write_all(&header).unwrap();
        file.write_all(data).unwrap();
    }

    fn example(path: &Path) {
        let header = serde_json::json!({
            "attributes": { "title": "example" },
            "dimensions": [
                { "name": "y", "coordinates": { "float": [1.5, 0.5] } },
                { "name": "x", "coordinates": { "range": { "start": 0, "step": 1, "len": 3 } } },
                { "name": "band", "coordinates": { "int": [1, 2] } }
            ],
            "layers": [
                { "name": "a", "dimensions": ["y", "x"], "data_type": "int16", "missing_value": -1, "offset": 0 },
                { "name": "b", "dimensions": ["band", "y", "x"], "data_type": "float64", "attributes": { "units": "K" }, "offset": 12 }
            ]
        });
        let mut data: Vec<u8> = (0i16..6).flat_map(i16::to_le_bytes).collect();
        data.extend((0..12).flat_map(|i| (f64::from(i) * 0.5).to_le_bytes()));
        write_gsf(path, &header, &data);
    }

    #[test]
    fn grid_stack_open() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("example.gsf");
        example(&path);

        let handle = GridStackHandle::open(&path).unwrap();
        assert_eq!(
            handle.layer_keys().unwrap(),
            vec![LayerKey::new("a"), LayerKey::new("b")]
        );
        assert_eq!(handle.dimensions().unwrap().len(), 3);
        assert_eq!(handle.attributes().unwrap()["title"], "example");
        let info = handle.layer_info(&"b".into()).unwrap();
        assert_eq!(info.shape, vec![2, 2, 3]);
        assert_eq!(info.data_type, DataType::Float64);
        assert_eq!(info.size_bytes(), 96);
        assert_eq!(info.metadata["units"], "K");
        assert_eq!(handle.layer_info(&"a".into()).unwrap().missing_value, Some(-1.0));
        assert!(matches!(
            handle.layer_info(&"c".into()),
            Err(SourceError::UnknownLayer { .. })
        ));
        assert_eq!(
            handle.dimensions().unwrap()[1].coordinates().get(2),
            Some(CoordinateValue::Int(2))
        );
    }

    #[test]
    fn grid_stack_read_window() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("example.gsf");
        example(&path);

        let format = GridStackFormat::new();
        let elements = open_and_read(&format, &path, |handle| {
            handle.read(
                &"b".into(),
                &ReadRegion::new(vec![
                    AxisIndex::Scalar(1),
                    AxisIndex::full(2),
                    AxisIndex::Slice(vec![1, 2]),
                ]),
            )
        })
        .unwrap();
        assert_eq!(elements, vec![3.5, 4.0, 5.0, 5.5]);

        let elements = open_and_read(&format, &path, |handle| {
            handle.read(&"a".into(), &ReadRegion::new_with_shape(&[2, 3]))
        })
        .unwrap();
        assert_eq!(elements, vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0]);

        let result = open_and_read(&format, &path, |handle| {
            handle.read(&"a".into(), &ReadRegion::new_with_shape(&[2, 4]))
        });
        assert!(matches!(result, Err(SourceError::WindowError(_))));
    }

    #[test]
    fn grid_stack_invalid() {
        let dir = tempfile::tempdir().unwrap();

        let path = dir.path().join("magic.gsf");
        std::fs::write(&path, b"GSF2\0\0\0\0\0\0\0\0").unwrap();
        assert!(matches!(
            GridStackHandle::open(&path),
            Err(SourceError::InvalidHeader { .. })
        ));

        let path = dir.path().join("short.gsf");
        let header = serde_json::json!({
            "dimensions": [{ "name": "x", "coordinates": { "int": [0, 1, 2, 3] } }],
            "layers": [{ "name": "a", "dimensions": ["x"], "data_type": "int32", "offset": 0 }]
        });
        write_gsf(&path, &header, &[0; 8]);
        assert!(matches!(
            GridStackHandle::open(&path),
            Err(SourceError::InvalidByteRangeError(_))
        ));

        let path = dir.path().join("unknown_dimension.gsf");
        let header = serde_json::json!({
            "dimensions": [],
            "layers": [{ "name": "a", "dimensions": ["x"], "data_type": "uint8", "offset": 0 }]
        });
        write_gsf(&path, &header, &[0; 8]);
        assert!(matches!(
            GridStackHandle::open(&path),
            Err(SourceError::InvalidHeader { .. })
        ));

        assert!(matches!(
            GridStackHandle::open(&dir.path().join("missing.gsf")),
            Err(SourceError::IOError(_))
        ));
    }

    #[test]
    fn grid_stack_corrupt_lengths() {
        let dir = tempfile::tempdir().unwrap();

        let path = dir.path().join("header_length.gsf");
        let mut bytes = GRID_STACK_MAGIC.to_vec();
        bytes.extend((u64::MAX - 5).to_le_bytes());
        bytes.extend(b"{}");
        std::fs::write(&path, bytes).unwrap();
        assert!(matches!(
            GridStackHandle::open(&path),
            Err(SourceError::InvalidHeader { .. })
        ));

        let path = dir.path().join("offset.gsf");
        let header = serde_json::json!({
            "dimensions": [{ "name": "x", "coordinates": { "int": [0, 1] } }],
            "layers": [{ "name": "a", "dimensions": ["x"], "data_type": "uint8", "offset": u64::MAX - 1 }]
        });
        write_gsf(&path, &header, &[0; 2]);
        assert!(matches!(
            GridStackHandle::open(&path),
            Err(SourceError::InvalidHeader { .. })
        ));

        let path = dir.path().join("range_length.gsf");
        let header = serde_json::json!({
            "dimensions": [
                { "name": "x", "coordinates": { "range": { "start": 0, "step": 1, "len": usize::MAX } } }
            ],
            "layers": []
        });
        write_gsf(&path, &header, &[]);
        assert!(matches!(
            GridStackHandle::open(&path),
            Err(SourceError::InvalidHeader { .. })
        ));

        let path = dir.path().join("layer_size.gsf");
        let header = serde_json::json!({
            "dimensions": [
                { "name": "y", "coordinates": { "range": { "start": 0, "step": 1, "len": 64 } } },
                { "name": "x", "coordinates": { "range": { "start": 0, "step": 1, "len": 64 } } }
            ],
            "layers": [{ "name": "a", "dimensions": ["y", "x"], "data_type": "float64", "offset": 0 }]
        });
        write_gsf(&path, &header, &[0; 64]);
        assert!(matches!(
            GridStackHandle::open(&path),
            Err(SourceError::InvalidByteRangeError(_))
        ));
    }
}
