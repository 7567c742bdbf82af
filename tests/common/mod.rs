#![allow(dead_code)]

use std::{fs::File, io::Write, path::Path};

use rasterstack::source::GRID_STACK_MAGIC;

/// Write a grid stack file with `header` followed by `data`.
pub fn write_gsf(path: &Path, header: &serde_json::Value, data: &[u8]) -> std::io::Result<()> {
    let header = serde_json::to_vec(header)?;
    let mut file = File::create(path)?;
    file.write_all(GRID_STACK_MAGIC)?;
    file.write_all(&(header.len() as u64).to_le_bytes())?;
    file.write_all(&header)?;
    file.write_all(data)
}

/// Write a grid stack file with two layers.
///
/// `elevation` is a float32 `[y, x]` layer with values `value + i`.
/// `rainfall` is a float64 `[band, y, x]` layer with values `10 * value + i` and missing value `-9999`.
pub fn write_grid(path: &Path, value: f64) -> std::io::Result<()> {
    let header = serde_json::json!({
        "attributes": { "source": "synthetic" },
        "dimensions": [
            { "name": "y", "coordinates": { "float": [1.5, 0.5] }, "crs": "EPSG:4326" },
            { "name": "x", "coordinates": { "range": { "start": 0.5, "step": 1.0, "len": 3 } }, "crs": "EPSG:4326" },
            { "name": "band", "coordinates": { "int": [1, 2] } }
        ],
        "layers": [
            { "name": "elevation", "dimensions": ["y", "x"], "data_type": "float32", "attributes": { "units": "m" }, "offset": 0 },
            { "name": "rainfall", "dimensions": ["band", "y", "x"], "data_type": "float64", "missing_value": -9999.0, "offset": 24 }
        ]
    });
    #[allow(clippy::cast_possible_truncation)]
    let mut data: Vec<u8> = (0..6)
        .flat_map(|i| ((value + f64::from(i)) as f32).to_le_bytes())
        .collect();
    data.extend((0..12).flat_map(|i| (10.0 * value + f64::from(i)).to_le_bytes()));
    write_gsf(path, &header, &data)
}

/// Write a grid stack file with one int16 layer `name` over an `x` dimension with coordinates `x`.
pub fn write_single(path: &Path, name: &str, x: &[i64]) -> std::io::Result<()> {
    let header = serde_json::json!({
        "dimensions": [
            { "name": "x", "coordinates": { "int": x } }
        ],
        "layers": [
            { "name": name, "dimensions": ["x"], "data_type": "int16", "offset": 0 }
        ]
    });
    let data: Vec<u8> = (0..x.len())
        .flat_map(|i| i16::try_from(i).unwrap_or_default().to_le_bytes())
        .collect();
    write_gsf(path, &header, &data)
}
