mod common;

use std::sync::Arc;

use chrono::NaiveDate;
use rasterstack::{
    dimension::{Coordinates, Locus, Sampling},
    layer::LayerKey,
    series::{SeriesBuilder, SeriesError, SeriesOrder},
    source::{GridStackFormat, PathCoordinateParser},
    window::{Indexer, Selector, Window},
};

use common::{write_grid, write_single};

fn format() -> Arc<GridStackFormat> {
    Arc::new(
        GridStackFormat::new()
            .with_path_parser(PathCoordinateParser::date(r"\d{8}", "%Y%m%d").unwrap()),
    )
}

fn date(day: u32) -> chrono::NaiveDateTime {
    NaiveDate::from_ymd_opt(2020, 1, day)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
}

#[test]
fn series_directory() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    write_grid(&dir.path().join("grid_20200103.gsf"), 3.0)?;
    write_grid(&dir.path().join("grid_20200101.gsf"), 1.0)?;
    write_grid(&dir.path().join("grid_latest.gsf"), 9.0)?;
    std::fs::write(dir.path().join("readme_20200102.txt"), b"")?;
    std::fs::create_dir(dir.path().join("nested_20200104.gsf"))?;

    let scan = SeriesBuilder::new(format()).build_from_dir(dir.path())?;
    assert_eq!(scan.skipped.len(), 1);
    assert!(scan.skipped[0].path().ends_with("grid_latest.gsf"));

    let series = scan.series;
    assert_eq!(series.len(), 2);
    assert_eq!(series.dim().name().as_str(), "time");
    assert_eq!(
        series.dim().coordinates(),
        &Coordinates::Time(vec![date(1), date(3)])
    );
    assert!(series.path(1).is_some_and(|path| path.ends_with("grid_20200103.gsf")));
    assert!(!series.is_materialized(0));

    let elevation = series.read(1, "elevation", &Indexer::named([("y", Selector::Index(0))]))?;
    assert_eq!(elevation.data().as_slice().unwrap(), &[3.0, 4.0, 5.0]);
    assert_eq!(series.stack(0)?.names().collect::<Vec<_>>(), ["elevation", "rainfall"]);

    assert!(matches!(
        series.read(2, "elevation", &Indexer::all()),
        Err(SeriesError::IndexOutOfBounds { index: 2, len: 2 })
    ));
    Ok(())
}

#[test]
fn series_listing_order_and_sampling() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let paths = [
        dir.path().join("grid_20200105.gsf"),
        dir.path().join("grid_20200102.gsf"),
    ];
    write_grid(&paths[0], 5.0)?;
    write_grid(&paths[1], 2.0)?;

    let scan = SeriesBuilder::new(format())
        .order(SeriesOrder::Listing)
        .dimension_name("date")
        .sampling(Sampling::regular(chrono::Duration::days(1), Locus::Start))
        .build_from_paths(&paths)?;
    let dim = scan.series.dim();
    assert_eq!(dim.name().as_str(), "date");
    assert_eq!(dim.coordinates(), &Coordinates::Time(vec![date(5), date(2)]));
    assert_eq!(
        dim.shift_locus(Locus::End)?.coordinates(),
        &Coordinates::Time(vec![date(6), date(3)])
    );
    Ok(())
}

#[test]
fn series_eager_window_combine() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    for day in 1..=3 {
        write_grid(
            &dir.path().join(format!("grid_202001{day:02}.gsf")),
            f64::from(day),
        )?;
    }

    let scan = SeriesBuilder::new(format())
        .eager(true)
        .window(Some(Window::named([("x", Selector::Index(2))])))
        .build_from_dir(dir.path())?;
    let series = scan.series;
    assert!((0..series.len()).all(|index| series.is_materialized(index)));

    let combined = series.combine(Some(&[LayerKey::new("elevation")]))?;
    let elevation = combined.layer("elevation")?;
    let names: Vec<&str> = elevation.dims().iter().map(|d| d.name().as_str()).collect();
    assert_eq!(names, ["y", "time"]);
    assert_eq!(
        elevation.data().as_slice().unwrap(),
        &[3.0, 4.0, 5.0, 6.0, 7.0, 8.0]
    );
    Ok(())
}

#[test]
fn series_errors() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    write_grid(&dir.path().join("grid_first.gsf"), 1.0)?;
    assert!(matches!(
        SeriesBuilder::new(format()).build_from_dir(dir.path()),
        Err(SeriesError::EmptySeries { skipped: 1 })
    ));

    write_grid(&dir.path().join("grid_20200101.gsf"), 1.0)?;
    write_single(&dir.path().join("grid_20200102.gsf"), "elevation", &[0, 1, 2])?;
    let scan = SeriesBuilder::new(format()).build_from_dir(dir.path())?;
    assert!(matches!(
        scan.series.stack(1),
        Err(SeriesError::LayerMismatch { index: 1, .. })
    ));
    assert!(matches!(
        SeriesBuilder::new(format()).build_from_dir(dir.path().join("missing")),
        Err(SeriesError::WalkDirError(_))
    ));
    Ok(())
}
