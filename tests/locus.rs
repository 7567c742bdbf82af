use chrono::{Duration, NaiveDate};
use rasterstack::dimension::{Coordinates, Dimension, DimensionError, Locus};

#[test]
fn locus_shift_cycle() -> Result<(), DimensionError> {
    let dimensions = [
        Dimension::regular("x", vec![3i64, 4, 5], 1i64, Locus::Start)?,
        Dimension::regular("x", vec![-2.5, 0.0, 2.5, 5.0], 2.5, Locus::Start)?,
        Dimension::regular("x", vec![10i64, 7, 4], -3i64, Locus::Start)?,
        Dimension::regular(
            "time",
            vec![
                NaiveDate::from_ymd_opt(2020, 1, 1).unwrap().and_hms_opt(0, 0, 0).unwrap(),
                NaiveDate::from_ymd_opt(2020, 1, 2).unwrap().and_hms_opt(0, 0, 0).unwrap(),
            ],
            Duration::hours(24),
            Locus::Start,
        )?,
    ];
    for dimension in dimensions {
        let cycled = dimension
            .shift_locus(Locus::Center)?
            .shift_locus(Locus::End)?
            .shift_locus(Locus::Start)?;
        assert_eq!(cycled.coordinates(), dimension.coordinates());
        assert_eq!(cycled.locus(), Some(Locus::Start));
    }
    Ok(())
}

#[test]
fn locus_shift_identity() -> Result<(), DimensionError> {
    let regular = Dimension::regular("x", vec![1.0, 2.0, 3.0], 1.0, Locus::End)?;
    assert_eq!(regular.shift_locus(Locus::End)?, regular);

    let irregular = Dimension::irregular("x", vec![1i64, 2, 4], 0i64, 8i64, Locus::Start)?;
    assert_eq!(irregular.shift_locus(Locus::Start)?, irregular);
    Ok(())
}

#[test]
fn locus_shift_irregular() -> Result<(), DimensionError> {
    let dimension = Dimension::irregular("x", vec![0i64, 2, 6], 0i64, 10i64, Locus::Start)?;
    assert_eq!(
        dimension.shift_locus(Locus::End)?.coordinates(),
        &Coordinates::Int(vec![2, 6, 10])
    );
    assert_eq!(
        dimension.shift_locus(Locus::Center)?.coordinates(),
        &Coordinates::Int(vec![1, 4, 8])
    );
    let end = dimension.shift_locus(Locus::End)?;
    assert_eq!(end.shift_locus(Locus::Start)?, dimension);
    Ok(())
}
