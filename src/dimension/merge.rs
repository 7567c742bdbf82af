use super::{Dimension, DimensionError};

/// Combine the dimensions of several layers into one dimension set.
///
/// Dimensions are matched by name and kept in order of first appearance.
/// A dimension shared by several layers must be identical in each.
///
/// # Errors
/// Returns [`DimensionError::DimensionMismatch`] if two dimensions with the same name differ in coordinates, sampling or coordinate reference system.
pub fn combine_dimensions<'a>(
    dimension_sets: impl IntoIterator<Item = &'a [Dimension]>,
) -> Result<Vec<Dimension>, DimensionError> {
    let mut combined: Vec<Dimension> = Vec::new();
    for dimensions in dimension_sets {
        for dimension in dimensions {
            match combined
                .iter()
                .find(|existing| existing.name() == dimension.name())
            {
                Some(existing) if existing != dimension => {
                    return Err(DimensionError::DimensionMismatch(dimension.name().clone()));
                }
                Some(_) => {}
                None => combined.push(dimension.clone()),
            }
        }
    }
    Ok(combined)
}
