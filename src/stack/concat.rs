use ndarray::Axis;

use crate::{
    dimension::{Dimension, DimensionError, DimensionName},
    layer::{DimArray, LayerKey},
    window::WindowError,
};

use super::{Stack, StackBuilder, StackError};

/// The dimension to concatenate layers along.
#[derive(Clone, Debug, PartialEq)]
pub enum ConcatAxis {
    /// An existing dimension of the layers.
    ///
    /// The dimensions of the inputs are joined end to end.
    Existing(DimensionName),
    /// A new dimension with one coordinate per input stack, appended after the existing dimensions.
    New(Dimension),
}

/// Concatenate the layers `keys` of `stacks` along `axis`.
///
/// If `keys` is [`None`], the layers of the first stack are concatenated.
/// Each layer is read through the window of its stack.
/// The result is an in-memory stack with the metadata of the first stack, and the per-layer metadata, missing values and reference dimensions of the layers of the first stack.
///
/// # Errors
/// Returns a [`StackError`] if
/// - `stacks` is empty,
/// - a layer is missing from a stack ([`StackError::MissingLayer`]),
/// - a layer does not have the dimension of an [`ConcatAxis::Existing`] axis,
/// - the other dimensions of a layer differ between stacks, or
/// - the length of a [`ConcatAxis::New`] dimension is not the number of stacks.
pub fn concat(
    stacks: &[&Stack],
    keys: Option<&[LayerKey]>,
    axis: &ConcatAxis,
) -> Result<Stack, StackError> {
    let Some(first) = stacks.first() else {
        return Err(DimensionError::EmptyConcat.into());
    };
    let keys: Vec<LayerKey> = keys.map_or_else(|| first.keys().cloned().collect(), <[_]>::to_vec);
    let layers = keys
        .iter()
        .map(|key| concat_layer(stacks, key, axis))
        .collect::<Result<Vec<_>, _>>()?;
    StackBuilder::new()
        .metadata(first.metadata().clone())
        .build_from_layers(layers)
}

fn concat_layer(
    stacks: &[&Stack],
    key: &LayerKey,
    axis: &ConcatAxis,
) -> Result<DimArray, StackError> {
    let arrays = stacks
        .iter()
        .enumerate()
        .map(|(index, stack)| {
            if stack.contains(key) {
                stack.layer(key)
            } else {
                Err(StackError::MissingLayer {
                    key: key.clone(),
                    stack: index,
                })
            }
        })
        .collect::<Result<Vec<_>, _>>()?;
    let Some(first) = arrays.first() else {
        return Err(DimensionError::EmptyConcat.into());
    };
    let views: Vec<_> = arrays.iter().map(DimArray::view).collect();

    let (data, dims) = match axis {
        ConcatAxis::Existing(name) => {
            let position = first
                .axis(name)
                .ok_or_else(|| WindowError::UnknownDimension(name.clone()))?;
            for array in &arrays[1..] {
                check_dims(first.dims(), array.dims(), Some(position))?;
            }
            let along: Vec<&Dimension> = arrays
                .iter()
                .map(|array| &array.dims()[position])
                .collect();
            let mut dims = first.dims().to_vec();
            dims[position] = Dimension::concat(&along)?;
            (ndarray::concatenate(Axis(position), &views)?, dims)
        }
        ConcatAxis::New(dimension) => {
            if dimension.len() != arrays.len() {
                return Err(DimensionError::LengthMismatch {
                    dimension: dimension.name().clone(),
                    expected: dimension.len(),
                    got: arrays.len(),
                }
                .into());
            }
            if first.dim(dimension.name()).is_some() {
                return Err(DimensionError::DuplicateDimension(dimension.name().clone()).into());
            }
            for array in &arrays[1..] {
                check_dims(first.dims(), array.dims(), None)?;
            }
            let mut dims = first.dims().to_vec();
            dims.push(dimension.clone());
            (ndarray::stack(Axis(first.dims().len()), &views)?, dims)
        }
    };

    Ok(DimArray::new(data, dims)?
        .with_name(key.clone())
        .with_metadata(first.metadata().clone())
        .with_missing_value(first.missing_value())
        .with_refdims(first.refdims().to_vec()))
}

/// Check that `other` has the same dimensions as `first`, except along `skip`.
fn check_dims(
    first: &[Dimension],
    other: &[Dimension],
    skip: Option<usize>,
) -> Result<(), DimensionError> {
    if first.len() != other.len() {
        return Err(DimensionError::DimensionalityMismatch {
            expected: first.len(),
            got: other.len(),
        });
    }
    for (axis, (a, b)) in std::iter::zip(first, other).enumerate() {
        if a.name() != b.name() {
            return Err(DimensionError::NameMismatch(
                a.name().clone(),
                b.name().clone(),
            ));
        }
        if Some(axis) != skip && a != b {
            return Err(DimensionError::DimensionMismatch(a.name().clone()));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use ndarray::{Array, ArrayD};

    use crate::dimension::{Coordinates, Locus};

    use super::*;

    fn stack(times: Vec<i64>, offset: f64) -> Stack {
        let x = Dimension::new("x", vec![0i64, 1]);
        let time = Dimension::regular("time", times.clone(), 1i64, Locus::Start).unwrap();
        let values: Vec<f64> = (0..2 * times.len()).map(|i| offset + i as f64).collect();
        let a = DimArray::new(
            Array::from_shape_vec(vec![2, times.len()], values).unwrap(),
            vec![x.clone(), time],
        )
        .unwrap();
        let b = DimArray::new(ArrayD::zeros(vec![2]), vec![x]).unwrap();
        Stack::from_named_layers([("a", a), ("b", b)]).unwrap()
    }

    #[test]
    fn concat_existing() {
        let s1 = stack(vec![1, 2], 0.0);
        let s2 = stack(vec![3, 4, 5], 10.0);
        let keys = [LayerKey::new("a")];
        let joined = concat(
            &[&s1, &s2],
            Some(&keys),
            &ConcatAxis::Existing("time".into()),
        )
        .unwrap();
        assert_eq!(joined.names().collect::<Vec<_>>(), ["a"]);
        let a = joined.layer("a").unwrap();
        assert_eq!(a.shape(), &[2, 5]);
        assert_eq!(
            a.data().as_slice().unwrap(),
            &[0.0, 1.0, 10.0, 11.0, 12.0, 2.0, 3.0, 13.0, 14.0, 15.0]
        );
        let time = a.dim("time").unwrap();
        assert_eq!(time.coordinates(), &Coordinates::Int(vec![1, 2, 3, 4, 5]));
        assert_eq!(time.locus(), Some(Locus::Start));
    }

    #[test]
    fn concat_new() {
        let s1 = stack(vec![1, 2], 0.0);
        let s2 = stack(vec![1, 2], 4.0);
        let band = Dimension::new("band", vec![1i64, 2]);
        let joined = concat(&[&s1, &s2], None, &ConcatAxis::New(band.clone())).unwrap();
        assert_eq!(joined.len(), 2);
        let a = joined.layer("a").unwrap();
        assert_eq!(a.shape(), &[2, 2, 2]);
        assert_eq!(a.dims()[2], band);
        assert_eq!(joined.layer("b").unwrap().shape(), &[2, 2]);

        let index: &[usize] = &[1, 0, 1];
        assert_eq!(a.data()[index], 6.0);

        assert!(matches!(
            concat(&[&s1], None, &ConcatAxis::New(band)),
            Err(StackError::DimensionError(DimensionError::LengthMismatch { .. }))
        ));
    }

    #[test]
    fn concat_errors() {
        let s1 = stack(vec![1, 2], 0.0);
        let s2 = stack(vec![3, 4], 0.0);
        let other = Stack::from_named_layers([(
            "c",
            DimArray::new(ArrayD::zeros(vec![1]), vec![Dimension::new("x", vec![0i64])]).unwrap(),
        )])
        .unwrap();
        assert!(matches!(
            concat(&[&s1, &other], None, &ConcatAxis::Existing("time".into())),
            Err(StackError::MissingLayer { stack: 1, .. })
        ));
        assert!(matches!(
            concat(&[&s1, &s2], None, &ConcatAxis::Existing("time".into())),
            Err(StackError::WindowError(WindowError::UnknownDimension(_)))
        ));
        assert!(matches!(
            concat(&[], None, &ConcatAxis::Existing("time".into())),
            Err(StackError::DimensionError(DimensionError::EmptyConcat))
        ));
    }
}
