//! Layers.
//!
//! A [`DimArray`] is a materialised layer: `f64` element data with a [`Dimension`] for every axis, plus
//! - reference dimensions, the axes removed by earlier scalar selections,
//! - an optional name ([`LayerKey`]),
//! - [`Metadata`], and
//! - an optional missing-value sentinel.
//!
//! Reading a layer from a [`Stack`](crate::stack::Stack) returns a [`DimArray`], and a stack can be built from them.

mod layer_key;

pub use layer_key::LayerKey;

use std::collections::HashSet;

use ndarray::{ArrayD, ArrayViewD, ArrayViewMutD};

use crate::{
    dimension::{Dimension, DimensionError, DimensionName},
    metadata::Metadata,
    window::{resolve_region, Indexer, WindowError},
};

/// A named dimensioned array.
#[derive(Clone, Debug, PartialEq)]
pub struct DimArray {
    data: ArrayD<f64>,
    dims: Vec<Dimension>,
    refdims: Vec<Dimension>,
    name: Option<LayerKey>,
    metadata: Metadata,
    missing_value: Option<f64>,
}

impl DimArray {
    /// Create a new dimensioned array.
    ///
    /// # Errors
    /// Returns a [`DimensionError`] if
    /// - the number of dimensions does not match the dimensionality of `data`,
    /// - a dimension length does not match the corresponding axis length, or
    /// - a dimension name occurs more than once.
    pub fn new(data: ArrayD<f64>, dims: Vec<Dimension>) -> Result<Self, DimensionError> {
        validate_dims(data.shape(), &dims)?;
        Ok(Self {
            data,
            dims,
            refdims: Vec::new(),
            name: None,
            metadata: Metadata::new(),
            missing_value: None,
        })
    }

    /// Set the name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<LayerKey>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the metadata.
    #[must_use]
    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// Set the missing-value sentinel.
    #[must_use]
    pub fn with_missing_value(mut self, missing_value: Option<f64>) -> Self {
        self.missing_value = missing_value;
        self
    }

    /// Set the reference dimensions.
    #[must_use]
    pub fn with_refdims(mut self, refdims: Vec<Dimension>) -> Self {
        self.refdims = refdims;
        self
    }

    /// The element data.
    #[must_use]
    pub fn data(&self) -> &ArrayD<f64> {
        &self.data
    }

    /// A mutable view of the element data.
    pub fn data_mut(&mut self) -> ArrayViewMutD<'_, f64> {
        self.data.view_mut()
    }

    /// Consume the array, returning the element data.
    #[must_use]
    pub fn into_data(self) -> ArrayD<f64> {
        self.data
    }

    /// The shape of the data.
    #[must_use]
    pub fn shape(&self) -> &[usize] {
        self.data.shape()
    }

    /// The dimensions, one for each axis.
    #[must_use]
    pub fn dims(&self) -> &[Dimension] {
        &self.dims
    }

    /// The reference dimensions.
    #[must_use]
    pub fn refdims(&self) -> &[Dimension] {
        &self.refdims
    }

    /// The name.
    #[must_use]
    pub fn name(&self) -> Option<&LayerKey> {
        self.name.as_ref()
    }

    /// The metadata.
    #[must_use]
    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    /// The missing-value sentinel.
    #[must_use]
    pub fn missing_value(&self) -> Option<f64> {
        self.missing_value
    }

    /// The dimension named `name`.
    #[must_use]
    pub fn dim(&self, name: impl Into<DimensionName>) -> Option<&Dimension> {
        let name = name.into();
        self.dims.iter().find(|dimension| dimension.name() == &name)
    }

    /// The axis of the dimension named `name`.
    #[must_use]
    pub fn axis(&self, name: impl Into<DimensionName>) -> Option<usize> {
        let name = name.into();
        self.dims
            .iter()
            .position(|dimension| dimension.name() == &name)
    }

    /// Read a subset of the array.
    ///
    /// Axes removed by scalar selectors are appended to the reference dimensions.
    ///
    /// # Errors
    /// Returns a [`WindowError`] if a named selector refers to an unknown dimension or the indexer cannot be resolved.
    pub fn read(&self, indexer: &Indexer) -> Result<Self, WindowError> {
        indexer.check_dimensions(&self.dims)?;
        let (region, dims, refdims) = resolve_region(&self.dims, None, indexer)?.into_parts();
        let data = region.extract(&self.data.view())?;
        Ok(Self {
            data,
            dims,
            refdims: self.refdims.iter().cloned().chain(refdims).collect(),
            name: self.name.clone(),
            metadata: self.metadata.clone(),
            missing_value: self.missing_value,
        })
    }

    /// Replace missing values with `value`, which becomes the new missing-value sentinel.
    ///
    /// A `NaN` sentinel matches `NaN` elements.
    #[must_use]
    #[allow(clippy::float_cmp)]
    pub fn replace_missing(mut self, value: f64) -> Self {
        if let Some(missing_value) = self.missing_value {
            self.data.mapv_inplace(|element| {
                if element == missing_value || (missing_value.is_nan() && element.is_nan()) {
                    value
                } else {
                    element
                }
            });
        }
        self.missing_value = Some(value);
        self
    }

    pub(crate) fn view(&self) -> ArrayViewD<'_, f64> {
        self.data.view()
    }
}

fn validate_dims(shape: &[usize], dims: &[Dimension]) -> Result<(), DimensionError> {
    if shape.len() != dims.len() {
        return Err(DimensionError::DimensionalityMismatch {
            expected: shape.len(),
            got: dims.len(),
        });
    }
    let mut names = HashSet::new();
    for (length, dimension) in std::iter::zip(shape, dims) {
        if dimension.len() != *length {
            return Err(DimensionError::LengthMismatch {
                dimension: dimension.name().clone(),
                expected: dimension.len(),
                got: *length,
            });
        }
        if !names.insert(dimension.name()) {
            return Err(DimensionError::DuplicateDimension(dimension.name().clone()));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use ndarray::Array;

    use crate::window::Selector;

    use super::*;

    fn array() -> DimArray {
        DimArray::new(
            Array::from_shape_vec((2, 3), vec![1.0, 2.0, -9999.0, 4.0, 5.0, 6.0])
                .unwrap()
                .into_dyn(),
            vec![
                Dimension::new("y", vec![1.0, 0.0]),
                Dimension::new("x", vec![10i64, 20, 30]),
            ],
        )
        .unwrap()
        .with_name("sm")
        .with_missing_value(Some(-9999.0))
    }

    #[test]
    fn dim_array_new_invalid() {
        let data = ArrayD::zeros(vec![2, 3]);
        assert!(matches!(
            DimArray::new(data.clone(), vec![Dimension::new("y", vec![0i64, 1])]),
            Err(DimensionError::DimensionalityMismatch { .. })
        ));
        assert!(matches!(
            DimArray::new(
                data.clone(),
                vec![
                    Dimension::new("y", vec![0i64, 1]),
                    Dimension::new("x", vec![0i64, 1])
                ]
            ),
            Err(DimensionError::LengthMismatch { .. })
        ));
        assert!(matches!(
            DimArray::new(
                ArrayD::zeros(vec![2, 2]),
                vec![
                    Dimension::new("y", vec![0i64, 1]),
                    Dimension::new("y", vec![0i64, 1])
                ]
            ),
            Err(DimensionError::DuplicateDimension(_))
        ));
    }

    #[test]
    fn dim_array_read() {
        let array = array();
        let row = array
            .read(&Indexer::named([("y", Selector::at(0.0))]))
            .unwrap();
        assert_eq!(row.shape(), &[3]);
        assert_eq!(row.data().as_slice().unwrap(), &[4.0, 5.0, 6.0]);
        assert_eq!(row.dims()[0].name(), &DimensionName::new("x"));
        assert_eq!(row.refdims().len(), 1);
        assert_eq!(row.name(), Some(&LayerKey::new("sm")));
        assert_eq!(row.missing_value(), Some(-9999.0));

        let value = row.read(&Indexer::positional([Selector::Index(2)])).unwrap();
        assert_eq!(value.shape(), &[] as &[usize]);
        assert_eq!(value.refdims().len(), 2);

        assert!(array
            .read(&Indexer::named([("time", Selector::Index(0))]))
            .is_err());
    }

    #[test]
    fn dim_array_replace_missing() {
        let index: &[usize] = &[0, 2];
        let array = array().replace_missing(f64::NAN);
        assert!(array.data()[index].is_nan());
        assert!(array.missing_value().unwrap().is_nan());
        let array = array.replace_missing(0.0);
        assert_eq!(array.data()[index], 0.0);
        assert_eq!(array.dim("x").map(Dimension::len), Some(3));
        assert_eq!(array.axis("x"), Some(1));
    }
}
