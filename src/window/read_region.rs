use derive_more::From;
use ndarray::{ArrayD, ArrayViewD, IxDyn};

use crate::byte_range::ByteRange;

use super::WindowError;

/// The indices read along one axis of a layer.
#[derive(Clone, Debug, PartialEq, Eq, From)]
pub enum AxisIndex {
    /// A single index. The axis is removed from the result.
    Scalar(usize),
    /// A list of indices, in result order.
    Slice(Vec<usize>),
}

impl AxisIndex {
    /// Every index of an axis of length `length`.
    #[must_use]
    pub fn full(length: usize) -> Self {
        Self::Slice((0..length).collect())
    }

    /// The indices along the axis.
    #[must_use]
    pub fn indices(&self) -> &[usize] {
        match self {
            Self::Scalar(index) => std::slice::from_ref(index),
            Self::Slice(indices) => indices,
        }
    }

    /// The number of indices.
    #[must_use]
    pub fn len(&self) -> usize {
        self.indices().len()
    }

    /// Returns true if no indices are read.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.indices().is_empty()
    }

    /// Returns true for a scalar index.
    #[must_use]
    pub fn is_scalar(&self) -> bool {
        matches!(self, Self::Scalar(_))
    }

    /// Map `inner`, an index into the view given by `outer`, to an index of the underlying axis.
    ///
    /// Returns [`None`] if `inner` is out of bounds of `outer`.
    pub(crate) fn compose(outer: &[usize], inner: &Self) -> Option<Self> {
        match inner {
            Self::Scalar(index) => outer.get(*index).copied().map(Self::Scalar),
            Self::Slice(indices) => indices
                .iter()
                .map(|index| outer.get(*index).copied())
                .collect::<Option<Vec<_>>>()
                .map(Self::Slice),
        }
    }
}

/// A region of a layer to read, with the indices read along every axis.
///
/// The result of a read is ordered row-major over the region, with scalar axes removed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReadRegion {
    axes: Vec<AxisIndex>,
}

impl ReadRegion {
    /// Create a new read region.
    #[must_use]
    pub fn new(axes: Vec<AxisIndex>) -> Self {
        Self { axes }
    }

    /// Create a read region covering every element of an array of `shape`.
    #[must_use]
    pub fn new_with_shape(shape: &[usize]) -> Self {
        Self {
            axes: shape.iter().map(|length| AxisIndex::full(*length)).collect(),
        }
    }

    /// The indices of each axis.
    #[must_use]
    pub fn axes(&self) -> &[AxisIndex] {
        &self.axes
    }

    /// The number of axes.
    #[must_use]
    pub fn dimensionality(&self) -> usize {
        self.axes.len()
    }

    /// The shape of the result, excluding scalar axes.
    #[must_use]
    pub fn shape(&self) -> Vec<usize> {
        self.axes
            .iter()
            .filter(|axis| !axis.is_scalar())
            .map(AxisIndex::len)
            .collect()
    }

    /// The number of elements in the region.
    #[must_use]
    pub fn num_elements(&self) -> usize {
        self.axes.iter().map(AxisIndex::len).product()
    }

    /// Returns true if the region is within an array of `shape`.
    #[must_use]
    pub fn inbounds(&self, shape: &[usize]) -> bool {
        self.axes.len() == shape.len()
            && std::iter::zip(&self.axes, shape)
                .all(|(axis, length)| axis.indices().iter().all(|index| index < length))
    }

    /// Returns true if the region reads an entire array of `shape` in order.
    #[must_use]
    pub fn is_full(&self, shape: &[usize]) -> bool {
        *self == Self::new_with_shape(shape)
    }

    /// Return the runs of contiguous elements of the region within a row-major array of `shape`.
    ///
    /// Each run is a linearised start and a length.
    /// Runs are in result order, and adjacent runs are merged.
    ///
    /// # Errors
    /// Returns [`WindowError::IncompatibleShape`] if the region is not within an array of `shape`.
    pub fn contiguous_runs(&self, shape: &[usize]) -> Result<Vec<(usize, usize)>, WindowError> {
        if !self.inbounds(shape) {
            return Err(WindowError::IncompatibleShape {
                dimensionality: self.dimensionality(),
                shape: shape.to_vec(),
            });
        }
        let Some((inner, outer)) = self.axes.split_last() else {
            return Ok(vec![(0, 1)]);
        };
        if self.axes.iter().any(AxisIndex::is_empty) {
            return Ok(vec![]);
        }

        let mut strides = vec![1; shape.len()];
        for axis in (0..shape.len().saturating_sub(1)).rev() {
            strides[axis] = strides[axis + 1] * shape[axis + 1];
        }

        let mut runs: Vec<(usize, usize)> = Vec::new();
        let mut counter = vec![0; outer.len()];
        loop {
            let base: usize = std::iter::zip(outer, &counter)
                .zip(&strides)
                .map(|((axis, position), stride)| axis.indices()[*position] * stride)
                .sum();
            for index in inner.indices() {
                let start = base + index;
                match runs.last_mut() {
                    Some((run_start, run_length)) if *run_start + *run_length == start => {
                        *run_length += 1;
                    }
                    _ => runs.push((start, 1)),
                }
            }

            // Advance the outer axes, last axis fastest
            let mut axis = outer.len();
            loop {
                if axis == 0 {
                    return Ok(runs);
                }
                axis -= 1;
                counter[axis] += 1;
                if counter[axis] < outer[axis].len() {
                    break;
                }
                counter[axis] = 0;
            }
        }
    }

    /// Return the byte ranges of the region within a row-major array of `shape` with elements of `element_size` bytes.
    ///
    /// # Errors
    /// Returns [`WindowError::IncompatibleShape`] if the region is not within an array of `shape`.
    pub fn byte_ranges(
        &self,
        shape: &[usize],
        element_size: usize,
    ) -> Result<Vec<ByteRange>, WindowError> {
        let element_size = element_size as u64;
        Ok(self
            .contiguous_runs(shape)?
            .into_iter()
            .map(|(start, length)| {
                ByteRange::new(start as u64 * element_size, length as u64 * element_size)
            })
            .collect())
    }

    /// Extract the region from an in-memory array.
    ///
    /// # Errors
    /// Returns [`WindowError::IncompatibleShape`] if the region is not within `array`.
    pub fn extract<T: Clone>(&self, array: &ArrayViewD<T>) -> Result<ArrayD<T>, WindowError> {
        let runs = self.contiguous_runs(array.shape())?;
        let standard;
        let elements: &[T] = if let Some(elements) = array.as_slice() {
            elements
        } else {
            standard = array.iter().cloned().collect::<Vec<T>>();
            &standard
        };
        let mut values = Vec::with_capacity(self.num_elements());
        for (start, length) in runs {
            values.extend_from_slice(&elements[start..start + length]);
        }
        Ok(ArrayD::from_shape_vec(IxDyn(&self.shape()), values)?)
    }
}

#[cfg(test)]
mod tests {
    use ndarray::Array;

    use super::*;

    #[test]
    fn read_region_runs() {
        let shape = [4, 5];
        let region = ReadRegion::new(vec![
            AxisIndex::Slice(vec![1, 2]),
            AxisIndex::Slice(vec![1, 2, 3]),
        ]);
        assert_eq!(region.shape(), vec![2, 3]);
        assert_eq!(region.num_elements(), 6);
        assert_eq!(region.contiguous_runs(&shape).unwrap(), vec![(6, 3), (11, 3)]);
        assert_eq!(
            region.byte_ranges(&shape, 4).unwrap(),
            vec![ByteRange::new(24, 12), ByteRange::new(44, 12)]
        );
    }

    #[test]
    fn read_region_full_rows_merge() {
        let shape = [3, 4];
        let region = ReadRegion::new(vec![AxisIndex::Slice(vec![1, 2]), AxisIndex::full(4)]);
        assert_eq!(region.contiguous_runs(&shape).unwrap(), vec![(4, 8)]);
        assert!(ReadRegion::new_with_shape(&shape).is_full(&shape));
        assert!(!region.is_full(&shape));
    }

    #[test]
    fn read_region_scalar_axes() {
        let shape = [2, 3, 4];
        let region = ReadRegion::new(vec![
            AxisIndex::Scalar(1),
            AxisIndex::Slice(vec![2, 0]),
            AxisIndex::Scalar(3),
        ]);
        assert_eq!(region.shape(), vec![2]);
        assert_eq!(region.contiguous_runs(&shape).unwrap(), vec![(23, 1), (15, 1)]);
        assert_eq!(
            ReadRegion::new(vec![]).contiguous_runs(&[]).unwrap(),
            vec![(0, 1)]
        );
    }

    #[test]
    fn read_region_out_of_bounds() {
        let region = ReadRegion::new(vec![AxisIndex::Slice(vec![0, 5])]);
        assert!(matches!(
            region.contiguous_runs(&[5]),
            Err(WindowError::IncompatibleShape { .. })
        ));
        assert!(region.contiguous_runs(&[5, 5]).is_err());
        let empty = ReadRegion::new(vec![AxisIndex::Slice(vec![]), AxisIndex::full(3)]);
        assert!(empty.contiguous_runs(&[2, 3]).unwrap().is_empty());
    }

    #[test]
    fn read_region_extract() {
        let array = Array::from_shape_vec((3, 4), (0..12).collect::<Vec<i32>>())
            .unwrap()
            .into_dyn();
        let region = ReadRegion::new(vec![AxisIndex::Slice(vec![0, 2]), AxisIndex::Scalar(1)]);
        let extracted = region.extract(&array.view()).unwrap();
        assert_eq!(extracted.shape(), &[2]);
        assert_eq!(extracted.as_slice().unwrap(), &[1, 9]);

        // Non-standard layout
        let transposed = array.t();
        let region = ReadRegion::new(vec![AxisIndex::Slice(vec![1, 2]), AxisIndex::Slice(vec![0])]);
        let extracted = region.extract(&transposed).unwrap();
        assert_eq!(
            extracted,
            Array::from_shape_vec((2, 1), vec![1, 2]).unwrap().into_dyn()
        );
    }

    #[test]
    fn axis_index_compose() {
        let outer = [2, 4, 6, 8];
        assert_eq!(
            AxisIndex::compose(&outer, &AxisIndex::Scalar(1)),
            Some(AxisIndex::Scalar(4))
        );
        assert_eq!(
            AxisIndex::compose(&outer, &AxisIndex::Slice(vec![3, 0])),
            Some(AxisIndex::Slice(vec![8, 2]))
        );
        assert_eq!(AxisIndex::compose(&outer, &AxisIndex::Scalar(4)), None);
    }
}
