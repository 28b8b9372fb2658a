//! Index arrays for `take`.

use ndarray::ErrorKind;
use ndarray::ShapeError;

use crate::array::NdArray;
use crate::error::{BoxError, Result};
use crate::shape::Shape;

/// Integer indices with a shape. Negative entries count from the end of the
/// gathered axis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Indices {
    values: Vec<isize>,
    shape: Shape,
}

impl Indices {
    pub fn new(values: Vec<isize>, shape: Shape) -> Result<Self> {
        if values.len() != shape.numel() {
            return Err(ShapeError::from_kind(ErrorKind::IncompatibleShape).into());
        }
        Ok(Indices { values, shape })
    }

    pub fn values(&self) -> &[isize] {
        &self.values
    }

    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Resolve every index against an axis of length `size`.
    pub fn resolve(&self, axis: usize, size: usize) -> Result<Vec<usize>> {
        self.values
            .iter()
            .map(|&index| {
                let resolved = if index < 0 { index + size as isize } else { index };
                if resolved < 0 || resolved >= size as isize {
                    Err(BoxError::IndexOutOfBounds { index, axis, size })
                } else {
                    Ok(resolved as usize)
                }
            })
            .collect()
    }
}

impl From<Vec<isize>> for Indices {
    fn from(values: Vec<isize>) -> Self {
        let shape = Shape::new(vec![values.len()]);
        Indices { values, shape }
    }
}

impl<const N: usize> From<[isize; N]> for Indices {
    fn from(values: [isize; N]) -> Self {
        Indices::from(values.to_vec())
    }
}

impl TryFrom<&NdArray> for Indices {
    type Error = BoxError;

    fn try_from(array: &NdArray) -> Result<Self> {
        match array {
            NdArray::Int64(a) => Ok(Indices {
                values: a.iter().map(|&v| v as isize).collect(),
                shape: Shape::from(a.shape()),
            }),
            other => Err(BoxError::NonIntegerIndices(other.dtype())),
        }
    }
}
