//! TensorBox trait - the operation contract every interface implements.

use ndarray::ArrayD;

use crate::array::NdArray;
use crate::dtype::DType;
use crate::error::Result;
use crate::indices::Indices;
use crate::shape::Shape;

/// A boxed tensor: one raw backend array plus the interface that produced it.
///
/// Every interface (numpy, autograd, ...) implements this trait by forwarding
/// each operation to its backend library and re-wrapping the result, so
/// callers can chain operations without knowing which library holds the data.
pub trait TensorBox: Clone + std::fmt::Debug + Sized {
    /// The backend's array type.
    type Raw: Clone;

    /// Interface tag, fixed per backend.
    const INTERFACE: &'static str;

    // === Boxing ===

    /// Box a raw backend array.
    fn wrap(raw: Self::Raw) -> Self;

    /// Borrow the raw backend array.
    fn unbox(&self) -> &Self::Raw;

    /// Take the raw backend array.
    fn into_raw(self) -> Self::Raw;

    /// Borrow the raw arrays of a list of boxes, preserving order.
    fn unbox_list(values: &[Self]) -> Vec<&Self::Raw> {
        values.iter().map(Self::unbox).collect()
    }

    /// Convert a plain array into the backend's raw type.
    fn astensor(array: &NdArray) -> Result<Self::Raw>;

    /// Copy the values out as a plain, untracked array.
    fn numpy(&self) -> Result<NdArray>;

    // === Metadata ===

    fn interface(&self) -> &'static str {
        Self::INTERFACE
    }

    fn shape(&self) -> Shape;

    fn ndim(&self) -> usize {
        self.shape().ndim()
    }

    fn dtype(&self) -> DType;

    /// Whether gradients are tracked through this value.
    fn requires_grad(&self) -> bool;

    // === Element-wise unary operations ===

    /// Absolute value. Complex inputs yield their magnitude.
    fn abs(&self) -> Result<Self>;

    /// Complex argument. Real inputs yield 0 or pi.
    fn angle(&self) -> Result<Self>;

    /// Inverse sine.
    fn arcsin(&self) -> Result<Self>;

    /// Square root.
    fn sqrt(&self) -> Result<Self>;

    // === Element-wise binary operations (broadcasting) ===

    fn add(&self, other: &Self) -> Result<Self>;

    fn sub(&self, other: &Self) -> Result<Self>;

    fn mul(&self, other: &Self) -> Result<Self>;

    /// True division. Integer operands are divided as float64.
    fn div(&self, other: &Self) -> Result<Self>;

    // === Conversion and creation ===

    fn cast(&self, dtype: DType) -> Result<Self>;

    /// Ones with the same shape and dtype.
    fn ones_like(&self) -> Result<Self>;

    // === Shape operations ===

    /// Insert a unit axis at `axis` (may be negative).
    fn expand_dims(&self, axis: isize) -> Result<Self>;

    /// Reverse all axes (numpy `.T`).
    fn transpose(&self) -> Result<Self>;

    // === Reductions ===

    /// Sum over `axes`, or over everything when `None`.
    fn sum(&self, axes: Option<&[isize]>, keepdims: bool) -> Result<Self>;

    // === Indexing ===

    /// Gather `indices` along `axis`, or from the flattened array when `None`.
    fn take(&self, indices: &Indices, axis: Option<isize>) -> Result<Self>;

    /// [`TensorBox::take`] with the indices held in a box.
    fn take_box(&self, indices: &Self, axis: Option<isize>) -> Result<Self> {
        let indices = Indices::try_from(&indices.numpy()?)?;
        self.take(&indices, axis)
    }

    // === Linear algebra ===

    /// Matrix multiply for two rank-2 operands, scalar multiply for two
    /// rank-0 operands, numpy's generic `dot` otherwise.
    fn dot(&self, other: &Self) -> Result<Self>;

    // === Joining and selection ===

    /// Join along a new axis.
    fn stack(values: &[Self], axis: isize) -> Result<Self>;

    /// Join along an existing axis.
    fn concatenate(values: &[Self], axis: isize) -> Result<Self>;

    /// Pick from `x` where `condition` holds and from `y` elsewhere.
    fn where_cond(condition: &ArrayD<bool>, x: &Self, y: &Self) -> Result<Self>;
}
