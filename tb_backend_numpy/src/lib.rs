//! numpy interface for TensorBox.
//!
//! [`NumpyBox`] wraps a plain [`NdArray`] and forwards every operation of the
//! [`TensorBox`] contract to `ndarray`. Nothing is tracked for gradients.

use tb_core::ndarray::ArrayD;
use tb_core::prelude::*;

mod ops;

use ops::BinaryOp;

/// A boxed plain array.
#[derive(Debug, Clone, PartialEq)]
pub struct NumpyBox {
    data: NdArray,
}

impl NumpyBox {
    /// Box anything convertible into a plain array.
    pub fn new(data: impl Into<NdArray>) -> Self {
        NumpyBox { data: data.into() }
    }
}

impl From<NdArray> for NumpyBox {
    fn from(data: NdArray) -> Self {
        NumpyBox { data }
    }
}

impl TensorBox for NumpyBox {
    type Raw = NdArray;

    const INTERFACE: &'static str = "numpy";

    fn wrap(raw: NdArray) -> Self {
        NumpyBox { data: raw }
    }

    fn unbox(&self) -> &NdArray {
        &self.data
    }

    fn into_raw(self) -> NdArray {
        self.data
    }

    fn astensor(array: &NdArray) -> Result<NdArray> {
        Ok(array.clone())
    }

    fn numpy(&self) -> Result<NdArray> {
        Ok(self.data.clone())
    }

    fn shape(&self) -> Shape {
        self.data.shape()
    }

    fn dtype(&self) -> DType {
        self.data.dtype()
    }

    fn requires_grad(&self) -> bool {
        false
    }

    fn abs(&self) -> Result<Self> {
        Ok(Self::wrap(ops::abs(&self.data)))
    }

    fn angle(&self) -> Result<Self> {
        Ok(Self::wrap(ops::angle(&self.data)))
    }

    fn arcsin(&self) -> Result<Self> {
        Ok(Self::wrap(ops::arcsin(&self.data)))
    }

    fn sqrt(&self) -> Result<Self> {
        Ok(Self::wrap(ops::sqrt(&self.data)))
    }

    fn add(&self, other: &Self) -> Result<Self> {
        ops::binary(BinaryOp::Add, &self.data, &other.data).map(Self::wrap)
    }

    fn sub(&self, other: &Self) -> Result<Self> {
        ops::binary(BinaryOp::Sub, &self.data, &other.data).map(Self::wrap)
    }

    fn mul(&self, other: &Self) -> Result<Self> {
        ops::binary(BinaryOp::Mul, &self.data, &other.data).map(Self::wrap)
    }

    fn div(&self, other: &Self) -> Result<Self> {
        ops::binary(BinaryOp::Div, &self.data, &other.data).map(Self::wrap)
    }

    fn cast(&self, dtype: DType) -> Result<Self> {
        Ok(Self::wrap(self.data.cast(dtype)))
    }

    fn ones_like(&self) -> Result<Self> {
        Ok(Self::wrap(ops::ones_like(&self.data)))
    }

    fn expand_dims(&self, axis: isize) -> Result<Self> {
        ops::expand_dims(&self.data, axis).map(Self::wrap)
    }

    fn transpose(&self) -> Result<Self> {
        Ok(Self::wrap(ops::transpose(&self.data)))
    }

    fn sum(&self, axes: Option<&[isize]>, keepdims: bool) -> Result<Self> {
        ops::sum(&self.data, axes, keepdims).map(Self::wrap)
    }

    fn take(&self, indices: &Indices, axis: Option<isize>) -> Result<Self> {
        ops::take(&self.data, indices, axis).map(Self::wrap)
    }

    fn dot(&self, other: &Self) -> Result<Self> {
        ops::dot(&self.data, &other.data).map(Self::wrap)
    }

    fn stack(values: &[Self], axis: isize) -> Result<Self> {
        ops::stack(&Self::unbox_list(values), axis).map(Self::wrap)
    }

    fn concatenate(values: &[Self], axis: isize) -> Result<Self> {
        ops::concatenate(&Self::unbox_list(values), axis).map(Self::wrap)
    }

    fn where_cond(condition: &ArrayD<bool>, x: &Self, y: &Self) -> Result<Self> {
        ops::where_cond(condition, &x.data, &y.data).map(Self::wrap)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use std::f64::consts::PI;
    use tb_core::ndarray::IxDyn;
    use tb_core::num_complex::Complex64;

    fn boxed(shape: &[usize], data: Vec<f64>) -> NumpyBox {
        NumpyBox::wrap(NdArray::from_shape_vec(shape, data).unwrap())
    }

    fn values(b: &NumpyBox) -> Vec<f64> {
        b.numpy().unwrap().to_f64_vec()
    }

    #[test]
    fn test_interface_and_metadata() {
        let x = boxed(&[2, 3], vec![0.0; 6]);
        assert_eq!(x.interface(), "numpy");
        assert_eq!(x.shape(), Shape::new(vec![2, 3]));
        assert_eq!(x.ndim(), 2);
        assert_eq!(x.dtype(), DType::Float64);
        assert!(!x.requires_grad());

        // the tag survives chained operations
        let y = x.sqrt().unwrap().sum(None, false).unwrap();
        assert_eq!(y.interface(), "numpy");
    }

    #[test]
    fn test_unary_ops() {
        let x = boxed(&[3], vec![-4.0, 0.25, 1.0]);
        assert_eq!(values(&x.abs().unwrap()), vec![4.0, 0.25, 1.0]);
        assert_eq!(values(&x.angle().unwrap()), vec![PI, 0.0, 0.0]);

        let roots = values(&x.sqrt().unwrap());
        assert!(roots[0].is_nan());
        assert_eq!(&roots[1..], &[0.5, 1.0]);

        let asin = values(&x.arcsin().unwrap());
        assert!(asin[0].is_nan());
        assert_abs_diff_eq!(asin[2], PI / 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_integer_inputs_promote_to_float64() {
        let x = NumpyBox::new(NdArray::vector(vec![4i64, -9]));
        assert_eq!(x.abs().unwrap().dtype(), DType::Int64);
        assert_eq!(x.abs().unwrap().numpy().unwrap(), NdArray::vector(vec![4i64, 9]));

        let root = x.sqrt().unwrap();
        assert_eq!(root.dtype(), DType::Float64);
        assert_eq!(values(&root)[0], 2.0);
        assert_eq!(x.angle().unwrap().dtype(), DType::Float64);
    }

    #[test]
    fn test_complex_ops() {
        let z = NumpyBox::new(NdArray::vector(vec![
            Complex64::new(3.0, 4.0),
            Complex64::new(0.0, 1.0),
        ]));
        let abs = z.abs().unwrap();
        assert_eq!(abs.dtype(), DType::Float64);
        assert_eq!(values(&abs), vec![5.0, 1.0]);

        let angle = values(&z.angle().unwrap());
        assert_abs_diff_eq!(angle[1], PI / 2.0, epsilon = 1e-12);

        let root = z.sqrt().unwrap().numpy().unwrap().to_complex_vec();
        assert_abs_diff_eq!(root[0].re, 2.0, epsilon = 1e-12);
        assert_abs_diff_eq!(root[0].im, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_cast_and_ones_like() {
        let x = boxed(&[2], vec![1.9, -2.5]);
        let ints = x.cast(DType::Int64).unwrap();
        assert_eq!(ints.numpy().unwrap(), NdArray::vector(vec![1i64, -2]));

        let ones = ints.ones_like().unwrap();
        assert_eq!(ones.dtype(), DType::Int64);
        assert_eq!(ones.numpy().unwrap(), NdArray::vector(vec![1i64, 1]));
    }

    #[test]
    fn test_binary_broadcasting() {
        let a = boxed(&[2, 1], vec![1.0, 2.0]);
        let b = boxed(&[3], vec![10.0, 20.0, 30.0]);
        let sum = a.add(&b).unwrap();
        assert_eq!(sum.shape(), Shape::new(vec![2, 3]));
        assert_eq!(values(&sum), vec![11.0, 21.0, 31.0, 12.0, 22.0, 32.0]);

        let diff = b.sub(&a).unwrap();
        assert_eq!(values(&diff)[..3], [9.0, 19.0, 29.0]);

        let bad = boxed(&[2], vec![1.0, 2.0]);
        assert!(matches!(b.mul(&bad), Err(BoxError::Broadcast { .. })));
    }

    #[test]
    fn test_integer_division_is_true_division() {
        let a = NumpyBox::new(NdArray::vector(vec![1i64, 3]));
        let b = NumpyBox::new(NdArray::vector(vec![2i64, 2]));
        let q = a.div(&b).unwrap();
        assert_eq!(q.dtype(), DType::Float64);
        assert_eq!(values(&q), vec![0.5, 1.5]);
    }

    #[test]
    fn test_expand_dims_and_transpose() {
        let x = boxed(&[2, 3], (0..6).map(f64::from).collect());
        assert_eq!(x.expand_dims(0).unwrap().shape(), Shape::new(vec![1, 2, 3]));
        assert_eq!(x.expand_dims(-1).unwrap().shape(), Shape::new(vec![2, 3, 1]));
        assert!(x.expand_dims(4).is_err());

        let t = x.transpose().unwrap();
        assert_eq!(t.shape(), Shape::new(vec![3, 2]));
        assert_eq!(values(&t), vec![0.0, 3.0, 1.0, 4.0, 2.0, 5.0]);
    }

    #[test]
    fn test_sum() {
        let x = boxed(&[2, 3], (1..=6).map(f64::from).collect());
        assert_eq!(values(&x.sum(None, false).unwrap()), vec![21.0]);
        assert_eq!(x.sum(None, false).unwrap().ndim(), 0);
        assert_eq!(x.sum(None, true).unwrap().shape(), Shape::new(vec![1, 1]));

        let rows = x.sum(Some(&[1]), false).unwrap();
        assert_eq!(values(&rows), vec![6.0, 15.0]);

        let cols = x.sum(Some(&[0]), true).unwrap();
        assert_eq!(cols.shape(), Shape::new(vec![1, 3]));
        assert_eq!(values(&cols), vec![5.0, 7.0, 9.0]);

        let both = x.sum(Some(&[-1, 0]), false).unwrap();
        assert_eq!(values(&both), vec![21.0]);

        assert!(matches!(
            x.sum(Some(&[0, 0]), false),
            Err(BoxError::DuplicateAxis { axis: 0 })
        ));
    }

    #[test]
    fn test_take() {
        let x = boxed(&[2, 3], (0..6).map(f64::from).collect());

        let flat = x.take(&Indices::from([5, 0, -1]), None).unwrap();
        assert_eq!(values(&flat), vec![5.0, 0.0, 5.0]);

        let cols = x.take(&Indices::from([2, 0]), Some(1)).unwrap();
        assert_eq!(cols.shape(), Shape::new(vec![2, 2]));
        assert_eq!(values(&cols), vec![2.0, 0.0, 5.0, 3.0]);

        let idx = Indices::new(vec![1, 0, 1, 1], Shape::new(vec![2, 2])).unwrap();
        let rows = x.take(&idx, Some(0)).unwrap();
        assert_eq!(rows.shape(), Shape::new(vec![2, 2, 3]));

        assert!(matches!(
            x.take(&Indices::from([3]), Some(1)),
            Err(BoxError::IndexOutOfBounds { index: 3, axis: 1, size: 3 })
        ));
    }

    #[test]
    fn test_take_box_indices() {
        let x = boxed(&[4], vec![10.0, 11.0, 12.0, 13.0]);
        let idx = NumpyBox::new(NdArray::vector(vec![3i64, 1]));
        assert_eq!(values(&x.take_box(&idx, Some(0)).unwrap()), vec![13.0, 11.0]);

        let float_idx = boxed(&[1], vec![1.0]);
        assert!(x.take_box(&float_idx, None).is_err());
    }

    #[test]
    fn test_dot_matmul() {
        let a = boxed(&[2, 2], vec![1.0, 2.0, 3.0, 4.0]);
        let b = boxed(&[2, 2], vec![5.0, 6.0, 7.0, 8.0]);
        assert_eq!(values(&a.dot(&b).unwrap()), vec![19.0, 22.0, 43.0, 50.0]);

        let c = boxed(&[3, 2], vec![0.0; 6]);
        assert!(matches!(a.dot(&c), Err(BoxError::NotAligned { .. })));
    }

    #[test]
    fn test_dot_scalars() {
        let a = boxed(&[], vec![3.0]);
        let b = boxed(&[], vec![-2.0]);
        let out = a.dot(&b).unwrap();
        assert_eq!(out.ndim(), 0);
        assert_eq!(values(&out), vec![-6.0]);

        let v = boxed(&[3], vec![1.0, 2.0, 3.0]);
        assert_eq!(values(&a.dot(&v).unwrap()), vec![3.0, 6.0, 9.0]);
    }

    #[test]
    fn test_dot_generic() {
        let v = boxed(&[3], vec![1.0, 2.0, 3.0]);
        let inner = v.dot(&v).unwrap();
        assert_eq!(inner.ndim(), 0);
        assert_eq!(values(&inner), vec![14.0]);

        let m = boxed(&[2, 3], vec![1.0, 0.0, 0.0, 0.0, 1.0, 1.0]);
        assert_eq!(values(&m.dot(&v).unwrap()), vec![1.0, 5.0]);

        let w = boxed(&[2], vec![1.0, 1.0]);
        assert_eq!(values(&w.dot(&m).unwrap()), vec![1.0, 1.0, 1.0]);

        // (2, 1, 2) . (3, 2, 2) -> (2, 1, 3, 2)
        let a = boxed(&[2, 1, 2], vec![1.0, 0.0, 0.0, 1.0]);
        let b = boxed(&[3, 2, 2], (0..12).map(f64::from).collect());
        let out = a.dot(&b).unwrap();
        assert_eq!(out.shape(), Shape::new(vec![2, 1, 3, 2]));
        assert_eq!(
            values(&out),
            vec![0.0, 1.0, 4.0, 5.0, 8.0, 9.0, 2.0, 3.0, 6.0, 7.0, 10.0, 11.0]
        );
    }

    #[test]
    fn test_dot_promotes_dtypes() {
        let a = NumpyBox::new(NdArray::vector(vec![1i64, 2]));
        let b = NumpyBox::new(NdArray::vector(vec![0.5f32, 0.25]));
        let out = a.dot(&b).unwrap();
        assert_eq!(out.dtype(), DType::Float64);
        assert_eq!(values(&out), vec![1.0]);
    }

    #[test]
    fn test_stack_preserves_order() {
        let parts: Vec<NumpyBox> = (0..3).map(|i| boxed(&[2], vec![i as f64, 10.0 + i as f64])).collect();

        let rows = NumpyBox::stack(&parts, 0).unwrap();
        assert_eq!(rows.shape(), Shape::new(vec![3, 2]));
        assert_eq!(values(&rows), vec![0.0, 10.0, 1.0, 11.0, 2.0, 12.0]);

        let cols = NumpyBox::stack(&parts, -1).unwrap();
        assert_eq!(cols.shape(), Shape::new(vec![2, 3]));
        assert_eq!(values(&cols), vec![0.0, 1.0, 2.0, 10.0, 11.0, 12.0]);

        assert!(matches!(
            NumpyBox::stack(&[], 0),
            Err(BoxError::EmptyInput { op: "stack" })
        ));
        let ragged = [boxed(&[2], vec![0.0; 2]), boxed(&[3], vec![0.0; 3])];
        assert!(matches!(
            NumpyBox::stack(&ragged, 0),
            Err(BoxError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_concatenate_preserves_order() {
        let a = boxed(&[1, 2], vec![1.0, 2.0]);
        let b = boxed(&[2, 2], vec![3.0, 4.0, 5.0, 6.0]);
        let out = NumpyBox::concatenate(&[a.clone(), b], 0).unwrap();
        assert_eq!(out.shape(), Shape::new(vec![3, 2]));
        assert_eq!(values(&out), vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);

        let mismatched = boxed(&[2, 3], vec![0.0; 6]);
        assert!(NumpyBox::concatenate(&[a, mismatched], 0).is_err());

        let scalar = boxed(&[], vec![1.0]);
        assert!(matches!(
            NumpyBox::concatenate(&[scalar], 0),
            Err(BoxError::ZeroDimConcat)
        ));
    }

    #[test]
    fn test_concatenate_promotes_dtypes() {
        let a = NumpyBox::new(NdArray::vector(vec![1i64]));
        let b = NumpyBox::new(NdArray::vector(vec![2.5f64]));
        let out = NumpyBox::concatenate(&[a, b], 0).unwrap();
        assert_eq!(out.dtype(), DType::Float64);
        assert_eq!(values(&out), vec![1.0, 2.5]);
    }

    #[test]
    fn test_where_cond_broadcasts() {
        let cond = ArrayD::from_shape_vec(IxDyn(&[2, 2]), vec![true, false, false, true]).unwrap();
        let x = boxed(&[2, 2], vec![1.0, 2.0, 3.0, 4.0]);
        let y = boxed(&[], vec![0.0]);
        let out = NumpyBox::where_cond(&cond, &x, &y).unwrap();
        assert_eq!(values(&out), vec![1.0, 0.0, 0.0, 4.0]);

        let row = ArrayD::from_shape_vec(IxDyn(&[2]), vec![false, true]).unwrap();
        let out = NumpyBox::where_cond(&row, &x, &y).unwrap();
        assert_eq!(values(&out), vec![0.0, 2.0, 0.0, 4.0]);

        let bad = ArrayD::from_shape_vec(IxDyn(&[3]), vec![true; 3]).unwrap();
        assert!(NumpyBox::where_cond(&bad, &x, &y).is_err());
    }

    #[test]
    fn test_unbox_list_preserves_order() {
        let parts = vec![boxed(&[1], vec![1.0]), boxed(&[1], vec![2.0])];
        let raws = NumpyBox::unbox_list(&parts);
        assert_eq!(raws[0].to_f64_vec(), vec![1.0]);
        assert_eq!(raws[1].to_f64_vec(), vec![2.0]);
        assert_eq!(parts[1].clone().into_raw().to_f64_vec(), vec![2.0]);
    }
}
