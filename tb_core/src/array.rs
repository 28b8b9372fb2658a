//! Plain (untracked) n-dimensional arrays.
//!
//! [`NdArray`] is the value every interface can export through
//! [`TensorBox::numpy`](crate::TensorBox::numpy). It is a thin tagged union
//! over `ndarray::ArrayD` so that dtype is a runtime property, as it is for
//! numpy arrays.

use ndarray::{Array1, ArrayD, IxDyn};
use num_complex::Complex64;

use crate::dtype::DType;
use crate::error::Result;
use crate::shape::Shape;

/// A plain n-dimensional array of one of the supported dtypes.
#[derive(Debug, Clone, PartialEq)]
pub enum NdArray {
    Int64(ArrayD<i64>),
    Float32(ArrayD<f32>),
    Float64(ArrayD<f64>),
    Complex128(ArrayD<Complex64>),
}

/// Run `$body` with `$arr` bound to the inner `ArrayD`, whatever its dtype.
#[macro_export]
macro_rules! with_array {
    ($value:expr, $arr:ident => $body:expr) => {
        match $value {
            $crate::NdArray::Int64($arr) => $body,
            $crate::NdArray::Float32($arr) => $body,
            $crate::NdArray::Float64($arr) => $body,
            $crate::NdArray::Complex128($arr) => $body,
        }
    };
}

/// Like [`with_array!`], re-wrapping the result in the same variant.
#[macro_export]
macro_rules! map_array {
    ($value:expr, $arr:ident => $body:expr) => {
        match $value {
            $crate::NdArray::Int64($arr) => $crate::NdArray::Int64($body),
            $crate::NdArray::Float32($arr) => $crate::NdArray::Float32($body),
            $crate::NdArray::Float64($arr) => $crate::NdArray::Float64($body),
            $crate::NdArray::Complex128($arr) => $crate::NdArray::Complex128($body),
        }
    };
}

/// Rust element types that map onto a [`DType`].
pub trait Element: Clone + Send + Sync + 'static {
    const DTYPE: DType;

    fn into_array(array: ArrayD<Self>) -> NdArray;

    fn from_array(array: &NdArray) -> Option<&ArrayD<Self>>;
}

macro_rules! impl_element {
    ($ty:ty, $variant:ident) => {
        impl Element for $ty {
            const DTYPE: DType = DType::$variant;

            fn into_array(array: ArrayD<Self>) -> NdArray {
                NdArray::$variant(array)
            }

            fn from_array(array: &NdArray) -> Option<&ArrayD<Self>> {
                match array {
                    NdArray::$variant(a) => Some(a),
                    _ => None,
                }
            }
        }

        impl From<ArrayD<$ty>> for NdArray {
            fn from(array: ArrayD<$ty>) -> Self {
                NdArray::$variant(array)
            }
        }
    };
}

impl_element!(i64, Int64);
impl_element!(f32, Float32);
impl_element!(f64, Float64);
impl_element!(Complex64, Complex128);

impl NdArray {
    /// Build an array from row-major data.
    pub fn from_shape_vec<T: Element>(shape: &[usize], data: Vec<T>) -> Result<Self> {
        Ok(T::into_array(ArrayD::from_shape_vec(IxDyn(shape), data)?))
    }

    /// Build a 0-dimensional array.
    pub fn scalar<T: Element>(value: T) -> Self {
        T::into_array(ArrayD::from_elem(IxDyn(&[]), value))
    }

    /// Build a 1-dimensional array.
    pub fn vector<T: Element>(data: Vec<T>) -> Self {
        T::into_array(Array1::from(data).into_dyn())
    }

    pub fn dtype(&self) -> DType {
        match self {
            NdArray::Int64(_) => DType::Int64,
            NdArray::Float32(_) => DType::Float32,
            NdArray::Float64(_) => DType::Float64,
            NdArray::Complex128(_) => DType::Complex128,
        }
    }

    pub fn shape(&self) -> Shape {
        with_array!(self, a => Shape::from(a.shape()))
    }

    pub fn ndim(&self) -> usize {
        with_array!(self, a => a.ndim())
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        with_array!(self, a => a.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Borrow the inner array if it holds elements of type `T`.
    pub fn as_array<T: Element>(&self) -> Option<&ArrayD<T>> {
        T::from_array(self)
    }

    /// Values in logical (row-major) order as `f64`. Complex values
    /// contribute their real part.
    pub fn to_f64_vec(&self) -> Vec<f64> {
        match self {
            NdArray::Int64(a) => a.iter().map(|&v| v as f64).collect(),
            NdArray::Float32(a) => a.iter().map(|&v| v as f64).collect(),
            NdArray::Float64(a) => a.iter().copied().collect(),
            NdArray::Complex128(a) => a.iter().map(|v| v.re).collect(),
        }
    }

    /// Values in logical order as complex numbers.
    pub fn to_complex_vec(&self) -> Vec<Complex64> {
        match self {
            NdArray::Complex128(a) => a.iter().copied().collect(),
            other => other
                .to_f64_vec()
                .into_iter()
                .map(|re| Complex64::new(re, 0.0))
                .collect(),
        }
    }

    /// Convert to another dtype with numpy `astype` semantics.
    ///
    /// Floats are truncated toward zero when cast to integers. Casting
    /// complex values to a real dtype keeps the real part.
    pub fn cast(&self, dtype: DType) -> NdArray {
        if self.dtype() == dtype {
            return self.clone();
        }
        if self.dtype().is_complex() {
            log::warn!("casting complex values to {dtype} discards the imaginary part");
        }

        match dtype {
            DType::Int64 => NdArray::Int64(match self {
                NdArray::Int64(a) => a.clone(),
                NdArray::Float32(a) => a.mapv(|v| v as i64),
                NdArray::Float64(a) => a.mapv(|v| v as i64),
                NdArray::Complex128(a) => a.mapv(|v| v.re as i64),
            }),
            DType::Float32 => NdArray::Float32(match self {
                NdArray::Int64(a) => a.mapv(|v| v as f32),
                NdArray::Float32(a) => a.clone(),
                NdArray::Float64(a) => a.mapv(|v| v as f32),
                NdArray::Complex128(a) => a.mapv(|v| v.re as f32),
            }),
            DType::Float64 => NdArray::Float64(match self {
                NdArray::Int64(a) => a.mapv(|v| v as f64),
                NdArray::Float32(a) => a.mapv(|v| v as f64),
                NdArray::Float64(a) => a.clone(),
                NdArray::Complex128(a) => a.mapv(|v| v.re),
            }),
            DType::Complex128 => NdArray::Complex128(match self {
                NdArray::Int64(a) => a.mapv(|v| Complex64::new(v as f64, 0.0)),
                NdArray::Float32(a) => a.mapv(|v| Complex64::new(v as f64, 0.0)),
                NdArray::Float64(a) => a.mapv(|v| Complex64::new(v, 0.0)),
                NdArray::Complex128(a) => a.clone(),
            }),
        }
    }

    /// Cast every array to the dtype they promote to together.
    /// Order is preserved.
    pub fn promote_all(arrays: &[&NdArray]) -> Vec<NdArray> {
        match DType::result_type(arrays.iter().map(|a| a.dtype())) {
            Some(common) => {
                log::trace!("promoting {} arrays to {common}", arrays.len());
                arrays.iter().map(|a| a.cast(common)).collect()
            }
            None => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_from_shape_vec() {
        let a = NdArray::from_shape_vec(&[2, 3], vec![1.0f64, 2.0, 3.0, 4.0, 5.0, 6.0]).unwrap();
        assert_eq!(a.dtype(), DType::Float64);
        assert_eq!(a.shape(), Shape::new(vec![2, 3]));
        assert_eq!(a.len(), 6);

        assert!(NdArray::from_shape_vec(&[2, 2], vec![1i64, 2, 3]).is_err());
    }

    #[test]
    fn test_scalar_and_vector() {
        let s = NdArray::scalar(2.5f32);
        assert_eq!(s.ndim(), 0);
        assert_eq!(s.to_f64_vec(), vec![2.5]);

        let v = NdArray::vector(vec![1i64, 2, 3]);
        assert_eq!(v.shape(), Shape::new(vec![3]));
    }

    #[test]
    fn test_cast_truncates_toward_zero() {
        let a = NdArray::vector(vec![1.7f64, -1.7, 0.2]);
        let ints = a.cast(DType::Int64);
        assert_eq!(ints, NdArray::vector(vec![1i64, -1, 0]));
    }

    #[test]
    fn test_cast_complex_keeps_real_part() {
        let c = NdArray::vector(vec![Complex64::new(1.5, 2.0), Complex64::new(-3.0, 1.0)]);
        assert_eq!(c.cast(DType::Float64).to_f64_vec(), vec![1.5, -3.0]);

        let back = NdArray::vector(vec![2.0f32]).cast(DType::Complex128);
        assert_eq!(back.to_complex_vec(), vec![Complex64::new(2.0, 0.0)]);
    }

    #[test]
    fn test_cast_float32_precision() {
        let a = NdArray::vector(vec![0.1f64]).cast(DType::Float32);
        assert_abs_diff_eq!(a.to_f64_vec()[0], 0.1, epsilon = 1e-7);
    }

    #[test]
    fn test_promote_all_preserves_order() {
        let a = NdArray::vector(vec![1i64, 2]);
        let b = NdArray::vector(vec![0.5f32]);
        let promoted = NdArray::promote_all(&[&a, &b]);
        assert_eq!(promoted.len(), 2);
        assert_eq!(promoted[0], NdArray::vector(vec![1.0f64, 2.0]));
        assert_eq!(promoted[1], NdArray::vector(vec![0.5f64]));
    }

    #[test]
    fn test_as_array() {
        let a = NdArray::vector(vec![1.0f64, 2.0]);
        assert!(a.as_array::<f64>().is_some());
        assert!(a.as_array::<f32>().is_none());
    }
}
