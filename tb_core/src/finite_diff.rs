//! Finite difference utilities for gradient verification.
//!
//! Used to check the gradients an autodiff interface reports for boxed
//! operations against a purely numerical estimate.

use crate::array::NdArray;
use crate::error::Result;

/// Gradient of a scalar function of one array, by central differences.
///
/// `point` is evaluated in float64; the returned array has the same shape.
///
/// # Example
/// ```
/// use tb_core::{finite_diff_grad, NdArray};
///
/// // f(x) = sum(x^2), df/dx = 2x
/// let f = |x: &NdArray| Ok(x.to_f64_vec().iter().map(|v| v * v).sum());
/// let point = NdArray::vector(vec![3.0f64, 4.0]);
/// let grad = finite_diff_grad(f, &point, 1e-6).unwrap().to_f64_vec();
///
/// assert!((grad[0] - 6.0).abs() < 1e-5);
/// assert!((grad[1] - 8.0).abs() < 1e-5);
/// ```
pub fn finite_diff_grad<F>(f: F, point: &NdArray, eps: f64) -> Result<NdArray>
where
    F: Fn(&NdArray) -> Result<f64>,
{
    let shape = point.shape().dims().to_vec();
    let values = point.to_f64_vec();

    let mut perturbed = values.clone();
    let mut grads = Vec::with_capacity(values.len());

    for i in 0..values.len() {
        perturbed[i] = values[i] + eps;
        let f_plus = f(&NdArray::from_shape_vec(&shape, perturbed.clone())?)?;

        perturbed[i] = values[i] - eps;
        let f_minus = f(&NdArray::from_shape_vec(&shape, perturbed.clone())?)?;

        perturbed[i] = values[i];
        grads.push((f_plus - f_minus) / (2.0 * eps));
    }

    NdArray::from_shape_vec(&shape, grads)
}

/// Maximum absolute element-wise difference between two gradients.
pub fn max_grad_error(grad1: &NdArray, grad2: &NdArray) -> f64 {
    assert_eq!(grad1.shape(), grad2.shape());
    grad1
        .to_f64_vec()
        .iter()
        .zip(grad2.to_f64_vec().iter())
        .map(|(a, b)| (a - b).abs())
        .fold(0.0, f64::max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dtype::DType;

    #[test]
    fn test_finite_diff_keeps_shape() {
        // f(x) = sum(sin(x)) over a 2x2 array
        let f = |x: &NdArray| Ok(x.to_f64_vec().iter().map(|v| v.sin()).sum());
        let point = NdArray::from_shape_vec(&[2, 2], vec![0.0f64, 0.5, 1.0, 1.5]).unwrap();
        let grad = finite_diff_grad(f, &point, 1e-6).unwrap();

        assert_eq!(grad.shape(), point.shape());
        for (g, x) in grad.to_f64_vec().iter().zip(point.to_f64_vec()) {
            assert!((g - x.cos()).abs() < 1e-6);
        }
    }

    #[test]
    fn test_finite_diff_integer_point() {
        let f = |x: &NdArray| Ok(x.to_f64_vec()[0].powi(3));
        let grad = finite_diff_grad(f, &NdArray::vector(vec![2i64]), 1e-5).unwrap();
        assert_eq!(grad.dtype(), DType::Float64);
        assert!((grad.to_f64_vec()[0] - 12.0).abs() < 1e-4);
    }

    #[test]
    fn test_max_grad_error() {
        let g1 = NdArray::vector(vec![1.0f64, 2.0, 3.0]);
        let g2 = NdArray::vector(vec![1.1f64, 2.0, 2.8]);
        assert!((max_grad_error(&g1, &g2) - 0.2).abs() < 1e-10);
    }
}
