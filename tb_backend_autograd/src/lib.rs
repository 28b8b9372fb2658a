//! autograd interface for TensorBox.
//!
//! [`AutogradBox`] wraps a candle [`Tensor`] on the CPU. Values created with
//! [`AutogradBox::variable`] are tracked: every operation applied to them, or
//! to anything derived from them, is recorded by candle so that
//! [`AutogradBox::backward`] can return their gradients.
//!
//! candle has no complex dtype, so complex128 arrays are rejected with
//! [`BoxError::UnsupportedDType`].
//!
//! ```ignore
//! use tb_core::prelude::*;
//! use tb_backend_autograd::AutogradBox;
//!
//! let x = AutogradBox::variable(&NdArray::vector(vec![1.0f64, 4.0]))?;
//! let y = x.sqrt()?.sum(None, false)?;
//! let grad = y.backward()?.wrt(&x)?.unwrap();
//! assert_eq!(grad.to_f64_vec(), vec![0.5, 0.25]);
//! ```

use std::f64::consts::PI;

use candle_core::{DType as CandleDType, Device, Tensor, Var};
use tb_core::ndarray::ArrayD;
use tb_core::prelude::*;
use tb_core::{normalize_axis, take_shape, DotPlan};

mod arcsin;
mod backward;
mod convert;

pub use backward::Gradients;

use arcsin::Arcsin;
use convert::{box_dtype, candle_dtype, ensure_dtype, to_ndarray, to_tensor, CandleResultExt};

pub(crate) const INTERFACE: &str = "autograd";

/// A boxed candle tensor, tracked for gradients when `requires_grad` is set.
#[derive(Debug, Clone)]
pub struct AutogradBox {
    data: Tensor,
    requires_grad: bool,
}

impl AutogradBox {
    /// An untracked value.
    pub fn constant(array: &NdArray) -> Result<Self> {
        Ok(AutogradBox {
            data: to_tensor(array)?,
            requires_grad: false,
        })
    }

    /// A value gradients can be taken with respect to. Only float dtypes can
    /// be differentiated.
    pub fn variable(array: &NdArray) -> Result<Self> {
        if !array.dtype().is_float() {
            return Err(BoxError::UnsupportedDType {
                op: "variable",
                dtype: array.dtype(),
                interface: INTERFACE,
            });
        }
        let var = Var::from_tensor(&to_tensor(array)?).lift()?;
        log::debug!("tracking variable of shape {}", array.shape());
        Ok(AutogradBox {
            data: var.into_inner(),
            requires_grad: true,
        })
    }

    /// Box with `requires_grad` set as requested.
    pub fn from_array(array: &NdArray, requires_grad: bool) -> Result<Self> {
        if requires_grad {
            Self::variable(array)
        } else {
            Self::constant(array)
        }
    }

    /// The underlying candle tensor.
    pub fn tensor(&self) -> &Tensor {
        &self.data
    }

    /// Back-propagate from this value, seeding its gradient with ones.
    pub fn backward(&self) -> Result<Gradients> {
        if !self.requires_grad {
            return Err(BoxError::UnsupportedOperation {
                op: "backward on a value that does not require grad",
                interface: INTERFACE,
            });
        }
        log::debug!("backward from value of shape {}", self.shape());
        let store = self.data.backward().lift()?;
        Ok(Gradients::new(store))
    }

    fn derive(&self, data: Tensor) -> Self {
        AutogradBox {
            data,
            requires_grad: self.requires_grad,
        }
    }

    fn derive2(&self, other: &Self, data: Tensor) -> Self {
        AutogradBox {
            data,
            requires_grad: self.requires_grad || other.requires_grad,
        }
    }

    /// The tensor in float64 when it holds integers.
    fn inexact(&self) -> Result<Tensor> {
        ensure_dtype(&self.data, candle_dtype(self.dtype().to_inexact(), "inexact")?)
    }

    /// Both tensors cast to their common dtype.
    fn promoted(&self, other: &Self, dtype: DType) -> Result<(Tensor, Tensor)> {
        let target = candle_dtype(dtype, "promote")?;
        if self.data.dtype() != target || other.data.dtype() != target {
            log::trace!("promoting {} and {} to {dtype}", self.dtype(), other.dtype());
        }
        Ok((ensure_dtype(&self.data, target)?, ensure_dtype(&other.data, target)?))
    }

    fn binary<F>(&self, other: &Self, dtype: DType, op: F) -> Result<Self>
    where
        F: FnOnce(&Tensor, &Tensor) -> candle_core::Result<Tensor>,
    {
        self.shape().try_broadcast(&other.shape())?;
        let (a, b) = self.promoted(other, dtype)?;
        Ok(self.derive2(other, op(&a, &b).lift()?))
    }

    fn tensors(values: &[Self], dtype: DType) -> Result<Vec<Tensor>> {
        let target = candle_dtype(dtype, "promote")?;
        values.iter().map(|v| ensure_dtype(&v.data, target)).collect()
    }
}

impl From<Var> for AutogradBox {
    fn from(var: Var) -> Self {
        AutogradBox {
            data: var.into_inner(),
            requires_grad: true,
        }
    }
}

/// Generic dot of two tensors with the same float dtype.
fn dot_tensors(a: &Tensor, b: &Tensor) -> Result<Tensor> {
    let (lhs, rhs) = (Shape::from(a.dims()), Shape::from(b.dims()));

    match DotKind::select(&lhs, &rhs) {
        DotKind::MatMul => {
            log::trace!("dot {lhs} x {rhs}: matmul");
            DotPlan::new(&lhs, &rhs)?;
            a.contiguous()
                .and_then(|a| a.matmul(&b.contiguous()?))
                .lift()
        }
        DotKind::Scalar => {
            log::trace!("dot {lhs} x {rhs}: scalar multiply");
            a.mul(b).lift()
        }
        DotKind::General if lhs.is_scalar() || rhs.is_scalar() => {
            log::trace!("dot {lhs} x {rhs}: broadcast multiply");
            a.broadcast_mul(b).lift()
        }
        DotKind::General => {
            log::trace!("dot {lhs} x {rhs}: generic dot");
            let plan = DotPlan::new(&lhs, &rhs)?;
            let a2 = a.reshape((plan.rows, plan.contract)).lift()?;
            let b2 = b
                .permute(plan.rhs_perm.clone())
                .and_then(|b| b.contiguous())
                .and_then(|b| b.reshape((plan.contract, plan.cols)))
                .lift()?;
            a2.matmul(&b2)
                .and_then(|out| out.reshape(plan.out_shape.dims().to_vec()))
                .lift()
        }
    }
}

impl TensorBox for AutogradBox {
    type Raw = Tensor;

    const INTERFACE: &'static str = INTERFACE;

    fn wrap(raw: Tensor) -> Self {
        AutogradBox {
            requires_grad: raw.track_op(),
            data: raw,
        }
    }

    fn unbox(&self) -> &Tensor {
        &self.data
    }

    fn into_raw(self) -> Tensor {
        self.data
    }

    fn astensor(array: &NdArray) -> Result<Tensor> {
        to_tensor(array)
    }

    fn numpy(&self) -> Result<NdArray> {
        to_ndarray(&self.data)
    }

    fn shape(&self) -> Shape {
        Shape::from(self.data.dims())
    }

    fn ndim(&self) -> usize {
        self.data.rank()
    }

    fn dtype(&self) -> DType {
        box_dtype(self.data.dtype())
    }

    fn requires_grad(&self) -> bool {
        self.requires_grad
    }

    fn abs(&self) -> Result<Self> {
        let x = &self.data;
        let out = match x.dtype() {
            // candle has no integer abs kernel; negate below zero, exactly
            CandleDType::I64 => x.zeros_like().and_then(|zeros| {
                let negated = zeros.sub(x)?;
                x.lt(&zeros)?.where_cond(&negated, x)
            }),
            _ => x.abs(),
        };
        Ok(self.derive(out.lift()?))
    }

    fn angle(&self) -> Result<Self> {
        // pi where negative, 0 elsewhere; the comparison carries no gradient
        let x = self.inexact()?;
        let out = x
            .zeros_like()
            .and_then(|zeros| x.lt(&zeros))
            .and_then(|neg| neg.to_dtype(x.dtype()))
            .and_then(|neg| neg.affine(PI, 0.0))
            .lift()?;
        Ok(self.derive(out))
    }

    fn arcsin(&self) -> Result<Self> {
        let x = self.inexact()?;
        let out = x.contiguous().and_then(|x| x.apply_op1(Arcsin)).lift()?;
        Ok(self.derive(out))
    }

    fn sqrt(&self) -> Result<Self> {
        let out = self.inexact()?.sqrt().lift()?;
        Ok(self.derive(out))
    }

    fn add(&self, other: &Self) -> Result<Self> {
        let dtype = self.dtype().promote(other.dtype());
        self.binary(other, dtype, |a, b| a.broadcast_add(b))
    }

    fn sub(&self, other: &Self) -> Result<Self> {
        let dtype = self.dtype().promote(other.dtype());
        self.binary(other, dtype, |a, b| a.broadcast_sub(b))
    }

    fn mul(&self, other: &Self) -> Result<Self> {
        let dtype = self.dtype().promote(other.dtype());
        self.binary(other, dtype, |a, b| a.broadcast_mul(b))
    }

    fn div(&self, other: &Self) -> Result<Self> {
        let dtype = self.dtype().promote(other.dtype()).to_inexact();
        self.binary(other, dtype, |a, b| a.broadcast_div(b))
    }

    fn cast(&self, dtype: DType) -> Result<Self> {
        let out = ensure_dtype(&self.data, candle_dtype(dtype, "cast")?)?;
        Ok(self.derive(out))
    }

    fn ones_like(&self) -> Result<Self> {
        Ok(AutogradBox {
            data: self.data.ones_like().lift()?,
            requires_grad: false,
        })
    }

    fn expand_dims(&self, axis: isize) -> Result<Self> {
        let axis = normalize_axis(axis, self.ndim() + 1)?;
        Ok(self.derive(self.data.unsqueeze(axis).lift()?))
    }

    fn transpose(&self) -> Result<Self> {
        if self.ndim() < 2 {
            return Ok(self.clone());
        }
        let reversed: Vec<usize> = (0..self.ndim()).rev().collect();
        Ok(self.derive(self.data.permute(reversed).lift()?))
    }

    fn sum(&self, axes: Option<&[isize]>, keepdims: bool) -> Result<Self> {
        let out = match axes {
            None if keepdims => self
                .data
                .sum_all()
                .and_then(|s| s.reshape(vec![1; self.ndim()])),
            None => self.data.sum_all(),
            Some(axes) => {
                let axes = self.shape().normalize_axes(axes)?;
                if axes.is_empty() {
                    return Ok(self.clone());
                }
                let kept: Vec<usize> = self
                    .shape()
                    .dims()
                    .iter()
                    .enumerate()
                    .filter(|(i, _)| !axes.contains(i))
                    .map(|(_, &d)| d)
                    .collect();
                let summed = self.data.sum_keepdim(axes);
                if keepdims {
                    summed
                } else {
                    summed.and_then(|s| s.reshape(kept))
                }
            }
        };
        Ok(self.derive(out.lift()?))
    }

    fn take(&self, indices: &Indices, axis: Option<isize>) -> Result<Self> {
        let (source, axis) = match axis {
            None => (self.data.flatten_all().lift()?, None),
            Some(ax) => (self.data.clone(), Some(normalize_axis(ax, self.ndim())?)),
        };
        let gathered = axis.unwrap_or(0);
        let resolved = indices.resolve(gathered, source.dims()[gathered])?;

        let ids: Vec<u32> = resolved.iter().map(|&i| i as u32).collect();
        let ids = Tensor::from_vec(ids, resolved.len(), &Device::Cpu).lift()?;
        let out_shape = take_shape(&self.shape(), indices.shape(), axis);

        let out = source
            .index_select(&ids, gathered)
            .and_then(|t| t.reshape(out_shape.dims().to_vec()))
            .lift()?;
        Ok(self.derive(out))
    }

    fn dot(&self, other: &Self) -> Result<Self> {
        let dtype = self.dtype().promote(other.dtype());
        let (a, b) = self.promoted(other, dtype)?;

        let out = if dtype.is_integer() {
            // candle only multiplies float matrices
            let a = a.to_dtype(CandleDType::F64).lift()?;
            let b = b.to_dtype(CandleDType::F64).lift()?;
            dot_tensors(&a, &b)?.to_dtype(CandleDType::I64).lift()?
        } else {
            dot_tensors(&a, &b)?
        };
        Ok(self.derive2(other, out))
    }

    fn stack(values: &[Self], axis: isize) -> Result<Self> {
        let first = values.first().ok_or(BoxError::EmptyInput { op: "stack" })?;
        let axis = normalize_axis(axis, first.ndim() + 1)?;

        let expected = first.shape();
        if let Some(bad) = values.iter().find(|v| v.shape() != expected) {
            return Err(BoxError::ShapeMismatch {
                expected,
                got: bad.shape(),
            });
        }

        let dtype = DType::result_type(values.iter().map(|v| v.dtype())).unwrap_or(first.dtype());
        let tensors = Self::tensors(values, dtype)?;
        Ok(AutogradBox {
            data: Tensor::stack(&tensors, axis).lift()?,
            requires_grad: values.iter().any(|v| v.requires_grad),
        })
    }

    fn concatenate(values: &[Self], axis: isize) -> Result<Self> {
        let first = values.first().ok_or(BoxError::EmptyInput { op: "concatenate" })?;
        if values.iter().any(|v| v.ndim() == 0) {
            return Err(BoxError::ZeroDimConcat);
        }
        let axis = normalize_axis(axis, first.ndim())?;

        let dtype = DType::result_type(values.iter().map(|v| v.dtype())).unwrap_or(first.dtype());
        let tensors = Self::tensors(values, dtype)?;
        Ok(AutogradBox {
            data: Tensor::cat(&tensors, axis).lift()?,
            requires_grad: values.iter().any(|v| v.requires_grad),
        })
    }

    fn where_cond(condition: &ArrayD<bool>, x: &Self, y: &Self) -> Result<Self> {
        let out = Shape::from(condition.shape())
            .try_broadcast(&x.shape())?
            .try_broadcast(&y.shape())?;
        let dims = out.dims().to_vec();

        let mask: Vec<u8> = condition.iter().map(|&c| u8::from(c)).collect();
        let mask = Tensor::from_vec(mask, condition.shape().to_vec(), &Device::Cpu)
            .and_then(|m| m.broadcast_as(dims.clone()))
            .lift()?;

        let dtype = x.dtype().promote(y.dtype());
        let (a, b) = x.promoted(y, dtype)?;
        let a = a.broadcast_as(dims.clone()).lift()?;
        let b = b.broadcast_as(dims).lift()?;

        Ok(x.derive2(y, mask.where_cond(&a, &b).lift()?))
    }
}
