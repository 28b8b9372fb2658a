//! ndarray kernels behind [`NumpyBox`](crate::NumpyBox).
//!
//! Each function takes plain arrays, promotes mixed dtypes the way numpy
//! does, and forwards to the matching `ndarray` routine.

use std::ops::Add;

use ndarray::{ArrayD, ArrayViewD, Axis, Ix2, IxDyn, LinalgScalar, Zip};
use num_traits::Zero;
use tb_core::{
    normalize_axis, take_shape, BoxError, DType, DotKind, DotPlan, Element, Indices, NdArray,
    Result, Shape,
};

/// Match two arrays already promoted to one dtype, re-wrapping the body.
macro_rules! zip_same {
    ($lhs:expr, $rhs:expr, ($x:ident, $y:ident) => $body:expr) => {
        match ($lhs, $rhs) {
            (NdArray::Int64($x), NdArray::Int64($y)) => NdArray::Int64($body),
            (NdArray::Float32($x), NdArray::Float32($y)) => NdArray::Float32($body),
            (NdArray::Float64($x), NdArray::Float64($y)) => NdArray::Float64($body),
            (NdArray::Complex128($x), NdArray::Complex128($y)) => NdArray::Complex128($body),
            _ => unreachable!("operands are promoted to a common dtype"),
        }
    };
}

/// Run `$body` with `$views` bound to views of every array, all of one dtype.
macro_rules! join_views {
    ($arrays:expr, $views:ident => $body:expr) => {
        match $arrays[0].dtype() {
            DType::Int64 => {
                let $views = views::<i64>(&$arrays);
                NdArray::Int64($body)
            }
            DType::Float32 => {
                let $views = views::<f32>(&$arrays);
                NdArray::Float32($body)
            }
            DType::Float64 => {
                let $views = views::<f64>(&$arrays);
                NdArray::Float64($body)
            }
            DType::Complex128 => {
                let $views = views::<num_complex::Complex64>(&$arrays);
                NdArray::Complex128($body)
            }
        }
    };
}

fn views<A: Element>(arrays: &[NdArray]) -> Vec<ArrayViewD<'_, A>> {
    arrays
        .iter()
        .filter_map(|a| a.as_array::<A>())
        .map(|a| a.view())
        .collect()
}

/// Copy a (possibly strided) view into a standard-layout array of `shape`.
fn reshape<A: Clone>(a: ArrayViewD<'_, A>, shape: &[usize]) -> Result<ArrayD<A>> {
    Ok(ArrayD::from_shape_vec(IxDyn(shape), a.iter().cloned().collect())?)
}

fn shape_of<A>(a: &ArrayD<A>) -> Shape {
    Shape::from(a.shape())
}

// === Element-wise unary ===

pub(crate) fn abs(x: &NdArray) -> NdArray {
    match x {
        NdArray::Int64(a) => NdArray::Int64(a.mapv(i64::wrapping_abs)),
        NdArray::Float32(a) => NdArray::Float32(a.mapv(f32::abs)),
        NdArray::Float64(a) => NdArray::Float64(a.mapv(f64::abs)),
        NdArray::Complex128(a) => NdArray::Float64(a.mapv(|v| v.norm())),
    }
}

pub(crate) fn angle(x: &NdArray) -> NdArray {
    match x {
        NdArray::Int64(_) => angle(&x.cast(DType::Float64)),
        NdArray::Float32(a) => NdArray::Float32(a.mapv(|v| 0.0f32.atan2(v))),
        NdArray::Float64(a) => NdArray::Float64(a.mapv(|v| 0.0f64.atan2(v))),
        NdArray::Complex128(a) => NdArray::Float64(a.mapv(|v| v.arg())),
    }
}

pub(crate) fn arcsin(x: &NdArray) -> NdArray {
    match x {
        NdArray::Int64(_) => arcsin(&x.cast(DType::Float64)),
        NdArray::Float32(a) => NdArray::Float32(a.mapv(f32::asin)),
        NdArray::Float64(a) => NdArray::Float64(a.mapv(f64::asin)),
        NdArray::Complex128(a) => NdArray::Complex128(a.mapv(|v| v.asin())),
    }
}

pub(crate) fn sqrt(x: &NdArray) -> NdArray {
    match x {
        NdArray::Int64(_) => sqrt(&x.cast(DType::Float64)),
        NdArray::Float32(a) => NdArray::Float32(a.mapv(f32::sqrt)),
        NdArray::Float64(a) => NdArray::Float64(a.mapv(f64::sqrt)),
        NdArray::Complex128(a) => NdArray::Complex128(a.mapv(|v| v.sqrt())),
    }
}

pub(crate) fn ones_like(x: &NdArray) -> NdArray {
    tb_core::map_array!(x, a => ArrayD::ones(a.raw_dim()))
}

// === Element-wise binary with broadcasting ===

fn broadcast_zip<A, F>(a: &ArrayD<A>, b: &ArrayD<A>, op: F) -> Result<ArrayD<A>>
where
    A: Clone,
    F: Fn(A, A) -> A,
{
    let (lhs, rhs) = (shape_of(a), shape_of(b));
    let out = lhs.try_broadcast(&rhs)?;
    let broadcast_err = || BoxError::Broadcast {
        lhs: lhs.clone(),
        rhs: rhs.clone(),
    };

    let av = a.broadcast(IxDyn(out.dims())).ok_or_else(broadcast_err)?;
    let bv = b.broadcast(IxDyn(out.dims())).ok_or_else(broadcast_err)?;

    Ok(Zip::from(&av)
        .and(&bv)
        .map_collect(|x, y| op(x.clone(), y.clone())))
}

#[derive(Debug, Clone, Copy)]
pub(crate) enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
}

pub(crate) fn binary(op: BinaryOp, lhs: &NdArray, rhs: &NdArray) -> Result<NdArray> {
    let mut common = lhs.dtype().promote(rhs.dtype());
    if matches!(op, BinaryOp::Div) {
        common = common.to_inexact();
    }
    let (a, b) = (lhs.cast(common), rhs.cast(common));

    Ok(match op {
        BinaryOp::Add => zip_same!(&a, &b, (x, y) => broadcast_zip(x, y, |p, q| p + q)?),
        BinaryOp::Sub => zip_same!(&a, &b, (x, y) => broadcast_zip(x, y, |p, q| p - q)?),
        BinaryOp::Mul => zip_same!(&a, &b, (x, y) => broadcast_zip(x, y, |p, q| p * q)?),
        BinaryOp::Div => zip_same!(&a, &b, (x, y) => broadcast_zip(x, y, |p, q| p / q)?),
    })
}

// === Shape operations ===

pub(crate) fn expand_dims(x: &NdArray, axis: isize) -> Result<NdArray> {
    let axis = normalize_axis(axis, x.ndim() + 1)?;
    Ok(tb_core::map_array!(x, a => a.clone().insert_axis(Axis(axis))))
}

pub(crate) fn transpose(x: &NdArray) -> NdArray {
    tb_core::map_array!(x, a => a.clone().reversed_axes())
}

// === Reductions ===

fn sum_array<A>(a: &ArrayD<A>, axes: Option<&[usize]>, keepdims: bool) -> ArrayD<A>
where
    A: Clone + Zero + Add<Output = A>,
{
    match axes {
        None => {
            let dims = if keepdims { vec![1; a.ndim()] } else { vec![] };
            ArrayD::from_elem(IxDyn(&dims), a.sum())
        }
        Some(axes) => {
            let mut sorted = axes.to_vec();
            sorted.sort_unstable();

            let mut out = a.clone();
            for &ax in sorted.iter().rev() {
                out = out.sum_axis(Axis(ax));
            }
            if keepdims {
                for &ax in &sorted {
                    out = out.insert_axis(Axis(ax));
                }
            }
            out
        }
    }
}

pub(crate) fn sum(x: &NdArray, axes: Option<&[isize]>, keepdims: bool) -> Result<NdArray> {
    let axes = axes.map(|a| x.shape().normalize_axes(a)).transpose()?;
    Ok(tb_core::map_array!(x, a => sum_array(a, axes.as_deref(), keepdims)))
}

// === Indexing ===

fn take_array<A: Clone>(a: &ArrayD<A>, indices: &Indices, axis: Option<usize>) -> Result<ArrayD<A>> {
    match axis {
        None => {
            let flat: Vec<&A> = a.iter().collect();
            let resolved = indices.resolve(0, flat.len())?;
            let values = resolved.iter().map(|&i| flat[i].clone()).collect();
            Ok(ArrayD::from_shape_vec(IxDyn(indices.shape().dims()), values)?)
        }
        Some(axis) => {
            let resolved = indices.resolve(axis, a.len_of(Axis(axis)))?;
            let selected = a.select(Axis(axis), &resolved);
            let out = take_shape(&shape_of(a), indices.shape(), Some(axis));
            reshape(selected.view(), out.dims())
        }
    }
}

pub(crate) fn take(x: &NdArray, indices: &Indices, axis: Option<isize>) -> Result<NdArray> {
    let axis = axis.map(|ax| normalize_axis(ax, x.ndim())).transpose()?;
    Ok(tb_core::map_array!(x, a => take_array(a, indices, axis)?))
}

// === Linear algebra ===

fn dot_array<A: LinalgScalar>(a: &ArrayD<A>, b: &ArrayD<A>) -> Result<ArrayD<A>> {
    let (lhs, rhs) = (shape_of(a), shape_of(b));

    match DotKind::select(&lhs, &rhs) {
        DotKind::MatMul => {
            log::trace!("dot {lhs} x {rhs}: matmul");
            // validates the inner dimensions before ndarray would panic
            DotPlan::new(&lhs, &rhs)?;
            let a2 = a.view().into_dimensionality::<Ix2>()?;
            let b2 = b.view().into_dimensionality::<Ix2>()?;
            Ok(a2.dot(&b2).into_dyn())
        }
        DotKind::Scalar => {
            log::trace!("dot {lhs} x {rhs}: scalar multiply");
            Ok(a * b)
        }
        DotKind::General if lhs.is_scalar() || rhs.is_scalar() => {
            log::trace!("dot {lhs} x {rhs}: broadcast multiply");
            broadcast_zip(a, b, |p, q| p * q)
        }
        DotKind::General => {
            log::trace!("dot {lhs} x {rhs}: generic dot");
            let plan = DotPlan::new(&lhs, &rhs)?;
            let a2 = reshape(a.view(), &[plan.rows, plan.contract])?.into_dimensionality::<Ix2>()?;
            let b2 = reshape(
                b.view().permuted_axes(plan.rhs_perm.as_slice()),
                &[plan.contract, plan.cols],
            )?
            .into_dimensionality::<Ix2>()?;
            reshape(a2.dot(&b2).into_dyn().view(), plan.out_shape.dims())
        }
    }
}

pub(crate) fn dot(lhs: &NdArray, rhs: &NdArray) -> Result<NdArray> {
    let promoted = NdArray::promote_all(&[lhs, rhs]);
    Ok(zip_same!(&promoted[0], &promoted[1], (a, b) => dot_array(a, b)?))
}

// === Joining and selection ===

pub(crate) fn stack(values: &[&NdArray], axis: isize) -> Result<NdArray> {
    let first = values.first().ok_or(BoxError::EmptyInput { op: "stack" })?;
    let axis = normalize_axis(axis, first.ndim() + 1)?;

    let expected = first.shape();
    if let Some(bad) = values.iter().find(|v| v.shape() != expected) {
        return Err(BoxError::ShapeMismatch {
            expected,
            got: bad.shape(),
        });
    }

    let promoted = NdArray::promote_all(values);
    Ok(join_views!(promoted, views => ndarray::stack(Axis(axis), &views)?))
}

pub(crate) fn concatenate(values: &[&NdArray], axis: isize) -> Result<NdArray> {
    let first = values.first().ok_or(BoxError::EmptyInput { op: "concatenate" })?;
    if values.iter().any(|v| v.ndim() == 0) {
        return Err(BoxError::ZeroDimConcat);
    }
    let axis = normalize_axis(axis, first.ndim())?;

    let promoted = NdArray::promote_all(values);
    Ok(join_views!(promoted, views => ndarray::concatenate(Axis(axis), &views)?))
}

fn select_array<A: Clone>(
    condition: &ArrayD<bool>,
    x: &ArrayD<A>,
    y: &ArrayD<A>,
    out: &Shape,
) -> Result<ArrayD<A>> {
    let dim = IxDyn(out.dims());
    let broadcast_err = |shape: Shape| BoxError::Broadcast {
        lhs: shape,
        rhs: out.clone(),
    };

    let c = condition
        .broadcast(dim.clone())
        .ok_or_else(|| broadcast_err(Shape::from(condition.shape())))?;
    let xv = x.broadcast(dim.clone()).ok_or_else(|| broadcast_err(shape_of(x)))?;
    let yv = y.broadcast(dim).ok_or_else(|| broadcast_err(shape_of(y)))?;

    Ok(Zip::from(&c)
        .and(&xv)
        .and(&yv)
        .map_collect(|&c, a, b| if c { a.clone() } else { b.clone() }))
}

pub(crate) fn where_cond(condition: &ArrayD<bool>, x: &NdArray, y: &NdArray) -> Result<NdArray> {
    let out = Shape::from(condition.shape())
        .try_broadcast(&x.shape())?
        .try_broadcast(&y.shape())?;
    let promoted = NdArray::promote_all(&[x, y]);
    Ok(zip_same!(&promoted[0], &promoted[1], (a, b) => select_array(condition, a, b, &out)?))
}
