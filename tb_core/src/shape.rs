//! Shape utilities shared by every interface.

use std::fmt;

use crate::error::{BoxError, Result};

/// A tensor shape (dimensions).
#[derive(Clone, PartialEq, Eq, Hash, Default)]
pub struct Shape(pub Vec<usize>);

impl Shape {
    /// Create a new shape from dimensions.
    pub fn new(dims: Vec<usize>) -> Self {
        Shape(dims)
    }

    /// Create a scalar shape (0-dimensional).
    pub fn scalar() -> Self {
        Shape(vec![])
    }

    /// Number of dimensions.
    pub fn ndim(&self) -> usize {
        self.0.len()
    }

    /// Get dimension at index.
    pub fn dim(&self, idx: usize) -> usize {
        self.0[idx]
    }

    /// Get dimensions as slice.
    pub fn dims(&self) -> &[usize] {
        &self.0
    }

    /// Total number of elements. A scalar holds one element.
    pub fn numel(&self) -> usize {
        self.0.iter().product()
    }

    /// Check if this is a scalar (0-dim tensor).
    pub fn is_scalar(&self) -> bool {
        self.0.is_empty()
    }

    /// Broadcast two shapes against each other with numpy rules.
    /// Returns `None` when the shapes are incompatible.
    pub fn broadcast_with(&self, other: &Shape) -> Option<Shape> {
        let ndim = self.ndim().max(other.ndim());
        let mut result = vec![0usize; ndim];

        for i in 0..ndim {
            let d1 = if i < ndim - self.ndim() {
                1
            } else {
                self.0[i - (ndim - self.ndim())]
            };
            let d2 = if i < ndim - other.ndim() {
                1
            } else {
                other.0[i - (ndim - other.ndim())]
            };

            if d1 == d2 {
                result[i] = d1;
            } else if d1 == 1 {
                result[i] = d2;
            } else if d2 == 1 {
                result[i] = d1;
            } else {
                return None;
            }
        }

        Some(Shape(result))
    }

    /// Same as [`Shape::broadcast_with`], reporting incompatibility as an error.
    pub fn try_broadcast(&self, other: &Shape) -> Result<Shape> {
        self.broadcast_with(other).ok_or_else(|| BoxError::Broadcast {
            lhs: self.clone(),
            rhs: other.clone(),
        })
    }

    /// Resolve a list of axes, rejecting duplicates. The result keeps the
    /// caller's order.
    pub fn normalize_axes(&self, axes: &[isize]) -> Result<Vec<usize>> {
        let mut resolved = Vec::with_capacity(axes.len());
        for &axis in axes {
            let ax = normalize_axis(axis, self.ndim())?;
            if resolved.contains(&ax) {
                return Err(BoxError::DuplicateAxis { axis: ax });
            }
            resolved.push(ax);
        }
        Ok(resolved)
    }
}

/// Resolve `axis` against an array with `ndim` dimensions. Negative axes
/// count from the end.
pub fn normalize_axis(axis: isize, ndim: usize) -> Result<usize> {
    let resolved = if axis < 0 { axis + ndim as isize } else { axis };
    if resolved < 0 || resolved >= ndim as isize {
        return Err(BoxError::AxisOutOfBounds { axis, ndim });
    }
    Ok(resolved as usize)
}

impl fmt::Debug for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Shape({:?})", self.0)
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (i, d) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", d)?;
        }
        if self.0.len() == 1 {
            write!(f, ",")?;
        }
        write!(f, ")")
    }
}

impl From<Vec<usize>> for Shape {
    fn from(v: Vec<usize>) -> Self {
        Shape(v)
    }
}

impl From<&[usize]> for Shape {
    fn from(s: &[usize]) -> Self {
        Shape(s.to_vec())
    }
}

/// Which product `dot` performs for a pair of operand shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DotKind {
    /// Both operands are rank-2: plain matrix multiply.
    MatMul,
    /// Both operands are rank-0: scalar multiply.
    Scalar,
    /// Anything else: numpy's generic `dot`.
    General,
}

impl DotKind {
    pub fn select(lhs: &Shape, rhs: &Shape) -> DotKind {
        match (lhs.ndim(), rhs.ndim()) {
            (2, 2) => DotKind::MatMul,
            (0, 0) => DotKind::Scalar,
            _ => DotKind::General,
        }
    }
}

/// Reshape plan that lowers numpy's generic `dot` onto one rank-2 matmul.
///
/// `dot(a, b)` contracts the last axis of `a` with the second-to-last axis of
/// `b` (its only axis when `b` is 1-D). `a` is viewed as `(rows, contract)`,
/// `b` is permuted so the contracted axis leads and viewed as
/// `(contract, cols)`; the product is reshaped to `out_shape`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DotPlan {
    pub rows: usize,
    pub contract: usize,
    pub cols: usize,
    pub rhs_perm: Vec<usize>,
    pub out_shape: Shape,
}

impl DotPlan {
    /// Plan a generic dot. Both operands must have at least one dimension;
    /// rank-0 operands are handled by broadcasting multiplication instead.
    pub fn new(lhs: &Shape, rhs: &Shape) -> Result<DotPlan> {
        debug_assert!(lhs.ndim() >= 1 && rhs.ndim() >= 1);

        let lhs_axis = lhs.ndim() - 1;
        let rhs_axis = if rhs.ndim() == 1 { 0 } else { rhs.ndim() - 2 };
        let contract = lhs.dim(lhs_axis);

        if contract != rhs.dim(rhs_axis) {
            return Err(BoxError::NotAligned {
                lhs: lhs.clone(),
                rhs: rhs.clone(),
                lhs_axis,
                lhs_len: contract,
                rhs_axis,
                rhs_len: rhs.dim(rhs_axis),
            });
        }

        let rhs_rest: Vec<usize> = (0..rhs.ndim()).filter(|&i| i != rhs_axis).collect();
        let mut rhs_perm = Vec::with_capacity(rhs.ndim());
        rhs_perm.push(rhs_axis);
        rhs_perm.extend(rhs_rest.iter().copied());

        let mut out_dims: Vec<usize> = lhs.dims()[..lhs_axis].to_vec();
        out_dims.extend(rhs_rest.iter().map(|&i| rhs.dim(i)));

        Ok(DotPlan {
            rows: lhs.dims()[..lhs_axis].iter().product(),
            contract,
            cols: rhs_rest.iter().map(|&i| rhs.dim(i)).product(),
            rhs_perm,
            out_shape: Shape::new(out_dims),
        })
    }
}

/// Output shape of `take`: the gathered axis is replaced by the index shape.
/// With no axis the input is flattened first and the index shape is the result.
pub fn take_shape(input: &Shape, indices: &Shape, axis: Option<usize>) -> Shape {
    match axis {
        None => indices.clone(),
        Some(axis) => {
            let mut dims = input.dims()[..axis].to_vec();
            dims.extend_from_slice(indices.dims());
            dims.extend_from_slice(&input.dims()[axis + 1..]);
            Shape::new(dims)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shape_basics() {
        let s = Shape::new(vec![2, 3, 4]);
        assert_eq!(s.ndim(), 3);
        assert_eq!(s.dim(1), 3);
        assert_eq!(s.numel(), 24);
        assert!(!s.is_scalar());

        let scalar = Shape::scalar();
        assert_eq!(scalar.numel(), 1);
        assert!(scalar.is_scalar());

        assert_eq!(Shape::new(vec![3, 0]).numel(), 0);
    }

    #[test]
    fn test_display_matches_numpy_tuples() {
        assert_eq!(Shape::scalar().to_string(), "()");
        assert_eq!(Shape::new(vec![3]).to_string(), "(3,)");
        assert_eq!(Shape::new(vec![2, 3]).to_string(), "(2, 3)");
    }

    #[test]
    fn test_broadcast() {
        let a = Shape::new(vec![1, 4]);
        let b = Shape::new(vec![3, 1]);
        assert_eq!(a.broadcast_with(&b), Some(Shape::new(vec![3, 4])));

        let c = Shape::new(vec![2, 3]);
        assert_eq!(c.broadcast_with(&Shape::scalar()), Some(c.clone()));
        assert_eq!(c.broadcast_with(&Shape::new(vec![2, 4])), None);
    }

    #[test]
    fn test_try_broadcast_error() {
        let err = Shape::new(vec![2, 3])
            .try_broadcast(&Shape::new(vec![4]))
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "operands could not be broadcast together with shapes (2, 3) (4,)"
        );
    }

    #[test]
    fn test_normalize_axis() {
        assert_eq!(normalize_axis(-1, 3).unwrap(), 2);
        assert_eq!(normalize_axis(0, 3).unwrap(), 0);
        assert!(matches!(
            normalize_axis(3, 3),
            Err(BoxError::AxisOutOfBounds { axis: 3, ndim: 3 })
        ));
        assert!(normalize_axis(-4, 3).is_err());
        assert!(normalize_axis(0, 0).is_err());
    }

    #[test]
    fn test_normalize_axes_rejects_duplicates() {
        let s = Shape::new(vec![2, 3]);
        assert_eq!(s.normalize_axes(&[1, 0]).unwrap(), vec![1, 0]);
        assert!(matches!(
            s.normalize_axes(&[1, -1]),
            Err(BoxError::DuplicateAxis { axis: 1 })
        ));
    }

    #[test]
    fn test_dot_kind_selection() {
        let m = Shape::new(vec![2, 2]);
        let v = Shape::new(vec![2]);
        let s = Shape::scalar();
        assert_eq!(DotKind::select(&m, &m), DotKind::MatMul);
        assert_eq!(DotKind::select(&s, &s), DotKind::Scalar);
        assert_eq!(DotKind::select(&m, &v), DotKind::General);
        assert_eq!(DotKind::select(&s, &m), DotKind::General);
        assert_eq!(
            DotKind::select(&Shape::new(vec![2, 2, 2]), &m),
            DotKind::General
        );
    }

    #[test]
    fn test_dot_plan_vector_vector() {
        let plan = DotPlan::new(&Shape::new(vec![3]), &Shape::new(vec![3])).unwrap();
        assert_eq!(plan.rows, 1);
        assert_eq!(plan.contract, 3);
        assert_eq!(plan.cols, 1);
        assert_eq!(plan.out_shape, Shape::scalar());
    }

    #[test]
    fn test_dot_plan_nd() {
        // (2, 3, 4) . (5, 4, 6) -> (2, 3, 5, 6)
        let plan = DotPlan::new(&Shape::new(vec![2, 3, 4]), &Shape::new(vec![5, 4, 6])).unwrap();
        assert_eq!(plan.rows, 6);
        assert_eq!(plan.contract, 4);
        assert_eq!(plan.cols, 30);
        assert_eq!(plan.rhs_perm, vec![1, 0, 2]);
        assert_eq!(plan.out_shape, Shape::new(vec![2, 3, 5, 6]));
    }

    #[test]
    fn test_dot_plan_not_aligned() {
        let err = DotPlan::new(&Shape::new(vec![2, 3]), &Shape::new(vec![4])).unwrap_err();
        assert_eq!(
            err.to_string(),
            "shapes (2, 3) and (4,) not aligned: 3 (dim 1) != 4 (dim 0)"
        );
    }

    #[test]
    fn test_take_shape() {
        let input = Shape::new(vec![2, 3, 4]);
        let idx = Shape::new(vec![5]);
        assert_eq!(take_shape(&input, &idx, Some(1)), Shape::new(vec![2, 5, 4]));
        assert_eq!(take_shape(&input, &idx, None), Shape::new(vec![5]));
    }
}
