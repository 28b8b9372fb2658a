//! # tb_core - the TensorBox contract
//!
//! A boxed tensor wraps one array from a numeric backend and tags it with the
//! interface that produced it. Every interface implements the same
//! [`TensorBox`] operations, so framework code can call `abs`, `dot`, `stack`
//! or `sum` without caring which library holds the data.
//!
//! This crate only holds what the interfaces share:
//! - [`TensorBox`] - the operation contract
//! - [`NdArray`] and [`DType`] - plain arrays every interface can export
//! - [`Shape`], [`DotKind`], [`DotPlan`] - shape bookkeeping
//! - [`Indices`] - index arrays for `take`
//! - [`BoxError`] - the error type
//!
//! ## Example
//!
//! ```ignore
//! use tb_core::prelude::*;
//! use tb_backend_numpy::NumpyBox;
//!
//! let x = NumpyBox::wrap(NdArray::vector(vec![1.0f64, 4.0, 9.0]));
//! let y = x.sqrt()?.sum(None, false)?;
//! assert_eq!(y.interface(), "numpy");
//! assert_eq!(y.numpy()?.to_f64_vec(), vec![6.0]);
//! ```

pub mod array;
pub mod dtype;
pub mod error;
pub mod finite_diff;
pub mod indices;
pub mod shape;
pub mod tensorbox;

pub use array::{Element, NdArray};
pub use dtype::DType;
pub use error::{BoxError, Result};
pub use finite_diff::{finite_diff_grad, max_grad_error};
pub use indices::Indices;
pub use shape::{normalize_axis, take_shape, DotKind, DotPlan, Shape};
pub use tensorbox::TensorBox;

pub use ndarray;
pub use num_complex;

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::array::{Element, NdArray};
    pub use crate::dtype::DType;
    pub use crate::error::{BoxError, Result};
    pub use crate::indices::Indices;
    pub use crate::shape::{DotKind, Shape};
    pub use crate::tensorbox::TensorBox;
}
