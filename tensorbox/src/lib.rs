//! # tensorbox
//!
//! Runtime dispatch over the TensorBox interfaces.
//!
//! [`AnyBox`] holds a box from any interface and exposes the whole
//! [`TensorBox`] contract on it. Operations that combine boxes from different
//! interfaces move the lower-priority operands up first: a plain numpy array
//! meeting an autograd value becomes an untracked autograd value, so the
//! result can still be differentiated.
//!
//! ```ignore
//! use tensorbox::{AnyBox, Interface};
//! use tb_core::NdArray;
//!
//! let x = AnyBox::new(NdArray::vector(vec![1.0f64, 4.0]), Interface::Autograd, true)?;
//! let w = AnyBox::new(NdArray::vector(vec![2.0f64, 3.0]), Interface::Numpy, false)?;
//! let y = x.sqrt()?.dot(&w)?;
//! assert_eq!(y.interface(), Interface::Autograd);
//! ```

use tb_core::ndarray::ArrayD;
use tb_core::prelude::*;

mod interface;

pub use interface::Interface;
pub use tb_backend_autograd::{AutogradBox, Gradients};
pub use tb_backend_numpy::NumpyBox;

/// Apply the same method to whichever box is inside, keeping the interface.
macro_rules! dispatch {
    ($value:expr, $b:ident => $body:expr) => {
        match $value {
            AnyBox::Numpy($b) => AnyBox::Numpy($body),
            AnyBox::Autograd($b) => AnyBox::Autograd($body),
        }
    };
}

/// A boxed tensor on any interface.
#[derive(Debug, Clone)]
pub enum AnyBox {
    Numpy(NumpyBox),
    Autograd(AutogradBox),
}

impl AnyBox {
    /// Box `array` on `interface`.
    ///
    /// `requires_grad` only has an effect on interfaces that track
    /// gradients; elsewhere it is ignored with a warning.
    pub fn new(array: NdArray, interface: Interface, requires_grad: bool) -> Result<Self> {
        match interface {
            Interface::Numpy => {
                if requires_grad {
                    log::warn!("the numpy interface does not track gradients; ignoring requires_grad");
                }
                Ok(AnyBox::Numpy(NumpyBox::new(array)))
            }
            Interface::Autograd => AutogradBox::from_array(&array, requires_grad).map(AnyBox::Autograd),
        }
    }

    /// Box a plain array without tracking.
    pub fn astensor(array: &NdArray, interface: Interface) -> Result<Self> {
        Self::new(array.clone(), interface, false)
    }

    pub fn interface(&self) -> Interface {
        match self {
            AnyBox::Numpy(_) => Interface::Numpy,
            AnyBox::Autograd(_) => Interface::Autograd,
        }
    }

    pub fn as_numpy(&self) -> Option<&NumpyBox> {
        match self {
            AnyBox::Numpy(b) => Some(b),
            AnyBox::Autograd(_) => None,
        }
    }

    pub fn as_autograd(&self) -> Option<&AutogradBox> {
        match self {
            AnyBox::Autograd(b) => Some(b),
            AnyBox::Numpy(_) => None,
        }
    }

    /// Move this box onto `interface`. Only moves to a higher priority are
    /// allowed, since moving down would drop gradient tracking.
    pub fn promote_to(&self, interface: Interface) -> Result<Self> {
        match interface {
            Interface::Autograd => self.to_autograd().map(AnyBox::Autograd),
            target if target == self.interface() => Ok(self.clone()),
            _ => Err(BoxError::UnsupportedOperation {
                op: "demotion to a lower-priority interface",
                interface: self.interface().as_str(),
            }),
        }
    }

    fn to_autograd(&self) -> Result<AutogradBox> {
        match self {
            AnyBox::Autograd(b) => Ok(b.clone()),
            AnyBox::Numpy(b) => {
                log::debug!("promoting numpy value of shape {} to autograd", b.shape());
                AutogradBox::constant(b.unbox())
            }
        }
    }

    /// Copy the values out as a plain, untracked array.
    pub fn numpy(&self) -> Result<NdArray> {
        match self {
            AnyBox::Numpy(b) => b.numpy(),
            AnyBox::Autograd(b) => b.numpy(),
        }
    }

    pub fn shape(&self) -> Shape {
        match self {
            AnyBox::Numpy(b) => b.shape(),
            AnyBox::Autograd(b) => b.shape(),
        }
    }

    pub fn ndim(&self) -> usize {
        self.shape().ndim()
    }

    pub fn dtype(&self) -> DType {
        match self {
            AnyBox::Numpy(b) => b.dtype(),
            AnyBox::Autograd(b) => b.dtype(),
        }
    }

    pub fn requires_grad(&self) -> bool {
        match self {
            AnyBox::Numpy(b) => b.requires_grad(),
            AnyBox::Autograd(b) => b.requires_grad(),
        }
    }

    // === Element-wise ===

    pub fn abs(&self) -> Result<Self> {
        Ok(dispatch!(self, b => b.abs()?))
    }

    pub fn angle(&self) -> Result<Self> {
        Ok(dispatch!(self, b => b.angle()?))
    }

    pub fn arcsin(&self) -> Result<Self> {
        Ok(dispatch!(self, b => b.arcsin()?))
    }

    pub fn sqrt(&self) -> Result<Self> {
        Ok(dispatch!(self, b => b.sqrt()?))
    }

    pub fn cast(&self, dtype: DType) -> Result<Self> {
        Ok(dispatch!(self, b => b.cast(dtype)?))
    }

    pub fn ones_like(&self) -> Result<Self> {
        Ok(dispatch!(self, b => b.ones_like()?))
    }

    // === Shape ===

    pub fn expand_dims(&self, axis: isize) -> Result<Self> {
        Ok(dispatch!(self, b => b.expand_dims(axis)?))
    }

    pub fn transpose(&self) -> Result<Self> {
        Ok(dispatch!(self, b => b.transpose()?))
    }

    pub fn sum(&self, axes: Option<&[isize]>, keepdims: bool) -> Result<Self> {
        Ok(dispatch!(self, b => b.sum(axes, keepdims)?))
    }

    pub fn take(&self, indices: &Indices, axis: Option<isize>) -> Result<Self> {
        Ok(dispatch!(self, b => b.take(indices, axis)?))
    }

    /// `take` with the indices held in a box on any interface.
    pub fn take_box(&self, indices: &AnyBox, axis: Option<isize>) -> Result<Self> {
        self.take(&Indices::try_from(&indices.numpy()?)?, axis)
    }

    // === Binary ===

    fn binary<N, A>(&self, other: &AnyBox, numpy: N, autograd: A) -> Result<Self>
    where
        N: FnOnce(&NumpyBox, &NumpyBox) -> Result<NumpyBox>,
        A: FnOnce(&AutogradBox, &AutogradBox) -> Result<AutogradBox>,
    {
        match (self, other) {
            (AnyBox::Numpy(a), AnyBox::Numpy(b)) => numpy(a, b).map(AnyBox::Numpy),
            _ => autograd(&self.to_autograd()?, &other.to_autograd()?).map(AnyBox::Autograd),
        }
    }

    pub fn add(&self, other: &AnyBox) -> Result<Self> {
        self.binary(other, |a, b| a.add(b), |a, b| a.add(b))
    }

    pub fn sub(&self, other: &AnyBox) -> Result<Self> {
        self.binary(other, |a, b| a.sub(b), |a, b| a.sub(b))
    }

    pub fn mul(&self, other: &AnyBox) -> Result<Self> {
        self.binary(other, |a, b| a.mul(b), |a, b| a.mul(b))
    }

    pub fn div(&self, other: &AnyBox) -> Result<Self> {
        self.binary(other, |a, b| a.div(b), |a, b| a.div(b))
    }

    pub fn dot(&self, other: &AnyBox) -> Result<Self> {
        self.binary(other, |a, b| a.dot(b), |a, b| a.dot(b))
    }

    // === Lists ===

    /// The interface a list of boxes is combined on.
    pub fn common_interface(values: &[AnyBox]) -> Interface {
        values
            .iter()
            .map(AnyBox::interface)
            .max()
            .unwrap_or_default()
    }

    fn combine<N, A>(values: &[AnyBox], numpy: N, autograd: A) -> Result<Self>
    where
        N: FnOnce(&[NumpyBox]) -> Result<NumpyBox>,
        A: FnOnce(&[AutogradBox]) -> Result<AutogradBox>,
    {
        match Self::common_interface(values) {
            Interface::Numpy => {
                let boxes: Vec<NumpyBox> = values.iter().filter_map(|v| v.as_numpy().cloned()).collect();
                numpy(&boxes).map(AnyBox::Numpy)
            }
            Interface::Autograd => {
                let boxes = values.iter().map(AnyBox::to_autograd).collect::<Result<Vec<_>>>()?;
                autograd(&boxes).map(AnyBox::Autograd)
            }
        }
    }

    /// Join along a new axis, order preserved.
    pub fn stack(values: &[AnyBox], axis: isize) -> Result<Self> {
        Self::combine(
            values,
            |v| NumpyBox::stack(v, axis),
            |v| AutogradBox::stack(v, axis),
        )
    }

    /// Join along an existing axis, order preserved.
    pub fn concatenate(values: &[AnyBox], axis: isize) -> Result<Self> {
        Self::combine(
            values,
            |v| NumpyBox::concatenate(v, axis),
            |v| AutogradBox::concatenate(v, axis),
        )
    }

    /// Elements of `x` where `condition` holds and of `y` elsewhere.
    pub fn where_cond(condition: &ArrayD<bool>, x: &AnyBox, y: &AnyBox) -> Result<Self> {
        x.binary(
            y,
            |a, b| NumpyBox::where_cond(condition, a, b),
            |a, b| AutogradBox::where_cond(condition, a, b),
        )
    }

    // === Gradients ===

    /// Back-propagate from this value. Only the autograd interface tracks
    /// gradients.
    pub fn backward(&self) -> Result<Gradients> {
        match self {
            AnyBox::Autograd(b) => b.backward(),
            AnyBox::Numpy(_) => Err(BoxError::UnsupportedOperation {
                op: "backward",
                interface: NumpyBox::INTERFACE,
            }),
        }
    }

    /// This value's gradient in `grads`. Untracked values have none.
    pub fn grad(&self, grads: &Gradients) -> Result<Option<NdArray>> {
        match self {
            AnyBox::Autograd(b) => grads.wrt(b),
            AnyBox::Numpy(_) => Ok(None),
        }
    }
}

impl From<NumpyBox> for AnyBox {
    fn from(value: NumpyBox) -> Self {
        AnyBox::Numpy(value)
    }
}

impl From<AutogradBox> for AnyBox {
    fn from(value: AutogradBox) -> Self {
        AnyBox::Autograd(value)
    }
}
