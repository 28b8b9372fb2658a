//! Reverse-mode gradients of boxed values.

use candle_core::backprop::GradStore;
use tb_core::prelude::*;

use crate::convert::to_ndarray;
use crate::AutogradBox;

/// Gradients produced by [`AutogradBox::backward`].
pub struct Gradients {
    store: GradStore,
}

impl Gradients {
    pub(crate) fn new(store: GradStore) -> Self {
        Gradients { store }
    }

    /// Gradient with respect to `value`, as a plain array.
    ///
    /// `None` when `value` is not a variable the output depends on through
    /// differentiable operations.
    pub fn wrt(&self, value: &AutogradBox) -> Result<Option<NdArray>> {
        self.store.get(value.tensor()).map(to_ndarray).transpose()
    }
}

impl std::fmt::Debug for Gradients {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gradients").finish_non_exhaustive()
    }
}
