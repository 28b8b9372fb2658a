//! Interface tags.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};
use tb_backend_autograd::AutogradBox;
use tb_backend_numpy::NumpyBox;
use tb_core::{BoxError, TensorBox};

/// The backend a boxed tensor lives on.
///
/// Variants are ordered by priority: when operands on different interfaces
/// meet, the result is placed on the highest one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Interface {
    #[default]
    Numpy,
    Autograd,
}

impl Interface {
    /// Every supported interface, lowest priority first.
    pub const ALL: [Interface; 2] = [Interface::Numpy, Interface::Autograd];

    /// The interface tag, as reported by [`TensorBox::interface`].
    pub fn as_str(&self) -> &'static str {
        match self {
            Interface::Numpy => NumpyBox::INTERFACE,
            Interface::Autograd => AutogradBox::INTERFACE,
        }
    }

    /// Whether boxes on this interface can track gradients.
    pub fn supports_grad(&self) -> bool {
        matches!(self, Interface::Autograd)
    }
}

impl fmt::Display for Interface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for Interface {
    type Err = BoxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Interface::ALL
            .into_iter()
            .find(|i| i.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| BoxError::UnknownInterface(s.to_string()))
    }
}

/// Accepts the same names as [`FromStr`], so config files and command-line
/// flags agree.
impl<'de> Deserialize<'de> for Interface {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        name.parse().map_err(serde::de::Error::custom)
    }
}
