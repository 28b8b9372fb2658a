//! Element dtypes, named and promoted the way numpy does it.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::BoxError;

/// Element types a boxed tensor can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DType {
    Int64,
    Float32,
    Float64,
    Complex128,
}

impl DType {
    /// Numpy name of the dtype.
    pub fn name(&self) -> &'static str {
        match self {
            DType::Int64 => "int64",
            DType::Float32 => "float32",
            DType::Float64 => "float64",
            DType::Complex128 => "complex128",
        }
    }

    pub fn is_integer(&self) -> bool {
        matches!(self, DType::Int64)
    }

    pub fn is_float(&self) -> bool {
        matches!(self, DType::Float32 | DType::Float64)
    }

    pub fn is_complex(&self) -> bool {
        matches!(self, DType::Complex128)
    }

    /// Smallest dtype both operands can be converted to without losing
    /// range, following numpy's `result_type`.
    pub fn promote(self, other: DType) -> DType {
        use DType::*;
        match (self, other) {
            (Complex128, _) | (_, Complex128) => Complex128,
            (Float64, _) | (_, Float64) => Float64,
            (Int64, Float32) | (Float32, Int64) => Float64,
            (Float32, Float32) => Float32,
            (Int64, Int64) => Int64,
        }
    }

    /// Promote a whole list of dtypes. `None` for an empty list.
    pub fn result_type<I: IntoIterator<Item = DType>>(dtypes: I) -> Option<DType> {
        dtypes.into_iter().reduce(DType::promote)
    }

    /// Dtype produced by element-wise transcendental functions (sqrt, arcsin,
    /// angle): integers are computed in float64.
    pub fn to_inexact(self) -> DType {
        match self {
            DType::Int64 => DType::Float64,
            other => other,
        }
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DType {
    type Err = BoxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "int64" | "i64" | "int" => Ok(DType::Int64),
            "float32" | "f32" => Ok(DType::Float32),
            "float64" | "f64" | "float" => Ok(DType::Float64),
            "complex128" | "c128" | "complex" => Ok(DType::Complex128),
            _ => Err(BoxError::UnknownDType(s.to_string())),
        }
    }
}
