use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use clap::ArgMatches;
use serde::{Deserialize, Serialize};
use tb_core::ndarray::{ArrayD, IxDyn};
use tb_core::num_complex::Complex64;
use tb_core::{DType, NdArray};
use tensorbox::Interface;

/// An array written out in a config file: dtype, shape and row-major data.
///
/// `imag` holds the imaginary parts of a complex128 array and is ignored for
/// every other dtype.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArrayLiteral {
    #[serde(default = "ArrayLiteral::default_dtype")]
    pub dtype: DType,
    #[serde(default)]
    pub shape: Vec<usize>,
    pub data: Vec<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub imag: Option<Vec<f64>>,
}

impl ArrayLiteral {
    fn default_dtype() -> DType {
        DType::Float64
    }

    pub fn to_ndarray(&self) -> Result<NdArray> {
        let real = NdArray::from_shape_vec(&self.shape, self.data.clone())
            .with_context(|| format!("{} values do not fill shape {:?}", self.data.len(), self.shape))?;

        match (self.dtype, &self.imag) {
            (DType::Complex128, Some(imag)) => {
                anyhow::ensure!(
                    imag.len() == self.data.len(),
                    "expected {} imaginary parts, got {}",
                    self.data.len(),
                    imag.len()
                );
                let values = self
                    .data
                    .iter()
                    .zip(imag)
                    .map(|(&re, &im)| Complex64::new(re, im))
                    .collect();
                Ok(NdArray::Complex128(ArrayD::from_shape_vec(IxDyn(&self.shape), values)?))
            }
            (dtype, _) => Ok(real.cast(dtype)),
        }
    }
}

impl Default for ArrayLiteral {
    fn default() -> Self {
        ArrayLiteral {
            dtype: DType::Float64,
            shape: vec![],
            data: vec![0.0],
            imag: None,
        }
    }
}

/// One step of an operation chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Op {
    Abs,
    Angle,
    Arcsin,
    Sqrt,
    OnesLike,
    Transpose,
    Cast {
        dtype: DType,
    },
    ExpandDims {
        axis: isize,
    },
    Sum {
        #[serde(default)]
        axes: Option<Vec<isize>>,
        #[serde(default)]
        keepdims: bool,
    },
    Take {
        indices: Vec<isize>,
        #[serde(default)]
        axis: Option<isize>,
    },
    Dot {
        other: ArrayLiteral,
    },
    Add {
        other: ArrayLiteral,
    },
    Sub {
        other: ArrayLiteral,
    },
    Mul {
        other: ArrayLiteral,
    },
    Div {
        other: ArrayLiteral,
    },
    StackWith {
        other: ArrayLiteral,
        #[serde(default)]
        axis: isize,
    },
    ConcatenateWith {
        other: ArrayLiteral,
        #[serde(default)]
        axis: isize,
    },
    /// Keep the current value where `condition` holds, take `other` elsewhere.
    /// `condition` is laid out in the current value's shape.
    WhereElse {
        condition: Vec<bool>,
        other: ArrayLiteral,
    },
}

impl Op {
    pub fn name(&self) -> &'static str {
        match self {
            Op::Abs => "abs",
            Op::Angle => "angle",
            Op::Arcsin => "arcsin",
            Op::Sqrt => "sqrt",
            Op::OnesLike => "ones_like",
            Op::Transpose => "transpose",
            Op::Cast { .. } => "cast",
            Op::ExpandDims { .. } => "expand_dims",
            Op::Sum { .. } => "sum",
            Op::Take { .. } => "take",
            Op::Dot { .. } => "dot",
            Op::Add { .. } => "add",
            Op::Sub { .. } => "sub",
            Op::Mul { .. } => "mul",
            Op::Div { .. } => "div",
            Op::StackWith { .. } => "stack_with",
            Op::ConcatenateWith { .. } => "concatenate_with",
            Op::WhereElse { .. } => "where_else",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvalConfig {
    pub interface: Interface,
    pub requires_grad: bool,
    pub input: ArrayLiteral,
    pub ops: Vec<Op>,
}

impl Default for EvalConfig {
    fn default() -> Self {
        EvalConfig {
            interface: Interface::Numpy,
            requires_grad: false,
            input: ArrayLiteral::default(),
            ops: Vec::new(),
        }
    }
}

impl EvalConfig {
    /// Parse a config, falling back to the default for every field that is
    /// missing or invalid.
    pub fn from_json(json: &str) -> Result<Self> {
        let partial: serde_json::Value = serde_json::from_str(json).context("Config is not valid JSON")?;
        let mut config = EvalConfig::default();

        macro_rules! load_or_default {
            ($field:ident) => {
                if let Some(val) = partial.get(stringify!($field)) {
                    match serde_json::from_value(val.clone()) {
                        Ok(parsed) => config.$field = parsed,
                        Err(e) => log::warn!(
                            "Config Invalid value for '{}' ({}), using default: {:?}",
                            stringify!($field),
                            e,
                            config.$field
                        ),
                    }
                } else {
                    log::warn!(
                        "Config Missing field '{}', using default: {:?}",
                        stringify!($field),
                        config.$field
                    );
                }
            };
        }

        load_or_default!(interface);
        load_or_default!(requires_grad);
        load_or_default!(input);
        load_or_default!(ops);

        Ok(config)
    }

    /// Read the config file named on the command line and apply flag
    /// overrides.
    pub fn from_arguments(config_path: &Path, matches: &ArgMatches) -> Result<Self> {
        let config_json = fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config file: {:?}", config_path))?;
        let mut config = Self::from_json(&config_json)?;

        if let Some(interface) = matches.get_one::<String>("interface") {
            config.interface = interface.parse()?;
        }
        if matches.get_flag("requires_grad") {
            config.requires_grad = true;
        }

        Ok(config)
    }
}
