use anyhow::{Context, Result};
use tb_core::ndarray::{ArrayD, IxDyn};
use tb_core::{with_array, Indices, NdArray};
use tensorbox::{AnyBox, Interface};

use crate::config::{ArrayLiteral, EvalConfig, Op};

/// Outcome of running an operation chain.
#[derive(Debug, Clone)]
pub struct Evaluation {
    pub result: AnyBox,
    /// Gradient of `sum(result)` with respect to the input, when tracked.
    pub gradient: Option<NdArray>,
}

/// Box the configured input, apply every op in order, and back-propagate
/// when the result is tracked.
pub fn evaluate(config: &EvalConfig) -> Result<Evaluation> {
    let input = AnyBox::new(config.input.to_ndarray()?, config.interface, config.requires_grad)
        .context("Failed to box the input")?;
    log::info!(
        "evaluating {} ops on {} input of shape {}",
        config.ops.len(),
        input.interface(),
        input.shape()
    );

    let mut value = input.clone();
    for (i, op) in config.ops.iter().enumerate() {
        value = apply(&value, op, config.interface)
            .with_context(|| format!("op #{i} ({}) failed on a value of shape {}", op.name(), value.shape()))?;
        log::debug!("after {}: shape {} dtype {}", op.name(), value.shape(), value.dtype());
    }

    let gradient = if value.requires_grad() {
        let grads = value.backward().context("Backward pass failed")?;
        input.grad(&grads)?
    } else {
        None
    };

    Ok(Evaluation {
        result: value,
        gradient,
    })
}

fn operand(literal: &ArrayLiteral, interface: Interface) -> Result<AnyBox> {
    Ok(AnyBox::astensor(&literal.to_ndarray()?, interface)?)
}

/// Apply one op. Operands written in the config are boxed, untracked, on
/// `interface`.
pub fn apply(value: &AnyBox, op: &Op, interface: Interface) -> Result<AnyBox> {
    let out = match op {
        Op::Abs => value.abs()?,
        Op::Angle => value.angle()?,
        Op::Arcsin => value.arcsin()?,
        Op::Sqrt => value.sqrt()?,
        Op::OnesLike => value.ones_like()?,
        Op::Transpose => value.transpose()?,
        Op::Cast { dtype } => value.cast(*dtype)?,
        Op::ExpandDims { axis } => value.expand_dims(*axis)?,
        Op::Sum { axes, keepdims } => value.sum(axes.as_deref(), *keepdims)?,
        Op::Take { indices, axis } => value.take(&Indices::from(indices.clone()), *axis)?,
        Op::Dot { other } => value.dot(&operand(other, interface)?)?,
        Op::Add { other } => value.add(&operand(other, interface)?)?,
        Op::Sub { other } => value.sub(&operand(other, interface)?)?,
        Op::Mul { other } => value.mul(&operand(other, interface)?)?,
        Op::Div { other } => value.div(&operand(other, interface)?)?,
        Op::StackWith { other, axis } => AnyBox::stack(&[value.clone(), operand(other, interface)?], *axis)?,
        Op::ConcatenateWith { other, axis } => {
            AnyBox::concatenate(&[value.clone(), operand(other, interface)?], *axis)?
        }
        Op::WhereElse { condition, other } => {
            let condition = ArrayD::from_shape_vec(IxDyn(value.shape().dims()), condition.clone())
                .context("condition does not match the current shape")?;
            AnyBox::where_cond(&condition, value, &operand(other, interface)?)?
        }
    };
    Ok(out)
}

/// Render values with ndarray's nested-bracket layout.
pub fn format_values(array: &NdArray) -> String {
    with_array!(array, a => a.to_string())
}
