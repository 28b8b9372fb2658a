//! Evaluation configs and the operation-chain runner behind the `tensorbox`
//! binary.

pub mod config;
pub mod eval;

pub use config::{ArrayLiteral, EvalConfig, Op};
pub use eval::{apply, evaluate, format_values, Evaluation};
