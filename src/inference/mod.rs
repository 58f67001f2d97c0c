//! Inference module
//!
//! Batched evaluation of a trained classifier without gradient tracking.

pub mod evaluator;

pub use evaluator::{evaluate, EvaluationResult};
