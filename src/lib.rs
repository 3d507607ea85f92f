//! bazel-to-cmake - translate `proto_library` rules into CMake
//!
//! This crate provides the rule-evaluation engine: lazy declaration and
//! evaluation of targets, transitive dependency and include collection
//! across repositories, and deterministic CMake naming feeding a text
//! emitter.

pub mod core;
pub mod emit;
pub mod evaluation;
pub mod ops;
pub mod rules;
pub mod util;

/// Test utilities shared by unit tests.
///
/// This module is only available when compiling with `--cfg test`. It
/// builds workspaces, contexts and states over fixed fake directories.
#[cfg(test)]
pub mod test_support;

pub use crate::core::{TargetId, Workspace};
pub use evaluation::{EvalError, EvaluationState};
pub use ops::translate::{translate, Translation};
pub use util::config::Config;
