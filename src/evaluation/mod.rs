//! Rule evaluation: the declaration graph, demand-driven evaluation and
//! collection of sources and dependencies.

pub mod collector;
pub mod context;
pub mod errors;
pub mod state;

pub use collector::{DepsCollector, TargetCollector};
pub use context::InvocationContext;
pub use errors::EvalError;
pub use state::{EvaluateFn, EvaluationState, TargetState};
