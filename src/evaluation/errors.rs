//! Evaluation error types and diagnostics.
//!
//! Every variant carries the identity of the target whose translation
//! failed. All of them are fatal for the run.

use miette::Diagnostic as MietteDiagnostic;
use thiserror::Error;

use crate::core::label::LabelError;
use crate::core::{RepositoryId, TargetId};
use crate::util::diagnostic::Diagnostic;

/// Error raised while declaring or evaluating targets.
#[derive(Debug, Error, MietteDiagnostic)]
pub enum EvalError {
    #[error("in target `{target}`: cannot resolve label")]
    #[diagnostic(code(bazel_to_cmake::label))]
    Label {
        target: TargetId,
        #[source]
        source: LabelError,
    },

    #[error("in target `{target}`: repository `{repository}` is not configured")]
    #[diagnostic(
        code(bazel_to_cmake::unknown_repository),
        help("add a [[repository]] entry for it to the configuration")
    )]
    UnknownRepository {
        target: TargetId,
        repository: RepositoryId,
    },

    #[error("in target `{target}`: invalid source `{src}`: {reason}")]
    #[diagnostic(code(bazel_to_cmake::invalid_source))]
    InvalidSource {
        target: TargetId,
        src: TargetId,
        reason: String,
    },

    #[error("in target `{target}`: {file_count} source file(s) but no include directories")]
    #[diagnostic(code(bazel_to_cmake::empty_includes))]
    EmptyIncludesWithSources { target: TargetId, file_count: usize },

    #[error("dependency cycle detected: {}", format_cycle(.cycle))]
    #[diagnostic(
        code(bazel_to_cmake::cycle),
        help("break the cycle by removing one of the deps edges")
    )]
    CyclicDependency { cycle: Vec<TargetId> },

    #[error("target `{target}` has already been evaluated")]
    #[diagnostic(code(bazel_to_cmake::already_evaluated))]
    AlreadyEvaluated { target: TargetId },

    #[error("evaluation of target `{target}` failed earlier in this run")]
    #[diagnostic(code(bazel_to_cmake::evaluation_failed))]
    EvaluationFailed { target: TargetId },

    #[error("target `{target}` is declared more than once")]
    #[diagnostic(code(bazel_to_cmake::duplicate_target))]
    DuplicateTarget { target: TargetId },

    #[error("in target `{target}`: dependency `{missing}` is not declared or mapped")]
    #[diagnostic(
        code(bazel_to_cmake::unknown_target),
        help("declare the dependency or add a [target_mapping] entry for it")
    )]
    UnknownTarget { target: TargetId, missing: TargetId },

    #[error("target `{target}` and `{other}` both map to CMake target `{name}`")]
    #[diagnostic(
        code(bazel_to_cmake::name_collision),
        help("rename one of the targets or add a [target_mapping] entry for it")
    )]
    NameCollision {
        target: TargetId,
        other: TargetId,
        name: String,
    },

    #[error("in target `{target}`: missing required option `{attribute}`")]
    #[diagnostic(code(bazel_to_cmake::missing_attribute))]
    MissingAttribute { target: TargetId, attribute: String },

    #[error("in target `{target}`: option `{attribute}` must be {expected}")]
    #[diagnostic(code(bazel_to_cmake::invalid_attribute))]
    InvalidAttribute {
        target: TargetId,
        attribute: String,
        expected: &'static str,
    },
}

fn format_cycle(cycle: &[TargetId]) -> String {
    cycle
        .iter()
        .map(|t| t.to_string())
        .collect::<Vec<_>>()
        .join(" -> ")
}

impl EvalError {
    /// The target the error is reported against.
    pub fn target(&self) -> &TargetId {
        match self {
            EvalError::Label { target, .. }
            | EvalError::UnknownRepository { target, .. }
            | EvalError::InvalidSource { target, .. }
            | EvalError::EmptyIncludesWithSources { target, .. }
            | EvalError::AlreadyEvaluated { target }
            | EvalError::EvaluationFailed { target }
            | EvalError::DuplicateTarget { target }
            | EvalError::UnknownTarget { target, .. }
            | EvalError::NameCollision { target, .. }
            | EvalError::MissingAttribute { target, .. }
            | EvalError::InvalidAttribute { target, .. } => target,
            // A cycle error is only built from a non-empty in-progress stack.
            EvalError::CyclicDependency { cycle } => &cycle[0],
        }
    }

    /// Convert to a user-friendly diagnostic.
    pub fn to_diagnostic(&self) -> Diagnostic {
        match self {
            EvalError::Label { target, source } => {
                Diagnostic::error(source.to_string()).for_target(target)
            }

            EvalError::InvalidSource { target, src, reason } => {
                Diagnostic::error(format!("invalid proto source `{}`", src))
                    .for_target(target)
                    .with_context(reason.clone())
                    .with_suggestion(
                        "proto sources must be `.proto` files in the same repository as the rule",
                    )
            }

            EvalError::CyclicDependency { cycle } => {
                let mut diag = Diagnostic::error("dependency cycle detected");
                if let Some(first) = cycle.first() {
                    diag = diag.for_target(first);
                }
                diag.with_context(format!("cycle: {}", format_cycle(cycle)))
                    .with_suggestion("Break the cycle by removing or restructuring deps")
            }

            EvalError::UnknownTarget { target, missing } => {
                Diagnostic::error(format!("dependency `{}` is not declared", missing))
                    .for_target(target)
                    .with_suggestion(format!(
                        "Add `\"{}\" = \"<cmake target>\"` under [target_mapping]",
                        missing
                    ))
            }

            EvalError::UnknownRepository { target, repository } => {
                Diagnostic::error(format!("repository `{}` is not configured", repository))
                    .for_target(target)
                    .with_suggestion("Add a [[repository]] entry to the configuration")
            }

            other => Diagnostic::error(other.to_string()).for_target(other.target()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cycle_message() {
        let a = TargetId::new("r", "p", "a");
        let b = TargetId::new("r", "p", "b");
        let err = EvalError::CyclicDependency {
            cycle: vec![a.clone(), b, a.clone()],
        };
        assert_eq!(
            err.to_string(),
            "dependency cycle detected: @r//p:a -> @r//p:b -> @r//p:a"
        );
        assert_eq!(err.target(), &a);

        let diag = err.to_diagnostic();
        assert!(diag.context[0].contains("@r//p:b"));
    }

    #[test]
    fn test_label_error_diagnostic_keeps_target() {
        let target = TargetId::new("r", "p", "lib");
        let err = EvalError::Label {
            target: target.clone(),
            source: LabelError::UnknownRepository {
                label: "@x//:y".to_string(),
                repository: "x".to_string(),
            },
        };
        let diag = err.to_diagnostic();
        assert_eq!(diag.target, Some(target));
        assert!(diag.message.contains("unknown repository `@x`"));
    }
}
