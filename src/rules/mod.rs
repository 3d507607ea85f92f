//! Rule kinds and build-file input.
//!
//! A build file lists the rule invocations of one package:
//!
//! ```toml
//! package = "tensorstore/proto"
//!
//! [[rule]]
//! kind = "proto_library"
//! name = "array_proto"
//! srcs = ["array.proto"]
//! deps = [":common_proto"]
//! ```

pub mod aspect;
pub mod options;
pub mod proto;

use serde::{Deserialize, Serialize};

use crate::core::{PackageId, RepositoryId};
use crate::evaluation::context::InvocationContext;
use crate::evaluation::errors::EvalError;
use crate::evaluation::state::EvaluationState;
use crate::util::diagnostic::Diagnostic;

pub use aspect::ProtoAspect;
pub use options::Attributes;

/// The parsed contents of one `BUILD.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BuildFile {
    /// Owning repository; the workspace root when absent.
    #[serde(default)]
    pub repository: Option<String>,

    /// Package path within the repository; empty for the repository root.
    #[serde(default)]
    pub package: String,

    #[serde(default, rename = "rule")]
    pub rules: Vec<RuleInvocation>,
}

impl BuildFile {
    /// The package these rules are declared in.
    pub fn package_id(&self, root: &RepositoryId) -> PackageId {
        let repository = self
            .repository
            .as_ref()
            .map(|name| RepositoryId::new(name.clone()))
            .unwrap_or_else(|| root.clone());
        PackageId::new(repository, self.package.clone())
    }
}

/// One rule call: its kind, its name and every other option verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleInvocation {
    pub kind: String,
    pub name: String,
    #[serde(flatten)]
    pub attrs: Attributes,
}

/// Declare one rule invocation in `context`'s package. Unknown rule kinds
/// are reported and skipped.
pub fn register_rule(
    state: &mut EvaluationState,
    context: &InvocationContext,
    invocation: &RuleInvocation,
) -> Result<(), EvalError> {
    let RuleInvocation { kind, name, attrs } = invocation;
    match options::schema_for(kind) {
        Some(schema) => {
            (schema.declare)(state, context, name, attrs)?;
        }
        None => {
            let target = proto::rule_target(context, name)?;
            state.report(
                Diagnostic::warning(format!("unknown rule kind `{}`; rule skipped", kind))
                    .for_target(&target)
                    .with_suggestion(format!(
                        "supported kinds: {}",
                        options::supported_kinds()
                    )),
            );
        }
    }
    Ok(())
}
