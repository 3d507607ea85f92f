//! Test utilities for unit tests.
//!
//! Workspaces built here point at fixed fake directories; nothing touches
//! the filesystem.
//!
//! | repository            | source dir       | binary dir         | project    |
//! |-----------------------|------------------|--------------------|------------|
//! | `main` (root)         | `/src/main`      | `/build/main`      | `main`     |
//! | `other`               | `/src/other`     | `/build/other`     | `other`    |
//! | `com_google_protobuf` | `/src/protobuf`  | `/build/protobuf`  | `protobuf` |
//!
//! `//conditions:linux` is the only active condition.

use serde_json::Value;

use crate::core::workspace::{Repository, PROTOBUF_REPOSITORY};
use crate::core::{PackageId, RepositoryId, Workspace};
use crate::evaluation::context::InvocationContext;
use crate::evaluation::state::EvaluationState;
use crate::rules::options::Attributes;

/// The three-repository workspace described above.
pub fn test_workspace() -> Workspace {
    let mut ws = Workspace::new(Repository::new(
        RepositoryId::new("main"),
        "/src/main",
        "/build/main",
        "main",
        true,
    ));
    ws.add_repository(Repository::new(
        RepositoryId::new("other"),
        "/src/other",
        "/build/other",
        "other",
        false,
    ))
    .unwrap();
    ws.add_repository(Repository::new(
        RepositoryId::new(PROTOBUF_REPOSITORY),
        "/src/protobuf",
        "/build/protobuf",
        "protobuf",
        false,
    ))
    .unwrap();
    ws.set_active_conditions(vec!["//conditions:linux".to_string()]);
    ws
}

/// A fresh state over [`test_workspace`].
pub fn test_state() -> EvaluationState {
    EvaluationState::new(test_workspace())
}

/// A context for `package` in the root repository.
pub fn main_context(package: &str) -> InvocationContext {
    context_in("main", package)
}

pub fn context_in(repository: &str, package: &str) -> InvocationContext {
    InvocationContext::new(PackageId::new(RepositoryId::new(repository), package))
}

/// Rule options from a JSON object literal.
pub fn attrs(value: Value) -> Attributes {
    serde_json::from_value(value).expect("rule options must be a JSON object")
}
