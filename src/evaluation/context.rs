//! Invocation context - the ambient package a declaration was made in.
//!
//! Rules are evaluated long after they are declared, and in an order driven
//! by their dependents. A rule therefore keeps a snapshot of the context it
//! was declared in and resolves its labels against that snapshot, never
//! against whatever package happens to be current at evaluation time.

use crate::core::configurable::{Configurable, DEFAULT_CONDITION};
use crate::core::label::{LabelError, RelativeLabel};
use crate::core::{PackageId, RepositoryId, TargetId, Workspace};

/// Ambient declaration state for one package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvocationContext {
    caller_package_id: PackageId,
}

impl InvocationContext {
    pub fn new(caller_package_id: PackageId) -> Self {
        InvocationContext { caller_package_id }
    }

    /// A copy that is unaffected by later changes to this context.
    pub fn snapshot(&self) -> Self {
        self.clone()
    }

    pub fn caller_package_id(&self) -> &PackageId {
        &self.caller_package_id
    }

    pub fn caller_repository_id(&self) -> &RepositoryId {
        self.caller_package_id.repository_id()
    }

    /// Move the ambient package (used by drivers between build files).
    pub fn set_caller_package_id(&mut self, package_id: PackageId) {
        self.caller_package_id = package_id;
    }

    /// Address the rule named `name` in the current package.
    pub fn parse_rule_target(&self, name: &str) -> Result<TargetId, LabelError> {
        let invalid = |reason: &str| LabelError::InvalidLabel {
            label: name.to_string(),
            reason: reason.to_string(),
        };
        if name.starts_with("//") || name.starts_with('@') || name.contains(':') {
            return Err(invalid("rule names must be bare names"));
        }
        let label = RelativeLabel::new(name);
        let parsed = label.parse()?;
        if parsed.package.is_some() {
            return Err(invalid("rule names must be bare names"));
        }
        Ok(self.caller_package_id.target(parsed.target))
    }

    /// Resolve one label relative to this context.
    pub fn resolve_target_or_label(
        &self,
        label: &RelativeLabel,
        workspace: &Workspace,
    ) -> Result<TargetId, LabelError> {
        let from = self.caller_repository_id();
        label.resolve(&self.caller_package_id, |repository| {
            workspace.lookup_repository(from, repository)
        })
    }

    /// Resolve a list of labels relative to this context, in order.
    pub fn resolve_target_or_label_list(
        &self,
        labels: &[RelativeLabel],
        workspace: &Workspace,
    ) -> Result<Vec<TargetId>, LabelError> {
        labels
            .iter()
            .map(|label| self.resolve_target_or_label(label, workspace))
            .collect()
    }

    /// Flatten a configurable label list for the active build configuration.
    ///
    /// The first `select` branch (in key order) whose condition is active
    /// wins; otherwise the default branch; otherwise nothing.
    pub fn evaluate_configurable_list(
        &self,
        expr: &Configurable<Vec<RelativeLabel>>,
        workspace: &Workspace,
    ) -> Result<Vec<RelativeLabel>, LabelError> {
        let branches = match expr {
            Configurable::Value(labels) => return Ok(labels.clone()),
            Configurable::Select { select } => select,
        };

        let root = PackageId::new(workspace.root_repository().clone(), "");
        let root_context = InvocationContext::new(root);
        let active = workspace
            .active_conditions()
            .iter()
            .map(|c| root_context.resolve_target_or_label(&RelativeLabel::new(c.clone()), workspace))
            .collect::<Result<Vec<_>, _>>()?;

        for (condition, labels) in branches {
            if condition == DEFAULT_CONDITION {
                continue;
            }
            let condition = self.resolve_target_or_label(&RelativeLabel::new(condition.clone()), workspace)?;
            if active.contains(&condition) {
                return Ok(labels.clone());
            }
        }

        Ok(branches.get(DEFAULT_CONDITION).cloned().unwrap_or_default())
    }
}
