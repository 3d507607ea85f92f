//! Evaluation state - the run-scoped registry of declared and evaluated
//! targets.
//!
//! Declaring a rule stores a deferred evaluation closure keyed by its
//! `TargetId` (the declaration phase). The first consumer asking for that
//! target's providers runs the closure and memoizes the resulting
//! [`TargetInfo`] (the evaluation phase). Each node moves through
//! `Declared -> Evaluating -> Evaluated`; asking for a node that is still
//! `Evaluating` means the graph has a cycle, which is reported from the
//! explicit in-progress stack instead of recursing.

use std::collections::HashMap;
use std::rc::Rc;
use std::sync::LazyLock;

use indexmap::{IndexMap, IndexSet};
use regex::Regex;

use crate::core::cmake_target::{CMakeTarget, CMakeTargetPair};
use crate::core::label::RelativeLabel;
use crate::core::provider::TargetInfo;
use crate::core::{TargetId, Workspace};
use crate::emit::builder::CMakeBuilder;
use crate::evaluation::context::InvocationContext;
use crate::evaluation::errors::EvalError;
use crate::rules::aspect::ProtoAspect;
use crate::util::diagnostic::{Diagnostic, Diagnostics};
use crate::util::hash::short_hash;

/// Deferred evaluation of one declared target.
pub type EvaluateFn =
    Box<dyn FnOnce(&mut EvaluationState, &InvocationContext) -> Result<TargetInfo, EvalError>>;

static INVALID_CMAKE_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^A-Za-z0-9_]").expect("static regex"));

/// Observable lifecycle state of a target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetState {
    Declared,
    Evaluating,
    Evaluated,
    Failed,
}

enum NodeState {
    Declared(EvaluateFn),
    Evaluating,
    Evaluated(Rc<TargetInfo>),
    Failed,
}

struct Node {
    context: InvocationContext,
    visibility: Vec<RelativeLabel>,
    state: NodeState,
}

/// The registry of one translation run.
pub struct EvaluationState {
    workspace: Workspace,
    /// Declaration order is kept so a full analysis is deterministic.
    targets: IndexMap<TargetId, Node>,
    /// Targets whose closures are currently on the call stack.
    in_progress: IndexSet<TargetId>,
    target_pairs: HashMap<TargetId, CMakeTargetPair>,
    cmake_names: HashMap<CMakeTarget, TargetId>,
    builder: CMakeBuilder,
    diagnostics: Diagnostics,
    aspects: Vec<Rc<dyn ProtoAspect>>,
}

impl EvaluationState {
    pub fn new(workspace: Workspace) -> Self {
        EvaluationState {
            workspace,
            targets: IndexMap::new(),
            in_progress: IndexSet::new(),
            target_pairs: HashMap::new(),
            cmake_names: HashMap::new(),
            builder: CMakeBuilder::new(),
            diagnostics: Diagnostics::new(),
            aspects: Vec::new(),
        }
    }

    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    pub fn builder(&self) -> &CMakeBuilder {
        &self.builder
    }

    pub fn builder_mut(&mut self) -> &mut CMakeBuilder {
        &mut self.builder
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    /// Record a non-fatal diagnostic.
    pub fn report(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    /// Register an aspect run after every `proto_library` declaration.
    pub fn add_aspect(&mut self, aspect: Rc<dyn ProtoAspect>) {
        self.aspects.push(aspect);
    }

    pub fn aspects(&self) -> Vec<Rc<dyn ProtoAspect>> {
        self.aspects.clone()
    }

    /// Declare a target. `evaluate` runs at most once, on first demand, with
    /// a snapshot of `context` as it is now.
    pub fn add_rule(
        &mut self,
        context: &InvocationContext,
        target: TargetId,
        evaluate: EvaluateFn,
        visibility: Vec<RelativeLabel>,
    ) -> Result<(), EvalError> {
        if self.is_declared(&target) {
            return Err(EvalError::DuplicateTarget { target });
        }
        tracing::debug!("declared {}", target);
        self.targets.insert(
            target,
            Node {
                context: context.snapshot(),
                visibility,
                state: NodeState::Declared(evaluate),
            },
        );
        Ok(())
    }

    /// Register providers for a target that has no evaluation closure.
    pub fn add_analyzed_target(
        &mut self,
        target: TargetId,
        info: TargetInfo,
    ) -> Result<(), EvalError> {
        if let Some(node) = self.targets.get_mut(&target) {
            return match node.state {
                // The target's own closure registered it; the closure's
                // result is then rejected when it returns.
                NodeState::Evaluating => {
                    node.state = NodeState::Evaluated(Rc::new(info));
                    Ok(())
                }
                NodeState::Evaluated(_) => Err(EvalError::AlreadyEvaluated { target }),
                _ => Err(EvalError::DuplicateTarget { target }),
            };
        }
        let context = InvocationContext::new(target.package_id().clone());
        self.targets.insert(
            target,
            Node {
                context,
                visibility: Vec::new(),
                state: NodeState::Evaluated(Rc::new(info)),
            },
        );
        Ok(())
    }

    /// Whether `target` was declared or analyzed in this run.
    pub fn is_declared(&self, target: &TargetId) -> bool {
        self.targets.contains_key(target)
    }

    pub fn target_state(&self, target: &TargetId) -> Option<TargetState> {
        self.targets.get(target).map(|node| match node.state {
            NodeState::Declared(_) => TargetState::Declared,
            NodeState::Evaluating => TargetState::Evaluating,
            NodeState::Evaluated(_) => TargetState::Evaluated,
            NodeState::Failed => TargetState::Failed,
        })
    }

    pub fn visibility(&self, target: &TargetId) -> Option<&[RelativeLabel]> {
        self.targets.get(target).map(|node| node.visibility.as_slice())
    }

    /// Declared targets, in declaration order.
    pub fn targets(&self) -> impl Iterator<Item = &TargetId> {
        self.targets.keys()
    }

    /// The target currently being evaluated, if any.
    pub fn current_target(&self) -> Option<&TargetId> {
        self.in_progress.last()
    }

    /// The providers of `target`, evaluating it first if needed.
    ///
    /// Returns `Ok(None)` for targets that were never declared, such as plain
    /// source files.
    pub fn get_target_info(&mut self, target: &TargetId) -> Result<Option<Rc<TargetInfo>>, EvalError> {
        let Some(node) = self.targets.get_mut(target) else {
            return Ok(None);
        };

        let evaluate = match std::mem::replace(&mut node.state, NodeState::Evaluating) {
            NodeState::Evaluated(info) => {
                node.state = NodeState::Evaluated(Rc::clone(&info));
                return Ok(Some(info));
            }
            NodeState::Evaluating => {
                return Err(EvalError::CyclicDependency {
                    cycle: self.cycle_through(target),
                });
            }
            NodeState::Failed => {
                node.state = NodeState::Failed;
                return Err(EvalError::EvaluationFailed {
                    target: target.clone(),
                });
            }
            NodeState::Declared(evaluate) => evaluate,
        };
        let context = node.context.clone();

        tracing::debug!("evaluating {}", target);
        self.in_progress.insert(target.clone());
        let result = evaluate(self, &context);
        self.in_progress.pop();

        let Some(node) = self.targets.get_mut(target) else {
            return Err(EvalError::EvaluationFailed {
                target: target.clone(),
            });
        };
        match result {
            Ok(info) => {
                if !matches!(node.state, NodeState::Evaluating) {
                    node.state = NodeState::Failed;
                    return Err(EvalError::AlreadyEvaluated {
                        target: target.clone(),
                    });
                }
                tracing::debug!("evaluated {} ({})", target, info.provider_names().join(", "));
                let info = Rc::new(info);
                node.state = NodeState::Evaluated(Rc::clone(&info));
                Ok(Some(info))
            }
            Err(err) => {
                node.state = NodeState::Failed;
                Err(err)
            }
        }
    }

    /// The in-progress path from `target` to the current requester, closed
    /// by `target` again.
    fn cycle_through(&self, target: &TargetId) -> Vec<TargetId> {
        let start = self.in_progress.get_index_of(target).unwrap_or(0);
        let mut cycle: Vec<TargetId> = self.in_progress.iter().skip(start).cloned().collect();
        cycle.push(target.clone());
        cycle
    }

    /// Evaluate every declared target in declaration order.
    pub fn analyze_all(&mut self) -> Result<(), EvalError> {
        let mut index = 0;
        // Evaluation may declare further targets, so the length is re-read.
        while let Some(target) = self.targets.get_index(index).map(|(t, _)| t.clone()) {
            // Dependencies of earlier targets are already done.
            if self.target_state(&target) != Some(TargetState::Evaluated) {
                self.get_target_info(&target)?;
            }
            index += 1;
        }
        Ok(())
    }

    /// The CMake names for `target`: a pre-existing mapped target, or a
    /// generated `<project>_<name>` primary with an optional
    /// `<project>::<name>` alias.
    ///
    /// Generated names depend only on the target and the naming
    /// convention, never on which other targets were named before.
    pub fn generate_cmake_target_pair(
        &mut self,
        target: &TargetId,
    ) -> Result<CMakeTargetPair, EvalError> {
        if let Some(pair) = self.target_pairs.get(target) {
            return Ok(pair.clone());
        }

        let is_mapped = self.workspace.mapped_target(target).is_some();
        let pair = if let Some(mapped) = self.workspace.mapped_target(target) {
            CMakeTargetPair::new(CMakeTarget::new(mapped), None)
        } else {
            let repo = self.workspace.repository(target.repository_id()).ok_or_else(|| {
                EvalError::UnknownRepository {
                    target: target.clone(),
                    repository: target.repository_id().clone(),
                }
            })?;
            let project = sanitize(repo.cmake_project());
            let base = generated_base_name(target);

            let primary = CMakeTarget::new(format!("{}_{}", escape_underscores(&project), base));
            let alias = self
                .workspace
                .naming()
                .alias
                .then(|| CMakeTarget::new(format!("{}::{}", project, base)));
            CMakeTargetPair::new(primary, alias)
        };

        // Several labels may map onto one existing CMake target, but a
        // generated name must not clash with anything else.
        if let Some(owner) = self.cmake_names.get(&pair.target) {
            let both_mapped = is_mapped && self.workspace.mapped_target(owner).is_some();
            if owner != target && !both_mapped {
                return Err(EvalError::NameCollision {
                    target: target.clone(),
                    other: owner.clone(),
                    name: pair.target.to_string(),
                });
            }
        }

        self.cmake_names
            .insert(pair.target.clone(), target.clone());
        self.target_pairs.insert(target.clone(), pair.clone());
        Ok(pair)
    }

    /// Consume the state, returning the generated CMake text and the
    /// diagnostics raised along the way.
    pub fn finish(self) -> (String, Diagnostics) {
        (self.builder.as_text(), self.diagnostics)
    }
}

fn sanitize(part: &str) -> String {
    INVALID_CMAKE_CHARS.replace_all(part, "_").into_owned()
}

fn escape_underscores(part: &str) -> String {
    part.replace('_', "__")
}

/// Package segments followed by the target name, joined by `_` with every
/// `_` inside a segment doubled (`//a:b_c` -> `a_b__c`, `//a/b:c` ->
/// `a_b_c`).
///
/// Segments that cannot be encoded that way (characters CMake does not
/// accept, or a leading or trailing `_`) are sanitized instead, and the
/// name gets a `___<hash>` suffix that the plain encoding never produces.
fn generated_base_name(target: &TargetId) -> String {
    let mut parts: Vec<&str> = target.package_id().segments().collect();
    parts.push(target.target_name());

    let encodable = parts.iter().all(|p| {
        !p.is_empty() && !p.starts_with('_') && !p.ends_with('_') && !INVALID_CMAKE_CHARS.is_match(p)
    });
    if encodable {
        return parts
            .iter()
            .map(|p| escape_underscores(p))
            .collect::<Vec<_>>()
            .join("_");
    }

    let sanitized = parts.iter().map(|p| sanitize(p)).collect::<Vec<_>>().join("_");
    format!(
        "{}___{}",
        sanitized.trim_end_matches('_'),
        short_hash(&target.as_label(), 8)
    )
}
