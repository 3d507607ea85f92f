//! Aspects - hooks run after each `proto_library` declaration.
//!
//! Language rules that derive targets from proto libraries (generated C++
//! sources, descriptor sets) register an aspect instead of requiring every
//! build file to spell the derived rules out.

use crate::core::label::RelativeLabel;
use crate::core::TargetId;
use crate::evaluation::context::InvocationContext;
use crate::evaluation::errors::EvalError;
use crate::evaluation::state::EvaluationState;

/// A hook invoked with every declared `proto_library`.
///
/// Aspects may declare further rules and report diagnostics. They run at
/// declaration time, so the proto target has no providers yet.
pub trait ProtoAspect {
    fn name(&self) -> &str;

    fn apply(
        &self,
        state: &mut EvaluationState,
        context: &InvocationContext,
        target: &TargetId,
        visibility: &[RelativeLabel],
    ) -> Result<(), EvalError>;
}

/// Run every registered aspect, in registration order.
pub fn invoke_proto_aspects(
    state: &mut EvaluationState,
    context: &InvocationContext,
    target: &TargetId,
    visibility: &[RelativeLabel],
) -> Result<(), EvalError> {
    for aspect in state.aspects() {
        tracing::debug!("applying aspect {} to {}", aspect.name(), target);
        aspect.apply(state, context, target, visibility)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::core::provider::TargetInfo;
    use crate::test_support::{main_context, test_state};

    /// Declares `<name>_descriptor_set` next to every proto library.
    struct DescriptorSetAspect {
        seen: RefCell<Vec<TargetId>>,
    }

    impl ProtoAspect for DescriptorSetAspect {
        fn name(&self) -> &str {
            "descriptor_set"
        }

        fn apply(
            &self,
            state: &mut EvaluationState,
            context: &InvocationContext,
            target: &TargetId,
            visibility: &[RelativeLabel],
        ) -> Result<(), EvalError> {
            self.seen.borrow_mut().push(target.clone());
            let derived = target
                .package_id()
                .target(format!("{}_descriptor_set", target.target_name()));
            state.add_rule(
                context,
                derived,
                Box::new(|_, _| Ok(TargetInfo::new())),
                visibility.to_vec(),
            )
        }
    }

    #[test]
    fn test_aspects_run_in_order_and_may_declare_rules() {
        let mut state = test_state();
        let aspect = Rc::new(DescriptorSetAspect {
            seen: RefCell::new(Vec::new()),
        });
        state.add_aspect(aspect.clone());

        let ctx = main_context("pkg");
        let target = TargetId::new("main", "pkg", "api_proto");
        let visibility = vec![RelativeLabel::new("//visibility:public")];
        invoke_proto_aspects(&mut state, &ctx, &target, &visibility).unwrap();

        assert_eq!(*aspect.seen.borrow(), vec![target]);
        let derived = TargetId::new("main", "pkg", "api_proto_descriptor_set");
        assert!(state.is_declared(&derived));
        assert_eq!(state.visibility(&derived), Some(visibility.as_slice()));
    }
}
