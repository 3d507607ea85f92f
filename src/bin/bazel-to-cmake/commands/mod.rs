//! Command implementations

pub mod check;
pub mod completions;
pub mod translate;

use anyhow::Result;

use bazel_to_cmake::ops::translate::{translate_paths, Translation};
use bazel_to_cmake::util::config::load_config;
use bazel_to_cmake::util::diagnostic::emit;
use bazel_to_cmake::EvalError;

use crate::cli::InputArgs;

/// Load configuration and translate the inputs, printing every diagnostic.
/// Fatal evaluation errors are printed in diagnostic form before being
/// returned.
fn run_translation(input: &InputArgs, color: bool) -> Result<Translation> {
    let config = load_config(&input.config)?;

    let translation = translate_paths(&config, &input.inputs).inspect_err(|err| {
        if let Some(eval) = err.downcast_ref::<EvalError>() {
            emit(&eval.to_diagnostic(), color);
        }
    })?;

    for diagnostic in translation.diagnostics.iter() {
        emit(diagnostic, color);
    }
    Ok(translation)
}
