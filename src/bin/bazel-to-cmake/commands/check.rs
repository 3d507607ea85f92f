//! `bazel-to-cmake check` command
//!
//! Evaluates every target like `translate` but discards the CMake output.

use anyhow::{bail, Result};

use crate::cli::CheckArgs;
use crate::commands::run_translation;

pub fn execute(args: CheckArgs, color: bool) -> Result<()> {
    let translation = run_translation(&args.input, color)?;

    let warnings = translation.diagnostics.warnings().count();
    if args.deny_warnings && warnings > 0 {
        bail!("{} warning(s) with --deny-warnings", warnings);
    }

    println!(
        "checked {} target(s): {} warning(s)",
        translation.targets.len(),
        warnings
    );
    Ok(())
}
