//! `bazel-to-cmake translate` command

use std::io::Write;

use anyhow::{Context, Result};

use crate::cli::TranslateArgs;
use crate::commands::run_translation;

pub fn execute(args: TranslateArgs, color: bool) -> Result<()> {
    let translation = run_translation(&args.input, color)?;

    match &args.output {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("failed to create {}", parent.display()))?;
            }
            std::fs::write(path, &translation.cmake)
                .with_context(|| format!("failed to write {}", path.display()))?;
            tracing::info!("wrote {}", path.display());
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(translation.cmake.as_bytes())?;
            stdout.flush()?;
        }
    }

    Ok(())
}
