//! Implementation of `bazel-to-cmake translate` and `check`.

use std::path::{Path, PathBuf};
use std::rc::Rc;

use anyhow::{bail, Context, Result};
use walkdir::WalkDir;

use crate::core::{PackageId, TargetId, Workspace};
use crate::evaluation::context::InvocationContext;
use crate::evaluation::errors::EvalError;
use crate::evaluation::state::EvaluationState;
use crate::rules::{register_rule, BuildFile, ProtoAspect};
use crate::util::config::Config;
use crate::util::diagnostic::Diagnostics;

/// File name searched for when a directory is given as input.
pub const BUILD_FILE_NAME: &str = "BUILD.toml";

/// Result of one translation run.
#[derive(Debug)]
pub struct Translation {
    /// Generated CMake text, in evaluation order.
    pub cmake: String,

    /// Non-fatal diagnostics raised along the way.
    pub diagnostics: Diagnostics,

    /// Every declared target, in declaration order.
    pub targets: Vec<TargetId>,
}

/// Declare every rule of `build_files`, then evaluate all of them.
pub fn translate(workspace: Workspace, build_files: &[BuildFile]) -> Result<Translation, EvalError> {
    translate_with_aspects(workspace, build_files, Vec::new())
}

/// Like [`translate`], running `aspects` over every `proto_library`.
pub fn translate_with_aspects(
    workspace: Workspace,
    build_files: &[BuildFile],
    aspects: Vec<Rc<dyn ProtoAspect>>,
) -> Result<Translation, EvalError> {
    let root = workspace.root_repository().clone();
    let mut state = EvaluationState::new(workspace);
    for aspect in aspects {
        state.add_aspect(aspect);
    }

    let mut context = InvocationContext::new(PackageId::new(root.clone(), ""));
    for file in build_files {
        context.set_caller_package_id(file.package_id(&root));
        tracing::debug!("declaring rules of {}", context.caller_package_id());
        for rule in &file.rules {
            register_rule(&mut state, &context, rule)?;
        }
    }

    state.analyze_all()?;

    let targets = state.targets().cloned().collect();
    let (cmake, diagnostics) = state.finish();
    Ok(Translation {
        cmake,
        diagnostics,
        targets,
    })
}

/// Parse one build file.
pub fn load_build_file(path: &Path) -> Result<BuildFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    toml::from_str(&content).with_context(|| format!("failed to parse {}", path.display()))
}

/// Expand inputs to build-file paths. Files are taken as given; directories
/// are searched recursively for `BUILD.toml`.
pub fn find_build_files(inputs: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut found = Vec::new();
    for input in inputs {
        if input.is_file() {
            found.push(input.clone());
            continue;
        }
        if !input.is_dir() {
            bail!("input `{}` does not exist", input.display());
        }

        let mut in_dir = Vec::new();
        for entry in WalkDir::new(input).sort_by_file_name() {
            let entry = entry.with_context(|| format!("failed to walk {}", input.display()))?;
            if entry.file_type().is_file() && entry.file_name() == BUILD_FILE_NAME {
                in_dir.push(entry.into_path());
            }
        }
        if in_dir.is_empty() {
            tracing::warn!("no {} found under {}", BUILD_FILE_NAME, input.display());
        }
        found.extend(in_dir);
    }
    Ok(found)
}

/// Load the build files behind `inputs` and translate them with the
/// workspace described by `config`.
pub fn translate_paths(config: &Config, inputs: &[PathBuf]) -> Result<Translation> {
    let workspace = Workspace::from_config(config)?;

    let paths = find_build_files(inputs)?;
    if paths.is_empty() {
        bail!("no build files to translate");
    }
    let build_files = paths
        .iter()
        .map(|path| load_build_file(path))
        .collect::<Result<Vec<_>>>()?;
    tracing::info!("translating {} build file(s)", build_files.len());

    let translation = translate(workspace, &build_files)?;
    tracing::info!(
        "translated {} target(s) with {} warning(s)",
        translation.targets.len(),
        translation.diagnostics.warnings().count()
    );
    Ok(translation)
}
