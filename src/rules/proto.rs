//! `proto_library` and `proto_lang_toolchain`.
//!
//! A `proto_library` becomes a CMake `INTERFACE` library listing its
//! `.proto` sources, with `INTERFACE_INCLUDE_DIRECTORIES` for the import
//! roots and `INTERFACE_LINK_LIBRARIES` for its proto deps. These libraries
//! are not meant to be linked; they carry the dependency graph that the
//! protoc helper macros walk when generating code for a consumer.

use std::path::PathBuf;

use crate::core::configurable::Configurable;
use crate::core::label::{LabelError, RelativeLabel};
use crate::core::provider::{FilesProvider, ProtoLibraryProvider, TargetInfo};
use crate::core::workspace::PROTOBUF_IMPORT_DIRS_VAR;
use crate::core::TargetId;
use crate::emit::filegroup::{emit_filegroup, FilegroupSpec};
use crate::emit::includes::{construct_proto_includes, IncludeOptions};
use crate::evaluation::context::InvocationContext;
use crate::evaluation::errors::EvalError;
use crate::evaluation::state::EvaluationState;
use crate::rules::aspect::invoke_proto_aspects;
use crate::rules::options::{
    configurable_label_list_attr, label_list_attr, string_attr, Attributes, PROTO_LANG_TOOLCHAIN,
    PROTO_LIBRARY,
};
use crate::util::diagnostic::Diagnostic;

const PROTO_SUFFIX: &str = ".proto";

/// Options of one `proto_library`, as declared.
#[derive(Debug, Clone, Default)]
pub struct ProtoLibraryArgs {
    pub srcs: Configurable<Vec<RelativeLabel>>,
    pub deps: Configurable<Vec<RelativeLabel>>,
    pub strip_import_prefix: Option<String>,
    pub import_prefix: Option<String>,
    pub visibility: Vec<RelativeLabel>,
}

impl ProtoLibraryArgs {
    pub fn from_attributes(target: &TargetId, attrs: &Attributes) -> Result<Self, EvalError> {
        Ok(ProtoLibraryArgs {
            srcs: configurable_label_list_attr(target, attrs, "srcs")?,
            deps: configurable_label_list_attr(target, attrs, "deps")?,
            strip_import_prefix: string_attr(target, attrs, "strip_import_prefix")?,
            import_prefix: string_attr(target, attrs, "import_prefix")?,
            visibility: label_list_attr(target, attrs, "visibility")?,
        })
    }
}

/// Declare a `proto_library` from raw rule options.
pub fn proto_library(
    state: &mut EvaluationState,
    context: &InvocationContext,
    name: &str,
    attrs: &Attributes,
) -> Result<TargetId, EvalError> {
    let target = rule_target(context, name)?;
    for warning in PROTO_LIBRARY.check(&target, attrs)? {
        state.report(warning);
    }
    let args = ProtoLibraryArgs::from_attributes(&target, attrs)?;
    declare_proto_library(state, context, target, args)
}

/// Declare a `proto_library` and run the registered aspects over it.
pub fn declare_proto_library(
    state: &mut EvaluationState,
    context: &InvocationContext,
    target: TargetId,
    args: ProtoLibraryArgs,
) -> Result<TargetId, EvalError> {
    let context = context.snapshot();
    let visibility = args.visibility.clone();

    let rule_target = target.clone();
    state.add_rule(
        &context,
        target.clone(),
        Box::new(move |state, context| proto_library_impl(state, context, &rule_target, args)),
        visibility.clone(),
    )?;
    invoke_proto_aspects(state, &context, &target, &visibility)?;
    Ok(target)
}

fn proto_library_impl(
    state: &mut EvaluationState,
    context: &InvocationContext,
    target: &TargetId,
    args: ProtoLibraryArgs,
) -> Result<TargetInfo, EvalError> {
    let label_error = |source: LabelError| EvalError::Label {
        target: target.clone(),
        source,
    };

    let workspace = state.workspace();
    let srcs = context
        .evaluate_configurable_list(&args.srcs, workspace)
        .and_then(|labels| context.resolve_target_or_label_list(&labels, workspace))
        .map_err(label_error)?;
    let deps = context
        .evaluate_configurable_list(&args.deps, workspace)
        .and_then(|labels| context.resolve_target_or_label_list(&labels, workspace))
        .map_err(label_error)?;

    for src in &srcs {
        validate_source(target, src)?;
    }

    // Dependents outside the protobuf repository find its well-known types
    // through the variable set by find_package(Protobuf).
    let well_known = workspace.well_known_repository();
    let needs_import_dirs = context.caller_repository_id() != well_known
        && srcs.iter().chain(&deps).any(|t| t.repository_id() == well_known);

    let repo = workspace
        .repository(target.repository_id())
        .ok_or_else(|| EvalError::UnknownRepository {
            target: target.clone(),
            repository: target.repository_id().clone(),
        })?
        .clone();
    let is_root = repo.repository_id() == workspace.root_repository();

    let pair = state.generate_cmake_target_pair(target)?;
    let files = state.collect_targets(&srcs)?;
    let file_paths: Vec<PathBuf> = files.file_paths();
    let link_libraries = state.collect_deps(&deps, false)?.link_libraries();

    let includes = construct_proto_includes(
        context.caller_package_id(),
        repo.source_directory(),
        repo.cmake_binary_dir(),
        IncludeOptions {
            strip_import_prefix: args.strip_import_prefix.as_deref(),
            import_prefix: args.import_prefix.as_deref(),
        },
        &file_paths,
        !is_root,
    );

    let strip_import_prefix = args.strip_import_prefix.as_deref().unwrap_or_default();
    let unmatched = includes.strip_prefix_unmatched.then(|| {
        format!(
            "strip_import_prefix `{}` is not a prefix of package `{}`",
            strip_import_prefix,
            context.caller_package_id().package_name(),
        )
    });
    // Conflicting prefixes produce a single warning, which also carries the
    // unmatched-prefix note.
    if args.strip_import_prefix.is_some() && args.import_prefix.is_some() {
        let mut warning = Diagnostic::warning("both strip_import_prefix and import_prefix are set")
            .for_target(target)
            .with_context(format!(
                "package {} has strip_import_prefix={:?} and import_prefix={:?}",
                context.caller_package_id(),
                strip_import_prefix,
                args.import_prefix.as_deref().unwrap_or_default(),
            ));
        if let Some(note) = unmatched {
            warning = warning.with_context(note);
        }
        state.report(
            warning.with_suggestion("the prefix is stripped first, then the import prefix is added"),
        );
    } else if let Some(note) = unmatched {
        state.report(Diagnostic::warning(note).for_target(target));
    }
    if !file_paths.is_empty() && includes.is_empty() {
        return Err(EvalError::EmptyIncludesWithSources {
            target: target.clone(),
            file_count: file_paths.len(),
        });
    }

    let public_includes = repo.replace_with_cmake_macro_dirs(&includes.public);
    let mut system_includes = repo.replace_with_cmake_macro_dirs(&includes.system);
    if needs_import_dirs {
        system_includes.push(PROTOBUF_IMPORT_DIRS_VAR.to_string());
    }

    let mut out = String::new();
    out.push_str(&format!("\n# proto_library({})\n", target.as_label()));
    emit_filegroup(
        &mut out,
        &FilegroupSpec {
            cmake_name: &pair.target,
            files: &repo.replace_with_cmake_macro_dirs(&file_paths),
            link_libraries: &link_libraries,
            public_includes: &public_includes,
            system_includes: &system_includes,
            add_dependencies: &files.add_dependencies(),
        },
    );
    if let Some(alias) = &pair.alias {
        out.push_str(&format!("add_library({} ALIAS {})\n", alias, pair.target));
    }

    let builder = state.builder_mut();
    if needs_import_dirs {
        builder.find_package("Protobuf");
    }
    builder.add_text(&out);

    Ok(TargetInfo::for_target_pair(&pair)
        .with(FilesProvider::new(file_paths))
        .with(ProtoLibraryProvider {
            target: target.clone(),
            srcs,
            deps,
            strip_import_prefix: args.strip_import_prefix,
            import_prefix: args.import_prefix,
        }))
}

/// Proto sources must be `.proto` files in the declaring rule's repository.
fn validate_source(target: &TargetId, src: &TargetId) -> Result<(), EvalError> {
    let reason = if !src.target_name().ends_with(PROTO_SUFFIX) {
        format!("`{}` does not end in {}", src.target_name(), PROTO_SUFFIX)
    } else if src.repository_id() != target.repository_id() {
        format!(
            "source is in repository {} but the rule is in {}",
            src.repository_id(),
            target.repository_id()
        )
    } else {
        return Ok(());
    };
    Err(EvalError::InvalidSource {
        target: target.clone(),
        src: src.clone(),
        reason,
    })
}

/// Check a `proto_lang_toolchain`. Toolchains only parameterize code
/// generation, so nothing is declared or emitted.
pub fn proto_lang_toolchain(
    state: &mut EvaluationState,
    context: &InvocationContext,
    name: &str,
    attrs: &Attributes,
) -> Result<TargetId, EvalError> {
    let target = rule_target(context, name)?;
    for warning in PROTO_LANG_TOOLCHAIN.check(&target, attrs)? {
        state.report(warning);
    }
    string_attr(&target, attrs, "command_line")?;
    string_attr(&target, attrs, "runtime")?;
    label_list_attr(&target, attrs, "visibility")?;
    tracing::debug!("accepted toolchain {}", target);
    Ok(target)
}

/// Resolve a rule name, attributing failures to the name as written.
pub(crate) fn rule_target(context: &InvocationContext, name: &str) -> Result<TargetId, EvalError> {
    context
        .parse_rule_target(name)
        .map_err(|source| EvalError::Label {
            target: context.caller_package_id().target(name),
            source,
        })
}
