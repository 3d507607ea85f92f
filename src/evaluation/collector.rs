//! Source and dependency collection over the evaluated graph.

use std::collections::BTreeSet;
use std::path::PathBuf;

use indexmap::IndexSet;

use crate::core::cmake_target::CMakeTarget;
use crate::core::provider::{
    CMakeAddDependenciesProvider, CMakeLinkLibrariesProvider, CMakeTargetPairProvider,
    FilesProvider, ProtoLibraryProvider,
};
use crate::core::TargetId;
use crate::evaluation::errors::EvalError;
use crate::evaluation::state::EvaluationState;

/// Files and ordering prerequisites gathered from a list of source targets.
#[derive(Debug, Default)]
pub struct TargetCollector {
    files: BTreeSet<PathBuf>,
    add_dependencies: BTreeSet<CMakeTarget>,
}

impl TargetCollector {
    /// Sorted, deduplicated file paths.
    pub fn file_paths(&self) -> Vec<PathBuf> {
        self.files.iter().cloned().collect()
    }

    /// Sorted, deduplicated targets that must be built before the files
    /// exist.
    pub fn add_dependencies(&self) -> Vec<CMakeTarget> {
        self.add_dependencies.iter().cloned().collect()
    }
}

/// Link libraries gathered from the transitive closure of a deps list.
#[derive(Debug, Default)]
pub struct DepsCollector {
    link_libraries: BTreeSet<CMakeTarget>,
    visited: IndexSet<TargetId>,
}

impl DepsCollector {
    /// Sorted, deduplicated link-library references.
    pub fn link_libraries(&self) -> Vec<CMakeTarget> {
        self.link_libraries.iter().cloned().collect()
    }
}

impl EvaluationState {
    /// Collect the files behind `srcs`. Targets with providers contribute
    /// their `FilesProvider` paths; anything else is a plain file in its
    /// repository's source tree.
    pub fn collect_targets(&mut self, srcs: &[TargetId]) -> Result<TargetCollector, EvalError> {
        let mut collector = TargetCollector::default();
        for src in srcs {
            match self.get_target_info(src)? {
                Some(info) => {
                    if let Some(files) = info.get::<FilesProvider>() {
                        collector.files.extend(files.paths().iter().cloned());
                    }
                    if let Some(deps) = info.get::<CMakeAddDependenciesProvider>() {
                        collector
                            .add_dependencies
                            .extend(deps.dependencies.iter().cloned());
                    }
                }
                None => {
                    let repo = self.workspace().repository(src.repository_id()).ok_or_else(|| {
                        EvalError::UnknownRepository {
                            target: self.requester(src),
                            repository: src.repository_id().clone(),
                        }
                    })?;
                    collector.files.insert(repo.source_path(src));
                }
            }
        }
        Ok(collector)
    }

    /// Collect link libraries from the transitive closure of `deps`,
    /// following each `proto_library`'s own deps.
    ///
    /// With `alias` set, a dependency's alias name is preferred over its
    /// primary name.
    pub fn collect_deps(&mut self, deps: &[TargetId], alias: bool) -> Result<DepsCollector, EvalError> {
        let mut collector = DepsCollector::default();
        let mut pending: Vec<TargetId> = deps.iter().rev().cloned().collect();

        while let Some(dep) = pending.pop() {
            if !collector.visited.insert(dep.clone()) {
                continue;
            }

            let Some(info) = self.get_target_info(&dep)? else {
                let library = self.undeclared_library(&dep)?;
                collector.link_libraries.insert(library);
                continue;
            };

            let pair = info.get::<CMakeTargetPairProvider>().map(|p| &p.pair);
            match (alias, pair, info.get::<CMakeLinkLibrariesProvider>()) {
                (true, Some(pair), _) => {
                    collector.link_libraries.insert(pair.dep().clone());
                }
                (_, _, Some(libs)) => {
                    collector
                        .link_libraries
                        .extend(libs.link_libraries.iter().cloned());
                }
                (_, Some(pair), None) => {
                    collector.link_libraries.insert(pair.target.clone());
                }
                _ => {}
            }

            if let Some(proto) = info.get::<ProtoLibraryProvider>() {
                pending.extend(proto.deps.iter().rev().cloned());
            }
        }

        Ok(collector)
    }

    /// The CMake library standing in for a dependency nobody declared.
    fn undeclared_library(&self, dep: &TargetId) -> Result<CMakeTarget, EvalError> {
        let workspace = self.workspace();
        if let Some(mapped) = workspace.mapped_target(dep) {
            return Ok(CMakeTarget::new(mapped));
        }
        // Well-known types ship inside the runtime library.
        if dep.repository_id() == workspace.well_known_repository() {
            if let Some(runtime) = workspace.runtime_library() {
                return Ok(CMakeTarget::new(runtime));
            }
        }
        Err(EvalError::UnknownTarget {
            target: self.requester(dep),
            missing: dep.clone(),
        })
    }

    fn requester(&self, fallback: &TargetId) -> TargetId {
        self.current_target().unwrap_or(fallback).clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::cmake_target::CMakeTargetPair;
    use crate::core::provider::TargetInfo;
    use crate::test_support::{main_context, test_state};

    fn library(state: &mut EvaluationState, target: &TargetId, deps: Vec<TargetId>) {
        let pair = state.generate_cmake_target_pair(target).unwrap();
        let info = TargetInfo::for_target_pair(&pair).with(ProtoLibraryProvider {
            target: target.clone(),
            srcs: Vec::new(),
            deps,
            strip_import_prefix: None,
            import_prefix: None,
        });
        state.add_analyzed_target(target.clone(), info).unwrap();
    }

    #[test]
    fn test_plain_sources_live_in_source_tree() {
        let mut state = test_state();
        let collector = state
            .collect_targets(&[
                TargetId::new("main", "pkg", "b.proto"),
                TargetId::new("main", "pkg", "a.proto"),
                TargetId::new("main", "pkg", "a.proto"),
            ])
            .unwrap();

        assert_eq!(
            collector.file_paths(),
            vec![
                PathBuf::from("/src/main/pkg/a.proto"),
                PathBuf::from("/src/main/pkg/b.proto"),
            ]
        );
        assert!(collector.add_dependencies().is_empty());
    }

    #[test]
    fn test_generated_sources_bring_dependencies() {
        let mut state = test_state();
        let gen = TargetId::new("main", "pkg", "gen");
        state
            .add_analyzed_target(
                gen.clone(),
                TargetInfo::new()
                    .with(FilesProvider::new(vec![PathBuf::from("/build/main/pkg/gen.proto")]))
                    .with(CMakeAddDependenciesProvider {
                        dependencies: vec![CMakeTarget::new("main_pkg_gen")],
                    }),
            )
            .unwrap();

        let collector = state.collect_targets(&[gen]).unwrap();
        assert_eq!(collector.file_paths(), vec![PathBuf::from("/build/main/pkg/gen.proto")]);
        assert_eq!(collector.add_dependencies(), vec![CMakeTarget::new("main_pkg_gen")]);
    }

    #[test]
    fn test_deps_are_transitive_and_sorted() {
        let mut state = test_state();
        let base = TargetId::new("main", "pkg", "base");
        let mid = TargetId::new("main", "pkg", "mid");
        let top = TargetId::new("main", "pkg", "top");
        library(&mut state, &base, Vec::new());
        library(&mut state, &mid, vec![base.clone()]);
        library(&mut state, &top, vec![mid.clone(), base.clone()]);

        let collector = state.collect_deps(&[top.clone()], false).unwrap();
        assert_eq!(
            collector.link_libraries(),
            vec![
                CMakeTarget::new("main_pkg_base"),
                CMakeTarget::new("main_pkg_mid"),
                CMakeTarget::new("main_pkg_top"),
            ]
        );

        let aliased = state.collect_deps(&[mid], true).unwrap();
        assert_eq!(
            aliased.link_libraries(),
            vec![CMakeTarget::new("main::pkg_base"), CMakeTarget::new("main::pkg_mid")]
        );
    }

    #[test]
    fn test_undeclared_mapped_and_well_known_deps() {
        let mut state = test_state();
        let collector = state
            .collect_deps(
                &[
                    TargetId::new("com_google_protobuf", "", "protobuf_lite"),
                    TargetId::new("com_google_protobuf", "", "any_proto"),
                ],
                false,
            )
            .unwrap();
        assert_eq!(
            collector.link_libraries(),
            vec![
                CMakeTarget::new("protobuf::libprotobuf"),
                CMakeTarget::new("protobuf::libprotobuf-lite"),
            ]
        );
    }

    #[test]
    fn test_unknown_dependency() {
        let mut state = test_state();
        let missing = TargetId::new("main", "pkg", "missing");
        let err = state.collect_deps(&[missing.clone()], false).unwrap_err();
        assert!(matches!(err, EvalError::UnknownTarget { missing: m, .. } if m == missing));
    }

    #[test]
    fn test_unknown_target_names_the_requester() {
        let mut state = test_state();
        let ctx = main_context("pkg");
        let lib = TargetId::new("main", "pkg", "lib");
        let missing = TargetId::new("main", "pkg", "missing");
        let dep = missing.clone();
        state
            .add_rule(
                &ctx,
                lib.clone(),
                Box::new(move |state, _| {
                    state.collect_deps(&[dep], false)?;
                    Ok(TargetInfo::for_target_pair(&CMakeTargetPair::new(
                        CMakeTarget::new("unused"),
                        None,
                    )))
                }),
                Vec::new(),
            )
            .unwrap();

        match state.get_target_info(&lib) {
            Err(EvalError::UnknownTarget { target, missing: m }) => {
                assert_eq!(target, lib);
                assert_eq!(m, missing);
            }
            other => panic!("expected UnknownTarget, got {:?}", other.map(|_| ())),
        }
    }
}
