//! Workspace - the set of repositories combined into one translation.
//!
//! A Workspace knows where each repository lives on disk (source and CMake
//! binary directories), how repositories name each other, and which targets
//! map onto pre-existing CMake targets instead of generated ones.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};

use crate::core::label::{RelativeLabel, RepositoryRef};
use crate::core::target_id::{PackageId, RepositoryId, TargetId};
use crate::util::config::{Config, RepositoryConfig};

/// Canonical name of the upstream protocol buffer repository.
pub const PROTOBUF_REPOSITORY: &str = "com_google_protobuf";

/// Placeholder resolved by CMake's FindProtobuf to the well-known proto
/// import directories.
pub const PROTOBUF_IMPORT_DIRS_VAR: &str = "${Protobuf_IMPORT_DIRS}";

/// Pre-existing CMake targets provided by an installed protobuf.
pub const PROTOBUF_TARGET_MAPPING: &[(&str, &str)] = &[
    ("protobuf", "protobuf::libprotobuf"),
    ("protobuf_lite", "protobuf::libprotobuf-lite"),
    ("protoc", "protobuf::protoc"),
    ("protoc_lib", "protobuf::libprotoc"),
];

/// One repository taking part in the translation.
#[derive(Debug, Clone)]
pub struct Repository {
    repository_id: RepositoryId,
    source_directory: PathBuf,
    cmake_binary_dir: PathBuf,
    cmake_project: String,
    /// Apparent name -> canonical repository, as seen from this repository.
    repo_mapping: BTreeMap<String, RepositoryId>,
    source_macro: String,
    binary_macro: String,
}

impl Repository {
    /// Create a repository. The root repository renders its directories as
    /// `${PROJECT_SOURCE_DIR}`/`${PROJECT_BINARY_DIR}`, other repositories as
    /// `${<project>_SOURCE_DIR}`/`${<project>_BINARY_DIR}`.
    pub fn new(
        repository_id: RepositoryId,
        source_directory: impl Into<PathBuf>,
        cmake_binary_dir: impl Into<PathBuf>,
        cmake_project: impl Into<String>,
        is_root: bool,
    ) -> Self {
        let cmake_project = cmake_project.into();
        let (source_macro, binary_macro) = if is_root {
            (
                "${PROJECT_SOURCE_DIR}".to_string(),
                "${PROJECT_BINARY_DIR}".to_string(),
            )
        } else {
            (
                format!("${{{}_SOURCE_DIR}}", cmake_project),
                format!("${{{}_BINARY_DIR}}", cmake_project),
            )
        };

        Repository {
            repository_id,
            source_directory: source_directory.into(),
            cmake_binary_dir: cmake_binary_dir.into(),
            cmake_project,
            repo_mapping: BTreeMap::new(),
            source_macro,
            binary_macro,
        }
    }

    /// Add an apparent-name mapping (`@apparent` -> `canonical`).
    pub fn with_mapping(mut self, apparent: impl Into<String>, canonical: RepositoryId) -> Self {
        self.repo_mapping.insert(apparent.into(), canonical);
        self
    }

    pub fn repository_id(&self) -> &RepositoryId {
        &self.repository_id
    }

    pub fn source_directory(&self) -> &Path {
        &self.source_directory
    }

    pub fn cmake_binary_dir(&self) -> &Path {
        &self.cmake_binary_dir
    }

    pub fn cmake_project(&self) -> &str {
        &self.cmake_project
    }

    /// Look up an apparent repository name in this repository's mapping.
    pub fn mapped(&self, apparent: &str) -> Option<&RepositoryId> {
        self.repo_mapping.get(apparent)
    }

    /// Absolute path of a source file addressed by `target`.
    pub fn source_path(&self, target: &TargetId) -> PathBuf {
        self.source_directory.join(target.package_relative_path())
    }

    /// Rewrite absolute paths under this repository's directories to their
    /// CMake macro form. Paths outside both directories are kept verbatim.
    pub fn replace_with_cmake_macro_dirs<'a>(
        &self,
        paths: impl IntoIterator<Item = &'a PathBuf>,
    ) -> Vec<String> {
        paths
            .into_iter()
            .map(|path| self.replace_with_cmake_macro_dir(path))
            .collect()
    }

    fn replace_with_cmake_macro_dir(&self, path: &Path) -> String {
        // The binary dir is commonly nested inside the source dir, so it is
        // checked first.
        for (root, macro_name) in [
            (&self.cmake_binary_dir, &self.binary_macro),
            (&self.source_directory, &self.source_macro),
        ] {
            if let Ok(rel) = path.strip_prefix(root) {
                let rel = to_posix(rel);
                return if rel.is_empty() {
                    macro_name.clone()
                } else {
                    format!("{}/{}", macro_name, rel)
                };
            }
        }
        to_posix(path)
    }
}

/// Render a path with `/` separators.
pub fn to_posix(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

/// Naming options for generated CMake targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NamingConvention {
    /// Emit a `<project>::<name>` alias next to every generated target.
    pub alias: bool,
}

impl Default for NamingConvention {
    fn default() -> Self {
        NamingConvention { alias: true }
    }
}

/// All repositories of one translation run.
#[derive(Debug, Clone)]
pub struct Workspace {
    root_repository: RepositoryId,
    well_known_repository: RepositoryId,
    all_repositories: BTreeMap<RepositoryId, Repository>,
    /// Targets provided by pre-existing CMake targets.
    target_mapping: BTreeMap<TargetId, String>,
    naming: NamingConvention,
    active_conditions: BTreeSet<String>,
}

impl Workspace {
    /// Create a workspace containing only the root repository.
    pub fn new(root: Repository) -> Self {
        let root_repository = root.repository_id().clone();
        let mut all_repositories = BTreeMap::new();
        all_repositories.insert(root_repository.clone(), root);

        let well_known_repository = RepositoryId::new(PROTOBUF_REPOSITORY);
        let target_mapping = PROTOBUF_TARGET_MAPPING
            .iter()
            .map(|(name, cmake)| {
                (
                    TargetId::new(well_known_repository.clone(), "", *name),
                    cmake.to_string(),
                )
            })
            .collect();

        Workspace {
            root_repository,
            well_known_repository,
            all_repositories,
            target_mapping,
            naming: NamingConvention::default(),
            active_conditions: BTreeSet::new(),
        }
    }

    /// Build a workspace from configuration.
    pub fn from_config(config: &Config) -> Result<Self> {
        let root_name = config
            .workspace
            .root_repository
            .clone()
            .or_else(|| config.repositories.first().map(|r| r.name.clone()))
            .context("no repositories configured")?;
        let root_id = RepositoryId::new(root_name);

        let root_config = config
            .repositories
            .iter()
            .find(|r| r.name == root_id.name())
            .with_context(|| format!("root repository `{}` is not configured", root_id))?;

        let root = repository_from_config(root_config, true);
        check_cmake_project(&root)?;
        let mut ws = Workspace::new(root);

        for repo in config.repositories.iter().filter(|r| r.name != root_id.name()) {
            ws.add_repository(repository_from_config(repo, false))?;
        }

        if let Some(name) = &config.workspace.well_known_repository {
            let previous =
                std::mem::replace(&mut ws.well_known_repository, RepositoryId::new(name.clone()));
            ws.target_mapping.retain(|target, _| target.repository_id() != &previous);
            for (target, cmake) in PROTOBUF_TARGET_MAPPING {
                ws.target_mapping.insert(
                    TargetId::new(ws.well_known_repository.clone(), "", *target),
                    cmake.to_string(),
                );
            }
        }
        ws.naming.alias = config.naming.alias.unwrap_or(true);
        ws.set_active_conditions(config.workspace.active_conditions.iter().cloned());

        let root_package = PackageId::new(ws.root_repository.clone(), "");
        for (label, cmake_target) in &config.target_mapping {
            let target = RelativeLabel::new(label.clone())
                .resolve(&root_package, |repository| {
                    ws.lookup_repository(&ws.root_repository, repository)
                })
                .with_context(|| format!("invalid target_mapping entry `{}`", label))?;
            ws.target_mapping.insert(target, cmake_target.clone());
        }

        Ok(ws)
    }

    /// Register another repository.
    pub fn add_repository(&mut self, repository: Repository) -> Result<()> {
        let id = repository.repository_id().clone();
        if self.all_repositories.contains_key(&id) {
            bail!("repository `{}` is configured twice", id);
        }
        check_cmake_project(&repository)?;
        if let Some(other) = self
            .all_repositories
            .values()
            .find(|r| r.cmake_project() == repository.cmake_project())
        {
            bail!(
                "repositories `{}` and `{}` share the CMake project `{}`",
                other.repository_id(),
                id,
                repository.cmake_project()
            );
        }
        self.all_repositories.insert(id, repository);
        Ok(())
    }

    pub fn set_active_conditions(&mut self, conditions: impl IntoIterator<Item = String>) {
        self.active_conditions = conditions.into_iter().collect();
    }

    pub fn root_repository(&self) -> &RepositoryId {
        &self.root_repository
    }

    pub fn well_known_repository(&self) -> &RepositoryId {
        &self.well_known_repository
    }

    pub fn naming(&self) -> NamingConvention {
        self.naming
    }

    pub fn active_conditions(&self) -> &BTreeSet<String> {
        &self.active_conditions
    }

    pub fn repository(&self, id: &RepositoryId) -> Option<&Repository> {
        self.all_repositories.get(id)
    }

    pub fn repositories(&self) -> impl Iterator<Item = &Repository> {
        self.all_repositories.values()
    }

    /// The pre-existing CMake target for `target`, if it is mapped.
    pub fn mapped_target(&self, target: &TargetId) -> Option<&str> {
        self.target_mapping.get(target).map(String::as_str)
    }

    /// The CMake target that stands in for the protobuf runtime library.
    pub fn runtime_library(&self) -> Option<&str> {
        self.mapped_target(&TargetId::new(self.well_known_repository.clone(), "", "protobuf"))
    }

    /// Resolve an apparent repository name as seen from `from`.
    ///
    /// The declaring repository's own mapping takes precedence; otherwise
    /// the name must match a configured repository.
    pub fn resolve_repository(&self, from: &RepositoryId, apparent: &str) -> Option<RepositoryId> {
        if let Some(mapped) = self.all_repositories.get(from).and_then(|r| r.mapped(apparent)) {
            return Some(mapped.clone());
        }
        self.known_repository(apparent)
    }

    /// Resolve the repository part of a label as seen from `from`. Canonical
    /// `@@name` references skip the mapping but must still be known.
    pub fn lookup_repository(
        &self,
        from: &RepositoryId,
        repository: &RepositoryRef,
    ) -> Option<RepositoryId> {
        match repository {
            RepositoryRef::Current => Some(from.clone()),
            RepositoryRef::Apparent(name) => self.resolve_repository(from, name),
            RepositoryRef::Canonical(name) => self.known_repository(name),
        }
    }

    fn known_repository(&self, name: &str) -> Option<RepositoryId> {
        let id = RepositoryId::new(name);
        (self.all_repositories.contains_key(&id) || id == self.well_known_repository).then_some(id)
    }
}

/// Generated target names are prefixed with the project, so it must be a
/// plain CMake identifier.
fn check_cmake_project(repository: &Repository) -> Result<()> {
    let project = repository.cmake_project();
    let valid = !project.is_empty()
        && !project.starts_with('_')
        && !project.ends_with('_')
        && project.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if !valid {
        bail!(
            "repository `{}` has invalid CMake project name `{}`",
            repository.repository_id(),
            project
        );
    }
    Ok(())
}

fn repository_from_config(config: &RepositoryConfig, is_root: bool) -> Repository {
    let project = config
        .cmake_project
        .clone()
        .unwrap_or_else(|| config.name.clone());
    let binary = config
        .binary_directory
        .clone()
        .unwrap_or_else(|| config.source_directory.join("build"));

    let mut repo = Repository::new(
        RepositoryId::new(config.name.clone()),
        config.source_directory.clone(),
        binary,
        project,
        is_root,
    );
    for (apparent, canonical) in &config.mapping {
        repo = repo.with_mapping(apparent.clone(), RepositoryId::new(canonical.clone()));
    }
    repo
}

#[cfg(test)]
mod tests {
    use super::*;

    fn root_repo() -> Repository {
        Repository::new(
            RepositoryId::new("main"),
            "/src/main",
            "/src/main/build",
            "main",
            true,
        )
    }

    #[test]
    fn test_macro_replacement_root() {
        let repo = root_repo();
        let paths = vec![
            PathBuf::from("/src/main/a/b.proto"),
            PathBuf::from("/src/main/build/gen/c.proto"),
            PathBuf::from("/src/main"),
            PathBuf::from("/elsewhere/d.proto"),
        ];
        assert_eq!(
            repo.replace_with_cmake_macro_dirs(&paths),
            vec![
                "${PROJECT_SOURCE_DIR}/a/b.proto",
                "${PROJECT_BINARY_DIR}/gen/c.proto",
                "${PROJECT_SOURCE_DIR}",
                "/elsewhere/d.proto",
            ]
        );
    }

    #[test]
    fn test_macro_replacement_dependency_repo() {
        let repo = Repository::new(RepositoryId::new("dep"), "/deps/dep", "/build/dep", "Dep", false);
        let paths = vec![PathBuf::from("/deps/dep/x.proto")];
        assert_eq!(
            repo.replace_with_cmake_macro_dirs(&paths),
            vec!["${Dep_SOURCE_DIR}/x.proto"]
        );
    }

    #[test]
    fn test_default_protobuf_mapping() {
        let ws = Workspace::new(root_repo());
        assert_eq!(ws.runtime_library(), Some("protobuf::libprotobuf"));
        assert_eq!(
            ws.mapped_target(&TargetId::new(PROTOBUF_REPOSITORY, "", "protoc")),
            Some("protobuf::protoc")
        );
        assert_eq!(
            ws.mapped_target(&TargetId::new(PROTOBUF_REPOSITORY, "", "any_proto")),
            None
        );
    }

    #[test]
    fn test_resolve_repository() {
        let mut ws = Workspace::new(
            root_repo().with_mapping("pb", RepositoryId::new(PROTOBUF_REPOSITORY)),
        );
        ws.add_repository(Repository::new(RepositoryId::new("dep"), "/d", "/d/b", "dep", false))
            .unwrap();

        let main = RepositoryId::new("main");
        assert_eq!(
            ws.resolve_repository(&main, "pb"),
            Some(RepositoryId::new(PROTOBUF_REPOSITORY))
        );
        assert_eq!(ws.resolve_repository(&main, "dep"), Some(RepositoryId::new("dep")));
        assert_eq!(
            ws.resolve_repository(&main, PROTOBUF_REPOSITORY),
            Some(RepositoryId::new(PROTOBUF_REPOSITORY))
        );
        assert_eq!(ws.resolve_repository(&main, "missing"), None);

        // Canonical names bypass the mapping but must still be known.
        let canonical = |name: &str| RepositoryRef::Canonical(name.to_string());
        assert_eq!(
            ws.lookup_repository(&main, &canonical("dep")),
            Some(RepositoryId::new("dep"))
        );
        assert_eq!(
            ws.lookup_repository(&main, &canonical(PROTOBUF_REPOSITORY)),
            Some(RepositoryId::new(PROTOBUF_REPOSITORY))
        );
        assert_eq!(ws.lookup_repository(&main, &canonical("pb")), None);
        assert_eq!(ws.lookup_repository(&main, &canonical("nowhere")), None);
    }

    #[test]
    fn test_from_config() {
        let config = Config::parse(
            r#"
[workspace]
active_conditions = ["//conditions:linux"]
well_known_repository = "protobuf"

[naming]
alias = false

[[repository]]
name = "main"
source_directory = "/src/main"

[[repository]]
name = "dep"
source_directory = "/src/dep"
cmake_project = "Dep"

[target_mapping]
"@dep//lib:core" = "Dep::core"
"#,
        )
        .unwrap();
        let ws = Workspace::from_config(&config).unwrap();

        assert_eq!(ws.root_repository(), &RepositoryId::new("main"));
        assert_eq!(ws.well_known_repository(), &RepositoryId::new("protobuf"));
        assert!(!ws.naming().alias);
        assert!(ws.active_conditions().contains("//conditions:linux"));
        assert_eq!(ws.repositories().count(), 2);

        let dep = ws.repository(&RepositoryId::new("dep")).unwrap();
        assert_eq!(dep.cmake_binary_dir(), Path::new("/src/dep/build"));
        assert_eq!(dep.cmake_project(), "Dep");

        assert_eq!(
            ws.mapped_target(&TargetId::new("dep", "lib", "core")),
            Some("Dep::core")
        );
        assert_eq!(ws.runtime_library(), Some("protobuf::libprotobuf"));
        assert_eq!(
            ws.mapped_target(&TargetId::new("protobuf", "", "protoc")),
            Some("protobuf::protoc")
        );
        for (name, _) in PROTOBUF_TARGET_MAPPING {
            assert_eq!(ws.mapped_target(&TargetId::new(PROTOBUF_REPOSITORY, "", *name)), None);
        }
    }

    #[test]
    fn test_from_config_requires_a_repository() {
        assert!(Workspace::from_config(&Config::default()).is_err());
    }

    #[test]
    fn test_duplicate_repository_rejected() {
        let mut ws = Workspace::new(root_repo());
        assert!(ws.add_repository(root_repo()).is_err());
    }

    #[test]
    fn test_cmake_projects_must_be_distinct_identifiers() {
        let mut ws = Workspace::new(root_repo());
        let err = ws
            .add_repository(Repository::new(RepositoryId::new("dep"), "/d", "/d/b", "main", false))
            .unwrap_err();
        assert!(err.to_string().contains("share the CMake project `main`"));

        for project in ["", "_dep", "dep_", "my-dep"] {
            let repo = Repository::new(RepositoryId::new("dep"), "/d", "/d/b", project, false);
            assert!(ws.add_repository(repo).is_err(), "accepted `{}`", project);
        }
        ws.add_repository(Repository::new(RepositoryId::new("dep"), "/d", "/d/b", "my_dep", false))
            .unwrap();
    }
}
