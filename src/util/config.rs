//! Configuration file support.
//!
//! A translation is configured by a TOML file describing the repositories
//! taking part in the build, how they name each other, which targets map
//! onto pre-existing CMake targets, and the active build configuration:
//!
//! ```toml
//! [workspace]
//! root_repository = "tensorstore"
//! active_conditions = ["//conditions:linux"]
//!
//! [naming]
//! alias = true
//!
//! [[repository]]
//! name = "tensorstore"
//! source_directory = "/src/tensorstore"
//! binary_directory = "/build/tensorstore"
//!
//! [repository.mapping]
//! protobuf = "com_google_protobuf"
//!
//! [target_mapping]
//! "@com_google_protobuf//:protobuf" = "protobuf::libprotobuf"
//! ```
//!
//! Several files may be layered; later files take precedence.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Translation configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Workspace-wide settings
    pub workspace: WorkspaceConfig,

    /// Generated target naming
    pub naming: NamingConfig,

    /// Repositories taking part in the build
    #[serde(rename = "repository")]
    pub repositories: Vec<RepositoryConfig>,

    /// Absolute label -> existing CMake target
    pub target_mapping: BTreeMap<String, String>,
}

/// Workspace-wide settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkspaceConfig {
    /// Repository whose targets are the primary output (defaults to the
    /// first configured repository)
    pub root_repository: Option<String>,

    /// Repository treated as the upstream protobuf distribution
    pub well_known_repository: Option<String>,

    /// Condition labels selected in `select()` expressions
    pub active_conditions: Vec<String>,
}

/// Generated target naming.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NamingConfig {
    /// Emit `<project>::<name>` aliases (default: true)
    pub alias: Option<bool>,
}

/// One repository.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepositoryConfig {
    /// Canonical repository name
    pub name: String,

    /// Root of the repository's sources
    pub source_directory: PathBuf,

    /// CMake binary directory (defaults to `<source_directory>/build`)
    #[serde(default)]
    pub binary_directory: Option<PathBuf>,

    /// CMake project name used for generated targets (defaults to `name`)
    #[serde(default)]
    pub cmake_project: Option<String>,

    /// Apparent repository name -> canonical repository name
    #[serde(default)]
    pub mapping: BTreeMap<String, String>,
}

impl Config {
    /// Load configuration from a file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;

        let mut config = Self::parse(&contents)
            .with_context(|| format!("failed to parse config file: {}", path.display()))?;
        if let Some(base) = path.parent() {
            config.resolve_relative_to(base);
        }
        Ok(config)
    }

    /// Make relative repository directories relative to `base`.
    pub fn resolve_relative_to(&mut self, base: &Path) {
        for repo in &mut self.repositories {
            if repo.source_directory.is_relative() {
                repo.source_directory = base.join(&repo.source_directory);
            }
            if let Some(binary) = repo.binary_directory.as_mut() {
                if binary.is_relative() {
                    *binary = base.join(&*binary);
                }
            }
        }
    }

    /// Parse configuration from TOML text.
    pub fn parse(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Merge another config into this one (other takes precedence).
    pub fn merge(&mut self, other: Config) {
        if other.workspace.root_repository.is_some() {
            self.workspace.root_repository = other.workspace.root_repository;
        }
        if other.workspace.well_known_repository.is_some() {
            self.workspace.well_known_repository = other.workspace.well_known_repository;
        }
        if !other.workspace.active_conditions.is_empty() {
            self.workspace.active_conditions = other.workspace.active_conditions;
        }

        if other.naming.alias.is_some() {
            self.naming.alias = other.naming.alias;
        }

        // Repositories are replaced by name, new ones appended.
        for repo in other.repositories {
            match self.repositories.iter_mut().find(|r| r.name == repo.name) {
                Some(existing) => *existing = repo,
                None => self.repositories.push(repo),
            }
        }

        self.target_mapping.extend(other.target_mapping);
    }
}

/// Load and merge several config files; later files take precedence.
pub fn load_config(paths: &[PathBuf]) -> Result<Config> {
    let mut config = Config::default();
    for path in paths {
        config.merge(Config::load(path)?);
    }
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const SAMPLE: &str = r#"
[workspace]
root_repository = "main"
active_conditions = ["//conditions:linux"]

[naming]
alias = false

[[repository]]
name = "main"
source_directory = "/src/main"

[repository.mapping]
pb = "com_google_protobuf"

[[repository]]
name = "dep"
source_directory = "/src/dep"
binary_directory = "/build/dep"
cmake_project = "Dep"

[target_mapping]
"@dep//:lib" = "Dep::lib"
"#;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert!(config.repositories.is_empty());
        assert!(config.naming.alias.is_none());
        assert!(config.workspace.active_conditions.is_empty());
    }

    #[test]
    fn test_config_parse() {
        let config = Config::parse(SAMPLE).unwrap();
        assert_eq!(config.workspace.root_repository.as_deref(), Some("main"));
        assert_eq!(config.naming.alias, Some(false));
        assert_eq!(config.repositories.len(), 2);
        assert_eq!(config.repositories[0].mapping["pb"], "com_google_protobuf");
        assert_eq!(config.repositories[1].cmake_project.as_deref(), Some("Dep"));
        assert_eq!(
            config.repositories[1].binary_directory,
            Some(PathBuf::from("/build/dep"))
        );
        assert_eq!(config.target_mapping["@dep//:lib"], "Dep::lib");
    }

    #[test]
    fn test_config_load() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("bazel_to_cmake.toml");
        std::fs::write(&path, SAMPLE).unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.repositories[0].name, "main");
        assert_eq!(config.repositories[0].source_directory, PathBuf::from("/src/main"));
    }

    #[test]
    fn test_relative_directories_follow_config_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("bazel_to_cmake.toml");
        std::fs::write(
            &path,
            "[[repository]]\nname = \"main\"\nsource_directory = \"src\"\nbinary_directory = \"out\"\n",
        )
        .unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.repositories[0].source_directory, tmp.path().join("src"));
        assert_eq!(config.repositories[0].binary_directory, Some(tmp.path().join("out")));
    }

    #[test]
    fn test_config_merge() {
        let mut base = Config::parse(SAMPLE).unwrap();

        let overlay = Config::parse(
            r#"
[naming]
alias = true

[[repository]]
name = "dep"
source_directory = "/vendor/dep"

[target_mapping]
"@dep//:other" = "Dep::other"
"#,
        )
        .unwrap();

        base.merge(overlay);

        assert_eq!(base.naming.alias, Some(true));
        assert_eq!(base.repositories.len(), 2);
        assert_eq!(base.repositories[1].source_directory, PathBuf::from("/vendor/dep"));
        // Not overridden
        assert_eq!(base.workspace.root_repository.as_deref(), Some("main"));
        assert_eq!(base.target_mapping.len(), 2);
    }
}
