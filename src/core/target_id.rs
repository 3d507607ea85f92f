//! Target identification - WHICH rule, in WHICH package, of WHICH repository.
//!
//! A `TargetId` uniquely addresses one declared rule across all repositories
//! combined into a translation run. Identifiers are plain values: equality,
//! ordering and hashing are structural, so two ids built from the same parts
//! are interchangeable.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Name of one source tree taking part in a build.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RepositoryId(String);

impl RepositoryId {
    /// Create a repository id from its canonical name.
    pub fn new(name: impl Into<String>) -> Self {
        RepositoryId(name.into())
    }

    /// Get the canonical repository name.
    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RepositoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}", self.0)
    }
}

impl From<&str> for RepositoryId {
    fn from(s: &str) -> Self {
        RepositoryId::new(s)
    }
}

/// A package inside a repository.
///
/// The package path is repository-relative, `/`-separated, and empty for the
/// repository root package.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PackageId {
    repository_id: RepositoryId,
    package_name: String,
}

impl PackageId {
    pub fn new(repository_id: RepositoryId, package_name: impl Into<String>) -> Self {
        PackageId {
            repository_id,
            package_name: package_name.into(),
        }
    }

    pub fn repository_id(&self) -> &RepositoryId {
        &self.repository_id
    }

    pub fn package_name(&self) -> &str {
        &self.package_name
    }

    /// Iterate over the `/`-separated segments of the package path.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.package_name.split('/').filter(|s| !s.is_empty())
    }

    /// Address a target inside this package.
    pub fn target(&self, target_name: impl Into<String>) -> TargetId {
        TargetId {
            package_id: self.clone(),
            target_name: target_name.into(),
        }
    }
}

impl fmt::Display for PackageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}//{}", self.repository_id, self.package_name)
    }
}

/// A unique identifier for a declared rule (or a source file).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TargetId {
    package_id: PackageId,
    target_name: String,
}

impl TargetId {
    pub fn new(
        repository_id: impl Into<RepositoryId>,
        package_name: impl Into<String>,
        target_name: impl Into<String>,
    ) -> Self {
        TargetId {
            package_id: PackageId::new(repository_id.into(), package_name),
            target_name: target_name.into(),
        }
    }

    pub fn repository_id(&self) -> &RepositoryId {
        self.package_id.repository_id()
    }

    pub fn package_name(&self) -> &str {
        self.package_id.package_name()
    }

    pub fn package_id(&self) -> &PackageId {
        &self.package_id
    }

    pub fn target_name(&self) -> &str {
        &self.target_name
    }

    /// Repository-relative path of this target when it names a file.
    pub fn package_relative_path(&self) -> String {
        if self.package_name().is_empty() {
            self.target_name.clone()
        } else {
            format!("{}/{}", self.package_name(), self.target_name)
        }
    }

    /// Render as an absolute label: `@repo//package:name`.
    pub fn as_label(&self) -> String {
        format!(
            "@{}//{}:{}",
            self.repository_id().name(),
            self.package_name(),
            self.target_name
        )
    }
}

impl fmt::Display for TargetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_label())
    }
}
