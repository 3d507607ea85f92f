//! Labels - textual references to targets as written in rules.
//!
//! A label may omit the repository (`//pkg:name`), the package (`:name`), or
//! both (`file.proto`). Resolution against the declaring package turns a
//! [`RelativeLabel`] into an absolute [`TargetId`].

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::target_id::{PackageId, RepositoryId, TargetId};

/// Error while parsing or resolving a label.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LabelError {
    #[error("invalid label `{label}`: {reason}")]
    InvalidLabel { label: String, reason: String },

    #[error("label `{label}` refers to unknown repository `@{repository}`")]
    UnknownRepository { label: String, repository: String },
}

impl LabelError {
    fn invalid(label: &str, reason: impl Into<String>) -> Self {
        LabelError::InvalidLabel {
            label: label.to_string(),
            reason: reason.into(),
        }
    }
}

/// A possibly-relative target reference.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RelativeLabel(String);

/// How a label names its repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepositoryRef {
    /// No repository given; the declaring repository.
    Current,
    /// `@name`: looked up through the declaring repository's mapping.
    Apparent(String),
    /// `@@name`: a canonical repository name.
    Canonical(String),
}

/// The components of a syntactically valid label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedLabel {
    pub repository: RepositoryRef,
    /// `None` when the label is relative to the declaring package.
    pub package: Option<String>,
    pub target: String,
}

impl RelativeLabel {
    pub fn new(label: impl Into<String>) -> Self {
        RelativeLabel(label.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Split the label into its components, validating its syntax.
    pub fn parse(&self) -> Result<ParsedLabel, LabelError> {
        let label = self.0.as_str();
        if label.is_empty() {
            return Err(LabelError::invalid(label, "empty label"));
        }
        if label.chars().any(char::is_whitespace) {
            return Err(LabelError::invalid(label, "contains whitespace"));
        }
        if label.matches(':').count() > 1 {
            return Err(LabelError::invalid(label, "more than one `:`"));
        }

        let (repository, rest) = if let Some(stripped) = label.strip_prefix("@@") {
            let (name, rest) = split_repository(label, stripped)?;
            (RepositoryRef::Canonical(name), rest)
        } else if let Some(stripped) = label.strip_prefix('@') {
            let (name, rest) = split_repository(label, stripped)?;
            (RepositoryRef::Apparent(name), rest)
        } else {
            (RepositoryRef::Current, label)
        };

        // `@repo` is shorthand for `@repo//:repo`.
        if rest.is_empty() {
            let target = match &repository {
                RepositoryRef::Apparent(name) | RepositoryRef::Canonical(name) => name.clone(),
                RepositoryRef::Current => return Err(LabelError::invalid(label, "empty label")),
            };
            return Ok(ParsedLabel {
                repository,
                package: Some(String::new()),
                target,
            });
        }

        let (package, target) = if let Some(absolute) = rest.strip_prefix("//") {
            let (package, target) = match absolute.split_once(':') {
                Some((package, target)) => (package, target.to_string()),
                None => {
                    let last = absolute.rsplit('/').next().unwrap_or_default();
                    if last.is_empty() {
                        return Err(LabelError::invalid(label, "missing target name"));
                    }
                    (absolute, last.to_string())
                }
            };
            validate_package(label, package)?;
            (Some(package.to_string()), target)
        } else if !matches!(repository, RepositoryRef::Current) {
            return Err(LabelError::invalid(label, "expected `//` after repository"));
        } else if let Some(target) = rest.strip_prefix(':') {
            (None, target.to_string())
        } else if rest.contains(':') {
            return Err(LabelError::invalid(label, "relative label with package part"));
        } else {
            (None, rest.to_string())
        };

        validate_target(label, &target)?;

        Ok(ParsedLabel {
            repository,
            package,
            target,
        })
    }

    /// Resolve against the declaring package.
    ///
    /// `lookup` maps an explicit repository reference (`@name` as seen from
    /// the declaring repository, or `@@name`) to a known repository.
    pub fn resolve<F>(&self, base: &PackageId, lookup: F) -> Result<TargetId, LabelError>
    where
        F: Fn(&RepositoryRef) -> Option<RepositoryId>,
    {
        let parsed = self.parse()?;

        let repository_id = match &parsed.repository {
            RepositoryRef::Current => base.repository_id().clone(),
            RepositoryRef::Apparent(name) | RepositoryRef::Canonical(name) => {
                lookup(&parsed.repository).ok_or_else(|| LabelError::UnknownRepository {
                    label: self.0.clone(),
                    repository: name.clone(),
                })?
            }
        };

        let package_name = match parsed.package {
            Some(package) => package,
            None => base.package_name().to_string(),
        };

        Ok(TargetId::new(repository_id, package_name, parsed.target))
    }
}

fn split_repository<'a>(label: &str, rest: &'a str) -> Result<(String, &'a str), LabelError> {
    let (name, rest) = match rest.find("//") {
        Some(idx) => (&rest[..idx], &rest[idx..]),
        None => (rest, ""),
    };
    if name.is_empty() {
        return Err(LabelError::invalid(label, "empty repository name"));
    }
    if name.contains(['/', ':']) {
        return Err(LabelError::invalid(label, "malformed repository name"));
    }
    Ok((name.to_string(), rest))
}

fn validate_package(label: &str, package: &str) -> Result<(), LabelError> {
    if package.is_empty() {
        return Ok(());
    }
    if package.starts_with('/') || package.ends_with('/') {
        return Err(LabelError::invalid(label, "malformed package path"));
    }
    for segment in package.split('/') {
        if segment.is_empty() || segment == "." || segment == ".." {
            return Err(LabelError::invalid(
                label,
                format!("invalid package segment `{}`", segment),
            ));
        }
    }
    Ok(())
}

fn validate_target(label: &str, target: &str) -> Result<(), LabelError> {
    if target.is_empty() {
        return Err(LabelError::invalid(label, "empty target name"));
    }
    for segment in target.split('/') {
        if segment.is_empty() || segment == "." || segment == ".." {
            return Err(LabelError::invalid(
                label,
                format!("invalid target segment `{}`", segment),
            ));
        }
    }
    Ok(())
}

impl fmt::Display for RelativeLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RelativeLabel {
    fn from(s: &str) -> Self {
        RelativeLabel::new(s)
    }
}

impl From<String> for RelativeLabel {
    fn from(s: String) -> Self {
        RelativeLabel::new(s)
    }
}
