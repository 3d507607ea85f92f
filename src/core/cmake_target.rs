//! CMake target names.

use std::fmt;

/// A CMake target name, generated or pre-existing (`protobuf::libprotobuf`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CMakeTarget(String);

impl CMakeTarget {
    pub fn new(name: impl Into<String>) -> Self {
        CMakeTarget(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CMakeTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The CMake names of one translated target.
///
/// `target` owns the content; `alias`, when present, is a reference-only
/// `add_library(<alias> ALIAS <target>)` binding.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CMakeTargetPair {
    pub target: CMakeTarget,
    pub alias: Option<CMakeTarget>,
}

impl CMakeTargetPair {
    pub fn new(target: CMakeTarget, alias: Option<CMakeTarget>) -> Self {
        CMakeTargetPair { target, alias }
    }

    /// The name dependents should use: the alias when there is one.
    pub fn dep(&self) -> &CMakeTarget {
        self.alias.as_ref().unwrap_or(&self.target)
    }
}
