//! Providers - typed, immutable records a target exposes once evaluated.
//!
//! A [`TargetInfo`] is the bag of providers attached to one target. It is
//! assembled once, when the target is evaluated, and shared read-only with
//! every dependent afterwards.

use std::any::{Any, TypeId};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use crate::core::cmake_target::{CMakeTarget, CMakeTargetPair};
use crate::core::target_id::TargetId;

/// Access to the concrete type behind a `dyn Provider`.
pub trait AsAny {
    fn as_any(&self) -> &dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Marker for types that can be stored in a [`TargetInfo`].
pub trait Provider: AsAny + fmt::Debug + 'static {
    /// Short name used when listing a bag's contents.
    fn provider_name(&self) -> &'static str;
}

/// Naming info: the CMake names generated for a target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CMakeTargetPairProvider {
    pub pair: CMakeTargetPair,
}

/// Link-library references a target contributes to its dependents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CMakeLinkLibrariesProvider {
    pub link_libraries: Vec<CMakeTarget>,
}

/// CMake targets that must run before a target's files exist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CMakeAddDependenciesProvider {
    pub dependencies: Vec<CMakeTarget>,
}

/// The sorted, deduplicated files backing a target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilesProvider {
    paths: Vec<PathBuf>,
}

impl FilesProvider {
    pub fn new(paths: impl IntoIterator<Item = PathBuf>) -> Self {
        let mut paths: Vec<PathBuf> = paths.into_iter().collect();
        paths.sort();
        paths.dedup();
        FilesProvider { paths }
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }
}

/// A `proto_library` declaration, echoed for rules layered on top.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtoLibraryProvider {
    pub target: TargetId,
    pub srcs: Vec<TargetId>,
    pub deps: Vec<TargetId>,
    pub strip_import_prefix: Option<String>,
    pub import_prefix: Option<String>,
}

impl Provider for CMakeTargetPairProvider {
    fn provider_name(&self) -> &'static str {
        "CMakeTargetPairProvider"
    }
}

impl Provider for CMakeLinkLibrariesProvider {
    fn provider_name(&self) -> &'static str {
        "CMakeLinkLibrariesProvider"
    }
}

impl Provider for CMakeAddDependenciesProvider {
    fn provider_name(&self) -> &'static str {
        "CMakeAddDependenciesProvider"
    }
}

impl Provider for FilesProvider {
    fn provider_name(&self) -> &'static str {
        "FilesProvider"
    }
}

impl Provider for ProtoLibraryProvider {
    fn provider_name(&self) -> &'static str {
        "ProtoLibraryProvider"
    }
}

/// The providers of one evaluated target, at most one per provider type.
#[derive(Default)]
pub struct TargetInfo {
    providers: BTreeMap<ProviderKey, Box<dyn Provider>>,
}

#[derive(PartialEq, Eq, PartialOrd, Ord)]
struct ProviderKey(TypeId);

impl TargetInfo {
    pub fn new() -> Self {
        TargetInfo::default()
    }

    /// The default naming providers of a generated target.
    pub fn for_target_pair(pair: &CMakeTargetPair) -> Self {
        TargetInfo::new()
            .with(CMakeTargetPairProvider { pair: pair.clone() })
            .with(CMakeLinkLibrariesProvider {
                link_libraries: vec![pair.target.clone()],
            })
    }

    /// Add a provider. A provider of the same type replaces the earlier one.
    pub fn with<P: Provider>(mut self, provider: P) -> Self {
        self.providers
            .insert(ProviderKey(TypeId::of::<P>()), Box::new(provider));
        self
    }

    pub fn get<P: Provider>(&self) -> Option<&P> {
        self.providers
            .get(&ProviderKey(TypeId::of::<P>()))
            .and_then(|p| (**p).as_any().downcast_ref::<P>())
    }

    pub fn contains<P: Provider>(&self) -> bool {
        self.providers.contains_key(&ProviderKey(TypeId::of::<P>()))
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    pub fn provider_names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.providers.values().map(|p| p.provider_name()).collect();
        names.sort_unstable();
        names
    }
}

impl fmt::Debug for TargetInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.providers.values()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_files_provider_sorts_and_dedups() {
        let files = FilesProvider::new(vec![
            PathBuf::from("/r/b.proto"),
            PathBuf::from("/r/a.proto"),
            PathBuf::from("/r/b.proto"),
        ]);
        assert_eq!(
            files.paths(),
            &[PathBuf::from("/r/a.proto"), PathBuf::from("/r/b.proto")]
        );
    }

    #[test]
    fn test_typed_lookup() {
        let pair = CMakeTargetPair::new(CMakeTarget::new("p_x"), None);
        let info = TargetInfo::for_target_pair(&pair).with(FilesProvider::new(Vec::new()));

        assert_eq!(info.get::<CMakeTargetPairProvider>().unwrap().pair, pair);
        assert!(info.get::<FilesProvider>().unwrap().paths().is_empty());
        assert!(info.get::<ProtoLibraryProvider>().is_none());
        assert_eq!(info.len(), 3);
        assert_eq!(
            info.provider_names(),
            vec!["CMakeLinkLibrariesProvider", "CMakeTargetPairProvider", "FilesProvider"]
        );
    }

    #[test]
    fn test_same_type_replaces() {
        let info = TargetInfo::new()
            .with(FilesProvider::new(vec![PathBuf::from("a")]))
            .with(FilesProvider::new(vec![PathBuf::from("b")]));
        assert_eq!(info.len(), 1);
        assert_eq!(info.get::<FilesProvider>().unwrap().paths(), &[PathBuf::from("b")]);
    }
}
