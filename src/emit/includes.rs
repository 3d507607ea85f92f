//! Include-root computation for proto sources.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use crate::core::PackageId;

/// Prefix options of a `proto_library`, as declared.
#[derive(Debug, Clone, Copy, Default)]
pub struct IncludeOptions<'a> {
    pub strip_import_prefix: Option<&'a str>,
    pub import_prefix: Option<&'a str>,
}

/// Include roots split by visibility to dependents.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IncludeSets {
    pub public: BTreeSet<PathBuf>,
    pub system: BTreeSet<PathBuf>,
    /// `strip_import_prefix` was set but is not a prefix of the package.
    pub strip_prefix_unmatched: bool,
}

impl IncludeSets {
    pub fn is_empty(&self) -> bool {
        self.public.is_empty() && self.system.is_empty()
    }
}

/// Compute the include roots for `known_files` declared in `package`.
///
/// Every tree root (binary dir or source dir) holding at least one known
/// file contributes `<root>/<relative include path>`. The relative include
/// path is the package path with `strip_import_prefix` removed from its
/// front and `import_prefix` prepended. With `system` set the roots are
/// recorded as system includes.
pub fn construct_proto_includes(
    package: &PackageId,
    source_dir: &Path,
    binary_dir: &Path,
    options: IncludeOptions<'_>,
    known_files: &[PathBuf],
    system: bool,
) -> IncludeSets {
    let mut sets = IncludeSets::default();

    let mut relative: Vec<&str> = package.segments().collect();
    if let Some(strip) = options.strip_import_prefix {
        let strip: Vec<&str> = split_segments(strip).collect();
        if relative.starts_with(&strip) {
            relative.drain(..strip.len());
        } else {
            sets.strip_prefix_unmatched = true;
        }
    }
    if let Some(prefix) = options.import_prefix {
        let mut prefixed: Vec<&str> = split_segments(prefix).collect();
        prefixed.extend(relative);
        relative = prefixed;
    }

    // The binary dir is often nested in the source dir; check it first.
    let mut roots: BTreeSet<&Path> = BTreeSet::new();
    for file in known_files {
        if file.starts_with(binary_dir) {
            roots.insert(binary_dir);
        } else if file.starts_with(source_dir) {
            roots.insert(source_dir);
        }
    }

    let target = if system {
        &mut sets.system
    } else {
        &mut sets.public
    };
    for root in roots {
        let mut dir = root.to_path_buf();
        dir.extend(relative.iter());
        target.insert(dir);
    }

    sets
}

fn split_segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|s| !s.is_empty())
}
