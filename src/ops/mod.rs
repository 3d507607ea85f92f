//! High-level operations.
//!
//! This module contains the implementation of the CLI commands.

pub mod translate;

pub use translate::{
    find_build_files, load_build_file, translate, translate_paths, translate_with_aspects,
    Translation, BUILD_FILE_NAME,
};
