//! CMake emission: include roots, file-group libraries and the text sink.

pub mod builder;
pub mod filegroup;
pub mod includes;

pub use builder::CMakeBuilder;
pub use filegroup::{emit_filegroup, FilegroupSpec};
pub use includes::{construct_proto_includes, IncludeOptions, IncludeSets};
