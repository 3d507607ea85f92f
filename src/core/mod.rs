//! Core data structures.
//!
//! This module contains the foundational types used throughout the
//! translator:
//! - Target identity (RepositoryId, PackageId, TargetId) and labels
//! - Repositories and the workspace they form
//! - Providers and the per-target provider bag
//! - CMake target names

pub mod cmake_target;
pub mod configurable;
pub mod label;
pub mod provider;
pub mod target_id;
pub mod workspace;

pub use cmake_target::{CMakeTarget, CMakeTargetPair};
pub use configurable::Configurable;
pub use label::{LabelError, RelativeLabel};
pub use provider::TargetInfo;
pub use target_id::{PackageId, RepositoryId, TargetId};
pub use workspace::{Repository, Workspace};
