//! Domain logic - pure release rules independent of git and processes

pub mod branch;
pub mod version;

pub use branch::{release_branch_name, BranchContext, ReleaseState};
pub use version::{bump, parse_version, BumpType};
