pub mod clean;
pub mod cli;
pub mod config;
pub mod domain;
pub mod error;
pub mod git;
pub mod manifest;
pub mod process;
pub mod tasks;
pub mod ui;
pub mod warning;
pub mod watch;

pub use error::{ReleaseError, Result};
