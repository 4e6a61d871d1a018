//! External command execution
//!
//! The compiler, linter, test runner, changelog generator and commit linter
//! are opaque shell commands. Tasks run them through a [CommandRunner]:
//! - [ShellRunner]: spawns `sh -c <command>` in the project root
//! - [RecordingRunner]: records invocations instead of spawning, for tests

pub mod context;
pub mod executor;
pub mod recording;

pub use context::StepContext;
pub use executor::{CommandRunner, ShellRunner};
pub use recording::{Invocation, RecordingRunner};
