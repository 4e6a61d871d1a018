//! User interface module - console output of a pipeline run.
//!
//! - `formatter` - Pure formatting functions

pub mod formatter;

// Re-export formatter functions for convenience
pub use formatter::{
    display_command_output, display_error, display_plan, display_status, display_success,
    display_task_failed, display_task_finish, display_task_list, display_task_start,
    display_warning, format_duration,
};
