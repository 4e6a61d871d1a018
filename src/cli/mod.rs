pub mod orchestration;

pub use orchestration::{build_registry, preflight, report_failure, run_workflow, RunArgs, WorkflowResult};
