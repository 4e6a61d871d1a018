//! Main workflow orchestration logic
//!
//! Separates CLI argument parsing from the run itself: building the
//! registry, the checks that must pass before any external command runs,
//! and dispatching to the task runner.

use crate::config::Config;
use crate::domain::BumpType;
use crate::error::{ReleaseError, Result};
use crate::git::Repository;
use crate::process::CommandRunner;
use crate::tasks::{register_builtins, register_user_tasks, TaskContext, TaskRegistry, TaskRunner};
use crate::ui;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Arguments for the task workflow
///
/// Mirrors the CLI Args but in a format suitable for orchestration logic,
/// so the workflow can be called programmatically without depending on clap.
#[derive(Debug, Clone, PartialEq)]
pub struct RunArgs {
    /// Task to run
    pub task: String,

    /// Bump type for `bump-version`
    pub bump_type: Option<BumpType>,

    /// Project root
    pub root: PathBuf,

    /// Print the plan instead of running
    pub dry_run: bool,
}

impl RunArgs {
    pub fn new(task: impl Into<String>, root: impl Into<PathBuf>) -> Self {
        RunArgs {
            task: task.into(),
            bump_type: None,
            root: root.into(),
            dry_run: false,
        }
    }
}

/// Result of a workflow
#[derive(Debug, Clone, PartialEq)]
pub struct WorkflowResult {
    /// The task that was requested
    pub task: String,

    /// False for a dry run
    pub executed: bool,

    pub elapsed: Duration,
}

/// Built-in tasks plus the `[tasks]` section, checked for dangling
/// references and cycles
pub fn build_registry(config: &Config) -> Result<TaskRegistry> {
    let mut registry = TaskRegistry::new();
    register_builtins(&mut registry, config);
    register_user_tasks(&mut registry, config);
    registry.validate()?;
    Ok(registry)
}

/// Checks that run before any task starts
///
/// Fails for an unknown task, or for a task that bumps the version when no
/// bump type was given.
pub fn preflight(registry: &TaskRegistry, task: &str, bump_type: Option<BumpType>) -> Result<()> {
    if !registry.contains(task) {
        return Err(ReleaseError::UnknownTask(task.to_string()));
    }
    if bump_type.is_none() && registry.requires_bump_type(task)? {
        return Err(BumpType::invalid());
    }
    Ok(())
}

/// Main task workflow
///
/// 1. Build and validate the registry
/// 2. Preflight checks
/// 3. Print the plan (dry run) or run the task
pub fn run_workflow(
    args: &RunArgs,
    config: Config,
    commands: Arc<dyn CommandRunner>,
    repo: Option<Arc<dyn Repository>>,
) -> Result<WorkflowResult> {
    let started = Instant::now();
    let registry = build_registry(&config)?;
    preflight(&registry, &args.task, args.bump_type)?;

    if args.dry_run {
        let plan = registry.plan(&args.task)?;
        ui::display_plan(&args.task, &plan.render());
        return Ok(WorkflowResult {
            task: args.task.clone(),
            executed: false,
            elapsed: started.elapsed(),
        });
    }

    let mut ctx = TaskContext::new(config, &args.root, commands).with_bump_type(args.bump_type);
    if let Some(repo) = repo {
        ctx = ctx.with_repository(repo);
    }

    let runner = TaskRunner::new(&registry, &ctx)?;
    runner.run(&args.task)?;

    Ok(WorkflowResult {
        task: args.task.clone(),
        executed: true,
        elapsed: started.elapsed(),
    })
}

/// Print a failed run: the task path, then the underlying cause(s)
pub fn report_failure(err: &ReleaseError) {
    let trail = err.task_trail();
    if !trail.is_empty() {
        ui::display_error(&format!("Failed in {}", trail.join(" > ")));
    }

    match err.root_cause() {
        ReleaseError::Parallel { failures } => {
            for (task, failure) in failures {
                let cause = failure.root_cause();
                ui::display_error(&format!("'{}': {}", task, cause));
                // Nested groups report their own members.
                if let ReleaseError::Parallel { .. } = cause {
                    report_failure(failure);
                }
            }
        }
        cause => ui::display_error(&cause.to_string()),
    }
}
