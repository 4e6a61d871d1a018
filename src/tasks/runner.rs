use crate::config::Config;
use crate::domain::{BumpType, ReleaseState};
use crate::error::{ReleaseError, Result};
use crate::git::Repository;
use crate::manifest::Manifest;
use crate::process::{CommandRunner, StepContext};
use crate::tasks::{TaskKind, TaskRegistry};
use crate::ui;
use crate::warning::PipelineWarning;
use crate::watch::{self, WatchOptions};
use rayon::prelude::*;
use semver::Version;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

/// Everything a task can reach while it runs
///
/// Shared by reference across a parallel group, so it is `Sync`; the only
/// mutable part is the branch bookkeeping behind a mutex.
pub struct TaskContext {
    pub config: Config,
    pub root: PathBuf,
    bump_type: Option<BumpType>,
    commands: Arc<dyn CommandRunner>,
    repo: Option<Arc<dyn Repository>>,
    state: Mutex<ReleaseState>,
    watch_limit: Option<usize>,
}

impl TaskContext {
    pub fn new(config: Config, root: impl Into<PathBuf>, commands: Arc<dyn CommandRunner>) -> Self {
        let state = ReleaseState::new(config.git.default_start_branch.clone());
        TaskContext {
            config,
            root: root.into(),
            bump_type: None,
            commands,
            repo: None,
            state: Mutex::new(state),
            watch_limit: None,
        }
    }

    pub fn with_repository(mut self, repo: Arc<dyn Repository>) -> Self {
        self.repo = Some(repo);
        self
    }

    pub fn with_bump_type(mut self, bump_type: Option<BumpType>) -> Self {
        self.bump_type = bump_type;
        self
    }

    /// Stop watch tasks after this many re-runs
    pub fn with_watch_limit(mut self, runs: usize) -> Self {
        self.watch_limit = Some(runs);
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The requested bump type, or the descriptive error if none was given
    pub fn bump_type(&self) -> Result<BumpType> {
        self.bump_type.ok_or_else(BumpType::invalid)
    }

    pub fn repo(&self) -> Result<&dyn Repository> {
        self.repo.as_deref().ok_or_else(|| {
            ReleaseError::Git(git2::Error::from_str(&format!(
                "Not in a git repository: {}",
                self.root.display()
            )))
        })
    }

    pub fn manifest(&self) -> Result<Manifest> {
        Manifest::open(self.root.join(&self.config.project.manifest))
    }

    /// Current manifest version
    pub fn version(&self) -> Result<Version> {
        self.manifest()?.version()
    }

    pub fn state(&self) -> MutexGuard<'_, ReleaseState> {
        self.state.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// Run an external command on behalf of `task`
    pub fn run_command(&self, task: &str, command_line: &str) -> Result<()> {
        let context = StepContext {
            task: task.to_string(),
            version: self.version().ok().map(|v| v.to_string()),
            bump_type: self.bump_type.map(|b| b.to_string()),
            branch: self.repo.as_ref().and_then(|r| r.current_branch().ok()),
        };
        self.commands.run(command_line, &context)
    }

    pub fn warn(&self, warning: PipelineWarning) {
        tracing::debug!(%warning, "pipeline warning");
        ui::display_warning(&warning);
    }
}

/// Executes tasks from a registry against a context
pub struct TaskRunner<'a> {
    registry: &'a TaskRegistry,
    ctx: &'a TaskContext,
    pool: rayon::ThreadPool,
}

impl<'a> TaskRunner<'a> {
    /// The worker pool is sized so every member of the widest parallel group
    /// gets its own thread.
    pub fn new(registry: &'a TaskRegistry, ctx: &'a TaskContext) -> Result<Self> {
        let threads = registry.max_concurrency();
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("release-worker-{}", i))
            .build()
            .map_err(|e| ReleaseError::Io(std::io::Error::new(std::io::ErrorKind::Other, e)))?;

        tracing::debug!(threads, "task runner ready");
        Ok(TaskRunner {
            registry,
            ctx,
            pool,
        })
    }

    pub fn context(&self) -> &TaskContext {
        self.ctx
    }

    /// Run a task by name
    ///
    /// Any failure is wrapped in [ReleaseError::TaskFailed] naming this task,
    /// so the error records the path from the requested task down to the
    /// failing step.
    pub fn run(&self, name: &str) -> Result<()> {
        let task = self.registry.get(name)?;
        let started = Instant::now();
        ui::display_task_start(name);

        let span = tracing::debug_span!("task", name);
        let _guard = span.enter();

        let result = match &task.kind {
            TaskKind::Action(action) => action(self.ctx),
            TaskKind::Series(members) => self.run_series(members),
            TaskKind::Parallel(members) => self.run_parallel(members),
            TaskKind::Watch { paths, task } => self.run_watch(paths, task),
        };

        let elapsed = started.elapsed();
        match result {
            Ok(()) => {
                ui::display_task_finish(name, elapsed);
                Ok(())
            }
            Err(e) => {
                ui::display_task_failed(name, elapsed);
                Err(ReleaseError::task_failed(name, e))
            }
        }
    }

    fn run_series(&self, members: &[String]) -> Result<()> {
        for member in members {
            self.run(member)?;
        }
        Ok(())
    }

    fn run_parallel(&self, members: &[String]) -> Result<()> {
        let results: Vec<(String, Result<()>)> = self.pool.install(|| {
            members
                .par_iter()
                .with_max_len(1)
                .map(|member| (member.clone(), self.run(member)))
                .collect()
        });

        let failures: Vec<(String, ReleaseError)> = results
            .into_iter()
            .filter_map(|(member, result)| result.err().map(|e| (member, e)))
            .collect();

        if failures.is_empty() {
            Ok(())
        } else {
            Err(ReleaseError::Parallel { failures })
        }
    }

    fn run_watch(&self, paths: &[PathBuf], task: &str) -> Result<()> {
        let options = WatchOptions {
            debounce: Duration::from_millis(self.ctx.config.watch.debounce_ms),
            max_runs: self.ctx.watch_limit,
        };

        watch::watch_paths(self.ctx, paths, &options, || {
            if let Err(e) = self.run(task) {
                // A failed re-run must not end the watch.
                ui::display_error(&e.to_string());
                tracing::debug!(task, error = %e, "watched task failed");
            }
        })
    }
}
