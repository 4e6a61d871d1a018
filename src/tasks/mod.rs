//! Task registry and composition
//!
//! A task is an action, a series, a parallel group or a watch loop. Series,
//! parallel groups and watch loops refer to other tasks by name; the registry
//! resolves those names when a task runs.

pub mod builtin;
pub mod runner;

pub use builtin::{register_builtins, register_user_tasks};
pub use runner::{TaskContext, TaskRunner};

use crate::error::{ReleaseError, Result};
use indexmap::IndexMap;
use std::collections::HashSet;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Body of an action task
pub type ActionFn = Arc<dyn Fn(&TaskContext) -> Result<()> + Send + Sync>;

#[derive(Clone)]
pub enum TaskKind {
    /// A single step
    Action(ActionFn),
    /// Named tasks run in order, stopping at the first failure
    Series(Vec<String>),
    /// Named tasks run concurrently; the group fails if any member fails
    Parallel(Vec<String>),
    /// Re-run a named task whenever files under `paths` change
    Watch { paths: Vec<PathBuf>, task: String },
}

#[derive(Clone)]
pub struct Task {
    pub description: String,
    pub kind: TaskKind,
    /// The action reads the `--type` bump argument
    pub needs_bump_type: bool,
}

impl Task {
    pub fn action<F>(description: impl Into<String>, action: F) -> Self
    where
        F: Fn(&TaskContext) -> Result<()> + Send + Sync + 'static,
    {
        Task {
            description: description.into(),
            kind: TaskKind::Action(Arc::new(action)),
            needs_bump_type: false,
        }
    }

    pub fn series<S: Into<String>>(
        description: impl Into<String>,
        members: impl IntoIterator<Item = S>,
    ) -> Self {
        Task {
            description: description.into(),
            kind: TaskKind::Series(members.into_iter().map(Into::into).collect()),
            needs_bump_type: false,
        }
    }

    pub fn parallel<S: Into<String>>(
        description: impl Into<String>,
        members: impl IntoIterator<Item = S>,
    ) -> Self {
        Task {
            description: description.into(),
            kind: TaskKind::Parallel(members.into_iter().map(Into::into).collect()),
            needs_bump_type: false,
        }
    }

    /// Re-run `task` whenever something under `paths` changes
    pub fn watch(
        description: impl Into<String>,
        paths: Vec<PathBuf>,
        task: impl Into<String>,
    ) -> Self {
        Task {
            description: description.into(),
            kind: TaskKind::Watch {
                paths,
                task: task.into(),
            },
            needs_bump_type: false,
        }
    }

    /// Mark the task as consuming the bump type
    pub fn requiring_bump_type(mut self) -> Self {
        self.needs_bump_type = true;
        self
    }

    /// Names this task refers to
    pub fn references(&self) -> Vec<&str> {
        match &self.kind {
            TaskKind::Action(_) => Vec::new(),
            TaskKind::Series(members) | TaskKind::Parallel(members) => {
                members.iter().map(String::as_str).collect()
            }
            TaskKind::Watch { task, .. } => vec![task.as_str()],
        }
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match &self.kind {
            TaskKind::Action(_) => "action".to_string(),
            TaskKind::Series(m) => format!("series{:?}", m),
            TaskKind::Parallel(m) => format!("parallel{:?}", m),
            TaskKind::Watch { paths, task } => format!("watch({:?} -> {})", paths, task),
        };
        f.debug_struct("Task")
            .field("description", &self.description)
            .field("kind", &kind)
            .finish()
    }
}

/// Resolved execution tree of a task, used for `--dry-run`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanNode {
    Action(String),
    Series(String, Vec<PlanNode>),
    Parallel(String, Vec<PlanNode>),
    Watch(String, Box<PlanNode>),
}

impl PlanNode {
    /// One line per node, indented by depth
    pub fn render(&self) -> Vec<String> {
        let mut lines = Vec::new();
        self.render_into(0, &mut lines);
        lines
    }

    fn render_into(&self, depth: usize, lines: &mut Vec<String>) {
        let indent = "  ".repeat(depth);
        match self {
            PlanNode::Action(name) => lines.push(format!("{}{}", indent, name)),
            PlanNode::Series(name, children) => {
                lines.push(format!("{}{} (series)", indent, name));
                for child in children {
                    child.render_into(depth + 1, lines);
                }
            }
            PlanNode::Parallel(name, children) => {
                lines.push(format!("{}{} (parallel)", indent, name));
                for child in children {
                    child.render_into(depth + 1, lines);
                }
            }
            PlanNode::Watch(name, child) => {
                lines.push(format!("{}{} (watch, on change:)", indent, name));
                child.render_into(depth + 1, lines);
            }
        }
    }

    /// Action names in the order a sequential run would reach them
    pub fn actions(&self) -> Vec<&str> {
        match self {
            PlanNode::Action(name) => vec![name.as_str()],
            PlanNode::Series(_, children) | PlanNode::Parallel(_, children) => {
                children.iter().flat_map(|c| c.actions()).collect()
            }
            PlanNode::Watch(_, child) => child.actions(),
        }
    }
}

/// Mapping from task name to task
#[derive(Debug, Clone, Default)]
pub struct TaskRegistry {
    tasks: IndexMap<String, Task>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a task, replacing and returning any task of the same name
    pub fn register(&mut self, name: impl Into<String>, task: Task) -> Option<Task> {
        self.tasks.insert(name.into(), task)
    }

    pub fn get(&self, name: &str) -> Result<&Task> {
        self.tasks
            .get(name)
            .ok_or_else(|| ReleaseError::UnknownTask(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tasks.contains_key(name)
    }

    /// Task names in registration order
    pub fn names(&self) -> Vec<&str> {
        self.tasks.keys().map(String::as_str).collect()
    }

    /// `(name, description)` pairs in registration order
    pub fn describe(&self) -> Vec<(String, String)> {
        self.tasks
            .iter()
            .map(|(name, task)| (name.clone(), task.description.clone()))
            .collect()
    }

    /// Check that every referenced task exists and no task refers back to itself
    pub fn validate(&self) -> Result<()> {
        for (name, task) in &self.tasks {
            for reference in task.references() {
                if !self.contains(reference) {
                    return Err(ReleaseError::config(format!(
                        "Task '{}' refers to unknown task '{}'",
                        name, reference
                    )));
                }
            }
        }

        let mut done = HashSet::new();
        for name in self.tasks.keys() {
            let mut stack = Vec::new();
            self.check_cycles(name, &mut stack, &mut done)?;
        }
        Ok(())
    }

    fn check_cycles<'a>(
        &'a self,
        name: &'a str,
        stack: &mut Vec<&'a str>,
        done: &mut HashSet<&'a str>,
    ) -> Result<()> {
        if let Some(pos) = stack.iter().position(|n| *n == name) {
            let mut cycle: Vec<&str> = stack[pos..].to_vec();
            cycle.push(name);
            return Err(ReleaseError::TaskCycle(cycle.join(" -> ")));
        }
        if done.contains(name) {
            return Ok(());
        }

        stack.push(name);
        for reference in self.get(name)?.references() {
            self.check_cycles(reference, stack, done)?;
        }
        stack.pop();
        done.insert(name);
        Ok(())
    }

    /// Whether running `name` reaches a task that consumes the bump type
    pub fn requires_bump_type(&self, name: &str) -> Result<bool> {
        let mut seen = HashSet::new();
        self.requires_bump_type_inner(name, &mut seen)
    }

    fn requires_bump_type_inner<'a>(
        &'a self,
        name: &'a str,
        seen: &mut HashSet<&'a str>,
    ) -> Result<bool> {
        if !seen.insert(name) {
            return Ok(false);
        }
        let task = self.get(name)?;
        if task.needs_bump_type {
            return Ok(true);
        }
        for reference in task.references() {
            if self.requires_bump_type_inner(reference, seen)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Resolve the execution tree below `name`
    pub fn plan(&self, name: &str) -> Result<PlanNode> {
        let mut stack = Vec::new();
        self.plan_inner(name, &mut stack)
    }

    fn plan_inner<'a>(&'a self, name: &'a str, stack: &mut Vec<&'a str>) -> Result<PlanNode> {
        if stack.contains(&name) {
            let mut cycle = stack.clone();
            cycle.push(name);
            return Err(ReleaseError::TaskCycle(cycle.join(" -> ")));
        }
        stack.push(name);

        let node = match &self.get(name)?.kind {
            TaskKind::Action(_) => PlanNode::Action(name.to_string()),
            TaskKind::Series(members) => PlanNode::Series(
                name.to_string(),
                members
                    .iter()
                    .map(|m| self.plan_inner(m, stack))
                    .collect::<Result<_>>()?,
            ),
            TaskKind::Parallel(members) => PlanNode::Parallel(
                name.to_string(),
                members
                    .iter()
                    .map(|m| self.plan_inner(m, stack))
                    .collect::<Result<_>>()?,
            ),
            TaskKind::Watch { task, .. } => {
                PlanNode::Watch(name.to_string(), Box::new(self.plan_inner(task, stack)?))
            }
        };

        stack.pop();
        Ok(node)
    }

    /// Most actions that can run at the same time anywhere in the registry
    pub fn max_concurrency(&self) -> usize {
        self.tasks
            .keys()
            .filter_map(|name| self.plan(name).ok())
            .map(|plan| concurrency(&plan))
            .max()
            .unwrap_or(1)
            .max(1)
    }
}

fn concurrency(node: &PlanNode) -> usize {
    match node {
        PlanNode::Action(_) => 1,
        PlanNode::Series(_, children) => children.iter().map(concurrency).max().unwrap_or(1),
        PlanNode::Parallel(_, children) => children.iter().map(concurrency).sum::<usize>().max(1),
        PlanNode::Watch(_, child) => concurrency(child),
    }
}
