//! File watching for the `watch` and `watch-e2e` tasks.

use crate::error::{ReleaseError, Result};
use crate::tasks::TaskContext;
use crate::ui;
use crate::warning::PipelineWarning;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::PathBuf;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchOptions {
    /// Quiet period after the last change before re-running
    pub debounce: Duration,
    /// Return after this many re-runs; `None` watches until the process exits
    pub max_runs: Option<usize>,
}

impl Default for WatchOptions {
    fn default() -> Self {
        WatchOptions {
            debounce: Duration::from_millis(300),
            max_runs: None,
        }
    }
}

/// Only content changes trigger a re-run; reads and metadata-only access do not.
pub fn is_relevant(event: &Event) -> bool {
    matches!(
        event.kind,
        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
    )
}

/// Watch `paths` (relative to the project root) and call `on_change` after
/// each debounced burst of changes.
///
/// Missing paths are reported and skipped. If none of the paths exist the
/// watch fails before it starts.
pub fn watch_paths<F>(
    ctx: &TaskContext,
    paths: &[PathBuf],
    options: &WatchOptions,
    mut on_change: F,
) -> Result<()>
where
    F: FnMut(),
{
    let (tx, rx) = mpsc::channel();
    let mut watcher = RecommendedWatcher::new(
        move |res: notify::Result<Event>| {
            // The receiver is gone once the watch loop returns.
            let _ = tx.send(res);
        },
        notify::Config::default(),
    )?;

    let mut watched = Vec::new();
    for path in paths {
        let full = ctx.root().join(path);
        if !full.exists() {
            ctx.warn(PipelineWarning::WatchPathMissing { path: path.clone() });
            continue;
        }
        watcher.watch(&full, RecursiveMode::Recursive)?;
        watched.push(path.display().to_string());
    }

    if watched.is_empty() {
        return Err(ReleaseError::config("None of the watch paths exist"));
    }

    ui::display_status(&format!("Watching {} for changes", watched.join(", ")));

    let mut runs = 0;
    loop {
        if options.max_runs.map_or(false, |max| runs >= max) {
            return Ok(());
        }

        match rx.recv() {
            Ok(Ok(event)) if is_relevant(&event) => {
                tracing::debug!(paths = ?event.paths, "change detected");
            }
            Ok(Ok(_)) => continue,
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "watcher error");
                continue;
            }
            Err(_) => return Ok(()),
        }

        // Let a burst of saves settle before re-running.
        loop {
            match rx.recv_timeout(options.debounce) {
                Ok(_) => continue,
                Err(RecvTimeoutError::Timeout) => break,
                Err(RecvTimeoutError::Disconnected) => return Ok(()),
            }
        }

        on_change();
        runs += 1;
    }
}
