//! The canonical build and release pipeline.
//!
//! Task names and composition follow the build scripts this tool replaces:
//! `default` compiles, lints and tests; `release` adds dist, version bump,
//! changelog, commit, tag and push; `release-cli` also stages `dist` on a
//! throwaway release branch so it is only present in the tagged commit.

use crate::clean;
use crate::config::{CommandsConfig, Config, GitConfig};
use crate::domain::{bump, release_branch_name};
use crate::error::Result;
use crate::tasks::{Task, TaskContext, TaskRegistry};
use crate::ui;
use crate::warning::PipelineWarning;

/// Task that runs one of the configured external tools
fn command_task(
    name: &'static str,
    description: &str,
    select: fn(&CommandsConfig) -> &str,
) -> Task {
    Task::action(description, move |ctx: &TaskContext| {
        ctx.run_command(name, select(&ctx.config.commands))
    })
}

fn clean_build_output(ctx: &TaskContext) -> Result<()> {
    let removed = clean::clean_all(ctx.root(), &ctx.config.clean.build)?;
    tracing::info!(removed, "build output cleaned");
    Ok(())
}

fn clean_dist(ctx: &TaskContext) -> Result<()> {
    let removed = clean::clean_all(ctx.root(), &ctx.config.clean.dist)?;
    tracing::info!(removed, "dist cleaned");
    Ok(())
}

fn bump_version(ctx: &TaskContext) -> Result<()> {
    let bump_type = ctx.bump_type()?;
    let manifest = ctx.manifest()?;
    let current = manifest.version()?;
    let next = bump(&current, bump_type)?;

    manifest.set_version(&next)?;
    ui::display_success(&format!(
        "Bumped {} version {} -> {} ({})",
        manifest.path().display(),
        current,
        next,
        bump_type
    ));
    Ok(())
}

/// Stage `paths` and commit with a message rendered from `template`
fn stage_and_commit(
    ctx: &TaskContext,
    task: &str,
    paths: &[&str],
    force: bool,
    template: &str,
) -> Result<()> {
    let version = ctx.version()?.to_string();
    let repo = ctx.repo()?;
    let message = GitConfig::render(template, &version);

    repo.add_all(paths, force)?;
    match repo.commit(&message)? {
        Some(oid) => {
            let short = oid.to_string();
            ui::display_success(&format!("Committed {} \"{}\"", &short[..7], message));
        }
        None => ctx.warn(PipelineWarning::NothingToCommit {
            task: task.to_string(),
            message,
        }),
    }
    Ok(())
}

fn commit_changes(ctx: &TaskContext) -> Result<()> {
    stage_and_commit(ctx, "commit-changes", &["."], false, &ctx.config.git.commit_message)
}

fn force_commit_dist(ctx: &TaskContext) -> Result<()> {
    let dist = ctx.config.project.dist_dir.to_string_lossy().into_owned();
    stage_and_commit(
        ctx,
        "force-commit-dist",
        &[dist.as_str()],
        true,
        &ctx.config.git.dist_commit_message,
    )
}

fn switch_to_release_branch(ctx: &TaskContext) -> Result<()> {
    let repo = ctx.repo()?;
    let mut starting = repo.current_branch()?;
    if starting == "HEAD" {
        starting = ctx.config.git.default_start_branch.clone();
        ctx.warn(PipelineWarning::DetachedHead {
            fallback_branch: starting.clone(),
        });
    }

    let release = release_branch_name(&ctx.config.git.release_branch_prefix, &ctx.version()?);
    repo.create_and_checkout_branch(&release)?;
    let mut state = ctx.state();
    state.enter_release(starting.as_str(), release.as_str());
    if !state.starting_branch.is_main {
        tracing::info!(branch = %starting, "releasing from a branch other than main/master");
    }
    drop(state);

    ui::display_status(&format!("Switched from '{}' to '{}'", starting, release));
    Ok(())
}

fn switch_to_start_branch(ctx: &TaskContext) -> Result<()> {
    let repo = ctx.repo()?;
    let (starting, release) = {
        let state = ctx.state();
        (state.starting_branch.name.clone(), state.release_branch.clone())
    };

    repo.checkout_branch(&starting)?;

    match release {
        Some(release) => {
            repo.delete_branch(&release)?;
            ctx.state().leave_release();
            ui::display_status(&format!(
                "Back on '{}', deleted '{}'",
                starting, release
            ));
        }
        None => ctx.warn(PipelineWarning::NoReleaseBranch {
            starting_branch: starting,
        }),
    }
    Ok(())
}

fn create_new_tag(ctx: &TaskContext) -> Result<()> {
    let version = ctx.version()?.to_string();
    let git = &ctx.config.git;
    let name = format!("{}{}", git.tag_prefix, version);
    let message = GitConfig::render(&git.tag_message, &version);

    ctx.repo()?.create_annotated_tag(&name, &message)?;
    ui::display_success(&format!("Created tag {}", name));
    Ok(())
}

fn push_changes(ctx: &TaskContext) -> Result<()> {
    let git = &ctx.config.git;
    ctx.repo()?.push(&git.remote, &git.push_branch, true)?;
    ui::display_success(&format!(
        "Pushed {} and tags to {}",
        git.push_branch, git.remote
    ));
    Ok(())
}

/// Register the canonical pipeline
pub fn register_builtins(registry: &mut TaskRegistry, config: &Config) {
    registry.register(
        "clean-build-output",
        Task::action("Delete compiled build output", clean_build_output),
    );
    registry.register(
        "compile-build-output",
        command_task("compile-build-output", "Compile sources and tests", |c| c.compile.as_str()),
    );
    registry.register(
        "clean-and-compile-build-output",
        Task::series(
            "Clean, then compile build output",
            ["clean-build-output", "compile-build-output"],
        ),
    );
    registry.register(
        "clean-dist",
        Task::action("Delete the distributable output", clean_dist),
    );
    registry.register(
        "compile-dist",
        command_task("compile-dist", "Compile the distributable", |c| c.compile_dist.as_str()),
    );
    registry.register(
        "clean-and-compile-dist",
        Task::series("Clean, then compile dist", ["clean-dist", "compile-dist"]),
    );
    registry.register(
        "lint-commits",
        command_task("lint-commits", "Check commit messages", |c| c.lint_commits.as_str()),
    );
    registry.register("lint", command_task("lint", "Lint sources", |c| c.lint.as_str()));
    registry.register(
        "lint-typescript",
        Task::series("Alias of 'lint'", ["lint"]),
    );
    registry.register(
        "test",
        command_task("test", "Run unit and end-to-end tests", |c| c.test.as_str()),
    );
    registry.register(
        "unit-test",
        command_task("unit-test", "Run unit tests", |c| c.unit_test.as_str()),
    );
    registry.register(
        "e2e-test",
        command_task("e2e-test", "Run end-to-end tests", |c| c.e2e_test.as_str()),
    );
    registry.register(
        "compile-and-unit-test",
        Task::series(
            "Compile, then run unit tests",
            ["compile-build-output", "unit-test"],
        ),
    );
    registry.register(
        "bump-version",
        Task::action("Bump the manifest version by --type", bump_version).requiring_bump_type(),
    );
    registry.register(
        "changelog",
        command_task("changelog", "Update the changelog", |c| c.changelog.as_str()),
    );
    registry.register(
        "commit-changes",
        Task::action("Stage everything and commit the release", commit_changes),
    );
    registry.register(
        "switch-to-release-branch",
        Task::action(
            "Create and check out the release branch",
            switch_to_release_branch,
        ),
    );
    registry.register(
        "force-commit-dist",
        Task::action("Commit dist even though it is ignored", force_commit_dist),
    );
    registry.register(
        "switch-to-start-branch",
        Task::action(
            "Return to the starting branch and delete the release branch",
            switch_to_start_branch,
        ),
    );
    registry.register(
        "create-new-tag",
        Task::action("Tag HEAD with the manifest version", create_new_tag),
    );
    registry.register(
        "push-changes",
        Task::action("Push the branch and tags", push_changes),
    );
    registry.register(
        "watch-sources",
        Task::watch(
            "Re-run the watch task when sources change",
            config.watch.paths.clone(),
            config.watch.task.clone(),
        ),
    );
    registry.register(
        "watch",
        Task::series(
            "Compile, then recompile and unit test on change",
            ["clean-and-compile-build-output", "watch-sources"],
        ),
    );
    registry.register(
        "watch-e2e",
        Task::watch(
            "Re-run end-to-end tests when build output changes",
            config.watch.e2e_paths.clone(),
            config.watch.e2e_task.clone(),
        ),
    );
    registry.register(
        "build-and-lint-commits",
        Task::parallel(
            "Compile build output while checking commits",
            ["clean-and-compile-build-output", "lint-commits"],
        ),
    );
    registry.register(
        "lint-and-test",
        Task::parallel("Lint and test concurrently", ["lint", "test"]),
    );
    registry.register(
        "default",
        Task::series(
            "Compile, check commits, lint and test",
            ["build-and-lint-commits", "lint-and-test"],
        ),
    );
    registry.register(
        "release",
        Task::series(
            "Verify, bump, changelog, commit, tag and push",
            [
                "default",
                "clean-and-compile-dist",
                "bump-version",
                "changelog",
                "commit-changes",
                "create-new-tag",
                "push-changes",
            ],
        ),
    );
    registry.register(
        "release-cli",
        Task::series(
            "Release with dist committed on a temporary release branch",
            [
                "default",
                "clean-and-compile-dist",
                "bump-version",
                "changelog",
                "commit-changes",
                "switch-to-release-branch",
                "force-commit-dist",
                "create-new-tag",
                "push-changes",
                "switch-to-start-branch",
            ],
        ),
    );
}

/// Register tasks defined under `[tasks]`, after the built-ins so they can
/// override them
pub fn register_user_tasks(registry: &mut TaskRegistry, config: &Config) {
    for (name, entry) in &config.tasks {
        let description = entry
            .description
            .clone()
            .unwrap_or_else(|| format!("User task '{}'", name));

        let task = if let Some(command) = &entry.run {
            let task_name = name.clone();
            let command = command.clone();
            Task::action(description, move |ctx: &TaskContext| {
                ctx.run_command(&task_name, &command)
            })
        } else if let Some(members) = &entry.series {
            Task::series(description, members.iter().cloned())
        } else if let Some(members) = &entry.parallel {
            Task::parallel(description, members.iter().cloned())
        } else {
            continue;
        };

        if registry.register(name.clone(), task).is_some() {
            tracing::debug!(task = %name, "user task overrides built-in");
        }
    }
}
