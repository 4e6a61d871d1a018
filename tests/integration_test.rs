// tests/integration_test.rs
use git2::{Repository as Git2Repo, RepositoryInitOptions};
use release_runner::cli::{run_workflow, RunArgs};
use release_runner::config::Config;
use release_runner::domain::BumpType;
use release_runner::git::{Git2Repository, Repository};
use release_runner::process::ShellRunner;
use std::fs;
use std::path::Path;
use std::process::{Command, Output};
use std::sync::Arc;
use tempfile::TempDir;

fn release_runner(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_release-runner"))
        .args(args)
        .current_dir(dir)
        .env("XDG_CONFIG_HOME", dir)
        .env("NO_COLOR", "1")
        .output()
        .expect("Failed to execute command")
}

fn combined(output: &Output) -> String {
    format!(
        "{}{}",
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    )
}

#[test]
fn test_release_runner_help() {
    let dir = TempDir::new().unwrap();
    let output = release_runner(dir.path(), &["--help"]);

    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("release-runner"));
    assert!(stdout.contains("Run build, test and release tasks"));
    assert!(stdout.contains("--type"));
}

#[test]
fn test_invalid_type_is_rejected_by_parser() {
    let dir = TempDir::new().unwrap();
    let output = release_runner(dir.path(), &["release", "--type", "huge"]);

    assert_eq!(output.status.code(), Some(2));
    assert!(combined(&output).contains("major, minor, patch, prerelease"));
}

#[test]
fn test_missing_type_exits_with_failure() {
    let dir = TempDir::new().unwrap();
    let output = release_runner(dir.path(), &["release"]);

    assert_eq!(output.status.code(), Some(1));
    let text = combined(&output);
    assert!(text.contains("--type minor"));
    assert!(!text.contains("Starting"));
}

#[test]
fn test_list_shows_pipeline_tasks() {
    let dir = TempDir::new().unwrap();
    let output = release_runner(dir.path(), &["--list"]);

    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    for task in ["default", "release", "release-cli", "watch", "bump-version"] {
        assert!(stdout.contains(task), "missing {} in:\n{}", task, stdout);
    }
}

#[test]
fn test_dry_run_prints_plan() {
    let dir = TempDir::new().unwrap();
    let output = release_runner(dir.path(), &["release", "--type", "patch", "--dry-run"]);

    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("Execution plan"));
    assert!(stdout.contains("bump-version"));
    assert!(stdout.contains("push-changes"));
}

#[test]
fn test_user_task_runs_in_shell() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("release.toml"),
        "[tasks.hello]\nrun = \"echo hello > out.txt\"\n",
    )
    .unwrap();

    let output = release_runner(dir.path(), &["hello"]);
    assert!(output.status.success(), "{}", combined(&output));
    assert_eq!(
        fs::read_to_string(dir.path().join("out.txt")).unwrap().trim(),
        "hello"
    );
}

#[test]
fn test_failing_command_exits_with_failure() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("release.toml"),
        "[commands]\nlint = \"exit 3\"\n",
    )
    .unwrap();

    let output = release_runner(dir.path(), &["lint"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(combined(&output).contains("exited with code 3"));
}

/// Project with a committed package.json on `master` and a bare `origin`
fn git_project() -> (TempDir, TempDir) {
    let work = TempDir::new().unwrap();
    let remote = TempDir::new().unwrap();
    Git2Repo::init_bare(remote.path()).unwrap();

    let mut options = RepositoryInitOptions::new();
    options.initial_head("master");
    let repo = Git2Repo::init_opts(work.path(), &options).unwrap();
    {
        let mut config = repo.config().unwrap();
        config.set_str("user.name", "Release Bot").unwrap();
        config.set_str("user.email", "release@example.com").unwrap();
    }
    repo.remote("origin", remote.path().to_str().unwrap()).unwrap();

    fs::write(
        work.path().join("package.json"),
        "{\n  \"name\": \"demo\",\n  \"version\": \"1.0.0\"\n}\n",
    )
    .unwrap();
    fs::write(work.path().join(".gitignore"), "dist\nbuild-output\n").unwrap();

    let git = Git2Repository::from_git2(repo);
    git.add_all(&["."], false).unwrap();
    git.commit("chore: initial").unwrap();

    (work, remote)
}

#[test]
fn test_release_cli_end_to_end() {
    let (work, remote) = git_project();
    let config = Config::from_toml(
        r#"
[commands]
compile = "mkdir -p build-output && echo built > build-output/index.js"
compile_dist = "mkdir -p dist && echo bundle > dist/index.js"
lint = "true"
test = "true"
unit_test = "true"
e2e_test = "true"
lint_commits = "true"
changelog = "printf '## %s\n' \"$RELEASE_VERSION\" >> CHANGELOG.md"
"#,
    )
    .unwrap();

    let mut args = RunArgs::new("release-cli", work.path());
    args.bump_type = Some(BumpType::Patch);

    let repo: Arc<dyn Repository> = Arc::new(Git2Repository::open(work.path()).unwrap());
    let commands = Arc::new(ShellRunner::new(work.path()));
    run_workflow(&args, config, commands, Some(repo.clone())).unwrap();

    assert_eq!(repo.current_branch().unwrap(), "master");
    let local = Git2Repo::open(work.path()).unwrap();
    assert!(local
        .find_branch("release-1.0.1", git2::BranchType::Local)
        .is_err());

    let bare = Git2Repo::open_bare(remote.path()).unwrap();

    let master = bare
        .find_reference("refs/heads/master")
        .unwrap()
        .peel_to_commit()
        .unwrap();
    assert_eq!(master.message().unwrap(), "chore: release 1.0.1");
    let master_tree = master.tree().unwrap();
    assert!(master_tree.get_path(Path::new("CHANGELOG.md")).is_ok());
    assert!(master_tree.get_path(Path::new("dist/index.js")).is_err());

    let tag = bare
        .find_reference("refs/tags/1.0.1")
        .unwrap()
        .peel_to_tag()
        .unwrap();
    assert_eq!(
        tag.message().map(str::trim),
        Some("Created Tag for version: 1.0.1")
    );
    let tagged = tag.target().unwrap().peel_to_commit().unwrap();
    assert_eq!(
        tagged.message().unwrap(),
        "chore: add ./dist for release 1.0.1"
    );
    assert!(tagged
        .tree()
        .unwrap()
        .get_path(Path::new("dist/index.js"))
        .is_ok());
}
