use release_runner::cli::orchestration::{build_registry, preflight, run_workflow, RunArgs};
use release_runner::config::Config;
use release_runner::domain::BumpType;
use release_runner::git::{GitCall, MockRepository, Repository};
use release_runner::process::RecordingRunner;
use release_runner::ReleaseError;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

fn project(version: &str) -> TempDir {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("package.json"),
        format!(
            "{{\n  \"name\": \"demo\",\n  \"version\": \"{}\",\n  \"dependencies\": {{\n    \"left-pad\": \"1.0.0\"\n  }}\n}}\n",
            version
        ),
    )
    .unwrap();
    dir
}

fn args(task: &str, root: &Path) -> RunArgs {
    RunArgs::new(task, root)
}

fn manifest_version(root: &Path) -> String {
    let text = fs::read_to_string(root.join("package.json")).unwrap();
    let value: serde_json::Value = serde_json::from_str(&text).unwrap();
    value["version"].as_str().unwrap().to_string()
}

#[test]
fn test_missing_bump_type_fails_before_any_command() {
    let dir = project("1.2.3");
    let runner = Arc::new(RecordingRunner::new());
    let repo = Arc::new(MockRepository::default());

    let err = run_workflow(
        &args("release", dir.path()),
        Config::default(),
        runner.clone(),
        Some(repo.clone() as Arc<dyn Repository>),
    )
    .unwrap_err();

    assert!(matches!(err, ReleaseError::BumpType(_)));
    assert!(err.to_string().contains("--type minor"));
    assert!(runner.invocations().is_empty());
    assert!(repo.calls().is_empty());
    assert_eq!(manifest_version(dir.path()), "1.2.3");
}

#[test]
fn test_invalid_bump_type_is_rejected_when_parsed() {
    let err = "huge".parse::<BumpType>().unwrap_err();
    assert!(err.to_string().contains("major, minor, patch, prerelease"));
}

#[test]
fn test_unknown_task_fails_preflight() {
    let registry = build_registry(&Config::default()).unwrap();
    let err = preflight(&registry, "deploy", None).unwrap_err();
    assert!(matches!(err, ReleaseError::UnknownTask(ref name) if name == "deploy"));

    preflight(&registry, "default", None).unwrap();
    preflight(&registry, "release", Some(BumpType::Patch)).unwrap();
}

#[test]
fn test_dry_run_executes_nothing() {
    let dir = project("1.2.3");
    let runner = Arc::new(RecordingRunner::new());

    let mut run_args = args("release", dir.path());
    run_args.bump_type = Some(BumpType::Major);
    run_args.dry_run = true;

    let result = run_workflow(&run_args, Config::default(), runner.clone(), None).unwrap();
    assert!(!result.executed);
    assert!(runner.invocations().is_empty());
    assert_eq!(manifest_version(dir.path()), "1.2.3");
}

#[test]
fn test_default_runs_commands_in_order() {
    let dir = project("1.0.0");
    let runner = Arc::new(RecordingRunner::new());

    let result = run_workflow(&args("default", dir.path()), Config::default(), runner.clone(), None)
        .unwrap();
    assert!(result.executed);

    let tasks = runner.tasks();
    assert_eq!(tasks.len(), 4);
    let pos = |name: &str| tasks.iter().position(|t| t == name).unwrap();
    // The second parallel group starts only after the first one finished.
    assert!(pos("compile-build-output") < pos("lint"));
    assert!(pos("lint-commits") < pos("lint"));
    assert!(pos("compile-build-output") < pos("test"));
    assert!(pos("lint-commits") < pos("test"));
}

#[test]
fn test_series_stops_after_failure() {
    let dir = project("1.0.0");
    let runner = Arc::new(RecordingRunner::new().fail_task("compile-build-output"));

    let err = run_workflow(&args("default", dir.path()), Config::default(), runner.clone(), None)
        .unwrap_err();

    assert_eq!(err.task_trail(), vec!["default", "build-and-lint-commits"]);
    let tasks = runner.tasks();
    assert!(tasks.contains(&"lint-commits".to_string()));
    assert!(!tasks.contains(&"lint".to_string()));
    assert!(!tasks.contains(&"test".to_string()));
}

#[test]
fn test_parallel_runs_every_member_despite_failure() {
    let dir = project("1.0.0");
    let runner = Arc::new(RecordingRunner::new().fail_task("lint").fail_task("test"));

    let err = run_workflow(
        &args("lint-and-test", dir.path()),
        Config::default(),
        runner.clone(),
        None,
    )
    .unwrap_err();

    let mut tasks = runner.tasks();
    tasks.sort();
    assert_eq!(tasks, vec!["lint", "test"]);

    match err.root_cause() {
        ReleaseError::Parallel { failures } => {
            let mut names: Vec<&str> = failures.iter().map(|(name, _)| name.as_str()).collect();
            names.sort();
            assert_eq!(names, vec!["lint", "test"]);
        }
        other => panic!("expected a parallel failure, got {:?}", other),
    }
}

#[test]
fn test_parallel_members_overlap() {
    let dir = project("1.0.0");
    let delay = Duration::from_millis(300);
    let runner = Arc::new(RecordingRunner::new().with_delay(delay));

    let result = run_workflow(
        &args("lint-and-test", dir.path()),
        Config::default(),
        runner.clone(),
        None,
    )
    .unwrap();

    assert_eq!(runner.tasks().len(), 2);
    assert!(result.elapsed < delay * 2);
}

#[test]
fn test_release_cli_git_sequence() {
    let dir = project("1.2.3");
    let runner = Arc::new(RecordingRunner::new());
    let repo = Arc::new(MockRepository::new("develop"));

    let mut run_args = args("release-cli", dir.path());
    run_args.bump_type = Some(BumpType::Minor);

    let git: Arc<dyn Repository> = repo.clone();
    run_workflow(&run_args, Config::default(), runner.clone(), Some(git)).unwrap();

    assert_eq!(manifest_version(dir.path()), "1.3.0");
    assert!(runner.tasks().contains(&"changelog".to_string()));

    let calls: Vec<GitCall> = repo
        .calls()
        .into_iter()
        .filter(|c| *c != GitCall::CurrentBranch)
        .collect();
    assert_eq!(
        calls,
        vec![
            GitCall::Add {
                paths: vec![".".to_string()],
                force: false,
            },
            GitCall::Commit("chore: release 1.3.0".to_string()),
            GitCall::CreateAndCheckout("release-1.3.0".to_string()),
            GitCall::Add {
                paths: vec!["dist".to_string()],
                force: true,
            },
            GitCall::Commit("chore: add ./dist for release 1.3.0".to_string()),
            GitCall::Tag {
                name: "1.3.0".to_string(),
                message: "Created Tag for version: 1.3.0".to_string(),
            },
            GitCall::Push {
                remote: "origin".to_string(),
                branch: "master".to_string(),
                with_tags: true,
            },
            GitCall::Checkout("develop".to_string()),
            GitCall::DeleteBranch("release-1.3.0".to_string()),
        ]
    );
    assert_eq!(repo.head(), "develop");
    assert_eq!(repo.branches(), vec!["develop"]);
    assert_eq!(repo.tags(), vec!["1.3.0"]);
}

#[test]
fn test_push_failure_names_the_step() {
    let dir = project("0.9.0");
    let runner = Arc::new(RecordingRunner::new());
    let repo = Arc::new(MockRepository::default().with_failing_push());

    let mut run_args = args("release", dir.path());
    run_args.bump_type = Some(BumpType::Prerelease);

    let git: Arc<dyn Repository> = repo.clone();
    let err = run_workflow(&run_args, Config::default(), runner, Some(git)).unwrap_err();

    assert_eq!(err.task_trail(), vec!["release", "push-changes"]);
    assert!(matches!(err.root_cause(), ReleaseError::Git(_)));
    assert_eq!(manifest_version(dir.path()), "0.9.1-0");
    assert_eq!(repo.tags(), vec!["0.9.1-0"]);
}

#[test]
fn test_git_tasks_need_a_repository() {
    let dir = project("1.0.0");
    let runner = Arc::new(RecordingRunner::new());

    let err = run_workflow(
        &args("create-new-tag", dir.path()),
        Config::default(),
        runner,
        None,
    )
    .unwrap_err();
    assert!(err.to_string().contains("create-new-tag"));
    assert!(err.root_cause().to_string().contains("Not in a git repository"));
}

#[test]
fn test_user_task_runs_through_shell_runner() {
    let dir = project("1.0.0");
    let runner = Arc::new(RecordingRunner::new());
    let config = Config::from_toml(
        r#"
[tasks.docs]
run = "typedoc lib"

[tasks.ci]
series = ["lint", "docs"]
"#,
    )
    .unwrap();

    run_workflow(&args("ci", dir.path()), config, runner.clone(), None).unwrap();

    let invocations = runner.invocations();
    assert_eq!(invocations.len(), 2);
    assert_eq!(invocations[1].task, "docs");
    assert_eq!(invocations[1].command, "typedoc lib");
}

#[test]
fn test_mock_is_usable_as_trait_object() {
    let repo: Arc<dyn Repository> = Arc::new(MockRepository::default());
    assert_eq!(repo.current_branch().unwrap(), "master");
}
