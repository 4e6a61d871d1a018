use crate::error::{ReleaseError, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// File name looked up in the project root
pub const CONFIG_FILE_NAME: &str = "release.toml";

/// Represents the complete configuration for release-runner.
///
/// Contains project layout, git conventions, external tool command lines,
/// clean targets, watch settings and user-defined tasks.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
pub struct Config {
    #[serde(default)]
    pub project: ProjectConfig,

    #[serde(default)]
    pub git: GitConfig,

    #[serde(default)]
    pub commands: CommandsConfig,

    #[serde(default)]
    pub clean: CleanConfig,

    #[serde(default)]
    pub watch: WatchConfig,

    #[serde(default)]
    pub tasks: IndexMap<String, TaskConfig>,
}

/// Paths of the files and directories the pipeline works on.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ProjectConfig {
    #[serde(default = "default_manifest")]
    pub manifest: PathBuf,

    #[serde(default = "default_dist_dir")]
    pub dist_dir: PathBuf,
}

fn default_manifest() -> PathBuf {
    PathBuf::from("package.json")
}

fn default_dist_dir() -> PathBuf {
    PathBuf::from("dist")
}

fn default_build_dir() -> PathBuf {
    PathBuf::from("build-output")
}

impl Default for ProjectConfig {
    fn default() -> Self {
        ProjectConfig {
            manifest: default_manifest(),
            dist_dir: default_dist_dir(),
        }
    }
}

/// Git conventions used by the commit, branch, tag and push tasks.
///
/// Message templates substitute `{version}` with the manifest version.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct GitConfig {
    #[serde(default = "default_remote")]
    pub remote: String,

    #[serde(default = "default_branch")]
    pub push_branch: String,

    #[serde(default = "default_branch")]
    pub default_start_branch: String,

    #[serde(default = "default_release_branch_prefix")]
    pub release_branch_prefix: String,

    #[serde(default = "default_commit_message")]
    pub commit_message: String,

    #[serde(default = "default_dist_commit_message")]
    pub dist_commit_message: String,

    #[serde(default = "default_tag_message")]
    pub tag_message: String,

    #[serde(default)]
    pub tag_prefix: String,
}

fn default_remote() -> String {
    "origin".to_string()
}

fn default_branch() -> String {
    "master".to_string()
}

fn default_release_branch_prefix() -> String {
    "release-".to_string()
}

fn default_commit_message() -> String {
    "chore: release {version}".to_string()
}

fn default_dist_commit_message() -> String {
    "chore: add ./dist for release {version}".to_string()
}

fn default_tag_message() -> String {
    "Created Tag for version: {version}".to_string()
}

impl Default for GitConfig {
    fn default() -> Self {
        GitConfig {
            remote: default_remote(),
            push_branch: default_branch(),
            default_start_branch: default_branch(),
            release_branch_prefix: default_release_branch_prefix(),
            commit_message: default_commit_message(),
            dist_commit_message: default_dist_commit_message(),
            tag_message: default_tag_message(),
            tag_prefix: String::new(),
        }
    }
}

impl GitConfig {
    /// Substitute `{version}` in one of the message templates
    pub fn render(template: &str, version: &str) -> String {
        template.replace("{version}", version)
    }
}

/// Shell command lines for the external tools.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct CommandsConfig {
    #[serde(default = "default_compile")]
    pub compile: String,

    #[serde(default = "default_compile_dist")]
    pub compile_dist: String,

    #[serde(default = "default_lint")]
    pub lint: String,

    #[serde(default = "default_test")]
    pub test: String,

    #[serde(default = "default_unit_test")]
    pub unit_test: String,

    #[serde(default = "default_e2e_test")]
    pub e2e_test: String,

    #[serde(default = "default_lint_commits")]
    pub lint_commits: String,

    #[serde(default = "default_changelog_command")]
    pub changelog: String,
}

fn default_compile() -> String {
    "./node_modules/.bin/tsc -p tsconfig.json --outDir build-output".to_string()
}

fn default_compile_dist() -> String {
    "./node_modules/.bin/tsc -p tsconfig.json --outDir dist --rootDir lib".to_string()
}

fn default_lint() -> String {
    "./node_modules/.bin/tslint -p tsconfig.json".to_string()
}

fn default_test() -> String {
    "./node_modules/.bin/jasmine 'build-output/test/e2e/**/*.spec.js' 'build-output/test/unit/**/*.spec.js'"
        .to_string()
}

fn default_unit_test() -> String {
    "./node_modules/.bin/jasmine 'build-output/test/unit/**/*.spec.js'".to_string()
}

fn default_e2e_test() -> String {
    "./node_modules/.bin/jasmine 'build-output/test/e2e/**/*.spec.js'".to_string()
}

fn default_lint_commits() -> String {
    "./node_modules/.bin/commitlint --from=99ff46d67 --preset angular".to_string()
}

fn default_changelog_command() -> String {
    "./node_modules/.bin/conventional-changelog -p angular -i CHANGELOG.md -s -r 0".to_string()
}

impl Default for CommandsConfig {
    fn default() -> Self {
        CommandsConfig {
            compile: default_compile(),
            compile_dist: default_compile_dist(),
            lint: default_lint(),
            test: default_test(),
            unit_test: default_unit_test(),
            e2e_test: default_e2e_test(),
            lint_commits: default_lint_commits(),
            changelog: default_changelog_command(),
        }
    }
}

/// A directory to clean, optionally restricted to one file extension.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct CleanTarget {
    pub dir: PathBuf,

    #[serde(default)]
    pub extension: Option<String>,
}

/// Clean targets for the build and dist outputs.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct CleanConfig {
    #[serde(default = "default_clean_build")]
    pub build: Vec<CleanTarget>,

    #[serde(default = "default_clean_dist")]
    pub dist: Vec<CleanTarget>,
}

fn default_clean_build() -> Vec<CleanTarget> {
    vec![CleanTarget {
        dir: default_build_dir(),
        extension: Some("js".to_string()),
    }]
}

fn default_clean_dist() -> Vec<CleanTarget> {
    vec![CleanTarget {
        dir: default_dist_dir(),
        extension: None,
    }]
}

impl Default for CleanConfig {
    fn default() -> Self {
        CleanConfig {
            build: default_clean_build(),
            dist: default_clean_dist(),
        }
    }
}

/// Settings for the `watch` and `watch-e2e` tasks.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct WatchConfig {
    #[serde(default = "default_watch_paths")]
    pub paths: Vec<PathBuf>,

    #[serde(default = "default_watch_task")]
    pub task: String,

    #[serde(default = "default_e2e_watch_paths")]
    pub e2e_paths: Vec<PathBuf>,

    #[serde(default = "default_e2e_watch_task")]
    pub e2e_task: String,

    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
}

fn default_watch_paths() -> Vec<PathBuf> {
    vec![PathBuf::from("lib"), PathBuf::from("test")]
}

fn default_watch_task() -> String {
    "compile-and-unit-test".to_string()
}

fn default_e2e_watch_paths() -> Vec<PathBuf> {
    vec![
        PathBuf::from("build-output/lib"),
        PathBuf::from("build-output/test/e2e"),
    ]
}

fn default_e2e_watch_task() -> String {
    "e2e-test".to_string()
}

fn default_debounce_ms() -> u64 {
    300
}

impl Default for WatchConfig {
    fn default() -> Self {
        WatchConfig {
            paths: default_watch_paths(),
            task: default_watch_task(),
            e2e_paths: default_e2e_watch_paths(),
            e2e_task: default_e2e_watch_task(),
            debounce_ms: default_debounce_ms(),
        }
    }
}

/// A user-defined task. Exactly one of `run`, `series` or `parallel` is set.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
pub struct TaskConfig {
    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub run: Option<String>,

    #[serde(default)]
    pub series: Option<Vec<String>>,

    #[serde(default)]
    pub parallel: Option<Vec<String>>,
}

impl Config {
    /// Parse configuration from TOML text and check user task definitions
    pub fn from_toml(text: &str) -> Result<Self> {
        let config: Config = toml::from_str(text)
            .map_err(|e| ReleaseError::config(format!("Invalid configuration: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        for (name, task) in &self.tasks {
            let kinds = [
                task.run.is_some(),
                task.series.is_some(),
                task.parallel.is_some(),
            ];
            let set = kinds.iter().filter(|k| **k).count();
            if set != 1 {
                return Err(ReleaseError::config(format!(
                    "Task '{}' must define exactly one of `run`, `series` or `parallel`",
                    name
                )));
            }
        }
        Ok(())
    }
}

/// Loads configuration from file or returns defaults.
///
/// Attempts to load configuration in the following order:
/// 1. Custom path provided as parameter
/// 2. `release.toml` in the project root
/// 3. `.release.toml` in the user config directory
/// 4. Default configuration if no file found
///
/// # Returns
/// * `Ok((Config, Option<PathBuf>))` - Configuration and the file it came from
/// * `Err` - If a file exists but cannot be read or parsed
pub fn load_config(config_path: Option<&Path>, root: &Path) -> Result<(Config, Option<PathBuf>)> {
    let path = if let Some(path) = config_path {
        Some(path.to_path_buf())
    } else if root.join(CONFIG_FILE_NAME).exists() {
        Some(root.join(CONFIG_FILE_NAME))
    } else {
        dirs::config_dir()
            .map(|dir| dir.join(format!(".{}", CONFIG_FILE_NAME)))
            .filter(|p| p.exists())
    };

    match path {
        Some(path) => {
            let text = fs::read_to_string(&path).map_err(|e| {
                ReleaseError::config(format!("Cannot read {}: {}", path.display(), e))
            })?;
            let config = Config::from_toml(&text)?;
            Ok((config, Some(path)))
        }
        None => Ok((Config::default(), None)),
    }
}
