use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use release_runner::cli::{self, RunArgs};
use release_runner::config;
use release_runner::domain::BumpType;
use release_runner::git::{Git2Repository, Repository};
use release_runner::process::ShellRunner;
use release_runner::ui;

#[derive(clap::Parser)]
#[command(
    name = "release-runner",
    version,
    about = "Run build, test and release tasks for a project"
)]
struct Args {
    #[arg(default_value = "default", help = "Task to run")]
    task: String,

    #[arg(
        short = 't',
        long = "type",
        value_name = "TYPE",
        value_parser = parse_bump_type,
        help = "Release type for bump-version: major, minor, patch or prerelease"
    )]
    bump_type: Option<BumpType>,

    #[arg(short, long, help = "Custom configuration file path")]
    config: Option<PathBuf>,

    #[arg(long, default_value = ".", help = "Project root directory")]
    cwd: PathBuf,

    #[arg(long, help = "Show available tasks and exit")]
    list: bool,

    #[arg(long, help = "Print the execution plan without running anything")]
    dry_run: bool,

    #[arg(short, long, action = clap::ArgAction::Count, help = "Increase log verbosity (-v, -vv)")]
    verbose: u8,
}

fn parse_bump_type(value: &str) -> std::result::Result<BumpType, String> {
    value.parse().map_err(|e: release_runner::ReleaseError| e.to_string())
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    let (config, source) = match config::load_config(args.config.as_deref(), &args.cwd) {
        Ok(loaded) => loaded,
        Err(e) => {
            ui::display_error(&format!("Error loading config: {}", e));
            std::process::exit(1);
        }
    };
    match &source {
        Some(path) => tracing::debug!(path = %path.display(), "loaded configuration"),
        None => tracing::debug!("no configuration file found, using defaults"),
    }

    if args.list {
        let registry = match cli::build_registry(&config) {
            Ok(registry) => registry,
            Err(e) => {
                ui::display_error(&e.to_string());
                std::process::exit(1);
            }
        };
        ui::display_task_list(&registry.describe());
        return Ok(());
    }

    // Tasks that never touch git still run outside a repository.
    let repo: Option<Arc<dyn Repository>> = match Git2Repository::open(&args.cwd) {
        Ok(repo) => Some(Arc::new(repo)),
        Err(e) => {
            tracing::debug!(error = %e, "no git repository");
            None
        }
    };

    let run_args = RunArgs {
        task: args.task,
        bump_type: args.bump_type,
        root: args.cwd.clone(),
        dry_run: args.dry_run,
    };
    let commands = Arc::new(ShellRunner::new(&args.cwd));

    match cli::run_workflow(&run_args, config, commands, repo) {
        Ok(result) if result.executed => {
            ui::display_success(&format!(
                "'{}' completed in {}",
                result.task,
                ui::format_duration(result.elapsed)
            ));
            Ok(())
        }
        Ok(_) => Ok(()),
        Err(e) => {
            cli::report_failure(&e);
            std::process::exit(1);
        }
    }
}
