//! etcha: apply idempotent command lists.

mod cmd;
mod output;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use cmd::Settings;
use etcha_lib::commands::Mode;

/// etcha - converge a system with check/change/remove scripts
#[derive(Parser)]
#[command(name = "etcha")]
#[command(author, version, about, long_about = None)]
struct Cli {
  /// Enable verbose output
  #[arg(short, long, global = true)]
  verbose: bool,

  /// Engine config file (JSON)
  #[arg(short, long, global = true)]
  config: Option<PathBuf>,

  /// Extra environment variable for every script
  #[arg(short, long = "env", global = true, value_name = "KEY=VALUE")]
  env: Vec<String>,

  /// Print results as JSON
  #[arg(long, global = true)]
  json: bool,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Check every command and change the ones that fail their check
  Run {
    /// Command list (JSON)
    file: PathBuf,

    /// Previously applied command list; removed commands are torn down and
    /// unchanged ones are not re-checked
    #[arg(long)]
    old: Option<PathBuf>,
  },

  /// Run check scripts only and report drift
  Check {
    /// Command list (JSON)
    file: PathBuf,
  },

  /// Run remove scripts in reverse order
  Remove {
    /// Command list (JSON)
    file: PathBuf,
  },

  /// Show what a new revision would change and remove
  Diff {
    /// New command list
    new: PathBuf,

    /// Previously applied command list
    old: PathBuf,
  },

  /// Validate a command list without running it
  Validate {
    /// Command list (JSON)
    file: PathBuf,
  },

  /// Apply, check, remove and re-check to verify convergence
  Test {
    /// Command list (JSON)
    file: PathBuf,
  },
}

fn init_tracing(verbose: bool) {
  let default = if verbose { "debug" } else { "warn" };
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(std::io::stderr)
    .without_time()
    .init();
}

fn main() -> Result<()> {
  let cli = Cli::parse();

  init_tracing(cli.verbose);

  let settings = Settings::load(cli.config.as_deref(), &cli.env, cli.json, cli.verbose)?;

  match cli.command {
    Commands::Run { file, old } => cmd::cmd_run(&file, old.as_deref(), Mode::Change, &settings),
    Commands::Check { file } => cmd::cmd_run(&file, None, Mode::Check, &settings),
    Commands::Remove { file } => cmd::cmd_run(&file, None, Mode::Remove, &settings),
    Commands::Diff { new, old } => cmd::cmd_diff(&new, &old, &settings),
    Commands::Validate { file } => cmd::cmd_validate(&file, &settings),
    Commands::Test { file } => cmd::cmd_test(&file, &settings),
  }
}
