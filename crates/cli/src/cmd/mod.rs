mod diff;
mod run;
mod selftest;
mod validate;

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use tracing::{debug, warn};

use etcha_lib::commands::{Commands, EventStreams, RunContext};
use etcha_lib::config::{Config, load_commands};
use etcha_lib::env::EnvVars;
use etcha_lib::exec::{CancelToken, LocalExecutor};
use etcha_lib::observe::Observer;

pub use diff::cmd_diff;
pub use run::cmd_run;
pub use selftest::cmd_test;
pub use validate::cmd_validate;

/// Options shared by every subcommand.
pub struct Settings {
  pub config: Config,
  /// Config environment with `--env` values layered on top.
  pub env: EnvVars,
  pub json: bool,
  pub verbose: bool,
}

impl Settings {
  pub fn load(config: Option<&Path>, env: &[String], json: bool, verbose: bool) -> Result<Self> {
    let config = Config::load_or_default(config).context("Failed to load config")?;
    let overrides = EnvVars::parse_pairs(env).map_err(|e| anyhow!(e))?;
    let env = config.env.merged(&overrides);

    Ok(Self {
      config,
      env,
      json,
      verbose,
    })
  }

  fn run_context(&self, cancel: CancelToken, observer: Arc<dyn Observer>) -> RunContext<LocalExecutor> {
    let event_streams = if self.json {
      EventStreams::Stderr
    } else {
      EventStreams::Split
    };

    RunContext::new(LocalExecutor::new())
      .with_exec(self.config.exec.clone())
      .with_cancel(cancel)
      .with_observer(observer)
      .with_event_streams(event_streams)
  }
}

fn load(path: &Path) -> Result<Commands> {
  let commands = load_commands(path).with_context(|| format!("Failed to load commands: {}", path.display()))?;
  debug!(path = %path.display(), count = commands.len(), "loaded commands");
  Ok(commands)
}

fn runtime() -> Result<tokio::runtime::Runtime> {
  tokio::runtime::Runtime::new().context("Failed to create async runtime")
}

/// Cancel `cancel` on the first Ctrl-C.
async fn cancel_on_ctrl_c(cancel: CancelToken) {
  if tokio::signal::ctrl_c().await.is_ok() {
    warn!("interrupted, cancelling");
    cancel.cancel();
  }
}
