//! Local shell executor.
//!
//! Runs each script as `<shell> <args...> <script>` in a child process.
//! Scripts inherit the caller's environment since check and change scripts
//! inspect the real system. Config variables and the pass overlay are layered
//! on top.

use std::process::Stdio;

use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

use super::{ExecError, ExecRequest, Executor};

/// Executes scripts with a local shell.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalExecutor;

impl LocalExecutor {
  pub fn new() -> Self {
    Self
  }
}

impl Executor for LocalExecutor {
  async fn run(&self, request: &ExecRequest<'_>) -> Result<String, ExecError> {
    let (shell_cmd, shell_args) = get_shell(request.exec.command.as_deref())?;

    let mut command = Command::new(&shell_cmd);
    command
      .args(&shell_args)
      .arg(request.script)
      .envs(request.exec.env.iter())
      .envs(request.env.iter())
      .stdin(if request.stdin.is_some() {
        Stdio::piped()
      } else {
        Stdio::null()
      })
      .stdout(Stdio::piped())
      .stderr(Stdio::piped())
      // Cancellation drops this future; the child must not outlive it.
      .kill_on_drop(true);

    if let Some(dir) = &request.exec.work_dir {
      command.current_dir(dir);
    }

    debug!(shell = %shell_cmd, work_dir = ?request.exec.work_dir, "spawning process");

    let mut child = command.spawn()?;

    if let (Some(input), Some(mut stdin)) = (request.stdin, child.stdin.take()) {
      let input = input.to_owned();
      tokio::spawn(async move {
        if let Err(e) = stdin.write_all(input.as_bytes()).await {
          debug!(error = %e, "failed to write stdin");
        }
      });
    }

    let output = child.wait_with_output().await?;
    let captured = combine_output(&output.stdout, &output.stderr);

    if !output.status.success() {
      debug!(code = ?output.status.code(), output = %captured, "script failed");
      return Err(ExecError::Failed {
        code: output.status.code(),
        output: captured,
      });
    }

    if !captured.is_empty() {
      debug!(output = %captured, "script output");
    }

    Ok(captured)
  }
}

/// Join stdout and stderr into one trimmed string.
fn combine_output(stdout: &[u8], stderr: &[u8]) -> String {
  let stdout = String::from_utf8_lossy(stdout);
  let stderr = String::from_utf8_lossy(stderr);
  let (stdout, stderr) = (stdout.trim(), stderr.trim());

  match (stdout.is_empty(), stderr.is_empty()) {
    (_, true) => stdout.to_string(),
    (true, false) => stderr.to_string(),
    (false, false) => format!("{}\n{}", stdout, stderr),
  }
}

/// Get the shell command and arguments.
///
/// An override such as `/bin/bash -e -o pipefail -c` is split on whitespace:
/// the first word is the program, the rest are leading arguments.
fn get_shell(override_shell: Option<&str>) -> Result<(String, Vec<String>), ExecError> {
  if let Some(shell) = override_shell {
    let mut words = shell.split_whitespace();
    let program = words
      .next()
      .ok_or_else(|| ExecError::InvalidCommand(shell.to_string()))?;
    return Ok((program.to_string(), words.map(str::to_string).collect()));
  }

  #[cfg(unix)]
  {
    Ok(("/bin/sh".to_string(), vec!["-c".to_string()]))
  }

  #[cfg(windows)]
  {
    Ok((
      "powershell.exe".to_string(),
      vec![
        "-NoProfile".to_string(),
        "-ExecutionPolicy".to_string(),
        "Bypass".to_string(),
        "-Command".to_string(),
      ],
    ))
  }
}
