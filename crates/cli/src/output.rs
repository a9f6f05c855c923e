//! CLI output formatting utilities.
//!
//! Provides consistent formatting for terminal output including colored status
//! messages, per-command result lines, and Unicode symbols.

use std::time::Duration;

use anyhow::Context;
use owo_colors::{OwoColorize, Stream};

use etcha_lib::commands::Mode;
use etcha_lib::output::Output;

pub mod symbols {
  pub const SUCCESS: &str = "✓";
  pub const ERROR: &str = "✗";
  pub const WARNING: &str = "⚠";
  pub const INFO: &str = "•";
  pub const ARROW: &str = "→";
  pub const MODIFY: &str = "~";
  pub const REMOVE: &str = "-";
}

pub fn format_duration(duration: Duration) -> String {
  let secs = duration.as_secs();
  let millis = duration.subsec_millis();

  if secs >= 60 {
    let mins = secs / 60;
    let remaining_secs = secs % 60;
    format!("{}m {}s", mins, remaining_secs)
  } else if secs > 0 {
    format!("{}.{:02}s", secs, millis / 10)
  } else {
    format!("{}ms", millis)
  }
}

pub fn print_success(message: &str) {
  println!(
    "{} {}",
    symbols::SUCCESS.if_supports_color(Stream::Stdout, |s| s.green()),
    message
  );
}

pub fn print_error(message: &str) {
  eprintln!(
    "{} {}",
    symbols::ERROR.if_supports_color(Stream::Stderr, |s| s.red()),
    message.if_supports_color(Stream::Stderr, |s| s.red())
  );
}

pub fn print_warning(message: &str) {
  eprintln!(
    "{} {}",
    symbols::WARNING.if_supports_color(Stream::Stderr, |s| s.yellow()),
    message.if_supports_color(Stream::Stderr, |s| s.yellow())
  );
}

pub fn print_info(message: &str) {
  println!(
    "{} {}",
    symbols::INFO.if_supports_color(Stream::Stdout, |s| s.blue()),
    message
  );
}

pub fn print_stat(label: &str, value: &str) {
  println!(
    "  {}: {}",
    label.if_supports_color(Stream::Stdout, |s| s.dimmed()),
    value
  );
}

pub fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
  let json = serde_json::to_string_pretty(value).context("Failed to serialize to JSON")?;
  println!("{}", json);
  Ok(())
}

/// What one output line says about a unit.
pub fn describe_output(output: &Output, mode: Mode) -> (&'static str, &'static str) {
  if output.change_fail {
    (symbols::ERROR, "change failed")
  } else if output.remove_fail {
    (symbols::ERROR, "remove failed")
  } else if output.removed {
    (symbols::REMOVE, "removed")
  } else if output.changed {
    (symbols::MODIFY, "changed")
  } else if output.check_fail && mode == Mode::Check {
    (symbols::WARNING, "needs change")
  } else if output.checked {
    (symbols::SUCCESS, "ok")
  } else {
    (symbols::INFO, "skipped")
  }
}

/// Print one line per unit invocation, with captured output when verbose.
pub fn print_output(output: &Output, mode: Mode, verbose: bool) {
  let (symbol, status) = describe_output(output, mode);
  let colored = match symbol {
    symbols::ERROR => format!("{}", symbol.if_supports_color(Stream::Stdout, |s| s.red())),
    symbols::WARNING => format!("{}", symbol.if_supports_color(Stream::Stdout, |s| s.yellow())),
    symbols::MODIFY | symbols::REMOVE => format!("{}", symbol.if_supports_color(Stream::Stdout, |s| s.cyan())),
    symbols::SUCCESS => format!("{}", symbol.if_supports_color(Stream::Stdout, |s| s.green())),
    _ => format!("{}", symbol.if_supports_color(Stream::Stdout, |s| s.dimmed())),
  };
  println!("  {} {} {}", colored, output.id, status.if_supports_color(Stream::Stdout, |s| s.dimmed()));

  if verbose {
    for (label, out) in [
      ("check", &output.check_out),
      ("change", &output.change_out),
      ("remove", &output.remove_out),
    ] {
      for line in out.lines().filter(|l| !l.is_empty()) {
        println!(
          "      {} {}",
          format!("{} {}", label, symbols::ARROW).if_supports_color(Stream::Stdout, |s| s.dimmed()),
          line
        );
      }
    }
  }
}
