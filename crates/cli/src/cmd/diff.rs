//! Diff command implementation.
//!
//! Compares two revisions of a command list and shows which commands will be
//! checked, skipped or removed.

use std::path::Path;

use anyhow::Result;
use owo_colors::{OwoColorize, Stream};

use etcha_lib::commands::CommandsDiff;

use super::{Settings, load};
use crate::output::{print_info, print_json, symbols};

pub fn cmd_diff(new: &Path, old: &Path, settings: &Settings) -> Result<()> {
  let new_commands = load(new)?;
  let old_commands = load(old)?;

  let diff = new_commands.diff(&old_commands);

  if settings.json {
    print_json(&serde_json::json!({
      "change": diff.change,
      "remove": diff.remove,
    }))?;
  } else {
    print_human_diff(&diff);
  }

  Ok(())
}

fn print_human_diff(diff: &CommandsDiff) {
  if diff.is_empty() {
    print_info("No commands.");
    return;
  }

  if !diff.change.is_empty() {
    println!("Change:");
    for command in diff.change.iter() {
      if command.check.is_empty() && !command.always {
        println!(
          "  {} {} {}",
          symbols::INFO.if_supports_color(Stream::Stdout, |s| s.dimmed()),
          command.id,
          "(unchanged)".if_supports_color(Stream::Stdout, |s| s.dimmed())
        );
      } else {
        println!(
          "  {} {}",
          symbols::MODIFY.if_supports_color(Stream::Stdout, |s| s.yellow()),
          command.id
        );
      }
    }
  }

  if !diff.remove.is_empty() {
    if !diff.change.is_empty() {
      println!();
    }
    println!("Remove:");
    for command in diff.remove.iter() {
      println!(
        "  {} {}",
        symbols::REMOVE.if_supports_color(Stream::Stdout, |s| s.red()),
        command.id
      );
    }
  }
}
