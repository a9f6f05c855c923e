//! Validate command implementation.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Result, bail};

use etcha_lib::commands::ValidateError;

use super::{Settings, load};
use crate::output::{print_error, print_json, print_success};

pub fn cmd_validate(file: &Path, settings: &Settings) -> Result<()> {
  let commands = load(file)?;

  let violations: BTreeMap<String, Vec<String>> = match commands.validate() {
    Ok(()) => BTreeMap::new(),
    Err(ValidateError::Invalid(report)) => report
      .iter()
      .map(|(id, v)| (id.to_string(), v.iter().map(ToString::to_string).collect()))
      .collect(),
    Err(err @ ValidateError::NoCommands) => {
      if !settings.json {
        print_error(&err.to_string());
      }
      return Err(err.into());
    }
  };

  if settings.json {
    print_json(&serde_json::json!({
      "valid": violations.is_empty(),
      "violations": violations,
    }))?;
  } else if violations.is_empty() {
    print_success(&format!("{} is valid ({} commands)", file.display(), commands.len()));
  } else {
    for (id, messages) in &violations {
      let id = if id.is_empty() { "<no id>" } else { id.as_str() };
      for message in messages {
        print_error(&format!("{}: {}", id, message));
      }
    }
  }

  if !violations.is_empty() {
    bail!("{} command(s) failed validation", violations.len());
  }

  Ok(())
}
