use std::io::{self, IsTerminal, Write};

use anyhow::{Result, bail};
use chainwright_lib::confirm::Confirm;

pub fn confirm(message: &str, force: bool) -> Result<bool> {
  if force {
    return Ok(true);
  }

  if !io::stdin().is_terminal() || !io::stderr().is_terminal() {
    bail!("Cannot prompt for confirmation in non-interactive mode. Use --yes to proceed.");
  }

  write!(io::stderr(), "{} [y/N] ", message)?;
  io::stderr().flush()?;

  let mut input = String::new();
  io::stdin().read_line(&mut input)?;

  Ok(matches!(input.trim().to_ascii_lowercase().as_str(), "y" | "yes"))
}

/// Interactive checkpoint prompt for the reconciler's manual fallback.
pub struct CliConfirm {
  pub assume_yes: bool,
}

impl Confirm for CliConfirm {
  fn confirm(&self, description: &str) -> io::Result<bool> {
    if self.assume_yes {
      return Ok(true);
    }

    if !io::stdin().is_terminal() || !io::stderr().is_terminal() {
      return Err(io::Error::other(
        "cannot prompt for confirmation in non-interactive mode; use --yes to proceed",
      ));
    }

    write!(io::stderr(), "{} [y/N] ", description)?;
    io::stderr().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;

    Ok(matches!(input.trim().to_ascii_lowercase().as_str(), "y" | "yes"))
  }
}
