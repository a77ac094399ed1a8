//! Actions command implementation.
//!
//! Lists owner actions queued by previous runs that a privileged operator
//! still needs to perform. With `--all`, completed actions are shown too.

use std::path::Path;

use anyhow::Result;

use chainwright_lib::queue::{OwnerAction, QueueStore};

use crate::output::{print_json, print_stat, print_success, print_warning, symbols};

pub fn cmd_actions(deployment_path: &Path, all: bool, json: bool) -> Result<()> {
  let store = QueueStore::new(deployment_path.join("owner-actions.json"));
  let queue = store.load()?;

  let listed: Vec<(&String, &OwnerAction)> = if all {
    queue.0.iter().collect()
  } else {
    queue.pending().collect()
  };

  if json {
    let items: Vec<_> = listed
      .iter()
      .map(|(key, action)| {
        serde_json::json!({
          "key": key,
          "target": action.target,
          "action": action.action,
          "complete": action.complete,
          "link": action.link,
        })
      })
      .collect();
    print_json(&items)?;
    return Ok(());
  }

  if listed.is_empty() {
    print_success("No pending owner actions.");
    return Ok(());
  }

  let pending = listed.iter().filter(|(_, a)| !a.complete).count();
  if pending > 0 {
    print_warning(&format!("{} pending owner action(s)", pending));
  } else {
    print_success("All owner actions complete.");
  }
  println!();
  for (key, action) in listed {
    let marker = if action.complete { symbols::SUCCESS } else { symbols::ARROW };
    println!("  {} {}", marker, key);
    print_stat("Target", &action.target.to_string());
    if !action.link.is_empty() {
      print_stat("Link", &action.link);
    }
  }

  Ok(())
}
