//! Status command implementation.
//!
//! Displays the recorded deployment manifest: each component's address,
//! source and deployment transaction.

use std::path::Path;

use anyhow::Result;

use chainwright_lib::manifest::ManifestStore;

use crate::output::{abbreviate, print_info, print_json, print_stat, print_success, symbols};

pub fn cmd_status(deployment_path: &Path, json: bool) -> Result<()> {
  let store = ManifestStore::new(deployment_path.join("manifest.json"));
  let manifest = store.load()?;

  if json {
    print_json(&manifest)?;
    return Ok(());
  }

  if manifest.targets.is_empty() {
    print_info("No deployments recorded. Run 'chainwright deploy' to create some.");
    return Ok(());
  }

  print_success(&format!("{} component(s) recorded", manifest.targets.len()));
  println!();
  for (name, target) in &manifest.targets {
    println!(
      "  {} {:<28} {}  {}",
      symbols::INFO,
      name,
      target.address,
      abbreviate(&target.txn)
    );
  }

  println!();
  print_stat("Sources", &manifest.sources.len().to_string());

  Ok(())
}
