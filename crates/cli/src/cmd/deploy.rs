//! Implementation of the `chainwright deploy` command.
//!
//! Loads the plan, artifacts and durable stores, shows the operator what is
//! about to happen, then drives one orchestrator run:
//! - materializes each component (deploy fresh or reuse the manifest entry)
//! - reconciles the wiring steps, writing only on drift
//! - queues owner-gated writes into owner-actions.json
//!
//! Prints a summary of what was deployed, reused, applied and queued.

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use tracing::info;

use chainwright_lib::artifact::ArtifactSet;
use chainwright_lib::manifest::ManifestStore;
use chainwright_lib::orchestrate::{Orchestrator, RunStatus};
use chainwright_lib::plan::{ConfigFlags, Plan};
use chainwright_lib::queue::QueueStore;
use chainwright_lib::rpc::GatewayClient;
use chainwright_lib::value::Address;

use crate::output::{print_info, print_stat, print_success, print_warning};
use crate::prompts::{self, CliConfirm};

pub struct DeployArgs {
  pub deployment_path: PathBuf,
  pub artifacts: PathBuf,
  pub plan: PathBuf,
  pub endpoint: String,
  pub account: String,
  pub network: String,
  pub explorer: Option<String>,
  pub force_components: Vec<String>,
  pub yes: bool,
}

pub fn cmd_deploy(args: &DeployArgs) -> Result<()> {
  let account = Address::parse(&args.account).context("Invalid --account address")?;

  let flags_path = args.deployment_path.join("flags.json");
  let manifest_store = ManifestStore::new(args.deployment_path.join("manifest.json"));
  let queue_store = QueueStore::new(args.deployment_path.join("owner-actions.json"));

  let artifacts = ArtifactSet::load(&args.artifacts)
    .with_context(|| format!("Failed to load artifacts from {}", args.artifacts.display()))?;
  let mut plan = Plan::load(&args.plan).with_context(|| format!("Failed to load plan from {}", args.plan.display()))?;
  let flags = ConfigFlags::load(&flags_path)?;

  for name in &args.force_components {
    let mut found = false;
    let declared = plan
      .components
      .iter_mut()
      .chain(plan.families.iter_mut().flat_map(|f| f.components.iter_mut()));
    for decl in declared {
      if &decl.name == name {
        decl.force = true;
        found = true;
      }
    }
    if !found {
      bail!("--force-components names a component not in the plan: {}", name);
    }
  }
  let manifest = manifest_store.load()?;

  // Every component flagged for reuse must already have a recorded
  // address, otherwise the run would fail halfway through.
  let missing: Vec<&str> = flags
    .0
    .iter()
    .filter(|(name, entry)| !entry.deploy && manifest.address_of(name).is_none())
    .map(|(name, _)| name.as_str())
    .collect();
  if !missing.is_empty() {
    bail!(
      "Components flagged for reuse with no recorded deployment: {}",
      missing.join(", ")
    );
  }

  print_info(&format!("Deploying to {} via {}", args.network, args.endpoint));
  print_stat("Account", &account.to_string());
  print_stat("Plan", &args.plan.display().to_string());
  print_stat("Artifacts", &args.artifacts.display().to_string());
  print_stat("Deployment dir", &args.deployment_path.display().to_string());

  let to_deploy: Vec<&str> = flags.flagged_for_deploy().collect();
  if to_deploy.is_empty() {
    print_info("No components are flagged for fresh deployment; existing addresses will be reused.");
  } else {
    print_info(&format!("Flagged for fresh deployment: {}", to_deploy.join(", ")));
  }

  if !prompts::confirm("Proceed with this run?", args.yes)? {
    print_warning("Aborted.");
    return Ok(());
  }

  let chain = GatewayClient::new(args.endpoint.clone(), account);
  let confirm = CliConfirm { assume_yes: args.yes };
  let orchestrator = Orchestrator::new(
    &chain,
    &confirm,
    &artifacts,
    &manifest_store,
    Some(&queue_store),
    flags,
    Some(flags_path),
    args.network.clone(),
    args.explorer.clone(),
  );

  let rt = tokio::runtime::Runtime::new().context("Failed to create async runtime")?;
  let report = rt.block_on(orchestrator.run(&plan)).context("Run failed")?;
  info!(network = %args.network, deployed = report.deployed.len(), reused = report.reused.len(), "run finished");

  println!();
  match report.status {
    RunStatus::Completed => print_success("Run complete"),
    RunStatus::Cancelled => print_warning("Run cancelled at operator request; everything already applied stands"),
  }
  print_stat("Deployed", &report.deployed.len().to_string());
  print_stat("Reused", &report.reused.len().to_string());
  print_stat("Components skipped", &report.skipped.len().to_string());
  print_stat("Steps applied", &report.steps_applied.to_string());
  print_stat("Steps skipped", &report.steps_skipped.to_string());

  if report.steps_queued > 0 {
    print_warning(&format!(
      "{} write(s) queued for the contract owner; list them with 'chainwright actions'",
      report.steps_queued
    ));
  }
  if report.steps_manual > 0 {
    print_warning(&format!(
      "{} write(s) require the contract owner and no queue was recorded; see the log above",
      report.steps_manual
    ));
  }

  Ok(())
}
