//! The orchestrator: one full deploy-and-reconcile run.
//!
//! Components materialize strictly in declaration order (the deployer
//! re-validates dependencies), then the wiring steps run, then each family
//! instance is expanded and run the same way. The run never rolls anything
//! back: everything durably recorded stays recorded, and a re-run skips
//! whatever is already satisfied.

use std::path::PathBuf;

use thiserror::Error;
use tracing::{debug, info};

use crate::artifact::{AbiError, ArtifactSet, Op};
use crate::chain::ChainClient;
use crate::confirm::Confirm;
use crate::deploy::{DeployError, Deployer, Materialization};
use crate::manifest::{ManifestError, ManifestStore};
use crate::plan::{ComponentDecl, ConfigFlags, Plan, WiringSpec};
use crate::queue::{QueueError, QueueStore};
use crate::reconcile::{ReconcileError, Reconciler, Step, StepOutcome};

/// How a run ended.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RunStatus {
  #[default]
  Completed,
  /// The operator declined a write; everything before it stands.
  Cancelled,
}

/// What one run did, for reporting.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunReport {
  pub deployed: Vec<String>,
  pub reused: Vec<String>,
  /// Components not configured for this network.
  pub skipped: Vec<String>,
  pub steps_applied: usize,
  pub steps_skipped: usize,
  pub steps_queued: usize,
  pub steps_manual: usize,
  pub status: RunStatus,
}

/// Errors that abort a run.
#[derive(Debug, Error)]
pub enum RunError {
  #[error(transparent)]
  Deploy(#[from] DeployError),

  #[error(transparent)]
  Reconcile(#[from] ReconcileError),

  #[error(transparent)]
  Queue(#[from] QueueError),

  #[error(transparent)]
  Manifest(#[from] ManifestError),

  #[error("invalid wiring step '{step}': {source}")]
  InvalidWiring {
    step: String,
    #[source]
    source: AbiError,
  },
}

/// Drives one full run against one network.
pub struct Orchestrator<'a, C: ChainClient, K: Confirm> {
  chain: &'a C,
  confirm: &'a K,
  artifacts: &'a ArtifactSet,
  manifest_store: &'a ManifestStore,
  queue_store: Option<&'a QueueStore>,
  flags: ConfigFlags,
  flags_path: Option<PathBuf>,
  network: String,
  explorer: Option<String>,
}

impl<'a, C: ChainClient, K: Confirm> Orchestrator<'a, C, K> {
  #[allow(clippy::too_many_arguments)]
  pub fn new(
    chain: &'a C,
    confirm: &'a K,
    artifacts: &'a ArtifactSet,
    manifest_store: &'a ManifestStore,
    queue_store: Option<&'a QueueStore>,
    flags: ConfigFlags,
    flags_path: Option<PathBuf>,
    network: impl Into<String>,
    explorer: Option<String>,
  ) -> Self {
    Self {
      chain,
      confirm,
      artifacts,
      manifest_store,
      queue_store,
      flags,
      flags_path,
      network: network.into(),
      explorer,
    }
  }

  /// Execute the plan: components, wirings, then each family instance.
  pub async fn run(&self, plan: &Plan) -> Result<RunReport, RunError> {
    let mut report = RunReport::default();
    let mut deployer = Deployer::new(
      self.chain,
      self.artifacts,
      self.flags.clone(),
      self.flags_path.clone(),
      self.manifest_store,
      self.network.clone(),
      self.explorer.clone(),
    )?;
    let mut reconciler = Reconciler::new(self.chain, self.confirm, self.queue_store, self.explorer.clone())?;

    for decl in &plan.components {
      self.materialize(&mut deployer, decl, &mut report).await?;
    }

    for wiring in &plan.wirings {
      if !self.wire(&deployer, &mut reconciler, wiring, &mut report).await? {
        report.status = RunStatus::Cancelled;
        return Ok(report);
      }
    }

    for family in &plan.families {
      for key in &family.instances {
        info!(family = %family.name, instance = %key, "running family instance");
        let (components, wirings) = family.instantiate(key);
        for decl in &components {
          self.materialize(&mut deployer, decl, &mut report).await?;
        }
        for wiring in &wirings {
          if !self.wire(&deployer, &mut reconciler, wiring, &mut report).await? {
            report.status = RunStatus::Cancelled;
            return Ok(report);
          }
        }
      }
    }

    info!(
      deployed = report.deployed.len(),
      reused = report.reused.len(),
      applied = report.steps_applied,
      queued = report.steps_queued,
      "run complete"
    );
    Ok(report)
  }

  async fn materialize(
    &self,
    deployer: &mut Deployer<'_, C>,
    decl: &ComponentDecl,
    report: &mut RunReport,
  ) -> Result<(), RunError> {
    match deployer.materialize(decl).await? {
      Materialization::Deployed(_) => report.deployed.push(decl.name.clone()),
      Materialization::Reused(_) => report.reused.push(decl.name.clone()),
      Materialization::Skipped => report.skipped.push(decl.name.clone()),
    }
    Ok(())
  }

  /// Resolve and reconcile one wiring. Returns `false` when the operator
  /// declined and the run should end.
  async fn wire(
    &self,
    deployer: &Deployer<'_, C>,
    reconciler: &mut Reconciler<'_, C, K>,
    spec: &WiringSpec,
    report: &mut RunReport,
  ) -> Result<bool, RunError> {
    // A wiring referencing any skipped component is itself skipped, so a
    // subset deployment does not trip over the components it left out.
    if spec.referenced_components().iter().any(|n| deployer.component(n).is_none()) {
      debug!(component = %spec.component, write = %spec.write, "references an unmaterialized component, skipping");
      report.steps_skipped += 1;
      return Ok(true);
    }
    let Some(component) = deployer.component(&spec.component) else {
      return Ok(true);
    };

    let read = match &spec.read {
      Some(method) => {
        let args = deployer.resolve_args(&spec.component, &spec.read_args)?;
        let op = Op::new(&component.abi, method, args).map_err(|source| RunError::InvalidWiring {
          step: format!("{}.{}", spec.component, method),
          source,
        })?;
        Some(op)
      }
      None => None,
    };

    let expected = match &spec.expected {
      Some(arg) => Some(deployer.resolve_arg(&spec.component, arg)?),
      None => None,
    };

    let write_args = deployer.resolve_args(&spec.component, &spec.write_args)?;
    let write = Op::new(&component.abi, &spec.write, write_args).map_err(|source| RunError::InvalidWiring {
      step: format!("{}.{}", spec.component, spec.write),
      source,
    })?;

    let step = Step {
      component: spec.component.clone(),
      target: component.address.clone(),
      abi: component.abi.clone(),
      read,
      expected,
      write,
    };

    match reconciler.reconcile(&step).await? {
      StepOutcome::Applied(_) => report.steps_applied += 1,
      StepOutcome::Skipped => report.steps_skipped += 1,
      StepOutcome::Queued => report.steps_queued += 1,
      StepOutcome::AwaitingManual => report.steps_manual += 1,
      StepOutcome::Declined => return Ok(false),
    }
    Ok(true)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use tempfile::TempDir;

  use crate::artifact::{Abi, AbiEntry, AbiParam, CompiledArtifact};
  use crate::confirm::{AutoConfirm, DenyConfirm};
  use crate::plan::{ArgSpec, ComponentFamily, ConfigEntry};
  use crate::testutil::MockChain;
  use crate::value::Address;

  fn proxy_abi() -> Abi {
    Abi(vec![
      AbiEntry {
        kind: "function".to_string(),
        name: "target".to_string(),
        inputs: vec![],
        outputs: vec![AbiParam {
          name: String::new(),
          kind: "address".to_string(),
        }],
        state_mutability: Some("view".to_string()),
      },
      AbiEntry {
        kind: "function".to_string(),
        name: "setTarget".to_string(),
        inputs: vec![AbiParam {
          name: "_target".to_string(),
          kind: "address".to_string(),
        }],
        outputs: vec![],
        state_mutability: Some("nonpayable".to_string()),
      },
    ])
  }

  fn artifacts() -> ArtifactSet {
    let mut set = ArtifactSet::default();
    set.insert(
      "Token",
      CompiledArtifact {
        abi: Abi::default(),
        bytecode: "6001".to_string(),
      },
    );
    set.insert(
      "Proxy",
      CompiledArtifact {
        abi: proxy_abi(),
        bytecode: "6002".to_string(),
      },
    );
    set
  }

  fn flags(names: &[&str]) -> ConfigFlags {
    let mut flags = ConfigFlags::default();
    for name in names {
      flags.0.insert(name.to_string(), ConfigEntry { deploy: true });
    }
    flags
  }

  fn decl(name: &str, source: Option<&str>) -> ComponentDecl {
    ComponentDecl {
      name: name.to_string(),
      source: source.map(String::from),
      args: vec![],
      deps: vec![],
      force: false,
      library: false,
    }
  }

  fn set_target_wiring(proxy: &str, target: &str) -> WiringSpec {
    WiringSpec {
      component: proxy.to_string(),
      read: Some("target".to_string()),
      read_args: vec![],
      expected: Some(ArgSpec::AddressOf(target.to_string())),
      write: "setTarget".to_string(),
      write_args: vec![ArgSpec::AddressOf(target.to_string())],
    }
  }

  /// A plan with a logic component and a proxy pointed at it.
  fn proxy_plan() -> Plan {
    Plan {
      components: vec![decl("A", Some("Token")), decl("ProxyA", Some("Proxy"))],
      wirings: vec![set_target_wiring("ProxyA", "A")],
      families: vec![],
    }
  }

  struct Harness {
    _dir: TempDir,
    manifest_store: ManifestStore,
    queue_store: QueueStore,
    flags_path: PathBuf,
  }

  impl Harness {
    fn new(flag_names: &[&str]) -> Self {
      let dir = TempDir::new().unwrap();
      let flags_path = dir.path().join("flags.json");
      flags(flag_names).save(&flags_path).unwrap();
      Self {
        manifest_store: ManifestStore::new(dir.path().join("manifest.json")),
        queue_store: QueueStore::new(dir.path().join("owner-actions.json")),
        flags_path,
        _dir: dir,
      }
    }

    fn orchestrator<'a, C: ChainClient, K: Confirm>(
      &'a self,
      chain: &'a C,
      confirm: &'a K,
      artifacts: &'a ArtifactSet,
    ) -> Orchestrator<'a, C, K> {
      Orchestrator::new(
        chain,
        confirm,
        artifacts,
        &self.manifest_store,
        Some(&self.queue_store),
        ConfigFlags::load(&self.flags_path).unwrap(),
        Some(self.flags_path.clone()),
        "testnet",
        None,
      )
    }
  }

  #[tokio::test]
  async fn end_to_end_deploys_and_points_proxy() {
    let harness = Harness::new(&["A", "ProxyA"]);
    let chain = MockChain::new();
    let artifacts = artifacts();

    let report = harness
      .orchestrator(&chain, &AutoConfirm, &artifacts)
      .run(&proxy_plan())
      .await
      .unwrap();

    assert_eq!(report.deployed, vec!["A".to_string(), "ProxyA".to_string()]);
    assert_eq!(report.steps_applied, 1);
    assert_eq!(report.status, RunStatus::Completed);

    // The proxy's one write points at A's recorded address.
    let manifest = harness.manifest_store.load().unwrap();
    let a_address = manifest.address_of("A").unwrap().clone();
    let writes = chain.writes();
    assert_eq!(writes.len(), 1);
    assert_eq!(writes[0].1, "setTarget");
    assert_eq!(writes[0].2, vec![crate::value::Value::Address(a_address)]);
  }

  #[tokio::test]
  async fn second_run_performs_no_chain_writes() {
    let harness = Harness::new(&["A", "ProxyA"]);
    let chain = MockChain::new();
    let artifacts = artifacts();
    let plan = proxy_plan();

    harness.orchestrator(&chain, &AutoConfirm, &artifacts).run(&plan).await.unwrap();

    let report = harness.orchestrator(&chain, &AutoConfirm, &artifacts).run(&plan).await.unwrap();

    assert!(report.deployed.is_empty());
    assert_eq!(report.reused, vec!["A".to_string(), "ProxyA".to_string()]);
    assert_eq!(report.steps_skipped, 1);
    assert_eq!(chain.deploy_count(), 2);
    assert_eq!(chain.writes().len(), 1);
  }

  #[tokio::test]
  async fn crash_resume_deploys_only_the_missing_component() {
    let harness = Harness::new(&["A", "B", "C"]);
    let chain = MockChain::new();
    let artifacts = artifacts();
    let plan = Plan {
      components: vec![decl("A", Some("Token")), decl("B", Some("Token")), decl("C", Some("Token"))],
      wirings: vec![],
      families: vec![],
    };

    chain.fail_deploys_from(2);
    assert!(harness.orchestrator(&chain, &AutoConfirm, &artifacts).run(&plan).await.is_err());

    let manifest = harness.manifest_store.load().unwrap();
    assert!(manifest.address_of("A").is_some());
    assert!(manifest.address_of("B").is_some());
    assert!(manifest.address_of("C").is_none());

    chain.clear_failures();
    let report = harness.orchestrator(&chain, &AutoConfirm, &artifacts).run(&plan).await.unwrap();

    assert_eq!(report.reused, vec!["A".to_string(), "B".to_string()]);
    assert_eq!(report.deployed, vec!["C".to_string()]);
    assert_eq!(chain.deploy_count(), 3);
  }

  #[tokio::test]
  async fn wiring_for_unconfigured_component_is_skipped() {
    let harness = Harness::new(&["A"]);
    let chain = MockChain::new();
    let artifacts = artifacts();

    let report = harness
      .orchestrator(&chain, &AutoConfirm, &artifacts)
      .run(&proxy_plan())
      .await
      .unwrap();

    assert_eq!(report.deployed, vec!["A".to_string()]);
    assert_eq!(report.skipped, vec!["ProxyA".to_string()]);
    assert_eq!(report.steps_skipped, 1);
    assert!(chain.writes().is_empty());
  }

  #[tokio::test]
  async fn unmaterialized_dependency_aborts_the_run() {
    let harness = Harness::new(&["B"]);
    let chain = MockChain::new();
    let artifacts = artifacts();
    let plan = Plan {
      components: vec![
        decl("A", Some("Token")),
        ComponentDecl {
          deps: vec!["A".to_string()],
          ..decl("B", Some("Token"))
        },
      ],
      wirings: vec![],
      families: vec![],
    };

    let err = harness
      .orchestrator(&chain, &AutoConfirm, &artifacts)
      .run(&plan)
      .await
      .unwrap_err();

    assert!(matches!(
      err,
      RunError::Deploy(DeployError::MissingDependency { ref dependency, .. }) if dependency == "A"
    ));
    assert_eq!(chain.deploy_count(), 0);
  }

  #[tokio::test]
  async fn family_expands_one_trio_per_instance() {
    let harness = Harness::new(&["TokensUSD", "TokensAUD", "ProxysUSD", "ProxysAUD"]);
    let chain = MockChain::new();
    let artifacts = artifacts();
    let plan = Plan {
      components: vec![],
      wirings: vec![],
      families: vec![ComponentFamily {
        name: "synths".to_string(),
        instances: vec!["sUSD".to_string(), "sAUD".to_string()],
        components: vec![
          decl("Token{instance}", Some("Token")),
          decl("Proxy{instance}", Some("Proxy")),
        ],
        wirings: vec![set_target_wiring("Proxy{instance}", "Token{instance}")],
      }],
    };

    let report = harness
      .orchestrator(&chain, &AutoConfirm, &artifacts)
      .run(&plan)
      .await
      .unwrap();

    assert_eq!(report.deployed.len(), 4);
    assert!(report.deployed.contains(&"TokensAUD".to_string()));
    assert_eq!(report.steps_applied, 2);

    // Each proxy points at its own instance's token.
    let manifest = harness.manifest_store.load().unwrap();
    let writes = chain.writes();
    assert_eq!(
      writes[0].2,
      vec![crate::value::Value::Address(manifest.address_of("TokensUSD").unwrap().clone())]
    );
    assert_eq!(
      writes[1].2,
      vec![crate::value::Value::Address(manifest.address_of("TokensAUD").unwrap().clone())]
    );
  }

  #[tokio::test]
  async fn foreign_owned_proxy_queues_the_write() {
    let harness = Harness::new(&["A", "ProxyA"]);
    let chain = MockChain::new();
    let artifacts = artifacts();
    let plan = proxy_plan();

    // Materialize first so the proxy exists, then hand it to another owner.
    let deploy_only = Plan {
      components: plan.components.clone(),
      wirings: vec![],
      families: vec![],
    };
    harness
      .orchestrator(&chain, &AutoConfirm, &artifacts)
      .run(&deploy_only)
      .await
      .unwrap();
    let manifest = harness.manifest_store.load().unwrap();
    chain.set_owner(
      manifest.address_of("ProxyA").unwrap(),
      Address::parse("0x00000000000000000000000000000000000000ee").unwrap(),
    );

    let report = harness.orchestrator(&chain, &AutoConfirm, &artifacts).run(&plan).await.unwrap();

    assert_eq!(report.steps_queued, 1);
    assert!(chain.writes().is_empty());
    let queue = harness.queue_store.load().unwrap();
    assert_eq!(queue.len(), 1);
    assert!(queue.0.keys().next().unwrap().starts_with("ProxyA.setTarget("));
  }

  #[tokio::test]
  async fn declined_manual_write_cancels_cleanly() {
    let harness = Harness::new(&["A", "ProxyA"]);
    let chain = MockChain::new();
    let artifacts = artifacts();
    let plan = proxy_plan();

    let deploy_only = Plan {
      components: plan.components.clone(),
      wirings: vec![],
      families: vec![],
    };
    harness
      .orchestrator(&chain, &AutoConfirm, &artifacts)
      .run(&deploy_only)
      .await
      .unwrap();
    let manifest = harness.manifest_store.load().unwrap();
    chain.set_owner(
      manifest.address_of("ProxyA").unwrap(),
      Address::parse("0x00000000000000000000000000000000000000ee").unwrap(),
    );

    // No queue configured, so the foreign-owned write falls back to the
    // manual prompt, which the operator declines.
    let orchestrator = Orchestrator::new(
      &chain,
      &DenyConfirm,
      &artifacts,
      &harness.manifest_store,
      None,
      ConfigFlags::load(&harness.flags_path).unwrap(),
      Some(harness.flags_path.clone()),
      "testnet",
      None,
    );
    let report = orchestrator.run(&plan).await.unwrap();

    assert_eq!(report.status, RunStatus::Cancelled);
    assert_eq!(report.steps_applied, 0);
    assert!(chain.writes().is_empty());
  }

  #[tokio::test]
  async fn unknown_write_method_is_an_invalid_wiring() {
    let harness = Harness::new(&["A", "ProxyA"]);
    let chain = MockChain::new();
    let artifacts = artifacts();
    let mut plan = proxy_plan();
    plan.wirings[0].write = "setOwner".to_string();

    let err = harness
      .orchestrator(&chain, &AutoConfirm, &artifacts)
      .run(&plan)
      .await
      .unwrap_err();

    assert!(matches!(err, RunError::InvalidWiring { .. }));
  }
}
