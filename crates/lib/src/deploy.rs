//! The component deployer: deploy-or-reuse with durable recording.
//!
//! One [`Deployer`] lives for one run. Components materialize strictly in
//! declaration order; each either deploys fresh (when its flag or `force`
//! says so), reuses the manifest address, or is skipped because the network
//! config does not mention it. Every successful deployment is written to the
//! manifest before the next component is considered, so an interrupted run
//! resumes from the last recorded component instead of starting over.

use std::collections::BTreeMap;
use std::path::PathBuf;

use thiserror::Error;
use tracing::{debug, info};

use crate::artifact::{Abi, ArtifactSet};
use crate::chain::{ChainClient, ChainError};
use crate::linker::LinkTable;
use crate::manifest::{unix_now, DeploymentManifest, ManifestError, ManifestStore, TargetEntry};
use crate::plan::{ArgSpec, ComponentDecl, ConfigFlags, PlanError};
use crate::value::{Address, Value};

/// A live, callable handle to a materialized component.
#[derive(Debug, Clone)]
pub struct Component {
  pub name: String,
  pub source: String,
  pub address: Address,
  pub abi: Abi,
}

/// How a component was materialized.
#[derive(Debug, Clone, PartialEq)]
pub enum Materialization {
  Deployed(Address),
  Reused(Address),
  /// Not configured for this network and not forced.
  Skipped,
}

/// Errors from materializing a component.
#[derive(Debug, Error)]
pub enum DeployError {
  #[error("component '{component}' depends on '{dependency}', which has not been materialized")]
  MissingDependency { component: String, dependency: String },

  #[error("no compiled artifact for source '{source_id}' (required by '{component}')")]
  MissingArtifact { component: String, source_id: String },

  #[error("component '{component}' is not flagged for deployment and has no address in the manifest")]
  NoExistingAddress { component: String },

  #[error(transparent)]
  Manifest(#[from] ManifestError),

  #[error(transparent)]
  Flags(#[from] PlanError),

  #[error(transparent)]
  Chain(#[from] ChainError),
}

/// Materializes components one at a time against a single manifest.
pub struct Deployer<'a, C: ChainClient> {
  chain: &'a C,
  artifacts: &'a ArtifactSet,
  flags: ConfigFlags,
  /// When set, the flags file is rewritten with the component's `deploy`
  /// flag lowered after each successful deployment.
  flags_path: Option<PathBuf>,
  store: &'a ManifestStore,
  manifest: DeploymentManifest,
  links: LinkTable,
  registry: BTreeMap<String, Component>,
  network: String,
  explorer: Option<String>,
}

impl<'a, C: ChainClient> Deployer<'a, C> {
  /// Open the manifest and prepare a deployer for one run.
  pub fn new(
    chain: &'a C,
    artifacts: &'a ArtifactSet,
    flags: ConfigFlags,
    flags_path: Option<PathBuf>,
    store: &'a ManifestStore,
    network: impl Into<String>,
    explorer: Option<String>,
  ) -> Result<Self, ManifestError> {
    let manifest = store.load()?;
    Ok(Self {
      chain,
      artifacts,
      flags,
      flags_path,
      store,
      manifest,
      links: LinkTable::new(),
      registry: BTreeMap::new(),
      network: network.into(),
      explorer,
    })
  }

  /// The handle for a materialized component, if it was materialized this
  /// run.
  pub fn component(&self, name: &str) -> Option<&Component> {
    self.registry.get(name)
  }

  /// The address of a materialized component.
  pub fn address_of(&self, name: &str) -> Option<&Address> {
    self.registry.get(name).map(|c| &c.address)
  }

  pub fn manifest(&self) -> &DeploymentManifest {
    &self.manifest
  }

  /// Block-explorer link for an address, or empty without an explorer.
  pub fn explorer_link(&self, address: &Address) -> String {
    match &self.explorer {
      Some(prefix) => format!("{}/address/{}", prefix, address),
      None => String::new(),
    }
  }

  /// Resolve one argument spec against the components materialized so far.
  pub fn resolve_arg(&self, component: &str, spec: &ArgSpec) -> Result<Value, DeployError> {
    match spec {
      ArgSpec::Value(v) => Ok(v.clone()),
      ArgSpec::AddressOf(name) => {
        self
          .address_of(name)
          .map(|a| Value::Address(a.clone()))
          .ok_or_else(|| DeployError::MissingDependency {
            component: component.to_string(),
            dependency: name.clone(),
          })
      }
    }
  }

  /// Resolve argument specs against the components materialized so far.
  pub fn resolve_args(&self, component: &str, specs: &[ArgSpec]) -> Result<Vec<Value>, DeployError> {
    specs.iter().map(|spec| self.resolve_arg(component, spec)).collect()
  }

  /// Materialize one component: deploy, reuse, or skip.
  pub async fn materialize(&mut self, decl: &ComponentDecl) -> Result<Materialization, DeployError> {
    for dependency in &decl.deps {
      if !self.registry.contains_key(dependency) {
        return Err(DeployError::MissingDependency {
          component: decl.name.clone(),
          dependency: dependency.clone(),
        });
      }
    }

    let flag = self.flags.get(&decl.name);
    if flag.is_none() && !decl.force {
      debug!(component = %decl.name, "not configured for this network, skipping");
      return Ok(Materialization::Skipped);
    }

    let source_id = decl.source_id();
    let should_deploy = decl.force || flag.is_some_and(|f| f.deploy);

    if should_deploy {
      self.deploy_fresh(decl, source_id).await
    } else {
      self.reuse_existing(decl, source_id)
    }
  }

  async fn deploy_fresh(&mut self, decl: &ComponentDecl, source_id: &str) -> Result<Materialization, DeployError> {
    let artifact = self.artifacts.get(source_id).ok_or_else(|| DeployError::MissingArtifact {
      component: decl.name.clone(),
      source_id: source_id.to_string(),
    })?;
    let abi = artifact.abi.clone();
    let unlinked = artifact.bytecode.clone();

    let args = self.resolve_args(&decl.name, &decl.args)?;
    let bytecode = self.links.link(&unlinked);

    let deployment = self.chain.deploy(source_id, &abi, &bytecode, &args).await?;
    info!(
      component = %decl.name,
      source = %source_id,
      address = %deployment.address,
      "deployed"
    );

    let target = TargetEntry {
      name: decl.name.clone(),
      address: deployment.address.clone(),
      source: source_id.to_string(),
      link: self.explorer_link(&deployment.address),
      created_at: unix_now(),
      txn: deployment.txn.0.clone(),
      network: self.network.clone(),
    };
    self.manifest.record(target, unlinked, abi.clone());
    self.store.save(&self.manifest)?;

    // Lower the flag durably so a re-run after a mid-plan failure reuses
    // this deployment instead of repeating it.
    self.flags.mark_deployed(&decl.name);
    if let Some(path) = &self.flags_path {
      self.flags.save(path)?;
    }

    self.register(decl, source_id, deployment.address.clone(), abi);
    Ok(Materialization::Deployed(deployment.address))
  }

  fn reuse_existing(&mut self, decl: &ComponentDecl, source_id: &str) -> Result<Materialization, DeployError> {
    let address = self
      .manifest
      .address_of(&decl.name)
      .cloned()
      .ok_or_else(|| DeployError::NoExistingAddress {
        component: decl.name.clone(),
      })?;

    // The snapshot captured at deploy time matches what is actually on
    // chain at this address; a freshly compiled artifact may not.
    let abi = match self.manifest.sources.get(source_id) {
      Some(snapshot) => snapshot.abi.clone(),
      None => {
        self
          .artifacts
          .get(source_id)
          .map(|a| a.abi.clone())
          .ok_or_else(|| DeployError::MissingArtifact {
            component: decl.name.clone(),
            source_id: source_id.to_string(),
          })?
      }
    };

    info!(component = %decl.name, address = %address, "reusing existing");
    self.register(decl, source_id, address.clone(), abi);
    Ok(Materialization::Reused(address))
  }

  fn register(&mut self, decl: &ComponentDecl, source_id: &str, address: Address, abi: Abi) {
    if decl.library {
      self.links.insert(decl.name.clone(), address.clone());
    }
    self.registry.insert(
      decl.name.clone(),
      Component {
        name: decl.name.clone(),
        source: source_id.to_string(),
        address,
        abi,
      },
    );
  }
}
