//! Deployment plan types.
//!
//! A [`Plan`] is the immutable input to one orchestrator run: component
//! declarations in dependency order, the wiring steps that connect them, and
//! component families that are instantiated once per configured item (one
//! token-state/proxy/token trio per listed token, for example).
//!
//! Which declared components actually get deployed is controlled separately
//! by [`ConfigFlags`], the per-network `deploy` flag file, so the same plan
//! can drive a fresh deployment or an incremental re-run.

use std::collections::BTreeMap;
use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::value::Value;

/// Placeholder substituted with the family instance key.
const INSTANCE_VAR: &str = "{instance}";

/// A constructor or call argument, resolved at materialization time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArgSpec {
  /// A literal value.
  Value(Value),
  /// The materialized address of another component, by name.
  AddressOf(String),
}

impl ArgSpec {
  fn instantiate(&self, key: &str) -> ArgSpec {
    match self {
      ArgSpec::Value(Value::Str(s)) => ArgSpec::Value(Value::Str(s.replace(INSTANCE_VAR, key))),
      ArgSpec::Value(v) => ArgSpec::Value(v.clone()),
      ArgSpec::AddressOf(name) => ArgSpec::AddressOf(name.replace(INSTANCE_VAR, key)),
    }
  }
}

/// One component to materialize: deploy fresh or reuse from the manifest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentDecl {
  /// Unique component name (e.g. `ProxyFeePool`).
  pub name: String,

  /// Source artifact identifier. Defaults to the component name, so a
  /// `Proxy` source can back several named proxy components.
  #[serde(default)]
  pub source: Option<String>,

  /// Constructor arguments.
  #[serde(default)]
  pub args: Vec<ArgSpec>,

  /// Names of components that must already be materialized.
  #[serde(default)]
  pub deps: Vec<String>,

  /// Deploy even when absent from the config flags file. Used for
  /// incrementally added components.
  #[serde(default)]
  pub force: bool,

  /// Shared library: after materialization its address is linked into the
  /// bytecode of every later deployable component.
  #[serde(default)]
  pub library: bool,
}

impl ComponentDecl {
  /// The source identifier, defaulting to the component name.
  pub fn source_id(&self) -> &str {
    self.source.as_deref().unwrap_or(&self.name)
  }

  fn instantiate(&self, key: &str) -> ComponentDecl {
    ComponentDecl {
      name: self.name.replace(INSTANCE_VAR, key),
      source: self.source.clone(),
      args: self.args.iter().map(|a| a.instantiate(key)).collect(),
      deps: self.deps.iter().map(|d| d.replace(INSTANCE_VAR, key)).collect(),
      force: self.force,
      library: self.library,
    }
  }
}

/// One reconciliation step: ensure an on-chain value, writing only on drift.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WiringSpec {
  /// Target component name.
  pub component: String,

  /// Read method used to check current state. `None` makes the step an
  /// unconditional write; only use that for writes that are themselves
  /// idempotent.
  #[serde(default)]
  pub read: Option<String>,

  /// Arguments for the read method.
  #[serde(default)]
  pub read_args: Vec<ArgSpec>,

  /// Expected read result. The step is skipped when the read already
  /// matches this value.
  #[serde(default)]
  pub expected: Option<ArgSpec>,

  /// Write method issued when the read does not match.
  pub write: String,

  /// Arguments for the write method.
  #[serde(default)]
  pub write_args: Vec<ArgSpec>,
}

impl WiringSpec {
  fn instantiate(&self, key: &str) -> WiringSpec {
    WiringSpec {
      component: self.component.replace(INSTANCE_VAR, key),
      read: self.read.clone(),
      read_args: self.read_args.iter().map(|a| a.instantiate(key)).collect(),
      expected: self.expected.as_ref().map(|e| e.instantiate(key)),
      write: self.write.clone(),
      write_args: self.write_args.iter().map(|a| a.instantiate(key)).collect(),
    }
  }

  /// All component names this wiring references.
  pub fn referenced_components(&self) -> Vec<&str> {
    let mut names = vec![self.component.as_str()];
    let args = self.read_args.iter().chain(self.write_args.iter()).chain(self.expected.iter());
    for arg in args {
      if let ArgSpec::AddressOf(name) = arg {
        names.push(name.as_str());
      }
    }
    names
  }
}

/// A component group instantiated once per configured item.
///
/// `{instance}` in names, deps, string arguments and wiring references is
/// replaced with each instance key in turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentFamily {
  /// Family name, for reporting only.
  pub name: String,

  /// Instance keys (e.g. the configured token symbols).
  pub instances: Vec<String>,

  #[serde(default)]
  pub components: Vec<ComponentDecl>,

  #[serde(default)]
  pub wirings: Vec<WiringSpec>,
}

impl ComponentFamily {
  /// Expand the family for one instance key.
  pub fn instantiate(&self, key: &str) -> (Vec<ComponentDecl>, Vec<WiringSpec>) {
    (
      self.components.iter().map(|c| c.instantiate(key)).collect(),
      self.wirings.iter().map(|w| w.instantiate(key)).collect(),
    )
  }
}

/// The full input to one orchestrator run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Plan {
  /// Components in dependency order; the deployer re-validates the order.
  #[serde(default)]
  pub components: Vec<ComponentDecl>,

  /// Wiring steps executed after all top-level components materialize.
  #[serde(default)]
  pub wirings: Vec<WiringSpec>,

  /// Per-item component families, run after the top-level wiring.
  #[serde(default)]
  pub families: Vec<ComponentFamily>,
}

/// Errors from loading a plan or flags file.
#[derive(Debug, Error)]
pub enum PlanError {
  #[error("failed to read {what} file: {source}")]
  Read {
    what: &'static str,
    #[source]
    source: io::Error,
  },

  #[error("failed to parse {what} file: {source}")]
  Parse {
    what: &'static str,
    #[source]
    source: serde_json::Error,
  },

  #[error("failed to write {what} file: {source}")]
  Write {
    what: &'static str,
    #[source]
    source: io::Error,
  },

  #[error("failed to serialize {what} file: {source}")]
  Serialize {
    what: &'static str,
    #[source]
    source: serde_json::Error,
  },
}

impl Plan {
  /// Load a plan from a JSON file.
  pub fn load(path: &Path) -> Result<Self, PlanError> {
    let content = std::fs::read_to_string(path).map_err(|source| PlanError::Read { what: "plan", source })?;
    serde_json::from_str(&content).map_err(|source| PlanError::Parse { what: "plan", source })
  }
}

/// Per-component deploy flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigEntry {
  pub deploy: bool,
}

/// The active configuration: which components exist on this network and
/// whether each should be deployed fresh or reused.
///
/// A component absent from the flags (and not forced) is skipped entirely,
/// which lets operators deploy a subset without touching the rest.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConfigFlags(pub BTreeMap<String, ConfigEntry>);

impl ConfigFlags {
  /// Load flags from a JSON file. A missing file yields empty flags.
  pub fn load(path: &Path) -> Result<Self, PlanError> {
    let content = match std::fs::read_to_string(path) {
      Ok(content) => content,
      Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Self::default()),
      Err(source) => return Err(PlanError::Read { what: "flags", source }),
    };
    serde_json::from_str(&content).map_err(|source| PlanError::Parse { what: "flags", source })
  }

  /// Save flags atomically (write to temp, then rename).
  ///
  /// Called after every successful deployment to lower that component's
  /// `deploy` flag, so an interrupted run re-run from scratch reuses what
  /// it already deployed.
  pub fn save(&self, path: &Path) -> Result<(), PlanError> {
    let content =
      serde_json::to_string_pretty(self).map_err(|source| PlanError::Serialize { what: "flags", source })?;
    let temp_path = path.with_extension("json.tmp");
    std::fs::write(&temp_path, &content).map_err(|source| PlanError::Write { what: "flags", source })?;
    std::fs::rename(&temp_path, path).map_err(|source| PlanError::Write { what: "flags", source })?;
    Ok(())
  }

  pub fn get(&self, name: &str) -> Option<&ConfigEntry> {
    self.0.get(name)
  }

  /// Lower the deploy flag for `name`, inserting an entry if absent.
  pub fn mark_deployed(&mut self, name: &str) {
    self.0.insert(name.to_string(), ConfigEntry { deploy: false });
  }

  /// Names flagged for fresh deployment.
  pub fn flagged_for_deploy(&self) -> impl Iterator<Item = &str> {
    self.0.iter().filter(|(_, e)| e.deploy).map(|(n, _)| n.as_str())
  }
}
