//! The deployment manifest: the durable record of what is on chain.
//!
//! Two maps, both keyed deterministically:
//! - `targets`: one entry per materialized component, by name. The
//!   address here is authoritative once set; a component with a live
//!   address is never re-deployed unless its flag says so.
//! - `sources`: the ABI + bytecode snapshot captured at deploy time, by
//!   source identifier, so later runs can reconstruct callable handles
//!   without recompiling.
//!
//! The manifest is written synchronously after every deployment (write to
//! temp, then rename), so a crash between deployments leaves a consistent,
//! resumable snapshot.

use std::collections::BTreeMap;
use std::io;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::artifact::Abi;
use crate::value::Address;

/// One materialized component.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetEntry {
  pub name: String,
  pub address: Address,
  pub source: String,
  /// Block-explorer link for the address.
  pub link: String,
  /// Unix timestamp (seconds) of the deployment.
  pub created_at: u64,
  /// Deployment transaction reference; empty when reused from an earlier
  /// manifest that predates this engine.
  pub txn: String,
  pub network: String,
}

/// The artifact snapshot captured at deploy time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceEntry {
  /// Unlinked creation bytecode, hex.
  pub bytecode: String,
  pub abi: Abi,
}

/// The full manifest. Grows monotonically; entries are only ever replaced
/// by a fresh deployment of the same name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeploymentManifest {
  pub targets: BTreeMap<String, TargetEntry>,
  pub sources: BTreeMap<String, SourceEntry>,
}

impl DeploymentManifest {
  /// The recorded address for a component, if any.
  pub fn address_of(&self, name: &str) -> Option<&Address> {
    self.targets.get(name).map(|t| &t.address)
  }

  /// Record a deployment: target entry plus artifact snapshot.
  pub fn record(&mut self, target: TargetEntry, bytecode: String, abi: Abi) {
    self.sources.insert(target.source.clone(), SourceEntry { bytecode, abi });
    self.targets.insert(target.name.clone(), target);
  }
}

/// Errors from manifest persistence.
#[derive(Debug, Error)]
pub enum ManifestError {
  #[error("failed to create manifest directory: {0}")]
  CreateDir(#[source] io::Error),

  #[error("failed to read manifest: {0}")]
  Read(#[source] io::Error),

  #[error("failed to write manifest: {0}")]
  Write(#[source] io::Error),

  #[error("failed to parse manifest: {0}")]
  Parse(#[source] serde_json::Error),

  #[error("failed to serialize manifest: {0}")]
  Serialize(#[source] serde_json::Error),
}

/// On-disk manifest store with atomic writes.
#[derive(Debug, Clone)]
pub struct ManifestStore {
  path: PathBuf,
}

impl ManifestStore {
  pub fn new(path: PathBuf) -> Self {
    Self { path }
  }

  pub fn path(&self) -> &PathBuf {
    &self.path
  }

  /// Load the manifest. Returns an empty manifest if the file does not
  /// exist yet.
  pub fn load(&self) -> Result<DeploymentManifest, ManifestError> {
    let content = match std::fs::read_to_string(&self.path) {
      Ok(content) => content,
      Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(DeploymentManifest::default()),
      Err(e) => return Err(ManifestError::Read(e)),
    };
    serde_json::from_str(&content).map_err(ManifestError::Parse)
  }

  /// Save the manifest atomically (write to temp, then rename).
  pub fn save(&self, manifest: &DeploymentManifest) -> Result<(), ManifestError> {
    if let Some(parent) = self.path.parent() {
      std::fs::create_dir_all(parent).map_err(ManifestError::CreateDir)?;
    }

    let temp_path = self.path.with_extension("json.tmp");
    let content = serde_json::to_string_pretty(manifest).map_err(ManifestError::Serialize)?;
    std::fs::write(&temp_path, &content).map_err(ManifestError::Write)?;
    std::fs::rename(&temp_path, &self.path).map_err(ManifestError::Write)?;

    Ok(())
  }
}

/// Current unix timestamp in seconds.
pub fn unix_now() -> u64 {
  SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_secs()).unwrap_or(0)
}
