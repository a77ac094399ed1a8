//! The owner action queue: privileged writes the run could not perform.
//!
//! When a reconciliation step needs a write that only the contract owner can
//! make, and the running account is not that owner, the intended write is
//! appended here instead of attempted. A separate privileged operator works
//! through the queue later and marks entries complete out-of-band; this
//! engine only ever appends.
//!
//! Appends are idempotent by key (last write wins) and the whole queue is
//! persisted synchronously before `append` returns, so a queued action
//! survives a crash and repeated runs do not duplicate entries.

use std::collections::BTreeMap;
use std::io;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::value::Address;

/// One deferred privileged write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OwnerAction {
  /// Target contract address.
  pub target: Address,
  /// Human-readable call description, e.g. `setTarget(0xabc...)`.
  pub action: String,
  /// Set by the privileged operator once performed; never by this engine.
  pub complete: bool,
  /// Block-explorer link to the target's write interface.
  pub link: String,
}

/// The queue: ordered map from stable key to action.
///
/// The key combines contract and operation (`FeePool.setTarget(0x...)`), so
/// re-running against the same pending action overwrites rather than
/// duplicates.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OwnerActionQueue(pub BTreeMap<String, OwnerAction>);

impl OwnerActionQueue {
  /// Actions not yet marked complete.
  pub fn pending(&self) -> impl Iterator<Item = (&String, &OwnerAction)> {
    self.0.iter().filter(|(_, a)| !a.complete)
  }

  pub fn len(&self) -> usize {
    self.0.len()
  }

  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }
}

/// Errors from queue persistence.
#[derive(Debug, Error)]
pub enum QueueError {
  #[error("failed to create queue directory: {0}")]
  CreateDir(#[source] io::Error),

  #[error("failed to read owner action queue: {0}")]
  Read(#[source] io::Error),

  #[error("failed to write owner action queue: {0}")]
  Write(#[source] io::Error),

  #[error("failed to parse owner action queue: {0}")]
  Parse(#[source] serde_json::Error),

  #[error("failed to serialize owner action queue: {0}")]
  Serialize(#[source] serde_json::Error),
}

/// On-disk queue store with atomic writes.
#[derive(Debug, Clone)]
pub struct QueueStore {
  path: PathBuf,
}

impl QueueStore {
  pub fn new(path: PathBuf) -> Self {
    Self { path }
  }

  pub fn path(&self) -> &PathBuf {
    &self.path
  }

  /// Load the queue. Returns an empty queue if the file does not exist.
  pub fn load(&self) -> Result<OwnerActionQueue, QueueError> {
    let content = match std::fs::read_to_string(&self.path) {
      Ok(content) => content,
      Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(OwnerActionQueue::default()),
      Err(e) => return Err(QueueError::Read(e)),
    };
    serde_json::from_str(&content).map_err(QueueError::Parse)
  }

  /// Save the queue atomically.
  pub fn save(&self, queue: &OwnerActionQueue) -> Result<(), QueueError> {
    if let Some(parent) = self.path.parent() {
      std::fs::create_dir_all(parent).map_err(QueueError::CreateDir)?;
    }

    let temp_path = self.path.with_extension("json.tmp");
    let content = serde_json::to_string_pretty(queue).map_err(QueueError::Serialize)?;
    std::fs::write(&temp_path, &content).map_err(QueueError::Write)?;
    std::fs::rename(&temp_path, &self.path).map_err(QueueError::Write)?;

    Ok(())
  }

  /// Append an action under `key`, replacing any prior entry with the same
  /// key, and persist before returning.
  pub fn append(&self, queue: &mut OwnerActionQueue, key: String, action: OwnerAction) -> Result<(), QueueError> {
    info!(key = %key, target = %action.target, "queued owner action");
    queue.0.insert(key, action);
    self.save(queue)
  }
}
