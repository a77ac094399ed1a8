//! The step reconciler: converge on-chain state, write only on drift.
//!
//! A [`Step`] bundles a read predicate and the write that satisfies it.
//! Reconciling a step:
//!
//! 1. runs the read; if the result already matches the expected value the
//!    step is skipped,
//! 2. checks the target's `owner()`; if the running account owns the
//!    contract the write is sent,
//! 3. otherwise the intended call is appended to the owner action queue,
//!    or, with no queue configured, the operator is asked via [`Confirm`]
//!    to perform it out-of-band; declining cancels the run cleanly.
//!
//! Every outcome leaves the step safe to re-run: a satisfied read skips, a
//! repeated queue append overwrites by key.

use std::io;

use thiserror::Error;
use tracing::{info, warn};

use crate::artifact::{Abi, Op};
use crate::chain::{ChainClient, ChainError};
use crate::confirm::Confirm;
use crate::queue::{OwnerAction, OwnerActionQueue, QueueError, QueueStore};
use crate::value::{Address, TxnRef, Value};

/// One reconciliation step, fully resolved against a live component.
#[derive(Debug, Clone)]
pub struct Step {
  /// Component name, used in logs and queue keys.
  pub component: String,
  pub target: Address,
  pub abi: Abi,
  /// Read predicate. `None` makes the write unconditional.
  pub read: Option<Op>,
  /// Expected read result; the step skips when the read matches.
  pub expected: Option<Value>,
  pub write: Op,
}

impl Step {
  /// Stable queue/report key: `Component.method(arg, arg)`.
  pub fn key(&self) -> String {
    format!("{}.{}", self.component, self.write.describe())
  }
}

/// What reconciling one step did.
#[derive(Debug, Clone, PartialEq)]
pub enum StepOutcome {
  /// The read already matched; nothing sent.
  Skipped,
  /// The write was sent by this account.
  Applied(TxnRef),
  /// The write was appended to the owner action queue.
  Queued,
  /// Another account owns the target and no queue is configured; the
  /// operator must perform the write by hand.
  AwaitingManual,
  /// The operator declined the write at the confirmation prompt.
  Declined,
}

/// Errors from reconciling a step.
#[derive(Debug, Error)]
pub enum ReconcileError {
  #[error(transparent)]
  Chain(#[from] ChainError),

  #[error(transparent)]
  Queue(#[from] QueueError),

  #[error("confirmation prompt failed: {0}")]
  Confirm(#[source] io::Error),
}

/// Reconciles steps against one chain, one queue, one confirmation policy.
pub struct Reconciler<'a, C: ChainClient, K: Confirm> {
  chain: &'a C,
  confirm: &'a K,
  queue: Option<(&'a QueueStore, OwnerActionQueue)>,
  explorer: Option<String>,
}

impl<'a, C: ChainClient, K: Confirm> Reconciler<'a, C, K> {
  /// Build a reconciler. With a queue store, owner-gated writes are queued
  /// there; without one they are reported as awaiting manual execution.
  pub fn new(
    chain: &'a C,
    confirm: &'a K,
    queue_store: Option<&'a QueueStore>,
    explorer: Option<String>,
  ) -> Result<Self, QueueError> {
    let queue = match queue_store {
      Some(store) => Some((store, store.load()?)),
      None => None,
    };
    Ok(Self {
      chain,
      confirm,
      queue,
      explorer,
    })
  }

  /// The queue as accumulated so far this run.
  pub fn queue(&self) -> Option<&OwnerActionQueue> {
    self.queue.as_ref().map(|(_, q)| q)
  }

  /// Reconcile one step.
  pub async fn reconcile(&mut self, step: &Step) -> Result<StepOutcome, ReconcileError> {
    if let Some(read) = &step.read {
      let current = self.chain.call(&step.target, &step.abi, &read.method, &read.args).await?;
      if let Some(expected) = &step.expected {
        if &current == expected {
          info!(step = %step.key(), "already satisfied, skipping");
          return Ok(StepOutcome::Skipped);
        }
      }
    }

    let description = step.key();
    let owner = self.chain.call(&step.target, &step.abi, "owner", &[]).await?;
    if owner == Value::Address(self.chain.account().clone()) {
      let txn = self
        .chain
        .send(&step.target, &step.abi, &step.write.method, &step.write.args)
        .await?;
      info!(step = %description, txn = %txn.0, "applied");
      return Ok(StepOutcome::Applied(txn));
    }

    match &mut self.queue {
      Some((store, queue)) => {
        let action = OwnerAction {
          target: step.target.clone(),
          action: step.write.describe(),
          complete: false,
          link: match &self.explorer {
            Some(prefix) => format!("{}/address/{}#writeContract", prefix, step.target),
            None => String::new(),
          },
        };
        store.append(queue, description, action)?;
        Ok(StepOutcome::Queued)
      }
      None => {
        warn!(
          step = %description,
          target = %step.target,
          "target is owned by another account; this call must be made by the owner"
        );
        let prompt = format!("Perform {} as the owner of {}, then continue?", description, step.target);
        if self.confirm.confirm(&prompt).map_err(ReconcileError::Confirm)? {
          Ok(StepOutcome::AwaitingManual)
        } else {
          info!(step = %description, "declined, cancelling");
          Ok(StepOutcome::Declined)
        }
      }
    }
  }
}
