//! The narrow interface to the chain.
//!
//! The engine never talks to a node directly; everything goes through
//! [`ChainClient`]. The trait is deliberately small: deploy a contract,
//! read a view, send a state-changing call. Network transport, signing and
//! account management live behind the implementation ([`crate::rpc`] for a
//! real node gateway, `testutil::MockChain` for tests).

use thiserror::Error;

use crate::artifact::Abi;
use crate::value::{Address, TxnRef, Value};

/// Result of a successful contract deployment.
#[derive(Debug, Clone, PartialEq)]
pub struct Deployment {
  pub address: Address,
  pub txn: TxnRef,
}

/// Errors surfaced by a chain client.
///
/// Chain failures are never retried by the engine; re-submitting a failed
/// contract creation risks duplicate on-chain state. The operator decides
/// whether to re-run, which is safe because of the manifest and the
/// reconciler's idempotence.
#[derive(Debug, Error)]
pub enum ChainError {
  #[error("deployment of '{source_id}' failed: {message}")]
  DeployFailed { source_id: String, message: String },

  #[error("call to {method} on {address} failed: {message}")]
  CallFailed {
    address: Address,
    method: String,
    message: String,
  },

  #[error("transaction {method} on {address} failed: {message}")]
  SendFailed {
    address: Address,
    method: String,
    message: String,
  },

  #[error("gateway error: {0}")]
  Gateway(String),
}

/// Blocking-from-the-engine's-perspective chain operations.
///
/// Every method is a suspension point; the orchestrator awaits each call
/// before issuing the next, so there is never more than one chain call in
/// flight.
#[allow(async_fn_in_trait)]
pub trait ChainClient {
  /// Submit a contract creation. `bytecode` is fully linked hex.
  async fn deploy(&self, source: &str, abi: &Abi, bytecode: &str, args: &[Value]) -> Result<Deployment, ChainError>;

  /// Invoke a read-only method.
  async fn call(&self, address: &Address, abi: &Abi, method: &str, args: &[Value]) -> Result<Value, ChainError>;

  /// Submit a state-changing method call signed by this client's account.
  async fn send(&self, address: &Address, abi: &Abi, method: &str, args: &[Value]) -> Result<TxnRef, ChainError>;

  /// The account this client signs with.
  fn account(&self) -> &Address;
}
