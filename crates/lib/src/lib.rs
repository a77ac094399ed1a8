//! chainwright-lib: core engine for contract deployment and reconciliation
//!
//! The engine takes a declared plan of on-chain components and converges a
//! network toward it:
//! - `deploy`: materializes each component, deploying fresh or reusing the
//!   recorded address, with shared-library linking
//! - `reconcile`: applies wiring steps idempotently, writing only on drift
//!   and deferring owner-gated writes to a durable queue
//! - `manifest` / `queue`: the two durable stores that survive across runs
//! - `orchestrate`: drives one full run over a plan

pub mod artifact;
pub mod chain;
pub mod confirm;
pub mod deploy;
pub mod linker;
pub mod manifest;
pub mod orchestrate;
pub mod plan;
pub mod queue;
pub mod reconcile;
pub mod rpc;
#[cfg(test)]
pub mod testutil;
pub mod value;
