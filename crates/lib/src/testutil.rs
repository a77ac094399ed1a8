//! Test utilities for chainwright-lib.
//!
//! [`MockChain`] is an in-memory [`ChainClient`] with deterministic
//! addresses, per-contract owners, a simple storage map keyed by read
//! descriptions, and injectable deploy failures for crash-resume tests.

use std::collections::BTreeMap;
use std::sync::Mutex;

use crate::artifact::Abi;
use crate::chain::{ChainClient, ChainError, Deployment};
use crate::value::{Address, TxnRef, Value};

/// Storage key for a read: `method(arg, arg)`.
fn read_key(method: &str, args: &[Value]) -> String {
  let rendered: Vec<String> = args.iter().map(Value::render).collect();
  format!("{}({})", method, rendered.join(", "))
}

#[derive(Debug, Default)]
struct MockState {
  deploy_count: usize,
  fail_deploys_from: Option<usize>,
  deployed_sources: Vec<String>,
  deployed_bytecodes: Vec<String>,
  owners: BTreeMap<Address, Address>,
  storage: BTreeMap<(Address, String), Value>,
  writes: Vec<(Address, String, Vec<Value>)>,
}

/// An in-memory chain with just enough behavior for engine tests.
#[derive(Debug)]
pub struct MockChain {
  account: Address,
  state: Mutex<MockState>,
}

impl MockChain {
  pub fn new() -> Self {
    let account = Address::parse("0x00000000000000000000000000000000000000f0").unwrap();
    Self {
      account,
      state: Mutex::new(MockState::default()),
    }
  }

  /// Make every deploy starting from the `n`th (0-based) fail.
  pub fn fail_deploys_from(&self, n: usize) {
    self.state.lock().unwrap().fail_deploys_from = Some(n);
  }

  /// Clear an injected failure.
  pub fn clear_failures(&self) {
    self.state.lock().unwrap().fail_deploys_from = None;
  }

  /// Total deploys submitted successfully.
  pub fn deploy_count(&self) -> usize {
    self.state.lock().unwrap().deploy_count
  }

  /// Source ids of successful deploys, in order.
  pub fn deployed_sources(&self) -> Vec<String> {
    self.state.lock().unwrap().deployed_sources.clone()
  }

  /// Bytecode of successful deploys, in order, as submitted (post-linking).
  pub fn deployed_bytecodes(&self) -> Vec<String> {
    self.state.lock().unwrap().deployed_bytecodes.clone()
  }

  /// All state-changing sends, in order.
  pub fn writes(&self) -> Vec<(Address, String, Vec<Value>)> {
    self.state.lock().unwrap().writes.clone()
  }

  /// Override a contract's owner (new deployments are owned by the mock's
  /// own account).
  pub fn set_owner(&self, contract: &Address, owner: Address) {
    self.state.lock().unwrap().owners.insert(contract.clone(), owner);
  }

  /// Seed a read result directly.
  pub fn set_storage(&self, contract: &Address, method: &str, args: &[Value], value: Value) {
    self
      .state
      .lock()
      .unwrap()
      .storage
      .insert((contract.clone(), read_key(method, args)), value);
  }

  fn next_address(count: usize) -> Address {
    Address::parse(&format!("{:040x}", 0xaa00 + count as u64)).unwrap()
  }
}

impl Default for MockChain {
  fn default() -> Self {
    Self::new()
  }
}

impl ChainClient for MockChain {
  async fn deploy(&self, source: &str, _abi: &Abi, bytecode: &str, _args: &[Value]) -> Result<Deployment, ChainError> {
    let mut state = self.state.lock().unwrap();

    if let Some(from) = state.fail_deploys_from {
      if state.deploy_count >= from {
        return Err(ChainError::DeployFailed {
          source_id: source.to_string(),
          message: "injected failure".to_string(),
        });
      }
    }

    let address = Self::next_address(state.deploy_count);
    state.deploy_count += 1;
    state.deployed_sources.push(source.to_string());
    state.deployed_bytecodes.push(bytecode.to_string());
    state.owners.insert(address.clone(), self.account.clone());

    Ok(Deployment {
      txn: TxnRef(format!("0xtxn{}", state.deploy_count)),
      address,
    })
  }

  async fn call(&self, address: &Address, _abi: &Abi, method: &str, args: &[Value]) -> Result<Value, ChainError> {
    let state = self.state.lock().unwrap();

    if method == "owner" {
      if let Some(owner) = state.owners.get(address) {
        return Ok(Value::Address(owner.clone()));
      }
    }

    let key = (address.clone(), read_key(method, args));
    Ok(state.storage.get(&key).cloned().unwrap_or(Value::Str(String::new())))
  }

  async fn send(&self, address: &Address, _abi: &Abi, method: &str, args: &[Value]) -> Result<TxnRef, ChainError> {
    let mut state = self.state.lock().unwrap();
    state.writes.push((address.clone(), method.to_string(), args.to_vec()));

    // Setter convention: `setTarget(v)` seeds `target()`, and
    // `setBalanceOf(who, v)` seeds `balanceOf(who)`, so a later read sees
    // the value just written.
    if let Some(rest) = method.strip_prefix("set") {
      if !rest.is_empty() && !args.is_empty() {
        let mut getter = rest.to_string();
        getter[..1].make_ascii_lowercase();
        let (read_args, value) = args.split_at(args.len() - 1);
        let key = (address.clone(), read_key(&getter, read_args));
        state.storage.insert(key, value[0].clone());
      }
    }

    Ok(TxnRef(format!("0xwrite{}", state.writes.len())))
  }

  fn account(&self) -> &Address {
    &self.account
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[tokio::test]
  async fn deploy_assigns_distinct_addresses() {
    let chain = MockChain::new();
    let a = chain.deploy("A", &Abi::default(), "60", &[]).await.unwrap();
    let b = chain.deploy("B", &Abi::default(), "60", &[]).await.unwrap();
    assert_ne!(a.address, b.address);
    assert_eq!(chain.deploy_count(), 2);
  }

  #[tokio::test]
  async fn deployed_contracts_are_owned_by_account() {
    let chain = MockChain::new();
    let d = chain.deploy("A", &Abi::default(), "60", &[]).await.unwrap();

    let owner = chain.call(&d.address, &Abi::default(), "owner", &[]).await.unwrap();
    assert_eq!(owner, Value::Address(chain.account().clone()));
  }

  #[tokio::test]
  async fn setter_seeds_matching_getter() {
    let chain = MockChain::new();
    let d = chain.deploy("Proxy", &Abi::default(), "60", &[]).await.unwrap();
    let target = Value::address("0x00000000000000000000000000000000000000ab").unwrap();

    chain.send(&d.address, &Abi::default(), "setTarget", &[target.clone()]).await.unwrap();

    let read = chain.call(&d.address, &Abi::default(), "target", &[]).await.unwrap();
    assert_eq!(read, target);
  }

  #[tokio::test]
  async fn injected_failure_fires_at_index() {
    let chain = MockChain::new();
    chain.fail_deploys_from(1);

    assert!(chain.deploy("A", &Abi::default(), "60", &[]).await.is_ok());
    assert!(chain.deploy("B", &Abi::default(), "60", &[]).await.is_err());

    chain.clear_failures();
    assert!(chain.deploy("B", &Abi::default(), "60", &[]).await.is_ok());
  }
}
