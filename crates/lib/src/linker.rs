//! Library linking: rewriting bytecode placeholders with deployed addresses.
//!
//! Compiled bytecode that calls into a shared library carries a 40-character
//! placeholder (`__LibName_____...`) where the library address belongs. As
//! library components are deployed their addresses accumulate in a
//! [`LinkTable`], and every later deployable bytecode is linked against the
//! whole table speculatively: bytecode with no matching placeholder passes
//! through unchanged, never an error.

use std::collections::BTreeMap;

use crate::value::Address;

/// Placeholder width in the hex bytecode (one 20-byte address).
const PLACEHOLDER_LEN: usize = 40;

/// The placeholder string the compiler emits for a library name:
/// `__` + name (truncated to 36 bytes) + `_` padding to 40 bytes.
pub fn placeholder(name: &str) -> String {
  let mut s = String::with_capacity(PLACEHOLDER_LEN);
  s.push_str("__");
  // Truncation counts bytes but must land on a char boundary.
  for ch in name.chars() {
    if s.len() + ch.len_utf8() > 2 + (PLACEHOLDER_LEN - 4) {
      break;
    }
    s.push(ch);
  }
  while s.len() < PLACEHOLDER_LEN {
    s.push('_');
  }
  s
}

/// Run-scoped map from library component name to deployed address.
#[derive(Debug, Clone, Default)]
pub struct LinkTable(BTreeMap<String, Address>);

impl LinkTable {
  pub fn new() -> Self {
    Self::default()
  }

  /// Register a deployed library.
  pub fn insert(&mut self, name: impl Into<String>, address: Address) {
    self.0.insert(name.into(), address);
  }

  pub fn get(&self, name: &str) -> Option<&Address> {
    self.0.get(name)
  }

  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }

  /// Rewrite every known library placeholder in `bytecode`.
  ///
  /// The substituted address is the bare 40-char hex form; prefix bytes
  /// would corrupt the surrounding opcodes.
  pub fn link(&self, bytecode: &str) -> String {
    let mut linked = bytecode.to_string();
    for (name, address) in &self.0 {
      let pattern = placeholder(name);
      if linked.contains(&pattern) {
        linked = linked.replace(&pattern, address.bare_hex());
      }
    }
    linked
  }
}
