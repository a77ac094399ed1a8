//! Compiled artifacts and ABI-checked operation descriptors.
//!
//! An [`ArtifactSet`] is the read-only output of the external compile step:
//! one [`CompiledArtifact`] (ABI + creation bytecode) per source identifier.
//! Operations against a contract are built through [`Op::new`], which checks
//! the method name and argument count against the ABI up front instead of
//! failing at call time with an opaque chain error.

use std::collections::BTreeMap;
use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::value::Value;

/// A single parameter in an ABI entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AbiParam {
  #[serde(default)]
  pub name: String,
  #[serde(rename = "type")]
  pub kind: String,
}

/// One entry of a contract ABI (function, constructor, event, ...).
///
/// Mirrors the compiler's JSON ABI format so artifact files can be consumed
/// directly. Only `function` and `constructor` entries matter to the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AbiEntry {
  #[serde(rename = "type")]
  pub kind: String,
  #[serde(default)]
  pub name: String,
  #[serde(default)]
  pub inputs: Vec<AbiParam>,
  #[serde(default)]
  pub outputs: Vec<AbiParam>,
  #[serde(default, rename = "stateMutability", skip_serializing_if = "Option::is_none")]
  pub state_mutability: Option<String>,
}

/// A contract's application binary interface.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Abi(pub Vec<AbiEntry>);

impl Abi {
  /// Look up a function entry by name.
  pub fn function(&self, name: &str) -> Option<&AbiEntry> {
    self.0.iter().find(|e| e.kind == "function" && e.name == name)
  }

  /// The constructor entry, if the contract declares one.
  pub fn constructor(&self) -> Option<&AbiEntry> {
    self.0.iter().find(|e| e.kind == "constructor")
  }
}

/// Errors from resolving an operation against an ABI.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AbiError {
  #[error("contract has no function '{method}'")]
  UnknownFunction { method: String },

  #[error("function '{method}' takes {expected} argument(s), got {got}")]
  ArityMismatch {
    method: String,
    expected: usize,
    got: usize,
  },
}

/// A read or write operation resolved against a target's ABI.
///
/// Construction validates the method exists and the argument count matches,
/// so a mistyped wiring plan fails before any chain call is made.
#[derive(Debug, Clone, PartialEq)]
pub struct Op {
  pub method: String,
  pub args: Vec<Value>,
}

impl Op {
  /// Build an operation, checking `method` and arity against `abi`.
  pub fn new(abi: &Abi, method: &str, args: Vec<Value>) -> Result<Self, AbiError> {
    let entry = abi.function(method).ok_or_else(|| AbiError::UnknownFunction {
      method: method.to_string(),
    })?;

    if entry.inputs.len() != args.len() {
      return Err(AbiError::ArityMismatch {
        method: method.to_string(),
        expected: entry.inputs.len(),
        got: args.len(),
      });
    }

    Ok(Op {
      method: method.to_string(),
      args,
    })
  }

  /// Render as `method(arg, arg)` for action descriptions and logs.
  pub fn describe(&self) -> String {
    let args: Vec<String> = self.args.iter().map(Value::render).collect();
    format!("{}({})", self.method, args.join(", "))
  }
}

/// ABI plus creation bytecode for one compiled source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompiledArtifact {
  pub abi: Abi,
  /// Creation bytecode as a hex string, possibly containing unresolved
  /// library placeholders.
  pub bytecode: String,
}

/// Errors from loading an artifact file.
#[derive(Debug, Error)]
pub enum ArtifactError {
  #[error("failed to read artifact file: {0}")]
  Read(#[source] io::Error),

  #[error("failed to parse artifact file: {0}")]
  Parse(#[source] serde_json::Error),
}

/// All compiled artifacts for a run, keyed by source identifier.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArtifactSet(pub BTreeMap<String, CompiledArtifact>);

impl ArtifactSet {
  /// Load an artifact set from a JSON file.
  pub fn load(path: &Path) -> Result<Self, ArtifactError> {
    let content = std::fs::read_to_string(path).map_err(ArtifactError::Read)?;
    serde_json::from_str(&content).map_err(ArtifactError::Parse)
  }

  pub fn get(&self, source: &str) -> Option<&CompiledArtifact> {
    self.0.get(source)
  }

  pub fn insert(&mut self, source: impl Into<String>, artifact: CompiledArtifact) {
    self.0.insert(source.into(), artifact);
  }
}
