//! Address and runtime value types.
//!
//! Everything the engine reads from or writes to the chain passes through
//! [`Value`]. Comparison is by normalized representation: addresses compare
//! value-wise regardless of prefix or hex case, and numeric strings compare
//! as numbers. This is what lets the reconciler decide "already in the
//! desired state" without being fooled by formatting differences.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from parsing an address string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressError {
  #[error("address has invalid length {0} (expected 40 hex chars)")]
  InvalidLength(usize),

  #[error("address contains non-hex characters: {0}")]
  InvalidHex(String),
}

/// A chain account or contract address.
///
/// Stored normalized: lowercase, 40 hex characters, no prefix. Both the
/// `0x` prefix and the hex network-byte prefix `41` used by some chains
/// are accepted and stripped on parse, so equality is always value-wise.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address(String);

impl Address {
  /// The all-zero address, used for not-yet-wired constructor slots.
  pub const ZERO: &'static str = "0000000000000000000000000000000000000000";

  /// Parse an address, accepting `0x`/`41` prefixes and mixed case.
  pub fn parse(input: &str) -> Result<Self, AddressError> {
    let s = input.trim();
    let bare = if let Some(rest) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
      rest
    } else if s.len() == 42 && s.starts_with("41") {
      // 21-byte hex form with a network prefix byte
      &s[2..]
    } else {
      s
    };

    if bare.len() != 40 {
      return Err(AddressError::InvalidLength(bare.len()));
    }
    if hex::decode(bare).is_err() {
      return Err(AddressError::InvalidHex(bare.to_string()));
    }

    Ok(Address(bare.to_ascii_lowercase()))
  }

  /// The all-zero address.
  pub fn zero() -> Self {
    Address(Self::ZERO.to_string())
  }

  /// The bare 40-char lowercase hex form, no prefix.
  pub fn bare_hex(&self) -> &str {
    &self.0
  }

  /// The conventional `0x`-prefixed form.
  pub fn to_prefixed(&self) -> String {
    format!("0x{}", self.0)
  }
}

impl std::fmt::Display for Address {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "0x{}", self.0)
  }
}

impl TryFrom<String> for Address {
  type Error = AddressError;

  fn try_from(value: String) -> Result<Self, Self::Error> {
    Address::parse(&value)
  }
}

impl From<Address> for String {
  fn from(addr: Address) -> String {
    addr.to_prefixed()
  }
}

/// A transaction reference (hash or id) returned by the chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxnRef(pub String);

impl std::fmt::Display for TxnRef {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}", self.0)
  }
}

/// A runtime value: constructor argument, call result, or write argument.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Value {
  Address(Address),
  Uint(u128),
  Bool(bool),
  Str(String),
  Bytes(Vec<u8>),
}

impl Value {
  /// Parse a string into an address value.
  pub fn address(input: &str) -> Result<Self, AddressError> {
    Ok(Value::Address(Address::parse(input)?))
  }

  /// The canonical form used for comparison.
  fn canonical(&self) -> Canonical<'_> {
    match self {
      Value::Address(a) => Canonical::Addr(a.bare_hex()),
      Value::Uint(u) => Canonical::Num(*u),
      Value::Bool(b) => Canonical::Bool(*b),
      Value::Bytes(b) => Canonical::Bytes(b),
      Value::Str(s) => {
        if let Ok(addr) = Address::parse(s) {
          return Canonical::OwnedAddr(addr.bare_hex().to_string());
        }
        if let Some(n) = parse_uint(s) {
          return Canonical::Num(n);
        }
        Canonical::Text(s)
      }
    }
  }

  /// Render the value the way it appears in action descriptions and logs.
  pub fn render(&self) -> String {
    match self {
      Value::Address(a) => a.to_string(),
      Value::Uint(u) => u.to_string(),
      Value::Bool(b) => b.to_string(),
      Value::Str(s) => s.clone(),
      Value::Bytes(b) => format!("0x{}", hex::encode(b)),
    }
  }
}

/// Canonical comparison form. String values that look like addresses or
/// numbers collapse into those forms, so `"0xAB.." == Address` and
/// `"100" == Uint(100)` hold.
enum Canonical<'a> {
  Addr(&'a str),
  OwnedAddr(String),
  Num(u128),
  Bool(bool),
  Text(&'a str),
  Bytes(&'a [u8]),
}

impl PartialEq for Value {
  fn eq(&self, other: &Self) -> bool {
    use Canonical::*;
    match (self.canonical(), other.canonical()) {
      (Addr(a), Addr(b)) => a == b,
      (Addr(a), OwnedAddr(b)) | (OwnedAddr(b), Addr(a)) => a == b,
      (OwnedAddr(a), OwnedAddr(b)) => a == b,
      (Num(a), Num(b)) => a == b,
      (Bool(a), Bool(b)) => a == b,
      (Text(a), Text(b)) => a == b,
      (Bytes(a), Bytes(b)) => a == b,
      _ => false,
    }
  }
}

impl Eq for Value {}

impl From<Address> for Value {
  fn from(addr: Address) -> Self {
    Value::Address(addr)
  }
}

/// Parse a decimal or `0x`-hex unsigned integer string.
fn parse_uint(s: &str) -> Option<u128> {
  if let Some(hexpart) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
    return u128::from_str_radix(hexpart, 16).ok();
  }
  if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
    return None;
  }
  s.parse().ok()
}
