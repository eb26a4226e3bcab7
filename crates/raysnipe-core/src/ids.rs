//! Opaque on-chain identifiers.
//!
//! Mints, vaults and wallets are all carried as base58 strings; nothing in
//! the monitoring path needs to decode them, and the RPC wire format takes
//! them verbatim.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Ledger slot, used as a logical clock for synchronizing the two vault
/// notification streams.
pub type Slot = u64;

/// A base58 account address (mint, vault, pool or wallet).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Address(String);

impl Address {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Address {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for Address {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// A base58 transaction signature.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TxSignature(String);

impl TxSignature {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TxSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for TxSignature {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for TxSignature {
    fn from(value: String) -> Self {
        Self(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_roundtrip() {
        let addr = Address::new("So11111111111111111111111111111111111111112");
        assert_eq!(addr.as_str(), "So11111111111111111111111111111111111111112");
        assert_eq!(addr.to_string(), addr.as_str());
    }

    #[test]
    fn test_address_serde_transparent() {
        let addr = Address::new("FvHwEZGVUW2VfYwTJ26boywb8ES216DC4sJgJbfJZqLM");
        let json = serde_json::to_string(&addr).unwrap();
        assert_eq!(json, "\"FvHwEZGVUW2VfYwTJ26boywb8ES216DC4sJgJbfJZqLM\"");

        let back: Address = serde_json::from_str(&json).unwrap();
        assert_eq!(back, addr);
    }
}
