//! In-memory duplicate-token ledger.
//!
//! Records every token that reached the gate so returning names and
//! creators can be blocked within a process run. Keyed by mint; name and
//! creator lookups scan, which is fine at sniping rates.

use chrono::{DateTime, Utc};
use dashmap::DashMap;

#[derive(Debug, Clone)]
pub struct TokenRecord {
    pub mint: String,
    pub name: String,
    pub creator: String,
    pub seen_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
pub struct TokenLedger {
    inner: DashMap<String, TokenRecord>,
}

impl TokenLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a token. Returns false when the mint was already known.
    pub fn register(&self, mint: &str, name: &str, creator: &str) -> bool {
        if self.inner.contains_key(mint) {
            return false;
        }

        self.inner.insert(
            mint.to_string(),
            TokenRecord {
                mint: mint.to_string(),
                name: name.to_string(),
                creator: creator.to_string(),
                seen_at: Utc::now(),
            },
        );
        true
    }

    /// Has a different mint with this name been seen before?
    pub fn name_seen(&self, name: &str, mint: &str) -> bool {
        self.inner
            .iter()
            .any(|r| r.value().name == name && r.value().mint != mint)
    }

    /// Has a different mint from this creator been seen before?
    pub fn creator_seen(&self, creator: &str, mint: &str) -> bool {
        self.inner
            .iter()
            .any(|r| r.value().creator == creator && r.value().mint != mint)
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_and_lookup() {
        let ledger = TokenLedger::new();

        assert!(ledger.register("mint1", "Dog Of Bonk", "creatorA"));
        assert!(!ledger.register("mint1", "Dog Of Bonk", "creatorA"));
        assert_eq!(ledger.len(), 1);

        // Same token is not its own duplicate.
        assert!(!ledger.name_seen("Dog Of Bonk", "mint1"));
        assert!(!ledger.creator_seen("creatorA", "mint1"));

        // A second mint reusing the name or creator is.
        assert!(ledger.name_seen("Dog Of Bonk", "mint2"));
        assert!(ledger.creator_seen("creatorA", "mint2"));
        assert!(!ledger.name_seen("Other Token", "mint2"));
    }
}
