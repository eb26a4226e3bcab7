//! The open position and its per-vault reserve observations.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use raysnipe_core::{Address, Price, Slot, TokenAmount};

/// The single currently-open trade.
///
/// Created by the lifecycle controller immediately after a confirmed entry
/// swap and discarded when the monitor terminates. All cost-basis fields are
/// fixed at creation; partial exits are not supported, so `token_balance`
/// never changes.
#[derive(Debug, Clone)]
pub struct Position {
    pub token_mint: Address,
    pub sol_mint: Address,
    /// Reserve vault holding the token side of the pool.
    pub token_vault: Address,
    /// Reserve vault holding the wrapped-SOL side of the pool.
    pub sol_vault: Address,
    /// Cost basis, USD per token.
    pub entry_price_usd: Price,
    /// Quantity acquired at entry, UI units.
    pub token_balance: TokenAmount,
    /// Same quantity in raw base units, used for the exit swap amount and
    /// the exit-time balance check.
    pub token_balance_raw: u128,
    /// SOL spent at entry.
    pub sol_paid: Decimal,
    /// USD value of the SOL spent at entry.
    pub sol_paid_usd: Decimal,
    pub entry_timestamp: DateTime<Utc>,
}

/// Which side of the pool a vault holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VaultRole {
    Token,
    Sol,
}

impl VaultRole {
    fn index(self) -> usize {
        match self {
            VaultRole::Token => 0,
            VaultRole::Sol => 1,
        }
    }
}

impl std::fmt::Display for VaultRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VaultRole::Token => write!(f, "token"),
            VaultRole::Sol => write!(f, "sol"),
        }
    }
}

/// A point-in-time reserve reading for one vault.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VaultObservation {
    /// Raw reserve amount in base units.
    pub reserve: u128,
    /// Slot the reserve was observed at; the seed reads pin this to 0.
    pub slot: Slot,
}

/// Per-vault observation slots with the synchronization predicate.
///
/// The two vault notification streams are not ordered relative to each
/// other, so each observation is overwritten in place as fresher readings
/// arrive and a PnL computation is valid only at a slot both vaults have
/// reported — see [`ReservePair::synchronized_slot`].
#[derive(Debug, Default)]
pub struct ReservePair {
    observations: [Option<VaultObservation>; 2],
    last_processed: Slot,
}

impl ReservePair {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite the observation for one vault role. Observations are never
    /// merged or averaged; the latest reading wins.
    pub fn record(&mut self, role: VaultRole, observation: VaultObservation) {
        self.observations[role.index()] = Some(observation);
    }

    pub fn observation(&self, role: VaultRole) -> Option<VaultObservation> {
        self.observations[role.index()]
    }

    /// The slot at which both vaults agree, if it has not been processed yet.
    ///
    /// Returns `Some(slot)` iff both roles have reported, their slots are
    /// equal, and that slot is strictly newer than the last processed one.
    /// The strict comparison makes the seeded slot-0 observations, and any
    /// late-arriving notification for an already-processed slot, ineligible.
    pub fn synchronized_slot(&self) -> Option<Slot> {
        let token = self.observation(VaultRole::Token)?;
        let sol = self.observation(VaultRole::Sol)?;

        if token.slot == sol.slot && token.slot > self.last_processed {
            Some(token.slot)
        } else {
            None
        }
    }

    /// Record that a synchronized slot has been handled; older or equal
    /// slots will no longer synchronize.
    pub fn mark_processed(&mut self, slot: Slot) {
        self.last_processed = slot;
    }

    pub fn last_processed(&self) -> Slot {
        self.last_processed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn obs(reserve: u128, slot: Slot) -> VaultObservation {
        VaultObservation { reserve, slot }
    }

    #[test]
    fn test_empty_pair_never_synchronizes() {
        let pair = ReservePair::new();
        assert_eq!(pair.synchronized_slot(), None);
    }

    #[test]
    fn test_single_side_never_synchronizes() {
        let mut pair = ReservePair::new();
        pair.record(VaultRole::Token, obs(1_000_000, 5));
        assert_eq!(pair.synchronized_slot(), None);
    }

    #[test]
    fn test_seed_slot_zero_is_not_eligible() {
        let mut pair = ReservePair::new();
        pair.record(VaultRole::Token, obs(1_000_000, 0));
        pair.record(VaultRole::Sol, obs(2_000_000_000, 0));

        // Both sides agree on slot 0, but 0 is not newer than the initial
        // last-processed slot, so the seeded baseline cannot trigger.
        assert_eq!(pair.synchronized_slot(), None);
    }

    #[test]
    fn test_join_sequence_synchronizes_once() {
        let mut pair = ReservePair::new();

        pair.record(VaultRole::Token, obs(1_000_000, 5));
        assert_eq!(pair.synchronized_slot(), None);

        pair.record(VaultRole::Sol, obs(2_000_000_000, 4));
        assert_eq!(pair.synchronized_slot(), None);

        pair.record(VaultRole::Sol, obs(2_000_000_000, 5));
        assert_eq!(pair.synchronized_slot(), Some(5));

        pair.mark_processed(5);
        assert_eq!(pair.synchronized_slot(), None);
    }

    #[test]
    fn test_stale_slot_is_ignored_after_processing() {
        let mut pair = ReservePair::new();
        pair.record(VaultRole::Token, obs(1_000_000, 5));
        pair.record(VaultRole::Sol, obs(2_000_000_000, 5));
        pair.mark_processed(5);

        // A late notification pair at slot 3 agrees, but is older than the
        // last processed slot.
        pair.record(VaultRole::Token, obs(900_000, 3));
        pair.record(VaultRole::Sol, obs(2_100_000_000, 3));
        assert_eq!(pair.synchronized_slot(), None);
        assert_eq!(pair.last_processed(), 5);
    }

    #[test]
    fn test_overwrite_keeps_latest_reading() {
        let mut pair = ReservePair::new();
        pair.record(VaultRole::Sol, obs(2_000_000_000, 4));
        pair.record(VaultRole::Sol, obs(1_500_000_000, 6));

        let sol = pair.observation(VaultRole::Sol).unwrap();
        assert_eq!(sol.reserve, 1_500_000_000);
        assert_eq!(sol.slot, 6);
    }
}
