use candid::{CandidType, Deserialize, Principal};
use serde::Serialize;
use std::collections::BTreeMap;

use crate::types::VaultError;

// =============================================================================
// CONSTANTS
// =============================================================================

/// Flat reward paid on withdrawal: 10% of the withdrawn amount, floor
/// division. No time weighting.
pub const REWARD_PERCENT: u64 = 10;

/// Reward for withdrawing `amount`, or `None` on overflow.
pub fn reward_for(amount: u64) -> Option<u64> {
    amount.checked_mul(REWARD_PERCENT).map(|scaled| scaled / 100)
}

// =============================================================================
// STAKE BOOK
// =============================================================================

/// Per-account staked balances. The staked tokens themselves sit in the
/// vault's own GreenToken balance as escrow; this book only records who
/// they belong to, so the sum of the book can never exceed the escrow.
#[derive(CandidType, Deserialize, Serialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct StakeBook {
    stakes: BTreeMap<Principal, u64>,
}

impl StakeBook {
    pub fn staked_balance(&self, account: Principal) -> u64 {
        self.stakes.get(&account).copied().unwrap_or(0)
    }

    pub fn total_staked(&self) -> u64 {
        // Each stake is backed 1:1 by escrowed tokens, so the sum fits u64
        // as long as the token supply does.
        self.stakes.values().sum()
    }

    /// Projected staked balance after adding `amount`, validated before any
    /// tokens move.
    pub fn projected_stake(&self, account: Principal, amount: u64) -> Result<u64, VaultError> {
        self.staked_balance(account)
            .checked_add(amount)
            .ok_or_else(|| VaultError::InvalidAmount {
                reason: "staked balance overflow".to_string(),
            })
    }

    /// Remaining staked balance after withdrawing `amount`, validated
    /// before any tokens move.
    pub fn projected_withdrawal(
        &self,
        account: Principal,
        amount: u64,
    ) -> Result<u64, VaultError> {
        let staked = self.staked_balance(account);
        if staked < amount {
            return Err(VaultError::InsufficientBalance {
                account,
                staked,
                requested: amount,
            });
        }
        Ok(staked - amount)
    }

    /// Overwrite an account's staked balance (commit or rollback of a
    /// previously projected value).
    pub fn set_stake(&mut self, account: Principal, amount: u64) {
        if amount == 0 {
            self.stakes.remove(&account);
        } else {
            self.stakes.insert(account, amount);
        }
    }
}
