use candid::{CandidType, Deserialize, Principal};
use serde::Serialize;
use std::collections::BTreeMap;

use crate::roles::{Role, RoleRegistry};
use crate::types::TokenError;

// =============================================================================
// LEDGER STATE MACHINE
// =============================================================================

/// The GREEN fungible ledger: balances, allowances and total supply, with
/// mint/burn gated by the embedded role registry.
///
/// Invariant: after every operation, the sum of all balances equals
/// `total_supply`. Arithmetic is checked; underflow fails instead of
/// wrapping.
#[derive(CandidType, Deserialize, Serialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct Ledger {
    total_supply: u64,
    balances: BTreeMap<Principal, u64>,
    allowances: BTreeMap<(Principal, Principal), u64>,
    roles: RoleRegistry,
}

impl Ledger {
    /// Fresh ledger with `installer` as the sole admin and zero supply.
    pub fn new(installer: Principal) -> Self {
        Ledger {
            roles: RoleRegistry::bootstrap(installer),
            ..Default::default()
        }
    }

    // =========================================================================
    // QUERIES
    // =========================================================================

    pub fn balance_of(&self, account: Principal) -> u64 {
        self.balances.get(&account).copied().unwrap_or(0)
    }

    pub fn allowance(&self, owner: Principal, spender: Principal) -> u64 {
        self.allowances.get(&(owner, spender)).copied().unwrap_or(0)
    }

    pub fn total_supply(&self) -> u64 {
        self.total_supply
    }

    pub fn has_role(&self, role: Role, account: Principal) -> bool {
        self.roles.has_role(role, account)
    }

    /// Re-sum every balance against the recorded supply.
    pub fn audit_supply(&self) -> Result<String, String> {
        let sum: u128 = self.balances.values().map(|b| *b as u128).sum();
        if sum == self.total_supply as u128 {
            Ok(format!(
                "✅ Audit passed: {} GREEN across {} accounts",
                self.total_supply,
                self.balances.len()
            ))
        } else {
            Err(format!(
                "❌ Audit FAILED: balances sum to {} but total supply is {}",
                sum, self.total_supply
            ))
        }
    }

    // =========================================================================
    // ROLE ADMINISTRATION
    // =========================================================================

    pub fn grant_role(
        &mut self,
        role: Role,
        account: Principal,
        caller: Principal,
    ) -> Result<(), TokenError> {
        self.roles.grant(role, account, caller)
    }

    pub fn revoke_role(
        &mut self,
        role: Role,
        account: Principal,
        caller: Principal,
    ) -> Result<(), TokenError> {
        self.roles.revoke(role, account, caller)
    }

    // =========================================================================
    // MUTATIONS
    // =========================================================================

    /// Mint `amount` to `to`. Caller must hold `Minter`; zero is a no-op
    /// success. Returns `to`'s new balance.
    pub fn mint(
        &mut self,
        to: Principal,
        amount: u64,
        caller: Principal,
    ) -> Result<u64, TokenError> {
        self.roles.require(Role::Minter, caller)?;
        let new_supply =
            self.total_supply
                .checked_add(amount)
                .ok_or_else(|| TokenError::InvalidAmount {
                    reason: "total supply overflow".to_string(),
                })?;
        // A single balance is bounded by the supply, so this add cannot
        // overflow once the supply add succeeded.
        let new_balance = self.balance_of(to) + amount;
        self.set_balance(to, new_balance);
        self.total_supply = new_supply;
        Ok(new_balance)
    }

    /// Burn `amount` from `from`. Caller must hold `Burner`. Returns
    /// `from`'s new balance.
    pub fn burn(
        &mut self,
        from: Principal,
        amount: u64,
        caller: Principal,
    ) -> Result<u64, TokenError> {
        self.roles.require(Role::Burner, caller)?;
        let balance = self.balance_of(from);
        if balance < amount {
            return Err(TokenError::InsufficientBalance {
                account: from,
                balance,
                requested: amount,
            });
        }
        self.set_balance(from, balance - amount);
        self.total_supply -= amount;
        Ok(balance - amount)
    }

    /// Move `amount` from `caller` to `to`. No role required. Returns the
    /// caller's new balance.
    pub fn transfer(
        &mut self,
        caller: Principal,
        to: Principal,
        amount: u64,
    ) -> Result<u64, TokenError> {
        let from_balance = self.balance_of(caller);
        if from_balance < amount {
            return Err(TokenError::InsufficientBalance {
                account: caller,
                balance: from_balance,
                requested: amount,
            });
        }
        if caller == to {
            return Ok(from_balance);
        }
        self.set_balance(caller, from_balance - amount);
        let to_balance = self.balance_of(to) + amount;
        self.set_balance(to, to_balance);
        Ok(from_balance - amount)
    }

    /// Set (replace, not add) the owner→spender allowance. Returns the
    /// allowance as set.
    pub fn approve(&mut self, owner: Principal, spender: Principal, amount: u64) -> u64 {
        if amount == 0 {
            self.allowances.remove(&(owner, spender));
        } else {
            self.allowances.insert((owner, spender), amount);
        }
        amount
    }

    /// Spend `caller`'s allowance on `from` to move `amount` to `to`.
    /// Allowance is checked before balance and decreased on success.
    /// Returns `to`'s new balance.
    pub fn transfer_from(
        &mut self,
        caller: Principal,
        from: Principal,
        to: Principal,
        amount: u64,
    ) -> Result<u64, TokenError> {
        let allowance = self.allowance(from, caller);
        if allowance < amount {
            return Err(TokenError::InsufficientAllowance {
                owner: from,
                spender: caller,
                allowance,
                requested: amount,
            });
        }
        let from_balance = self.balance_of(from);
        if from_balance < amount {
            return Err(TokenError::InsufficientBalance {
                account: from,
                balance: from_balance,
                requested: amount,
            });
        }
        self.approve(from, caller, allowance - amount);
        if from != to {
            self.set_balance(from, from_balance - amount);
            let to_balance = self.balance_of(to) + amount;
            self.set_balance(to, to_balance);
        }
        Ok(self.balance_of(to))
    }

    // Zero balances are dropped so audit sums only walk live accounts.
    fn set_balance(&mut self, account: Principal, amount: u64) {
        if amount == 0 {
            self.balances.remove(&account);
        } else {
            self.balances.insert(account, amount);
        }
    }
}
