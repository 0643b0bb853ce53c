//! Staking round-trip tests against the real GreenToken ledger.
//!
//! The canister's stake/withdraw endpoints are async orchestration around
//! two deterministic state machines: the GreenToken `Ledger` and the
//! vault's `StakeBook`. This model drives both through the exact same
//! sequence of ledger calls the canister makes, so the arithmetic and the
//! rollback ordering are what gets verified here.

use candid::Principal;
use green_token_backend::{Ledger, Role as TokenRole, TokenError};
use staking_vault_backend::{reward_for, StakeBook, VaultError};

fn principal(id: u8) -> Principal {
    Principal::from_slice(&[id, 0x07])
}

/// Deterministic stand-in for the deployed pair of canisters.
struct StakingModel {
    ledger: Ledger,
    book: StakeBook,
    vault: Principal,
}

impl StakingModel {
    /// Wired the way the deployer wires the real canisters: admin installs
    /// the token, grants itself Minter, grants the vault Minter for
    /// rewards.
    fn deploy(admin: Principal, vault: Principal) -> Self {
        let mut ledger = Ledger::new(admin);
        ledger.grant_role(TokenRole::Minter, admin, admin).unwrap();
        ledger.grant_role(TokenRole::Minter, vault, admin).unwrap();
        StakingModel {
            ledger,
            book: StakeBook::default(),
            vault,
        }
    }

    /// Mirrors `stake`: validate bookkeeping, pull via transfer_from as
    /// the vault, record only on success.
    fn stake(&mut self, caller: Principal, amount: u64) -> Result<u64, VaultError> {
        if amount == 0 {
            return Err(VaultError::InvalidAmount {
                reason: "cannot stake zero".to_string(),
            });
        }
        let projected = self.book.projected_stake(caller, amount)?;
        self.ledger
            .transfer_from(self.vault, caller, self.vault, amount)
            .map_err(forward)?;
        self.book.set_stake(caller, projected);
        Ok(projected)
    }

    /// Mirrors `withdraw`: validate, deduct, transfer escrow back, mint
    /// the flat reward.
    fn withdraw(&mut self, caller: Principal, amount: u64) -> Result<u64, VaultError> {
        let staked = self.book.staked_balance(caller);
        let remaining = self.book.projected_withdrawal(caller, amount)?;
        let reward = reward_for(amount).unwrap();
        assert!(self.ledger.has_role(TokenRole::Minter, self.vault));

        self.book.set_stake(caller, remaining);
        if let Err(err) = self.ledger.transfer(self.vault, caller, amount) {
            self.book.set_stake(caller, staked);
            return Err(forward(err));
        }
        if reward > 0 {
            self.ledger
                .mint(caller, reward, self.vault)
                .map_err(forward)?;
        }
        Ok(remaining)
    }

    fn escrow_balance(&self) -> u64 {
        self.ledger.balance_of(self.vault)
    }
}

// The vault forwards ledger rejections; the candid variants differ only in
// the crate they're declared in.
fn forward(err: TokenError) -> VaultError {
    VaultError::Ledger(match err {
        TokenError::Unauthorized { required, caller } => {
            staking_vault_backend::TokenError::Unauthorized {
                required: match required {
                    TokenRole::Admin => staking_vault_backend::Role::Admin,
                    TokenRole::Minter => staking_vault_backend::Role::Minter,
                    TokenRole::Burner => staking_vault_backend::Role::Burner,
                },
                caller,
            }
        }
        TokenError::InsufficientBalance {
            account,
            balance,
            requested,
        } => staking_vault_backend::TokenError::InsufficientBalance {
            account,
            balance,
            requested,
        },
        TokenError::InsufficientAllowance {
            owner,
            spender,
            allowance,
            requested,
        } => staking_vault_backend::TokenError::InsufficientAllowance {
            owner,
            spender,
            allowance,
            requested,
        },
        TokenError::InvalidAmount { reason } => {
            staking_vault_backend::TokenError::InvalidAmount { reason }
        }
    })
}

#[test]
fn test_stake_then_withdraw_pays_flat_reward() {
    let admin = principal(1);
    let vault = principal(2);
    let user = principal(3);
    let mut model = StakingModel::deploy(admin, vault);
    model.ledger.mint(user, 1000, admin).unwrap();

    model.ledger.approve(user, vault, 100);
    assert_eq!(model.stake(user, 100).unwrap(), 100);
    assert_eq!(model.ledger.balance_of(user), 900);
    assert_eq!(model.escrow_balance(), 100);

    assert_eq!(model.withdraw(user, 100).unwrap(), 0);
    // 1000 - 100 + 100 + 10 = 1010
    assert_eq!(model.ledger.balance_of(user), 1010);
    assert_eq!(model.book.staked_balance(user), 0);
    assert_eq!(model.escrow_balance(), 0);
    assert!(model.ledger.audit_supply().is_ok());
}

#[test]
fn test_reward_floors_on_small_amounts() {
    let admin = principal(1);
    let vault = principal(2);
    let user = principal(3);
    let mut model = StakingModel::deploy(admin, vault);
    model.ledger.mint(user, 1000, admin).unwrap();

    model.ledger.approve(user, vault, 50);
    model.stake(user, 50).unwrap();
    model.withdraw(user, 50).unwrap();
    // 1000 - 50 + 50 + 5 = 1005
    assert_eq!(model.ledger.balance_of(user), 1005);

    // 9 staked pays no reward at all: floor(9 * 10 / 100) = 0.
    model.ledger.approve(user, vault, 9);
    model.stake(user, 9).unwrap();
    model.withdraw(user, 9).unwrap();
    assert_eq!(model.ledger.balance_of(user), 1005);
}

#[test]
fn test_stake_without_approval_fails_and_records_nothing() {
    let admin = principal(1);
    let vault = principal(2);
    let user = principal(3);
    let mut model = StakingModel::deploy(admin, vault);
    model.ledger.mint(user, 1000, admin).unwrap();

    let err = model.stake(user, 10).unwrap_err();
    assert!(matches!(
        err,
        VaultError::Ledger(staking_vault_backend::TokenError::InsufficientAllowance { .. })
    ));
    assert_eq!(model.book.staked_balance(user), 0);
    assert_eq!(model.ledger.balance_of(user), 1000);
    assert_eq!(model.escrow_balance(), 0);
}

#[test]
fn test_withdraw_more_than_staked_fails_cleanly() {
    let admin = principal(1);
    let vault = principal(2);
    let user = principal(3);
    let mut model = StakingModel::deploy(admin, vault);
    model.ledger.mint(user, 1000, admin).unwrap();

    model.ledger.approve(user, vault, 20);
    model.stake(user, 20).unwrap();

    let err = model.withdraw(user, 30).unwrap_err();
    assert_eq!(
        err,
        VaultError::InsufficientBalance {
            account: user,
            staked: 20,
            requested: 30,
        }
    );
    // No balance anywhere moved.
    assert_eq!(model.book.staked_balance(user), 20);
    assert_eq!(model.ledger.balance_of(user), 980);
    assert_eq!(model.escrow_balance(), 20);
}

#[test]
fn test_zero_stake_is_rejected() {
    let admin = principal(1);
    let vault = principal(2);
    let user = principal(3);
    let mut model = StakingModel::deploy(admin, vault);
    model.ledger.mint(user, 100, admin).unwrap();

    assert!(matches!(
        model.stake(user, 0),
        Err(VaultError::InvalidAmount { .. })
    ));
}

#[test]
fn test_escrow_always_covers_the_book() {
    let admin = principal(1);
    let vault = principal(2);
    let mut model = StakingModel::deploy(admin, vault);

    let users: Vec<Principal> = (10u8..20).map(principal).collect();
    for user in &users {
        model.ledger.mint(*user, 500, admin).unwrap();
        model.ledger.approve(*user, vault, 500);
        model.stake(*user, 300).unwrap();
    }
    assert!(model.book.total_staked() <= model.escrow_balance());

    for user in &users {
        model.withdraw(*user, 150).unwrap();
        // Invariant holds after every partial withdrawal too.
        assert!(model.book.total_staked() <= model.escrow_balance());
    }
    assert_eq!(model.book.total_staked(), 150 * users.len() as u64);
}
