use candid::{CandidType, Deserialize, Principal};
use ic_stable_structures::Storable;
use serde::Serialize;
use std::borrow::Cow;

// =============================================================================
// MODULE DECLARATIONS
// =============================================================================

pub mod guard;
pub mod types;
pub mod vault;

// =============================================================================
// RE-EXPORTS
// =============================================================================

pub use types::{Role, TokenError, VaultError};
pub use vault::{reward_for, StakeBook, REWARD_PERCENT};

// =============================================================================
// STABLE SNAPSHOT
// =============================================================================

/// Everything the vault must carry across an upgrade: the stake book and
/// the GreenToken canister it was wired against at init.
#[derive(CandidType, Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
struct VaultState {
    stakes: StakeBook,
    green_token: Principal,
}

impl Default for VaultState {
    fn default() -> Self {
        VaultState {
            stakes: StakeBook::default(),
            green_token: Principal::anonymous(),
        }
    }
}

struct StoredVault(VaultState);

impl Storable for StoredVault {
    fn to_bytes(&self) -> Cow<'_, [u8]> {
        Cow::Owned(candid::encode_one(&self.0).expect(
            "CRITICAL: Failed to encode vault snapshot. \
             This should never happen unless there's a bug in candid serialization.",
        ))
    }

    fn into_bytes(self) -> Vec<u8> {
        self.to_bytes().into_owned()
    }

    fn from_bytes(bytes: Cow<[u8]>) -> Self {
        StoredVault(candid::decode_one(&bytes).expect(
            "CRITICAL: Failed to decode vault snapshot from stable storage. \
             This indicates storage corruption or an incompatible canister upgrade.",
        ))
    }

    const BOUND: ic_stable_structures::storable::Bound =
        ic_stable_structures::storable::Bound::Unbounded;
}

// =============================================================================
// CANISTER ENDPOINTS
// =============================================================================

// The ic-cdk endpoint macros emit canister_* export symbols on native
// targets too, so the wire surface is wasm-only; host builds use the
// `StakeBook` state machine directly.
#[cfg(target_family = "wasm")]
mod endpoints {
    use super::*;
    use crate::guard::OperationGuard;
    use ic_cdk::api::canister_self;
    use ic_cdk::call::Call;
    use ic_cdk::{init, post_upgrade, pre_upgrade, query, update};
    use ic_stable_structures::memory_manager::{MemoryId, MemoryManager, VirtualMemory};
    use ic_stable_structures::{DefaultMemoryImpl, StableCell};
    use std::cell::RefCell;

    type Memory = VirtualMemory<DefaultMemoryImpl>;

    const MEMORY_ID_VAULT: MemoryId = MemoryId::new(0);

    thread_local! {
        static MEMORY_MANAGER: RefCell<MemoryManager<DefaultMemoryImpl>> =
            RefCell::new(MemoryManager::init(DefaultMemoryImpl::default()));

        // Authoritative heap state; snapshotted to stable memory across upgrades.
        static STAKES: RefCell<StakeBook> = RefCell::new(StakeBook::default());
        static GREEN_TOKEN: RefCell<Principal> = RefCell::new(Principal::anonymous());

        static STABLE_VAULT: RefCell<StableCell<StoredVault, Memory>> = RefCell::new(
            StableCell::init(
                MEMORY_MANAGER.with(|m| m.borrow().get(MEMORY_ID_VAULT)),
                StoredVault(VaultState::default()),
            )
        );
    }

    fn green_token() -> Principal {
        GREEN_TOKEN.with(|t| *t.borrow())
    }

    /// Calls the GreenToken canister and decodes the single reply value.
    async fn call_token<A, R>(method: &'static str, args: A) -> Result<R, VaultError>
    where
        A: candid::utils::ArgumentEncoder,
        R: CandidType + for<'de> candid::Deserialize<'de>,
    {
        let response = Call::unbounded_wait(green_token(), method)
            .with_args(&args)
            .await
            .map_err(|e| VaultError::CallFailed {
                message: format!("{} call failed: {}", method, e),
            })?;
        response.candid::<R>().map_err(|e| VaultError::CallFailed {
            message: format!("{} reply decode failed: {}", method, e),
        })
    }

    // =========================================================================
    // LIFECYCLE HOOKS
    // =========================================================================

    #[init]
    fn init(green_token: Principal) {
        GREEN_TOKEN.with(|t| *t.borrow_mut() = green_token);
        ic_cdk::println!("StakingVault initialized against GreenToken {}", green_token);
    }

    #[pre_upgrade]
    fn pre_upgrade() {
        let state = VaultState {
            stakes: STAKES.with(|s| s.borrow().clone()),
            green_token: green_token(),
        };
        STABLE_VAULT.with(|cell| {
            let _ = cell.borrow_mut().set(StoredVault(state));
        });
    }

    #[post_upgrade]
    fn post_upgrade() {
        let restored = STABLE_VAULT.with(|cell| cell.borrow().get().0.clone());
        STAKES.with(|s| *s.borrow_mut() = restored.stakes);
        GREEN_TOKEN.with(|t| *t.borrow_mut() = restored.green_token);
    }

    // =========================================================================
    // STAKING ENDPOINTS
    // =========================================================================

    /// Pull `amount` GREEN from the caller into the vault's escrow (the caller
    /// must have approved the vault first) and record the stake. Any ledger
    /// rejection is forwarded and nothing is recorded.
    #[update]
    async fn stake(amount: u64) -> Result<u64, VaultError> {
        let caller = ic_cdk::api::msg_caller();
        let _guard = OperationGuard::new(caller)?;

        if amount == 0 {
            return Err(VaultError::InvalidAmount {
                reason: "cannot stake zero".to_string(),
            });
        }
        // Validate the bookkeeping up front so the pull can be recorded
        // unconditionally once it succeeds.
        let projected = STAKES.with(|s| s.borrow().projected_stake(caller, amount))?;

        let transfer: Result<u64, TokenError> =
            call_token("transfer_from", (caller, canister_self(), amount)).await?;
        match transfer {
            Ok(_escrow_balance) => {
                STAKES.with(|s| s.borrow_mut().set_stake(caller, projected));
                ic_cdk::println!(
                    "Stake successful: {} staked {} GREEN (staked balance {})",
                    caller,
                    amount,
                    projected
                );
                Ok(projected)
            }
            Err(token_err) => Err(VaultError::Ledger(token_err)),
        }
    }

    /// Return `amount` staked GREEN to the caller plus a flat 10% reward minted
    /// on top. The staked-balance deduction is rolled back if the escrow
    /// transfer fails.
    #[update]
    async fn withdraw(amount: u64) -> Result<u64, VaultError> {
        let caller = ic_cdk::api::msg_caller();
        let _guard = OperationGuard::new(caller)?;

        // STEP 1: Validate everything before mutating anything.
        let staked = STAKES.with(|s| s.borrow().staked_balance(caller));
        let remaining = STAKES.with(|s| s.borrow().projected_withdrawal(caller, amount))?;
        let reward = reward_for(amount).ok_or_else(|| VaultError::InvalidAmount {
            reason: "reward overflow".to_string(),
        })?;

        // STEP 2: Confirm the reward mint can succeed, so it cannot fail after
        // the escrow transfer has been committed.
        let is_minter: bool = call_token("has_role", (Role::Minter, canister_self())).await?;
        if !is_minter {
            return Err(VaultError::Unauthorized {
                required: Role::Minter,
                caller: canister_self(),
            });
        }

        // STEP 3: Deduct the staked balance FIRST, then move the escrow.
        STAKES.with(|s| s.borrow_mut().set_stake(caller, remaining));

        let transfer: Result<u64, TokenError> =
            match call_token("transfer", (caller, amount)).await {
                Ok(reply) => reply,
                Err(call_err) => {
                    // ROLLBACK on call failure.
                    STAKES.with(|s| s.borrow_mut().set_stake(caller, staked));
                    ic_cdk::println!("Withdrawal rolled back for {}: {:?}", caller, call_err);
                    return Err(call_err);
                }
            };
        if let Err(token_err) = transfer {
            // ROLLBACK on ledger rejection.
            STAKES.with(|s| s.borrow_mut().set_stake(caller, staked));
            ic_cdk::println!("Withdrawal rolled back for {}: {:?}", caller, token_err);
            return Err(VaultError::Ledger(token_err));
        }

        // STEP 4: Mint the flat reward. The Minter check in step 2 makes a
        // failure here require an admin revoking the role mid-flight.
        if reward > 0 {
            let mint: Result<u64, TokenError> = match call_token("mint", (caller, reward)).await
            {
                Ok(reply) => reply,
                Err(call_err) => {
                    ic_cdk::println!(
                        "CRITICAL: reward mint of {} failed after {} withdrew {}: {:?}",
                        reward,
                        caller,
                        amount,
                        call_err
                    );
                    return Err(call_err);
                }
            };
            if let Err(token_err) = mint {
                ic_cdk::println!(
                    "CRITICAL: reward mint of {} failed after {} withdrew {}: {:?}",
                    reward,
                    caller,
                    amount,
                    token_err
                );
                return Err(VaultError::Ledger(token_err));
            }
        }

        ic_cdk::println!(
            "Withdrawal successful: {} withdrew {} GREEN (+{} reward)",
            caller,
            amount,
            reward
        );
        Ok(remaining)
    }

    // =========================================================================
    // QUERIES
    // =========================================================================

    #[query]
    fn get_staked_balance(account: Principal) -> u64 {
        STAKES.with(|s| s.borrow().staked_balance(account))
    }

    #[query]
    fn get_my_staked_balance() -> u64 {
        STAKES.with(|s| s.borrow().staked_balance(ic_cdk::api::msg_caller()))
    }

    #[query]
    fn get_total_staked() -> u64 {
        STAKES.with(|s| s.borrow().total_staked())
    }

    #[query]
    fn get_token_canister() -> Principal {
        green_token()
    }
}

// =============================================================================
// TESTS
// =============================================================================
