use ic_stable_structures::Storable;
use std::borrow::Cow;

// =============================================================================
// MODULE DECLARATIONS
// =============================================================================

pub mod guard;
pub mod types;

// =============================================================================
// RE-EXPORTS
// =============================================================================

pub use types::{NftError, NftRole, TokenError, TokenRole, UtilityConfig, UtilityError};

// =============================================================================
// CONSTANTS
// =============================================================================

/// GREEN minted per NFT level when cashing a token in.
pub const GREEN_PER_LEVEL: u64 = 100;

/// Reward for burning a token of `level`, or `None` on overflow.
pub fn reward_for_level(level: u64) -> Option<u64> {
    level.checked_mul(GREEN_PER_LEVEL)
}

// =============================================================================
// STABLE SNAPSHOT
// =============================================================================

// The utility keeps no balances of its own; the wiring is the only state
// that must survive an upgrade.
struct StoredConfig(UtilityConfig);

impl Storable for StoredConfig {
    fn to_bytes(&self) -> Cow<'_, [u8]> {
        Cow::Owned(candid::encode_one(&self.0).expect(
            "CRITICAL: Failed to encode utility config. \
             This should never happen unless there's a bug in candid serialization.",
        ))
    }

    fn into_bytes(self) -> Vec<u8> {
        self.to_bytes().into_owned()
    }

    fn from_bytes(bytes: Cow<[u8]>) -> Self {
        StoredConfig(candid::decode_one(&bytes).expect(
            "CRITICAL: Failed to decode utility config from stable storage. \
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
// targets too, so the wire surface is wasm-only; host builds use the pure
// reward arithmetic and guard directly.
#[cfg(target_family = "wasm")]
mod endpoints {
    use super::*;
    use crate::guard::BurnGuard;
    use candid::{CandidType, Principal};
    use ic_cdk::api::canister_self;
    use ic_cdk::call::Call;
    use ic_cdk::{init, post_upgrade, pre_upgrade, query, update};
    use ic_stable_structures::memory_manager::{MemoryId, MemoryManager, VirtualMemory};
    use ic_stable_structures::{DefaultMemoryImpl, StableCell};
    use std::cell::RefCell;

    type Memory = VirtualMemory<DefaultMemoryImpl>;

    const MEMORY_ID_CONFIG: MemoryId = MemoryId::new(0);

    thread_local! {
        static MEMORY_MANAGER: RefCell<MemoryManager<DefaultMemoryImpl>> =
            RefCell::new(MemoryManager::init(DefaultMemoryImpl::default()));

        static CONFIG: RefCell<UtilityConfig> = RefCell::new(UtilityConfig {
            grow_quest_nft: Principal::anonymous(),
            green_token: Principal::anonymous(),
        });

        static STABLE_CONFIG: RefCell<StableCell<StoredConfig, Memory>> = RefCell::new(
            StableCell::init(
                MEMORY_MANAGER.with(|m| m.borrow().get(MEMORY_ID_CONFIG)),
                StoredConfig(UtilityConfig {
                    grow_quest_nft: Principal::anonymous(),
                    green_token: Principal::anonymous(),
                }),
            )
        );
    }

    fn config() -> UtilityConfig {
        CONFIG.with(|c| c.borrow().clone())
    }

    /// Calls one of the two wired canisters and decodes the single reply value.
    async fn call_remote<A, R>(
        canister: Principal,
        method: &'static str,
        args: A,
    ) -> Result<R, UtilityError>
    where
        A: candid::utils::ArgumentEncoder,
        R: CandidType + for<'de> candid::Deserialize<'de>,
    {
        let response = Call::unbounded_wait(canister, method)
            .with_args(&args)
            .await
            .map_err(|e| UtilityError::CallFailed {
                message: format!("{} call failed: {}", method, e),
            })?;
        response.candid::<R>().map_err(|e| UtilityError::CallFailed {
            message: format!("{} reply decode failed: {}", method, e),
        })
    }

    // =========================================================================
    // LIFECYCLE HOOKS
    // =========================================================================

    #[init]
    fn init(grow_quest_nft: Principal, green_token: Principal) {
        CONFIG.with(|c| {
            *c.borrow_mut() = UtilityConfig {
                grow_quest_nft,
                green_token,
            }
        });
        ic_cdk::println!(
            "GrowthUtility initialized: NFT {}, token {}",
            grow_quest_nft,
            green_token
        );
    }

    #[pre_upgrade]
    fn pre_upgrade() {
        let snapshot = config();
        STABLE_CONFIG.with(|cell| {
            let _ = cell.borrow_mut().set(StoredConfig(snapshot));
        });
    }

    #[post_upgrade]
    fn post_upgrade() {
        let restored = STABLE_CONFIG.with(|cell| cell.borrow().get().0.clone());
        CONFIG.with(|c| *c.borrow_mut() = restored);
    }

    // =========================================================================
    // BURN-FOR-GREEN
    // =========================================================================

    /// Burn the caller's GrowQuest NFT and mint `100 × level` GREEN in return.
    ///
    /// Every precondition (ownership, level, the utility's own mint right)
    /// is validated before the burn, so a failure anywhere up to the burn
    /// leaves both canisters untouched. The caller must have `approve`d this
    /// canister on the token beforehand; a missing approval surfaces as the
    /// NFT's rejection and nothing has been minted. Returns the minted reward.
    #[update]
    async fn burn_for_green(token_id: u64) -> Result<u64, UtilityError> {
        let caller = ic_cdk::api::msg_caller();
        let _guard = BurnGuard::new(token_id)?;
        let UtilityConfig {
            grow_quest_nft,
            green_token,
        } = config();

        // STEP 1: The caller must own the token. NotFound bubbles up from the
        // NFT canister for never-minted or burned ids.
        let owner_reply: Result<Principal, NftError> =
            call_remote(grow_quest_nft, "owner_of", (token_id,)).await?;
        let owner = owner_reply.map_err(UtilityError::Nft)?;
        if owner != caller {
            return Err(UtilityError::NotOwner {
                token_id,
                caller,
                owner,
            });
        }

        // STEP 2: Price the burn from the current level.
        let level_reply: Result<u64, NftError> =
            call_remote(grow_quest_nft, "level_of", (token_id,)).await?;
        let level = level_reply.map_err(UtilityError::Nft)?;
        let reward = reward_for_level(level).ok_or_else(|| UtilityError::InvalidAmount {
            reason: "reward overflow".to_string(),
        })?;

        // STEP 3: Confirm the reward mint can succeed before burning anything.
        let is_minter: bool =
            call_remote(green_token, "has_role", (TokenRole::Minter, canister_self())).await?;
        if !is_minter {
            return Err(UtilityError::Unauthorized {
                required: TokenRole::Minter,
                caller: canister_self(),
            });
        }

        // STEP 4: Burn. We act as the token's approved spender; if the owner
        // never approved us the NFT rejects here and nothing was minted.
        let burn_reply: Result<(), NftError> =
            call_remote(grow_quest_nft, "burn", (token_id,)).await?;
        burn_reply.map_err(UtilityError::Nft)?;

        // STEP 5: Mint the reward. The check in step 3 makes a failure here
        // require an admin revoking our role mid-flight.
        let mint_reply: Result<u64, TokenError> =
            match call_remote(green_token, "mint", (caller, reward)).await {
                Ok(reply) => reply,
                Err(call_err) => {
                    ic_cdk::println!(
                        "CRITICAL: GrowQuest #{} burned but reward mint of {} to {} failed: {:?}",
                        token_id,
                        reward,
                        caller,
                        call_err
                    );
                    return Err(call_err);
                }
            };
        if let Err(token_err) = mint_reply {
            ic_cdk::println!(
                "CRITICAL: GrowQuest #{} burned but reward mint of {} to {} failed: {:?}",
                token_id,
                reward,
                caller,
                token_err
            );
            return Err(UtilityError::Ledger(token_err));
        }

        ic_cdk::println!(
            "Burned GrowQuest #{} (level {}) for {} GREEN to {}",
            token_id,
            level,
            reward,
            caller
        );
        Ok(reward)
    }

    // =========================================================================
    // QUERIES
    // =========================================================================

    #[query]
    fn get_config() -> UtilityConfig {
        config()
    }
}

// =============================================================================
// TESTS
// =============================================================================
