use ic_stable_structures::Storable;
use std::borrow::Cow;

// =============================================================================
// MODULE DECLARATIONS
// =============================================================================

pub mod nft;
pub mod roles;
pub mod types;

// =============================================================================
// RE-EXPORTS
// =============================================================================

pub use nft::{NftStore, TokenData, XP_PER_LEVEL};
pub use roles::{Role, RoleRegistry};
pub use types::NftError;

// =============================================================================
// STABLE SNAPSHOT
// =============================================================================

/// Candid-encoded snapshot of the NFT store, written to stable memory only
/// during upgrades; the heap copy is authoritative.
struct StoredNfts(NftStore);

impl Storable for StoredNfts {
    fn to_bytes(&self) -> Cow<'_, [u8]> {
        Cow::Owned(candid::encode_one(&self.0).expect(
            "CRITICAL: Failed to encode NFT snapshot. \
             This should never happen unless there's a bug in candid serialization.",
        ))
    }

    fn into_bytes(self) -> Vec<u8> {
        self.to_bytes().into_owned()
    }

    fn from_bytes(bytes: Cow<[u8]>) -> Self {
        StoredNfts(candid::decode_one(&bytes).expect(
            "CRITICAL: Failed to decode NFT snapshot from stable storage. \
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
// `NftStore` state machine directly.
#[cfg(target_family = "wasm")]
mod endpoints {
    use super::*;
    use candid::Principal;
    use ic_cdk::{init, post_upgrade, pre_upgrade, query, update};
    use ic_stable_structures::memory_manager::{MemoryId, MemoryManager, VirtualMemory};
    use ic_stable_structures::{DefaultMemoryImpl, StableCell};
    use std::cell::RefCell;

    type Memory = VirtualMemory<DefaultMemoryImpl>;

    const MEMORY_ID_NFT_STORE: MemoryId = MemoryId::new(0);

    thread_local! {
        static MEMORY_MANAGER: RefCell<MemoryManager<DefaultMemoryImpl>> =
            RefCell::new(MemoryManager::init(DefaultMemoryImpl::default()));

        // Authoritative heap state; snapshotted to stable memory across upgrades.
        static NFTS: RefCell<NftStore> = RefCell::new(NftStore::default());

        static STABLE_NFTS: RefCell<StableCell<StoredNfts, Memory>> = RefCell::new(
            StableCell::init(
                MEMORY_MANAGER.with(|m| m.borrow().get(MEMORY_ID_NFT_STORE)),
                StoredNfts(NftStore::default()),
            )
        );
    }

    // =========================================================================
    // LIFECYCLE HOOKS
    // =========================================================================

    #[init]
    fn init() {
        let installer = ic_cdk::api::msg_caller();
        NFTS.with(|n| *n.borrow_mut() = NftStore::new(installer));
        ic_cdk::println!("GrowQuestNFT initialized, admin: {}", installer);
    }

    #[pre_upgrade]
    fn pre_upgrade() {
        let snapshot = NFTS.with(|n| n.borrow().clone());
        STABLE_NFTS.with(|cell| {
            let _ = cell.borrow_mut().set(StoredNfts(snapshot));
        });
    }

    #[post_upgrade]
    fn post_upgrade() {
        let restored = STABLE_NFTS.with(|cell| cell.borrow().get().0.clone());
        NFTS.with(|n| *n.borrow_mut() = restored);
    }

    // =========================================================================
    // TOKEN ENDPOINTS
    // =========================================================================

    #[update]
    fn mint(to: Principal) -> Result<u64, NftError> {
        let caller = ic_cdk::api::msg_caller();
        let result = NFTS.with(|n| n.borrow_mut().mint(to, caller));
        if let Ok(token_id) = &result {
            ic_cdk::println!("Minted GrowQuest #{} to {}", token_id, to);
        }
        result
    }

    #[update]
    fn add_experience(token_id: u64, delta: u64) -> Result<u64, NftError> {
        let caller = ic_cdk::api::msg_caller();
        let result = NFTS.with(|n| n.borrow_mut().add_experience(token_id, delta, caller));
        if let Ok(experience) = &result {
            ic_cdk::println!(
                "GrowQuest #{} gained {} XP (now {})",
                token_id,
                delta,
                experience
            );
        }
        result
    }

    #[update]
    fn approve(token_id: u64, spender: Principal) -> Result<(), NftError> {
        let caller = ic_cdk::api::msg_caller();
        NFTS.with(|n| n.borrow_mut().approve(token_id, spender, caller))
    }

    #[update]
    fn transfer(token_id: u64, to: Principal) -> Result<(), NftError> {
        let caller = ic_cdk::api::msg_caller();
        NFTS.with(|n| n.borrow_mut().transfer(token_id, to, caller))
    }

    #[update]
    fn burn(token_id: u64) -> Result<(), NftError> {
        let caller = ic_cdk::api::msg_caller();
        let result = NFTS.with(|n| n.borrow_mut().burn(token_id, caller));
        if result.is_ok() {
            ic_cdk::println!("Burned GrowQuest #{}", token_id);
        }
        result
    }

    // =========================================================================
    // ROLE ENDPOINTS
    // =========================================================================

    #[update]
    fn grant_role(role: Role, account: Principal) -> Result<(), NftError> {
        let caller = ic_cdk::api::msg_caller();
        let result = NFTS.with(|n| n.borrow_mut().grant_role(role, account, caller));
        if result.is_ok() {
            ic_cdk::println!("Granted {:?} to {}", role, account);
        }
        result
    }

    #[update]
    fn revoke_role(role: Role, account: Principal) -> Result<(), NftError> {
        let caller = ic_cdk::api::msg_caller();
        let result = NFTS.with(|n| n.borrow_mut().revoke_role(role, account, caller));
        if result.is_ok() {
            ic_cdk::println!("Revoked {:?} from {}", role, account);
        }
        result
    }

    #[query]
    fn has_role(role: Role, account: Principal) -> bool {
        NFTS.with(|n| n.borrow().has_role(role, account))
    }

    // =========================================================================
    // READ QUERIES
    // =========================================================================

    #[query]
    fn owner_of(token_id: u64) -> Result<Principal, NftError> {
        NFTS.with(|n| n.borrow().owner_of(token_id))
    }

    #[query]
    fn experience_of(token_id: u64) -> Result<u64, NftError> {
        NFTS.with(|n| n.borrow().experience_of(token_id))
    }

    #[query]
    fn level_of(token_id: u64) -> Result<u64, NftError> {
        NFTS.with(|n| n.borrow().level_of(token_id))
    }

    #[query]
    fn get_approved(token_id: u64) -> Result<Option<Principal>, NftError> {
        NFTS.with(|n| n.borrow().get_approved(token_id))
    }

    #[query]
    fn get_minted_count() -> u64 {
        NFTS.with(|n| n.borrow().minted_count())
    }
}

// =============================================================================
// TESTS
// =============================================================================
