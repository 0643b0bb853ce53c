use ic_stable_structures::Storable;
use std::borrow::Cow;

// =============================================================================
// MODULE DECLARATIONS
// =============================================================================

pub mod ledger;
pub mod roles;
pub mod types;


// =============================================================================
// RE-EXPORTS
// =============================================================================

pub use ledger::Ledger;
pub use roles::{Role, RoleRegistry};
pub use types::TokenError;

// =============================================================================
// STABLE SNAPSHOT
// =============================================================================

/// Candid-encoded snapshot of the whole ledger. Written to stable memory
/// only during upgrades; the heap copy is authoritative.
struct StoredLedger(Ledger);

impl Storable for StoredLedger {
    fn to_bytes(&self) -> Cow<'_, [u8]> {
        Cow::Owned(candid::encode_one(&self.0).expect(
            "CRITICAL: Failed to encode ledger snapshot. \
             This should never happen unless there's a bug in candid serialization.",
        ))
    }

    fn into_bytes(self) -> Vec<u8> {
        self.to_bytes().into_owned()
    }

    fn from_bytes(bytes: Cow<[u8]>) -> Self {
        StoredLedger(candid::decode_one(&bytes).expect(
            "CRITICAL: Failed to decode ledger snapshot from stable storage. \
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
// `Ledger` state machine directly.
#[cfg(target_family = "wasm")]
mod endpoints {
    use super::*;
    use candid::Principal;
    use ic_cdk::{init, post_upgrade, pre_upgrade, query, update};
    use ic_stable_structures::memory_manager::{MemoryId, MemoryManager, VirtualMemory};
    use ic_stable_structures::{DefaultMemoryImpl, StableCell};
    use std::cell::RefCell;

    type Memory = VirtualMemory<DefaultMemoryImpl>;

    const MEMORY_ID_LEDGER: MemoryId = MemoryId::new(0);

    thread_local! {
        static MEMORY_MANAGER: RefCell<MemoryManager<DefaultMemoryImpl>> =
            RefCell::new(MemoryManager::init(DefaultMemoryImpl::default()));

        // Authoritative heap state; snapshotted to stable memory across upgrades.
        static LEDGER: RefCell<Ledger> = RefCell::new(Ledger::default());

        static STABLE_LEDGER: RefCell<StableCell<StoredLedger, Memory>> = RefCell::new(
            StableCell::init(
                MEMORY_MANAGER.with(|m| m.borrow().get(MEMORY_ID_LEDGER)),
                StoredLedger(Ledger::default()),
            )
        );
    }

    // =========================================================================
    // LIFECYCLE HOOKS
    // =========================================================================

    #[init]
    fn init() {
        let installer = ic_cdk::api::msg_caller();
        LEDGER.with(|l| *l.borrow_mut() = Ledger::new(installer));
        ic_cdk::println!("GreenToken initialized, admin: {}", installer);
    }

    #[pre_upgrade]
    fn pre_upgrade() {
        let snapshot = LEDGER.with(|l| l.borrow().clone());
        STABLE_LEDGER.with(|cell| {
            let _ = cell.borrow_mut().set(StoredLedger(snapshot));
        });
    }

    #[post_upgrade]
    fn post_upgrade() {
        let restored = STABLE_LEDGER.with(|cell| cell.borrow().get().0.clone());
        LEDGER.with(|l| *l.borrow_mut() = restored);
    }

    // =========================================================================
    // LEDGER ENDPOINTS
    // =========================================================================

    #[update]
    fn mint(to: Principal, amount: u64) -> Result<u64, TokenError> {
        let caller = ic_cdk::api::msg_caller();
        let result = LEDGER.with(|l| l.borrow_mut().mint(to, amount, caller));
        if let Ok(new_balance) = &result {
            ic_cdk::println!(
                "Minted {} GREEN to {} (new balance {})",
                amount,
                to,
                new_balance
            );
        }
        result
    }

    #[update]
    fn burn(from: Principal, amount: u64) -> Result<u64, TokenError> {
        let caller = ic_cdk::api::msg_caller();
        let result = LEDGER.with(|l| l.borrow_mut().burn(from, amount, caller));
        if let Ok(new_balance) = &result {
            ic_cdk::println!(
                "Burned {} GREEN from {} (new balance {})",
                amount,
                from,
                new_balance
            );
        }
        result
    }

    #[update]
    fn transfer(to: Principal, amount: u64) -> Result<u64, TokenError> {
        let caller = ic_cdk::api::msg_caller();
        LEDGER.with(|l| l.borrow_mut().transfer(caller, to, amount))
    }

    #[update]
    fn approve(spender: Principal, amount: u64) -> u64 {
        let caller = ic_cdk::api::msg_caller();
        LEDGER.with(|l| l.borrow_mut().approve(caller, spender, amount))
    }

    #[update]
    fn transfer_from(from: Principal, to: Principal, amount: u64) -> Result<u64, TokenError> {
        let caller = ic_cdk::api::msg_caller();
        LEDGER.with(|l| l.borrow_mut().transfer_from(caller, from, to, amount))
    }

    // =========================================================================
    // ROLE ENDPOINTS
    // =========================================================================

    #[update]
    fn grant_role(role: Role, account: Principal) -> Result<(), TokenError> {
        let caller = ic_cdk::api::msg_caller();
        let result = LEDGER.with(|l| l.borrow_mut().grant_role(role, account, caller));
        if result.is_ok() {
            ic_cdk::println!("Granted {:?} to {}", role, account);
        }
        result
    }

    #[update]
    fn revoke_role(role: Role, account: Principal) -> Result<(), TokenError> {
        let caller = ic_cdk::api::msg_caller();
        let result = LEDGER.with(|l| l.borrow_mut().revoke_role(role, account, caller));
        if result.is_ok() {
            ic_cdk::println!("Revoked {:?} from {}", role, account);
        }
        result
    }

    #[query]
    fn has_role(role: Role, account: Principal) -> bool {
        LEDGER.with(|l| l.borrow().has_role(role, account))
    }

    // =========================================================================
    // BALANCE QUERIES
    // =========================================================================

    #[query]
    fn get_balance(account: Principal) -> u64 {
        LEDGER.with(|l| l.borrow().balance_of(account))
    }

    #[query]
    fn get_my_balance() -> u64 {
        LEDGER.with(|l| l.borrow().balance_of(ic_cdk::api::msg_caller()))
    }

    #[query]
    fn get_total_supply() -> u64 {
        LEDGER.with(|l| l.borrow().total_supply())
    }

    #[query]
    fn get_allowance(owner: Principal, spender: Principal) -> u64 {
        LEDGER.with(|l| l.borrow().allowance(owner, spender))
    }

    // =========================================================================
    // AUDIT
    // =========================================================================

    #[query]
    fn audit_supply() -> Result<String, String> {
        LEDGER.with(|l| l.borrow().audit_supply())
    }
}
