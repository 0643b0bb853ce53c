use candid::Principal;
use std::cell::RefCell;
use std::collections::BTreeSet;

use crate::types::VaultError;

thread_local! {
    static IN_FLIGHT: RefCell<BTreeSet<Principal>> = RefCell::new(BTreeSet::new());
}

/// Serializes a caller's stake/withdraw flows: both span an await into the
/// GreenToken canister, and a second message from the same caller arriving
/// mid-flight must not observe or race the half-applied bookkeeping.
/// RAII: the slot is released when the guard drops.
#[derive(Debug)]
pub struct OperationGuard {
    account: Principal,
}

impl OperationGuard {
    pub fn new(account: Principal) -> Result<Self, VaultError> {
        IN_FLIGHT.with(|flights| {
            let mut flights = flights.borrow_mut();
            if flights.contains(&account) {
                return Err(VaultError::OperationInProgress { account });
            }
            flights.insert(account);
            Ok(Self { account })
        })
    }
}

impl Drop for OperationGuard {
    fn drop(&mut self) {
        IN_FLIGHT.with(|flights| {
            flights.borrow_mut().remove(&self.account);
        });
    }
}
