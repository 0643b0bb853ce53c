use std::cell::RefCell;
use std::collections::BTreeSet;

use crate::types::UtilityError;

thread_local! {
    static IN_FLIGHT: RefCell<BTreeSet<u64>> = RefCell::new(BTreeSet::new());
}

/// One burn flow per NFT at a time: `burn_for_green` spans several awaits
/// between the ownership check and the burn, and the same token id must
/// not enter that window twice. RAII: the slot is released on drop.
#[derive(Debug)]
pub struct BurnGuard {
    token_id: u64,
}

impl BurnGuard {
    pub fn new(token_id: u64) -> Result<Self, UtilityError> {
        IN_FLIGHT.with(|flights| {
            let mut flights = flights.borrow_mut();
            if flights.contains(&token_id) {
                return Err(UtilityError::OperationInProgress { token_id });
            }
            flights.insert(token_id);
            Ok(Self { token_id })
        })
    }
}

impl Drop for BurnGuard {
    fn drop(&mut self) {
        IN_FLIGHT.with(|flights| {
            flights.borrow_mut().remove(&self.token_id);
        });
    }
}
