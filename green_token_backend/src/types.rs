use candid::{CandidType, Deserialize, Principal};
use serde::Serialize;

use crate::roles::Role;

// =============================================================================
// ERRORS
// =============================================================================

/// Rejections returned by the GREEN ledger. Every variant carries enough
/// context for the caller to diagnose the failure without reading canister
/// state.
#[derive(CandidType, Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
pub enum TokenError {
    Unauthorized {
        required: Role,
        caller: Principal,
    },
    InsufficientBalance {
        account: Principal,
        balance: u64,
        requested: u64,
    },
    InsufficientAllowance {
        owner: Principal,
        spender: Principal,
        allowance: u64,
        requested: u64,
    },
    InvalidAmount {
        reason: String,
    },
}
