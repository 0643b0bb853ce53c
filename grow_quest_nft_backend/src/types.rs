use candid::{CandidType, Deserialize, Principal};
use serde::Serialize;

use crate::roles::Role;

// =============================================================================
// ERRORS
// =============================================================================

/// Rejections returned by the GrowQuest NFT canister.
#[derive(CandidType, Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
pub enum NftError {
    /// Caller lacks the role gating the operation.
    Unauthorized {
        required: Role,
        caller: Principal,
    },
    /// Operation reserved for the token's owner.
    NotOwner {
        token_id: u64,
        caller: Principal,
        owner: Principal,
    },
    /// Operation reserved for the owner or the approved spender.
    NotOwnerOrApproved {
        token_id: u64,
        caller: Principal,
    },
    /// Token was never minted, or has been burned.
    NotFound {
        token_id: u64,
    },
    InvalidAmount {
        reason: String,
    },
}
