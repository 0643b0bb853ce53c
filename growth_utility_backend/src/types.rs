use candid::{CandidType, Deserialize, Principal};
use serde::Serialize;

// =============================================================================
// REMOTE INTERFACES (mirrored locally)
// =============================================================================

// Role and error types of the two canisters this utility orchestrates,
// declared locally like the ledger interface types in each consumer.
// Variant and field names must line up with the remote candid interfaces.

#[derive(
    CandidType, Deserialize, Serialize, Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord,
)]
pub enum TokenRole {
    Admin,
    Minter,
    Burner,
}

#[derive(CandidType, Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
pub enum TokenError {
    Unauthorized {
        required: TokenRole,
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

#[derive(
    CandidType, Deserialize, Serialize, Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord,
)]
pub enum NftRole {
    Admin,
    Minter,
    XpManager,
}

#[derive(CandidType, Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
pub enum NftError {
    Unauthorized {
        required: NftRole,
        caller: Principal,
    },
    NotOwner {
        token_id: u64,
        caller: Principal,
        owner: Principal,
    },
    NotOwnerOrApproved {
        token_id: u64,
        caller: Principal,
    },
    NotFound {
        token_id: u64,
    },
    InvalidAmount {
        reason: String,
    },
}

// =============================================================================
// UTILITY TYPES
// =============================================================================

/// The two canisters the utility was wired against at init.
#[derive(CandidType, Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
pub struct UtilityConfig {
    pub grow_quest_nft: Principal,
    pub green_token: Principal,
}

/// Rejections returned by `burn_for_green`.
#[derive(CandidType, Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
pub enum UtilityError {
    /// Caller is not the owner of the NFT they want to cash in.
    NotOwner {
        token_id: u64,
        caller: Principal,
        owner: Principal,
    },
    /// The utility itself is missing `Minter` on the GreenToken (deployer
    /// wiring problem, reported before the NFT is touched).
    Unauthorized {
        required: TokenRole,
        caller: Principal,
    },
    /// The NFT canister rejected a read or the burn; forwarded verbatim.
    /// Includes `NotFound` for never-minted or already-burned ids.
    Nft(NftError),
    /// The GreenToken rejected the reward mint; forwarded verbatim.
    Ledger(TokenError),
    /// This NFT already has a burn flow in flight.
    OperationInProgress {
        token_id: u64,
    },
    InvalidAmount {
        reason: String,
    },
    /// Inter-canister call failed at the transport level.
    CallFailed {
        message: String,
    },
}
