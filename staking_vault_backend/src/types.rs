use candid::{CandidType, Deserialize, Principal};
use serde::Serialize;

// =============================================================================
// GREENTOKEN INTERFACE (mirrored locally)
// =============================================================================

// The GreenToken canister's role and error types, declared here the way the
// ledger interface types are declared in each consumer rather than shared
// through a common crate. Variant and field names must line up with the
// token canister's candid interface.

#[derive(
    CandidType, Deserialize, Serialize, Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord,
)]
pub enum Role {
    Admin,
    Minter,
    Burner,
}

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

// =============================================================================
// VAULT ERRORS
// =============================================================================

/// Rejections returned by the staking vault.
#[derive(CandidType, Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
pub enum VaultError {
    /// Caller tried to withdraw more than they have staked.
    InsufficientBalance {
        account: Principal,
        staked: u64,
        requested: u64,
    },
    InvalidAmount {
        reason: String,
    },
    /// The vault itself is missing a role on the GreenToken (deployer
    /// wiring problem, reported before any state is touched).
    Unauthorized {
        required: Role,
        caller: Principal,
    },
    /// The GreenToken rejected the transfer or mint; forwarded verbatim.
    Ledger(TokenError),
    /// Caller already has a stake or withdrawal in flight.
    OperationInProgress {
        account: Principal,
    },
    /// Inter-canister call failed at the transport level.
    CallFailed {
        message: String,
    },
}
