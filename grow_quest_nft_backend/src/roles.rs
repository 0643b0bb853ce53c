use candid::{CandidType, Deserialize, Principal};
use serde::Serialize;
use std::collections::BTreeSet;

use crate::types::NftError;

// =============================================================================
// ROLES
// =============================================================================

/// Capabilities gating GrowQuest NFT mutations. `Minter` creates tokens,
/// `XpManager` awards experience, `Admin` administers every role including
/// itself. Burning is never role-gated; it belongs to the owner (or the
/// approved spender).
#[derive(
    CandidType, Deserialize, Serialize, Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord,
)]
pub enum Role {
    Admin,
    Minter,
    XpManager,
}

impl Role {
    pub fn administered_by(self) -> Role {
        Role::Admin
    }
}

// =============================================================================
// REGISTRY
// =============================================================================

/// This canister's own role table, independent from the GreenToken's.
#[derive(CandidType, Deserialize, Serialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct RoleRegistry {
    members: BTreeSet<(Role, Principal)>,
}

impl RoleRegistry {
    pub fn bootstrap(installer: Principal) -> Self {
        let mut members = BTreeSet::new();
        members.insert((Role::Admin, installer));
        RoleRegistry { members }
    }

    pub fn has_role(&self, role: Role, account: Principal) -> bool {
        self.members.contains(&(role, account))
    }

    pub fn require(&self, role: Role, caller: Principal) -> Result<(), NftError> {
        if self.has_role(role, caller) {
            Ok(())
        } else {
            Err(NftError::Unauthorized {
                required: role,
                caller,
            })
        }
    }

    /// Idempotent; caller must hold the administering role.
    pub fn grant(
        &mut self,
        role: Role,
        account: Principal,
        caller: Principal,
    ) -> Result<(), NftError> {
        self.require(role.administered_by(), caller)?;
        self.members.insert((role, account));
        Ok(())
    }

    /// Idempotent; caller must hold the administering role.
    pub fn revoke(
        &mut self,
        role: Role,
        account: Principal,
        caller: Principal,
    ) -> Result<(), NftError> {
        self.require(role.administered_by(), caller)?;
        self.members.remove(&(role, account));
        Ok(())
    }
}
