use candid::{CandidType, Deserialize, Principal};
use serde::Serialize;
use std::collections::BTreeSet;

use crate::types::TokenError;

// =============================================================================
// ROLES
// =============================================================================

/// Capabilities gating GREEN ledger mutations. `Admin` administers every
/// role, including itself.
#[derive(
    CandidType, Deserialize, Serialize, Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord,
)]
pub enum Role {
    Admin,
    Minter,
    Burner,
}

impl Role {
    /// The role whose members may grant or revoke `self`.
    pub fn administered_by(self) -> Role {
        Role::Admin
    }
}

// =============================================================================
// REGISTRY
// =============================================================================

/// Set-membership role table. The ledger embeds its own instance; there is
/// no registry shared across canisters.
#[derive(CandidType, Deserialize, Serialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct RoleRegistry {
    members: BTreeSet<(Role, Principal)>,
}

impl RoleRegistry {
    /// Fresh registry with `installer` holding `Admin` and nothing else
    /// granted.
    pub fn bootstrap(installer: Principal) -> Self {
        let mut members = BTreeSet::new();
        members.insert((Role::Admin, installer));
        RoleRegistry { members }
    }

    pub fn has_role(&self, role: Role, account: Principal) -> bool {
        self.members.contains(&(role, account))
    }

    /// Policy check at the operation boundary: fails unless `caller` holds
    /// `role`.
    pub fn require(&self, role: Role, caller: Principal) -> Result<(), TokenError> {
        if self.has_role(role, caller) {
            Ok(())
        } else {
            Err(TokenError::Unauthorized {
                required: role,
                caller,
            })
        }
    }

    /// Grant `role` to `account`. Caller must hold the administering role.
    /// Granting an already-held role is a no-op success.
    pub fn grant(
        &mut self,
        role: Role,
        account: Principal,
        caller: Principal,
    ) -> Result<(), TokenError> {
        self.require(role.administered_by(), caller)?;
        self.members.insert((role, account));
        Ok(())
    }

    /// Revoke `role` from `account`. Symmetric to `grant`, idempotent.
    pub fn revoke(
        &mut self,
        role: Role,
        account: Principal,
        caller: Principal,
    ) -> Result<(), TokenError> {
        self.require(role.administered_by(), caller)?;
        self.members.remove(&(role, account));
        Ok(())
    }
}
