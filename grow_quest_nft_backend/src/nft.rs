use candid::{CandidType, Deserialize, Principal};
use serde::Serialize;
use std::collections::BTreeMap;

use crate::roles::{Role, RoleRegistry};
use crate::types::NftError;

// =============================================================================
// CONSTANTS
// =============================================================================

/// Experience required per level. A fresh token (0 XP) is level 1;
/// 1100 XP is level 2.
pub const XP_PER_LEVEL: u64 = 1000;

// =============================================================================
// TOKEN RECORD
// =============================================================================

/// Per-token record. Level is always derived from experience on read, never
/// stored, so the two cannot drift apart.
#[derive(CandidType, Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
pub struct TokenData {
    pub owner: Principal,
    pub experience: u64,
    /// Single approved-spender slot; cleared whenever the token moves or
    /// burns (approval is consumed on use).
    pub approved: Option<Principal>,
}

// =============================================================================
// NFT STORE
// =============================================================================

/// GrowQuest NFT state machine: sequential ids, monotonic experience and a
/// derived level. Burned ids are never reused and read as `NotFound`.
#[derive(CandidType, Deserialize, Serialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct NftStore {
    next_id: u64,
    tokens: BTreeMap<u64, TokenData>,
    roles: RoleRegistry,
}

impl NftStore {
    pub fn new(installer: Principal) -> Self {
        NftStore {
            roles: RoleRegistry::bootstrap(installer),
            ..Default::default()
        }
    }

    // =========================================================================
    // QUERIES
    // =========================================================================

    pub fn owner_of(&self, token_id: u64) -> Result<Principal, NftError> {
        Ok(self.token(token_id)?.owner)
    }

    pub fn experience_of(&self, token_id: u64) -> Result<u64, NftError> {
        Ok(self.token(token_id)?.experience)
    }

    pub fn level_of(&self, token_id: u64) -> Result<u64, NftError> {
        Ok(self.experience_of(token_id)? / XP_PER_LEVEL + 1)
    }

    pub fn get_approved(&self, token_id: u64) -> Result<Option<Principal>, NftError> {
        Ok(self.token(token_id)?.approved)
    }

    pub fn has_role(&self, role: Role, account: Principal) -> bool {
        self.roles.has_role(role, account)
    }

    /// How many ids have ever been allocated (includes burned tokens).
    pub fn minted_count(&self) -> u64 {
        self.next_id
    }

    // =========================================================================
    // ROLE ADMINISTRATION
    // =========================================================================

    pub fn grant_role(
        &mut self,
        role: Role,
        account: Principal,
        caller: Principal,
    ) -> Result<(), NftError> {
        self.roles.grant(role, account, caller)
    }

    pub fn revoke_role(
        &mut self,
        role: Role,
        account: Principal,
        caller: Principal,
    ) -> Result<(), NftError> {
        self.roles.revoke(role, account, caller)
    }

    // =========================================================================
    // MUTATIONS
    // =========================================================================

    /// Mint a fresh token to `to` with zero experience. Caller must hold
    /// `Minter`. Returns the new token id.
    pub fn mint(&mut self, to: Principal, caller: Principal) -> Result<u64, NftError> {
        self.roles.require(Role::Minter, caller)?;
        let token_id = self.next_id;
        self.next_id += 1;
        self.tokens.insert(
            token_id,
            TokenData {
                owner: to,
                experience: 0,
                approved: None,
            },
        );
        Ok(token_id)
    }

    /// Add `delta` experience. Caller must hold `XpManager`. Experience
    /// only ever grows; overflow is rejected rather than wrapped. Returns
    /// the new experience total.
    pub fn add_experience(
        &mut self,
        token_id: u64,
        delta: u64,
        caller: Principal,
    ) -> Result<u64, NftError> {
        self.roles.require(Role::XpManager, caller)?;
        let token = self.token_mut(token_id)?;
        token.experience =
            token
                .experience
                .checked_add(delta)
                .ok_or_else(|| NftError::InvalidAmount {
                    reason: "experience overflow".to_string(),
                })?;
        Ok(token.experience)
    }

    /// Set the approved spender. Only the current owner may approve;
    /// approving replaces any previous approval.
    pub fn approve(
        &mut self,
        token_id: u64,
        spender: Principal,
        caller: Principal,
    ) -> Result<(), NftError> {
        let token = self.token_mut(token_id)?;
        if token.owner != caller {
            return Err(NftError::NotOwner {
                token_id,
                caller,
                owner: token.owner,
            });
        }
        token.approved = Some(spender);
        Ok(())
    }

    /// Move ownership to `to`. Caller must be the owner or the approved
    /// spender; the approval is consumed.
    pub fn transfer(
        &mut self,
        token_id: u64,
        to: Principal,
        caller: Principal,
    ) -> Result<(), NftError> {
        let token = self.token_mut(token_id)?;
        if token.owner != caller && token.approved != Some(caller) {
            return Err(NftError::NotOwnerOrApproved { token_id, caller });
        }
        token.owner = to;
        token.approved = None;
        Ok(())
    }

    /// Destroy the token: owner, experience and approval all go away and
    /// every further read of this id fails with `NotFound`. Caller must be
    /// the owner or the approved spender; no role overrides this.
    pub fn burn(&mut self, token_id: u64, caller: Principal) -> Result<(), NftError> {
        let token = self.token(token_id)?;
        if token.owner != caller && token.approved != Some(caller) {
            return Err(NftError::NotOwnerOrApproved { token_id, caller });
        }
        self.tokens.remove(&token_id);
        Ok(())
    }

    // =========================================================================
    // INTERNAL
    // =========================================================================

    fn token(&self, token_id: u64) -> Result<&TokenData, NftError> {
        self.tokens.get(&token_id).ok_or(NftError::NotFound { token_id })
    }

    fn token_mut(&mut self, token_id: u64) -> Result<&mut TokenData, NftError> {
        self.tokens
            .get_mut(&token_id)
            .ok_or(NftError::NotFound { token_id })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn principal(id: u8) -> Principal {
        Principal::from_slice(&[id, 0x04])
    }

    /// Store with `admin` holding Admin, Minter and XpManager.
    fn operated_store(admin: Principal) -> NftStore {
        let mut store = NftStore::new(admin);
        store.grant_role(Role::Minter, admin, admin).unwrap();
        store.grant_role(Role::XpManager, admin, admin).unwrap();
        store
    }

    #[test]
    fn test_mint_requires_minter_role() {
        let admin = principal(1);
        let user = principal(2);
        let mut store = NftStore::new(admin);

        let err = store.mint(user, user).unwrap_err();
        assert_eq!(
            err,
            NftError::Unauthorized {
                required: Role::Minter,
                caller: user,
            }
        );

        store.grant_role(Role::Minter, admin, admin).unwrap();
        let id = store.mint(user, admin).unwrap();
        assert_eq!(id, 0);
        assert_eq!(store.owner_of(0).unwrap(), user);
    }

    #[test]
    fn test_ids_are_sequential_and_never_reused() {
        let admin = principal(1);
        let user = principal(2);
        let mut store = operated_store(admin);

        assert_eq!(store.mint(user, admin).unwrap(), 0);
        assert_eq!(store.mint(user, admin).unwrap(), 1);
        store.burn(1, user).unwrap();
        assert_eq!(store.mint(user, admin).unwrap(), 2);
        assert_eq!(store.minted_count(), 3);
    }

    #[test]
    fn test_experience_and_level_tracking() {
        let admin = principal(1);
        let user = principal(2);
        let mut store = operated_store(admin);
        let id = store.mint(user, admin).unwrap();

        assert_eq!(store.experience_of(id).unwrap(), 0);
        assert_eq!(store.level_of(id).unwrap(), 1);

        store.add_experience(id, 500, admin).unwrap();
        assert_eq!(store.experience_of(id).unwrap(), 500);
        assert_eq!(store.level_of(id).unwrap(), 1);

        store.add_experience(id, 600, admin).unwrap();
        assert_eq!(store.experience_of(id).unwrap(), 1100);
        assert_eq!(store.level_of(id).unwrap(), 2);
    }

    #[test]
    fn test_experience_is_monotonic() {
        let admin = principal(1);
        let mut store = operated_store(admin);
        let id = store.mint(principal(2), admin).unwrap();

        let mut previous = 0;
        for delta in [0, 1, 999, 1, 12_345] {
            let now = store.add_experience(id, delta, admin).unwrap();
            assert!(now >= previous);
            assert_eq!(store.level_of(id).unwrap(), now / XP_PER_LEVEL + 1);
            previous = now;
        }
    }

    #[test]
    fn test_add_experience_requires_xp_manager() {
        let admin = principal(1);
        let user = principal(2);
        let mut store = operated_store(admin);
        let id = store.mint(user, admin).unwrap();

        let err = store.add_experience(id, 100, user).unwrap_err();
        assert!(matches!(err, NftError::Unauthorized { .. }));
        assert_eq!(store.experience_of(id).unwrap(), 0);
    }

    #[test]
    fn test_add_experience_to_missing_token_fails() {
        let admin = principal(1);
        let mut store = operated_store(admin);

        let err = store.add_experience(999, 100, admin).unwrap_err();
        assert_eq!(err, NftError::NotFound { token_id: 999 });
    }

    #[test]
    fn test_experience_overflow_rejected() {
        let admin = principal(1);
        let mut store = operated_store(admin);
        let id = store.mint(principal(2), admin).unwrap();

        store.add_experience(id, u64::MAX, admin).unwrap();
        let err = store.add_experience(id, 1, admin).unwrap_err();
        assert!(matches!(err, NftError::InvalidAmount { .. }));
        assert_eq!(store.experience_of(id).unwrap(), u64::MAX);
    }

    #[test]
    fn test_only_owner_may_approve() {
        let admin = principal(1);
        let user = principal(2);
        let stranger = principal(3);
        let mut store = operated_store(admin);
        let id = store.mint(user, admin).unwrap();

        let err = store.approve(id, stranger, stranger).unwrap_err();
        assert_eq!(
            err,
            NftError::NotOwner {
                token_id: id,
                caller: stranger,
                owner: user,
            }
        );

        store.approve(id, stranger, user).unwrap();
        assert_eq!(store.get_approved(id).unwrap(), Some(stranger));

        // Re-approving replaces the single slot.
        store.approve(id, admin, user).unwrap();
        assert_eq!(store.get_approved(id).unwrap(), Some(admin));
    }

    #[test]
    fn test_transfer_consumes_approval() {
        let admin = principal(1);
        let user = principal(2);
        let spender = principal(3);
        let mut store = operated_store(admin);
        let id = store.mint(user, admin).unwrap();

        store.approve(id, spender, user).unwrap();
        store.transfer(id, spender, spender).unwrap();

        assert_eq!(store.owner_of(id).unwrap(), spender);
        assert_eq!(store.get_approved(id).unwrap(), None);

        // The old approval is gone; the previous owner has no rights left.
        let err = store.transfer(id, user, user).unwrap_err();
        assert!(matches!(err, NftError::NotOwnerOrApproved { .. }));
    }

    #[test]
    fn test_burn_by_owner_clears_everything() {
        let admin = principal(1);
        let user = principal(2);
        let mut store = operated_store(admin);
        let id = store.mint(user, admin).unwrap();
        store.add_experience(id, 1500, admin).unwrap();

        store.burn(id, user).unwrap();

        assert_eq!(store.owner_of(id).unwrap_err(), NftError::NotFound { token_id: id });
        assert!(store.experience_of(id).is_err());
        assert!(store.level_of(id).is_err());
        assert!(store.get_approved(id).is_err());
        assert_eq!(store.burn(id, user).unwrap_err(), NftError::NotFound { token_id: id });
    }

    #[test]
    fn test_burn_by_approved_spender() {
        let admin = principal(1);
        let user = principal(2);
        let utility = principal(3);
        let mut store = operated_store(admin);
        let id = store.mint(user, admin).unwrap();

        // Not approved yet: rejected, token untouched.
        let err = store.burn(id, utility).unwrap_err();
        assert!(matches!(err, NftError::NotOwnerOrApproved { .. }));
        assert_eq!(store.owner_of(id).unwrap(), user);

        store.approve(id, utility, user).unwrap();
        store.burn(id, utility).unwrap();
        assert!(store.owner_of(id).is_err());
    }

    #[test]
    fn test_no_admin_override_on_burn() {
        let admin = principal(1);
        let user = principal(2);
        let mut store = operated_store(admin);
        let id = store.mint(user, admin).unwrap();

        // Admin + Minter + XpManager still cannot burn someone else's token.
        let err = store.burn(id, admin).unwrap_err();
        assert!(matches!(err, NftError::NotOwnerOrApproved { .. }));
        assert_eq!(store.owner_of(id).unwrap(), user);
    }
}
