//! Users, roles and role membership.
//!
//! Entities live in slot tables indexed by identifier (`id - 1`). Deleting an
//! entity leaves an empty slot behind, so identifiers are never handed out
//! twice and anything still holding an old identifier resolves it to nothing.
//! Role memberships are not cleaned up when a role is deleted; readers go
//! through [`IdentityStore::live_roles`] or [`IdentityStore::role`] instead.

use super::credential::PasswordDigest;
use crate::error::{AuthError, Entity, Result};
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};
use std::fmt;

/// Stable user identifier, assigned from 1 upwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct UserId(pub u64);

/// Stable role identifier, assigned from 1 upwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct RoleId(pub u64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl fmt::Display for RoleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A registered user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: UserId,
    pub name: String,
    /// Role memberships as recorded. May include roles deleted since.
    pub roles: BTreeSet<RoleId>,
    digest: PasswordDigest,
}

impl User {
    pub fn digest(&self) -> &PasswordDigest {
        &self.digest
    }

    /// Raw membership test; does not check that the role still exists.
    pub fn has_role(&self, role: RoleId) -> bool {
        self.roles.contains(&role)
    }
}

/// A named role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Role {
    pub id: RoleId,
    pub name: String,
}

/// Identifier-indexed slot table with a unique-name index.
#[derive(Debug)]
struct Table<T> {
    slots: Vec<Option<T>>,
    by_name: HashMap<String, u64>,
}

impl<T> Table<T> {
    fn new() -> Self {
        Self {
            slots: Vec::new(),
            by_name: HashMap::new(),
        }
    }

    /// The identifier the next insert will receive.
    fn next_id(&self) -> u64 {
        self.slots.len() as u64 + 1
    }

    fn contains_name(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    fn insert(&mut self, name: &str, entity: T) -> u64 {
        let id = self.next_id();
        self.slots.push(Some(entity));
        self.by_name.insert(name.to_string(), id);
        id
    }

    fn slot(id: u64) -> Option<usize> {
        id.checked_sub(1).and_then(|i| usize::try_from(i).ok())
    }

    fn get(&self, id: u64) -> Option<&T> {
        Self::slot(id)
            .and_then(|i| self.slots.get(i))
            .and_then(Option::as_ref)
    }

    fn get_mut(&mut self, id: u64) -> Option<&mut T> {
        Self::slot(id)
            .and_then(|i| self.slots.get_mut(i))
            .and_then(Option::as_mut)
    }

    fn get_by_name(&self, name: &str) -> Option<&T> {
        self.by_name.get(name).and_then(|&id| self.get(id))
    }

    fn remove(&mut self, id: u64, name_of: impl Fn(&T) -> &str) -> Option<T> {
        let entity = Self::slot(id)
            .and_then(|i| self.slots.get_mut(i))
            .and_then(Option::take)?;
        self.by_name.remove(name_of(&entity));
        Some(entity)
    }

    fn len(&self) -> usize {
        self.by_name.len()
    }
}

/// Users and roles with their name indices and identifier sequences.
#[derive(Debug)]
pub struct IdentityStore {
    users: Table<User>,
    roles: Table<Role>,
}

impl IdentityStore {
    pub fn new() -> Self {
        Self {
            users: Table::new(),
            roles: Table::new(),
        }
    }

    // ── Users ───────────────────────────────────────────────────────

    /// Register a user. Fails if the name is taken or the password is empty.
    pub fn create_user(&mut self, name: &str, password: &str) -> Result<UserId> {
        if self.users.contains_name(name) {
            return Err(AuthError::AlreadyExists(Entity::User));
        }
        if password.is_empty() {
            return Err(AuthError::WeakCredential);
        }

        let id = UserId(self.users.next_id());
        let user = User {
            id,
            name: name.to_string(),
            roles: BTreeSet::new(),
            digest: PasswordDigest::of(password),
        };
        self.users.insert(name, user);

        tracing::info!(user_id = id.0, username = name, "User created");
        Ok(id)
    }

    pub fn delete_user(&mut self, id: UserId) -> Result<()> {
        let user = self
            .users
            .remove(id.0, |u| u.name.as_str())
            .ok_or(AuthError::NotFound(Entity::User))?;

        tracing::info!(user_id = id.0, username = %user.name, "User deleted");
        Ok(())
    }

    pub fn user(&self, id: UserId) -> Option<&User> {
        self.users.get(id.0)
    }

    pub fn user_by_name(&self, name: &str) -> Option<&User> {
        self.users.get_by_name(name)
    }

    pub fn user_count(&self) -> usize {
        self.users.len()
    }

    // ── Roles ───────────────────────────────────────────────────────

    pub fn create_role(&mut self, name: &str) -> Result<RoleId> {
        if self.roles.contains_name(name) {
            return Err(AuthError::AlreadyExists(Entity::Role));
        }

        let id = RoleId(self.roles.next_id());
        self.roles.insert(
            name,
            Role {
                id,
                name: name.to_string(),
            },
        );

        tracing::info!(role_id = id.0, role = name, "Role created");
        Ok(id)
    }

    /// Delete a role. Users keep the membership entry; it is skipped on read.
    pub fn delete_role(&mut self, id: RoleId) -> Result<()> {
        let role = self
            .roles
            .remove(id.0, |r| r.name.as_str())
            .ok_or(AuthError::NotFound(Entity::Role))?;

        tracing::info!(role_id = id.0, role = %role.name, "Role deleted");
        Ok(())
    }

    pub fn role(&self, id: RoleId) -> Option<&Role> {
        self.roles.get(id.0)
    }

    pub fn role_by_name(&self, name: &str) -> Option<&Role> {
        self.roles.get_by_name(name)
    }

    pub fn role_count(&self) -> usize {
        self.roles.len()
    }

    // ── Membership ──────────────────────────────────────────────────

    /// Grant a role. Granting a role the user already holds is a no-op.
    /// Returns whether the membership is new.
    pub fn add_role_to_user(&mut self, user: UserId, role: RoleId) -> Result<bool> {
        if self.users.get(user.0).is_none() {
            return Err(AuthError::NotFound(Entity::User));
        }
        if self.roles.get(role.0).is_none() {
            return Err(AuthError::NotFound(Entity::Role));
        }

        let added = self
            .users
            .get_mut(user.0)
            .map(|u| u.roles.insert(role))
            .unwrap_or(false);

        if added {
            tracing::info!(user_id = user.0, role_id = role.0, "Role granted");
        }
        Ok(added)
    }

    /// The user's memberships whose role still exists.
    pub fn live_roles(&self, user: &User) -> BTreeSet<RoleId> {
        user.roles
            .iter()
            .copied()
            .filter(|&r| self.roles.get(r.0).is_some())
            .collect()
    }
}

impl Default for IdentityStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_user_stores_digest_and_empty_roles() {
        let mut store = IdentityStore::new();
        let id = store.create_user("anna", "passw0rd").unwrap();

        let user = store.user_by_name("anna").unwrap();
        assert_eq!(user.id, id);
        assert_eq!(user.name, "anna");
        assert_eq!(user.digest(), &PasswordDigest::of("passw0rd"));
        assert!(user.roles.is_empty());
    }

    #[test]
    fn create_user_rejects_empty_password() {
        let mut store = IdentityStore::new();
        assert_eq!(
            store.create_user("dummy", ""),
            Err(AuthError::WeakCredential)
        );
        assert_eq!(store.user_count(), 0);
    }

    #[test]
    fn duplicate_user_name_rejected_and_original_kept() {
        let mut store = IdentityStore::new();
        let id = store.create_user("anna", "passw0rd").unwrap();

        assert_eq!(
            store.create_user("anna", "passw1rd"),
            Err(AuthError::AlreadyExists(Entity::User))
        );

        let user = store.user(id).unwrap();
        assert_eq!(user.digest(), &PasswordDigest::of("passw0rd"));
        assert_eq!(store.user_count(), 1);
    }

    #[test]
    fn user_ids_start_at_one_and_increment() {
        let mut store = IdentityStore::new();
        assert_eq!(store.create_user("anna", "a").unwrap(), UserId(1));
        assert_eq!(store.create_user("belle", "b").unwrap(), UserId(2));
    }

    #[test]
    fn user_ids_never_reused_after_delete() {
        let mut store = IdentityStore::new();
        let a = store.create_user("anna", "a").unwrap();
        let b = store.create_user("belle", "b").unwrap();
        store.delete_user(b).unwrap();
        store.delete_user(a).unwrap();

        let c = store.create_user("anna", "a").unwrap();
        assert_eq!(c, UserId(3));
        assert!(store.user(a).is_none());
        assert!(store.user(b).is_none());
        assert_eq!(store.user_by_name("anna").unwrap().id, c);
    }

    #[test]
    fn delete_user_twice_fails() {
        let mut store = IdentityStore::new();
        let id = store.create_user("phoebe", "weakpswd").unwrap();

        assert_eq!(
            store.delete_user(UserId(101)),
            Err(AuthError::NotFound(Entity::User))
        );
        assert!(store.delete_user(id).is_ok());
        assert_eq!(
            store.delete_user(id),
            Err(AuthError::NotFound(Entity::User))
        );
        assert!(store.user_by_name("phoebe").is_none());
    }

    #[test]
    fn lookups_of_missing_entities_are_none() {
        let store = IdentityStore::new();
        assert!(store.user(UserId(0)).is_none());
        assert!(store.user(UserId(7)).is_none());
        assert!(store.user_by_name("nobody").is_none());
        assert!(store.role(RoleId(1)).is_none());
        assert!(store.role_by_name("nothing").is_none());
    }

    #[test]
    fn roles_mirror_user_semantics() {
        let mut store = IdentityStore::new();
        let id = store.create_role("fuseblk").unwrap();
        assert_eq!(id, RoleId(1));
        assert_eq!(
            store.role_by_name("fuseblk"),
            Some(&Role {
                id,
                name: "fuseblk".into()
            })
        );
        assert_eq!(
            store.create_role("fuseblk"),
            Err(AuthError::AlreadyExists(Entity::Role))
        );
        assert_eq!(store.create_role("plugdev").unwrap(), RoleId(2));

        assert!(store.delete_role(id).is_ok());
        assert_eq!(
            store.delete_role(id),
            Err(AuthError::NotFound(Entity::Role))
        );
        assert_eq!(store.create_role("fuseblk").unwrap(), RoleId(3));
    }

    #[test]
    fn add_role_checks_user_then_role() {
        let mut store = IdentityStore::new();
        let uid = store.create_user("phoebe", "weakpswd").unwrap();
        let rid = store.create_role("scanner").unwrap();

        assert_eq!(
            store.add_role_to_user(uid, RoleId(101)),
            Err(AuthError::NotFound(Entity::Role))
        );
        assert_eq!(
            store.add_role_to_user(UserId(101), rid),
            Err(AuthError::NotFound(Entity::User))
        );
        assert_eq!(
            store.add_role_to_user(UserId(101), RoleId(101)),
            Err(AuthError::NotFound(Entity::User))
        );
    }

    #[test]
    fn add_role_is_idempotent() {
        let mut store = IdentityStore::new();
        let uid = store.create_user("phoebe", "weakpswd").unwrap();
        let rid = store.create_role("scanner").unwrap();

        assert_eq!(store.add_role_to_user(uid, rid), Ok(true));
        assert_eq!(store.add_role_to_user(uid, rid), Ok(false));

        let user = store.user(uid).unwrap();
        assert_eq!(user.roles.len(), 1);
        assert!(user.has_role(rid));
    }

    #[test]
    fn deleted_role_membership_stays_but_is_not_live() {
        let mut store = IdentityStore::new();
        let uid = store.create_user("elton", "123456").unwrap();
        let scanner = store.create_role("scanner").unwrap();
        let plugdev = store.create_role("plugdev").unwrap();
        store.add_role_to_user(uid, scanner).unwrap();
        store.add_role_to_user(uid, plugdev).unwrap();

        store.delete_role(scanner).unwrap();

        let user = store.user(uid).unwrap();
        assert!(user.has_role(scanner));
        assert_eq!(store.live_roles(user), BTreeSet::from([plugdev]));
    }
}
