//! # Identity Store
//!
//! Holds `User` records keyed by username, with a secondary email index
//! enforcing email uniqueness.
//!
//! Every mutation is split into a read-only *prepare* step that validates
//! and builds the new record, and an infallible *apply* step. Callers that
//! persist (see `Session`) run prepare, commit to disk, then apply; callers
//! that don't use the combined `register`/`update` helpers.

use crate::validate::{is_valid_email, is_valid_username};
use crate::{Credentials, NewUser, ProfileUpdate, SocialError, Timestamp, User};
use std::collections::BTreeMap;

/// In-memory identity storage.
///
/// Uses `BTreeMap` exclusively so iteration is in username order.
#[derive(Debug, Clone, Default)]
pub struct IdentityStore {
    /// username -> User
    users: BTreeMap<String, User>,
    /// email -> username
    emails: BTreeMap<String, String>,
}

impl IdentityStore {
    /// Create a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate a registration and build the record it would insert.
    ///
    /// Does not mutate. Fails with `InvalidFormat` for a bad username/email
    /// and `DuplicateKey` when either key is taken.
    pub fn prepare_register(&self, new: &NewUser, now: Timestamp) -> Result<User, SocialError> {
        if !is_valid_username(&new.username) {
            return Err(SocialError::InvalidFormat(format!(
                "username '{}'",
                new.username
            )));
        }
        if !is_valid_email(&new.email) {
            return Err(SocialError::InvalidFormat(format!("email '{}'", new.email)));
        }
        if self.users.contains_key(&new.username) {
            return Err(SocialError::DuplicateKey(format!(
                "username '{}' already exists",
                new.username
            )));
        }
        if self.emails.contains_key(&new.email) {
            return Err(SocialError::DuplicateKey(format!(
                "email '{}' already exists",
                new.email
            )));
        }

        Ok(User {
            username: new.username.clone(),
            name: new.name.clone(),
            email: new.email.clone(),
            bio: new.bio.clone(),
            password_hash: new.password_hash.clone(),
            salt: new.salt.clone(),
            created_at: now,
            updated_at: now,
        })
    }

    /// Validate a profile edit and build the updated record.
    ///
    /// `updated_at` is refreshed even when no field changes, and never moves
    /// backwards.
    pub fn prepare_update(
        &self,
        username: &str,
        update: &ProfileUpdate,
        now: Timestamp,
    ) -> Result<User, SocialError> {
        let current = self
            .users
            .get(username)
            .ok_or_else(|| SocialError::NotFound(username.to_string()))?;

        if let Some(email) = &update.email {
            if !is_valid_email(email) {
                return Err(SocialError::InvalidFormat(format!("email '{}'", email)));
            }
            if let Some(owner) = self.emails.get(email)
                && owner != username
            {
                return Err(SocialError::DuplicateKey(format!(
                    "email '{}' already exists",
                    email
                )));
            }
        }

        let mut updated = current.clone();
        if let Some(name) = &update.name {
            updated.name.clone_from(name);
        }
        if let Some(bio) = &update.bio {
            updated.bio.clone_from(bio);
        }
        if let Some(email) = &update.email {
            updated.email.clone_from(email);
        }
        updated.updated_at = now.max(current.updated_at);
        Ok(updated)
    }

    /// Insert or replace a record produced by a prepare step.
    ///
    /// Returns the record it replaced, if any.
    pub fn apply(&mut self, user: User) -> Option<User> {
        let previous = self.users.remove(&user.username);
        if let Some(prev) = &previous {
            self.emails.remove(&prev.email);
        }
        self.emails.insert(user.email.clone(), user.username.clone());
        self.users.insert(user.username.clone(), user);
        previous
    }

    /// Register a new user.
    pub fn register(&mut self, new: &NewUser, now: Timestamp) -> Result<User, SocialError> {
        let user = self.prepare_register(new, now)?;
        self.apply(user.clone());
        Ok(user)
    }

    /// Edit a profile in place.
    pub fn update(
        &mut self,
        username: &str,
        update: &ProfileUpdate,
        now: Timestamp,
    ) -> Result<User, SocialError> {
        let user = self.prepare_update(username, update, now)?;
        self.apply(user.clone());
        Ok(user)
    }

    /// Look up a user by username.
    #[must_use]
    pub fn find(&self, username: &str) -> Option<&User> {
        self.users.get(username)
    }

    /// Look up the owner of an email address.
    #[must_use]
    pub fn find_by_email(&self, email: &str) -> Option<&User> {
        self.emails.get(email).and_then(|u| self.users.get(u))
    }

    /// Stored credential material for login verification.
    #[must_use]
    pub fn credentials(&self, username: &str) -> Option<Credentials> {
        self.users.get(username).map(User::credentials)
    }

    /// Check whether a username is registered.
    #[must_use]
    pub fn contains(&self, username: &str) -> bool {
        self.users.contains_key(username)
    }

    /// All users in username order.
    pub fn iter(&self) -> impl Iterator<Item = &User> {
        self.users.values()
    }

    /// Number of registered users.
    #[must_use]
    pub fn len(&self) -> usize {
        self.users.len()
    }

    /// True when no user is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    /// Drop every record.
    pub fn clear(&mut self) {
        self.users.clear();
        self.emails.clear();
    }
}

// =============================================================================
// TESTS
// =============================================================================
