//! # Core Type Definitions
//!
//! This module contains all core types for the social graph store:
//! - Identity records (`User`, `Profile`, `Credentials`, `NewUser`, `ProfileUpdate`)
//! - Relationship records (`FollowEdge`, `FollowOutcome`)
//! - Query result rows (`UserSummary`, `Recommendation`, `PopularUser`, `SearchHit`)
//! - Error types (`SocialError`)
//!
//! ## Determinism Guarantees
//!
//! All types in this module:
//! - Use integer arithmetic only (no floating-point, search scores included)
//! - Implement `Ord` where they are used as ordered-collection keys

use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use thiserror::Error;

// =============================================================================
// TIMESTAMP
// =============================================================================

/// Milliseconds since the Unix epoch.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub struct Timestamp(pub u64);

impl Timestamp {
    /// Current wall-clock time.
    ///
    /// A clock set before the epoch reads as zero rather than failing.
    #[must_use]
    pub fn now() -> Self {
        let elapsed = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or(Duration::ZERO);
        Self(u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX))
    }

    /// Get the raw millisecond value.
    #[must_use]
    pub const fn millis(self) -> u64 {
        self.0
    }
}

// =============================================================================
// USER
// =============================================================================

/// A registered member of the graph, keyed by `username` and unique by `email`.
///
/// `password_hash` and `salt` are opaque to the store; they are produced and
/// checked by the login collaborator. Bulk-imported users carry empty strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub username: String,
    pub name: String,
    pub email: String,
    pub bio: String,
    pub password_hash: String,
    pub salt: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl User {
    /// Public projection without credential material.
    #[must_use]
    pub fn profile(&self) -> Profile {
        Profile {
            username: self.username.clone(),
            name: self.name.clone(),
            email: self.email.clone(),
            bio: self.bio.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }

    /// Listing row for this user.
    #[must_use]
    pub fn summary(&self) -> UserSummary {
        UserSummary {
            username: self.username.clone(),
            name: self.name.clone(),
        }
    }

    /// Stored credential material.
    #[must_use]
    pub fn credentials(&self) -> Credentials {
        Credentials {
            password_hash: self.password_hash.clone(),
            salt: self.salt.clone(),
        }
    }
}

/// Public view of a user, safe to hand to any caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub username: String,
    pub name: String,
    pub email: String,
    pub bio: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Stored `(hash, salt)` pair used for password verification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub password_hash: String,
    pub salt: String,
}

/// Registration input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct NewUser {
    pub username: String,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub bio: String,
    #[serde(default)]
    pub password_hash: String,
    #[serde(default)]
    pub salt: String,
}

impl NewUser {
    /// Registration input without credentials (bulk imports, tests).
    #[must_use]
    pub fn new(
        username: impl Into<String>,
        name: impl Into<String>,
        email: impl Into<String>,
        bio: impl Into<String>,
    ) -> Self {
        Self {
            username: username.into(),
            name: name.into(),
            email: email.into(),
            bio: bio.into(),
            password_hash: String::new(),
            salt: String::new(),
        }
    }

    /// Attach an opaque `(hash, salt)` pair.
    #[must_use]
    pub fn with_credentials(mut self, password_hash: String, salt: String) -> Self {
        self.password_hash = password_hash;
        self.salt = salt;
        self
    }
}

/// Partial profile edit. `None` keeps the stored value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ProfileUpdate {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

impl ProfileUpdate {
    /// True when the update touches an indexed field.
    #[must_use]
    pub fn touches_index(&self) -> bool {
        self.name.is_some() || self.email.is_some()
    }
}

// =============================================================================
// EDGES
// =============================================================================

/// A directed FOLLOWS relationship.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FollowEdge {
    pub src: String,
    pub dst: String,
    pub since: Timestamp,
}

/// What a follow request did to the Edge Store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FollowOutcome {
    /// A new edge was stored.
    Created,
    /// The edge already existed; `since` is unchanged.
    AlreadyFollowing,
    /// Self-follow or malformed username. Nothing was touched.
    Rejected,
}

impl FollowOutcome {
    /// Caller-facing success flag: both create and re-follow count as success.
    #[must_use]
    pub const fn succeeded(self) -> bool {
        matches!(self, Self::Created | Self::AlreadyFollowing)
    }
}

// =============================================================================
// QUERY RESULT ROWS
// =============================================================================

/// `(username, name)` row used by listings.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UserSummary {
    pub username: String,
    pub name: String,
}

/// A two-hop recommendation candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recommendation {
    pub username: String,
    pub name: String,
    /// Distinct followed users that themselves follow the candidate.
    pub mutuals: usize,
    /// Total incoming edges of the candidate.
    pub followers: usize,
}

/// Row of the "explore popular users" ranking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PopularUser {
    pub username: String,
    pub name: String,
    pub follower_count: usize,
}

/// Which search strategy produced a result set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchMode {
    /// Token index ranking; every hit carries a score.
    Ranked,
    /// Case-insensitive substring fallback; no scores, username order.
    Substring,
}

/// A single search result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchHit {
    pub username: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<u64>,
}

/// Search hits plus the mode that produced them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResults {
    pub mode: SearchMode,
    pub hits: Vec<SearchHit>,
}

impl SearchResults {
    /// True when no user matched.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }
}

/// Outcome of a bulk load call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BulkReport {
    pub inserted: usize,
    pub skipped: usize,
}

/// Store-wide counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GraphStats {
    pub user_count: usize,
    pub edge_count: usize,
    pub indexed_tokens: usize,
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors that can occur in the social graph store.
///
/// Read-side queries never produce `NotFound`; only mutations that require
/// an existing user surface it.
#[derive(Debug, Error)]
pub enum SocialError {
    /// Registration or email change collided with an existing username/email.
    #[error("Duplicate key: {0}")]
    DuplicateKey(String),

    /// A mutation referenced a username that does not exist.
    #[error("User not found: {0}")]
    NotFound(String),

    /// Username or email failed validation.
    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    /// A serialization or deserialization error occurred.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// An I/O or storage engine error occurred.
    #[error("I/O error: {0}")]
    IoError(String),

    /// A writer panicked while holding the store lock.
    #[error("Store lock poisoned")]
    LockPoisoned,
}

impl SocialError {
    /// True for errors a bulk loader should count as "skip" rather than abort.
    #[must_use]
    pub fn is_skippable(&self) -> bool {
        matches!(
            self,
            Self::DuplicateKey(_) | Self::NotFound(_) | Self::InvalidFormat(_)
        )
    }
}

// =============================================================================
// TESTS
// =============================================================================
