//! # Store Primitives
//!
//! Hardcoded runtime constants for the social graph store.
//! These are compiled into the binary and are immutable at runtime.

// =============================================================================
// IDENTITY LIMITS
// =============================================================================

/// Minimum username length in characters.
pub const USERNAME_MIN_LEN: usize = 3;

/// Maximum username length in characters.
pub const USERNAME_MAX_LEN: usize = 32;

// =============================================================================
// QUERY BOUNDS
// =============================================================================

/// Upper bound for every `limit` argument.
///
/// All queries must be computationally bounded; larger requests are clamped.
pub const MAX_LIMIT: usize = 100;

/// Default page size for following/follower listings.
pub const DEFAULT_LIST_LIMIT: usize = 20;

/// Default cap for mutual-connection results.
pub const DEFAULT_MUTUAL_LIMIT: usize = 20;

/// Default number of recommendations.
pub const DEFAULT_RECOMMEND_LIMIT: usize = 10;

/// Default number of search hits.
pub const DEFAULT_SEARCH_LIMIT: usize = 25;

/// Default number of popular users.
pub const DEFAULT_POPULAR_LIMIT: usize = 10;

/// Clamp a caller-supplied limit to `MAX_LIMIT`.
#[must_use]
pub const fn clamp_limit(limit: usize) -> usize {
    if limit > MAX_LIMIT { MAX_LIMIT } else { limit }
}

// =============================================================================
// SEARCH WEIGHTS
// =============================================================================

/// Weight of a token found in the username.
pub const USERNAME_WEIGHT: u64 = 3;

/// Weight of a token found in the display name.
pub const NAME_WEIGHT: u64 = 2;

/// Weight of a token found in the email address.
pub const EMAIL_WEIGHT: u64 = 1;

/// Multiplier applied when a query token equals an indexed token.
pub const EXACT_MATCH_FACTOR: u64 = 2;

/// Multiplier applied when a query token is a prefix of an indexed token.
pub const PREFIX_MATCH_FACTOR: u64 = 1;

// =============================================================================
// SNAPSHOT FORMAT
// =============================================================================

/// Magic bytes for the snapshot binary format header.
pub const MAGIC_BYTES: &[u8; 4] = b"SOCG";

/// Current serialization format version.
///
/// Increment this when making breaking changes to the serialization format.
pub const FORMAT_VERSION: u8 = 1;
