//! # API Request/Response Types
//!
//! This module defines the JSON structures for the HTTP API.
//!
//! Listing endpoints return the core row types (`UserSummary`,
//! `Recommendation`, `PopularUser`, `SearchResults`) directly.

use serde::{Deserialize, Serialize};
use socialgraph_core::{GraphStats, ProfileUpdate};

// =============================================================================
// HEALTH / STATUS
// =============================================================================

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

impl Default for HealthResponse {
    fn default() -> Self {
        Self {
            status: "ok".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Store status response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub user_count: usize,
    pub edge_count: usize,
    pub indexed_tokens: usize,
    pub fulltext: bool,
    pub persistent: bool,
}

impl StatusResponse {
    pub fn new(stats: GraphStats, fulltext: bool, persistent: bool) -> Self {
        Self {
            user_count: stats.user_count,
            edge_count: stats.edge_count,
            indexed_tokens: stats.indexed_tokens,
            fulltext,
            persistent,
        }
    }
}

// =============================================================================
// ACCOUNTS
// =============================================================================

/// Registration request. The password is hashed before it reaches the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub name: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub bio: String,
}

/// Login request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Profile edit request. Absent or blank fields keep the stored value.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
}

impl UpdateRequest {
    pub fn into_update(self) -> ProfileUpdate {
        let keep_blank = |v: Option<String>| v.filter(|s| !s.trim().is_empty());
        ProfileUpdate {
            name: keep_blank(self.name),
            bio: keep_blank(self.bio),
            email: keep_blank(self.email),
        }
    }
}

// =============================================================================
// RELATIONSHIPS
// =============================================================================

/// Follow/unfollow request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FollowRequest {
    pub src: String,
    pub dst: String,
}

/// Follow response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FollowResponse {
    /// `true` when the edge exists afterwards.
    pub ok: bool,
    /// `true` only when this request stored a new edge.
    pub created: bool,
}

/// Unfollow response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnfollowResponse {
    pub removed: usize,
}

// =============================================================================
// QUERY PARAMETERS
// =============================================================================

/// `?limit=&skip=` for paged listings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PageParams {
    pub limit: Option<usize>,
    #[serde(default)]
    pub skip: usize,
}

/// `?limit=` for ranked listings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LimitParams {
    pub limit: Option<usize>,
}

/// `?a=&b=&limit=` for mutual connections.
#[derive(Debug, Clone, Deserialize)]
pub struct MutualParams {
    pub a: String,
    pub b: String,
    pub limit: Option<usize>,
}

/// `?q=&limit=` for search.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub q: String,
    pub limit: Option<usize>,
}

// =============================================================================
// ERRORS
// =============================================================================

/// Error body returned with every non-2xx response from a handler.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}
