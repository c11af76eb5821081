//! # socialgraph-core
//!
//! The deterministic store behind the social graph service.
//!
//! Users are nodes keyed by username; FOLLOWS are directed edges between
//! them. On top of the raw records the crate answers relationship queries
//! (following, followers, mutual connections, two-hop recommendations),
//! ranks users by popularity and serves text search over an inverted index.
//!
//! ## Architectural Constraints
//!
//! - Pure Rust: NO async, NO network dependencies
//! - `BTreeMap` only, so every listing has a stable order
//! - Integer arithmetic only, search scores included
//! - Queries fail closed: bad input yields an empty result, not an error

// =============================================================================
// MODULES
// =============================================================================

pub mod edges;
pub mod formats;
pub mod graph;
pub mod identity;
pub mod popularity;
pub mod primitives;
pub mod query;
pub mod search;
pub mod session;
pub mod storage;
pub mod types;
pub mod validate;

// =============================================================================
// RE-EXPORTS: Core Types (from types module)
// =============================================================================

pub use types::{
    BulkReport, Credentials, FollowEdge, FollowOutcome, GraphStats, NewUser, PopularUser, Profile,
    ProfileUpdate, Recommendation, SearchHit, SearchMode, SearchResults, SocialError, Timestamp,
    User, UserSummary,
};

// =============================================================================
// RE-EXPORTS: Store
// =============================================================================

pub use edges::EdgeStore;
pub use graph::{FollowPlan, SerializableGraph, SocialGraph};
pub use identity::IdentityStore;
pub use query::RelationshipQuery;
pub use search::{SearchDocument, TextIndex};
pub use session::{Session, SharedSession, StorageBackend};
pub use storage::RedbStore;

// =============================================================================
// RE-EXPORTS: Formats (from formats module)
// =============================================================================

pub use formats::{
    SnapshotHeader, graph_from_bytes, graph_to_bytes, snapshot_from_bytes, snapshot_to_bytes,
};
