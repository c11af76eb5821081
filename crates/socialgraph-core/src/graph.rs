//! # Social Graph
//!
//! The in-memory aggregate of the three stores:
//! - `IdentityStore`: users keyed by username, unique by email
//! - `EdgeStore`: directed FOLLOWS edges
//! - `TextIndex`: ranked search over username/name/email
//!
//! Every mutation is exposed as a read-only `prepare_*` step and an
//! infallible apply step. The apply step updates all three stores together,
//! so a user is never visible in one store but missing from another.
//! `Session` places a durable commit between the two halves.
//!
//! All data structures use `BTreeMap` for deterministic ordering.

use crate::edges::EdgeStore;
use crate::identity::IdentityStore;
use crate::popularity;
use crate::primitives::clamp_limit;
use crate::query::RelationshipQuery;
use crate::search::{TextIndex, substring_matches};
use crate::validate::is_valid_username;
use crate::{
    Credentials, FollowEdge, FollowOutcome, GraphStats, NewUser, PopularUser, Profile,
    ProfileUpdate, Recommendation, SearchHit, SearchMode, SearchResults, SocialError, Timestamp,
    User, UserSummary,
};
use serde::{Deserialize, Serialize};

// =============================================================================
// FOLLOW PLAN
// =============================================================================

/// Result of validating a follow request against the current graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FollowPlan {
    /// Self-follow or malformed username.
    Rejected,
    /// The edge is already stored.
    Existing,
    /// A new edge should be stored.
    Create(FollowEdge),
}

impl FollowPlan {
    /// The outcome this plan produces once applied.
    #[must_use]
    pub const fn outcome(&self) -> FollowOutcome {
        match self {
            Self::Rejected => FollowOutcome::Rejected,
            Self::Existing => FollowOutcome::AlreadyFollowing,
            Self::Create(_) => FollowOutcome::Created,
        }
    }
}

// =============================================================================
// SOCIAL GRAPH
// =============================================================================

/// The main social graph structure.
#[derive(Debug, Clone, Default)]
pub struct SocialGraph {
    identity: IdentityStore,
    edges: EdgeStore,
    index: TextIndex,
}

impl SocialGraph {
    /// Create an empty graph. `fulltext` enables the ranked search index.
    #[must_use]
    pub fn new(fulltext: bool) -> Self {
        Self {
            identity: IdentityStore::new(),
            edges: EdgeStore::new(),
            index: TextIndex::new(fulltext),
        }
    }

    /// Rebuild a graph from stored records.
    ///
    /// A user whose username or email is already taken by an earlier record
    /// is skipped. Edges whose endpoints are not both present are dropped.
    /// The search index is rebuilt from the user records.
    #[must_use]
    pub fn from_records(
        users: impl IntoIterator<Item = User>,
        edges: impl IntoIterator<Item = FollowEdge>,
        fulltext: bool,
    ) -> Self {
        let mut graph = Self::new(fulltext);
        for user in users {
            if graph.identity.contains(&user.username)
                || graph.identity.find_by_email(&user.email).is_some()
            {
                tracing::warn!(
                    username = %user.username,
                    email = %user.email,
                    "Skipping record with a duplicate username or email"
                );
                continue;
            }
            graph.commit_user(user);
        }
        for edge in edges {
            if edge.src != edge.dst
                && graph.identity.contains(&edge.src)
                && graph.identity.contains(&edge.dst)
            {
                graph.edges.insert(&edge.src, &edge.dst, edge.since);
            }
        }
        graph
    }

    /// Whether ranked search is enabled.
    #[must_use]
    pub fn fulltext_enabled(&self) -> bool {
        self.index.is_enabled()
    }

    // =========================================================================
    // IDENTITY MUTATIONS
    // =========================================================================

    /// Validate a registration without mutating.
    pub fn prepare_register(&self, new: &NewUser, now: Timestamp) -> Result<User, SocialError> {
        self.identity.prepare_register(new, now)
    }

    /// Validate a profile edit without mutating.
    pub fn prepare_update(
        &self,
        username: &str,
        update: &ProfileUpdate,
        now: Timestamp,
    ) -> Result<User, SocialError> {
        self.identity.prepare_update(username, update, now)
    }

    /// Store a prepared user record and (re)index it.
    pub fn commit_user(&mut self, user: User) {
        self.index.index(&user);
        self.identity.apply(user);
    }

    /// Register a new user.
    pub fn register(&mut self, new: &NewUser, now: Timestamp) -> Result<User, SocialError> {
        let user = self.prepare_register(new, now)?;
        self.commit_user(user.clone());
        Ok(user)
    }

    /// Edit a user's profile. Absent fields keep their stored values.
    pub fn update(
        &mut self,
        username: &str,
        update: &ProfileUpdate,
        now: Timestamp,
    ) -> Result<User, SocialError> {
        let user = self.prepare_update(username, update, now)?;
        self.commit_user(user.clone());
        Ok(user)
    }

    // =========================================================================
    // EDGE MUTATIONS
    // =========================================================================

    /// Decide what following `dst` from `src` would do.
    ///
    /// Fails with `NotFound` when either endpoint is not registered.
    pub fn prepare_follow(
        &self,
        src: &str,
        dst: &str,
        now: Timestamp,
    ) -> Result<FollowPlan, SocialError> {
        if src == dst || !is_valid_username(src) || !is_valid_username(dst) {
            return Ok(FollowPlan::Rejected);
        }
        for endpoint in [src, dst] {
            if !self.identity.contains(endpoint) {
                return Err(SocialError::NotFound(endpoint.to_string()));
            }
        }
        if self.edges.contains(src, dst) {
            return Ok(FollowPlan::Existing);
        }
        Ok(FollowPlan::Create(FollowEdge {
            src: src.to_string(),
            dst: dst.to_string(),
            since: now,
        }))
    }

    /// Apply a follow plan produced by `prepare_follow`.
    pub fn apply_follow(&mut self, plan: &FollowPlan) -> FollowOutcome {
        if let FollowPlan::Create(edge) = plan {
            self.edges.insert(&edge.src, &edge.dst, edge.since);
        }
        plan.outcome()
    }

    /// Follow `dst` from `src`, reporting exactly what happened.
    pub fn follow_outcome(
        &mut self,
        src: &str,
        dst: &str,
        now: Timestamp,
    ) -> Result<FollowOutcome, SocialError> {
        let plan = self.prepare_follow(src, dst, now)?;
        Ok(self.apply_follow(&plan))
    }

    /// Follow `dst` from `src`.
    ///
    /// Returns `true` when the edge exists afterwards (created now or
    /// earlier) and `false` for a rejected request.
    pub fn follow(&mut self, src: &str, dst: &str, now: Timestamp) -> Result<bool, SocialError> {
        self.follow_outcome(src, dst, now).map(FollowOutcome::succeeded)
    }

    /// Remove `src -> dst`. Returns the number of edges removed (0 or 1).
    pub fn unfollow(&mut self, src: &str, dst: &str) -> usize {
        if !is_valid_username(src) || !is_valid_username(dst) {
            return 0;
        }
        usize::from(self.edges.remove(src, dst).is_some())
    }

    // =========================================================================
    // READS
    // =========================================================================

    /// Look up the full stored record.
    #[must_use]
    pub fn find(&self, username: &str) -> Option<&User> {
        self.identity.find(username)
    }

    /// Public profile of a user.
    #[must_use]
    pub fn profile(&self, username: &str) -> Option<Profile> {
        self.identity.find(username).map(User::profile)
    }

    /// Stored credential material.
    #[must_use]
    pub fn credentials(&self, username: &str) -> Option<Credentials> {
        self.identity.credentials(username)
    }

    /// Check whether `src` follows `dst`.
    #[must_use]
    pub fn is_following(&self, src: &str, dst: &str) -> bool {
        self.edges.contains(src, dst)
    }

    fn relationships(&self) -> RelationshipQuery<'_> {
        RelationshipQuery::new(&self.identity, &self.edges)
    }

    /// Users that `username` follows.
    #[must_use]
    pub fn following(&self, username: &str, limit: usize, skip: usize) -> Vec<UserSummary> {
        self.relationships().following(username, limit, skip)
    }

    /// Users following `username`.
    #[must_use]
    pub fn followers(&self, username: &str, limit: usize, skip: usize) -> Vec<UserSummary> {
        self.relationships().followers(username, limit, skip)
    }

    /// Users followed by both `u1` and `u2`.
    #[must_use]
    pub fn mutual_connections(&self, u1: &str, u2: &str, limit: usize) -> Vec<UserSummary> {
        self.relationships().mutual_connections(u1, u2, limit)
    }

    /// Two-hop follow recommendations.
    #[must_use]
    pub fn recommend(&self, username: &str, limit: usize) -> Vec<Recommendation> {
        self.relationships().recommend(username, limit)
    }

    /// Users ranked by follower count.
    #[must_use]
    pub fn popular(&self, limit: usize) -> Vec<PopularUser> {
        popularity::popular(&self.identity, &self.edges, limit)
    }

    /// Search users by username, name or email.
    ///
    /// Uses the ranked index when enabled and the query yields at least one
    /// token; otherwise falls back to a substring scan in username order.
    #[must_use]
    pub fn search(&self, query: &str, limit: usize) -> SearchResults {
        let limit = clamp_limit(limit);

        if self.index.is_enabled()
            && let Some(ranked) = self.index.rank(query, limit)
        {
            let hits = ranked
                .into_iter()
                .filter_map(|(username, score)| {
                    let user = self.identity.find(&username)?;
                    Some(SearchHit {
                        username,
                        name: user.name.clone(),
                        score: Some(score),
                    })
                })
                .collect();
            return SearchResults {
                mode: SearchMode::Ranked,
                hits,
            };
        }

        let hits = substring_matches(self.identity.iter(), query, limit)
            .into_iter()
            .map(|user| SearchHit {
                username: user.username.clone(),
                name: user.name.clone(),
                score: None,
            })
            .collect();
        SearchResults {
            mode: SearchMode::Substring,
            hits,
        }
    }

    // =========================================================================
    // ADMINISTRATION
    // =========================================================================

    /// Store-wide counters.
    #[must_use]
    pub fn stats(&self) -> GraphStats {
        GraphStats {
            user_count: self.identity.len(),
            edge_count: self.edges.len(),
            indexed_tokens: self.index.token_count(),
        }
    }

    /// Drop every user, edge and index entry.
    pub fn reset(&mut self) {
        self.identity.clear();
        self.edges.clear();
        self.index.clear();
    }

    /// All users in username order.
    pub fn users(&self) -> impl Iterator<Item = &User> {
        self.identity.iter()
    }

    /// All edges ordered by `(src, dst)`.
    pub fn edges(&self) -> impl Iterator<Item = FollowEdge> + '_ {
        self.edges.iter()
    }
}

// =============================================================================
// SERIALIZATION
// =============================================================================

/// Serializable representation of a social graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerializableGraph {
    pub users: Vec<User>,
    pub edges: Vec<FollowEdge>,
}

impl From<&SocialGraph> for SerializableGraph {
    fn from(graph: &SocialGraph) -> Self {
        Self {
            users: graph.users().cloned().collect(),
            edges: graph.edges().collect(),
        }
    }
}

impl From<SerializableGraph> for SocialGraph {
    /// Rebuilds with the ranked index enabled.
    fn from(sg: SerializableGraph) -> Self {
        Self::from_records(sg.users, sg.edges, true)
    }
}

// =============================================================================
// TESTS
// =============================================================================
