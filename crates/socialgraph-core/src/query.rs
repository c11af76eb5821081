//! # Relationship Query Engine
//!
//! Read-only traversals over the Identity Store and Edge Store:
//! following/follower listings, mutual connections and two-hop
//! recommendations.
//!
//! Every query fails closed: a malformed username, a self-pair or an unknown
//! user yields an empty result, never an error. All `limit`s are clamped to
//! `MAX_LIMIT`.

use crate::edges::EdgeStore;
use crate::identity::IdentityStore;
use crate::primitives::clamp_limit;
use crate::validate::is_valid_username;
use crate::{Recommendation, UserSummary};
use std::collections::{BTreeMap, BTreeSet};

/// Borrowed view used to answer relationship queries.
#[derive(Debug, Clone, Copy)]
pub struct RelationshipQuery<'a> {
    identity: &'a IdentityStore,
    edges: &'a EdgeStore,
}

impl<'a> RelationshipQuery<'a> {
    /// Create a query view over the two stores.
    #[must_use]
    pub fn new(identity: &'a IdentityStore, edges: &'a EdgeStore) -> Self {
        Self { identity, edges }
    }

    fn summaries(&self, usernames: impl Iterator<Item = &'a str>) -> Vec<UserSummary> {
        usernames
            .filter_map(|u| self.identity.find(u))
            .map(|u| u.summary())
            .collect()
    }

    /// Users that `username` follows, ascending, paginated.
    #[must_use]
    pub fn following(&self, username: &str, limit: usize, skip: usize) -> Vec<UserSummary> {
        if !is_valid_username(username) {
            return Vec::new();
        }
        self.summaries(self.edges.targets(username).skip(skip).take(clamp_limit(limit)))
    }

    /// Users that follow `username`, ascending, paginated.
    #[must_use]
    pub fn followers(&self, username: &str, limit: usize, skip: usize) -> Vec<UserSummary> {
        if !is_valid_username(username) {
            return Vec::new();
        }
        self.summaries(self.edges.sources(username).skip(skip).take(clamp_limit(limit)))
    }

    /// Users followed by both `u1` and `u2`, ascending.
    #[must_use]
    pub fn mutual_connections(&self, u1: &str, u2: &str, limit: usize) -> Vec<UserSummary> {
        if !is_valid_username(u1) || !is_valid_username(u2) || u1 == u2 {
            return Vec::new();
        }
        let second: BTreeSet<&str> = self.edges.targets(u2).collect();
        let common = self
            .edges
            .targets(u1)
            .filter(|m| second.contains(m))
            .take(clamp_limit(limit));
        self.summaries(common)
    }

    /// Two-hop recommendations for `username`.
    ///
    /// Candidates are reached through a followed user, are not already
    /// followed, and are not `username` itself. Ordered by mutuals
    /// descending, then followers descending, then username ascending.
    #[must_use]
    pub fn recommend(&self, username: &str, limit: usize) -> Vec<Recommendation> {
        if !is_valid_username(username) || !self.identity.contains(username) {
            return Vec::new();
        }

        let followed: BTreeSet<&str> = self.edges.targets(username).collect();

        // Each friend is visited once and its targets are distinct, so the
        // tally counts distinct intermediate users.
        let mut mutuals: BTreeMap<&str, usize> = BTreeMap::new();
        for friend in &followed {
            for candidate in self.edges.targets(friend) {
                if candidate == username || followed.contains(candidate) {
                    continue;
                }
                let slot = mutuals.entry(candidate).or_insert(0);
                *slot = slot.saturating_add(1);
            }
        }

        let mut ranked: Vec<Recommendation> = mutuals
            .into_iter()
            .filter_map(|(candidate, count)| {
                let user = self.identity.find(candidate)?;
                Some(Recommendation {
                    username: user.username.clone(),
                    name: user.name.clone(),
                    mutuals: count,
                    followers: self.edges.follower_count(candidate),
                })
            })
            .collect();

        ranked.sort_by(|a, b| {
            b.mutuals
                .cmp(&a.mutuals)
                .then_with(|| b.followers.cmp(&a.followers))
                .then_with(|| a.username.cmp(&b.username))
        });
        ranked.truncate(clamp_limit(limit));
        ranked
    }
}

// =============================================================================
// TESTS
// =============================================================================
