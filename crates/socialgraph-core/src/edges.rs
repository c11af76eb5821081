//! # Edge Store
//!
//! Directed FOLLOWS relationships between registered users.
//!
//! Two adjacency maps are kept in lockstep: outgoing edges carry the
//! `since` timestamp, incoming edges give O(log n) follower counts.
//! At most one edge exists per ordered pair.

use crate::{FollowEdge, Timestamp};
use std::collections::{BTreeMap, BTreeSet};

/// In-memory edge storage.
#[derive(Debug, Clone, Default)]
pub struct EdgeStore {
    /// src -> (dst -> since)
    outgoing: BTreeMap<String, BTreeMap<String, Timestamp>>,
    /// dst -> {src}
    incoming: BTreeMap<String, BTreeSet<String>>,
}

impl EdgeStore {
    /// Create a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `src -> dst` if absent.
    ///
    /// Returns `true` when a new edge was stored; an existing edge keeps its
    /// original `since`. Endpoint validation happens in `SocialGraph`.
    pub fn insert(&mut self, src: &str, dst: &str, since: Timestamp) -> bool {
        let targets = self.outgoing.entry(src.to_string()).or_default();
        if targets.contains_key(dst) {
            return false;
        }
        targets.insert(dst.to_string(), since);
        self.incoming
            .entry(dst.to_string())
            .or_default()
            .insert(src.to_string());
        true
    }

    /// Remove `src -> dst`. Returns the removed edge.
    pub fn remove(&mut self, src: &str, dst: &str) -> Option<FollowEdge> {
        let targets = self.outgoing.get_mut(src)?;
        let since = targets.remove(dst)?;
        if targets.is_empty() {
            self.outgoing.remove(src);
        }
        if let Some(sources) = self.incoming.get_mut(dst) {
            sources.remove(src);
            if sources.is_empty() {
                self.incoming.remove(dst);
            }
        }
        Some(FollowEdge {
            src: src.to_string(),
            dst: dst.to_string(),
            since,
        })
    }

    /// Get a single edge.
    #[must_use]
    pub fn get(&self, src: &str, dst: &str) -> Option<FollowEdge> {
        let since = *self.outgoing.get(src)?.get(dst)?;
        Some(FollowEdge {
            src: src.to_string(),
            dst: dst.to_string(),
            since,
        })
    }

    /// Check if `src -> dst` exists.
    #[must_use]
    pub fn contains(&self, src: &str, dst: &str) -> bool {
        self.outgoing
            .get(src)
            .is_some_and(|targets| targets.contains_key(dst))
    }

    /// Users followed by `username`, ascending.
    pub fn targets<'a>(&'a self, username: &str) -> impl Iterator<Item = &'a str> + use<'a> {
        self.outgoing
            .get(username)
            .into_iter()
            .flat_map(|targets| targets.keys().map(String::as_str))
    }

    /// Users following `username`, ascending.
    pub fn sources<'a>(&'a self, username: &str) -> impl Iterator<Item = &'a str> + use<'a> {
        self.incoming
            .get(username)
            .into_iter()
            .flat_map(|sources| sources.iter().map(String::as_str))
    }

    /// Incoming edge count; zero for unknown users.
    #[must_use]
    pub fn follower_count(&self, username: &str) -> usize {
        self.incoming.get(username).map_or(0, BTreeSet::len)
    }

    /// Total number of edges.
    #[must_use]
    pub fn len(&self) -> usize {
        self.outgoing.values().map(BTreeMap::len).sum()
    }

    /// True when there are no edges.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.outgoing.is_empty()
    }

    /// All edges ordered by `(src, dst)`.
    pub fn iter(&self) -> impl Iterator<Item = FollowEdge> + '_ {
        self.outgoing.iter().flat_map(|(src, targets)| {
            targets.iter().map(move |(dst, since)| FollowEdge {
                src: src.clone(),
                dst: dst.clone(),
                since: *since,
            })
        })
    }

    /// Drop every edge.
    pub fn clear(&mut self) {
        self.outgoing.clear();
        self.incoming.clear();
    }
}

// =============================================================================
// TESTS
// =============================================================================
