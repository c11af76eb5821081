//! # Session Module
//!
//! A `Session` owns the in-memory `SocialGraph` plus an optional durable
//! backend.
//!
//! ## Storage Backends
//!
//! - `InMemory`: the graph is the only copy (volatile unless snapshotted)
//! - `Persistent`: every mutation is committed to `RedbStore` first
//!
//! ## Write Path
//!
//! Mutations run in three steps: the graph validates and builds the change
//! (`prepare_*`), the backend commits it, then the graph applies it. A failed
//! commit leaves memory untouched, so disk and memory never disagree.
//!
//! `SharedSession` wraps a session for concurrent callers: reads proceed in
//! parallel, writes are serialized.

use crate::graph::{FollowPlan, SerializableGraph, SocialGraph};
use crate::storage::RedbStore;
use crate::{
    BulkReport, Credentials, FollowEdge, FollowOutcome, GraphStats, NewUser, PopularUser, Profile,
    ProfileUpdate, Recommendation, SearchResults, SocialError, Timestamp, User, UserSummary,
};
use std::collections::BTreeSet;
use std::path::Path;
use std::sync::{Arc, RwLock};

/// Storage backend for a Session.
#[derive(Debug, Default)]
pub enum StorageBackend {
    /// Memory only.
    #[default]
    InMemory,
    /// Disk-backed records using redb (ACID, persistent).
    Persistent(RedbStore),
}

// NOTE: Session does NOT implement Clone.
// RedbStore (database handle) cannot be safely cloned.

/// The store facade used by the CLI and the HTTP API.
#[derive(Debug)]
pub struct Session {
    graph: SocialGraph,
    backend: StorageBackend,
}

impl Default for Session {
    fn default() -> Self {
        Self::new(true)
    }
}

impl Session {
    /// Create an empty in-memory session.
    #[must_use]
    pub fn new(fulltext: bool) -> Self {
        Self::with_graph(SocialGraph::new(fulltext))
    }

    /// Create an in-memory session over an existing graph.
    #[must_use]
    pub fn with_graph(graph: SocialGraph) -> Self {
        Self {
            graph,
            backend: StorageBackend::InMemory,
        }
    }

    /// Open (or create) a redb database and rebuild the graph from it.
    pub fn with_redb(path: impl AsRef<Path>, fulltext: bool) -> Result<Self, SocialError> {
        let store = RedbStore::open(path.as_ref())?;
        let (users, edges) = store.load()?;
        let graph = SocialGraph::from_records(users, edges, fulltext);
        tracing::debug!(
            path = %path.as_ref().display(),
            users = graph.stats().user_count,
            edges = graph.stats().edge_count,
            "Loaded redb store"
        );
        Ok(Self {
            graph,
            backend: StorageBackend::Persistent(store),
        })
    }

    /// Check if using persistent storage.
    #[must_use]
    pub fn is_persistent(&self) -> bool {
        matches!(self.backend, StorageBackend::Persistent(_))
    }

    /// The in-memory graph.
    #[must_use]
    pub fn graph(&self) -> &SocialGraph {
        &self.graph
    }

    /// Get a reference to the storage backend.
    #[must_use]
    pub fn backend(&self) -> &StorageBackend {
        &self.backend
    }

    fn store(&self) -> Option<&RedbStore> {
        match &self.backend {
            StorageBackend::InMemory => None,
            StorageBackend::Persistent(store) => Some(store),
        }
    }

    fn persist<F>(&self, context: &str, write: F) -> Result<(), SocialError>
    where
        F: FnOnce(&RedbStore) -> Result<(), SocialError>,
    {
        let Some(store) = self.store() else {
            return Ok(());
        };
        write(store).inspect_err(|e| {
            tracing::warn!(error = %e, "Persistence failed in {}", context);
        })
    }

    // =========================================================================
    // MUTATIONS
    // =========================================================================

    /// Register a new user.
    pub fn register(&mut self, new: &NewUser) -> Result<User, SocialError> {
        let user = self.graph.prepare_register(new, Timestamp::now())?;
        self.persist("register", |store| store.put_user(&user))?;
        self.graph.commit_user(user.clone());
        tracing::debug!(username = %user.username, "Registered user");
        Ok(user)
    }

    /// Edit a user's profile.
    pub fn update(&mut self, username: &str, update: &ProfileUpdate) -> Result<User, SocialError> {
        let user = self
            .graph
            .prepare_update(username, update, Timestamp::now())?;
        self.persist("update", |store| store.put_user(&user))?;
        self.graph.commit_user(user.clone());
        tracing::debug!(username = %user.username, "Updated profile");
        Ok(user)
    }

    /// Follow `dst` from `src`, reporting exactly what happened.
    pub fn follow_outcome(&mut self, src: &str, dst: &str) -> Result<FollowOutcome, SocialError> {
        let plan = self.graph.prepare_follow(src, dst, Timestamp::now())?;
        if let FollowPlan::Create(edge) = &plan {
            self.persist("follow", |store| store.put_edge(edge))?;
        }
        let outcome = self.graph.apply_follow(&plan);
        tracing::debug!(src, dst, ?outcome, "Follow");
        Ok(outcome)
    }

    /// Follow `dst` from `src`. `true` when the edge exists afterwards.
    pub fn follow(&mut self, src: &str, dst: &str) -> Result<bool, SocialError> {
        self.follow_outcome(src, dst).map(FollowOutcome::succeeded)
    }

    /// Remove `src -> dst`. Returns the number of edges removed (0 or 1).
    pub fn unfollow(&mut self, src: &str, dst: &str) -> Result<usize, SocialError> {
        if !self.graph.is_following(src, dst) {
            return Ok(0);
        }
        self.persist("unfollow", |store| store.remove_edge(src, dst).map(|_| ()))?;
        Ok(self.graph.unfollow(src, dst))
    }

    /// Register many users with a single durable commit.
    ///
    /// Invalid or duplicate entries (including duplicates within the batch)
    /// are skipped and counted.
    pub fn register_many(&mut self, batch: &[NewUser]) -> Result<BulkReport, SocialError> {
        let now = Timestamp::now();
        let mut report = BulkReport::default();
        let mut accepted: Vec<User> = Vec::with_capacity(batch.len());
        let mut usernames = BTreeSet::new();
        let mut emails = BTreeSet::new();

        for new in batch {
            if usernames.contains(new.username.as_str()) || emails.contains(new.email.as_str()) {
                report.skipped = report.skipped.saturating_add(1);
                continue;
            }
            match self.graph.prepare_register(new, now) {
                Ok(user) => {
                    usernames.insert(new.username.as_str());
                    emails.insert(new.email.as_str());
                    accepted.push(user);
                }
                Err(e) if e.is_skippable() => {
                    report.skipped = report.skipped.saturating_add(1);
                }
                Err(e) => return Err(e),
            }
        }

        self.persist("register_many", |store| store.put_users(&accepted))?;
        report.inserted = accepted.len();
        for user in accepted {
            self.graph.commit_user(user);
        }
        tracing::debug!(
            inserted = report.inserted,
            skipped = report.skipped,
            "Bulk registration"
        );
        Ok(report)
    }

    /// Create many edges with a single durable commit.
    ///
    /// Self-follows, unknown endpoints, malformed usernames and already
    /// stored edges are skipped and counted.
    pub fn follow_many(&mut self, pairs: &[(String, String)]) -> Result<BulkReport, SocialError> {
        let now = Timestamp::now();
        let mut report = BulkReport::default();
        let mut accepted: Vec<FollowEdge> = Vec::new();
        let mut seen: BTreeSet<(&str, &str)> = BTreeSet::new();

        for (src, dst) in pairs {
            if !seen.insert((src.as_str(), dst.as_str())) {
                report.skipped = report.skipped.saturating_add(1);
                continue;
            }
            match self.graph.prepare_follow(src, dst, now) {
                Ok(FollowPlan::Create(edge)) => accepted.push(edge),
                Ok(FollowPlan::Existing | FollowPlan::Rejected) => {
                    report.skipped = report.skipped.saturating_add(1);
                }
                Err(e) if e.is_skippable() => {
                    report.skipped = report.skipped.saturating_add(1);
                }
                Err(e) => return Err(e),
            }
        }

        self.persist("follow_many", |store| store.put_edges(&accepted))?;
        report.inserted = accepted.len();
        for edge in accepted {
            self.graph.apply_follow(&FollowPlan::Create(edge));
        }
        tracing::debug!(
            inserted = report.inserted,
            skipped = report.skipped,
            "Bulk follow"
        );
        Ok(report)
    }

    /// Drop every user and edge.
    pub fn reset(&mut self) -> Result<(), SocialError> {
        self.persist("reset", RedbStore::clear)?;
        self.graph.reset();
        tracing::info!("Store reset");
        Ok(())
    }

    /// Replace all content with a snapshot.
    ///
    /// Dangling edges in the snapshot are dropped. The ranked-index setting
    /// of this session is kept.
    pub fn restore(&mut self, snapshot: SerializableGraph) -> Result<GraphStats, SocialError> {
        let graph =
            SocialGraph::from_records(snapshot.users, snapshot.edges, self.graph.fulltext_enabled());
        self.persist("restore", |store| {
            let users: Vec<User> = graph.users().cloned().collect();
            let edges: Vec<FollowEdge> = graph.edges().collect();
            store.replace_all(&users, &edges)
        })?;
        self.graph = graph;
        Ok(self.graph.stats())
    }

    /// Capture the current content.
    #[must_use]
    pub fn snapshot(&self) -> SerializableGraph {
        SerializableGraph::from(&self.graph)
    }

    // =========================================================================
    // READS
    // =========================================================================

    /// Public profile of a user.
    #[must_use]
    pub fn profile(&self, username: &str) -> Option<Profile> {
        self.graph.profile(username)
    }

    /// Stored credential material.
    #[must_use]
    pub fn credentials(&self, username: &str) -> Option<Credentials> {
        self.graph.credentials(username)
    }

    /// Users that `username` follows.
    #[must_use]
    pub fn following(&self, username: &str, limit: usize, skip: usize) -> Vec<UserSummary> {
        self.graph.following(username, limit, skip)
    }

    /// Users following `username`.
    #[must_use]
    pub fn followers(&self, username: &str, limit: usize, skip: usize) -> Vec<UserSummary> {
        self.graph.followers(username, limit, skip)
    }

    /// Users followed by both `u1` and `u2`.
    #[must_use]
    pub fn mutual_connections(&self, u1: &str, u2: &str, limit: usize) -> Vec<UserSummary> {
        self.graph.mutual_connections(u1, u2, limit)
    }

    /// Two-hop follow recommendations.
    #[must_use]
    pub fn recommend(&self, username: &str, limit: usize) -> Vec<Recommendation> {
        self.graph.recommend(username, limit)
    }

    /// Users ranked by follower count.
    #[must_use]
    pub fn popular(&self, limit: usize) -> Vec<PopularUser> {
        self.graph.popular(limit)
    }

    /// Search users.
    #[must_use]
    pub fn search(&self, query: &str, limit: usize) -> SearchResults {
        self.graph.search(query, limit)
    }

    /// Store-wide counters.
    #[must_use]
    pub fn stats(&self) -> GraphStats {
        self.graph.stats()
    }
}

// =============================================================================
// SHARED SESSION
// =============================================================================

/// A session shared between threads.
#[derive(Debug, Clone, Default)]
pub struct SharedSession {
    inner: Arc<RwLock<Session>>,
}

impl SharedSession {
    /// Wrap a session.
    #[must_use]
    pub fn new(session: Session) -> Self {
        Self {
            inner: Arc::new(RwLock::new(session)),
        }
    }

    /// Run a read-only closure. Readers do not block each other.
    pub fn read<T>(&self, f: impl FnOnce(&Session) -> T) -> Result<T, SocialError> {
        let guard = self.inner.read().map_err(|_| SocialError::LockPoisoned)?;
        Ok(f(&guard))
    }

    /// Run a mutating closure with exclusive access.
    pub fn write<T>(
        &self,
        f: impl FnOnce(&mut Session) -> Result<T, SocialError>,
    ) -> Result<T, SocialError> {
        let mut guard = self.inner.write().map_err(|_| SocialError::LockPoisoned)?;
        f(&mut guard)
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn new_user(username: &str) -> NewUser {
        NewUser::new(
            username,
            format!("{} name", username),
            format!("{}@example.com", username),
            "",
        )
    }

    #[test]
    fn register_then_follow_in_memory() {
        let mut session = Session::default();
        session.register(&new_user("alice")).expect("register");
        session.register(&new_user("bob")).expect("register");

        assert!(session.follow("alice", "bob").expect("follow"));
        assert_eq!(session.following("alice", 10, 0).len(), 1);
        assert!(!session.is_persistent());
    }

    #[test]
    fn unfollow_missing_edge_is_zero() {
        let mut session = Session::default();
        session.register(&new_user("alice")).expect("register");
        assert_eq!(session.unfollow("alice", "bob").expect("unfollow"), 0);
    }

    #[test]
    fn redb_session_survives_reopen() {
        let temp = tempdir().expect("temp dir");
        let db_path = temp.path().join("social.redb");

        {
            let mut session = Session::with_redb(&db_path, true).expect("open");
            session.register(&new_user("alice")).expect("register");
            session.register(&new_user("bob")).expect("register");
            session.follow("alice", "bob").expect("follow");
            session
                .update(
                    "bob",
                    &ProfileUpdate {
                        bio: Some("hello".into()),
                        ..ProfileUpdate::default()
                    },
                )
                .expect("update");
        }

        {
            let mut session = Session::with_redb(&db_path, true).expect("reopen");
            assert!(session.is_persistent());
            assert_eq!(session.stats().user_count, 2);
            assert_eq!(session.stats().edge_count, 1);
            assert_eq!(session.profile("bob").map(|p| p.bio), Some("hello".into()));
            assert_eq!(session.search("alice", 10).hits.len(), 1);

            assert_eq!(session.unfollow("alice", "bob").expect("unfollow"), 1);
        }

        let session = Session::with_redb(&db_path, true).expect("reopen");
        assert_eq!(session.stats().edge_count, 0);
    }

    #[test]
    fn register_many_skips_duplicates_within_batch() {
        let mut session = Session::default();
        session.register(&new_user("alice")).expect("register");

        let batch = vec![
            new_user("alice"),
            new_user("bob"),
            new_user("bob"),
            NewUser::new("carol", "Carol", "bob@example.com", ""),
            NewUser::new("x", "Bad", "x@example.com", ""),
            new_user("dave"),
        ];
        let report = session.register_many(&batch).expect("bulk");

        assert_eq!(report.inserted, 2);
        assert_eq!(report.skipped, 4);
        assert_eq!(session.stats().user_count, 3);
    }

    #[test]
    fn follow_many_skips_invalid_pairs() {
        let mut session = Session::default();
        session
            .register_many(&[new_user("alice"), new_user("bob"), new_user("carol")])
            .expect("bulk");
        session.follow("alice", "bob").expect("follow");

        let pairs: Vec<(String, String)> = [
            ("alice", "bob"),
            ("alice", "carol"),
            ("alice", "carol"),
            ("bob", "bob"),
            ("bob", "ghost"),
            ("carol", "alice"),
        ]
        .iter()
        .map(|(a, b)| (a.to_string(), b.to_string()))
        .collect();

        let report = session.follow_many(&pairs).expect("bulk");
        assert_eq!(report.inserted, 2);
        assert_eq!(report.skipped, 4);
        assert_eq!(session.stats().edge_count, 3);
    }

    #[test]
    fn reset_clears_redb_records() {
        let temp = tempdir().expect("temp dir");
        let db_path = temp.path().join("social.redb");

        {
            let mut session = Session::with_redb(&db_path, true).expect("open");
            session.register(&new_user("alice")).expect("register");
            session.reset().expect("reset");
            assert_eq!(session.stats(), GraphStats::default());
        }

        let session = Session::with_redb(&db_path, true).expect("reopen");
        assert_eq!(session.stats().user_count, 0);
    }

    #[test]
    fn restore_replaces_content() {
        let mut source = Session::default();
        source.register(&new_user("alice")).expect("register");
        source.register(&new_user("bob")).expect("register");
        source.follow("alice", "bob").expect("follow");
        let snapshot = source.snapshot();

        let mut target = Session::new(false);
        target.register(&new_user("zed")).expect("register");
        let stats = target.restore(snapshot).expect("restore");

        assert_eq!(stats.user_count, 2);
        assert_eq!(stats.edge_count, 1);
        assert!(target.profile("zed").is_none());
        assert!(!target.graph().fulltext_enabled());
    }

    #[test]
    fn shared_session_concurrent_registration() {
        let shared = SharedSession::new(Session::default());

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let shared = shared.clone();
                std::thread::spawn(move || {
                    shared.write(|s| s.register(&new_user(&format!("user{}", i))).map(|_| ()))
                })
            })
            .collect();

        for handle in handles {
            handle.join().expect("join").expect("register");
        }

        let count = shared.read(|s| s.stats().user_count).expect("read");
        assert_eq!(count, 8);
    }

    #[test]
    fn shared_session_duplicate_race_has_one_winner() {
        let shared = SharedSession::new(Session::default());

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let shared = shared.clone();
                std::thread::spawn(move || shared.write(|s| s.register(&new_user("alice"))))
            })
            .collect();

        let winners = handles
            .into_iter()
            .map(|h| h.join().expect("join"))
            .filter(Result::is_ok)
            .count();
        assert_eq!(winners, 1);
    }

    #[test]
    fn restore_into_redb_replaces_records_on_disk() {
        let temp = tempdir().expect("temp dir");
        let db_path = temp.path().join("social.redb");

        let mut source = Session::default();
        source.register(&new_user("alice")).expect("register");
        source.register(&new_user("bob")).expect("register");
        source.follow("bob", "alice").expect("follow");
        let mut snapshot = source.snapshot();
        let mut clash = snapshot.users[0].clone();
        clash.username = "mallory".into();
        snapshot.users.push(clash);

        {
            let mut session = Session::with_redb(&db_path, true).expect("open");
            session.register(&new_user("zed")).expect("register");
            let stats = session.restore(snapshot).expect("restore");
            assert_eq!(stats.user_count, 2);
        }

        let mut session = Session::with_redb(&db_path, true).expect("reopen");
        assert_eq!(session.stats().user_count, 2);
        assert_eq!(session.stats().edge_count, 1);
        assert!(session.profile("zed").is_none());
        assert!(session.profile("mallory").is_none());
        let taken = session.register(&NewUser::new("erin", "Erin", "alice@example.com", ""));
        assert!(matches!(taken, Err(SocialError::DuplicateKey(_))));
    }

    fn shared_pair() -> SharedSession {
        let mut session = Session::default();
        session.register(&new_user("alice")).expect("register");
        session.register(&new_user("bob")).expect("register");
        SharedSession::new(session)
    }

    #[test]
    fn shared_session_concurrent_follow_creates_once() {
        let shared = shared_pair();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let shared = shared.clone();
                std::thread::spawn(move || shared.write(|s| s.follow_outcome("alice", "bob")))
            })
            .collect();

        let outcomes: Vec<FollowOutcome> = handles
            .into_iter()
            .map(|h| h.join().expect("join").expect("follow"))
            .collect();
        let created = outcomes
            .iter()
            .filter(|o| **o == FollowOutcome::Created)
            .count();
        assert_eq!(created, 1);
        assert!(outcomes
            .iter()
            .all(|o| matches!(o, FollowOutcome::Created | FollowOutcome::AlreadyFollowing)));
        assert_eq!(shared.read(|s| s.stats().edge_count).expect("read"), 1);
    }

    #[test]
    fn shared_session_interleaved_follow_unfollow_stays_consistent() {
        let shared = shared_pair();

        let handles: Vec<_> = (0..16)
            .map(|i| {
                let shared = shared.clone();
                std::thread::spawn(move || {
                    shared.write(|s| {
                        if i % 2 == 0 {
                            s.follow_outcome("alice", "bob").map(|o| {
                                isize::from(o == FollowOutcome::Created)
                            })
                        } else {
                            s.unfollow("alice", "bob").map(|n| -(n as isize))
                        }
                    })
                })
            })
            .collect();

        let net: isize = handles
            .into_iter()
            .map(|h| h.join().expect("join").expect("write"))
            .sum();

        let (edges, following) = shared
            .read(|s| (s.stats().edge_count, s.graph().is_following("alice", "bob")))
            .expect("read");
        assert!(net == 0 || net == 1);
        assert_eq!(edges, net as usize);
        assert_eq!(following, net == 1);
        let listed = shared
            .read(|s| s.following("alice", 10, 0).len())
            .expect("read");
        assert_eq!(listed, edges);
    }
}
