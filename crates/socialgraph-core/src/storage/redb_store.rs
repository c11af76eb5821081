//! # redb-backed Record Storage
//!
//! Durable storage for users and FOLLOWS edges using the redb embedded
//! database. redb provides ACID transactions and crash safety; every write
//! method here commits exactly one transaction, so a batch is all-or-nothing.
//!
//! The store holds records only. The in-memory `SocialGraph` (and its search
//! index) is rebuilt from `load()` when a session opens.

use crate::{FollowEdge, SocialError, Timestamp, User};
use redb::{
    Database, ReadableDatabase, ReadableTable, ReadableTableMetadata, TableDefinition,
    WriteTransaction,
};
use std::path::Path;

/// Table for users: username -> postcard-serialized `User`
const USERS: TableDefinition<&str, &[u8]> = TableDefinition::new("users");

/// Table for edges: (src, dst) -> since (ms)
const FOLLOWS: TableDefinition<(&str, &str), u64> = TableDefinition::new("follows");

/// Table for metadata: key string -> value u64
const METADATA: TableDefinition<&str, u64> = TableDefinition::new("metadata");

/// Metadata key holding the on-disk schema version.
const SCHEMA_VERSION_KEY: &str = "schema_version";

/// Current on-disk schema version.
const SCHEMA_VERSION: u64 = 1;

fn io_error(e: impl std::fmt::Display) -> SocialError {
    SocialError::IoError(e.to_string())
}

/// A disk-backed record store using redb.
pub struct RedbStore {
    db: Database,
}

impl std::fmt::Debug for RedbStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedbStore").finish_non_exhaustive()
    }
}

impl RedbStore {
    /// Open or create a database at the given path.
    ///
    /// Fails with `SerializationError` when the file was written by an
    /// incompatible schema version.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, SocialError> {
        let db = Database::create(path.as_ref()).map_err(io_error)?;

        {
            let write_txn = db.begin_write().map_err(io_error)?;
            {
                let _ = write_txn.open_table(USERS).map_err(io_error)?;
                let _ = write_txn.open_table(FOLLOWS).map_err(io_error)?;
                let mut meta = write_txn.open_table(METADATA).map_err(io_error)?;

                let stored = meta
                    .get(SCHEMA_VERSION_KEY)
                    .map_err(io_error)?
                    .map(|v| v.value());
                match stored {
                    None => {
                        meta.insert(SCHEMA_VERSION_KEY, SCHEMA_VERSION)
                            .map_err(io_error)?;
                    }
                    Some(SCHEMA_VERSION) => {}
                    Some(other) => {
                        return Err(SocialError::SerializationError(format!(
                            "Unsupported schema version: {} (expected {})",
                            other, SCHEMA_VERSION
                        )));
                    }
                }
            }
            write_txn.commit().map_err(io_error)?;
        }

        Ok(Self { db })
    }

    /// Read every stored user and edge, both in key order.
    pub fn load(&self) -> Result<(Vec<User>, Vec<FollowEdge>), SocialError> {
        let read_txn = self.db.begin_read().map_err(io_error)?;

        let users = {
            let table = read_txn.open_table(USERS).map_err(io_error)?;
            let mut users = Vec::new();
            for entry in table.iter().map_err(io_error)? {
                let (_, value) = entry.map_err(io_error)?;
                let user: User = postcard::from_bytes(value.value())
                    .map_err(|e| SocialError::SerializationError(e.to_string()))?;
                users.push(user);
            }
            users
        };

        let edges = {
            let table = read_txn.open_table(FOLLOWS).map_err(io_error)?;
            let mut edges = Vec::new();
            for entry in table.iter().map_err(io_error)? {
                let (key, value) = entry.map_err(io_error)?;
                let (src, dst) = key.value();
                edges.push(FollowEdge {
                    src: src.to_string(),
                    dst: dst.to_string(),
                    since: Timestamp(value.value()),
                });
            }
            edges
        };

        Ok((users, edges))
    }

    /// Insert or replace a single user.
    pub fn put_user(&self, user: &User) -> Result<(), SocialError> {
        self.put_users(std::slice::from_ref(user))
    }

    /// Insert or replace users in one transaction.
    pub fn put_users(&self, users: &[User]) -> Result<(), SocialError> {
        if users.is_empty() {
            return Ok(());
        }
        let write_txn = self.db.begin_write().map_err(io_error)?;
        write_users(&write_txn, users)?;
        write_txn.commit().map_err(io_error)
    }

    /// Insert a single edge.
    pub fn put_edge(&self, edge: &FollowEdge) -> Result<(), SocialError> {
        self.put_edges(std::slice::from_ref(edge))
    }

    /// Insert edges in one transaction.
    pub fn put_edges(&self, edges: &[FollowEdge]) -> Result<(), SocialError> {
        if edges.is_empty() {
            return Ok(());
        }
        let write_txn = self.db.begin_write().map_err(io_error)?;
        write_edges(&write_txn, edges)?;
        write_txn.commit().map_err(io_error)
    }

    /// Remove an edge. Returns `true` when it was stored.
    pub fn remove_edge(&self, src: &str, dst: &str) -> Result<bool, SocialError> {
        let write_txn = self.db.begin_write().map_err(io_error)?;
        let removed = {
            let mut table = write_txn.open_table(FOLLOWS).map_err(io_error)?;
            table.remove((src, dst)).map_err(io_error)?.is_some()
        };
        write_txn.commit().map_err(io_error)?;
        Ok(removed)
    }

    /// Delete every user and edge. Metadata is kept.
    pub fn clear(&self) -> Result<(), SocialError> {
        let write_txn = self.db.begin_write().map_err(io_error)?;
        clear_records(&write_txn)?;
        write_txn.commit().map_err(io_error)
    }

    /// Swap the whole content for `users` and `edges` in one transaction.
    ///
    /// On failure nothing is committed and the previous records remain.
    pub fn replace_all(&self, users: &[User], edges: &[FollowEdge]) -> Result<(), SocialError> {
        let write_txn = self.db.begin_write().map_err(io_error)?;
        clear_records(&write_txn)?;
        write_users(&write_txn, users)?;
        write_edges(&write_txn, edges)?;
        write_txn.commit().map_err(io_error)
    }

    /// Number of stored users.
    pub fn user_count(&self) -> Result<usize, SocialError> {
        let read_txn = self.db.begin_read().map_err(io_error)?;
        let table = read_txn.open_table(USERS).map_err(io_error)?;
        let count = table.len().map_err(io_error)?;
        Ok(count as usize)
    }

    /// Number of stored edges.
    pub fn edge_count(&self) -> Result<usize, SocialError> {
        let read_txn = self.db.begin_read().map_err(io_error)?;
        let table = read_txn.open_table(FOLLOWS).map_err(io_error)?;
        let count = table.len().map_err(io_error)?;
        Ok(count as usize)
    }
}

fn write_users(txn: &WriteTransaction, users: &[User]) -> Result<(), SocialError> {
    let mut table = txn.open_table(USERS).map_err(io_error)?;
    for user in users {
        let bytes = postcard::to_allocvec(user)
            .map_err(|e| SocialError::SerializationError(e.to_string()))?;
        table
            .insert(user.username.as_str(), bytes.as_slice())
            .map_err(io_error)?;
    }
    Ok(())
}

fn write_edges(txn: &WriteTransaction, edges: &[FollowEdge]) -> Result<(), SocialError> {
    let mut table = txn.open_table(FOLLOWS).map_err(io_error)?;
    for edge in edges {
        table
            .insert((edge.src.as_str(), edge.dst.as_str()), edge.since.millis())
            .map_err(io_error)?;
    }
    Ok(())
}

fn clear_records(txn: &WriteTransaction) -> Result<(), SocialError> {
    let mut users = txn.open_table(USERS).map_err(io_error)?;
    users.retain(|_, _| false).map_err(io_error)?;
    let mut follows = txn.open_table(FOLLOWS).map_err(io_error)?;
    follows.retain(|_, _| false).map_err(io_error)?;
    Ok(())
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn user(username: &str) -> User {
        User {
            username: username.to_string(),
            name: format!("{} name", username),
            email: format!("{}@example.com", username),
            bio: String::new(),
            password_hash: "hash".to_string(),
            salt: "salt".to_string(),
            created_at: Timestamp(1),
            updated_at: Timestamp(2),
        }
    }

    fn edge(src: &str, dst: &str, since: u64) -> FollowEdge {
        FollowEdge {
            src: src.to_string(),
            dst: dst.to_string(),
            since: Timestamp(since),
        }
    }

    #[test]
    fn users_and_edges_roundtrip() {
        let temp = tempdir().expect("temp dir");
        let store = RedbStore::open(temp.path().join("test.redb")).expect("open db");

        store
            .put_users(&[user("bob"), user("alice")])
            .expect("put users");
        store.put_edge(&edge("alice", "bob", 7)).expect("put edge");

        let (users, edges) = store.load().expect("load");
        assert_eq!(users.len(), 2);
        assert_eq!(users[0].username, "alice");
        assert_eq!(users[0].password_hash, "hash");
        assert_eq!(edges, vec![edge("alice", "bob", 7)]);
    }

    #[test]
    fn put_user_replaces_record() {
        let temp = tempdir().expect("temp dir");
        let store = RedbStore::open(temp.path().join("test.redb")).expect("open db");

        store.put_user(&user("alice")).expect("put");
        let mut edited = user("alice");
        edited.bio = "edited".to_string();
        store.put_user(&edited).expect("put");

        let (users, _) = store.load().expect("load");
        assert_eq!(users.len(), 1);
        assert_eq!(users[0].bio, "edited");
    }

    #[test]
    fn persistence_across_reopen() {
        let temp = tempdir().expect("temp dir");
        let db_path = temp.path().join("test.redb");

        {
            let store = RedbStore::open(&db_path).expect("open db");
            store.put_users(&[user("alice"), user("bob")]).expect("put");
            store
                .put_edges(&[edge("alice", "bob", 1), edge("bob", "alice", 2)])
                .expect("put");
        }

        {
            let store = RedbStore::open(&db_path).expect("reopen db");
            assert_eq!(store.user_count().expect("count"), 2);
            assert_eq!(store.edge_count().expect("count"), 2);
        }
    }

    #[test]
    fn remove_edge_reports_presence() {
        let temp = tempdir().expect("temp dir");
        let store = RedbStore::open(temp.path().join("test.redb")).expect("open db");
        store.put_edge(&edge("alice", "bob", 1)).expect("put");

        assert!(store.remove_edge("alice", "bob").expect("remove"));
        assert!(!store.remove_edge("alice", "bob").expect("remove"));
        assert_eq!(store.edge_count().expect("count"), 0);
    }

    #[test]
    fn clear_drops_records() {
        let temp = tempdir().expect("temp dir");
        let store = RedbStore::open(temp.path().join("test.redb")).expect("open db");
        store.put_user(&user("alice")).expect("put");
        store.put_edge(&edge("alice", "bob", 1)).expect("put");

        store.clear().expect("clear");
        let (users, edges) = store.load().expect("load");
        assert!(users.is_empty());
        assert!(edges.is_empty());
    }

    #[test]
    fn replace_all_swaps_content() {
        let temp = tempdir().expect("temp dir");
        let db_path = temp.path().join("test.redb");

        {
            let store = RedbStore::open(&db_path).expect("open db");
            store.put_users(&[user("alice"), user("bob")]).expect("put");
            store.put_edge(&edge("alice", "bob", 1)).expect("put");

            store
                .replace_all(&[user("carol"), user("dave")], &[edge("dave", "carol", 3)])
                .expect("replace");
        }

        let store = RedbStore::open(&db_path).expect("reopen db");
        let (users, edges) = store.load().expect("load");
        let names: Vec<&str> = users.iter().map(|u| u.username.as_str()).collect();
        assert_eq!(names, vec!["carol", "dave"]);
        assert_eq!(edges, vec![edge("dave", "carol", 3)]);
    }

    #[test]
    fn replace_all_with_nothing_empties_store() {
        let temp = tempdir().expect("temp dir");
        let store = RedbStore::open(temp.path().join("test.redb")).expect("open db");
        store.put_user(&user("alice")).expect("put");

        store.replace_all(&[], &[]).expect("replace");
        assert_eq!(store.user_count().expect("count"), 0);
        assert_eq!(store.edge_count().expect("count"), 0);
    }
}
