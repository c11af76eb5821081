//! # Bulk Loaders
//!
//! Demo and dataset loaders. Every loader goes through the session's bulk
//! helpers, so re-running one skips rows that already exist.

use crate::credentials::new_user_with_password;
use flate2::read::GzDecoder;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use socialgraph_core::{BulkReport, NewUser, Session, SocialError};
use std::collections::{BTreeMap, BTreeSet};
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

/// Password shared by the seeded demo accounts.
pub const SEED_PASSWORD: &str = "password123";

/// Default RNG seed for synthetic graphs.
pub const DEFAULT_SYNTHETIC_SEED: u64 = 42;

/// Default node cap for edge-list imports.
pub const DEFAULT_MAX_NODES: usize = 20_000;

/// Loader usernames are `{prefix}{id}` with the id zero-padded to three
/// digits, so the shortest name is four characters.
fn loader_username(prefix: char, id: &str) -> String {
    format!("{}{:0>3}", prefix, id)
}

const SEED_USERS: [(&str, &str, &str); 4] = [
    ("alice", "Alice Smith", "Hi, I'm Alice."),
    ("bob", "Bob Lee", "Coffee + graphs."),
    ("carol", "Carol King", "I like hiking."),
    ("dave", "Dave Patel", "Neo4j enjoyer."),
];

const SEED_EDGES: [(&str, &str); 5] = [
    ("alice", "bob"),
    ("alice", "carol"),
    ("bob", "carol"),
    ("carol", "dave"),
    ("dave", "alice"),
];

/// Users and edges written by one loader run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LoadReport {
    pub users: BulkReport,
    pub edges: BulkReport,
}

fn load(
    session: &mut Session,
    users: &[NewUser],
    edges: &[(String, String)],
) -> Result<LoadReport, SocialError> {
    let users = session.register_many(users)?;
    let edges = session.follow_many(edges)?;
    tracing::info!(
        users_inserted = users.inserted,
        users_skipped = users.skipped,
        edges_inserted = edges.inserted,
        edges_skipped = edges.skipped,
        "Bulk load finished"
    );
    Ok(LoadReport { users, edges })
}

// =============================================================================
// SEED
// =============================================================================

/// Load the four demo accounts and their starter graph.
pub fn seed(session: &mut Session) -> Result<LoadReport, SocialError> {
    let users: Vec<NewUser> = SEED_USERS
        .iter()
        .map(|(username, name, bio)| {
            new_user_with_password(
                username,
                name,
                &format!("{}@example.com", username),
                bio,
                SEED_PASSWORD,
            )
        })
        .collect();
    let edges: Vec<(String, String)> = SEED_EDGES
        .iter()
        .map(|(a, b)| (a.to_string(), b.to_string()))
        .collect();
    load(session, &users, &edges)
}

// =============================================================================
// SYNTHETIC
// =============================================================================

/// Build `s001..=sN`, each following `avg_degree` distinct random others.
///
/// The degree is capped at `users - 1`. The same seed always yields the same
/// graph.
pub fn synthetic(
    session: &mut Session,
    users: usize,
    avg_degree: usize,
    seed: u64,
) -> Result<LoadReport, SocialError> {
    let rows: Vec<NewUser> = (1..=users)
        .map(|i| {
            let username = loader_username('s', &i.to_string());
            NewUser::new(
                username.clone(),
                format!("Synthetic User {}", i),
                format!("{}@example.com", username),
                "Synthetic account (demo)",
            )
        })
        .collect();

    let degree = avg_degree.min(users.saturating_sub(1));
    let mut rng = StdRng::seed_from_u64(seed);
    let mut edges = Vec::with_capacity(users.saturating_mul(degree));
    for i in 1..=users {
        let mut targets = BTreeSet::new();
        while targets.len() < degree {
            let j = rng.gen_range(1..=users);
            if j != i {
                targets.insert(j);
            }
        }
        let src = loader_username('s', &i.to_string());
        edges.extend(
            targets
                .into_iter()
                .map(|j| (src.clone(), loader_username('s', &j.to_string()))),
        );
    }

    load(session, &rows, &edges)
}

// =============================================================================
// EDGE-LIST IMPORT
// =============================================================================

/// Limits for an edge-list import.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportLimits {
    /// Stop collecting new node ids once this many are selected.
    pub max_nodes: usize,
    /// Stop reading once both `min_nodes` and `min_edges` are reached.
    pub min_nodes: Option<usize>,
    pub min_edges: Option<usize>,
}

impl Default for ImportLimits {
    fn default() -> Self {
        Self {
            max_nodes: DEFAULT_MAX_NODES,
            min_nodes: None,
            min_edges: None,
        }
    }
}

/// Line reader over a plain or gzip-compressed (`.gz`) file.
fn open_lines(path: &Path) -> Result<impl Iterator<Item = std::io::Result<String>>, SocialError> {
    let file = std::fs::File::open(path)
        .map_err(|e| SocialError::IoError(format!("Open '{}': {}", path.display(), e)))?;
    let reader: Box<dyn Read> = if path.extension().is_some_and(|ext| ext == "gz") {
        Box::new(GzDecoder::new(file))
    } else {
        Box::new(file)
    };
    Ok(BufReader::new(reader).lines())
}

/// Read `src dst` pairs, keeping a bounded set of node ids and only the
/// edges whose endpoints are both selected.
fn read_edge_list(
    path: &Path,
    limits: ImportLimits,
) -> Result<(BTreeSet<String>, Vec<(String, String)>), SocialError> {
    let mut nodes = BTreeSet::new();
    let mut edges = Vec::new();

    for line in open_lines(path)? {
        let line = line.map_err(|e| SocialError::IoError(format!("Read edges: {}", e)))?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let mut parts = line.split_whitespace();
        let (Some(a), Some(b), None) = (parts.next(), parts.next(), parts.next()) else {
            tracing::debug!(line, "Skipping malformed edge line");
            continue;
        };

        if nodes.len() < limits.max_nodes {
            nodes.insert(a.to_string());
            nodes.insert(b.to_string());
        }
        if nodes.contains(a) && nodes.contains(b) {
            edges.push((a.to_string(), b.to_string()));
        }

        if let (Some(min_nodes), Some(min_edges)) = (limits.min_nodes, limits.min_edges)
            && nodes.len() >= min_nodes
            && edges.len() >= min_edges
        {
            break;
        }
    }

    Ok((nodes, edges))
}

/// Read the `region` column of a tab-separated profiles file with a header.
fn read_regions(path: &Path) -> Result<BTreeMap<String, String>, SocialError> {
    let mut regions = BTreeMap::new();
    let mut region_col = None;
    let mut header_seen = false;

    for line in open_lines(path)? {
        let line = line.map_err(|e| SocialError::IoError(format!("Read profiles: {}", e)))?;
        if line.trim().is_empty() {
            continue;
        }
        let parts: Vec<&str> = line.split('\t').collect();
        if !header_seen {
            header_seen = true;
            region_col = parts.iter().position(|h| h.trim() == "region");
            continue;
        }
        if parts.len() < 2 {
            continue;
        }
        let region = region_col
            .and_then(|col| parts.get(col))
            .map(|r| r.trim())
            .filter(|r| !r.is_empty());
        if let Some(region) = region {
            regions.insert(parts[0].trim().to_string(), region.to_string());
        }
    }

    Ok(regions)
}

/// Import a whitespace-separated edge list, with optional profile names.
///
/// Users become `u{id}` (id padded to three digits) with email
/// `u{id}@pokec.sk`. Either file may be gzip-compressed. A missing profiles
/// file is ignored.
pub fn import_edges(
    session: &mut Session,
    edges_path: &Path,
    profiles_path: Option<&Path>,
    limits: ImportLimits,
) -> Result<LoadReport, SocialError> {
    let (nodes, raw_edges) = read_edge_list(edges_path, limits)?;
    let regions = match profiles_path {
        Some(path) if path.exists() => read_regions(path)?,
        Some(path) => {
            tracing::warn!(path = %path.display(), "Profiles file not found, using default names");
            BTreeMap::new()
        }
        None => BTreeMap::new(),
    };

    let users: Vec<NewUser> = nodes
        .iter()
        .map(|id| {
            let username = loader_username('u', id);
            let name = regions
                .get(id)
                .cloned()
                .unwrap_or_else(|| format!("User {}", id));
            NewUser::new(
                username.clone(),
                name,
                format!("{}@pokec.sk", username),
                format!("Pokec user {}", id),
            )
        })
        .collect();
    let edges: Vec<(String, String)> = raw_edges
        .into_iter()
        .map(|(a, b)| (loader_username('u', &a), loader_username('u', &b)))
        .collect();

    load(session, &users, &edges)
}

// =============================================================================
// TESTS
// =============================================================================
