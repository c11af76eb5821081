//! Serialization formats.

mod persistence;

pub use persistence::{
    MAX_SNAPSHOT_SIZE, SnapshotHeader, graph_from_bytes, graph_to_bytes, snapshot_from_bytes,
    snapshot_to_bytes,
};
