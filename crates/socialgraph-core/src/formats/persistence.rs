//! # Snapshot Format
//!
//! Binary serialization for whole-graph snapshots (`export` / `import`).
//! File I/O operations are in the app layer.
//!
//! Format: Header (5 bytes) + postcard-serialized `SerializableGraph`.
//! - 4 bytes: Magic ("SOCG")
//! - 1 byte: Version
//!
//! Size and header are validated before the payload is parsed.

use crate::graph::{SerializableGraph, SocialGraph};
use crate::{SocialError, primitives};

/// Maximum allowed snapshot size (500 MB).
pub const MAX_SNAPSHOT_SIZE: usize = 500 * 1024 * 1024;

/// Header length in bytes.
const HEADER_LEN: usize = 5;

// =============================================================================
// FILE HEADER
// =============================================================================

/// The snapshot header precedes all graph data.
#[derive(Debug, Clone, Copy)]
pub struct SnapshotHeader {
    pub magic: [u8; 4],
    pub version: u8,
}

impl SnapshotHeader {
    /// Create a new header with current format version.
    #[must_use]
    pub fn new() -> Self {
        Self {
            magic: *primitives::MAGIC_BYTES,
            version: primitives::FORMAT_VERSION,
        }
    }

    /// Validate the header.
    pub fn validate(&self) -> Result<(), SocialError> {
        if &self.magic != primitives::MAGIC_BYTES {
            return Err(SocialError::SerializationError(
                "Invalid magic bytes".to_string(),
            ));
        }
        if self.version != primitives::FORMAT_VERSION {
            return Err(SocialError::SerializationError(format!(
                "Unsupported version: {} (expected {})",
                self.version,
                primitives::FORMAT_VERSION
            )));
        }
        Ok(())
    }

    /// Write header to bytes.
    pub fn to_bytes(&self) -> [u8; HEADER_LEN] {
        let mut bytes = [0u8; HEADER_LEN];
        bytes[0..4].copy_from_slice(&self.magic);
        bytes[4] = self.version;
        bytes
    }

    /// Read header from bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, SocialError> {
        let Some(head) = bytes.get(..HEADER_LEN) else {
            return Err(SocialError::SerializationError(
                "Header too short".to_string(),
            ));
        };
        let mut magic = [0u8; 4];
        magic.copy_from_slice(&head[0..4]);
        Ok(Self {
            magic,
            version: head[4],
        })
    }
}

impl Default for SnapshotHeader {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// SERIALIZATION FUNCTIONS
// =============================================================================

/// Serialize a snapshot to bytes (header + payload).
pub fn snapshot_to_bytes(snapshot: &SerializableGraph) -> Result<Vec<u8>, SocialError> {
    let payload = postcard::to_stdvec(snapshot)
        .map_err(|e| SocialError::SerializationError(e.to_string()))?;

    let mut result = Vec::with_capacity(HEADER_LEN + payload.len());
    result.extend_from_slice(&SnapshotHeader::new().to_bytes());
    result.extend_from_slice(&payload);
    Ok(result)
}

/// Deserialize a snapshot from bytes.
pub fn snapshot_from_bytes(bytes: &[u8]) -> Result<SerializableGraph, SocialError> {
    if bytes.len() > MAX_SNAPSHOT_SIZE {
        return Err(SocialError::SerializationError(format!(
            "Data size {} bytes exceeds maximum allowed {} bytes",
            bytes.len(),
            MAX_SNAPSHOT_SIZE
        )));
    }

    let header = SnapshotHeader::from_bytes(bytes)?;
    header.validate()?;

    postcard::from_bytes(&bytes[HEADER_LEN..]).map_err(|e| {
        SocialError::SerializationError(format!("Failed to deserialize snapshot: {}", e))
    })
}

/// Serialize a graph to bytes.
pub fn graph_to_bytes(graph: &SocialGraph) -> Result<Vec<u8>, SocialError> {
    snapshot_to_bytes(&SerializableGraph::from(graph))
}

/// Deserialize a graph from bytes, rebuilding its search index.
pub fn graph_from_bytes(bytes: &[u8]) -> Result<SocialGraph, SocialError> {
    snapshot_from_bytes(bytes).map(SocialGraph::from)
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{NewUser, Timestamp};

    fn sample_graph() -> SocialGraph {
        let mut graph = SocialGraph::new(true);
        for u in ["alice", "bob"] {
            graph
                .register(
                    &NewUser::new(u, u, format!("{}@example.com", u), "bio"),
                    Timestamp(3),
                )
                .expect("register");
        }
        graph.follow("alice", "bob", Timestamp(4)).expect("follow");
        graph
    }

    #[test]
    fn header_roundtrip() {
        let bytes = SnapshotHeader::new().to_bytes();
        let restored = SnapshotHeader::from_bytes(&bytes).expect("parse header");

        assert_eq!(restored.magic, *primitives::MAGIC_BYTES);
        assert_eq!(restored.version, primitives::FORMAT_VERSION);
    }

    #[test]
    fn bytes_roundtrip_bit_exact() {
        let graph = sample_graph();

        let bytes1 = graph_to_bytes(&graph).expect("first serialize");
        let restored = graph_from_bytes(&bytes1).expect("deserialize");
        let bytes2 = graph_to_bytes(&restored).expect("second serialize");

        assert_eq!(bytes1, bytes2, "save -> load -> save must be identical");
        assert_eq!(restored.stats(), graph.stats());
    }

    #[test]
    fn invalid_magic_rejected() {
        let mut bytes = vec![0u8; 10];
        bytes[0..4].copy_from_slice(b"XXXX");
        assert!(snapshot_from_bytes(&bytes).is_err());
    }

    #[test]
    fn future_version_rejected() {
        let mut bytes = graph_to_bytes(&sample_graph()).expect("serialize");
        bytes[4] = primitives::FORMAT_VERSION.wrapping_add(1);
        assert!(matches!(
            snapshot_from_bytes(&bytes),
            Err(SocialError::SerializationError(_))
        ));
    }

    #[test]
    fn truncated_input_rejected() {
        assert!(snapshot_from_bytes(b"SOC").is_err());
        let bytes = graph_to_bytes(&sample_graph()).expect("serialize");
        assert!(snapshot_from_bytes(&bytes[..bytes.len() - 3]).is_err());
    }
}
