//! Binary snapshots of a production graph via `bitcode`, behind a
//! versioned header.

use crate::catalog::Catalog;
use crate::graph::ProductionGraph;
use crate::persist::{GraphRecord, LoadReport};
use crate::settings::GraphSettings;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Magic number identifying a flowplan graph snapshot.
pub const SNAPSHOT_MAGIC: u32 = 0xF10E_0001;

/// Current format version. Increment when breaking the wire format.
pub const FORMAT_VERSION: u32 = 1;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("bitcode encoding failed: {0}")]
    Encode(String),
    #[error("bitcode decoding failed: {0}")]
    Decode(String),
    #[error("invalid magic number: expected 0x{:08X}, got 0x{:08X}", SNAPSHOT_MAGIC, .0)]
    InvalidMagic(u32),
    #[error("unsupported format version: expected {}, got {}", FORMAT_VERSION, .0)]
    UnsupportedVersion(u32),
    #[error("snapshot from future version {0} (this build supports up to {FORMAT_VERSION})")]
    FutureVersion(u32),
}

// ---------------------------------------------------------------------------
// Header
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotHeader {
    pub magic: u32,
    pub version: u32,
    pub node_count: u32,
    pub link_count: u32,
}

impl SnapshotHeader {
    pub fn new(record: &GraphRecord) -> Self {
        Self {
            magic: SNAPSHOT_MAGIC,
            version: FORMAT_VERSION,
            node_count: record.nodes.len() as u32,
            link_count: record.links.len() as u32,
        }
    }

    pub fn validate(&self) -> Result<(), SnapshotError> {
        if self.magic != SNAPSHOT_MAGIC {
            return Err(SnapshotError::InvalidMagic(self.magic));
        }
        if self.version > FORMAT_VERSION {
            return Err(SnapshotError::FutureVersion(self.version));
        }
        if self.version < FORMAT_VERSION {
            return Err(SnapshotError::UnsupportedVersion(self.version));
        }
        Ok(())
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct Snapshot {
    header: SnapshotHeader,
    graph: GraphRecord,
}

// ---------------------------------------------------------------------------
// Encode / decode
// ---------------------------------------------------------------------------

pub fn encode_snapshot(record: &GraphRecord) -> Result<Vec<u8>, SnapshotError> {
    let snapshot = Snapshot {
        header: SnapshotHeader::new(record),
        graph: record.clone(),
    };
    bitcode::serialize(&snapshot).map_err(|e| SnapshotError::Encode(e.to_string()))
}

/// Decode and validate a snapshot, returning its record.
pub fn decode_snapshot(data: &[u8]) -> Result<GraphRecord, SnapshotError> {
    let snapshot: Snapshot =
        bitcode::deserialize(data).map_err(|e| SnapshotError::Decode(e.to_string()))?;
    snapshot.header.validate()?;
    Ok(snapshot.graph)
}

/// Read only the header. bitcode has no partial decoding, so this decodes
/// the whole payload.
pub fn read_snapshot_header(data: &[u8]) -> Result<SnapshotHeader, SnapshotError> {
    let snapshot: Snapshot =
        bitcode::deserialize(data).map_err(|e| SnapshotError::Decode(e.to_string()))?;
    Ok(snapshot.header)
}

impl ProductionGraph {
    pub fn snapshot(&self) -> Result<Vec<u8>, SnapshotError> {
        encode_snapshot(&self.to_record())
    }

    pub fn from_snapshot(
        catalog: Arc<Catalog>,
        settings: GraphSettings,
        data: &[u8],
    ) -> Result<(ProductionGraph, LoadReport), SnapshotError> {
        let record = decode_snapshot(data)?;
        Ok(ProductionGraph::from_record(catalog, settings, &record))
    }
}
