// Snapshot store - Chunked state exports taken at fixed heights
use crate::types::{Hash, Height};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

/// Maximum size of one snapshot chunk
pub const SNAPSHOT_CHUNK_SIZE: usize = 64 * 1024;

/// Number of snapshots kept by default
pub const DEFAULT_KEEP_RECENT: usize = 2;

/// Snapshot metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotHeader {
    /// Height whose committed state was exported
    pub height: Height,

    /// Application hash at that height
    pub app_hash: Hash,

    /// Hash of every chunk, in order
    pub chunk_hashes: Vec<Hash>,

    /// Size of the export in bytes
    pub total_size: u64,
}

#[derive(Debug, Clone)]
struct Snapshot {
    header: SnapshotHeader,
    chunks: Vec<Vec<u8>>,
}

/// In-memory snapshot store
///
/// Clones share the same snapshots.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    snapshots: Arc<RwLock<BTreeMap<Height, Snapshot>>>,
    keep_recent: usize,
}

impl Default for SnapshotStore {
    fn default() -> Self {
        Self::new(DEFAULT_KEEP_RECENT)
    }
}

impl SnapshotStore {
    pub fn new(keep_recent: usize) -> Self {
        Self {
            snapshots: Arc::new(RwLock::new(BTreeMap::new())),
            keep_recent: keep_recent.max(1),
        }
    }

    /// Stores an export, evicting the oldest beyond `keep_recent`
    pub fn save(&self, height: Height, app_hash: Hash, data: &[u8]) -> SnapshotHeader {
        let chunks: Vec<Vec<u8>> = data.chunks(SNAPSHOT_CHUNK_SIZE).map(<[u8]>::to_vec).collect();
        let header = SnapshotHeader {
            height,
            app_hash,
            chunk_hashes: chunks.iter().map(|c| Hash::hash(c)).collect(),
            total_size: data.len() as u64,
        };

        let mut snapshots = self.snapshots.write();
        snapshots.insert(
            height,
            Snapshot {
                header: header.clone(),
                chunks,
            },
        );
        while snapshots.len() > self.keep_recent {
            snapshots.pop_first();
        }
        debug!("Stored snapshot at height {} ({} bytes)", height, header.total_size);
        header
    }

    /// Headers of the stored snapshots, oldest first
    pub fn list(&self) -> Vec<SnapshotHeader> {
        self.snapshots
            .read()
            .values()
            .map(|s| s.header.clone())
            .collect()
    }

    pub fn latest(&self) -> Option<SnapshotHeader> {
        self.snapshots
            .read()
            .last_key_value()
            .map(|(_, s)| s.header.clone())
    }

    pub fn load_chunk(&self, height: Height, index: usize) -> Option<Vec<u8>> {
        self.snapshots
            .read()
            .get(&height)
            .and_then(|s| s.chunks.get(index).cloned())
    }

    /// Reassembles an export, verifying every chunk hash
    pub fn load(&self, height: Height) -> Option<Vec<u8>> {
        let snapshots = self.snapshots.read();
        let snapshot = snapshots.get(&height)?;

        let mut data = Vec::with_capacity(snapshot.header.total_size as usize);
        for (chunk, expected) in snapshot.chunks.iter().zip(&snapshot.header.chunk_hashes) {
            if Hash::hash(chunk) != *expected {
                return None;
            }
            data.extend_from_slice(chunk);
        }
        Some(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_save_and_load() {
        let store = SnapshotStore::default();
        let data = vec![7u8; SNAPSHOT_CHUNK_SIZE + 10];

        let header = store.save(5, Hash::hash(b"app"), &data);
        assert_eq!(header.chunk_hashes.len(), 2);
        assert_eq!(store.load(5).unwrap(), data);
        assert_eq!(store.load_chunk(5, 1).unwrap().len(), 10);
        assert!(store.load(6).is_none());
    }

    #[test]
    fn test_keeps_most_recent() {
        let store = SnapshotStore::new(2);
        for height in [10, 20, 30] {
            store.save(height, Hash::ZERO, b"state");
        }

        let heights: Vec<Height> = store.list().iter().map(|h| h.height).collect();
        assert_eq!(heights, vec![20, 30]);
        assert_eq!(store.latest().unwrap().height, 30);
    }
}
