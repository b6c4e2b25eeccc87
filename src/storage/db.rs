// Database - In-memory key/value store, nothing survives the process
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Ordered in-memory key/value database
///
/// Clones share the same underlying map.
#[derive(Debug, Clone, Default)]
pub struct MemDb {
    inner: Arc<RwLock<BTreeMap<Vec<u8>, Vec<u8>>>>,
}

impl MemDb {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads a value
    pub fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, DatabaseError> {
        Ok(self.inner.read().get(key).cloned())
    }

    /// Writes a value
    pub fn put(&self, key: &[u8], value: &[u8]) -> Result<(), DatabaseError> {
        if key.is_empty() {
            return Err(DatabaseError::WriteFailed("empty key".to_string()));
        }
        self.inner.write().insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    /// Deletes a key
    pub fn delete(&self, key: &[u8]) -> Result<(), DatabaseError> {
        self.inner.write().remove(key);
        Ok(())
    }

    pub fn exists(&self, key: &[u8]) -> Result<bool, DatabaseError> {
        Ok(self.inner.read().contains_key(key))
    }

    /// Applies every operation under one write lock
    pub fn batch_write(&self, ops: Vec<WriteOp>) -> Result<(), DatabaseError> {
        if ops.iter().any(|op| op.key().is_empty()) {
            return Err(DatabaseError::WriteFailed("empty key in batch".to_string()));
        }

        let mut map = self.inner.write();
        for op in ops {
            match op {
                WriteOp::Put { key, value } => {
                    map.insert(key, value);
                }
                WriteOp::Delete { key } => {
                    map.remove(&key);
                }
            }
        }
        Ok(())
    }

    /// Snapshot of all entries whose key starts with `prefix`, in key order
    pub fn prefix_iterator(&self, prefix: &[u8]) -> impl Iterator<Item = (Vec<u8>, Vec<u8>)> {
        let map = self.inner.read();
        let entries: Vec<(Vec<u8>, Vec<u8>)> = map
            .range(prefix.to_vec()..)
            .take_while(|(key, _)| key.starts_with(prefix))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        entries.into_iter()
    }

    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }
}

/// Write operation for batches
#[derive(Debug, Clone)]
pub enum WriteOp {
    Put { key: Vec<u8>, value: Vec<u8> },
    Delete { key: Vec<u8> },
}

impl WriteOp {
    fn key(&self) -> &[u8] {
        match self {
            WriteOp::Put { key, .. } | WriteOp::Delete { key } => key,
        }
    }
}

/// Database errors
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("Failed to open database: {0}")]
    OpenFailed(String),

    #[error("Read failed: {0}")]
    ReadFailed(String),

    #[error("Write failed: {0}")]
    WriteFailed(String),

    #[error("Serialization failed: {0}")]
    SerializationFailed(String),
}
