// Block store - Committed blocks and transaction results kept in the node database
use crate::abci::TxResult;
use crate::storage::{DatabaseError, MemDb, WriteOp};
use crate::types::{Block, Hash, Height};
use serde::{Deserialize, Serialize};

const BLOCK_PREFIX: &[u8] = b"block/";
const TX_PREFIX: &[u8] = b"tx/";
const HEIGHT_KEY: &[u8] = b"meta/height";

/// Execution outcome of an included transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxRecord {
    pub height: Height,
    pub index: u32,
    pub result: TxResult,
}

/// Block storage on top of a key/value database
#[derive(Debug, Clone)]
pub struct BlockStore {
    db: MemDb,
}

fn block_key(height: Height) -> Vec<u8> {
    let mut key = BLOCK_PREFIX.to_vec();
    key.extend_from_slice(&height.to_be_bytes());
    key
}

fn tx_key(hash: &Hash) -> Vec<u8> {
    let mut key = TX_PREFIX.to_vec();
    key.extend_from_slice(hash.as_bytes());
    key
}

fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, DatabaseError> {
    bincode::serialize(value).map_err(|e| DatabaseError::SerializationFailed(e.to_string()))
}

fn decode<T: for<'de> Deserialize<'de>>(bytes: &[u8]) -> Result<T, DatabaseError> {
    bincode::deserialize(bytes).map_err(|e| DatabaseError::SerializationFailed(e.to_string()))
}

impl BlockStore {
    pub fn new(db: MemDb) -> Self {
        Self { db }
    }

    /// Height of the last saved block, 0 when empty
    pub fn height(&self) -> Result<Height, DatabaseError> {
        match self.db.get(HEIGHT_KEY)? {
            Some(bytes) => {
                let bytes: [u8; 8] = bytes
                    .as_slice()
                    .try_into()
                    .map_err(|_| DatabaseError::ReadFailed("corrupt height".to_string()))?;
                Ok(Height::from_be_bytes(bytes))
            }
            None => Ok(0),
        }
    }

    /// Saves a block with the results of its transactions atomically
    pub fn save_block(&self, block: &Block, results: &[TxResult]) -> Result<(), DatabaseError> {
        let height = block.header.height;
        let mut ops = vec![
            WriteOp::Put {
                key: block_key(height),
                value: encode(block)?,
            },
            WriteOp::Put {
                key: HEIGHT_KEY.to_vec(),
                value: height.to_be_bytes().to_vec(),
            },
        ];

        for (index, (tx, result)) in block.txs.iter().zip(results).enumerate() {
            let record = TxRecord {
                height,
                index: index as u32,
                result: result.clone(),
            };
            ops.push(WriteOp::Put {
                key: tx_key(&Hash::hash(tx)),
                value: encode(&record)?,
            });
        }
        self.db.batch_write(ops)
    }

    pub fn load_block(&self, height: Height) -> Result<Option<Block>, DatabaseError> {
        self.db
            .get(&block_key(height))?
            .map(|bytes| decode(&bytes))
            .transpose()
    }

    /// Result of the transaction whose raw bytes hash to `hash`
    pub fn tx_record(&self, hash: &Hash) -> Result<Option<TxRecord>, DatabaseError> {
        self.db
            .get(&tx_key(hash))?
            .map(|bytes| decode(&bytes))
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{data_hash, Address, BlockHeader, ChainId, Signature64};
    use chrono::Utc;

    fn block(height: Height, txs: Vec<Vec<u8>>) -> Block {
        Block {
            header: BlockHeader {
                chain_id: ChainId::new("store"),
                height,
                time: Utc::now(),
                last_block_hash: Hash::ZERO,
                data_hash: data_hash(&txs),
                app_hash: Hash::ZERO,
                proposer_address: Address::from_public_key(
                    &ed25519_dalek::SigningKey::from_bytes(&[2u8; 32]).verifying_key(),
                ),
                signature: Signature64::zero(),
            },
            txs,
        }
    }

    #[test]
    fn test_save_and_load() {
        let store = BlockStore::new(MemDb::new());
        assert_eq!(store.height().unwrap(), 0);

        let b = block(1, vec![b"tx-a".to_vec()]);
        store.save_block(&b, &[TxResult::error(5, "short")]).unwrap();

        assert_eq!(store.height().unwrap(), 1);
        let loaded = store.load_block(1).unwrap().unwrap();
        assert_eq!(loaded.hash(), b.hash());
        assert!(store.load_block(2).unwrap().is_none());

        let record = store.tx_record(&Hash::hash(b"tx-a")).unwrap().unwrap();
        assert_eq!(record.height, 1);
        assert_eq!(record.result.code, 5);
    }
}
