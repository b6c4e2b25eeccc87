// Block - Minimal auditable block produced by the test node
use super::account::{Address, PubKey};
use super::primitives::{ChainId, Hash, Height};
use super::signature::{domain_separate, Signature64, DOMAIN_PROPOSAL};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Full block
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Block {
    pub header: BlockHeader,

    /// Raw transaction bytes as submitted
    pub txs: Vec<Vec<u8>>,
}

impl Block {
    pub fn hash(&self) -> Hash {
        self.header.hash()
    }

    /// Checks the header's data hash against the body
    pub fn verify_data_hash(&self) -> bool {
        self.header.data_hash == data_hash(&self.txs)
    }
}

/// Block header
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockHeader {
    pub chain_id: ChainId,

    pub height: Height,

    pub time: DateTime<Utc>,

    /// Hash of the previous block (zero at the initial height)
    pub last_block_hash: Hash,

    /// Hash over the transactions in this block
    pub data_hash: Hash,

    /// Application hash after the previous block
    pub app_hash: Hash,

    pub proposer_address: Address,

    /// Proposer signature over the header hash
    pub signature: Signature64,
}

impl BlockHeader {
    /// Header hash, signature excluded
    pub fn hash(&self) -> Hash {
        let bytes = bincode::serialize(&(
            &self.chain_id,
            self.height,
            self.time.timestamp_millis(),
            self.last_block_hash,
            self.data_hash,
            self.app_hash,
            self.proposer_address,
        ));
        match bytes {
            Ok(bytes) => Hash::hash(&bytes),
            Err(_) => Hash::ZERO,
        }
    }

    /// Message the proposer signs for this header
    pub fn signing_message(&self) -> Vec<u8> {
        domain_separate(DOMAIN_PROPOSAL, self.hash().as_bytes())
    }

    pub fn verify_signature(&self, proposer: &PubKey) -> bool {
        proposer.address() == self.proposer_address
            && proposer.verify(&self.signing_message(), self.signature.as_bytes())
    }
}

/// Hash over an ordered list of raw transactions
pub fn data_hash(txs: &[Vec<u8>]) -> Hash {
    if txs.is_empty() {
        return Hash::ZERO;
    }
    let mut hasher = blake3::Hasher::new();
    for tx in txs {
        hasher.update(Hash::hash(tx).as_bytes());
    }
    Hash::from_bytes(*hasher.finalize().as_bytes())
}
