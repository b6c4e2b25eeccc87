// Request and response types exchanged between the consensus node and the application
use crate::genesis::ConsensusParams;
use crate::types::{BlockHeader, ChainId, Hash, Height, PubKey};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// RESULT CODES
// =============================================================================

pub const CODE_OK: u32 = 0;
pub const CODE_TX_DECODE: u32 = 2;
pub const CODE_INVALID_SEQUENCE: u32 = 3;
pub const CODE_UNAUTHORIZED: u32 = 4;
pub const CODE_INSUFFICIENT_FUNDS: u32 = 5;
pub const CODE_UNKNOWN_REQUEST: u32 = 6;
pub const CODE_INVALID_ADDRESS: u32 = 7;
pub const CODE_UNKNOWN_ADDRESS: u32 = 9;
pub const CODE_INVALID_COINS: u32 = 10;
pub const CODE_MEMO_TOO_LARGE: u32 = 12;
pub const CODE_WRONG_CHAIN: u32 = 18;
pub const CODE_VALIDATOR_EXISTS: u32 = 20;
pub const CODE_NOT_FOUND: u32 = 38;

// =============================================================================
// REQUESTS
// =============================================================================

#[derive(Debug, Clone)]
pub struct RequestInitChain {
    pub time: DateTime<Utc>,
    pub chain_id: ChainId,
    pub consensus_params: ConsensusParams,

    /// Validators from the genesis document, may be empty
    pub validators: Vec<ValidatorUpdate>,

    /// JSON encoded genesis state
    pub app_state_bytes: Vec<u8>,

    pub initial_height: Height,
}

#[derive(Debug, Clone)]
pub struct RequestBeginBlock {
    pub hash: Hash,
    pub header: BlockHeader,
}

#[derive(Debug, Clone, Default)]
pub struct RequestQuery {
    /// Route such as `bank/balances`
    pub path: String,

    pub data: Vec<u8>,

    /// Height to query, 0 for the latest committed state
    pub height: Height,
}

// =============================================================================
// RESPONSES
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseInfo {
    pub data: String,
    pub version: String,
    pub last_block_height: Height,
    pub last_block_app_hash: Hash,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseInitChain {
    pub validators: Vec<ValidatorUpdate>,
    pub app_hash: Hash,
}

/// Outcome of `check_tx` or `deliver_tx`
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TxResult {
    pub code: u32,
    pub log: String,
}

impl TxResult {
    pub fn ok() -> Self {
        Self::default()
    }

    pub fn error(code: u32, log: impl Into<String>) -> Self {
        Self {
            code,
            log: log.into(),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.code == CODE_OK
    }
}

pub type ResponseCheckTx = TxResult;
pub type ResponseDeliverTx = TxResult;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ResponseEndBlock {
    pub validator_updates: Vec<ValidatorUpdate>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseCommit {
    /// Application hash after the block
    pub data: Hash,

    /// Oldest height the application still serves, 0 when nothing is pruned
    pub retain_height: Height,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ResponseQuery {
    pub code: u32,
    pub log: String,
    pub value: Vec<u8>,
    pub height: Height,
}

impl ResponseQuery {
    pub fn is_ok(&self) -> bool {
        self.code == CODE_OK
    }
}

/// Voting power change of one validator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatorUpdate {
    pub pub_key: PubKey,
    pub power: u64,
}
