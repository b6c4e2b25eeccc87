// Test application - Minimal chain application embedded in the test node
// - Auth accounts, bank balances, staking validators
// - Versioned committed state in the key/value store
// - Pruning and snapshots driven by AppOptions

pub mod snapshot;
pub mod state;

pub use snapshot::{SnapshotHeader, SnapshotStore};
pub use state::{AppParams, AppState, TxFailure, Validator};

use crate::abci::*;
use crate::config::AppOptions;
use crate::encoding::{CodecError, EncodingConfig, TxConfig};
use crate::genesis::GenesisState;
use crate::storage::{DatabaseError, MemDb, WriteOp};
use crate::types::{AccountId, Hash, Height};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub const APP_NAME: &str = "kratos-testnode";

// =============================================================================
// QUERY ROUTES
// =============================================================================

/// Account record of the 32-byte account id in `data`
pub const QUERY_ACCOUNT: &str = "auth/account";

/// Balances of the 32-byte account id in `data`
pub const QUERY_BALANCES: &str = "bank/balances";

/// Bonded validators
pub const QUERY_VALIDATORS: &str = "staking/validators";

const STATE_PREFIX: &[u8] = b"state/";
const LATEST_KEY: &[u8] = b"meta/latest_height";

fn state_key(height: Height) -> Vec<u8> {
    let mut key = STATE_PREFIX.to_vec();
    key.extend_from_slice(&height.to_be_bytes());
    key
}

/// Builds the application served to the consensus node
pub fn new_app_server(
    db: MemDb,
    snapshot_store: Option<SnapshotStore>,
    options: AppOptions,
) -> SharedApplication {
    Arc::new(Mutex::new(TestApp::new(db, snapshot_store, options)))
}

/// Embedded test application
pub struct TestApp {
    db: MemDb,
    snapshot_store: Option<SnapshotStore>,
    options: AppOptions,
    tx_config: TxConfig,

    /// State as of the last commit
    committed: AppState,

    /// State being built by the current block
    working: AppState,

    /// Mempool view, reset on every commit
    check_state: AppState,

    initialized: bool,
    last_height: Height,
    last_app_hash: Hash,
    block_height: Option<Height>,
    validator_updates: Vec<ValidatorUpdate>,
}

impl TestApp {
    pub fn new(db: MemDb, snapshot_store: Option<SnapshotStore>, options: AppOptions) -> Self {
        Self {
            db,
            snapshot_store,
            options,
            tx_config: EncodingConfig::make().tx_config,
            committed: AppState::default(),
            working: AppState::default(),
            check_state: AppState::default(),
            initialized: false,
            last_height: 0,
            last_app_hash: Hash::ZERO,
            block_height: None,
            validator_updates: Vec::new(),
        }
    }

    pub fn options(&self) -> &AppOptions {
        &self.options
    }

    pub fn committed_state(&self) -> &AppState {
        &self.committed
    }

    pub fn last_height(&self) -> Height {
        self.last_height
    }

    /// Committed state at `height`, or the latest when `height` is 0
    pub fn state_at(&self, height: Height) -> Result<Option<AppState>, AppError> {
        if height == 0 || height == self.last_height {
            return Ok(Some(self.committed.clone()));
        }
        if height > self.last_height {
            return Ok(None);
        }
        match self.db.get(&state_key(height))? {
            Some(bytes) => Ok(Some(bincode::deserialize(&bytes).map_err(|e| {
                AppError::Codec(CodecError::Decode(e.to_string()))
            })?)),
            None => Ok(None),
        }
    }

    /// Heights whose state is still stored
    pub fn retained_heights(&self) -> Vec<Height> {
        self.db
            .prefix_iterator(STATE_PREFIX)
            .filter_map(|(key, _)| parse_state_key(&key))
            .collect()
    }

    fn persist(&self, height: Height) -> Result<Height, AppError> {
        let bytes = bincode::serialize(&self.committed)
            .map_err(|e| AppError::Codec(CodecError::Encode(e.to_string())))?;

        let mut ops = vec![
            WriteOp::Put {
                key: state_key(height),
                value: bytes.clone(),
            },
            WriteOp::Put {
                key: LATEST_KEY.to_vec(),
                value: height.to_be_bytes().to_vec(),
            },
        ];

        let mut retain_height = 0;
        if let Some(target) = self.options.pruning.prune_target(height) {
            for (key, _) in self.db.prefix_iterator(STATE_PREFIX) {
                if parse_state_key(&key).is_some_and(|h| h <= target) {
                    ops.push(WriteOp::Delete { key });
                }
            }
            retain_height = target + 1;
            debug!("Pruning state versions up to {}", target);
        }
        self.db.batch_write(ops)?;

        if let Some(store) = &self.snapshot_store {
            let interval = self.options.snapshot_interval;
            if interval > 0 && height % interval == 0 {
                store.save(height, self.last_app_hash, &bytes);
            }
        }
        Ok(retain_height)
    }

    fn decode_tx(&self, tx: &[u8]) -> Result<crate::types::SignedTransaction, TxResult> {
        self.tx_config
            .decode(tx)
            .map_err(|e| TxResult::error(CODE_TX_DECODE, e.to_string()))
    }

    fn query_state(&self, request: &RequestQuery, state: &AppState) -> Result<Vec<u8>, (u32, String)> {
        let encode = |value: Result<Vec<u8>, serde_json::Error>| {
            value.map_err(|e| (CODE_UNKNOWN_REQUEST, e.to_string()))
        };

        match request.path.as_str() {
            QUERY_ACCOUNT => {
                let address = parse_account(&request.data)?;
                let account = state
                    .account(&address)
                    .ok_or_else(|| (CODE_NOT_FOUND, format!("account {} not found", address)))?;
                encode(serde_json::to_vec(account))
            }
            QUERY_BALANCES => {
                let address = parse_account(&request.data)?;
                encode(serde_json::to_vec(&state.balances_of(&address)))
            }
            QUERY_VALIDATORS => encode(serde_json::to_vec(&state.validators)),
            other => Err((CODE_UNKNOWN_REQUEST, format!("unknown query path {}", other))),
        }
    }
}

fn parse_state_key(key: &[u8]) -> Option<Height> {
    let bytes: [u8; 8] = key.strip_prefix(STATE_PREFIX)?.try_into().ok()?;
    Some(Height::from_be_bytes(bytes))
}

fn parse_account(data: &[u8]) -> Result<AccountId, (u32, String)> {
    let bytes: [u8; 32] = data
        .try_into()
        .map_err(|_| (CODE_INVALID_ADDRESS, "expected a 32 byte account id".to_string()))?;
    Ok(AccountId::from_bytes(bytes))
}

impl Application for TestApp {
    fn info(&self) -> ResponseInfo {
        ResponseInfo {
            data: APP_NAME.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            last_block_height: self.last_height,
            last_block_app_hash: self.last_app_hash,
        }
    }

    fn init_chain(&mut self, request: RequestInitChain) -> Result<ResponseInitChain, AppError> {
        if self.initialized {
            return Err(AppError::AlreadyInitialized);
        }

        let genesis: GenesisState = serde_json::from_slice(&request.app_state_bytes)
            .map_err(|e| AppError::InvalidGenesis(e.to_string()))?;
        let mut state = AppState::from_genesis(request.chain_id.clone(), &genesis);

        for (index, tx) in genesis.genutil.gen_txs.iter().enumerate() {
            state
                .apply(tx, true)
                .map_err(|failure| AppError::GenesisTx {
                    index,
                    log: failure.log,
                })?;
        }

        let validators = if request.validators.is_empty() {
            state.validator_updates()
        } else {
            request.validators
        };

        self.last_app_hash = state.app_hash();
        self.last_height = request.initial_height.saturating_sub(1);
        self.committed = state.clone();
        self.check_state = state.clone();
        self.working = state;
        self.initialized = true;

        info!(
            "Initialized chain {} with {} account(s) and {} validator(s)",
            request.chain_id,
            self.committed.accounts.len(),
            validators.len()
        );

        Ok(ResponseInitChain {
            validators,
            app_hash: self.last_app_hash,
        })
    }

    fn check_tx(&mut self, tx: &[u8]) -> ResponseCheckTx {
        let tx = match self.decode_tx(tx) {
            Ok(tx) => tx,
            Err(result) => return result,
        };
        match self.check_state.apply(&tx, false) {
            Ok(_) => TxResult::ok(),
            Err(failure) => failure.into(),
        }
    }

    fn begin_block(&mut self, request: RequestBeginBlock) -> Result<(), AppError> {
        if !self.initialized {
            return Err(AppError::NotInitialized);
        }
        let header = &request.header;
        if header.chain_id != self.working.chain_id {
            return Err(AppError::ChainIdMismatch {
                expected: self.working.chain_id.to_string(),
                found: header.chain_id.to_string(),
            });
        }
        if header.height != self.last_height + 1 {
            return Err(AppError::UnexpectedHeight {
                expected: self.last_height + 1,
                found: header.height,
            });
        }

        self.block_height = Some(header.height);
        self.validator_updates.clear();
        Ok(())
    }

    fn deliver_tx(&mut self, tx: &[u8]) -> ResponseDeliverTx {
        if self.block_height.is_none() {
            return TxResult::error(CODE_UNKNOWN_REQUEST, "no block in progress");
        }
        let tx = match self.decode_tx(tx) {
            Ok(tx) => tx,
            Err(result) => return result,
        };
        match self.working.apply(&tx, false) {
            Ok(update) => {
                self.validator_updates.extend(update);
                TxResult::ok()
            }
            Err(failure) => {
                debug!("Transaction {} failed: {}", tx.hash(), failure.log);
                failure.into()
            }
        }
    }

    fn end_block(&mut self, height: Height) -> ResponseEndBlock {
        if self.block_height != Some(height) {
            warn!("end_block for height {} outside of its block", height);
        }
        ResponseEndBlock {
            validator_updates: std::mem::take(&mut self.validator_updates),
        }
    }

    fn commit(&mut self) -> Result<ResponseCommit, AppError> {
        let height = self.block_height.take().ok_or(AppError::NotInitialized)?;

        self.committed = self.working.clone();
        self.last_app_hash = self.committed.app_hash();
        self.last_height = height;
        let retain_height = self.persist(height)?;
        self.check_state = self.committed.clone();

        debug!("Committed height {} app hash {}", height, self.last_app_hash);
        Ok(ResponseCommit {
            data: self.last_app_hash,
            retain_height,
        })
    }

    fn query(&self, request: RequestQuery) -> ResponseQuery {
        let state = match self.state_at(request.height) {
            Ok(Some(state)) => state,
            Ok(None) => {
                return ResponseQuery {
                    code: CODE_NOT_FOUND,
                    log: format!("no state at height {}", request.height),
                    height: request.height,
                    ..ResponseQuery::default()
                }
            }
            Err(e) => {
                return ResponseQuery {
                    code: CODE_UNKNOWN_REQUEST,
                    log: e.to_string(),
                    height: request.height,
                    ..ResponseQuery::default()
                }
            }
        };

        let height = if request.height == 0 {
            self.last_height
        } else {
            request.height
        };
        match self.query_state(&request, &state) {
            Ok(value) => ResponseQuery {
                value,
                height,
                ..ResponseQuery::default()
            },
            Err((code, log)) => ResponseQuery {
                code,
                log,
                height,
                ..ResponseQuery::default()
            },
        }
    }
}

/// Application errors
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Chain already initialized")]
    AlreadyInitialized,

    #[error("Chain not initialized or no block in progress")]
    NotInitialized,

    #[error("Invalid genesis state: {0}")]
    InvalidGenesis(String),

    #[error("Genesis transaction {index} failed: {log}")]
    GenesisTx { index: usize, log: String },

    #[error("Chain id mismatch: expected {expected}, found {found}")]
    ChainIdMismatch { expected: String, found: String },

    #[error("Unexpected block height: expected {expected}, found {found}")]
    UnexpectedHeight { expected: Height, found: Height },

    #[error(transparent)]
    Database(#[from] DatabaseError),

    #[error(transparent)]
    Codec(#[from] CodecError),
}
