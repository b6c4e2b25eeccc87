// Node - Single-validator consensus node driving the embedded application
// - Handshake (init chain) at construction
// - Block production task started on demand
// - Transaction submission and queries

pub mod block_store;
pub mod mempool;
pub mod metrics;
pub mod producer;
pub mod providers;

pub use block_store::{BlockStore, TxRecord};
pub use mempool::{Mempool, MempoolError};
pub use metrics::{MetricsSnapshot, NodeMetrics};
pub use producer::{BlockProducer, ChainTip};
pub use providers::{
    default_db_provider, default_genesis_doc_provider, default_metrics_provider, DbContext,
    DbProvider, GenesisDocProvider, MetricsProvider,
};

use crate::abci::{
    LocalClient, LocalClientCreator, RequestInitChain, RequestQuery, ResponseCheckTx,
    ResponseQuery, ValidatorUpdate,
};
use crate::app::AppError;
use crate::config::NodeConfig;
use crate::genesis::{GenesisDoc, GenesisError};
use crate::privval::{FilePV, NodeKey, PrivValError};
use crate::storage::DatabaseError;
use crate::types::{Block, ChainId, Hash, Height};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::instrument::WithSubscriber;
use tracing::{error, info, Dispatch};

/// Database id of the block store
pub const BLOCKSTORE_DB: &str = "blockstore";

/// Outcome of submitting a transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BroadcastResult {
    /// Hash of the raw transaction bytes
    pub hash: Hash,

    /// Mempool admission result
    pub check: ResponseCheckTx,
}

/// Consensus node of a test chain
pub struct Node {
    config: NodeConfig,
    genesis: GenesisDoc,
    node_key: NodeKey,
    client: LocalClient,
    block_store: BlockStore,
    mempool: Arc<Mutex<Mempool>>,
    metrics: Arc<NodeMetrics>,
    producer: Mutex<Option<BlockProducer>>,
    // held for the whole of each block; true once the node is halted
    halted: Arc<Mutex<bool>>,
    task: Mutex<Option<JoinHandle<BlockProducer>>>,
    height_rx: watch::Receiver<Height>,
    shutdown_tx: watch::Sender<bool>,
    dispatch: Dispatch,
}

impl Node {
    /// Assembles the node and runs the handshake with the application
    ///
    /// A fresh application is initialized from the genesis document. The
    /// private validator must belong to the resulting validator set.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: NodeConfig,
        priv_validator: FilePV,
        node_key: NodeKey,
        client_creator: LocalClientCreator,
        genesis_provider: GenesisDocProvider,
        db_provider: DbProvider,
        metrics_provider: MetricsProvider,
        dispatch: Dispatch,
    ) -> Result<Self, NodeError> {
        tracing::dispatcher::with_default(&dispatch, || -> Result<Self, NodeError> {
            let genesis = genesis_provider(&config)?;
            genesis.validate()?;

            let client = client_creator.new_client();
            let block_store = BlockStore::new(db_provider(&DbContext {
                id: BLOCKSTORE_DB,
                config: &config,
            })?);
            let (validators, app_hash) = handshake(&client, &genesis, &block_store)?;

            let pub_key = priv_validator.pub_key();
            if !validators.iter().any(|v| v.pub_key == pub_key && v.power > 0) {
                return Err(NodeError::NotValidator(priv_validator.address().to_hex()));
            }

            let metrics = metrics_provider(&config.instrumentation, &genesis.chain_id);
            let mempool = Arc::new(Mutex::new(Mempool::new(config.mempool.size)));
            let start_height = genesis.initial_height - 1;
            let (height_tx, height_rx) = watch::channel(start_height);
            let (shutdown_tx, _) = watch::channel(false);

            let producer = BlockProducer::new(
                genesis.chain_id.clone(),
                config.consensus.clone(),
                genesis.consensus_params.block.time_iota_ms,
                priv_validator,
                client.clone(),
                block_store.clone(),
                Arc::clone(&mempool),
                Arc::clone(&metrics),
                height_tx,
                validators,
                ChainTip {
                    next_height: genesis.initial_height,
                    last_block_hash: Hash::ZERO,
                    last_app_hash: app_hash,
                    last_block_time: genesis.genesis_time,
                },
            );

            info!(
                "Node {} ready on chain {} (moniker {})",
                node_key.id(),
                genesis.chain_id,
                config.moniker
            );

            Ok(Self {
                config,
                genesis,
                node_key,
                client,
                block_store,
                mempool,
                metrics,
                producer: Mutex::new(Some(producer)),
                halted: Arc::new(Mutex::new(false)),
                task: Mutex::new(None),
                height_rx,
                shutdown_tx,
                dispatch: dispatch.clone(),
            })
        })
    }

    /// Starts block production on the current tokio runtime
    pub async fn start(&self) -> Result<(), NodeError> {
        if *self.halted.lock() {
            return Err(NodeError::Halted);
        }
        let mut producer = self.producer.lock().take().ok_or(NodeError::AlreadyStarted)?;

        self.shutdown_tx.send_replace(false);
        let mut shutdown = self.shutdown_tx.subscribe();
        let halted = Arc::clone(&self.halted);
        let period = Duration::from_millis(self.config.consensus.timeout_commit_ms.max(1));

        let task = async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = shutdown.changed() => break,
                    _ = ticker.tick() => {
                        match produce_unless_halted(&mut producer, &halted) {
                            Ok(true) => {}
                            Ok(false) => break,
                            Err(e) => {
                                error!("Block production halted at height {}: {}", producer.next_height(), e);
                                break;
                            }
                        }
                    }
                }
            }
            info!("Block producer stopped");
            producer
        };

        let handle = tokio::spawn(task.with_subscriber(self.dispatch.clone()));
        *self.task.lock() = Some(handle);
        info!("Started block production every {:?}", period);
        Ok(())
    }

    /// Stops block production; the node can be started again afterwards
    pub async fn stop(&self) -> Result<(), NodeError> {
        let handle = self.task.lock().take().ok_or(NodeError::NotRunning)?;
        self.shutdown_tx.send_replace(true);

        let producer = handle
            .await
            .map_err(|e| NodeError::Task(e.to_string()))?;
        *self.producer.lock() = Some(producer);
        Ok(())
    }

    /// Stops block production for good, waiting for an in-flight block
    ///
    /// Once this returns the producer touches neither the databases nor the
    /// private validator files again.
    pub fn halt(&self) {
        *self.halted.lock() = true;
        if let Some(handle) = self.task.lock().take() {
            handle.abort();
        }
    }

    pub fn is_halted(&self) -> bool {
        *self.halted.lock()
    }

    pub fn is_running(&self) -> bool {
        self.task.lock().as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Height of the last committed block
    pub fn height(&self) -> Height {
        *self.height_rx.borrow()
    }

    /// Waits until a block at `height` or above is committed
    pub async fn wait_for_height(&self, height: Height, timeout: Duration) -> Result<Height, NodeError> {
        let mut rx = self.height_rx.clone();
        let reached = tokio::time::timeout(timeout, rx.wait_for(|h| *h >= height))
            .await
            .map_err(|_| NodeError::Timeout {
                height,
                current: self.height(),
            })?
            .map_err(|_| NodeError::NotRunning)?;
        Ok(*reached)
    }

    /// Runs `check_tx` and queues the transaction when it passes
    ///
    /// Admission is decided before `check_tx`, so a refused transaction never
    /// consumes its sender's sequence.
    pub fn broadcast_tx(&self, tx: Vec<u8>) -> Result<BroadcastResult, NodeError> {
        let hash = Hash::hash(&tx);
        let mut mempool = self.mempool.lock();
        if mempool.contains(&hash) {
            return Err(MempoolError::AlreadyKnown(hash).into());
        }
        if mempool.is_full() {
            return Err(MempoolError::Full(mempool.len()).into());
        }

        let check = self.client.check_tx(&tx);
        if check.is_ok() {
            mempool.add(tx)?;
        }
        Ok(BroadcastResult { hash, check })
    }

    pub fn query(&self, request: RequestQuery) -> ResponseQuery {
        self.client.query(request)
    }

    pub fn block(&self, height: Height) -> Result<Option<Block>, NodeError> {
        Ok(self.block_store.load_block(height)?)
    }

    /// Execution result of an included transaction
    pub fn tx(&self, hash: &Hash) -> Result<Option<TxRecord>, NodeError> {
        Ok(self.block_store.tx_record(hash)?)
    }

    pub fn mempool_size(&self) -> usize {
        self.mempool.lock().len()
    }

    pub fn node_id(&self) -> String {
        self.node_key.id()
    }

    pub fn chain_id(&self) -> &ChainId {
        &self.genesis.chain_id
    }

    pub fn genesis_doc(&self) -> &GenesisDoc {
        &self.genesis
    }

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }
}

impl Drop for Node {
    fn drop(&mut self) {
        self.halt();
    }
}

/// Produces one block while holding the halt guard
///
/// Returns `false` without producing when the node has been halted.
fn produce_unless_halted(producer: &mut BlockProducer, halted: &Mutex<bool>) -> Result<bool, NodeError> {
    let halted = halted.lock();
    if *halted {
        return Ok(false);
    }
    producer.produce_block()?;
    Ok(true)
}

/// Initializes a fresh application from genesis
///
/// Returns the validator set and the genesis application hash.
fn handshake(
    client: &LocalClient,
    genesis: &GenesisDoc,
    block_store: &BlockStore,
) -> Result<(Vec<ValidatorUpdate>, Hash), NodeError> {
    let info = client.info();
    let stored = block_store.height()?;
    if info.last_block_height != 0 || stored != 0 {
        return Err(NodeError::Handshake(format!(
            "application at height {}, block store at height {}; only fresh chains are supported",
            info.last_block_height, stored
        )));
    }

    let response = client.init_chain(RequestInitChain {
        time: genesis.genesis_time,
        chain_id: genesis.chain_id.clone(),
        consensus_params: genesis.consensus_params.clone(),
        validators: genesis
            .validators
            .iter()
            .map(|v| ValidatorUpdate {
                pub_key: v.pub_key,
                power: v.power,
            })
            .collect(),
        app_state_bytes: serde_json::to_vec(&genesis.app_state)
            .map_err(|e| NodeError::Handshake(e.to_string()))?,
        initial_height: genesis.initial_height,
    })?;

    if response.validators.is_empty() {
        return Err(NodeError::Handshake("genesis yields an empty validator set".to_string()));
    }
    info!(
        "Handshake complete: {} validator(s), app hash {}",
        response.validators.len(),
        response.app_hash
    );
    Ok((response.validators, response.app_hash))
}

/// Node errors
#[derive(Debug, thiserror::Error)]
pub enum NodeError {
    #[error(transparent)]
    Genesis(#[from] GenesisError),

    #[error(transparent)]
    Database(#[from] DatabaseError),

    #[error(transparent)]
    App(#[from] AppError),

    #[error(transparent)]
    PrivVal(#[from] PrivValError),

    #[error(transparent)]
    Mempool(#[from] MempoolError),

    #[error("Handshake failed: {0}")]
    Handshake(String),

    #[error("Private validator {0} is not in the validator set")]
    NotValidator(String),

    #[error("Block production already started")]
    AlreadyStarted,

    #[error("Block production is not running")]
    NotRunning,

    #[error("Node is halted")]
    Halted,

    #[error("Timed out waiting for height {height} (current {current})")]
    Timeout { height: Height, current: Height },

    #[error("Producer task failed: {0}")]
    Task(String),
}
