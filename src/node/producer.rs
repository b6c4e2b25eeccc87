// Block Producer - Single-validator block production
//
// - Reaps the mempool in arrival order
// - Signs every proposal through the private validator (double-sign protected)
// - Executes the block through the local application client
// - Stores the block and the transaction results

use super::block_store::BlockStore;
use super::mempool::Mempool;
use super::metrics::NodeMetrics;
use super::NodeError;
use crate::abci::{LocalClient, RequestBeginBlock, TxResult, ValidatorUpdate};
use crate::config::ConsensusConfig;
use crate::privval::FilePV;
use crate::types::{data_hash, Block, BlockHeader, ChainId, Hash, Height, Signature64};
use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::watch;
use tracing::{debug, info};

/// Round used for every proposal of the single validator
const PROPOSAL_ROUND: u32 = 0;

/// Chain position the producer continues from
#[derive(Debug, Clone)]
pub struct ChainTip {
    pub next_height: Height,
    pub last_block_hash: Hash,
    pub last_app_hash: Hash,
    pub last_block_time: DateTime<Utc>,
}

pub struct BlockProducer {
    chain_id: ChainId,
    consensus: ConsensusConfig,
    time_iota_ms: u64,
    priv_validator: FilePV,
    client: LocalClient,
    block_store: BlockStore,
    mempool: Arc<Mutex<Mempool>>,
    metrics: Arc<NodeMetrics>,
    height_tx: watch::Sender<Height>,
    validators: Vec<ValidatorUpdate>,
    tip: ChainTip,
    last_produced: Option<Instant>,
}

impl BlockProducer {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        chain_id: ChainId,
        consensus: ConsensusConfig,
        time_iota_ms: u64,
        priv_validator: FilePV,
        client: LocalClient,
        block_store: BlockStore,
        mempool: Arc<Mutex<Mempool>>,
        metrics: Arc<NodeMetrics>,
        height_tx: watch::Sender<Height>,
        validators: Vec<ValidatorUpdate>,
        tip: ChainTip,
    ) -> Self {
        Self {
            chain_id,
            consensus,
            time_iota_ms,
            priv_validator,
            client,
            block_store,
            mempool,
            metrics,
            height_tx,
            validators,
            tip,
            last_produced: None,
        }
    }

    pub fn next_height(&self) -> Height {
        self.tip.next_height
    }

    pub fn validators(&self) -> &[ValidatorUpdate] {
        &self.validators
    }

    /// Block time: now, but at least `time_iota_ms` after the previous block
    fn next_block_time(&self) -> DateTime<Utc> {
        let earliest = self.tip.last_block_time + Duration::milliseconds(self.time_iota_ms as i64);
        Utc::now().max(earliest)
    }

    /// Produces and commits one block
    ///
    /// Returns `None` when the mempool is empty and empty blocks are disabled.
    pub fn produce_block(&mut self) -> Result<Option<Block>, NodeError> {
        let txs = self.mempool.lock().reap(self.consensus.max_txs_per_block);
        if txs.is_empty() && !self.consensus.create_empty_blocks {
            return Ok(None);
        }

        let height = self.tip.next_height;
        let time = self.next_block_time();
        let mut header = BlockHeader {
            chain_id: self.chain_id.clone(),
            height,
            time,
            last_block_hash: self.tip.last_block_hash,
            data_hash: data_hash(&txs),
            app_hash: self.tip.last_app_hash,
            proposer_address: self.priv_validator.address(),
            signature: Signature64::zero(),
        };
        header.signature =
            self.priv_validator
                .sign_proposal(height, PROPOSAL_ROUND, &header.signing_message())?;
        let hash = header.hash();

        self.client.begin_block(RequestBeginBlock {
            hash,
            header: header.clone(),
        })?;
        let results: Vec<TxResult> = txs.iter().map(|tx| self.client.deliver_tx(tx)).collect();
        let end = self.client.end_block(height);
        let commit = self.client.commit()?;

        self.apply_validator_updates(end.validator_updates);

        let block = Block { header, txs };
        self.block_store.save_block(&block, &results)?;

        let failed = results.iter().filter(|r| !r.is_ok()).count() as u64;
        let interval_ms = self
            .last_produced
            .map(|t| t.elapsed().as_millis() as u64)
            .unwrap_or(0);
        self.metrics
            .record_block(height, block.txs.len() as u64, failed, interval_ms);

        self.tip = ChainTip {
            next_height: height + 1,
            last_block_hash: hash,
            last_app_hash: commit.data,
            last_block_time: time,
        };
        self.last_produced = Some(Instant::now());
        self.recheck_mempool();
        self.height_tx.send_replace(height);

        if block.txs.is_empty() {
            debug!("Committed empty block {} ({})", height, hash);
        } else {
            info!(
                "Committed block {} ({}) with {} tx(s), {} failed",
                height,
                hash,
                block.txs.len(),
                failed
            );
        }
        Ok(Some(block))
    }

    fn apply_validator_updates(&mut self, updates: Vec<ValidatorUpdate>) {
        for update in updates {
            debug!("Validator {} power {}", update.pub_key, update.power);
            self.validators.retain(|v| v.pub_key != update.pub_key);
            if update.power > 0 {
                self.validators.push(update);
            }
        }
    }

    /// Drops pending transactions that no longer pass `check_tx`
    fn recheck_mempool(&self) {
        let client = &self.client;
        let dropped = self.mempool.lock().retain(|tx| client.check_tx(tx).is_ok());
        if dropped > 0 {
            debug!("Recheck dropped {} transaction(s)", dropped);
        }
    }
}
