// Metrics - Block production counters of the node
use crate::types::{ChainId, Height};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Counters updated by the block producer
#[derive(Debug)]
pub struct NodeMetrics {
    namespace: String,
    chain_id: ChainId,
    enabled: AtomicBool,
    height: AtomicU64,
    blocks: AtomicU64,
    last_block_txs: AtomicU64,
    total_txs: AtomicU64,
    failed_txs: AtomicU64,
    block_interval_ms: AtomicU64,
}

/// Point-in-time copy of [`NodeMetrics`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub namespace: String,
    pub chain_id: ChainId,
    pub height: Height,
    pub blocks: u64,
    pub last_block_txs: u64,
    pub total_txs: u64,
    pub failed_txs: u64,
    pub block_interval_ms: u64,
}

impl NodeMetrics {
    pub fn new(namespace: impl Into<String>, chain_id: ChainId, enabled: bool) -> Self {
        Self {
            namespace: namespace.into(),
            chain_id,
            enabled: AtomicBool::new(enabled),
            height: AtomicU64::new(0),
            blocks: AtomicU64::new(0),
            last_block_txs: AtomicU64::new(0),
            total_txs: AtomicU64::new(0),
            failed_txs: AtomicU64::new(0),
            block_interval_ms: AtomicU64::new(0),
        }
    }

    /// Metrics that record nothing
    pub fn nop(chain_id: ChainId) -> Self {
        Self::new("", chain_id, false)
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    pub fn record_block(&self, height: Height, txs: u64, failed: u64, interval_ms: u64) {
        if !self.is_enabled() {
            return;
        }
        self.height.store(height, Ordering::Relaxed);
        self.blocks.fetch_add(1, Ordering::Relaxed);
        self.last_block_txs.store(txs, Ordering::Relaxed);
        self.total_txs.fetch_add(txs, Ordering::Relaxed);
        self.failed_txs.fetch_add(failed, Ordering::Relaxed);
        self.block_interval_ms.store(interval_ms, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            namespace: self.namespace.clone(),
            chain_id: self.chain_id.clone(),
            height: self.height.load(Ordering::Relaxed),
            blocks: self.blocks.load(Ordering::Relaxed),
            last_block_txs: self.last_block_txs.load(Ordering::Relaxed),
            total_txs: self.total_txs.load(Ordering::Relaxed),
            failed_txs: self.failed_txs.load(Ordering::Relaxed),
            block_interval_ms: self.block_interval_ms.load(Ordering::Relaxed),
        }
    }
}
