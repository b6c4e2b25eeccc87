// Mempool - FIFO pool of transactions that passed check_tx
use crate::types::Hash;
use std::collections::{HashSet, VecDeque};

/// Raw transactions waiting for a block, in arrival order
#[derive(Debug)]
pub struct Mempool {
    txs: VecDeque<(Hash, Vec<u8>)>,
    hashes: HashSet<Hash>,
    max_size: usize,
}

impl Mempool {
    pub fn new(max_size: usize) -> Self {
        Self {
            txs: VecDeque::new(),
            hashes: HashSet::new(),
            max_size,
        }
    }

    /// Queues a transaction
    pub fn add(&mut self, tx: Vec<u8>) -> Result<Hash, MempoolError> {
        let hash = Hash::hash(&tx);
        if self.hashes.contains(&hash) {
            return Err(MempoolError::AlreadyKnown(hash));
        }
        if self.is_full() {
            return Err(MempoolError::Full(self.max_size));
        }
        self.hashes.insert(hash);
        self.txs.push_back((hash, tx));
        Ok(hash)
    }

    /// Removes and returns up to `max` transactions, oldest first
    pub fn reap(&mut self, max: usize) -> Vec<Vec<u8>> {
        let count = max.min(self.txs.len());
        self.txs
            .drain(..count)
            .map(|(hash, tx)| {
                self.hashes.remove(&hash);
                tx
            })
            .collect()
    }

    /// Keeps only transactions accepted by `keep`, returning how many were dropped
    pub fn retain(&mut self, mut keep: impl FnMut(&[u8]) -> bool) -> usize {
        let before = self.txs.len();
        let hashes = &mut self.hashes;
        self.txs.retain(|(hash, tx)| {
            let kept = keep(tx);
            if !kept {
                hashes.remove(hash);
            }
            kept
        });
        before - self.txs.len()
    }

    pub fn is_full(&self) -> bool {
        self.txs.len() >= self.max_size
    }

    pub fn contains(&self, hash: &Hash) -> bool {
        self.hashes.contains(hash)
    }

    pub fn len(&self) -> usize {
        self.txs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.txs.is_empty()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum MempoolError {
    #[error("Transaction {0} already in mempool")]
    AlreadyKnown(Hash),

    #[error("Mempool full ({0} transactions)")]
    Full(usize),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fifo_reap() {
        let mut pool = Mempool::new(10);
        for i in 0..5u8 {
            pool.add(vec![i]).unwrap();
        }

        assert_eq!(pool.reap(2), vec![vec![0], vec![1]]);
        assert_eq!(pool.len(), 3);
        assert_eq!(pool.reap(100), vec![vec![2], vec![3], vec![4]]);
        assert!(pool.is_empty());
    }

    #[test]
    fn test_rejects_duplicates_and_overflow() {
        let mut pool = Mempool::new(1);
        let hash = pool.add(b"a".to_vec()).unwrap();
        assert!(pool.contains(&hash));
        assert!(pool.is_full());
        assert!(matches!(pool.add(b"a".to_vec()), Err(MempoolError::AlreadyKnown(_))));
        assert!(matches!(pool.add(b"b".to_vec()), Err(MempoolError::Full(1))));

        pool.reap(1);
        assert!(!pool.contains(&hash));
        assert!(pool.add(b"a".to_vec()).is_ok());
    }

    #[test]
    fn test_retain_drops_rejected() {
        let mut pool = Mempool::new(10);
        pool.add(b"keep".to_vec()).unwrap();
        let dropped = pool.add(b"drop".to_vec()).unwrap();

        assert_eq!(pool.retain(|tx| tx == b"keep"), 1);
        assert_eq!(pool.len(), 1);
        assert!(!pool.contains(&dropped));
    }
}
