// Chain Tests - A bootstrapped node producing blocks and executing transactions
// Block production, transfers through the client context, restart and metrics

#[cfg(test)]
mod chain_tests {
    use crate::abci::CODE_INSUFFICIENT_FUNDS;
    use crate::client::ClientError;
    use crate::config::NodeConfig;
    use crate::node::{MempoolError, NodeError, TxRecord};
    use crate::types::{Coin, Hash, Height, PubKey, TransactionCall, DEFAULT_TEST_BALANCE};
    use crate::TestNode;
    use std::sync::Arc;
    use std::time::Duration;

    const WAIT: Duration = Duration::from_secs(10);

    // ===== HELPER FUNCTIONS =====

    async fn started(accounts: &[&str]) -> TestNode {
        let testnode = crate::new(NodeConfig::test_config(), true, accounts).unwrap();
        testnode.node.start().await.unwrap();
        testnode
    }

    fn consensus_key(testnode: &TestNode) -> PubKey {
        match &testnode.node.genesis_doc().app_state.genutil.gen_txs[0].transaction.call {
            TransactionCall::CreateValidator { consensus_pubkey, .. } => *consensus_pubkey,
            other => panic!("unexpected genesis transaction {:?}", other),
        }
    }

    fn transfer(testnode: &TestNode, from: &str, to: &str, amount: u128) -> Result<Hash, ClientError> {
        let to = testnode.context.keyring().key(to)?.account();
        let tx = testnode.context.sign_tx(
            from,
            TransactionCall::Transfer {
                to,
                amount: Coin::bond(amount),
            },
            "",
        )?;
        Ok(testnode.context.broadcast_tx(&tx)?.hash)
    }

    /// Waits for the transaction to land in a committed block
    async fn wait_for_tx(testnode: &TestNode, hash: &Hash) -> TxRecord {
        let mut height = testnode.node.height();
        loop {
            if let Some(record) = testnode.node.tx(hash).unwrap() {
                return record;
            }
            height += 1;
            testnode.node.wait_for_height(height, WAIT).await.unwrap();
        }
    }

    fn balance(testnode: &TestNode, name: &str) -> u128 {
        let account = testnode.context.keyring().key(name).unwrap().account();
        testnode
            .context
            .query_balances(&account)
            .unwrap()
            .iter()
            .find(|c| c.denom == crate::types::BOND_DENOM)
            .map(|c| c.amount)
            .unwrap_or(0)
    }

    // ===== TEST 1: BLOCK PRODUCTION =====

    #[tokio::test]
    async fn test_produces_signed_chained_blocks() {
        let testnode = started(&["alice"]).await;
        testnode.node.wait_for_height(3, WAIT).await.unwrap();

        let proposer = consensus_key(&testnode);
        let mut last_hash = Hash::ZERO;
        let mut last_time = testnode.node.genesis_doc().genesis_time;

        for height in 1..=3 {
            let block = testnode.node.block(height).unwrap().expect("block should be stored");
            assert_eq!(block.header.height, height);
            assert_eq!(&block.header.chain_id, testnode.chain_id());
            assert_eq!(block.header.last_block_hash, last_hash);
            assert!(block.header.time > last_time);
            assert!(block.header.verify_signature(&proposer));
            assert!(block.verify_data_hash());

            last_hash = block.header.hash();
            last_time = block.header.time;
        }
    }

    #[tokio::test]
    async fn test_wait_for_height_times_out_when_stopped() {
        let testnode = crate::new(NodeConfig::test_config(), true, &["alice"]).unwrap();

        let result = testnode
            .node
            .wait_for_height(1, Duration::from_millis(200))
            .await;
        assert!(matches!(
            result,
            Err(NodeError::Timeout { height: 1, current: 0 })
        ));
    }

    #[tokio::test]
    async fn test_stop_and_restart() {
        let testnode = started(&["alice"]).await;
        assert!(matches!(
            testnode.node.start().await,
            Err(NodeError::AlreadyStarted)
        ));

        testnode.node.wait_for_height(2, WAIT).await.unwrap();
        testnode.node.stop().await.unwrap();
        assert!(!testnode.node.is_running());
        assert!(matches!(testnode.node.stop().await, Err(NodeError::NotRunning)));

        let paused_at: Height = testnode.node.height();
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(testnode.node.height(), paused_at);

        testnode.node.start().await.unwrap();
        let reached = testnode.node.wait_for_height(paused_at + 2, WAIT).await.unwrap();
        assert!(reached >= paused_at + 2);
        assert!(testnode.node.block(paused_at + 1).unwrap().is_some());
    }

    #[tokio::test]
    async fn test_metrics_follow_blocks() {
        let testnode = started(&["alice"]).await;
        testnode.node.wait_for_height(3, WAIT).await.unwrap();
        testnode.node.stop().await.unwrap();

        let metrics = testnode.node.metrics();
        assert_eq!(&metrics.chain_id, testnode.chain_id());
        assert_eq!(metrics.height, testnode.node.height());
        assert_eq!(metrics.blocks, testnode.node.height());
        assert_eq!(metrics.total_txs, 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_dropping_producing_node_removes_home() {
        let mut config = NodeConfig::test_config();
        config.consensus.timeout_commit_ms = 1;

        for _ in 0..50 {
            let testnode = crate::new(config.clone(), true, &["alice"]).unwrap();
            testnode.node.start().await.unwrap();
            tokio::time::sleep(Duration::from_millis(3)).await;

            let root = testnode.home_dir().to_path_buf();
            drop(testnode);
            assert!(!root.exists(), "home {} left behind", root.display());

            tokio::time::sleep(Duration::from_millis(20)).await;
            assert!(!root.exists(), "home {} recreated", root.display());
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_node_clone_is_halted_with_its_harness() {
        let testnode = started(&["alice"]).await;
        testnode.node.wait_for_height(1, WAIT).await.unwrap();

        let node = Arc::clone(&testnode.node);
        let root = testnode.home_dir().to_path_buf();
        drop(testnode);

        assert!(!root.exists());
        assert!(node.is_halted());
        assert!(!node.is_running());

        let halted_at = node.height();
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(node.height(), halted_at);
        assert!(matches!(node.start().await, Err(NodeError::Halted)));
    }

    // ===== TEST 2: TRANSACTIONS =====

    #[tokio::test]
    async fn test_transfer_through_context() {
        let testnode = started(&["alice", "bob"]).await;
        testnode.node.wait_for_height(1, WAIT).await.unwrap();

        let hash = transfer(&testnode, "alice", "bob", 1_000).unwrap();
        let record = wait_for_tx(&testnode, &hash).await;
        assert!(record.result.is_ok(), "transfer failed: {}", record.result.log);

        assert_eq!(balance(&testnode, "alice"), DEFAULT_TEST_BALANCE - 1_000);
        assert_eq!(balance(&testnode, "bob"), DEFAULT_TEST_BALANCE + 1_000);

        // the next transaction picks up the bumped sequence
        let hash = transfer(&testnode, "bob", "alice", 500).unwrap();
        let record = wait_for_tx(&testnode, &hash).await;
        assert!(record.result.is_ok(), "transfer failed: {}", record.result.log);
        assert_eq!(balance(&testnode, "alice"), DEFAULT_TEST_BALANCE - 500);

        let metrics = testnode.node.metrics();
        assert_eq!(metrics.total_txs, 2);
        assert_eq!(metrics.failed_txs, 0);
    }

    #[tokio::test]
    async fn test_overdraft_rejected_by_check_tx() {
        let testnode = started(&["alice", "bob"]).await;

        let result = transfer(&testnode, "alice", "bob", DEFAULT_TEST_BALANCE + 1);
        assert!(matches!(
            result,
            Err(ClientError::CheckTx { code: CODE_INSUFFICIENT_FUNDS, .. })
        ));
        assert_eq!(testnode.node.mempool_size(), 0);
    }

    #[tokio::test]
    async fn test_full_mempool_keeps_sender_sequence() {
        let mut config = NodeConfig::test_config();
        config.mempool.size = 1;
        let testnode = crate::new(config, true, &["alice", "bob"]).unwrap();

        transfer(&testnode, "alice", "bob", 10).unwrap();
        assert_eq!(testnode.node.mempool_size(), 1);

        let result = transfer(&testnode, "bob", "alice", 10);
        assert!(matches!(
            result,
            Err(ClientError::Node(NodeError::Mempool(MempoolError::Full(_))))
        ));

        // bob's sequence 0 is still unused by the pending check state
        let alice = testnode.context.keyring().key("alice").unwrap().account();
        let tx = testnode
            .context
            .sign_tx("bob", TransactionCall::Transfer { to: alice, amount: Coin::bond(10) }, "")
            .unwrap();
        assert_eq!(tx.transaction.sequence, 0);
        let bytes = testnode.context.tx_config().encode(&tx).unwrap();
        let check = testnode.app.lock().check_tx(&bytes);
        assert!(check.is_ok(), "check_tx failed: {}", check.log);
    }

    #[tokio::test]
    async fn test_validator_account_can_spend() {
        let testnode = started(&["alice"]).await;
        testnode.node.wait_for_height(1, WAIT).await.unwrap();

        let hash = transfer(&testnode, crate::keyring::VALIDATOR_ACCOUNT, "alice", 42).unwrap();
        let record = wait_for_tx(&testnode, &hash).await;
        assert!(record.result.is_ok(), "transfer failed: {}", record.result.log);
        assert_eq!(balance(&testnode, "alice"), DEFAULT_TEST_BALANCE + 42);
    }
}
