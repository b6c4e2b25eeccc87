// Bootstrap Tests - What `testnode::new` leaves behind before the node starts
// Filesystem layout, keyring/genesis agreement, context wiring and stage errors

#[cfg(test)]
mod bootstrap_tests {
    use crate::app::QUERY_VALIDATORS;
    use crate::config::NodeConfig;
    use crate::error::{NodeAssemblyError, TestnodeError};
    use crate::fs::HOME_PREFIX;
    use crate::genesis::{GenesisDoc, DEFAULT_SELF_DELEGATION, MIN_TIME_IOTA_MS};
    use crate::keyring::{KeyringError, VALIDATOR_ACCOUNT};
    use crate::node::NodeError;
    use crate::types::{AccountId, Coin, TransactionCall, DEFAULT_TEST_BALANCE};
    use crate::TestNode;
    use std::collections::BTreeSet;

    // ===== HELPER FUNCTIONS =====

    fn bootstrap(accounts: &[&str]) -> TestNode {
        crate::new(NodeConfig::test_config(), true, accounts).expect("bootstrap should succeed")
    }

    fn genesis_of(testnode: &TestNode) -> GenesisDoc {
        GenesisDoc::from_file(&testnode.node.config().genesis_file()).unwrap()
    }

    fn funded_accounts(genesis: &GenesisDoc) -> BTreeSet<AccountId> {
        genesis.app_state.bank.balances.iter().map(|b| b.address).collect()
    }

    fn keyring_accounts(testnode: &TestNode) -> BTreeSet<AccountId> {
        testnode
            .context
            .keyring()
            .list()
            .map(|record| record.account())
            .collect()
    }

    // ===== TEST 1: FILESYSTEM =====

    #[test]
    fn test_home_layout() {
        let testnode = bootstrap(&["alice"]);
        let config = testnode.node.config();

        assert_eq!(config.root_dir, testnode.home_dir());
        assert_eq!(testnode.context.home_dir(), testnode.home_dir());
        assert!(testnode
            .home_dir()
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with(HOME_PREFIX));

        assert!(config.config_file().is_file());
        assert!(config.genesis_file().is_file());
        assert!(config.node_key_file().is_file());
        assert!(config.priv_validator_key_file().is_file());
        assert!(config.priv_validator_state_file().is_file());
        assert_eq!(std::fs::read_dir(config.gentx_dir()).unwrap().count(), 1);
    }

    #[test]
    fn test_home_removed_on_drop() {
        let testnode = bootstrap(&["alice"]);
        let root = testnode.home_dir().to_path_buf();
        assert!(root.exists());

        drop(testnode);
        assert!(!root.exists());
    }

    #[test]
    fn test_bootstraps_are_isolated() {
        let first = bootstrap(&["alice"]);
        let second = bootstrap(&["alice"]);

        assert_ne!(first.home_dir(), second.home_dir());
        assert_ne!(first.chain_id(), second.chain_id());
        assert_ne!(
            first.context.keyring().key("alice").unwrap().account(),
            second.context.keyring().key("alice").unwrap().account()
        );
    }

    #[test]
    fn test_preset_root_is_parent() {
        let parent = tempfile::tempdir().unwrap();
        let mut config = NodeConfig::test_config();
        config.set_root(parent.path());

        let testnode = crate::new(config, true, &["alice"]).unwrap();
        assert_eq!(testnode.home_dir().parent().unwrap(), parent.path());
    }

    // ===== TEST 2: KEYS AND GENESIS =====

    #[test]
    fn test_keyring_matches_funded_accounts() {
        let testnode = bootstrap(&["alice", "bob", "alice", "carol"]);
        let names: BTreeSet<&str> = testnode.context.keyring().names().collect();

        assert_eq!(
            names,
            BTreeSet::from(["alice", "bob", "carol", VALIDATOR_ACCOUNT])
        );

        let genesis = genesis_of(&testnode);
        assert_eq!(genesis.app_state.bank.balances.len(), 4);
        assert_eq!(genesis.app_state.auth.accounts.len(), 4);
        assert_eq!(funded_accounts(&genesis), keyring_accounts(&testnode));

        for balance in &genesis.app_state.bank.balances {
            assert_eq!(balance.coins, vec![Coin::bond(DEFAULT_TEST_BALANCE)]);
        }
        assert_eq!(
            genesis.app_state.bank.supply,
            vec![Coin::bond(DEFAULT_TEST_BALANCE * 4)]
        );
    }

    #[test]
    fn test_no_accounts_funds_only_validator() {
        let testnode = bootstrap(&[]);
        let genesis = genesis_of(&testnode);

        assert_eq!(testnode.context.keyring().len(), 1);
        assert!(testnode.context.keyring().contains(VALIDATOR_ACCOUNT));
        assert_eq!(genesis.app_state.bank.balances.len(), 1);
        assert_eq!(funded_accounts(&genesis), keyring_accounts(&testnode));
    }

    #[test]
    fn test_genesis_parameters() {
        let testnode = bootstrap(&["alice"]);
        let genesis = genesis_of(&testnode);

        assert_eq!(genesis.chain_id, *testnode.chain_id());
        assert_eq!(genesis.chain_id.as_str().len(), 6);
        assert_eq!(genesis.consensus_params.block.time_iota_ms, MIN_TIME_IOTA_MS);
        assert_eq!(genesis.initial_height, 1);
        assert_eq!(testnode.node.genesis_doc(), &genesis);
    }

    #[test]
    fn test_genesis_registers_node_validator() {
        let testnode = bootstrap(&["alice"]);
        let genesis = genesis_of(&testnode);
        let validator = testnode.context.keyring().key(VALIDATOR_ACCOUNT).unwrap().account();

        assert_eq!(genesis.app_state.genutil.gen_txs.len(), 1);
        let gentx = &genesis.app_state.genutil.gen_txs[0];
        assert!(gentx.verify());
        assert_eq!(gentx.transaction.sender, validator);
        assert_eq!(gentx.transaction.memo, testnode.node.node_id());
        match &gentx.transaction.call {
            TransactionCall::CreateValidator { node_id, self_delegation, .. } => {
                assert_eq!(node_id, &testnode.node.node_id());
                assert_eq!(self_delegation, &Coin::bond(DEFAULT_SELF_DELEGATION));
            }
            other => panic!("unexpected genesis transaction {:?}", other),
        }
    }

    // ===== TEST 3: CONTEXT =====

    #[test]
    fn test_context_wiring() {
        let testnode = bootstrap(&["alice"]);
        let ctx = &testnode.context;

        assert_eq!(ctx.chain_id(), testnode.node.chain_id());
        assert!(ctx.account_retriever().is_some());
        assert!(ctx.client().is_ok());
        assert!(ctx
            .interface_registry()
            .is_registered(crate::types::TYPE_URL_TRANSFER));
        assert!(ctx
            .interface_registry()
            .is_registered(crate::types::TYPE_URL_CREATE_VALIDATOR));
    }

    #[test]
    fn test_context_reads_genesis_state() {
        let testnode = bootstrap(&["alice"]);
        let alice = testnode.context.keyring().key("alice").unwrap().account();

        assert_eq!(
            testnode.context.query_balances(&alice).unwrap(),
            vec![Coin::bond(DEFAULT_TEST_BALANCE)]
        );

        let response = testnode.context.query(QUERY_VALIDATORS, Vec::new(), 0).unwrap();
        let validators: serde_json::Value = serde_json::from_slice(&response.value).unwrap();
        assert_eq!(validators.as_array().map(Vec::len), Some(1));
    }

    // ===== TEST 4: STAGE ERRORS =====

    #[test]
    fn test_unwritable_root_is_initialization_error() {
        let parent = tempfile::tempdir().unwrap();
        let file = parent.path().join("occupied");
        std::fs::write(&file, b"not a directory").unwrap();

        let mut config = NodeConfig::test_config();
        config.set_root(&file);

        let result = crate::new(config, true, &["alice"]);
        assert!(matches!(result, Err(TestnodeError::Initialization(_))));
    }

    #[test]
    fn test_empty_account_name_is_key_generation_error() {
        let result = crate::new(NodeConfig::test_config(), true, &["alice", ""]);
        assert!(matches!(
            result,
            Err(TestnodeError::KeyGeneration(KeyringError::InvalidName))
        ));
    }

    #[test]
    fn test_error_variants_name_their_stage() {
        let err = TestnodeError::from(NodeError::NotRunning);
        assert!(matches!(
            err,
            TestnodeError::NodeAssembly(NodeAssemblyError::Node(NodeError::NotRunning))
        ));
        assert!(err.to_string().starts_with("Node assembly failed"));

        let err = TestnodeError::from(KeyringError::InvalidName);
        assert!(err.to_string().starts_with("Key generation failed"));
    }
}
