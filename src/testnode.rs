// Test node - One-call bootstrap of an ephemeral single-validator chain
//
// Stages, each aborting the rest on failure:
// - Filesystem layout in a disposable home directory
// - Funded keyring accounts plus the validator account
// - Genesis with the validator's registration transaction
// - Application and consensus node wired in process
// - Client context over the same keyring and chain id

use crate::abci::{LocalClientCreator, SharedApplication};
use crate::app::new_app_server;
use crate::client::{AuthAccountRetriever, ClientContext};
use crate::config::{AppOptions, NodeConfig};
use crate::encoding::EncodingConfig;
use crate::error::TestnodeError;
use crate::fs::{init_file_structure, HarnessDir};
use crate::genesis::{collect_gen_files, create_validator, default_genesis, init_gen_files};
use crate::keyring::{fund_keyring_accounts, VALIDATOR_ACCOUNT};
use crate::node::{default_db_provider, default_genesis_doc_provider, default_metrics_provider, Node};
use crate::privval::{initialize_node_validator_files, load_or_gen_file_pv, load_or_gen_node_key};
use crate::storage::MemDb;
use crate::types::ChainId;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, Dispatch};
use tracing_subscriber::EnvFilter;

/// Log level used when `RUST_LOG` is unset
pub const DEFAULT_LOG_FILTER: &str = "error";

/// A bootstrapped node with everything a test needs to drive it
///
/// Dropping it stops block production and deletes the home directory.
pub struct TestNode {
    pub node: Arc<Node>,
    pub app: SharedApplication,
    pub context: ClientContext,
    home: HarnessDir,
}

impl Drop for TestNode {
    // the node may outlive this struct through clones of `node`, so block
    // production is halted here, before the home directory is removed
    fn drop(&mut self) {
        self.node.halt();
    }
}

impl TestNode {
    pub fn home_dir(&self) -> &Path {
        self.home.path()
    }

    pub fn chain_id(&self) -> &ChainId {
        self.context.chain_id()
    }
}

/// Log sink of the bootstrap and of the node
///
/// Suppressed logs go nowhere; otherwise errors (or `RUST_LOG`) go to stdout.
pub fn log_dispatch(suppress_log: bool) -> Dispatch {
    if suppress_log {
        return Dispatch::none();
    }

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .with_writer(std::io::stdout)
        .finish();
    Dispatch::new(subscriber)
}

/// Bootstraps a consensus-ready node
///
/// Every name in `funded_accounts` gets a key and a genesis balance, as does
/// the `validator` account that registers the node's consensus key. The
/// returned node is assembled but not started; call `node.start()` from a
/// tokio runtime to produce blocks.
pub fn new<S: AsRef<str>>(
    config: NodeConfig,
    suppress_log: bool,
    funded_accounts: &[S],
) -> Result<TestNode, TestnodeError> {
    let dispatch = log_dispatch(suppress_log);
    tracing::dispatcher::with_default(&dispatch, || bootstrap(config, funded_accounts, dispatch.clone()))
}

fn bootstrap<S: AsRef<str>>(
    mut config: NodeConfig,
    funded_accounts: &[S],
    dispatch: Dispatch,
) -> Result<TestNode, TestnodeError> {
    let home = init_file_structure(&mut config)?;

    let chain_id = ChainId::random();
    let encoding = EncodingConfig::make();
    let genesis_state = default_genesis();

    let mut names: Vec<&str> = funded_accounts.iter().map(AsRef::as_ref).collect();
    names.push(VALIDATOR_ACCOUNT);
    let (keyring, balances, accounts) = fund_keyring_accounts(&names)?;

    let node_key = load_or_gen_node_key(&config.node_key_file())?;
    let (node_id, pub_key) = initialize_node_validator_files(&config)?;

    create_validator(
        &keyring,
        &encoding,
        pub_key,
        VALIDATOR_ACCOUNT,
        &node_id,
        &chain_id,
        &config,
    )?;
    init_gen_files(genesis_state, accounts, balances, &config.genesis_file(), &chain_id)?;
    collect_gen_files(&config, &encoding, pub_key, &node_id, &chain_id)?;

    let app = new_app_server(MemDb::new(), None, AppOptions::testnode());
    let priv_validator = load_or_gen_file_pv(
        &config.priv_validator_key_file(),
        &config.priv_validator_state_file(),
    )?;

    let node = Node::new(
        config.clone(),
        priv_validator,
        node_key,
        LocalClientCreator::new(Arc::clone(&app)),
        default_genesis_doc_provider,
        default_db_provider,
        default_metrics_provider,
        dispatch,
    )?;
    let node = Arc::new(node);

    let context = ClientContext::default()
        .with_keyring(keyring)
        .with_home_dir(&config.root_dir)
        .with_chain_id(chain_id)
        .with_interface_registry(encoding.interface_registry)
        .with_codec(encoding.codec)
        .with_legacy_codec(encoding.legacy)
        .with_tx_config(encoding.tx_config)
        .with_account_retriever(Arc::new(AuthAccountRetriever))
        .with_client(node.clone());

    info!(
        "Test node {} ready on chain {} at {}",
        node_id,
        context.chain_id(),
        home.path().display()
    );

    Ok(TestNode {
        node,
        app,
        context,
        home,
    })
}
