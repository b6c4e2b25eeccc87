// Client context - Everything a test needs to build, sign and submit transactions
// - Keyring, chain id and encoding configuration
// - Account number/sequence lookup
// - Optional connection to a running node

pub mod account;

pub use account::{AccountRetriever, AuthAccountRetriever};

use crate::abci::{RequestQuery, ResponseQuery};
use crate::app::QUERY_BALANCES;
use crate::encoding::{CodecError, InterfaceRegistry, JsonCodec, LegacyCodec, SignError, TxConfig};
use crate::keyring::{Keyring, KeyringError};
use crate::node::{BroadcastResult, Node, NodeError};
use crate::types::{AccountId, ChainId, Coin, Height, SignedTransaction, Transaction, TransactionCall};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// Connection to a node
pub trait NodeClient: Send + Sync {
    fn query(&self, request: RequestQuery) -> Result<ResponseQuery, ClientError>;

    fn broadcast_tx(&self, tx: Vec<u8>) -> Result<BroadcastResult, ClientError>;
}

impl NodeClient for Node {
    fn query(&self, request: RequestQuery) -> Result<ResponseQuery, ClientError> {
        Ok(Node::query(self, request))
    }

    fn broadcast_tx(&self, tx: Vec<u8>) -> Result<BroadcastResult, ClientError> {
        Ok(Node::broadcast_tx(self, tx)?)
    }
}

/// Client-facing handle, built once and then only read
#[derive(Clone, Default)]
pub struct ClientContext {
    keyring: Keyring,
    home_dir: PathBuf,
    chain_id: ChainId,
    interface_registry: InterfaceRegistry,
    codec: JsonCodec,
    legacy_codec: LegacyCodec,
    tx_config: TxConfig,
    account_retriever: Option<Arc<dyn AccountRetriever>>,
    client: Option<Arc<dyn NodeClient>>,
}

impl ClientContext {
    pub fn with_keyring(mut self, keyring: Keyring) -> Self {
        self.keyring = keyring;
        self
    }

    pub fn with_home_dir(mut self, home_dir: impl Into<PathBuf>) -> Self {
        self.home_dir = home_dir.into();
        self
    }

    pub fn with_chain_id(mut self, chain_id: ChainId) -> Self {
        self.chain_id = chain_id;
        self
    }

    pub fn with_interface_registry(mut self, registry: InterfaceRegistry) -> Self {
        self.interface_registry = registry;
        self
    }

    pub fn with_codec(mut self, codec: JsonCodec) -> Self {
        self.codec = codec;
        self
    }

    pub fn with_legacy_codec(mut self, codec: LegacyCodec) -> Self {
        self.legacy_codec = codec;
        self
    }

    pub fn with_tx_config(mut self, tx_config: TxConfig) -> Self {
        self.tx_config = tx_config;
        self
    }

    pub fn with_account_retriever(mut self, retriever: Arc<dyn AccountRetriever>) -> Self {
        self.account_retriever = Some(retriever);
        self
    }

    pub fn with_client(mut self, client: Arc<dyn NodeClient>) -> Self {
        self.client = Some(client);
        self
    }

    pub fn keyring(&self) -> &Keyring {
        &self.keyring
    }

    pub fn home_dir(&self) -> &Path {
        &self.home_dir
    }

    pub fn chain_id(&self) -> &ChainId {
        &self.chain_id
    }

    pub fn interface_registry(&self) -> &InterfaceRegistry {
        &self.interface_registry
    }

    pub fn codec(&self) -> &JsonCodec {
        &self.codec
    }

    pub fn legacy_codec(&self) -> &LegacyCodec {
        &self.legacy_codec
    }

    pub fn tx_config(&self) -> &TxConfig {
        &self.tx_config
    }

    pub fn account_retriever(&self) -> Option<&Arc<dyn AccountRetriever>> {
        self.account_retriever.as_ref()
    }

    pub fn client(&self) -> Result<&Arc<dyn NodeClient>, ClientError> {
        self.client.as_ref().ok_or(ClientError::NoClient)
    }

    /// Runs a query, failing on a non-zero result code
    pub fn query(&self, path: &str, data: Vec<u8>, height: Height) -> Result<ResponseQuery, ClientError> {
        let response = self.client()?.query(RequestQuery {
            path: path.to_string(),
            data,
            height,
        })?;
        if !response.is_ok() {
            return Err(ClientError::Query {
                code: response.code,
                log: response.log,
            });
        }
        Ok(response)
    }

    /// Signs `call` from the keyring entry `from` with its current sequence
    pub fn sign_tx(&self, from: &str, call: TransactionCall, memo: &str) -> Result<SignedTransaction, ClientError> {
        let sender = self.keyring.key(from)?.account();
        let retriever = self
            .account_retriever
            .as_ref()
            .ok_or(ClientError::NoAccountRetriever)?;
        let (account_number, sequence) = retriever.get_account_number_sequence(self, &sender)?;

        let tx = Transaction {
            chain_id: self.chain_id.clone(),
            sender,
            account_number,
            sequence,
            call,
            memo: memo.to_string(),
        };
        Ok(self.tx_config.sign(&self.keyring, from, tx)?)
    }

    /// Submits a signed transaction, failing when the node refuses it
    pub fn broadcast_tx(&self, tx: &SignedTransaction) -> Result<BroadcastResult, ClientError> {
        let bytes = self.tx_config.encode(tx)?;
        let result = self.client()?.broadcast_tx(bytes)?;
        if !result.check.is_ok() {
            return Err(ClientError::CheckTx {
                code: result.check.code,
                log: result.check.log,
            });
        }
        debug!("Broadcast tx {}", result.hash);
        Ok(result)
    }

    /// Latest committed balances of `address`
    pub fn query_balances(&self, address: &AccountId) -> Result<Vec<Coin>, ClientError> {
        let response = self.query(QUERY_BALANCES, address.as_bytes().to_vec(), 0)?;
        Ok(self.codec.unmarshal_json(&response.value)?)
    }
}

impl fmt::Debug for ClientContext {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("ClientContext")
            .field("home_dir", &self.home_dir)
            .field("chain_id", &self.chain_id)
            .field("keys", &self.keyring.len())
            .field("has_account_retriever", &self.account_retriever.is_some())
            .field("has_client", &self.client.is_some())
            .finish()
    }
}

/// Client errors
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("No node client attached to the context")]
    NoClient,

    #[error("No account retriever attached to the context")]
    NoAccountRetriever,

    #[error("Query failed with code {code}: {log}")]
    Query { code: u32, log: String },

    #[error("Transaction rejected with code {code}: {log}")]
    CheckTx { code: u32, log: String },

    #[error(transparent)]
    Keyring(#[from] KeyringError),

    #[error(transparent)]
    Sign(#[from] SignError),

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error(transparent)]
    Node(#[from] NodeError),
}
