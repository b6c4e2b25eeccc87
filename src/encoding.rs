// Encoding - Codecs, type registry and transaction encoding shared by app and clients

use crate::keyring::{Keyring, KeyringError};
use crate::types::{SignedTransaction, Transaction, TYPE_URL_CREATE_VALIDATOR, TYPE_URL_TRANSFER};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::BTreeSet;

/// Everything needed to encode, decode and sign chain data
#[derive(Debug, Clone)]
pub struct EncodingConfig {
    pub interface_registry: InterfaceRegistry,
    pub codec: JsonCodec,
    pub legacy: LegacyCodec,
    pub tx_config: TxConfig,
}

impl EncodingConfig {
    /// Configuration with every application message registered
    pub fn make() -> Self {
        let mut interface_registry = InterfaceRegistry::default();
        interface_registry.register(TYPE_URL_TRANSFER);
        interface_registry.register(TYPE_URL_CREATE_VALIDATOR);

        Self {
            interface_registry,
            codec: JsonCodec,
            legacy: LegacyCodec,
            tx_config: TxConfig::default(),
        }
    }
}

/// Known message type URLs
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InterfaceRegistry {
    type_urls: BTreeSet<String>,
}

impl InterfaceRegistry {
    pub fn register(&mut self, type_url: &str) {
        self.type_urls.insert(type_url.to_string());
    }

    pub fn is_registered(&self, type_url: &str) -> bool {
        self.type_urls.contains(type_url)
    }

    pub fn type_urls(&self) -> impl Iterator<Item = &str> {
        self.type_urls.iter().map(String::as_str)
    }
}

/// JSON codec for genesis, queries and files
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl JsonCodec {
    pub fn marshal_json<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, CodecError> {
        serde_json::to_vec(value).map_err(|e| CodecError::Encode(e.to_string()))
    }

    pub fn marshal_json_indent<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, CodecError> {
        serde_json::to_vec_pretty(value).map_err(|e| CodecError::Encode(e.to_string()))
    }

    pub fn unmarshal_json<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T, CodecError> {
        serde_json::from_slice(bytes).map_err(|e| CodecError::Decode(e.to_string()))
    }
}

/// Compact binary codec (bincode)
#[derive(Debug, Clone, Copy, Default)]
pub struct LegacyCodec;

impl LegacyCodec {
    pub fn marshal<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, CodecError> {
        bincode::serialize(value).map_err(|e| CodecError::Encode(e.to_string()))
    }

    pub fn unmarshal<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T, CodecError> {
        bincode::deserialize(bytes).map_err(|e| CodecError::Decode(e.to_string()))
    }
}

/// How transactions are signed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SignMode {
    /// Ed25519 over the domain-separated binary body
    #[default]
    Direct,
}

/// Transaction wire encoding and signing
#[derive(Debug, Clone, Default)]
pub struct TxConfig {
    sign_mode: SignMode,
}

impl TxConfig {
    pub fn sign_mode(&self) -> SignMode {
        self.sign_mode
    }

    pub fn encode(&self, tx: &SignedTransaction) -> Result<Vec<u8>, CodecError> {
        LegacyCodec.marshal(tx)
    }

    pub fn decode(&self, bytes: &[u8]) -> Result<SignedTransaction, CodecError> {
        LegacyCodec.unmarshal(bytes)
    }

    /// Signs `tx` with the keyring entry `name`, which must own the sender
    pub fn sign(
        &self,
        keyring: &Keyring,
        name: &str,
        tx: Transaction,
    ) -> Result<SignedTransaction, SignError> {
        let record = keyring.key(name)?;
        if record.account() != tx.sender {
            return Err(SignError::SenderMismatch(name.to_string()));
        }
        let message = SignedTransaction::signing_message(&tx)
            .ok_or_else(|| SignError::Codec(CodecError::Encode("transaction body".to_string())))?;
        Ok(SignedTransaction::new(tx, record.sign(&message)))
    }
}

/// Codec errors
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("Encoding failed: {0}")]
    Encode(String),

    #[error("Decoding failed: {0}")]
    Decode(String),
}

/// Transaction signing errors
#[derive(Debug, thiserror::Error)]
pub enum SignError {
    #[error(transparent)]
    Keyring(#[from] KeyringError),

    #[error("Key '{0}' does not own the transaction sender")]
    SenderMismatch(String),

    #[error(transparent)]
    Codec(#[from] CodecError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AccountId, ChainId, Coin, TransactionCall};

    #[test]
    fn test_registry_knows_app_messages() {
        let config = EncodingConfig::make();
        assert!(config.interface_registry.is_registered(TYPE_URL_TRANSFER));
        assert!(config.interface_registry.is_registered(TYPE_URL_CREATE_VALIDATOR));
        assert!(!config.interface_registry.is_registered("/unknown.Msg"));
    }

    #[test]
    fn test_sign_encode_decode() {
        let config = EncodingConfig::make();
        let mut keyring = Keyring::new_in_memory();
        let sender = keyring.new_account("alice").unwrap().account();

        let tx = Transaction {
            chain_id: ChainId::new("chain"),
            sender,
            account_number: 0,
            sequence: 0,
            call: TransactionCall::Transfer {
                to: AccountId::from_bytes([1u8; 32]),
                amount: Coin::bond(1),
            },
            memo: String::new(),
        };
        let signed = config.tx_config.sign(&keyring, "alice", tx).unwrap();
        let bytes = config.tx_config.encode(&signed).unwrap();
        let decoded = config.tx_config.decode(&bytes).unwrap();

        assert_eq!(decoded, signed);
        assert!(decoded.verify());
    }

    #[test]
    fn test_sign_rejects_foreign_sender() {
        let config = EncodingConfig::make();
        let mut keyring = Keyring::new_in_memory();
        keyring.new_account("alice").unwrap();

        let tx = Transaction {
            chain_id: ChainId::new("chain"),
            sender: AccountId::from_bytes([9u8; 32]),
            account_number: 0,
            sequence: 0,
            call: TransactionCall::Transfer {
                to: AccountId::from_bytes([1u8; 32]),
                amount: Coin::bond(1),
            },
            memo: String::new(),
        };
        assert!(matches!(
            config.tx_config.sign(&keyring, "alice", tx),
            Err(SignError::SenderMismatch(_))
        ));
        assert!(config.tx_config.decode(b"garbage").is_err());
    }
}
