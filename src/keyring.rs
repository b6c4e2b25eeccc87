// Keyring - Test-scoped in-memory credential store
// - Key generation from OS entropy
// - Named lookup and signing
// - Genesis account provisioning

use crate::types::{AccountId, BaseAccount, Coin, GenesisBalance, PubKey, DEFAULT_TEST_BALANCE};
use ed25519_dalek::{Signer, SigningKey, VerifyingKey};
use rand::rngs::OsRng;
use rand::RngCore;
use std::collections::BTreeMap;
use std::fmt;
use tracing::debug;

/// Name under which the validator's own account is stored
pub const VALIDATOR_ACCOUNT: &str = "validator";

/// One named key pair
#[derive(Clone)]
pub struct KeyRecord {
    name: String,
    signing_key: SigningKey,
}

impl KeyRecord {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn verifying_key(&self) -> VerifyingKey {
        self.signing_key.verifying_key()
    }

    /// Account address derived from the public key
    pub fn account(&self) -> AccountId {
        AccountId::from_public_key(&self.verifying_key())
    }

    pub fn pub_key(&self) -> PubKey {
        PubKey::from_verifying_key(&self.verifying_key())
    }

    pub fn sign(&self, message: &[u8]) -> [u8; 64] {
        self.signing_key.sign(message).to_bytes()
    }
}

impl fmt::Debug for KeyRecord {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("KeyRecord")
            .field("name", &self.name)
            .field("account", &self.account())
            .finish()
    }
}

/// In-memory keyring, dropped with the test that created it
#[derive(Clone, Default)]
pub struct Keyring {
    records: BTreeMap<String, KeyRecord>,
}

impl Keyring {
    pub fn new_in_memory() -> Self {
        Self::default()
    }

    /// Generates a new key under `name`
    pub fn new_account(&mut self, name: &str) -> Result<&KeyRecord, KeyringError> {
        if name.is_empty() {
            return Err(KeyringError::InvalidName);
        }
        if self.records.contains_key(name) {
            return Err(KeyringError::AlreadyExists(name.to_string()));
        }

        let mut secret = [0u8; 32];
        OsRng
            .try_fill_bytes(&mut secret)
            .map_err(|e| KeyringError::Entropy(e.to_string()))?;

        let record = KeyRecord {
            name: name.to_string(),
            signing_key: SigningKey::from_bytes(&secret),
        };
        debug!("Generated key '{}' -> {}", name, record.account());

        Ok(self.records.entry(name.to_string()).or_insert(record))
    }

    pub fn key(&self, name: &str) -> Result<&KeyRecord, KeyringError> {
        self.records
            .get(name)
            .ok_or_else(|| KeyringError::NotFound(name.to_string()))
    }

    pub fn key_by_account(&self, account: &AccountId) -> Option<&KeyRecord> {
        self.records.values().find(|r| r.account() == *account)
    }

    /// Signs with the key stored under `name`
    pub fn sign(&self, name: &str, message: &[u8]) -> Result<([u8; 64], AccountId), KeyringError> {
        let record = self.key(name)?;
        Ok((record.sign(message), record.account()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.records.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.records.keys().map(String::as_str)
    }

    pub fn list(&self) -> impl Iterator<Item = &KeyRecord> {
        self.records.values()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl fmt::Debug for Keyring {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_list().entries(self.records.values()).finish()
    }
}

/// Creates one funded key per unique name
///
/// Returns the keyring together with the genesis balances and auth accounts,
/// both in the order names were first seen. Account numbers follow that order.
pub fn fund_keyring_accounts<S: AsRef<str>>(
    names: &[S],
) -> Result<(Keyring, Vec<GenesisBalance>, Vec<BaseAccount>), KeyringError> {
    let mut keyring = Keyring::new_in_memory();
    let mut balances = Vec::with_capacity(names.len());
    let mut accounts = Vec::with_capacity(names.len());

    for name in names {
        let name = name.as_ref();
        if keyring.contains(name) {
            continue;
        }

        let account = keyring.new_account(name)?.account();
        balances.push(GenesisBalance {
            address: account,
            coins: vec![Coin::bond(DEFAULT_TEST_BALANCE)],
        });
        accounts.push(BaseAccount::new(account, accounts.len() as u64, 0));
    }

    Ok((keyring, balances, accounts))
}

/// Keyring errors
#[derive(Debug, thiserror::Error)]
pub enum KeyringError {
    #[error("Key not found: {0}")]
    NotFound(String),

    #[error("Key already exists: {0}")]
    AlreadyExists(String),

    #[error("Key name must not be empty")]
    InvalidName,

    #[error("Entropy source failed: {0}")]
    Entropy(String),
}
