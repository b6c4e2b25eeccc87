// Account - Key-derived account identifiers and genesis account records
use super::primitives::{Coin, Hash};
use ed25519_dalek::{Signature, Verifier, VerifyingKey};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// AccountId = Ed25519 public key (32 bytes)
/// Principle: no identity, just keys
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AccountId([u8; 32]);

impl AccountId {
    pub fn from_public_key(key: &VerifyingKey) -> Self {
        AccountId(key.to_bytes())
    }

    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        AccountId(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Verifies an Ed25519 signature made by this account
    pub fn verify(&self, message: &[u8], signature: &[u8; 64]) -> bool {
        let public_key = match VerifyingKey::from_bytes(&self.0) {
            Ok(pk) => pk,
            Err(_) => return false,
        };

        let sig = Signature::from_bytes(signature);

        public_key.verify(message, &sig).is_ok()
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "0x{}", hex::encode(&self.0[..8]))
    }
}

impl From<[u8; 32]> for AccountId {
    fn from(bytes: [u8; 32]) -> Self {
        AccountId(bytes)
    }
}

impl FromStr for AccountId {
    type Err = hex::FromHexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut bytes = [0u8; 32];
        hex::decode_to_slice(s.strip_prefix("0x").unwrap_or(s), &mut bytes)?;
        Ok(AccountId(bytes))
    }
}

// Hex on the wire so genesis files stay readable and usable as map keys
impl Serialize for AccountId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for AccountId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// 20-byte address used for node ids and consensus validator addresses
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Address([u8; 20]);

impl Address {
    /// Truncated Blake3 hash of a public key
    pub fn from_public_key(key: &VerifyingKey) -> Self {
        PubKey::from_verifying_key(key).address()
    }

    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl Serialize for Address {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        let mut bytes = [0u8; 20];
        hex::decode_to_slice(&s, &mut bytes).map_err(serde::de::Error::custom)?;
        Ok(Address(bytes))
    }
}

/// Consensus public key of a validator (Ed25519)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PubKey([u8; 32]);

impl PubKey {
    pub fn from_verifying_key(key: &VerifyingKey) -> Self {
        PubKey(key.to_bytes())
    }

    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        PubKey(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_verifying_key(&self) -> Result<VerifyingKey, ed25519_dalek::SignatureError> {
        VerifyingKey::from_bytes(&self.0)
    }

    /// Consensus address of this key
    pub fn address(&self) -> Address {
        let hash = Hash::hash(&self.0);
        let mut bytes = [0u8; 20];
        bytes.copy_from_slice(&hash.as_bytes()[..20]);
        Address(bytes)
    }

    /// Verifies an Ed25519 signature made with this key
    pub fn verify(&self, message: &[u8], signature: &[u8; 64]) -> bool {
        AccountId(self.0).verify(message, signature)
    }
}

impl fmt::Display for PubKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl Serialize for PubKey {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&hex::encode(self.0))
    }
}

impl<'de> Deserialize<'de> for PubKey {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        let mut bytes = [0u8; 32];
        hex::decode_to_slice(&s, &mut bytes).map_err(serde::de::Error::custom)?;
        Ok(PubKey(bytes))
    }
}

/// Auth module account record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaseAccount {
    pub address: AccountId,
    pub account_number: u64,
    pub sequence: u64,
}

impl BaseAccount {
    pub fn new(address: AccountId, account_number: u64, sequence: u64) -> Self {
        Self {
            address,
            account_number,
            sequence,
        }
    }
}

/// Bank module genesis balance entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenesisBalance {
    pub address: AccountId,
    pub coins: Vec<Coin>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use ed25519_dalek::{Signer, SigningKey};
    use rand::rngs::OsRng;

    #[test]
    fn test_account_id_verifies_own_signature() {
        let key = SigningKey::generate(&mut OsRng);
        let account = AccountId::from_public_key(&key.verifying_key());
        let sig = key.sign(b"payload").to_bytes();

        assert!(account.verify(b"payload", &sig));
        assert!(!account.verify(b"other", &sig));
    }

    #[test]
    fn test_account_id_json_is_hex() {
        let account = AccountId::from_bytes([7u8; 32]);
        let json = serde_json::to_string(&account).unwrap();
        assert_eq!(json, format!("\"{}\"", "07".repeat(32)));

        let back: AccountId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, account);
    }

    #[test]
    fn test_address_is_deterministic() {
        let key = SigningKey::from_bytes(&[3u8; 32]);
        let a = Address::from_public_key(&key.verifying_key());
        let b = Address::from_public_key(&key.verifying_key());
        assert_eq!(a, b);
        assert_eq!(a.to_hex().len(), 40);
    }
}
