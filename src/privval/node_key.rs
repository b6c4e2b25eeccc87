// Node key - Network identity of the node
use super::{create_parent_dir, generate_secret, read_json, write_private_json, KeyFileError};
use crate::types::{Address, PubKey};
use ed25519_dalek::SigningKey;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

/// Network identity key
pub struct NodeKey {
    priv_key: SigningKey,
}

#[derive(Serialize, Deserialize)]
struct NodeKeyFile {
    priv_key: TypedKey,
}

#[derive(Serialize, Deserialize)]
pub(crate) struct TypedKey {
    #[serde(rename = "type")]
    pub key_type: String,
    pub value: String,
}

pub(crate) const ED25519: &str = "ed25519";

impl NodeKey {
    pub fn generate() -> Result<Self, KeyFileError> {
        Ok(Self {
            priv_key: SigningKey::from_bytes(&generate_secret()?),
        })
    }

    /// Node id: hex encoded address of the public key
    pub fn id(&self) -> String {
        Address::from_public_key(&self.priv_key.verifying_key()).to_hex()
    }

    pub fn pub_key(&self) -> PubKey {
        PubKey::from_verifying_key(&self.priv_key.verifying_key())
    }

    pub fn load(path: &Path) -> Result<Self, KeyFileError> {
        let file: NodeKeyFile = read_json(path)?;
        if file.priv_key.key_type != ED25519 {
            return Err(KeyFileError::InvalidKey(format!(
                "unsupported key type '{}'",
                file.priv_key.key_type
            )));
        }
        Ok(Self {
            priv_key: SigningKey::from_bytes(&super::decode_secret(&file.priv_key.value)?),
        })
    }

    pub fn save_as(&self, path: &Path) -> Result<(), KeyFileError> {
        let file = NodeKeyFile {
            priv_key: TypedKey {
                key_type: ED25519.to_string(),
                value: hex::encode(self.priv_key.to_bytes()),
            },
        };
        create_parent_dir(path)?;
        write_private_json(path, &file)
    }
}

/// Loads the node key at `path`, generating and persisting one if absent
pub fn load_or_gen_node_key(path: &Path) -> Result<NodeKey, KeyFileError> {
    if path.exists() {
        return NodeKey::load(path);
    }

    let key = NodeKey::generate()?;
    key.save_as(path)?;
    info!("Generated node key {} at {}", key.id(), path.display());
    Ok(key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_load_or_gen_is_idempotent() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config").join("node_key.json");

        let first = load_or_gen_node_key(&path).unwrap();
        assert!(path.exists());
        let second = load_or_gen_node_key(&path).unwrap();

        assert_eq!(first.id(), second.id());
        assert_eq!(first.pub_key(), second.pub_key());
        assert_eq!(first.id().len(), 40);
    }

    #[test]
    fn test_rejects_unknown_key_type() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("node_key.json");
        std::fs::write(
            &path,
            r#"{"priv_key":{"type":"secp256k1","value":"00"}}"#,
        )
        .unwrap();

        assert!(matches!(NodeKey::load(&path), Err(KeyFileError::InvalidKey(_))));
    }
}
