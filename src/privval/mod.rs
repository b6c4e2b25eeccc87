// Private validator and node identity key files

pub mod file_pv;
pub mod node_key;

pub use file_pv::{load_or_gen_file_pv, FilePV, LastSignState, SignStep};
pub use node_key::{load_or_gen_node_key, NodeKey};

use crate::config::NodeConfig;
use crate::types::{Height, PubKey};
use rand::rngs::OsRng;
use rand::RngCore;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::path::Path;

/// Loads or creates the node key and private validator of `config`
///
/// Returns the node id and the consensus public key.
pub fn initialize_node_validator_files(config: &NodeConfig) -> Result<(String, PubKey), KeyFileError> {
    let node_key = load_or_gen_node_key(&config.node_key_file())?;
    let pv = load_or_gen_file_pv(
        &config.priv_validator_key_file(),
        &config.priv_validator_state_file(),
    )?;
    Ok((node_key.id(), pv.pub_key()))
}

pub(crate) fn generate_secret() -> Result<[u8; 32], KeyFileError> {
    let mut secret = [0u8; 32];
    OsRng
        .try_fill_bytes(&mut secret)
        .map_err(|e| KeyFileError::Entropy(e.to_string()))?;
    Ok(secret)
}

pub(crate) fn decode_secret(value: &str) -> Result<[u8; 32], KeyFileError> {
    let mut secret = [0u8; 32];
    hex::decode_to_slice(value, &mut secret)
        .map_err(|e| KeyFileError::InvalidKey(format!("invalid secret: {}", e)))?;
    Ok(secret)
}

pub(crate) fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, KeyFileError> {
    let content = fs::read_to_string(path)
        .map_err(|e| KeyFileError::Io(format!("{}: {}", path.display(), e)))?;
    serde_json::from_str(&content)
        .map_err(|e| KeyFileError::Parse(format!("{}: {}", path.display(), e)))
}

/// Creates the directory holding `path`
pub(crate) fn create_parent_dir(path: &Path) -> Result<(), KeyFileError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| KeyFileError::Io(format!("{}: {}", parent.display(), e)))?;
    }
    Ok(())
}

/// Writes JSON readable by the owner only (0600 on Unix)
///
/// The parent directory must already exist.
pub(crate) fn write_private_json<T: Serialize>(path: &Path, value: &T) -> Result<(), KeyFileError> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| KeyFileError::Parse(e.to_string()))?;

    #[cfg(unix)]
    {
        use std::io::Write;
        use std::os::unix::fs::OpenOptionsExt;

        let mut file = fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(0o600)
            .open(path)
            .map_err(|e| KeyFileError::Io(format!("{}: {}", path.display(), e)))?;

        file.write_all(json.as_bytes())
            .map_err(|e| KeyFileError::Io(format!("{}: {}", path.display(), e)))?;
    }

    #[cfg(not(unix))]
    {
        fs::write(path, json).map_err(|e| KeyFileError::Io(format!("{}: {}", path.display(), e)))?;
    }

    Ok(())
}

/// Key file errors
#[derive(Debug, thiserror::Error)]
pub enum KeyFileError {
    #[error("Key file IO error: {0}")]
    Io(String),

    #[error("Key file parse error: {0}")]
    Parse(String),

    #[error("Invalid key: {0}")]
    InvalidKey(String),

    #[error("Entropy source failed: {0}")]
    Entropy(String),
}

/// Signing errors of the private validator
#[derive(Debug, thiserror::Error)]
pub enum PrivValError {
    #[error("Height regression: last signed {last}, requested {requested}")]
    HeightRegression { last: Height, requested: Height },

    #[error("Round regression at height {height}: last signed {last}, requested {requested}")]
    RoundRegression { height: Height, last: u32, requested: u32 },

    #[error("Step regression at height {height} round {round}")]
    StepRegression { height: Height, round: u32 },

    #[error("Conflicting data at height {height} round {round}")]
    ConflictingData { height: Height, round: u32 },

    #[error(transparent)]
    KeyFile(#[from] KeyFileError),
}
