// Genesis document - Canonical starting point of the chain
use super::state::GenesisState;
use super::GenesisError;
use crate::types::{Address, ChainId, Hash, Height, PubKey};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Smallest accepted block time increment (milliseconds)
pub const MIN_TIME_IOTA_MS: u64 = 1;

/// Genesis document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenesisDoc {
    pub genesis_time: DateTime<Utc>,

    pub chain_id: ChainId,

    /// Height of the first block
    pub initial_height: Height,

    pub consensus_params: ConsensusParams,

    /// Validators known before the application's init chain
    #[serde(default)]
    pub validators: Vec<GenesisValidator>,

    pub app_hash: Hash,

    /// Module states
    pub app_state: GenesisState,
}

/// Validator listed in the genesis document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenesisValidator {
    pub address: Address,
    pub pub_key: PubKey,
    pub power: u64,
    pub name: String,
}

/// Consensus parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ConsensusParams {
    pub block: BlockParams,
    pub evidence: EvidenceParams,
    pub validator: ValidatorParams,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockParams {
    /// Maximum block size in bytes
    pub max_bytes: u64,

    /// Maximum gas per block, -1 for unlimited
    pub max_gas: i64,

    /// Minimum time between consecutive block times (milliseconds)
    pub time_iota_ms: u64,
}

impl Default for BlockParams {
    fn default() -> Self {
        Self {
            max_bytes: 22_020_096,
            max_gas: -1,
            time_iota_ms: 1000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvidenceParams {
    pub max_age_num_blocks: u64,
    pub max_age_duration_ms: u64,
}

impl Default for EvidenceParams {
    fn default() -> Self {
        Self {
            max_age_num_blocks: 100_000,
            max_age_duration_ms: 48 * 60 * 60 * 1000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatorParams {
    pub pub_key_types: Vec<String>,
}

impl Default for ValidatorParams {
    fn default() -> Self {
        Self {
            pub_key_types: vec!["ed25519".to_string()],
        }
    }
}

impl GenesisDoc {
    /// Fresh document starting now at height 1
    pub fn new(chain_id: ChainId, app_state: GenesisState) -> Self {
        Self {
            genesis_time: Utc::now(),
            chain_id,
            initial_height: 1,
            consensus_params: ConsensusParams::default(),
            validators: Vec::new(),
            app_hash: Hash::ZERO,
            app_state,
        }
    }

    /// Basic sanity checks
    pub fn validate(&self) -> Result<(), GenesisError> {
        if self.chain_id.is_empty() {
            return Err(GenesisError::Invalid("chain id is empty".to_string()));
        }
        if self.initial_height == 0 {
            return Err(GenesisError::Invalid("initial height must be at least 1".to_string()));
        }

        let block = &self.consensus_params.block;
        if block.max_bytes == 0 {
            return Err(GenesisError::Invalid("block.max_bytes must be positive".to_string()));
        }
        if block.time_iota_ms < MIN_TIME_IOTA_MS {
            return Err(GenesisError::Invalid(format!(
                "block.time_iota_ms must be at least {}",
                MIN_TIME_IOTA_MS
            )));
        }

        for validator in &self.validators {
            if validator.power == 0 {
                return Err(GenesisError::Invalid(format!(
                    "validator {} has zero power",
                    validator.address
                )));
            }
            if validator.pub_key.address() != validator.address {
                return Err(GenesisError::Invalid(format!(
                    "validator {} address does not match its key",
                    validator.address
                )));
            }
        }
        Ok(())
    }

    /// Loads and validates a JSON genesis file
    pub fn from_file(path: &Path) -> Result<Self, GenesisError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| GenesisError::Io(format!("{}: {}", path.display(), e)))?;
        let doc: GenesisDoc = serde_json::from_str(&content)
            .map_err(|e| GenesisError::Parse(format!("{}: {}", path.display(), e)))?;
        doc.validate()?;
        Ok(doc)
    }

    /// Writes the document as pretty JSON
    pub fn save_as(&self, path: &Path) -> Result<(), GenesisError> {
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| GenesisError::Parse(e.to_string()))?;
        std::fs::write(path, content)
            .map_err(|e| GenesisError::Io(format!("{}: {}", path.display(), e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::genesis::default_genesis;
    use tempfile::tempdir;

    #[test]
    fn test_save_and_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("genesis.json");

        let doc = GenesisDoc::new(ChainId::new("abc123"), default_genesis());
        doc.save_as(&path).unwrap();
        let loaded = GenesisDoc::from_file(&path).unwrap();

        assert_eq!(loaded, doc);
        assert_eq!(loaded.consensus_params.block.time_iota_ms, 1000);
    }

    #[test]
    fn test_validate_rejects_bad_params() {
        let mut doc = GenesisDoc::new(ChainId::new(""), default_genesis());
        assert!(doc.validate().is_err());

        doc.chain_id = ChainId::new("chain");
        doc.consensus_params.block.time_iota_ms = 0;
        assert!(matches!(doc.validate(), Err(GenesisError::Invalid(_))));

        doc.consensus_params.block.time_iota_ms = MIN_TIME_IOTA_MS;
        assert!(doc.validate().is_ok());
    }

    #[test]
    fn test_from_file_missing() {
        let dir = tempdir().unwrap();
        assert!(matches!(
            GenesisDoc::from_file(&dir.path().join("nope.json")),
            Err(GenesisError::Io(_))
        ));
    }
}
