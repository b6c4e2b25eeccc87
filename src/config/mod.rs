// Node configuration - File layout and runtime knobs of a test node
// Principle: Clear mapping between the config file and internal paths

pub mod app_options;

pub use app_options::{AppOptions, PruningStrategy};

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Base node configuration handed to the harness
///
/// Paths are relative to `root_dir`. The harness always points `root_dir` at a
/// fresh temporary directory; a preset value is only used as the parent under
/// which that directory is created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Home directory of the node
    #[serde(skip)]
    pub root_dir: PathBuf,

    /// Human readable node name
    pub moniker: String,

    /// Genesis document
    pub genesis_file: PathBuf,

    /// Network identity key
    pub node_key_file: PathBuf,

    /// Private validator key
    pub priv_validator_key_file: PathBuf,

    /// Private validator last-sign state
    pub priv_validator_state_file: PathBuf,

    /// Directory collecting genesis transactions
    pub gentx_dir: PathBuf,

    /// Consensus settings
    pub consensus: ConsensusConfig,

    /// Metrics settings
    pub instrumentation: InstrumentationConfig,

    /// Transaction pool settings
    #[serde(default)]
    pub mempool: MempoolConfig,
}

/// Block production settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsensusConfig {
    /// Delay between committed blocks (milliseconds)
    pub timeout_commit_ms: u64,

    /// Produce blocks even when the mempool is empty
    pub create_empty_blocks: bool,

    /// Upper bound of transactions reaped per block
    pub max_txs_per_block: usize,
}

/// Transaction pool settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MempoolConfig {
    /// Maximum number of pending transactions
    pub size: usize,
}

impl Default for MempoolConfig {
    fn default() -> Self {
        Self { size: 5_000 }
    }
}

/// Metrics settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstrumentationConfig {
    /// Collect node metrics
    pub enabled: bool,

    /// Metric name prefix
    pub namespace: String,
}

pub const CONFIG_DIR: &str = "config";
pub const DATA_DIR: &str = "data";
pub const CONFIG_FILE: &str = "config.toml";

impl NodeConfig {
    /// Configuration tuned for fast local tests
    pub fn test_config() -> Self {
        Self {
            root_dir: PathBuf::new(),
            moniker: "testnode".to_string(),
            genesis_file: PathBuf::from(CONFIG_DIR).join("genesis.json"),
            node_key_file: PathBuf::from(CONFIG_DIR).join("node_key.json"),
            priv_validator_key_file: PathBuf::from(CONFIG_DIR).join("priv_validator_key.json"),
            priv_validator_state_file: PathBuf::from(DATA_DIR).join("priv_validator_state.json"),
            gentx_dir: PathBuf::from(CONFIG_DIR).join("gentx"),
            consensus: ConsensusConfig {
                timeout_commit_ms: 50,
                create_empty_blocks: true,
                max_txs_per_block: 1000,
            },
            instrumentation: InstrumentationConfig {
                enabled: true,
                namespace: "kratos_testnode".to_string(),
            },
            mempool: MempoolConfig::default(),
        }
    }

    /// Re-roots every relative path under `root`
    pub fn set_root(&mut self, root: &Path) -> &mut Self {
        self.root_dir = root.to_path_buf();
        self
    }

    fn rooted(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root_dir.join(path)
        }
    }

    pub fn config_dir(&self) -> PathBuf {
        self.root_dir.join(CONFIG_DIR)
    }

    pub fn data_dir(&self) -> PathBuf {
        self.root_dir.join(DATA_DIR)
    }

    pub fn config_file(&self) -> PathBuf {
        self.config_dir().join(CONFIG_FILE)
    }

    pub fn genesis_file(&self) -> PathBuf {
        self.rooted(&self.genesis_file)
    }

    pub fn node_key_file(&self) -> PathBuf {
        self.rooted(&self.node_key_file)
    }

    pub fn priv_validator_key_file(&self) -> PathBuf {
        self.rooted(&self.priv_validator_key_file)
    }

    pub fn priv_validator_state_file(&self) -> PathBuf {
        self.rooted(&self.priv_validator_state_file)
    }

    pub fn gentx_dir(&self) -> PathBuf {
        self.rooted(&self.gentx_dir)
    }

    /// Writes the configuration as TOML
    pub fn write_to(&self, path: &Path) -> Result<(), ConfigError> {
        let content =
            toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))?;
        std::fs::write(path, content)
            .map_err(|e| ConfigError::Io(format!("{}: {}", path.display(), e)))
    }

    /// Loads a TOML configuration, rooting it at the file's home directory
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(format!("{}: {}", path.display(), e)))?;
        let mut config: NodeConfig =
            toml::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        if let Some(root) = path.parent().and_then(Path::parent) {
            config.set_root(root);
        }
        Ok(config)
    }
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self::test_config()
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to serialize config: {0}")]
    Serialize(String),

    #[error("Failed to parse config: {0}")]
    Parse(String),

    #[error("Config IO error: {0}")]
    Io(String),

    #[error("Invalid pruning strategy: {0}")]
    InvalidPruningStrategy(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_paths_are_rooted() {
        let mut config = NodeConfig::test_config();
        config.set_root(Path::new("/tmp/home"));

        assert_eq!(config.genesis_file(), PathBuf::from("/tmp/home/config/genesis.json"));
        assert_eq!(
            config.priv_validator_state_file(),
            PathBuf::from("/tmp/home/data/priv_validator_state.json")
        );
        assert_eq!(config.config_file(), PathBuf::from("/tmp/home/config/config.toml"));
    }

    #[test]
    fn test_absolute_paths_are_kept() {
        let mut config = NodeConfig::test_config();
        config.node_key_file = PathBuf::from("/keys/node_key.json");
        config.set_root(Path::new("/tmp/home"));

        assert_eq!(config.node_key_file(), PathBuf::from("/keys/node_key.json"));
    }

    #[test]
    fn test_write_and_load_roundtrip() {
        let dir = TempDir::new().unwrap();
        let mut config = NodeConfig::test_config();
        config.set_root(dir.path());
        config.moniker = "alice-node".to_string();
        config.consensus.timeout_commit_ms = 7;

        std::fs::create_dir_all(config.config_dir()).unwrap();
        config.write_to(&config.config_file()).unwrap();

        let loaded = NodeConfig::load(&config.config_file()).unwrap();
        assert_eq!(loaded, config);
    }
}
