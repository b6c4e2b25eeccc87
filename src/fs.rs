// Filesystem initializer - Disposable home directory of one test node
use crate::config::{ConfigError, NodeConfig};
use std::path::Path;
use tempfile::TempDir;
use tracing::debug;

/// Prefix of every harness home directory
pub const HOME_PREFIX: &str = "testnode-";

/// Home directory of a test node, removed when dropped
#[derive(Debug)]
pub struct HarnessDir {
    dir: TempDir,
}

impl HarnessDir {
    pub fn path(&self) -> &Path {
        self.dir.path()
    }
}

/// Creates a fresh home directory and points `config` at it
///
/// A non-empty `root_dir` in `config` is used as the parent of the new
/// directory. Creates `config/`, `data/` and the gentx directory, then writes
/// `config/config.toml`. No key or genesis material is written.
pub fn init_file_structure(config: &mut NodeConfig) -> Result<HarnessDir, InitError> {
    let mut builder = tempfile::Builder::new();
    builder.prefix(HOME_PREFIX);

    let dir = if config.root_dir.as_os_str().is_empty() {
        builder.tempdir()
    } else {
        builder.tempdir_in(&config.root_dir)
    }
    .map_err(|e| InitError::TempDir(e.to_string()))?;

    config.set_root(dir.path());
    for path in [config.config_dir(), config.data_dir(), config.gentx_dir()] {
        std::fs::create_dir_all(&path)
            .map_err(|e| InitError::CreateDir(format!("{}: {}", path.display(), e)))?;
    }
    config.write_to(&config.config_file())?;

    debug!("Initialized node home at {}", dir.path().display());
    Ok(HarnessDir { dir })
}

/// Filesystem initialization errors
#[derive(Debug, thiserror::Error)]
pub enum InitError {
    #[error("Failed to create temporary directory: {0}")]
    TempDir(String),

    #[error("Failed to create directory: {0}")]
    CreateDir(String),

    #[error(transparent)]
    Config(#[from] ConfigError),
}
