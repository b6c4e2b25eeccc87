// Genesis - Assembly of the genesis document of a test chain
// - Base genesis with funded accounts
// - Validator registration (gentx)
// - Collection into the final document

pub mod collect;
pub mod doc;
pub mod gentx;
pub mod state;

pub use collect::collect_gen_files;
pub use doc::{
    BlockParams, ConsensusParams, EvidenceParams, GenesisDoc, GenesisValidator, ValidatorParams,
    MIN_TIME_IOTA_MS,
};
pub use gentx::{create_validator, gentx_file_name, DEFAULT_SELF_DELEGATION};
pub use state::{default_genesis, GenesisState};

use crate::encoding::{CodecError, SignError};
use crate::keyring::KeyringError;
use crate::types::{BaseAccount, ChainId, GenesisBalance};
use std::path::Path;
use tracing::info;

/// Writes the base genesis file
///
/// `accounts` and `balances` replace those of `state`, the bank supply is
/// recomputed, and block times are allowed to advance by a single millisecond.
pub fn init_gen_files(
    mut state: GenesisState,
    accounts: Vec<BaseAccount>,
    balances: Vec<GenesisBalance>,
    genesis_file: &Path,
    chain_id: &ChainId,
) -> Result<GenesisDoc, GenesisError> {
    state.auth.accounts = accounts;
    state.bank.balances = balances;
    state.bank.supply = state.bank.compute_supply();

    let mut doc = GenesisDoc::new(chain_id.clone(), state);
    doc.consensus_params.block.time_iota_ms = MIN_TIME_IOTA_MS;
    doc.validate()?;

    if let Some(parent) = genesis_file.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| GenesisError::Io(format!("{}: {}", parent.display(), e)))?;
    }
    doc.save_as(genesis_file)?;

    info!(
        "Wrote genesis for chain {} with {} account(s) to {}",
        chain_id,
        doc.app_state.auth.accounts.len(),
        genesis_file.display()
    );
    Ok(doc)
}

/// Genesis assembly errors
#[derive(Debug, thiserror::Error)]
pub enum GenesisError {
    #[error("Genesis IO error: {0}")]
    Io(String),

    #[error("Genesis parse error: {0}")]
    Parse(String),

    #[error("Invalid genesis: {0}")]
    Invalid(String),

    #[error("Chain id mismatch: expected {expected}, found {found}")]
    ChainIdMismatch { expected: String, found: String },

    #[error("Invalid genesis transaction {file}: {reason}")]
    InvalidGenTx { file: String, reason: String },

    #[error("No genesis transaction registers node {0}")]
    MissingGenTx(String),

    #[error(transparent)]
    Keyring(#[from] KeyringError),

    #[error(transparent)]
    Sign(#[from] SignError),

    #[error(transparent)]
    Codec(#[from] CodecError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keyring::fund_keyring_accounts;
    use crate::types::{Coin, DEFAULT_TEST_BALANCE};
    use tempfile::tempdir;

    #[test]
    fn test_init_gen_files_forces_time_iota() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config").join("genesis.json");
        let (_, balances, accounts) = fund_keyring_accounts(&["alice", "bob"]).unwrap();

        let mut state = default_genesis();
        state.auth.accounts.push(BaseAccount::new(
            crate::types::AccountId::from_bytes([3u8; 32]),
            9,
            0,
        ));

        let doc = init_gen_files(state, accounts.clone(), balances, &path, &ChainId::new("abc")).unwrap();
        assert_eq!(doc.consensus_params.block.time_iota_ms, 1);
        assert_eq!(doc.app_state.auth.accounts, accounts);
        assert_eq!(doc.app_state.bank.supply, vec![Coin::bond(2 * DEFAULT_TEST_BALANCE)]);

        let loaded = GenesisDoc::from_file(&path).unwrap();
        assert_eq!(loaded.chain_id, ChainId::new("abc"));
        assert_eq!(loaded.consensus_params.block.time_iota_ms, 1);
    }

    #[test]
    fn test_init_gen_files_rejects_empty_chain_id() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("genesis.json");
        let result = init_gen_files(default_genesis(), vec![], vec![], &path, &ChainId::new(""));

        assert!(matches!(result, Err(GenesisError::Invalid(_))));
        assert!(!path.exists());
    }
}
