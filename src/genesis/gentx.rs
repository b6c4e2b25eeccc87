// Genesis transactions - Validator registration signed before the chain starts
use super::GenesisError;
use crate::config::NodeConfig;
use crate::encoding::EncodingConfig;
use crate::keyring::Keyring;
use crate::types::{Amount, ChainId, Coin, PubKey, Transaction, TransactionCall};
use std::path::PathBuf;
use tracing::info;

/// Tokens the validator bonds to itself at genesis
pub const DEFAULT_SELF_DELEGATION: Amount = 100_000_000;

/// File name of the genesis transaction of `node_id`
pub fn gentx_file_name(node_id: &str) -> String {
    format!("gentx-{}.json", node_id)
}

/// Signs a validator registration with the keyring entry `name`
///
/// The transaction bonds [`DEFAULT_SELF_DELEGATION`] of the bond denom to the
/// consensus key `pub_key` and is written to the gentx directory of `config`.
/// Genesis transactions carry account number and sequence zero.
pub fn create_validator(
    keyring: &Keyring,
    encoding: &EncodingConfig,
    pub_key: PubKey,
    name: &str,
    node_id: &str,
    chain_id: &ChainId,
    config: &NodeConfig,
) -> Result<PathBuf, GenesisError> {
    let sender = keyring.key(name)?.account();

    let tx = Transaction {
        chain_id: chain_id.clone(),
        sender,
        account_number: 0,
        sequence: 0,
        call: TransactionCall::CreateValidator {
            moniker: config.moniker.clone(),
            node_id: node_id.to_string(),
            consensus_pubkey: pub_key,
            self_delegation: Coin::bond(DEFAULT_SELF_DELEGATION),
        },
        memo: node_id.to_string(),
    };
    let signed = encoding.tx_config.sign(keyring, name, tx)?;
    let json = encoding.codec.marshal_json_indent(&signed)?;

    let dir = config.gentx_dir();
    std::fs::create_dir_all(&dir)
        .map_err(|e| GenesisError::Io(format!("{}: {}", dir.display(), e)))?;
    let path = dir.join(gentx_file_name(node_id));
    std::fs::write(&path, json).map_err(|e| GenesisError::Io(format!("{}: {}", path.display(), e)))?;

    info!("Wrote genesis transaction for '{}' to {}", name, path.display());
    Ok(path)
}
