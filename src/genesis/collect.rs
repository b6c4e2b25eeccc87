// Genesis collection - Merges validated genesis transactions into the final document
use super::doc::GenesisDoc;
use super::GenesisError;
use crate::config::NodeConfig;
use crate::encoding::EncodingConfig;
use crate::types::{ChainId, Coins, PubKey, SignedTransaction, TransactionCall};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Collects every genesis transaction of `config` into its genesis file
///
/// Each transaction must decode, carry a valid signature for the chain, come
/// from an account funded at genesis that can cover its self-delegation, and
/// the one registering `node_id` must bond the consensus key `pub_key`.
pub fn collect_gen_files(
    config: &NodeConfig,
    encoding: &EncodingConfig,
    pub_key: PubKey,
    node_id: &str,
    chain_id: &ChainId,
) -> Result<GenesisDoc, GenesisError> {
    let genesis_file = config.genesis_file();
    let mut doc = GenesisDoc::from_file(&genesis_file)?;
    if doc.chain_id != *chain_id {
        return Err(GenesisError::ChainIdMismatch {
            expected: chain_id.to_string(),
            found: doc.chain_id.to_string(),
        });
    }

    let mut gen_txs = Vec::new();
    let mut own_gentx = false;

    for path in gentx_files(&config.gentx_dir())? {
        let bytes = std::fs::read(&path)
            .map_err(|e| GenesisError::Io(format!("{}: {}", path.display(), e)))?;
        let tx: SignedTransaction = encoding.codec.unmarshal_json(&bytes).map_err(|e| {
            GenesisError::InvalidGenTx {
                file: path.display().to_string(),
                reason: e.to_string(),
            }
        })?;

        validate_gentx(&doc, encoding, &tx, chain_id).map_err(|reason| GenesisError::InvalidGenTx {
            file: path.display().to_string(),
            reason,
        })?;

        if let TransactionCall::CreateValidator {
            node_id: ref registered,
            consensus_pubkey,
            ..
        } = tx.transaction.call
        {
            if registered == node_id {
                if consensus_pubkey != pub_key {
                    return Err(GenesisError::InvalidGenTx {
                        file: path.display().to_string(),
                        reason: format!("consensus key of node {} does not match", node_id),
                    });
                }
                own_gentx = true;
            }
        }

        debug!("Collected genesis transaction {}", path.display());
        gen_txs.push(tx);
    }

    if !own_gentx {
        return Err(GenesisError::MissingGenTx(node_id.to_string()));
    }

    let count = gen_txs.len();
    doc.app_state.genutil.gen_txs = gen_txs;
    doc.validate()?;
    doc.save_as(&genesis_file)?;

    info!("Collected {} genesis transaction(s) into {}", count, genesis_file.display());
    Ok(doc)
}

/// JSON files of the gentx directory, sorted by name
fn gentx_files(dir: &Path) -> Result<Vec<PathBuf>, GenesisError> {
    let entries =
        std::fs::read_dir(dir).map_err(|e| GenesisError::Io(format!("{}: {}", dir.display(), e)))?;

    let mut files = Vec::new();
    for entry in entries {
        let path = entry
            .map_err(|e| GenesisError::Io(format!("{}: {}", dir.display(), e)))?
            .path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "json") {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

fn validate_gentx(
    doc: &GenesisDoc,
    encoding: &EncodingConfig,
    tx: &SignedTransaction,
    chain_id: &ChainId,
) -> Result<(), String> {
    let call = &tx.transaction.call;
    if !encoding.interface_registry.is_registered(call.type_url()) {
        return Err(format!("unregistered message {}", call.type_url()));
    }
    let self_delegation = match call {
        TransactionCall::CreateValidator { self_delegation, .. } => self_delegation,
        _ => return Err(format!("unexpected message {}", call.type_url())),
    };
    if tx.transaction.chain_id != *chain_id {
        return Err(format!("signed for chain {}", tx.transaction.chain_id));
    }
    if !tx.verify() {
        return Err("invalid signature".to_string());
    }

    let bond_denom = &doc.app_state.staking.params.bond_denom;
    if self_delegation.denom != *bond_denom {
        return Err(format!("self-delegation must be in {}", bond_denom));
    }

    let sender = tx.transaction.sender;
    let balance = doc
        .app_state
        .bank
        .balances
        .iter()
        .find(|b| b.address == sender)
        .ok_or_else(|| format!("account {} is not funded at genesis", sender))?;
    let coins = Coins::from(balance.coins.clone());
    if coins.amount_of(bond_denom) < self_delegation.amount {
        return Err(format!(
            "account {} cannot cover self-delegation {}",
            sender, self_delegation
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::genesis::{create_validator, default_genesis, init_gen_files};
    use crate::keyring::{fund_keyring_accounts, Keyring, VALIDATOR_ACCOUNT};
    use tempfile::TempDir;

    struct Setup {
        _dir: TempDir,
        config: NodeConfig,
        keyring: Keyring,
        encoding: EncodingConfig,
        chain_id: ChainId,
        pub_key: PubKey,
    }

    fn setup(funded: &[&str]) -> Setup {
        let dir = TempDir::new().unwrap();
        let mut config = NodeConfig::test_config();
        config.set_root(dir.path());
        std::fs::create_dir_all(config.gentx_dir()).unwrap();

        let (keyring, balances, accounts) = fund_keyring_accounts(funded).unwrap();
        let chain_id = ChainId::new("collect");
        init_gen_files(default_genesis(), accounts, balances, &config.genesis_file(), &chain_id).unwrap();

        Setup {
            _dir: dir,
            config,
            keyring,
            encoding: EncodingConfig::make(),
            chain_id,
            pub_key: PubKey::from_bytes([7u8; 32]),
        }
    }

    #[test]
    fn test_collects_own_gentx() {
        let s = setup(&["alice", VALIDATOR_ACCOUNT]);
        create_validator(&s.keyring, &s.encoding, s.pub_key, VALIDATOR_ACCOUNT, "node0", &s.chain_id, &s.config)
            .unwrap();

        let doc = collect_gen_files(&s.config, &s.encoding, s.pub_key, "node0", &s.chain_id).unwrap();
        assert_eq!(doc.app_state.genutil.gen_txs.len(), 1);

        let on_disk = GenesisDoc::from_file(&s.config.genesis_file()).unwrap();
        assert_eq!(on_disk, doc);
    }

    #[test]
    fn test_rejects_missing_gentx() {
        let s = setup(&[VALIDATOR_ACCOUNT]);
        assert!(matches!(
            collect_gen_files(&s.config, &s.encoding, s.pub_key, "node0", &s.chain_id),
            Err(GenesisError::MissingGenTx(_))
        ));
    }

    #[test]
    fn test_rejects_unfunded_sender() {
        let mut s = setup(&[VALIDATOR_ACCOUNT]);
        s.keyring.new_account("stranger").unwrap();
        create_validator(&s.keyring, &s.encoding, s.pub_key, "stranger", "node0", &s.chain_id, &s.config)
            .unwrap();

        assert!(matches!(
            collect_gen_files(&s.config, &s.encoding, s.pub_key, "node0", &s.chain_id),
            Err(GenesisError::InvalidGenTx { .. })
        ));
    }

    #[test]
    fn test_rejects_foreign_consensus_key() {
        let s = setup(&[VALIDATOR_ACCOUNT]);
        create_validator(&s.keyring, &s.encoding, s.pub_key, VALIDATOR_ACCOUNT, "node0", &s.chain_id, &s.config)
            .unwrap();

        let other = PubKey::from_bytes([8u8; 32]);
        assert!(matches!(
            collect_gen_files(&s.config, &s.encoding, other, "node0", &s.chain_id),
            Err(GenesisError::InvalidGenTx { .. })
        ));
    }

    #[test]
    fn test_rejects_wrong_chain() {
        let s = setup(&[VALIDATOR_ACCOUNT]);
        create_validator(&s.keyring, &s.encoding, s.pub_key, VALIDATOR_ACCOUNT, "node0", &s.chain_id, &s.config)
            .unwrap();

        assert!(matches!(
            collect_gen_files(&s.config, &s.encoding, s.pub_key, "node0", &ChainId::new("other")),
            Err(GenesisError::ChainIdMismatch { .. })
        ));
    }
}
