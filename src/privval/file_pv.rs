// File-backed private validator
// - Consensus signing key persisted in the key file
// - Last signed height/round/step persisted in the state file
// - Refuses to sign anything that could be a double sign

use super::node_key::{TypedKey, ED25519};
use super::{
    create_parent_dir, decode_secret, generate_secret, read_json, write_private_json, KeyFileError,
    PrivValError,
};
use crate::types::{Address, Height, PubKey, Signature64};
use ed25519_dalek::{Signer, SigningKey};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Consensus step a signature was produced for
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SignStep {
    Unsigned = 0,
    Propose = 1,
    Prevote = 2,
    Precommit = 3,
}

/// Last signature bookkeeping
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LastSignState {
    pub height: Height,
    pub round: u32,
    pub step: SignStep,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<Signature64>,
    /// Hex encoded bytes that were signed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sign_bytes: Option<String>,
}

impl Default for LastSignState {
    fn default() -> Self {
        Self {
            height: 0,
            round: 0,
            step: SignStep::Unsigned,
            signature: None,
            sign_bytes: None,
        }
    }
}

impl LastSignState {
    /// Checks `(height, round, step)` against the last signature
    ///
    /// Returns `Ok(true)` when it equals the last signed position, meaning the
    /// cached signature may be reused for identical bytes.
    pub fn check_hrs(&self, height: Height, round: u32, step: SignStep) -> Result<bool, PrivValError> {
        if height < self.height {
            return Err(PrivValError::HeightRegression {
                last: self.height,
                requested: height,
            });
        }
        if height > self.height {
            return Ok(false);
        }
        if round < self.round {
            return Err(PrivValError::RoundRegression {
                height,
                last: self.round,
                requested: round,
            });
        }
        if round > self.round {
            return Ok(false);
        }
        if step < self.step {
            return Err(PrivValError::StepRegression { height, round });
        }
        if step > self.step {
            return Ok(false);
        }
        if self.sign_bytes.is_none() || self.signature.is_none() {
            return Err(PrivValError::ConflictingData { height, round });
        }
        Ok(true)
    }
}

#[derive(Serialize, Deserialize)]
struct FilePVKey {
    address: Address,
    pub_key: PubKey,
    priv_key: TypedKey,
}

/// Private validator backed by a key file and a state file
pub struct FilePV {
    signing_key: SigningKey,
    key_path: PathBuf,
    state: LastSignState,
    state_path: PathBuf,
}

impl FilePV {
    pub fn generate(key_path: &Path, state_path: &Path) -> Result<Self, KeyFileError> {
        Ok(Self {
            signing_key: SigningKey::from_bytes(&generate_secret()?),
            key_path: key_path.to_path_buf(),
            state: LastSignState::default(),
            state_path: state_path.to_path_buf(),
        })
    }

    /// Loads the key file and, when present, the state file
    pub fn load(key_path: &Path, state_path: &Path) -> Result<Self, KeyFileError> {
        let key: FilePVKey = read_json(key_path)?;
        if key.priv_key.key_type != ED25519 {
            return Err(KeyFileError::InvalidKey(format!(
                "unsupported key type '{}'",
                key.priv_key.key_type
            )));
        }
        let signing_key = SigningKey::from_bytes(&decode_secret(&key.priv_key.value)?);
        if PubKey::from_verifying_key(&signing_key.verifying_key()) != key.pub_key {
            return Err(KeyFileError::InvalidKey(
                "public key does not match private key".to_string(),
            ));
        }

        let state = if state_path.exists() {
            read_json(state_path)?
        } else {
            LastSignState::default()
        };

        Ok(Self {
            signing_key,
            key_path: key_path.to_path_buf(),
            state,
            state_path: state_path.to_path_buf(),
        })
    }

    pub fn pub_key(&self) -> PubKey {
        PubKey::from_verifying_key(&self.signing_key.verifying_key())
    }

    pub fn address(&self) -> Address {
        self.pub_key().address()
    }

    pub fn last_sign_state(&self) -> &LastSignState {
        &self.state
    }

    /// Writes both the key file and the state file, creating their directories
    pub fn save(&self) -> Result<(), KeyFileError> {
        create_parent_dir(&self.key_path)?;
        create_parent_dir(&self.state_path)?;
        let key = FilePVKey {
            address: self.address(),
            pub_key: self.pub_key(),
            priv_key: TypedKey {
                key_type: ED25519.to_string(),
                value: hex::encode(self.signing_key.to_bytes()),
            },
        };
        write_private_json(&self.key_path, &key)?;
        self.save_state()
    }

    // never recreates a removed data directory
    fn save_state(&self) -> Result<(), KeyFileError> {
        write_private_json(&self.state_path, &self.state)
    }

    /// Signs a block proposal
    pub fn sign_proposal(
        &mut self,
        height: Height,
        round: u32,
        sign_bytes: &[u8],
    ) -> Result<Signature64, PrivValError> {
        self.sign(height, round, SignStep::Propose, sign_bytes)
    }

    fn sign(
        &mut self,
        height: Height,
        round: u32,
        step: SignStep,
        sign_bytes: &[u8],
    ) -> Result<Signature64, PrivValError> {
        let same_hrs = self.state.check_hrs(height, round, step)?;
        let encoded = hex::encode(sign_bytes);

        if same_hrs {
            return match (&self.state.sign_bytes, self.state.signature) {
                (Some(last), Some(signature)) if *last == encoded => {
                    debug!("Re-using signature for height {} round {}", height, round);
                    Ok(signature)
                }
                _ => Err(PrivValError::ConflictingData { height, round }),
            };
        }

        let signature = Signature64::from(self.signing_key.sign(sign_bytes).to_bytes());
        self.state = LastSignState {
            height,
            round,
            step,
            signature: Some(signature),
            sign_bytes: Some(encoded),
        };
        self.save_state()?;
        Ok(signature)
    }
}

/// Loads the private validator, generating and persisting one if absent
pub fn load_or_gen_file_pv(key_path: &Path, state_path: &Path) -> Result<FilePV, KeyFileError> {
    if key_path.exists() {
        return FilePV::load(key_path, state_path);
    }

    let pv = FilePV::generate(key_path, state_path)?;
    pv.save()?;
    info!(
        "Generated private validator {} at {}",
        pv.address(),
        key_path.display()
    );
    Ok(pv)
}
