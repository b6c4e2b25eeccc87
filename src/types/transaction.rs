// Transaction - Minimal transaction set understood by the test application
use super::account::{AccountId, PubKey};
use super::primitives::{ChainId, Coin, Hash};
use super::signature::{domain_separate, Signature64, DOMAIN_TRANSACTION};
use serde::{Deserialize, Serialize};

/// Signed transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedTransaction {
    /// Unsigned transaction
    pub transaction: Transaction,

    /// Ed25519 signature (64 bytes)
    pub signature: Signature64,
}

impl SignedTransaction {
    pub fn new(transaction: Transaction, signature: [u8; 64]) -> Self {
        Self {
            transaction,
            signature: Signature64::from(signature),
        }
    }

    /// Verifies the sender's signature over the domain-separated body
    pub fn verify(&self) -> bool {
        match Self::signing_message(&self.transaction) {
            Some(message) => self
                .transaction
                .sender
                .verify(&message, self.signature.as_bytes()),
            None => false,
        }
    }

    /// Message a sender signs for the given transaction
    pub fn signing_message(transaction: &Transaction) -> Option<Vec<u8>> {
        let tx_bytes = bincode::serialize(transaction).ok()?;
        Some(domain_separate(DOMAIN_TRANSACTION, &tx_bytes))
    }

    pub fn hash(&self) -> Hash {
        self.transaction.hash()
    }
}

/// Unsigned transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// Chain the transaction is valid on
    pub chain_id: ChainId,

    /// Sender
    pub sender: AccountId,

    /// Auth account number of the sender
    pub account_number: u64,

    /// Anti-replay sequence
    pub sequence: u64,

    pub call: TransactionCall,

    #[serde(default)]
    pub memo: String,
}

impl Transaction {
    pub fn hash(&self) -> Hash {
        match bincode::serialize(self) {
            Ok(bytes) => Hash::hash(&bytes),
            Err(_) => {
                let mut data = Vec::new();
                data.extend_from_slice(self.sender.as_bytes());
                data.extend_from_slice(&self.sequence.to_le_bytes());
                Hash::hash(&data)
            }
        }
    }
}

/// Calls supported by the embedded application
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionCall {
    /// Bank transfer
    Transfer { to: AccountId, amount: Coin },

    /// Validator registration with self-delegation
    CreateValidator {
        moniker: String,
        node_id: String,
        consensus_pubkey: PubKey,
        self_delegation: Coin,
    },
}

impl TransactionCall {
    /// Type URL registered in the interface registry
    pub fn type_url(&self) -> &'static str {
        match self {
            TransactionCall::Transfer { .. } => TYPE_URL_TRANSFER,
            TransactionCall::CreateValidator { .. } => TYPE_URL_CREATE_VALIDATOR,
        }
    }
}

pub const TYPE_URL_TRANSFER: &str = "/kratos.bank.v1.MsgSend";
pub const TYPE_URL_CREATE_VALIDATOR: &str = "/kratos.staking.v1.MsgCreateValidator";

#[cfg(test)]
mod tests {
    use super::*;
    use ed25519_dalek::{Signer, SigningKey};

    fn transfer_from(key: &SigningKey) -> Transaction {
        Transaction {
            chain_id: ChainId::new("test-chain"),
            sender: AccountId::from_public_key(&key.verifying_key()),
            account_number: 0,
            sequence: 0,
            call: TransactionCall::Transfer {
                to: AccountId::from_bytes([2u8; 32]),
                amount: Coin::bond(5),
            },
            memo: String::new(),
        }
    }

    #[test]
    fn test_signed_transaction_verifies() {
        let key = SigningKey::from_bytes(&[1u8; 32]);
        let tx = transfer_from(&key);
        let msg = SignedTransaction::signing_message(&tx).unwrap();
        let signed = SignedTransaction::new(tx, key.sign(&msg).to_bytes());

        assert!(signed.verify());
    }

    #[test]
    fn test_tampered_transaction_fails_verification() {
        let key = SigningKey::from_bytes(&[1u8; 32]);
        let tx = transfer_from(&key);
        let msg = SignedTransaction::signing_message(&tx).unwrap();
        let mut signed = SignedTransaction::new(tx, key.sign(&msg).to_bytes());
        signed.transaction.chain_id = ChainId::new("other-chain");

        assert!(!signed.verify());
    }
}
