// Error - Failure of one bootstrap stage
use crate::fs::InitError;
use crate::genesis::GenesisError;
use crate::keyring::KeyringError;
use crate::node::NodeError;
use crate::privval::KeyFileError;

/// Bootstrap errors, one variant per stage
///
/// Every variant is terminal: nothing after the failing stage ran and no
/// partially built node is handed out.
#[derive(Debug, thiserror::Error)]
pub enum TestnodeError {
    #[error("Initialization failed: {0}")]
    Initialization(#[from] InitError),

    #[error("Key generation failed: {0}")]
    KeyGeneration(#[from] KeyringError),

    #[error("Genesis assembly failed: {0}")]
    GenesisAssembly(#[from] GenesisError),

    #[error("Node assembly failed: {0}")]
    NodeAssembly(#[source] NodeAssemblyError),
}

/// First failing step of node assembly
#[derive(Debug, thiserror::Error)]
pub enum NodeAssemblyError {
    #[error(transparent)]
    KeyFile(#[from] KeyFileError),

    #[error(transparent)]
    Node(#[from] NodeError),
}

impl From<KeyFileError> for TestnodeError {
    fn from(e: KeyFileError) -> Self {
        TestnodeError::NodeAssembly(e.into())
    }
}

impl From<NodeError> for TestnodeError {
    fn from(e: NodeError) -> Self {
        TestnodeError::NodeAssembly(e.into())
    }
}
