// KratOs testnode - Ephemeral single-validator node for integration tests
//
// `testnode::new` bootstraps a fresh chain in a temporary home directory and
// hands back the node, its application and a client context:
//
//     let testnode = kratos_testnode::new(NodeConfig::test_config(), true, &["alice", "bob"])?;
//     testnode.node.start().await?;

pub mod abci;
pub mod app;
pub mod client;
pub mod config;
pub mod encoding;
pub mod error;
pub mod fs;
pub mod genesis;
pub mod keyring;
pub mod node;
pub mod privval;
pub mod storage;
pub mod testnode;
pub mod types;

#[cfg(test)]
mod tests;

pub use client::ClientContext;
pub use config::{AppOptions, NodeConfig};
pub use error::{NodeAssemblyError, TestnodeError};
pub use testnode::{log_dispatch, new, TestNode};
