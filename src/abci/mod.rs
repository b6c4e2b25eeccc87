// ABCI - Boundary between the consensus node and the embedded application
// - Application capability trait
// - Local in-process transport

pub mod client;
pub mod types;

pub use client::{LocalClient, LocalClientCreator};
pub use types::*;

use crate::app::AppError;
use parking_lot::Mutex;
use std::sync::Arc;

/// Capability the consensus node drives blocks through
///
/// Calls arrive in the order `init_chain` once, then per block
/// `begin_block`, `deliver_tx` for each transaction, `end_block`, `commit`.
/// `check_tx` and `query` may be interleaved between blocks.
pub trait Application: Send {
    fn info(&self) -> ResponseInfo;

    fn init_chain(&mut self, request: RequestInitChain) -> Result<ResponseInitChain, AppError>;

    /// Validates a transaction against the mempool view of the state
    fn check_tx(&mut self, tx: &[u8]) -> ResponseCheckTx;

    fn begin_block(&mut self, request: RequestBeginBlock) -> Result<(), AppError>;

    fn deliver_tx(&mut self, tx: &[u8]) -> ResponseDeliverTx;

    fn end_block(&mut self, height: crate::types::Height) -> ResponseEndBlock;

    fn commit(&mut self) -> Result<ResponseCommit, AppError>;

    fn query(&self, request: RequestQuery) -> ResponseQuery;
}

/// Application handle shared by the node and the test
pub type SharedApplication = Arc<Mutex<dyn Application>>;
