//! SCC Core JSON-RPC client for the SCP indexer.
//!
//! The indexer never validates base-layer data itself; everything it knows about the chain
//! comes through the handful of node methods listed below.
//!
//! # Consumed RPC Methods
//!
//! ## Blockchain
//! - `getbestblockhash` - Returns the hash of the best block
//! - `getblockcount` - Returns the current block count
//! - `getblockhash` - Returns block hash at given height
//! - `getblock` - Returns block data (JSON with txids)
//!
//! ## Raw Transactions
//! - `getrawtransaction` - Returns verbose transaction data (requires `txindex=1`)
//!
//! ## Mempool
//! - `getrawmempool` - Returns all mempool txids
//!
//! ## Util
//! - `validateaddress` - Checks that a string is a well-formed chain address
//! - `uptime` - Connectivity check

mod api;
mod client;
mod error;
mod types;

pub use api::CoreApiClient;
pub use client::{DEFAULT_RPC_PORT, NodeRpcClient, RpcConfig};
pub use error::{Error, Result};
pub use types::*;

use bitcoin::{BlockHash, Txid};

/// Read access to the underlying chain node.
///
/// Implemented by [`NodeRpcClient`] for a live node and by in-memory mocks in tests.
#[async_trait::async_trait]
pub trait ChainApi: Send + Sync {
    /// Returns the hash of the best (tip) block.
    async fn best_block_hash(&self) -> Result<BlockHash>;

    /// Returns the block identified by `hash`.
    async fn block(&self, hash: BlockHash) -> Result<Block>;

    /// Returns the hash of the block at `height` in the active chain.
    async fn block_hash(&self, height: u32) -> Result<BlockHash>;

    /// Returns the height of the active chain.
    async fn block_count(&self) -> Result<u32>;

    /// Returns the verbose transaction, `None` if the node answered with `null`.
    async fn raw_transaction(&self, txid: Txid) -> Result<Option<Transaction>>;

    /// Returns the txids currently in the mempool.
    async fn raw_mempool(&self) -> Result<Vec<Txid>>;

    /// Returns `true` if `address` is a well-formed chain address.
    async fn validate_address(&self, address: &str) -> Result<bool>;

    /// Returns the node uptime in seconds.
    async fn uptime(&self) -> Result<u64>;
}
