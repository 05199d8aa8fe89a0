//! SCC Core RPC method declarations.
//!
//! Only the client half is generated; the node is the server.

use crate::types::{Block, Transaction, ValidateAddress};
use bitcoin::{BlockHash, Txid};
use jsonrpsee::core::RpcResult;
use jsonrpsee::proc_macros::rpc;

/// SCC Core compatible RPC API, as consumed by the indexer.
#[rpc(client)]
pub trait CoreApi {
    /// Returns the hash of the best (tip) block in the most-work fully-validated chain.
    #[method(name = "getbestblockhash")]
    async fn get_best_block_hash(&self) -> RpcResult<BlockHash>;

    /// Returns the height of the most-work fully-validated chain.
    #[method(name = "getblockcount")]
    async fn get_block_count(&self) -> RpcResult<u32>;

    /// Returns hash of block in best-block-chain at height provided.
    #[method(name = "getblockhash")]
    async fn get_block_hash(&self, height: u32) -> RpcResult<BlockHash>;

    /// Returns block data, with the transaction ids only.
    #[method(name = "getblock")]
    async fn get_block(&self, blockhash: BlockHash) -> RpcResult<Block>;

    /// Returns the raw transaction data.
    ///
    /// `verbose` is passed as `1` to receive a JSON object instead of a hex string.
    #[method(name = "getrawtransaction")]
    async fn get_raw_transaction(&self, txid: Txid, verbose: u8) -> RpcResult<Option<Transaction>>;

    /// Returns all transaction ids in memory pool.
    #[method(name = "getrawmempool")]
    async fn get_raw_mempool(&self) -> RpcResult<Vec<Txid>>;

    /// Return information about the given address.
    #[method(name = "validateaddress")]
    async fn validate_address(&self, address: String) -> RpcResult<ValidateAddress>;

    /// Returns the total uptime of the server in seconds.
    #[method(name = "uptime")]
    async fn uptime(&self) -> RpcResult<u64>;
}
