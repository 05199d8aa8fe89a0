//! Ledger store holding SCP contract state.
//!
//! The indexer decides *whether* a mutation is allowed by the protocol; the ledger owns the
//! state and enforces its own invariants (balances, supply caps, NFT ownership).

mod memory;

pub use memory::{Activity, MemoryLedger, Nft};

use bitcoin::Txid;
use parking_lot::RwLock;
use scp_rpc::Transaction;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

/// Ledger shared between the scanner and API consumers.
///
/// Guards must never be held across an `.await`.
pub type SharedLedger = Arc<RwLock<dyn Ledger>>;

/// How a call message names its target contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContractRef {
    /// Creation transaction id (legacy addressing).
    Txid(Txid),
    /// Sequential contract index (indexed addressing).
    Index(u64),
}

impl fmt::Display for ContractRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Txid(txid) => write!(f, "{txid}"),
            Self::Index(index) => write!(f, "id{index}"),
        }
    }
}

/// Fungible token standard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "standard", rename_all = "lowercase")]
pub enum TokenKind {
    /// SCP-1: mintable by the issuer up to the max supply.
    Scp1,
    /// SCP-2: minted once, then inflates through staking rewards.
    Scp2 {
        /// Annual staking inflation, in percent.
        inflation: u64,
        /// Blocks a balance must stay untouched before it earns rewards.
        min_age: u64,
    },
}

impl TokenKind {
    pub fn version(&self) -> u8 {
        match self {
            Self::Scp1 => 1,
            Self::Scp2 { .. } => 2,
        }
    }
}

/// Token contract as created by an `SCPCREATE1`/`SCPCREATE2` message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewToken {
    pub id: Txid,
    pub kind: TokenKind,
    pub name: String,
    pub ticker: String,
    pub max_supply: u64,
    pub creator: String,
}

/// NFT collection as created by an `SCPCREATE4` message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCollection {
    pub id: Txid,
    pub name: String,
    /// `None` for unlimited mints.
    pub max_mints: Option<u64>,
    /// NFTs of a protected collection can not be destroyed.
    pub protected: bool,
    pub creator: String,
}

/// Snapshot of a token contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TokenInfo {
    pub id: Txid,
    pub index: u64,
    #[serde(flatten)]
    pub kind: TokenKind,
    pub name: String,
    pub ticker: String,
    pub creator: String,
    pub max_supply: u64,
    pub supply: u64,
    /// Number of accounts that ever held the token.
    pub owners: usize,
}

impl TokenInfo {
    pub fn version(&self) -> u8 {
        self.kind.version()
    }
}

/// Snapshot of an NFT collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CollectionInfo {
    pub id: Txid,
    pub index: u64,
    pub name: String,
    pub creator: String,
    pub protected: bool,
    pub max_mints: Option<u64>,
    /// Height the collection was created at.
    pub created_at: u32,
    pub minted: u64,
}

/// Mutation refused by the ledger.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    #[error("Unknown contract {0}")]
    UnknownContract(Txid),

    #[error("Contract {0} already exists")]
    DuplicateContract(Txid),

    #[error("Amount {requested} exceeds the remaining supply of {available}")]
    ExceedsMaxSupply { requested: u64, available: u64 },

    #[error("Insufficient balance for {address} (balance: {balance}, requested: {requested})")]
    InsufficientBalance {
        address: String,
        balance: u64,
        requested: u64,
    },

    #[error("Token does not support staking")]
    NotStakable,

    #[error("No staking rewards to redeem for {0}")]
    NothingToRedeem(String),

    #[error("Collection reached its limit of {0} mints")]
    MaxMintsReached(u64),

    #[error("Unknown NFT {0}")]
    UnknownNft(String),

    #[error("NFT {nft} is not owned by {address}")]
    NotNftOwner { nft: String, address: String },

    #[error("NFTs of a protected collection can not be destroyed")]
    ProtectedCollection,
}

/// State store the protocol engine applies validated mutations to.
///
/// Every mutation receives the transaction that triggered it so implementations can keep
/// an activity history.
pub trait Ledger: Send + Sync {
    /// Called with every height the scanner processes or skips.
    fn set_block_height(&mut self, height: u32);

    fn add_token(&mut self, token: NewToken) -> Result<(), LedgerError>;

    /// Adds a collection created at `height`.
    fn add_collection(&mut self, collection: NewCollection, height: u32)
        -> Result<(), LedgerError>;

    fn token(&self, target: &ContractRef) -> Option<TokenInfo>;

    fn collection(&self, target: &ContractRef) -> Option<CollectionInfo>;

    /// Mints `amount` new tokens to `address`.
    fn credit_account(
        &mut self,
        token: &Txid,
        address: &str,
        amount: u64,
        tx: &Transaction,
    ) -> Result<(), LedgerError>;

    /// Burns `amount` tokens from `address`.
    fn debit_account(
        &mut self,
        token: &Txid,
        address: &str,
        amount: u64,
        tx: &Transaction,
    ) -> Result<(), LedgerError>;

    fn transfer(
        &mut self,
        token: &Txid,
        from: &str,
        to: &str,
        amount: u64,
        tx: &Transaction,
    ) -> Result<(), LedgerError>;

    /// Moves the staking rewards accrued by `address` into its balance.
    fn redeem_rewards(
        &mut self,
        token: &Txid,
        address: &str,
        tx: &Transaction,
    ) -> Result<(), LedgerError>;

    fn mint_nft(
        &mut self,
        collection: &Txid,
        owner: &str,
        name: &str,
        reference: &str,
        tx: &Transaction,
    ) -> Result<(), LedgerError>;

    fn transfer_nft(
        &mut self,
        collection: &Txid,
        from: &str,
        to: &str,
        nft_id: &str,
        tx: &Transaction,
    ) -> Result<(), LedgerError>;

    fn destroy_nft(
        &mut self,
        collection: &Txid,
        owner: &str,
        nft_id: &str,
        tx: &Transaction,
    ) -> Result<(), LedgerError>;
}
