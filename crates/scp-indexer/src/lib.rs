//! # StakeCube Protocol Indexer
//!
//! This crate follows the SCC chain through a node's JSON-RPC interface and replays every
//! StakeCube Protocol (SCP) message embedded in `OP_RETURN` outputs against a contract
//! ledger, in strict chain order.
//!
//! ## Pipeline
//!
//! - **Scanner**: walks blocks by height, chaining through `nextblockhash` where possible,
//!     and hands each transaction to the extractor.
//! - **Extractor**: finds the carrier output and decodes its payload.
//! - **Protocol engine**: classifies the payload, validates it and applies it to the
//!     [`Ledger`](ledger::Ledger), checking input ownership for privileged calls.
//! - **Daemon**: schedules a cold sync on start-up and incremental tail scans afterwards.
//!
//! ## Sync Assist
//!
//! The heights of every message seen are persisted after each tail scan. A later cold sync
//! trusts every height missing from that list and skips fetching it entirely.

mod authorization;
pub mod constants;
mod context;
mod daemon;
mod error;
mod extractor;
mod indexer;
pub mod ledger;
#[cfg(test)]
mod mock;
pub mod protocol;
mod scanner;
mod sync_assist;
mod tx_cache;
mod upgrades;
mod vm;

pub use authorization::is_authorized;
pub use context::{ChainMessage, ChainMessageLog, RecentBlockHashes, ScanContext, SyncStatus};
pub use daemon::Daemon;
pub use error::{Error, ProcessError, Result, ValidationError};
pub use extractor::{ExtractedMessage, MessageExtractor, TxSource, carrier_payload};
pub use indexer::{IndexerComponents, IndexerConfiguration, IndexerHandle, new_indexer};
pub use scanner::{ScanSummary, Scanner};
pub use sync_assist::{FileSnapshotStore, SnapshotError, SnapshotStore, SyncAssistSnapshot};
pub use tx_cache::RawTxCache;
pub use upgrades::{ActivationHeights, UpgradeOracle};
pub use vm::{BytecodeVm, NoopVm};
