//! State carried across scans.

use crate::constants::RECENT_BLOCK_HASHES_CAPACITY;
use crate::tx_cache::FifoMap;
use bitcoin::BlockHash;
use parking_lot::RwLock;
use scp_rpc::{Block, Transaction};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

#[derive(Debug, Default)]
struct StatusInner {
    height: AtomicU32,
    fullnode: AtomicBool,
    scanning: AtomicBool,
}

/// Process-wide sync status, cheap to clone and read from any task.
#[derive(Debug, Clone, Default)]
pub struct SyncStatus {
    inner: Arc<StatusInner>,
}

impl SyncStatus {
    /// Height of the block most recently fetched or trusted by the scanner.
    pub fn height(&self) -> u32 {
        self.inner.height.load(Ordering::Acquire)
    }

    /// Whether the node answered and scans are allowed to run.
    pub fn is_fullnode(&self) -> bool {
        self.inner.fullnode.load(Ordering::Acquire)
    }

    pub fn is_scanning(&self) -> bool {
        self.inner.scanning.load(Ordering::Acquire)
    }

    pub(crate) fn set_height(&self, height: u32) {
        self.inner.height.store(height, Ordering::Release);
    }

    pub(crate) fn set_fullnode(&self, fullnode: bool) {
        self.inner.fullnode.store(fullnode, Ordering::Release);
    }

    /// Marks a scan as running, `None` if one already is.
    pub(crate) fn try_begin_scan(&self) -> Option<ScanGuard> {
        self.inner
            .scanning
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| ScanGuard {
                status: self.clone(),
            })
    }
}

/// Clears the scanning flag when dropped, whether the scan finished or failed.
pub(crate) struct ScanGuard {
    status: SyncStatus,
}

impl Drop for ScanGuard {
    fn drop(&mut self) {
        self.status.inner.scanning.store(false, Ordering::Release);
    }
}

/// A non-empty message found on chain.
#[derive(Debug, Clone)]
pub struct ChainMessage {
    pub message: String,
    pub height: u32,
    pub tx: Arc<Transaction>,
}

/// Append-only log of every message seen on chain, in chain order.
#[derive(Debug, Clone, Default)]
pub struct ChainMessageLog {
    messages: Arc<RwLock<Vec<ChainMessage>>>,
}

impl ChainMessageLog {
    pub(crate) fn push(&self, message: ChainMessage) {
        self.messages.write().push(message);
    }

    pub fn len(&self) -> usize {
        self.messages.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy of the whole log.
    pub fn messages(&self) -> Vec<ChainMessage> {
        self.messages.read().clone()
    }

    /// Heights that produced at least one message, sorted and de-duplicated.
    pub fn heights(&self) -> Vec<u32> {
        let mut heights = self
            .messages
            .read()
            .iter()
            .map(|message| message.height)
            .collect::<Vec<_>>();
        heights.sort_unstable();
        heights.dedup();
        heights
    }
}

/// Hashes of the most recently applied blocks, newest first.
#[derive(Debug)]
pub struct RecentBlockHashes {
    hashes: FifoMap<BlockHash, ()>,
}

impl Default for RecentBlockHashes {
    fn default() -> Self {
        Self {
            hashes: FifoMap::new(RECENT_BLOCK_HASHES_CAPACITY),
        }
    }
}

impl RecentBlockHashes {
    pub fn contains(&self, hash: &BlockHash) -> bool {
        self.hashes.contains(hash)
    }

    pub(crate) fn insert(&mut self, hash: BlockHash) {
        self.hashes.insert(hash, ());
    }

    pub fn len(&self) -> usize {
        self.hashes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Block whose processing stopped on an RPC failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct InterruptedBlock {
    pub(crate) hash: BlockHash,
    /// Index of the first transaction not yet applied.
    pub(crate) next_tx: usize,
}

/// Everything a scan reads and updates, owned by the daemon.
#[derive(Debug, Default)]
pub struct ScanContext {
    pub(crate) status: SyncStatus,
    pub(crate) messages: ChainMessageLog,
    pub(crate) scanned_blocks: u64,
    pub(crate) current_block: Option<Block>,
    pub(crate) recent_blocks: RecentBlockHashes,
    pub(crate) interrupted: Option<InterruptedBlock>,
}

impl ScanContext {
    pub fn new(status: SyncStatus, messages: ChainMessageLog) -> Self {
        Self {
            status,
            messages,
            ..Default::default()
        }
    }

    /// Blocks scanned since start-up, trusted sync-assist heights included.
    pub fn scanned_blocks(&self) -> u64 {
        self.scanned_blocks
    }

    pub fn recent_blocks(&self) -> &RecentBlockHashes {
        &self.recent_blocks
    }

    /// Returns the transaction index to start `hash` from, consuming a matching interruption.
    pub(crate) fn resume_index(&mut self, hash: &BlockHash) -> usize {
        match self.interrupted {
            Some(interrupted) if interrupted.hash == *hash => {
                self.interrupted = None;
                interrupted.next_tx
            }
            _ => 0,
        }
    }
}
