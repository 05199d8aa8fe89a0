use crate::context::{ChainMessageLog, ScanContext, SyncStatus};
use crate::daemon::Daemon;
use crate::error::{Error, Result};
use crate::extractor::{ExtractedMessage, MessageExtractor};
use crate::ledger::SharedLedger;
use crate::protocol::ProtocolEngine;
use crate::scanner::Scanner;
use crate::sync_assist::SnapshotStore;
use crate::tx_cache::{RawTxCache, fetch_transaction};
use crate::upgrades::UpgradeOracle;
use crate::vm::BytecodeVm;
use bitcoin::Txid;
use scp_rpc::{ChainApi, Transaction};
use std::sync::Arc;

/// Collaborators the indexer is built from.
pub struct IndexerConfiguration {
    pub chain: Arc<dyn ChainApi>,
    pub ledger: SharedLedger,
    pub vm: Arc<dyn BytecodeVm>,
    pub upgrades: Arc<dyn UpgradeOracle>,
    pub snapshots: Arc<dyn SnapshotStore>,
}

/// Indexer components.
pub struct IndexerComponents {
    /// Scan loop, to be run on its own task.
    pub daemon: Daemon,
    /// Read access for API consumers.
    pub handle: IndexerHandle,
}

/// Builds a new indexer from `config`.
pub fn new_indexer(config: IndexerConfiguration) -> IndexerComponents {
    let IndexerConfiguration {
        chain,
        ledger,
        vm,
        upgrades,
        snapshots,
    } = config;

    let cache = Arc::new(RawTxCache::new(chain.clone()));
    let extractor = Arc::new(MessageExtractor::new(chain.clone(), cache.clone()));
    let engine = ProtocolEngine::new(chain.clone(), cache, ledger.clone(), vm, upgrades);
    let scanner = Scanner::new(
        chain.clone(),
        extractor.clone(),
        engine,
        ledger.clone(),
        snapshots,
    );

    let status = SyncStatus::default();
    let messages = ChainMessageLog::default();
    let ctx = ScanContext::new(status.clone(), messages.clone());

    let handle = IndexerHandle {
        chain: chain.clone(),
        status: status.clone(),
        messages,
        extractor,
        ledger,
    };

    IndexerComponents {
        daemon: Daemon::new(chain, scanner, ctx, status),
        handle,
    }
}

/// Cheaply cloneable view of the indexer state.
#[derive(Clone)]
pub struct IndexerHandle {
    chain: Arc<dyn ChainApi>,
    status: SyncStatus,
    messages: ChainMessageLog,
    extractor: Arc<MessageExtractor>,
    ledger: SharedLedger,
}

impl IndexerHandle {
    /// Current scan height.
    pub fn height(&self) -> u32 {
        self.status.height()
    }

    pub fn is_fullnode(&self) -> bool {
        self.status.is_fullnode()
    }

    pub fn is_scanning(&self) -> bool {
        self.status.is_scanning()
    }

    pub fn chain_messages(&self) -> &ChainMessageLog {
        &self.messages
    }

    pub fn ledger(&self) -> &SharedLedger {
        &self.ledger
    }

    /// Decodes the message carried by an arbitrary transaction.
    pub async fn extract_message(
        &self,
        txid: Txid,
        use_cache: bool,
    ) -> Result<Option<ExtractedMessage>> {
        self.extractor.extract(txid, use_cache).await
    }

    /// Returns every mempool transaction, verbose.
    ///
    /// Transactions leaving the mempool between the two RPC calls are omitted.
    pub async fn full_mempool(&self) -> Result<Vec<Transaction>> {
        let txids = self.chain.raw_mempool().await?;

        let mut transactions = Vec::with_capacity(txids.len());
        for txid in txids {
            match fetch_transaction(self.chain.as_ref(), txid).await {
                Ok(tx) => transactions.push(tx),
                Err(Error::Indexing { .. }) => {
                    tracing::debug!(%txid, "Mempool transaction vanished");
                }
                Err(err) => return Err(err),
            }
        }

        Ok(transactions)
    }
}
