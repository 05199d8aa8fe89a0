//! Ordered block scanning.

use crate::context::{ChainMessage, InterruptedBlock, ScanContext};
use crate::error::{ProcessError, Result};
use crate::extractor::MessageExtractor;
use crate::ledger::SharedLedger;
use crate::protocol::{Outcome, ProtocolEngine};
use crate::sync_assist::{SnapshotError, SnapshotStore, SyncAssistSnapshot};
use scp_rpc::{Block, ChainApi};
use std::sync::Arc;

/// Counters of a single scan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanSummary {
    /// Blocks fetched and processed.
    pub processed: u32,
    /// Heights trusted from the sync-assist snapshot without any RPC call.
    pub assisted: u32,
    /// Blocks skipped because an earlier scan already applied them.
    pub skipped: u32,
    /// Messages appended to the chain message log.
    pub messages: u32,
}

/// Walks blocks in height order and feeds every carried message to the protocol engine.
pub struct Scanner {
    chain: Arc<dyn ChainApi>,
    extractor: Arc<MessageExtractor>,
    engine: ProtocolEngine,
    ledger: SharedLedger,
    snapshots: Arc<dyn SnapshotStore>,
}

impl Scanner {
    pub fn new(
        chain: Arc<dyn ChainApi>,
        extractor: Arc<MessageExtractor>,
        engine: ProtocolEngine,
        ledger: SharedLedger,
        snapshots: Arc<dyn SnapshotStore>,
    ) -> Self {
        Self {
            chain,
            extractor,
            engine,
            ledger,
            snapshots,
        }
    }

    /// Scans the last `blocks_to_walk` blocks up to and including the tip.
    ///
    /// With `rescan_possible`, blocks remembered in the recent block window are skipped.
    /// Without it, the sync-assist snapshot (if any) lets heights known to carry no message
    /// be trusted without fetching them.
    ///
    /// Any RPC failure aborts the scan. The cursor, the applied state and the interrupted
    /// position are kept so the next scan resumes without re-applying anything.
    pub async fn scan(
        &self,
        ctx: &mut ScanContext,
        blocks_to_walk: u32,
        rescan_possible: bool,
    ) -> Result<ScanSummary> {
        ctx.current_block = None;

        let snapshot = if rescan_possible {
            None
        } else {
            self.load_snapshot()
        };
        let mut assist_until = snapshot.as_ref().and_then(SyncAssistSnapshot::max_height);

        let best_hash = self.chain.best_block_hash().await?;
        let tip = self.chain.block(best_hash).await?.height;
        let start = tip.saturating_sub(blocks_to_walk);

        tracing::info!(start, tip, total = blocks_to_walk, "Scanning block range");
        if let Some(snapshot) = &snapshot {
            tracing::info!(assisted_blocks = snapshot.len(), "Sync assist enabled");
        }

        let mut summary = ScanSummary::default();

        for height in start..=tip {
            if let (Some(max_height), Some(snapshot)) = (assist_until, &snapshot) {
                if height > max_height {
                    assist_until = None;
                    tracing::info!(height, "Sync assist finished, resuming regular synchronization");
                } else if !snapshot.contains(height) {
                    ctx.status.set_height(height);
                    ctx.scanned_blocks += 1;
                    self.ledger.write().set_block_height(height);
                    summary.assisted += 1;
                    continue;
                }
            }

            // Chaining through `nextblockhash` saves a `getblockhash` per block on long walks.
            let chained = ctx
                .current_block
                .as_ref()
                .filter(|prev| assist_until.is_none() && prev.height + 1 == height)
                .and_then(|prev| prev.nextblockhash);
            let hash = match chained {
                Some(hash) => hash,
                None => self.chain.block_hash(height).await?,
            };

            if rescan_possible && ctx.recent_blocks.contains(&hash) {
                summary.skipped += 1;
                continue;
            }

            let block = self.chain.block(hash).await?;
            ctx.status.set_height(block.height);
            summary.messages += self.process_block(ctx, &block).await?;
            summary.processed += 1;
            ctx.current_block = Some(block);
        }

        tracing::info!(
            processed = summary.processed,
            assisted = summary.assisted,
            skipped = summary.skipped,
            messages = summary.messages,
            "Scan done"
        );

        Ok(summary)
    }

    /// Persists the heights of every message seen so far.
    ///
    /// The store is written on the blocking pool.
    pub async fn save_snapshot(&self, ctx: &ScanContext) -> Result<()> {
        let snapshot = SyncAssistSnapshot::new(ctx.messages.heights());
        let heights = snapshot.len();
        let snapshots = self.snapshots.clone();
        tokio::task::spawn_blocking(move || snapshots.save(&snapshot))
            .await
            .map_err(SnapshotError::from)??;
        tracing::debug!(heights, "Saved sync-assist snapshot");
        Ok(())
    }

    fn load_snapshot(&self) -> Option<SyncAssistSnapshot> {
        match self.snapshots.load() {
            Ok(snapshot) => snapshot.filter(|snapshot| !snapshot.is_empty()),
            Err(err) => {
                tracing::warn!(%err, "Ignoring unreadable sync-assist snapshot");
                None
            }
        }
    }

    /// Applies every message of `block` in order, returning how many were logged.
    async fn process_block(&self, ctx: &mut ScanContext, block: &Block) -> Result<u32> {
        let resume_from = ctx.resume_index(&block.hash);
        if resume_from == 0 {
            ctx.scanned_blocks += 1;
        } else {
            tracing::info!(
                height = block.height,
                hash = %block.hash,
                resume_from,
                "Resuming interrupted block"
            );
        }

        tracing::debug!(
            height = block.height,
            hash = %block.hash,
            txs = block.tx_count(),
            "Processing block"
        );

        self.ledger.write().set_block_height(block.height);

        let mut logged = 0;

        // The coinbase alone never carries a message.
        if block.tx_count() > 1 {
            for (index, txid) in block.tx.iter().enumerate().skip(resume_from) {
                ctx.interrupted = Some(InterruptedBlock {
                    hash: block.hash,
                    next_tx: index,
                });

                let Some(extracted) = self.extractor.extract(*txid, false).await? else {
                    continue;
                };
                if extracted.message.is_empty() {
                    continue;
                }

                match self
                    .engine
                    .apply(&extracted.message, &extracted.tx, block.height)
                    .await
                {
                    Ok(Outcome::Ignored) => {}
                    Ok(outcome) => {
                        tracing::debug!(%txid, height = block.height, ?outcome, "Applied SCP message");
                    }
                    Err(ProcessError::Chain(err)) => return Err(err),
                    Err(err) => {
                        tracing::warn!(%txid, height = block.height, "Rejected SCP message: {err}");
                    }
                }

                ctx.messages.push(ChainMessage {
                    message: extracted.message,
                    height: block.height,
                    tx: extracted.tx,
                });
                logged += 1;
            }
        }

        ctx.interrupted = None;
        ctx.recent_blocks.insert(block.hash);

        Ok(logged)
    }
}
