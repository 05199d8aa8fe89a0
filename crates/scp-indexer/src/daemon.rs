//! Periodic scan scheduling.

use crate::constants::{DAEMON_TICK, FIRST_SCP_BLOCK, TAIL_SCAN_DEPTH};
use crate::context::{ScanContext, SyncStatus};
use crate::error::Result;
use crate::scanner::{ScanSummary, Scanner};
use scp_rpc::ChainApi;
use std::future::Future;
use std::sync::Arc;
use tokio::time::MissedTickBehavior;

/// Drives the scanner every [`DAEMON_TICK`].
///
/// The first scan after start-up is a cold sync from [`FIRST_SCP_BLOCK`]. Every later scan
/// walks the tail of the chain so freshly mined blocks are applied and short reorgs are
/// picked up.
pub struct Daemon {
    chain: Arc<dyn ChainApi>,
    scanner: Scanner,
    ctx: ScanContext,
    status: SyncStatus,
}

impl Daemon {
    pub(crate) fn new(
        chain: Arc<dyn ChainApi>,
        scanner: Scanner,
        ctx: ScanContext,
        status: SyncStatus,
    ) -> Self {
        Self {
            chain,
            scanner,
            ctx,
            status,
        }
    }

    pub fn status(&self) -> &SyncStatus {
        &self.status
    }

    pub fn context(&self) -> &ScanContext {
        &self.ctx
    }

    /// Runs until `shutdown` resolves.
    ///
    /// A scan in progress is abandoned as soon as `shutdown` resolves. The ledger only
    /// changes between RPC calls, so the abandoned scan leaves it consistent with the
    /// chain message log.
    pub async fn run(mut self, shutdown: impl Future<Output = ()>) {
        let mut interval = tokio::time::interval(DAEMON_TICK);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                biased;
                _ = &mut shutdown => break,
                _ = interval.tick() => {}
            }

            tokio::select! {
                biased;
                _ = &mut shutdown => {
                    tracing::info!("Abandoning scan in progress");
                    break;
                }
                _ = self.on_tick() => {}
            }
        }

        tracing::info!("Daemon stopped");
    }

    async fn on_tick(&mut self) {
        if !self.status.is_fullnode() && !self.check_node().await {
            return;
        }

        if let Err(err) = self.tick().await {
            tracing::warn!(%err, "Unable to scan blocks, retrying next tick");
        }
    }

    /// Checks node connectivity and flips the full-node flag on the first success.
    pub async fn check_node(&self) -> bool {
        match self.chain.uptime().await {
            Ok(uptime) => {
                self.status.set_fullnode(true);
                tracing::info!(uptime, "Connected to SCC Core, running as full node");
                true
            }
            Err(err) => {
                tracing::warn!(%err, "Unable to reach SCC Core, retrying...");
                false
            }
        }
    }

    /// Runs one scan attempt, `Ok(None)` if the node is not ready or a scan is running.
    pub async fn tick(&mut self) -> Result<Option<ScanSummary>> {
        if !self.status.is_fullnode() {
            return Ok(None);
        }

        let Some(_guard) = self.status.try_begin_scan() else {
            tracing::debug!("Scan already in progress");
            return Ok(None);
        };

        let block_count = self.chain.block_count().await?;

        let summary = if self.ctx.scanned_blocks() == 0 {
            let blocks_to_walk = block_count.saturating_sub(FIRST_SCP_BLOCK);
            self.scanner
                .scan(&mut self.ctx, blocks_to_walk, false)
                .await?
        } else {
            // An aborted cold sync leaves the cursor far behind the tip.
            let behind = block_count.saturating_sub(self.status.height());
            let summary = self
                .scanner
                .scan(&mut self.ctx, behind.max(TAIL_SCAN_DEPTH), true)
                .await?;

            if let Err(err) = self.scanner.save_snapshot(&self.ctx).await {
                tracing::warn!(%err, "Unable to save sync-assist snapshot");
            }

            summary
        };

        Ok(Some(summary))
    }
}
