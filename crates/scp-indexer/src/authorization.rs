//! Input ownership checks for contract calls.

use crate::error::Result;
use crate::tx_cache::RawTxCache;
use scp_rpc::Transaction;

/// Returns `true` if every input of `tx` spends an output paying `claimed`.
///
/// Previous transactions are fetched through the cache. A coinbase input, or an input whose
/// previous output carries no address, fails the check. Evaluation stops at the first
/// mismatch.
pub async fn is_authorized(cache: &RawTxCache, tx: &Transaction, claimed: &str) -> Result<bool> {
    for input in &tx.vin {
        let Some((prev_txid, prev_vout)) = input.outpoint() else {
            return Ok(false);
        };

        let prev = cache.get(prev_txid).await?;

        if prev.output_address(prev_vout as usize) != Some(claimed) {
            tracing::debug!(
                txid = %tx.txid,
                %prev_txid,
                prev_vout,
                "Input not owned by caller"
            );
            return Ok(false);
        }
    }

    Ok(true)
}
