//! Locates and decodes the SCP payload carried by a transaction.

use crate::constants::{OP_RETURN_ASM_PREFIX_LEN, OP_RETURN_MARKER};
use crate::error::Result;
use crate::tx_cache::{RawTxCache, fetch_transaction};
use bitcoin::Txid;
use scp_rpc::{ChainApi, Transaction};
use std::sync::Arc;

/// Transaction to extract a message from.
#[derive(Debug, Clone)]
pub enum TxSource {
    /// Fetch the transaction by id.
    Id(Txid),
    /// Use an already fetched transaction.
    Fetched(Arc<Transaction>),
}

impl From<Txid> for TxSource {
    fn from(txid: Txid) -> Self {
        Self::Id(txid)
    }
}

impl From<Transaction> for TxSource {
    fn from(tx: Transaction) -> Self {
        Self::Fetched(Arc::new(tx))
    }
}

impl From<Arc<Transaction>> for TxSource {
    fn from(tx: Arc<Transaction>) -> Self {
        Self::Fetched(tx)
    }
}

/// Decoded carrier payload together with the transaction carrying it.
#[derive(Debug, Clone)]
pub struct ExtractedMessage {
    pub message: String,
    pub tx: Arc<Transaction>,
}

/// Returns the payload of the first output whose script starts with the
/// `OP_RETURN OP_PUSHDATA1` marker, `None` if there is no such output.
pub fn carrier_payload(tx: &Transaction) -> Option<String> {
    tx.vout
        .iter()
        .find(|output| output.script_pub_key.hex.starts_with(OP_RETURN_MARKER))
        .map(|output| decode_asm_payload(&output.script_pub_key.asm))
}

/// Decodes the pushed data following `OP_RETURN ` in a script's asm.
///
/// Decoding stops at the first character that is not part of a hex byte pair, and
/// invalid UTF-8 sequences are replaced rather than rejected.
fn decode_asm_payload(asm: &str) -> String {
    let data = asm.get(OP_RETURN_ASM_PREFIX_LEN..).unwrap_or_default();
    let hex_len = data
        .bytes()
        .take_while(u8::is_ascii_hexdigit)
        .count();
    let bytes = hex::decode(&data[..hex_len - hex_len % 2]).unwrap_or_default();
    String::from_utf8_lossy(&bytes).into_owned()
}

/// Extracts SCP messages from transactions.
pub struct MessageExtractor {
    chain: Arc<dyn ChainApi>,
    cache: Arc<RawTxCache>,
}

impl MessageExtractor {
    pub fn new(chain: Arc<dyn ChainApi>, cache: Arc<RawTxCache>) -> Self {
        Self { chain, cache }
    }

    /// Returns the carried message, `Ok(None)` if the transaction carries none.
    ///
    /// Lookups by id go through the raw transaction cache only when `use_cache` is set.
    /// Fails with [`crate::Error::Indexing`] if the node cannot supply the transaction.
    pub async fn extract(
        &self,
        source: impl Into<TxSource>,
        use_cache: bool,
    ) -> Result<Option<ExtractedMessage>> {
        let tx = match source.into() {
            TxSource::Fetched(tx) => tx,
            TxSource::Id(txid) if use_cache => self.cache.get(txid).await?,
            TxSource::Id(txid) => Arc::new(fetch_transaction(self.chain.as_ref(), txid).await?),
        };

        Ok(carrier_payload(&tx).map(|message| ExtractedMessage { message, tx }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use crate::mock::{MockChain, TxBuilder};

    fn extractor(chain: &Arc<MockChain>) -> MessageExtractor {
        let cache = Arc::new(RawTxCache::new(chain.clone()));
        MessageExtractor::new(chain.clone(), cache)
    }

    #[test]
    fn payload_is_decoded_from_asm() {
        let tx = TxBuilder::new(1)
            .output(1.0, "sAlice")
            .op_return("SCPCREATE1 MyToken MTK 1000000")
            .build();
        assert_eq!(
            carrier_payload(&tx).as_deref(),
            Some("SCPCREATE1 MyToken MTK 1000000")
        );
    }

    #[test]
    fn only_pushdata1_outputs_carry_messages() {
        let mut tx = TxBuilder::new(1).op_return("hello").build();
        tx.vout[0].script_pub_key.hex = "6a05".to_string();
        assert_eq!(carrier_payload(&tx), None);
    }

    #[test]
    fn first_marked_output_wins() {
        let tx = TxBuilder::new(1)
            .op_return("first")
            .op_return("second")
            .build();
        assert_eq!(carrier_payload(&tx).as_deref(), Some("first"));
    }

    #[test]
    fn malformed_hex_is_decoded_up_to_the_first_invalid_pair() {
        assert_eq!(decode_asm_payload("OP_RETURN 6869zz41"), "hi");
        assert_eq!(decode_asm_payload("OP_RETURN 68696"), "hi");
        assert_eq!(decode_asm_payload("OP_RETURN"), "");
        assert_eq!(decode_asm_payload("OP_RETURN ff"), "\u{fffd}");
    }

    #[tokio::test]
    async fn transaction_without_marker_yields_none() {
        let chain = Arc::new(MockChain::default());
        let tx = TxBuilder::new(1).output(1.0, "sAlice").build();
        let txid = tx.txid;
        chain.add_transaction(tx);

        let extracted = extractor(&chain).extract(txid, false).await.unwrap();
        assert!(extracted.is_none());
    }

    #[tokio::test]
    async fn uncached_lookups_always_hit_the_node() {
        let chain = Arc::new(MockChain::default());
        let tx = TxBuilder::new(1).op_return("hello").finalized().build();
        let txid = tx.txid;
        chain.add_transaction(tx);

        let extractor = extractor(&chain);
        extractor.extract(txid, false).await.unwrap();
        extractor.extract(txid, false).await.unwrap();
        assert_eq!(chain.calls("getrawtransaction"), 2);

        extractor.extract(txid, true).await.unwrap();
        let message = extractor.extract(txid, true).await.unwrap().unwrap();
        assert_eq!(message.message, "hello");
        assert_eq!(chain.calls("getrawtransaction"), 3);
    }

    #[tokio::test]
    async fn prefetched_transaction_needs_no_rpc() {
        let chain = Arc::new(MockChain::default());
        let tx = TxBuilder::new(1).op_return("hello").build();
        let message = extractor(&chain).extract(tx, false).await.unwrap().unwrap();
        assert_eq!(message.message, "hello");
        assert_eq!(chain.calls("getrawtransaction"), 0);
    }

    #[tokio::test]
    async fn node_without_txindex_is_an_indexing_error() {
        let chain = Arc::new(MockChain::default());
        let tx = TxBuilder::new(1).op_return("hello").build();
        let txid = tx.txid;
        chain.add_transaction(tx);
        chain.reject_transaction(txid);

        let err = extractor(&chain).extract(txid, false).await.unwrap_err();
        assert!(matches!(err, Error::Indexing { .. }));
    }

    #[tokio::test]
    async fn transport_failure_is_an_rpc_error() {
        let chain = Arc::new(MockChain::default());
        let tx = TxBuilder::new(1).op_return("hello").build();
        let txid = tx.txid;
        chain.add_transaction(tx);
        chain.fail_transaction(txid, true);

        let err = extractor(&chain).extract(txid, false).await.unwrap_err();
        assert!(matches!(err, Error::Rpc(_)));
    }
}
