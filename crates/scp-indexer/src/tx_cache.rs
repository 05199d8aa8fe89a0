//! Bounded cache of verbose transactions.

use crate::constants::RAW_TX_CACHE_CAPACITY;
use crate::error::{Error, Result};
use bitcoin::Txid;
use parking_lot::Mutex;
use scp_rpc::{ChainApi, Transaction};
use std::collections::{HashMap, VecDeque};
use std::hash::Hash;
use std::sync::Arc;

/// Insertion-ordered map that evicts its oldest entry once `capacity` is exceeded.
#[derive(Debug)]
pub(crate) struct FifoMap<K, V> {
    order: VecDeque<K>,
    entries: HashMap<K, V>,
    capacity: usize,
}

impl<K: Copy + Eq + Hash, V> FifoMap<K, V> {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            order: VecDeque::with_capacity(capacity.min(1024)),
            entries: HashMap::new(),
            capacity,
        }
    }

    pub(crate) fn get(&self, key: &K) -> Option<&V> {
        self.entries.get(key)
    }

    pub(crate) fn contains(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    /// Inserts `key` as the newest entry. Re-inserting an existing key only replaces its value.
    pub(crate) fn insert(&mut self, key: K, value: V) {
        if self.entries.insert(key, value).is_some() {
            return;
        }

        self.order.push_front(key);

        while self.order.len() > self.capacity {
            if let Some(oldest) = self.order.pop_back() {
                self.entries.remove(&oldest);
            }
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.order.len()
    }
}

/// Fetches a verbose transaction from the node, bypassing any cache.
///
/// A node-side rejection or a `null` answer both mean the node lacks the data, which is
/// reported as [`Error::Indexing`]. Transport failures are passed through.
pub(crate) async fn fetch_transaction(chain: &dyn ChainApi, txid: Txid) -> Result<Transaction> {
    match chain.raw_transaction(txid).await {
        Ok(Some(tx)) => Ok(tx),
        Ok(None) => Err(Error::Indexing { txid }),
        Err(err) if err.is_rejection() => Err(Error::Indexing { txid }),
        Err(err) => Err(err.into()),
    }
}

/// Fetch-or-cache store of verbose transactions.
///
/// Only transactions carrying an InstantSend or ChainLock finality flag are retained, so
/// cached data never goes stale across a reorg. Non-final transactions are still returned
/// to the caller, they are just fetched again next time.
pub struct RawTxCache {
    chain: Arc<dyn ChainApi>,
    entries: Mutex<FifoMap<Txid, Arc<Transaction>>>,
}

impl RawTxCache {
    /// Creates a cache holding up to [`RAW_TX_CACHE_CAPACITY`] transactions.
    pub fn new(chain: Arc<dyn ChainApi>) -> Self {
        Self::with_capacity(chain, RAW_TX_CACHE_CAPACITY)
    }

    pub fn with_capacity(chain: Arc<dyn ChainApi>, capacity: usize) -> Self {
        Self {
            chain,
            entries: Mutex::new(FifoMap::new(capacity)),
        }
    }

    /// Returns the transaction `txid`, issuing no RPC call on a cache hit.
    pub async fn get(&self, txid: Txid) -> Result<Arc<Transaction>> {
        let cached = self.entries.lock().get(&txid).cloned();
        if let Some(tx) = cached {
            return Ok(tx);
        }

        let tx = Arc::new(fetch_transaction(self.chain.as_ref(), txid).await?);

        if tx.is_final() {
            self.entries.lock().insert(txid, tx.clone());
        }

        Ok(tx)
    }

    /// Returns `true` if `txid` is currently cached.
    pub fn contains(&self, txid: &Txid) -> bool {
        self.entries.lock().contains(txid)
    }

    /// Number of cached transactions.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockChain, TxBuilder};

    #[test]
    fn fifo_map_evicts_oldest_first() {
        let mut map = FifoMap::new(2);
        map.insert(1u32, "a");
        map.insert(2, "b");
        map.insert(1, "a2");
        assert_eq!(map.len(), 2);
        map.insert(3, "c");
        assert_eq!(map.len(), 2);
        assert!(!map.contains(&1));
        assert_eq!(map.get(&2), Some(&"b"));
        assert_eq!(map.get(&3), Some(&"c"));
    }

    #[tokio::test]
    async fn cache_hit_issues_no_rpc() {
        let chain = Arc::new(MockChain::default());
        let tx = TxBuilder::new(1).output(1.0, "sAlice").finalized().build();
        let txid = tx.txid;
        chain.add_transaction(tx);

        let cache = RawTxCache::new(chain.clone());
        cache.get(txid).await.unwrap();
        assert_eq!(chain.calls("getrawtransaction"), 1);

        let cached = cache.get(txid).await.unwrap();
        assert_eq!(cached.txid, txid);
        assert_eq!(chain.calls("getrawtransaction"), 1);
    }

    #[tokio::test]
    async fn non_final_transactions_are_returned_but_not_retained() {
        let chain = Arc::new(MockChain::default());
        let tx = TxBuilder::new(1).output(1.0, "sAlice").build();
        let txid = tx.txid;
        chain.add_transaction(tx);

        let cache = RawTxCache::new(chain.clone());
        assert_eq!(cache.get(txid).await.unwrap().txid, txid);
        assert!(cache.is_empty());

        cache.get(txid).await.unwrap();
        assert_eq!(chain.calls("getrawtransaction"), 2);
    }

    #[tokio::test]
    async fn cache_never_exceeds_capacity() {
        let chain = Arc::new(MockChain::default());
        let txids = (0..=RAW_TX_CACHE_CAPACITY as u64)
            .map(|seed| {
                let tx = TxBuilder::new(seed).output(1.0, "sAlice").finalized().build();
                let txid = tx.txid;
                chain.add_transaction(tx);
                txid
            })
            .collect::<Vec<_>>();

        let cache = RawTxCache::new(chain.clone());
        for txid in &txids {
            cache.get(*txid).await.unwrap();
            assert!(cache.len() <= RAW_TX_CACHE_CAPACITY);
        }

        assert_eq!(cache.len(), RAW_TX_CACHE_CAPACITY);
        assert!(!cache.contains(&txids[0]));
        assert!(cache.contains(&txids[RAW_TX_CACHE_CAPACITY]));
    }

    #[tokio::test]
    async fn missing_transaction_is_an_indexing_error() {
        let chain = Arc::new(MockChain::default());
        let cache = RawTxCache::new(chain);
        let txid = TxBuilder::new(7).build().txid;
        let err = cache.get(txid).await.unwrap_err();
        assert!(matches!(err, Error::Indexing { txid: t } if t == txid));
    }
}
