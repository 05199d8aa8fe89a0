//! In-memory chain used by the unit tests.

use bitcoin::hashes::Hash;
use bitcoin::{BlockHash, Txid};
use parking_lot::Mutex;
use scp_rpc::{Block, ChainApi, Error, Result, ScriptPubKey, Transaction, Vin, Vout};
use std::collections::{BTreeMap, HashMap, HashSet};

pub(crate) fn txid(seed: u64) -> Txid {
    let mut bytes = [0u8; 32];
    bytes[..8].copy_from_slice(&seed.to_le_bytes());
    bytes[31] = 0x7a;
    Txid::from_byte_array(bytes)
}

fn block_hash(height: u32) -> BlockHash {
    let mut bytes = [0u8; 32];
    bytes[..4].copy_from_slice(&height.to_le_bytes());
    bytes[31] = 0xb1;
    BlockHash::from_byte_array(bytes)
}

fn transport(method: &'static str) -> Error {
    Error::Transport {
        method,
        reason: "connection refused".to_string(),
    }
}

/// Builds verbose transactions the way `getrawtransaction` reports them.
pub(crate) struct TxBuilder {
    tx: Transaction,
}

impl TxBuilder {
    pub(crate) fn new(seed: u64) -> Self {
        Self {
            tx: Transaction {
                txid: txid(seed),
                vin: Vec::new(),
                vout: Vec::new(),
                blockhash: None,
                instantlock: false,
                chainlock: false,
            },
        }
    }

    pub(crate) fn input(mut self, prev: Txid, vout: u32) -> Self {
        self.tx.vin.push(Vin {
            txid: Some(prev),
            vout: Some(vout),
            coinbase: None,
        });
        self
    }

    pub(crate) fn coinbase(mut self) -> Self {
        self.tx.vin.push(Vin {
            txid: None,
            vout: None,
            coinbase: Some("03abcdef".to_string()),
        });
        self
    }

    pub(crate) fn output(self, value: f64, address: &str) -> Self {
        self.push_output(
            value,
            ScriptPubKey {
                asm: "OP_DUP OP_HASH160 00 OP_EQUALVERIFY OP_CHECKSIG".to_string(),
                hex: "76a914".to_string(),
                script_type: "pubkeyhash".to_string(),
                addresses: vec![address.to_string()],
                address: None,
            },
        )
    }

    /// Output with no address at all.
    pub(crate) fn bare_output(self, value: f64) -> Self {
        self.push_output(value, ScriptPubKey::default())
    }

    pub(crate) fn op_return(self, message: &str) -> Self {
        let payload = hex::encode(message.as_bytes());
        self.push_output(
            0.0,
            ScriptPubKey {
                asm: format!("OP_RETURN {payload}"),
                hex: format!("6a4c{:02x}{payload}", message.len()),
                script_type: "nulldata".to_string(),
                addresses: Vec::new(),
                address: None,
            },
        )
    }

    pub(crate) fn finalized(mut self) -> Self {
        self.tx.instantlock = true;
        self
    }

    pub(crate) fn build(self) -> Transaction {
        self.tx
    }

    fn push_output(mut self, value: f64, script_pub_key: ScriptPubKey) -> Self {
        let n = self.tx.vout.len() as u32;
        self.tx.vout.push(Vout {
            value,
            n,
            script_pub_key,
        });
        self
    }
}

#[derive(Default)]
struct MockState {
    blocks: BTreeMap<u32, Block>,
    transactions: HashMap<Txid, Transaction>,
    mempool: Vec<Txid>,
    failing: HashSet<Txid>,
    rejected: HashSet<Txid>,
    offline: bool,
}

/// [`ChainApi`] over in-memory blocks and transactions that counts every call.
#[derive(Default)]
pub(crate) struct MockChain {
    state: Mutex<MockState>,
    calls: Mutex<HashMap<&'static str, usize>>,
}

impl MockChain {
    pub(crate) fn add_transaction(&self, tx: Transaction) {
        self.state.lock().transactions.insert(tx.txid, tx);
    }

    pub(crate) fn add_to_mempool(&self, tx: Transaction) {
        let mut state = self.state.lock();
        state.mempool.push(tx.txid);
        state.transactions.insert(tx.txid, tx);
    }

    /// Appends a block at `height` (or on top of the current tip) holding `txs`.
    pub(crate) fn push_block_at(&self, height: u32, txs: Vec<Transaction>) -> BlockHash {
        let hash = block_hash(height);
        let mut state = self.state.lock();

        let previousblockhash = state.blocks.get(&height.wrapping_sub(1)).map(|prev| prev.hash);
        if let Some(prev) = state.blocks.get_mut(&height.wrapping_sub(1)) {
            prev.nextblockhash = Some(hash);
        }

        let tx = txs.iter().map(|tx| tx.txid).collect::<Vec<_>>();
        for mut tx in txs {
            tx.blockhash = Some(hash);
            state.transactions.insert(tx.txid, tx);
        }

        state.blocks.insert(
            height,
            Block {
                hash,
                height,
                n_tx: tx.len() as u32,
                tx,
                previousblockhash,
                nextblockhash: None,
            },
        );

        hash
    }

    pub(crate) fn push_block(&self, txs: Vec<Transaction>) -> BlockHash {
        let height = self
            .tip_height()
            .map_or(crate::constants::FIRST_SCP_BLOCK, |tip| tip + 1);
        self.push_block_at(height, txs)
    }

    /// Appends `count` blocks holding only a coinbase transaction.
    pub(crate) fn push_empty_blocks(&self, count: u32) {
        for _ in 0..count {
            let height = self
                .tip_height()
                .map_or(crate::constants::FIRST_SCP_BLOCK, |tip| tip + 1);
            let coinbase = TxBuilder::new(u64::from(height) << 32)
                .coinbase()
                .output(500.0, "sMiner")
                .build();
            self.push_block_at(height, vec![coinbase]);
        }
    }

    pub(crate) fn tip_height(&self) -> Option<u32> {
        self.state.lock().blocks.keys().next_back().copied()
    }

    pub(crate) fn hash_at(&self, height: u32) -> Option<BlockHash> {
        self.state.lock().blocks.get(&height).map(|block| block.hash)
    }

    /// Makes `getrawtransaction` for `txid` fail with a transport error.
    pub(crate) fn fail_transaction(&self, txid: Txid, failing: bool) {
        let mut state = self.state.lock();
        if failing {
            state.failing.insert(txid);
        } else {
            state.failing.remove(&txid);
        }
    }

    /// Makes the node answer `getrawtransaction` for `txid` with an error object.
    pub(crate) fn reject_transaction(&self, txid: Txid) {
        self.state.lock().rejected.insert(txid);
    }

    pub(crate) fn set_offline(&self, offline: bool) {
        self.state.lock().offline = offline;
    }

    pub(crate) fn calls(&self, method: &str) -> usize {
        self.calls.lock().get(method).copied().unwrap_or_default()
    }

    pub(crate) fn reset_calls(&self) {
        self.calls.lock().clear();
    }

    fn record(&self, method: &'static str) -> Result<()> {
        *self.calls.lock().entry(method).or_default() += 1;
        if self.state.lock().offline {
            return Err(transport(method));
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl ChainApi for MockChain {
    async fn best_block_hash(&self) -> Result<BlockHash> {
        self.record("getbestblockhash")?;
        let state = self.state.lock();
        state
            .blocks
            .values()
            .next_back()
            .map(|block| block.hash)
            .ok_or_else(|| transport("getbestblockhash"))
    }

    async fn block(&self, hash: BlockHash) -> Result<Block> {
        self.record("getblock")?;
        let state = self.state.lock();
        state
            .blocks
            .values()
            .find(|block| block.hash == hash)
            .cloned()
            .ok_or(Error::Rejected {
                method: "getblock",
                code: -5,
                message: "Block not found".to_string(),
            })
    }

    async fn block_hash(&self, height: u32) -> Result<BlockHash> {
        self.record("getblockhash")?;
        let state = self.state.lock();
        state
            .blocks
            .get(&height)
            .map(|block| block.hash)
            .ok_or(Error::Rejected {
                method: "getblockhash",
                code: -8,
                message: "Block height out of range".to_string(),
            })
    }

    async fn block_count(&self) -> Result<u32> {
        self.record("getblockcount")?;
        Ok(self.tip_height().unwrap_or_default())
    }

    async fn raw_transaction(&self, txid: Txid) -> Result<Option<Transaction>> {
        self.record("getrawtransaction")?;
        let state = self.state.lock();
        if state.failing.contains(&txid) {
            return Err(transport("getrawtransaction"));
        }
        if state.rejected.contains(&txid) {
            return Err(Error::Rejected {
                method: "getrawtransaction",
                code: -5,
                message: "No such mempool or blockchain transaction".to_string(),
            });
        }
        Ok(state.transactions.get(&txid).cloned())
    }

    async fn raw_mempool(&self) -> Result<Vec<Txid>> {
        self.record("getrawmempool")?;
        Ok(self.state.lock().mempool.clone())
    }

    async fn validate_address(&self, address: &str) -> Result<bool> {
        self.record("validateaddress")?;
        Ok(address.len() > 1 && address.starts_with('s'))
    }

    async fn uptime(&self) -> Result<u64> {
        self.record("uptime")?;
        Ok(3600)
    }
}
