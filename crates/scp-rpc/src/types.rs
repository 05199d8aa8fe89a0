//! SCC Core JSON-RPC response types.
//!
//! These mirror the JSON returned by the node (a Dash-derived daemon). Fields the indexer
//! never reads are omitted and ignored on deserialization.

use bitcoin::{BlockHash, Txid};
use serde::{Deserialize, Serialize};

/// Response for `getblock` RPC with the default verbosity (JSON with txids).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    /// The block hash.
    pub hash: BlockHash,
    /// The block height or index.
    pub height: u32,
    /// The transaction ids, in the order the node enumerates them.
    pub tx: Vec<Txid>,
    /// The number of transactions in the block.
    #[serde(rename = "nTx", default)]
    pub n_tx: u32,
    /// The hash of the previous block.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previousblockhash: Option<BlockHash>,
    /// The hash of the next block.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nextblockhash: Option<BlockHash>,
}

impl Block {
    /// Number of transactions, falling back to the txid list when `nTx` is absent.
    pub fn tx_count(&self) -> usize {
        if self.n_tx > 0 {
            self.n_tx as usize
        } else {
            self.tx.len()
        }
    }
}

/// Response for `getrawtransaction` RPC with verbose=1.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// The transaction id.
    pub txid: Txid,
    /// The transaction inputs.
    #[serde(default)]
    pub vin: Vec<Vin>,
    /// The transaction outputs.
    #[serde(default)]
    pub vout: Vec<Vout>,
    /// The block hash, absent while the transaction is in the mempool.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blockhash: Option<BlockHash>,
    /// Whether the transaction is locked by an InstantSend quorum.
    #[serde(default)]
    pub instantlock: bool,
    /// Whether the containing block is locked by a ChainLock.
    #[serde(default)]
    pub chainlock: bool,
}

impl Transaction {
    /// Returns `true` if the node attests that this transaction can no longer be
    /// reorganized away.
    pub fn is_final(&self) -> bool {
        self.instantlock || self.chainlock
    }

    /// Returns the address paid by the output at `index`, if any.
    pub fn output_address(&self, index: usize) -> Option<&str> {
        self.vout.get(index).and_then(Vout::address)
    }
}

/// Transaction input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vin {
    /// The transaction id of the spent output.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub txid: Option<Txid>,
    /// The index of the spent output.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vout: Option<u32>,
    /// Coinbase data (for coinbase transactions).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coinbase: Option<String>,
}

impl Vin {
    /// Returns the spent outpoint, `None` for a coinbase input.
    pub fn outpoint(&self) -> Option<(Txid, u32)> {
        Some((self.txid?, self.vout?))
    }
}

/// Transaction output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vout {
    /// The value in SCC.
    pub value: f64,
    /// Index.
    #[serde(default)]
    pub n: u32,
    /// The script pubkey.
    #[serde(rename = "scriptPubKey")]
    pub script_pub_key: ScriptPubKey,
}

impl Vout {
    /// Returns the first address this output pays to.
    pub fn address(&self) -> Option<&str> {
        self.script_pub_key.address()
    }
}

/// Script pubkey.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScriptPubKey {
    /// The assembly representation.
    #[serde(default)]
    pub asm: String,
    /// The raw output script bytes, hex-encoded.
    #[serde(default)]
    pub hex: String,
    /// The type (e.g., pubkeyhash, scripthash, nulldata).
    #[serde(rename = "type", default)]
    pub script_type: String,
    /// The addresses (legacy Dash-style list).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub addresses: Vec<String>,
    /// The address (newer single-address form).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

impl ScriptPubKey {
    /// Returns the first non-empty address of this script.
    pub fn address(&self) -> Option<&str> {
        self.addresses
            .first()
            .map(String::as_str)
            .or(self.address.as_deref())
            .filter(|address| !address.is_empty())
    }
}

/// Response for `validateaddress` RPC.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidateAddress {
    /// If the address is valid or not.
    pub isvalid: bool,
    /// The address validated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}
