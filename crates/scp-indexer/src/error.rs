use crate::ledger::LedgerError;
use crate::sync_assist::SnapshotError;
use bitcoin::Txid;

/// Indexer error type.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The node could not supply a raw transaction, usually because `txindex=1` is not set.
    #[error("Unable to fetch raw transaction {txid}, insufficient TX indexing")]
    Indexing { txid: Txid },

    #[error(transparent)]
    Rpc(#[from] scp_rpc::Error),

    #[error(transparent)]
    Snapshot(#[from] SnapshotError),
}

/// Indexer result type.
pub type Result<T> = std::result::Result<T, Error>;

/// A protocol message that broke one of the SCP rules.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error(
        "Incorrect param count for SCP-{} creation (has {}, expected {})",
        display_or_unknown(.version),
        .found,
        display_or_unknown(.expected)
    )]
    ParamCount {
        version: Option<u8>,
        found: usize,
        expected: Option<usize>,
    },

    #[error("Incorrect params for SCP-{version} creation")]
    InvalidParams { version: u8 },

    #[error("Contract creation has no creator address in its last output")]
    MissingCreator,

    #[error("Invalid deployment fee output")]
    InvalidFeeOutput,

    #[error("Deployment fee sent to {destination} instead of the burn address")]
    InvalidFeeDestination { destination: String },

    #[error("Contract call has no caller address in output 1")]
    MissingCaller,

    #[error("Non-issuer {operation} on {contract} (issuer: {issuer}, caller: {caller})")]
    NonIssuer {
        operation: &'static str,
        contract: String,
        issuer: String,
        caller: String,
    },

    #[error("Invalid amount `{amount}` for {operation} on {contract}")]
    InvalidAmount {
        operation: &'static str,
        contract: String,
        amount: String,
    },

    #[error("Invalid receiver `{receiver}` for {operation} on {contract}")]
    InvalidReceiver {
        operation: &'static str,
        contract: String,
        receiver: String,
    },

    #[error("Missing or invalid NFT params for {operation} on {contract}")]
    InvalidNftParams {
        operation: &'static str,
        contract: String,
    },
}

fn display_or_unknown<T: std::fmt::Display>(value: &Option<T>) -> String {
    value
        .as_ref()
        .map_or_else(|| "?".to_string(), ToString::to_string)
}

/// Failure to apply a single protocol message.
///
/// Only [`ProcessError::Chain`] is fatal for a scan; the other variants reject the message
/// and the scan moves on.
#[derive(Debug, thiserror::Error)]
pub enum ProcessError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("{operation} on {contract} spends an input not owned by {caller}")]
    Unauthorized {
        operation: &'static str,
        contract: String,
        caller: String,
    },

    #[error("Ledger refused {operation} on {contract}: {source}")]
    Ledger {
        operation: &'static str,
        contract: String,
        #[source]
        source: LedgerError,
    },

    #[error(transparent)]
    Chain(#[from] Error),
}

impl ProcessError {
    /// Returns `true` if the scan must stop and retry later.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Chain(_))
    }
}

/// Truncates an address for log output.
pub(crate) fn short_address(address: &str) -> String {
    let mut short: String = address.chars().take(5).collect();
    short.push_str("...");
    short
}
