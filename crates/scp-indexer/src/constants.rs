//! Constants fixed by the SCP protocol and the indexer's scheduling.

use std::time::Duration;

/// Height of the first block that can carry an SCP message.
pub const FIRST_SCP_BLOCK: u32 = 155_084;

/// Minimum deployment fee for a contract creation, in SCC.
pub const DEPLOY_FEE: f64 = 10.0;

/// Public burn address every deployment fee must be paid to.
pub const DEPLOY_FEE_DESTINATION: &str = "sccburnaddressXXXXXXXXXXXXXXSfqakF";

/// Script hex prefix of an `OP_RETURN OP_PUSHDATA1` output.
pub const OP_RETURN_MARKER: &str = "6a4c";

/// Length of the `OP_RETURN ` token preceding the payload in a script's asm.
pub(crate) const OP_RETURN_ASM_PREFIX_LEN: usize = 10;

/// Maximum number of finalized transactions kept in the raw transaction cache.
pub const RAW_TX_CACHE_CAPACITY: usize = 10_000;

/// Number of recently applied block hashes remembered for rescans.
pub const RECENT_BLOCK_HASHES_CAPACITY: usize = 100;

/// Period of the daemon loop.
pub const DAEMON_TICK: Duration = Duration::from_secs(5);

/// Minimum depth of an incremental tail scan.
pub const TAIL_SCAN_DEPTH: u32 = 20;

/// Length of a transaction id in hex, used by legacy contract addressing and NFT ids.
pub const TXID_HEX_LEN: usize = 64;
