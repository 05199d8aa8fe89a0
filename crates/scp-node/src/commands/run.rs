use crate::conf::NodeConf;
use crate::error::{Error, Result};
use clap::Parser;
use parking_lot::RwLock;
use scp_indexer::constants::FIRST_SCP_BLOCK;
use scp_indexer::ledger::{MemoryLedger, SharedLedger};
use scp_indexer::{
    ActivationHeights, FileSnapshotStore, IndexerComponents, IndexerConfiguration, NoopVm,
    new_indexer,
};
use scp_rpc::{ChainApi, DEFAULT_RPC_PORT, NodeRpcClient, RpcConfig};
use std::path::PathBuf;
use std::sync::Arc;

/// The `run` command used to run the indexer.
#[derive(Debug, Clone, Parser)]
pub struct Run {
    /// Host of the SCC Core RPC server.
    #[clap(long, default_value = "127.0.0.1")]
    pub rpc_host: String,

    /// Port of the SCC Core RPC server [default: `rpcport` from `--conf`, or 39999].
    #[clap(long)]
    pub rpc_port: Option<u16>,

    /// RPC user [default: `rpcuser` from `--conf`].
    #[clap(long)]
    pub rpc_user: Option<String>,

    /// RPC password [default: `rpcpassword` from `--conf`].
    #[clap(long)]
    pub rpc_password: Option<String>,

    /// Path of the SCC Core configuration file.
    ///
    /// The node settings the indexer depends on (`txindex`, `server`) are checked at
    /// start-up.
    #[clap(long, value_name = "PATH")]
    pub conf: Option<PathBuf>,

    /// Directory holding the sync-assist snapshot.
    #[clap(long, value_name = "PATH", default_value = "scp-data")]
    pub data_dir: PathBuf,

    /// Height from which contracts may be addressed as `id<index>`.
    #[clap(long, default_value_t = FIRST_SCP_BLOCK)]
    pub token_indexing_height: u32,

    /// Height from which SCP-4 collections may be created.
    #[clap(long, default_value_t = FIRST_SCP_BLOCK)]
    pub scp4_height: u32,
}

impl Run {
    /// Resolves the RPC connection settings, CLI values taking precedence over `conf`.
    fn rpc_config(&self, conf: Option<&NodeConf>) -> Result<RpcConfig> {
        let from_conf = |key: &str| conf.and_then(|conf| conf.get(key)).map(str::to_string);

        let mut errors = Vec::new();

        if let Some(conf) = conf {
            let diagnostics = conf.diagnostics();
            for warning in &diagnostics.warnings {
                tracing::warn!("Config: {warning}");
            }
            errors.extend(diagnostics.errors);
        }

        let user = self
            .rpc_user
            .clone()
            .or_else(|| from_conf("rpcuser"))
            .filter(|user| !user.is_empty());
        if user.is_none() {
            errors.push("No rpcuser found, set rpcuser=<user>".to_string());
        }

        let password = self
            .rpc_password
            .clone()
            .or_else(|| from_conf("rpcpassword"))
            .filter(|password| !password.is_empty());
        if password.is_none() {
            errors.push("No rpcpassword found, set rpcpassword=<password>".to_string());
        }

        let port = match (self.rpc_port, from_conf("rpcport")) {
            (Some(port), _) => port,
            (None, Some(raw)) => raw.parse().unwrap_or_else(|_| {
                errors.push(format!("Invalid rpcport={raw}"));
                DEFAULT_RPC_PORT
            }),
            (None, None) => DEFAULT_RPC_PORT,
        };

        match (user, password) {
            (Some(user), Some(password)) if errors.is_empty() => Ok(RpcConfig {
                host: self.rpc_host.clone(),
                port,
                user,
                password,
                ..Default::default()
            }),
            _ => {
                for error in &errors {
                    tracing::error!("Config: {error}");
                }
                Err(Error::InvalidConf(errors))
            }
        }
    }

    pub async fn execute(self) -> Result<()> {
        let conf = self.conf.as_deref().map(NodeConf::load).transpose()?;
        let rpc_config = self.rpc_config(conf.as_ref())?;

        let chain: Arc<dyn ChainApi> = Arc::new(NodeRpcClient::new(&rpc_config)?);
        let ledger: SharedLedger = Arc::new(RwLock::new(MemoryLedger::new()));

        let IndexerComponents { daemon, handle } = new_indexer(IndexerConfiguration {
            chain,
            ledger,
            vm: Arc::new(NoopVm),
            upgrades: Arc::new(ActivationHeights {
                token_indexing: self.token_indexing_height,
                scp4: self.scp4_height,
            }),
            snapshots: Arc::new(FileSnapshotStore::new(&self.data_dir)),
        });

        tracing::info!(
            host = %rpc_config.host,
            port = rpc_config.port,
            data_dir = %self.data_dir.display(),
            "Starting SCP indexer"
        );

        daemon.run(shutdown_signal()).await;

        tracing::info!(
            height = handle.height(),
            messages = handle.chain_messages().len(),
            "SCP indexer shut down"
        );

        Ok(())
    }
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(%err, "Unable to listen for the shutdown signal");
        std::future::pending::<()>().await;
    }
}
