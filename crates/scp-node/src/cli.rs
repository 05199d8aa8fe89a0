use crate::commands::run::Run;
use crate::error::{Error, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

#[derive(Debug, clap::Subcommand)]
pub enum Command {
    /// Run the SCP indexer against an SCC Core node.
    Run(Run),
}

#[derive(Debug, Parser)]
#[command(name = "scp-node", version, about = "StakeCube Protocol indexer")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Log filter directives, e.g. `scp_indexer=debug`.
    ///
    /// Falls back to `RUST_LOG`, then to `info`.
    #[arg(long, global = true, value_name = "FILTER")]
    pub log: Option<String>,
}

fn init_logging(directives: Option<&str>) -> Result<()> {
    let filter = match directives {
        Some(directives) => {
            EnvFilter::try_new(directives).map_err(|err| Error::Logging(err.to_string()))?
        }
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .try_init()
        .map_err(|err| Error::Logging(err.to_string()))
}

/// Parse and run command line arguments
pub fn run() -> Result<()> {
    let Cli { command, log } = Cli::parse();

    init_logging(log.as_deref())?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    match command {
        Command::Run(run) => runtime.block_on(run.execute()),
    }
}
