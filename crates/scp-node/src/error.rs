use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Unable to read node configuration {path}: {source}")]
    ReadConf {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid node configuration: {}", .0.join("; "))]
    InvalidConf(Vec<String>),

    #[error("Failed to initialize logging: {0}")]
    Logging(String),

    #[error(transparent)]
    Rpc(#[from] scp_rpc::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
