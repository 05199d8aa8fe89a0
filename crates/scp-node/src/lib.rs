//! SCP Node Library.
//!
//! Runs the SCP indexer against an SCC Core node as a CLI application.

mod cli;
mod commands;
mod conf;
mod error;

pub use self::cli::run;
pub use self::conf::NodeConf;
pub use self::error::{Error, Result};
