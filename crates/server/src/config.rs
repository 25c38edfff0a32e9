//! Server configuration.
//!
//! Settings come from CLI arguments with environment-variable fallbacks;
//! arguments win.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

/// Command line interface for the JotDB server.
#[derive(Debug, Parser)]
#[command(name = "jotdb-server", version, about = "JotDB document database server")]
pub struct Cli {
    /// Path of the primary store. The index store lives beside it at
    /// `<data>.index`.
    #[arg(long, env = "JOTDB_DATA", default_value = "jotdb.data")]
    pub data: PathBuf,

    /// Log output format.
    #[arg(long, env = "JOTDB_LOG_FORMAT", value_enum, default_value = "auto")]
    pub log_format: LogFormat,
}

/// Log output format selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Human-readable format (development).
    Text,
    /// JSON structured logging (production).
    Json,
    /// JSON for non-TTY stdout, text otherwise.
    Auto,
}
