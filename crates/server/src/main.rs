//! JotDB server binary.
//!
//! Opens the primary and index stores and rebuilds the secondary index
//! from the primary documents before anything is served.
//!
//! # Usage
//!
//! ```bash
//! jotdb-server --data /var/lib/jotdb/docs
//!
//! # Environment variables work as fallbacks for every flag
//! JOTDB_DATA=/var/lib/jotdb/docs jotdb-server
//! ```

mod config;

use std::io::IsTerminal;
use std::time::Instant;

use clap::Parser;
use config::{Cli, LogFormat};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn main() -> Result<(), jotdb::DatabaseError> {
    let cli = Cli::parse();
    init_logging(&cli);

    tracing::info!(data = %cli.data.display(), "Starting JotDB");

    let db = jotdb::Database::open(&cli.data)?;

    let started = Instant::now();
    let indexed = db.reindex()?;
    let total = db.document_count()?;
    tracing::info!(
        indexed,
        documents = total,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Index rebuilt from primary store"
    );
    if indexed < total {
        tracing::warn!(
            skipped = total - indexed,
            "Some documents could not be reindexed; see warnings above"
        );
    }

    tracing::info!("Store ready");
    Ok(())
}

/// Initializes the logging system based on configuration.
///
/// `RUST_LOG` overrides the default `info` filter.
fn init_logging(cli: &Cli) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let use_json = match cli.log_format {
        LogFormat::Json => true,
        LogFormat::Text => false,
        LogFormat::Auto => !std::io::stdout().is_terminal(),
    };

    if use_json {
        // JSON format for production / log aggregation
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().json().flatten_event(true).with_current_span(false))
            .init();
    } else {
        // Human-readable text format for development
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer())
            .init();
    }
}
