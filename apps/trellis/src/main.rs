//! # Trellis - Triple Store CLI
//!
//! The main binary for the Trellis embeddable triple store.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────┐
//! │            apps/trellis (THE BINARY)          │
//! │                                               │
//! │  ┌─────────────┐       ┌──────────────────┐   │
//! │  │    CLI      │       │   Configuration  │   │
//! │  │   (clap)    │       │  (TOML + env)    │   │
//! │  └──────┬──────┘       └────────┬─────────┘   │
//! │         └───────────┬───────────┘             │
//! │                     ▼                         │
//! │             ┌───────────────┐                 │
//! │             │ trellis-core  │                 │
//! │             │ (THE LOGIC)   │                 │
//! │             └───────────────┘                 │
//! └───────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```bash
//! trellis put name trellis
//! trellis get name
//! trellis import -f records.txt
//! trellis add http://example.org/s http://example.org/p hello --literal
//! trellis targets http://example.org/s http://example.org/p
//! trellis print
//! ```

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use trellis::cli;
use trellis::config::{LogFormat, Settings};

/// Filter used when `TRELLIS_LOG` is unset.
const DEFAULT_FILTER: &str = "trellis=info,trellis_core=info";
const VERBOSE_FILTER: &str = "trellis=debug,trellis_core=debug";

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

fn main() {
    // Parse CLI arguments
    let cli = cli::Cli::parse();

    let settings = match Settings::load(
        cli.backend.as_deref(),
        cli.database.as_deref(),
        cli.config.as_deref(),
    ) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    // Initialize tracing. TRELLIS_LOG_FORMAT=json enables machine-parseable output.
    let fallback = if cli.verbose {
        VERBOSE_FILTER
    } else {
        DEFAULT_FILTER
    };
    let filter = tracing_subscriber::EnvFilter::try_from_env("TRELLIS_LOG")
        .unwrap_or_else(|_| fallback.into());

    match settings.log_format {
        LogFormat::Json => {
            let layer = tracing_subscriber::fmt::layer()
                .json()
                .with_writer(std::io::stderr);
            tracing_subscriber::registry()
                .with(filter)
                .with(layer)
                .init();
        }
        LogFormat::Text => {
            let layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);
            tracing_subscriber::registry()
                .with(filter)
                .with(layer)
                .init();
        }
    }

    // Execute command
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    if let Err(e) = cli::execute(&cli, &settings, &mut out) {
        tracing::error!("Error: {}", e);
        std::process::exit(1);
    }
}
