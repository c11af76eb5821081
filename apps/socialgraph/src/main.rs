//! # SocialGraph
//!
//! The main binary for the social graph store.
//!
//! This application provides:
//! - HTTP REST API server (axum-based)
//! - CLI interface for accounts, relationships, discovery and bulk loading
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────┐
//! │             apps/socialgraph (THE BINARY)         │
//! │                                                   │
//! │  ┌─────────────┐  ┌─────────────┐  ┌───────────┐  │
//! │  │   CLI       │  │   HTTP API  │  │  Loaders  │  │
//! │  │  (clap)     │  │   (axum)    │  │           │  │
//! │  └──────┬──────┘  └──────┬──────┘  └─────┬─────┘  │
//! │         └────────────────┼───────────────┘        │
//! │                          ▼                        │
//! │               ┌────────────────────┐              │
//! │               │  socialgraph-core  │              │
//! │               │    (THE STORE)     │              │
//! │               └────────────────────┘              │
//! └───────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```bash
//! socialgraph seed
//! socialgraph recommend alice
//! socialgraph search "alice smith"
//! socialgraph server --host 0.0.0.0 --port 8080
//! ```

use clap::Parser;
use socialgraph::cli;
use socialgraph::config::LogFormat;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

#[tokio::main]
async fn main() {
    let cli = cli::Cli::parse();
    let config = cli.resolve_config();

    let log_format = config
        .as_ref()
        .map(|c| c.log_format)
        .unwrap_or_default();
    init_tracing(log_format);

    let config = match config {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Error: {}", e);
            std::process::exit(1);
        }
    };

    if !cli.quiet && !cli.json_mode {
        print_banner();
    }

    if let Err(e) = cli::execute(cli, config).await {
        tracing::error!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Install the global subscriber. `RUST_LOG` overrides the default filter.
fn init_tracing(format: LogFormat) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "socialgraph=info,socialgraph_core=info,tower_http=debug".into());

    match format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        LogFormat::Text => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }
}

/// Print the startup banner.
fn print_banner() {
    println!(
        r#"
  SocialGraph v{}

  follows • mutuals • recommendations • search
"#,
        env!("CARGO_PKG_VERSION")
    );
}
