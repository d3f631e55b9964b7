//! # customprops
//!
//! Command line front end for `customprops-core`.
//!
//! ## Usage
//!
//! ```bash
//! # List defined and mandatory sids
//! customprops -d product.json sids
//!
//! # Assign and save one property
//! customprops -d product.json set color red
//! customprops -d product.json set width 12 --attr unit=cm
//!
//! # Bulk load a submitted form: {"Properties": {"color": {"value": "red"}}}
//! customprops -d product.json load -i form.json
//!
//! # Validate everything the schema requires
//! customprops -d product.json validate
//! ```
//!
//! Logging goes to stderr. `CUSTOMPROPS_LOG` (or `RUST_LOG`) sets the
//! filter and `CUSTOMPROPS_LOG_FORMAT=json` switches to JSON lines.

mod cli;

use clap::Parser;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

fn main() {
    let cli = cli::Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = cli::execute(cli) {
        tracing::error!("Error: {}", e);
        std::process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let log_format =
        std::env::var("CUSTOMPROPS_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    let default_filter = if verbose {
        "customprops=debug,customprops_core=debug"
    } else {
        "customprops=info,customprops_core=info"
    };
    let filter = EnvFilter::try_from_env("CUSTOMPROPS_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| default_filter.into());

    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(std::io::stderr),
                )
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }
}
