//! # customprops CLI Module
//!
//! ## Available Commands
//!
//! - `sids` - List defined and mandatory sids
//! - `show` - Print the serialized definition
//! - `set` - Assign one property and save it
//! - `load` - Bulk load form data and save every touched property
//! - `validate` - Validate every defined and mandatory property
//! - `replaces` - Check whether a legacy field is superseded
//! - `hash` - Checksum of the definition

mod commands;

use clap::{Parser, Subcommand};
use customprops::{AppError, DEFAULT_SCHEMA_FILE};
use customprops_core::primitives::FORM_NAME;
use std::path::PathBuf;

pub use commands::*;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// customprops - lazy property definitions
///
/// Reads a JSON definition (sid -> attributes), resolves each touched sid
/// to a property type from the TOML schema and writes the result back.
#[derive(Parser, Debug)]
#[command(name = "customprops")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Only print command results
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to the TOML schema
    #[arg(short = 'S', long, global = true, default_value = DEFAULT_SCHEMA_FILE)]
    pub schema: PathBuf,

    /// Path to the JSON definition file
    #[arg(short = 'd', long, global = true, default_value = "properties.json")]
    pub definition: PathBuf,

    /// Output in JSON format (for programmatic access)
    #[arg(long, global = true)]
    pub json_mode: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List defined and mandatory sids
    Sids,

    /// Print the serialized definition
    Show,

    /// Assign a property value, validate and save it
    Set {
        /// Property sid
        sid: String,

        /// Value (parsed as JSON, plain text otherwise)
        value: String,

        /// Assign attributes that are not form-safe
        #[arg(short, long)]
        trusted: bool,

        /// Extra attribute as name=value (repeatable)
        #[arg(short, long = "attr")]
        attrs: Vec<String>,
    },

    /// Bulk load form data from a JSON file
    Load {
        /// Path to the form data
        #[arg(short, long)]
        input: PathBuf,

        /// Top-level key holding the sid -> data mapping
        #[arg(short, long, default_value = FORM_NAME)]
        scope: String,
    },

    /// Validate every defined and mandatory property
    Validate,

    /// Check whether a legacy field is replaced by the property set
    Replaces {
        /// Legacy field name
        field: String,
    },

    /// Checksum of the serialized definition
    Hash,
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Execute the CLI with parsed arguments.
pub fn execute(cli: Cli) -> Result<(), AppError> {
    let ctx = Context::new(&cli)?;

    match cli.command {
        Some(Commands::Sids) | None => cmd_sids(&ctx),
        Some(Commands::Show) => cmd_show(&ctx),
        Some(Commands::Set {
            sid,
            value,
            trusted,
            attrs,
        }) => cmd_set(&ctx, &sid, &value, trusted, &attrs),
        Some(Commands::Load { input, scope }) => cmd_load(&ctx, &input, &scope),
        Some(Commands::Validate) => cmd_validate(&ctx),
        Some(Commands::Replaces { field }) => cmd_replaces(&ctx, &field),
        Some(Commands::Hash) => cmd_hash(&ctx),
    }
}
