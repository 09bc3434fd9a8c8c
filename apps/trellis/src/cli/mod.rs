//! # Trellis CLI Module
//!
//! This module implements the CLI interface for Trellis.
//!
//! ## Available Commands
//!
//! Hash commands operate on the database file directly:
//! - `backends` - List registered storage backends
//! - `put` / `get` / `get-all` / `delete` - Single-key operations
//! - `keys` - List distinct keys
//! - `dump` - Print every key/value pair
//! - `import` - Bulk load `key=value` records from a file
//!
//! Model commands store statements in three index files next to the
//! database (`<base>-sp2o.redb`, ...):
//! - `add` - Add a statement
//! - `print` - Print every statement
//! - `targets` - Objects for a subject and predicate

mod commands;

use crate::config::Settings;
use clap::{Parser, Subcommand};
use std::io::Write;
use std::path::PathBuf;
use trellis_core::{TrellisResult, World};

pub use commands::*;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// Trellis - embeddable triple store
///
/// Key/value hashes over pluggable backends, and a statement model on top.
#[derive(Parser, Debug)]
#[command(name = "trellis")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable debug logging (when TRELLIS_LOG is unset)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress confirmation messages
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to the database
    #[arg(short = 'D', long, global = true)]
    pub database: Option<PathBuf>,

    /// Storage backend name ("redb" or "memory")
    #[arg(short = 'B', long, global = true)]
    pub backend: Option<String>,

    /// TOML configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Output in JSON format (for programmatic access)
    #[arg(long, global = true)]
    pub json: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List registered storage backends
    Backends,

    /// Store a value under a key
    Put {
        key: String,
        value: String,

        /// Keep existing values and add this one
        #[arg(short, long)]
        duplicate: bool,
    },

    /// Print the first value under a key
    Get { key: String },

    /// Print every value under a key
    GetAll { key: String },

    /// Remove a key and all its values
    Delete { key: String },

    /// List distinct keys
    Keys,

    /// Print every key/value pair
    Dump,

    /// Bulk load newline-delimited key=value records
    Import {
        /// Path to the input file
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Add a statement to the model
    Add {
        /// Subject URI, or _:id for a blank node
        subject: String,
        /// Predicate URI
        predicate: String,
        /// Object URI, blank node, or literal with --literal
        object: String,

        /// Treat the object as a literal
        #[arg(short, long)]
        literal: bool,
    },

    /// Print every statement in the model
    Print,

    /// Print statements matching a subject and predicate
    Targets { subject: String, predicate: String },
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Execute the CLI, writing command output to `out`.
pub fn execute(cli: &Cli, settings: &Settings, out: &mut impl Write) -> TrellisResult<()> {
    let world = World::new()?;
    let json = cli.json;
    let quiet = cli.quiet;

    match &cli.command {
        Commands::Backends => cmd_backends(&world, json, out),
        Commands::Put {
            key,
            value,
            duplicate,
        } => cmd_put(&world, settings, key, value, *duplicate, quiet, out),
        Commands::Get { key } => cmd_get(&world, settings, key, json, out),
        Commands::GetAll { key } => cmd_get_all(&world, settings, key, json, out),
        Commands::Delete { key } => cmd_delete(&world, settings, key, quiet, out),
        Commands::Keys => cmd_keys(&world, settings, json, out),
        Commands::Dump => cmd_dump(&world, settings, out),
        Commands::Import { file } => cmd_import(&world, settings, file, quiet, out),
        Commands::Add {
            subject,
            predicate,
            object,
            literal,
        } => cmd_add(
            &world, settings, subject, predicate, object, *literal, quiet, out,
        ),
        Commands::Print => cmd_print(&world, settings, out),
        Commands::Targets { subject, predicate } => {
            cmd_targets(&world, settings, subject, predicate, json, out)
        }
    }
}
