//! # Fixed Constants
//!
//! Names and token sets compiled into the core. These are immutable at
//! runtime and shared by the registry, the hash layer and the model.

/// Backend used when no name is given to `HashRegistry::get`.
pub const DEFAULT_BACKEND: &str = "memory";

/// Name of the in-memory backend.
pub const MEMORY_BACKEND: &str = "memory";

/// Name of the redb file backend.
pub const REDB_BACKEND: &str = "redb";

/// Tokens decoded as `true` by `Hash::get_as_boolean` (case-insensitive).
pub const TRUE_TOKENS: &[&str] = &["yes", "true", "1", "on"];

/// Tokens decoded as `false` by `Hash::get_as_boolean` (case-insensitive).
pub const FALSE_TOKENS: &[&str] = &["no", "false", "0", "off"];

/// Separator between key and value in `Hash::from_string` records.
pub const RECORD_SEPARATOR: char = '=';

/// Default permission bits passed to file backends.
pub const DEFAULT_MODE: u32 = 0o644;

/// Prefix written before each statement by `Stream::print`.
pub const PRINT_INDENT: &str = "  ";

/// Model index names. Each becomes one hash.
pub const INDEX_SP2O: &str = "sp2o";
pub const INDEX_PO2S: &str = "po2s";
pub const INDEX_SO2P: &str = "so2p";

/// File extension appended to model index identifiers on the redb backend.
pub const REDB_EXTENSION: &str = "redb";

/// Base identifier used by `Model::new` when none is given.
pub const DEFAULT_MODEL_NAME: &str = "trellis";
