//! # CLI Command Implementations
//!
//! This module contains the actual implementations of CLI commands.
//! Every command writes its output to the `out` writer it is given.

use crate::config::Settings;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use trellis_core::{
    Hash, Model, Node, OpenOptions, PutFlags, Statement, TrellisError, TrellisResult, World,
};

// =============================================================================
// FILE SIZE LIMITS
// =============================================================================

/// Maximum file size for bulk import (100 MB).
const MAX_IMPORT_FILE_SIZE: u64 = 100 * 1024 * 1024;

/// Prefix marking a blank node on the command line.
const BLANK_PREFIX: &str = "_:";

fn write_error(e: std::io::Error) -> TrellisError {
    TrellisError::Resource(format!("Write output: {}", e))
}

fn print_json(out: &mut impl Write, value: &serde_json::Value) -> TrellisResult<()> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|e| TrellisError::Serialization(e.to_string()))?;
    writeln!(out, "{}", text).map_err(write_error)
}

/// Validate an input path: canonical, existing, a regular file, within
/// the size limit.
fn validate_input_file(path: &Path) -> TrellisResult<PathBuf> {
    let canonical = path.canonicalize().map_err(|e| {
        TrellisError::Resource(format!("Invalid file path '{}': {}", path.display(), e))
    })?;

    if !canonical.is_file() {
        return Err(TrellisError::Resource(format!(
            "Path '{}' is not a regular file",
            path.display()
        )));
    }

    let metadata = std::fs::metadata(&canonical)
        .map_err(|e| TrellisError::Resource(format!("Cannot read file metadata: {}", e)))?;
    if metadata.len() > MAX_IMPORT_FILE_SIZE {
        return Err(TrellisError::InvalidArgument(format!(
            "File size {} bytes exceeds maximum allowed {} bytes",
            metadata.len(),
            MAX_IMPORT_FILE_SIZE
        )));
    }

    Ok(canonical)
}

/// Parse a command-line node: `_:id` is a blank node, anything else a URI.
pub fn parse_node(text: &str) -> TrellisResult<Node> {
    match text.strip_prefix(BLANK_PREFIX) {
        Some("") => Err(TrellisError::InvalidArgument(
            "blank node needs an identifier after '_:'".to_string(),
        )),
        Some(id) => Ok(Node::blank(id)),
        None => Node::resource(text),
    }
}

/// Open the configured hash.
pub fn open_hash(world: &World, settings: &Settings) -> TrellisResult<Hash> {
    let mut hash = world.new_hash(Some(&settings.backend))?;
    hash.open(settings.identifier()?, &OpenOptions::default())?;
    tracing::debug!(backend = %settings.backend, database = ?settings.database, "hash opened");
    Ok(hash)
}

/// Open the configured model.
pub fn open_model(world: &World, settings: &Settings) -> TrellisResult<Model> {
    let base = settings.model_base()?;
    Model::new(world, Some(&settings.backend), Some(&base))
}

// =============================================================================
// BACKENDS COMMAND
// =============================================================================

/// List registered backends.
pub fn cmd_backends(world: &World, json: bool, out: &mut impl Write) -> TrellisResult<()> {
    let names: Vec<&str> = world.registry().names().collect();
    if json {
        return print_json(out, &serde_json::json!({ "backends": names }));
    }
    for name in names {
        writeln!(out, "{}", name).map_err(write_error)?;
    }
    Ok(())
}

// =============================================================================
// HASH COMMANDS
// =============================================================================

/// Store a value.
pub fn cmd_put(
    world: &World,
    settings: &Settings,
    key: &str,
    value: &str,
    duplicate: bool,
    quiet: bool,
    out: &mut impl Write,
) -> TrellisResult<()> {
    let mut hash = open_hash(world, settings)?;
    let flags = if duplicate {
        PutFlags::DUPLICATE
    } else {
        PutFlags::REPLACE
    };
    hash.put(key, value, flags)?;
    hash.sync()?;
    tracing::info!(key, duplicate, "stored value");

    if !quiet {
        writeln!(out, "Stored '{}'", key).map_err(write_error)?;
    }
    hash.close()
}

/// Print the first value under a key.
pub fn cmd_get(
    world: &World,
    settings: &Settings,
    key: &str,
    json: bool,
    out: &mut impl Write,
) -> TrellisResult<()> {
    let hash = open_hash(world, settings)?;
    let value = hash.get(key)?;
    if json {
        return print_json(out, &serde_json::json!({ "key": key, "value": value }));
    }
    writeln!(out, "{}", value).map_err(write_error)
}

/// Print every value under a key.
pub fn cmd_get_all(
    world: &World,
    settings: &Settings,
    key: &str,
    json: bool,
    out: &mut impl Write,
) -> TrellisResult<()> {
    let hash = open_hash(world, settings)?;
    let values: Vec<String> = hash.get_all(key)?.map(|v| v.to_string()).collect();
    if values.is_empty() {
        return Err(TrellisError::NotFound(format!("key '{}'", key)));
    }
    if json {
        return print_json(out, &serde_json::json!({ "key": key, "values": values }));
    }
    for value in values {
        writeln!(out, "{}", value).map_err(write_error)?;
    }
    Ok(())
}

/// Remove a key.
pub fn cmd_delete(
    world: &World,
    settings: &Settings,
    key: &str,
    quiet: bool,
    out: &mut impl Write,
) -> TrellisResult<()> {
    let mut hash = open_hash(world, settings)?;
    if !hash.delete(key)? {
        return Err(TrellisError::NotFound(format!("key '{}'", key)));
    }
    hash.sync()?;
    if !quiet {
        writeln!(out, "Deleted '{}'", key).map_err(write_error)?;
    }
    hash.close()
}

/// List distinct keys.
pub fn cmd_keys(
    world: &World,
    settings: &Settings,
    json: bool,
    out: &mut impl Write,
) -> TrellisResult<()> {
    let hash = open_hash(world, settings)?;
    if json {
        let keys: Vec<String> = hash.keys()?.map(|k| k.to_string()).collect();
        return print_json(out, &serde_json::json!({ "keys": keys }));
    }
    for key in hash.keys()? {
        writeln!(out, "{}", key).map_err(write_error)?;
    }
    Ok(())
}

/// Print every pair.
pub fn cmd_dump(world: &World, settings: &Settings, out: &mut impl Write) -> TrellisResult<()> {
    let hash = open_hash(world, settings)?;
    hash.print(out)
}

/// Bulk load `key=value` records.
pub fn cmd_import(
    world: &World,
    settings: &Settings,
    file: &Path,
    quiet: bool,
    out: &mut impl Write,
) -> TrellisResult<()> {
    let validated = validate_input_file(file)?;
    let text = std::fs::read_to_string(&validated)
        .map_err(|e| TrellisError::Resource(format!("Read file: {}", e)))?;

    let mut hash = open_hash(world, settings)?;
    let count = hash.from_string(&text)?;
    hash.sync()?;
    tracing::info!(count, file = %validated.display(), "imported records");

    if !quiet {
        writeln!(out, "Imported {} records", count).map_err(write_error)?;
    }
    hash.close()
}

// =============================================================================
// MODEL COMMANDS
// =============================================================================

/// Add one statement.
#[allow(clippy::too_many_arguments)]
pub fn cmd_add(
    world: &World,
    settings: &Settings,
    subject: &str,
    predicate: &str,
    object: &str,
    literal: bool,
    quiet: bool,
    out: &mut impl Write,
) -> TrellisResult<()> {
    let object = if literal {
        Node::literal(object)
    } else {
        parse_node(object)?
    };
    let statement = Statement::from_nodes(parse_node(subject)?, Node::resource(predicate)?, object);

    let mut model = open_model(world, settings)?;
    let added = model.add_statement(&statement)?;
    model.sync()?;

    if !quiet {
        let message = if added { "Added" } else { "Already present" };
        writeln!(out, "{} {}", message, statement).map_err(write_error)?;
    }
    model.close()
}

/// Print the whole model.
pub fn cmd_print(world: &World, settings: &Settings, out: &mut impl Write) -> TrellisResult<()> {
    let model = open_model(world, settings)?;
    model.print(out)
}

/// Print `{subject, predicate, ?}` statements.
pub fn cmd_targets(
    world: &World,
    settings: &Settings,
    subject: &str,
    predicate: &str,
    json: bool,
    out: &mut impl Write,
) -> TrellisResult<()> {
    let subject = Rc::new(parse_node(subject)?);
    let predicate = Rc::new(Node::resource(predicate)?);
    let model = open_model(world, settings)?;

    if json {
        let targets: Vec<String> = model
            .targets(&subject, &predicate)?
            .iter()
            .map(|node| node.to_string())
            .collect();
        return print_json(out, &serde_json::json!({ "targets": targets }));
    }

    let mut stream = model.targets_stream(&subject, &predicate)?;
    stream.print(out).map_err(write_error)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn parse_node_forms() {
        assert_eq!(parse_node("_:b1").expect("blank"), Node::blank("b1"));
        let uri = parse_node("http://example.org/x").expect("uri");
        assert!(uri.is_resource());
        assert!(matches!(
            parse_node("_:"),
            Err(TrellisError::InvalidArgument(_))
        ));
        assert!(matches!(
            parse_node(""),
            Err(TrellisError::InvalidArgument(_))
        ));
    }
}
