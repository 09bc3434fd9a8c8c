//! # Storage Backends
//!
//! Concrete implementations of `HashBackend`:
//! - `MemoryHash`: volatile, ordered, keeps duplicate values in insertion order
//! - `RedbHash`: disk-backed redb multimap table

mod memory;
mod redb_hash;

pub use memory::MemoryHash;
pub use redb_hash::RedbHash;
