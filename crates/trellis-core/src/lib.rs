//! # trellis-core
//!
//! An embeddable RDF triple store built on a pluggable key/value layer.
//!
//! ## Layers
//!
//! - `world` owns the backend registry; hashes are created through it
//! - `hash` is the generic key/value layer: put/get with duplicate values,
//!   cursors, bulk import, typed decoding
//! - `storage` holds the concrete backends (`memory`, `redb`)
//! - `stream` provides lazy statement streams and the node-iterator adapter
//! - `model` stores statements in three hash indexes and answers queries
//!   as streams
//!
//! ## Architectural Constraints
//!
//! - Single-threaded: nodes are shared with `Rc`, nothing is `Send`
//! - Ordered: every backend iterates keys in ascending byte order
//! - No async, no network dependencies (pure Rust)

// =============================================================================
// MODULES
// =============================================================================

pub mod hash;
pub mod model;
pub mod primitives;
pub mod storage;
pub mod stream;
pub mod types;
pub mod uri;
pub mod world;

// =============================================================================
// RE-EXPORTS: Core Types
// =============================================================================

pub use types::{Node, Statement, StatementField, TrellisError, TrellisResult};
pub use uri::Uri;

// =============================================================================
// RE-EXPORTS: Hash Layer
// =============================================================================

pub use hash::{
    BackendCursor, CursorFlag, CursorState, Hash, HashBackend, HashCursor, HashDatum, HashFactory,
    HashRegistry, OpenOptions, PutFlags,
};
pub use storage::{MemoryHash, RedbHash};
pub use world::World;

// =============================================================================
// RE-EXPORTS: Streams and Model
// =============================================================================

pub use model::Model;
pub use stream::{Statements, Stream, StreamSource};
