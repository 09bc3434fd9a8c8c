//! # Core Type Definitions
//!
//! This module contains the core types shared by every Trellis layer:
//! - RDF values (`Node`) and triples (`Statement`, `StatementField`)
//! - Error types (`TrellisError`, `TrellisResult`)
//!
//! ## Sharing Model
//!
//! Nodes inside a statement are held by `Rc`. Cloning a statement never
//! copies node content; streams and the node-iterator adapter hand out
//! shared nodes instead of owned copies. Nothing here is `Send`.

use crate::uri::Uri;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::rc::Rc;
use thiserror::Error;

// =============================================================================
// NODE
// =============================================================================

/// An RDF value: a resource, a blank node, or a literal.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Node {
    /// A resource identified by a Uri.
    Resource(Uri),
    /// A blank node with a local identifier.
    Blank(String),
    /// A literal value with an optional language tag.
    Literal {
        value: String,
        language: Option<String>,
    },
}

impl Node {
    /// Create a resource node from a URI string.
    pub fn resource(uri: &str) -> TrellisResult<Self> {
        Ok(Self::Resource(Uri::new(uri)?))
    }

    /// Create a blank node.
    #[must_use]
    pub fn blank(id: impl Into<String>) -> Self {
        Self::Blank(id.into())
    }

    /// Create a plain literal.
    #[must_use]
    pub fn literal(value: impl Into<String>) -> Self {
        Self::Literal {
            value: value.into(),
            language: None,
        }
    }

    /// Create a literal with a language tag.
    #[must_use]
    pub fn literal_with_language(value: impl Into<String>, language: impl Into<String>) -> Self {
        Self::Literal {
            value: value.into(),
            language: Some(language.into()),
        }
    }

    /// The Uri of a resource node.
    #[must_use]
    pub fn uri(&self) -> Option<&Uri> {
        match self {
            Self::Resource(uri) => Some(uri),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_resource(&self) -> bool {
        matches!(self, Self::Resource(_))
    }

    #[must_use]
    pub fn is_blank(&self) -> bool {
        matches!(self, Self::Blank(_))
    }

    #[must_use]
    pub fn is_literal(&self) -> bool {
        matches!(self, Self::Literal { .. })
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Resource(uri) => write!(f, "[{}]", uri),
            Self::Blank(id) => write!(f, "({})", id),
            Self::Literal {
                value,
                language: None,
            } => write!(f, "\"{}\"", value),
            Self::Literal {
                value,
                language: Some(lang),
            } => write!(f, "\"{}\"@{}", value, lang),
        }
    }
}

impl From<Uri> for Node {
    fn from(uri: Uri) -> Self {
        Self::Resource(uri)
    }
}

// =============================================================================
// STATEMENT
// =============================================================================

/// Selects one of the three node slots of a statement.
///
/// The discriminants are bit values so that a set of fields can be
/// expressed as a mask by callers that need one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum StatementField {
    Subject = 1,
    Predicate = 2,
    Object = 4,
}

impl TryFrom<u32> for StatementField {
    type Error = TrellisError;

    fn try_from(code: u32) -> Result<Self, Self::Error> {
        match code {
            1 => Ok(Self::Subject),
            2 => Ok(Self::Predicate),
            4 => Ok(Self::Object),
            other => Err(TrellisError::InvalidArgument(format!(
                "illegal statement field {}",
                other
            ))),
        }
    }
}

/// An RDF triple.
///
/// Fields are shared nodes. A `Clone` is three refcount increments.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Statement {
    pub subject: Rc<Node>,
    pub predicate: Rc<Node>,
    pub object: Rc<Node>,
}

impl Statement {
    /// Create a statement from shared nodes.
    #[must_use]
    pub fn new(subject: Rc<Node>, predicate: Rc<Node>, object: Rc<Node>) -> Self {
        Self {
            subject,
            predicate,
            object,
        }
    }

    /// Create a statement taking ownership of three nodes.
    #[must_use]
    pub fn from_nodes(subject: Node, predicate: Node, object: Node) -> Self {
        Self::new(Rc::new(subject), Rc::new(predicate), Rc::new(object))
    }

    /// Borrow the node at `field`.
    #[must_use]
    pub fn get(&self, field: StatementField) -> &Rc<Node> {
        match field {
            StatementField::Subject => &self.subject,
            StatementField::Predicate => &self.predicate,
            StatementField::Object => &self.object,
        }
    }

    /// Replace the node at `field`, returning the previous one.
    pub fn set(&mut self, field: StatementField, node: Rc<Node>) -> Rc<Node> {
        let slot = match field {
            StatementField::Subject => &mut self.subject,
            StatementField::Predicate => &mut self.predicate,
            StatementField::Object => &mut self.object,
        };
        std::mem::replace(slot, node)
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{{{}, {}, {}}}",
            self.subject, self.predicate, self.object
        )
    }
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors that can occur in the Trellis core.
///
/// - No silent failures outside streams
/// - Use `TrellisResult<T>` for fallible operations
/// - Programming defects (illegal field selectors, cursor flags) are
///   unrepresentable in the typed API; raw codes map to `InvalidArgument`
#[derive(Debug, Error)]
pub enum TrellisError {
    /// A backend resource could not be acquired, used, or released.
    #[error("Resource error: {0}")]
    Resource(String),

    /// The requested key or backend does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// A conflicting registration or a put that refused to overwrite.
    #[error("Duplicate: {0}")]
    Duplicate(String),

    /// Malformed input: bulk records, decoded values, cursor protocol.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The backend does not provide this operation.
    #[error("Not supported: {0}")]
    NotSupported(&'static str),

    /// A serialization or deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Result alias for core operations.
pub type TrellisResult<T> = Result<T, TrellisError>;

// =============================================================================
// TESTS
// =============================================================================
