//! # Model
//!
//! A triple store over three hash indexes:
//!
//! | Index  | Key                 | Values    |
//! |--------|---------------------|-----------|
//! | `sp2o` | subject, predicate  | objects   |
//! | `po2s` | predicate, object   | subjects  |
//! | `so2p` | subject, object     | predicates|
//!
//! Keys and values are postcard-encoded nodes. Query results leave the
//! model as node iterators and are turned back into statements by the
//! node-iterator stream adapter.

use crate::hash::{Hash, HashDatum, OpenOptions, PutFlags, Values};
use crate::primitives::{
    DEFAULT_MODEL_NAME, INDEX_PO2S, INDEX_SO2P, INDEX_SP2O, REDB_BACKEND, REDB_EXTENSION,
};
use crate::stream::Stream;
use crate::types::{Node, Statement, StatementField, TrellisError, TrellisResult};
use crate::world::World;
use std::io::Write;
use std::rc::Rc;

fn encode_key(first: &Node, second: &Node) -> TrellisResult<Vec<u8>> {
    postcard::to_allocvec(&(first, second)).map_err(|e| TrellisError::Serialization(e.to_string()))
}

fn encode_node(node: &Node) -> TrellisResult<Vec<u8>> {
    postcard::to_allocvec(node).map_err(|e| TrellisError::Serialization(e.to_string()))
}

fn decode_node(bytes: &[u8]) -> TrellisResult<Node> {
    postcard::from_bytes(bytes).map_err(|e| TrellisError::Serialization(e.to_string()))
}

fn decode_key(bytes: &[u8]) -> TrellisResult<(Node, Node)> {
    postcard::from_bytes(bytes).map_err(|e| TrellisError::Serialization(e.to_string()))
}

/// Rebuild a statement from one `sp2o` pair.
fn decode_statement(key: &HashDatum, value: &HashDatum) -> TrellisResult<Statement> {
    let (subject, predicate) = decode_key(key.data())?;
    let object = decode_node(value.data())?;
    Ok(Statement::from_nodes(subject, predicate, object))
}

/// Decoded values of one index key. A value that does not decode ends
/// the iteration and is logged.
fn decoded(values: Values<'_>) -> impl Iterator<Item = Rc<Node>> + '_ {
    values.map_while(|value| match decode_node(value.data()) {
        Ok(node) => Some(Rc::new(node)),
        Err(e) => {
            tracing::warn!(error = %e, "undecodable node in model index");
            None
        }
    })
}

/// Append `value` under `key`, returning the values that were there before.
fn put_remembering(index: &mut Hash, key: &[u8], value: &[u8]) -> TrellisResult<Vec<HashDatum>> {
    let before: Vec<HashDatum> = index.get_all(key)?.collect();
    index.put(key, value, PutFlags::DUPLICATE)?;
    Ok(before)
}

/// Put back exactly `before` under `key`.
fn restore(index: &mut Hash, key: &[u8], before: &[HashDatum]) -> TrellisResult<()> {
    index.delete(key)?;
    for value in before {
        index.put(key, value.data(), PutFlags::DUPLICATE)?;
    }
    Ok(())
}

/// A statement store.
#[derive(Debug)]
pub struct Model {
    sp2o: Hash,
    po2s: Hash,
    so2p: Hash,
}

impl Model {
    /// Create a model on `backend` (default backend if `None`).
    ///
    /// `identifier` is the base name of the three index resources.
    pub fn new(
        world: &World,
        backend: Option<&str>,
        identifier: Option<&str>,
    ) -> TrellisResult<Self> {
        Self::with_options(world, backend, identifier, &OpenOptions::default())
    }

    pub fn with_options(
        world: &World,
        backend: Option<&str>,
        identifier: Option<&str>,
        options: &OpenOptions,
    ) -> TrellisResult<Self> {
        let factory = world.registry().get(backend)?;
        let base = identifier.unwrap_or(DEFAULT_MODEL_NAME);
        let open = |index: &str| -> TrellisResult<Hash> {
            let mut hash = world.new_hash_from_factory(factory);
            let name = if factory.name() == REDB_BACKEND {
                format!("{}-{}.{}", base, index, REDB_EXTENSION)
            } else {
                format!("{}-{}", base, index)
            };
            hash.open(&name, options)?;
            Ok(hash)
        };
        let model = Self {
            sp2o: open(INDEX_SP2O)?,
            po2s: open(INDEX_PO2S)?,
            so2p: open(INDEX_SO2P)?,
        };
        tracing::debug!(backend = factory.name(), base, "model opened");
        Ok(model)
    }

    /// Add a statement. Returns `false` if it was already present.
    ///
    /// The three index writes are separate backend operations. When one
    /// fails, the indexes already written get their previous values back
    /// before the error is returned.
    pub fn add_statement(&mut self, statement: &Statement) -> TrellisResult<bool> {
        if self.contains_statement(statement)? {
            return Ok(false);
        }
        let Statement {
            subject,
            predicate,
            object,
        } = statement;

        let writes = [
            (encode_key(subject, predicate)?, encode_node(object)?),
            (encode_key(predicate, object)?, encode_node(subject)?),
            (encode_key(subject, object)?, encode_node(predicate)?),
        ];
        let mut indexes = [&mut self.sp2o, &mut self.po2s, &mut self.so2p];
        let mut previous: Vec<Vec<HashDatum>> = Vec::with_capacity(writes.len());

        for (i, (key, value)) in writes.iter().enumerate() {
            match put_remembering(indexes[i], key, value) {
                Ok(before) => previous.push(before),
                Err(e) => {
                    for (j, before) in previous.iter().enumerate() {
                        if let Err(undo) = restore(indexes[j], &writes[j].0, before) {
                            tracing::warn!(error = %undo, "model index rollback failed");
                        }
                    }
                    return Err(e);
                }
            }
        }
        Ok(true)
    }

    /// Drain `stream` into the model. Returns the number of new statements.
    pub fn add_statements(&mut self, stream: &mut Stream<'_>) -> TrellisResult<usize> {
        let mut added = 0usize;
        while !stream.end() {
            if let Some(statement) = stream.get() {
                let statement = statement.clone();
                if self.add_statement(&statement)? {
                    added += 1;
                }
            }
            stream.next();
        }
        Ok(added)
    }

    pub fn contains_statement(&self, statement: &Statement) -> TrellisResult<bool> {
        let key = encode_key(&statement.subject, &statement.predicate)?;
        let object = encode_node(&statement.object)?;
        Ok(self
            .sp2o
            .get_all(key)?
            .any(|value| value.data() == object.as_slice()))
    }

    /// Number of statements.
    pub fn size(&self) -> TrellisResult<usize> {
        Ok(self.sp2o.entries()?.count())
    }

    fn nodes(index: &Hash, first: &Node, second: &Node) -> TrellisResult<Vec<Rc<Node>>> {
        index
            .get_all(encode_key(first, second)?)?
            .map(|value| decode_node(value.data()).map(Rc::new))
            .collect()
    }

    /// Objects of statements with this subject and predicate.
    pub fn targets(&self, source: &Rc<Node>, arc: &Rc<Node>) -> TrellisResult<Vec<Rc<Node>>> {
        Self::nodes(&self.sp2o, source, arc)
    }

    /// Subjects of statements with this predicate and object.
    pub fn sources(&self, arc: &Rc<Node>, target: &Rc<Node>) -> TrellisResult<Vec<Rc<Node>>> {
        Self::nodes(&self.po2s, arc, target)
    }

    /// Predicates of statements with this subject and object.
    pub fn arcs(&self, source: &Rc<Node>, target: &Rc<Node>) -> TrellisResult<Vec<Rc<Node>>> {
        Self::nodes(&self.so2p, source, target)
    }

    /// Statements `{source, arc, ?}`.
    pub fn targets_stream(&self, source: &Rc<Node>, arc: &Rc<Node>) -> TrellisResult<Stream<'_>> {
        let values = self.sp2o.get_all(encode_key(source, arc)?)?;
        let prototype = Statement::new(Rc::clone(source), Rc::clone(arc), Rc::clone(source));
        Ok(Stream::from_node_iterator(
            decoded(values),
            &prototype,
            StatementField::Object,
        ))
    }

    /// Statements `{?, arc, target}`.
    pub fn sources_stream(&self, arc: &Rc<Node>, target: &Rc<Node>) -> TrellisResult<Stream<'_>> {
        let values = self.po2s.get_all(encode_key(arc, target)?)?;
        let prototype = Statement::new(Rc::clone(target), Rc::clone(arc), Rc::clone(target));
        Ok(Stream::from_node_iterator(
            decoded(values),
            &prototype,
            StatementField::Subject,
        ))
    }

    /// Statements `{source, ?, target}`.
    pub fn arcs_stream(&self, source: &Rc<Node>, target: &Rc<Node>) -> TrellisResult<Stream<'_>> {
        let values = self.so2p.get_all(encode_key(source, target)?)?;
        let prototype = Statement::new(Rc::clone(source), Rc::clone(source), Rc::clone(target));
        Ok(Stream::from_node_iterator(
            decoded(values),
            &prototype,
            StatementField::Predicate,
        ))
    }

    /// Every statement, in `sp2o` key order.
    pub fn as_stream(&self) -> TrellisResult<Stream<'_>> {
        let entries = self.sp2o.entries()?;
        let statements = entries.map(|(key, value)| decode_statement(&key, &value));
        Ok(Stream::from_results(statements))
    }

    /// Write every statement inside `[[` `]]` brackets.
    pub fn print(&self, out: &mut impl Write) -> TrellisResult<()> {
        let io = |e: std::io::Error| TrellisError::Resource(e.to_string());
        writeln!(out, "[[").map_err(io)?;
        self.as_stream()?.print(out).map_err(io)?;
        writeln!(out, "]]").map_err(io)
    }

    pub fn sync(&mut self) -> TrellisResult<()> {
        self.sp2o.sync()?;
        self.po2s.sync()?;
        self.so2p.sync()
    }

    /// Close all three indexes. Every index is closed even if one fails.
    pub fn close(mut self) -> TrellisResult<()> {
        let results = [self.sp2o.close(), self.po2s.close(), self.so2p.close()];
        results.into_iter().collect()
    }
}
