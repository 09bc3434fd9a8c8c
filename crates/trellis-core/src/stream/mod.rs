//! # Statement Streams
//!
//! A lazy, forward-only sequence of statements over a pluggable source,
//! with an optional filter/transform map.
//!
//! ## Lookahead
//!
//! Without a map, `end`, `next` and `get` delegate to the source. With a map,
//! the stream must know whether an accepted element exists before it can
//! answer `end`, so it pulls ahead (skipping rejected elements) and caches
//! the mapped statement. `next` drops the cache, advances once and pulls
//! ahead again.
//!
//! Once a stream reports finished it stays finished. The source is dropped
//! with the stream, exactly once.

mod node_iterator;

use crate::primitives::PRINT_INDENT;
use crate::types::{Node, Statement, TrellisResult};
use std::io::Write;
use std::rc::Rc;

/// The capabilities a stream is bound to.
///
/// Finalization is `Drop`.
pub trait StreamSource {
    /// Whether the source has no current element.
    fn is_end(&mut self) -> bool;

    /// Move to the next element. Returns `true` when now finished.
    fn advance(&mut self) -> bool;

    /// The element under the source, if any.
    fn current(&self) -> Option<&Statement>;

    /// Auxiliary value associated with the current element.
    fn context(&self) -> Option<&Rc<Node>> {
        None
    }
}

type StatementMap<'a> = Box<dyn FnMut(&Statement) -> Option<Statement> + 'a>;

/// A lazy statement stream.
pub struct Stream<'a> {
    source: Box<dyn StreamSource + 'a>,
    map: Option<StatementMap<'a>>,
    current: Option<Statement>,
    finished: bool,
}

impl std::fmt::Debug for Stream<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Stream")
            .field("mapped", &self.map.is_some())
            .field("current", &self.current)
            .field("finished", &self.finished)
            .finish_non_exhaustive()
    }
}

/// Pull from `source` until `map` accepts an element or the source ends.
fn pull_mapped(source: &mut dyn StreamSource, map: &mut StatementMap<'_>) -> Option<Statement> {
    loop {
        if source.is_end() {
            return None;
        }
        if let Some(mapped) = map(source.current()?) {
            return Some(mapped);
        }
        if source.advance() {
            return None;
        }
    }
}

impl<'a> Stream<'a> {
    pub fn new(source: impl StreamSource + 'a) -> Self {
        Self {
            source: Box::new(source),
            map: None,
            current: None,
            finished: false,
        }
    }

    /// Stream over owned statements.
    pub fn from_statements<I>(statements: I) -> Self
    where
        I: IntoIterator<Item = Statement>,
        I::IntoIter: 'a,
    {
        Self::from_results(statements.into_iter().map(Ok))
    }

    /// Stream over fallible statements.
    ///
    /// The first error ends the stream and is logged.
    pub fn from_results<I>(results: I) -> Self
    where
        I: IntoIterator<Item = TrellisResult<Statement>>,
        I::IntoIter: 'a,
    {
        Self::new(IterSource::new(results.into_iter()))
    }

    /// A stream that is finished from the start.
    #[must_use]
    pub fn empty() -> Self {
        Self::from_statements(std::iter::empty())
    }

    /// Install a filter/transform. `None` drops an element, `Some`
    /// substitutes it.
    ///
    /// Replaces any earlier map and discards a cached lookahead.
    pub fn set_map(&mut self, map: impl FnMut(&Statement) -> Option<Statement> + 'a) {
        self.map = Some(Box::new(map));
        self.current = None;
    }

    fn look_ahead(&mut self) {
        if let Some(map) = self.map.as_mut() {
            self.current = pull_mapped(self.source.as_mut(), map);
            if self.current.is_none() {
                self.finished = true;
            }
        }
    }

    /// Whether the stream is finished. Sticky.
    pub fn end(&mut self) -> bool {
        if self.finished {
            return true;
        }
        if self.map.is_some() {
            if self.current.is_none() {
                self.look_ahead();
            }
        } else {
            self.finished = self.source.is_end();
        }
        self.finished
    }

    /// Advance to the next element. Returns `true` when now finished.
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> bool {
        if self.finished {
            return true;
        }
        self.current = None;
        if self.source.advance() {
            self.finished = true;
            return true;
        }
        self.look_ahead();
        self.finished
    }

    /// The current statement, valid until the next `next` or `end`.
    pub fn get(&mut self) -> Option<&Statement> {
        if self.finished {
            return None;
        }
        if self.map.is_some() {
            if self.current.is_none() {
                self.look_ahead();
            }
            return self.current.as_ref();
        }
        self.source.current()
    }

    /// Context of the current element. The map does not change it, but with
    /// a map the current element is the next accepted one.
    pub fn get_context(&mut self) -> Option<&Rc<Node>> {
        if self.finished {
            return None;
        }
        if self.map.is_some() && self.current.is_none() {
            self.look_ahead();
            if self.finished {
                return None;
            }
        }
        self.source.context()
    }

    /// Write every remaining statement, indented, one per line.
    ///
    /// Leaves the stream finished.
    pub fn print(&mut self, out: &mut impl Write) -> std::io::Result<()> {
        while !self.end() {
            if let Some(statement) = self.get() {
                writeln!(out, "{}{}", PRINT_INDENT, statement)?;
            }
            self.next();
        }
        Ok(())
    }

    /// Consume the stream as an iterator of owned statements.
    pub fn into_statements(self) -> Statements<'a> {
        Statements { stream: self }
    }
}

/// Iterator returned by `Stream::into_statements`.
#[derive(Debug)]
pub struct Statements<'a> {
    stream: Stream<'a>,
}

impl Iterator for Statements<'_> {
    type Item = Statement;

    fn next(&mut self) -> Option<Statement> {
        if self.stream.end() {
            return None;
        }
        let statement = self.stream.get()?.clone();
        self.stream.next();
        Some(statement)
    }
}

// =============================================================================
// ITERATOR SOURCE
// =============================================================================

struct IterSource<I> {
    results: I,
    current: Option<Statement>,
}

impl<I> IterSource<I>
where
    I: Iterator<Item = TrellisResult<Statement>>,
{
    fn new(results: I) -> Self {
        let mut source = Self {
            results,
            current: None,
        };
        source.pull();
        source
    }

    fn pull(&mut self) {
        self.current = match self.results.next() {
            Some(Ok(statement)) => Some(statement),
            Some(Err(e)) => {
                tracing::warn!(error = %e, "statement stream ended early");
                None
            }
            None => None,
        };
    }
}

impl<I> StreamSource for IterSource<I>
where
    I: Iterator<Item = TrellisResult<Statement>>,
{
    fn is_end(&mut self) -> bool {
        self.current.is_none()
    }

    fn advance(&mut self) -> bool {
        if self.current.is_some() {
            self.pull();
        }
        self.current.is_none()
    }

    fn current(&self) -> Option<&Statement> {
        self.current.as_ref()
    }
}
