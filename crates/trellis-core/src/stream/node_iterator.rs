//! Node iterator to statement stream adapter.
//!
//! Turns a sequence of nodes into statements by substituting each node into
//! one field of a single template statement. `Stream::get` hands out that
//! same template on every pull; consumers that keep a statement clone it.

use super::{Stream, StreamSource};
use crate::types::{Node, Statement, StatementField};
use std::rc::Rc;

struct NodeIteratorSource<I> {
    nodes: I,
    template: Statement,
    field: StatementField,
    context: Option<Rc<Node>>,
    finished: bool,
}

impl<I> NodeIteratorSource<I>
where
    I: Iterator<Item = (Rc<Node>, Option<Rc<Node>>)>,
{
    fn new(nodes: I, prototype: &Statement, field: StatementField) -> Self {
        let mut source = Self {
            nodes,
            template: prototype.clone(),
            field,
            context: None,
            finished: false,
        };
        source.pull();
        source
    }

    fn pull(&mut self) {
        match self.nodes.next() {
            Some((node, context)) => {
                self.template.set(self.field, node);
                self.context = context;
            }
            None => {
                self.context = None;
                self.finished = true;
            }
        }
    }
}

impl<I> StreamSource for NodeIteratorSource<I>
where
    I: Iterator<Item = (Rc<Node>, Option<Rc<Node>>)>,
{
    fn is_end(&mut self) -> bool {
        self.finished
    }

    fn advance(&mut self) -> bool {
        if !self.finished {
            self.pull();
        }
        self.finished
    }

    fn current(&self) -> Option<&Statement> {
        (!self.finished).then_some(&self.template)
    }

    fn context(&self) -> Option<&Rc<Node>> {
        self.context.as_ref()
    }
}

impl<'a> Stream<'a> {
    /// Stream of `prototype` with `field` replaced by each node in turn.
    pub fn from_node_iterator<I>(nodes: I, prototype: &Statement, field: StatementField) -> Self
    where
        I: IntoIterator<Item = Rc<Node>>,
        I::IntoIter: 'a,
    {
        Self::from_node_iterator_with_context(
            nodes.into_iter().map(|node| (node, None)),
            prototype,
            field,
        )
    }

    /// Like `from_node_iterator`, carrying a per-node context value that
    /// `Stream::get_context` exposes.
    pub fn from_node_iterator_with_context<I>(
        pairs: I,
        prototype: &Statement,
        field: StatementField,
    ) -> Self
    where
        I: IntoIterator<Item = (Rc<Node>, Option<Rc<Node>>)>,
        I::IntoIter: 'a,
    {
        Self::new(NodeIteratorSource::new(pairs.into_iter(), prototype, field))
    }
}
