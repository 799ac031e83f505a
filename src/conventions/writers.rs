use super::{writer_failure, Convention, TypeMatch};
use crate::error::{BoxError, MappingError};
use crate::nodes::{GraphNode, Node, NodeType};
use crate::options::Options;
use crate::reflection::Reflect;
use crate::value::Value;
use std::sync::Arc;

pub type WriterPredicateFn =
    dyn Fn(&GraphNode<'_>, &dyn Node, &Options) -> Result<bool, BoxError> + Send + Sync;

/// Writes a graph node into a target node.
pub type NodeWriterFn =
    dyn Fn(&GraphNode<'_>, &mut dyn Node, &Options) -> Result<(), BoxError> + Send + Sync;

/// Produces the value written for a non-null graph value.
pub type ValueWriterFn =
    dyn Fn(&Value, &GraphNode<'_>, &Options) -> Result<Option<Value>, BoxError> + Send + Sync;

type NodeWriter = Convention<WriterPredicateFn, NodeWriterFn>;
type ValueWriter = Convention<WriterPredicateFn, ValueWriterFn>;

impl<H: ?Sized> Convention<WriterPredicateFn, H> {
    fn applies(
        &self,
        source: &GraphNode<'_>,
        target: &dyn Node,
        options: &Options,
    ) -> Result<bool, MappingError> {
        if !self.type_match.matches(source) {
            return Ok(false);
        }
        match &self.when {
            Some(predicate) => {
                predicate(source, target, options).map_err(|e| writer_failure(&source.path(), e))
            }
            None => Ok(true),
        }
    }
}

/// The writer side of the conventions pipeline.
#[derive(Clone, Default)]
pub struct WriterConventions {
    writers: Vec<NodeWriter>,
    value_writers: Vec<ValueWriter>,
    visitors: Vec<NodeWriter>,
}

impl WriterConventions {
    pub(crate) fn add_writer(
        &mut self,
        type_match: TypeMatch,
        when: Option<Arc<WriterPredicateFn>>,
        writer: Arc<NodeWriterFn>,
    ) {
        self.writers.push(Convention::new(type_match, when, writer));
    }

    pub(crate) fn add_value_writer<T: Reflect>(
        &mut self,
        when: Option<Arc<WriterPredicateFn>>,
        writer: impl Fn(&T, &GraphNode<'_>, &Options) -> Result<Option<Value>, BoxError>
            + Send
            + Sync
            + 'static,
    ) {
        let handler: Arc<ValueWriterFn> =
            Arc::new(move |raw: &Value, source: &GraphNode<'_>, options: &Options| {
                let value = T::from_value(Some(raw.clone()))?;
                writer(&value, source, options)
            });
        self.value_writers
            .push(Convention::new(TypeMatch::nullable::<T>(), when, handler));
    }

    pub(crate) fn add_visitor(
        &mut self,
        type_match: TypeMatch,
        when: Option<Arc<WriterPredicateFn>>,
        visitor: Arc<NodeWriterFn>,
    ) {
        self.visitors.push(Convention::new(type_match, when, visitor));
    }

    pub fn writers(&self) -> &[Convention<WriterPredicateFn, NodeWriterFn>] {
        &self.writers
    }

    pub fn value_writers(&self) -> &[Convention<WriterPredicateFn, ValueWriterFn>] {
        &self.value_writers
    }

    pub fn visitors(&self) -> &[Convention<WriterPredicateFn, NodeWriterFn>] {
        &self.visitors
    }

    /// Runs the most recently registered matching writer, node writers
    /// before value writers. Returns `false` when none matched.
    pub(crate) fn write(
        &self,
        source: &GraphNode<'_>,
        target: &mut dyn Node,
        options: &Options,
    ) -> Result<bool, MappingError> {
        for writer in self.writers.iter().rev() {
            if writer.applies(source, &*target, options)? {
                log::debug!("writer convention handles {}", source.path());
                (writer.handler)(source, target, options)
                    .map_err(|e| writer_failure(&source.path(), e))?;
                return Ok(true);
            }
        }
        for writer in self.value_writers.iter().rev() {
            if !writer.applies(source, &*target, options)? {
                continue;
            }
            let Some(raw) = source.raw_value()? else {
                continue;
            };
            log::debug!("value writer handles {}", source.path());
            let value = (writer.handler)(&raw, source, options)
                .map_err(|e| writer_failure(&source.path(), e))?;
            if target.node_type() != NodeType::Value {
                target.set_node_type(NodeType::Value)?;
            }
            target.set_value(value)?;
            return Ok(true);
        }
        Ok(false)
    }

    /// Runs every matching visitor in registration order.
    pub(crate) fn visit(
        &self,
        source: &GraphNode<'_>,
        target: &mut dyn Node,
        options: &Options,
    ) -> Result<(), MappingError> {
        for visitor in &self.visitors {
            if visitor.applies(source, &*target, options)? {
                (visitor.handler)(source, target, options)
                    .map_err(|e| writer_failure(&source.path(), e))?;
            }
        }
        Ok(())
    }
}
