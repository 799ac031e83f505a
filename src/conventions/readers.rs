use super::{reader_failure, Convention, TypeMatch};
use crate::coercion;
use crate::error::{BoxError, MappingError};
use crate::nodes::{GraphNode, Node};
use crate::options::Options;
use crate::reflection::Reflect;
use crate::value::Value;
use std::sync::Arc;

pub type ReaderPredicateFn =
    dyn Fn(&dyn Node, &GraphNode<'_>, &Options) -> Result<bool, BoxError> + Send + Sync;

/// Reads a source node into a graph node.
pub type NodeReaderFn =
    dyn Fn(&dyn Node, &mut GraphNode<'_>, &Options) -> Result<(), BoxError> + Send + Sync;

/// Turns a raw source value into the value assigned to the graph node.
pub type ValueReaderFn = dyn Fn(Option<Value>, &GraphNode<'_>, &Options) -> Result<Option<Value>, BoxError>
    + Send
    + Sync;

type NodeReader = Convention<ReaderPredicateFn, NodeReaderFn>;
type ValueReader = Convention<ReaderPredicateFn, ValueReaderFn>;

impl<H: ?Sized> Convention<ReaderPredicateFn, H> {
    fn applies(
        &self,
        source: &dyn Node,
        target: &GraphNode<'_>,
        options: &Options,
    ) -> Result<bool, MappingError> {
        if !self.type_match.matches(target) {
            return Ok(false);
        }
        match &self.when {
            Some(predicate) => {
                predicate(source, target, options).map_err(|e| reader_failure(&target.path(), e))
            }
            None => Ok(true),
        }
    }
}

/// The reader side of the conventions pipeline.
#[derive(Clone, Default)]
pub struct ReaderConventions {
    readers: Vec<NodeReader>,
    value_readers: Vec<ValueReader>,
    visitors: Vec<NodeReader>,
}

impl ReaderConventions {
    pub(crate) fn add_reader(
        &mut self,
        type_match: TypeMatch,
        when: Option<Arc<ReaderPredicateFn>>,
        reader: Arc<NodeReaderFn>,
    ) {
        self.readers.push(Convention::new(type_match, when, reader));
    }

    pub(crate) fn add_value_reader<T: Reflect>(
        &mut self,
        when: Option<Arc<ReaderPredicateFn>>,
        reader: impl Fn(Option<Value>, &GraphNode<'_>, &Options) -> Result<T, BoxError>
            + Send
            + Sync
            + 'static,
    ) {
        let handler: Arc<ValueReaderFn> =
            Arc::new(move |raw: Option<Value>, target: &GraphNode<'_>, options: &Options| {
                reader(raw, target, options).map(|value| value.to_value())
            });
        self.value_readers
            .push(Convention::new(TypeMatch::nullable::<T>(), when, handler));
    }

    pub(crate) fn add_visitor(
        &mut self,
        type_match: TypeMatch,
        when: Option<Arc<ReaderPredicateFn>>,
        visitor: Arc<NodeReaderFn>,
    ) {
        self.visitors.push(Convention::new(type_match, when, visitor));
    }

    pub fn readers(&self) -> &[Convention<ReaderPredicateFn, NodeReaderFn>] {
        &self.readers
    }

    pub fn value_readers(&self) -> &[Convention<ReaderPredicateFn, ValueReaderFn>] {
        &self.value_readers
    }

    pub fn visitors(&self) -> &[Convention<ReaderPredicateFn, NodeReaderFn>] {
        &self.visitors
    }

    /// Runs the most recently registered matching reader, node readers
    /// before value readers. Returns `false` when none matched.
    pub(crate) fn read(
        &self,
        source: &dyn Node,
        target: &mut GraphNode<'_>,
        options: &Options,
    ) -> Result<bool, MappingError> {
        for reader in self.readers.iter().rev() {
            if reader.applies(source, target, options)? {
                log::debug!("reader convention handles {}", target.path());
                (reader.handler)(source, target, options)
                    .map_err(|e| reader_failure(&target.path(), e))?;
                return Ok(true);
            }
        }
        for reader in self.value_readers.iter().rev() {
            if reader.applies(source, target, options)? {
                log::debug!("value reader handles {}", target.path());
                let raw = source.value()?;
                let shown = raw.as_ref().map(ToString::to_string).unwrap_or_default();
                let value = (reader.handler)(raw, target, options)
                    .map_err(|e| value_reader_failure(target, &shown, e, options))?;
                target.set_coerced(value)?;
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Runs every matching visitor in registration order.
    pub(crate) fn visit(
        &self,
        source: &dyn Node,
        target: &mut GraphNode<'_>,
        options: &Options,
    ) -> Result<(), MappingError> {
        for visitor in &self.visitors {
            if visitor.applies(source, target, options)? {
                (visitor.handler)(source, target, options)
                    .map_err(|e| reader_failure(&target.path(), e))?;
            }
        }
        Ok(())
    }
}

/// Value reader failures read as parse errors when the target type has a
/// user-facing parse message.
fn value_reader_failure(
    target: &GraphNode<'_>,
    shown: &str,
    error: BoxError,
    options: &Options,
) -> MappingError {
    let path = target.path();
    let error = reader_failure(&path, error);
    if error.is_friendly() {
        return error;
    }
    let ty = target.effective_type();
    match coercion::friendly_parse_message(ty, options) {
        Some(template) => MappingError::ValueParse {
            path,
            value: shown.to_string(),
            type_name: ty.name().to_string(),
            reason: match &error {
                MappingError::Reader { cause, .. } => cause.to_string(),
                other => other.to_string(),
            },
            friendly: template.replace("{value}", shown),
        },
        None => error,
    }
}
