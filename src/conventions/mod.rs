//! Pluggable behavior around the default mapping.
//!
//! Readers and writers replace the default mapping of the nodes they match;
//! visitors run after it. Naming conventions and member filters shape which
//! members appear and how they are called.

pub mod filters;
pub mod naming;
mod readers;
mod writers;

pub use readers::{NodeReaderFn, ReaderConventions, ReaderPredicateFn, ValueReaderFn};
pub use writers::{NodeWriterFn, ValueWriterFn, WriterConventions, WriterPredicateFn};

use crate::error::{BoxError, ErrorCause, MappingError};
use crate::nodes::GraphNode;
use crate::reflection::Reflect;
use std::any::TypeId;
use std::fmt;
use std::sync::Arc;

/// Which graph nodes a convention applies to, by type.
///
/// Matching uses the declared type of the node, or its runtime type when the
/// declared type is untyped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeMatch {
    Any,
    Exact(TypeId),
    /// The type itself or `Option` of it.
    Nullable(TypeId),
}

impl TypeMatch {
    pub fn any() -> Self {
        TypeMatch::Any
    }

    pub fn exact<T: Reflect>() -> Self {
        TypeMatch::Exact(T::cached_type().id())
    }

    pub fn nullable<T: Reflect>() -> Self {
        TypeMatch::Nullable(T::cached_type().id())
    }

    pub fn matches(&self, node: &GraphNode<'_>) -> bool {
        let ty = if node.specified_type().is_dynamic() {
            node.effective_type()
        } else {
            node.specified_type()
        };
        match self {
            TypeMatch::Any => true,
            TypeMatch::Exact(id) => ty.id() == *id,
            TypeMatch::Nullable(id) => ty.id() == *id || ty.underlying().id() == *id,
        }
    }
}

/// A registered handler with its type gate and optional predicate.
pub struct Convention<P: ?Sized, H: ?Sized> {
    type_match: TypeMatch,
    when: Option<Arc<P>>,
    handler: Arc<H>,
}

impl<P: ?Sized, H: ?Sized> Convention<P, H> {
    pub(crate) fn new(type_match: TypeMatch, when: Option<Arc<P>>, handler: Arc<H>) -> Self {
        Self {
            type_match,
            when,
            handler,
        }
    }

    pub fn type_match(&self) -> TypeMatch {
        self.type_match
    }

    pub fn has_predicate(&self) -> bool {
        self.when.is_some()
    }
}

impl<P: ?Sized, H: ?Sized> Clone for Convention<P, H> {
    fn clone(&self) -> Self {
        Self {
            type_match: self.type_match,
            when: self.when.clone(),
            handler: self.handler.clone(),
        }
    }
}

impl<P: ?Sized, H: ?Sized> fmt::Debug for Convention<P, H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Convention")
            .field("type_match", &self.type_match)
            .field("when", &self.when.is_some())
            .finish()
    }
}

/// Splits a handler error into a friendly mapping error, which is passed on
/// unchanged, or a cause to be wrapped.
fn unwrap_friendly(error: BoxError) -> Result<MappingError, ErrorCause> {
    match error.downcast::<MappingError>() {
        Ok(error) if error.is_friendly() => Ok(*error),
        Ok(error) => Err(Arc::new(*error)),
        Err(other) => Err(Arc::from(other)),
    }
}

pub(crate) fn reader_failure(path: &str, error: BoxError) -> MappingError {
    unwrap_friendly(error).unwrap_or_else(|cause| MappingError::Reader {
        path: path.to_string(),
        cause,
    })
}

pub(crate) fn writer_failure(path: &str, error: BoxError) -> MappingError {
    unwrap_friendly(error).unwrap_or_else(|cause| MappingError::Writer {
        path: path.to_string(),
        cause,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_friendly_errors_pass_through() {
        let error = reader_failure("Root.Name", Box::new(MappingError::friendly("Pick a name.")));
        assert!(matches!(error, MappingError::Friendly { .. }));
        assert_eq!(error.to_string(), "Pick a name.");
    }

    #[test]
    fn test_other_errors_are_wrapped() {
        let error = writer_failure("Root", "disk on fire".into());
        match error {
            MappingError::Writer { path, cause } => {
                assert_eq!(path, "Root");
                assert_eq!(cause.to_string(), "disk on fire");
            }
            other => panic!("unexpected error: {other:?}"),
        }

        let inner = MappingError::not_supported("Thing", "Root", "nope");
        let error = reader_failure("Root", Box::new(inner));
        assert!(matches!(error, MappingError::Reader { .. }));
    }
}
