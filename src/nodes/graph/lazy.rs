use crate::error::MappingError;
use crate::nodes::Element;
use crate::value::Value;
use once_cell::unsync::OnceCell;
use std::cell::RefCell;

pub(crate) type Creator<'a> = Box<dyn FnOnce() -> Result<Value, MappingError> + 'a>;

/// The value behind a graph node.
pub(crate) enum ValueSource<'a> {
    /// A value that is already known (possibly null).
    Simple(Option<Value>),
    /// A composite value created on first access.
    Lazy(LazyValue<'a>),
    /// A node tree inserted as is; the value is the tree itself.
    Node(Element),
}

impl<'a> ValueSource<'a> {
    pub(crate) fn lazy(existing: Option<Value>, create: Creator<'a>) -> Self {
        ValueSource::Lazy(LazyValue::new(existing, create))
    }

    /// The value if it is available without running a factory.
    pub(crate) fn peek(&self) -> Option<&Value> {
        match self {
            ValueSource::Simple(value) => value.as_ref(),
            ValueSource::Lazy(lazy) => lazy.peek(),
            ValueSource::Node(_) => None,
        }
    }

    pub(crate) fn into_value(self) -> Result<Option<Value>, MappingError> {
        match self {
            ValueSource::Simple(value) => Ok(value),
            ValueSource::Lazy(lazy) => lazy.into_value().map(Some),
            ValueSource::Node(element) => Ok(Some(Value::Node(Box::new(element)))),
        }
    }
}

/// A value produced at most once.
///
/// An existing value (such as the current value of a member) is used as is;
/// the creator only runs when there is none.
pub(crate) struct LazyValue<'a> {
    cell: OnceCell<Value>,
    create: RefCell<Option<Creator<'a>>>,
}

impl<'a> LazyValue<'a> {
    pub(crate) fn new(existing: Option<Value>, create: Creator<'a>) -> Self {
        let cell = OnceCell::new();
        let create = match existing {
            Some(value) => {
                let _ = cell.set(value);
                None
            }
            None => Some(create),
        };
        Self {
            cell,
            create: RefCell::new(create),
        }
    }

    pub(crate) fn peek(&self) -> Option<&Value> {
        self.cell.get()
    }

    #[cfg(test)]
    fn is_materialized(&self) -> bool {
        self.cell.get().is_some()
    }

    pub(crate) fn force(&self) -> Result<&Value, MappingError> {
        if let Some(value) = self.cell.get() {
            return Ok(value);
        }
        let create = self.create.borrow_mut().take().ok_or_else(|| MappingError::ValueNotSupported {
            path: String::new(),
            reason: "value creation already failed".to_string(),
        })?;
        let value = create()?;
        Ok(self.cell.get_or_init(|| value))
    }

    pub(crate) fn into_value(self) -> Result<Value, MappingError> {
        self.force()?;
        self.cell.into_inner().ok_or_else(|| MappingError::ValueNotSupported {
            path: String::new(),
            reason: "value was never created".to_string(),
        })
    }
}
