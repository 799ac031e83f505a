use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// An opaque bag of annotations attached to a type or member.
///
/// Attributes are keyed by their concrete type, so there is at most one
/// attribute of each type. Cloning is cheap.
#[derive(Clone, Default)]
pub struct Metadata {
    attributes: Option<Arc<HashMap<TypeId, Arc<dyn Any + Send + Sync>>>>,
}

impl Metadata {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an attribute, replacing any earlier attribute of the same type.
    pub fn with<A: Any + Send + Sync>(mut self, attribute: A) -> Self {
        let mut map = self
            .attributes
            .take()
            .map(|map| (*map).clone())
            .unwrap_or_default();
        map.insert(TypeId::of::<A>(), Arc::new(attribute));
        self.attributes = Some(Arc::new(map));
        self
    }

    pub fn contains<A: Any>(&self) -> bool {
        self.attributes
            .as_ref()
            .is_some_and(|map| map.contains_key(&TypeId::of::<A>()))
    }

    pub fn get<A: Any>(&self) -> Option<&A> {
        self.attributes
            .as_ref()?
            .get(&TypeId::of::<A>())
            .and_then(|attribute| attribute.downcast_ref::<A>())
    }

    pub fn len(&self) -> usize {
        self.attributes.as_ref().map_or(0, |map| map.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for Metadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Metadata({} attributes)", self.len())
    }
}

/// Excludes a member from mapping in both directions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ignore;

/// Replaces the member's default name before naming conventions run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rename(pub String);

/// Overrides the name of the items of a collection member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemName(pub String);
