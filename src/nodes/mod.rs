//! The format-neutral node model.

mod element;
pub mod graph;

pub use element::Element;
pub use graph::{GraphNode, NodeState};

use crate::error::MappingError;
use crate::reflection::Metadata;
use crate::value::Value;
use std::fmt;

/// Structural category of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeType {
    Object,
    Array,
    Dictionary,
    Value,
}

impl NodeType {
    pub fn is_composite(self) -> bool {
        self != NodeType::Value
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            NodeType::Object => "object",
            NodeType::Array => "array",
            NodeType::Dictionary => "dictionary",
            NodeType::Value => "value",
        })
    }
}

/// Direction of a mapping pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Serialize,
    Deserialize,
}

/// A position in a tree: a name, a type, an optional value and children.
///
/// Implemented by object-graph nodes and by format nodes such as
/// [`Element`]. Children are visited rather than returned because graph
/// nodes build them on the fly.
pub trait Node {
    fn name(&self) -> Option<&str>;

    fn node_type(&self) -> NodeType;

    /// Changes the node type. Fails on nodes whose type is fixed.
    fn set_node_type(&mut self, node_type: NodeType) -> Result<(), MappingError>;

    fn has_fixed_node_type(&self) -> bool;

    /// A short tag naming the node family, e.g. `"object"` or `"element"`.
    fn format(&self) -> &str;

    fn path(&self) -> String;

    fn metadata(&self) -> &Metadata;

    fn value(&self) -> Result<Option<Value>, MappingError>;

    fn set_value(&mut self, value: Option<Value>) -> Result<(), MappingError>;

    fn for_each_child(
        &self,
        visit: &mut dyn FnMut(&dyn Node) -> Result<(), MappingError>,
    ) -> Result<(), MappingError>;

    /// Adds a child and lets `modify` fill it before it is attached.
    fn add(
        &mut self,
        node_type: NodeType,
        name: Option<&str>,
        metadata: &Metadata,
        modify: &mut dyn FnMut(&mut dyn Node) -> Result<(), MappingError>,
    ) -> Result<(), MappingError>;

    /// Called once all children were added.
    fn validate(&self) -> Result<(), MappingError> {
        Ok(())
    }

    /// The node as an owned-tree element, for nodes that are one.
    fn as_element(&self) -> Option<&Element> {
        None
    }
}
