//! Copies between object-graph nodes and format nodes.
//!
//! Each node goes through the same three steps: a matching reader or writer
//! convention, otherwise the default mapping, then every matching visitor.

use crate::error::MappingError;
use crate::nodes::graph::GraphKind;
use crate::nodes::{Element, GraphNode, Node, NodeType};
use crate::options::Options;
use crate::value::Value;

pub struct NodeMapper<'a> {
    options: &'a Options,
}

impl<'a> NodeMapper<'a> {
    pub fn new(options: &'a Options) -> Self {
        Self { options }
    }

    /// Writes `source` and its descendants into `target`.
    pub fn write(&self, source: &GraphNode<'_>, target: &mut dyn Node) -> Result<(), MappingError> {
        let writers = self.options.serialization().writers();
        if !writers.write(source, target, self.options)? {
            self.write_default(source, target)?;
        }
        writers.visit(source, target, self.options)
    }

    fn write_default(&self, source: &GraphNode<'_>, target: &mut dyn Node) -> Result<(), MappingError> {
        match source.kind() {
            GraphKind::Embedded(_) => match source.raw_value()? {
                Some(Value::Node(element)) => copy_element(&element, target),
                other => {
                    ensure_node_type(target, NodeType::Value)?;
                    target.set_value(other)
                }
            },
            GraphKind::Value => {
                ensure_node_type(target, NodeType::Value)?;
                target.set_value(source.value()?)
            }
            GraphKind::Object(_) | GraphKind::Enumerable(_) | GraphKind::Dictionary(_) => {
                ensure_node_type(target, source.node_type())?;
                source.for_each_graph_child(&mut |child: &GraphNode<'_>| {
                    target.add(
                        child.node_type(),
                        child.name(),
                        child.metadata(),
                        &mut |node: &mut dyn Node| self.write(child, node),
                    )
                })
            }
        }
    }

    /// Reads `source` and its descendants into `target`.
    pub fn read(&self, source: &dyn Node, target: &mut GraphNode<'_>) -> Result<(), MappingError> {
        let readers = self.options.deserialization().readers();
        if !readers.read(source, target, self.options)? {
            self.read_default(source, target)?;
        }
        readers.visit(source, target, self.options)
    }

    fn read_default(&self, source: &dyn Node, target: &mut GraphNode<'_>) -> Result<(), MappingError> {
        let composite = match target.kind() {
            GraphKind::Embedded(_) => {
                target.embed(embedded_tree(source, target)?);
                return Ok(());
            }
            GraphKind::Value => false,
            GraphKind::Object(_) | GraphKind::Enumerable(_) | GraphKind::Dictionary(_) => true,
        };
        match (composite, source.node_type()) {
            (false, NodeType::Value) => target.set_value(source.value()?),
            (false, found) => Err(mismatch(target, found)),
            (true, NodeType::Value) => match source.value()? {
                None => target.set_value(None),
                Some(_) => Err(mismatch(target, NodeType::Value)),
            },
            (true, _) => {
                source.for_each_child(&mut |child: &dyn Node| {
                    target.add_child(
                        child.node_type(),
                        child.name(),
                        child.metadata(),
                        &mut |node: &mut GraphNode<'_>| self.read(child, node),
                    )
                })?;
                target.validate()
            }
        }
    }
}

/// A source of the same format as the target's node type is taken as is;
/// any other source is copied node by node.
fn embedded_tree(source: &dyn Node, target: &GraphNode<'_>) -> Result<Element, MappingError> {
    match (source.as_element(), target.effective_type().node_format()) {
        (Some(element), Some(format)) if source.format() == format => Ok(element.clone()),
        _ => {
            log::trace!("copying {} node into {}", source.format(), target.path());
            Element::from_node(source)
        }
    }
}

fn mismatch(target: &GraphNode<'_>, found: NodeType) -> MappingError {
    MappingError::NodeTypeMismatch {
        path: target.path(),
        expected: target.node_type().to_string(),
        found: found.to_string(),
    }
}

fn ensure_node_type(target: &mut dyn Node, node_type: NodeType) -> Result<(), MappingError> {
    if target.node_type() != node_type {
        target.set_node_type(node_type)?;
    }
    Ok(())
}

/// Copies an element tree into any node.
pub(crate) fn copy_element(element: &Element, target: &mut dyn Node) -> Result<(), MappingError> {
    ensure_node_type(target, element.node_type)?;
    if element.node_type == NodeType::Value {
        return target.set_value(element.value.clone());
    }
    for child in &element.children {
        target.add(
            child.node_type,
            child.name.as_deref(),
            &child.metadata,
            &mut |node: &mut dyn Node| copy_element(child, node),
        )?;
    }
    Ok(())
}
