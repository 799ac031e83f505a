use super::{Node, NodeType};
use crate::error::MappingError;
use crate::reflection::Metadata;
use crate::value::Value;

/// An owned node tree, independent of any text format.
///
/// Elements built with the constructors have a fixed node type. Children
/// created through [`Node::add`] start as placeholders whose type may still
/// change while they are being filled.
#[derive(Debug, Clone)]
pub struct Element {
    pub name: Option<String>,
    pub node_type: NodeType,
    pub value: Option<Value>,
    pub children: Vec<Element>,
    pub metadata: Metadata,
    fixed: bool,
}

impl Element {
    pub fn new(node_type: NodeType) -> Self {
        Self {
            name: None,
            node_type,
            value: None,
            children: Vec::new(),
            metadata: Metadata::new(),
            fixed: true,
        }
    }

    pub fn object() -> Self {
        Self::new(NodeType::Object)
    }

    pub fn array() -> Self {
        Self::new(NodeType::Array)
    }

    pub fn dictionary() -> Self {
        Self::new(NodeType::Dictionary)
    }

    pub fn scalar(value: Value) -> Self {
        Self::new(NodeType::Value).with_value(Some(value))
    }

    pub fn null() -> Self {
        Self::new(NodeType::Value)
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_value(mut self, value: Option<Value>) -> Self {
        self.value = value;
        self
    }

    pub fn with_child(mut self, child: Element) -> Self {
        self.children.push(child);
        self
    }

    pub fn with_children(mut self, children: impl IntoIterator<Item = Element>) -> Self {
        self.children.extend(children);
        self
    }

    /// The first child with the given name.
    pub fn child(&self, name: &str) -> Option<&Element> {
        self.children
            .iter()
            .find(|child| child.name.as_deref() == Some(name))
    }

    /// Deep-copies any node into an element tree.
    pub fn from_node(node: &dyn Node) -> Result<Element, MappingError> {
        let mut element = Element {
            name: node.name().map(str::to_string),
            node_type: node.node_type(),
            value: None,
            children: Vec::new(),
            metadata: node.metadata().clone(),
            fixed: true,
        };
        if node.node_type() == NodeType::Value {
            element.value = node.value()?;
        } else {
            node.for_each_child(&mut |child| {
                element.children.push(Element::from_node(child)?);
                Ok(())
            })?;
        }
        Ok(element)
    }
}

impl PartialEq for Element {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.node_type == other.node_type
            && self.value == other.value
            && self.children == other.children
    }
}

impl Node for Element {
    fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    fn node_type(&self) -> NodeType {
        self.node_type
    }

    fn set_node_type(&mut self, node_type: NodeType) -> Result<(), MappingError> {
        if self.fixed && node_type != self.node_type {
            return Err(MappingError::ValueNotSupported {
                path: self.path(),
                reason: format!(
                    "node type is fixed to {}, cannot change it to {node_type}",
                    self.node_type
                ),
            });
        }
        self.node_type = node_type;
        Ok(())
    }

    fn has_fixed_node_type(&self) -> bool {
        self.fixed
    }

    fn format(&self) -> &str {
        "element"
    }

    fn as_element(&self) -> Option<&Element> {
        Some(self)
    }

    fn path(&self) -> String {
        self.name.clone().unwrap_or_else(|| "<root>".to_string())
    }

    fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    fn value(&self) -> Result<Option<Value>, MappingError> {
        Ok(self.value.clone())
    }

    fn set_value(&mut self, value: Option<Value>) -> Result<(), MappingError> {
        self.value = value;
        Ok(())
    }

    fn for_each_child(
        &self,
        visit: &mut dyn FnMut(&dyn Node) -> Result<(), MappingError>,
    ) -> Result<(), MappingError> {
        for child in &self.children {
            visit(child)?;
        }
        Ok(())
    }

    fn add(
        &mut self,
        node_type: NodeType,
        name: Option<&str>,
        metadata: &Metadata,
        modify: &mut dyn FnMut(&mut dyn Node) -> Result<(), MappingError>,
    ) -> Result<(), MappingError> {
        let mut child = Element {
            name: name.map(str::to_string),
            node_type,
            value: None,
            children: Vec::new(),
            metadata: metadata.clone(),
            fixed: false,
        };
        modify(&mut child)?;
        self.children.push(child);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_elements_reject_type_changes() {
        let mut element = Element::object().named("Root");
        assert!(element.set_node_type(NodeType::Object).is_ok());
        let err = element.set_node_type(NodeType::Value).unwrap_err();
        assert!(matches!(err, MappingError::ValueNotSupported { .. }));
    }

    #[test]
    fn test_added_children_are_placeholders() {
        let mut root = Element::object();
        root.add(NodeType::Object, Some("Child"), &Metadata::new(), &mut |child| {
            child.set_node_type(NodeType::Value)?;
            child.set_value(Some(Value::I32(3)))
        })
        .unwrap();
        let child = root.child("Child").unwrap();
        assert_eq!(child.node_type, NodeType::Value);
        assert_eq!(child.value, Some(Value::I32(3)));
        assert!(!child.has_fixed_node_type());
    }

    #[test]
    fn test_from_node_copies_deeply() {
        let source = Element::array()
            .named("Items")
            .with_child(Element::scalar(Value::Bool(true)))
            .with_child(Element::object().with_child(Element::null().named("Gone")));
        let copy = Element::from_node(&source).unwrap();
        assert_eq!(copy, source);
    }
}
