use super::{Binding, GraphNode, Seed, Segment};
use crate::error::MappingError;
use crate::nodes::{Node, NodeType};
use crate::reflection::{ListInfo, Metadata};
use crate::value::{Instance, Value};

impl<'a> GraphNode<'a> {
    /// The node name of an item. Untyped collections name each item after
    /// its runtime type.
    fn item_name(&self, info: &ListInfo, item: Option<&Value>) -> String {
        let element = info.element();
        let item_type = match item {
            Some(value) if element.underlying().is_dynamic() => value.cached_type(),
            _ => element,
        };
        self.options.naming().item_name(&item_type, &self.metadata)
    }

    pub(super) fn visit_items(
        &self,
        info: &ListInfo,
        instance: &Instance,
        visit: &mut dyn FnMut(&GraphNode<'a>) -> Result<(), MappingError>,
    ) -> Result<(), MappingError> {
        for (index, item) in info.items(instance).into_iter().enumerate() {
            let seed = Seed {
                name: Some(self.item_name(info, item.as_ref())),
                segment: Segment::Item(index),
                specified: info.element(),
                member: None,
                metadata: Metadata::new(),
                value: item,
                binding: Binding::Detached,
                hint: None,
            };
            self.yield_child(seed, visit)?;
        }
        Ok(())
    }

    /// Binds an incoming child to the next position of the collection.
    ///
    /// Untyped and read-only collections cannot be filled; a named item must
    /// carry the expected item name unless item names are ignored.
    pub(super) fn item_target(
        &mut self,
        info: &ListInfo,
        node_type: NodeType,
        name: Option<&str>,
        metadata: &Metadata,
    ) -> Result<Seed, MappingError> {
        let element = info.element();
        if element.underlying().is_dynamic() {
            return Err(MappingError::not_supported(
                self.ty.name(),
                &self.path(),
                "items of an untyped collection cannot be deserialized",
            ));
        }
        if !info.can_push() {
            return Err(MappingError::not_supported(
                self.ty.name(),
                &self.path(),
                "the collection cannot be appended to",
            ));
        }
        let options = self.options;
        if let Some(actual) = name.filter(|_| !options.deserialization().ignore_array_item_names()) {
            let expected = self.item_name(info, None);
            if !options.names_match(&expected, actual) {
                return Err(MappingError::InvalidItemName {
                    path: self.path(),
                    friendly: format!("'{actual}' is not a valid item, '{expected}' was expected."),
                    expected,
                    actual: actual.to_string(),
                });
            }
        }
        let list = self.instance()?;
        let index = self.added;
        self.added += 1;
        Ok(Seed {
            name: name.map(str::to_string),
            segment: Segment::Item(index),
            specified: element,
            member: None,
            metadata: metadata.clone(),
            value: None,
            binding: Binding::Item {
                list,
                info: info.clone(),
            },
            hint: Some(node_type),
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::error::MappingError;
    use crate::nodes::{GraphNode, Node, NodeType};
    use crate::options::Options;
    use crate::reflection::{Metadata, Reflect};
    use crate::value::Value;

    fn add_item(
        root: &mut GraphNode<'_>,
        name: Option<&str>,
        value: Option<Value>,
    ) -> Result<(), MappingError> {
        root.add_child(NodeType::Value, name, &Metadata::new(), &mut |child: &mut GraphNode<'_>| {
            child.set_value(value.clone())
        })
    }

    #[test]
    fn test_items_are_appended_in_order() {
        let options = Options::default();
        let mut root = GraphNode::for_deserialize(&<Vec<i32>>::cached_type(), &options).unwrap();
        add_item(&mut root, Some("Int32"), Some(Value::I64(1))).unwrap();
        add_item(&mut root, None, Some(Value::String("2".into()))).unwrap();
        let items = <Vec<i32>>::from_value(root.into_value().unwrap()).unwrap();
        assert_eq!(items, [1, 2]);
    }

    #[test]
    fn test_item_names_are_checked() {
        let options = Options::default();
        let mut root = GraphNode::for_deserialize(&<Vec<i32>>::cached_type(), &options).unwrap();
        let err = add_item(&mut root, Some("Item"), Some(Value::I32(1))).unwrap_err();
        match err {
            MappingError::InvalidItemName { path, expected, .. } => {
                assert_eq!(path, "ArrayOfInt32");
                assert_eq!(expected, "Int32");
            }
            other => panic!("unexpected error: {other:?}"),
        }

        let relaxed = Options::builder()
            .deserialization(|d| d.ignore_array_item_names())
            .build();
        let mut root = GraphNode::for_deserialize(&<Vec<i32>>::cached_type(), &relaxed).unwrap();
        add_item(&mut root, Some("Item"), Some(Value::I32(1))).unwrap();
    }

    #[test]
    fn test_untyped_collections_are_rejected() {
        let options = Options::default();
        let mut root = GraphNode::for_deserialize(&<Vec<Value>>::cached_type(), &options).unwrap();
        for value in [Some(Value::I32(1)), Some(Value::String("x".into())), None] {
            let err = add_item(&mut root, None, value).unwrap_err();
            assert!(matches!(err, MappingError::TypeNotSupported { .. }));
        }
    }

    #[test]
    fn test_items_serialize_with_item_names() {
        let options = Options::default();
        let items = vec![Some(3u8), None];
        let root = GraphNode::for_serialize(items.to_value(), &<Vec<Option<u8>>>::cached_type(), &options)
            .unwrap();
        let mut seen = Vec::new();
        root.for_each_graph_child(&mut |child: &GraphNode<'_>| {
            seen.push((child.name().map(str::to_string), child.path(), child.value()?));
            Ok(())
        })
        .unwrap();
        assert_eq!(
            seen,
            [(Some("Byte".to_string()), "ArrayOfByte[0]".to_string(), Some(Value::U8(3)))]
        );
    }
}
