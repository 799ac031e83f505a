use super::lazy::ValueSource;
use super::{GraphKind, GraphNode, NodeState};
use crate::coercion::{self, Coerced};
use crate::error::MappingError;
use crate::nodes::{Element, Mode, Node};
use crate::value::Value;

impl GraphNode<'_> {
    /// Stores an inbound value.
    ///
    /// Value nodes coerce it to their type. Composite nodes only accept null,
    /// which leaves a nullable position empty. Embedded nodes take node trees
    /// and wrap scalars in one.
    pub(super) fn assign(&mut self, value: Option<Value>) -> Result<(), MappingError> {
        if self.mode == Mode::Serialize {
            return Err(MappingError::ValueNotSupported {
                path: self.path(),
                reason: "values cannot be assigned while serializing".to_string(),
            });
        }
        let kind = self.kind.node_type();
        if matches!(self.kind, GraphKind::Value) {
            let path = self.path();
            if let Coerced::Assign(value) = coercion::read(value, &self.specified, self.options, &path)? {
                self.source = ValueSource::Simple(value);
                self.state.set(NodeState::Initialized);
            }
            return Ok(());
        }
        let embedded = matches!(self.kind, GraphKind::Embedded(_));
        match value {
            None => self.assign_null(),
            Some(Value::Node(element)) if embedded => {
                self.embed(*element);
                Ok(())
            }
            Some(other) if embedded => {
                self.embed(Element::scalar(other));
                Ok(())
            }
            Some(other) => Err(MappingError::ValueNotSupported {
                path: self.path(),
                reason: format!(
                    "'{other}' cannot be assigned to {kind} node of type '{}'",
                    self.ty.name()
                ),
            }),
        }
    }

    fn assign_null(&mut self) -> Result<(), MappingError> {
        if self.specified.is_nullable() {
            self.source = ValueSource::Simple(None);
            self.state.set(NodeState::ForcedNull);
            Ok(())
        } else if self.options.deserialization().ignore_nulls_for_value_types() {
            log::debug!("keeping the current value of {} for null", self.path());
            Ok(())
        } else {
            Err(MappingError::cannot_be_null(&self.path(), self.specified.name()))
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::error::MappingError;
    use crate::nodes::{Element, GraphNode, Node, NodeState, NodeType};
    use crate::options::Options;
    use crate::reflection::{Member, Metadata, Reflect, TypeInfo};
    use crate::value::Value;

    #[derive(Debug, Clone, Default)]
    struct Reading {
        count: i32,
        limit: Option<i32>,
        extra: Option<Element>,
    }

    impl Reflect for Reading {
        fn type_info() -> TypeInfo {
            TypeInfo::object::<Reading>("Reading")
                .member(Member::property("Count", |r: &Reading| &r.count, |r: &mut Reading, v| r.count = v))
                .member(Member::property("Limit", |r: &Reading| &r.limit, |r: &mut Reading, v| r.limit = v))
                .member(Member::property("Extra", |r: &Reading| &r.extra, |r: &mut Reading, v| r.extra = v))
                .default_constructor()
                .build()
        }
    }

    fn read_into(
        options: &Options,
        name: &str,
        node_type: NodeType,
        value: Option<Value>,
    ) -> Result<Reading, MappingError> {
        let mut root = GraphNode::for_deserialize(&Reading::cached_type(), options)?;
        root.add_child(node_type, Some(name), &Metadata::new(), &mut |child: &mut GraphNode<'_>| {
            child.set_value(value.clone())
        })?;
        Ok(Reading::from_value(root.into_value()?).unwrap())
    }

    #[test]
    fn test_null_for_value_types() {
        let options = Options::default();
        let err = read_into(&options, "Count", NodeType::Value, None).unwrap_err();
        assert!(matches!(err, MappingError::ValueCannotBeNull { .. }));
        let reading = read_into(&options, "Limit", NodeType::Value, None).unwrap();
        assert_eq!(reading.limit, None);

        let lenient = Options::builder()
            .deserialization(|d| d.ignore_nulls_for_value_types())
            .build();
        let reading = read_into(&lenient, "Count", NodeType::Value, None).unwrap();
        assert_eq!(reading.count, 0);
    }

    #[test]
    fn test_embedded_nodes_take_trees() {
        let options = Options::default();
        let tree = Element::object().with_child(Element::scalar(Value::Bool(true)).named("On"));
        let reading = read_into(&options, "Extra", NodeType::Object, Some(Value::Node(Box::new(tree.clone())))).unwrap();
        assert_eq!(reading.extra, Some(tree));
    }

    #[test]
    fn test_serialize_nodes_reject_values() {
        let options = Options::default();
        let reading = Reading::default();
        let mut root = GraphNode::for_serialize(reading.to_value(), &Reading::cached_type(), &options).unwrap();
        assert_eq!(root.state(), NodeState::Initialized);
        let err = root.set_value(None).unwrap_err();
        assert!(matches!(err, MappingError::ValueNotSupported { .. }));
    }
}
