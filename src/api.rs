use crate::error::MappingError;
use crate::mapper::NodeMapper;
use crate::nodes::{Element, GraphNode, Node};
use crate::options::Options;
use crate::reflection::Reflect;

/// Maps `value` into a new [`Element`] tree.
///
/// The root element is named by the type naming conventions, e.g. a
/// `Vec<i32>` root is named `ArrayOfInt32`.
///
/// # Errors
///
/// Returns a `MappingError` if the root type is a simple type, or if a
/// writer, visitor or value conversion fails.
pub fn serialize<T: Reflect>(value: &T, options: &Options) -> Result<Element, MappingError> {
    let root = GraphNode::for_serialize(value.to_value(), &T::cached_type(), options)?;
    let mut element = Element::new(root.node_type());
    if let Some(name) = root.name() {
        element = element.named(name);
    }
    NodeMapper::new(options).write(&root, &mut element)?;
    Ok(element)
}

/// Maps `value` into an existing node of any format.
///
/// # Errors
///
/// See [`serialize`]. Also fails if `target` has a fixed node type that
/// differs from the one `T` maps to.
pub fn serialize_into<T: Reflect>(
    value: &T,
    target: &mut dyn Node,
    options: &Options,
) -> Result<(), MappingError> {
    let root = GraphNode::for_serialize(value.to_value(), &T::cached_type(), options)?;
    NodeMapper::new(options).write(&root, target)
}

/// Builds a `T` from a node tree of any format.
///
/// # Errors
///
/// Returns a `MappingError` describing the first node that could not be
/// mapped: unrecognized or missing members, unparsable values, nulls for
/// non-nullable types, or instances that could not be created.
pub fn deserialize<T: Reflect>(source: &dyn Node, options: &Options) -> Result<T, MappingError> {
    let mut root = GraphNode::for_deserialize(&T::cached_type(), options)?;
    check_root_name(source, &root, options)?;
    NodeMapper::new(options).read(source, &mut root)?;
    let path = root.path();
    let type_name = root.specified_type().name().to_string();
    let value = root.into_value()?;
    let shown = value.as_ref().map(ToString::to_string).unwrap_or_default();
    let from = value
        .as_ref()
        .map(|v| v.cached_type().name().to_string())
        .unwrap_or_else(|| "null".to_string());
    T::from_value(value).map_err(|error| MappingError::ValueConversion {
        path,
        value: shown,
        from,
        to: type_name,
        reason: error.to_string(),
    })
}

fn check_root_name(
    source: &dyn Node,
    root: &GraphNode<'_>,
    options: &Options,
) -> Result<(), MappingError> {
    if !options.deserialization().check_root_name() {
        return Ok(());
    }
    let (Some(actual), Some(expected)) = (source.name(), root.name()) else {
        return Ok(());
    };
    if options.names_match(expected, actual) {
        return Ok(());
    }
    Err(MappingError::InvalidRootName {
        expected: expected.to_string(),
        actual: actual.to_string(),
        friendly: format!("'{actual}' is not a valid root, '{expected}' was expected."),
    })
}

/// Maps `value` to pretty-printed JSON.
///
/// # Errors
///
/// See [`serialize`]; codec failures are reported as [`MappingError::Codec`].
pub fn serialize_json<T: Reflect>(value: &T, options: &Options) -> Result<String, MappingError> {
    serialize(value, options)?.to_json()
}

/// Parses JSON text and maps it to a `T`.
///
/// # Errors
///
/// See [`deserialize`]; malformed text is reported as [`MappingError::Codec`].
pub fn deserialize_json<T: Reflect>(text: &str, options: &Options) -> Result<T, MappingError> {
    let element = Element::from_json(text)?;
    deserialize(&element, options)
}

/// Maps `value` to YAML.
///
/// # Errors
///
/// See [`serialize`]; codec failures are reported as [`MappingError::Codec`].
pub fn serialize_yaml<T: Reflect>(value: &T, options: &Options) -> Result<String, MappingError> {
    serialize(value, options)?.to_yaml()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reflection::{Member, TypeInfo};
    use crate::value::Value;

    #[derive(Debug, Clone, Default, PartialEq)]
    struct Point {
        x: i32,
        y: i32,
    }

    impl Reflect for Point {
        fn type_info() -> TypeInfo {
            TypeInfo::object::<Point>("Point")
                .member(Member::property("X", |p: &Point| &p.x, |p: &mut Point, v| p.x = v))
                .member(Member::property("Y", |p: &Point| &p.y, |p: &mut Point, v| p.y = v))
                .default_constructor()
                .build()
        }
    }

    #[test]
    fn test_roots_are_named_after_their_type() {
        let element = serialize(&Point { x: 1, y: 2 }, &Options::default()).unwrap();
        assert_eq!(element.name.as_deref(), Some("Point"));
        assert_eq!(element.child("Y").unwrap().value, Some(Value::I32(2)));

        let element = serialize(&vec![1u8], &Options::default()).unwrap();
        assert_eq!(element.name.as_deref(), Some("ArrayOfByte"));
    }

    #[test]
    fn test_root_name_is_checked_on_request() {
        let source = serialize(&Point { x: 1, y: 2 }, &Options::default()).unwrap().named("Pt");
        assert_eq!(deserialize::<Point>(&source, &Options::default()).unwrap(), Point { x: 1, y: 2 });

        let strict = Options::builder().deserialization(|d| d.check_root_name()).build();
        let err = deserialize::<Point>(&source, &strict).unwrap_err();
        assert_eq!(err.friendly_message(), Some("'Pt' is not a valid root, 'Point' was expected."));

        let unnamed = Element::from_json(r#"{"X": 3}"#).unwrap();
        assert_eq!(deserialize::<Point>(&unnamed, &strict).unwrap(), Point { x: 3, y: 0 });
    }

    #[test]
    fn test_json_round_trip() {
        let options = Options::default();
        let text = serialize_json(&Point { x: -4, y: 9 }, &options).unwrap();
        assert_eq!(deserialize_json::<Point>(&text, &options).unwrap(), Point { x: -4, y: 9 });
    }

    #[test]
    fn test_serialize_into_a_fixed_node() {
        let mut target = Element::array();
        let err = serialize_into(&Point::default(), &mut target, &Options::default()).unwrap_err();
        assert!(matches!(err, MappingError::ValueNotSupported { .. }));
    }
}
