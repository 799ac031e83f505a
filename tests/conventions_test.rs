// Readers, writers, visitors and naming conventions
mod common;

use common::{ada, Address, Holder, Mixed, Person};
use graft_core::{
    deserialize, deserialize_json, serialize, serialize_json, BoxError, GraphNode, MappingError, Node, NodeType,
    Options, TypeMatch, Value,
};
use parking_lot::Mutex;
use std::sync::Arc;

#[test]
fn test_latest_reader_wins() {
    let options = Options::builder()
        .deserialization(|d| {
            d.with_value_reader::<String>(|raw: Option<Value>, _: &GraphNode<'_>, _: &Options| {
                Ok(format!("value reader: {}", raw.map(|v| v.to_string()).unwrap_or_default()))
            })
            .with_reader(TypeMatch::exact::<String>(), |_: &dyn Node, target: &mut GraphNode<'_>, _: &Options| {
                target.set_value(Some(Value::String("first".into())))?;
                Ok(())
            })
            .with_reader(TypeMatch::exact::<String>(), |_: &dyn Node, target: &mut GraphNode<'_>, _: &Options| {
                target.set_value(Some(Value::String("second".into())))?;
                Ok(())
            })
            .with_reader_when(
                TypeMatch::exact::<String>(),
                |source: &dyn Node, _: &GraphNode<'_>, _: &Options| Ok(source.name() == Some("Street")),
                |_: &dyn Node, target: &mut GraphNode<'_>, _: &Options| {
                    target.set_value(Some(Value::String("street reader".into())))?;
                    Ok(())
                },
            )
        })
        .build();
    let address = deserialize_json::<Address>(r#"{"Street": "a", "City": "b"}"#, &options).unwrap();
    assert_eq!(address.street, "street reader");
    assert_eq!(address.city, "second");
}

#[test]
fn test_value_readers_apply_to_nullable_types() {
    let options = Options::builder()
        .deserialization(|d| {
            d.with_value_reader::<i32>(|raw: Option<Value>, _: &GraphNode<'_>, _: &Options| {
                let text = raw.map(|v| v.to_string()).unwrap_or_default();
                Ok(text.trim_end_matches(" years").parse::<i32>()?)
            })
        })
        .build();
    let holder = deserialize_json::<Holder<Option<i32>>>(r#"{"Value": "12 years"}"#, &options).unwrap();
    assert_eq!(holder.value, Some(12));

    let err = deserialize_json::<Holder<i32>>(r#"{"Value": "old"}"#, &options).unwrap_err();
    assert!(matches!(err, MappingError::ValueParse { .. }));
    assert_eq!(err.friendly_message(), Some("'old' is not a valid whole number."));
}

#[test]
fn test_visitors_run_in_order_after_the_default_mapping() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let (first, second) = (log.clone(), log.clone());
    let options = Options::builder()
        .deserialization(|d| {
            d.with_visitor(TypeMatch::exact::<Address>(), move |_: &dyn Node, target: &mut GraphNode<'_>, _: &Options| {
                first.lock().push(format!("first {}", target.path()));
                Ok(())
            })
            .with_visitor(TypeMatch::any(), move |_: &dyn Node, target: &mut GraphNode<'_>, _: &Options| {
                second.lock().push(format!("second {}", target.path()));
                Ok(())
            })
        })
        .build();
    deserialize_json::<Address>(r#"{"City": "Rome"}"#, &options).unwrap();
    assert_eq!(
        *log.lock(),
        ["second Address.City", "first Address", "second Address"]
    );
}

#[test]
fn test_writer_visitors_can_add_nodes() {
    let options = Options::builder()
        .serialization(|s| {
            s.with_visitor(TypeMatch::nullable::<Address>(), |source: &GraphNode<'_>, target: &mut dyn Node, _: &Options| {
                let path = source.path();
                target.add(NodeType::Value, Some("Path"), &Default::default(), &mut |node: &mut dyn Node| {
                    node.set_value(Some(Value::String(path.clone())))
                })?;
                Ok(())
            })
        })
        .build();
    let element = serialize(&ada(), &options).unwrap();
    let home = element.child("Home").unwrap();
    assert_eq!(home.child("Path").unwrap().value, Some(Value::String("Person.Home".into())));
}

#[test]
fn test_visitor_predicates() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let (read, skipped, written) = (log.clone(), log.clone(), log.clone());
    let options = Options::builder()
        .deserialization(|d| {
            d.with_visitor_when(
                TypeMatch::nullable::<Address>(),
                |source: &dyn Node, _: &GraphNode<'_>, _: &Options| Ok(source.name() == Some("Home")),
                move |_: &dyn Node, target: &mut GraphNode<'_>, _: &Options| {
                    read.lock().push(format!("read {}", target.path()));
                    Ok(())
                },
            )
            .with_visitor_when(
                TypeMatch::any(),
                |_: &dyn Node, _: &GraphNode<'_>, _: &Options| Ok(false),
                move |_: &dyn Node, target: &mut GraphNode<'_>, _: &Options| {
                    skipped.lock().push(format!("skipped {}", target.path()));
                    Ok(())
                },
            )
        })
        .serialization(|s| {
            s.with_visitor_when(
                TypeMatch::exact::<String>(),
                |source: &GraphNode<'_>, _: &dyn Node, _: &Options| {
                    Ok(source.member().is_some_and(|m| m.name() == "City"))
                },
                move |source: &GraphNode<'_>, _: &mut dyn Node, _: &Options| {
                    written.lock().push(format!("written {}", source.path()));
                    Ok(())
                },
            )
        })
        .build();
    deserialize_json::<Person>(r#"{"Name": "Ada", "Home": {"Street": "s", "City": "Rome"}}"#, &options).unwrap();
    serialize(&ada(), &options).unwrap();
    assert_eq!(*log.lock(), ["read Person.Home", "written Person.Home.City"]);
}

#[test]
fn test_failing_visitor_predicates_are_wrapped() {
    let options = Options::builder()
        .deserialization(|d| {
            d.with_visitor_when(
                TypeMatch::exact::<i32>(),
                |_: &dyn Node, _: &GraphNode<'_>, _: &Options| Err::<bool, BoxError>("broken predicate".into()),
                |_: &dyn Node, _: &mut GraphNode<'_>, _: &Options| Ok(()),
            )
        })
        .serialization(|s| {
            s.with_visitor_when(
                TypeMatch::exact::<i32>(),
                |_: &GraphNode<'_>, _: &dyn Node, _: &Options| Err::<bool, BoxError>("broken predicate".into()),
                |_: &GraphNode<'_>, _: &mut dyn Node, _: &Options| Ok(()),
            )
        })
        .build();
    match deserialize_json::<Person>(r#"{"Age": 3}"#, &options).unwrap_err() {
        MappingError::Reader { path, cause } => {
            assert_eq!(path, "Person.Age");
            assert_eq!(cause.to_string(), "broken predicate");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    match serialize(&ada(), &options).unwrap_err() {
        MappingError::Writer { path, .. } => assert_eq!(path, "Person.Age"),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn test_value_writers() {
    let options = Options::builder()
        .serialization(|s| {
            s.with_value_writer::<i32>(|age: &i32, _: &GraphNode<'_>, _: &Options| {
                Ok(Some(Value::String(format!("{age} years"))))
            })
        })
        .build();
    let element = serialize(&ada(), &options).unwrap();
    assert_eq!(element.child("Age").unwrap().value, Some(Value::String("36 years".into())));
    // The scores are i32 as well.
    let scores = element.child("Scores").unwrap();
    assert_eq!(scores.child("algebra").unwrap().value, Some(Value::String("98 years".into())));
}

#[test]
fn test_writer_predicates() {
    let options = Options::builder()
        .serialization(|s| {
            s.with_writer_when(
                TypeMatch::exact::<String>(),
                |source: &GraphNode<'_>, _: &dyn Node, _: &Options| {
                    Ok(source.member().is_some_and(|m| m.name() == "Name"))
                },
                |_: &GraphNode<'_>, target: &mut dyn Node, _: &Options| {
                    target.set_value(Some(Value::String("<redacted>".into())))?;
                    Ok(())
                },
            )
        })
        .build();
    let element = serialize(&ada(), &options).unwrap();
    assert_eq!(element.child("Name").unwrap().value, Some(Value::String("<redacted>".into())));
    let home = element.child("Home").unwrap();
    assert_eq!(home.child("City").unwrap().value, Some(Value::String("London".into())));
}

#[test]
fn test_friendly_errors_pass_through_conventions() {
    let options = Options::builder()
        .deserialization(|d| {
            d.with_reader(TypeMatch::exact::<i32>(), |source: &dyn Node, target: &mut GraphNode<'_>, _: &Options| {
                match source.value()? {
                    Some(Value::I64(n)) if n >= 0 => {
                        target.set_value(Some(Value::I64(n)))?;
                        Ok(())
                    }
                    _ => Err(MappingError::friendly("Age must not be negative.").into()),
                }
            })
        })
        .build();
    assert_eq!(deserialize_json::<Person>(r#"{"Age": 3}"#, &options).unwrap().age, 3);
    let err = deserialize_json::<Person>(r#"{"Age": -3}"#, &options).unwrap_err();
    assert!(matches!(err, MappingError::Friendly { .. }));
    assert_eq!(err.friendly_message(), Some("Age must not be negative."));
}

#[test]
fn test_other_errors_are_wrapped() {
    let options = Options::builder()
        .deserialization(|d| {
            d.with_reader(TypeMatch::exact::<i32>(), |_: &dyn Node, _: &mut GraphNode<'_>, _: &Options| {
                Err::<(), BoxError>("broken reader".into())
            })
        })
        .serialization(|s| {
            s.with_writer(TypeMatch::exact::<String>(), |_: &GraphNode<'_>, _: &mut dyn Node, _: &Options| {
                Err::<(), BoxError>("broken writer".into())
            })
        })
        .build();
    match deserialize_json::<Person>(r#"{"Age": 3}"#, &options).unwrap_err() {
        MappingError::Reader { path, cause } => {
            assert_eq!(path, "Person.Age");
            assert_eq!(cause.to_string(), "broken reader");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    match serialize(&ada(), &options).unwrap_err() {
        MappingError::Writer { path, .. } => assert_eq!(path, "Person.Name"),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn test_custom_parsers_and_messages() {
    let options = Options::builder()
        .deserialization(|d| {
            d.with_parser::<bool>(|text: &str| match text {
                "yes" => Ok(true),
                "no" => Ok(false),
                other => Err(format!("'{other}' is neither yes nor no").into()),
            })
            .with_friendly_parse_message::<bool>("Answer yes or no, not '{value}'.")
        })
        .build();
    let holder = deserialize_json::<Holder<bool>>(r#"{"Value": "yes"}"#, &options).unwrap();
    assert!(holder.value);
    let err = deserialize_json::<Holder<bool>>(r#"{"Value": "maybe"}"#, &options).unwrap_err();
    assert_eq!(err.friendly_message(), Some("Answer yes or no, not 'maybe'."));

    let err = deserialize_json::<Holder<i32>>(r#"{"Value": "seven"}"#, &Options::default()).unwrap_err();
    match &err {
        MappingError::ValueParse { path, value, .. } => {
            assert_eq!(path, "Holder.Value");
            assert_eq!(value, "seven");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn test_naming_chains() {
    let options = Options::builder()
        .include_public_fields()
        .use_camel_case_naming()
        .with_field_naming_convention(|name, _| format!("{name}_f"))
        .build();
    let mixed = Mixed {
        shown: "x".into(),
        field: 2,
        secret: false,
    };
    let text = serialize_json(&mixed, &options).unwrap();
    let json: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(json, serde_json::json!({ "shown": "x", "field_f": 2 }));
    assert_eq!(deserialize_json::<Mixed>(&text, &options).unwrap(), mixed);
}

#[test]
fn test_renames_and_item_naming() {
    let options = Options::builder()
        .use_snake_case_naming()
        .with_array_item_naming_convention(|name, _| name.to_lowercase())
        .with_enumerable_type_name_format("ListOf{0}")
        .build();
    let element = serialize(&ada(), &options).unwrap();
    // An ItemName attribute wins over the item convention.
    let tags = element.child("tags").unwrap();
    assert_eq!(tags.children[0].name.as_deref(), Some("Tag"));

    let element = serialize(&vec![1u16, 2], &options).unwrap();
    assert_eq!(element.name.as_deref(), Some("ListOfuint16"));
    assert_eq!(element.children[0].name.as_deref(), Some("uint16"));
    assert_eq!(deserialize::<Vec<u16>>(&element, &options).unwrap(), [1, 2]);
}
