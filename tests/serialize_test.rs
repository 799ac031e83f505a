// Object graph to node tree
mod common;

use common::{ada, folder_pair, release, Holder, Mixed, Person, Status};
use graft_core::{
    serialize, serialize_json, serialize_yaml, Element, MappingError, NodeType, NonNumericFloat, Options,
    Value,
};

fn child_names(element: &Element) -> Vec<&str> {
    element
        .children
        .iter()
        .filter_map(|child| child.name.as_deref())
        .collect()
}

#[test]
fn test_object_tree_shape() {
    let element = serialize(&ada(), &Options::default()).unwrap();
    assert_eq!(element.name.as_deref(), Some("Person"));
    assert_eq!(element.node_type, NodeType::Object);
    // Nickname is null and skipped.
    assert_eq!(child_names(&element), ["Name", "Age", "Status", "Home", "Tags", "Scores"]);

    let home = element.child("Home").unwrap();
    assert_eq!(home.node_type, NodeType::Object);
    assert_eq!(home.child("City").unwrap().value, Some(Value::String("London".into())));

    let tags = element.child("Tags").unwrap();
    assert_eq!(tags.node_type, NodeType::Array);
    assert_eq!(child_names(tags), ["Tag", "Tag"]);

    let scores = element.child("Scores").unwrap();
    assert_eq!(scores.node_type, NodeType::Dictionary);
    assert_eq!(child_names(scores), ["algebra", "poetry"]);
    assert_eq!(scores.child("poetry").unwrap().value, Some(Value::I32(71)));
}

#[test]
fn test_null_members_on_request() {
    let options = Options::builder()
        .serialization(|s| s.include_null_members())
        .build();
    let element = serialize(&ada(), &options).unwrap();
    let nickname = element.child("Nickname").unwrap();
    assert_eq!(nickname.node_type, NodeType::Value);
    assert_eq!(nickname.value, None);
}

#[test]
fn test_enum_values() {
    let element = serialize(&ada(), &Options::default()).unwrap();
    assert_eq!(element.child("Status").unwrap().value, Some(Value::String("OnHold".into())));

    let numeric = Options::builder()
        .serialization(|s| s.enum_values_as_numeric())
        .build();
    let person = Person {
        status: Status::Closed,
        ..ada()
    };
    let element = serialize(&person, &numeric).unwrap();
    assert_eq!(element.child("Status").unwrap().value, Some(Value::I64(5)));

    let snake = Options::builder().use_snake_case_enum_names().build();
    let element = serialize(&ada(), &snake).unwrap();
    assert_eq!(element.child("Status").unwrap().value, Some(Value::String("on_hold".into())));
}

#[test]
fn test_cycles_are_omitted() {
    let root = folder_pair();
    let element = serialize(&root, &Options::default()).unwrap();
    let children = element.child("Children").unwrap();
    assert_eq!(children.children.len(), 1);
    let child = &children.children[0];
    assert_eq!(child.name.as_deref(), Some("Folder"));
    assert_eq!(child.child("Name").unwrap().value, Some(Value::String("child".into())));
    assert!(child.child("Parent").is_none());
    release(&root);
}

#[test]
fn test_member_filter_composition() {
    let mixed = Mixed {
        shown: "yes".into(),
        field: 3,
        secret: true,
    };
    let element = serialize(&mixed, &Options::default()).unwrap();
    assert_eq!(child_names(&element), ["Shown"]);

    let fields = Options::builder().include_public_fields().build();
    let element = serialize(&mixed, &fields).unwrap();
    assert_eq!(child_names(&element), ["Shown", "Field"]);

    let everything = Options::builder()
        .include_public_fields()
        .include_non_public_properties()
        .include_non_public_fields()
        .build();
    let element = serialize(&mixed, &everything).unwrap();
    assert_eq!(child_names(&element), ["Shown", "Field", "Secret"]);

    let filtered = Options::builder()
        .include_public_fields()
        .exclude_members_when(|member| member.name() == "Shown")
        .build();
    let element = serialize(&mixed, &filtered).unwrap();
    assert_eq!(child_names(&element), ["Field"]);
}

#[test]
fn test_excluded_types_are_skipped() {
    let options = Options::builder()
        .exclude_types_when(|ty| ty.name() == "Address")
        .build();
    let element = serialize(&ada(), &options).unwrap();
    assert!(element.child("Home").is_none());
    assert!(element.child("Name").is_some());
}

#[test]
fn test_simple_roots_are_not_supported() {
    let err = serialize(&42i32, &Options::default()).unwrap_err();
    assert!(matches!(err, MappingError::TypeNotSupported { .. }));
}

#[test]
fn test_collection_roots() {
    let element = serialize(&vec![1i64, 2], &Options::default()).unwrap();
    assert_eq!(element.name.as_deref(), Some("ArrayOfInt64"));
    assert_eq!(child_names(&element), ["Int64", "Int64"]);
}

#[test]
fn test_non_finite_floats() {
    let holder = Holder { value: f64::NAN };
    let element = serialize(&holder, &Options::default()).unwrap();
    assert!(matches!(element.child("Value").unwrap().value, Some(Value::F64(v)) if v.is_nan()));

    let named = Options::builder()
        .serialization(|s| s.non_numeric_floats(NonNumericFloat::Name))
        .build();
    let element = serialize(&holder, &named).unwrap();
    assert_eq!(element.child("Value").unwrap().value, Some(Value::String("NaN".into())));
    let element = serialize(&Holder { value: f64::NEG_INFINITY }, &named).unwrap();
    assert_eq!(element.child("Value").unwrap().value, Some(Value::String("-Infinity".into())));

    let zeroed = Options::builder()
        .serialization(|s| s.non_numeric_floats(NonNumericFloat::Zero))
        .build();
    let element = serialize(&Holder { value: f32::INFINITY }, &zeroed).unwrap();
    assert_eq!(element.child("Value").unwrap().value, Some(Value::F32(0.0)));
}

#[test]
fn test_json_output() {
    let text = serialize_json(&ada(), &Options::default()).unwrap();
    let json: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(
        json,
        serde_json::json!({
            "Name": "Ada",
            "Age": 36,
            "Status": "OnHold",
            "Home": { "Street": "12 St James's Square", "City": "London" },
            "Tags": ["math", "engines"],
            "Scores": { "algebra": 98, "poetry": 71 }
        })
    );
}

#[test]
fn test_yaml_output() {
    let holder = Holder { value: true };
    assert_eq!(serialize_yaml(&holder, &Options::default()).unwrap().trim(), "Value: true");
}
