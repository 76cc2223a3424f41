// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![allow(clippy::unwrap_used, clippy::panic)] // tests unwrap/panic to assert error shapes

use crate::shape::error::ErrorKind;
use crate::shape::{inherit, BaseShape, Shape};
use crate::{Library, Raml, Value};

use std::rc::Rc;

fn build(types: &str) -> (Raml, Rc<Library>) {
    let raml = Raml::new();
    let library = raml.build_types("inherit.raml", types).unwrap();
    raml.process_library(&library).unwrap();
    (raml, library)
}

fn build_err(types: &str) -> ErrorKind {
    let raml = Raml::new();
    let library = raml.build_types("inherit.raml", types).unwrap();
    raml.process_library(&library).unwrap_err().root().kind
}

#[test]
fn test_child_raises_min_items() {
    let (_raml, library) = build(
        r#"
Parent:
  type: string[]
  minItems: 3
Child:
  type: Parent
  minItems: 5
"#,
    );
    let child = library.get_type("Child").unwrap();
    let five = Value::from_json_str(r#"["a", "b", "c", "d", "e"]"#).unwrap();
    let four = Value::from_json_str(r#"["a", "b", "c", "d"]"#).unwrap();
    assert!(child.borrow().validate(&five).is_ok());
    let err = child.borrow().validate(&four).unwrap_err();
    assert_eq!(err.root().kind, ErrorKind::ConstraintViolation("minItems"));
}

#[test]
fn test_child_cannot_lower_min_items() {
    let kind = build_err(
        r#"
Parent:
  type: string[]
  minItems: 3
Child:
  type: Parent
  minItems: 2
"#,
    );
    assert_eq!(kind, ErrorKind::ConstraintViolation("minItems"));
}

#[test]
fn test_child_cannot_raise_max_items() {
    let kind = build_err(
        r#"
Parent:
  type: string[]
  maxItems: 5
Child:
  type: Parent
  maxItems: 10
"#,
    );
    assert_eq!(kind, ErrorKind::ConstraintViolation("maxItems"));
}

#[test]
fn test_unset_facets_are_inherited() {
    let (_raml, library) = build(
        r#"
Parent:
  type: string
  minLength: 2
  maxLength: 10
Child: Parent
"#,
    );
    let child = library.get_type("Child").unwrap();
    let b = child.borrow();
    match &b.shape {
        Shape::String(f) => {
            assert_eq!(f.min_length, Some(2));
            assert_eq!(f.max_length, Some(10));
        }
        other => panic!("expected string shape, got {}", other.type_name()),
    }
}

#[test]
fn test_incompatible_variants_direct() {
    let raml = Raml::new();
    let library = raml
        .build_types(
            "inherit.raml",
            r#"
Parent:
  type: object
Child:
  type: string
"#,
        )
        .unwrap();
    raml.resolve_library(&library).unwrap();
    let parent = library.get_type("Parent").unwrap();
    let child = library.get_type("Child").unwrap();
    let err = inherit(&child, &parent).unwrap_err();
    assert_eq!(err.kind, ErrorKind::IncompatibleType);
    assert_eq!(err.info.get("source").map(String::as_str), Some("object"));
    assert_eq!(err.info.get("target").map(String::as_str), Some("string"));
}

#[test]
fn test_required_property_cannot_be_demoted() {
    let kind = build_err(
        r#"
Parent:
  type: object
  properties:
    name: string
Child:
  type: Parent
  properties:
    name?: string
"#,
    );
    assert_eq!(kind, ErrorKind::RequiredDemoted);
}

#[test]
fn test_parent_properties_are_merged() {
    let (_raml, library) = build(
        r#"
Parent:
  type: object
  properties:
    name: string
Child:
  type: Parent
  properties:
    age?: integer
"#,
    );
    let child = library.get_type("Child").unwrap();
    let b = child.borrow();
    match &b.shape {
        Shape::Object(f) => {
            let props = f.properties.as_ref().unwrap();
            assert!(props.get("name").unwrap().required);
            assert!(!props.get("age").unwrap().required);
        }
        other => panic!("expected object shape, got {}", other.type_name()),
    }
    let ok = Value::from_json_str(r#"{"name": "A", "age": 3}"#).unwrap();
    let missing = Value::from_json_str(r#"{"age": 3}"#).unwrap();
    assert!(b.validate(&ok).is_ok());
    assert!(b.validate(&missing).is_err());
}

#[test]
fn test_unique_items_cannot_relax() {
    let kind = build_err(
        r#"
Parent:
  type: string[]
  uniqueItems: true
Child:
  type: Parent
  uniqueItems: false
"#,
    );
    assert_eq!(kind, ErrorKind::ConstraintViolation("uniqueItems"));
}

#[test]
fn test_enum_subset_ok() {
    let (_raml, library) = build(
        r#"
Parent:
  type: string
  enum: [a, b, c]
Child:
  type: Parent
  enum: [a, b]
"#,
    );
    let child = library.get_type("Child").unwrap();
    assert!(child.borrow().validate(&Value::from("a")).is_ok());
    let err = child.borrow().validate(&Value::from("c")).unwrap_err();
    assert_eq!(err.root().kind, ErrorKind::ConstraintViolation("enum"));
}

#[test]
fn test_enum_superset_fails() {
    let kind = build_err(
        r#"
Parent:
  type: string
  enum: [a, b]
Child:
  type: Parent
  enum: [a, d]
"#,
    );
    assert_eq!(kind, ErrorKind::ConstraintViolation("enum"));
}

#[test]
fn test_numeric_bounds() {
    let (_raml, library) = build(
        r#"
Parent:
  type: integer
  minimum: 0
  maximum: 100
Child:
  type: Parent
  minimum: 10
  maximum: 50
"#,
    );
    let child = library.get_type("Child").unwrap();
    assert!(child.borrow().validate(&Value::from(10)).is_ok());
    assert!(child.borrow().validate(&Value::from(5)).is_err());
    assert!(child.borrow().validate(&Value::from(60)).is_err());
}

#[test]
fn test_numeric_bound_violation() {
    let kind = build_err(
        r#"
Parent:
  type: integer
  minimum: 10
Child:
  type: Parent
  minimum: 5
"#,
    );
    assert_eq!(kind, ErrorKind::ConstraintViolation("minimum"));
}

#[test]
fn test_multiple_of_must_refine() {
    let (_raml, library) = build(
        r#"
Parent:
  type: integer
  multipleOf: 3
Child:
  type: Parent
  multipleOf: 6
"#,
    );
    let child = library.get_type("Child").unwrap();
    assert!(child.borrow().validate(&Value::from(12)).is_ok());
    assert!(child.borrow().validate(&Value::from(9)).is_err());

    let kind = build_err(
        r#"
Parent:
  type: integer
  multipleOf: 3
Child:
  type: Parent
  multipleOf: 4
"#,
    );
    assert_eq!(kind, ErrorKind::ConstraintViolation("multipleOf"));
}

#[test]
fn test_any_parent_accepts_everything() {
    let (_raml, library) = build(
        r#"
Parent: any
Child:
  type: Parent
"#,
    );
    let child = library.get_type("Child").unwrap();
    // The reference materializes the child as `any` as well; inheriting
    // from any leaves it unconstrained.
    assert!(child.borrow().validate(&Value::from(7)).is_ok());
    assert!(child.borrow().validate(&Value::from("x")).is_ok());
}

#[test]
fn test_union_target_inheritance() {
    let (_raml, library) = build(
        r#"
Parent: string | integer
Child:
  type: Parent
"#,
    );
    let child = library.get_type("Child").unwrap();
    let b = child.borrow();
    assert_eq!(b.type_name, "union");
    assert!(b.validate(&Value::from("x")).is_ok());
    assert!(b.validate(&Value::from(3)).is_ok());
    assert!(b.validate(&Value::from(true)).is_err());
}

#[test]
fn test_union_member_merge_uses_detached_clones() {
    let raml = Raml::new();
    let library = raml
        .build_types(
            "inherit.raml",
            r#"
Parent:
  type: string | integer
Child:
  type: string | integer
"#,
        )
        .unwrap();
    raml.resolve_library(&library).unwrap();
    let parent = library.get_type("Parent").unwrap();
    let child = library.get_type("Child").unwrap();

    let original_member_ids: Vec<i64> = match &child.borrow().shape {
        Shape::Union(f) => f.any_of.iter().map(|m| m.borrow().id).collect(),
        other => panic!("expected union shape, got {}", other.type_name()),
    };
    inherit(&child, &parent).unwrap();
    let merged_member_ids: Vec<i64> = match &child.borrow().shape {
        Shape::Union(f) => f.any_of.iter().map(|m| m.borrow().id).collect(),
        other => panic!("expected union shape, got {}", other.type_name()),
    };
    // Surviving members are fresh clones with fresh IDs.
    for id in &merged_member_ids {
        assert!(!original_member_ids.contains(id));
    }
}

#[test]
fn test_union_source_into_scalar_target() {
    let raml = Raml::new();
    let library = raml
        .build_types(
            "inherit.raml",
            r#"
Parent:
  type: string | integer
Child:
  type: string
  maxLength: 5
"#,
        )
        .unwrap();
    raml.resolve_library(&library).unwrap();
    let parent = library.get_type("Parent").unwrap();
    let child = library.get_type("Child").unwrap();
    inherit(&child, &parent).unwrap();

    let b = child.borrow();
    assert_eq!(b.type_name, "string");
    assert!(b.validate(&Value::from("abc")).is_ok());
    assert!(b.validate(&Value::from("too long value")).is_err());
}

#[test]
fn test_union_source_with_no_compatible_member() {
    let raml = Raml::new();
    let library = raml
        .build_types(
            "inherit.raml",
            r#"
Parent:
  type: integer | nil
Child:
  type: string
"#,
        )
        .unwrap();
    raml.resolve_library(&library).unwrap();
    let parent = library.get_type("Parent").unwrap();
    let child = library.get_type("Child").unwrap();
    let err = inherit(&child, &parent).unwrap_err();
    assert_eq!(err.kind, ErrorKind::IncompatibleType);
}

#[test]
fn test_inherit_is_idempotent_on_clone() {
    let raml = Raml::new();
    let library = raml
        .build_types(
            "inherit.raml",
            r#"
T:
  type: string
  minLength: 2
  maxLength: 8
  pattern: "^[a-z]+$"
"#,
        )
        .unwrap();
    raml.process_library(&library).unwrap();
    let shape = library.get_type("T").unwrap();
    let clone = BaseShape::clone_detached(&shape);
    inherit(&shape, &clone).unwrap();

    let b = shape.borrow();
    match &b.shape {
        Shape::String(f) => {
            assert_eq!(f.min_length, Some(2));
            assert_eq!(f.max_length, Some(8));
            assert_eq!(f.pattern.as_ref().unwrap().as_str(), "^[a-z]+$");
        }
        other => panic!("expected string shape, got {}", other.type_name()),
    }
}

#[test]
fn test_inherit_monotonicity() {
    // Values accepted by the child are accepted by the parent.
    let (_raml, library) = build(
        r#"
Parent:
  type: object
  properties:
    name: string
Child:
  type: Parent
  properties:
    age: integer
"#,
    );
    let parent = library.get_type("Parent").unwrap();
    let child = library.get_type("Child").unwrap();
    let samples = [
        r#"{"name": "A", "age": 3}"#,
        r#"{"name": "B", "age": 0, "extra": true}"#,
    ];
    for sample in samples {
        let value = Value::from_json_str(sample).unwrap();
        if child.borrow().validate(&value).is_ok() {
            assert!(parent.borrow().validate(&value).is_ok());
        }
    }
}

#[test]
fn test_json_schema_mismatch() {
    let raml = Raml::new();
    let library = raml
        .build_types(
            "inherit.raml",
            "A:\n  type: '{\"type\": \"object\"}'\nB:\n  type: '{\"type\": \"string\"}'\n",
        )
        .unwrap();
    raml.resolve_library(&library).unwrap();
    let a = library.get_type("A").unwrap();
    let b = library.get_type("B").unwrap();
    let err = inherit(&a, &b).unwrap_err();
    assert_eq!(err.kind, ErrorKind::JsonSchemaMismatch);
}

#[test]
fn test_recursive_source_is_unwrapped() {
    let raml = Raml::new();
    let library = raml
        .build_types(
            "inherit.raml",
            r#"
Node:
  type: object
  properties:
    next?: Node
Extended:
  type: Node
  properties:
    label?: string
"#,
        )
        .unwrap();
    raml.process_library(&library).unwrap();
    let extended = library.get_type("Extended").unwrap();
    let value = Value::from_json_str(r#"{"label": "a", "next": {"next": null}}"#).unwrap();
    assert!(extended.borrow().validate(&value).is_ok());
}
