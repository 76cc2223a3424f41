// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![allow(clippy::unwrap_used, clippy::panic)] // tests unwrap/panic to assert error shapes

use crate::shape::error::ErrorKind;
use crate::shape::{Shape, ShapeRef, TYPE_ARRAY, TYPE_STRING, TYPE_UNION};
use crate::{Raml, Value};

use std::rc::Rc;

fn build_one(decl: &str) -> (Raml, ShapeRef) {
    let raml = Raml::new();
    let library = raml
        .build_types("expr.raml", &format!("T: {decl}\n"))
        .unwrap();
    raml.process_library(&library).unwrap();
    (raml, library.get_type("T").unwrap())
}

#[test]
fn test_primitive() {
    let (_raml, shape) = build_one("string");
    let b = shape.borrow();
    assert_eq!(b.type_name, TYPE_STRING);
    match &b.shape {
        Shape::String(f) => {
            assert!(f.pattern.is_none());
            assert!(f.min_length.is_none());
            assert!(f.max_length.is_none());
            assert!(f.enum_values.is_none());
        }
        other => panic!("expected string shape, got {}", other.type_name()),
    }
    assert!(b.inherits.is_empty());
}

#[test]
fn test_optional_is_union_with_nil() {
    let (_raml, shape) = build_one("string?");
    let b = shape.borrow();
    assert_eq!(b.type_name, TYPE_UNION);
    match &b.shape {
        Shape::Union(f) => {
            assert_eq!(f.any_of.len(), 2);
            assert_eq!(f.any_of[0].borrow().type_name, "string");
            assert_eq!(f.any_of[1].borrow().type_name, "nil");
            // Wrapper members are anonymous and do not share the
            // target's envelope.
            assert!(f.any_of[0].borrow().name.is_empty());
            assert_ne!(f.any_of[0].borrow().id, b.id);
        }
        other => panic!("expected union shape, got {}", other.type_name()),
    }
}

#[test]
fn test_array_postfix() {
    let (_raml, shape) = build_one("string[]");
    let b = shape.borrow();
    assert_eq!(b.type_name, TYPE_ARRAY);
    match &b.shape {
        Shape::Array(f) => {
            let items = f.items.as_ref().unwrap();
            assert_eq!(items.borrow().type_name, "string");
        }
        other => panic!("expected array shape, got {}", other.type_name()),
    }
}

#[test]
fn test_array_of_array() {
    let (_raml, shape) = build_one("integer[][]");
    let b = shape.borrow();
    match &b.shape {
        Shape::Array(f) => {
            let inner = f.items.clone().unwrap();
            let inner_ref = inner.borrow();
            match &inner_ref.shape {
                Shape::Array(inner_facets) => {
                    let items = inner_facets.items.clone().unwrap();
                    assert_eq!(items.borrow().type_name, "integer");
                }
                other => panic!("expected inner array, got {}", other.type_name()),
            }
        }
        other => panic!("expected array shape, got {}", other.type_name()),
    }
}

#[test]
fn test_union_members_in_order() {
    let (_raml, shape) = build_one("string | integer | nil");
    let b = shape.borrow();
    match &b.shape {
        Shape::Union(f) => {
            let tags: Vec<String> = f
                .any_of
                .iter()
                .map(|m| m.borrow().type_name.clone())
                .collect();
            assert_eq!(tags, vec!["string", "integer", "nil"]);
        }
        other => panic!("expected union shape, got {}", other.type_name()),
    }
}

#[test]
fn test_group_binds_array_to_union() {
    let (_raml, shape) = build_one("(string | integer)[]");
    let b = shape.borrow();
    assert_eq!(b.type_name, TYPE_ARRAY);
    match &b.shape {
        Shape::Array(f) => {
            let items = f.items.clone().unwrap();
            let items = items.borrow();
            assert_eq!(items.type_name, TYPE_UNION);
            match &items.shape {
                Shape::Union(u) => assert_eq!(u.any_of.len(), 2),
                other => panic!("expected union items, got {}", other.type_name()),
            }
        }
        other => panic!("expected array shape, got {}", other.type_name()),
    }
}

#[test]
fn test_union_of_arrays_precedence() {
    // `[]` binds tighter than `|`.
    let (_raml, shape) = build_one("string[] | integer");
    let b = shape.borrow();
    match &b.shape {
        Shape::Union(f) => {
            assert_eq!(f.any_of[0].borrow().type_name, "array");
            assert_eq!(f.any_of[1].borrow().type_name, "integer");
        }
        other => panic!("expected union shape, got {}", other.type_name()),
    }
}

#[test]
fn test_local_reference_populates_inherits() {
    let raml = Raml::new();
    let library = raml
        .build_types(
            "refs.raml",
            r#"
Name:
  type: string
  minLength: 1
Alias: Name
"#,
        )
        .unwrap();
    raml.process_library(&library).unwrap();

    let name = library.get_type("Name").unwrap();
    let alias = library.get_type("Alias").unwrap();
    let b = alias.borrow();
    assert_eq!(b.type_name, "string");
    assert_eq!(b.inherits.len(), 1);
    assert!(Rc::ptr_eq(&b.inherits[0], &name));
    // The inherited constraint applies to the alias after folding.
    assert!(b.validate(&Value::from("x")).is_ok());
    assert!(b.validate(&Value::from("")).is_err());
}

#[test]
fn test_library_reference() {
    let raml = Raml::new();
    let common = raml
        .build_types("common.raml", "Id: {type: string, pattern: \"^[0-9]+$\"}\n")
        .unwrap();
    let api = raml.build_types("api.raml", "ResourceId: common.Id\n").unwrap();
    api.add_use("common", Rc::clone(&common));
    raml.process_library(&common).unwrap();
    raml.process_library(&api).unwrap();

    let resource_id = api.get_type("ResourceId").unwrap();
    let b = resource_id.borrow();
    assert_eq!(b.type_name, "string");
    assert!(b.validate(&Value::from("42")).is_ok());
    assert!(b.validate(&Value::from("abc")).is_err());
}

#[test]
fn test_unknown_reference() {
    let raml = Raml::new();
    let library = raml.build_types("bad.raml", "T: Missing\n").unwrap();
    let err = raml.process_library(&library).unwrap_err();
    assert_eq!(err.root().kind, ErrorKind::UnknownIdentifier);
}

#[test]
fn test_unknown_library() {
    let raml = Raml::new();
    let library = raml.build_types("bad.raml", "T: lib.Missing\n").unwrap();
    let err = raml.process_library(&library).unwrap_err();
    assert_eq!(err.root().kind, ErrorKind::UnknownIdentifier);
}

#[test]
fn test_malformed_expression() {
    let raml = Raml::new();
    let library = raml
        .build_types("bad.raml", "T: \"string |\"\n")
        .unwrap();
    let err = raml.process_library(&library).unwrap_err();
    assert_eq!(err.root().kind, ErrorKind::Parse);
}

#[test]
fn test_lone_bracket_is_rejected() {
    let raml = Raml::new();
    let library = raml.build_types("bad.raml", "T: \"string[\"\n").unwrap();
    let err = raml.process_library(&library).unwrap_err();
    assert_eq!(err.root().kind, ErrorKind::Parse);
}
