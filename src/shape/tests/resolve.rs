// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![allow(clippy::unwrap_used, clippy::panic)] // tests unwrap/panic to assert error shapes

use crate::shape::{Shape, ShapeRef};
use crate::{Raml, Value};

use std::rc::Rc;

/// Count the recursion markers reachable from a shape without following
/// the markers' head pointers.
fn count_recursive(shape: &ShapeRef) -> usize {
    fn walk(shape: &ShapeRef, seen: &mut Vec<i64>) -> usize {
        let b = shape.borrow();
        if seen.contains(&b.id) {
            return 0;
        }
        seen.push(b.id);
        let mut count = 0;
        match &b.shape {
            Shape::Recursive(_) => count += 1,
            Shape::Array(f) => {
                if let Some(items) = &f.items {
                    count += walk(items, seen);
                }
            }
            Shape::Union(f) => {
                for member in &f.any_of {
                    count += walk(member, seen);
                }
            }
            Shape::Object(f) => {
                if let Some(props) = &f.properties {
                    for p in props.values() {
                        count += walk(&p.shape, seen);
                    }
                }
                if let Some(props) = &f.pattern_properties {
                    for p in props.values() {
                        count += walk(&p.shape, seen);
                    }
                }
            }
            _ => {}
        }
        for parent in &b.inherits {
            count += walk(parent, seen);
        }
        count
    }
    walk(shape, &mut Vec::new())
}

#[test]
fn test_self_recursive_type() {
    let raml = Raml::new();
    let library = raml
        .build_types(
            "rec.raml",
            r#"
Node:
  type: object
  properties:
    next?: Node
"#,
        )
        .unwrap();
    raml.process_library(&library).unwrap();

    let node = library.get_type("Node").unwrap();
    assert_eq!(node.borrow().type_name, "object");
    assert_eq!(count_recursive(&node), 1);

    // The marker's head points back at the cycle head.
    let b = node.borrow();
    let next = match &b.shape {
        Shape::Object(f) => Rc::clone(&f.properties.as_ref().unwrap().get("next").unwrap().shape),
        other => panic!("expected object shape, got {}", other.type_name()),
    };
    let next_ref = next.borrow();
    match &next_ref.shape {
        Shape::Recursive(f) => {
            let head = f.head.upgrade().unwrap();
            assert!(Rc::ptr_eq(&head, &node));
        }
        other => panic!("expected recursive marker, got {}", other.type_name()),
    }
}

#[test]
fn test_mutual_recursion() {
    let raml = Raml::new();
    let library = raml
        .build_types(
            "rec.raml",
            r#"
A:
  type: object
  properties:
    b?: B
B:
  type: object
  properties:
    a?: A
"#,
        )
        .unwrap();
    raml.process_library(&library).unwrap();

    let a = library.get_type("A").unwrap();
    let b = library.get_type("B").unwrap();
    assert_eq!(a.borrow().type_name, "object");
    assert_eq!(b.borrow().type_name, "object");
    // Exactly one marker cuts the A -> B -> A cycle.
    assert_eq!(count_recursive(&a), 1);
}

#[test]
fn test_recursion_through_array_items() {
    let raml = Raml::new();
    let library = raml
        .build_types(
            "rec.raml",
            r#"
Tree:
  type: object
  properties:
    children?: Tree[]
"#,
        )
        .unwrap();
    raml.process_library(&library).unwrap();

    let tree = library.get_type("Tree").unwrap();
    assert_eq!(count_recursive(&tree), 1);

    let value = Value::from_json_str(
        r#"{"children": [{"children": []}, {"children": [{}]}]}"#,
    )
    .unwrap();
    assert!(tree.borrow().validate(&value).is_ok());
}

#[test]
fn test_resolution_is_idempotent() {
    let raml = Raml::new();
    let library = raml
        .build_types(
            "rec.raml",
            r#"
Node:
  type: object
  properties:
    next?: Node
"#,
        )
        .unwrap();
    raml.resolve_library(&library).unwrap();
    raml.resolve_library(&library).unwrap();
    let node = library.get_type("Node").unwrap();
    assert_eq!(count_recursive(&node), 1);
}

#[test]
fn test_recursive_validation_terminates_on_input() {
    let raml = Raml::new();
    let library = raml
        .build_types(
            "rec.raml",
            r#"
Node:
  type: object
  properties:
    next?: Node
"#,
        )
        .unwrap();
    raml.process_library(&library).unwrap();
    let node = library.get_type("Node").unwrap();

    let ok = Value::from_json_str(r#"{"next": {"next": {"next": null}}}"#).unwrap();
    assert!(node.borrow().validate(&ok).is_ok());

    let bad = Value::from_json_str(r#"{"next": {"next": 7}}"#).unwrap();
    assert!(node.borrow().validate(&bad).is_err());
}

#[test]
fn test_chain_of_references_resolves() {
    let raml = Raml::new();
    let library = raml
        .build_types(
            "chain.raml",
            r#"
A: string
B: A
C: B
"#,
        )
        .unwrap();
    raml.process_library(&library).unwrap();
    let c = library.get_type("C").unwrap();
    assert_eq!(c.borrow().type_name, "string");
    assert_eq!(count_recursive(&c), 0);
}
