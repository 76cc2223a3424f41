// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![allow(clippy::unwrap_used, clippy::panic)] // tests unwrap/panic to assert error shapes

use crate::shape::error::ErrorKind;
use crate::Raml;

fn check_err(types: &str) -> ErrorKind {
    let raml = Raml::new();
    let library = raml.build_types("check.raml", types).unwrap();
    raml.process_library(&library).unwrap_err().root().kind
}

fn check_ok(types: &str) {
    let raml = Raml::new();
    let library = raml.build_types("check.raml", types).unwrap();
    raml.process_library(&library).unwrap();
}

#[test]
fn test_min_items_above_max_items() {
    let kind = check_err("T:\n  type: string[]\n  minItems: 5\n  maxItems: 2\n");
    assert_eq!(kind, ErrorKind::ConstraintViolation("minItems"));
}

#[test]
fn test_min_length_above_max_length() {
    let kind = check_err("T:\n  type: string\n  minLength: 10\n  maxLength: 2\n");
    assert_eq!(kind, ErrorKind::ConstraintViolation("minLength"));
}

#[test]
fn test_minimum_above_maximum() {
    let kind = check_err("T:\n  type: integer\n  minimum: 10\n  maximum: 2\n");
    assert_eq!(kind, ErrorKind::ConstraintViolation("minimum"));
}

#[test]
fn test_min_properties_above_max_properties() {
    let kind = check_err("T:\n  type: object\n  minProperties: 3\n  maxProperties: 1\n");
    assert_eq!(kind, ErrorKind::ConstraintViolation("minProperties"));
}

#[test]
fn test_discriminator_happy_path() {
    check_ok(
        r#"
Message:
  type: object
  discriminator: kind
  discriminatorValue: text
  properties:
    kind: string
    body: string
"#,
    );
}

#[test]
fn test_discriminator_defaults_to_shape_name() {
    check_ok(
        r#"
Message:
  type: object
  discriminator: kind
  properties:
    kind: string
"#,
    );
}

#[test]
fn test_discriminator_property_missing() {
    let kind = check_err(
        r#"
Message:
  type: object
  discriminator: kind
  properties:
    body: string
"#,
    );
    assert_eq!(kind, ErrorKind::DiscriminatorMissing);
}

#[test]
fn test_discriminator_without_properties() {
    let kind = check_err("Message:\n  type: object\n  discriminator: kind\n");
    assert_eq!(kind, ErrorKind::DiscriminatorMissing);
}

#[test]
fn test_discriminator_must_be_scalar() {
    let kind = check_err(
        r#"
Message:
  type: object
  discriminator: kind
  properties:
    kind: object
"#,
    );
    assert_eq!(kind, ErrorKind::DiscriminatorNotScalar);
}

#[test]
fn test_discriminator_value_must_validate() {
    let kind = check_err(
        r#"
Message:
  type: object
  discriminator: kind
  discriminatorValue: text
  properties:
    kind:
      type: string
      enum: [image, video]
"#,
    );
    assert_eq!(kind, ErrorKind::ConstraintViolation("enum"));
}

#[test]
fn test_pattern_properties_conflict_with_no_additional() {
    let kind = check_err(
        r#"
T:
  type: object
  additionalProperties: false
  properties:
    /^x-/: string
"#,
    );
    assert_eq!(kind, ErrorKind::PatternConflictsWithNoAdditional);
}

#[test]
fn test_unknown_integer_format() {
    let kind = check_err("T:\n  type: integer\n  format: decimal\n");
    assert_eq!(kind, ErrorKind::ConstraintViolation("format"));
}

#[test]
fn test_float_format_allowed_on_number_only() {
    check_ok("T:\n  type: number\n  format: double\n");
    let kind = check_err("T:\n  type: integer\n  format: double\n");
    assert_eq!(kind, ErrorKind::ConstraintViolation("format"));
}

#[test]
fn test_unknown_datetime_format() {
    let kind = check_err("T:\n  type: datetime\n  format: iso8601\n");
    assert_eq!(kind, ErrorKind::ConstraintViolation("format"));
}

#[test]
fn test_zero_multiple_of() {
    let kind = check_err("T:\n  type: integer\n  multipleOf: 0\n");
    assert_eq!(kind, ErrorKind::ConstraintViolation("multipleOf"));
}

#[test]
fn test_default_value_must_validate() {
    let kind = check_err("T:\n  type: string\n  minLength: 3\n  default: ab\n");
    assert_eq!(kind, ErrorKind::ConstraintViolation("minLength"));
    check_ok("T:\n  type: string\n  minLength: 3\n  default: abcd\n");
}

#[test]
fn test_example_value_must_validate() {
    let kind = check_err("T:\n  type: integer\n  example: x\n");
    assert_eq!(kind, ErrorKind::Validation);
    check_ok("T:\n  type: integer\n  example: 4\n");
}

#[test]
fn test_named_examples_must_validate() {
    let kind = check_err(
        "T:\n  type: integer\n  examples:\n    good: 3\n    bad: x\n",
    );
    assert_eq!(kind, ErrorKind::Validation);
}

#[test]
fn test_check_descends_into_items() {
    let kind = check_err(
        "T:\n  type: array\n  items:\n    type: string\n    minLength: 9\n    maxLength: 1\n",
    );
    assert_eq!(kind, ErrorKind::ConstraintViolation("minLength"));
}

#[test]
fn test_check_descends_into_union_members() {
    let kind = check_err(
        r#"
T:
  type: object
  properties:
    value: First | Second
First:
  type: integer
  minimum: 5
  maximum: 1
Second: string
"#,
    );
    assert_eq!(kind, ErrorKind::ConstraintViolation("minimum"));
}

#[test]
fn test_compositional_check_passes() {
    check_ok(
        r#"
Leaf:
  type: string
  minLength: 1
  maxLength: 64
Tree:
  type: object
  properties:
    label: Leaf
    children?: Tree[]
"#,
    );
}
