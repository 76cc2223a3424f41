// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! The shape model: a tagged hierarchy of type variants, each carrying a
//! common envelope ([`BaseShape`]) plus variant-specific facets.
//!
//! Shapes form a graph. An envelope owns its body and its facet
//! structures; links between shapes — inheritance parents, array items,
//! union members, object property shapes — are shared references
//! ([`ShapeRef`]). Cycles are only ever present in resolved graphs as
//! explicit [`Shape::Recursive`] markers whose head pointer is weak, so a
//! cut cycle never keeps itself alive.

use crate::shape::error::{ErrorKind, ShapeError};
use crate::{Location, Value};

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicI64, Ordering};

use indexmap::IndexMap;
use regex::Regex;

pub mod error;

mod build;
mod check;
mod expr;
mod inherit;
mod resolve;
mod validate;

pub use inherit::inherit;

/// A shared, mutable reference to a shape.
///
/// The graph is mutated single-threaded during loading; once resolved and
/// checked it is immutable by convention and may be validated against
/// freely.
pub type ShapeRef = Rc<RefCell<BaseShape>>;

pub const TYPE_ANY: &str = "any";
pub const TYPE_NIL: &str = "nil";
pub const TYPE_BOOLEAN: &str = "boolean";
pub const TYPE_INTEGER: &str = "integer";
pub const TYPE_NUMBER: &str = "number";
pub const TYPE_STRING: &str = "string";
pub const TYPE_DATE_ONLY: &str = "date-only";
pub const TYPE_TIME_ONLY: &str = "time-only";
pub const TYPE_DATETIME: &str = "datetime";
pub const TYPE_DATETIME_ONLY: &str = "datetime-only";
pub const TYPE_FILE: &str = "file";
pub const TYPE_OBJECT: &str = "object";
pub const TYPE_ARRAY: &str = "array";
pub const TYPE_UNION: &str = "union";
pub const TYPE_JSON: &str = "json";
pub const TYPE_RECURSIVE: &str = "recursive";

/// Reserved primitive names of the type-expression language.
pub const PRIMITIVE_TYPES: [&str; 14] = [
    TYPE_ANY,
    TYPE_NIL,
    TYPE_BOOLEAN,
    TYPE_INTEGER,
    TYPE_NUMBER,
    TYPE_STRING,
    TYPE_DATE_ONLY,
    TYPE_TIME_ONLY,
    TYPE_DATETIME,
    TYPE_DATETIME_ONLY,
    TYPE_FILE,
    TYPE_OBJECT,
    TYPE_ARRAY,
    TYPE_UNION,
];

static NEXT_SHAPE_ID: AtomicI64 = AtomicI64::new(1);

/// Draw a fresh shape ID from the process-wide counter.
pub(crate) fn generate_shape_id() -> i64 {
    NEXT_SHAPE_ID.fetch_add(1, Ordering::Relaxed)
}

/// A named property of an object shape.
#[derive(Debug, Clone)]
pub struct Property {
    pub name: String,
    pub shape: ShapeRef,
    pub required: bool,
}

/// A pattern property of an object shape. Pattern properties are always
/// optional.
#[derive(Debug, Clone)]
pub struct PatternProperty {
    pub pattern: Regex,
    pub shape: ShapeRef,
}

/// Constraints of array shapes.
#[derive(Debug, Clone, Default)]
pub struct ArrayFacets {
    pub items: Option<ShapeRef>,
    pub min_items: Option<u64>,
    pub max_items: Option<u64>,
    pub unique_items: Option<bool>,
}

/// Constraints of object shapes. Property maps preserve declaration
/// order: pattern priority and discriminator position are order
/// sensitive.
#[derive(Debug, Clone, Default)]
pub struct ObjectFacets {
    pub discriminator: Option<String>,
    pub discriminator_value: Option<Value>,
    pub additional_properties: Option<bool>,
    pub properties: Option<IndexMap<String, Property>>,
    pub pattern_properties: Option<IndexMap<String, PatternProperty>>,
    pub min_properties: Option<u64>,
    pub max_properties: Option<u64>,
}

/// Constraints of union shapes.
#[derive(Debug, Clone, Default)]
pub struct UnionFacets {
    pub any_of: Vec<ShapeRef>,
}

/// Constraints of integer shapes.
#[derive(Debug, Clone, Default)]
pub struct IntegerFacets {
    pub minimum: Option<i64>,
    pub maximum: Option<i64>,
    pub multiple_of: Option<i64>,
    pub format: Option<String>,
}

/// Constraints of number shapes.
#[derive(Debug, Clone, Default)]
pub struct NumberFacets {
    pub minimum: Option<f64>,
    pub maximum: Option<f64>,
    pub multiple_of: Option<f64>,
    pub format: Option<String>,
}

/// Constraints of string shapes.
#[derive(Debug, Clone, Default)]
pub struct StringFacets {
    pub pattern: Option<Regex>,
    pub min_length: Option<u64>,
    pub max_length: Option<u64>,
    pub enum_values: Option<Vec<Value>>,
}

/// Constraints of file shapes. Lengths bound the encoded content.
#[derive(Debug, Clone, Default)]
pub struct FileFacets {
    pub file_types: Option<Vec<String>>,
    pub min_length: Option<u64>,
    pub max_length: Option<u64>,
}

/// Constraints of `datetime` shapes. `rfc3339` (the default) and
/// `rfc2616` are the two formats RAML admits.
#[derive(Debug, Clone, Default)]
pub struct DateTimeFacets {
    pub format: Option<String>,
}

/// An opaque, compiled JSON Schema.
///
/// The schema sub-validator is an external collaborator; this handle
/// only guarantees the schema text is well-formed JSON and carries the
/// parsed document.
#[derive(Debug, Clone)]
pub struct JsonSchema {
    compiled: Rc<serde_json::Value>,
}

impl JsonSchema {
    pub fn compile(raw: &str) -> Result<JsonSchema, serde_json::Error> {
        Ok(JsonSchema {
            compiled: Rc::new(serde_json::from_str(raw)?),
        })
    }

    pub fn document(&self) -> &serde_json::Value {
        &self.compiled
    }

    /// Evaluate a value against the schema.
    ///
    /// TODO: delegate to a JSON Schema engine; the handle currently
    /// accepts every value.
    pub fn validate(&self, _value: &Value) -> Result<(), String> {
        Ok(())
    }
}

/// Facets of a shape backed by an inline JSON schema.
#[derive(Debug, Clone, Default)]
pub struct JsonFacets {
    pub schema: Option<JsonSchema>,
    pub raw: Option<String>,
}

/// Placeholder body used between parsing and resolution.
///
/// `declared` holds the raw type expressions (empty when the type was
/// implicit); `facets` holds the YAML facet nodes deferred until the
/// concrete variant is known.
#[derive(Debug, Clone, Default)]
pub struct UnknownFacets {
    pub declared: Vec<String>,
    pub facets: Vec<(String, serde_yaml::Value)>,
}

/// Marker that terminates a cycle in the shape graph; `head` points at
/// the shape that began the cycle.
#[derive(Debug, Clone)]
pub struct RecursiveFacets {
    pub head: Weak<RefCell<BaseShape>>,
}

/// The variant-specific body of a shape.
///
/// Deriving `Clone` produces a link-sharing copy: facet structures are
/// duplicated but `ShapeRef` links still point at the original shapes.
/// Graph-aware cloning goes through [`BaseShape::clone_detached`] and
/// [`BaseShape::clone_with_memo`].
#[derive(Debug, Clone)]
pub enum Shape {
    Any,
    Nil,
    Boolean,
    Integer(IntegerFacets),
    Number(NumberFacets),
    String(StringFacets),
    DateOnly,
    TimeOnly,
    DateTime(DateTimeFacets),
    DateTimeOnly,
    File(FileFacets),
    Object(ObjectFacets),
    Array(ArrayFacets),
    Union(UnionFacets),
    Json(JsonFacets),
    Unknown(UnknownFacets),
    Recursive(RecursiveFacets),
}

impl Shape {
    /// The variant's type tag. Unknown shapes have no tag yet.
    pub fn type_name(&self) -> &'static str {
        match self {
            Shape::Any => TYPE_ANY,
            Shape::Nil => TYPE_NIL,
            Shape::Boolean => TYPE_BOOLEAN,
            Shape::Integer(_) => TYPE_INTEGER,
            Shape::Number(_) => TYPE_NUMBER,
            Shape::String(_) => TYPE_STRING,
            Shape::DateOnly => TYPE_DATE_ONLY,
            Shape::TimeOnly => TYPE_TIME_ONLY,
            Shape::DateTime(_) => TYPE_DATETIME,
            Shape::DateTimeOnly => TYPE_DATETIME_ONLY,
            Shape::File(_) => TYPE_FILE,
            Shape::Object(_) => TYPE_OBJECT,
            Shape::Array(_) => TYPE_ARRAY,
            Shape::Union(_) => TYPE_UNION,
            Shape::Json(_) => TYPE_JSON,
            Shape::Unknown(_) => "",
            Shape::Recursive(_) => TYPE_RECURSIVE,
        }
    }

    pub fn is_scalar(&self) -> bool {
        matches!(
            self,
            Shape::Nil
                | Shape::Boolean
                | Shape::Integer(_)
                | Shape::Number(_)
                | Shape::String(_)
                | Shape::DateOnly
                | Shape::TimeOnly
                | Shape::DateTime(_)
                | Shape::DateTimeOnly
                | Shape::File(_)
        )
    }

    /// Clone the body, recreating structural links through `memo` so two
    /// links to the same original end up as two links to the same clone.
    fn clone_with_memo(&self, memo: &mut BTreeMap<i64, ShapeRef>) -> Shape {
        match self {
            Shape::Array(f) => Shape::Array(ArrayFacets {
                items: f
                    .items
                    .as_ref()
                    .map(|items| BaseShape::clone_with_memo(items, memo)),
                ..f.clone()
            }),
            Shape::Object(f) => {
                let properties = f.properties.as_ref().map(|props| {
                    props
                        .iter()
                        .map(|(k, p)| {
                            (
                                k.clone(),
                                Property {
                                    name: p.name.clone(),
                                    shape: BaseShape::clone_with_memo(&p.shape, memo),
                                    required: p.required,
                                },
                            )
                        })
                        .collect()
                });
                let pattern_properties = f.pattern_properties.as_ref().map(|props| {
                    props
                        .iter()
                        .map(|(k, p)| {
                            (
                                k.clone(),
                                PatternProperty {
                                    pattern: p.pattern.clone(),
                                    shape: BaseShape::clone_with_memo(&p.shape, memo),
                                },
                            )
                        })
                        .collect()
                });
                Shape::Object(ObjectFacets {
                    properties,
                    pattern_properties,
                    ..f.clone()
                })
            }
            Shape::Union(f) => Shape::Union(UnionFacets {
                any_of: f
                    .any_of
                    .iter()
                    .map(|member| BaseShape::clone_with_memo(member, memo))
                    .collect(),
            }),
            Shape::Recursive(f) => {
                // The head is non-owning; it is remapped only when the
                // cycle head itself was cloned in this same call.
                let head = match f.head.upgrade() {
                    Some(head) => match memo.get(&head.borrow().id) {
                        Some(cloned) => Rc::downgrade(cloned),
                        None => f.head.clone(),
                    },
                    None => f.head.clone(),
                };
                Shape::Recursive(RecursiveFacets { head })
            }
            _ => self.clone(),
        }
    }
}

/// The common envelope present on every shape variant.
#[derive(Debug)]
pub struct BaseShape {
    /// Unique, process-wide ID.
    pub id: i64,
    /// Declared name; empty for anonymous shapes.
    pub name: String,
    /// The variant's type tag; empty while the shape is still unknown.
    pub type_name: String,
    /// File the shape was declared in.
    pub location: String,
    /// Row/column of the declaration when known.
    pub position: Location,
    /// Inheritance parents, in declaration order. Non-owning references
    /// into shapes owned by their defining fragment.
    pub inherits: Vec<ShapeRef>,
    pub default: Option<Value>,
    pub example: Option<Value>,
    pub examples: Option<IndexMap<String, Value>>,
    pub description: Option<String>,
    pub display_name: Option<String>,
    /// Tri-state requiredness: explicitly true, explicitly false, unset.
    pub required: Option<bool>,
    /// Facets that are not part of the variant's vocabulary.
    pub custom_shape_facets: IndexMap<String, Value>,
    /// Annotations, i.e. `(name)` keys.
    pub custom_domain_properties: IndexMap<String, Value>,
    /// The variant body. Owned by the envelope.
    pub shape: Shape,
    pub(crate) resolved: bool,
    pub(crate) unwrapped: bool,
}

impl BaseShape {
    pub fn new(
        name: impl Into<String>,
        location: impl Into<String>,
        position: Location,
    ) -> BaseShape {
        BaseShape {
            id: generate_shape_id(),
            name: name.into(),
            type_name: String::new(),
            location: location.into(),
            position,
            inherits: Vec::new(),
            default: None,
            example: None,
            examples: None,
            description: None,
            display_name: None,
            required: None,
            custom_shape_facets: IndexMap::new(),
            custom_domain_properties: IndexMap::new(),
            shape: Shape::Unknown(UnknownFacets::default()),
            resolved: false,
            unwrapped: false,
        }
    }

    pub fn new_ref(
        name: impl Into<String>,
        location: impl Into<String>,
        position: Location,
    ) -> ShapeRef {
        Rc::new(RefCell::new(Self::new(name, location, position)))
    }

    pub fn is_scalar(&self) -> bool {
        self.shape.is_scalar()
    }

    /// Build an error anchored at this shape's declaration site.
    pub(crate) fn error(&self, kind: ErrorKind, message: impl Into<String>) -> ShapeError {
        ShapeError::new(kind, message, &self.location, self.position)
    }

    /// Clone a shape into a fresh, unshared copy.
    ///
    /// The clone gets a fresh ID, freshly cloned facet structures and
    /// freshly cloned structural links (items, union members, property
    /// shapes); inheritance parents stay shared. Used for anonymous
    /// wrapper shapes and for trial merges that must not touch the
    /// original.
    pub fn clone_detached(orig: &ShapeRef) -> ShapeRef {
        let mut memo = BTreeMap::new();
        Self::clone_with_memo(orig, &mut memo)
    }

    /// Clone a shape through a caller-supplied memo of already-cloned
    /// shapes, keyed by original ID. Cloning a connected sub-graph with
    /// one memo preserves sharing: two references to the same original
    /// become two references to the same clone.
    pub fn clone_with_memo(orig: &ShapeRef, memo: &mut BTreeMap<i64, ShapeRef>) -> ShapeRef {
        let old_id = orig.borrow().id;
        if let Some(done) = memo.get(&old_id) {
            return Rc::clone(done);
        }
        let clone = {
            let b = orig.borrow();
            BaseShape {
                id: generate_shape_id(),
                name: b.name.clone(),
                type_name: b.type_name.clone(),
                location: b.location.clone(),
                position: b.position,
                inherits: b.inherits.iter().map(Rc::clone).collect(),
                default: b.default.clone(),
                example: b.example.clone(),
                examples: b.examples.clone(),
                description: b.description.clone(),
                display_name: b.display_name.clone(),
                required: b.required,
                custom_shape_facets: b.custom_shape_facets.clone(),
                custom_domain_properties: b.custom_domain_properties.clone(),
                // Placeholder until the body is cloned below; the memo
                // entry must exist first so cyclic links resolve to the
                // clone instead of recursing forever.
                shape: Shape::Unknown(UnknownFacets::default()),
                resolved: b.resolved,
                unwrapped: b.unwrapped,
            }
        };
        let clone = Rc::new(RefCell::new(clone));
        memo.insert(old_id, Rc::clone(&clone));
        let body = orig.borrow().shape.clone_with_memo(memo);
        clone.borrow_mut().shape = body;
        clone
    }
}

#[cfg(test)]
mod tests {
    mod build;
    mod check;
    mod expr;
    mod inherit;
    mod resolve;
    mod validate;
}
