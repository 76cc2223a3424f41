// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Shape construction from RAML YAML nodes (scalar type declarations,
//! parent sequences and facet mappings). Variant facets are deferred on
//! the Unknown body until the declared type expression has been applied;
//! unknown facet names flow into the envelope's custom facets.

use crate::raml::Raml;
use crate::shape::error::{ErrorKind, ShapeError};
use crate::shape::{
    ArrayFacets, BaseShape, DateTimeFacets, FileFacets, IntegerFacets, JsonFacets, JsonSchema,
    NumberFacets, ObjectFacets, PatternProperty, Property, Shape, StringFacets, UnionFacets,
    UnknownFacets, TYPE_ANY, TYPE_ARRAY, TYPE_BOOLEAN, TYPE_DATETIME, TYPE_DATETIME_ONLY,
    TYPE_DATE_ONLY, TYPE_FILE, TYPE_INTEGER, TYPE_JSON, TYPE_NIL, TYPE_NUMBER, TYPE_OBJECT,
    TYPE_STRING, TYPE_TIME_ONLY, TYPE_UNION,
};
use crate::shape::ShapeRef;
use crate::{Location, Value};

use indexmap::IndexMap;
use regex::Regex;
use serde::de::DeserializeOwned;

/// Strip a single trailing `?` marking an implicitly optional property.
fn chomp_implicit_optional(node_name: &str) -> (&str, bool) {
    match node_name.strip_suffix('?') {
        Some(stripped) => (stripped, true),
        None => (node_name, false),
    }
}

/// Decode a facet node into a plain Rust value, reporting the facet name
/// on failure.
fn decode<T: DeserializeOwned>(
    value: &serde_yaml::Value,
    facet: &'static str,
    location: &str,
) -> Result<T, ShapeError> {
    serde_yaml::from_value(value.clone()).map_err(|e| {
        ShapeError::new(
            ErrorKind::Parse,
            format!("decode: {e}"),
            location,
            Location::default(),
        )
        .with_info("facet", facet)
    })
}

fn data_value(value: &serde_yaml::Value, location: &str) -> Result<Value, ShapeError> {
    Value::from_yaml_value(value.clone()).map_err(|e| {
        ShapeError::new(
            ErrorKind::Parse,
            format!("decode value: {e}"),
            location,
            Location::default(),
        )
    })
}

impl Raml {
    /// Construct an unresolved shape from a YAML type-definition node.
    ///
    /// The node is either a scalar type expression, a sequence of parent
    /// expressions, or a mapping carrying `type` plus facets. The result
    /// is an Unknown-bodied shape; resolution types it.
    pub fn make_shape(
        &self,
        node: &serde_yaml::Value,
        name: &str,
        location: &str,
    ) -> Result<ShapeRef, ShapeError> {
        let base = BaseShape::new_ref(name, location, Location::default());
        match node {
            serde_yaml::Value::Null => {}
            serde_yaml::Value::String(expr) => {
                let mut b = base.borrow_mut();
                b.shape = Shape::Unknown(UnknownFacets {
                    declared: vec![expr.clone()],
                    facets: Vec::new(),
                });
            }
            serde_yaml::Value::Sequence(parents) => {
                let mut declared = Vec::with_capacity(parents.len());
                for parent in parents {
                    let expr = parent.as_str().ok_or_else(|| {
                        base.borrow()
                            .error(ErrorKind::Parse, "parent type must be a string")
                    })?;
                    declared.push(expr.to_string());
                }
                base.borrow_mut().shape = Shape::Unknown(UnknownFacets {
                    declared,
                    facets: Vec::new(),
                });
            }
            serde_yaml::Value::Mapping(mapping) => {
                self.unmarshal_type_declaration(&base, mapping)?;
            }
            _ => {
                return Err(base.borrow().error(
                    ErrorKind::Parse,
                    "type declaration must be a string, sequence or mapping",
                ))
            }
        }
        Ok(base)
    }

    /// Split a type-declaration mapping into envelope facets, the
    /// declared type, and deferred variant facets.
    fn unmarshal_type_declaration(
        &self,
        base: &ShapeRef,
        mapping: &serde_yaml::Mapping,
    ) -> Result<(), ShapeError> {
        let location = base.borrow().location.clone();
        let mut declared = Vec::new();
        let mut deferred = Vec::new();
        for (key, value) in mapping {
            let key = key.as_str().ok_or_else(|| {
                base.borrow()
                    .error(ErrorKind::Parse, "facet name must be a string")
            })?;
            match key {
                "type" => match value {
                    serde_yaml::Value::String(expr) => declared.push(expr.clone()),
                    serde_yaml::Value::Sequence(parents) => {
                        for parent in parents {
                            let expr = parent.as_str().ok_or_else(|| {
                                base.borrow()
                                    .error(ErrorKind::Parse, "parent type must be a string")
                            })?;
                            declared.push(expr.to_string());
                        }
                    }
                    _ => {
                        return Err(base.borrow().error(
                            ErrorKind::Parse,
                            "type facet must be a string or a sequence of strings",
                        ))
                    }
                },
                "default" => base.borrow_mut().default = Some(data_value(value, &location)?),
                "example" => base.borrow_mut().example = Some(data_value(value, &location)?),
                "examples" => {
                    let examples: IndexMap<String, Value> =
                        decode(value, "examples", &location)?;
                    base.borrow_mut().examples = Some(examples);
                }
                "description" => {
                    base.borrow_mut().description = Some(decode(value, "description", &location)?);
                }
                "displayName" => {
                    base.borrow_mut().display_name =
                        Some(decode(value, "displayName", &location)?);
                }
                "required" => {
                    base.borrow_mut().required = Some(decode(value, "required", &location)?);
                }
                _ if key.starts_with('(') && key.ends_with(')') && key.len() > 2 => {
                    let name = key[1..key.len() - 1].to_string();
                    let annotation = data_value(value, &location)?;
                    base.borrow_mut()
                        .custom_domain_properties
                        .insert(name, annotation);
                }
                _ => deferred.push((key.to_string(), value.clone())),
            }
        }
        base.borrow_mut().shape = Shape::Unknown(UnknownFacets {
            declared,
            facets: deferred,
        });
        Ok(())
    }

    /// Materialize a concrete variant of `type_name` into the target,
    /// consuming the facet nodes deferred on its Unknown body.
    pub(crate) fn make_concrete(
        &self,
        target: &ShapeRef,
        type_name: &str,
    ) -> Result<(), ShapeError> {
        let facets = {
            let mut t = target.borrow_mut();
            match &mut t.shape {
                Shape::Unknown(u) => std::mem::take(&mut u.facets),
                _ => Vec::new(),
            }
        };
        let mut body = match type_name {
            TYPE_ANY => Shape::Any,
            TYPE_NIL => Shape::Nil,
            TYPE_BOOLEAN => Shape::Boolean,
            TYPE_INTEGER => Shape::Integer(IntegerFacets::default()),
            TYPE_NUMBER => Shape::Number(NumberFacets::default()),
            TYPE_STRING => Shape::String(StringFacets::default()),
            TYPE_DATE_ONLY => Shape::DateOnly,
            TYPE_TIME_ONLY => Shape::TimeOnly,
            TYPE_DATETIME => Shape::DateTime(DateTimeFacets::default()),
            TYPE_DATETIME_ONLY => Shape::DateTimeOnly,
            TYPE_FILE => Shape::File(FileFacets::default()),
            TYPE_OBJECT => Shape::Object(ObjectFacets::default()),
            TYPE_ARRAY => Shape::Array(ArrayFacets::default()),
            TYPE_UNION => Shape::Union(UnionFacets::default()),
            TYPE_JSON => Shape::Json(JsonFacets::default()),
            _ => {
                return Err(target.borrow().error(
                    ErrorKind::UnknownIdentifier,
                    format!("cannot make shape of type `{type_name}`"),
                ))
            }
        };
        self.unmarshal_facets(target, &mut body, facets)?;
        let mut t = target.borrow_mut();
        t.type_name = body.type_name().to_string();
        t.shape = body;
        Ok(())
    }

    /// Turn an inline JSON schema declaration into a Json-bodied shape.
    pub(crate) fn make_json(&self, target: &ShapeRef, raw: &str) -> Result<(), ShapeError> {
        let schema = JsonSchema::compile(raw).map_err(|e| {
            target
                .borrow()
                .error(ErrorKind::Parse, format!("compile json schema: {e}"))
        })?;
        let mut t = target.borrow_mut();
        t.type_name = TYPE_JSON.to_string();
        t.shape = Shape::Json(JsonFacets {
            schema: Some(schema),
            raw: Some(raw.to_string()),
        });
        Ok(())
    }

    /// Populate a variant body from the deferred facet nodes. Facet
    /// names outside the variant's vocabulary become custom facets.
    pub(crate) fn unmarshal_facets(
        &self,
        base: &ShapeRef,
        shape: &mut Shape,
        facets: Vec<(String, serde_yaml::Value)>,
    ) -> Result<(), ShapeError> {
        let location = base.borrow().location.clone();
        let mut custom = Vec::new();
        for (key, value) in facets {
            let consumed = match shape {
                Shape::Array(f) => self.unmarshal_array_facet(f, &key, &value, &location)?,
                Shape::Object(f) => self.unmarshal_object_facet(f, &key, &value, &location)?,
                Shape::String(f) => Self::unmarshal_string_facet(f, &key, &value, &location)?,
                Shape::Integer(f) => Self::unmarshal_integer_facet(f, &key, &value, &location)?,
                Shape::Number(f) => Self::unmarshal_number_facet(f, &key, &value, &location)?,
                Shape::File(f) => Self::unmarshal_file_facet(f, &key, &value, &location)?,
                Shape::DateTime(f) => match key.as_str() {
                    "format" => {
                        f.format = Some(decode(&value, "format", &location)?);
                        true
                    }
                    _ => false,
                },
                _ => false,
            };
            if !consumed {
                custom.push((key, data_value(&value, &location)?));
            }
        }
        let mut b = base.borrow_mut();
        for (key, value) in custom {
            b.custom_shape_facets.insert(key, value);
        }
        Ok(())
    }

    fn unmarshal_array_facet(
        &self,
        facets: &mut ArrayFacets,
        key: &str,
        value: &serde_yaml::Value,
        location: &str,
    ) -> Result<bool, ShapeError> {
        match key {
            "minItems" => facets.min_items = Some(decode(value, "minItems", location)?),
            "maxItems" => facets.max_items = Some(decode(value, "maxItems", location)?),
            "uniqueItems" => facets.unique_items = Some(decode(value, "uniqueItems", location)?),
            "items" => {
                let items = self.make_shape(value, "items", location).map_err(|e| {
                    e.wrap("make items shape", location, Location::default())
                        .with_info("facet", "items")
                })?;
                facets.items = Some(items);
            }
            _ => return Ok(false),
        }
        Ok(true)
    }

    fn unmarshal_object_facet(
        &self,
        facets: &mut ObjectFacets,
        key: &str,
        value: &serde_yaml::Value,
        location: &str,
    ) -> Result<bool, ShapeError> {
        match key {
            "additionalProperties" => {
                facets.additional_properties =
                    Some(decode(value, "additionalProperties", location)?);
            }
            "discriminator" => {
                facets.discriminator = Some(decode(value, "discriminator", location)?);
            }
            "discriminatorValue" => {
                facets.discriminator_value = Some(data_value(value, location)?);
            }
            "minProperties" => {
                facets.min_properties = Some(decode(value, "minProperties", location)?);
            }
            "maxProperties" => {
                facets.max_properties = Some(decode(value, "maxProperties", location)?);
            }
            "properties" => {
                let mapping = value.as_mapping().ok_or_else(|| {
                    ShapeError::new(
                        ErrorKind::Parse,
                        "properties facet must be a mapping",
                        location,
                        Location::default(),
                    )
                })?;
                for (node_name, data) in mapping {
                    let node_name = node_name.as_str().ok_or_else(|| {
                        ShapeError::new(
                            ErrorKind::Parse,
                            "property name must be a string",
                            location,
                            Location::default(),
                        )
                    })?;
                    self.unmarshal_property(facets, node_name, data, location)
                        .map_err(|e| {
                            e.wrap("unmarshal property", location, Location::default())
                                .with_info("property", node_name)
                        })?;
                }
            }
            _ => return Ok(false),
        }
        Ok(true)
    }

    fn unmarshal_string_facet(
        facets: &mut StringFacets,
        key: &str,
        value: &serde_yaml::Value,
        location: &str,
    ) -> Result<bool, ShapeError> {
        match key {
            "pattern" => {
                let pattern: String = decode(value, "pattern", location)?;
                let compiled = Regex::new(&pattern).map_err(|e| {
                    ShapeError::new(
                        ErrorKind::Parse,
                        format!("compile pattern: {e}"),
                        location,
                        Location::default(),
                    )
                    .with_info("facet", "pattern")
                })?;
                facets.pattern = Some(compiled);
            }
            "minLength" => facets.min_length = Some(decode(value, "minLength", location)?),
            "maxLength" => facets.max_length = Some(decode(value, "maxLength", location)?),
            "enum" => facets.enum_values = Some(decode(value, "enum", location)?),
            _ => return Ok(false),
        }
        Ok(true)
    }

    fn unmarshal_integer_facet(
        facets: &mut IntegerFacets,
        key: &str,
        value: &serde_yaml::Value,
        location: &str,
    ) -> Result<bool, ShapeError> {
        match key {
            "minimum" => facets.minimum = Some(decode(value, "minimum", location)?),
            "maximum" => facets.maximum = Some(decode(value, "maximum", location)?),
            "multipleOf" => facets.multiple_of = Some(decode(value, "multipleOf", location)?),
            "format" => facets.format = Some(decode(value, "format", location)?),
            _ => return Ok(false),
        }
        Ok(true)
    }

    fn unmarshal_number_facet(
        facets: &mut NumberFacets,
        key: &str,
        value: &serde_yaml::Value,
        location: &str,
    ) -> Result<bool, ShapeError> {
        match key {
            "minimum" => facets.minimum = Some(decode(value, "minimum", location)?),
            "maximum" => facets.maximum = Some(decode(value, "maximum", location)?),
            "multipleOf" => facets.multiple_of = Some(decode(value, "multipleOf", location)?),
            "format" => facets.format = Some(decode(value, "format", location)?),
            _ => return Ok(false),
        }
        Ok(true)
    }

    fn unmarshal_file_facet(
        facets: &mut FileFacets,
        key: &str,
        value: &serde_yaml::Value,
        location: &str,
    ) -> Result<bool, ShapeError> {
        match key {
            "fileTypes" => facets.file_types = Some(decode(value, "fileTypes", location)?),
            "minLength" => facets.min_length = Some(decode(value, "minLength", location)?),
            "maxLength" => facets.max_length = Some(decode(value, "maxLength", location)?),
            _ => return Ok(false),
        }
        Ok(true)
    }

    fn unmarshal_property(
        &self,
        facets: &mut ObjectFacets,
        node_name: &str,
        data: &serde_yaml::Value,
        location: &str,
    ) -> Result<(), ShapeError> {
        let (property_name, has_implicit_optional) = chomp_implicit_optional(node_name);
        if property_name.len() > 1
            && property_name.starts_with('/')
            && property_name.ends_with('/')
        {
            let property = self.make_pattern_property(
                node_name,
                property_name,
                data,
                location,
                has_implicit_optional,
            )?;
            facets
                .pattern_properties
                .get_or_insert_with(IndexMap::new)
                .insert(property_name.to_string(), property);
            return Ok(());
        }
        let property =
            self.make_property(node_name, property_name, data, location, has_implicit_optional)?;
        facets
            .properties
            .get_or_insert_with(IndexMap::new)
            .insert(property.name.clone(), property);
        Ok(())
    }

    fn make_property(
        &self,
        node_name: &str,
        property_name: &str,
        node: &serde_yaml::Value,
        location: &str,
        has_implicit_optional: bool,
    ) -> Result<Property, ShapeError> {
        let shape = self.make_shape(node, node_name, location)?;
        let shape_required = shape.borrow().required;
        let (name, required) = match shape_required {
            // Without an explicit "required" facet, requirement depends
            // only on whether the node name carried a "?".
            None => (property_name.to_string(), !has_implicit_optional),
            // An explicit "required" facet prevails over the "?" marker,
            // and the property keeps the node name including the "?".
            Some(explicit) => {
                let name = if has_implicit_optional {
                    node_name.to_string()
                } else {
                    property_name.to_string()
                };
                (name, explicit)
            }
        };
        Ok(Property {
            name,
            shape,
            required,
        })
    }

    fn make_pattern_property(
        &self,
        node_name: &str,
        property_name: &str,
        node: &serde_yaml::Value,
        location: &str,
        has_implicit_optional: bool,
    ) -> Result<PatternProperty, ShapeError> {
        let shape = self.make_shape(node, node_name, location)?;
        // Pattern properties cannot be required.
        if shape.borrow().required.is_some() || has_implicit_optional {
            return Err(ShapeError::new(
                ErrorKind::ConstraintViolation("required"),
                "'required' facet is not supported on pattern property",
                location,
                Location::default(),
            )
            .with_info("property", property_name));
        }
        let pattern = Regex::new(&property_name[1..property_name.len() - 1]).map_err(|e| {
            ShapeError::new(
                ErrorKind::Parse,
                format!("compile pattern: {e}"),
                location,
                Location::default(),
            )
            .with_info("property", property_name)
        })?;
        Ok(PatternProperty { pattern, shape })
    }
}
