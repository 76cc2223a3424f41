// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Runtime validation: a lockstep walk of a shape and a value, reporting
//! the first constraint violation together with the path that reached
//! it. Paths are dotted for object properties and bracketed for array
//! indices, e.g. `$.items[3].name`. Validation never mutates the graph.

use crate::shape::error::{ErrorKind, ShapeError};
use crate::shape::{
    ArrayFacets, BaseShape, DateTimeFacets, FileFacets, IntegerFacets, JsonFacets, NumberFacets,
    ObjectFacets, RecursiveFacets, Shape, StringFacets, UnionFacets,
};
use crate::Value;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};

impl BaseShape {
    /// Validate a runtime value against this shape.
    pub fn validate(&self, value: &Value) -> Result<(), ShapeError> {
        self.validate_at(value, "$")
    }

    pub(crate) fn validate_at(&self, value: &Value, path: &str) -> Result<(), ShapeError> {
        match &self.shape {
            Shape::Any => Ok(()),
            Shape::Nil => match value {
                Value::Null => Ok(()),
                _ => Err(self.mismatch("nil", value, path)),
            },
            Shape::Boolean => match value {
                Value::Bool(_) => Ok(()),
                _ => Err(self.mismatch("boolean", value, path)),
            },
            Shape::Integer(f) => self.validate_integer(f, value, path),
            Shape::Number(f) => self.validate_number(f, value, path),
            Shape::String(f) => self.validate_string(f, value, path),
            Shape::DateOnly => {
                let s = self.expect_string("date-only", value, path)?;
                if NaiveDate::parse_from_str(s, "%Y-%m-%d").is_err() {
                    return Err(self.date_mismatch("date-only", s, path));
                }
                Ok(())
            }
            Shape::TimeOnly => {
                let s = self.expect_string("time-only", value, path)?;
                if NaiveTime::parse_from_str(s, "%H:%M:%S").is_err()
                    && NaiveTime::parse_from_str(s, "%H:%M:%S%.f").is_err()
                {
                    return Err(self.date_mismatch("time-only", s, path));
                }
                Ok(())
            }
            Shape::DateTime(f) => self.validate_datetime(f, value, path),
            Shape::DateTimeOnly => {
                let s = self.expect_string("datetime-only", value, path)?;
                if NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S").is_err()
                    && NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f").is_err()
                {
                    return Err(self.date_mismatch("datetime-only", s, path));
                }
                Ok(())
            }
            Shape::File(f) => self.validate_file(f, value, path),
            Shape::Object(f) => self.validate_object(f, value, path),
            Shape::Array(f) => self.validate_array(f, value, path),
            Shape::Union(f) => self.validate_union(f, value, path),
            Shape::Json(f) => self.validate_json(f, value, path),
            Shape::Unknown(_) => Err(self
                .error(
                    ErrorKind::CannotValidateUnknown,
                    "cannot validate against unknown shape",
                )
                .with_info("path", path)),
            Shape::Recursive(f) => self.validate_recursive(f, value, path),
        }
    }

    fn mismatch(&self, expected: &str, value: &Value, path: &str) -> ShapeError {
        self.error(
            ErrorKind::Validation,
            format!("invalid type: expected {expected}, got {}", value.type_name()),
        )
        .with_info("path", path)
    }

    fn date_mismatch(&self, expected: &str, text: &str, path: &str) -> ShapeError {
        self.error(
            ErrorKind::Validation,
            format!("value is not a valid {expected} string"),
        )
        .with_info("value", text)
        .with_info("path", path)
    }

    fn facet_violation(
        &self,
        facet: &'static str,
        message: impl Into<String>,
        path: &str,
    ) -> ShapeError {
        self.error(ErrorKind::ConstraintViolation(facet), message)
            .with_info("path", path)
    }

    fn expect_string<'v>(
        &self,
        expected: &str,
        value: &'v Value,
        path: &str,
    ) -> Result<&'v str, ShapeError> {
        match value {
            Value::String(s) => Ok(s.as_ref()),
            _ => Err(self.mismatch(expected, value, path)),
        }
    }

    fn validate_integer(
        &self,
        f: &IntegerFacets,
        value: &Value,
        path: &str,
    ) -> Result<(), ShapeError> {
        let number = match value {
            Value::Number(n) => n,
            _ => return Err(self.mismatch("integer", value, path)),
        };
        let int_value = match number.as_i64() {
            Some(v) => v,
            None => return Err(self.mismatch("integer", value, path)),
        };
        if let Some(min) = f.minimum {
            if int_value < min {
                return Err(self
                    .facet_violation("minimum", format!("value must be at least {min}"), path)
                    .with_info("value", int_value));
            }
        }
        if let Some(max) = f.maximum {
            if int_value > max {
                return Err(self
                    .facet_violation("maximum", format!("value must be at most {max}"), path)
                    .with_info("value", int_value));
            }
        }
        if let Some(multiple) = f.multiple_of {
            if multiple != 0 && int_value % multiple != 0 {
                return Err(self
                    .facet_violation(
                        "multipleOf",
                        format!("value must be a multiple of {multiple}"),
                        path,
                    )
                    .with_info("value", int_value));
            }
        }
        if let Some(format) = &f.format {
            let (lo, hi) = match format.as_str() {
                "int8" => (i64::from(i8::MIN), i64::from(i8::MAX)),
                "int16" => (i64::from(i16::MIN), i64::from(i16::MAX)),
                "int32" | "int" => (i64::from(i32::MIN), i64::from(i32::MAX)),
                _ => (i64::MIN, i64::MAX),
            };
            if int_value < lo || int_value > hi {
                return Err(self
                    .facet_violation(
                        "format",
                        format!("value does not fit format {format}"),
                        path,
                    )
                    .with_info("value", int_value));
            }
        }
        Ok(())
    }

    fn validate_number(
        &self,
        f: &NumberFacets,
        value: &Value,
        path: &str,
    ) -> Result<(), ShapeError> {
        let number = match value {
            Value::Number(n) => n.as_f64(),
            _ => return Err(self.mismatch("number", value, path)),
        };
        if let Some(min) = f.minimum {
            if number < min {
                return Err(self
                    .facet_violation("minimum", format!("value must be at least {min}"), path)
                    .with_info("value", number));
            }
        }
        if let Some(max) = f.maximum {
            if number > max {
                return Err(self
                    .facet_violation("maximum", format!("value must be at most {max}"), path)
                    .with_info("value", number));
            }
        }
        if let Some(multiple) = f.multiple_of {
            if multiple != 0.0 && number % multiple != 0.0 {
                return Err(self
                    .facet_violation(
                        "multipleOf",
                        format!("value must be a multiple of {multiple}"),
                        path,
                    )
                    .with_info("value", number));
            }
        }
        Ok(())
    }

    fn validate_string(
        &self,
        f: &StringFacets,
        value: &Value,
        path: &str,
    ) -> Result<(), ShapeError> {
        let s = self.expect_string("string", value, path)?;
        let length = s.len() as u64;
        if let Some(min) = f.min_length {
            if length < min {
                return Err(self.facet_violation(
                    "minLength",
                    format!("string must be at least {min} characters long"),
                    path,
                ));
            }
        }
        if let Some(max) = f.max_length {
            if length > max {
                return Err(self.facet_violation(
                    "maxLength",
                    format!("string must be at most {max} characters long"),
                    path,
                ));
            }
        }
        if let Some(pattern) = &f.pattern {
            if !pattern.is_match(s) {
                return Err(self
                    .facet_violation(
                        "pattern",
                        format!("string does not match pattern `{}`", pattern.as_str()),
                        path,
                    )
                    .with_info("value", s));
            }
        }
        if let Some(values) = &f.enum_values {
            if !values.contains(value) {
                return Err(self
                    .facet_violation("enum", "value is not among the allowed values", path)
                    .with_info("value", s));
            }
        }
        Ok(())
    }

    fn validate_datetime(
        &self,
        f: &DateTimeFacets,
        value: &Value,
        path: &str,
    ) -> Result<(), ShapeError> {
        let s = self.expect_string("datetime", value, path)?;
        let ok = match f.format.as_deref() {
            Some("rfc2616") => {
                NaiveDateTime::parse_from_str(s, "%a, %d %b %Y %H:%M:%S GMT").is_ok()
            }
            _ => DateTime::parse_from_rfc3339(s).is_ok(),
        };
        if !ok {
            return Err(self.date_mismatch("datetime", s, path));
        }
        Ok(())
    }

    fn validate_file(&self, f: &FileFacets, value: &Value, path: &str) -> Result<(), ShapeError> {
        let s = self.expect_string("file", value, path)?;
        let length = s.len() as u64;
        if let Some(min) = f.min_length {
            if length < min {
                return Err(self.facet_violation(
                    "minLength",
                    format!("file content must be at least {min} bytes"),
                    path,
                ));
            }
        }
        if let Some(max) = f.max_length {
            if length > max {
                return Err(self.facet_violation(
                    "maxLength",
                    format!("file content must be at most {max} bytes"),
                    path,
                ));
            }
        }
        Ok(())
    }

    fn validate_array(
        &self,
        f: &ArrayFacets,
        value: &Value,
        path: &str,
    ) -> Result<(), ShapeError> {
        let items = match value {
            Value::Array(items) => items,
            _ => return Err(self.mismatch("array", value, path)),
        };
        let length = items.len() as u64;
        if let Some(min) = f.min_items {
            if length < min {
                return Err(self.facet_violation(
                    "minItems",
                    format!("array must have at least {min} items"),
                    path,
                ));
            }
        }
        if let Some(max) = f.max_items {
            if length > max {
                return Err(self.facet_violation(
                    "maxItems",
                    format!("array must have not more than {max} items"),
                    path,
                ));
            }
        }
        for (index, item) in items.iter().enumerate() {
            let item_path = format!("{path}[{index}]");
            if let Some(item_shape) = &f.items {
                item_shape
                    .borrow()
                    .validate_at(item, &item_path)
                    .map_err(|e| {
                        e.wrap(
                            format!("validate array item {item_path}"),
                            &self.location,
                            self.position,
                        )
                    })?;
            }
        }
        if f.unique_items == Some(true) {
            // Structural equality, first duplicate wins.
            for (i, item) in items.iter().enumerate() {
                if items.iter().skip(i + 1).any(|other| other == item) {
                    return Err(self.facet_violation(
                        "uniqueItems",
                        "array contains duplicate items",
                        path,
                    ));
                }
            }
        }
        Ok(())
    }

    fn validate_object(
        &self,
        f: &ObjectFacets,
        value: &Value,
        path: &str,
    ) -> Result<(), ShapeError> {
        let fields = match value {
            Value::Object(fields) => fields,
            _ => return Err(self.mismatch("object", value, path)),
        };

        if let Some(props) = &f.properties {
            for property in props.values() {
                if property.required && !fields.contains_key(property.name.as_str()) {
                    return Err(self
                        .facet_violation(
                            "required",
                            format!("missing required property `{}`", property.name),
                            path,
                        )
                        .with_info("property", &property.name));
                }
            }
        }

        let restricted = f.additional_properties == Some(false);
        for (key, item) in fields.iter() {
            let property_path = format!("{path}.{key}");
            // Explicitly defined properties have priority over pattern
            // properties.
            if let Some(props) = &f.properties {
                if let Some(property) = props.get(key.as_ref()) {
                    // An optional property may be explicitly null.
                    if item.is_null() && !property.required {
                        continue;
                    }
                    property
                        .shape
                        .borrow()
                        .validate_at(item, &property_path)
                        .map_err(|e| {
                            e.wrap(
                                format!("validate property {property_path}"),
                                &self.location,
                                self.position,
                            )
                        })?;
                    continue;
                }
            }
            if let Some(pattern_props) = &f.pattern_properties {
                // Keys that match no pattern count as additional
                // properties; the first declared pattern whose shape
                // accepts the value prevails.
                let mut matched = false;
                for property in pattern_props.values() {
                    if property.pattern.is_match(key.as_ref())
                        && property.shape.borrow().validate_at(item, &property_path).is_ok()
                    {
                        matched = true;
                        break;
                    }
                }
                if matched {
                    continue;
                }
            }
            if restricted {
                return Err(self
                    .facet_violation(
                        "additionalProperties",
                        format!("unexpected additional property `{key}`"),
                        path,
                    )
                    .with_info("property", key));
            }
        }

        let length = fields.len() as u64;
        if let Some(min) = f.min_properties {
            if length < min {
                return Err(self.facet_violation(
                    "minProperties",
                    format!("object must have at least {min} properties"),
                    path,
                ));
            }
        }
        if let Some(max) = f.max_properties {
            if length > max {
                return Err(self.facet_violation(
                    "maxProperties",
                    format!("object must have not more than {max} properties"),
                    path,
                ));
            }
        }

        Ok(())
    }

    fn validate_union(
        &self,
        f: &UnionFacets,
        value: &Value,
        path: &str,
    ) -> Result<(), ShapeError> {
        // Alternatives are tried in order; their individual failures are
        // intentionally not surfaced.
        for member in &f.any_of {
            if member.borrow().validate_at(value, path).is_ok() {
                return Ok(());
            }
        }
        Err(self
            .error(ErrorKind::Validation, "value does not match any union member")
            .with_info("path", path))
    }

    fn validate_json(&self, f: &JsonFacets, value: &Value, path: &str) -> Result<(), ShapeError> {
        if let Some(schema) = &f.schema {
            schema.validate(value).map_err(|message| {
                self.error(ErrorKind::Validation, format!("json schema: {message}"))
                    .with_info("path", path)
            })?;
        }
        Ok(())
    }

    fn validate_recursive(
        &self,
        f: &RecursiveFacets,
        value: &Value,
        path: &str,
    ) -> Result<(), ShapeError> {
        let head = f.head.upgrade().ok_or_else(|| {
            self.error(
                ErrorKind::CycleNotBreakable,
                "recursive shape head no longer exists",
            )
        })?;
        let result = head.borrow().validate_at(value, path);
        result.map_err(|e| e.wrap("validate recursive shape", &self.location, self.position))
    }
}
