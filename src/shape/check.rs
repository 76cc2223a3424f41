// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Post-resolution consistency checks: facet-pair bounds, discriminator
//! sanity, format names, and the validity of declared default and
//! example values. Checks descend through the structural links of the
//! graph; recursion markers stop the descent.

use crate::shape::error::{ErrorKind, ShapeError};
use crate::shape::{
    ArrayFacets, BaseShape, DateTimeFacets, FileFacets, IntegerFacets, NumberFacets, ObjectFacets,
    Shape, StringFacets, UnionFacets,
};
use crate::Value;

const INTEGER_FORMATS: [&str; 6] = ["int8", "int16", "int32", "int64", "int", "long"];
const NUMBER_FORMATS: [&str; 8] = [
    "int8", "int16", "int32", "int64", "int", "long", "float", "double",
];
const DATETIME_FORMATS: [&str; 2] = ["rfc3339", "rfc2616"];

impl BaseShape {
    /// Check the shape and everything reachable from it for internal
    /// consistency.
    pub fn check(&self) -> Result<(), ShapeError> {
        match &self.shape {
            Shape::Array(f) => self.check_array(f)?,
            Shape::Object(f) => self.check_object(f)?,
            Shape::Union(f) => self.check_union(f)?,
            Shape::String(f) => self.check_string(f)?,
            Shape::Integer(f) => self.check_integer(f)?,
            Shape::Number(f) => self.check_number(f)?,
            Shape::File(f) => self.check_file(f)?,
            Shape::DateTime(f) => self.check_datetime(f)?,
            Shape::Unknown(_) => {
                return Err(self.error(
                    ErrorKind::UnresolvedReference,
                    "cannot check unresolved shape",
                ))
            }
            _ => {}
        }

        if let Some(default) = &self.default {
            self.validate(default)
                .map_err(|e| e.wrap("validate default value", &self.location, self.position))?;
        }
        if let Some(example) = &self.example {
            self.validate(example)
                .map_err(|e| e.wrap("validate example", &self.location, self.position))?;
        }
        if let Some(examples) = &self.examples {
            for (name, example) in examples {
                self.validate(example).map_err(|e| {
                    e.wrap("validate example", &self.location, self.position)
                        .with_info("example", name)
                })?;
            }
        }
        Ok(())
    }

    fn check_array(&self, f: &ArrayFacets) -> Result<(), ShapeError> {
        if let (Some(min), Some(max)) = (f.min_items, f.max_items) {
            if min > max {
                return Err(self.error(
                    ErrorKind::ConstraintViolation("minItems"),
                    "minItems must be less than or equal to maxItems",
                ));
            }
        }
        if let Some(items) = &f.items {
            items
                .borrow()
                .check()
                .map_err(|e| e.wrap("check items", &self.location, self.position))?;
        }
        Ok(())
    }

    fn check_object(&self, f: &ObjectFacets) -> Result<(), ShapeError> {
        if let (Some(min), Some(max)) = (f.min_properties, f.max_properties) {
            if min > max {
                return Err(self.error(
                    ErrorKind::ConstraintViolation("minProperties"),
                    "minProperties must be less than or equal to maxProperties",
                ));
            }
        }

        if let Some(pattern_props) = &f.pattern_properties {
            if f.additional_properties == Some(false) {
                return Err(self.error(
                    ErrorKind::PatternConflictsWithNoAdditional,
                    "pattern properties are not allowed with \"additionalProperties: false\"",
                ));
            }
            for property in pattern_props.values() {
                property.shape.borrow().check().map_err(|e| {
                    e.wrap("check pattern property", &self.location, self.position)
                        .with_info("property", property.pattern.as_str())
                })?;
            }
        }

        if let Some(props) = &f.properties {
            for property in props.values() {
                property.shape.borrow().check().map_err(|e| {
                    e.wrap("check property", &self.location, self.position)
                        .with_info("property", &property.name)
                })?;
            }
            if let Some(discriminator) = &f.discriminator {
                let property = props.get(discriminator).ok_or_else(|| {
                    self.error(
                        ErrorKind::DiscriminatorMissing,
                        "discriminator property not found",
                    )
                    .with_info("discriminator", discriminator)
                })?;
                if !property.shape.borrow().is_scalar() {
                    return Err(self
                        .error(
                            ErrorKind::DiscriminatorNotScalar,
                            "discriminator property must be a scalar",
                        )
                        .with_info("discriminator", discriminator));
                }
                let discriminator_value = f
                    .discriminator_value
                    .clone()
                    .unwrap_or_else(|| Value::from(self.name.as_str()));
                property
                    .shape
                    .borrow()
                    .validate(&discriminator_value)
                    .map_err(|e| {
                        e.wrap("validate discriminator value", &self.location, self.position)
                            .with_info("discriminator", discriminator)
                    })?;
            }
        } else if f.discriminator.is_some() {
            return Err(self.error(
                ErrorKind::DiscriminatorMissing,
                "discriminator without properties",
            ));
        }

        Ok(())
    }

    fn check_union(&self, f: &UnionFacets) -> Result<(), ShapeError> {
        for member in &f.any_of {
            member
                .borrow()
                .check()
                .map_err(|e| e.wrap("check union member", &self.location, self.position))?;
        }
        Ok(())
    }

    fn check_string(&self, f: &StringFacets) -> Result<(), ShapeError> {
        if let (Some(min), Some(max)) = (f.min_length, f.max_length) {
            if min > max {
                return Err(self.error(
                    ErrorKind::ConstraintViolation("minLength"),
                    "minLength must be less than or equal to maxLength",
                ));
            }
        }
        Ok(())
    }

    fn check_integer(&self, f: &IntegerFacets) -> Result<(), ShapeError> {
        if let (Some(min), Some(max)) = (f.minimum, f.maximum) {
            if min > max {
                return Err(self.error(
                    ErrorKind::ConstraintViolation("minimum"),
                    "minimum must be less than or equal to maximum",
                ));
            }
        }
        if f.multiple_of == Some(0) {
            return Err(self.error(
                ErrorKind::ConstraintViolation("multipleOf"),
                "multipleOf must not be zero",
            ));
        }
        if let Some(format) = &f.format {
            if !INTEGER_FORMATS.contains(&format.as_str()) {
                return Err(self
                    .error(ErrorKind::ConstraintViolation("format"), "unknown format")
                    .with_info("format", format));
            }
        }
        Ok(())
    }

    fn check_number(&self, f: &NumberFacets) -> Result<(), ShapeError> {
        if let (Some(min), Some(max)) = (f.minimum, f.maximum) {
            if min > max {
                return Err(self.error(
                    ErrorKind::ConstraintViolation("minimum"),
                    "minimum must be less than or equal to maximum",
                ));
            }
        }
        if f.multiple_of == Some(0.0) {
            return Err(self.error(
                ErrorKind::ConstraintViolation("multipleOf"),
                "multipleOf must not be zero",
            ));
        }
        if let Some(format) = &f.format {
            if !NUMBER_FORMATS.contains(&format.as_str()) {
                return Err(self
                    .error(ErrorKind::ConstraintViolation("format"), "unknown format")
                    .with_info("format", format));
            }
        }
        Ok(())
    }

    fn check_file(&self, f: &FileFacets) -> Result<(), ShapeError> {
        if let (Some(min), Some(max)) = (f.min_length, f.max_length) {
            if min > max {
                return Err(self.error(
                    ErrorKind::ConstraintViolation("minLength"),
                    "minLength must be less than or equal to maxLength",
                ));
            }
        }
        Ok(())
    }

    fn check_datetime(&self, f: &DateTimeFacets) -> Result<(), ShapeError> {
        if let Some(format) = &f.format {
            if !DATETIME_FORMATS.contains(&format.as_str()) {
                return Err(self
                    .error(ErrorKind::ConstraintViolation("format"), "unknown format")
                    .with_info("format", format));
            }
        }
        Ok(())
    }
}
