// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! The inheritance engine: folding a parent (source) shape into a child
//! (target) shape in place.
//!
//! Constraints may tighten but never loosen: a child can raise a
//! minimum, lower a maximum, shrink an enum, or add properties, and any
//! move in the other direction is a constraint violation. Where the
//! child leaves a facet unset, it inherits the parent's value.

use crate::raml::Raml;
use crate::shape::error::{ErrorKind, ShapeError};
use crate::shape::{
    ArrayFacets, BaseShape, DateTimeFacets, FileFacets, IntegerFacets, JsonFacets, NumberFacets,
    ObjectFacets, Shape, ShapeRef, StringFacets, UnionFacets, TYPE_UNION,
};

use std::rc::Rc;

/// Fold `source` into `target` in place.
///
/// A recursive source is unwrapped to the head of its cycle before
/// matching. `any` on either side succeeds without transferring facets.
/// Other than the union special cases, source and target must be the
/// same variant.
pub fn inherit(target: &ShapeRef, source: &ShapeRef) -> Result<(), ShapeError> {
    if Rc::ptr_eq(target, source) {
        return Ok(());
    }
    let source = {
        let s = source.borrow();
        match &s.shape {
            Shape::Recursive(r) => match r.head.upgrade() {
                Some(head) => head,
                None => {
                    return Err(s.error(
                        ErrorKind::CycleNotBreakable,
                        "recursive shape head no longer exists",
                    ))
                }
            },
            _ => Rc::clone(source),
        }
    };
    if Rc::ptr_eq(target, &source) {
        return Ok(());
    }

    {
        let t = target.borrow();
        match &t.shape {
            Shape::Recursive(_) => {
                return Err(t.error(
                    ErrorKind::CannotInheritRecursive,
                    "cannot inherit into a recursive shape",
                ))
            }
            Shape::Unknown(_) => {
                return Err(t.error(
                    ErrorKind::IncompatibleType,
                    "cannot inherit into an unresolved shape",
                ))
            }
            Shape::Any => return Ok(()),
            _ => {}
        }
    }

    let source_body = source.borrow().shape.clone();
    match &source_body {
        Shape::Any => return Ok(()),
        Shape::Unknown(_) => {
            return Err(target.borrow().error(
                ErrorKind::IncompatibleType,
                "cannot inherit from an unresolved shape",
            ))
        }
        Shape::Union(facets) => {
            let target_is_union = matches!(target.borrow().shape, Shape::Union(_));
            if !target_is_union {
                return inherit_from_union_source(target, facets);
            }
        }
        _ => {}
    }

    let target_tag = target.borrow().shape.type_name();
    let source_tag = source_body.type_name();
    if target_tag != source_tag {
        return Err(target
            .borrow()
            .error(
                ErrorKind::IncompatibleType,
                "cannot inherit from different type",
            )
            .with_info("source", source_tag)
            .with_info("target", target_tag));
    }

    // Take the body out while merging so recursive merges on linked
    // shapes can borrow freely.
    let mut body = std::mem::replace(&mut target.borrow_mut().shape, Shape::Any);
    let result = merge_bodies(target, &mut body, source_body);
    target.borrow_mut().shape = body;
    result
}

fn merge_bodies(env: &ShapeRef, target: &mut Shape, source: Shape) -> Result<(), ShapeError> {
    match (target, source) {
        (Shape::Array(t), Shape::Array(s)) => inherit_array(env, t, s),
        (Shape::Object(t), Shape::Object(s)) => inherit_object(env, t, s),
        (Shape::Union(t), Shape::Union(s)) => inherit_union(env, t, s),
        (Shape::String(t), Shape::String(s)) => inherit_string(env, t, s),
        (Shape::Integer(t), Shape::Integer(s)) => inherit_integer(env, t, s),
        (Shape::Number(t), Shape::Number(s)) => inherit_number(env, t, s),
        (Shape::File(t), Shape::File(s)) => inherit_file(env, t, s),
        (Shape::DateTime(t), Shape::DateTime(s)) => inherit_datetime(t, s),
        (Shape::Json(t), Shape::Json(s)) => inherit_json(env, t, s),
        // Facet-free variants have nothing to merge.
        _ => Ok(()),
    }
}

fn bound_violation(
    env: &ShapeRef,
    facet: &'static str,
    source: impl std::fmt::Display,
    target: impl std::fmt::Display,
) -> ShapeError {
    env.borrow()
        .error(
            ErrorKind::ConstraintViolation(facet),
            format!("{facet} constraint violation"),
        )
        .with_info("source", source)
        .with_info("target", target)
}

fn inherit_array(env: &ShapeRef, t: &mut ArrayFacets, s: ArrayFacets) -> Result<(), ShapeError> {
    if let Some(source_items) = s.items {
        match &t.items {
            Some(target_items) => {
                let target_items = Rc::clone(target_items);
                inherit(&target_items, &source_items).map_err(|e| {
                    let b = env.borrow();
                    e.wrap("merge array items", &b.location, b.position)
                })?;
            }
            None => t.items = Some(source_items),
        }
    }
    match (t.min_items, s.min_items) {
        (None, source) => t.min_items = source,
        (Some(tv), Some(sv)) if tv < sv => {
            return Err(bound_violation(env, "minItems", sv, tv));
        }
        _ => {}
    }
    match (t.max_items, s.max_items) {
        (None, source) => t.max_items = source,
        (Some(tv), Some(sv)) if tv > sv => {
            return Err(bound_violation(env, "maxItems", sv, tv));
        }
        _ => {}
    }
    match (t.unique_items, s.unique_items) {
        (None, source) => t.unique_items = source,
        (Some(false), Some(true)) => {
            return Err(bound_violation(env, "uniqueItems", true, false));
        }
        _ => {}
    }
    Ok(())
}

fn inherit_object(env: &ShapeRef, t: &mut ObjectFacets, s: ObjectFacets) -> Result<(), ShapeError> {
    // Discriminator and additionalProperties are inherited as-is.
    if t.additional_properties.is_none() {
        t.additional_properties = s.additional_properties;
    }
    if t.discriminator.is_none() {
        t.discriminator = s.discriminator;
    }
    match (t.min_properties, s.min_properties) {
        (None, source) => t.min_properties = source,
        (Some(tv), Some(sv)) if tv < sv => {
            return Err(bound_violation(env, "minProperties", sv, tv));
        }
        _ => {}
    }
    match (t.max_properties, s.max_properties) {
        (None, source) => t.max_properties = source,
        (Some(tv), Some(sv)) if tv > sv => {
            return Err(bound_violation(env, "maxProperties", sv, tv));
        }
        _ => {}
    }

    if let Some(source_props) = s.properties {
        match &mut t.properties {
            Some(target_props) => {
                for (key, source_prop) in source_props {
                    if let Some(target_prop) = target_props.get(&key) {
                        if source_prop.required && !target_prop.required {
                            return Err(env
                                .borrow()
                                .error(
                                    ErrorKind::RequiredDemoted,
                                    "cannot make required property optional",
                                )
                                .with_info("property", &key)
                                .with_info("source", source_prop.required)
                                .with_info("target", target_prop.required));
                        }
                        let target_shape = Rc::clone(&target_prop.shape);
                        inherit(&target_shape, &source_prop.shape).map_err(|e| {
                            let b = env.borrow();
                            e.wrap("inherit property", &b.location, b.position)
                                .with_info("property", &key)
                        })?;
                    } else {
                        target_props.insert(key, source_prop);
                    }
                }
            }
            None => t.properties = Some(source_props),
        }
    }

    if let Some(source_props) = s.pattern_properties {
        match &mut t.pattern_properties {
            Some(target_props) => {
                for (key, source_prop) in source_props {
                    if let Some(target_prop) = target_props.get(&key) {
                        let target_shape = Rc::clone(&target_prop.shape);
                        inherit(&target_shape, &source_prop.shape).map_err(|e| {
                            let b = env.borrow();
                            e.wrap("inherit pattern property", &b.location, b.position)
                                .with_info("property", &key)
                        })?;
                    } else {
                        target_props.insert(key, source_prop);
                    }
                }
            }
            None => t.pattern_properties = Some(source_props),
        }
    }

    Ok(())
}

fn inherit_union(env: &ShapeRef, t: &mut UnionFacets, s: UnionFacets) -> Result<(), ShapeError> {
    if t.any_of.is_empty() {
        t.any_of = s.any_of;
        return Ok(());
    }
    let mut merged = Vec::new();
    for source_member in &s.any_of {
        let source_tag = source_member.borrow().type_name.clone();
        let mut filtered = Vec::new();
        for target_member in &t.any_of {
            if target_member.borrow().type_name != source_tag {
                continue;
            }
            // Merging must not touch the original member; trial-merge a
            // detached clone and keep it only when the merge holds.
            let candidate = BaseShape::clone_detached(target_member);
            if inherit(&candidate, source_member).is_ok() {
                filtered.push(candidate);
            }
        }
        if filtered.is_empty() {
            return Err(env
                .borrow()
                .error(
                    ErrorKind::IncompatibleType,
                    "failed to find compatible union member",
                )
                .with_info("source", &source_tag));
        }
        merged.extend(filtered);
    }
    t.any_of = merged;
    Ok(())
}

/// A non-union child inheriting from a union parent keeps the members it
/// is compatible with: one survivor replaces the child's body, several
/// survivors turn the child into a union of them.
fn inherit_from_union_source(
    target: &ShapeRef,
    source_facets: &UnionFacets,
) -> Result<(), ShapeError> {
    let target_tag = target.borrow().type_name.clone();
    let mut survivors = Vec::new();
    for member in &source_facets.any_of {
        if member.borrow().type_name != target_tag {
            continue;
        }
        let candidate = BaseShape::clone_detached(target);
        if inherit(&candidate, member).is_ok() {
            survivors.push(candidate);
        }
    }
    match survivors.len() {
        0 => Err(target
            .borrow()
            .error(
                ErrorKind::IncompatibleType,
                "failed to find compatible union member",
            )
            .with_info("target", &target_tag)),
        1 => {
            let body = survivors[0].borrow().shape.clone();
            target.borrow_mut().shape = body;
            Ok(())
        }
        _ => {
            let mut t = target.borrow_mut();
            t.type_name = TYPE_UNION.to_string();
            t.shape = Shape::Union(UnionFacets { any_of: survivors });
            Ok(())
        }
    }
}

fn inherit_string(env: &ShapeRef, t: &mut StringFacets, s: StringFacets) -> Result<(), ShapeError> {
    if let Some(source_pattern) = s.pattern {
        match &t.pattern {
            // Regular languages have no cheap subset test, so a child
            // pattern must repeat the parent's verbatim.
            Some(target_pattern) => {
                if target_pattern.as_str() != source_pattern.as_str() {
                    return Err(bound_violation(
                        env,
                        "pattern",
                        source_pattern.as_str(),
                        target_pattern.as_str(),
                    ));
                }
            }
            None => t.pattern = Some(source_pattern),
        }
    }
    match (t.min_length, s.min_length) {
        (None, source) => t.min_length = source,
        (Some(tv), Some(sv)) if tv < sv => {
            return Err(bound_violation(env, "minLength", sv, tv));
        }
        _ => {}
    }
    match (t.max_length, s.max_length) {
        (None, source) => t.max_length = source,
        (Some(tv), Some(sv)) if tv > sv => {
            return Err(bound_violation(env, "maxLength", sv, tv));
        }
        _ => {}
    }
    if let Some(source_values) = s.enum_values {
        match &t.enum_values {
            // The child's enum must be a subset of the parent's.
            Some(target_values) => {
                for value in target_values {
                    if !source_values.contains(value) {
                        return Err(env
                            .borrow()
                            .error(
                                ErrorKind::ConstraintViolation("enum"),
                                "enum constraint violation",
                            )
                            .with_info("value", value));
                    }
                }
            }
            None => t.enum_values = Some(source_values),
        }
    }
    Ok(())
}

fn inherit_integer(
    env: &ShapeRef,
    t: &mut IntegerFacets,
    s: IntegerFacets,
) -> Result<(), ShapeError> {
    match (t.minimum, s.minimum) {
        (None, source) => t.minimum = source,
        (Some(tv), Some(sv)) if tv < sv => {
            return Err(bound_violation(env, "minimum", sv, tv));
        }
        _ => {}
    }
    match (t.maximum, s.maximum) {
        (None, source) => t.maximum = source,
        (Some(tv), Some(sv)) if tv > sv => {
            return Err(bound_violation(env, "maximum", sv, tv));
        }
        _ => {}
    }
    match (t.multiple_of, s.multiple_of) {
        (None, source) => t.multiple_of = source,
        (Some(tv), Some(sv)) if sv != 0 && tv % sv != 0 => {
            return Err(bound_violation(env, "multipleOf", sv, tv));
        }
        _ => {}
    }
    if t.format.is_none() {
        t.format = s.format;
    }
    Ok(())
}

fn inherit_number(
    env: &ShapeRef,
    t: &mut NumberFacets,
    s: NumberFacets,
) -> Result<(), ShapeError> {
    match (t.minimum, s.minimum) {
        (None, source) => t.minimum = source,
        (Some(tv), Some(sv)) if tv < sv => {
            return Err(bound_violation(env, "minimum", sv, tv));
        }
        _ => {}
    }
    match (t.maximum, s.maximum) {
        (None, source) => t.maximum = source,
        (Some(tv), Some(sv)) if tv > sv => {
            return Err(bound_violation(env, "maximum", sv, tv));
        }
        _ => {}
    }
    match (t.multiple_of, s.multiple_of) {
        (None, source) => t.multiple_of = source,
        (Some(tv), Some(sv)) if sv != 0.0 && tv % sv != 0.0 => {
            return Err(bound_violation(env, "multipleOf", sv, tv));
        }
        _ => {}
    }
    if t.format.is_none() {
        t.format = s.format;
    }
    Ok(())
}

fn inherit_file(env: &ShapeRef, t: &mut FileFacets, s: FileFacets) -> Result<(), ShapeError> {
    if let Some(source_types) = s.file_types {
        match &t.file_types {
            // The child may only narrow the accepted content types.
            Some(target_types) => {
                for file_type in target_types {
                    if !source_types.contains(file_type) {
                        return Err(env
                            .borrow()
                            .error(
                                ErrorKind::ConstraintViolation("fileTypes"),
                                "fileTypes constraint violation",
                            )
                            .with_info("value", file_type));
                    }
                }
            }
            None => t.file_types = Some(source_types),
        }
    }
    match (t.min_length, s.min_length) {
        (None, source) => t.min_length = source,
        (Some(tv), Some(sv)) if tv < sv => {
            return Err(bound_violation(env, "minLength", sv, tv));
        }
        _ => {}
    }
    match (t.max_length, s.max_length) {
        (None, source) => t.max_length = source,
        (Some(tv), Some(sv)) if tv > sv => {
            return Err(bound_violation(env, "maxLength", sv, tv));
        }
        _ => {}
    }
    Ok(())
}

fn inherit_datetime(t: &mut DateTimeFacets, s: DateTimeFacets) -> Result<(), ShapeError> {
    if t.format.is_none() {
        t.format = s.format;
    }
    Ok(())
}

fn inherit_json(env: &ShapeRef, t: &mut JsonFacets, s: JsonFacets) -> Result<(), ShapeError> {
    if let (Some(tv), Some(sv)) = (&t.raw, &s.raw) {
        if tv != sv {
            return Err(env.borrow().error(
                ErrorKind::JsonSchemaMismatch,
                "cannot inherit from a different JSON schema",
            ));
        }
    }
    if s.raw.is_some() {
        t.raw = s.raw;
        t.schema = s.schema;
    }
    Ok(())
}

impl Raml {
    /// Fold the inheritance edges of a resolved shape graph, parents
    /// before children. Idempotent.
    pub fn fold_shape(&self, base: &ShapeRef) -> Result<(), ShapeError> {
        if base.borrow().unwrapped {
            return Ok(());
        }
        base.borrow_mut().unwrapped = true;
        let parents: Vec<ShapeRef> = base.borrow().inherits.clone();
        for parent in &parents {
            self.fold_shape(parent)?;
        }
        for child in structural_children(base) {
            self.fold_shape(&child)?;
        }
        let (location, position) = {
            let b = base.borrow();
            (b.location.clone(), b.position)
        };
        for parent in &parents {
            inherit(base, parent).map_err(|e| e.wrap("inherit", &location, position))?;
        }
        Ok(())
    }
}

fn structural_children(base: &ShapeRef) -> Vec<ShapeRef> {
    let b = base.borrow();
    match &b.shape {
        Shape::Array(f) => f.items.iter().map(Rc::clone).collect(),
        Shape::Union(f) => f.any_of.iter().map(Rc::clone).collect(),
        Shape::Object(f) => {
            let mut children = Vec::new();
            if let Some(props) = &f.properties {
                children.extend(props.values().map(|p| Rc::clone(&p.shape)));
            }
            if let Some(props) = &f.pattern_properties {
                children.extend(props.values().map(|p| Rc::clone(&p.shape)));
            }
            children
        }
        _ => Vec::new(),
    }
}
