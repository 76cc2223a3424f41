// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Application of parsed type expressions to shapes.
//!
//! The caller supplies an Unknown-bodied target shape. Wrapper syntax
//! (`T?`, `T[]`, unions) materializes the wrapped types into fresh
//! anonymous envelopes so that user-declared facets stay on the target
//! and never leak into implicitly created shapes.

use crate::lexer::Span;
use crate::parser::TypeExpr;
use crate::raml::Raml;
use crate::shape::error::{ErrorKind, ShapeError};
use crate::shape::{
    ArrayFacets, BaseShape, RecursiveFacets, Shape, ShapeRef, UnionFacets, PRIMITIVE_TYPES,
    TYPE_ARRAY, TYPE_NIL, TYPE_RECURSIVE, TYPE_UNION,
};
use crate::Location;

use std::rc::Rc;

/// A fresh anonymous envelope at the target's location.
fn anonymous_shape(target: &ShapeRef, span: &Span) -> ShapeRef {
    let location = target.borrow().location.clone();
    BaseShape::new_ref("", location, Location::new(span.line, span.col))
}

/// Move the facet nodes deferred on the target's Unknown body; wrapper
/// shapes consume them into the body they are about to install.
fn take_deferred_facets(target: &ShapeRef) -> Vec<(String, serde_yaml::Value)> {
    let mut t = target.borrow_mut();
    match &mut t.shape {
        Shape::Unknown(u) => std::mem::take(&mut u.facets),
        _ => Vec::new(),
    }
}

impl Raml {
    /// Materialize a parsed type expression into the target shape.
    pub(crate) fn apply_type_expr(
        &self,
        expr: &TypeExpr,
        target: &ShapeRef,
    ) -> Result<(), ShapeError> {
        match expr {
            TypeExpr::Group { expr, .. } => self.apply_type_expr(expr, target),
            TypeExpr::Name { library, member } => {
                self.apply_type_name(library.as_ref(), member, target)
            }
            TypeExpr::Optional { expr, span } => {
                let inner = anonymous_shape(target, expr.span());
                self.apply_type_expr(expr, &inner)?;
                // The nil member is anonymous as well; it shares nothing
                // with the target.
                let nil = anonymous_shape(target, span);
                {
                    let mut n = nil.borrow_mut();
                    n.type_name = TYPE_NIL.to_string();
                    n.shape = Shape::Nil;
                }
                let facets = take_deferred_facets(target);
                let mut body = Shape::Union(UnionFacets {
                    any_of: vec![inner, nil],
                });
                self.unmarshal_facets(target, &mut body, facets)?;
                let mut t = target.borrow_mut();
                t.type_name = TYPE_UNION.to_string();
                t.shape = body;
                Ok(())
            }
            TypeExpr::Array { expr, .. } => {
                let inner = anonymous_shape(target, expr.span());
                self.apply_type_expr(expr, &inner)?;
                let facets = take_deferred_facets(target);
                let mut body = Shape::Array(ArrayFacets {
                    items: Some(inner),
                    ..ArrayFacets::default()
                });
                self.unmarshal_facets(target, &mut body, facets)?;
                let mut t = target.borrow_mut();
                t.type_name = TYPE_ARRAY.to_string();
                t.shape = body;
                Ok(())
            }
            TypeExpr::Union { members, .. } => {
                let mut any_of = Vec::with_capacity(members.len());
                for member in members {
                    let inner = anonymous_shape(target, member.span());
                    self.apply_type_expr(member, &inner)?;
                    any_of.push(inner);
                }
                let facets = take_deferred_facets(target);
                let mut body = Shape::Union(UnionFacets { any_of });
                self.unmarshal_facets(target, &mut body, facets)?;
                let mut t = target.borrow_mut();
                t.type_name = TYPE_UNION.to_string();
                t.shape = body;
                Ok(())
            }
        }
    }

    fn apply_type_name(
        &self,
        library: Option<&Span>,
        member: &Span,
        target: &ShapeRef,
    ) -> Result<(), ShapeError> {
        let name = member.text();
        if library.is_none() && PRIMITIVE_TYPES.contains(&name) {
            return self.make_concrete(target, name);
        }

        let location = target.borrow().location.clone();
        let position = Location::new(member.line, member.col);
        let library_name = library.map(Span::text);
        let reference = self.lookup_reference(&location, library_name, name, position)?;

        // A type whose whole definition is a reference to itself never
        // reaches a concrete variant.
        if Rc::ptr_eq(&reference, target) {
            return Err(ShapeError::new(
                ErrorKind::CycleNotBreakable,
                format!("type `{name}` references itself"),
                &location,
                position,
            ));
        }

        // A reference to a shape currently being resolved closes a
        // cycle; the target becomes the recursion marker.
        if self.is_visiting(&reference) {
            let mut t = target.borrow_mut();
            t.type_name = TYPE_RECURSIVE.to_string();
            t.shape = Shape::Recursive(RecursiveFacets {
                head: Rc::downgrade(&reference),
            });
            return Ok(());
        }

        self.resolve_shape(&reference)?;
        let referenced_type = reference.borrow().type_name.clone();
        // A chain of aliases that loops back without ever naming a
        // concrete variant cannot be materialized.
        if referenced_type.is_empty() || referenced_type == TYPE_RECURSIVE {
            return Err(ShapeError::new(
                ErrorKind::CycleNotBreakable,
                format!("reference `{name}` does not reach a concrete type"),
                &location,
                position,
            ));
        }
        self.make_concrete(target, &referenced_type)?;
        target.borrow_mut().inherits.insert(0, reference);
        Ok(())
    }

    /// Look a type name up through the fragment registered at `location`:
    /// one segment resolves locally, two segments resolve through the
    /// fragment's `uses` table.
    pub(crate) fn lookup_reference(
        &self,
        location: &str,
        library: Option<&str>,
        name: &str,
        position: Location,
    ) -> Result<ShapeRef, ShapeError> {
        let fragment = self.get_fragment(location).ok_or_else(|| {
            ShapeError::new(
                ErrorKind::UnresolvedReference,
                format!("no fragment registered at `{location}`"),
                location,
                position,
            )
        })?;
        match library {
            None => fragment.get_type(name).ok_or_else(|| {
                ShapeError::new(
                    ErrorKind::UnknownIdentifier,
                    format!("reference `{name}` not found"),
                    location,
                    position,
                )
            }),
            Some(alias) => {
                let library = fragment.get_use(alias).ok_or_else(|| {
                    ShapeError::new(
                        ErrorKind::UnknownIdentifier,
                        format!("library `{alias}` not found"),
                        location,
                        position,
                    )
                })?;
                library.get_type(name).ok_or_else(|| {
                    ShapeError::new(
                        ErrorKind::UnknownIdentifier,
                        format!("reference `{alias}.{name}` not found"),
                        location,
                        position,
                    )
                })
            }
        }
    }
}
