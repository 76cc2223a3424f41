// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Reference resolution and recursion detection.
//!
//! Resolution types every Unknown body (by parsing its declared type
//! expression or applying the implicit default) and walks the structural
//! links of the graph. A link back into a shape that is currently being
//! resolved closes a cycle; that link is replaced with a fresh shape
//! whose body is a recursion marker holding a weak pointer to the cycle
//! head. After resolution every cycle is cut by exactly one marker and
//! no unresolved references remain.

use crate::lexer::Source;
use crate::parser::{Parser, TypeExpr};
use crate::raml::Raml;
use crate::shape::error::{ErrorKind, ShapeError};
use crate::shape::{
    BaseShape, RecursiveFacets, Shape, ShapeRef, PRIMITIVE_TYPES, TYPE_OBJECT, TYPE_RECURSIVE,
    TYPE_STRING,
};
use crate::Location;

use std::rc::Rc;

/// A fresh resolved shape wrapping a recursion marker for `head`.
fn recursive_wrapper(head: &ShapeRef, location: &str) -> ShapeRef {
    let wrapper = BaseShape::new_ref("", location, Location::default());
    {
        let mut w = wrapper.borrow_mut();
        w.type_name = TYPE_RECURSIVE.to_string();
        w.shape = Shape::Recursive(RecursiveFacets {
            head: Rc::downgrade(head),
        });
        w.resolved = true;
    }
    wrapper
}

fn parse_expression(text: &str, origin: &str) -> Result<TypeExpr, ShapeError> {
    let source = Source::from_contents(origin.to_string(), text.to_string())
        .map_err(|e| parse_error(e, origin))?;
    let mut parser = Parser::new(&source).map_err(|e| parse_error(e, origin))?;
    parser.parse().map_err(|e| parse_error(e, origin))
}

fn parse_error(e: anyhow::Error, location: &str) -> ShapeError {
    ShapeError::new(
        ErrorKind::Parse,
        e.to_string(),
        location,
        Location::default(),
    )
}

impl Raml {
    pub(crate) fn is_visiting(&self, shape: &ShapeRef) -> bool {
        self.visiting.borrow().contains(&shape.borrow().id)
    }

    /// Resolve one shape and everything reachable from it. Idempotent:
    /// already-resolved shapes are not re-walked.
    pub fn resolve_shape(&self, base: &ShapeRef) -> Result<(), ShapeError> {
        {
            let b = base.borrow();
            if b.resolved {
                return Ok(());
            }
        }
        if self.is_visiting(base) {
            // Cycle edges are cut at the link sites; re-entry here means
            // the caller already holds this shape on the stack.
            return Ok(());
        }
        let id = base.borrow().id;
        self.visiting.borrow_mut().push(id);
        let result = self.resolve_shape_inner(base);
        self.visiting.borrow_mut().pop();
        result?;
        base.borrow_mut().resolved = true;
        Ok(())
    }

    fn resolve_shape_inner(&self, base: &ShapeRef) -> Result<(), ShapeError> {
        let declared = match &base.borrow().shape {
            Shape::Unknown(u) => Some((
                u.declared.clone(),
                u.facets.iter().any(|(key, _)| key == "properties"),
            )),
            _ => None,
        };
        if let Some((declared, has_properties)) = declared {
            self.apply_declared(base, declared, has_properties)?;
        }
        self.resolve_links(base)
    }

    /// Give an Unknown body its concrete type.
    fn apply_declared(
        &self,
        base: &ShapeRef,
        declared: Vec<String>,
        has_properties: bool,
    ) -> Result<(), ShapeError> {
        match declared.as_slice() {
            [] => {
                // No declared type: object when a properties facet is
                // present, string otherwise.
                let implicit = if has_properties {
                    TYPE_OBJECT
                } else {
                    TYPE_STRING
                };
                self.make_concrete(base, implicit)
            }
            [expr] => {
                if expr.trim_start().starts_with('{') {
                    return self.make_json(base, expr);
                }
                let origin = {
                    let b = base.borrow();
                    format!("{}#{}", b.location, b.name)
                };
                let ast = parse_expression(expr, &origin)?;
                self.apply_type_expr(&ast, base)
            }
            exprs => self.apply_parent_list(base, exprs),
        }
    }

    /// Multiple inheritance: a sequence of parent names. The body takes
    /// the first parent's variant; every referenced parent becomes an
    /// inheritance edge.
    fn apply_parent_list(&self, base: &ShapeRef, exprs: &[String]) -> Result<(), ShapeError> {
        let (location, origin) = {
            let b = base.borrow();
            (b.location.clone(), format!("{}#{}", b.location, b.name))
        };
        let mut first_type: Option<String> = None;
        let mut parents: Vec<ShapeRef> = Vec::new();
        for expr in exprs {
            let ast = parse_expression(expr, &origin)?;
            let (library, member) = match &ast {
                TypeExpr::Name { library, member } => (library.as_ref(), member),
                _ => {
                    return Err(base.borrow().error(
                        ErrorKind::Parse,
                        "multiple inheritance entries must be type names",
                    ))
                }
            };
            let name = member.text();
            if library.is_none() && PRIMITIVE_TYPES.contains(&name) {
                first_type.get_or_insert_with(|| name.to_string());
                continue;
            }
            let position = Location::new(member.line, member.col);
            let reference =
                self.lookup_reference(&location, library.map(crate::lexer::Span::text), name, position)?;
            if self.is_visiting(&reference) {
                let head_type = reference.borrow().type_name.clone();
                if head_type.is_empty() {
                    return Err(base.borrow().error(
                        ErrorKind::CycleNotBreakable,
                        "cyclic parent list cannot be resolved",
                    ));
                }
                first_type.get_or_insert(head_type);
                parents.push(recursive_wrapper(&reference, &location));
                continue;
            }
            self.resolve_shape(&reference)?;
            first_type.get_or_insert_with(|| reference.borrow().type_name.clone());
            parents.push(reference);
        }
        let type_name = first_type.ok_or_else(|| {
            base.borrow()
                .error(ErrorKind::Parse, "empty parent type list")
        })?;
        self.make_concrete(base, &type_name)?;
        base.borrow_mut().inherits = parents;
        Ok(())
    }

    /// Resolve a structural link, replacing it with a recursion marker
    /// when it points back into the resolution stack.
    fn cut_or_resolve(
        &self,
        link: &ShapeRef,
        location: &str,
    ) -> Result<Option<ShapeRef>, ShapeError> {
        if self.is_visiting(link) {
            return Ok(Some(recursive_wrapper(link, location)));
        }
        self.resolve_shape(link)?;
        Ok(None)
    }

    /// Walk inherits, items, union members and property shapes.
    fn resolve_links(&self, base: &ShapeRef) -> Result<(), ShapeError> {
        let (location, position) = {
            let b = base.borrow();
            (b.location.clone(), b.position)
        };

        let parent_count = base.borrow().inherits.len();
        for i in 0..parent_count {
            let parent = Rc::clone(&base.borrow().inherits[i]);
            if let Some(cut) = self
                .cut_or_resolve(&parent, &location)
                .map_err(|e| e.wrap("resolve parent", &location, position))?
            {
                base.borrow_mut().inherits[i] = cut;
            }
        }

        let items = match &base.borrow().shape {
            Shape::Array(f) => f.items.clone(),
            _ => None,
        };
        if let Some(items) = items {
            if let Some(cut) = self
                .cut_or_resolve(&items, &location)
                .map_err(|e| e.wrap("resolve items", &location, position))?
            {
                if let Shape::Array(f) = &mut base.borrow_mut().shape {
                    f.items = Some(cut);
                }
            }
        }

        let members = match &base.borrow().shape {
            Shape::Union(f) => f.any_of.clone(),
            _ => Vec::new(),
        };
        for (i, member) in members.iter().enumerate() {
            if let Some(cut) = self
                .cut_or_resolve(member, &location)
                .map_err(|e| e.wrap("resolve union member", &location, position))?
            {
                if let Shape::Union(f) = &mut base.borrow_mut().shape {
                    f.any_of[i] = cut;
                }
            }
        }

        let properties: Vec<(String, ShapeRef)> = match &base.borrow().shape {
            Shape::Object(f) => {
                let mut links = Vec::new();
                if let Some(props) = &f.properties {
                    links.extend(props.iter().map(|(k, p)| (k.clone(), Rc::clone(&p.shape))));
                }
                links
            }
            _ => Vec::new(),
        };
        for (key, shape) in properties {
            if let Some(cut) = self.cut_or_resolve(&shape, &location).map_err(|e| {
                e.wrap("resolve property", &location, position)
                    .with_info("property", &key)
            })? {
                if let Shape::Object(f) = &mut base.borrow_mut().shape {
                    if let Some(props) = &mut f.properties {
                        if let Some(property) = props.get_mut(&key) {
                            property.shape = cut;
                        }
                    }
                }
            }
        }

        let pattern_properties: Vec<(String, ShapeRef)> = match &base.borrow().shape {
            Shape::Object(f) => {
                let mut links = Vec::new();
                if let Some(props) = &f.pattern_properties {
                    links.extend(props.iter().map(|(k, p)| (k.clone(), Rc::clone(&p.shape))));
                }
                links
            }
            _ => Vec::new(),
        };
        for (key, shape) in pattern_properties {
            if let Some(cut) = self.cut_or_resolve(&shape, &location).map_err(|e| {
                e.wrap("resolve pattern property", &location, position)
                    .with_info("property", &key)
            })? {
                if let Shape::Object(f) = &mut base.borrow_mut().shape {
                    if let Some(props) = &mut f.pattern_properties {
                        if let Some(property) = props.get_mut(&key) {
                            property.shape = cut;
                        }
                    }
                }
            }
        }

        Ok(())
    }
}
