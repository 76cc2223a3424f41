// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::shape::error::{ErrorKind, ShapeError};
use crate::shape::ShapeRef;
use crate::Location;

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use indexmap::IndexMap;

/// A named collection of shapes loaded from one RAML document.
///
/// `types` are the locally defined shapes in declaration order; `uses`
/// maps library aliases to the fragments they refer to. Both tables are
/// written during loading only.
#[derive(Debug, Default)]
pub struct Library {
    pub location: String,
    types: RefCell<IndexMap<String, ShapeRef>>,
    uses: RefCell<IndexMap<String, Rc<Library>>>,
}

impl Library {
    pub fn new(location: impl Into<String>) -> Rc<Library> {
        Rc::new(Library {
            location: location.into(),
            types: RefCell::new(IndexMap::new()),
            uses: RefCell::new(IndexMap::new()),
        })
    }

    pub fn add_type(&self, name: impl Into<String>, shape: ShapeRef) {
        self.types.borrow_mut().insert(name.into(), shape);
    }

    pub fn get_type(&self, name: &str) -> Option<ShapeRef> {
        self.types.borrow().get(name).map(Rc::clone)
    }

    pub fn type_names(&self) -> Vec<String> {
        self.types.borrow().keys().cloned().collect()
    }

    /// All local shapes in declaration order.
    pub fn types(&self) -> Vec<ShapeRef> {
        self.types.borrow().values().map(Rc::clone).collect()
    }

    pub fn add_use(&self, alias: impl Into<String>, library: Rc<Library>) {
        self.uses.borrow_mut().insert(alias.into(), library);
    }

    pub fn get_use(&self, alias: &str) -> Option<Rc<Library>> {
        self.uses.borrow().get(alias).map(Rc::clone)
    }
}

/// The type-system context: a process-wide registry of fragments plus
/// the transient state of the resolver.
///
/// Loading and resolving mutate the shape graph and are single-threaded;
/// once [`Raml::process_library`] has succeeded the graph is immutable
/// by convention and validation may proceed from any number of callers.
#[derive(Debug, Default)]
pub struct Raml {
    fragments: RefCell<BTreeMap<String, Rc<Library>>>,
    /// IDs of the shapes currently being resolved, innermost last.
    pub(crate) visiting: RefCell<Vec<i64>>,
}

impl Raml {
    pub fn new() -> Raml {
        Raml::default()
    }

    pub fn register_fragment(&self, library: &Rc<Library>) {
        self.fragments
            .borrow_mut()
            .insert(library.location.clone(), Rc::clone(library));
    }

    pub fn get_fragment(&self, location: &str) -> Option<Rc<Library>> {
        self.fragments.borrow().get(location).map(Rc::clone)
    }

    /// Create and register an empty library fragment.
    pub fn make_library(&self, location: impl Into<String>) -> Rc<Library> {
        let library = Library::new(location);
        self.register_fragment(&library);
        library
    }

    /// Build a library from the YAML mapping of a `types:` section.
    ///
    /// Each entry becomes an unresolved shape; run
    /// [`Raml::process_library`] (or the individual phases) afterwards.
    pub fn build_types(&self, location: &str, yaml: &str) -> Result<Rc<Library>, ShapeError> {
        let node: serde_yaml::Value = serde_yaml::from_str(yaml).map_err(|e| {
            ShapeError::new(
                ErrorKind::Parse,
                format!("parse types document: {e}"),
                location,
                Location::default(),
            )
        })?;
        let mapping = node.as_mapping().ok_or_else(|| {
            ShapeError::new(
                ErrorKind::Parse,
                "types document must be a mapping",
                location,
                Location::default(),
            )
        })?;
        let library = self.make_library(location);
        for (key, value) in mapping {
            let name = key.as_str().ok_or_else(|| {
                ShapeError::new(
                    ErrorKind::Parse,
                    "type name must be a string",
                    location,
                    Location::default(),
                )
            })?;
            let shape = self.make_shape(value, name, location)?;
            library.add_type(name, shape);
        }
        Ok(library)
    }

    /// Resolve every type in the library: parse type expressions, look
    /// up references and cut recursion (C5).
    pub fn resolve_library(&self, library: &Library) -> Result<(), ShapeError> {
        for shape in library.types() {
            self.resolve_shape(&shape)?;
        }
        Ok(())
    }

    /// Fold the inheritance edges of every type in the library (C4).
    pub fn fold_library(&self, library: &Library) -> Result<(), ShapeError> {
        for shape in library.types() {
            self.fold_shape(&shape)?;
        }
        Ok(())
    }

    /// Check every type in the library for internal consistency (C7).
    pub fn check_library(&self, library: &Library) -> Result<(), ShapeError> {
        for shape in library.types() {
            shape.borrow().check()?;
        }
        Ok(())
    }

    /// Run the whole pipeline over a built library:
    /// resolve → inherit → check.
    pub fn process_library(&self, library: &Library) -> Result<(), ShapeError> {
        self.resolve_library(library)?;
        self.fold_library(library)?;
        self.check_library(library)
    }
}
