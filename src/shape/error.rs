// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::Location;

use core::fmt;
use std::collections::BTreeMap;

/// The kind of a shape-system failure.
///
/// Kinds survive wrapping: an error wrapped with extra context keeps the
/// innermost kind, so callers can match on the kind at any depth of the
/// chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed type expression or undecodable facet node.
    Parse,
    /// A type or library name that the fragment does not define.
    UnknownIdentifier,
    /// A fragment lookup failed entirely.
    UnresolvedReference,
    /// A cycle that cannot be cut into a recursive marker.
    CycleNotBreakable,
    /// Inheritance between different variants.
    IncompatibleType,
    /// A facet constraint was violated; carries the facet name.
    ConstraintViolation(&'static str),
    /// A required property was made optional by an inheritor.
    RequiredDemoted,
    /// Discriminator property missing or declared without properties.
    DiscriminatorMissing,
    /// Discriminator property is not a scalar.
    DiscriminatorNotScalar,
    /// Pattern properties combined with `additionalProperties: false`.
    PatternConflictsWithNoAdditional,
    /// Inline JSON schemas differ between parent and child.
    JsonSchemaMismatch,
    /// A runtime value did not conform to a shape.
    Validation,
    /// Validation reached a shape that was never resolved.
    CannotValidateUnknown,
    /// A recursive marker was used as an inheritance target.
    CannotInheritRecursive,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::Parse => write!(f, "parse"),
            ErrorKind::UnknownIdentifier => write!(f, "unknown identifier"),
            ErrorKind::UnresolvedReference => write!(f, "unresolved reference"),
            ErrorKind::CycleNotBreakable => write!(f, "cycle not breakable"),
            ErrorKind::IncompatibleType => write!(f, "incompatible type"),
            ErrorKind::ConstraintViolation(facet) => {
                write!(f, "{facet} constraint violation")
            }
            ErrorKind::RequiredDemoted => write!(f, "required demoted"),
            ErrorKind::DiscriminatorMissing => write!(f, "discriminator missing"),
            ErrorKind::DiscriminatorNotScalar => write!(f, "discriminator not scalar"),
            ErrorKind::PatternConflictsWithNoAdditional => {
                write!(f, "pattern properties conflict with additionalProperties")
            }
            ErrorKind::JsonSchemaMismatch => write!(f, "json schema mismatch"),
            ErrorKind::Validation => write!(f, "validation"),
            ErrorKind::CannotValidateUnknown => write!(f, "cannot validate unknown shape"),
            ErrorKind::CannotInheritRecursive => write!(f, "cannot inherit recursive shape"),
        }
    }
}

/// A structured shape-system error: kind, message, source location,
/// position, an info map with the values that tripped the failure, and a
/// cause chain built up as the error crosses layers.
#[derive(Debug, Clone)]
pub struct ShapeError {
    pub kind: ErrorKind,
    pub message: String,
    /// File the failing shape was declared in.
    pub location: String,
    /// Row/column when known; zero otherwise.
    pub position: Location,
    /// Structured context, e.g. `{source: 5, target: 3}`.
    pub info: BTreeMap<&'static str, String>,
    pub cause: Option<Box<ShapeError>>,
}

impl ShapeError {
    pub fn new(
        kind: ErrorKind,
        message: impl Into<String>,
        location: &str,
        position: Location,
    ) -> ShapeError {
        ShapeError {
            kind,
            message: message.into(),
            location: location.to_string(),
            position,
            info: BTreeMap::new(),
            cause: None,
        }
    }

    /// Attach a structured context entry.
    pub fn with_info(mut self, key: &'static str, value: impl fmt::Display) -> ShapeError {
        self.info.insert(key, value.to_string());
        self
    }

    /// Wrap this error with an outer context message and anchor. The
    /// inner kind is preserved.
    pub fn wrap(
        self,
        message: impl Into<String>,
        location: &str,
        position: Location,
    ) -> ShapeError {
        ShapeError {
            kind: self.kind,
            message: message.into(),
            location: location.to_string(),
            position,
            info: BTreeMap::new(),
            cause: Some(Box::new(self)),
        }
    }

    /// The innermost error of the chain.
    pub fn root(&self) -> &ShapeError {
        let mut err = self;
        while let Some(cause) = &err.cause {
            err = cause;
        }
        err
    }
}

impl fmt::Display for ShapeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;
        if !self.location.is_empty() {
            write!(f, " [{}", self.location)?;
            if self.position != Location::default() {
                write!(f, ":{}", self.position)?;
            }
            write!(f, "]")?;
        }
        for (key, value) in &self.info {
            write!(f, " {key}={value}")?;
        }
        if let Some(cause) = &self.cause {
            write!(f, ": {cause}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ShapeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match &self.cause {
            Some(cause) => {
                let cause: &(dyn std::error::Error + 'static) = &**cause;
                Some(cause)
            }
            None => None,
        }
    }
}
