// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

// Unsafe code should not be used.
// Hard to reason about correctness, and maintainability.
#![forbid(unsafe_code)]
// Ensure that all lint names are valid.
#![deny(unknown_lints)]
// Fail-fast lints: correctness, safety, and API surface
#![deny(
    // Panic sources - catch all ways code can panic
    clippy::panic, // forbid explicit panic! macro
    clippy::todo, // blocks remaining todo! placeholders
    clippy::unimplemented, // blocks unimplemented! placeholders
    clippy::unwrap_used, // reject Result/Option unwraps
    clippy::expect_used, // reject expect with panic messages

    // Rust warnings/upstream
    deprecated, // prevent use of deprecated APIs
    keyword_idents, // disallow identifiers that are keywords
    non_ascii_idents, // disallow non-ASCII identifiers
    nonstandard_style, // enforce idiomatic naming/style
    noop_method_call, // catch no-op method calls
    trivial_casts, // block needless casts
    unreachable_patterns, // catch unreachable match arms
    unused_extern_crates, // remove unused extern crate declarations
    unused_import_braces, // avoid unused braces in imports

    // Misc polish
    clippy::dbg_macro, // forbid dbg! in production code
)]
// Advisory lints: useful, but not fatal
#![warn(
    clippy::match_like_matches_macro, // prefer matches! macro over verbose match
    clippy::needless_continue, // remove redundant continue statements
)]
// Use README.md as crate documentation.
#![doc = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/README.md"))]

mod lexer;
mod number;
mod parser;
mod raml;
pub mod shape;
mod value;

pub use lexer::Source;
pub use number::Number;
pub use raml::{Library, Raml};
pub use shape::error::{ErrorKind, ShapeError};
pub use shape::{BaseShape, PatternProperty, Property, Shape, ShapeRef};
pub use value::Value;

use core::fmt;

/// Location of a shape or diagnostic within a source document.
///
/// A zero location means the position is unknown: YAML-built shapes carry
/// no marks, while shapes produced from type expressions carry the exact
/// row and column of the expression text.
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq)]
pub struct Location {
    /// Line number. Starts at 1.
    pub row: u32,
    /// Column number. Starts at 1.
    pub col: u32,
}

impl Location {
    pub const fn new(row: u32, col: u32) -> Self {
        Self { row, col }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.row, self.col)
    }
}
