/*
 * lib.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Placeholder-based source-template compiler for code generation.
//!
//! This crate lets code generators be written as quasi-literal source text
//! instead of hand-built trees: a sequence of literal fragments with
//! interpolation gaps compiles once into a reusable [`Template`], and each
//! invocation substitutes fresh replacement values into an independent
//! syntax tree.
//!
//! The compiler core does not parse source or walk trees itself. Parsing
//! and substitution belong to a [`TemplateBackend`] collaborator, and the
//! caller-visible output shape to a [`Formatter`]; the core's own job is
//! collision-free naming of the interpolation slots (generated slot names
//! can never be confused with identifiers already present in the literal
//! text) and the merge-and-validate contract between positional values and
//! named overrides. A reference backend for a minimal expression language
//! ships in [`expr`].
//!
//! # Example
//!
//! ```
//! use quarto_codetemplate::expr::{ExprParser, ExpressionFormatter, Node};
//! use quarto_codetemplate::{BuildOptions, Template};
//!
//! let template = Template::compile(
//!     ExprParser::new(),
//!     ExpressionFormatter,
//!     &["foo(", ", ", ")"],
//!     BuildOptions::default(),
//! )
//! .unwrap();
//!
//! let expr = template
//!     .instantiate([Node::ident("a"), Node::int(1)])
//!     .unwrap();
//! assert_eq!(expr.to_string(), "foo(a, 1)");
//! ```

pub mod backend;
pub mod error;
pub mod expr;
pub mod options;
pub mod replacements;
mod slots;
pub mod template;

// Re-export main types at crate root
pub use backend::{Formatter, ParseOptions, Placeholder, TemplateBackend};
pub use error::{TemplateError, TemplateResult};
pub use options::{BuildOptions, PlaceholderPattern};
pub use replacements::ReplacementMap;
pub use template::{Binding, Template};
