/*
 * backend.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Collaborator traits for the template compiler.
//!
//! The compiler core never parses source or walks trees itself. Both jobs
//! belong to a [`TemplateBackend`]: parsing a candidate source into cached
//! metadata, reporting the placeholder occurrences found in it, and
//! producing a freshly substituted tree per invocation. A [`Formatter`]
//! adapts the candidate source before parsing and the populated tree after
//! substitution, so the same backend can serve expression-shaped and
//! program-shaped templates.

use std::collections::HashSet;

use serde::Serialize;

use crate::error::TemplateResult;
use crate::options::PlaceholderPattern;
use crate::replacements::ReplacementMap;

/// A placeholder occurrence reported by the backend's parser.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Placeholder {
    /// The placeholder's name as it appears in the candidate source.
    pub name: String,
    /// Whether this name occurs at more than one position in the tree.
    pub is_duplicate: bool,
}

/// Options handed to the backend for a single parse attempt.
#[derive(Debug)]
pub struct ParseOptions<'a> {
    /// Names always treated as placeholders, regardless of pattern match.
    pub placeholder_whitelist: &'a HashSet<String>,
    /// Recognition pattern for ad-hoc placeholder identifiers.
    pub placeholder_pattern: &'a PlaceholderPattern,
    /// Whether the backend should keep comments in the parsed tree.
    pub preserve_comments: bool,
    /// Placeholder-recognition mode: `Some(true)` recognizes only the
    /// backend's syntactic placeholder form, `Some(false)` disables it,
    /// `None` lets the backend auto-detect.
    pub syntactic_placeholders: Option<bool>,
}

/// The parser/instantiator collaborator pair.
///
/// `Metadata` is opaque to the compiler core: it is built once per
/// template, cached, and handed back by shared reference on every
/// invocation. `populate` must never mutate it and must return a tree
/// sharing no structure with any previously returned tree.
pub trait TemplateBackend {
    /// Cached description of a parsed candidate source.
    type Metadata;
    /// The syntax tree type, also used for replacement values.
    type Tree;

    /// Parse a candidate source, recognizing placeholders per `options`.
    fn parse(&self, source: &str, options: &ParseOptions<'_>) -> TemplateResult<Self::Metadata>;

    /// The placeholder occurrences found in `metadata`, in source order.
    fn placeholders<'m>(&self, metadata: &'m Self::Metadata) -> &'m [Placeholder];

    /// Produce an independent tree with placeholders replaced.
    fn populate(
        &self,
        metadata: &Self::Metadata,
        replacements: &ReplacementMap<Self::Tree>,
    ) -> TemplateResult<Self::Tree>;
}

/// The output-shape collaborator.
///
/// `wrap` runs on the candidate source before each parse attempt (e.g.
/// turning an expression into a parseable compilation unit); `unwrap` runs
/// on the populated tree and determines the caller-visible result shape.
pub trait Formatter<Tree> {
    /// The caller-visible result of an instantiation.
    type Output;

    /// Wrap literal source text into a parseable form.
    fn wrap(&self, source: &str) -> String;

    /// Unwrap a populated tree into the caller's expected shape.
    fn unwrap(&self, tree: Tree) -> TemplateResult<Self::Output>;
}
