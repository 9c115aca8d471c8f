/*
 * options.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Build-time options for template compilation.

use std::collections::HashSet;

use regex::Regex;

/// How a backend should recognize ad-hoc placeholder identifiers.
#[derive(Debug, Clone, Default)]
pub enum PlaceholderPattern {
    /// Use the backend's default recognition pattern.
    #[default]
    Default,
    /// Recognize no ad-hoc identifiers; only whitelisted or syntactic
    /// placeholders count.
    Disabled,
    /// Recognize identifiers matching this pattern.
    Custom(Regex),
}

/// Options supplied when compiling a template.
///
/// The parser itself is selected by the backend value passed to
/// [`Template::compile`](crate::Template::compile); everything else the
/// parse needs travels here.
#[derive(Debug, Clone, Default)]
pub struct BuildOptions {
    /// Extra names always treated as placeholders, in addition to the
    /// generated slot names.
    pub placeholder_whitelist: HashSet<String>,
    /// Recognition pattern for ad-hoc placeholder identifiers.
    pub placeholder_pattern: PlaceholderPattern,
    /// Keep comments in the parsed template.
    pub preserve_comments: bool,
    /// Placeholder-recognition mode; `None` lets the backend auto-detect.
    pub syntactic_placeholders: Option<bool>,
}

impl BuildOptions {
    /// Create options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a name to the placeholder whitelist.
    pub fn with_whitelisted(mut self, name: impl Into<String>) -> Self {
        self.placeholder_whitelist.insert(name.into());
        self
    }

    /// Use a custom placeholder recognition pattern.
    pub fn with_pattern(mut self, pattern: Regex) -> Self {
        self.placeholder_pattern = PlaceholderPattern::Custom(pattern);
        self
    }

    /// Disable ad-hoc placeholder recognition.
    pub fn without_pattern(mut self) -> Self {
        self.placeholder_pattern = PlaceholderPattern::Disabled;
        self
    }

    /// Keep or drop comments in the parsed template.
    pub fn with_preserved_comments(mut self, preserve: bool) -> Self {
        self.preserve_comments = preserve;
        self
    }

    /// Force syntactic placeholder recognition on or off.
    pub fn with_syntactic_placeholders(mut self, enabled: bool) -> Self {
        self.syntactic_placeholders = Some(enabled);
        self
    }
}
