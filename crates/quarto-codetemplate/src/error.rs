/*
 * error.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Error types for template compilation and instantiation.

use thiserror::Error;

/// Errors that can occur during template operations.
#[derive(Debug, Error)]
pub enum TemplateError {
    /// Error parsing the candidate source.
    #[error("Parse error: {message}")]
    Parse { message: String },

    /// A named override targets a placeholder already bound by a
    /// positional value.
    #[error("Unexpected replacement overlap: '{name}' is already bound by a positional value")]
    ReplacementOverlap { name: String },

    /// No collision-free slot-name prefix was found within the attempt cap.
    #[error("No collision-free placeholder prefix found after {attempts} attempts")]
    PrefixExhausted { attempts: usize },

    /// An expression-position placeholder received no replacement value.
    #[error("No substitution given for placeholder '{name}'")]
    MissingSubstitution { name: String },

    /// A replacement key that names no placeholder in the template.
    #[error("Unknown substitution '{name}': the template has no such placeholder")]
    UnknownSubstitution { name: String },

    /// A replacement value with no source representation.
    #[error("Unsupported replacement value: {message}")]
    UnsupportedValue { message: String },

    /// The formatter could not unwrap the populated tree into the
    /// caller's expected shape.
    #[error("Output error: {message}")]
    Output { message: String },
}

/// Result type for template operations.
pub type TemplateResult<T> = Result<T, TemplateError>;
