/*
 * slots.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Slot-name allocation for interpolation gaps.

/// Marker character used to build slot-name prefixes.
pub(crate) const SLOT_MARKER: char = '$';

/// One attempt at naming a template's interpolation gaps.
pub(crate) struct SlotSource {
    /// Fragments interleaved with the generated slot names.
    pub code: String,
    /// Generated slot names, one per gap, in gap order.
    pub names: Vec<String>,
    /// Whether any generated name appears verbatim in the literal text.
    pub collides_with_literal: bool,
}

/// Interleave `fragments` with slot names built from `prefix`.
///
/// The collision scan runs over the fragments concatenated with no
/// separator, so a name split across two adjacent fragments still counts
/// as a collision. The real candidate source keeps the slot names between
/// the fragments they separate.
pub(crate) fn build_slot_source(fragments: &[&str], prefix: &str) -> SlotSource {
    let scan: String = fragments.concat();
    let mut code = String::from(*fragments.first().unwrap_or(&""));
    let mut names = Vec::with_capacity(fragments.len().saturating_sub(1));
    let mut collides_with_literal = false;

    for (gap, fragment) in fragments.iter().enumerate().skip(1) {
        let name = format!("{prefix}{}", gap - 1);
        if !collides_with_literal {
            collides_with_literal = scan.contains(&name);
        }
        code.push_str(&name);
        code.push_str(fragment);
        names.push(name);
    }

    SlotSource {
        code,
        names,
        collides_with_literal,
    }
}
