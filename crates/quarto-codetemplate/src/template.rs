/*
 * template.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Template compilation and instantiation.
//!
//! [`Template::compile`] runs once, eagerly: it allocates slot names for
//! the interpolation gaps, asks the backend to parse the candidate source,
//! and retries with a longer slot-name prefix whenever a generated name is
//! indistinguishable from identifiers already present in the literal text.
//! The resulting metadata is cached inside the `Template` and only ever
//! read afterwards.
//!
//! Instantiation is two-stage: [`Template::bind`] pairs positional values
//! with slot names, and [`Binding::instantiate_with`] validates and merges
//! optional named overrides before requesting a fresh tree from the
//! backend. Each invocation builds its own replacement map, so concurrent
//! instantiations of one template never interfere.

use std::collections::HashSet;
use std::fmt;

use crate::backend::{Formatter, ParseOptions, TemplateBackend};
use crate::error::{TemplateError, TemplateResult};
use crate::options::BuildOptions;
use crate::replacements::ReplacementMap;
use crate::slots::{SLOT_MARKER, build_slot_source};

/// Upper bound on slot-name prefix lengths tried before giving up.
///
/// Literal text containing long runs of the marker character could
/// otherwise force the builder to lengthen the prefix forever.
const MAX_PREFIX_ATTEMPTS: usize = 16;

/// A compiled template, ready for unbounded instantiation.
pub struct Template<B: TemplateBackend, F> {
    backend: B,
    formatter: F,
    metadata: B::Metadata,
    names: Vec<String>,
}

impl<B: TemplateBackend, F> fmt::Debug for Template<B, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Template")
            .field("names", &self.names)
            .finish_non_exhaustive()
    }
}

impl<B, F> Template<B, F>
where
    B: TemplateBackend,
    F: Formatter<B::Tree>,
{
    /// Compile a template from literal fragments.
    ///
    /// One slot name is generated per gap between adjacent fragments. The
    /// generated names are whitelisted for the parse together with any
    /// caller-supplied extra names, so the backend never mistakes them for
    /// ordinary identifiers.
    ///
    /// # Errors
    /// Fails if the candidate source does not parse under any attempt, or
    /// if no collision-free prefix exists within the attempt cap.
    pub fn compile<S: AsRef<str>>(
        backend: B,
        formatter: F,
        fragments: &[S],
        options: BuildOptions,
    ) -> TemplateResult<Self> {
        let fragments: Vec<&str> = fragments.iter().map(AsRef::as_ref).collect();

        for attempt in 1..=MAX_PREFIX_ATTEMPTS {
            let prefix = SLOT_MARKER.to_string().repeat(attempt);
            let slots = build_slot_source(&fragments, &prefix);

            // Generated names must also stay distinct from names the
            // caller has reserved for its own placeholders.
            if slots
                .names
                .iter()
                .any(|name| options.placeholder_whitelist.contains(name))
            {
                tracing::trace!(attempt, "slot names clash with caller whitelist, lengthening prefix");
                continue;
            }

            let whitelist: HashSet<String> = slots
                .names
                .iter()
                .cloned()
                .chain(options.placeholder_whitelist.iter().cloned())
                .collect();
            let parse_options = ParseOptions {
                placeholder_whitelist: &whitelist,
                placeholder_pattern: &options.placeholder_pattern,
                preserve_comments: options.preserve_comments,
                syntactic_placeholders: options.syntactic_placeholders,
            };

            let metadata = backend.parse(&formatter.wrap(&slots.code), &parse_options)?;

            // An attempt is unsafe only when a generated name appears
            // verbatim in the literal text AND the parser reports that
            // same name as a duplicate placeholder.
            let generated: HashSet<&str> = slots.names.iter().map(String::as_str).collect();
            let unsafe_names = slots.collides_with_literal
                && backend
                    .placeholders(&metadata)
                    .iter()
                    .any(|p| p.is_duplicate && generated.contains(p.name.as_str()));

            if !unsafe_names {
                tracing::debug!(slots = slots.names.len(), attempt, "template compiled");
                return Ok(Template {
                    backend,
                    formatter,
                    metadata,
                    names: slots.names,
                });
            }
            tracing::trace!(
                attempt,
                "slot names collide with literal template text, lengthening prefix"
            );
        }

        Err(TemplateError::PrefixExhausted {
            attempts: MAX_PREFIX_ATTEMPTS,
        })
    }

    /// The generated slot names, one per interpolation gap, in gap order.
    pub fn slot_names(&self) -> &[String] {
        &self.names
    }

    /// The cached, read-only template metadata.
    pub fn metadata(&self) -> &B::Metadata {
        &self.metadata
    }

    /// Stage one: bind positional replacement values to slot names.
    ///
    /// Values pair with slot names by position. Slots beyond the supplied
    /// values stay unbound (they may still be filled by named overrides);
    /// values beyond the available slots are ignored.
    pub fn bind<I>(&self, values: I) -> Binding<'_, B, F>
    where
        I: IntoIterator<Item = B::Tree>,
    {
        let mut positional = ReplacementMap::new();
        for (name, value) in self.names.iter().zip(values) {
            positional.insert(name.clone(), value);
        }
        Binding {
            template: self,
            positional,
        }
    }

    /// Bind and instantiate in one step, with no named overrides.
    pub fn instantiate<I>(&self, values: I) -> TemplateResult<F::Output>
    where
        I: IntoIterator<Item = B::Tree>,
    {
        self.bind(values).instantiate()
    }
}

/// Stage one of an invocation: positional values bound to slot names.
///
/// A `Binding` borrows its template; the cached metadata is shared, while
/// the replacement map is owned by this invocation alone.
pub struct Binding<'t, B: TemplateBackend, F> {
    template: &'t Template<B, F>,
    positional: ReplacementMap<B::Tree>,
}

impl<B, F> Binding<'_, B, F>
where
    B: TemplateBackend,
    F: Formatter<B::Tree>,
{
    /// Stage two without named overrides.
    pub fn instantiate(self) -> TemplateResult<F::Output> {
        self.finish(ReplacementMap::new())
    }

    /// Stage two with named overrides.
    ///
    /// An empty override map normalizes to "no overrides". Override keys
    /// must be disjoint from the positionally bound slot names; any
    /// overlap fails the call with
    /// [`TemplateError::ReplacementOverlap`](crate::TemplateError::ReplacementOverlap)
    /// and leaves the template usable.
    pub fn instantiate_with(self, overrides: ReplacementMap<B::Tree>) -> TemplateResult<F::Output> {
        self.finish(overrides)
    }

    fn finish(self, overrides: ReplacementMap<B::Tree>) -> TemplateResult<F::Output> {
        let replacements = if overrides.is_empty() {
            self.positional
        } else {
            self.positional.merge_disjoint(overrides)?
        };
        let tree = self
            .template
            .backend
            .populate(&self.template.metadata, &replacements)?;
        self.template.formatter.unwrap(tree)
    }
}
