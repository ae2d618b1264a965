//! Attribute filter chains and forced attributes.

use std::ops::AddAssign;

use html::{Attributes, Node, set_attribute};

use crate::classify::{is_custom_element, lowercase_tag};
use crate::policy::{AttributeFilter, FilterResult, Policy};

/// What one attribute pass changed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AttributeStats {
    /// Attributes removed by a `Remove` verdict.
    pub removed: usize,
    /// `Replace` verdicts that changed a value.
    pub replaced: usize,
    /// Forced attributes written.
    pub forced: usize,
}

impl AddAssign for AttributeStats {
    fn add_assign(&mut self, other: Self) {
        self.removed += other.removed;
        self.replaced += other.replaced;
        self.forced += other.forced;
    }
}

/// Runs the filter chain over every attribute, then applies merged forced attributes.
///
/// The chain for an element is its tag filter, then the `*-` filter when the element is
/// custom, then the `*` filter; missing scopes are skipped. Custom-ness is decided once,
/// before any filter runs, so a filter removing `is` does not change the chain.
pub fn sanitize_attributes(tag: &str, attributes: &mut Attributes, policy: &Policy) -> AttributeStats {
    let tag = lowercase_tag(tag);
    let has_is = attributes.iter().any(|(k, _)| k.eq_ignore_ascii_case("is"));
    let is_custom = is_custom_element(&tag, has_is);
    let mut stats = AttributeStats::default();

    let chain: Vec<&AttributeFilter> = policy.filters().applicable(&tag, is_custom).collect();
    if !chain.is_empty() {
        // Filters only see `(name, value)`, so this loop is the only thing that changes the
        // list while it runs; walking by index visits each attribute exactly once.
        let mut index = 0;
        while index < attributes.len() {
            if run_chain(&tag, &chain, &mut attributes[index], &mut stats) {
                index += 1;
            } else {
                attributes.remove(index);
                stats.removed += 1;
            }
        }
    }

    for (name, value) in merge_forced_attributes(policy, &tag, is_custom) {
        let Some(value) = value else {
            continue;
        };
        set_attribute(attributes, name, value.to_string());
        stats.forced += 1;
    }

    stats
}

/// Sanitizes an element node in place. Non-elements are left alone.
pub fn sanitize_element(node: &mut Node, policy: &Policy) -> AttributeStats {
    match node {
        Node::Element {
            name, attributes, ..
        } => sanitize_attributes(name, attributes, policy),
        _ => AttributeStats::default(),
    }
}

/// Returns whether the attribute survives. `Replace` rewrites the value in place and the
/// next filter sees the rewritten value.
fn run_chain(
    tag: &str,
    chain: &[&AttributeFilter],
    (name, value): &mut (String, Option<String>),
    stats: &mut AttributeStats,
) -> bool {
    let name = lowercase_tag(name);
    for filter in chain {
        match filter(&*name, value.as_deref().unwrap_or("")) {
            FilterResult::Allow => return true,
            FilterResult::Remove => {
                log::trace!(target: "sanitizer.attributes", "<{tag}> remove {name}");
                return false;
            }
            FilterResult::Replace(replacement) => {
                if value.as_deref() != Some(replacement.as_str()) {
                    log::trace!(target: "sanitizer.attributes", "<{tag}> replace {name}={replacement:?}");
                    stats.replaced += 1;
                }
                *value = Some(replacement);
            }
            FilterResult::Pass => {}
        }
    }
    true
}

/// Merges forced attributes for an element: tag entries, overlaid by `*-` entries when the
/// element is custom, overlaid by `*` entries. On a name conflict the later overlay's
/// value wins; names keep the position where they first appeared.
pub fn merge_forced_attributes<'p>(
    policy: &'p Policy,
    tag: &str,
    is_custom: bool,
) -> Vec<(&'p str, Option<&'p str>)> {
    let tag = lowercase_tag(tag);
    let mut merged: Vec<(&'p str, Option<&'p str>)> = Vec::new();
    for entries in policy.forces().applicable(&tag, is_custom) {
        for (name, value) in entries {
            match merged.iter_mut().find(|(existing, _)| *existing == name.as_str()) {
                Some(slot) => slot.1 = value.as_deref(),
                None => merged.push((name.as_str(), value.as_deref())),
            }
        }
    }
    merged
}
