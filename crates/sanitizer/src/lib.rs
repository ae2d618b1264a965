//! Policy-driven sanitizing of parsed markup trees.
//!
//! A [`Policy`] says which elements survive ([`classify`]), which attributes survive and
//! how their values are rewritten ([`sanitize_attributes`]), which attributes are forced
//! onto elements, and whether comments stay. [`sanitize`] applies a policy to every node
//! below a container root in one read-only planning pass followed by a reverse replay of
//! the planned mutations (see [`scheduler`]).
//!
//! ```
//! let clean = sanitizer::sanitize_html(
//!     r#"<p onclick="x()">hi<script>evil()</script></p>"#,
//!     sanitizer::default_policy(),
//! )
//! .unwrap();
//! assert_eq!(clean, "<p>hi</p>");
//! ```

pub mod scheduler;

mod attributes;
mod classify;
mod defaults;
mod policy;

pub use crate::attributes::{
    AttributeStats, merge_forced_attributes, sanitize_attributes, sanitize_element,
};
pub use crate::classify::{ElementAction, classify, classify_node, is_custom_element};
pub use crate::defaults::{LINK_PROTOCOLS, LINK_REL, LINK_TARGET, default_policy, is_allowed_link};
pub use crate::policy::{
    AttributeFilter, CUSTOM_ELEMENTS_TOKEN, ElementSet, FilterResult, ForcedAttributes,
    GLOBAL_TOKEN, Policy, PolicyBuilder, Scope, ScopedTable,
};
pub use crate::scheduler::{SanitizeError, SanitizeStats};

use html::Node;

/// Sanitizes every descendant of `root` in place.
///
/// `root` itself is a container: it is never classified and its attributes are never
/// touched. A text or comment root has no descendants and is left as is.
pub fn sanitize(root: &mut Node, policy: &Policy) -> Result<SanitizeStats, SanitizeError> {
    let queue = scheduler::plan(root, policy);
    let stats = scheduler::apply(root, &queue, policy)?;
    log::debug!(
        target: "sanitizer",
        "sanitized {} actions: dropped={} unwrapped={} comments={} rewritten={} attrs removed={} replaced={} forced={}",
        queue.len(),
        stats.elements_dropped,
        stats.elements_unwrapped,
        stats.comments_removed,
        stats.elements_rewritten,
        stats.attributes.removed,
        stats.attributes.replaced,
        stats.attributes.forced,
    );
    Ok(stats)
}

/// Parses `input` as a fragment and sanitizes it. Returns the fragment container.
pub fn sanitize_fragment(input: &str, policy: &Policy) -> Result<Node, SanitizeError> {
    let mut fragment = html::parse_fragment(input);
    sanitize(&mut fragment, policy)?;
    Ok(fragment)
}

/// Parses, sanitizes and serializes `input`.
pub fn sanitize_html(input: &str, policy: &Policy) -> Result<String, SanitizeError> {
    sanitize_fragment(input, policy).map(|fragment| html::to_html(&fragment))
}
