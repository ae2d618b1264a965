//! The shipped baseline policy.

use std::sync::LazyLock;

use url::Url;

use crate::policy::{FilterResult, Policy};

/// URL schemes an `<a href>` may use under the default policy.
pub const LINK_PROTOCOLS: &[&str] = &[
    "http", "https", "dat", "dweb", "ipfs", "ipns", "ssb", "gopher", "xmpp", "magnet", "gemini",
];

pub const LINK_REL: &str = "noopener nofollow noreferrer ugc";
pub const LINK_TARGET: &str = "_blank";

static DEFAULT_POLICY: LazyLock<Policy> = LazyLock::new(build_default_policy);

/// Process-wide baseline, built on first use and never mutated.
///
/// - drops `script`, `iframe` and every custom element, with their content;
/// - strips every attribute except `a[href]` with a relative or allowed-scheme URL and
///   `img[src|height|width|alt]`;
/// - forces `rel` and `target` on links;
/// - removes comments.
pub fn default_policy() -> &'static Policy {
    &DEFAULT_POLICY
}

fn build_default_policy() -> Policy {
    Policy::builder()
        .drop_elements(["script", "*-", "iframe"])
        .filter_attributes("*", |_, _| FilterResult::Remove)
        .filter_attributes("a", |name, value| {
            if name == "href" {
                FilterResult::from(is_allowed_link(value))
            } else {
                FilterResult::Pass
            }
        })
        .filter_attributes("img", |name, _| match name {
            "src" | "height" | "width" | "alt" => FilterResult::Allow,
            _ => FilterResult::Pass,
        })
        .set_attribute("a", "rel", LINK_REL)
        .set_attribute("a", "target", LINK_TARGET)
        .allow_comments(false)
        .build()
}

/// Relative links (`/…`, `.…`) pass; absolute links pass when they parse and use a scheme
/// in [`LINK_PROTOCOLS`]. Anything unparseable is rejected.
pub fn is_allowed_link(href: &str) -> bool {
    if href.starts_with('/') || href.starts_with('.') {
        return true;
    }
    match Url::parse(href) {
        Ok(url) => LINK_PROTOCOLS.contains(&url.scheme()),
        Err(err) => {
            log::debug!(target: "sanitizer.policy", "rejecting unparseable href {href:?}: {err}");
            false
        }
    }
}
