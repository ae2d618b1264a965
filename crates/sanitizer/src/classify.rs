use std::borrow::Cow;

use html::Node;

use crate::policy::Policy;

/// Disposition of one element.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ElementAction {
    /// Keep the element and sanitize its attributes.
    Allow,
    /// Remove the element, promoting its children into its place.
    Block,
    /// Remove the element and its entire subtree.
    Drop,
}

/// A custom element has a hyphen in its tag name or carries an `is` attribute.
pub fn is_custom_element(tag: &str, has_is_attribute: bool) -> bool {
    tag.contains('-') || has_is_attribute
}

/// Lowercases only when needed; the tokenizer already lowercases names.
pub(crate) fn lowercase_tag(name: &str) -> Cow<'_, str> {
    if name.bytes().any(|b| b.is_ascii_uppercase()) {
        Cow::Owned(name.to_ascii_lowercase())
    } else {
        Cow::Borrowed(name)
    }
}

/// First match wins: allow list, block list, drop list, then allow by default.
/// `tag` is compared ASCII case-insensitively.
pub fn classify(tag: &str, is_custom: bool, policy: &Policy) -> ElementAction {
    let tag = lowercase_tag(tag);
    if policy.allow_elements().matches(&tag, is_custom) {
        ElementAction::Allow
    } else if policy.block_elements().matches(&tag, is_custom) {
        ElementAction::Block
    } else if policy.drop_elements().matches(&tag, is_custom) {
        ElementAction::Drop
    } else {
        ElementAction::Allow
    }
}

/// Classifies an element node. Returns `None` for anything that is not an element.
pub fn classify_node(node: &Node, policy: &Policy) -> Option<ElementAction> {
    let name = node.name()?;
    let is_custom = is_custom_element(name, node.has_attr("is"));
    Some(classify(name, is_custom, policy))
}
