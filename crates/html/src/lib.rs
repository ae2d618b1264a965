//! Owned markup tree with a forgiving fragment parser and a serializer.
//!
//! The tree is a plain ownership hierarchy: every [`Node`] owns its children.
//! [`traverse`] walks it in document order without recursion.

pub mod traverse;

mod dom_builder;
mod entities;
mod serialize;
mod tokenizer;
mod types;

pub use crate::dom_builder::build_dom;
pub use crate::serialize::to_html;
pub use crate::tokenizer::{Tokenizer, tokenize};
pub use crate::traverse::{count_descendants, walk_preorder};
pub use crate::types::{Attributes, Node, Token, set_attribute};

/// Parses markup into a fragment container (`Node::Document`). Never fails.
pub fn parse_fragment(input: &str) -> Node {
    build_dom(tokenize(input))
}
