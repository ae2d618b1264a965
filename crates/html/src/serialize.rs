//! Markup serialization for trees produced by the builder or mutated by callers.

use memchr::memchr_iter;

use crate::tokenizer::{FOREIGN_ELEMENTS, RAWTEXT_ELEMENTS, closes_rawtext, is_void_element};
use crate::types::Node;

/// Where a node sits, as far as the reparse of its output is concerned.
#[derive(Clone, Copy, Default)]
struct Context<'a> {
    /// Below an `svg` or `math` element.
    foreign: bool,
    /// Name of the raw-text parent, if the reparse will read this node as raw text.
    raw_text: Option<&'a str>,
}

enum Step<'a> {
    Node(&'a Node, Context<'a>),
    Close(&'a str),
}

/// Serializes `node` and its descendants.
///
/// A `Document` root writes its doctype (if any) followed by its children, so a fragment
/// container serializes to exactly its contents. Text under `script`/`style` is written
/// verbatim only outside `svg`/`math` and only when it cannot close its parent early;
/// otherwise it is escaped like any other text.
pub fn to_html(node: &Node) -> String {
    let mut out = String::new();
    let mut stack = vec![Step::Node(node, Context::default())];
    while let Some(step) = stack.pop() {
        match step {
            Step::Close(name) => {
                out.push_str("</");
                out.push_str(name);
                out.push('>');
            }
            Step::Node(node, cx) => write_node(node, cx, &mut stack, &mut out),
        }
    }
    out
}

fn write_node<'a>(node: &'a Node, cx: Context<'a>, stack: &mut Vec<Step<'a>>, out: &mut String) {
    match node {
        Node::Document { doctype, children } => {
            if let Some(doctype) = doctype {
                out.push_str("<!");
                out.push_str(doctype);
                out.push('>');
            }
            push_children(stack, children, Context::default());
        }
        Node::Element {
            name,
            attributes,
            children,
        } => {
            out.push('<');
            out.push_str(name);
            for (key, value) in attributes {
                out.push(' ');
                out.push_str(key);
                if let Some(value) = value {
                    out.push_str("=\"");
                    push_escaped(out, value, true);
                    out.push('"');
                }
            }
            out.push('>');
            if is_void_element(name) {
                return;
            }
            let foreign = cx.foreign || FOREIGN_ELEMENTS.contains(&name.as_str());
            let raw_text = (!foreign && RAWTEXT_ELEMENTS.contains(&name.as_str()))
                .then_some(name.as_str());
            stack.push(Step::Close(name.as_str()));
            push_children(stack, children, Context { foreign, raw_text });
        }
        Node::Text { text } => match cx.raw_text {
            Some(parent) if is_inert_raw_text(text, parent) => out.push_str(text),
            _ => push_escaped(out, text, false),
        },
        Node::Comment { text } => {
            out.push_str("<!--");
            if is_inert_comment(text) {
                out.push_str(text);
            } else {
                out.push_str(&text.replace('>', "&gt;"));
            }
            out.push_str("-->");
        }
    }
}

fn push_children<'a>(stack: &mut Vec<Step<'a>>, children: &'a [Node], cx: Context<'a>) {
    stack.extend(children.iter().rev().map(|child| Step::Node(child, cx)));
}

/// Raw text that a reparse reads back as a single text node of `parent`.
fn is_inert_raw_text(text: &str, parent: &str) -> bool {
    let bytes = text.as_bytes();
    memchr_iter(b'<', bytes).all(|at| !closes_rawtext(&bytes[at..], parent))
}

/// Comment text that a reparse reads back as the same comment.
fn is_inert_comment(text: &str) -> bool {
    !(text.starts_with('>')
        || text.starts_with("->")
        || text.contains("-->")
        || text.contains("--!>"))
}

fn push_escaped(out: &mut String, s: &str, attribute: bool) {
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '"' if attribute => out.push_str("&quot;"),
            '<' if !attribute => out.push_str("&lt;"),
            '>' if !attribute => out.push_str("&gt;"),
            _ => out.push(ch),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse_fragment;

    #[test]
    fn serializes_elements_attributes_and_text() {
        let dom = Node::fragment(vec![Node::element(
            "a",
            vec![
                ("href".to_string(), Some("/q?a=1&b=\"2\"".to_string())),
                ("download".to_string(), None),
            ],
            vec![Node::text("1 < 2 & 3")],
        )]);
        assert_eq!(
            to_html(&dom),
            r#"<a href="/q?a=1&amp;b=&quot;2&quot;" download>1 &lt; 2 &amp; 3</a>"#
        );
    }

    #[test]
    fn void_elements_have_no_end_tag() {
        assert_eq!(to_html(&parse_fragment("<p>a<br>b</p>")), "<p>a<br>b</p>");
    }

    #[test]
    fn rawtext_children_are_not_escaped() {
        let input = "<style>a > b { color: red }</style>";
        assert_eq!(to_html(&parse_fragment(input)), input);
    }

    #[test]
    fn rawtext_that_would_close_its_parent_is_escaped() {
        let dom = Node::fragment(vec![Node::element(
            "style",
            vec![],
            vec![Node::text("a</style ><img src=x onerror=y>")],
        )]);
        assert_eq!(
            to_html(&dom),
            "<style>a&lt;/style &gt;&lt;img src=x onerror=y&gt;</style>"
        );
        // A near match is still inert.
        let dom = Node::fragment(vec![Node::element(
            "script",
            vec![],
            vec![Node::text("a</scripts>")],
        )]);
        assert_eq!(to_html(&dom), "<script>a</scripts></script>");
    }

    #[test]
    fn text_under_foreign_style_is_escaped() {
        let dom = Node::fragment(vec![Node::element(
            "svg",
            vec![],
            vec![Node::element(
                "g",
                vec![],
                vec![Node::element(
                    "style",
                    vec![],
                    vec![Node::text("<img src=x onerror=y>")],
                )],
            )],
        )]);
        assert_eq!(
            to_html(&dom),
            "<svg><g><style>&lt;img src=x onerror=y&gt;</style></g></svg>"
        );
    }

    #[test]
    fn foreign_style_round_trips_its_markup() {
        let input = r#"<svg><style><img src="x"></style></svg><style>a > b</style>"#;
        assert_eq!(to_html(&parse_fragment(input)), input);
    }

    #[test]
    fn comments_that_would_end_early_are_defused() {
        let dom = Node::fragment(vec![
            Node::comment("a--><img src=x onerror=y>"),
            Node::comment(">b"),
            Node::comment("c--!>d"),
        ]);
        assert_eq!(
            to_html(&dom),
            "<!--a--&gt;<img src=x onerror=y&gt;--><!--&gt;b--><!--c--!&gt;d-->"
        );
    }

    #[test]
    fn deep_trees_serialize_without_recursion() {
        let depth = 50_000;
        let input = "<b>".repeat(depth) + "x";
        let dom = parse_fragment(&input);
        let html = to_html(&dom);
        assert!(html.starts_with("<b><b>"));
        assert_eq!(html.len(), depth * "<b></b>".len() + 1);
        // Dropping the tree recurses per level.
        std::mem::forget(dom);
    }

    #[test]
    fn comments_and_doctype_round_trip() {
        let input = "<!DOCTYPE html><!-- keep me --><p>x</p>";
        assert_eq!(to_html(&parse_fragment(input)), input);
    }

    #[test]
    fn reparsing_serialized_output_is_stable() {
        let input = r#"<div class="a"><p>one &amp; two<img src="x.png" alt="&quot;q&quot;"></p></div>"#;
        let once = to_html(&parse_fragment(input));
        let twice = to_html(&parse_fragment(&once));
        assert_eq!(once, input);
        assert_eq!(twice, once);
    }
}
