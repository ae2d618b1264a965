use crate::types::{Node, Token};

/// Builds a fragment tree from tokens.
///
/// The result is always a `Node::Document` container. Unmatched end tags are ignored,
/// elements still open at end of input are closed implicitly, and adjacent text tokens
/// are coalesced into one text node.
pub fn build_dom(tokens: impl IntoIterator<Item = Token>) -> Node {
    let mut builder = FragmentBuilder::default();
    for token in tokens {
        builder.push(token);
    }
    builder.finish()
}

#[derive(Default)]
struct FragmentBuilder {
    doctype: Option<String>,
    top_level: Vec<Node>,
    /// Open elements, innermost last. Each owns the children appended so far.
    open: Vec<Node>,
}

impl FragmentBuilder {
    fn current_children(&mut self) -> &mut Vec<Node> {
        match self.open.last_mut().and_then(Node::children_mut) {
            Some(children) => children,
            None => &mut self.top_level,
        }
    }

    fn append(&mut self, node: Node) {
        self.current_children().push(node);
    }

    fn append_text(&mut self, text: String) {
        if text.is_empty() {
            return;
        }
        let children = self.current_children();
        if let Some(Node::Text { text: last }) = children.last_mut() {
            last.push_str(&text);
        } else {
            children.push(Node::Text { text });
        }
    }

    fn close_innermost(&mut self) {
        if let Some(node) = self.open.pop() {
            self.append(node);
        }
    }

    fn push(&mut self, token: Token) {
        match token {
            Token::Doctype(doctype) => self.doctype = Some(doctype),
            Token::Comment(text) => self.append(Node::Comment { text }),
            Token::Text(text) => self.append_text(text),
            Token::StartTag {
                name,
                attributes,
                self_closing,
            } => {
                let element = Node::Element {
                    name,
                    attributes,
                    children: Vec::new(),
                };
                if self_closing {
                    self.append(element);
                } else {
                    self.open.push(element);
                }
            }
            Token::EndTag(name) => {
                let Some(depth) = self
                    .open
                    .iter()
                    .rposition(|node| node.name().is_some_and(|n| n.eq_ignore_ascii_case(&name)))
                else {
                    log::trace!(target: "html.dom_builder", "ignoring unmatched end tag </{name}>");
                    return;
                };
                while self.open.len() > depth {
                    self.close_innermost();
                }
            }
        }
    }

    fn finish(mut self) -> Node {
        while !self.open.is_empty() {
            self.close_innermost();
        }
        Node::Document {
            doctype: self.doctype,
            children: self.top_level,
        }
    }
}
