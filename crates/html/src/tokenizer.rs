//! Forgiving markup tokenizer.
//!
//! Tag and attribute names are ASCII `[A-Za-z0-9:_-]` and are lowercased. `script` and
//! `style` bodies are raw text unless they sit inside `svg` or `math`, where they are
//! ordinary markup. This is not an HTML5 state machine: there is no parse error reporting
//! and recovery is local (a stray `<` that does not start a tag becomes text, an
//! unterminated comment runs to end of input).

use crate::entities::decode_entities;
use crate::types::{Attributes, Token};
use memchr::memchr;

const COMMENT_START: &[u8] = b"<!--";
const COMMENT_END: &str = "-->";
const COMMENT_END_BANG: &str = "--!>";
const DOCTYPE_START: &[u8] = b"<!doctype";

pub(crate) const RAWTEXT_ELEMENTS: &[&str] = &["script", "style"];

/// Roots of foreign content. Inside them `script` and `style` hold markup, not raw text.
pub(crate) const FOREIGN_ELEMENTS: &[&str] = &["svg", "math"];

pub(crate) fn is_void_element(name: &str) -> bool {
    matches!(
        name,
        "area"
            | "base"
            | "br"
            | "col"
            | "embed"
            | "hr"
            | "img"
            | "input"
            | "link"
            | "meta"
            | "param"
            | "source"
            | "track"
            | "wbr"
    )
}

fn is_name_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'-' || b == b'_' || b == b':'
}

fn starts_with_ignore_ascii_case(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.len() >= needle.len() && haystack[..needle.len()].eq_ignore_ascii_case(needle)
}

/// Whether `bytes` opens with an end tag for the raw-text element `name`: `</name`
/// followed by whitespace, `/`, `>` or the end of input.
pub(crate) fn closes_rawtext(bytes: &[u8], name: &str) -> bool {
    let Some(rest) = bytes.strip_prefix(b"</") else {
        return false;
    };
    if !starts_with_ignore_ascii_case(rest, name.as_bytes()) {
        return false;
    }
    match rest.get(name.len()) {
        None => true,
        Some(&b) => b.is_ascii_whitespace() || b == b'/' || b == b'>',
    }
}

/// Tokenizes a whole input string.
pub fn tokenize(input: &str) -> Vec<Token> {
    let mut tokenizer = Tokenizer::new(input);
    let mut out = Vec::new();
    while let Some(token) = tokenizer.next_token() {
        out.push(token);
    }
    log::trace!(target: "html.tokenizer", "tokenized {} bytes into {} tokens", input.len(), out.len());
    out
}

/// Pull tokenizer over a borrowed input.
pub struct Tokenizer<'a> {
    input: &'a str,
    pos: usize,
    /// Raw-text element whose body must be scanned next.
    rawtext: Option<String>,
    /// End tag queued after a raw-text body.
    pending: Option<Token>,
    /// Open `svg`/`math` start tags not yet matched by an end tag.
    foreign_depth: usize,
}

impl<'a> Tokenizer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            input,
            pos: 0,
            rawtext: None,
            pending: None,
            foreign_depth: 0,
        }
    }

    fn rest(&self) -> &'a [u8] {
        &self.input.as_bytes()[self.pos..]
    }

    pub fn next_token(&mut self) -> Option<Token> {
        if let Some(token) = self.pending.take() {
            return Some(token);
        }
        if let Some(name) = self.rawtext.take() {
            return Some(self.scan_rawtext(name));
        }
        // Invariant: `pos` only ever lands on ASCII structural bytes or the end of input,
        // so every slice below starts and ends on a char boundary.
        let rest = self.rest();
        if rest.is_empty() {
            return None;
        }
        if rest[0] != b'<' {
            return Some(self.scan_text());
        }
        if rest.starts_with(COMMENT_START) {
            return Some(self.scan_comment());
        }
        if starts_with_ignore_ascii_case(rest, DOCTYPE_START) {
            return self.scan_doctype();
        }
        match rest.get(1) {
            Some(b'/') => Some(self.scan_end_tag()),
            Some(&b) if is_name_byte(b) => Some(self.scan_start_tag()),
            // A `<` that opens nothing is literal text.
            _ => Some(self.scan_text_from(self.pos + 1)),
        }
    }

    fn scan_text(&mut self) -> Token {
        self.scan_text_from(self.pos)
    }

    fn scan_text_from(&mut self, search_from: usize) -> Token {
        let start = self.pos;
        let bytes = self.input.as_bytes();
        let end = memchr(b'<', &bytes[search_from..])
            .map(|rel| search_from + rel)
            .unwrap_or(bytes.len());
        self.pos = end;
        Token::Text(decode_entities(&self.input[start..end]))
    }

    /// Comments end at the first `-->` or `--!>`. `<!-->` and `<!--->` close at once.
    fn scan_comment(&mut self) -> Token {
        let body_start = self.pos + COMMENT_START.len();
        let body = &self.input[body_start..];
        for abrupt in [">", "->"] {
            if body.starts_with(abrupt) {
                self.pos = body_start + abrupt.len();
                return Token::Comment(String::new());
            }
        }
        let end = [COMMENT_END, COMMENT_END_BANG]
            .into_iter()
            .filter_map(|close| body.find(close).map(|at| (at, close.len())))
            .min();
        match end {
            Some((end, close_len)) => {
                self.pos = body_start + end + close_len;
                Token::Comment(body[..end].to_string())
            }
            None => {
                self.pos = self.input.len();
                Token::Comment(body.to_string())
            }
        }
    }

    fn scan_doctype(&mut self) -> Option<Token> {
        let body_start = self.pos + 2;
        let body = &self.input[body_start..];
        let Some(end) = body.find('>') else {
            self.pos = self.input.len();
            return None;
        };
        self.pos = body_start + end + 1;
        Some(Token::Doctype(body[..end].trim().to_string()))
    }

    fn scan_name(&mut self) -> String {
        let start = self.pos;
        let len = self.rest().iter().take_while(|&&b| is_name_byte(b)).count();
        self.pos += len;
        self.input[start..self.pos].to_ascii_lowercase()
    }

    fn skip_whitespace(&mut self) {
        let len = self
            .rest()
            .iter()
            .take_while(|b| b.is_ascii_whitespace())
            .count();
        self.pos += len;
    }

    fn skip_past(&mut self, byte: u8) {
        self.pos = match memchr(byte, self.rest()) {
            Some(rel) => self.pos + rel + 1,
            None => self.input.len(),
        };
    }

    fn scan_end_tag(&mut self) -> Token {
        self.pos += 2;
        let name = self.scan_name();
        self.skip_past(b'>');
        if FOREIGN_ELEMENTS.contains(&name.as_str()) {
            self.foreign_depth = self.foreign_depth.saturating_sub(1);
        }
        Token::EndTag(name)
    }

    fn scan_start_tag(&mut self) -> Token {
        self.pos += 1;
        let name = self.scan_name();
        let mut attributes: Attributes = Vec::new();
        let mut self_closing = false;

        loop {
            self.skip_whitespace();
            let rest = self.rest();
            match rest.first() {
                None => break,
                Some(b'>') => {
                    self.pos += 1;
                    break;
                }
                Some(b'/') => {
                    self.pos += 1;
                    if self.rest().first() == Some(&b'>') {
                        self_closing = true;
                        self.pos += 1;
                        break;
                    }
                }
                Some(&b) if is_name_byte(b) => {
                    let attr = self.scan_attribute();
                    attributes.push(attr);
                }
                // Junk inside a tag is skipped one byte at a time. Non-ASCII bytes are
                // skipped as whole characters to keep `pos` on a boundary.
                Some(_) => {
                    let ch_len = self.input[self.pos..]
                        .chars()
                        .next()
                        .map_or(1, char::len_utf8);
                    self.pos += ch_len;
                }
            }
        }

        if is_void_element(&name) {
            self_closing = true;
        }
        if !self_closing {
            if FOREIGN_ELEMENTS.contains(&name.as_str()) {
                self.foreign_depth += 1;
            } else if self.foreign_depth == 0 && RAWTEXT_ELEMENTS.contains(&name.as_str()) {
                self.rawtext = Some(name.clone());
            }
        }

        Token::StartTag {
            name,
            attributes,
            self_closing,
        }
    }

    fn scan_attribute(&mut self) -> (String, Option<String>) {
        let name = self.scan_name();
        self.skip_whitespace();
        if self.rest().first() != Some(&b'=') {
            return (name, None);
        }
        self.pos += 1;
        self.skip_whitespace();

        let value = match self.rest().first() {
            Some(&quote) if quote == b'"' || quote == b'\'' => {
                self.pos += 1;
                let start = self.pos;
                let end = memchr(quote, self.rest())
                    .map(|rel| start + rel)
                    .unwrap_or(self.input.len());
                self.pos = (end + 1).min(self.input.len());
                decode_entities(&self.input[start..end])
            }
            _ => {
                let start = self.pos;
                let rest = self.rest();
                let len = rest
                    .iter()
                    .enumerate()
                    .take_while(|&(i, &b)| {
                        !b.is_ascii_whitespace()
                            && b != b'>'
                            && !(b == b'/' && rest.get(i + 1) == Some(&b'>'))
                    })
                    .count();
                self.pos += len;
                decode_entities(&self.input[start..self.pos])
            }
        };
        (name, Some(value))
    }

    /// Scans a raw-text body up to the first end tag for `name` (see [`closes_rawtext`]).
    /// Anything between the name and the next `>` is discarded with the end tag. A missing
    /// close tag runs the body to end of input and still emits the end tag.
    fn scan_rawtext(&mut self, name: String) -> Token {
        let bytes = self.input.as_bytes();
        let start = self.pos;
        let mut i = start;
        let body_end = loop {
            let Some(rel) = memchr(b'<', &bytes[i..]) else {
                break bytes.len();
            };
            i += rel;
            if closes_rawtext(&bytes[i..], &name) {
                break i;
            }
            i += 1;
        };

        self.pos = body_end;
        if body_end < bytes.len() {
            self.skip_past(b'>');
        }
        let end_tag = Token::EndTag(name);
        if body_end == start {
            return end_tag;
        }
        self.pending = Some(end_tag);
        Token::Text(self.input[start..body_end].to_string())
    }
}
