//! Character reference decoding for text and attribute values.
//!
//! Only a narrow subset is recognized: the named references in [`NAMED`] and
//! semicolon-terminated numeric references. Anything else is copied through verbatim.

use memchr::memchr;

const NAMED: &[(&[u8], char)] = &[
    (b"amp;", '&'),
    (b"lt;", '<'),
    (b"gt;", '>'),
    (b"quot;", '"'),
    (b"apos;", '\''),
    (b"nbsp;", '\u{00A0}'),
];

const MAX_HEX_DIGITS: usize = 6;
const MAX_DEC_DIGITS: usize = 7;

pub(crate) fn decode_entities(s: &str) -> String {
    let bytes = s.as_bytes();
    let Some(first) = memchr(b'&', bytes) else {
        return s.to_string();
    };

    let mut out = String::with_capacity(s.len());
    out.push_str(&s[..first]);
    let mut i = first;

    while i < bytes.len() {
        let Some(rel) = memchr(b'&', &bytes[i..]) else {
            out.push_str(&s[i..]);
            break;
        };
        out.push_str(&s[i..i + rel]);
        i += rel;

        match decode_reference(s, i + 1) {
            Some((ch, consumed)) => {
                out.push(ch);
                i += 1 + consumed;
            }
            None => {
                out.push('&');
                i += 1;
            }
        }
    }

    out
}

/// Decodes the reference body starting right after `&`.
/// Returns the character and the number of bytes consumed after the `&`.
fn decode_reference(s: &str, start: usize) -> Option<(char, usize)> {
    let rest = &s.as_bytes()[start..];

    if let Some((name, ch)) = NAMED.iter().find(|(name, _)| rest.starts_with(name)) {
        return Some((*ch, name.len()));
    }

    let body = rest.strip_prefix(b"#")?;
    let (radix, max_digits, prefix) = match body.first() {
        Some(b'x' | b'X') => (16, MAX_HEX_DIGITS, 2),
        _ => (10, MAX_DEC_DIGITS, 1),
    };

    let digits = &rest[prefix..];
    // Bounded so runs like `&#&#&#` stay linear.
    let end = digits.iter().take(max_digits + 1).position(|&b| b == b';')?;
    if end == 0 {
        return None;
    }
    let digits = std::str::from_utf8(&digits[..end]).ok()?;
    if !digits.bytes().all(|b| (b as char).is_digit(radix)) {
        return None;
    }
    let ch = u32::from_str_radix(digits, radix)
        .ok()
        .and_then(char::from_u32)?;
    Some((ch, prefix + end + 1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn passes_plain_text_through() {
        assert_eq!(decode_entities("120×32"), "120×32");
        assert_eq!(decode_entities(""), "");
    }

    #[test]
    fn decodes_named_references() {
        assert_eq!(decode_entities("a &amp; b"), "a & b");
        assert_eq!(decode_entities("&lt;tag&gt;"), "<tag>");
        assert_eq!(decode_entities("&quot;hi&apos;"), "\"hi'");
        assert_eq!(decode_entities("a&nbsp;b"), "a\u{00A0}b");
    }

    #[test]
    fn decodes_numeric_references() {
        assert_eq!(decode_entities("&#215;"), "×");
        assert_eq!(decode_entities("&#xD7;&#Xd7;"), "××");
        assert_eq!(decode_entities("&#x10FFFF;"), "\u{10FFFF}");
    }

    #[test]
    fn leaves_malformed_references_alone() {
        for s in [
            "&",
            "&&",
            "&;",
            "&#;",
            "&#x;",
            "&amp",
            "&unknown;",
            "&#xZZ;",
            "&#215 ",
            "&#xD800;",
            "&#x110000;",
            "&#11141111;",
        ] {
            assert_eq!(decode_entities(s), s, "input {s:?}");
        }
    }

    #[test]
    fn malformed_reference_does_not_swallow_the_next_one() {
        assert_eq!(decode_entities("&#xZZ;&amp;"), "&#xZZ;&");
    }
}
