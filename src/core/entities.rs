//! XML entity decoding and encoding
//!
//! Handles the built-in entities (&lt; &gt; &amp; &quot; &apos;) and
//! numeric character references (&#123; &#x7B;). Unknown entities are kept
//! as-is; the tree layer is lenient by contract.
//!
//! Uses Cow for zero-copy when no entities are present.

use memchr::memchr;
use std::borrow::Cow;

/// Decode text content, handling entity references.
///
/// Returns Borrowed if no entities are present (zero-copy),
/// Owned if entities were decoded.
#[inline]
pub fn decode_text(input: &str) -> Cow<'_, str> {
    // Fast path: check for '&' using SIMD
    if memchr(b'&', input.as_bytes()).is_none() {
        return Cow::Borrowed(input);
    }
    Cow::Owned(decode_entities(input))
}

/// Decode all entity references in the input.
pub fn decode_entities(input: &str) -> String {
    let bytes = input.as_bytes();
    let mut result = String::with_capacity(input.len());
    let mut pos = 0;

    while pos < bytes.len() {
        if let Some(amp_pos) = memchr(b'&', &bytes[pos..]) {
            result.push_str(&input[pos..pos + amp_pos]);
            pos += amp_pos;

            if let Some(semi_offset) = memchr(b';', &bytes[pos..]) {
                let entity = &input[pos + 1..pos + semi_offset];
                if let Some(decoded) = decode_entity(entity) {
                    result.push(decoded);
                    pos += semi_offset + 1;
                } else {
                    // Unknown entity, keep as-is
                    result.push('&');
                    pos += 1;
                }
            } else {
                // No semicolon found, keep the ampersand
                result.push('&');
                pos += 1;
            }
        } else {
            result.push_str(&input[pos..]);
            break;
        }
    }

    result
}

/// Decode a single entity (without & and ;)
pub fn decode_entity(entity: &str) -> Option<char> {
    if entity.is_empty() {
        return None;
    }

    // Numeric character reference
    if let Some(num) = entity.strip_prefix('#') {
        return decode_numeric_entity(num);
    }

    match entity {
        "lt" => Some('<'),
        "gt" => Some('>'),
        "amp" => Some('&'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        _ => None,
    }
}

/// Decode a numeric character reference (the part after `&#`)
fn decode_numeric_entity(entity: &str) -> Option<char> {
    let codepoint = if let Some(hex) = entity.strip_prefix(['x', 'X']) {
        u32::from_str_radix(hex, 16).ok()?
    } else {
        entity.parse::<u32>().ok()?
    };
    char::from_u32(codepoint)
}

/// Encode text for writing into an attribute value (escape special characters).
pub fn encode_text(input: &str) -> Cow<'_, str> {
    // Fast path: check if any escaping needed
    if !input
        .bytes()
        .any(|b| matches!(b, b'<' | b'>' | b'&' | b'"' | b'\''))
    {
        return Cow::Borrowed(input);
    }

    let mut result = String::with_capacity(input.len() + 16);
    for c in input.chars() {
        match c {
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            '&' => result.push_str("&amp;"),
            '"' => result.push_str("&quot;"),
            '\'' => result.push_str("&apos;"),
            _ => result.push(c),
        }
    }
    Cow::Owned(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_entities() {
        let result = decode_text("Hello, World!");
        assert!(matches!(result, Cow::Borrowed(_)));
        assert_eq!(result.as_ref(), "Hello, World!");
    }

    #[test]
    fn test_basic_entities() {
        let result = decode_text("&lt;hello&gt; &amp; &quot;world&quot;");
        assert_eq!(result.as_ref(), "<hello> & \"world\"");
    }

    #[test]
    fn test_numeric_decimal() {
        assert_eq!(decode_text("&#65;&#66;&#67;").as_ref(), "ABC");
    }

    #[test]
    fn test_numeric_hex() {
        assert_eq!(decode_text("&#x41;&#x42;&#x43;").as_ref(), "ABC");
    }

    #[test]
    fn test_unicode_entity() {
        assert_eq!(decode_text("&#x1F600;").as_ref(), "\u{1F600}");
    }

    #[test]
    fn test_unknown_entity() {
        assert_eq!(decode_text("&unknown;").as_ref(), "&unknown;");
    }

    #[test]
    fn test_bare_ampersand() {
        assert_eq!(decode_text("a & b").as_ref(), "a & b");
    }

    #[test]
    fn test_encode_text() {
        let result = encode_text("<hello> & \"world\"");
        assert_eq!(result.as_ref(), "&lt;hello&gt; &amp; &quot;world&quot;");
    }

    #[test]
    fn test_encode_clean() {
        assert!(matches!(encode_text("plain"), Cow::Borrowed(_)));
    }
}
