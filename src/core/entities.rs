//! XML Entity Decoding
//!
//! Handles decoding of XML entities:
//! - Built-in entities: &lt; &gt; &amp; &quot; &apos;
//! - Numeric character references: &#123; &#x7B;
//! - A handful of common HTML named entities (lenient mode only)
//!
//! Uses Cow for zero-copy when no entities are present.

use memchr::{memchr, memrchr};
use std::borrow::Cow;

/// Longest reference we bother holding back at a chunk boundary (`&#x10FFFF;`)
const MAX_REFERENCE_LEN: usize = 12;

/// Decode text content, handling entity references
///
/// Returns Borrowed if no entities present (zero-copy),
/// returns Owned if entities were decoded.
#[inline]
pub fn decode_text(input: &[u8]) -> Cow<'_, [u8]> {
    if memchr(b'&', input).is_none() {
        return Cow::Borrowed(input);
    }
    Cow::Owned(decode_with(input, |entity| Ok(decode_entity(entity))).unwrap_or_default())
}

/// Decode text content in strict mode
/// Returns Err if any character reference refers to an invalid XML character
pub fn decode_text_strict(input: &[u8]) -> Result<Cow<'_, [u8]>, &'static str> {
    if input.iter().any(|&b| !is_valid_xml_byte(b)) {
        return Err("Invalid XML character in content");
    }
    if memchr(b'&', input).is_none() {
        return Ok(Cow::Borrowed(input));
    }
    decode_with(input, decode_entity_strict).map(Cow::Owned)
}

/// Position of a trailing `&...` that has no terminating `;` yet.
///
/// Text is handed to the tokenizer in chunks; a reference split across two
/// chunks must not be decoded half-way, so the caller holds the bytes from
/// this offset back until more input arrives.
pub fn incomplete_reference_start(input: &[u8]) -> Option<usize> {
    let amp = memrchr(b'&', input)?;
    let tail = &input[amp..];
    if memchr(b';', tail).is_some() || tail.len() > MAX_REFERENCE_LEN {
        return None;
    }
    Some(amp)
}

fn decode_with<F>(input: &[u8], mut decode: F) -> Result<Vec<u8>, &'static str>
where
    F: FnMut(&[u8]) -> Result<Option<String>, &'static str>,
{
    let mut result = Vec::with_capacity(input.len());
    let mut pos = 0;

    while pos < input.len() {
        let Some(amp_pos) = memchr(b'&', &input[pos..]) else {
            result.extend_from_slice(&input[pos..]);
            break;
        };
        result.extend_from_slice(&input[pos..pos + amp_pos]);
        pos += amp_pos;

        match memchr(b';', &input[pos..]) {
            Some(semi_offset) => {
                let entity = &input[pos + 1..pos + semi_offset];
                if let Some(decoded) = decode(entity)? {
                    result.extend_from_slice(decoded.as_bytes());
                    pos += semi_offset + 1;
                } else {
                    // Unknown entity, keep as-is
                    result.push(b'&');
                    pos += 1;
                }
            }
            None => {
                result.push(b'&');
                pos += 1;
            }
        }
    }

    Ok(result)
}

/// Decode a single entity with strict validation
fn decode_entity_strict(entity: &[u8]) -> Result<Option<String>, &'static str> {
    if entity.is_empty() {
        return Ok(None);
    }

    if entity[0] == b'#' {
        return match decode_numeric_entity(&entity[1..], true) {
            Some(s) => Ok(Some(s)),
            None => Err("Invalid character reference"),
        };
    }

    Ok(decode_builtin(entity).map(str::to_string))
}

/// Decode a single entity (without & and ;)
fn decode_entity(entity: &[u8]) -> Option<String> {
    if entity.is_empty() {
        return None;
    }

    if entity[0] == b'#' {
        return decode_numeric_entity(&entity[1..], false);
    }

    let decoded = decode_builtin(entity).or(match entity {
        b"nbsp" => Some("\u{00A0}"),
        b"copy" => Some("\u{00A9}"),
        b"reg" => Some("\u{00AE}"),
        b"trade" => Some("\u{2122}"),
        b"mdash" => Some("\u{2014}"),
        b"ndash" => Some("\u{2013}"),
        b"lsquo" => Some("\u{2018}"),
        b"rsquo" => Some("\u{2019}"),
        b"ldquo" => Some("\u{201C}"),
        b"rdquo" => Some("\u{201D}"),
        b"hellip" => Some("\u{2026}"),
        _ => None,
    });
    decoded.map(str::to_string)
}

fn decode_builtin(entity: &[u8]) -> Option<&'static str> {
    match entity {
        b"lt" => Some("<"),
        b"gt" => Some(">"),
        b"amp" => Some("&"),
        b"quot" => Some("\""),
        b"apos" => Some("'"),
        _ => None,
    }
}

/// Decode a numeric character reference with optional strict XML character validation
fn decode_numeric_entity(entity: &[u8], strict: bool) -> Option<String> {
    if entity.is_empty() {
        return None;
    }

    let codepoint = if entity[0] == b'x' || entity[0] == b'X' {
        let hex = std::str::from_utf8(&entity[1..]).ok()?;
        u32::from_str_radix(hex, 16).ok()?
    } else {
        let dec = std::str::from_utf8(entity).ok()?;
        dec.parse::<u32>().ok()?
    };

    if strict && !is_valid_xml_char(codepoint) {
        return None;
    }

    char::from_u32(codepoint).map(|c| c.to_string())
}

/// Check if a code point is a valid XML 1.0 Char
/// Char ::= #x9 | #xA | #xD | [#x20-#xD7FF] | [#xE000-#xFFFD] | [#x10000-#x10FFFF]
#[inline]
pub fn is_valid_xml_char(codepoint: u32) -> bool {
    matches!(codepoint,
        0x9 | 0xA | 0xD |
        0x20..=0xD7FF |
        0xE000..=0xFFFD |
        0x10000..=0x10FFFF
    )
}

/// Check if a byte is a valid XML Char (for single-byte content validation)
#[inline]
pub fn is_valid_xml_byte(b: u8) -> bool {
    // Bytes 0x80+ are potentially valid UTF-8 continuation bytes
    matches!(b, 0x9 | 0xA | 0xD | 0x20..=0x7F) || b >= 0x80
}
