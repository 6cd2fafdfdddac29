//! MIME encoding and decoding utilities.
//!
//! Supports Base64, Quoted-Printable, RFC 2047 header encoding and charset
//! conversion of text payloads.

use crate::error::{Error, Result};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use encoding_rs::Encoding;
use std::borrow::Cow;
use std::fmt::Write as _;

/// Maximum encoded line length for body encodings (RFC 2045).
const MAX_LINE_LENGTH: usize = 76;

/// Encodes data as Base64.
#[must_use]
pub fn encode_base64(data: &[u8]) -> String {
    STANDARD.encode(data)
}

/// Encodes data as Base64, broken into CRLF-terminated lines of 76 characters.
#[must_use]
pub fn encode_base64_wrapped(data: &[u8]) -> String {
    let encoded = encode_base64(data);
    let mut result = String::with_capacity(encoded.len() + encoded.len() / MAX_LINE_LENGTH * 2 + 2);

    // Base64 output is pure ASCII, so byte chunks are valid str boundaries.
    for line in encoded.as_bytes().chunks(MAX_LINE_LENGTH) {
        result.push_str(&String::from_utf8_lossy(line));
        result.push_str("\r\n");
    }

    result
}

/// Decodes Base64 data, ignoring embedded whitespace and line breaks.
fn decode_base64(data: &str) -> Result<Vec<u8>> {
    let cleaned: String = data.chars().filter(|c| !c.is_whitespace()).collect();
    STANDARD.decode(cleaned).map_err(Into::into)
}

/// Encodes bytes using Quoted-Printable encoding (RFC 2045).
///
/// Line breaks (`\n` or `\r\n`) in the input are kept as hard CRLF breaks;
/// long lines get soft breaks so no encoded line exceeds 76 characters.
/// Trailing whitespace before a hard break is encoded.
#[must_use]
pub fn encode_quoted_printable(data: &[u8]) -> String {
    let mut result = String::new();

    let mut lines = data.split(|&b| b == b'\n').peekable();
    while let Some(line) = lines.next() {
        let line = line.strip_suffix(b"\r").unwrap_or(line);
        encode_qp_line(line, &mut result);
        if lines.peek().is_some() {
            result.push_str("\r\n");
        }
    }

    result
}

fn encode_qp_line(line: &[u8], out: &mut String) {
    let mut line_length = 0;

    for (i, &byte) in line.iter().enumerate() {
        let is_last = i + 1 == line.len();
        let literal = match byte {
            b'!'..=b'<' | b'>'..=b'~' => true,
            b' ' | b'\t' => !is_last,
            _ => false,
        };
        let width = if literal { 1 } else { 3 };

        // Leave room for the soft break marker.
        if line_length + width > MAX_LINE_LENGTH - 1 {
            out.push_str("=\r\n");
            line_length = 0;
        }

        if literal {
            out.push(char::from(byte));
        } else {
            let _ = write!(out, "={byte:02X}");
        }
        line_length += width;
    }
}

/// Decodes Quoted-Printable text (RFC 2045) into raw bytes.
fn decode_quoted_printable(text: &str) -> Result<Vec<u8>> {
    let bytes = text.as_bytes();
    let mut result = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        let byte = bytes[i];
        if byte != b'=' {
            result.push(byte);
            i += 1;
            continue;
        }

        match bytes.get(i + 1..i + 3) {
            Some(b"\r\n") => i += 3,
            Some([b'\n', ..]) => i += 2,
            Some(hex) => {
                let decoded = std::str::from_utf8(hex)
                    .ok()
                    .and_then(|hex| u8::from_str_radix(hex, 16).ok())
                    .ok_or_else(|| Error::quoted_printable(format!("bad escape at byte {i}")))?;
                result.push(decoded);
                i += 3;
            }
            None if bytes.get(i + 1) == Some(&b'\n') => i += 2,
            None => {
                return Err(Error::quoted_printable("incomplete escape"));
            }
        }
    }

    Ok(result)
}

/// Encodes text into the bytes of `charset`.
///
/// Labels are resolved as browsers do, so `latin1` and `ISO-8859-1` both
/// work. Only ASCII-compatible charsets are accepted.
///
/// # Errors
///
/// Returns an error if the charset is unknown or not ASCII-compatible, or
/// if the text has characters it cannot represent.
pub fn encode_charset(text: &str, charset: &str) -> Result<Vec<u8>> {
    let encoding = lookup(charset)?;
    if encoding.output_encoding() != encoding {
        return Err(Error::charset(charset, "not an ASCII-compatible charset"));
    }
    // WHATWG maps US-ASCII onto windows-1252.
    if is_us_ascii(charset) && !text.is_ascii() {
        return Err(Error::charset(charset, "text is not ASCII"));
    }

    let (bytes, _, unmappable) = encoding.encode(text);
    if unmappable {
        return Err(Error::charset(
            charset,
            "text has characters the charset cannot represent",
        ));
    }
    Ok(bytes.into_owned())
}

/// Decodes bytes in `charset` into a string.
///
/// # Errors
///
/// Returns an error if the charset is unknown or the bytes are malformed
/// for it.
pub fn decode_charset(bytes: &[u8], charset: &str) -> Result<String> {
    lookup(charset)?
        .decode_without_bom_handling_and_without_replacement(bytes)
        .map(Cow::into_owned)
        .ok_or_else(|| Error::charset(charset, "payload is malformed for this charset"))
}

fn lookup(charset: &str) -> Result<&'static Encoding> {
    Encoding::for_label(charset.trim().as_bytes())
        .ok_or_else(|| Error::charset(charset, "unknown charset"))
}

fn is_us_ascii(charset: &str) -> bool {
    ["us-ascii", "ascii"]
        .iter()
        .any(|label| charset.trim().eq_ignore_ascii_case(label))
}

/// Encodes a header value using RFC 2047 encoding.
///
/// Format: `=?charset?encoding?encoded-text?=`
///
/// Values that are plain ASCII without encoded-word markers pass through
/// unchanged.
///
/// # Errors
///
/// Returns an error if the charset is empty.
pub fn encode_rfc2047(text: &str, charset: &str) -> Result<String> {
    if charset.trim().is_empty() {
        return Err(Error::EmptyCharset);
    }

    if !needs_encoding(text) {
        return Ok(text.to_string());
    }

    let encoded = encode_base64(text.as_bytes());
    Ok(format!("=?{charset}?B?{encoded}?="))
}

/// Returns true if a header value must be RFC 2047 encoded.
#[must_use]
pub fn needs_encoding(text: &str) -> bool {
    !text.is_ascii() || text.contains("=?")
}

/// Decodes an RFC 2047 encoded header value.
///
/// Encoded words may be embedded in surrounding plain text; whitespace
/// between adjacent encoded words is dropped as RFC 2047 requires.
///
/// # Errors
///
/// Returns an error if an encoded word is malformed.
pub fn decode_rfc2047(text: &str) -> Result<String> {
    let mut result = String::new();
    let mut rest = text;
    let mut last_was_word = false;

    while let Some(start) = rest.find("=?") {
        let (before, candidate) = rest.split_at(start);
        let Some((word, after)) = split_encoded_word(candidate) else {
            result.push_str(before);
            result.push_str("=?");
            rest = &candidate[2..];
            last_was_word = false;
            continue;
        };

        if !(last_was_word && before.trim().is_empty()) {
            result.push_str(before);
        }
        result.push_str(&decode_word(word)?);
        rest = after;
        last_was_word = true;
    }

    result.push_str(rest);
    Ok(result)
}

/// Splits `=?charset?enc?text?=` off the front of `text`.
fn split_encoded_word(text: &str) -> Option<(&str, &str)> {
    let inner = text.strip_prefix("=?")?;
    let charset_end = inner.find('?')?;
    let enc_end = charset_end + 1 + inner[charset_end + 1..].find('?')?;
    let end = enc_end + 1 + inner[enc_end + 1..].find("?=")?;
    Some((&inner[..end], &inner[end + 2..]))
}

fn decode_word(word: &str) -> Result<String> {
    let parts: Vec<&str> = word.splitn(3, '?').collect();
    let [charset, encoding, encoded_text] = parts.as_slice() else {
        return Err(Error::rfc2047("expected charset?encoding?text"));
    };
    // RFC 2231 allows a language suffix: `utf-8*en`.
    let charset = charset.split('*').next().unwrap_or(charset);

    let bytes = match encoding.to_uppercase().as_str() {
        "B" => decode_base64(encoded_text)?,
        // Quoted-Printable with underscore for space
        "Q" => decode_quoted_printable(&encoded_text.replace('_', " "))?,
        other => return Err(Error::rfc2047(format!("unknown encoding {other:?}"))),
    };
    decode_charset(&bytes, charset)
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::redundant_clone,
    clippy::manual_string_new,
    clippy::needless_collect,
    clippy::unreadable_literal,
    clippy::used_underscore_items,
    clippy::similar_names
)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_base64_encode_decode() {
        let data = b"Hello, World!";
        let encoded = encode_base64(data);
        assert_eq!(encoded, "SGVsbG8sIFdvcmxkIQ==");

        let decoded = decode_base64(&encoded).unwrap();
        assert_eq!(decoded, data);
    }

    #[test]
    fn test_base64_wrapped_lines() {
        let data = vec![0u8; 120];
        let encoded = encode_base64_wrapped(&data);
        let lines: Vec<&str> = encoded.split("\r\n").filter(|l| !l.is_empty()).collect();
        assert_eq!(lines.len(), 3);
        assert!(lines.iter().all(|l| l.len() <= 76));
        assert_eq!(decode_base64(&encoded).unwrap(), data);
    }

    #[test]
    fn test_quoted_printable_encode() {
        assert_eq!(encode_quoted_printable(b"Hello, World!"), "Hello, World!");

        let encoded = encode_quoted_printable("Héllo, Wørld!".as_bytes());
        assert!(encoded.contains("=C3=A9"));
        assert!(encode_quoted_printable(b"a=b").contains("=3D"));
    }

    #[test]
    fn test_quoted_printable_keeps_line_breaks() {
        let encoded = encode_quoted_printable(b"line one\nline two\r\nthree");
        assert_eq!(encoded, "line one\r\nline two\r\nthree");
    }

    #[test]
    fn test_quoted_printable_trailing_space() {
        let encoded = encode_quoted_printable(b"end \nnext");
        assert_eq!(encoded, "end=20\r\nnext");
    }

    #[test]
    fn test_quoted_printable_soft_breaks() {
        let long = "x".repeat(200);
        let encoded = encode_quoted_printable(long.as_bytes());
        assert!(encoded.split("\r\n").all(|l| l.len() <= 76));
        assert_eq!(decode_quoted_printable(&encoded).unwrap(), long.as_bytes());
    }

    #[test]
    fn test_quoted_printable_decode() {
        assert_eq!(decode_quoted_printable("Hello, World!").unwrap(), b"Hello, World!");
        assert_eq!(decode_quoted_printable("H=C3=A9llo").unwrap(), "Héllo".as_bytes());
        assert_eq!(decode_quoted_printable("Hello=\r\nWorld").unwrap(), b"HelloWorld");
        assert!(decode_quoted_printable("bad=Z").is_err());
        assert!(decode_quoted_printable("tail=").is_err());
    }

    #[test]
    fn test_charset_encode() {
        assert_eq!(encode_charset("héllo", "iso-8859-1").unwrap(), b"h\xe9llo");
        assert_eq!(encode_charset("héllo", "Latin1").unwrap(), b"h\xe9llo");
        assert_eq!(encode_charset("héllo", "UTF-8").unwrap(), "héllo".as_bytes());
        assert_eq!(encode_charset("plain", "us-ascii").unwrap(), b"plain");

        assert!(matches!(
            encode_charset("héllo", "klingon"),
            Err(Error::Charset { reason: "unknown charset", .. })
        ));
        assert!(encode_charset("héllo", "utf-16").is_err());
        assert!(encode_charset("héllo", "us-ascii").is_err());
        assert!(encode_charset("\u{4e2d}", "iso-8859-1").is_err());
    }

    #[test]
    fn test_charset_decode() {
        assert_eq!(decode_charset(b"h\xe9llo", "iso-8859-1").unwrap(), "héllo");
        assert_eq!(decode_charset("héllo".as_bytes(), "utf-8").unwrap(), "héllo");
        assert!(decode_charset(b"h\xe9llo", "utf-8").is_err());
        assert!(decode_charset(b"x", "klingon").is_err());
    }

    #[test]
    fn test_rfc2047_encode() {
        assert_eq!(encode_rfc2047("Hello", "utf-8").unwrap(), "Hello");

        let encoded = encode_rfc2047("Héllo", "utf-8").unwrap();
        assert!(encoded.starts_with("=?utf-8?B?"));
        assert!(encoded.ends_with("?="));
        assert!(encode_rfc2047("Héllo", "").is_err());
    }

    #[test]
    fn test_rfc2047_decode() {
        assert_eq!(decode_rfc2047("Hello").unwrap(), "Hello");
        assert_eq!(decode_rfc2047("=?utf-8?B?SMOpbGxv?=").unwrap(), "Héllo");
        assert_eq!(decode_rfc2047("=?utf-8?Q?H=C3=A9llo?=").unwrap(), "Héllo");
        assert_eq!(decode_rfc2047("=?ISO-8859-1?Q?H=E9llo_there?=").unwrap(), "Héllo there");
        assert_eq!(decode_rfc2047("=?utf-8*en?B?SMOpbGxv?=").unwrap(), "Héllo");
        assert!(decode_rfc2047("=?utf-8?B?6Q==?=").is_err());
        assert!(decode_rfc2047("=?utf-8?X?abc?=").is_err());
    }

    #[test]
    fn test_rfc2047_decode_embedded_words() {
        let decoded = decode_rfc2047("=?utf-8?B?SMOpbGxv?= <a@example.com>").unwrap();
        assert_eq!(decoded, "Héllo <a@example.com>");

        let decoded = decode_rfc2047("=?utf-8?Q?a?= =?utf-8?Q?b?=").unwrap();
        assert_eq!(decoded, "ab");
    }

    proptest! {
        #[test]
        fn quoted_printable_round_trips(text in "[ -~\u{e9}\u{f8}]{0,300}") {
            let encoded = encode_quoted_printable(text.as_bytes());
            prop_assert!(encoded.split("\r\n").all(|l| l.len() <= 76));
            prop_assert_eq!(decode_quoted_printable(&encoded).unwrap(), text.as_bytes());
        }
    }
}
