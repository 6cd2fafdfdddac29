//! MIME header handling.

use crate::encoding::{decode_rfc2047, encode_rfc2047, needs_encoding};
use crate::error::{Error, Result};
use std::fmt;

/// Preferred maximum length of a rendered header line (RFC 5322 2.1.1).
const FOLD_AT: usize = 78;

/// Headers whose values are address lists (RFC 5322 3.6.2, 3.6.3; RFC 8098).
const ADDRESS_HEADERS: [&str; 7] = [
    "From",
    "Sender",
    "Reply-To",
    "To",
    "Cc",
    "Bcc",
    "Disposition-Notification-To",
];

/// Ordered collection of email headers.
///
/// Names are matched case-insensitively but rendered as first inserted.
/// Duplicate instances of a header are kept in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    entries: Vec<(String, String)>,
}

impl Headers {
    /// Creates a new empty header collection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a header value, keeping any existing instances.
    pub fn add(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.entries.push((name.into(), value.into()));
    }

    /// Sets a header value.
    ///
    /// The first existing instance is replaced in place and later instances
    /// are dropped; if the header is absent it is appended.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();

        match self.position(&name) {
            Some(pos) => {
                self.entries[pos].1 = value;
                let mut index = 0;
                self.entries.retain(|(n, _)| {
                    let keep = index <= pos || !n.eq_ignore_ascii_case(&name);
                    index += 1;
                    keep
                });
            }
            None => self.entries.push((name, value)),
        }
    }

    /// Gets the first value for a header.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.position(name).map(|pos| self.entries[pos].1.as_str())
    }

    /// Gets all values for a header.
    #[must_use]
    pub fn get_all(&self, name: &str) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
            .collect()
    }

    /// Returns true if at least one instance of the header exists.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    /// Removes all values for a header, returning how many were removed.
    pub fn remove(&mut self, name: &str) -> usize {
        let before = self.entries.len();
        self.entries.retain(|(n, _)| !n.eq_ignore_ascii_case(name));
        before - self.entries.len()
    }

    /// Removes and returns every header matching the predicate, in order.
    pub fn drain_matching(&mut self, mut predicate: impl FnMut(&str) -> bool) -> Vec<(String, String)> {
        let (taken, kept) = std::mem::take(&mut self.entries)
            .into_iter()
            .partition(|(n, _)| predicate(n));
        self.entries = kept;
        taken
    }

    /// Returns the number of header instances.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if there are no headers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns an iterator over all headers in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.entries.iter().position(|(n, _)| n.eq_ignore_ascii_case(name))
    }

    /// Parses headers from raw text.
    ///
    /// Headers are in the format:
    /// ```text
    /// Header-Name: value
    ///  continuation
    /// ```
    ///
    /// Parsing stops at the first empty line. Encoded words are left as-is.
    ///
    /// # Errors
    ///
    /// Returns an error if a line is neither a header nor a continuation.
    pub fn parse(text: &str) -> Result<Self> {
        let mut headers = Self::new();
        let mut current: Option<(String, String)> = None;

        for line in text.lines() {
            let line = line.strip_suffix('\r').unwrap_or(line);
            if line.is_empty() {
                break;
            }

            if line.starts_with([' ', '\t']) {
                let (_, value) = current
                    .as_mut()
                    .ok_or_else(|| Error::MalformedHeader(line.to_string()))?;
                value.push(' ');
                value.push_str(line.trim());
                continue;
            }

            if let Some((name, value)) = current.take() {
                headers.add(name, value);
            }

            let (name, value) = line
                .split_once(':')
                .ok_or_else(|| Error::MalformedHeader(line.to_string()))?;
            current = Some((name.trim().to_string(), value.trim().to_string()));
        }

        if let Some((name, value)) = current {
            headers.add(name, value);
        }

        Ok(headers)
    }

    /// Encodes a header value using RFC 2047 if needed.
    ///
    /// Only runs of words that need it become encoded words, so structured
    /// parts such as `<user@example.com>` stay readable.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding fails.
    pub fn encode_value(value: &str) -> Result<String> {
        let mut out: Vec<String> = Vec::new();
        let mut run: Vec<&str> = Vec::new();

        for word in value.split(' ') {
            if needs_encoding(word) {
                run.push(word);
                continue;
            }
            if !run.is_empty() {
                out.push(encode_rfc2047(&run.join(" "), "utf-8")?);
                run.clear();
            }
            out.push(word.to_string());
        }
        if !run.is_empty() {
            out.push(encode_rfc2047(&run.join(" "), "utf-8")?);
        }

        Ok(out.join(" "))
    }

    /// Encodes an address list header value using RFC 2047 if needed.
    ///
    /// Each non-ASCII display name becomes a single encoded word in place
    /// of its phrase, quotes included, so commas and quotes inside the name
    /// cannot leak into the address list. Addresses are left as they are.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding fails.
    pub fn encode_addresses(value: &str) -> Result<String> {
        let mut out = Vec::new();
        for entry in split_addresses(value).into_iter().map(str::trim) {
            if entry.is_empty() {
                continue;
            }
            let Some(open) = entry.rfind('<') else {
                out.push(entry.to_string());
                continue;
            };
            let name = unquote(entry[..open].trim());
            if needs_encoding(&name) {
                let word = encode_rfc2047(&name, "utf-8")?;
                out.push(format!("{word} {}", &entry[open..]));
            } else {
                out.push(entry.to_string());
            }
        }
        Ok(out.join(", "))
    }

    /// Returns true if `name` is a header carrying an address list.
    #[must_use]
    pub fn is_address_header(name: &str) -> bool {
        ADDRESS_HEADERS.iter().any(|h| h.eq_ignore_ascii_case(name))
    }

    /// Decodes a header value from RFC 2047 if encoded.
    ///
    /// # Errors
    ///
    /// Returns an error if decoding fails.
    pub fn decode_value(value: &str) -> Result<String> {
        decode_rfc2047(value)
    }
}

impl FromIterator<(String, String)> for Headers {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

/// Splits on commas that are outside quoted strings and angle brackets.
fn split_addresses(text: &str) -> Vec<&str> {
    let mut entries = Vec::new();
    let mut start = 0;
    let mut quoted = false;
    let mut escaped = false;
    let mut depth = 0usize;

    for (i, c) in text.char_indices() {
        match c {
            _ if escaped => escaped = false,
            '\\' if quoted => escaped = true,
            '"' => quoted = !quoted,
            '<' if !quoted => depth += 1,
            '>' if !quoted => depth = depth.saturating_sub(1),
            ',' if !quoted && depth == 0 => {
                entries.push(&text[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    entries.push(&text[start..]);
    entries
}

/// Strips the quotes and backslash escapes of a quoted-string phrase.
fn unquote(phrase: &str) -> String {
    let Some(inner) = phrase.strip_prefix('"').and_then(|p| p.strip_suffix('"')) else {
        return phrase.to_string();
    };

    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            out.extend(chars.next());
        } else {
            out.push(c);
        }
    }
    out
}

/// Writes `name: value` folded at whitespace so lines stay under 78 columns
/// where possible.
fn write_folded(f: &mut fmt::Formatter<'_>, name: &str, value: &str) -> fmt::Result {
    write!(f, "{name}:")?;
    let mut line_length = name.len() + 1;

    for (i, word) in value.split(' ').enumerate() {
        if i > 0 && line_length + 1 + word.len() > FOLD_AT {
            f.write_str("\r\n")?;
            line_length = 0;
        }
        f.write_str(" ")?;
        f.write_str(word)?;
        line_length += 1 + word.len();
    }

    f.write_str("\r\n")
}

impl fmt::Display for Headers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (name, value) in &self.entries {
            if needs_encoding(value) {
                let encoded = if Self::is_address_header(name) {
                    Self::encode_addresses(value)
                } else {
                    Self::encode_value(value)
                };
                let encoded = encoded.unwrap_or_else(|_| value.clone());
                write_folded(f, name, &encoded)?;
            } else {
                write_folded(f, name, value)?;
            }
        }

        Ok(())
    }
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

    #[test]
    fn test_headers_new() {
        let headers = Headers::new();
        assert!(headers.is_empty());
    }

    #[test]
    fn test_headers_add_get() {
        let mut headers = Headers::new();
        headers.add("Content-Type", "text/plain");
        assert_eq!(headers.get("Content-Type"), Some("text/plain"));
        assert_eq!(headers.get("content-type"), Some("text/plain")); // Case insensitive
    }

    #[test]
    fn test_headers_set_replaces_in_place() {
        let mut headers = Headers::new();
        headers.add("To", "alice@example.com");
        headers.add("Subject", "Hi");
        headers.add("to", "bob@example.com");
        assert_eq!(headers.get_all("To").len(), 2);

        headers.set("To", "charlie@example.com");
        assert_eq!(headers.get_all("To"), vec!["charlie@example.com"]);

        let names: Vec<&str> = headers.iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["To", "Subject"]);
    }

    #[test]
    fn test_headers_set_appends_when_absent() {
        let mut headers = Headers::new();
        headers.add("From", "a@example.com");
        headers.set("Subject", "Hello");
        let names: Vec<&str> = headers.iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["From", "Subject"]);
    }

    #[test]
    fn test_headers_remove() {
        let mut headers = Headers::new();
        headers.add("Subject", "Test");
        headers.add("subject", "Again");
        assert!(headers.contains("SUBJECT"));

        assert_eq!(headers.remove("Subject"), 2);
        assert!(headers.get("Subject").is_none());
        assert_eq!(headers.remove("Subject"), 0);
    }

    #[test]
    fn test_headers_drain_matching() {
        let mut headers = Headers::new();
        headers.add("Subject", "Test");
        headers.add("Content-Type", "text/plain");
        headers.add("Content-Transfer-Encoding", "7bit");

        let taken = headers.drain_matching(|n| n.to_ascii_lowercase().starts_with("content-"));
        assert_eq!(taken.len(), 2);
        assert_eq!(headers.len(), 1);
        assert_eq!(headers.get("subject"), Some("Test"));
    }

    #[test]
    fn test_headers_parse() {
        let text = concat!(
            "From: sender@example.com\r\n",
            "To: recipient@example.com\r\n",
            "Subject: Test Message\r\n",
            "Content-Type: text/plain;\r\n",
            " charset=utf-8\r\n",
            "\r\n",
            "Body: not a header\r\n"
        );

        let headers = Headers::parse(text).unwrap();
        assert_eq!(headers.len(), 4);
        assert_eq!(headers.get("From"), Some("sender@example.com"));
        assert_eq!(headers.get("Subject"), Some("Test Message"));
        assert_eq!(
            headers.get("Content-Type"),
            Some("text/plain; charset=utf-8")
        );
    }

    #[test]
    fn test_headers_parse_rejects_garbage() {
        assert!(Headers::parse(" leading continuation\r\n").is_err());
        assert!(Headers::parse("no colon here\r\n").is_err());
    }

    #[test]
    fn test_headers_display() {
        let mut headers = Headers::new();
        headers.add("From", "sender@example.com");
        headers.add("To", "recipient@example.com");

        assert_eq!(
            headers.to_string(),
            "From: sender@example.com\r\nTo: recipient@example.com\r\n"
        );
    }

    #[test]
    fn test_headers_display_encodes_non_ascii() {
        let mut headers = Headers::new();
        headers.add("Subject", "Héllo");

        let rendered = headers.to_string();
        assert!(rendered.starts_with("Subject: =?utf-8?B?"));
        let parsed = Headers::parse(&rendered).unwrap();
        let decoded = Headers::decode_value(parsed.get("Subject").unwrap()).unwrap();
        assert_eq!(decoded, "Héllo");
    }

    #[test]
    fn test_encode_value_keeps_address_readable() {
        let encoded = Headers::encode_value("Jöhn Dœ <john@example.com>").unwrap();
        assert!(encoded.starts_with("=?utf-8?B?"));
        assert!(encoded.ends_with(" <john@example.com>"));
        assert_eq!(
            Headers::decode_value(&encoded).unwrap(),
            "Jöhn Dœ <john@example.com>"
        );

        let encoded = Headers::encode_value("Héllo big wörld").unwrap();
        assert_eq!(Headers::decode_value(&encoded).unwrap(), "Héllo big wörld");
        assert!(encoded.contains(" big "));
    }

    #[test]
    fn test_encode_addresses_keeps_quoted_names_whole() {
        let encoded =
            Headers::encode_addresses("\"Müller, Hans\" <hans@example.com>, plain@example.com")
                .unwrap();
        let (word, rest) = encoded.split_once(' ').unwrap();
        assert!(word.starts_with("=?utf-8?B?") && word.ends_with("?="));
        assert!(!word.contains(['"', ',']));
        assert_eq!(rest, "<hans@example.com>, plain@example.com");
        assert_eq!(Headers::decode_value(word).unwrap(), "Müller, Hans");

        let encoded = Headers::encode_addresses("\"Say \\\"hé\\\"\" <a@example.com>").unwrap();
        let word = encoded.strip_suffix(" <a@example.com>").unwrap();
        assert_eq!(Headers::decode_value(word).unwrap(), "Say \"hé\"");
    }

    #[test]
    fn test_display_encodes_address_headers_by_mailbox() {
        let mut headers = Headers::new();
        headers.add("from", "\"Müller, Hans\" <hans@example.com>");
        headers.add("Subject", "Müller, Hans");

        let rendered = headers.to_string();
        assert!(rendered.is_ascii());
        let parsed = Headers::parse(&rendered).unwrap();
        let from = parsed.get("From").unwrap();
        assert!(from.ends_with(" <hans@example.com>"));
        assert!(!from.contains('"'));
        assert_eq!(
            Headers::decode_value(from).unwrap(),
            "Müller, Hans <hans@example.com>"
        );
        assert!(Headers::is_address_header("REPLY-TO"));
        assert!(!Headers::is_address_header("Subject"));
    }

    #[test]
    fn test_headers_display_folds_long_lines() {
        let mut headers = Headers::new();
        let recipients: Vec<String> = (0..10).map(|i| format!("user{i}@example.com")).collect();
        headers.add("To", recipients.join(", "));

        let rendered = headers.to_string();
        assert!(rendered.split("\r\n").all(|l| l.len() <= FOLD_AT));

        let parsed = Headers::parse(&rendered).unwrap();
        assert_eq!(parsed.get("To"), Some(recipients.join(", ").as_str()));
    }
}
