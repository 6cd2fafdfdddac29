//! Email address types.

use crate::error::{Error, Result};
use letterpress_mime::Headers;
use std::fmt;
use std::str::FromStr;

/// Characters that force a display name into a quoted string.
const SPECIALS: &str = "()<>[]:;@\\,.\"";

/// Mailbox: optional display name plus an address.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Mailbox {
    /// Display name (optional).
    pub name: Option<String>,
    address: String,
}

impl Mailbox {
    /// Creates a new mailbox with just an address.
    ///
    /// # Errors
    ///
    /// Returns an error if the address is invalid.
    pub fn new(address: impl Into<String>) -> Result<Self> {
        let address = address.into();
        validate(&address)?;
        Ok(Self {
            name: None,
            address,
        })
    }

    /// Creates a new mailbox with a display name and address.
    ///
    /// # Errors
    ///
    /// Returns an error if the address is invalid or the name contains a
    /// line break.
    pub fn with_name(name: impl Into<String>, address: impl Into<String>) -> Result<Self> {
        let mut mailbox = Self::new(address)?;
        let name = name.into();
        check_name(&name)?;
        mailbox.name = (!name.trim().is_empty()).then_some(name);
        Ok(mailbox)
    }

    /// Checks that the display name can be written to a header line.
    ///
    /// `name` is public, so this is repeated wherever a mailbox becomes
    /// header text.
    ///
    /// # Errors
    ///
    /// Returns a conversion error if the name contains CR or LF.
    pub fn check(&self) -> Result<()> {
        self.name.as_deref().map_or(Ok(()), check_name)
    }

    /// Returns the bare address.
    #[must_use]
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Returns the domain part of the address.
    #[must_use]
    pub fn domain(&self) -> &str {
        self.address.rsplit_once('@').map_or("", |(_, domain)| domain)
    }

    /// Parses a single mailbox.
    ///
    /// Accepts `user@host`, `<user@host>`, `Name <user@host>` and
    /// `"Quoted, Name" <user@host>`. Encoded-word display names are decoded.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not exactly one valid mailbox.
    pub fn parse(text: &str) -> Result<Self> {
        let mut list = Self::parse_list(text)?;
        match list.len() {
            1 => Ok(list.remove(0)),
            0 => Err(invalid(text, "Address cannot be empty")),
            count => Err(Error::Cardinality {
                field: "mailbox",
                count,
            }),
        }
    }

    /// Parses a comma separated address list.
    ///
    /// Commas inside quoted names or angle brackets do not split. Empty
    /// entries are skipped.
    ///
    /// # Errors
    ///
    /// Returns an error if any entry is not a valid mailbox.
    pub fn parse_list(text: &str) -> Result<Vec<Self>> {
        split_list(text)
            .into_iter()
            .map(str::trim)
            .filter(|entry| !entry.is_empty())
            .map(parse_one)
            .collect()
    }
}

impl FromStr for Mailbox {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<&str> for Mailbox {
    type Error = Error;

    fn try_from(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for Mailbox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            None => f.write_str(&self.address),
            Some(name) if name.contains(|c| SPECIALS.contains(c)) => {
                let escaped = name.replace('\\', "\\\\").replace('"', "\\\"");
                write!(f, "\"{escaped}\" <{}>", self.address)
            }
            Some(name) => write!(f, "{name} <{}>", self.address),
        }
    }
}

/// Joins mailboxes into a single header value.
#[must_use]
pub fn join(mailboxes: &[Mailbox]) -> String {
    mailboxes
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

fn invalid(text: &str, reason: &str) -> Error {
    Error::conversion("mailbox", text, reason)
}

fn check_name(name: &str) -> Result<()> {
    if name.contains(['\r', '\n']) {
        return Err(invalid(name, "Display names cannot contain line breaks"));
    }
    Ok(())
}

/// Validates an email address (basic validation).
fn validate(addr: &str) -> Result<()> {
    if addr.is_empty() {
        return Err(invalid(addr, "Address cannot be empty"));
    }

    if addr.contains(|c: char| c.is_whitespace() || "<>,\"".contains(c)) {
        return Err(invalid(addr, "Address contains forbidden characters"));
    }

    let Some((local, domain)) = addr.split_once('@') else {
        return Err(invalid(addr, "Address must contain @"));
    };

    if domain.contains('@') {
        return Err(invalid(addr, "Address must have exactly one @"));
    }

    if local.is_empty() || domain.is_empty() {
        return Err(invalid(addr, "Local and domain parts cannot be empty"));
    }

    Ok(())
}

/// Splits on commas that are outside quotes and angle brackets.
fn split_list(text: &str) -> Vec<&str> {
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

fn parse_one(entry: &str) -> Result<Mailbox> {
    let Some(open) = entry.rfind('<') else {
        return Mailbox::new(entry);
    };

    let close = entry[open..]
        .find('>')
        .map(|i| open + i)
        .ok_or_else(|| invalid(entry, "Unterminated angle address"))?;
    if !entry[close + 1..].trim().is_empty() {
        return Err(invalid(entry, "Trailing text after angle address"));
    }

    let address = entry[open + 1..close].trim();
    let name = unquote(entry[..open].trim());
    let name = Headers::decode_value(&name).map_err(|e| invalid(entry, &e.to_string()))?;
    Mailbox::with_name(name, address)
}

fn unquote(name: &str) -> String {
    let Some(inner) = name.strip_prefix('"').and_then(|n| n.strip_suffix('"')) else {
        return name.to_string();
    };

    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(next) = chars.next() {
                out.push(next);
            }
        } else {
            out.push(c);
        }
    }
    out
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
    fn test_valid_address() {
        let mailbox = Mailbox::new("user@example.com").unwrap();
        assert_eq!(mailbox.address(), "user@example.com");
        assert_eq!(mailbox.domain(), "example.com");
        assert!(mailbox.name.is_none());
    }

    #[test]
    fn test_invalid_addresses() {
        assert!(Mailbox::new("userexample.com").is_err());
        assert!(Mailbox::new("").is_err());
        assert!(Mailbox::new("@example.com").is_err());
        assert!(Mailbox::new("user@").is_err());
        assert!(Mailbox::new("a@b@c").is_err());
        assert!(Mailbox::new("user name@example.com").is_err());
    }

    #[test]
    fn test_mailbox_with_name() {
        let mailbox = Mailbox::with_name("John Doe", "john@example.com").unwrap();
        assert_eq!(mailbox.name.as_deref(), Some("John Doe"));
        assert_eq!(mailbox.to_string(), "John Doe <john@example.com>");

        let blank = Mailbox::with_name("  ", "john@example.com").unwrap();
        assert!(blank.name.is_none());
    }

    #[test]
    fn test_name_line_breaks_rejected() {
        let err = Mailbox::with_name("Evil\r\nX-Injected: yes", "a@example.com").unwrap_err();
        assert!(err.to_string().contains("line breaks"));
        assert!(Mailbox::with_name("Evil\n", "a@example.com").is_err());
        assert!(Mailbox::parse("Evil\r\nBcc: victim@example.org <a@example.com>").is_err());

        let mut mailbox = Mailbox::with_name("Fine", "a@example.com").unwrap();
        assert!(mailbox.check().is_ok());
        mailbox.name = Some("Bad\rName".into());
        assert!(matches!(
            mailbox.check(),
            Err(Error::Conversion { field: "mailbox", .. })
        ));
    }

    #[test]
    fn test_display_quotes_specials() {
        let mailbox = Mailbox::with_name("Doe, John", "john@example.com").unwrap();
        assert_eq!(mailbox.to_string(), "\"Doe, John\" <john@example.com>");
        assert_eq!(Mailbox::parse(&mailbox.to_string()).unwrap(), mailbox);

        let mailbox = Mailbox::with_name("Say \"hi\", Bob", "bob@example.com").unwrap();
        assert_eq!(Mailbox::parse(&mailbox.to_string()).unwrap(), mailbox);
    }

    #[test]
    fn test_parse_forms() {
        assert_eq!(
            Mailbox::parse("user@example.com").unwrap(),
            Mailbox::new("user@example.com").unwrap()
        );
        assert_eq!(
            Mailbox::parse("<user@example.com>").unwrap(),
            Mailbox::new("user@example.com").unwrap()
        );
        let named = Mailbox::parse("Alice Smith <alice@example.com>").unwrap();
        assert_eq!(named.name.as_deref(), Some("Alice Smith"));
        assert_eq!(named.address(), "alice@example.com");

        assert!(Mailbox::parse("Alice <alice@example.com").is_err());
        assert!(Mailbox::parse("Alice <alice@example.com> junk").is_err());
        assert!(matches!(
            Mailbox::parse("a@example.com, b@example.com"),
            Err(Error::Cardinality { count: 2, .. })
        ));
    }

    #[test]
    fn test_parse_encoded_name() {
        let mailbox = Mailbox::parse("=?utf-8?B?SsO2aG4=?= <john@example.com>").unwrap();
        assert_eq!(mailbox.name.as_deref(), Some("Jöhn"));
    }

    #[test]
    fn test_parse_list() {
        let list = Mailbox::parse_list(
            "\"Doe, John\" <john@example.com>, jane@example.com,, Bob <bob@example.com>",
        )
        .unwrap();
        let addresses: Vec<&str> = list.iter().map(Mailbox::address).collect();
        assert_eq!(
            addresses,
            vec!["john@example.com", "jane@example.com", "bob@example.com"]
        );
        assert!(Mailbox::parse_list("").unwrap().is_empty());
        assert!(Mailbox::parse_list("ok@example.com, broken").is_err());
    }

    #[test]
    fn test_join() {
        let list = vec![
            Mailbox::new("a@example.com").unwrap(),
            Mailbox::with_name("B", "b@example.com").unwrap(),
        ];
        assert_eq!(join(&list), "a@example.com, B <b@example.com>");
    }
}
