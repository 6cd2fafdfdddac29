//! Native field values.

use crate::address::{self, Mailbox};
use chrono::{DateTime, FixedOffset, TimeZone};
use std::fmt;

/// Application-level value of a message field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    /// Free text.
    Text(String),
    /// Binary content (bodies only).
    Bytes(Vec<u8>),
    /// Integer (priority).
    Integer(i64),
    /// Date and time with its original offset.
    Date(DateTime<FixedOffset>),
    /// A single mailbox.
    Mailbox(Mailbox),
    /// An ordered list of mailboxes.
    Mailboxes(Vec<Mailbox>),
}

impl Value {
    /// Returns the text, if this is a text value.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Returns the integer, if this is an integer value.
    #[must_use]
    pub const fn as_integer(&self) -> Option<i64> {
        match self {
            Self::Integer(n) => Some(*n),
            _ => None,
        }
    }

    /// Returns the date, if this is a date value.
    #[must_use]
    pub const fn as_date(&self) -> Option<&DateTime<FixedOffset>> {
        match self {
            Self::Date(date) => Some(date),
            _ => None,
        }
    }

    /// Returns the single mailbox, if this is a mailbox value.
    #[must_use]
    pub const fn as_mailbox(&self) -> Option<&Mailbox> {
        match self {
            Self::Mailbox(mailbox) => Some(mailbox),
            _ => None,
        }
    }

    /// Consumes the value into its text, if it is text.
    #[must_use]
    pub fn into_text(self) -> Option<String> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Consumes the value into a mailbox list.
    ///
    /// A single mailbox becomes a one-element list; other kinds yield
    /// nothing.
    #[must_use]
    pub fn into_mailboxes(self) -> Vec<Mailbox> {
        match self {
            Self::Mailbox(mailbox) => vec![mailbox],
            Self::Mailboxes(list) => list,
            _ => Vec::new(),
        }
    }

    /// Name of the variant, for error messages.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Text(_) => "text",
            Self::Bytes(_) => "bytes",
            Self::Integer(_) => "integer",
            Self::Date(_) => "date",
            Self::Mailbox(_) => "mailbox",
            Self::Mailboxes(_) => "mailbox list",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(text) => f.write_str(text),
            Self::Bytes(bytes) => f.write_str(&String::from_utf8_lossy(bytes)),
            Self::Integer(n) => write!(f, "{n}"),
            Self::Date(date) => f.write_str(&date.to_rfc2822()),
            Self::Mailbox(mailbox) => write!(f, "{mailbox}"),
            Self::Mailboxes(list) => f.write_str(&address::join(list)),
        }
    }
}

impl From<&str> for Value {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<String> for Value {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<&String> for Value {
    fn from(text: &String) -> Self {
        Self::Text(text.clone())
    }
}

impl From<Vec<u8>> for Value {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Bytes(bytes)
    }
}

impl From<&[u8]> for Value {
    fn from(bytes: &[u8]) -> Self {
        Self::Bytes(bytes.to_vec())
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Self::Integer(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Self::Integer(i64::from(n))
    }
}

impl From<u8> for Value {
    fn from(n: u8) -> Self {
        Self::Integer(i64::from(n))
    }
}

impl<Tz: TimeZone> From<DateTime<Tz>> for Value {
    fn from(date: DateTime<Tz>) -> Self {
        Self::Date(date.fixed_offset())
    }
}

impl From<Mailbox> for Value {
    fn from(mailbox: Mailbox) -> Self {
        Self::Mailbox(mailbox)
    }
}

impl From<Vec<Mailbox>> for Value {
    fn from(list: Vec<Mailbox>) -> Self {
        Self::Mailboxes(list)
    }
}

impl From<&[Mailbox]> for Value {
    fn from(list: &[Mailbox]) -> Self {
        Self::Mailboxes(list.to_vec())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_conversions() {
        assert_eq!(Value::from("hi"), Value::Text("hi".into()));
        assert_eq!(Value::from(3_u8).as_integer(), Some(3));
        assert_eq!(Value::from(vec![1_u8, 2]).kind(), "bytes");

        let date = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let value = Value::from(date);
        assert_eq!(value.as_date().unwrap().offset().local_minus_utc(), 0);
    }

    #[test]
    fn test_into_mailboxes() {
        let mailbox = Mailbox::new("a@example.com").unwrap();
        assert_eq!(
            Value::from(mailbox.clone()).into_mailboxes(),
            vec![mailbox.clone()]
        );
        assert!(Value::from("text").into_mailboxes().is_empty());
    }

    #[test]
    fn test_extractors_match_variant() {
        let mailbox = Mailbox::new("a@example.com").unwrap();
        assert_eq!(Value::from(mailbox.clone()).as_mailbox(), Some(&mailbox));
        assert_eq!(Value::from("subject").as_text(), Some("subject"));
        assert_eq!(Value::from(7_i64).as_text(), None);
        assert_eq!(Value::from("owned").into_text().as_deref(), Some("owned"));
        assert_eq!(Value::from(vec![mailbox]).into_text(), None);
    }

    #[test]
    fn test_display() {
        let list = vec![
            Mailbox::new("a@example.com").unwrap(),
            Mailbox::new("b@example.com").unwrap(),
        ];
        assert_eq!(
            Value::from(list).to_string(),
            "a@example.com, b@example.com"
        );
        assert_eq!(Value::from(5_i64).to_string(), "5");
    }
}
