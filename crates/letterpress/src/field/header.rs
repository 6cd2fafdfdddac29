//! Plain header conversions: text, date, priority, domain and identifier.

use super::{Field, Kind};
use crate::error::{Error, Result};
use crate::identity;
use crate::message::Message;
use crate::value::Value;
use chrono::{DateTime, FixedOffset};
use tracing::debug;

pub(super) fn to_native(field: &Field, raw: &str) -> Result<Option<Value>> {
    let value = match field.kind() {
        Kind::Date => parse_date(field, raw)?.map(Value::Date),
        Kind::Priority => parse_priority(field, raw)?.map(Value::Integer),
        Kind::Domain => Some(Value::Text(identity::domain_of(raw).to_string())),
        _ => Some(Value::Text(raw.to_string())),
    };
    Ok(value)
}

pub(super) fn to_foreign(field: &Field, value: Value) -> Result<Option<String>> {
    let foreign = match (field.kind(), value) {
        (Kind::Date, Value::Date(date)) => date.to_rfc2822(),
        (Kind::Date, Value::Text(text)) => match parse_date(field, &text)? {
            Some(date) => date.to_rfc2822(),
            None => return Ok(None),
        },
        (Kind::Priority, Value::Integer(n)) => n.to_string(),
        (Kind::Priority, Value::Text(text)) => match parse_priority(field, &text)? {
            Some(n) => n.to_string(),
            None => return Ok(None),
        },
        (Kind::Date | Kind::Priority, value) => return Err(field.mismatch(&value)),
        (_, Value::Bytes(bytes)) => String::from_utf8(bytes)
            .map_err(|e| Error::conversion(field.name(), "<bytes>", e.to_string()))?,
        (_, value) => value.to_string(),
    };

    if foreign.contains(['\r', '\n']) {
        return Err(Error::conversion(
            field.name(),
            foreign,
            "header values cannot contain line breaks",
        ));
    }
    Ok(Some(foreign))
}

/// Sets the addressing-domain override and signals the message that the
/// domain changed.
pub(super) fn write_domain(field: &Field, message: &mut Message, value: Option<Value>) -> Result<()> {
    let domain = field
        .to_foreign(value)?
        .map(|d| d.trim().to_string())
        .filter(|d| !d.is_empty());
    debug!(domain = ?domain, "Addressing domain changed");
    message.set_domain_override(domain);
    message.domain_changed()
}

fn parse_date(field: &Field, raw: &str) -> Result<Option<DateTime<FixedOffset>>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    DateTime::parse_from_rfc2822(raw)
        .map(Some)
        .map_err(|e| Error::conversion(field.name(), raw, e.to_string()))
}

fn parse_priority(field: &Field, raw: &str) -> Result<Option<i64>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    raw.parse()
        .map(Some)
        .map_err(|e: std::num::ParseIntError| Error::conversion(field.name(), raw, e.to_string()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn date_field() -> Field {
        Field::header("date", "Date", Kind::Date)
    }

    fn priority_field() -> Field {
        Field::header("priority", "X-Priority", Kind::Priority)
    }

    #[test]
    fn test_date_round_trip() {
        let field = date_field();
        let date = Utc.with_ymd_and_hms(2023, 11, 14, 22, 13, 20).unwrap();
        let foreign = field.to_foreign(Some(date.into())).unwrap().unwrap();
        assert_eq!(foreign, "Tue, 14 Nov 2023 22:13:20 +0000");
        assert_eq!(
            field.to_native(&foreign).unwrap(),
            Some(Value::Date(date.fixed_offset()))
        );
    }

    #[test]
    fn test_date_empty_and_malformed() {
        let field = date_field();
        assert_eq!(field.to_native("").unwrap(), None);
        assert_eq!(field.to_native("   ").unwrap(), None);
        assert!(matches!(
            field.to_native("yesterday"),
            Err(Error::Conversion { field: "date", .. })
        ));
        assert!(field.to_foreign(Some("not a date".into())).is_err());
        assert!(field.to_foreign(Some(5_i64.into())).is_err());
    }

    #[test]
    fn test_date_text_is_normalised() {
        let foreign = date_field()
            .to_foreign(Some("14 Nov 2023 22:13:20 +0100".into()))
            .unwrap();
        assert_eq!(foreign.as_deref(), Some("Tue, 14 Nov 2023 22:13:20 +0100"));
    }

    #[test]
    fn test_priority() {
        let field = priority_field();
        assert_eq!(field.to_native("3").unwrap(), Some(Value::Integer(3)));
        assert_eq!(field.to_native(" 1 ").unwrap(), Some(Value::Integer(1)));
        assert_eq!(field.to_native("").unwrap(), None);
        assert!(field.to_native("urgent").is_err());

        assert_eq!(
            field.to_foreign(Some(5_i64.into())).unwrap().as_deref(),
            Some("5")
        );
        assert_eq!(field.to_foreign(Some("2".into())).unwrap().as_deref(), Some("2"));
        assert!(field.to_foreign(Some("high".into())).is_err());
    }

    #[test]
    fn test_domain_from_message_id() {
        let field = Field::header("domain", "Message-Id", Kind::Domain);
        assert_eq!(
            field.to_native("<abc123@mail.example.com>").unwrap(),
            Some(Value::from("mail.example.com"))
        );
    }

    #[test]
    fn test_text_stringifies_and_rejects_line_breaks() {
        let field = Field::header("subject", "Subject", Kind::Text);
        assert_eq!(field.to_foreign(Some(42_i64.into())).unwrap().as_deref(), Some("42"));
        assert!(field.to_foreign(Some("evil\r\nBcc: x@example.com".into())).is_err());
        assert!(field.to_foreign(Some(vec![0xff_u8].into())).is_err());
    }
}
