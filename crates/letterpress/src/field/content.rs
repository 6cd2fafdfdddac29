//! Top-level content type and charset.

use super::{Field, Kind};
use crate::error::{Error, Result};
use crate::value::Value;
use letterpress_mime::ContentType;

/// Returns the declared `type/subtype`, if a Content-Type header exists.
pub(super) fn raw_mime(transport: &letterpress_mime::Message) -> Result<Option<String>> {
    if !transport.headers().contains("Content-Type") {
        return Ok(None);
    }
    Ok(Some(transport.content_type()?.mime_type()))
}

pub(super) fn to_foreign(field: &Field, value: Value) -> Result<Option<String>> {
    let Value::Text(text) = value else {
        return Err(field.mismatch(&value));
    };

    let text = text.trim();
    if text.is_empty() {
        return Ok(None);
    }

    match field.kind() {
        Kind::ContentMime => {
            let content_type = ContentType::parse(text)
                .map_err(|e| Error::conversion(field.name(), text, e.to_string()))?;
            Ok(Some(content_type.mime_type()))
        }
        _ if text.contains(|c: char| c.is_whitespace() || c == ';' || c == '"') => Err(
            Error::conversion(field.name(), text, "charset names are single tokens"),
        ),
        _ => Ok(Some(text.to_string())),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::field::Foreign;

    #[test]
    fn test_mime_normalised() {
        let field = Field::new("mime", Foreign::ContentType, Kind::ContentMime);
        assert_eq!(
            field.to_foreign(Some("Text/HTML".into())).unwrap().as_deref(),
            Some("text/html")
        );
        assert!(field.to_foreign(Some("nonsense".into())).is_err());
        assert_eq!(field.to_foreign(Some(" ".into())).unwrap(), None);
    }

    #[test]
    fn test_charset_is_a_token() {
        let field = Field::new("charset", Foreign::Charset, Kind::ContentEncoding);
        assert_eq!(
            field.to_foreign(Some("iso-8859-1".into())).unwrap().as_deref(),
            Some("iso-8859-1")
        );
        assert!(field.to_foreign(Some("utf-8; x=y".into())).is_err());
    }

    #[test]
    fn test_raw_mime() {
        let mut transport = letterpress_mime::Message::new();
        assert_eq!(raw_mime(&transport).unwrap(), None);
        transport
            .headers_mut()
            .set("Content-Type", "text/html; charset=utf-8");
        assert_eq!(raw_mime(&transport).unwrap().as_deref(), Some("text/html"));
    }
}
