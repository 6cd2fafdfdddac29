//! Text body fields.
//!
//! Each body field owns one text subtype. Writing one subtype never
//! disturbs the other: a second subtype turns the message into
//! multipart/alternative, and an existing part of the same subtype has its
//! payload replaced in place.

use super::{Field, Foreign};
use crate::error::Result;
use crate::message::Message;
use crate::value::Value;
use letterpress_mime::Content;
use tracing::debug;

const DEFAULT_CHARSET: &str = "utf-8";

fn sub_type(field: &Field) -> &'static str {
    match field.foreign() {
        Foreign::Body(sub_type) => sub_type,
        _ => "plain",
    }
}

pub(super) fn read(field: &Field, message: &Message) -> Result<Option<Value>> {
    let Some(part) = message.transport().body(sub_type(field))? else {
        return Ok(None);
    };
    let Some(payload) = &part.body else {
        return Ok(None);
    };

    Ok(Some(match part.body_text() {
        Ok(text) => Value::Text(text),
        Err(_) => Value::Bytes(payload.clone()),
    }))
}

pub(super) fn write(field: &Field, message: &mut Message, value: Option<Value>) -> Result<()> {
    let content = match value {
        None => return clear(field, message),
        Some(Value::Text(text)) => Content::Text(text),
        Some(Value::Bytes(bytes)) => Content::Bytes(bytes),
        Some(other) => return Err(field.mismatch(&other)),
    };

    let sub_type = sub_type(field);
    let transport = message.transport_mut();
    let charset = transport
        .charset()
        .unwrap_or_else(|| DEFAULT_CHARSET.to_string());

    let established = transport.is_multipart()?
        || transport.payload().is_some()
        || transport.content_type()?.is("text", sub_type);

    // With no content yet the body decides the top-level type, replacing
    // whatever mime was declared.
    if !established {
        debug!(sub_type, "Setting sole body payload");
        transport.set_type(&format!("text/{sub_type}"))?;
        transport.set_payload(content, &charset)?;
        return Ok(());
    }

    if transport.body(sub_type)?.is_some() {
        transport.set_body_payload(sub_type, content, &charset)?;
    } else {
        debug!(sub_type, "Adding alternative body part");
        transport.add_alternative(content, sub_type, &charset)?;
    }
    Ok(())
}

pub(super) fn clear(field: &Field, message: &mut Message) -> Result<()> {
    let sub_type = sub_type(field);
    if message.transport_mut().remove_body(sub_type)? {
        debug!(sub_type, "Removed body part");
    }
    Ok(())
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
    use crate::field::Kind;

    fn plain() -> Field {
        Field::new("plain", Foreign::Body("plain"), Kind::Body)
    }

    fn rich() -> Field {
        Field::new("rich", Foreign::Body("html"), Kind::Body)
    }

    fn blank() -> Message {
        Message::builder().brand(false).build().unwrap()
    }

    #[test]
    fn test_sole_payload() {
        let mut message = blank();
        plain().write(&mut message, Some("Hello".into())).unwrap();

        assert!(!message.transport().is_multipart().unwrap());
        assert_eq!(message.transport().payload(), Some(&b"Hello"[..]));
        assert_eq!(plain().read(&message).unwrap(), Some(Value::from("Hello")));
        assert_eq!(rich().read(&message).unwrap(), None);
    }

    #[test]
    fn test_rich_first_sets_subtype() {
        let mut message = blank();
        rich().write(&mut message, Some("<p>Hi</p>".into())).unwrap();
        assert!(message.transport().content_type().unwrap().is("text", "html"));
        assert_eq!(plain().read(&message).unwrap(), None);
        assert_eq!(rich().read(&message).unwrap(), Some(Value::from("<p>Hi</p>")));
    }

    #[test]
    fn test_second_subtype_becomes_alternative() {
        let mut message = blank();
        plain().write(&mut message, Some("Hello".into())).unwrap();
        rich().write(&mut message, Some("<b>Hello</b>".into())).unwrap();

        let content_type = message.transport().content_type().unwrap();
        assert!(content_type.is("multipart", "alternative"));
        assert_eq!(plain().read(&message).unwrap(), Some(Value::from("Hello")));
        assert_eq!(rich().read(&message).unwrap(), Some(Value::from("<b>Hello</b>")));
    }

    #[test]
    fn test_rewrite_replaces_in_place() {
        let mut message = blank();
        plain().write(&mut message, Some("one".into())).unwrap();
        rich().write(&mut message, Some("<i>one</i>".into())).unwrap();
        plain().write(&mut message, Some("two".into())).unwrap();

        assert_eq!(message.transport().root().parts.len(), 2);
        assert_eq!(plain().read(&message).unwrap(), Some(Value::from("two")));
        assert_eq!(rich().read(&message).unwrap(), Some(Value::from("<i>one</i>")));
    }

    #[test]
    fn test_clear_keeps_other_subtype() {
        let mut message = blank();
        plain().write(&mut message, Some("text".into())).unwrap();
        rich().write(&mut message, Some("<p>text</p>".into())).unwrap();

        plain().clear(&mut message).unwrap();
        assert_eq!(plain().read(&message).unwrap(), None);
        assert_eq!(rich().read(&message).unwrap(), Some(Value::from("<p>text</p>")));
        assert!(!message.transport().is_multipart().unwrap());

        rich().write(&mut message, None).unwrap();
        assert_eq!(rich().read(&message).unwrap(), None);
    }

    #[test]
    fn test_body_uses_declared_charset() {
        let mut message = blank();
        message.transport_mut().set_charset("iso-8859-1").unwrap();
        plain().write(&mut message, Some("héllo".into())).unwrap();

        assert_eq!(message.transport().payload(), Some(&b"h\xe9llo"[..]));
        assert_eq!(plain().read(&message).unwrap(), Some(Value::from("héllo")));
        assert!(plain().write(&mut message, Some("\u{2713}".into())).is_err());
    }

    #[test]
    fn test_first_body_overrides_declared_type() {
        let mut message = blank();
        message.transport_mut().set_type("text/html").unwrap();
        plain().write(&mut message, Some("Hello".into())).unwrap();

        assert!(message.transport().content_type().unwrap().is("text", "plain"));
        assert_eq!(rich().read(&message).unwrap(), None);
        assert_eq!(plain().read(&message).unwrap(), Some(Value::from("Hello")));
    }

    #[test]
    fn test_bytes_body() {
        let mut message = blank();
        plain()
            .write(&mut message, Some(vec![0xc3_u8, 0x28].into()))
            .unwrap();
        assert_eq!(
            plain().read(&message).unwrap(),
            Some(Value::Bytes(vec![0xc3, 0x28]))
        );
        assert!(plain().write(&mut message, Some(1_i64.into())).is_err());
    }
}
