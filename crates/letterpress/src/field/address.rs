//! Address conversions: single mailbox, mailbox list and envelope sender.

use super::{Field, Kind};
use crate::address::{self, Mailbox};
use crate::error::{Error, Result};
use crate::value::Value;

pub(super) fn to_native(field: &Field, raw: &str) -> Result<Option<Value>> {
    let mut list = Mailbox::parse_list(raw)?;
    let value = match (field.kind(), list.len()) {
        (_, 0) => None,
        (Kind::Addresses, _) => Some(Value::Mailboxes(list)),
        (_, 1) => Some(Value::Mailbox(list.remove(0))),
        // A single-valued header shared with a list field (From).
        _ => Some(Value::Mailboxes(list)),
    };
    Ok(value)
}

pub(super) fn to_foreign(field: &Field, value: Value) -> Result<Option<String>> {
    let mut list = match value {
        Value::Mailbox(mailbox) => vec![mailbox],
        Value::Mailboxes(list) => list,
        Value::Text(text) => Mailbox::parse_list(&text)?,
        other => return Err(field.mismatch(&other)),
    };

    if list.is_empty() {
        return Ok(None);
    }
    for mailbox in &list {
        mailbox.check().map_err(|_| {
            Error::conversion(
                field.name(),
                mailbox.name.clone().unwrap_or_default(),
                "display names cannot contain line breaks",
            )
        })?;
    }

    if field.kind() == Kind::Addresses {
        return Ok(Some(address::join(&list)));
    }

    // Address and envelope sender are single-valued.
    if list.len() > 1 {
        return Err(Error::Cardinality {
            field: field.name(),
            count: list.len(),
        });
    }
    Ok(list.pop().map(|mailbox| mailbox.to_string()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::similar_names)]
mod tests {
    use super::*;
    use crate::field::Foreign;

    #[test]
    fn test_address_single() {
        let field = Field::header("author", "From", Kind::Address);
        assert_eq!(
            field.to_foreign(Some("Alice <alice@example.com>".into())).unwrap().as_deref(),
            Some("Alice <alice@example.com>")
        );
        assert_eq!(
            field.to_native("Alice <alice@example.com>").unwrap(),
            Some(Value::Mailbox(
                Mailbox::with_name("Alice", "alice@example.com").unwrap()
            ))
        );
        assert!(field.to_foreign(Some("not-an-address".into())).is_err());
        assert!(field.to_foreign(Some(3_i64.into())).is_err());
    }

    #[test]
    fn test_address_reads_shared_list_header() {
        let field = Field::header("author", "From", Kind::Address);
        let value = field.to_native("a@example.com, b@example.com").unwrap().unwrap();
        assert_eq!(value.into_mailboxes().len(), 2);
        assert_eq!(field.to_native(" ").unwrap(), None);
    }

    #[test]
    fn test_addresses_keep_duplicates_in_order() {
        let field = Field::header("to", "To", Kind::Addresses);
        let foreign = field
            .to_foreign(Some("b@example.com, a@example.com, b@example.com".into()))
            .unwrap()
            .unwrap();
        assert_eq!(foreign, "b@example.com, a@example.com, b@example.com");

        let list = field.to_native(&foreign).unwrap().unwrap().into_mailboxes();
        assert_eq!(list.len(), 3);
        assert_eq!(list[0], list[2]);
    }

    #[test]
    fn test_empty_list_converts_to_nothing() {
        let field = Field::header("cc", "Cc", Kind::Addresses);
        assert_eq!(field.to_foreign(Some(Vec::<Mailbox>::new().into())).unwrap(), None);
        assert_eq!(field.to_foreign(Some("".into())).unwrap(), None);
    }

    #[test]
    fn test_line_breaks_in_names_rejected() {
        let field = Field::header("reply", "Reply-To", Kind::Addresses);
        let text = "Evil\r\nBcc: victim@example.org <a@example.com>";
        assert!(field.to_foreign(Some(text.into())).is_err());

        let mut mailbox = Mailbox::new("a@example.com").unwrap();
        mailbox.name = Some("Evil\r\nX-Injected: yes".into());
        assert!(matches!(
            field.to_foreign(Some(Value::Mailbox(mailbox.clone()))),
            Err(Error::Conversion { field: "reply", .. })
        ));

        let author = Field::header("author", "From", Kind::Address);
        assert!(author.to_foreign(Some(vec![mailbox].into())).is_err());
    }

    #[test]
    fn test_sender_rejects_lists() {
        let field = Field::new("sender", Foreign::EnvelopeSender, Kind::Sender);
        let list = vec![
            Mailbox::new("a@example.com").unwrap(),
            Mailbox::new("b@example.com").unwrap(),
        ];
        assert!(matches!(
            field.to_foreign(Some(list.into())),
            Err(Error::Cardinality { field: "sender", count: 2 })
        ));
        assert!(matches!(
            field.to_foreign(Some("a@example.com, b@example.com".into())),
            Err(Error::Cardinality { count: 2, .. })
        ));

        let one = vec![Mailbox::new("a@example.com").unwrap()];
        assert_eq!(
            field.to_foreign(Some(one.into())).unwrap().as_deref(),
            Some("a@example.com")
        );
    }
}
