//! Ordered field registry.
//!
//! A [`FieldSet`] is built once per message definition. Declaration order
//! assigns each field its index, and that order drives both construction
//! defaults and positional argument binding. Aliases resolve to a declared
//! field but take no position.

use crate::field::{DefaultValue, Field, Foreign, Kind};
use crate::identity;
use crate::message::Message;
use crate::value::Value;
use std::sync::LazyLock;

/// An ordered, read-only set of fields.
#[derive(Debug, Clone, Default)]
pub struct FieldSet {
    fields: Vec<Field>,
    aliases: Vec<(&'static str, &'static str)>,
}

impl FieldSet {
    /// Creates a builder.
    #[must_use]
    pub fn builder() -> FieldSetBuilder {
        FieldSetBuilder::default()
    }

    /// Looks up a field by name or alias.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Field> {
        let name = self
            .aliases
            .iter()
            .find_map(|(alias, target)| (*alias == name).then_some(*target))
            .unwrap_or(name);
        self.fields.iter().find(|field| field.name() == name)
    }

    /// Returns true if `name` is a declared field (not an alias).
    #[must_use]
    pub fn is_declared(&self, name: &str) -> bool {
        self.fields.iter().any(|field| field.name() == name)
    }

    /// Iterates over fields in ascending index order.
    pub fn iter(&self) -> impl Iterator<Item = &Field> {
        self.fields.iter()
    }

    /// Iterates over field names in ascending index order.
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.fields.iter().map(Field::name)
    }

    /// Returns the number of declared fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns true if no fields are declared.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<'a> IntoIterator for &'a FieldSet {
    type Item = &'a Field;
    type IntoIter = std::slice::Iter<'a, Field>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.iter()
    }
}

/// Builder for [`FieldSet`].
#[derive(Debug, Clone, Default)]
pub struct FieldSetBuilder {
    fields: Vec<Field>,
    aliases: Vec<(&'static str, &'static str)>,
    next_index: usize,
}

impl FieldSetBuilder {
    /// Declares a field, assigning it the next index.
    ///
    /// Declaring a name again replaces the earlier declaration, and the
    /// field moves to the new position.
    #[must_use]
    pub fn field(mut self, field: Field) -> Self {
        self.fields.retain(|existing| existing.name() != field.name());
        self.fields.push(field.with_index(self.next_index));
        self.next_index += 1;
        self
    }

    /// Adds a keyword-only alternate name for a declared field.
    #[must_use]
    pub fn alias(mut self, alias: &'static str, target: &'static str) -> Self {
        self.aliases.retain(|(existing, _)| *existing != alias);
        self.aliases.push((alias, target));
        self
    }

    /// Builds the field set.
    ///
    /// Aliases whose target was never declared are dropped.
    #[must_use]
    pub fn build(self) -> FieldSet {
        let Self {
            fields, mut aliases, ..
        } = self;
        aliases.retain(|(alias, target)| {
            let known = fields.iter().any(|field| field.name() == *target);
            if !known {
                tracing::warn!(alias, target, "Dropping alias to undeclared field");
            }
            known
        });
        FieldSet { fields, aliases }
    }
}

fn new_message_id(message: &Message) -> Value {
    Value::Text(identity::message_id(&message.effective_domain()))
}

fn now(message: &Message) -> Value {
    Value::from(message.clock().now())
}

static MESSAGE_FIELDS: LazyLock<FieldSet> = LazyLock::new(|| {
    FieldSet::builder()
        .field(Field::header("author", "From", Kind::Address))
        .field(Field::header("to", "To", Kind::Addresses))
        .field(Field::header("subject", "Subject", Kind::Text))
        .field(Field::header("cc", "Cc", Kind::Addresses))
        .field(Field::header("bcc", "Bcc", Kind::Addresses))
        .field(Field::header("reply", "Reply-To", Kind::Address))
        .field(Field::header("notify", "Disposition-Notification-To", Kind::Addresses))
        .field(Field::new("sender", Foreign::EnvelopeSender, Kind::Sender))
        .field(Field::header("organization", "Organization", Kind::Text))
        .alias("organisation", "organization")
        .field(Field::header("priority", "X-Priority", Kind::Priority))
        .field(
            Field::new("mime", Foreign::ContentType, Kind::ContentMime)
                .with_default(DefaultValue::Fixed("text/plain")),
        )
        .field(
            Field::new("charset", Foreign::Charset, Kind::ContentEncoding)
                .with_default(DefaultValue::Fixed("utf-8")),
        )
        .field(
            Field::header("encoding", "Content-Transfer-Encoding", Kind::Text)
                .with_default(DefaultValue::Fixed("quoted-printable")),
        )
        .field(Field::new("plain", Foreign::Body("plain"), Kind::Body))
        .field(Field::new("rich", Foreign::Body("html"), Kind::Body))
        .field(Field::header("domain", "Message-Id", Kind::Domain))
        .field(
            Field::header("id", "Message-Id", Kind::Id)
                .with_default(DefaultValue::Computed(new_message_id)),
        )
        .field(Field::header("date", "Date", Kind::Date).with_default(DefaultValue::Computed(now)))
        .field(Field::header("authors", "From", Kind::Addresses))
        .build()
});

/// Returns the field set of [`Message`].
#[must_use]
pub fn message_fields() -> &'static FieldSet {
    &MESSAGE_FIELDS
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
    fn test_declaration_order() {
        let names: Vec<&str> = message_fields().names().collect();
        assert_eq!(
            names,
            vec![
                "author",
                "to",
                "subject",
                "cc",
                "bcc",
                "reply",
                "notify",
                "sender",
                "organization",
                "priority",
                "mime",
                "charset",
                "encoding",
                "plain",
                "rich",
                "domain",
                "id",
                "date",
                "authors",
            ]
        );
    }

    #[test]
    fn test_indices_strictly_increase() {
        let indices: Vec<usize> = message_fields().iter().map(Field::index).collect();
        assert!(indices.windows(2).all(|pair| pair[0] < pair[1]));
    }

    #[test]
    fn test_alias_resolves_but_takes_no_position() {
        let fields = message_fields();
        assert_eq!(fields.get("organisation").unwrap().name(), "organization");
        assert!(!fields.is_declared("organisation"));
        assert!(fields.names().all(|name| name != "organisation"));
        assert!(fields.get("nonexistent").is_none());
    }

    #[test]
    fn test_redeclaring_moves_field() {
        let fields = FieldSet::builder()
            .field(Field::header("a", "A", Kind::Text))
            .field(Field::header("b", "B", Kind::Text))
            .field(Field::header("a", "X-A", Kind::Text))
            .build();

        let names: Vec<&str> = fields.names().collect();
        assert_eq!(names, vec!["b", "a"]);
        assert_eq!(fields.get("a").unwrap().foreign(), Foreign::Header("X-A"));
        assert!(fields.get("b").unwrap().index() < fields.get("a").unwrap().index());
    }

    #[test]
    fn test_dangling_alias_dropped() {
        let fields = FieldSet::builder()
            .field(Field::header("a", "A", Kind::Text))
            .alias("b", "missing")
            .build();
        assert!(fields.get("b").is_none());
        assert_eq!(fields.len(), 1);
    }

    #[test]
    fn test_separate_sets_do_not_share_indices() {
        let first = FieldSet::builder()
            .field(Field::header("x", "X", Kind::Text))
            .build();
        let second = FieldSet::builder()
            .field(Field::header("y", "Y", Kind::Text))
            .build();
        assert_eq!(first.get("x").unwrap().index(), 0);
        assert_eq!(second.get("y").unwrap().index(), 0);
    }
}
