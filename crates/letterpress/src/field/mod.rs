//! Field descriptors.
//!
//! A [`Field`] binds a native attribute of a [`Message`] to one foreign
//! location in the transport message: a named header, the envelope sender,
//! the top-level content type or charset, or a text body part. Fields hold
//! no values. The transport message is the single source of truth, and
//! every read or write converts between the two representations.
//!
//! Conversion is selected by the field's [`Kind`]:
//!
//! | Kind              | Native                 | Foreign                         |
//! |-------------------|------------------------|---------------------------------|
//! | `Text`            | text                   | header value                    |
//! | `Date`            | date                   | RFC 5322 date                   |
//! | `Priority`        | integer                | decimal string                  |
//! | `Domain`          | text                   | domain of the Message-Id        |
//! | `Id`              | text                   | `<unique@domain>`               |
//! | `Address`         | mailbox                | single address header           |
//! | `Addresses`       | mailbox list           | comma separated address header  |
//! | `Sender`          | mailbox                | envelope sender                 |
//! | `ContentMime`     | `type/subtype`         | Content-Type                    |
//! | `ContentEncoding` | charset name           | Content-Type charset parameter  |
//! | `Body`            | text or bytes          | text body part of one subtype   |

mod address;
mod body;
mod content;
mod header;

use crate::error::{Error, Result};
use crate::message::Message;
use crate::value::Value;
use tracing::trace;

/// Where a field's value lives in the transport message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Foreign {
    /// A named header.
    Header(&'static str),
    /// The envelope sender, outside the header namespace.
    EnvelopeSender,
    /// The top-level `type/subtype`.
    ContentType,
    /// The top-level charset parameter.
    Charset,
    /// The text body part of the given subtype.
    Body(&'static str),
}

impl Foreign {
    /// Returns the header this maps to, if any.
    #[must_use]
    pub const fn header(self) -> Option<&'static str> {
        match self {
            Self::Header(name) => Some(name),
            Self::ContentType | Self::Charset => Some("Content-Type"),
            Self::EnvelopeSender | Self::Body(_) => None,
        }
    }
}

/// Conversion behaviour of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    /// Plain header text.
    Text,
    /// Date and time.
    Date,
    /// Integer priority.
    Priority,
    /// Addressing domain; writing it invalidates the identifier.
    Domain,
    /// Message identifier, regenerated when the domain changes.
    Id,
    /// Single mailbox header.
    Address,
    /// Mailbox list header.
    Addresses,
    /// Envelope sender (single mailbox).
    Sender,
    /// Top-level MIME type.
    ContentMime,
    /// Top-level charset.
    ContentEncoding,
    /// Text body of one subtype.
    Body,
}

impl Kind {
    /// Returns true for kinds whose value depends on the addressing domain.
    #[must_use]
    pub const fn tracks_domain(self) -> bool {
        matches!(self, Self::Id)
    }
}

/// Default policy of a field.
#[derive(Debug, Clone, Copy)]
pub enum DefaultValue {
    /// No default: reading an absent field fails, clearing removes it.
    None,
    /// A constant text value.
    Fixed(&'static str),
    /// A value computed from the message at the time it is needed.
    Computed(fn(&Message) -> Value),
}

/// Field descriptor.
#[derive(Debug, Clone)]
pub struct Field {
    name: &'static str,
    index: usize,
    foreign: Foreign,
    kind: Kind,
    default: DefaultValue,
    reset: bool,
}

impl Field {
    /// Creates a field with no default that replaces existing values.
    ///
    /// The index is assigned when the field is added to a
    /// [`FieldSet`](crate::FieldSet).
    #[must_use]
    pub const fn new(name: &'static str, foreign: Foreign, kind: Kind) -> Self {
        Self {
            name,
            index: 0,
            foreign,
            kind,
            default: DefaultValue::None,
            reset: true,
        }
    }

    /// Creates a field mapped to a named header.
    #[must_use]
    pub const fn header(name: &'static str, header: &'static str, kind: Kind) -> Self {
        Self::new(name, Foreign::Header(header), kind)
    }

    /// Sets the default policy.
    #[must_use]
    pub const fn with_default(mut self, default: DefaultValue) -> Self {
        self.default = default;
        self
    }

    /// Makes writes append a new header instance instead of replacing.
    #[must_use]
    pub const fn appending(mut self) -> Self {
        self.reset = false;
        self
    }

    pub(crate) const fn with_index(mut self, index: usize) -> Self {
        self.index = index;
        self
    }

    /// Attribute name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Declaration index.
    #[must_use]
    pub const fn index(&self) -> usize {
        self.index
    }

    /// Foreign location.
    #[must_use]
    pub const fn foreign(&self) -> Foreign {
        self.foreign
    }

    /// Conversion kind.
    #[must_use]
    pub const fn kind(&self) -> Kind {
        self.kind
    }

    /// Default policy.
    #[must_use]
    pub const fn default_value(&self) -> DefaultValue {
        self.default
    }

    /// Whether writes replace an existing header instance.
    #[must_use]
    pub const fn resets(&self) -> bool {
        self.reset
    }

    /// Reads the native value.
    ///
    /// An absent value resolves to the default without storing it. `None`
    /// means the stored value converts to nothing (an empty date or
    /// priority, or no body of this subtype).
    ///
    /// # Errors
    ///
    /// Returns [`Error::Unset`] if the value is absent and there is no
    /// default, or a conversion error if the stored value is malformed.
    pub fn read(&self, message: &Message) -> Result<Option<Value>> {
        match self.kind {
            Kind::Domain => {
                if let Some(domain) = message.domain_override() {
                    return Ok(Some(Value::Text(domain.to_string())));
                }
            }
            Kind::Body => return body::read(self, message),
            _ => {}
        }

        match self.raw(message)? {
            Some(raw) => self.to_native(&raw),
            None => self
                .materialize_default(message)
                .map(Some)
                .ok_or(Error::Unset { field: self.name }),
        }
    }

    /// Writes a native value.
    ///
    /// A value that converts to nothing (including `None`) falls back to the
    /// default, or removes the foreign value if there is no default.
    ///
    /// # Errors
    ///
    /// Returns an error if the value cannot be converted for this field.
    pub fn write(&self, message: &mut Message, value: Option<Value>) -> Result<()> {
        trace!(field = self.name, "Writing field");
        match self.kind {
            Kind::Domain => return header::write_domain(self, message, value),
            Kind::Body => return body::write(self, message, value),
            _ => {}
        }

        let foreign = match self.to_foreign(value)? {
            Some(foreign) => Some(foreign),
            None => match self.materialize_default(message) {
                Some(default) => self.to_foreign(Some(default))?,
                None => None,
            },
        };

        match foreign {
            Some(foreign) => self.store(message, &foreign),
            None => self.remove(message),
        }
    }

    /// Removes the value, re-applying the default if there is one.
    ///
    /// # Errors
    ///
    /// Returns an error if the default cannot be stored.
    pub fn clear(&self, message: &mut Message) -> Result<()> {
        trace!(field = self.name, "Clearing field");
        match self.kind {
            Kind::Domain => return header::write_domain(self, message, None),
            Kind::Body => return body::clear(self, message),
            _ => {}
        }

        self.remove(message)?;
        match self.materialize_default(message) {
            Some(default) => self.write(message, Some(default)),
            None => Ok(()),
        }
    }

    /// Seeds the default at construction time.
    ///
    /// # Errors
    ///
    /// Returns an error if the default cannot be stored.
    pub fn prepare(&self, message: &mut Message) -> Result<()> {
        match self.materialize_default(message) {
            Some(default) => self.write(message, Some(default)),
            None => Ok(()),
        }
    }

    /// Converts a foreign value into its native form.
    ///
    /// # Errors
    ///
    /// Returns a conversion error if `raw` is malformed for this kind.
    pub fn to_native(&self, raw: &str) -> Result<Option<Value>> {
        match self.kind {
            Kind::Text | Kind::Id | Kind::Domain | Kind::Date | Kind::Priority => {
                header::to_native(self, raw)
            }
            Kind::Address | Kind::Addresses | Kind::Sender => address::to_native(self, raw),
            Kind::ContentMime | Kind::ContentEncoding | Kind::Body => {
                Ok(Some(Value::Text(raw.to_string())))
            }
        }
    }

    /// Converts a native value into its foreign form.
    ///
    /// `None` in means `None` out. Empty address lists also convert to
    /// `None`.
    ///
    /// # Errors
    ///
    /// Returns a conversion error if the value does not fit this kind.
    pub fn to_foreign(&self, value: Option<Value>) -> Result<Option<String>> {
        let Some(value) = value else {
            return Ok(None);
        };

        match self.kind {
            Kind::Text | Kind::Id | Kind::Domain | Kind::Date | Kind::Priority => {
                header::to_foreign(self, value)
            }
            Kind::Address | Kind::Addresses | Kind::Sender => address::to_foreign(self, value),
            Kind::ContentMime | Kind::ContentEncoding => content::to_foreign(self, value),
            Kind::Body => Err(self.mismatch(&value)),
        }
    }

    fn materialize_default(&self, message: &Message) -> Option<Value> {
        match self.default {
            DefaultValue::None => None,
            DefaultValue::Fixed(text) => Some(Value::Text(text.to_string())),
            DefaultValue::Computed(compute) => Some(compute(message)),
        }
    }

    /// Fetches the stored foreign value.
    fn raw(&self, message: &Message) -> Result<Option<String>> {
        let transport = message.transport();
        match self.foreign {
            Foreign::Header(name) if self.kind == Kind::Addresses => {
                let values = transport.headers().get_all(name);
                Ok((!values.is_empty()).then(|| values.join(", ")))
            }
            Foreign::Header(name) => Ok(transport.headers().get(name).map(str::to_string)),
            Foreign::EnvelopeSender => Ok(transport.unixfrom().map(str::to_string)),
            Foreign::ContentType => content::raw_mime(transport),
            Foreign::Charset => Ok(transport.charset()),
            Foreign::Body(_) => Ok(None),
        }
    }

    fn store(&self, message: &mut Message, foreign: &str) -> Result<()> {
        let transport = message.transport_mut();
        match self.foreign {
            Foreign::Header(name) if self.reset => transport.headers_mut().set(name, foreign),
            Foreign::Header(name) => transport.headers_mut().add(name, foreign),
            Foreign::EnvelopeSender => transport.set_unixfrom(Some(foreign.to_string())),
            Foreign::ContentType => transport.set_type(foreign)?,
            Foreign::Charset => transport.set_charset(foreign)?,
            Foreign::Body(_) => return Err(Error::conversion(self.name, foreign, "not a header")),
        }
        Ok(())
    }

    fn remove(&self, message: &mut Message) -> Result<()> {
        let transport = message.transport_mut();
        match self.foreign {
            Foreign::Header(name) => {
                transport.headers_mut().remove(name);
            }
            Foreign::EnvelopeSender => transport.set_unixfrom(None),
            Foreign::ContentType => {
                transport.headers_mut().remove("Content-Type");
            }
            Foreign::Charset => transport.remove_charset()?,
            Foreign::Body(sub_type) => {
                transport.remove_body(sub_type)?;
            }
        }
        Ok(())
    }

    fn mismatch(&self, value: &Value) -> Error {
        Error::conversion(
            self.name,
            value.to_string(),
            format!("a {} value does not fit this field", value.kind()),
        )
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
    use crate::address::Mailbox;

    fn blank() -> Message {
        Message::builder().brand(false).build().unwrap()
    }

    #[test]
    fn test_read_unset_without_default() {
        let message = blank();
        let field = Field::header("keywords", "Keywords", Kind::Text);
        assert!(field.read(&message).unwrap_err().is_unset());
    }

    #[test]
    fn test_read_default_does_not_store() {
        let message = blank();
        let field = Field::header("language", "Content-Language", Kind::Text)
            .with_default(DefaultValue::Fixed("en"));

        assert_eq!(field.read(&message).unwrap(), Some(Value::from("en")));
        assert!(!message.headers().contains("Content-Language"));
    }

    #[test]
    fn test_write_none_removes_or_defaults() {
        let mut message = blank();
        let plain = Field::header("keywords", "Keywords", Kind::Text);
        plain.write(&mut message, Some("a, b".into())).unwrap();
        assert_eq!(message.headers().get("Keywords"), Some("a, b"));
        plain.write(&mut message, None).unwrap();
        assert!(!message.headers().contains("Keywords"));

        let defaulted = Field::header("language", "Content-Language", Kind::Text)
            .with_default(DefaultValue::Fixed("en"));
        defaulted.write(&mut message, Some("fr".into())).unwrap();
        defaulted.write(&mut message, None).unwrap();
        assert_eq!(message.headers().get("Content-Language"), Some("en"));
    }

    #[test]
    fn test_reset_replaces_and_appending_duplicates() {
        let mut message = blank();
        let replacing = Field::header("keywords", "Keywords", Kind::Text);
        replacing.write(&mut message, Some("one".into())).unwrap();
        replacing.write(&mut message, Some("two".into())).unwrap();
        assert_eq!(message.headers().get_all("Keywords"), vec!["two"]);

        assert!(replacing.resets());
        let appending = Field::header("comments", "Comments", Kind::Text).appending();
        assert!(!appending.resets());
        appending.write(&mut message, Some("one".into())).unwrap();
        appending.write(&mut message, Some("two".into())).unwrap();
        assert_eq!(message.headers().get_all("Comments"), vec!["one", "two"]);
    }

    #[test]
    fn test_appending_addresses_accumulate() {
        let mut message = blank();
        let field = Field::header("resent", "Resent-To", Kind::Addresses).appending();
        field.write(&mut message, Some("a@example.com".into())).unwrap();
        field
            .write(&mut message, Some("b@example.com, a@example.com".into()))
            .unwrap();

        let list = field.read(&message).unwrap().unwrap().into_mailboxes();
        let addresses: Vec<&str> = list.iter().map(Mailbox::address).collect();
        assert_eq!(addresses, vec!["a@example.com", "b@example.com", "a@example.com"]);
    }

    #[test]
    fn test_clear_reapplies_default() {
        let mut message = blank();
        let field = Field::header("language", "Content-Language", Kind::Text)
            .with_default(DefaultValue::Fixed("en"));
        field.write(&mut message, Some("de".into())).unwrap();
        field.clear(&mut message).unwrap();
        assert_eq!(message.headers().get("Content-Language"), Some("en"));

        let bare = Field::header("keywords", "Keywords", Kind::Text);
        bare.write(&mut message, Some("x".into())).unwrap();
        bare.clear(&mut message).unwrap();
        assert!(!message.headers().contains("Keywords"));
    }

    #[test]
    fn test_prepare_seeds_only_with_default() {
        let mut message = blank();
        let keywords = Field::header("keywords", "Keywords", Kind::Text);
        assert!(matches!(keywords.default_value(), DefaultValue::None));
        keywords.prepare(&mut message).unwrap();
        assert!(!message.headers().contains("Keywords"));

        Field::header("language", "Content-Language", Kind::Text)
            .with_default(DefaultValue::Computed(|_| Value::from("computed")))
            .prepare(&mut message)
            .unwrap();
        assert_eq!(message.headers().get("Content-Language"), Some("computed"));
    }

    #[test]
    fn test_body_field_rejects_header_conversion() {
        let field = Field::new("plain", Foreign::Body("plain"), Kind::Body);
        assert!(field.to_foreign(Some("x".into())).is_err());
        assert_eq!(field.to_foreign(None).unwrap(), None);
    }

    #[test]
    fn test_foreign_header() {
        assert_eq!(Foreign::Header("To").header(), Some("To"));
        assert_eq!(Foreign::Charset.header(), Some("Content-Type"));
        assert_eq!(Foreign::EnvelopeSender.header(), None);
        assert!(Kind::Id.tracks_domain());
        assert!(!Kind::Domain.tracks_domain());
    }
}
