//! The message aggregate.

use crate::address::Mailbox;
use crate::builder::MessageBuilder;
use crate::error::{Error, Result, ValidationError};
use crate::field::Field;
use crate::identity;
use crate::mailer::Deliver;
use crate::options::Clock;
use crate::registry::message_fields;
use crate::value::Value;
use chrono::{DateTime, FixedOffset};
use letterpress_mime::{Content, ContentType, Headers, Part};
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, warn};

/// An email message built from typed fields.
///
/// Field values are never cached here: every accessor converts to or from
/// the owned transport message.
#[derive(Clone)]
pub struct Message {
    transport: letterpress_mime::Message,
    mailer: Option<Arc<dyn Deliver>>,
    domain: Option<String>,
    clock: Arc<dyn Clock>,
}

impl Message {
    /// Creates a message builder.
    #[must_use]
    pub fn builder() -> MessageBuilder {
        MessageBuilder::new()
    }

    /// Creates a branded message with every default applied.
    ///
    /// # Errors
    ///
    /// Returns an error if a default cannot be stored.
    pub fn new() -> Result<Self> {
        MessageBuilder::new().build()
    }

    pub(crate) fn blank(
        mailer: Option<Arc<dyn Deliver>>,
        domain: Option<String>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            transport: letterpress_mime::Message::new(),
            mailer,
            domain,
            clock,
        }
    }

    fn field(name: &str) -> Result<&'static Field> {
        message_fields()
            .get(name)
            .ok_or_else(|| Error::UnknownField(name.to_string()))
    }

    /// Reads a field by name or alias.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownField`] for undeclared names, [`Error::Unset`]
    /// if the field has no value and no default, or a conversion error.
    pub fn get(&self, name: &str) -> Result<Option<Value>> {
        Self::field(name)?.read(self)
    }

    /// Writes a field by name or alias.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownField`] for undeclared names or a conversion
    /// error.
    pub fn set(&mut self, name: &str, value: impl Into<Value>) -> Result<()> {
        Self::field(name)?.write(self, Some(value.into()))
    }

    /// Clears a field by name or alias, re-applying its default.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownField`] for undeclared names.
    pub fn clear(&mut self, name: &str) -> Result<()> {
        Self::field(name)?.clear(self)
    }

    /// Reads a field, treating "not set" as `None`.
    fn lookup(&self, name: &str) -> Result<Option<Value>> {
        match self.get(name) {
            Err(e) if e.is_unset() => Ok(None),
            other => other,
        }
    }

    fn lookup_text(&self, name: &str) -> Result<Option<String>> {
        Ok(self.lookup(name)?.map(|value| match value {
            Value::Text(text) => text,
            other => other.to_string(),
        }))
    }

    fn lookup_mailbox(&self, name: &str) -> Result<Option<Mailbox>> {
        Ok(self
            .lookup(name)?
            .and_then(|value| value.into_mailboxes().into_iter().next()))
    }

    fn lookup_mailboxes(&self, name: &str) -> Result<Vec<Mailbox>> {
        Ok(self
            .lookup(name)?
            .map(Value::into_mailboxes)
            .unwrap_or_default())
    }

    // Addressing

    /// Returns the author (From).
    ///
    /// # Errors
    ///
    /// Returns an error if the From header is malformed.
    pub fn author(&self) -> Result<Option<Mailbox>> {
        self.lookup_mailbox("author")
    }

    /// Sets the author (From) to a single mailbox.
    ///
    /// # Errors
    ///
    /// Returns an error if the value is not exactly one valid mailbox.
    pub fn set_author(&mut self, author: impl Into<Value>) -> Result<()> {
        self.set("author", author)
    }

    /// Returns every From mailbox.
    ///
    /// # Errors
    ///
    /// Returns an error if the From header is malformed.
    pub fn authors(&self) -> Result<Vec<Mailbox>> {
        self.lookup_mailboxes("authors")
    }

    /// Sets several From mailboxes.
    ///
    /// # Errors
    ///
    /// Returns an error if an address is invalid.
    pub fn set_authors(&mut self, authors: impl Into<Value>) -> Result<()> {
        self.set("authors", authors)
    }

    /// Returns the To recipients.
    ///
    /// # Errors
    ///
    /// Returns an error if the To header is malformed.
    pub fn to(&self) -> Result<Vec<Mailbox>> {
        self.lookup_mailboxes("to")
    }

    /// Sets the To recipients.
    ///
    /// # Errors
    ///
    /// Returns an error if an address is invalid.
    pub fn set_to(&mut self, to: impl Into<Value>) -> Result<()> {
        self.set("to", to)
    }

    /// Returns the Cc recipients.
    ///
    /// # Errors
    ///
    /// Returns an error if the Cc header is malformed.
    pub fn cc(&self) -> Result<Vec<Mailbox>> {
        self.lookup_mailboxes("cc")
    }

    /// Sets the Cc recipients.
    ///
    /// # Errors
    ///
    /// Returns an error if an address is invalid.
    pub fn set_cc(&mut self, cc: impl Into<Value>) -> Result<()> {
        self.set("cc", cc)
    }

    /// Returns the Bcc recipients.
    ///
    /// # Errors
    ///
    /// Returns an error if the Bcc header is malformed.
    pub fn bcc(&self) -> Result<Vec<Mailbox>> {
        self.lookup_mailboxes("bcc")
    }

    /// Sets the Bcc recipients.
    ///
    /// # Errors
    ///
    /// Returns an error if an address is invalid.
    pub fn set_bcc(&mut self, bcc: impl Into<Value>) -> Result<()> {
        self.set("bcc", bcc)
    }

    /// Returns the Reply-To mailbox.
    ///
    /// # Errors
    ///
    /// Returns an error if the header is malformed.
    pub fn reply(&self) -> Result<Option<Mailbox>> {
        self.lookup_mailbox("reply")
    }

    /// Sets the Reply-To mailbox.
    ///
    /// # Errors
    ///
    /// Returns an error if the value is not exactly one valid mailbox.
    pub fn set_reply(&mut self, reply: impl Into<Value>) -> Result<()> {
        self.set("reply", reply)
    }

    /// Returns the read-receipt (Disposition-Notification-To) mailboxes.
    ///
    /// # Errors
    ///
    /// Returns an error if the header is malformed.
    pub fn notify(&self) -> Result<Vec<Mailbox>> {
        self.lookup_mailboxes("notify")
    }

    /// Requests read receipts to the given mailboxes.
    ///
    /// # Errors
    ///
    /// Returns an error if an address is invalid.
    pub fn set_notify(&mut self, notify: impl Into<Value>) -> Result<()> {
        self.set("notify", notify)
    }

    /// Returns the envelope sender, if one was set explicitly.
    ///
    /// # Errors
    ///
    /// Returns an error if the stored sender is malformed.
    pub fn sender(&self) -> Result<Option<Mailbox>> {
        self.lookup_mailbox("sender")
    }

    /// Sets the envelope sender.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Cardinality`] if given more than one mailbox.
    pub fn set_sender(&mut self, sender: impl Into<Value>) -> Result<()> {
        self.set("sender", sender)
    }

    // Metadata

    /// Returns the subject.
    ///
    /// # Errors
    ///
    /// Never fails for messages built by this crate.
    pub fn subject(&self) -> Result<Option<String>> {
        self.lookup_text("subject")
    }

    /// Sets the subject.
    ///
    /// # Errors
    ///
    /// Returns an error if the subject contains line breaks.
    pub fn set_subject(&mut self, subject: impl Into<String>) -> Result<()> {
        self.set("subject", subject.into())
    }

    /// Returns the organization.
    ///
    /// # Errors
    ///
    /// Never fails for messages built by this crate.
    pub fn organization(&self) -> Result<Option<String>> {
        self.lookup_text("organization")
    }

    /// Sets the organization.
    ///
    /// # Errors
    ///
    /// Returns an error if the value contains line breaks.
    pub fn set_organization(&mut self, organization: impl Into<String>) -> Result<()> {
        self.set("organization", organization.into())
    }

    /// Returns the X-Priority value.
    ///
    /// # Errors
    ///
    /// Returns a conversion error if the header is not an integer.
    pub fn priority(&self) -> Result<Option<i64>> {
        Ok(self.lookup("priority")?.as_ref().and_then(Value::as_integer))
    }

    /// Sets the X-Priority value.
    ///
    /// # Errors
    ///
    /// Never fails for integer input.
    pub fn set_priority(&mut self, priority: i64) -> Result<()> {
        self.set("priority", priority)
    }

    /// Returns the Date header.
    ///
    /// # Errors
    ///
    /// Returns a conversion error if the header is not an RFC 5322 date.
    pub fn date(&self) -> Result<Option<DateTime<FixedOffset>>> {
        Ok(self.lookup("date")?.as_ref().and_then(Value::as_date).copied())
    }

    /// Sets the Date header.
    ///
    /// # Errors
    ///
    /// Returns a conversion error for text that is not an RFC 5322 date.
    pub fn set_date(&mut self, date: impl Into<Value>) -> Result<()> {
        self.set("date", date)
    }

    /// Returns the addressing domain.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Unset`] if there is neither an override nor a
    /// message identifier.
    pub fn domain(&self) -> Result<String> {
        Ok(self.lookup_text("domain")?.unwrap_or_default())
    }

    /// Sets the addressing domain and regenerates the message identifier.
    ///
    /// # Errors
    ///
    /// Returns an error if the identifier cannot be regenerated.
    pub fn set_domain(&mut self, domain: impl Into<String>) -> Result<()> {
        self.set("domain", domain.into())
    }

    /// Returns the Message-Id, generating one if needed.
    ///
    /// # Errors
    ///
    /// Never fails for messages built by this crate.
    pub fn id(&self) -> Result<String> {
        Ok(self.lookup_text("id")?.unwrap_or_default())
    }

    /// Sets the Message-Id.
    ///
    /// # Errors
    ///
    /// Returns an error if the identifier contains line breaks.
    pub fn set_id(&mut self, id: impl Into<String>) -> Result<()> {
        self.set("id", id.into())
    }

    // Content

    /// Returns the top-level `type/subtype`.
    ///
    /// # Errors
    ///
    /// Returns an error if the Content-Type header is malformed.
    pub fn mime(&self) -> Result<String> {
        Ok(self.lookup_text("mime")?.unwrap_or_default())
    }

    /// Sets the top-level `type/subtype`, keeping parameters.
    ///
    /// # Errors
    ///
    /// Returns an error if `mime` is not a valid type.
    pub fn set_mime(&mut self, mime: &str) -> Result<()> {
        self.set("mime", mime)
    }

    /// Returns the top-level charset.
    ///
    /// # Errors
    ///
    /// Never fails for messages built by this crate.
    pub fn charset(&self) -> Result<String> {
        Ok(self.lookup_text("charset")?.unwrap_or_default())
    }

    /// Sets the top-level charset.
    ///
    /// # Errors
    ///
    /// Returns an error if `charset` is not a single token, or a body
    /// already set cannot be encoded in it.
    pub fn set_charset(&mut self, charset: &str) -> Result<()> {
        self.set("charset", charset)
    }

    /// Returns the top-level Content-Transfer-Encoding.
    ///
    /// # Errors
    ///
    /// Never fails for messages built by this crate.
    pub fn encoding(&self) -> Result<String> {
        Ok(self.lookup_text("encoding")?.unwrap_or_default())
    }

    /// Sets the top-level Content-Transfer-Encoding.
    ///
    /// # Errors
    ///
    /// Returns an error if the value contains line breaks.
    pub fn set_encoding(&mut self, encoding: &str) -> Result<()> {
        self.set("encoding", encoding)
    }

    /// Returns the plain-text body.
    ///
    /// A payload that does not decode in its charset is read as lossy UTF-8.
    ///
    /// # Errors
    ///
    /// Returns an error if the MIME structure is malformed.
    pub fn plain(&self) -> Result<Option<String>> {
        self.lookup_text("plain")
    }

    /// Sets the plain-text body, keeping any rich-text alternative.
    ///
    /// # Errors
    ///
    /// Returns an error if the MIME structure is malformed or the text
    /// cannot be encoded in the message charset.
    pub fn set_plain(&mut self, plain: impl Into<Value>) -> Result<()> {
        self.set("plain", plain)
    }

    /// Returns the rich-text (HTML) body.
    ///
    /// A payload that does not decode in its charset is read as lossy UTF-8.
    ///
    /// # Errors
    ///
    /// Returns an error if the MIME structure is malformed.
    pub fn rich(&self) -> Result<Option<String>> {
        self.lookup_text("rich")
    }

    /// Sets the rich-text (HTML) body, keeping any plain-text alternative.
    ///
    /// # Errors
    ///
    /// Returns an error if the MIME structure is malformed.
    pub fn set_rich(&mut self, rich: impl Into<Value>) -> Result<()> {
        self.set("rich", rich)
    }

    // Aggregates

    /// Returns To, then Cc, then Bcc recipients, without deduplication.
    ///
    /// # Errors
    ///
    /// Returns an error if an address header is malformed.
    pub fn recipients(&self) -> Result<Vec<Mailbox>> {
        let mut recipients = self.to()?;
        recipients.extend(self.cc()?);
        recipients.extend(self.bcc()?);
        Ok(recipients)
    }

    /// Returns the envelope sender: the explicit sender, else the author.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Unset`] if neither is set.
    pub fn envelope(&self) -> Result<Mailbox> {
        if let Some(sender) = self.sender()? {
            return Ok(sender);
        }
        self.author()?.ok_or(Error::Unset { field: "author" })
    }

    /// Checks that the message can be sent.
    ///
    /// Every missing piece is reported, in the order author, subject,
    /// recipients, body.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Invalid`] listing what is missing, or an error if a
    /// header is malformed.
    pub fn validate(&self) -> Result<()> {
        let mut errors = Vec::new();

        if self.author()?.is_none() {
            errors.push(ValidationError::MissingAuthor);
        }
        if self.subject()?.is_none_or(|subject| subject.trim().is_empty()) {
            errors.push(ValidationError::MissingSubject);
        }
        if self.recipients()?.is_empty() {
            errors.push(ValidationError::MissingRecipients);
        }
        if !self.has_body("plain")? && !self.has_body("html")? {
            errors.push(ValidationError::MissingBody);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            warn!(errors = ?errors, "Message validation failed");
            Err(Error::Invalid(errors))
        }
    }

    fn has_body(&self, sub_type: &str) -> Result<bool> {
        Ok(self
            .transport
            .body(sub_type)?
            .is_some_and(|part| part.body.is_some()))
    }

    // Attachments

    /// Attaches a file.
    ///
    /// Only the final path component of `name` is used as the filename. The
    /// type comes from `mime` if given, else from the file extension, else
    /// `application/octet-stream`.
    ///
    /// # Errors
    ///
    /// Returns an error if `mime` is not a valid type.
    pub fn attach(
        &mut self,
        name: &str,
        data: impl Into<Content>,
        mime: Option<&str>,
    ) -> Result<&mut Self> {
        let filename = Path::new(name)
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(name);
        let content_type = match mime {
            Some(mime) => ContentType::parse(mime)?,
            None => ContentType::guess(filename),
        };

        debug!(filename, mime = %content_type.mime_type(), "Adding attachment");
        self.transport.add_attachment(
            data.into(),
            &content_type.main_type,
            &content_type.sub_type,
            filename,
        )?;
        Ok(self)
    }

    /// Removes the first attachment named `name`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoSuchAttachment`] if there is none.
    pub fn detach(&mut self, name: &str) -> Result<&mut Self> {
        if !self.transport.remove_attachment(name) {
            return Err(Error::NoSuchAttachment(name.to_string()));
        }
        debug!(filename = name, "Removed attachment");
        Ok(self)
    }

    /// Iterates over attachment parts.
    pub fn attachments(&self) -> impl Iterator<Item = &Part> {
        self.transport.attachments()
    }

    // Transport access

    /// Returns the top-level headers.
    #[must_use]
    pub const fn headers(&self) -> &Headers {
        self.transport.headers()
    }

    /// Returns the top-level headers for direct manipulation.
    ///
    /// Nothing stops duplicate headers that RFC 5322 forbids.
    pub const fn headers_mut(&mut self) -> &mut Headers {
        self.transport.headers_mut()
    }

    /// Returns the transport message.
    #[must_use]
    pub const fn transport(&self) -> &letterpress_mime::Message {
        &self.transport
    }

    pub(crate) const fn transport_mut(&mut self) -> &mut letterpress_mime::Message {
        &mut self.transport
    }

    /// Renders the message as RFC 5322 text.
    ///
    /// Debug builds validate first. Bcc is never rendered.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Invalid`] if validation fails, or an error if the
    /// MIME structure cannot be rendered.
    pub fn to_text(&self) -> Result<String> {
        if cfg!(debug_assertions) {
            self.validate()?;
        }

        let mut transport = self.transport.clone();
        transport.headers_mut().remove("Bcc");
        Ok(transport.render()?)
    }

    /// Renders the message as bytes.
    ///
    /// # Errors
    ///
    /// See [`Message::to_text`].
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        self.to_text().map(String::into_bytes)
    }

    // Delivery

    /// Returns true if a delivery collaborator is bound.
    #[must_use]
    pub fn is_bound(&self) -> bool {
        self.mailer.is_some()
    }

    /// Hands the message to the bound delivery collaborator.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotBound`] without a collaborator, or
    /// [`Error::Delivery`] if it fails.
    pub fn send(&self) -> Result<()> {
        let mailer = self.mailer.as_ref().ok_or(Error::NotBound)?;
        debug!(id = ?self.id().ok(), "Handing message to mailer");
        mailer.send(self).map_err(Error::Delivery)
    }

    // Domain tracking

    pub(crate) fn domain_override(&self) -> Option<&str> {
        self.domain.as_deref()
    }

    pub(crate) fn set_domain_override(&mut self, domain: Option<String>) {
        self.domain = domain;
    }

    /// The domain new identifiers are scoped to.
    pub(crate) fn effective_domain(&self) -> String {
        self.domain.clone().unwrap_or_else(identity::hostname)
    }

    /// Invalidates every field that depends on the addressing domain.
    pub(crate) fn domain_changed(&mut self) -> Result<()> {
        for field in message_fields().iter().filter(|f| f.kind().tracks_domain()) {
            debug!(field = field.name(), "Regenerating after domain change");
            field.clear(self)?;
        }
        Ok(())
    }

    pub(crate) fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }
}

impl fmt::Debug for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Message")
            .field("headers", self.transport.headers())
            .field("domain", &self.domain)
            .field("bound", &self.mailer.is_some())
            .finish_non_exhaustive()
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
    use crate::options::FixedClock;
    use chrono::{TimeZone, Utc};

    fn message() -> Message {
        Message::builder().brand(false).domain("example.com").build().unwrap()
    }

    fn complete() -> Message {
        let mut message = message();
        message.set_author("Alice <alice@example.com>").unwrap();
        message.set_to("bob@example.com").unwrap();
        message.set_subject("Hello").unwrap();
        message.set_plain("Hi Bob").unwrap();
        message
    }

    #[test]
    fn test_defaults_after_construction() {
        let message = message();
        assert_eq!(message.mime().unwrap(), "text/plain");
        assert_eq!(message.charset().unwrap(), "utf-8");
        assert_eq!(message.encoding().unwrap(), "quoted-printable");
        assert!(message.id().unwrap().ends_with("@example.com>"));
        assert!(message.date().unwrap().is_some());
        assert_eq!(message.subject().unwrap(), None);
        assert!(message.to().unwrap().is_empty());
        assert!(!message.is_bound());
    }

    #[test]
    fn test_get_set_clear_by_name() {
        let mut message = message();
        message.set("organisation", "Example Corp").unwrap();
        assert_eq!(message.organization().unwrap().as_deref(), Some("Example Corp"));
        assert_eq!(
            message.get("organization").unwrap(),
            Some(Value::from("Example Corp"))
        );

        message.clear("organization").unwrap();
        assert!(message.get("organization").unwrap_err().is_unset());

        assert!(matches!(
            message.get("nonsense"),
            Err(Error::UnknownField(name)) if name == "nonsense"
        ));
        assert!(message.set("nonsense", "x").is_err());
    }

    #[test]
    fn test_typed_setters() {
        let mut message = message();
        message.set_authors("a@example.com, b@example.com").unwrap();
        message.set_reply("Help Desk <help@example.com>").unwrap();
        message.set_notify("receipts@example.com").unwrap();
        message.set_organization("Example Corp").unwrap();
        message.set_mime("text/html").unwrap();
        message.set_encoding("base64").unwrap();

        assert_eq!(message.authors().unwrap().len(), 2);
        assert_eq!(message.author().unwrap().unwrap().address(), "a@example.com");
        assert_eq!(message.reply().unwrap().unwrap().name.as_deref(), Some("Help Desk"));
        assert_eq!(message.notify().unwrap()[0].address(), "receipts@example.com");
        assert_eq!(message.headers().get("Organization"), Some("Example Corp"));
        assert_eq!(message.mime().unwrap(), "text/html");
        assert_eq!(message.charset().unwrap(), "utf-8");
        assert_eq!(message.headers().get("Content-Transfer-Encoding"), Some("base64"));
    }

    #[test]
    fn test_priority_round_trip() {
        let mut message = message();
        assert_eq!(message.priority().unwrap(), None);
        message.set_priority(1).unwrap();
        assert_eq!(message.headers().get("X-Priority"), Some("1"));
        assert_eq!(message.priority().unwrap(), Some(1));

        message.headers_mut().set("X-Priority", "urgent");
        assert!(matches!(message.priority(), Err(Error::Conversion { .. })));
    }

    #[test]
    fn test_date_uses_clock() {
        let at = Utc.with_ymd_and_hms(2021, 6, 1, 8, 30, 0).unwrap();
        let message = Message::builder()
            .brand(false)
            .clock(Arc::new(FixedClock::new(at)))
            .build()
            .unwrap();
        assert_eq!(message.date().unwrap(), Some(at.fixed_offset()));
        let header = message.headers().get("Date").unwrap();
        assert!(header.starts_with("Tue, "));
        assert!(header.ends_with("Jun 2021 08:30:00 +0000"));
    }

    #[test]
    fn test_domain_change_regenerates_id() {
        let mut message = message();
        let before = message.id().unwrap();
        assert_eq!(message.domain().unwrap(), "example.com");

        message.set_domain("mail.example.org").unwrap();
        let after = message.id().unwrap();
        assert_ne!(before, after);
        assert!(after.ends_with("@mail.example.org>"));
        assert_eq!(message.domain().unwrap(), "mail.example.org");
        assert_eq!(message.headers().get_all("Message-Id").len(), 1);
    }

    #[test]
    fn test_domain_read_from_id_without_override() {
        let mut message = Message::builder().brand(false).build().unwrap();
        message.set_id("<custom@elsewhere.example>").unwrap();
        assert_eq!(message.domain().unwrap(), "elsewhere.example");
    }

    #[test]
    fn test_clearing_domain_falls_back_to_host() {
        let mut message = message();
        message.clear("domain").unwrap();
        assert!(message.domain_override().is_none());
        let expected = format!("@{}>", identity::hostname());
        assert!(message.id().unwrap().ends_with(&expected));
    }

    #[test]
    fn test_recipients_order_without_dedup() {
        let mut message = message();
        message.set_to("a@example.com, b@example.com").unwrap();
        message.set_cc("b@example.com").unwrap();
        message.set_bcc("c@example.com").unwrap();

        let recipients: Vec<String> = message
            .recipients()
            .unwrap()
            .iter()
            .map(|m| m.address().to_string())
            .collect();
        assert_eq!(
            recipients,
            vec!["a@example.com", "b@example.com", "b@example.com", "c@example.com"]
        );
        assert!(self::message().recipients().unwrap().is_empty());
    }

    #[test]
    fn test_envelope() {
        let mut message = message();
        assert!(matches!(
            message.envelope(),
            Err(Error::Unset { field: "author" })
        ));

        message.set_author("author@example.com").unwrap();
        assert_eq!(message.envelope().unwrap().address(), "author@example.com");

        message.set_sender("bounce@example.com").unwrap();
        assert_eq!(message.envelope().unwrap().address(), "bounce@example.com");
        assert!(!message.headers().contains("Sender"));
        assert_eq!(message.transport().unixfrom(), Some("bounce@example.com"));
    }

    #[test]
    fn test_validate_collects_everything() {
        let err = message().validate().unwrap_err();
        let Error::Invalid(errors) = err else {
            panic!("expected validation error");
        };
        assert_eq!(
            errors,
            vec![
                ValidationError::MissingAuthor,
                ValidationError::MissingSubject,
                ValidationError::MissingRecipients,
                ValidationError::MissingBody,
            ]
        );
        assert!(complete().validate().is_ok());
    }

    #[test]
    fn test_validate_requires_author_alone() {
        let mut message = complete();
        message.clear("author").unwrap();
        let Err(Error::Invalid(errors)) = message.validate() else {
            panic!("expected validation error");
        };
        assert_eq!(errors, vec![ValidationError::MissingAuthor]);
    }

    #[test]
    fn test_blank_subject_is_missing() {
        let mut message = complete();
        message.set_subject("   ").unwrap();
        assert!(matches!(message.validate(), Err(Error::Invalid(e)) if e == vec![ValidationError::MissingSubject]));
    }

    #[test]
    fn test_rich_only_body_is_enough() {
        let mut message = complete();
        message.clear("plain").unwrap();
        assert!(message.validate().is_err());
        message.set_rich("<p>Hi</p>").unwrap();
        assert!(message.validate().is_ok());
    }

    #[test]
    fn test_to_text_strips_bcc() {
        let mut message = complete();
        message.set_bcc("hidden@example.com").unwrap();
        let text = message.to_text().unwrap();
        assert!(!text.contains("hidden@example.com"));
        assert!(text.contains("To: bob@example.com\r\n"));
        assert!(message.headers().contains("Bcc"));
        assert_eq!(message.to_bytes().unwrap(), text.into_bytes());
    }

    #[test]
    fn test_attach_and_detach() {
        let mut message = complete();
        message
            .attach("/tmp/reports/q1.pdf", vec![1_u8, 2, 3], None)
            .unwrap()
            .attach("notes.txt", "remember", Some("text/plain"))
            .unwrap()
            .attach("blob", vec![0_u8], None)
            .unwrap();

        let names: Vec<(String, String)> = message
            .attachments()
            .map(|p| {
                (
                    p.filename().unwrap().to_string(),
                    p.content_type().unwrap().mime_type(),
                )
            })
            .collect();
        assert_eq!(
            names,
            vec![
                ("q1.pdf".to_string(), "application/pdf".to_string()),
                ("notes.txt".to_string(), "text/plain".to_string()),
                ("blob".to_string(), "application/octet-stream".to_string()),
            ]
        );
        assert_eq!(message.plain().unwrap().as_deref(), Some("Hi Bob"));

        message.detach("notes.txt").unwrap();
        assert_eq!(message.attachments().count(), 2);
        assert!(matches!(
            message.detach("notes.txt"),
            Err(Error::NoSuchAttachment(_))
        ));
        assert!(message.attach("x", "y", Some("broken")).is_err());
    }

    #[test]
    fn test_send_unbound() {
        assert!(matches!(complete().send(), Err(Error::NotBound)));
    }

    #[test]
    fn test_debug_output() {
        let debug = format!("{:?}", message());
        assert!(debug.contains("Message"));
        assert!(debug.contains("example.com"));
    }
}
