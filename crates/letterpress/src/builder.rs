//! Message construction.

use crate::error::{Error, Result};
use crate::identity;
use crate::mailer::Deliver;
use crate::message::Message;
use crate::options::{Clock, Options, SystemClock};
use crate::registry::message_fields;
use crate::value::Value;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, trace};

/// Builder for [`Message`].
///
/// Positional arguments bind to fields in declaration order (author, to,
/// subject, cc, bcc, ...). Named arguments bind to any field or alias. A
/// field bound both ways is an error, as is a name that matches nothing.
/// Fields left unbound receive their defaults.
///
/// # Example
///
/// ```ignore
/// use letterpress::Message;
///
/// let message = Message::builder()
///     .arg("Alice <alice@example.com>")
///     .arg("bob@example.com")
///     .arg("Lunch?")
///     .plain("Noon at the usual place.")
///     .domain("example.com")
///     .build()?;
/// ```
#[derive(Clone, Default)]
pub struct MessageBuilder {
    options: Options,
    mailer: Option<Arc<dyn Deliver>>,
    clock: Option<Arc<dyn Clock>>,
    positional: Vec<Value>,
    named: Vec<(String, Value)>,
}

impl MessageBuilder {
    /// Creates a builder with default options.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the construction options.
    #[must_use]
    pub fn options(mut self, options: Options) -> Self {
        self.options = options;
        self
    }

    /// Enables or disables the X-Mailer and Received headers.
    #[must_use]
    pub const fn brand(mut self, brand: bool) -> Self {
        self.options.brand = brand;
        self
    }

    /// Sets the addressing domain used for the message identifier.
    #[must_use]
    pub fn domain(mut self, domain: impl Into<String>) -> Self {
        self.options.domain = Some(domain.into());
        self
    }

    /// Binds a delivery collaborator for [`Message::send`].
    #[must_use]
    pub fn mailer(mut self, mailer: Arc<dyn Deliver>) -> Self {
        self.mailer = Some(mailer);
        self
    }

    /// Sets the clock used for the Date default and the Received header.
    #[must_use]
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Appends a positional argument.
    #[must_use]
    pub fn arg(mut self, value: impl Into<Value>) -> Self {
        self.positional.push(value.into());
        self
    }

    /// Sets a named argument. Naming a field twice keeps the last value.
    #[must_use]
    pub fn field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        let name = name.into();
        let value = value.into();
        match self.named.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = value,
            None => self.named.push((name, value)),
        }
        self
    }

    /// Sets the author (From).
    #[must_use]
    pub fn author(self, author: impl Into<Value>) -> Self {
        self.field("author", author)
    }

    /// Sets the To recipients.
    #[must_use]
    pub fn to(self, to: impl Into<Value>) -> Self {
        self.field("to", to)
    }

    /// Sets the Cc recipients.
    #[must_use]
    pub fn cc(self, cc: impl Into<Value>) -> Self {
        self.field("cc", cc)
    }

    /// Sets the Bcc recipients.
    #[must_use]
    pub fn bcc(self, bcc: impl Into<Value>) -> Self {
        self.field("bcc", bcc)
    }

    /// Sets the subject.
    #[must_use]
    pub fn subject(self, subject: impl Into<Value>) -> Self {
        self.field("subject", subject)
    }

    /// Sets the plain-text body.
    #[must_use]
    pub fn plain(self, plain: impl Into<Value>) -> Self {
        self.field("plain", plain)
    }

    /// Sets the rich-text body.
    #[must_use]
    pub fn rich(self, rich: impl Into<Value>) -> Self {
        self.field("rich", rich)
    }

    /// Builds the message.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TooManyArguments`], [`Error::DuplicateArgument`] or
    /// [`Error::UnknownArgument`] for bad bindings, or a conversion error
    /// from any field.
    pub fn build(self) -> Result<Message> {
        let fields = message_fields();
        let Self {
            options,
            mailer,
            clock,
            positional,
            mut named,
        } = self;

        if positional.len() > fields.len() {
            return Err(Error::TooManyArguments {
                given: positional.len(),
                max: fields.len(),
            });
        }

        let duplicates: Vec<String> = fields
            .names()
            .take(positional.len())
            .filter(|name| named.iter().any(|(n, _)| n == *name))
            .map(str::to_string)
            .collect();
        if !duplicates.is_empty() {
            return Err(Error::DuplicateArgument(duplicates));
        }

        if let Some((name, _)) = named.iter().find(|(n, _)| fields.get(n).is_none()) {
            return Err(Error::UnknownArgument(name.clone()));
        }

        debug!(
            positional = positional.len(),
            named = named.len(),
            brand = options.brand,
            "Building message"
        );

        let clock = clock.unwrap_or_else(|| Arc::new(SystemClock));
        let mut message = Message::blank(mailer, options.domain, clock);
        let mut positional = positional.into_iter();

        for field in fields {
            if let Some(value) = positional.next() {
                trace!(field = field.name(), "Binding positional argument");
                field.write(&mut message, Some(value))?;
            } else if let Some(pos) = named.iter().position(|(n, _)| n == field.name()) {
                trace!(field = field.name(), "Binding named argument");
                let (_, value) = named.remove(pos);
                field.write(&mut message, Some(value))?;
            } else {
                field.prepare(&mut message)?;
            }
        }

        // Whatever is left names an alias.
        for (name, value) in named {
            trace!(field = %name, "Binding aliased argument");
            message.set(&name, value)?;
        }

        if options.brand {
            stamp(&mut message)?;
        }

        Ok(message)
    }
}

impl fmt::Debug for MessageBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MessageBuilder")
            .field("options", &self.options)
            .field("positional", &self.positional)
            .field("named", &self.named)
            .field("bound", &self.mailer.is_some())
            .finish_non_exhaustive()
    }
}

/// Adds the X-Mailer marker and the Received trace header.
fn stamp(message: &mut Message) -> Result<()> {
    let id = message.id()?;
    let date = message.clock().now().to_rfc2822();
    let host = identity::hostname();

    message.headers_mut().add(
        "X-Mailer",
        format!(
            "letterpress-{} <{}>",
            env!("CARGO_PKG_VERSION"),
            env!("CARGO_PKG_REPOSITORY")
        ),
    );
    message.headers_mut().add(
        "Received",
        format!(
            "from {host} ({user} pid {pid}) by letterpress id {id}; {date}",
            user = identity::username(),
            pid = identity::pid(),
        ),
    );
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

    #[test]
    fn test_positional_binding_order() {
        let message = MessageBuilder::new()
            .brand(false)
            .arg("alice@example.com")
            .arg("bob@example.com")
            .arg("Greetings")
            .build()
            .unwrap();

        assert_eq!(message.author().unwrap().unwrap().address(), "alice@example.com");
        assert_eq!(message.to().unwrap()[0].address(), "bob@example.com");
        assert_eq!(message.subject().unwrap().as_deref(), Some("Greetings"));
    }

    #[test]
    fn test_named_binding() {
        let message = MessageBuilder::new()
            .brand(false)
            .subject("Named")
            .field("organisation", "Example Corp")
            .field("priority", 2_i64)
            .build()
            .unwrap();
        assert_eq!(message.subject().unwrap().as_deref(), Some("Named"));
        assert_eq!(message.organization().unwrap().as_deref(), Some("Example Corp"));
        assert_eq!(message.priority().unwrap(), Some(2));
    }

    #[test]
    fn test_duplicate_argument() {
        let err = MessageBuilder::new()
            .arg("alice@example.com")
            .arg("bob@example.com")
            .author("carol@example.com")
            .subject("fine, not positional")
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::DuplicateArgument(names) if names == vec!["author"]));
    }

    #[test]
    fn test_unknown_argument() {
        let err = MessageBuilder::new()
            .field("colour", "blue")
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::UnknownArgument(name) if name == "colour"));
    }

    #[test]
    fn test_too_many_arguments() {
        let builder = (0..=message_fields().len())
            .fold(MessageBuilder::new(), |builder, _| builder.arg("x"));
        assert!(matches!(
            builder.build(),
            Err(Error::TooManyArguments { given, max }) if given == max + 1
        ));
    }

    #[test]
    fn test_named_field_last_value_wins() {
        let message = MessageBuilder::new()
            .brand(false)
            .subject("first")
            .subject("second")
            .build()
            .unwrap();
        assert_eq!(message.subject().unwrap().as_deref(), Some("second"));
    }

    #[test]
    fn test_conversion_error_fails_build() {
        let result = MessageBuilder::new().brand(false).field("priority", "soon").build();
        assert!(matches!(result, Err(Error::Conversion { field: "priority", .. })));
    }

    #[test]
    fn test_branding_headers() {
        let message = MessageBuilder::new().domain("example.com").build().unwrap();
        let mailer = message.headers().get("X-Mailer").unwrap();
        assert!(mailer.starts_with("letterpress-"));

        let received = message.headers().get("Received").unwrap();
        assert!(received.contains(&message.id().unwrap()));
        assert!(received.contains(&format!("pid {}", identity::pid())));

        let names: Vec<&str> = message.headers().iter().map(|(n, _)| n).collect();
        let mailer_at = names.iter().position(|n| *n == "X-Mailer").unwrap();
        assert_eq!(names[mailer_at + 1], "Received");
    }

    #[test]
    fn test_unbranded_has_no_trace() {
        let message = MessageBuilder::new().brand(false).build().unwrap();
        assert!(!message.headers().contains("X-Mailer"));
        assert!(!message.headers().contains("Received"));
    }

    #[test]
    fn test_options_domain_scopes_id() {
        let message = MessageBuilder::new()
            .options(Options::new().brand(false).domain("lists.example.net"))
            .build()
            .unwrap();
        assert!(message.id().unwrap().ends_with("@lists.example.net>"));
    }

    #[test]
    fn test_named_domain_scopes_id() {
        let message = MessageBuilder::new()
            .brand(false)
            .field("domain", "named.example")
            .build()
            .unwrap();
        assert!(message.id().unwrap().ends_with("@named.example>"));
        assert_eq!(message.domain().unwrap(), "named.example");
    }
}
