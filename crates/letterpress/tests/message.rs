//! Integration tests for the message surface.
//!
//! Delivery goes to an in-memory outbox so the full construct, validate,
//! render and hand-off path runs without a mail server.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::{Arc, Mutex};

use chrono::{DateTime, FixedOffset, TimeZone, Utc};
use letterpress::{
    BoxError, Deliver, Error, FixedClock, Headers, Mailbox, Message, ValidationError, Value,
};
use proptest::prelude::*;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// What the outbox saw for one message.
#[derive(Debug)]
struct Delivery {
    envelope: String,
    recipients: Vec<String>,
    wire: String,
}

/// Delivery collaborator that records instead of sending.
#[derive(Debug, Default)]
struct Outbox {
    sent: Mutex<Vec<Delivery>>,
}

impl Outbox {
    fn deliveries(&self) -> Vec<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .map(|d| d.envelope.clone())
            .collect()
    }
}

impl Deliver for Outbox {
    fn send(&self, message: &Message) -> Result<(), BoxError> {
        let delivery = Delivery {
            envelope: message.envelope()?.address().to_string(),
            recipients: message
                .recipients()?
                .iter()
                .map(|m| m.address().to_string())
                .collect(),
            wire: message.to_text()?,
        };
        self.sent.lock().unwrap().push(delivery);
        Ok(())
    }
}

fn outbox_message(outbox: &Arc<Outbox>) -> Message {
    Message::builder()
        .mailer(outbox.clone())
        .domain("example.com")
        .author("Alice <alice@example.com>")
        .to("bob@example.com")
        .subject("Status")
        .plain("All green.")
        .build()
        .unwrap()
}

#[test]
fn test_send_through_bound_mailer() {
    init_tracing();
    let outbox = Arc::new(Outbox::default());
    let mut message = outbox_message(&outbox);
    message.set_bcc("audit@example.com").unwrap();

    message.send().unwrap();

    let sent = outbox.sent.lock().unwrap();
    assert_eq!(sent.len(), 1);
    let delivery = &sent[0];
    assert_eq!(delivery.envelope, "alice@example.com");
    assert_eq!(delivery.recipients, vec!["bob@example.com", "audit@example.com"]);
    assert!(delivery.wire.contains("Subject: Status\r\n"));
    assert!(delivery.wire.contains("X-Mailer: letterpress-"));
    assert!(!delivery.wire.contains("audit@example.com"));
}

#[test]
fn test_send_uses_explicit_sender() {
    let outbox = Arc::new(Outbox::default());
    let mut message = outbox_message(&outbox);
    message.set_sender("bounces@example.com").unwrap();
    message.send().unwrap();
    assert_eq!(outbox.deliveries(), vec!["bounces@example.com"]);
}

#[test]
fn test_send_without_mailer() {
    let message = Message::builder()
        .author("a@example.com")
        .to("b@example.com")
        .subject("s")
        .plain("p")
        .build()
        .unwrap();
    assert!(matches!(message.send(), Err(Error::NotBound)));
}

#[test]
fn test_delivery_failure_is_wrapped() {
    let refuse = |_: &Message| -> Result<(), BoxError> { Err("connection refused".into()) };
    let message = Message::builder()
        .mailer(Arc::new(refuse))
        .build()
        .unwrap();

    let err = message.send().unwrap_err();
    assert!(matches!(err, Error::Delivery(_)));
    assert_eq!(err.to_string(), "Delivery failed: connection refused");
    assert!(std::error::Error::source(&err).is_some());
}

#[test]
fn test_invalid_message_is_not_rendered() {
    init_tracing();
    let outbox = Arc::new(Outbox::default());
    let mut message = outbox_message(&outbox);
    message.clear("author").unwrap();

    // Without an author the outbox has no envelope sender.
    let result = message.send();
    let Err(Error::Delivery(source)) = result else {
        panic!("expected delivery failure, got {result:?}");
    };
    assert!(source.to_string().contains("Field not set: author"));
    assert!(outbox.deliveries().is_empty());
}

#[test]
fn test_validate_needs_every_part() {
    let complete = Message::builder()
        .author("a@example.com")
        .cc("c@example.com")
        .subject("s")
        .rich("<p>r</p>")
        .build()
        .unwrap();
    assert!(complete.validate().is_ok());

    for name in ["author", "subject", "cc", "rich"] {
        let mut message = complete.clone();
        message.clear(name).unwrap();
        let Err(Error::Invalid(errors)) = message.validate() else {
            panic!("clearing {name} should invalidate");
        };
        assert_eq!(errors.len(), 1, "{name}: {errors:?}");
    }

    let mut message = complete;
    message.clear("author").unwrap();
    if cfg!(debug_assertions) {
        assert!(matches!(
            message.to_text(),
            Err(Error::Invalid(errors)) if errors == vec![ValidationError::MissingAuthor]
        ));
    }
}

#[test]
fn test_rich_after_plain_preserves_plain() {
    let mut message = Message::builder()
        .author("a@example.com")
        .to("b@example.com")
        .subject("Alternatives")
        .plain("plain version")
        .build()
        .unwrap();

    message.set_rich("<p>rich version</p>").unwrap();
    assert_eq!(message.plain().unwrap().as_deref(), Some("plain version"));
    assert_eq!(message.rich().unwrap().as_deref(), Some("<p>rich version</p>"));
    assert_eq!(message.mime().unwrap(), "multipart/alternative");

    message.set_rich("<p>second</p>").unwrap();
    assert_eq!(message.plain().unwrap().as_deref(), Some("plain version"));
    assert_eq!(message.rich().unwrap().as_deref(), Some("<p>second</p>"));

    let wire = message.to_text().unwrap();
    assert!(wire.contains("Content-Type: multipart/alternative; boundary="));
    assert!(wire.contains("Content-Type: text/plain; charset=utf-8"));
    assert!(wire.contains("Content-Type: text/html; charset=utf-8"));
}

#[test]
fn test_body_alternatives_survive_attachments() {
    let mut message = Message::builder()
        .author("a@example.com")
        .to("b@example.com")
        .subject("Report")
        .plain("see attachment")
        .build()
        .unwrap();

    message.attach("report.csv", "a,b\n1,2\n", None).unwrap();
    message.set_rich("<p>see attachment</p>").unwrap();

    assert_eq!(message.mime().unwrap(), "multipart/mixed");
    assert_eq!(message.plain().unwrap().as_deref(), Some("see attachment"));
    assert_eq!(message.rich().unwrap().as_deref(), Some("<p>see attachment</p>"));
    let attachment = message.attachments().next().unwrap();
    assert_eq!(attachment.filename(), Some("report.csv"));
    assert_eq!(attachment.content_type().unwrap().mime_type(), "text/csv");

    message.detach("report.csv").unwrap();
    assert_eq!(message.attachments().count(), 0);
    assert!(message.to_text().is_ok());
}

#[test]
fn test_positional_and_named_conflict() {
    let result = Message::builder()
        .arg("a@example.com")
        .author("b@example.com")
        .build();
    assert!(matches!(result, Err(Error::DuplicateArgument(_))));

    let result = Message::builder().field("flavour", "vanilla").build();
    assert!(matches!(result, Err(Error::UnknownArgument(_))));
}

#[test]
fn test_domain_invalidates_identifier() {
    init_tracing();
    let mut message = Message::builder().domain("first.example").build().unwrap();
    let mut seen = vec![message.id().unwrap()];

    for domain in ["second.example", "third.example", "second.example"] {
        message.set_domain(domain).unwrap();
        let id = message.id().unwrap();
        assert!(id.ends_with(&format!("@{domain}>")));
        assert!(!seen.contains(&id));
        seen.push(id);
    }
}

#[test]
fn test_generic_access_matches_typed() {
    let at = Utc.with_ymd_and_hms(2022, 2, 22, 22, 22, 22).unwrap();
    let mut message = Message::builder()
        .clock(Arc::new(FixedClock::new(at)))
        .build()
        .unwrap();

    message.set("to", vec![Mailbox::new("x@example.com").unwrap()]).unwrap();
    message.set("priority", "3").unwrap();

    assert_eq!(message.get("date").unwrap(), Some(Value::from(at)));
    assert_eq!(message.priority().unwrap(), Some(3));
    assert_eq!(
        message.get("to").unwrap(),
        Some(Value::Mailboxes(vec![Mailbox::new("x@example.com").unwrap()]))
    );
    let id = message.id().unwrap();
    let received = message.headers().get_all("Received");
    assert!(received.iter().any(|value| value.contains(&id)));
}

#[test]
fn test_non_ascii_headers_are_encoded() {
    let message = Message::builder()
        .author("Zoë Ångström <zoe@example.com>")
        .to("b@example.com")
        .subject("Grüße aus Köln")
        .plain("Schöne Grüße")
        .build()
        .unwrap();

    assert_eq!(message.subject().unwrap().as_deref(), Some("Grüße aus Köln"));
    assert_eq!(message.author().unwrap().unwrap().name.as_deref(), Some("Zoë Ångström"));

    let wire = message.to_text().unwrap();
    assert!(wire.is_ascii());
    assert!(wire.contains("<zoe@example.com>"));
    assert!(wire.contains("Subject: =?utf-8?"));
}

#[test]
fn test_line_breaks_in_display_names_are_rejected() {
    let mut message = Message::builder()
        .author("a@example.com")
        .build()
        .unwrap();

    let result = message.set_author("Evil\r\nBcc: victim@example.org <a@example.com>");
    assert!(matches!(result, Err(Error::Conversion { .. })), "{result:?}");

    let mut mailbox = Mailbox::new("a@example.com").unwrap();
    mailbox.name = Some("Evil\r\nX-Injected: yes".into());
    assert!(message.set_reply(Value::Mailbox(mailbox)).is_err());
    assert!(Mailbox::with_name("Evil\r\nX-Injected: yes", "a@example.com").is_err());

    assert_eq!(message.author().unwrap().unwrap().address(), "a@example.com");
    assert_eq!(message.reply().unwrap(), None);
    let headers = Headers::parse(&message.headers().to_string()).unwrap();
    assert!(!headers.contains("X-Injected"));
    assert!(!headers.contains("Bcc"));
}

#[test]
fn test_rendered_headers_parse_back() {
    let message = Message::builder()
        .author(Mailbox::with_name("Müller, Hans", "hans@example.com").unwrap())
        .to("\"Doe, Jane\" <jane@example.com>, Zoë <zoe@example.com>")
        .bcc("audit@example.com")
        .subject("Grüße, und \"mehr\"")
        .plain("Hallo")
        .build()
        .unwrap();

    let wire = message.to_text().unwrap();
    assert!(wire.is_ascii());
    let (head, _) = wire.split_once("\r\n\r\n").unwrap();
    let parsed = Headers::parse(head).unwrap();

    let mut expected: Vec<&str> = message
        .headers()
        .iter()
        .map(|(name, _)| name)
        .filter(|name| !name.eq_ignore_ascii_case("Bcc"))
        .collect();
    if !message.headers().contains("MIME-Version") {
        expected.push("MIME-Version");
    }
    let names: Vec<&str> = parsed.iter().map(|(name, _)| name).collect();
    assert_eq!(names, expected);

    let from = Mailbox::parse(parsed.get("From").unwrap()).unwrap();
    assert_eq!(from.name.as_deref(), Some("Müller, Hans"));
    assert_eq!(from.address(), "hans@example.com");

    let to = Mailbox::parse_list(parsed.get("To").unwrap()).unwrap();
    assert_eq!(to, message.to().unwrap());
    assert_eq!(to[0].name.as_deref(), Some("Doe, Jane"));
    assert_eq!(to[1].name.as_deref(), Some("Zoë"));

    let subject = Headers::decode_value(parsed.get("Subject").unwrap()).unwrap();
    assert_eq!(subject, "Grüße, und \"mehr\"");
}

#[test]
fn test_body_follows_declared_charset() {
    let message = Message::builder()
        .author("a@example.com")
        .to("b@example.com")
        .subject("Latin")
        .field("charset", "iso-8859-1")
        .plain("héllo")
        .build()
        .unwrap();

    assert_eq!(message.plain().unwrap().as_deref(), Some("héllo"));
    let wire = message.to_text().unwrap();
    assert!(wire.contains("charset=iso-8859-1"));
    assert!(wire.contains("h=E9llo"));
    assert!(!wire.contains("=C3=A9"));

    let result = Message::builder()
        .field("charset", "iso-8859-1")
        .plain("\u{2713} done")
        .build();
    assert!(matches!(result, Err(Error::Mime(_))), "{result:?}");
}

fn address() -> impl Strategy<Value = Mailbox> {
    prop::sample::select(vec!["ann", "ben", "cat", "dan"])
        .prop_map(|user| Mailbox::new(format!("{user}@example.com")).unwrap())
}

proptest! {
    #[test]
    fn date_round_trips_to_the_second(
        secs in 0_i64..4_102_444_800,
        offset_minutes in -720_i32..=840,
    ) {
        let offset = FixedOffset::east_opt(offset_minutes * 60).unwrap();
        let date: DateTime<FixedOffset> = offset.timestamp_opt(secs, 0).unwrap();

        let mut message = Message::builder().brand(false).build().unwrap();
        message.set_date(date).unwrap();
        let read = message.date().unwrap().unwrap();

        prop_assert_eq!(read, date);
        prop_assert_eq!(read.offset(), date.offset());
    }

    #[test]
    fn recipients_are_to_then_cc_then_bcc(
        to in prop::collection::vec(address(), 0..4),
        cc in prop::collection::vec(address(), 0..4),
        bcc in prop::collection::vec(address(), 0..4),
    ) {
        let mut message = Message::builder().brand(false).build().unwrap();
        message.set_to(to.clone()).unwrap();
        message.set_cc(cc.clone()).unwrap();
        message.set_bcc(bcc.clone()).unwrap();

        let expected: Vec<Mailbox> = to.into_iter().chain(cc).chain(bcc).collect();
        prop_assert_eq!(message.recipients().unwrap(), expected);
    }
}
