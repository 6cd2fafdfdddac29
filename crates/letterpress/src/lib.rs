//! # letterpress
//!
//! Typed, field-based construction of RFC 5322 / MIME email messages.
//!
//! ## Features
//!
//! - **Typed fields**: subject, addresses, dates, priority and bodies read
//!   and write straight through to the underlying MIME message
//! - **Ordered registry**: a fixed declaration order drives positional
//!   construction and default seeding
//! - **Alternative bodies**: plain and rich text coexist as
//!   multipart/alternative
//! - **Message identifiers**: regenerated whenever the addressing domain
//!   changes
//! - **Validation**: every missing author, subject, recipient or body is
//!   reported at once
//! - **Delivery hand-off**: bind any [`Deliver`] implementation and call
//!   [`Message::send`]
//!
//! ## Quick Start
//!
//! ```ignore
//! use letterpress::Message;
//!
//! let mut message = Message::builder()
//!     .author("Alice <alice@example.com>")
//!     .to("bob@example.com")
//!     .subject("Quarterly numbers")
//!     .plain("See attached.")
//!     .domain("example.com")
//!     .build()?;
//!
//! message.set_rich("<p>See attached.</p>")?;
//! message.attach("q1.pdf", pdf_bytes, None)?;
//!
//! let wire = message.to_bytes()?;
//! ```
//!
//! ## Fields
//!
//! | Name           | Maps to                       | Native          |
//! |----------------|-------------------------------|-----------------|
//! | `author`       | From                          | mailbox         |
//! | `to`           | To                            | mailbox list    |
//! | `subject`      | Subject                       | text            |
//! | `cc`           | Cc                            | mailbox list    |
//! | `bcc`          | Bcc (never rendered)          | mailbox list    |
//! | `reply`        | Reply-To                      | mailbox         |
//! | `notify`       | Disposition-Notification-To   | mailbox list    |
//! | `sender`       | envelope sender               | mailbox         |
//! | `organization` | Organization                  | text            |
//! | `priority`     | X-Priority                    | integer         |
//! | `mime`         | Content-Type                  | `type/subtype`  |
//! | `charset`      | Content-Type charset          | text            |
//! | `encoding`     | Content-Transfer-Encoding     | text            |
//! | `plain`        | text/plain body               | text or bytes   |
//! | `rich`         | text/html body                | text or bytes   |
//! | `domain`       | Message-Id domain             | text            |
//! | `id`           | Message-Id                    | text            |
//! | `date`         | Date                          | date            |
//! | `authors`      | From                          | mailbox list    |
//!
//! `organisation` is accepted as a named alias of `organization`.
//!
//! ## Modules
//!
//! - [`field`]: field descriptors and conversions
//! - [`identity`]: host, user and message identifier helpers

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod address;
mod builder;
mod error;
pub mod field;
pub mod identity;
mod mailer;
mod message;
mod options;
mod registry;
mod value;

pub use address::Mailbox;
pub use builder::MessageBuilder;
pub use error::{Error, Result, ValidationError};
pub use field::{DefaultValue, Field, Foreign, Kind};
pub use mailer::{BoxError, Deliver};
pub use message::Message;
pub use options::{Clock, FixedClock, Options, SystemClock};
pub use registry::{FieldSet, FieldSetBuilder, message_fields};
pub use value::Value;

pub use letterpress_mime::{Content, Headers, Part};
