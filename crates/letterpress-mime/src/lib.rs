//! # letterpress-mime
//!
//! Transport message model for building RFC 5322 / MIME email.
//!
//! ## Features
//!
//! - **Ordered headers**: case-insensitive lookup, duplicate instances,
//!   in-place replacement, folding and RFC 2047 encoding on output
//! - **Body alternatives**: plain and rich text kept side by side in a
//!   multipart/alternative container
//! - **Attachments**: multipart/mixed conversion, lookup and removal
//! - **Encoding**: Base64 and Quoted-Printable bodies, RFC 2047 headers
//!   (address lists encoded per display name), text payloads transcoded
//!   into their declared charset
//! - **Envelope sender**: carried next to the message, never rendered
//!
//! ## Quick Start
//!
//! ```ignore
//! use letterpress_mime::{Content, Message};
//!
//! let mut message = Message::new();
//! message.headers_mut().set("Subject", "Test Message");
//! message.set_payload(Content::from("Plain text version"), "utf-8")?;
//! message.add_alternative(Content::from("<h1>HTML version</h1>"), "html", "utf-8")?;
//!
//! println!("{}", message.render()?);
//! ```
//!
//! ### Attachments
//!
//! ```ignore
//! use letterpress_mime::{Content, ContentType, Message};
//!
//! let guessed = ContentType::guess("report.pdf");
//! message.add_attachment(
//!     Content::Bytes(pdf_bytes),
//!     &guessed.main_type,
//!     &guessed.sub_type,
//!     "report.pdf",
//! )?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod content_type;
mod error;
mod header;
mod message;

pub mod encoding;

pub use content_type::ContentType;
pub use error::{Error, Result};
pub use header::Headers;
pub use message::{Content, Message, Part, TransferEncoding};
