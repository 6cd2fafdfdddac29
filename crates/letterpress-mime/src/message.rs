//! MIME message structure and handling.

use crate::content_type::ContentType;
use crate::encoding::{decode_charset, encode_base64_wrapped, encode_charset, encode_quoted_printable};
use crate::error::{Error, Result};
use crate::header::Headers;
use std::fmt::{self, Write as _};

/// Longest line allowed in 7bit content (RFC 5322 2.1.1).
const MAX_7BIT_LINE: usize = 998;

/// Charset assumed for text without a charset parameter.
const DEFAULT_CHARSET: &str = "utf-8";

/// Transfer encoding types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferEncoding {
    /// 7-bit ASCII.
    SevenBit,
    /// 8-bit binary.
    EightBit,
    /// Base64 encoding.
    Base64,
    /// Quoted-Printable encoding.
    QuotedPrintable,
    /// Binary (no encoding).
    Binary,
}

impl TransferEncoding {
    /// Parses transfer encoding from string.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "8bit" => Self::EightBit,
            "base64" => Self::Base64,
            "quoted-printable" => Self::QuotedPrintable,
            "binary" => Self::Binary,
            _ => Self::SevenBit, // Default (includes "7bit")
        }
    }

    /// Picks the lightest encoding that keeps `text` mail-safe.
    #[must_use]
    pub fn for_text(text: &[u8]) -> Self {
        let short_lines = text.split(|&b| b == b'\n').all(|l| l.len() <= MAX_7BIT_LINE);
        if text.is_ascii() && short_lines {
            Self::SevenBit
        } else {
            Self::QuotedPrintable
        }
    }

    /// Encodes a payload for transmission.
    #[must_use]
    pub fn encode(self, payload: &[u8]) -> String {
        match self {
            Self::Base64 => encode_base64_wrapped(payload),
            Self::QuotedPrintable => encode_quoted_printable(payload),
            Self::SevenBit | Self::EightBit | Self::Binary => {
                normalize_line_endings(&String::from_utf8_lossy(payload))
            }
        }
    }
}

impl fmt::Display for TransferEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SevenBit => write!(f, "7bit"),
            Self::EightBit => write!(f, "8bit"),
            Self::Base64 => write!(f, "base64"),
            Self::QuotedPrintable => write!(f, "quoted-printable"),
            Self::Binary => write!(f, "binary"),
        }
    }
}

fn normalize_line_endings(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for (i, line) in text.split('\n').enumerate() {
        if i > 0 {
            out.push_str("\r\n");
        }
        out.push_str(line.strip_suffix('\r').unwrap_or(line));
    }
    out
}

/// Returns true for headers describing an entity's content.
fn is_content_header(name: &str) -> bool {
    name.get(..8).is_some_and(|prefix| prefix.eq_ignore_ascii_case("content-"))
}

fn new_boundary() -> String {
    format!("=_{}", uuid::Uuid::new_v4().simple())
}

/// Content handed to [`Message::add_alternative`] and friends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Content {
    /// Text, stored in the charset it is labelled with.
    Text(String),
    /// Raw bytes, always transferred as base64.
    Bytes(Vec<u8>),
}

impl Content {
    fn into_bytes(self, charset: &str) -> Result<Vec<u8>> {
        match self {
            Self::Text(text) => encode_charset(&text, charset),
            Self::Bytes(bytes) => Ok(bytes),
        }
    }
}

impl From<&str> for Content {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<String> for Content {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<Vec<u8>> for Content {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Bytes(bytes)
    }
}

/// MIME message part.
///
/// A part is either a leaf carrying a decoded payload in `body`, or a
/// multipart container whose children live in `parts`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Part {
    /// Part headers.
    pub headers: Headers,
    /// Decoded leaf payload.
    pub body: Option<Vec<u8>>,
    /// Child parts of a multipart container.
    pub parts: Vec<Part>,
}

impl Part {
    /// Creates a new leaf part.
    #[must_use]
    pub const fn new(headers: Headers, body: Vec<u8>) -> Self {
        Self {
            headers,
            body: Some(body),
            parts: Vec::new(),
        }
    }

    /// Creates a text leaf part of the given subtype.
    ///
    /// Text content is stored encoded in `charset`.
    ///
    /// # Errors
    ///
    /// Returns an error if the text cannot be encoded in `charset`.
    pub fn text(content: Content, sub_type: &str, charset: &str) -> Result<Self> {
        let mut content_type = ContentType::new("text", sub_type);
        let is_text = matches!(content, Content::Text(_));
        let body = content.into_bytes(charset)?;
        let encoding = if is_text {
            content_type.set_parameter("charset", charset);
            TransferEncoding::for_text(&body)
        } else {
            TransferEncoding::Base64
        };

        let mut headers = Headers::new();
        headers.set("Content-Type", content_type.to_string());
        headers.set("Content-Transfer-Encoding", encoding.to_string());
        Ok(Self::new(headers, body))
    }

    /// Gets the content type, defaulting to text/plain.
    ///
    /// # Errors
    ///
    /// Returns an error if content type header is invalid.
    pub fn content_type(&self) -> Result<ContentType> {
        self.headers
            .get("content-type")
            .map_or_else(|| Ok(ContentType::text_plain()), ContentType::parse)
    }

    /// Gets the transfer encoding.
    #[must_use]
    pub fn transfer_encoding(&self) -> TransferEncoding {
        self.headers
            .get("content-transfer-encoding")
            .map_or(TransferEncoding::SevenBit, TransferEncoding::parse)
    }

    /// Checks if this part is a multipart container.
    ///
    /// # Errors
    ///
    /// Returns an error if the content type cannot be determined.
    pub fn is_multipart(&self) -> Result<bool> {
        Ok(self.content_type()?.is_multipart())
    }

    /// Checks if this part is disposed as an attachment.
    #[must_use]
    pub fn is_attachment(&self) -> bool {
        self.headers
            .get("content-disposition")
            .is_some_and(|d| d.trim_start().to_ascii_lowercase().starts_with("attachment"))
    }

    /// Returns the filename from the Content-Disposition header.
    #[must_use]
    pub fn filename(&self) -> Option<&str> {
        let disposition = self.headers.get("content-disposition")?;
        disposition.split(';').skip(1).find_map(|param| {
            let (key, value) = param.trim().split_once('=')?;
            key.trim()
                .eq_ignore_ascii_case("filename")
                .then(|| value.trim().trim_matches('"'))
        })
    }

    /// Gets the payload as a string, decoded from the part's charset.
    ///
    /// A part without a charset parameter is read as UTF-8.
    ///
    /// # Errors
    ///
    /// Returns an error if the part has no payload or the payload does not
    /// decode in its charset.
    pub fn body_text(&self) -> Result<String> {
        let body = self.body.as_deref().ok_or(Error::NoPayload)?;
        let content_type = self.content_type()?;
        decode_charset(body, content_type.charset().unwrap_or(DEFAULT_CHARSET))
    }

    fn has_content(&self) -> bool {
        self.body.is_some() || !self.parts.is_empty()
    }

    /// Locates the text part of `sub_type` that represents the body,
    /// skipping attachments. Returns the child index path.
    fn body_path(&self, sub_type: &str) -> Result<Option<Vec<usize>>> {
        if self.is_attachment() {
            return Ok(None);
        }

        let content_type = self.content_type()?;
        if !content_type.is_multipart() {
            return Ok(content_type.is("text", sub_type).then(Vec::new));
        }

        for (i, child) in self.parts.iter().enumerate() {
            if let Some(mut path) = child.body_path(sub_type)? {
                path.insert(0, i);
                return Ok(Some(path));
            }
        }

        Ok(None)
    }

    fn at(&self, path: &[usize]) -> Option<&Self> {
        path.iter().try_fold(self, |part, &i| part.parts.get(i))
    }

    fn at_mut(&mut self, path: &[usize]) -> Option<&mut Self> {
        path.iter().try_fold(self, |part, &i| part.parts.get_mut(i))
    }

    /// Moves this part's content into a new child and turns this part into
    /// a multipart container of `sub_type`.
    fn wrap_into(&mut self, sub_type: &str) {
        let had_content = self.has_content();
        let inner = Self {
            headers: Headers::from_iter(self.headers.drain_matching(is_content_header)),
            body: self.body.take(),
            parts: std::mem::take(&mut self.parts),
        };

        let content_type = ContentType::multipart(sub_type, new_boundary());
        self.headers.set("Content-Type", content_type.to_string());
        if had_content {
            self.parts.push(inner);
        }
    }

    /// Replaces a one-child container by its only child.
    fn collapse(&mut self) {
        if self.parts.len() != 1 {
            return;
        }
        let child = self.parts.remove(0);
        self.headers.drain_matching(is_content_header);
        for (name, value) in child.headers.iter() {
            self.headers.add(name, value);
        }
        self.body = child.body;
        self.parts = child.parts;
    }

    /// Removes the leaf at `path`, collapsing an alternative left with a
    /// single representation.
    fn remove_at(&mut self, path: &[usize]) -> Result<()> {
        let Some((&last, parent_path)) = path.split_last() else {
            self.body = None;
            return Ok(());
        };

        let Some(parent) = self.at_mut(parent_path) else {
            return Ok(());
        };
        parent.parts.remove(last);

        if parent.content_type()?.is("multipart", "alternative") {
            if parent.parts.len() == 1 {
                parent.collapse();
            } else if parent.parts.is_empty() && !parent_path.is_empty() {
                return self.remove_at(parent_path);
            }
        }

        Ok(())
    }

    fn write_to(&self, out: &mut String) -> Result<()> {
        let content_type = self.content_type()?;

        if content_type.is_multipart() {
            let boundary = content_type.boundary().ok_or(Error::MissingBoundary)?;
            for part in &self.parts {
                let _ = write!(out, "--{boundary}\r\n{}\r\n", part.headers);
                part.write_to(out)?;
                out.push_str("\r\n");
            }
            let _ = write!(out, "--{boundary}--\r\n");
        } else if let Some(body) = &self.body {
            out.push_str(&self.transfer_encoding().encode(body));
        }

        Ok(())
    }
}

/// MIME message.
///
/// Owns the root entity (top-level headers and content) and the envelope
/// sender, which is kept apart from the header namespace and never
/// rendered.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Message {
    root: Part,
    unixfrom: Option<String>,
}

impl Message {
    /// Creates an empty message.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the top-level headers.
    #[must_use]
    pub const fn headers(&self) -> &Headers {
        &self.root.headers
    }

    /// Returns the top-level headers for modification.
    pub const fn headers_mut(&mut self) -> &mut Headers {
        &mut self.root.headers
    }

    /// Returns the root entity.
    #[must_use]
    pub const fn root(&self) -> &Part {
        &self.root
    }

    /// Returns the envelope sender.
    #[must_use]
    pub fn unixfrom(&self) -> Option<&str> {
        self.unixfrom.as_deref()
    }

    /// Sets or clears the envelope sender.
    pub fn set_unixfrom(&mut self, sender: Option<String>) {
        self.unixfrom = sender;
    }

    /// Gets the content type.
    ///
    /// # Errors
    ///
    /// Returns an error if content type header is invalid.
    pub fn content_type(&self) -> Result<ContentType> {
        self.root.content_type()
    }

    /// Sets `type/subtype`, keeping existing parameters.
    ///
    /// # Errors
    ///
    /// Returns an error if `mime_type` or the current header is invalid.
    pub fn set_type(&mut self, mime_type: &str) -> Result<()> {
        let requested = ContentType::parse(mime_type)?;
        let mut content_type = self.content_type()?;
        content_type.main_type = requested.main_type;
        content_type.sub_type = requested.sub_type;
        self.root.headers.set("Content-Type", content_type.to_string());
        Ok(())
    }

    /// Returns the charset parameter of an explicit Content-Type header.
    #[must_use]
    pub fn charset(&self) -> Option<String> {
        let header = self.root.headers.get("content-type")?;
        ContentType::parse(header).ok()?.charset().map(str::to_string)
    }

    /// Sets the charset parameter, creating a text/plain header if absent.
    ///
    /// A single-part text payload is re-encoded into the new charset.
    ///
    /// # Errors
    ///
    /// Returns an error if the current header is invalid or the payload
    /// cannot be carried in `charset`.
    pub fn set_charset(&mut self, charset: &str) -> Result<()> {
        self.recode_payload(charset)?;
        self.label_charset(charset)
    }

    /// Removes the charset parameter.
    ///
    /// A single-part text payload is re-encoded as UTF-8, the charset read
    /// when none is declared.
    ///
    /// # Errors
    ///
    /// Returns an error if the current header is invalid.
    pub fn remove_charset(&mut self) -> Result<()> {
        if self.root.headers.contains("content-type") {
            self.recode_payload(DEFAULT_CHARSET)?;
            let mut content_type = self.content_type()?;
            content_type.remove_parameter("charset");
            self.root.headers.set("Content-Type", content_type.to_string());
        }
        Ok(())
    }

    fn label_charset(&mut self, charset: &str) -> Result<()> {
        let content_type = self.content_type()?.with_parameter("charset", charset);
        self.root.headers.set("Content-Type", content_type.to_string());
        Ok(())
    }

    /// Re-encodes a single-part text payload from its declared charset.
    /// Payloads that do not decode as text are left alone.
    fn recode_payload(&mut self, charset: &str) -> Result<()> {
        if self.root.body.is_none() || !self.content_type()?.is_text() {
            return Ok(());
        }
        let Ok(text) = self.root.body_text() else {
            return Ok(());
        };
        self.root.body = Some(encode_charset(&text, charset)?);
        Ok(())
    }

    /// Checks if this is a multipart message.
    ///
    /// # Errors
    ///
    /// Returns an error if content type cannot be determined.
    pub fn is_multipart(&self) -> Result<bool> {
        self.root.is_multipart()
    }

    /// Returns the single-part payload.
    #[must_use]
    pub fn payload(&self) -> Option<&[u8]> {
        self.root.body.as_deref()
    }

    /// Returns true if the message carries any content at all.
    #[must_use]
    pub fn has_content(&self) -> bool {
        self.root.has_content()
    }

    /// Sets the single-part payload.
    ///
    /// Text payloads are encoded in `charset`, get the charset parameter
    /// and a fitting transfer encoding unless one is already declared; byte
    /// payloads are sent as base64.
    ///
    /// # Errors
    ///
    /// Returns an error if this is a multipart message or the text cannot
    /// be encoded in `charset`.
    pub fn set_payload(&mut self, content: Content, charset: &str) -> Result<()> {
        if self.is_multipart()? {
            return Err(Error::NotSinglePart("set_payload"));
        }

        let is_text = matches!(content, Content::Text(_));
        let body = content.into_bytes(charset)?;
        if is_text {
            self.label_charset(charset)?;
            let needed = TransferEncoding::for_text(&body);
            let current = self
                .root
                .headers
                .get("content-transfer-encoding")
                .map(TransferEncoding::parse);
            // A declared encoding wins unless it cannot carry the text.
            let upgrade = match current {
                None => true,
                Some(TransferEncoding::SevenBit) => needed != TransferEncoding::SevenBit,
                // Rendering is textual, so 8bit bodies must be UTF-8.
                Some(TransferEncoding::EightBit | TransferEncoding::Binary) => {
                    std::str::from_utf8(&body).is_err()
                }
                Some(_) => false,
            };
            if upgrade {
                self.root.headers.set("Content-Transfer-Encoding", needed.to_string());
            }
        } else {
            self.root
                .headers
                .set("Content-Transfer-Encoding", TransferEncoding::Base64.to_string());
        }

        self.root.body = Some(body);
        Ok(())
    }

    /// Finds the body part of text subtype `sub_type`.
    ///
    /// Searches the message itself, then alternatives, related and mixed
    /// containers depth-first. Attachments are never considered.
    ///
    /// # Errors
    ///
    /// Returns an error if a content type header is invalid.
    pub fn body(&self, sub_type: &str) -> Result<Option<&Part>> {
        Ok(self
            .root
            .body_path(sub_type)?
            .and_then(|path| self.root.at(&path)))
    }

    /// Replaces the payload of the existing body part of `sub_type`.
    ///
    /// Returns `false` if there is no such part.
    ///
    /// # Errors
    ///
    /// Returns an error if a content type header is invalid.
    pub fn set_body_payload(&mut self, sub_type: &str, content: Content, charset: &str) -> Result<bool> {
        let Some(path) = self.root.body_path(sub_type)? else {
            return Ok(false);
        };

        if path.is_empty() {
            self.set_payload(content, charset)?;
        } else if let Some(part) = self.root.at_mut(&path) {
            *part = Part::text(content, sub_type, charset)?;
        }
        Ok(true)
    }

    /// Adds `content` as a `text/<sub_type>` alternative of the body.
    ///
    /// Single-part content becomes the first alternative of a new
    /// multipart/alternative container. In a multipart/mixed message the
    /// alternative is added to the leading body part, never to attachments.
    ///
    /// # Errors
    ///
    /// Returns an error if a content type header is invalid.
    pub fn add_alternative(&mut self, content: Content, sub_type: &str, charset: &str) -> Result<()> {
        let part = Part::text(content, sub_type, charset)?;
        let content_type = self.content_type()?;

        if content_type.is("multipart", "alternative") {
            self.root.parts.push(part);
            return Ok(());
        }

        if !content_type.is_multipart() {
            self.root.wrap_into("alternative");
            self.root.parts.push(part);
            return Ok(());
        }

        // Mixed or related: the body is the first non-attachment child.
        let Some(index) = self.root.parts.iter().position(|p| !p.is_attachment()) else {
            self.root.parts.insert(0, part);
            return Ok(());
        };

        let body = &mut self.root.parts[index];
        if !body.content_type()?.is("multipart", "alternative") {
            body.wrap_into("alternative");
        }
        body.parts.push(part);
        Ok(())
    }

    /// Removes the body part of text subtype `sub_type`.
    ///
    /// Other alternatives are kept; an alternative container left with one
    /// representation collapses into it. Returns `false` if there was no
    /// such part.
    ///
    /// # Errors
    ///
    /// Returns an error if a content type header is invalid.
    pub fn remove_body(&mut self, sub_type: &str) -> Result<bool> {
        let Some(path) = self.root.body_path(sub_type)? else {
            return Ok(false);
        };

        if self.root.body.is_none() && path.is_empty() {
            return Ok(false);
        }

        self.root.remove_at(&path)?;
        if self.content_type()?.is("multipart", "alternative") && self.root.parts.is_empty() {
            self.root.headers.drain_matching(is_content_header);
        }
        Ok(true)
    }

    /// Adds an attachment, turning the message into multipart/mixed.
    ///
    /// Text attachments are stored as UTF-8.
    ///
    /// # Errors
    ///
    /// Returns an error if a content type header is invalid.
    pub fn add_attachment(
        &mut self,
        content: Content,
        main_type: &str,
        sub_type: &str,
        filename: &str,
    ) -> Result<()> {
        if !self.content_type()?.is("multipart", "mixed") {
            self.root.wrap_into("mixed");
        }

        let mut content_type = ContentType::new(main_type, sub_type);
        if content_type.is_text() && matches!(content, Content::Text(_)) {
            content_type.set_parameter("charset", DEFAULT_CHARSET);
        }

        let mut headers = Headers::new();
        headers.set("Content-Type", content_type.to_string());
        headers.set("Content-Transfer-Encoding", TransferEncoding::Base64.to_string());
        headers.set(
            "Content-Disposition",
            format!("attachment; filename=\"{}\"", filename.replace('"', "")),
        );

        self.root.parts.push(Part::new(headers, content.into_bytes(DEFAULT_CHARSET)?));
        Ok(())
    }

    /// Iterates over attachment parts, depth-first.
    pub fn attachments(&self) -> impl Iterator<Item = &Part> {
        let mut stack: Vec<&Part> = self.root.parts.iter().rev().collect();
        std::iter::from_fn(move || {
            while let Some(part) = stack.pop() {
                if part.is_attachment() {
                    return Some(part);
                }
                stack.extend(part.parts.iter().rev());
            }
            None
        })
    }

    /// Removes the first attachment named `filename`.
    ///
    /// Returns `false` if no attachment has that name.
    pub fn remove_attachment(&mut self, filename: &str) -> bool {
        fn find(part: &Part, filename: &str) -> Option<Vec<usize>> {
            part.parts.iter().enumerate().find_map(|(i, child)| {
                if child.is_attachment() {
                    return (child.filename() == Some(filename)).then(|| vec![i]);
                }
                let mut path = find(child, filename)?;
                path.insert(0, i);
                Some(path)
            })
        }

        let Some(path) = find(&self.root, filename) else {
            return false;
        };
        let Some((&last, parent_path)) = path.split_last() else {
            return false;
        };
        match self.root.at_mut(parent_path) {
            Some(parent) if last < parent.parts.len() => {
                parent.parts.remove(last);
                true
            }
            _ => false,
        }
    }

    /// Renders the full RFC 5322 message.
    ///
    /// # Errors
    ///
    /// Returns an error if the MIME structure cannot be rendered.
    pub fn render(&self) -> Result<String> {
        let mut out = self.root.headers.to_string();
        if !self.root.headers.contains("mime-version") {
            out.push_str("MIME-Version: 1.0\r\n");
        }
        out.push_str("\r\n");
        self.root.write_to(&mut out)?;
        Ok(out)
    }

    /// Renders the full message as bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the MIME structure cannot be rendered.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        self.render().map(String::into_bytes)
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

    fn plain_message(text: &str) -> Message {
        let mut message = Message::new();
        message.headers_mut().add("Subject", "Test");
        message.set_type("text/plain").unwrap();
        message.set_payload(Content::from(text), "utf-8").unwrap();
        message
    }

    #[test]
    fn test_transfer_encoding_parse() {
        assert_eq!(TransferEncoding::parse("7bit"), TransferEncoding::SevenBit);
        assert_eq!(TransferEncoding::parse("base64"), TransferEncoding::Base64);
        assert_eq!(
            TransferEncoding::parse("Quoted-Printable"),
            TransferEncoding::QuotedPrintable
        );
        assert_eq!(TransferEncoding::parse("x-unknown"), TransferEncoding::SevenBit);
    }

    #[test]
    fn test_transfer_encoding_for_text() {
        assert_eq!(TransferEncoding::for_text(b"plain ascii"), TransferEncoding::SevenBit);
        assert_eq!(
            TransferEncoding::for_text("héllo".as_bytes()),
            TransferEncoding::QuotedPrintable
        );
        let long = "a".repeat(1200);
        assert_eq!(
            TransferEncoding::for_text(long.as_bytes()),
            TransferEncoding::QuotedPrintable
        );
    }

    #[test]
    fn test_set_type_keeps_parameters() {
        let mut message = Message::new();
        message.set_charset("utf-8").unwrap();
        message.set_type("text/html").unwrap();
        let ct = message.content_type().unwrap();
        assert_eq!(ct.mime_type(), "text/html");
        assert_eq!(ct.charset(), Some("utf-8"));
        assert!(message.set_type("nonsense").is_err());
    }

    #[test]
    fn test_charset_roundtrip() {
        let mut message = Message::new();
        assert_eq!(message.charset(), None);
        message.set_charset("iso-8859-1").unwrap();
        assert_eq!(message.charset().as_deref(), Some("iso-8859-1"));
        message.remove_charset().unwrap();
        assert_eq!(message.charset(), None);
        assert_eq!(message.content_type().unwrap().mime_type(), "text/plain");
    }

    #[test]
    fn test_payload_is_encoded_in_declared_charset() {
        let mut message = Message::new();
        message
            .set_payload(Content::from("héllo"), "iso-8859-1")
            .unwrap();

        assert_eq!(message.payload(), Some(b"h\xe9llo".as_slice()));
        assert_eq!(message.root().body_text().unwrap(), "héllo");
        let rendered = message.render().unwrap();
        assert!(rendered.contains("charset=iso-8859-1"));
        assert!(rendered.contains("Content-Transfer-Encoding: quoted-printable"));
        assert!(rendered.ends_with("\r\n\r\nh=E9llo"));

        assert!(matches!(
            message.set_payload(Content::from("\u{4e2d}"), "iso-8859-1"),
            Err(Error::Charset { .. })
        ));
        assert_eq!(message.root().body_text().unwrap(), "héllo");
    }

    #[test]
    fn test_set_charset_recodes_payload() {
        let mut message = plain_message("grüß");
        message.set_charset("latin1").unwrap();
        assert_eq!(message.payload(), Some(b"gr\xfc\xdf".as_slice()));
        assert_eq!(message.root().body_text().unwrap(), "grüß");

        message.remove_charset().unwrap();
        assert_eq!(message.payload(), Some("grüß".as_bytes()));
        assert!(message.set_charset("us-ascii").is_err());
    }

    #[test]
    fn test_declared_8bit_upgrades_for_legacy_charset() {
        let mut message = Message::new();
        message.headers_mut().set("Content-Transfer-Encoding", "8bit");
        message.set_payload(Content::from("café"), "utf-8").unwrap();
        assert_eq!(message.root().transfer_encoding(), TransferEncoding::EightBit);

        message.set_payload(Content::from("café"), "iso-8859-1").unwrap();
        assert_eq!(
            message.root().transfer_encoding(),
            TransferEncoding::QuotedPrintable
        );
    }

    #[test]
    fn test_alternative_in_legacy_charset() {
        let mut message = plain_message("plain");
        message
            .add_alternative(Content::from("<p>été</p>"), "html", "iso-8859-1")
            .unwrap();
        let html = message.body("html").unwrap().unwrap();
        assert_eq!(html.body.as_deref(), Some(b"<p>\xe9t\xe9</p>".as_slice()));
        assert_eq!(html.body_text().unwrap(), "<p>été</p>");
        assert!(
            message
                .add_alternative(Content::from("x"), "enriched", "klingon")
                .is_err()
        );
    }

    #[test]
    fn test_unixfrom_is_not_a_header() {
        let mut message = Message::new();
        message.set_unixfrom(Some("bounce@example.com".to_string()));
        assert_eq!(message.unixfrom(), Some("bounce@example.com"));
        assert!(message.headers().is_empty());
        message.set_unixfrom(None);
        assert_eq!(message.unixfrom(), None);
    }

    #[test]
    fn test_single_part_body_lookup() {
        let message = plain_message("Hello, World!");
        let body = message.body("plain").unwrap().unwrap();
        assert_eq!(body.body_text().unwrap(), "Hello, World!");
        assert!(message.body("html").unwrap().is_none());
    }

    #[test]
    fn test_add_alternative_preserves_existing_body() {
        let mut message = plain_message("plain text");
        message
            .add_alternative(Content::from("<p>rich</p>"), "html", "utf-8")
            .unwrap();

        assert!(message.is_multipart().unwrap());
        assert!(message.content_type().unwrap().is("multipart", "alternative"));
        assert_eq!(message.root().parts.len(), 2);
        assert_eq!(message.headers().get("subject"), Some("Test"));
        assert!(message.headers().get("content-transfer-encoding").is_none());

        let plain = message.body("plain").unwrap().unwrap();
        assert_eq!(plain.body_text().unwrap(), "plain text");
        let html = message.body("html").unwrap().unwrap();
        assert_eq!(html.body_text().unwrap(), "<p>rich</p>");
    }

    #[test]
    fn test_set_body_payload_replaces_one_alternative() {
        let mut message = plain_message("plain text");
        message
            .add_alternative(Content::from("<p>rich</p>"), "html", "utf-8")
            .unwrap();

        assert!(message
            .set_body_payload("html", Content::from("<p>new</p>"), "utf-8")
            .unwrap());
        assert_eq!(
            message.body("html").unwrap().unwrap().body_text().unwrap(),
            "<p>new</p>"
        );
        assert_eq!(
            message.body("plain").unwrap().unwrap().body_text().unwrap(),
            "plain text"
        );
        assert!(!message
            .set_body_payload("enriched", Content::from("x"), "utf-8")
            .unwrap());
    }

    #[test]
    fn test_remove_body_collapses_alternative() {
        let mut message = plain_message("plain text");
        message
            .add_alternative(Content::from("<p>rich</p>"), "html", "utf-8")
            .unwrap();

        assert!(message.remove_body("plain").unwrap());
        assert!(!message.is_multipart().unwrap());
        assert_eq!(message.content_type().unwrap().mime_type(), "text/html");
        assert_eq!(message.payload(), Some(b"<p>rich</p>".as_slice()));
        assert!(!message.remove_body("plain").unwrap());
    }

    #[test]
    fn test_attachment_wraps_body_into_mixed() {
        let mut message = plain_message("see attached");
        message
            .add_attachment(Content::Bytes(vec![1, 2, 3]), "application", "pdf", "report.pdf")
            .unwrap();

        assert!(message.content_type().unwrap().is("multipart", "mixed"));
        let attachments: Vec<&Part> = message.attachments().collect();
        assert_eq!(attachments.len(), 1);
        assert_eq!(attachments[0].filename(), Some("report.pdf"));
        assert_eq!(attachments[0].body.as_deref(), Some([1u8, 2, 3].as_slice()));

        let body = message.body("plain").unwrap().unwrap();
        assert_eq!(body.body_text().unwrap(), "see attached");
    }

    #[test]
    fn test_alternative_inside_mixed() {
        let mut message = plain_message("plain text");
        message
            .add_attachment(Content::from("a,b"), "text", "csv", "data.csv")
            .unwrap();
        message
            .add_alternative(Content::from("<p>rich</p>"), "html", "utf-8")
            .unwrap();

        let root = message.root();
        assert_eq!(root.parts.len(), 2);
        assert!(root.parts[0].content_type().unwrap().is("multipart", "alternative"));
        assert!(message.body("html").unwrap().is_some());
        assert!(message.body("csv").unwrap().is_none());
        assert_eq!(message.attachments().count(), 1);
    }

    #[test]
    fn test_alternative_into_empty_mixed() {
        let mut message = Message::new();
        message
            .add_attachment(Content::Bytes(vec![0]), "application", "octet-stream", "blob")
            .unwrap();
        message
            .add_alternative(Content::from("hello"), "plain", "utf-8")
            .unwrap();

        assert!(!message.root().parts[0].is_attachment());
        assert_eq!(
            message.body("plain").unwrap().unwrap().body_text().unwrap(),
            "hello"
        );
    }

    #[test]
    fn test_remove_attachment() {
        let mut message = plain_message("body");
        message
            .add_attachment(Content::Bytes(vec![1]), "image", "png", "a.png")
            .unwrap();
        message
            .add_attachment(Content::Bytes(vec![2]), "image", "png", "b.png")
            .unwrap();

        assert!(message.remove_attachment("a.png"));
        assert!(!message.remove_attachment("a.png"));
        let names: Vec<_> = message.attachments().filter_map(Part::filename).collect();
        assert_eq!(names, vec!["b.png"]);
    }

    #[test]
    fn test_set_payload_rejects_multipart() {
        let mut message = plain_message("one");
        message
            .add_alternative(Content::from("<p>two</p>"), "html", "utf-8")
            .unwrap();
        assert!(message.set_payload(Content::from("x"), "utf-8").is_err());
    }

    #[test]
    fn test_render_single_part() {
        let message = plain_message("Hello\nWorld");
        let rendered = message.render().unwrap();

        let (head, body) = rendered.split_once("\r\n\r\n").unwrap();
        let headers = Headers::parse(head).unwrap();
        assert_eq!(headers.get("Subject"), Some("Test"));
        assert_eq!(headers.get("MIME-Version"), Some("1.0"));
        assert_eq!(headers.get("Content-Transfer-Encoding"), Some("7bit"));
        assert_eq!(body, "Hello\r\nWorld");
    }

    #[test]
    fn test_render_multipart() {
        let mut message = plain_message("plain");
        message
            .add_alternative(Content::from("<p>rich</p>"), "html", "utf-8")
            .unwrap();
        message
            .add_attachment(Content::Bytes(b"raw".to_vec()), "application", "octet-stream", "raw.bin")
            .unwrap();

        let rendered = message.render().unwrap();
        let ct = message.content_type().unwrap();
        let boundary = ct.boundary().unwrap();

        assert!(rendered.contains(&format!("--{boundary}\r\n")));
        assert!(rendered.ends_with(&format!("--{boundary}--\r\n")));
        assert!(rendered.contains("<p>rich</p>"));
        assert!(rendered.contains("filename=\"raw.bin\""));
        assert!(rendered.contains(&crate::encoding::encode_base64(b"raw")));
    }

    #[test]
    fn test_render_missing_boundary() {
        let mut message = Message::new();
        message.headers_mut().set("Content-Type", "multipart/mixed");
        assert!(matches!(message.render(), Err(Error::MissingBoundary)));
    }
}
