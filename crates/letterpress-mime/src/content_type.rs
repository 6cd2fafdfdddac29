//! MIME content type handling.

use crate::error::{Error, Result};
use std::fmt;

/// Fallback type for content that cannot be identified.
pub const OCTET_STREAM: (&str, &str) = ("application", "octet-stream");

/// File extensions with a well-known media type.
const EXTENSIONS: &[(&str, &str, &str)] = &[
    ("txt", "text", "plain"),
    ("text", "text", "plain"),
    ("htm", "text", "html"),
    ("html", "text", "html"),
    ("css", "text", "css"),
    ("csv", "text", "csv"),
    ("ics", "text", "calendar"),
    ("md", "text", "markdown"),
    ("xml", "application", "xml"),
    ("json", "application", "json"),
    ("pdf", "application", "pdf"),
    ("zip", "application", "zip"),
    ("gz", "application", "gzip"),
    ("tar", "application", "x-tar"),
    ("doc", "application", "msword"),
    ("xls", "application", "vnd.ms-excel"),
    ("eml", "message", "rfc822"),
    ("png", "image", "png"),
    ("jpg", "image", "jpeg"),
    ("jpeg", "image", "jpeg"),
    ("gif", "image", "gif"),
    ("webp", "image", "webp"),
    ("svg", "image", "svg+xml"),
    ("mp3", "audio", "mpeg"),
    ("wav", "audio", "wav"),
    ("mp4", "video", "mp4"),
];

/// MIME content type with parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ContentType {
    /// Main type (e.g., "text", "image", "multipart").
    pub main_type: String,
    /// Subtype (e.g., "plain", "html", "jpeg").
    pub sub_type: String,
    /// Parameters in declaration order (e.g., charset=utf-8, boundary=xxx).
    pub parameters: Vec<(String, String)>,
}

impl ContentType {
    /// Creates a new content type.
    #[must_use]
    pub fn new(main_type: impl Into<String>, sub_type: impl Into<String>) -> Self {
        Self {
            main_type: main_type.into().to_lowercase(),
            sub_type: sub_type.into().to_lowercase(),
            parameters: Vec::new(),
        }
    }

    /// Creates a text/plain content type.
    #[must_use]
    pub fn text_plain() -> Self {
        Self::new("text", "plain")
    }

    /// Creates a `multipart/<sub_type>` content type with a boundary.
    #[must_use]
    pub fn multipart(sub_type: &str, boundary: impl Into<String>) -> Self {
        Self::new("multipart", sub_type).with_parameter("boundary", boundary)
    }

    /// Guesses the content type of a file from its extension.
    ///
    /// Unknown or missing extensions yield `application/octet-stream`.
    #[must_use]
    pub fn guess(filename: &str) -> Self {
        let extension = filename
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .unwrap_or_default();

        EXTENSIONS
            .iter()
            .find(|(ext, _, _)| *ext == extension)
            .map_or_else(
                || Self::new(OCTET_STREAM.0, OCTET_STREAM.1),
                |(_, main, sub)| Self::new(*main, *sub),
            )
    }

    /// Adds a parameter.
    #[must_use]
    pub fn with_parameter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_parameter(key, value);
        self
    }

    /// Sets a parameter, replacing an existing value in place.
    pub fn set_parameter(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into().to_lowercase();
        let value = value.into();
        match self.parameters.iter_mut().find(|(k, _)| *k == key) {
            Some((_, existing)) => *existing = value,
            None => self.parameters.push((key, value)),
        }
    }

    /// Removes a parameter, returning its previous value.
    pub fn remove_parameter(&mut self, key: &str) -> Option<String> {
        let key = key.to_lowercase();
        let pos = self.parameters.iter().position(|(k, _)| *k == key)?;
        Some(self.parameters.remove(pos).1)
    }

    /// Returns a parameter value if present.
    #[must_use]
    pub fn parameter(&self, key: &str) -> Option<&str> {
        self.parameters
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }

    /// Returns the charset parameter if present.
    #[must_use]
    pub fn charset(&self) -> Option<&str> {
        self.parameter("charset")
    }

    /// Returns the boundary parameter if present.
    #[must_use]
    pub fn boundary(&self) -> Option<&str> {
        self.parameter("boundary")
    }

    /// Returns `type/subtype` without parameters.
    #[must_use]
    pub fn mime_type(&self) -> String {
        format!("{}/{}", self.main_type, self.sub_type)
    }

    /// Checks whether this is `main/sub`, ignoring case.
    #[must_use]
    pub fn is(&self, main_type: &str, sub_type: &str) -> bool {
        self.main_type.eq_ignore_ascii_case(main_type) && self.sub_type.eq_ignore_ascii_case(sub_type)
    }

    /// Checks if this is a multipart content type.
    #[must_use]
    pub fn is_multipart(&self) -> bool {
        self.main_type.eq_ignore_ascii_case("multipart")
    }

    /// Checks if this is a text content type.
    #[must_use]
    pub fn is_text(&self) -> bool {
        self.main_type.eq_ignore_ascii_case("text")
    }

    /// Parses a content type string.
    ///
    /// Format: `type/subtype; param1=value1; param2=value2`
    ///
    /// # Errors
    ///
    /// Returns an error if the format is invalid.
    pub fn parse(s: &str) -> Result<Self> {
        let mut parts = s.split(';');

        let type_str = parts.next().unwrap_or_default().trim();
        if type_str.is_empty() {
            return Err(Error::content_type(s, "empty type"));
        }

        let (main_type, sub_type) = type_str
            .split_once('/')
            .ok_or_else(|| Error::content_type(type_str, "missing subtype"))?;

        let main_type = main_type.trim();
        let sub_type = sub_type.trim();
        if main_type.is_empty() || sub_type.is_empty() || sub_type.contains('/') {
            return Err(Error::content_type(type_str, "expected type/subtype"));
        }

        let mut content_type = Self::new(main_type, sub_type);

        for param in parts {
            if let Some((key, value)) = param.trim().split_once('=') {
                content_type.set_parameter(key.trim(), value.trim().trim_matches('"'));
            }
        }

        Ok(content_type)
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let main = &self.main_type;
        let sub = &self.sub_type;
        write!(f, "{main}/{sub}")?;

        for (key, value) in &self.parameters {
            // Quote value if it contains special characters
            if value.is_empty()
                || value.contains(|c: char| c.is_whitespace() || "()<>@,;:\\\"/[]?=".contains(c))
            {
                write!(f, "; {key}=\"{value}\"")?;
            } else {
                write!(f, "; {key}={value}")?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_content_type_new() {
        let ct = ContentType::new("Text", "Plain");
        assert_eq!(ct.main_type, "text");
        assert_eq!(ct.sub_type, "plain");
        assert!(ct.parameters.is_empty());
    }

    #[test]
    fn test_multipart() {
        let ct = ContentType::multipart("mixed", "boundary123");
        assert_eq!(ct.mime_type(), "multipart/mixed");
        assert_eq!(ct.boundary(), Some("boundary123"));
        assert!(ct.is_multipart());
        assert!(!ct.is_text());
        assert!(ContentType::guess("notes.csv").is_text());
    }

    #[test]
    fn test_content_type_parse() {
        let ct = ContentType::parse("text/plain; charset=utf-8").unwrap();
        assert!(ct.is("text", "plain"));
        assert_eq!(ct.charset(), Some("utf-8"));
    }

    #[test]
    fn test_content_type_parse_quoted() {
        let ct = ContentType::parse("multipart/mixed; boundary=\"----=_Part_123\"").unwrap();
        assert_eq!(ct.mime_type(), "multipart/mixed");
        assert_eq!(ct.boundary(), Some("----=_Part_123"));
    }

    #[test]
    fn test_content_type_parse_invalid() {
        assert!(ContentType::parse("").is_err());
        assert!(ContentType::parse("text").is_err());
        assert!(ContentType::parse("text/").is_err());
        assert!(ContentType::parse("a/b/c").is_err());
    }

    #[test]
    fn test_content_type_display_keeps_order() {
        let ct = ContentType::new("text", "plain")
            .with_parameter("charset", "utf-8")
            .with_parameter("format", "flowed");
        assert_eq!(ct.to_string(), "text/plain; charset=utf-8; format=flowed");

        let ct = ContentType::multipart("alternative", "=_abc");
        assert_eq!(ct.to_string(), "multipart/alternative; boundary=\"=_abc\"");
    }

    #[test]
    fn test_set_and_remove_parameter() {
        let mut ct = ContentType::text_plain().with_parameter("charset", "iso-8859-1");
        ct.set_parameter("CHARSET", "utf-8");
        assert_eq!(ct.charset(), Some("utf-8"));
        assert_eq!(ct.parameters.len(), 1);

        assert_eq!(ct.remove_parameter("charset").as_deref(), Some("utf-8"));
        assert_eq!(ct.charset(), None);
        assert_eq!(ct.remove_parameter("charset"), None);
    }

    #[test]
    fn test_guess() {
        assert_eq!(ContentType::guess("report.PDF").mime_type(), "application/pdf");
        assert_eq!(ContentType::guess("photo.jpeg").mime_type(), "image/jpeg");
        assert_eq!(ContentType::guess("notes.txt").mime_type(), "text/plain");
        assert_eq!(
            ContentType::guess("archive.unknownext").mime_type(),
            "application/octet-stream"
        );
        assert_eq!(ContentType::guess("README").mime_type(), "application/octet-stream");
    }
}
