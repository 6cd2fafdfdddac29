//! Transport message errors.

/// Result type alias for transport message operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while parsing, editing or rendering a message.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A header block line is neither `Name: value` nor a continuation.
    #[error("Malformed header line: {0:?}")]
    MalformedHeader(String),

    /// A Content-Type value could not be parsed.
    #[error("Malformed content type {value:?}: {reason}")]
    ContentType {
        /// The offending value.
        value: String,
        /// What is wrong with it.
        reason: &'static str,
    },

    /// Transfer-encoded or RFC 2047 text could not be decoded.
    #[error("Cannot decode {scheme} text: {reason}")]
    Decode {
        /// `quoted-printable` or `RFC 2047`.
        scheme: &'static str,
        /// What went wrong.
        reason: String,
    },

    /// Text cannot be carried in the named charset.
    #[error("Charset {charset:?}: {reason}")]
    Charset {
        /// The charset label.
        charset: String,
        /// What went wrong.
        reason: &'static str,
    },

    /// RFC 2047 encoding was requested without a charset.
    #[error("Encoded words need a charset")]
    EmptyCharset,

    /// Base64 payload could not be decoded.
    #[error("Base64 decode error: {0}")]
    Base64(#[from] base64::DecodeError),

    /// A multipart entity has no boundary parameter.
    #[error("Multipart content type has no boundary")]
    MissingBoundary,

    /// A single-part operation was attempted on a multipart entity.
    #[error("{0} needs a single-part message")]
    NotSinglePart(&'static str),

    /// A part was read as text but carries no payload.
    #[error("Part has no payload")]
    NoPayload,
}

impl Error {
    pub(crate) fn content_type(value: impl Into<String>, reason: &'static str) -> Self {
        Self::ContentType {
            value: value.into(),
            reason,
        }
    }

    pub(crate) fn charset(charset: &str, reason: &'static str) -> Self {
        Self::Charset {
            charset: charset.to_string(),
            reason,
        }
    }

    pub(crate) fn quoted_printable(reason: impl Into<String>) -> Self {
        Self::Decode {
            scheme: "quoted-printable",
            reason: reason.into(),
        }
    }

    pub(crate) fn rfc2047(reason: impl Into<String>) -> Self {
        Self::Decode {
            scheme: "RFC 2047",
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(
            Error::content_type("text", "missing subtype").to_string(),
            "Malformed content type \"text\": missing subtype"
        );
        assert_eq!(
            Error::quoted_printable("incomplete escape").to_string(),
            "Cannot decode quoted-printable text: incomplete escape"
        );
        assert_eq!(
            Error::charset("klingon", "unknown charset").to_string(),
            "Charset \"klingon\": unknown charset"
        );
        assert_eq!(
            Error::NotSinglePart("set_payload").to_string(),
            "set_payload needs a single-part message"
        );
    }
}
