//! Error types for message construction and field access.

use std::fmt::Write as _;

/// Result type alias for message operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by fields, construction, validation and delivery.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A field was read that has no value and no default.
    #[error("Field not set: {field}")]
    Unset {
        /// Field name.
        field: &'static str,
    },

    /// A value could not be converted between its native and header form.
    #[error("Cannot convert {field} value {value:?}: {reason}")]
    Conversion {
        /// Field name.
        field: &'static str,
        /// The offending value, as text.
        value: String,
        /// Why conversion failed.
        reason: String,
    },

    /// A keyword argument repeats a positionally bound field.
    #[error("Keyword arguments duplicate positional arguments: {}", .0.join(", "))]
    DuplicateArgument(Vec<String>),

    /// A keyword argument names no known field.
    #[error("Unknown argument: {0}")]
    UnknownArgument(String),

    /// More positional arguments than declared fields.
    #[error("Too many positional arguments: {given} given, {max} fields declared")]
    TooManyArguments {
        /// Number of positional arguments supplied.
        given: usize,
        /// Number of declared fields.
        max: usize,
    },

    /// A field name used for access is not declared.
    #[error("Unknown field: {0}")]
    UnknownField(String),

    /// The message is missing required content.
    #[error("Invalid message: {}", describe(.0))]
    Invalid(Vec<ValidationError>),

    /// `send()` was called without a delivery collaborator.
    #[error("Message is not bound to a mailer")]
    NotBound,

    /// A single-valued field was given several values.
    #[error("Only a single value is permitted for {field}, got {count}")]
    Cardinality {
        /// Field name.
        field: &'static str,
        /// Number of values supplied.
        count: usize,
    },

    /// `detach()` named an attachment that does not exist.
    #[error("No attachment named {0}")]
    NoSuchAttachment(String),

    /// The delivery collaborator failed.
    #[error("Delivery failed: {0}")]
    Delivery(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// The transport message rejected an operation.
    #[error("MIME error: {0}")]
    Mime(#[from] letterpress_mime::Error),
}

impl Error {
    /// Creates a conversion error.
    #[must_use]
    pub fn conversion(field: &'static str, value: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Conversion {
            field,
            value: value.into(),
            reason: reason.into(),
        }
    }

    /// Returns true if this is an unset-field error.
    #[must_use]
    pub const fn is_unset(&self) -> bool {
        matches!(self, Self::Unset { .. })
    }
}

/// Required message content that is missing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationError {
    /// No From address.
    MissingAuthor,
    /// No subject, or a blank one.
    MissingSubject,
    /// To, Cc and Bcc are all empty.
    MissingRecipients,
    /// Neither a plain nor a rich body.
    MissingBody,
}

impl ValidationError {
    /// Get human-readable error message.
    #[must_use]
    pub const fn message(&self) -> &'static str {
        match self {
            Self::MissingAuthor => "An author (From) is required",
            Self::MissingSubject => "A subject is required",
            Self::MissingRecipients => "At least one To, Cc or Bcc recipient is required",
            Self::MissingBody => "A plain or rich text body is required",
        }
    }

    /// Get the field name this error relates to.
    #[must_use]
    pub const fn field(&self) -> &'static str {
        match self {
            Self::MissingAuthor => "author",
            Self::MissingSubject => "subject",
            Self::MissingRecipients => "recipients",
            Self::MissingBody => "plain",
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for ValidationError {}

fn describe(errors: &[ValidationError]) -> String {
    let mut out = String::new();
    for (i, error) in errors.iter().enumerate() {
        if i > 0 {
            out.push_str("; ");
        }
        let _ = write!(out, "{error}");
    }
    out
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::Unset { field: "subject" };
        assert_eq!(err.to_string(), "Field not set: subject");
        assert!(err.is_unset());

        let err = Error::DuplicateArgument(vec!["to".into(), "subject".into()]);
        assert_eq!(
            err.to_string(),
            "Keyword arguments duplicate positional arguments: to, subject"
        );

        let err = Error::conversion("priority", "high", "invalid digit found in string");
        assert!(err.to_string().contains("priority"));
        assert!(err.to_string().contains("\"high\""));
        assert!(!err.is_unset());
    }

    #[test]
    fn test_validation_display() {
        let err = Error::Invalid(vec![
            ValidationError::MissingAuthor,
            ValidationError::MissingBody,
        ]);
        assert_eq!(
            err.to_string(),
            "Invalid message: An author (From) is required; A plain or rich text body is required"
        );
        assert_eq!(ValidationError::MissingRecipients.field(), "recipients");
    }
}
