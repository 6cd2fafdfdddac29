//! Construction options and the clock abstraction.
//!
//! [`Options`] carries the settings that are not message fields: whether the
//! message is branded and the initial addressing domain. They can be loaded
//! from any serde format when the `serde` feature is enabled.
//!
//! [`Clock`] abstracts "now" so that the Date default and the Received
//! trace header can be pinned in tests.

use chrono::{DateTime, Utc};

/// Settings applied when a message is constructed.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Options {
    /// Stamp X-Mailer and Received headers after construction.
    pub brand: bool,
    /// Addressing domain used for the message identifier, instead of the
    /// detected host name.
    pub domain: Option<String>,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            brand: true,
            domain: None,
        }
    }
}

impl Options {
    /// Creates the default options: branded, domain auto-detected.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets branding.
    #[must_use]
    pub const fn brand(mut self, brand: bool) -> Self {
        self.brand = brand;
        self
    }

    /// Sets the addressing domain.
    #[must_use]
    pub fn domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }
}

/// Abstraction over wall-clock time for testability.
///
/// In production, use [`SystemClock`]. In tests, use [`FixedClock`] to pin
/// the time deterministically.
pub trait Clock: Send + Sync {
    /// Returns the current time.
    fn now(&self) -> DateTime<Utc>;
}

/// System clock that uses real time.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock frozen at one instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedClock(DateTime<Utc>);

impl FixedClock {
    /// Creates a clock that always reports `at`.
    #[must_use]
    pub const fn new(at: DateTime<Utc>) -> Self {
        Self(at)
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
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
    use chrono::TimeZone;

    #[test]
    fn test_options_default() {
        let options = Options::default();
        assert!(options.brand);
        assert!(options.domain.is_none());
    }

    #[test]
    fn test_options_builder() {
        let options = Options::new().brand(false).domain("example.com");
        assert!(!options.brand);
        assert_eq!(options.domain.as_deref(), Some("example.com"));
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_options_deserialize_partial() {
        let options: Options = serde_json::from_str(r#"{"domain":"mail.example.org"}"#).unwrap();
        assert!(options.brand);
        assert_eq!(options.domain.as_deref(), Some("mail.example.org"));
    }

    #[test]
    fn test_fixed_clock() {
        let at = Utc.with_ymd_and_hms(2020, 1, 2, 3, 4, 5).unwrap();
        let clock = FixedClock::new(at);
        assert_eq!(clock.now(), at);
        assert_eq!(clock.now(), clock.now());
    }

    #[test]
    fn test_system_clock_advances() {
        let clock = SystemClock;
        let first = clock.now();
        assert!(clock.now() >= first);
    }
}
