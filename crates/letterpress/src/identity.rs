//! Host, user and process identity, and message identifier generation.

use uuid::Uuid;

/// Domain used when the host name cannot be determined.
pub const FALLBACK_DOMAIN: &str = "localhost";

/// Returns the local host name, or `localhost`.
#[must_use]
pub fn hostname() -> String {
    detect_hostname()
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| FALLBACK_DOMAIN.to_string())
}

#[cfg(unix)]
fn detect_hostname() -> Option<String> {
    match nix::unistd::gethostname() {
        Ok(name) => name.into_string().ok(),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to read host name");
            None
        }
    }
}

#[cfg(not(unix))]
fn detect_hostname() -> Option<String> {
    std::env::var("COMPUTERNAME").ok()
}

/// Returns the name of the invoking user.
///
/// Looks up the real user id, then `$USER`, then gives up with `unknown`.
#[must_use]
pub fn username() -> String {
    detect_username()
        .or_else(|| std::env::var("USER").ok())
        .or_else(|| std::env::var("USERNAME").ok())
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| "unknown".to_string())
}

#[cfg(unix)]
fn detect_username() -> Option<String> {
    use nix::unistd::{Uid, User};

    match User::from_uid(Uid::current()) {
        Ok(user) => user.map(|u| u.name),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to look up user");
            None
        }
    }
}

#[cfg(not(unix))]
const fn detect_username() -> Option<String> {
    None
}

/// Returns the current process id.
#[must_use]
pub fn pid() -> u32 {
    std::process::id()
}

/// Generates a new globally unique message identifier scoped to `domain`.
#[must_use]
pub fn message_id(domain: &str) -> String {
    format!("<{}@{}>", Uuid::new_v4().simple(), domain)
}

/// Extracts the domain from a message identifier.
///
/// Takes everything after the last `@` with trailing `>` removed; an
/// identifier without `@` is returned unchanged.
#[must_use]
pub fn domain_of(message_id: &str) -> &str {
    message_id
        .rsplit_once('@')
        .map_or(message_id, |(_, domain)| domain)
        .trim_end_matches('>')
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_message_id_format() {
        let id = message_id("example.com");
        assert!(id.starts_with('<'));
        assert!(id.ends_with("@example.com>"));
        assert_eq!(id.len(), 1 + 32 + 1 + "example.com".len() + 1);
        assert_ne!(id, message_id("example.com"));
    }

    #[test]
    fn test_domain_of() {
        assert_eq!(domain_of("<abc@example.com>"), "example.com");
        assert_eq!(domain_of("<a@b@mail.example.org>"), "mail.example.org");
        assert_eq!(domain_of("bare"), "bare");
    }

    #[test]
    fn test_identity_never_empty() {
        assert!(!hostname().is_empty());
        assert!(!username().is_empty());
        assert!(pid() > 0);
    }
}
