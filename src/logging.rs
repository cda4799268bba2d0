use std::fmt;

use tracing_subscriber::EnvFilter;

use crate::models::StudentId;

pub const DEFAULT_LOG_FILTER: &str = "info";

/// Installs the global subscriber. Output goes to stderr so stdout only
/// carries rendered results. `RUST_LOG` overrides the default filter.
pub fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Email with the local part masked
#[derive(Debug, Clone)]
pub struct SanitizedEmail(String);

impl SanitizedEmail {
    pub fn new(email: impl AsRef<str>) -> Self {
        Self(Self::sanitize(email.as_ref().trim()))
    }

    fn sanitize(email: &str) -> String {
        match email.split_once('@') {
            Some((local, domain)) => {
                let masked_local = match local.chars().next() {
                    Some(first) if local.chars().count() > 2 => format!("{first}***"),
                    _ => "*".repeat(local.chars().count()),
                };
                format!("{masked_local}@{domain}")
            }
            None if email.is_empty() => String::new(),
            None => "***@***".to_string(),
        }
    }
}

impl fmt::Display for SanitizedEmail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Only the initials of a person's name
#[derive(Debug, Clone)]
pub struct SanitizedName(String);

impl SanitizedName {
    pub fn new(first: &str, last: &str) -> Self {
        let initial = |part: &str| {
            part.trim()
                .chars()
                .next()
                .map(|c| format!("{c}."))
                .unwrap_or_else(|| "?".to_string())
        };
        Self(format!("{} {}", initial(first), initial(last)))
    }
}

impl fmt::Display for SanitizedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct LoggableStudentId(pub StudentId);

impl fmt::Display for LoggableStudentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<StudentId> for LoggableStudentId {
    fn from(id: StudentId) -> Self {
        LoggableStudentId(id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventSeverity {
    Info,
    Warn,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationEvent {
    Accepted,
    Rejected,
    Persisted,
    PersistenceFailed,
    SequenceResumed,
}

impl RegistrationEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            RegistrationEvent::Accepted => "registration_accepted",
            RegistrationEvent::Rejected => "registration_rejected",
            RegistrationEvent::Persisted => "registration_persisted",
            RegistrationEvent::PersistenceFailed => "registration_persistence_failed",
            RegistrationEvent::SequenceResumed => "sequence_resumed",
        }
    }

    /// An accepted record that never reached the store is an error; a
    /// rejected form only needs a look.
    pub fn severity(&self) -> EventSeverity {
        match self {
            RegistrationEvent::PersistenceFailed => EventSeverity::Error,
            RegistrationEvent::Rejected => EventSeverity::Warn,
            RegistrationEvent::Accepted
            | RegistrationEvent::Persisted
            | RegistrationEvent::SequenceResumed => EventSeverity::Info,
        }
    }
}

impl fmt::Display for RegistrationEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Log a registration event with sanitized context
#[macro_export]
macro_rules! log_registration_event {
    ($event:expr, $($field:tt)*) => {
        match $event.severity() {
            $crate::logging::EventSeverity::Error => tracing::error!(
                registration_event = %$event,
                event_type = "registration",
                $($field)*
            ),
            $crate::logging::EventSeverity::Warn => tracing::warn!(
                registration_event = %$event,
                event_type = "registration",
                $($field)*
            ),
            $crate::logging::EventSeverity::Info => tracing::info!(
                registration_event = %$event,
                event_type = "registration",
                $($field)*
            ),
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_email() {
        assert_eq!(
            SanitizedEmail::new("student@example.com").to_string(),
            "s***@example.com"
        );
        assert_eq!(SanitizedEmail::new("ab@uni.edu").to_string(), "**@uni.edu");
        assert_eq!(SanitizedEmail::new(" a@uni.edu ").to_string(), "*@uni.edu");
        assert_eq!(SanitizedEmail::new("not-an-email").to_string(), "***@***");
        assert_eq!(SanitizedEmail::new("   ").to_string(), "");
    }

    #[test]
    fn test_sanitize_name() {
        assert_eq!(SanitizedName::new(" Ada", "Lovelace").to_string(), "A. L.");
        assert_eq!(SanitizedName::new("", "Lovelace").to_string(), "? L.");
    }

    #[test]
    fn test_event_severity() {
        assert_eq!(RegistrationEvent::PersistenceFailed.severity(), EventSeverity::Error);
        assert_eq!(RegistrationEvent::Rejected.severity(), EventSeverity::Warn);
        assert_eq!(RegistrationEvent::Accepted.severity(), EventSeverity::Info);
        assert_eq!(RegistrationEvent::SequenceResumed.severity(), EventSeverity::Info);
        assert_eq!(RegistrationEvent::Persisted.to_string(), "registration_persisted");
    }

    #[test]
    fn test_loggable_student_id() {
        let id = StudentId::new(2025, 42);
        assert_eq!(LoggableStudentId::from(id).to_string(), "2025-00042");
    }
}
