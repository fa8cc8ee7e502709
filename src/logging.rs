use std::fmt;

use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "talent_vault=info";

/// Installs the global fmt subscriber. `RUST_LOG` overrides the default filter.
pub fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Sanitized wrapper for email addresses that masks the local part
#[derive(Debug, Clone)]
pub struct SanitizedEmail(String);

impl SanitizedEmail {
    pub fn new(email: impl AsRef<str>) -> Self {
        Self(Self::sanitize(email.as_ref()))
    }

    fn sanitize(email: &str) -> String {
        if let Some((local, domain)) = email.split_once('@') {
            let mut chars = local.chars();
            let masked_local = match (chars.next(), local.chars().count()) {
                (Some(first), len) if len > 2 => format!("{first}***"),
                (_, len) => "*".repeat(len),
            };
            format!("{}@{}", masked_local, domain)
        } else {
            // Not an address at all, mask entirely
            "***@***".to_string()
        }
    }
}

impl fmt::Display for SanitizedEmail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Sanitized wrapper for IP addresses that masks the last octet
#[derive(Debug, Clone)]
pub struct SanitizedIpAddr(String);

impl SanitizedIpAddr {
    pub fn new(ip: impl fmt::Display) -> Self {
        Self(Self::sanitize(&ip.to_string()))
    }

    fn sanitize(ip: &str) -> String {
        if ip.contains(':') {
            match ip.rfind(':') {
                Some(last_colon) => format!("{}:****", &ip[..last_colon]),
                None => "***".to_string(),
            }
        } else if let Some(last_dot) = ip.rfind('.') {
            format!("{}.***", &ip[..last_dot])
        } else {
            "***".to_string()
        }
    }
}

impl fmt::Display for SanitizedIpAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Security event types for structured logging
#[derive(Debug, Clone, Copy)]
pub enum SecurityEvent {
    SignInSuccess,
    SignInFailure,
    AccountCreated,
    AccountCreationFailure,
    SignOut,
    SubmissionRejected,
    DuplicateSubmission,
    RateLimitExceeded,
}

impl SecurityEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            SecurityEvent::SignInSuccess => "sign_in_success",
            SecurityEvent::SignInFailure => "sign_in_failure",
            SecurityEvent::AccountCreated => "account_created",
            SecurityEvent::AccountCreationFailure => "account_creation_failure",
            SecurityEvent::SignOut => "sign_out",
            SecurityEvent::SubmissionRejected => "submission_rejected",
            SecurityEvent::DuplicateSubmission => "duplicate_submission",
            SecurityEvent::RateLimitExceeded => "rate_limit_exceeded",
        }
    }

    pub fn is_critical(&self) -> bool {
        matches!(
            self,
            SecurityEvent::SignInFailure
                | SecurityEvent::DuplicateSubmission
                | SecurityEvent::RateLimitExceeded
        )
    }
}

impl fmt::Display for SecurityEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Log a security event with sanitized context
#[macro_export]
macro_rules! log_security_event {
    ($event:expr, $($field:tt)*) => {
        if $event.is_critical() {
            tracing::warn!(
                security_event = %$event,
                event_type = "security",
                $($field)*
            );
        } else {
            tracing::info!(
                security_event = %$event,
                event_type = "security",
                $($field)*
            );
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_email() {
        assert_eq!(
            SanitizedEmail::new("user@example.com").to_string(),
            "u***@example.com"
        );
        assert_eq!(
            SanitizedEmail::new("ab@test.com").to_string(),
            "**@test.com"
        );
        assert_eq!(SanitizedEmail::new("a@test.com").to_string(), "*@test.com");
        assert_eq!(SanitizedEmail::new("invalid-email").to_string(), "***@***");
    }

    #[test]
    fn test_sanitize_email_with_multibyte_local_part() {
        assert_eq!(
            SanitizedEmail::new("éric@example.com").to_string(),
            "é***@example.com"
        );
    }

    #[test]
    fn test_sanitize_ip() {
        assert_eq!(
            SanitizedIpAddr::new("192.168.1.100").to_string(),
            "192.168.1.***"
        );
        assert_eq!(
            SanitizedIpAddr::new("2001:0db8:85a3:0000:0000:8a2e:0370:7334").to_string(),
            "2001:0db8:85a3:0000:0000:8a2e:0370:****"
        );
        assert_eq!(
            SanitizedIpAddr::new("::ffff:10.0.0.1").to_string(),
            "::ffff:****"
        );
    }

    #[test]
    fn test_security_event_critical() {
        assert!(SecurityEvent::SignInFailure.is_critical());
        assert!(SecurityEvent::RateLimitExceeded.is_critical());
        assert!(!SecurityEvent::SignInSuccess.is_critical());
        assert_eq!(SecurityEvent::AccountCreated.to_string(), "account_created");
    }
}
