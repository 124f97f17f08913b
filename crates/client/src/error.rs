//! Transport-level error taxonomy.
//!
//! Every call through the gateway resolves to one [`ApiError`] class:
//! authentication rejection is handled centrally (session teardown) and
//! merely reported here; validation, permission, transient, and
//! malformed-response failures are surfaced to the calling screen, which
//! owns the user-facing message. No prior state is altered by any of the
//! non-authentication classes.

use std::collections::BTreeMap;

use thiserror::Error;

/// Errors produced by the request gateway and the clients built on it.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Transport failed before a response was received (DNS, refused
    /// connection, timeout). Retryable.
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The service rejected the credential. The gateway has already torn
    /// the session down by the time a caller sees this.
    #[error("authentication rejected")]
    Unauthorized,

    /// Structured per-field rejection of the submitted payload.
    #[error("validation failed: {0}")]
    Validation(FieldErrors),

    /// Authenticated but not allowed to perform the operation.
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// Resource does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Rate limited by the service.
    #[error("rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// Server-side failure. Retryable.
    #[error("server error: HTTP {0}")]
    Server(u16),

    /// The response decoded to something other than the documented shape.
    #[error("unexpected response: {0}")]
    Malformed(String),

    /// The request path did not resolve against the configured base URL.
    #[error("invalid request URL: {0}")]
    Url(String),
}

impl ApiError {
    /// Whether retrying the same call may succeed without any other change.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Http(_) | Self::Server(_) | Self::RateLimited(_)
        )
    }
}

/// Per-field validation messages in the commerce service's shape: an object
/// mapping field names to message lists, with `detail` and
/// `non_field_errors` as form-level messages.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors {
    /// Messages keyed by field name, in field order.
    pub fields: BTreeMap<String, Vec<String>>,
    /// Form-level messages not tied to a field.
    pub general: Vec<String>,
}

impl FieldErrors {
    /// No messages at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.general.is_empty()
    }

    /// Record a message against a field.
    pub fn push_field(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.fields
            .entry(field.into())
            .or_default()
            .push(message.into());
    }

    /// Record a form-level message.
    pub fn push_general(&mut self, message: impl Into<String>) {
        self.general.push(message.into());
    }

    /// Parse the commerce service's error body. Unknown shapes yield an
    /// empty set rather than an error; the caller falls back to a generic
    /// message.
    #[must_use]
    pub fn from_body(body: &str) -> Self {
        let mut errors = Self::default();
        let Ok(serde_json::Value::Object(map)) = serde_json::from_str(body) else {
            return errors;
        };

        for (key, value) in map {
            let messages: Vec<String> = match value {
                serde_json::Value::String(message) => vec![message],
                serde_json::Value::Array(items) => items
                    .into_iter()
                    .filter_map(|item| item.as_str().map(String::from))
                    .collect(),
                _ => continue,
            };
            if messages.is_empty() {
                continue;
            }
            if key == "detail" || key == "non_field_errors" {
                errors.general.extend(messages);
            } else {
                errors.fields.entry(key).or_default().extend(messages);
            }
        }
        errors
    }
}

impl std::fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_empty() {
            return f.write_str("(no error details provided)");
        }

        let mut parts: Vec<String> = self.general.clone();
        for (field, messages) in &self.fields {
            parts.push(format!("{field}: {}", messages.join(" / ")));
        }
        f.write_str(&parts.join("; "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_body_field_arrays() {
        let body = r#"{"username": ["This field is required."], "price": ["Must be > 0", "Too cheap"]}"#;
        let errors = FieldErrors::from_body(body);
        assert_eq!(
            errors.fields.get("username"),
            Some(&vec!["This field is required.".to_string()])
        );
        assert_eq!(
            errors.fields.get("price").map(Vec::len),
            Some(2)
        );
        assert!(errors.general.is_empty());
    }

    #[test]
    fn test_from_body_detail_and_non_field() {
        let body = r#"{"detail": "Invalid input.", "non_field_errors": ["Passwords do not match"]}"#;
        let errors = FieldErrors::from_body(body);
        assert!(errors.fields.is_empty());
        assert_eq!(errors.general.len(), 2);
    }

    #[test]
    fn test_from_body_garbage_is_empty() {
        assert!(FieldErrors::from_body("not json").is_empty());
        assert!(FieldErrors::from_body("[1, 2]").is_empty());
    }

    #[test]
    fn test_display_joins_messages() {
        let mut errors = FieldErrors::default();
        errors.push_general("Fix the form");
        errors.push_field("name", "required");
        assert_eq!(errors.to_string(), "Fix the form; name: required");
    }

    #[test]
    fn test_display_empty() {
        assert_eq!(
            FieldErrors::default().to_string(),
            "(no error details provided)"
        );
    }

    #[test]
    fn test_retryable_classes() {
        assert!(ApiError::Server(502).is_retryable());
        assert!(ApiError::RateLimited(3).is_retryable());
        assert!(!ApiError::Unauthorized.is_retryable());
        assert!(!ApiError::Validation(FieldErrors::default()).is_retryable());
    }
}
