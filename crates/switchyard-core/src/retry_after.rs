//! Retry-After hint parsing
//!
//! Provider clients use this to turn a 429 response's `retry-after` header into
//! the cooldown carried by `Error::RateLimited`. Both the numeric (seconds)
//! and the HTTP-date (RFC 7231) forms are accepted.

use std::time::Duration;
use tracing::debug;

/// Parse a `retry-after` header value into a cooldown duration.
///
/// Returns `None` when the value cannot be parsed; a date in the past yields
/// a zero duration.
///
/// ```
/// use std::time::Duration;
/// use switchyard_core::parse_retry_after;
///
/// assert_eq!(parse_retry_after("60"), Some(Duration::from_secs(60)));
/// assert_eq!(parse_retry_after("invalid"), None);
/// ```
pub fn parse_retry_after(header_value: &str) -> Option<Duration> {
    if let Ok(seconds) = header_value.trim().parse::<u64>() {
        return Some(Duration::from_secs(seconds));
    }

    if let Ok(target_time) = chrono::DateTime::parse_from_rfc2822(header_value.trim()) {
        let remaining = target_time.signed_duration_since(chrono::Utc::now());

        // A date in the past means we can retry immediately
        return Some(remaining.to_std().unwrap_or(Duration::ZERO));
    }

    debug!(
        header_value = header_value,
        "Failed to parse retry-after header"
    );
    None
}
