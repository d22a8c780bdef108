//! Shared helpers for provider implementations

use crate::error::Error;
use reqwest::StatusCode;

/// Visible suffix length for masked keys
const KEY_VISIBLE_SUFFIX: usize = 4;

/// Keys at or below this length are fully masked
const KEY_MIN_MASKABLE: usize = 10;

/// Mask an API key for Debug output and logs
///
/// Keeps only the last four characters of sufficiently long keys.
#[must_use]
pub fn mask_key(key: &str) -> String {
    if key.len() <= KEY_MIN_MASKABLE {
        return "****".to_string();
    }
    format!("****{}", &key[key.len() - KEY_VISIBLE_SUFFIX..])
}

/// Map a non-success HTTP response to a provider error
///
/// Auth-shaped failures are reduced to a generic message so credentials never
/// leak through error text; 429 becomes a typed rate-limit error.
#[must_use]
pub fn classify_api_error(status: StatusCode, body: &str) -> Error {
    if status == StatusCode::TOO_MANY_REQUESTS {
        return Error::RateLimit;
    }
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return Error::Api(format!("authentication rejected (HTTP {})", status.as_u16()));
    }

    let mut message = body.trim().to_string();
    if message.len() > 300 {
        let mut end = 300;
        while !message.is_char_boundary(end) {
            end -= 1;
        }
        message.truncate(end);
        message.push_str("...(truncated)");
    }
    Error::Api(format!("HTTP {}: {message}", status.as_u16()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_key_long() {
        let masked = mask_key("sk-1234567890abcdef");
        assert_eq!(masked, "****cdef");
        assert!(!masked.contains("1234"));
    }

    #[test]
    fn test_mask_key_short() {
        assert_eq!(mask_key("short"), "****");
        assert_eq!(mask_key(""), "****");
    }

    #[test]
    fn test_classify_rate_limit() {
        let err = classify_api_error(StatusCode::TOO_MANY_REQUESTS, "slow down");
        assert!(matches!(err, Error::RateLimit));
    }

    #[test]
    fn test_classify_auth_hides_body() {
        let err = classify_api_error(StatusCode::UNAUTHORIZED, "bad key sk-secret");
        assert!(!err.to_string().contains("sk-secret"));
    }

    #[test]
    fn test_classify_truncates_long_body() {
        let body = "x".repeat(1000);
        let err = classify_api_error(StatusCode::BAD_REQUEST, &body);
        assert!(err.to_string().contains("...(truncated)"));
        assert!(err.to_string().len() < 400);
    }
}
