//! Telnyx client errors

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TelnyxError {
    #[error("Telnyx API key is not configured")]
    NotConfigured,

    #[error("Telnyx {0} is not configured")]
    MissingSetting(&'static str),

    /// Error response from the Telnyx API, with its HTTP status
    #[error("{message}")]
    Api { status: u16, message: String },

    #[error("request to Telnyx failed: {0}")]
    Transport(String),

    #[error("unexpected response from Telnyx: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for TelnyxError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            TelnyxError::Decode(err.to_string())
        } else {
            TelnyxError::Transport(err.to_string())
        }
    }
}

/// Best-effort human message from a Telnyx error body.
///
/// Telnyx reports failures as `{"errors": [{"code", "title", "detail"}]}`;
/// prefer the first detail, then its title, then the raw body.
pub fn extract_error_message(body: &str) -> String {
    let parsed: Option<serde_json::Value> = serde_json::from_str(body).ok();
    let first = parsed
        .as_ref()
        .and_then(|v| v.get("errors"))
        .and_then(|errors| errors.get(0));

    first
        .and_then(|e| e.get("detail"))
        .and_then(|d| d.as_str())
        .or_else(|| first.and_then(|e| e.get("title")).and_then(|t| t.as_str()))
        .map(str::to_string)
        .unwrap_or_else(|| {
            let trimmed = body.trim();
            if trimmed.is_empty() {
                "empty error response".to_string()
            } else {
                trimmed.to_string()
            }
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_prefers_detail() {
        let body = r#"{"errors":[{"code":"10005","title":"Resource not found","detail":"Call has already ended"}]}"#;
        assert_eq!(extract_error_message(body), "Call has already ended");
    }

    #[test]
    fn test_extract_falls_back_to_title() {
        let body = r#"{"errors":[{"code":"10015","title":"Invalid destination"}]}"#;
        assert_eq!(extract_error_message(body), "Invalid destination");
    }

    #[test]
    fn test_extract_falls_back_to_raw_body() {
        assert_eq!(extract_error_message("Bad Gateway\n"), "Bad Gateway");
        assert_eq!(extract_error_message(""), "empty error response");
    }
}
