use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Storage key of the scan history collection.
pub const SCAN_HISTORY_KEY: &str = "qrScanHistory";

/// One successful decode, as kept in scan history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanRecord {
    /// Decoded payload. Stored as `url` because most scanned codes are links.
    #[serde(rename = "url")]
    pub text: String,
    /// When the code was captured.
    pub timestamp: DateTime<Utc>,
}

impl ScanRecord {
    pub fn new(text: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            text: text.into(),
            timestamp,
        }
    }

    /// Whether the payload is an `http`/`https` link.
    pub fn is_web_link(&self) -> bool {
        is_web_link(&self.text)
    }
}

/// Returns true for `http://` or `https://` URLs with a non-empty host.
pub fn is_web_link(text: &str) -> bool {
    let text = text.trim();
    let rest = text
        .strip_prefix("https://")
        .or_else(|| text.strip_prefix("http://"));
    rest.and_then(|r| r.split(['/', '?', '#']).next())
        .is_some_and(|host| !host.is_empty() && !host.contains(char::is_whitespace))
}

/// Turns scanned text into something a browser can open, assuming `https`
/// when no scheme is present.
pub fn normalize_link(text: &str) -> String {
    let text = text.trim();
    if text.starts_with("http://") || text.starts_with("https://") {
        text.to_owned()
    } else {
        format!("https://{text}")
    }
}
