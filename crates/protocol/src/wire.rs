//! Batch wire format fragments
//!
//! Must be reproduced byte-for-byte for server compatibility.

use chrono::{SecondsFormat, Utc};

/// Written when a batch file is opened
pub const BATCH_HEADER: &str = "{\"batch\":[";

/// Written between two events in the same batch
pub const BATCH_SEPARATOR: &str = ",";

/// Footer that closes a batch file
///
/// The write key is emitted as a JSON string literal, escaped as needed.
pub fn batch_footer(sent_at: &str, write_key: &str) -> String {
    format!(
        "],\"sentAt\":\"{}\",\"writeKey\":{}}}",
        sent_at,
        serde_json::Value::from(write_key)
    )
}

/// Current UTC time as ISO8601 with millisecond precision
pub fn iso8601_now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}
