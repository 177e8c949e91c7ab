//! Id handling at the API boundary.
//!
//! Clients send media ids as JSON strings or numbers; everything is stored and
//! returned as strings. Server-generated record ids are UUID v4 strings.

use serde_json::Value;
use uuid::Uuid;

use crate::error::{AppError, Result};

pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}

/// Normalizes a loosely typed JSON scalar into a string key.
///
/// Blank strings, `null`, booleans and containers count as absent.
pub fn value_key(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) => {
            let s = s.trim();
            (!s.is_empty()).then(|| s.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Trims an optional string field, treating blanks as absent.
pub fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|s| !s.is_empty())
}

/// Validates a server-generated record id.
pub fn parse_record_id(raw: &str) -> Result<String> {
    Uuid::parse_str(raw.trim())
        .map(|id| id.to_string())
        .map_err(|_| AppError::InvalidId)
}
