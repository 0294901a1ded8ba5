//! Comma-joined list columns (`selected_tag`, `file_name`).
//!
//! The on-disk encoding is a plain `,` join with no escaping, so it has to stay
//! byte-for-byte identical to what is already persisted. Items that contain the
//! delimiter cannot be represented and are rejected instead of being merged.

use thiserror::Error;

pub const DELIMITER: char = ',';

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ListFieldError {
    #[error("list item {0:?} contains the ',' delimiter")]
    EmbeddedDelimiter(String),
}

/// Splits a stored column value. An empty column is an empty list.
pub fn decode_list(raw: &str) -> Vec<String> {
    if raw.is_empty() {
        return Vec::new();
    }
    raw.split(DELIMITER).map(str::to_string).collect()
}

pub fn encode_list<S: AsRef<str>>(items: &[S]) -> Result<String, ListFieldError> {
    if let Some(bad) = items.iter().find(|item| item.as_ref().contains(DELIMITER)) {
        return Err(ListFieldError::EmbeddedDelimiter(bad.as_ref().to_string()));
    }
    let parts: Vec<&str> = items.iter().map(AsRef::as_ref).collect();
    Ok(parts.join(","))
}

/// Checks a single item before it is ever added to a list.
pub fn validate_item(item: &str) -> Result<(), ListFieldError> {
    if item.contains(DELIMITER) {
        Err(ListFieldError::EmbeddedDelimiter(item.to_string()))
    } else {
        Ok(())
    }
}
