use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::models::errors::CatalogError;
use crate::Result;

/// Pretty JSON with a trailing newline, so unchanged records produce no diff
/// between writes.
pub fn serialize_catalog<T: Serialize>(records: &[T]) -> Result<String> {
    let mut json = serde_json::to_string_pretty(records)?;
    json.push('\n');

    Ok(json)
}

pub fn encode_catalog<T: Serialize>(records: &[T]) -> Result<String> {
    Ok(STANDARD.encode(serialize_catalog(records)?))
}

/// The contents API wraps base64 at 60 columns.
pub fn decode_content(content: &str) -> Result<Vec<u8>> {
    let compact = content
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect::<String>();

    Ok(STANDARD.decode(compact)?)
}

pub fn parse_catalog<T: DeserializeOwned>(bytes: &[u8]) -> Result<Vec<T>> {
    let value: Value = serde_json::from_slice(bytes)?;

    if !value.is_array() {
        return Err(CatalogError::malformed("Catalog content is not an array"));
    }

    Ok(serde_json::from_value(value)?)
}

#[cfg(test)]
pub fn decode_catalog<T: DeserializeOwned>(content: &str) -> Result<Vec<T>> {
    parse_catalog(&decode_content(content)?)
}
