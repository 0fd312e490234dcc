//! `--prop key=value` parsing.

use serde_json::Value;

/// Parse `key=value`. The value is read as JSON, falling back to a plain
/// string, so `height=12` is a number and `level=forest` is a string.
pub fn parse_prop(raw: &str) -> Result<(String, Value), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got {:?}", raw))?;

    let key = key.trim();
    if key.is_empty() {
        return Err(format!("empty property name in {:?}", raw));
    }

    let value = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
    Ok((key.to_string(), value))
}
