//! Snippet extraction
//!
//! A hit's snippet is its highlight fragments when the index returned any. Queries that
//! highlight nothing (match-all) fall back to the hit's stored source.

use serde_json::{Map, Value};
use tracing::trace;

/// All fragments of all fields, space-separated, in response order
pub fn from_fragments(highlight: &Map<String, Value>) -> String {
    let mut parts: Vec<&str> = Vec::new();
    for (field, fragments) in highlight {
        match fragments {
            Value::Array(items) => parts.extend(items.iter().filter_map(Value::as_str)),
            Value::String(s) => parts.push(s.as_str()),
            _ => trace!(field = field.as_str(), "Skipping unexpected highlight shape"),
        }
    }
    parts.join(" ")
}

/// Source values of `fields` joined in order, truncated to `max_length` characters
pub fn from_source(source: &Value, fields: &[String], max_length: usize) -> String {
    let text = fields
        .iter()
        .flat_map(|field| values_at(source, field))
        .collect::<Vec<_>>()
        .join(" ");
    truncate(&text, max_length)
}

/// Text of every value stored at a dotted `path`; arrays are space-joined
pub fn values_at(source: &Value, path: &str) -> Vec<String> {
    let mut current = vec![source];
    for segment in path.split('.') {
        let mut next = Vec::new();
        for value in current {
            match value {
                Value::Object(map) => next.extend(map.get(segment)),
                Value::Array(items) => next.extend(
                    items
                        .iter()
                        .filter_map(|item| item.as_object().and_then(|m| m.get(segment))),
                ),
                _ => {}
            }
        }
        current = next;
    }
    current.into_iter().filter_map(scalar_text).collect()
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Array(items) => {
            let parts: Vec<String> = items.iter().filter_map(scalar_text).collect();
            if parts.is_empty() {
                None
            } else {
                Some(parts.join(" "))
            }
        }
        Value::Null | Value::Object(_) => None,
    }
}

/// First `max_length` characters of `text`
pub fn truncate(text: &str, max_length: usize) -> String {
    match text.char_indices().nth(max_length) {
        Some((end, _)) => text[..end].to_string(),
        None => text.to_string(),
    }
}
