//! Defensive serde boundary for JSON-as-text persistence fields
//!
//! The repository layer stores several sub-structures (codes, child
//! references, tags, version history) as opaque JSON text columns. Each field
//! gets its own decode function that returns an empty collection on any parse
//! failure instead of an error: one corrupt record must never abort a batch
//! match or validation over the whole library. Failures are logged at `warn`
//! so corruption is visible without being fatal.
//!
//! Encoding these shapes is infallible; they contain nothing that can fail
//! to serialize.

use crate::component::{Code, ComponentReference, ValueSet, VersionRecord};
use serde::Serialize;
use serde::de::DeserializeOwned;

fn decode_list<T: DeserializeOwned>(raw: &str, field: &str) -> Vec<T> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Vec::new();
    }
    match serde_json::from_str(trimmed) {
        Ok(values) => values,
        Err(err) => {
            log::warn!("discarding malformed persisted {field}: {err}");
            Vec::new()
        }
    }
}

fn encode_list<T: Serialize>(values: &[T]) -> String {
    // These shapes serialize unconditionally; an error here would be a bug
    // in the model types, not in caller data.
    serde_json::to_string(values).unwrap_or_else(|_| "[]".to_string())
}

/// Decode a persisted code list; malformed input yields an empty list
pub fn decode_codes(raw: &str) -> Vec<Code> {
    decode_list(raw, "code list")
}

/// Encode a code list for persistence
pub fn encode_codes(codes: &[Code]) -> String {
    encode_list(codes)
}

/// Decode persisted composite children; malformed input yields an empty list
pub fn decode_children(raw: &str) -> Vec<ComponentReference> {
    decode_list(raw, "child references")
}

/// Encode composite children for persistence
pub fn encode_children(children: &[ComponentReference]) -> String {
    encode_list(children)
}

/// Decode persisted tags; malformed input yields an empty list
pub fn decode_tags(raw: &str) -> Vec<String> {
    decode_list(raw, "tags")
}

/// Encode tags for persistence
pub fn encode_tags(tags: &[String]) -> String {
    encode_list(tags)
}

/// Decode persisted version history; malformed input yields an empty list
pub fn decode_version_history(raw: &str) -> Vec<VersionRecord> {
    decode_list(raw, "version history")
}

/// Encode version history for persistence
pub fn encode_version_history(records: &[VersionRecord]) -> String {
    encode_list(records)
}

/// Decode persisted additional value sets; malformed input yields an empty
/// list
pub fn decode_value_sets(raw: &str) -> Vec<ValueSet> {
    decode_list(raw, "value sets")
}

/// Encode value sets for persistence
pub fn encode_value_sets(value_sets: &[ValueSet]) -> String {
    encode_list(value_sets)
}
