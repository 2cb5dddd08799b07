//! Canonical JSON encoding used as the input to every fingerprint.
//!
//! Object keys are sorted (BTreeMap) so map insertion order never affects the
//! digest; array order is preserved since array order is semantically
//! meaningful for steps (e.g. `cols` on an index). String values are passed
//! through [`normalize_whitespace`] first so trailing/interior whitespace
//! differences in SQL-bearing fields don't change the fingerprint.

use serde_json::Value;
use std::collections::BTreeMap;

/// Trims leading/trailing whitespace and collapses interior runs of
/// whitespace to a single space, so semantically-identical SQL text with
/// different formatting still fingerprints the same way.
pub fn normalize_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub fn to_canonical_json(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => serde_json::to_string(&normalize_whitespace(s)).unwrap(),
        Value::Array(arr) => {
            let items: Vec<String> = arr.iter().map(to_canonical_json).collect();
            format!("[{}]", items.join(","))
        }
        Value::Object(map) => {
            let mut tree = BTreeMap::new();
            for (k, v) in map {
                tree.insert(k, to_canonical_json(v));
            }
            let items: Vec<String> = tree.into_iter()
                                         .map(|(k, v)| format!("{}:{}", serde_json::to_string(k).unwrap(), v))
                                         .collect();
            format!("{{{}}}", items.join(","))
        }
    }
}
