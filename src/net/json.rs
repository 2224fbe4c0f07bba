//! JSON extraction helpers for provider API responses.
//!
//! Provider APIs (GraphQL in particular) wrap the interesting data several
//! levels deep. These helpers navigate with dot paths instead of declaring a
//! struct for every envelope.
//!
//! ```rust
//! use eizo::net::json;
//! use serde_json::json;
//!
//! let data = json!({
//!     "data": {
//!         "shows": {
//!             "edges": [
//!                 {"_id": "abc", "name": "Frieren"},
//!                 {"_id": "def", "name": "Dandadan"}
//!             ]
//!         }
//!     }
//! });
//!
//! let edges = json::extract_array(&data, "data.shows.edges");
//! assert_eq!(edges.len(), 2);
//! ```

use serde_json::Value;

/// Extracts a value from nested JSON using dot notation.
///
/// Numeric segments index into arrays (`"edges.0.name"`).
pub fn extract_path<'a>(json: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = json;

    for key in path.split('.') {
        current = match current {
            Value::Array(items) => items.get(key.parse::<usize>().ok()?)?,
            _ => current.get(key)?,
        };
    }

    Some(current)
}

/// Extracts the array at `path`, or an empty vector when absent or not an array.
pub fn extract_array(json: &Value, path: &str) -> Vec<Value> {
    extract_path(json, path)
        .and_then(|v| v.as_array().cloned())
        .unwrap_or_default()
}
