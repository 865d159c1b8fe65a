//! The `key=value,key=value` message-property mini-language.
//!
//! Message properties are displayed and edited as a flat comma-separated
//! string. The grammar defines no escaping mechanism, so a key or value
//! containing `=` or `,` cannot be represented unambiguously; the codec
//! splits each pair on the *first* `=` only and splits pairs on `,`. This
//! is a documented limitation inherited from the property-string format,
//! not something the codec tries to repair.

use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

/// An ordered string-to-string property mapping.
///
/// Insertion order is preserved. Re-inserting an existing key overwrites
/// its value in place, so the last occurrence wins while the key keeps the
/// position of its first occurrence.
///
/// # Examples
///
/// ```
/// use queuescope::PropertyMap;
///
/// let mut props = PropertyMap::new();
/// props.insert("trace-id", "abc123");
/// props.insert("priority", "7");
/// props.insert("trace-id", "def456");
///
/// assert_eq!(props.get("trace-id"), Some("def456"));
/// assert_eq!(props.iter().next(), Some(("trace-id", "def456")));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(transparent)]
pub struct PropertyMap {
    entries: Vec<(String, String)>,
}

impl PropertyMap {
    /// Creates an empty property map.
    #[must_use]
    pub const fn new() -> Self {
        Self { entries: Vec::new() }
    }

    /// Number of distinct keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the map holds no properties.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Looks up the value for a key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Returns true if the key is present.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.iter().any(|(k, _)| k == key)
    }

    /// Inserts a property, overwriting the value in place if the key
    /// already exists. Returns the previous value, if any.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, existing)) => Some(std::mem::replace(existing, value)),
            None => {
                self.entries.push((key, value));
                None
            }
        }
    }

    /// Removes a property, returning its value if it was present.
    pub fn remove(&mut self, key: &str) -> Option<String> {
        let idx = self.entries.iter().position(|(k, _)| k == key)?;
        Some(self.entries.remove(idx).1)
    }

    /// Iterates over `(key, value)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl FromIterator<(String, String)> for PropertyMap {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        let mut map = Self::new();
        for (k, v) in iter {
            map.insert(k, v);
        }
        map
    }
}

// Deserialization funnels through `insert` so the no-duplicate-keys
// invariant holds even for hand-written input.
impl<'de> Deserialize<'de> for PropertyMap {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let entries = Vec::<(String, String)>::deserialize(deserializer)?;
        Ok(entries.into_iter().collect())
    }
}

/// Errors parsing a property string.
///
/// Parse errors are always local and synchronous: they are raised before
/// any network call, and the input they reject can be corrected and
/// re-submitted without touching the broker.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PropertyParseError {
    /// A comma-separated segment contains no `=`.
    #[error("property {position} has no '=' separator: '{segment}'")]
    MissingSeparator {
        segment: String,
        position: usize,
    },

    /// A segment has an `=` but nothing before it.
    #[error("property {position} has an empty key")]
    EmptyKey {
        position: usize,
    },
}

/// Parses a `key=value,key=value` string into an ordered map.
///
/// Each pair is split on the first `=` only; pairs are split on `,` with
/// no escaping. Keys and values are trimmed of surrounding whitespace.
/// Duplicate keys keep the position of the first occurrence and the value
/// of the last. Empty or whitespace-only input parses to an empty map.
///
/// # Errors
///
/// Returns [`PropertyParseError`] if a segment has no `=` or an empty key.
/// The `position` in the error is 1-based.
pub fn parse(text: &str) -> Result<PropertyMap, PropertyParseError> {
    let text = text.trim();
    if text.is_empty() {
        return Ok(PropertyMap::new());
    }

    let mut map = PropertyMap::new();
    for (idx, segment) in text.split(',').enumerate() {
        let position = idx + 1;
        let Some((key, value)) = segment.split_once('=') else {
            return Err(PropertyParseError::MissingSeparator {
                segment: segment.trim().to_string(),
                position,
            });
        };
        let key = key.trim();
        if key.is_empty() {
            return Err(PropertyParseError::EmptyKey { position });
        }
        map.insert(key, value.trim());
    }
    Ok(map)
}

/// Serializes a property map back to `key=value,key=value` form.
///
/// This is the left inverse of [`parse`] for any map whose keys and values
/// contain neither `=` nor `,`.
#[must_use]
pub fn serialize(properties: &PropertyMap) -> String {
    let mut out = String::new();
    for (i, (key, value)) in properties.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        out.push_str(key);
        out.push('=');
        out.push_str(value);
    }
    out
}
