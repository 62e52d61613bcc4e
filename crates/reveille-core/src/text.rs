//! Optional free-text fields.
//!
//! Persisted records store a missing description as an empty string, so
//! blank text and `None` are treated as the same value in both directions.

use serde::{Deserialize, Deserializer, Serializer};

pub(crate) fn normalize(text: Option<String>) -> Option<String> {
    text.map(|t| t.trim().to_string()).filter(|t| !t.is_empty())
}

pub(crate) mod optional {
    use super::*;

    pub fn serialize<S>(text: &Option<String>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(text.as_deref().unwrap_or(""))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(normalize(raw))
    }
}
