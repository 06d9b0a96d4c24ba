//! Field-level tolerant deserialization for pipeline-written documents.
//!
//! The producing pipeline writes its checkpoint documents loosely: fields
//! go missing between versions, numbers turn up as strings, lists turn up
//! as `null`. Every record type in this crate marks its fields with
//! `#[serde(default, deserialize_with = "lenient")]` so a single bad
//! field degrades to its default instead of discarding the document.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};

/// Deserialize `T`, substituting `T::default()` when the value has the
/// wrong shape.
///
/// # Errors
///
/// Fails only when the underlying input is not a JSON value at all.
pub fn lenient<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(T::deserialize(value).unwrap_or_default())
}
