//! Lenient field deserializers for platform records.
//!
//! The discovery API omits fields, sends `null` for them, and is inconsistent
//! about whether timestamps are numbers or strings. These helpers map all of
//! that onto plain Rust values.

use serde::de::Error;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use watchman_core::types::ts_seconds;

/// Deserialize `null` as the type's default value.
pub(crate) fn nullable<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Deserialize an epoch timestamp sent as an integer, a float or a
/// `seconds.micros` string. `null` and `""` become 0.
#[allow(clippy::cast_possible_truncation)]
pub(crate) fn epoch<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(0),
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f.trunc() as i64))
            .ok_or_else(|| D::Error::custom(format!("timestamp out of range: {n}"))),
        Some(Value::String(s)) if s.is_empty() => Ok(0),
        Some(Value::String(s)) => {
            ts_seconds(&s).ok_or_else(|| D::Error::custom(format!("invalid timestamp {s:?}")))
        }
        Some(other) => Err(D::Error::custom(format!("invalid timestamp {other}"))),
    }
}
