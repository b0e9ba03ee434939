//! Deserialization helpers for ledger integers that may arrive as either a
//! JSON number or a decimal string once they exceed 53 bits of precision.

use serde::{de::Error as _, Deserialize, Deserializer};
use serde_json::Value;

fn value_to_str(value: &Value) -> Option<String> {
    match value {
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) => Some(s.clone()),
        _ => None,
    }
}

/// Deserialize a field that may be a JSON number or a decimal string into `u64`.
pub fn deserialize_wide_u64<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    let text = value_to_str(&value)
        .ok_or_else(|| D::Error::custom("expected a number or decimal string"))?;
    text.parse::<u64>()
        .map_err(|err| D::Error::custom(format!("invalid u64 `{text}`: {err}")))
}

/// Same as [`deserialize_wide_u64`] but for an optional field.
pub fn deserialize_wide_u64_opt<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(other) => {
            let text = value_to_str(&other)
                .ok_or_else(|| D::Error::custom("expected a number or decimal string"))?;
            text.parse::<u64>()
                .map(Some)
                .map_err(|err| D::Error::custom(format!("invalid u64 `{text}`: {err}")))
        }
    }
}

/// Deserialize a field that may be a JSON number or a decimal string into `u128`,
/// used for ledger fields wide enough to overflow `u64` (e.g. supply digests).
pub fn deserialize_wide_u128<'de, D>(deserializer: D) -> Result<u128, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    let text = value_to_str(&value)
        .ok_or_else(|| D::Error::custom("expected a number or decimal string"))?;
    text.parse::<u128>()
        .map_err(|err| D::Error::custom(format!("invalid u128 `{text}`: {err}")))
}

/// Checked narrowing from a wide tick counter to the u32 the wire/signer expects.
pub fn tick_to_u32(tick: u64) -> Result<u32, crate::errors::ValidationError> {
    u32::try_from(tick).map_err(|_| crate::errors::ValidationError::TickOutOfU32Range(tick))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Deserialize)]
    struct Wrapper {
        #[serde(deserialize_with = "deserialize_wide_u64")]
        value: u64,
    }

    #[test]
    fn accepts_json_number() {
        let w: Wrapper = serde_json::from_str(r#"{"value": 42}"#).unwrap();
        assert_eq!(w.value, 42);
    }

    #[test]
    fn accepts_decimal_string() {
        let w: Wrapper = serde_json::from_str(r#"{"value": "18446744073709551615"}"#).unwrap();
        assert_eq!(w.value, u64::MAX);
    }

    #[test]
    fn tick_to_u32_rejects_overflow() {
        assert!(tick_to_u32(u64::from(u32::MAX) + 1).is_err());
        assert_eq!(tick_to_u32(5).unwrap(), 5);
    }
}
