//! Repairs the pool source's loose typing before strict decoding.
//!
//! Some pools report numbers as JSON strings (`"estimate_current": "0.0042"`).
//! Every string value except the name is parsed as a float in place.

use serde_json::{Map, Number, Value};

use crate::error::{IngestError, Result};

/// The only field that is a genuine string
pub const NAME_FIELD: &str = "name";

/// What to do with a reading that cannot be coerced or decoded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CoercionPolicy {
    /// Abort the whole run
    #[default]
    Abort,
    /// Log and drop the reading, keep the rest of the batch
    SkipReading,
}

pub fn normalize_reading(fields: &mut Map<String, Value>) -> Result<()> {
    for (key, value) in fields.iter_mut() {
        if key == NAME_FIELD {
            continue;
        }
        if let Value::String(raw) = value {
            let number = coerce_number(key, raw)?;
            *value = Value::Number(number);
        }
    }
    Ok(())
}

fn coerce_number(key: &str, raw: &str) -> Result<Number> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .and_then(Number::from_f64)
        .ok_or_else(|| IngestError::DataCoercion {
            key: key.to_string(),
            value: raw.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {}", other),
        }
    }

    #[test]
    fn test_string_numbers_become_floats() {
        let mut fields = object(json!({
            "name": "x16r",
            "estimate_current": "0.0042",
            "hashrate_shared": "1500000",
            "port": 3636,
        }));

        normalize_reading(&mut fields).unwrap();

        assert_eq!(fields["estimate_current"].as_f64(), Some(0.0042));
        assert_eq!(fields["hashrate_shared"].as_f64(), Some(1_500_000.0));
        assert!(fields["estimate_current"].is_number());
        assert_eq!(fields["port"], json!(3636));
    }

    #[test]
    fn test_name_is_never_coerced() {
        let mut fields = object(json!({ "name": "12345", "fees": "0.5" }));

        normalize_reading(&mut fields).unwrap();

        assert_eq!(fields["name"], json!("12345"));
        assert_eq!(fields["fees"].as_f64(), Some(0.5));
    }

    #[test]
    fn test_whitespace_is_tolerated() {
        let mut fields = object(json!({ "name": "sha256", "mbtc_mh_factor": " 1000 " }));
        normalize_reading(&mut fields).unwrap();
        assert_eq!(fields["mbtc_mh_factor"].as_f64(), Some(1000.0));
    }

    #[test]
    fn test_unparseable_string_names_key_and_value() {
        let mut fields = object(json!({ "name": "scrypt", "actual_last24h": "n/a" }));

        let err = normalize_reading(&mut fields).unwrap_err();

        match err {
            IngestError::DataCoercion { key, value } => {
                assert_eq!(key, "actual_last24h");
                assert_eq!(value, "n/a");
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_non_finite_values_rejected() {
        let mut fields = object(json!({ "name": "scrypt", "hashrate": "inf" }));
        assert!(normalize_reading(&mut fields).is_err());

        let mut fields = object(json!({ "name": "scrypt", "hashrate": "" }));
        assert!(normalize_reading(&mut fields).is_err());
    }
}
