//! Pool aggregator client (ZergPool `/api/status`)
//!
//! The response is an object keyed by pool name rather than an array, and
//! numeric fields are sometimes encoded as strings. Each entry is normalized
//! and then decoded into a strict [`PoolReading`].

use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{IngestError, Result};
use crate::services::http::fetch_body;
use crate::services::normalizer::{normalize_reading, CoercionPolicy};

const SOURCE: &str = "Pool status";

/// One pool's statistics as reported upstream. Numbers are kept as floats
/// and range-checked when they are written.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolReading {
    pub name: String,
    pub port: f64,
    pub coins: f64,
    pub fees: f64,
    pub hashrate: f64,
    pub hashrate_shared: f64,
    pub hashrate_solo: f64,
    pub workers: f64,
    pub workers_shared: f64,
    pub workers_solo: f64,
    pub estimate_current: f64,
    pub estimate_last24h: f64,
    pub actual_last24h: f64,
    pub actual_last24h_shared: f64,
    pub actual_last24h_solo: f64,
    pub mbtc_mh_factor: f64,
    pub hashrate_last24h: f64,
    pub hashrate_last24h_shared: f64,
    pub hashrate_last24h_solo: f64,
}

impl PoolReading {
    /// Stratum port, if it is a valid TCP port
    pub fn port_number(&self) -> Option<i32> {
        if self.port.is_finite() && self.port.fract() == 0.0 && (1.0..=65535.0).contains(&self.port) {
            Some(self.port as i32)
        } else {
            None
        }
    }
}

#[derive(Clone)]
pub struct PoolStatusService {
    client: Client,
    status_url: String,
}

impl PoolStatusService {
    pub fn new(client: Client, status_url: String) -> Self {
        Self { client, status_url }
    }

    pub async fn fetch_readings(&self, policy: CoercionPolicy) -> Result<PoolStatus> {
        tracing::info!(url = %self.status_url, "Connecting to pool for statistic pull...");

        let body = fetch_body(self.client.get(&self.status_url), SOURCE).await?;
        let status = parse_pool_status(&body, policy)?;

        tracing::info!(
            dropped = status.dropped,
            "Retrieved statistics for {} pools",
            status.readings.len()
        );

        Ok(status)
    }
}

/// A decoded status payload
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PoolStatus {
    pub readings: Vec<PoolReading>,
    /// Entries dropped under [`CoercionPolicy::SkipReading`]
    pub dropped: usize,
}

/// Decode a full status payload into readings.
///
/// An empty object or empty array yields no readings. Under
/// [`CoercionPolicy::SkipReading`] a bad entry is dropped with a warning;
/// otherwise the first bad entry fails the whole payload.
pub fn parse_pool_status(body: &[u8], policy: CoercionPolicy) -> Result<PoolStatus> {
    let root: Value = serde_json::from_slice(body).map_err(|e| IngestError::malformed(SOURCE, e))?;

    let entries = match root {
        Value::Object(entries) => entries,
        Value::Array(items) if items.is_empty() => Map::new(),
        other => {
            return Err(IngestError::malformed(
                SOURCE,
                format!("expected an object keyed by pool name, got {}", json_kind(&other)),
            ));
        }
    };

    let mut status = PoolStatus {
        readings: Vec::with_capacity(entries.len()),
        dropped: 0,
    };

    for (key, value) in entries {
        match decode_reading(&key, value) {
            Ok(reading) => status.readings.push(reading),
            Err(e) if policy == CoercionPolicy::SkipReading => {
                tracing::warn!(pool = %key, error = %e, "Skipping pool reading with bad data");
                status.dropped += 1;
            }
            Err(e) => return Err(e),
        }
    }

    Ok(status)
}

fn decode_reading(key: &str, value: Value) -> Result<PoolReading> {
    let mut fields = match value {
        Value::Object(fields) => fields,
        other => {
            return Err(IngestError::malformed(
                SOURCE,
                format!("entry {} is {}, not an object", key, json_kind(&other)),
            ));
        }
    };

    normalize_reading(&mut fields)?;

    let mut reading: PoolReading = serde_json::from_value(Value::Object(fields))
        .map_err(|e| IngestError::malformed(SOURCE, format!("entry {}: {}", key, e)))?;

    if reading.name.is_empty() {
        reading.name = key.to_string();
    }

    if reading.port_number().is_none() {
        return Err(invalid_port(&reading));
    }

    Ok(reading)
}

/// The port is stored as the pool's stratum port, so it must be a TCP port
pub fn invalid_port(reading: &PoolReading) -> IngestError {
    IngestError::DataCoercion {
        key: "port".to_string(),
        value: reading.port.to_string(),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const STATUS_BODY: &[u8] = br#"{
        "scrypt": {
            "name": "scrypt", "port": 3433, "coins": 4, "fees": 0.5,
            "hashrate": 1200000, "hashrate_shared": 1000000, "hashrate_solo": 200000,
            "workers": 12, "workers_shared": 10, "workers_solo": 2,
            "estimate_current": "0.05", "estimate_last24h": "0.049",
            "actual_last24h": "0.047", "actual_last24h_shared": "0.048", "actual_last24h_solo": "0",
            "mbtc_mh_factor": 0.001,
            "hashrate_last24h": 1100000, "hashrate_last24h_shared": 900000, "hashrate_last24h_solo": 200000
        },
        "sha256": {
            "name": "sha256", "port": "3333", "fees": 0.5,
            "hashrate_shared": 7.5e15, "workers_shared": 40,
            "estimate_current": 0.0000012, "actual_last24h_shared": 0.0000011,
            "mbtc_mh_factor": "1000000"
        }
    }"#;

    #[test]
    fn test_parse_pool_status() {
        let status = parse_pool_status(STATUS_BODY, CoercionPolicy::Abort).unwrap();
        assert_eq!(status.dropped, 0);
        let readings = status.readings;
        assert_eq!(readings.len(), 2);

        let scrypt = readings.iter().find(|r| r.name == "scrypt").unwrap();
        assert_eq!(scrypt.port_number(), Some(3433));
        assert_eq!(scrypt.hashrate_shared, 1_000_000.0);
        assert_eq!(scrypt.workers_shared, 10.0);
        assert_eq!(scrypt.estimate_current, 0.05);
        assert_eq!(scrypt.actual_last24h_shared, 0.048);
        assert_eq!(scrypt.mbtc_mh_factor, 0.001);

        let sha = readings.iter().find(|r| r.name == "sha256").unwrap();
        assert_eq!(sha.port_number(), Some(3333));
        assert_eq!(sha.mbtc_mh_factor, 1_000_000.0);
        // Missing fields default to zero
        assert_eq!(sha.coins, 0.0);
    }

    #[test]
    fn test_empty_payloads() {
        assert!(parse_pool_status(b"{}", CoercionPolicy::Abort).unwrap().readings.is_empty());
        assert!(parse_pool_status(b"[]", CoercionPolicy::Abort).unwrap().readings.is_empty());
    }

    #[test]
    fn test_name_falls_back_to_key() {
        let body = br#"{"x11": {"port": 3533, "hashrate_shared": 5}}"#;
        let readings = parse_pool_status(body, CoercionPolicy::Abort).unwrap().readings;
        assert_eq!(readings[0].name, "x11");
    }

    #[test]
    fn test_bad_string_aborts_by_default() {
        let body = br#"{
            "scrypt": {"name": "scrypt", "port": 3433, "estimate_current": "0.05"},
            "x11": {"name": "x11", "port": 3533, "estimate_current": "broken"}
        }"#;

        let err = parse_pool_status(body, CoercionPolicy::Abort).unwrap_err();
        assert!(matches!(err, IngestError::DataCoercion { ref key, .. } if key == "estimate_current"));
    }

    #[test]
    fn test_bad_entries_skipped_when_tolerant() {
        let body = br#"{
            "scrypt": {"name": "scrypt", "port": 3433, "estimate_current": "0.05"},
            "x11": {"name": "x11", "port": 3533, "estimate_current": "broken"},
            "lyra2z": "offline"
        }"#;

        let status = parse_pool_status(body, CoercionPolicy::SkipReading).unwrap();
        assert_eq!(status.readings.len(), 1);
        assert_eq!(status.readings[0].name, "scrypt");
        assert_eq!(status.dropped, 2);
    }

    #[test]
    fn test_invalid_port_follows_coercion_policy() {
        let body = br#"{
            "scrypt": {"name": "scrypt", "port": 3433},
            "lyra2z": {"name": "lyra2z", "port": 0}
        }"#;

        let err = parse_pool_status(body, CoercionPolicy::Abort).unwrap_err();
        assert!(matches!(err, IngestError::DataCoercion { ref key, ref value } if key == "port" && value == "0"));

        let status = parse_pool_status(body, CoercionPolicy::SkipReading).unwrap();
        assert_eq!(status.readings.len(), 1);
        assert_eq!(status.readings[0].name, "scrypt");
        assert_eq!(status.dropped, 1);
    }

    #[test]
    fn test_unexpected_shape_is_malformed() {
        let err = parse_pool_status(b"[1, 2]", CoercionPolicy::SkipReading).unwrap_err();
        assert!(matches!(err, IngestError::MalformedResponse { .. }));

        let err = parse_pool_status(b"<html>", CoercionPolicy::Abort).unwrap_err();
        assert!(matches!(err, IngestError::MalformedResponse { .. }));
    }

    #[test]
    fn test_port_number_validation() {
        let mut reading = PoolReading { port: 70000.0, ..Default::default() };
        assert_eq!(reading.port_number(), None);
        reading.port = 3333.5;
        assert_eq!(reading.port_number(), None);
        reading.port = 8080.0;
        assert_eq!(reading.port_number(), Some(8080));
    }
}
