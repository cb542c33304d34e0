//! Harvester configuration
//!
//! Everything is read from the environment (a `.env` file is honored via
//! dotenvy in `main`). Only `DATABASE_URL` is required.

use chrono::Duration as ChronoDuration;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{IngestError, Result};
use crate::services::normalizer::CoercionPolicy;

const ENV_DATABASE_URL: &str = "DATABASE_URL";
const ENV_COINGECKO_BASE_URL: &str = "COINGECKO_BASE_URL";
const ENV_COINGECKO_API_KEY: &str = "COINGECKO_API_KEY";
const ENV_POOL_STATUS_URL: &str = "POOL_STATUS_URL";
const ENV_POOL_PROVIDER_NAME: &str = "POOL_PROVIDER_NAME";
const ENV_POOL_PROVIDER_WEBSITE: &str = "POOL_PROVIDER_WEBSITE";
const ENV_POOL_PROVIDER_FEE: &str = "POOL_PROVIDER_FEE";
const ENV_POOL_REGION: &str = "POOL_REGION";
const ENV_POOL_BASE_DOMAIN: &str = "POOL_BASE_DOMAIN";
const ENV_REFERENCE_COIN_ID: &str = "REFERENCE_COIN_ID";
const ENV_REFERENCE_CURRENCY: &str = "REFERENCE_CURRENCY";
const ENV_HTTP_TIMEOUT: &str = "HTTP_TIMEOUT_SECS";
const ENV_SKIP_BAD_READINGS: &str = "INGEST_SKIP_BAD_READINGS";
const ENV_INGEST_INTERVAL: &str = "INGEST_INTERVAL_SECS";
const ENV_STALENESS_WINDOW: &str = "STALENESS_WINDOW_SECS";

pub const DEFAULT_COINGECKO_BASE_URL: &str = "https://api.coingecko.com/api/v3";
pub const DEFAULT_POOL_STATUS_URL: &str = "http://api.zergpool.com:8080/api/status";
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;
/// Miners silent for longer than this are reported offline (5 minutes)
pub const DEFAULT_STALENESS_WINDOW_SECS: i64 = 300;

/// Identity of the pool provider and the template used to build pool URLs
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderConfig {
    pub name: String,
    pub website: String,
    pub fee: Decimal,
    /// Region prefix used in the pool URL, e.g. "na"
    pub region: String,
    /// e.g. "mine.zergpool.com"
    pub base_domain: String,
    pub status_url: String,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            name: "ZergPool".to_string(),
            website: "https://zergpool.com/".to_string(),
            fee: dec!(0.5),
            region: "na".to_string(),
            base_domain: "mine.zergpool.com".to_string(),
            status_url: DEFAULT_POOL_STATUS_URL.to_string(),
        }
    }
}

impl ProviderConfig {
    /// Stratum host for an algorithm: `<algorithm>.<region>.<base_domain>`
    pub fn pool_url(&self, algorithm: &str) -> String {
        format!("{}.{}.{}", algorithm, self.region, self.base_domain)
    }
}

/// Settings consumed by a single ingestion run
#[derive(Debug, Clone)]
pub struct IngestSettings {
    pub provider: ProviderConfig,
    pub reference_coin_id: String,
    pub reference_currency: String,
    pub coercion_policy: CoercionPolicy,
    pub staleness_window: ChronoDuration,
}

impl Default for IngestSettings {
    fn default() -> Self {
        Self {
            provider: ProviderConfig::default(),
            reference_coin_id: "bitcoin".to_string(),
            reference_currency: "usd".to_string(),
            coercion_policy: CoercionPolicy::default(),
            staleness_window: ChronoDuration::seconds(DEFAULT_STALENESS_WINDOW_SECS),
        }
    }
}

#[derive(Debug, Clone)]
pub struct HarvesterConfig {
    pub database_url: String,
    pub coingecko_base_url: String,
    pub coingecko_api_key: Option<String>,
    pub http_timeout: Duration,
    /// Run repeatedly at this interval instead of once
    pub ingest_interval: Option<Duration>,
    pub ingest: IngestSettings,
}

impl HarvesterConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from any key lookup (the process environment
    /// in production, a map in tests)
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let value = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let database_url = value(ENV_DATABASE_URL)
            .ok_or_else(|| IngestError::Config(format!("{} must be set", ENV_DATABASE_URL)))?;

        let defaults = IngestSettings::default();
        let provider_defaults = defaults.provider.clone();

        let fee = match value(ENV_POOL_PROVIDER_FEE) {
            Some(raw) => Decimal::from_str(&raw).map_err(|e| {
                IngestError::Config(format!("{} is not a decimal ({}): {}", ENV_POOL_PROVIDER_FEE, raw, e))
            })?,
            None => provider_defaults.fee,
        };

        let provider = ProviderConfig {
            name: value(ENV_POOL_PROVIDER_NAME).unwrap_or(provider_defaults.name),
            website: value(ENV_POOL_PROVIDER_WEBSITE).unwrap_or(provider_defaults.website),
            fee,
            region: value(ENV_POOL_REGION).unwrap_or(provider_defaults.region),
            base_domain: value(ENV_POOL_BASE_DOMAIN).unwrap_or(provider_defaults.base_domain),
            status_url: value(ENV_POOL_STATUS_URL).unwrap_or(provider_defaults.status_url),
        };

        let coercion_policy = match parse_flag(&value, ENV_SKIP_BAD_READINGS)? {
            Some(true) => CoercionPolicy::SkipReading,
            Some(false) | None => CoercionPolicy::Abort,
        };

        let staleness_secs: i64 = parse_number(&value, ENV_STALENESS_WINDOW)?
            .unwrap_or(DEFAULT_STALENESS_WINDOW_SECS);
        if staleness_secs <= 0 {
            return Err(IngestError::Config(format!(
                "{} must be positive, got {}",
                ENV_STALENESS_WINDOW, staleness_secs
            )));
        }

        let ingest = IngestSettings {
            provider,
            reference_coin_id: value(ENV_REFERENCE_COIN_ID).unwrap_or(defaults.reference_coin_id),
            reference_currency: value(ENV_REFERENCE_CURRENCY)
                .map(|v| v.to_lowercase())
                .unwrap_or(defaults.reference_currency),
            coercion_policy,
            staleness_window: ChronoDuration::seconds(staleness_secs),
        };

        let http_timeout_secs: u64 =
            parse_number(&value, ENV_HTTP_TIMEOUT)?.unwrap_or(DEFAULT_HTTP_TIMEOUT_SECS);
        if http_timeout_secs == 0 {
            return Err(IngestError::Config(format!("{} must be at least 1", ENV_HTTP_TIMEOUT)));
        }

        let ingest_interval = parse_number::<u64, _>(&value, ENV_INGEST_INTERVAL)?
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs);

        Ok(Self {
            database_url,
            coingecko_base_url: value(ENV_COINGECKO_BASE_URL)
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_COINGECKO_BASE_URL.to_string()),
            coingecko_api_key: value(ENV_COINGECKO_API_KEY),
            http_timeout: Duration::from_secs(http_timeout_secs),
            ingest_interval,
            ingest,
        })
    }
}

fn parse_number<T, F>(value: &F, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match value(key) {
        Some(raw) => raw
            .parse::<T>()
            .map(Some)
            .map_err(|_| IngestError::Config(format!("{} is not a valid number: {}", key, raw))),
        None => Ok(None),
    }
}

fn parse_flag<F>(value: &F, key: &str) -> Result<Option<bool>>
where
    F: Fn(&str) -> Option<String>,
{
    match value(key).map(|v| v.to_lowercase()).as_deref() {
        Some("true" | "1" | "yes" | "on") => Ok(Some(true)),
        Some("false" | "0" | "no" | "off") => Ok(Some(false)),
        Some(other) => Err(IngestError::Config(format!(
            "{} is not a boolean: {}",
            key, other
        ))),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<HarvesterConfig> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        HarvesterConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_database_url_required() {
        let err = config_from(&[]).unwrap_err();
        assert!(err.to_string().contains("DATABASE_URL"));
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[("DATABASE_URL", "postgres://localhost/mining")]).unwrap();

        assert_eq!(config.coingecko_base_url, DEFAULT_COINGECKO_BASE_URL);
        assert_eq!(config.coingecko_api_key, None);
        assert_eq!(config.http_timeout, Duration::from_secs(30));
        assert_eq!(config.ingest_interval, None);
        assert_eq!(config.ingest.provider.name, "ZergPool");
        assert_eq!(config.ingest.provider.fee, dec!(0.5));
        assert_eq!(config.ingest.reference_coin_id, "bitcoin");
        assert_eq!(config.ingest.coercion_policy, CoercionPolicy::Abort);
        assert_eq!(config.ingest.staleness_window, ChronoDuration::minutes(5));
    }

    #[test]
    fn test_overrides() {
        let config = config_from(&[
            ("DATABASE_URL", "postgres://localhost/mining"),
            ("COINGECKO_BASE_URL", "https://pro-api.coingecko.com/api/v3/"),
            ("POOL_REGION", "eu"),
            ("POOL_PROVIDER_FEE", "0.3"),
            ("INGEST_SKIP_BAD_READINGS", "TRUE"),
            ("INGEST_INTERVAL_SECS", "300"),
            ("HTTP_TIMEOUT_SECS", "10"),
        ])
        .unwrap();

        assert_eq!(config.coingecko_base_url, "https://pro-api.coingecko.com/api/v3");
        assert_eq!(config.ingest.provider.region, "eu");
        assert_eq!(config.ingest.provider.fee, dec!(0.3));
        assert_eq!(config.ingest.coercion_policy, CoercionPolicy::SkipReading);
        assert_eq!(config.ingest_interval, Some(Duration::from_secs(300)));
        assert_eq!(config.http_timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_invalid_number_rejected() {
        let err = config_from(&[
            ("DATABASE_URL", "postgres://localhost/mining"),
            ("HTTP_TIMEOUT_SECS", "soon"),
        ])
        .unwrap_err();
        assert!(matches!(err, IngestError::Config(_)));
    }

    #[test]
    fn test_skip_flag_spellings() {
        for raw in ["1", "yes", "On"] {
            let config = config_from(&[
                ("DATABASE_URL", "postgres://localhost/mining"),
                ("INGEST_SKIP_BAD_READINGS", raw),
            ])
            .unwrap();
            assert_eq!(config.ingest.coercion_policy, CoercionPolicy::SkipReading);
        }

        let config = config_from(&[
            ("DATABASE_URL", "postgres://localhost/mining"),
            ("INGEST_SKIP_BAD_READINGS", "0"),
        ])
        .unwrap();
        assert_eq!(config.ingest.coercion_policy, CoercionPolicy::Abort);

        let err = config_from(&[
            ("DATABASE_URL", "postgres://localhost/mining"),
            ("INGEST_SKIP_BAD_READINGS", "sometimes"),
        ])
        .unwrap_err();
        assert!(matches!(err, IngestError::Config(_)));
    }

    #[test]
    fn test_unusable_durations_rejected() {
        for (key, raw) in [
            ("STALENESS_WINDOW_SECS", "-60"),
            ("STALENESS_WINDOW_SECS", "0"),
            ("HTTP_TIMEOUT_SECS", "0"),
        ] {
            let err = config_from(&[("DATABASE_URL", "postgres://localhost/mining"), (key, raw)])
                .unwrap_err();
            assert!(err.to_string().contains(key), "{} = {} should be rejected", key, raw);
        }
    }

    #[test]
    fn test_pool_url() {
        let provider = ProviderConfig::default();
        assert_eq!(provider.pool_url("scrypt"), "scrypt.na.mine.zergpool.com");
    }
}
