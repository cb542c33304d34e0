//! CoinGecko client: coin catalog and the reference coin's spot price

use reqwest::Client;
use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::{IngestError, Result};
use crate::services::http::fetch_body;

const SOURCE: &str = "CoinGecko";

#[derive(Clone)]
pub struct CoinGeckoService {
    client: Client,
    api_key: Option<String>,
    base_url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoinListEntry {
    pub id: String,
    pub symbol: String,
    pub name: String,
}

impl CoinGeckoService {
    pub fn new(client: Client, api_key: Option<String>, base_url: String) -> Self {
        Self {
            client,
            api_key,
            base_url,
        }
    }

    fn get(&self, url: &str) -> reqwest::RequestBuilder {
        let request = self.client.get(url);
        match &self.api_key {
            Some(key) => request.header("x-cg-pro-api-key", key),
            None => request,
        }
    }

    /// Fetch the full coin catalog (`/coins/list`)
    pub async fn fetch_coin_list(&self) -> Result<Vec<CoinListEntry>> {
        tracing::info!("Fetching coin list from CoinGecko");

        let url = format!("{}/coins/list", self.base_url);
        let body = fetch_body(self.get(&url), SOURCE).await?;
        let coins = parse_coin_list(&body)?;

        tracing::info!("Fetched {} coins from CoinGecko", coins.len());

        Ok(coins)
    }

    /// Fetch the current price of `coin_id` in `currency` (`/simple/price`)
    pub async fn fetch_reference_price(&self, coin_id: &str, currency: &str) -> Result<Decimal> {
        let url = format!("{}/simple/price", self.base_url);
        let request = self
            .get(&url)
            .query(&[("ids", coin_id), ("vs_currencies", currency)]);

        let body = fetch_body(request, SOURCE).await?;
        let price = parse_simple_price(&body, coin_id, currency)?;

        tracing::info!(
            coin = coin_id,
            currency = currency,
            price = %price.round_dp(2),
            "Fetched reference price"
        );

        Ok(price)
    }
}

pub fn parse_coin_list(body: &[u8]) -> Result<Vec<CoinListEntry>> {
    serde_json::from_slice(body).map_err(|e| IngestError::malformed(SOURCE, e))
}

/// Extract `{ "<coin_id>": { "<currency>": <number> } }`
pub fn parse_simple_price(body: &[u8], coin_id: &str, currency: &str) -> Result<Decimal> {
    let prices: HashMap<String, HashMap<String, f64>> =
        serde_json::from_slice(body).map_err(|e| IngestError::malformed(SOURCE, e))?;

    let price = prices
        .get(coin_id)
        .and_then(|quotes| quotes.get(currency))
        .copied()
        .ok_or_else(|| {
            IngestError::malformed(SOURCE, format!("no {} price for {}", currency, coin_id))
        })?;

    Decimal::from_f64(price)
        .ok_or_else(|| IngestError::malformed(SOURCE, format!("price {} is not representable", price)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_parse_coin_list() {
        let body = br#"[
            {"id": "bitcoin", "symbol": "btc", "name": "Bitcoin"},
            {"id": "litecoin", "symbol": "ltc", "name": "Litecoin"}
        ]"#;

        let coins = parse_coin_list(body).unwrap();
        assert_eq!(coins.len(), 2);
        assert_eq!(
            coins[0],
            CoinListEntry {
                id: "bitcoin".to_string(),
                symbol: "btc".to_string(),
                name: "Bitcoin".to_string(),
            }
        );
    }

    #[test]
    fn test_parse_coin_list_rejects_object() {
        let err = parse_coin_list(br#"{"error": "rate limited"}"#).unwrap_err();
        assert!(matches!(err, IngestError::MalformedResponse { .. }));
    }

    #[test]
    fn test_parse_simple_price() {
        let price = parse_simple_price(br#"{"bitcoin": {"usd": 27000.00}}"#, "bitcoin", "usd").unwrap();
        assert_eq!(price, dec!(27000));

        let price = parse_simple_price(br#"{"bitcoin": {"usd": 26950.5}}"#, "bitcoin", "usd").unwrap();
        assert_eq!(price, dec!(26950.5));
    }

    #[test]
    fn test_parse_simple_price_missing_coin() {
        let err = parse_simple_price(br#"{"ethereum": {"usd": 1600}}"#, "bitcoin", "usd").unwrap_err();
        assert!(err.to_string().contains("no usd price for bitcoin"));
    }
}
