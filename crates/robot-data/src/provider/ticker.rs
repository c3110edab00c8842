//! Binance 24시간 시세 Provider.
//!
//! `GET /api/v3/ticker/24hr?symbol={TOKEN}USDT` 응답에서 `lastPrice`와
//! `priceChangePercent`만 사용합니다.

use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use futures::future::join_all;
use reqwest::{Client, StatusCode};
use robot_core::{MarketQuote, TickerConfig};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::{DataError, Result};

/// 토큰별 최신 시세 소스.
#[async_trait]
pub trait TickerSource: Send + Sync {
    async fn quote(&self, token: &str) -> Result<MarketQuote>;

    /// 여러 토큰을 동시에 조회합니다. 실패는 토큰별로 반환됩니다.
    async fn quotes(&self, tokens: &[String]) -> Vec<(String, Result<MarketQuote>)> {
        let results = join_all(tokens.iter().map(|t| self.quote(t))).await;
        tokens.iter().cloned().zip(results).collect()
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BinanceTicker {
    symbol: String,
    price_change_percent: String,
    last_price: String,
}

/// Binance 공개 REST API 기반 시세 Provider.
#[derive(Debug, Clone)]
pub struct BinanceTickerProvider {
    client: Client,
    base_url: String,
}

impl BinanceTickerProvider {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DataError::ConfigError(format!("HTTP 클라이언트 생성 실패: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config(config: &TickerConfig) -> Result<Self> {
        Self::new(config.base_url.clone(), config.timeout())
    }

    fn parse_decimal(field: &str, value: &str) -> Result<Decimal> {
        Decimal::from_str(value)
            .map_err(|e| DataError::ParseError(format!("{} '{}': {}", field, value, e)))
    }
}

#[async_trait]
impl TickerSource for BinanceTickerProvider {
    async fn quote(&self, token: &str) -> Result<MarketQuote> {
        let token = token.trim().to_uppercase();
        if token.is_empty() {
            return Err(DataError::InvalidData("empty token".to_string()));
        }

        let url = format!("{}/api/v3/ticker/24hr", self.base_url);
        let symbol = format!("{}USDT", token);
        debug!("GET {}?symbol={}", url, symbol);

        let response = self
            .client
            .get(&url)
            .query(&[("symbol", symbol.as_str())])
            .send()
            .await
            .map_err(|e| DataError::FetchError(e.to_string()))?;

        let status = response.status();
        let body = response.text().await?;
        if status == StatusCode::NOT_FOUND || status == StatusCode::BAD_REQUEST {
            warn!(symbol = %symbol, status = %status, "Unknown ticker symbol");
            return Err(DataError::NotFound(symbol));
        }
        if !status.is_success() {
            return Err(DataError::FetchError(format!("HTTP {}: {}", status, body)));
        }

        let ticker: BinanceTicker = serde_json::from_str(&body)?;
        debug!(symbol = %ticker.symbol, last = %ticker.last_price, "Ticker received");

        Ok(MarketQuote {
            token,
            last_price: Self::parse_decimal("lastPrice", &ticker.last_price)?,
            price_change_percent: Self::parse_decimal(
                "priceChangePercent",
                &ticker.price_change_percent,
            )?
            .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero),
            observed_at: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use rust_decimal_macros::dec;

    fn ticker_body(symbol: &str, pct: &str) -> String {
        format!(
            r#"{{"symbol":"{symbol}","priceChange":"1.0","priceChangePercent":"{pct}",
                "lastPrice":"612.40000000","volume":"1000"}}"#
        )
    }

    #[tokio::test]
    async fn test_quote_rounds_percent() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/v3/ticker/24hr")
            .match_query(Matcher::UrlEncoded("symbol".into(), "BNBUSDT".into()))
            .with_status(200)
            .with_body(ticker_body("BNBUSDT", "-1.236"))
            .create_async()
            .await;

        let provider = BinanceTickerProvider::new(server.url(), Duration::from_secs(5)).unwrap();
        let quote = provider.quote("bnb").await.unwrap();

        assert_eq!(quote.token, "BNB");
        assert_eq!(quote.last_price, dec!(612.4));
        assert_eq!(quote.price_change_percent, dec!(-1.24));
    }

    #[tokio::test]
    async fn test_quote_rounds_midpoint_away_from_zero() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/v3/ticker/24hr")
            .match_query(Matcher::UrlEncoded("symbol".into(), "ETHUSDT".into()))
            .with_status(200)
            .with_body(ticker_body("ETHUSDT", "0.125"))
            .create_async()
            .await;
        server
            .mock("GET", "/api/v3/ticker/24hr")
            .match_query(Matcher::UrlEncoded("symbol".into(), "BTCUSDT".into()))
            .with_status(200)
            .with_body(ticker_body("BTCUSDT", "-2.345"))
            .create_async()
            .await;

        let provider = BinanceTickerProvider::new(server.url(), Duration::from_secs(5)).unwrap();

        let eth = provider.quote("ETH").await.unwrap();
        assert_eq!(eth.price_change_percent, dec!(0.13));

        let btc = provider.quote("BTC").await.unwrap();
        assert_eq!(btc.price_change_percent, dec!(-2.35));
    }

    #[tokio::test]
    async fn test_quotes_reports_per_token_failures() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/v3/ticker/24hr")
            .match_query(Matcher::UrlEncoded("symbol".into(), "ETHUSDT".into()))
            .with_status(200)
            .with_body(ticker_body("ETHUSDT", "2.5"))
            .create_async()
            .await;
        server
            .mock("GET", "/api/v3/ticker/24hr")
            .match_query(Matcher::UrlEncoded("symbol".into(), "XYZUSDT".into()))
            .with_status(400)
            .with_body(r#"{"code":-1121,"msg":"Invalid symbol."}"#)
            .create_async()
            .await;

        let provider = BinanceTickerProvider::new(server.url(), Duration::from_secs(5)).unwrap();
        let results = provider
            .quotes(&["ETH".to_string(), "XYZ".to_string()])
            .await;

        assert_eq!(results[0].1.as_ref().unwrap().price_change_percent, dec!(2.5));
        assert!(matches!(results[1].1, Err(DataError::NotFound(_))));
    }
}
