//! 토큰별 최신 시세 캐시.

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use robot_core::MarketQuote;
use rust_decimal::Decimal;
use tokio::sync::RwLock;

/// 시세 피드. 오래된 시세는 없는 것으로 취급합니다.
#[derive(Debug)]
pub struct MarketFeed {
    quotes: RwLock<HashMap<String, MarketQuote>>,
    stale_after: chrono::Duration,
}

impl MarketFeed {
    pub fn new(stale_after: Duration) -> Self {
        Self {
            quotes: RwLock::new(HashMap::new()),
            stale_after: chrono::Duration::from_std(stale_after)
                .unwrap_or_else(|_| chrono::Duration::seconds(60)),
        }
    }

    pub async fn update(&self, quote: MarketQuote) {
        self.quotes
            .write()
            .await
            .insert(quote.token.to_uppercase(), quote);
    }

    /// 토큰의 최신 시세.
    pub async fn quote(&self, token: &str) -> Option<MarketQuote> {
        self.quote_at(token, Utc::now()).await
    }

    pub async fn quote_at(&self, token: &str, now: DateTime<Utc>) -> Option<MarketQuote> {
        let quotes = self.quotes.read().await;
        quotes
            .get(&token.to_uppercase())
            .filter(|q| now - q.observed_at <= self.stale_after)
            .cloned()
    }

    /// 토큰의 최신 24시간 변동률 (%).
    pub async fn pct_change(&self, token: &str) -> Option<Decimal> {
        self.quote(token).await.map(|q| q.price_change_percent)
    }

    /// 오래되지 않은 모든 시세, 토큰 이름순.
    pub async fn snapshot(&self) -> Vec<MarketQuote> {
        let now = Utc::now();
        let quotes = self.quotes.read().await;
        let mut fresh: Vec<MarketQuote> = quotes
            .values()
            .filter(|q| now - q.observed_at <= self.stale_after)
            .cloned()
            .collect();
        fresh.sort_by(|a, b| a.token.cmp(&b.token));
        fresh
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn quote(token: &str, pct: Decimal, observed_at: DateTime<Utc>) -> MarketQuote {
        MarketQuote {
            token: token.to_string(),
            last_price: dec!(100),
            price_change_percent: pct,
            observed_at,
        }
    }

    #[tokio::test]
    async fn test_latest_quote_wins() {
        let feed = MarketFeed::new(Duration::from_secs(60));
        feed.update(quote("BNB", dec!(1), Utc::now())).await;
        feed.update(quote("bnb", dec!(2.5), Utc::now())).await;

        assert_eq!(feed.pct_change("bnb").await, Some(dec!(2.5)));
        assert_eq!(feed.pct_change("ETH").await, None);
        assert_eq!(feed.snapshot().await.len(), 1);
    }

    #[tokio::test]
    async fn test_stale_quote_is_ignored() {
        let feed = MarketFeed::new(Duration::from_secs(60));
        let observed = Utc::now() - chrono::Duration::seconds(120);
        feed.update(quote("BTC", dec!(3), observed)).await;

        assert!(feed.pct_change("BTC").await.is_none());
        assert!(feed
            .quote_at("BTC", observed + chrono::Duration::seconds(30))
            .await
            .is_some());
        assert!(feed.snapshot().await.is_empty());
    }
}
