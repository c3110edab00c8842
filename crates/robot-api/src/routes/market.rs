//! 24시간 시세 endpoint.
//!
//! # 엔드포인트
//!
//! - `GET /api/v1/market/tickers` - 폴링 중인 토큰의 최신 시세

use axum::{extract::State, routing::get, Json, Router};
use chrono::{DateTime, Utc};
use robot_core::MarketQuote;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::state::AppState;

// ==================== 응답 타입 ====================

/// 토큰 시세 한 줄.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TickerRow {
    pub token: String,
    pub last_price: Decimal,
    pub price_change_percent: Decimal,
    /// 부호가 붙은 변동률 (예: "+1.23")
    pub change: String,
    pub observed_at: DateTime<Utc>,
}

impl From<MarketQuote> for TickerRow {
    fn from(quote: MarketQuote) -> Self {
        Self {
            change: quote.signed_change(),
            token: quote.token,
            last_price: quote.last_price,
            price_change_percent: quote.price_change_percent,
            observed_at: quote.observed_at,
        }
    }
}

/// 시세 목록 응답.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TickersResponse {
    pub tickers: Vec<TickerRow>,
    /// 설정된 토큰 중 유효한 시세가 없는 토큰
    pub missing: Vec<String>,
}

// ==================== 핸들러 ====================

/// `GET /api/v1/market/tickers`
pub async fn get_tickers(State(state): State<Arc<AppState>>) -> Json<TickersResponse> {
    let tickers: Vec<TickerRow> = state
        .feed()
        .snapshot()
        .await
        .into_iter()
        .map(TickerRow::from)
        .collect();

    let missing = state
        .config
        .ticker
        .tokens
        .iter()
        .filter(|token| !tickers.iter().any(|t| t.token.eq_ignore_ascii_case(token)))
        .cloned()
        .collect();

    Json(TickersResponse { tickers, missing })
}

pub fn market_router() -> Router<Arc<AppState>> {
    Router::new().route("/tickers", get(get_tickers))
}
