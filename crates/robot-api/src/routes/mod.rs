//! API 라우트.
//!
//! # 라우트 구조
//!
//! - `/health` - 헬스 체크
//! - `/api/data/{coin}/{interval}` - 스냅샷 조회 + 구독자 브로드캐스트
//! - `/api/v1/trading` - 모의 포지션 제어
//! - `/api/v1/market` - 24시간 시세

pub mod data;
pub mod health;
pub mod market;
pub mod trading;

pub use data::data_router;
pub use health::{health_router, HealthResponse};
pub use market::{market_router, TickerRow, TickersResponse};
pub use trading::{trading_router, SettingsOptions, SettingsResponse};

use axum::Router;
use std::sync::Arc;

use crate::state::AppState;

/// 전체 API 라우터 생성.
pub fn create_api_router() -> Router<Arc<AppState>> {
    Router::new()
        .nest("/health", health_router())
        .nest("/api/data", data_router())
        .nest("/api/v1/trading", trading_router())
        .nest("/api/v1/market", market_router())
}
