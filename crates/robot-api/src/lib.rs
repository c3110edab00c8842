//! 마켓 스냅샷 릴레이 및 모의 트레이딩 API 서버.
//!
//! - `/ws`: (심볼, 인터벌) 구독 WebSocket. 구독 즉시, 주기적으로, 외부 트리거 시 스냅샷 푸시
//! - `/api/data/{coin}/{interval}`: 스냅샷 조회 + 해당 구독자에게 브로드캐스트
//! - `/api/v1/trading/*`: 모의 포지션 제어
//! - `/api/v1/market/tickers`: 24시간 시세
//! - `/health`, `/metrics`

pub mod error;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod services;
pub mod state;
pub mod websocket;

pub use error::{ApiErrorResponse, ApiResult};
pub use state::AppState;
