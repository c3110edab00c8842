//! 모의 트레이딩 제어 endpoint.
//!
//! # 엔드포인트
//!
//! - `GET /api/v1/trading/status` - 설정, 계좌, 포지션, 미실현 손익
//! - `POST /api/v1/trading/start` - 포지션 오픈
//! - `POST /api/v1/trading/stop` - 포지션 종료
//! - `GET /api/v1/trading/settings` - 설정 + 선택지 목록
//! - `PUT /api/v1/trading/settings` - 설정 부분 업데이트 (포지션 보유 중에는 전략만)
//!
//! 전제 조건 미충족은 에러가 아니라 `{"result": "skipped", "reason": ...}`로 응답합니다.

use std::sync::Arc;

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use robot_core::{
    TradingSettings, INTERVAL_OPTIONS, STRATEGY_OPTIONS, TARGET_PROFIT_OPTIONS, TOKEN_OPTIONS,
};
use robot_execution::{ExecutionError, SettingsUpdate, TradingStatus, Transition};
use serde::Serialize;
use tracing::error;

use crate::error::{execution_error, ApiResult};
use crate::metrics::record_trading_transition;
use crate::state::AppState;

/// 설정 + 선택지 응답.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsResponse {
    pub settings: TradingSettings,
    pub options: SettingsOptions,
}

/// UI 컨트롤 구성용 선택지 목록.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsOptions {
    pub tokens: Vec<&'static str>,
    pub intervals: Vec<&'static str>,
    pub strategies: Vec<&'static str>,
    pub target_profits: Vec<u32>,
    pub risk_levels: Vec<u8>,
}

impl SettingsOptions {
    fn catalogue() -> Self {
        Self {
            tokens: TOKEN_OPTIONS.to_vec(),
            intervals: INTERVAL_OPTIONS.to_vec(),
            strategies: STRATEGY_OPTIONS.to_vec(),
            target_profits: TARGET_PROFIT_OPTIONS.to_vec(),
            risk_levels: (1..=5).collect(),
        }
    }
}

/// `GET /api/v1/trading/status`
pub async fn get_status(State(state): State<Arc<AppState>>) -> Json<TradingStatus> {
    Json(state.trading.status().await)
}

/// `POST /api/v1/trading/start`
pub async fn start_trading(State(state): State<Arc<AppState>>) -> ApiResult<Json<Transition>> {
    let transition = state.trading.start_trading().await.map_err(log_failure)?;
    record_trading_transition(transition_kind(&transition));
    Ok(Json(transition))
}

/// `POST /api/v1/trading/stop`
pub async fn stop_trading(State(state): State<Arc<AppState>>) -> ApiResult<Json<Transition>> {
    let transition = state.trading.stop_trading().await.map_err(log_failure)?;
    record_trading_transition(transition_kind(&transition));
    Ok(Json(transition))
}

/// `GET /api/v1/trading/settings`
pub async fn get_settings(State(state): State<Arc<AppState>>) -> Json<SettingsResponse> {
    Json(SettingsResponse {
        settings: state.trading.settings().await,
        options: SettingsOptions::catalogue(),
    })
}

/// `PUT /api/v1/trading/settings`
pub async fn update_settings(
    State(state): State<Arc<AppState>>,
    Json(update): Json<SettingsUpdate>,
) -> ApiResult<Json<TradingSettings>> {
    let settings = state
        .trading
        .update_settings(update)
        .await
        .map_err(log_failure)?;
    Ok(Json(settings))
}

fn transition_kind(transition: &Transition) -> &'static str {
    match transition {
        Transition::Opened { .. } => "opened",
        Transition::Closed { .. } => "closed",
        Transition::Skipped { .. } => "skipped",
    }
}

fn log_failure(err: ExecutionError) -> (axum::http::StatusCode, Json<crate::ApiErrorResponse>) {
    if let ExecutionError::Store(e) = &err {
        error!(error = %e, "트레이딩 상태 저장 실패");
    }
    execution_error(&err)
}

pub fn trading_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/status", get(get_status))
        .route("/start", post(start_trading))
        .route("/stop", post(stop_trading))
        .route("/settings", get(get_settings).put(update_settings))
}
