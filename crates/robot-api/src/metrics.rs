//! Prometheus 메트릭 설정 및 유틸리티.
//!
//! HTTP 요청, WebSocket 연결, 스냅샷 푸시, 트레이딩 전이 메트릭을 수집하고
//! `/metrics` 엔드포인트로 노출합니다.

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, Matcher, PrometheusBuilder, PrometheusHandle};

/// Prometheus 메트릭 레코더를 설치하고 핸들을 반환합니다.
pub fn setup_metrics_recorder() -> Result<PrometheusHandle, BuildError> {
    PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Full("http_request_duration_seconds".to_string()),
            &[0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0],
        )?
        .install_recorder()
}

// ==================== HTTP ====================

pub fn record_http_response(method: &str, path: &str, status: u16, duration_secs: f64) {
    counter!(
        "http_responses_total",
        "method" => method.to_string(),
        "path" => path.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    histogram!(
        "http_request_duration_seconds",
        "method" => method.to_string(),
        "path" => path.to_string()
    )
    .record(duration_secs);
}

// ==================== WebSocket / 스냅샷 ====================

pub fn increment_websocket_connections() {
    gauge!("websocket_connections_active").increment(1.0);
}

pub fn decrement_websocket_connections() {
    gauge!("websocket_connections_active").decrement(1.0);
}

/// 스냅샷 푸시 결과 (sent, skipped, stale, gone).
pub fn record_snapshot_push(outcome: &'static str) {
    counter!("snapshot_pushes_total", "outcome" => outcome).increment(1);
}

/// 스냅샷 조회 실패 (not_found, fetch, parse ...).
pub fn record_snapshot_fetch_failure(kind: &'static str) {
    counter!("snapshot_fetch_failures_total", "kind" => kind).increment(1);
}

// ==================== 트레이딩 ====================

/// 포지션 전이 (opened, closed, skipped).
pub fn record_trading_transition(kind: &'static str) {
    counter!("trading_transitions_total", "kind" => kind).increment(1);
}

// ==================== 경로 정규화 ====================

/// 스냅샷 경로의 심볼/인터벌을 라벨 폭주 없이 묶습니다.
///
/// 예: `/api/data/btc/1h` → `/api/data/:coin/:interval`
pub fn normalize_path(path: &str) -> String {
    let segments: Vec<&str> = path.split('/').collect();
    match segments.as_slice() {
        ["", "api", "data", _, _] => "/api/data/:coin/:interval".to_string(),
        ["", "api", "data", _] => "/api/data/:coin".to_string(),
        _ => path.to_string(),
    }
}
