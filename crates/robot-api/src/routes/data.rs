//! 스냅샷 조회 endpoint.
//!
//! 조회 결과를 응답하는 동시에 같은 (심볼, 인터벌)을 구독 중인 연결에만 브로드캐스트합니다.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use robot_core::{Snapshot, SubscriptionKey};
use serde_json::json;
use tracing::{debug, error, warn};

use crate::error::{snapshot_error, ApiErrorResponse, ApiResult};
use crate::metrics::record_snapshot_fetch_failure;
use crate::state::AppState;

/// 스냅샷 조회 및 구독자 브로드캐스트.
///
/// `GET /api/data/{coin}/{interval}`
pub async fn get_snapshot(
    State(state): State<Arc<AppState>>,
    Path((coin, interval)): Path<(String, String)>,
) -> ApiResult<Json<Snapshot>> {
    let key = SubscriptionKey::new(coin, interval);
    if key.is_unset() {
        return Err(missing_params());
    }

    let snapshot = state.fetcher.fetch(&key).await.map_err(|e| {
        if e.is_not_found() {
            warn!(symbol = %key.symbol, interval = %key.interval, error = %e, "스냅샷 없음");
        } else {
            error!(symbol = %key.symbol, interval = %key.interval, error = %e, "스냅샷 조회 실패");
        }
        record_snapshot_fetch_failure(e.kind());
        snapshot_error(&e)
    })?;

    let scheduled = state.scheduler.broadcast(&key, &snapshot).await;
    debug!(symbol = %key.symbol, interval = %key.interval, records = snapshot.len(), scheduled, "스냅샷 조회");

    Ok(Json(snapshot))
}

/// 파라미터가 빠지거나 비어 있는 경로.
fn missing_params() -> (StatusCode, Json<ApiErrorResponse>) {
    ApiErrorResponse::with_details(
        "MISSING_PARAMETERS",
        "coin과 interval이 모두 필요합니다",
        json!({ "required": ["coin", "interval"] }),
    )
    .into_error(StatusCode::BAD_REQUEST)
}

async fn reject_missing_params() -> (StatusCode, Json<ApiErrorResponse>) {
    missing_params()
}

pub fn data_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(reject_missing_params))
        .route("/{coin}", get(reject_missing_params))
        .route("/{coin}/{interval}", get(get_snapshot))
        .fallback(reject_missing_params)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::test_support::{create_test_state, StaticFetcher};
    use axum::{body::Body, http::Request};
    use serde_json::Value;
    use std::time::Duration;
    use tokio::sync::mpsc;
    use tokio::time::timeout;
    use tower::ServiceExt;

    async fn get(state: Arc<AppState>, uri: &str) -> (StatusCode, Value) {
        let app = Router::new().nest("/api/data", data_router()).with_state(state);
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&body).unwrap_or(Value::Null))
    }

    #[tokio::test]
    async fn test_snapshot_is_sorted_newest_first() {
        let state = create_test_state(Arc::new(StaticFetcher::default())).await;

        let (status, body) = get(state, "/api/data/BTC/1h").await;

        assert_eq!(status, StatusCode::OK);
        let records = body.as_array().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0]["event_time"], 1_700_000_060_000_i64);
        assert_eq!(records[1]["event_time"], 1_700_000_000_000_i64);
    }

    #[tokio::test]
    async fn test_missing_parameters_are_rejected() {
        let fetcher = Arc::new(StaticFetcher::default());
        let state = create_test_state(fetcher.clone()).await;

        for uri in ["/api/data", "/api/data/BTC", "/api/data/%20/1h", "/api/data/BTC/%20"] {
            let (status, body) = get(state.clone(), uri).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
            assert_eq!(body["code"], "MISSING_PARAMETERS", "{uri}");
            assert_eq!(body["details"]["required"][1], "interval", "{uri}");
        }
        assert!(fetcher.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_upstream_failures_map_to_500() {
        let state = create_test_state(Arc::new(StaticFetcher::default())).await;

        let (status, body) = get(state.clone(), "/api/data/ETH/1h").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["code"], "SNAPSHOT_NOT_FOUND");

        let (status, body) = get(state, "/api/data/BROKEN/1h").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["code"], "FETCH_FAILED");
    }

    #[tokio::test]
    async fn test_query_broadcasts_to_matching_subscribers_only() {
        let state = create_test_state(Arc::new(StaticFetcher::default())).await;
        let scheduler = state.scheduler.clone();

        let (tx_hit, mut rx_hit) = mpsc::channel(8);
        let (tx_miss, mut rx_miss) = mpsc::channel(8);
        let hit = scheduler.on_connect(tx_hit).await;
        let miss = scheduler.on_connect(tx_miss).await;
        scheduler.on_subscribe(hit, SubscriptionKey::new("BTC", "1h")).await;
        scheduler.on_subscribe(miss, SubscriptionKey::new("BTC", "5m")).await;

        // 구독 직후 푸시 (BTC/5m 은 가짜 업스트림이 제공하므로 둘 다 수신)
        timeout(Duration::from_secs(1), rx_hit.recv()).await.unwrap().unwrap();
        timeout(Duration::from_secs(1), rx_miss.recv()).await.unwrap().unwrap();

        let (status, _) = get(state, "/api/data/BTC/1h").await;
        assert_eq!(status, StatusCode::OK);

        let pushed = timeout(Duration::from_secs(1), rx_hit.recv()).await.unwrap().unwrap();
        let records: Value = serde_json::from_str(&pushed).unwrap();
        assert_eq!(records.as_array().unwrap().len(), 2);
        assert!(timeout(Duration::from_millis(200), rx_miss.recv()).await.is_err());
    }
}
