//! 스냅샷 릴레이 / 모의 트레이딩 API 서버.
//!
//! 설정 로드 → 로깅/메트릭 초기화 → 설정 저장소 복원 → 시세 동기화 시작 →
//! HTTP + WebSocket 서버 실행 순서로 기동합니다.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum::{http::StatusCode, middleware, routing::get, Router};
use metrics_exporter_prometheus::PrometheusHandle;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use robot_api::metrics::setup_metrics_recorder;
use robot_api::middleware::metrics_layer;
use robot_api::routes::create_api_router;
use robot_api::services::start_ticker_sync_service;
use robot_api::state::AppState;
use robot_api::websocket::websocket_router;
use robot_core::{init_logging, AppConfig, LogConfig};
use robot_data::{BinanceTickerProvider, HttpSnapshotFetcher, SqliteSettingsStore};
use robot_execution::{MarketFeed, TradingService};

/// CORS 레이어 생성.
///
/// CORS_ORIGINS 환경변수가 설정되어 있으면 해당 origin만 허용합니다.
/// 설정되지 않으면 모든 origin을 허용합니다.
fn cors_layer() -> CorsLayer {
    let origins: Vec<_> = std::env::var("CORS_ORIGINS")
        .unwrap_or_default()
        .split(',')
        .filter_map(|s| {
            let s = s.trim();
            (!s.is_empty()).then(|| s.parse().ok()).flatten()
        })
        .collect();

    // any origin과 credentials는 함께 쓸 수 없음
    let restricted = !origins.is_empty();
    let allow_origin = if restricted {
        info!("CORS configured with {} allowed origins", origins.len());
        AllowOrigin::list(origins)
    } else {
        warn!("CORS_ORIGINS not set or invalid, allowing any origin");
        AllowOrigin::any()
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([
            axum::http::Method::GET,
            axum::http::Method::POST,
            axum::http::Method::PUT,
            axum::http::Method::OPTIONS,
        ])
        .allow_headers([
            axum::http::header::CONTENT_TYPE,
            axum::http::header::ACCEPT,
        ])
        .allow_credentials(restricted)
        .max_age(Duration::from_secs(3600))
}

/// /metrics 엔드포인트 핸들러.
async fn metrics_handler(
    axum::extract::State(handle): axum::extract::State<PrometheusHandle>,
) -> String {
    handle.render()
}

/// 전체 라우터 생성.
fn create_router(state: Arc<AppState>, metrics_handle: PrometheusHandle) -> Router {
    let request_timeout = Duration::from_secs(state.config.server.request_timeout_secs.max(1));

    let metrics_router = Router::new()
        .route("/metrics", get(metrics_handler))
        .with_state(metrics_handle);

    let api_router = create_api_router().with_state(state.clone());
    let ws_router = websocket_router().with_state(state);

    Router::new()
        .merge(metrics_router)
        .merge(api_router)
        .nest("/ws", ws_router)
        .layer(middleware::from_fn(metrics_layer))
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::with_status_code(StatusCode::REQUEST_TIMEOUT, request_timeout))
        .layer(cors_layer())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env 파일 로드 (있는 경우)
    let _ = dotenvy::dotenv();

    let config = AppConfig::load_default().context("설정 로드 실패")?;

    init_logging(LogConfig::from_settings(&config.logging))
        .map_err(|e| anyhow::anyhow!("로깅 초기화 실패: {e}"))?;

    info!("Starting robot API server...");

    let metrics_handle = setup_metrics_recorder().context("Prometheus 레코더 설치 실패")?;
    info!("Prometheus metrics recorder initialized");

    // 설정 저장소 + 트레이딩 세션 복원
    let store = Arc::new(
        SqliteSettingsStore::connect(&config.store.database_url, config.store.initial_balance)
            .await
            .with_context(|| format!("설정 저장소 연결 실패: {}", config.store.database_url))?,
    );
    let feed = Arc::new(MarketFeed::new(Duration::from_secs(
        config.ticker.stale_after_secs.max(1),
    )));
    let trading = Arc::new(
        TradingService::bootstrap(store.clone(), feed)
            .await
            .context("트레이딩 세션 복원 실패")?,
    );

    let fetcher = Arc::new(
        HttpSnapshotFetcher::from_config(&config.snapshot).context("스냅샷 Fetcher 생성 실패")?,
    );
    let ticker_source = Arc::new(
        BinanceTickerProvider::from_config(&config.ticker).context("시세 Provider 생성 실패")?,
    );

    // 전역 종료 토큰 (graceful shutdown용)
    let shutdown_token = CancellationToken::new();

    let addr = config.server.bind_addr();
    let tokens = config.ticker.tokens.clone();
    let poll_interval = config.ticker.poll_interval();

    let state = Arc::new(AppState::new(
        config,
        fetcher,
        trading.clone(),
        shutdown_token.clone(),
    ));
    info!(version = %state.version, "Application state initialized");

    let ticker_handle = start_ticker_sync_service(
        ticker_source,
        trading,
        tokens,
        poll_interval,
        shutdown_token.clone(),
    );
    info!(?poll_interval, "TickerSyncService 시작됨");

    let app = create_router(state.clone(), metrics_handle);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("바인딩 실패: {addr}"))?;

    info!(%addr, "API server listening");
    info!("Metrics available at http://{}/metrics", addr);
    info!("WebSocket available at ws://{}/ws", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown_token.clone()))
        .await
        .context("서버 실행 실패")?;

    info!("Server shutdown initiated, cleaning up...");
    shutdown_token.cancel();

    state.scheduler.shutdown().await;
    if tokio::time::timeout(Duration::from_secs(10), ticker_handle)
        .await
        .is_err()
    {
        warn!("TickerSyncService did not stop in time");
    }
    store.close().await;

    info!("Server stopped gracefully");
    Ok(())
}

/// Graceful shutdown 시그널 대기.
///
/// Ctrl+C 또는 SIGTERM 시그널을 수신하면 종료 토큰을 취소합니다.
async fn shutdown_signal(shutdown_token: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            warn!("Received Ctrl+C, initiating graceful shutdown...");
        }
        _ = terminate => {
            warn!("Received SIGTERM, initiating graceful shutdown...");
        }
    }

    // 백그라운드 서비스, 연결별 타이머, WebSocket 연결에 전파
    shutdown_token.cancel();
    info!("Shutdown signal propagated to background tasks");
}
