//! 모든 핸들러에서 공유되는 애플리케이션 상태.
//!
//! Arc로 래핑되어 REST 핸들러, WebSocket 핸들러, 백그라운드 서비스가 함께 사용합니다.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use robot_core::AppConfig;
use robot_data::SnapshotFetcher;
use robot_execution::{MarketFeed, TradingService};
use tokio_util::sync::CancellationToken;

use crate::websocket::BroadcastScheduler;

/// 애플리케이션 공유 상태.
pub struct AppState {
    /// 로드된 설정
    pub config: AppConfig,

    /// 스냅샷 업스트림
    pub fetcher: Arc<dyn SnapshotFetcher>,

    /// 연결 레지스트리 + 푸시 스케줄러
    pub scheduler: Arc<BroadcastScheduler>,

    /// 모의 포지션 상태 머신
    pub trading: Arc<TradingService>,

    /// 서버 종료 신호
    pub shutdown: CancellationToken,

    /// 서버 버전
    pub version: String,

    /// 서버 시작 시각
    pub started_at: DateTime<Utc>,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        fetcher: Arc<dyn SnapshotFetcher>,
        trading: Arc<TradingService>,
        shutdown: CancellationToken,
    ) -> Self {
        let scheduler = Arc::new(BroadcastScheduler::new(
            fetcher.clone(),
            config.snapshot.refresh_interval(),
            shutdown.clone(),
        ));

        Self {
            config,
            fetcher,
            scheduler,
            trading,
            shutdown,
            version: env!("CARGO_PKG_VERSION").to_string(),
            started_at: Utc::now(),
        }
    }

    pub fn feed(&self) -> &Arc<MarketFeed> {
        self.trading.feed()
    }

    /// 서버 가동 시간 (초).
    pub fn uptime_secs(&self) -> i64 {
        (Utc::now() - self.started_at).num_seconds()
    }
}
