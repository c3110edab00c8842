//! 24시간 시세 동기화 서비스.
//!
//! 설정된 토큰의 시세를 주기적으로 가져와 `MarketFeed`를 갱신하고,
//! 포지션이 열려 있으면 미실현 손익을 다시 계산합니다.

use std::sync::Arc;
use std::time::Duration;

use robot_data::TickerSource;
use robot_execution::{MarketFeed, TradingService};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// 시세 동기화 서비스.
pub struct TickerSyncService {
    source: Arc<dyn TickerSource>,
    trading: Arc<TradingService>,
    tokens: Vec<String>,
    poll_interval: Duration,
}

impl TickerSyncService {
    pub fn new(
        source: Arc<dyn TickerSource>,
        trading: Arc<TradingService>,
        tokens: Vec<String>,
        poll_interval: Duration,
    ) -> Self {
        Self {
            source,
            trading,
            tokens,
            poll_interval,
        }
    }

    fn feed(&self) -> &Arc<MarketFeed> {
        self.trading.feed()
    }

    /// 서비스 시작 (메인 루프).
    ///
    /// CancellationToken을 통해 graceful shutdown을 지원합니다.
    pub async fn run(self, shutdown: CancellationToken) {
        let mut ticker = tokio::time::interval(self.poll_interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.sync_once().await;
                }

                _ = shutdown.cancelled() => {
                    info!("TickerSyncService 종료");
                    break;
                }
            }
        }
    }

    /// 한 번 동기화합니다. 갱신된 토큰 수를 반환합니다.
    ///
    /// 실패한 토큰은 이전 시세를 유지하며, 오래된 시세는 피드가 걸러냅니다.
    pub async fn sync_once(&self) -> usize {
        let mut updated = 0;

        for (token, result) in self.source.quotes(&self.tokens).await {
            match result {
                Ok(quote) => {
                    self.feed().update(quote).await;
                    updated += 1;
                }
                Err(e) if e.is_not_found() => {
                    warn!(token = %token, error = %e, "시세 없음");
                }
                Err(e) => {
                    error!(token = %token, error = %e, "시세 조회 실패");
                }
            }
        }

        if let Some(pnl) = self.trading.refresh_live_pnl().await {
            debug!(live_pnl = %pnl, "미실현 손익 갱신");
        }

        updated
    }
}

/// 시세 동기화 서비스를 백그라운드로 시작합니다.
pub fn start_ticker_sync_service(
    source: Arc<dyn TickerSource>,
    trading: Arc<TradingService>,
    tokens: Vec<String>,
    poll_interval: Duration,
    shutdown: CancellationToken,
) -> tokio::task::JoinHandle<()> {
    let service = TickerSyncService::new(source, trading, tokens, poll_interval);

    tokio::spawn(async move {
        service.run(shutdown).await;
    })
}
