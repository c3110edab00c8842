//! 트레이딩 서비스.
//!
//! 세션 전이는 하나의 뮤텍스 아래에서 순서대로 실행되고, 전이가 적용되면
//! 곧바로 저장합니다. 저장에 실패하면 메모리 상태를 전이 이전으로 되돌립니다.

use std::sync::Arc;

use chrono::Utc;
use robot_core::{AccountState, Position, TradingSettings};
use robot_data::SettingsStore;
use rust_decimal::Decimal;
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, error, info};

use crate::error::{ExecutionError, Result};
use crate::feed::MarketFeed;
use crate::session::{SettingsRejection, SettingsUpdate, TradingSession, Transition};

/// 협력자에게 노출되는 세션 현황.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TradingStatus {
    pub settings: TradingSettings,
    pub account: AccountState,
    pub position: Option<Position>,
    pub is_open: bool,
    /// 현재 시세로 계산한 미실현 손익
    pub live_pnl: Decimal,
    pub total_pnl: Decimal,
    /// 리스크 레벨에 따른 배분 비율 (%)
    pub risk_pct: Decimal,
    /// 지금 시작하면 사용될 거래 금액
    pub prospective_trade_amount: Decimal,
    /// 선택된 토큰의 최신 변동률
    pub market_pct_change: Option<Decimal>,
}

/// 저장소와 시세 피드를 묶은 트레이딩 서비스.
pub struct TradingService {
    session: Mutex<TradingSession>,
    store: Arc<dyn SettingsStore>,
    feed: Arc<MarketFeed>,
}

impl TradingService {
    /// 저장소에서 세션을 복원합니다.
    ///
    /// 최초 실행이면 기본값을 바로 저장하여 초기 잔고를 고정합니다.
    pub async fn bootstrap(store: Arc<dyn SettingsStore>, feed: Arc<MarketFeed>) -> Result<Self> {
        let state = store.load().await?;
        if !store.is_initialized().await? {
            store.save(&state).await?;
            info!(initial_balance = %state.account.initial_balance, "Settings store initialized");
        }

        info!(
            token = %state.settings.selected_token,
            interval = %state.settings.selected_interval,
            in_position = state.position.is_some(),
            balance = %state.account.current_balance,
            "Trading session restored"
        );

        Ok(Self {
            session: Mutex::new(TradingSession::new(state)),
            store,
            feed,
        })
    }

    pub fn feed(&self) -> &Arc<MarketFeed> {
        &self.feed
    }

    /// "start trading".
    pub async fn start_trading(&self) -> Result<Transition> {
        let mut session = self.session.lock().await;
        let pct = self.feed.pct_change(&session.settings().selected_token).await;

        let before = session.clone();
        let transition = session.start_trading(pct, Utc::now());
        self.commit(&mut session, before, &transition).await?;

        match &transition {
            Transition::Opened { trade_amount, current_balance } => info!(
                token = %session.settings().selected_token,
                trade_amount = %trade_amount,
                balance = %current_balance,
                "Position opened"
            ),
            Transition::Skipped { reason } => debug!(reason = %reason, "Start trading skipped"),
            Transition::Closed { .. } => {}
        }
        Ok(transition)
    }

    /// "stop trading".
    pub async fn stop_trading(&self) -> Result<Transition> {
        let mut session = self.session.lock().await;
        let token = session
            .position()
            .map(|p| p.token.clone())
            .unwrap_or_else(|| session.settings().selected_token.clone());
        let pct = self.feed.pct_change(&token).await;

        let before = session.clone();
        let transition = session.stop_trading(pct);
        self.commit(&mut session, before, &transition).await?;

        match &transition {
            Transition::Closed { realized_amount, total_pnl, .. } => info!(
                token = %token,
                realized = %realized_amount,
                total_pnl = %total_pnl,
                "Position closed"
            ),
            Transition::Skipped { reason } => debug!(reason = %reason, "Stop trading skipped"),
            Transition::Opened { .. } => {}
        }
        Ok(transition)
    }

    /// 시세 갱신 후 미실현 손익을 다시 계산합니다. 저장하지 않습니다.
    pub async fn refresh_live_pnl(&self) -> Option<Decimal> {
        let mut session = self.session.lock().await;
        let token = session.position()?.token.clone();
        let pct = self.feed.pct_change(&token).await;
        session.refresh_live_pnl(pct)
    }

    pub async fn settings(&self) -> TradingSettings {
        self.session.lock().await.settings().clone()
    }

    pub async fn update_settings(&self, update: SettingsUpdate) -> Result<TradingSettings> {
        let mut session = self.session.lock().await;
        let before = session.clone();

        session.apply_settings(update).map_err(|rejection| match rejection {
            SettingsRejection::PositionOpen => ExecutionError::PositionOpen(
                "only the strategy can change while a position is open".to_string(),
            ),
            SettingsRejection::Invalid(msg) => ExecutionError::InvalidSettings(msg),
        })?;

        if let Err(e) = self.store.save(session.state()).await {
            error!(error = %e, "Failed to persist settings, rolling back");
            *session = before;
            return Err(e.into());
        }

        info!(settings = ?session.settings(), "Settings updated");
        Ok(session.settings().clone())
    }

    /// 현재 시세를 반영한 세션 현황.
    pub async fn status(&self) -> TradingStatus {
        let mut session = self.session.lock().await;
        let token = session
            .position()
            .map(|p| p.token.clone())
            .unwrap_or_else(|| session.settings().selected_token.clone());
        let pct = self.feed.pct_change(&token).await;
        session.refresh_live_pnl(pct);

        TradingStatus {
            settings: session.settings().clone(),
            account: session.account().clone(),
            position: session.position().cloned(),
            is_open: session.is_open(),
            live_pnl: session.account().live_pnl,
            total_pnl: session.account().total_pnl(),
            risk_pct: session.risk_pct(),
            prospective_trade_amount: session.trade_amount(),
            market_pct_change: pct,
        }
    }

    async fn commit(
        &self,
        session: &mut TradingSession,
        before: TradingSession,
        transition: &Transition,
    ) -> Result<()> {
        if !transition.is_applied() {
            return Ok(());
        }
        if let Err(e) = self.store.save(session.state()).await {
            error!(error = %e, "Failed to persist transition, rolling back");
            *session = before;
            return Err(e.into());
        }
        Ok(())
    }
}
