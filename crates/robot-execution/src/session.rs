//! 단일 포지션 상태 머신.
//!
//! 상태는 `Flat`(포지션 없음)과 `Open` 두 가지입니다.
//!
//! - **Flat → Open**: 거래 금액 = 현재 잔고 × (리스크 레벨 × 20%).
//!   잔고에서 차감하고 진입 금액으로 기록합니다.
//! - **Open → Flat**: 실현 금액 = 진입 금액 × (1 + 변동률/100).
//!   잔고에 더하고 총 손익 = 현재 잔고 - 초기 잔고.
//! - **미실현 손익**: 진입 금액 × (1 + 변동률/100) - 진입 금액. 잔고는 바뀌지 않습니다.
//!
//! 전제 조건을 만족하지 않으면 상태를 바꾸지 않고 `Transition::Skipped`를 돌려줍니다.

use chrono::{DateTime, Utc};
use robot_core::{AccountState, PersistedState, Position, RiskLevel, TradingSettings};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;

/// 전이가 적용되지 않은 이유.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SkipReason {
    AlreadyOpen,
    NotOpen,
    TokenNotSelected,
    IntervalNotSelected,
    ZeroTradeAmount,
    MarketDataUnavailable,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            SkipReason::AlreadyOpen => "position already open",
            SkipReason::NotOpen => "no open position",
            SkipReason::TokenNotSelected => "token not selected",
            SkipReason::IntervalNotSelected => "interval not selected",
            SkipReason::ZeroTradeAmount => "trade amount is zero",
            SkipReason::MarketDataUnavailable => "market data unavailable",
        };
        f.write_str(text)
    }
}

/// 상태 전이 결과.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "camelCase")]
pub enum Transition {
    /// 포지션 오픈
    #[serde(rename_all = "camelCase")]
    Opened {
        trade_amount: Decimal,
        current_balance: Decimal,
    },
    /// 포지션 종료
    #[serde(rename_all = "camelCase")]
    Closed {
        realized_amount: Decimal,
        current_balance: Decimal,
        total_pnl: Decimal,
    },
    /// 전제 조건 미충족, 상태 변화 없음
    Skipped { reason: SkipReason },
}

impl Transition {
    pub fn is_applied(&self) -> bool {
        !matches!(self, Transition::Skipped { .. })
    }
}

/// 설정 부분 업데이트.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsUpdate {
    pub selected_token: Option<String>,
    pub selected_interval: Option<String>,
    pub strategy: Option<String>,
    pub risk_level: Option<u8>,
    pub target_profit: Option<Decimal>,
}

impl SettingsUpdate {
    /// 포지션 보유 중 바꿀 수 없는 필드가 포함되어 있는지.
    fn touches_position(&self) -> bool {
        self.selected_token.is_some()
            || self.selected_interval.is_some()
            || self.risk_level.is_some()
            || self.target_profit.is_some()
    }
}

/// 설정 업데이트 거부 사유.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettingsRejection {
    PositionOpen,
    Invalid(String),
}

/// 한 사용자의 트레이딩 세션.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TradingSession {
    state: PersistedState,
}

impl TradingSession {
    pub fn new(state: PersistedState) -> Self {
        Self { state }
    }

    pub fn state(&self) -> &PersistedState {
        &self.state
    }

    pub fn settings(&self) -> &TradingSettings {
        &self.state.settings
    }

    pub fn account(&self) -> &AccountState {
        &self.state.account
    }

    pub fn position(&self) -> Option<&Position> {
        self.state.position.as_ref()
    }

    pub fn is_open(&self) -> bool {
        self.state.position.is_some()
    }

    /// 현재 리스크 레벨의 잔고 배분 비율 (%).
    pub fn risk_pct(&self) -> Decimal {
        self.state.settings.risk_level.allocation_pct()
    }

    /// 지금 시작하면 사용될 거래 금액.
    pub fn trade_amount(&self) -> Decimal {
        self.state.account.current_balance * self.risk_pct() / dec!(100)
    }

    /// Flat → Open.
    pub fn start_trading(&mut self, pct_change: Option<Decimal>, now: DateTime<Utc>) -> Transition {
        if let Some(reason) = self.start_blocker(pct_change) {
            return Transition::Skipped { reason };
        }

        let trade_amount = self.trade_amount();
        let settings = &self.state.settings;
        self.state.position = Some(Position {
            token: settings.selected_token.clone(),
            interval: settings.selected_interval.clone(),
            entry_amount: trade_amount,
            risk_level: settings.risk_level,
            target_profit_pct: settings.target_profit,
            opened_at: Some(now),
        });
        self.state.account.current_balance -= trade_amount;
        self.state.account.live_pnl = Decimal::ZERO;

        Transition::Opened {
            trade_amount,
            current_balance: self.state.account.current_balance,
        }
    }

    fn start_blocker(&self, pct_change: Option<Decimal>) -> Option<SkipReason> {
        let settings = &self.state.settings;
        if self.is_open() {
            Some(SkipReason::AlreadyOpen)
        } else if settings.selected_token.is_empty() {
            Some(SkipReason::TokenNotSelected)
        } else if settings.selected_interval.is_empty() {
            Some(SkipReason::IntervalNotSelected)
        } else if self.trade_amount() <= Decimal::ZERO {
            Some(SkipReason::ZeroTradeAmount)
        } else if pct_change.is_none() {
            Some(SkipReason::MarketDataUnavailable)
        } else {
            None
        }
    }

    /// Open → Flat.
    pub fn stop_trading(&mut self, pct_change: Option<Decimal>) -> Transition {
        let Some(position) = self.state.position.as_ref() else {
            return Transition::Skipped {
                reason: SkipReason::NotOpen,
            };
        };
        let Some(pct) = pct_change else {
            return Transition::Skipped {
                reason: SkipReason::MarketDataUnavailable,
            };
        };

        let realized_amount = position.value_at(pct);
        self.state.position = None;
        self.state.account.current_balance += realized_amount;
        self.state.account.live_pnl = Decimal::ZERO;

        Transition::Closed {
            realized_amount,
            current_balance: self.state.account.current_balance,
            total_pnl: self.state.account.total_pnl(),
        }
    }

    /// 미실현 손익을 다시 계산합니다. 포지션이 없거나 시세가 없으면 `None`.
    pub fn refresh_live_pnl(&mut self, pct_change: Option<Decimal>) -> Option<Decimal> {
        let pnl = self.state.position.as_ref()?.pnl_at(pct_change?);
        self.state.account.live_pnl = pnl;
        Some(pnl)
    }

    /// 설정을 검증하고 적용합니다.
    ///
    /// 포지션이 열려 있으면 전략 외의 필드는 바꿀 수 없습니다.
    pub fn apply_settings(&mut self, update: SettingsUpdate) -> Result<(), SettingsRejection> {
        if self.is_open() && update.touches_position() {
            return Err(SettingsRejection::PositionOpen);
        }

        let mut next = self.state.settings.clone();

        if let Some(token) = update.selected_token {
            let token = token.trim().to_uppercase();
            if !token.chars().all(|c| c.is_ascii_alphanumeric()) {
                return Err(SettingsRejection::Invalid(format!("invalid token: {token}")));
            }
            next.selected_token = token;
        }
        if let Some(interval) = update.selected_interval {
            let interval = interval.trim().to_string();
            if !interval.chars().all(|c| c.is_ascii_alphanumeric()) {
                return Err(SettingsRejection::Invalid(format!("invalid interval: {interval}")));
            }
            next.selected_interval = interval;
        }
        if let Some(strategy) = update.strategy {
            let strategy = strategy.trim().to_string();
            if strategy.is_empty() {
                return Err(SettingsRejection::Invalid("strategy must not be empty".into()));
            }
            next.strategy = strategy;
        }
        if let Some(level) = update.risk_level {
            next.risk_level = RiskLevel::new(level)
                .ok_or_else(|| SettingsRejection::Invalid(format!("risk level must be 1-5, got {level}")))?;
        }
        if let Some(target) = update.target_profit {
            if target <= Decimal::ZERO {
                return Err(SettingsRejection::Invalid("target profit must be positive".into()));
            }
            next.target_profit = target;
        }

        self.state.settings = next;
        Ok(())
    }
}
