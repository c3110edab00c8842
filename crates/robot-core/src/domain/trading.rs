//! 트레이딩 설정, 계좌 상태, 포지션.
//!
//! `PersistedState`는 저장소의 평면 key→string 레이아웃과 상호 변환됩니다.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// 선택 가능한 토큰.
pub const TOKEN_OPTIONS: &[&str] = &["BNB", "ETH", "BTC"];
/// 선택 가능한 캔들 인터벌.
pub const INTERVAL_OPTIONS: &[&str] = &["1m", "5m", "15m", "30m", "1h", "24h"];
/// 선택 가능한 전략 이름.
pub const STRATEGY_OPTIONS: &[&str] = &["Normal", "MA_Crossover", "RSI_Overbought", "CustomStrategy"];
/// 선택 가능한 목표 수익률 (%).
pub const TARGET_PROFIT_OPTIONS: &[u32] = &[5, 10, 15, 20];

pub const DEFAULT_INTERVAL: &str = "24h";
pub const DEFAULT_STRATEGY: &str = "Normal";
pub const DEFAULT_INITIAL_BALANCE: Decimal = dec!(10000);

/// 저장소 키.
pub mod keys {
    pub const SELECTED_TOKEN: &str = "selectedToken";
    pub const SELECTED_INTERVAL: &str = "selectedKlineInterval";
    pub const STRATEGY: &str = "strategy";
    pub const RISK_LEVEL: &str = "riskLevel";
    pub const TARGET_PROFIT: &str = "targetProfit";
    pub const INITIAL_BALANCE: &str = "initialBalance";
    pub const CURRENT_BALANCE: &str = "currentBalance";
    pub const ENTRY_AMOUNT: &str = "initialTradingAmount";
    pub const LIVE_PNL: &str = "liveProfitLoss";
    pub const OPENED_AT: &str = "positionOpenedAt";
    pub const IN_POSITION: &str = "isInPosition";
}

// ==================== 리스크 레벨 ====================

/// 1-5 리스크 레벨. 레벨당 현재 잔고의 20%를 배분합니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct RiskLevel(u8);

impl RiskLevel {
    pub const MIN: RiskLevel = RiskLevel(1);
    pub const MAX: RiskLevel = RiskLevel(5);

    pub fn new(level: u8) -> Option<Self> {
        (Self::MIN.0..=Self::MAX.0).contains(&level).then_some(Self(level))
    }

    pub fn value(self) -> u8 {
        self.0
    }

    /// 거래에 배분되는 잔고 비율 (%).
    pub fn allocation_pct(self) -> Decimal {
        Decimal::from(self.0) * dec!(20)
    }
}

impl Default for RiskLevel {
    fn default() -> Self {
        Self::MIN
    }
}

impl TryFrom<u8> for RiskLevel {
    type Error = String;

    fn try_from(level: u8) -> Result<Self, Self::Error> {
        Self::new(level).ok_or_else(|| format!("risk level must be 1-5, got {level}"))
    }
}

impl From<RiskLevel> for u8 {
    fn from(level: RiskLevel) -> Self {
        level.0
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ==================== 설정 / 계좌 / 포지션 ====================

/// 재시작 후 복원되는 사용자 설정.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TradingSettings {
    pub selected_token: String,
    pub selected_interval: String,
    pub strategy: String,
    pub risk_level: RiskLevel,
    pub target_profit: Decimal,
}

impl Default for TradingSettings {
    fn default() -> Self {
        Self {
            selected_token: String::new(),
            selected_interval: DEFAULT_INTERVAL.to_string(),
            strategy: DEFAULT_STRATEGY.to_string(),
            risk_level: RiskLevel::default(),
            target_profit: dec!(5),
        }
    }
}

/// 계좌 상태.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountState {
    /// 최초 실행 이후 변하지 않음
    pub initial_balance: Decimal,
    pub current_balance: Decimal,
    /// 마지막으로 계산된 미실현 손익
    pub live_pnl: Decimal,
}

impl AccountState {
    pub fn new(initial_balance: Decimal) -> Self {
        Self {
            initial_balance,
            current_balance: initial_balance,
            live_pnl: Decimal::ZERO,
        }
    }

    /// 실현 손익 합계.
    pub fn total_pnl(&self) -> Decimal {
        self.current_balance - self.initial_balance
    }
}

/// 열린 모의 포지션.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Position {
    pub token: String,
    pub interval: String,
    pub entry_amount: Decimal,
    pub risk_level: RiskLevel,
    pub target_profit_pct: Decimal,
    pub opened_at: Option<DateTime<Utc>>,
}

impl Position {
    /// 변동률을 반영한 평가 금액.
    pub fn value_at(&self, pct_change: Decimal) -> Decimal {
        self.entry_amount * (Decimal::ONE + pct_change / dec!(100))
    }

    /// 평가 금액 - 진입 금액.
    pub fn pnl_at(&self, pct_change: Decimal) -> Decimal {
        self.value_at(pct_change) - self.entry_amount
    }
}

// ==================== 영속 상태 ====================

/// 저장소에 기록되는 전체 상태.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedState {
    pub settings: TradingSettings,
    pub account: AccountState,
    pub position: Option<Position>,
}

impl Default for PersistedState {
    fn default() -> Self {
        Self::with_initial_balance(DEFAULT_INITIAL_BALANCE)
    }
}

impl PersistedState {
    pub fn with_initial_balance(initial_balance: Decimal) -> Self {
        Self {
            settings: TradingSettings::default(),
            account: AccountState::new(initial_balance),
            position: None,
        }
    }

    /// 저장 순서대로 정렬된 key/value 목록.
    ///
    /// 진입 금액이 포함된 키가 `isInPosition`보다 먼저 옵니다.
    pub fn to_entries(&self) -> Vec<(&'static str, String)> {
        let position = self.position.as_ref();
        let opened_at = position
            .and_then(|p| p.opened_at)
            .map(|t| t.to_rfc3339())
            .unwrap_or_default();

        vec![
            (keys::SELECTED_TOKEN, self.settings.selected_token.clone()),
            (keys::SELECTED_INTERVAL, self.settings.selected_interval.clone()),
            (keys::STRATEGY, self.settings.strategy.clone()),
            (keys::RISK_LEVEL, self.settings.risk_level.to_string()),
            (keys::TARGET_PROFIT, encode(self.settings.target_profit)),
            (keys::INITIAL_BALANCE, encode(self.account.initial_balance)),
            (keys::CURRENT_BALANCE, encode(self.account.current_balance)),
            (
                keys::ENTRY_AMOUNT,
                encode(position.map(|p| p.entry_amount).unwrap_or_default()),
            ),
            (keys::LIVE_PNL, encode(self.account.live_pnl)),
            (keys::OPENED_AT, opened_at),
            (keys::IN_POSITION, position.is_some().to_string()),
        ]
    }

    /// 저장된 key/value에서 상태를 복원합니다.
    ///
    /// 키가 없거나 해석할 수 없는 값은 기본값을 사용합니다. `isInPosition`이 true여도
    /// 진입 금액이 없으면 포지션은 닫힌 것으로 봅니다.
    pub fn from_entries(entries: &HashMap<String, String>, initial_balance: Decimal) -> Self {
        let defaults = Self::with_initial_balance(initial_balance);
        // 빈 토큰/인터벌은 미선택 상태 그대로 복원
        let raw = |key: &str| entries.get(key).map(|v| v.trim().to_string());
        let get = |key: &str| entries.get(key).map(|v| v.trim()).filter(|v| !v.is_empty());
        let decimal = |key: &str| get(key).and_then(|v| Decimal::from_str(v).ok());

        let settings = TradingSettings {
            selected_token: raw(keys::SELECTED_TOKEN).unwrap_or(defaults.settings.selected_token),
            selected_interval: raw(keys::SELECTED_INTERVAL)
                .unwrap_or(defaults.settings.selected_interval),
            strategy: get(keys::STRATEGY)
                .map(str::to_string)
                .unwrap_or(defaults.settings.strategy),
            risk_level: get(keys::RISK_LEVEL)
                .and_then(|v| v.parse::<u8>().ok())
                .and_then(RiskLevel::new)
                .unwrap_or_default(),
            target_profit: decimal(keys::TARGET_PROFIT).unwrap_or(defaults.settings.target_profit),
        };

        let initial = decimal(keys::INITIAL_BALANCE).unwrap_or(initial_balance);
        let account = AccountState {
            initial_balance: initial,
            current_balance: decimal(keys::CURRENT_BALANCE).unwrap_or(initial),
            live_pnl: decimal(keys::LIVE_PNL).unwrap_or_default(),
        };

        let in_position = get(keys::IN_POSITION) == Some("true");
        let position = decimal(keys::ENTRY_AMOUNT)
            .filter(|amount| in_position && *amount > Decimal::ZERO)
            .map(|entry_amount| Position {
                token: settings.selected_token.clone(),
                interval: settings.selected_interval.clone(),
                entry_amount,
                risk_level: settings.risk_level,
                target_profit_pct: settings.target_profit,
                opened_at: get(keys::OPENED_AT)
                    .and_then(|v| DateTime::parse_from_rfc3339(v).ok())
                    .map(|t| t.with_timezone(&Utc)),
            });

        Self {
            settings,
            account,
            position,
        }
    }
}

/// 저장용 10진 문자열. 뒤쪽 0은 제거합니다 (`6300.00` → `6300`).
fn encode(value: Decimal) -> String {
    value.normalize().to_string()
}
