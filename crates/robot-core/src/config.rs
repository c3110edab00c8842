//! 설정 관리.
//!
//! 기본값 → `config/default.toml`(선택) → `ROBOT__*` 환경 변수 순으로 병합됩니다.
//! 예: `ROBOT__SERVER__PORT=4000`, `ROBOT__SNAPSHOT__REFRESH_INTERVAL_SECS=30`.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::error::{RobotError, RobotResult};

/// 기본 스냅샷 저장소 위치.
pub const DEFAULT_SNAPSHOT_BASE_URL: &str =
    "https://storage.googleapis.com/rc-robot-binance-api/data";

/// 기본 24시간 시세 API 위치.
pub const DEFAULT_TICKER_BASE_URL: &str = "https://api.binance.com";

/// 애플리케이션 설정.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct AppConfig {
    /// 서버 설정
    pub server: ServerConfig,
    /// 스냅샷 피드 설정
    pub snapshot: SnapshotConfig,
    /// 시세 폴링 설정
    pub ticker: TickerConfig,
    /// 설정 저장소
    pub store: StoreConfig,
    /// 로깅 설정
    pub logging: LoggingConfig,
}

/// 서버 설정.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// 바인딩할 호스트
    pub host: String,
    /// 리스닝할 포트
    pub port: u16,
    /// 요청 타임아웃 (초)
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3001,
            request_timeout_secs: 30,
        }
    }
}

impl ServerConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// 스냅샷 피드 설정.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SnapshotConfig {
    /// 업스트림 기본 URL (`{base_url}/{SYMBOL}USDT-data-{interval}.json`)
    pub base_url: String,
    /// 연결별 재전송 주기 (초)
    pub refresh_interval_secs: u64,
    /// 업스트림 요청 타임아웃 (초)
    pub timeout_secs: u64,
    /// 연결별 송신 버퍼 크기
    pub outbound_buffer: usize,
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_SNAPSHOT_BASE_URL.to_string(),
            refresh_interval_secs: 60,
            timeout_secs: 30,
            outbound_buffer: 32,
        }
    }
}

impl SnapshotConfig {
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs.max(1))
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }
}

/// 24시간 시세 폴링 설정.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TickerConfig {
    pub base_url: String,
    /// 추적할 토큰 (USDT 페어 기준)
    pub tokens: Vec<String>,
    pub poll_interval_secs: u64,
    /// HTTP 요청 타임아웃 (초)
    pub timeout_secs: u64,
    /// 이 시간보다 오래된 시세는 사용하지 않음 (초)
    pub stale_after_secs: u64,
}

impl Default for TickerConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_TICKER_BASE_URL.to_string(),
            tokens: vec!["BNB".to_string(), "ETH".to_string(), "BTC".to_string()],
            poll_interval_secs: 5,
            timeout_secs: 10,
            stale_after_secs: 60,
        }
    }
}

impl TickerConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs.max(1))
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }
}

/// 설정 저장소.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StoreConfig {
    /// SQLite 연결 문자열
    pub database_url: String,
    /// 최초 실행 시 기록되는 초기 잔고
    pub initial_balance: Decimal,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            database_url: "sqlite://robot.db?mode=rwc".to_string(),
            initial_balance: dec!(10000),
        }
    }
}

/// 로깅 설정.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// 로그 레벨
    pub level: String,
    /// 로그 형식 (pretty, json, compact)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl AppConfig {
    /// 파일과 환경 변수에서 설정을 로드합니다. 파일이 없어도 됩니다.
    pub fn load<P: AsRef<Path>>(path: P) -> RobotResult<Self> {
        let builder = config::Config::builder()
            .add_source(config::File::from(path.as_ref()).required(false))
            .add_source(
                config::Environment::with_prefix("ROBOT")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("ticker.tokens")
                    .try_parsing(true),
            );

        let config: AppConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// 기본 경로에서 설정을 로드합니다.
    pub fn load_default() -> RobotResult<Self> {
        Self::load("config/default.toml")
    }

    fn validate(&self) -> RobotResult<()> {
        if self.snapshot.base_url.trim().is_empty() {
            return Err(RobotError::invalid_config(
                "snapshot.base_url",
                "must not be empty",
            ));
        }
        if self.store.initial_balance <= Decimal::ZERO {
            return Err(RobotError::invalid_config(
                "store.initial_balance",
                "must be positive",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();

        assert_eq!(config.server.bind_addr(), "0.0.0.0:3001");
        assert_eq!(config.snapshot.refresh_interval(), Duration::from_secs(60));
        assert_eq!(config.ticker.tokens, vec!["BNB", "ETH", "BTC"]);
        assert_eq!(config.ticker.poll_interval(), Duration::from_secs(5));
        assert_eq!(config.ticker.timeout(), Duration::from_secs(10));
        assert_eq!(config.store.initial_balance, dec!(10000));
    }

    #[test]
    fn test_load_without_file_uses_defaults() {
        let config = AppConfig::load("does/not/exist.toml").unwrap();
        assert_eq!(config.snapshot.base_url, DEFAULT_SNAPSHOT_BASE_URL);
    }

    #[test]
    fn test_non_positive_initial_balance_is_rejected() {
        let config = AppConfig {
            store: StoreConfig {
                initial_balance: Decimal::ZERO,
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(RobotError::InvalidConfig { field: "store.initial_balance", .. })
        ));
    }

    #[test]
    fn test_zero_interval_is_clamped() {
        let snapshot = SnapshotConfig {
            refresh_interval_secs: 0,
            ..Default::default()
        };
        assert_eq!(snapshot.refresh_interval(), Duration::from_secs(1));
    }
}
