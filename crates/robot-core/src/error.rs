//! 트레이딩 로봇의 에러 타입.

use thiserror::Error;

/// 핵심 로봇 에러.
#[derive(Debug, Error)]
pub enum RobotError {
    /// 설정 소스 로드/역직렬화 실패
    #[error("설정 에러: {0}")]
    Config(#[from] config::ConfigError),

    /// 값은 읽었지만 허용 범위를 벗어남
    #[error("잘못된 설정 '{field}': {reason}")]
    InvalidConfig { field: &'static str, reason: String },
}

/// 로봇 작업을 위한 Result 타입.
pub type RobotResult<T> = Result<T, RobotError>;

impl RobotError {
    pub fn invalid_config(field: &'static str, reason: impl Into<String>) -> Self {
        RobotError::InvalidConfig {
            field,
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_config_message() {
        let err = RobotError::invalid_config("store.initial_balance", "must be positive");
        assert_eq!(
            err.to_string(),
            "잘못된 설정 'store.initial_balance': must be positive"
        );
    }

    #[test]
    fn test_from_config_error() {
        let err = RobotError::from(config::ConfigError::Message("bad".into()));
        assert!(matches!(err, RobotError::Config(_)));
    }
}
