//! 데이터 모듈 오류 타입.

use thiserror::Error;

/// 데이터 관련 오류.
#[derive(Debug, Error)]
pub enum DataError {
    /// 업스트림에 해당 리소스 없음 (HTTP 404)
    #[error("Not found: {0}")]
    NotFound(String),

    /// 비정상 상태 코드 또는 전송 실패
    #[error("Fetch error: {0}")]
    FetchError(String),

    /// 응답 본문 파싱 실패
    #[error("Parse error: {0}")]
    ParseError(String),

    /// 잘못된 요청 값
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// 저장소 오류
    #[error("Store error: {0}")]
    StoreError(String),

    /// 설정 오류
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl DataError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, DataError::NotFound(_))
    }

    /// 메트릭/로그 라벨용 짧은 이름.
    pub fn kind(&self) -> &'static str {
        match self {
            DataError::NotFound(_) => "not_found",
            DataError::FetchError(_) => "fetch",
            DataError::ParseError(_) => "parse",
            DataError::InvalidData(_) => "invalid",
            DataError::StoreError(_) => "store",
            DataError::ConfigError(_) => "config",
        }
    }
}

impl From<sqlx::Error> for DataError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Database(db_err) => DataError::StoreError(db_err.message().to_string()),
            sqlx::Error::Configuration(e) => DataError::ConfigError(e.to_string()),
            _ => DataError::StoreError(err.to_string()),
        }
    }
}

impl From<reqwest::Error> for DataError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            DataError::ParseError(err.to_string())
        } else {
            DataError::FetchError(err.to_string())
        }
    }
}

impl From<serde_json::Error> for DataError {
    fn from(err: serde_json::Error) -> Self {
        DataError::ParseError(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, DataError>;
