//! API 에러 응답 타입.
//!
//! 모든 REST 엔드포인트는 실패 시 같은 JSON 형식을 반환합니다.
//!
//! ```json
//! {
//!   "code": "SNAPSHOT_NOT_FOUND",
//!   "message": "Not found: https://.../BTCUSDT-data-1h.json",
//!   "timestamp": 1738300800
//! }
//! ```

use axum::http::StatusCode;
use axum::Json;
use robot_data::DataError;
use robot_execution::ExecutionError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// API 에러 응답.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiErrorResponse {
    /// 에러 코드 (예: "INVALID_INPUT", "FETCH_FAILED")
    pub code: String,
    /// 사람이 읽을 수 있는 에러 메시지
    pub message: String,
    /// 추가 상세 정보
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
    /// 에러 발생 시각 (Unix timestamp)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
}

impl ApiErrorResponse {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
            timestamp: Some(chrono::Utc::now().timestamp()),
        }
    }

    pub fn with_details(code: impl Into<String>, message: impl Into<String>, details: Value) -> Self {
        Self {
            details: Some(details),
            ..Self::new(code, message)
        }
    }

    /// 상태 코드와 함께 핸들러 에러로 변환합니다.
    pub fn into_error(self, status: StatusCode) -> (StatusCode, Json<ApiErrorResponse>) {
        (status, Json(self))
    }
}

impl std::fmt::Display for ApiErrorResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for ApiErrorResponse {}

/// API 핸들러 Result 타입 별칭.
pub type ApiResult<T> = Result<T, (StatusCode, Json<ApiErrorResponse>)>;

/// 업스트림 스냅샷 실패는 500, 잘못된 입력은 400으로 응답합니다.
pub fn snapshot_error(err: &DataError) -> (StatusCode, Json<ApiErrorResponse>) {
    let code = match err {
        DataError::NotFound(_) => "SNAPSHOT_NOT_FOUND",
        DataError::ParseError(_) => "PARSE_FAILED",
        DataError::InvalidData(_) => {
            return ApiErrorResponse::new("INVALID_INPUT", err.to_string())
                .into_error(StatusCode::BAD_REQUEST)
        }
        _ => "FETCH_FAILED",
    };
    ApiErrorResponse::new(code, err.to_string()).into_error(StatusCode::INTERNAL_SERVER_ERROR)
}

pub fn execution_error(err: &ExecutionError) -> (StatusCode, Json<ApiErrorResponse>) {
    match err {
        ExecutionError::PositionOpen(_) => {
            ApiErrorResponse::new("POSITION_OPEN", err.to_string()).into_error(StatusCode::CONFLICT)
        }
        ExecutionError::InvalidSettings(_) => {
            ApiErrorResponse::new("INVALID_INPUT", err.to_string()).into_error(StatusCode::BAD_REQUEST)
        }
        ExecutionError::Store(_) => ApiErrorResponse::new("STORE_ERROR", err.to_string())
            .into_error(StatusCode::INTERNAL_SERVER_ERROR),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serialization_skips_empty_details() {
        let json = serde_json::to_string(&ApiErrorResponse::new("NOT_FOUND", "missing")).unwrap();
        assert!(json.contains(r#""code":"NOT_FOUND""#));
        assert!(!json.contains("details"));
    }

    #[test]
    fn test_snapshot_error_mapping() {
        let (status, body) = snapshot_error(&DataError::NotFound("x".into()));
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body.code, "SNAPSHOT_NOT_FOUND");

        let (status, body) = snapshot_error(&DataError::FetchError("503".into()));
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body.code, "FETCH_FAILED");

        let (status, _) = snapshot_error(&DataError::InvalidData("../".into()));
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_execution_error_mapping() {
        let (status, body) = execution_error(&ExecutionError::PositionOpen("open".into()));
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body.code, "POSITION_OPEN");
    }
}
