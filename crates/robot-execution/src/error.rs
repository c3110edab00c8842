//! 실행 모듈 오류 타입.

use robot_data::DataError;
use thiserror::Error;

/// 트레이딩 서비스 오류.
///
/// 전이 전제 조건 위반은 오류가 아니라 `Transition::Skipped`로 보고됩니다.
#[derive(Debug, Error)]
pub enum ExecutionError {
    /// 포지션이 열려 있는 동안 변경할 수 없는 설정
    #[error("Position is open: {0}")]
    PositionOpen(String),

    /// 잘못된 설정 값
    #[error("Invalid settings: {0}")]
    InvalidSettings(String),

    /// 저장소 오류. 메모리 상태는 이전으로 되돌려짐
    #[error("Store error: {0}")]
    Store(#[from] DataError),
}

pub type Result<T> = std::result::Result<T, ExecutionError>;
