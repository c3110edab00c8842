//! # Robot Core
//!
//! 마켓 스냅샷 릴레이와 모의 트레이딩 로봇의 핵심 도메인 타입을 제공합니다.
//!
//! 이 크레이트는 다른 크레이트 전반에서 사용되는 기본 타입을 제공합니다:
//! - 마켓 레코드 및 스냅샷
//! - 구독 키 (심볼, 인터벌)
//! - 트레이딩 설정, 계좌 상태, 포지션
//! - 설정 관리
//! - 로깅 인프라

pub mod config;
pub mod domain;
pub mod error;
pub mod logging;

pub use config::*;
pub use domain::*;
pub use error::*;
pub use logging::*;
