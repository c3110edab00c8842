//! 모의 포지션 실행.
//!
//! 이 crate는 다음을 제공합니다:
//! - Flat/Open 두 상태의 포지션 상태 머신
//! - 토큰별 최신 시세 피드
//! - 전이마다 상태를 저장하는 트레이딩 서비스
//!
//! # 예제
//!
//! ```rust,ignore
//! use robot_execution::{MarketFeed, TradingService};
//!
//! let feed = Arc::new(MarketFeed::new(Duration::from_secs(60)));
//! let service = TradingService::bootstrap(store, feed).await?;
//! let transition = service.start_trading().await?;
//! ```

pub mod error;
pub mod feed;
pub mod service;
pub mod session;

pub use error::{ExecutionError, Result};
pub use feed::MarketFeed;
pub use service::{TradingService, TradingStatus};
pub use session::{SettingsUpdate, SkipReason, TradingSession, Transition};
