//! 스냅샷 구독 WebSocket 서버.
//!
//! # 메시지 형식
//!
//! ## 클라이언트 → 서버
//!
//! ```json
//! {"coin": "btc", "interval": "1h"}
//! ```
//!
//! ## 서버 → 클라이언트
//!
//! 최신순으로 정렬된 스냅샷 배열.
//!
//! ```json
//! [{"event_time": 1738300800000, "open": "100.5", "close": "101.2", "rsi": 55, ...}]
//! ```
//!
//! 푸시 시점은 구독 직후, 연결별 재전송 타이머 주기마다, 그리고
//! `/api/data/{coin}/{interval}` 조회로 같은 쌍이 갱신될 때입니다.

pub mod handler;
pub mod messages;
pub mod registry;
pub mod scheduler;
pub mod timer;

pub use handler::{websocket_handler, websocket_router};
pub use messages::{SubscribeMessage, WsError};
pub use registry::{ConnectionId, ConnectionRegistry, Delivery, PushRequest};
pub use scheduler::BroadcastScheduler;
pub use timer::RefreshTimer;
