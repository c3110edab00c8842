//! 데이터 수집 및 저장.
//!
//! 이 crate는 다음을 제공합니다:
//! - 스냅샷 Fetcher (심볼/인터벌별 업스트림 JSON)
//! - Binance 24시간 시세 Provider
//! - 트레이딩 설정 저장소 (SQLite, 메모리)

pub mod error;
pub mod provider;
pub mod storage;

pub use error::{DataError, Result};
pub use provider::{BinanceTickerProvider, HttpSnapshotFetcher, SnapshotFetcher, TickerSource};
pub use storage::{MemorySettingsStore, SettingsStore, SqliteSettingsStore};
