//! 데이터 Provider 모듈.
//!
//! ## 스냅샷
//! - `SnapshotFetcher`: (심볼, 인터벌) → 최신순 `Snapshot`
//! - `HttpSnapshotFetcher`: `{base}/{SYMBOL}USDT-data-{interval}.json` 조회
//!
//! ## 24시간 시세
//! - `TickerSource`: 토큰 → `MarketQuote`
//! - `BinanceTickerProvider`: `/api/v3/ticker/24hr` 조회

pub mod snapshot;
pub mod ticker;

pub use snapshot::{HttpSnapshotFetcher, SnapshotFetcher};
pub use ticker::{BinanceTickerProvider, TickerSource};
