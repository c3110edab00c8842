//! 백그라운드 서비스 모듈.

pub mod ticker_sync;

pub use ticker_sync::{start_ticker_sync_service, TickerSyncService};
