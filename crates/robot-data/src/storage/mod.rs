//! 저장소 모듈.

pub mod settings;

pub use settings::{MemorySettingsStore, SettingsStore, SqliteSettingsStore};
