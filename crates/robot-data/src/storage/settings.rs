//! 트레이딩 설정 저장소.
//!
//! 상태는 `settings(key, value)` 평면 테이블 하나에 저장됩니다.
//! 저장은 단일 트랜잭션이며 진입 금액 키가 `isInPosition`보다 먼저 기록됩니다.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use robot_core::PersistedState;
use rust_decimal::Decimal;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::error::{DataError, Result};

/// 트레이딩 상태의 영속 저장소.
#[async_trait]
pub trait SettingsStore: Send + Sync {
    /// 마지막으로 저장된 상태, 없으면 기본값.
    async fn load(&self) -> Result<PersistedState>;

    /// 전체 상태를 저장합니다.
    async fn save(&self, state: &PersistedState) -> Result<()>;

    /// 한 번이라도 저장된 적이 있는지 여부.
    async fn is_initialized(&self) -> Result<bool>;
}

// ==================== SQLite ====================

/// SQLite 기반 저장소.
#[derive(Debug, Clone)]
pub struct SqliteSettingsStore {
    pool: SqlitePool,
    initial_balance: Decimal,
}

impl SqliteSettingsStore {
    /// 데이터베이스에 연결하고 테이블을 준비합니다.
    ///
    /// `sqlite::memory:`는 연결마다 별도 DB이므로 연결을 하나로 제한합니다.
    pub async fn connect(database_url: &str, initial_balance: Decimal) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        let pool = if database_url.contains(":memory:") {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(4)
        }
        .connect_with(options)
        .await?;

        let store = Self::from_pool(pool, initial_balance).await?;
        info!(url = %database_url, "Settings store ready");
        Ok(store)
    }

    pub async fn from_pool(pool: SqlitePool, initial_balance: Decimal) -> Result<Self> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS settings (
                key   TEXT PRIMARY KEY NOT NULL,
                value TEXT NOT NULL
            )
            "#,
        )
        .execute(&pool)
        .await?;

        Ok(Self {
            pool,
            initial_balance,
        })
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl SettingsStore for SqliteSettingsStore {
    async fn load(&self) -> Result<PersistedState> {
        let rows: Vec<(String, String)> = sqlx::query_as("SELECT key, value FROM settings")
            .fetch_all(&self.pool)
            .await?;

        debug!(keys = rows.len(), "Settings loaded");
        let entries: HashMap<String, String> = rows.into_iter().collect();
        Ok(PersistedState::from_entries(&entries, self.initial_balance))
    }

    async fn save(&self, state: &PersistedState) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        for (key, value) in state.to_entries() {
            sqlx::query(
                r#"
                INSERT INTO settings (key, value) VALUES (?1, ?2)
                ON CONFLICT(key) DO UPDATE SET value = excluded.value
                "#,
            )
            .bind(key)
            .bind(value)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        debug!(in_position = state.position.is_some(), "Settings saved");
        Ok(())
    }

    async fn is_initialized(&self) -> Result<bool> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM settings")
            .fetch_one(&self.pool)
            .await?;
        Ok(count > 0)
    }
}

// ==================== 메모리 ====================

/// 프로세스 메모리에만 보관하는 저장소.
///
/// 읽기 전용으로 전환하면 저장이 실패합니다.
#[derive(Debug)]
pub struct MemorySettingsStore {
    entries: Mutex<HashMap<String, String>>,
    initial_balance: Decimal,
    read_only: AtomicBool,
}

impl MemorySettingsStore {
    pub fn new(initial_balance: Decimal) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            initial_balance,
            read_only: AtomicBool::new(false),
        }
    }

    pub fn set_read_only(&self, read_only: bool) {
        self.read_only.store(read_only, Ordering::SeqCst);
    }

    /// 저장된 원시 값.
    pub async fn raw(&self, key: &str) -> Option<String> {
        self.entries.lock().await.get(key).cloned()
    }
}

impl Default for MemorySettingsStore {
    fn default() -> Self {
        Self::new(robot_core::DEFAULT_INITIAL_BALANCE)
    }
}

#[async_trait]
impl SettingsStore for MemorySettingsStore {
    async fn load(&self) -> Result<PersistedState> {
        let entries = self.entries.lock().await;
        Ok(PersistedState::from_entries(&entries, self.initial_balance))
    }

    async fn save(&self, state: &PersistedState) -> Result<()> {
        if self.read_only.load(Ordering::SeqCst) {
            return Err(DataError::StoreError("store is read-only".to_string()));
        }
        let mut entries = self.entries.lock().await;
        for (key, value) in state.to_entries() {
            entries.insert(key.to_string(), value);
        }
        Ok(())
    }

    async fn is_initialized(&self) -> Result<bool> {
        Ok(!self.entries.lock().await.is_empty())
    }
}
