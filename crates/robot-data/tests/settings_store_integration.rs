//! SQLite 설정 저장소 통합 테스트.
//!
//! 임시 파일 DB를 사용해 재시작(재연결) 후에도 상태가 유지되는지 확인합니다.

use chrono::Utc;
use robot_core::{Position, RiskLevel};
use robot_data::{SettingsStore, SqliteSettingsStore};
use rust_decimal_macros::dec;
use tempfile::TempDir;

/// 임시 디렉터리 안의 DB URL. 디렉터리는 drop 시 삭제됩니다.
fn temp_db_url() -> (TempDir, String) {
    let dir = TempDir::new().unwrap();
    let url = format!("sqlite://{}?mode=rwc", dir.path().join("settings.db").display());
    (dir, url)
}

#[tokio::test]
async fn test_state_survives_reconnect() {
    let (_dir, url) = temp_db_url();

    let store = SqliteSettingsStore::connect(&url, dec!(10000)).await.unwrap();
    let mut state = store.load().await.unwrap();
    state.settings.selected_token = "BNB".into();
    state.settings.selected_interval = "1h".into();
    state.settings.risk_level = RiskLevel::new(3).unwrap();
    state.account.current_balance = dec!(4000);
    state.position = Some(Position {
        token: "BNB".into(),
        interval: "1h".into(),
        entry_amount: dec!(6000),
        risk_level: RiskLevel::new(3).unwrap(),
        target_profit_pct: dec!(5),
        opened_at: Some(Utc::now()),
    });
    store.save(&state).await.unwrap();
    store.close().await;

    let reopened = SqliteSettingsStore::connect(&url, dec!(10000)).await.unwrap();
    let restored = reopened.load().await.unwrap();
    reopened.close().await;

    assert_eq!(restored, state);
    assert_eq!(restored.position.unwrap().entry_amount, dec!(6000));
}

#[tokio::test]
async fn test_save_of_load_is_idempotent() {
    let (_dir, url) = temp_db_url();
    let store = SqliteSettingsStore::connect(&url, dec!(10000)).await.unwrap();

    let first = store.load().await.unwrap();
    store.save(&first).await.unwrap();
    let second = store.load().await.unwrap();
    store.save(&second).await.unwrap();
    let third = store.load().await.unwrap();

    store.close().await;

    assert_eq!(first, second);
    assert_eq!(second, third);
}

#[tokio::test]
async fn test_initial_balance_fixed_after_first_save() {
    let (_dir, url) = temp_db_url();

    let store = SqliteSettingsStore::connect(&url, dec!(10000)).await.unwrap();
    assert!(!store.is_initialized().await.unwrap());
    store.save(&store.load().await.unwrap()).await.unwrap();
    store.close().await;

    // 다른 초기 잔고로 다시 열어도 저장된 값이 우선
    let reopened = SqliteSettingsStore::connect(&url, dec!(500)).await.unwrap();
    let state = reopened.load().await.unwrap();
    reopened.close().await;

    assert_eq!(state.account.initial_balance, dec!(10000));
}
