//! WebSocket 메시지 타입.
//!
//! 클라이언트는 `{"coin": "btc", "interval": "1h"}` 형태의 구독 메시지만 보냅니다.
//! 빠진 필드는 빈 문자열(미설정)로 취급합니다. 서버는 스냅샷 JSON 배열만 보냅니다.

use robot_core::SubscriptionKey;
use serde::Deserialize;

/// WebSocket 에러.
#[derive(Debug, thiserror::Error)]
pub enum WsError {
    #[error("잘못된 메시지 형식: {0}")]
    InvalidMessage(String),
}

/// 클라이언트 구독 메시지.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SubscribeMessage {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub coin: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub interval: String,
}

impl SubscribeMessage {
    /// JSON 문자열에서 파싱.
    pub fn from_json(json: &str) -> Result<Self, WsError> {
        serde_json::from_str(json).map_err(|e| WsError::InvalidMessage(e.to_string()))
    }

    pub fn key(&self) -> SubscriptionKey {
        SubscriptionKey::new(self.coin.clone(), self.interval.clone())
    }
}

fn null_as_empty<'de, D: serde::Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}
