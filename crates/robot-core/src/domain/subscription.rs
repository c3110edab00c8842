//! 구독 키.

use serde::{Deserialize, Serialize};
use std::fmt;

/// 연결 하나가 구독 중인 (심볼, 인터벌) 쌍.
///
/// 두 필드 중 하나라도 비어 있으면 미설정 상태이며 푸시 대상이 아닙니다.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubscriptionKey {
    pub symbol: String,
    pub interval: String,
}

impl SubscriptionKey {
    pub fn new(symbol: impl Into<String>, interval: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into().trim().to_string(),
            interval: interval.into().trim().to_string(),
        }
    }

    pub fn is_unset(&self) -> bool {
        self.symbol.is_empty() || self.interval.is_empty()
    }

    /// 업스트림 파일명에 쓰이는 USDT 페어 이름 (예: `BTCUSDT`).
    pub fn pair(&self) -> String {
        format!("{}USDT", self.symbol.to_uppercase())
    }
}

impl fmt::Display for SubscriptionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.symbol, self.interval)
    }
}
