//! 스냅샷 Fetcher.
//!
//! 업스트림은 (심볼, 인터벌)마다 JSON 파일 하나를 제공합니다.
//! 재시도는 하지 않습니다. 주기적 재전송이 유일한 재시도 수단입니다.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use robot_core::{Snapshot, SnapshotConfig, SubscriptionKey};
use tracing::{debug, error, warn};

use crate::error::{DataError, Result};

/// (심볼, 인터벌)에 대한 스냅샷을 가져옵니다.
#[async_trait]
pub trait SnapshotFetcher: Send + Sync {
    async fn fetch(&self, key: &SubscriptionKey) -> Result<Snapshot>;
}

/// HTTP 업스트림에서 스냅샷을 가져오는 Fetcher.
#[derive(Debug, Clone)]
pub struct HttpSnapshotFetcher {
    client: Client,
    base_url: String,
}

impl HttpSnapshotFetcher {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DataError::ConfigError(format!("HTTP 클라이언트 생성 실패: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config(config: &SnapshotConfig) -> Result<Self> {
        Self::new(config.base_url.clone(), config.timeout())
    }

    /// 업스트림 파일 위치.
    pub fn locator(&self, key: &SubscriptionKey) -> Result<String> {
        if key.is_unset() {
            return Err(DataError::InvalidData(format!("unset subscription: {}", key)));
        }
        let valid = |s: &str| s.chars().all(|c| c.is_ascii_alphanumeric());
        if !valid(&key.symbol) || !valid(&key.interval) {
            return Err(DataError::InvalidData(format!("invalid subscription: {}", key)));
        }

        Ok(format!(
            "{}/{}-data-{}.json",
            self.base_url,
            key.pair(),
            key.interval
        ))
    }

    async fn handle_response(&self, url: &str, response: reqwest::Response) -> Result<Snapshot> {
        let status = response.status();

        if status == StatusCode::NOT_FOUND {
            warn!(url = %url, "Snapshot not found upstream");
            return Err(DataError::NotFound(url.to_string()));
        }
        if !status.is_success() {
            error!(url = %url, status = %status, "Snapshot fetch failed");
            return Err(DataError::FetchError(format!("HTTP {} for {}", status, url)));
        }

        let body = response.text().await?;
        serde_json::from_str::<Snapshot>(&body).map_err(|e| {
            error!(url = %url, error = %e, "Failed to parse snapshot body");
            DataError::ParseError(e.to_string())
        })
    }
}

#[async_trait]
impl SnapshotFetcher for HttpSnapshotFetcher {
    async fn fetch(&self, key: &SubscriptionKey) -> Result<Snapshot> {
        let url = self.locator(key)?;
        debug!("GET {}", url);

        let response = self.client.get(&url).send().await.map_err(|e| {
            error!(url = %url, error = %e, "Snapshot request failed");
            DataError::FetchError(e.to_string())
        })?;

        let snapshot = self.handle_response(&url, response).await?;
        debug!(key = %key, records = snapshot.len(), "Snapshot fetched");
        Ok(snapshot)
    }
}
