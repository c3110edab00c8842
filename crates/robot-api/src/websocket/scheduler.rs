//! 스냅샷 브로드캐스트 스케줄러.
//!
//! 연결마다 푸시 큐 하나와 워커 태스크 하나를 둡니다. 구독 변경, 타이머,
//! 외부 트리거에서 발생한 푸시는 모두 이 큐를 거치므로 연결 단위로 순서가 보장됩니다.
//!
//! ```text
//! on_subscribe ─┐
//! RefreshTimer ─┼─► PushRequest 큐 ─► 워커 ─► SnapshotFetcher ─► Registry::deliver ─► outbox
//! broadcast ────┘
//! ```

use std::sync::Arc;
use std::time::Duration;

use robot_core::{Snapshot, SubscriptionKey};
use robot_data::SnapshotFetcher;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::registry::{ConnectionEntry, ConnectionId, ConnectionRegistry, PushRequest};
use super::timer::RefreshTimer;
use crate::metrics::{record_snapshot_fetch_failure, record_snapshot_push};

/// 연결 레지스트리와 스냅샷 Fetcher를 묶어 푸시를 예약합니다.
pub struct BroadcastScheduler {
    registry: Arc<ConnectionRegistry>,
    fetcher: Arc<dyn SnapshotFetcher>,
    refresh_period: Duration,
    shutdown: CancellationToken,
}

impl BroadcastScheduler {
    pub fn new(
        fetcher: Arc<dyn SnapshotFetcher>,
        refresh_period: Duration,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            registry: Arc::new(ConnectionRegistry::new()),
            fetcher,
            refresh_period,
            shutdown,
        }
    }

    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.registry
    }

    pub async fn connection_count(&self) -> usize {
        self.registry.len().await
    }

    /// 새 연결을 빈 구독으로 등록하고 첫 푸시를 예약합니다.
    pub async fn on_connect(&self, outbox: mpsc::Sender<String>) -> ConnectionId {
        let id = Uuid::new_v4();
        let (pushes, queue) = mpsc::unbounded_channel();
        let cancel = self.shutdown.child_token();

        self.registry
            .add(id, ConnectionEntry::new(outbox, pushes, cancel.clone()))
            .await;

        tokio::spawn(run_pusher(
            id,
            queue,
            cancel,
            self.registry.clone(),
            self.fetcher.clone(),
        ));

        let key = SubscriptionKey::default();
        self.arm_timer(id, &key).await;
        self.registry.enqueue(id, PushRequest::Fetch { key }).await;

        info!(connection_id = %id, "WebSocket 연결 등록");
        id
    }

    /// 구독을 덮어쓰고 타이머를 다시 걸고 즉시 푸시합니다.
    ///
    /// 연결이 이미 제거되었으면 `false`.
    pub async fn on_subscribe(&self, id: ConnectionId, key: SubscriptionKey) -> bool {
        debug!(connection_id = %id, symbol = %key.symbol, interval = %key.interval, "구독 변경");

        if !self.registry.set_subscription(id, key.clone()).await {
            return false;
        }

        self.arm_timer(id, &key).await;
        self.registry.enqueue(id, PushRequest::Fetch { key }).await
    }

    /// 타이머와 워커를 취소하고 엔트리를 제거합니다. 여러 번 호출해도 안전합니다.
    pub async fn on_disconnect(&self, id: ConnectionId) -> bool {
        let removed = self.registry.remove(id).await;
        if removed {
            info!(connection_id = %id, "WebSocket 연결 해제");
        }
        removed
    }

    /// `key` 구독자에게만 스냅샷을 보냅니다. 예약된 연결 수를 반환합니다.
    pub async fn broadcast(&self, key: &SubscriptionKey, snapshot: &Snapshot) -> usize {
        let payload = match snapshot.to_json() {
            Ok(payload) => payload,
            Err(e) => {
                error!(symbol = %key.symbol, interval = %key.interval, error = %e, "스냅샷 직렬화 실패");
                return 0;
            }
        };

        let mut scheduled = 0;
        for id in self.registry.matching(key).await {
            let request = PushRequest::Prepared {
                key: key.clone(),
                payload: payload.clone(),
            };
            if self.registry.enqueue(id, request).await {
                scheduled += 1;
            }
        }

        debug!(symbol = %key.symbol, interval = %key.interval, scheduled, "브로드캐스트 예약");
        scheduled
    }

    /// 모든 연결을 정리합니다.
    pub async fn shutdown(&self) {
        self.registry.clear().await;
    }

    /// `key`를 주기적으로 다시 푸시하는 타이머로 교체합니다.
    async fn arm_timer(&self, id: ConnectionId, key: &SubscriptionKey) {
        let (Some(pushes), Some(parent)) = (
            self.registry.push_sender(id).await,
            self.registry.cancel_token(id).await,
        ) else {
            return;
        };

        let key = key.clone();
        let timer = RefreshTimer::arm(self.refresh_period, &parent, move || {
            pushes.send(PushRequest::Fetch { key: key.clone() }).is_ok()
        });
        self.registry.replace_timer(id, timer).await;
    }
}

/// 연결 하나의 푸시 큐를 소비합니다.
async fn run_pusher(
    id: ConnectionId,
    mut queue: mpsc::UnboundedReceiver<PushRequest>,
    cancel: CancellationToken,
    registry: Arc<ConnectionRegistry>,
    fetcher: Arc<dyn SnapshotFetcher>,
) {
    loop {
        let request = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            request = queue.recv() => match request {
                Some(request) => request,
                None => break,
            },
        };

        match request {
            PushRequest::Fetch { key } => {
                if key.is_unset() {
                    debug!(connection_id = %id, "구독 미설정, 푸시 생략");
                    record_snapshot_push("skipped");
                    continue;
                }

                let fetched = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => break,
                    fetched = fetcher.fetch(&key) => fetched,
                };

                let snapshot = match fetched {
                    Ok(snapshot) => snapshot,
                    Err(e) => {
                        if e.is_not_found() {
                            warn!(connection_id = %id, symbol = %key.symbol, interval = %key.interval, error = %e, "스냅샷 없음");
                        } else {
                            error!(connection_id = %id, symbol = %key.symbol, interval = %key.interval, error = %e, "스냅샷 조회 실패");
                        }
                        record_snapshot_fetch_failure(e.kind());
                        continue;
                    }
                };

                match snapshot.to_json() {
                    Ok(payload) => deliver(&registry, id, &key, payload).await,
                    Err(e) => error!(connection_id = %id, error = %e, "스냅샷 직렬화 실패"),
                }
            }
            PushRequest::Prepared { key, payload } => deliver(&registry, id, &key, payload).await,
        }
    }

    debug!(connection_id = %id, "푸시 워커 종료");
}

async fn deliver(registry: &ConnectionRegistry, id: ConnectionId, key: &SubscriptionKey, payload: String) {
    let outcome = registry.deliver(id, key, payload).await;
    debug!(connection_id = %id, outcome = outcome.as_label(), "스냅샷 푸시");
    record_snapshot_push(outcome.as_label());
}
