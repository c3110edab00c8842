//! WebSocket 연결 레지스트리.
//!
//! 연결마다 현재 구독, 송신 큐, 푸시 큐, 재전송 타이머를 보관합니다.
//! 타이머 핸들은 레지스트리만 소유하며 엔트리 제거 시 함께 취소됩니다.

use std::collections::HashMap;

use robot_core::SubscriptionKey;
use tokio::sync::{mpsc, RwLock};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::timer::RefreshTimer;

pub type ConnectionId = Uuid;

/// 연결의 푸시 큐에 들어가는 요청. 연결별로 FIFO 순서로 처리됩니다.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushRequest {
    /// 예약 시점의 구독 키로 스냅샷을 새로 가져와 전송
    Fetch { key: SubscriptionKey },
    /// 이미 직렬화된 스냅샷을 `key` 구독자에게 전송
    Prepared { key: SubscriptionKey, payload: String },
}

/// 전송 시도 결과.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Sent,
    /// 연결이 이미 제거됨
    Gone,
    /// 가져오는 사이 구독이 바뀜
    Stale,
    /// 송신 큐가 닫혔거나 가득 참
    NotReady,
}

impl Delivery {
    pub fn as_label(self) -> &'static str {
        match self {
            Delivery::Sent => "sent",
            Delivery::Gone => "gone",
            Delivery::Stale => "stale",
            Delivery::NotReady => "skipped",
        }
    }
}

/// 레지스트리 엔트리.
#[derive(Debug)]
pub struct ConnectionEntry {
    key: SubscriptionKey,
    outbox: mpsc::Sender<String>,
    pushes: mpsc::UnboundedSender<PushRequest>,
    cancel: CancellationToken,
    timer: Option<RefreshTimer>,
}

impl ConnectionEntry {
    pub fn new(
        outbox: mpsc::Sender<String>,
        pushes: mpsc::UnboundedSender<PushRequest>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            key: SubscriptionKey::default(),
            outbox,
            pushes,
            cancel,
            timer: None,
        }
    }

    pub fn key(&self) -> &SubscriptionKey {
        &self.key
    }

    fn shutdown(&self) {
        self.cancel.cancel();
        if let Some(timer) = &self.timer {
            timer.cancel();
        }
    }
}

/// 연결 레지스트리.
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    connections: RwLock<HashMap<ConnectionId, ConnectionEntry>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add(&self, id: ConnectionId, entry: ConnectionEntry) {
        self.connections.write().await.insert(id, entry);
    }

    /// 연결을 제거하고 타이머/푸시 워커를 취소합니다. 이미 없으면 `false`.
    pub async fn remove(&self, id: ConnectionId) -> bool {
        let removed = self.connections.write().await.remove(&id);
        match removed {
            Some(entry) => {
                entry.shutdown();
                true
            }
            None => false,
        }
    }

    pub async fn contains(&self, id: ConnectionId) -> bool {
        self.connections.read().await.contains_key(&id)
    }

    pub async fn subscription(&self, id: ConnectionId) -> Option<SubscriptionKey> {
        self.connections.read().await.get(&id).map(|e| e.key.clone())
    }

    /// 구독을 덮어씁니다. 연결이 없으면 `false`.
    pub async fn set_subscription(&self, id: ConnectionId, key: SubscriptionKey) -> bool {
        match self.connections.write().await.get_mut(&id) {
            Some(entry) => {
                entry.key = key;
                true
            }
            None => false,
        }
    }

    /// 연결의 푸시 큐 sender.
    pub async fn push_sender(&self, id: ConnectionId) -> Option<mpsc::UnboundedSender<PushRequest>> {
        self.connections.read().await.get(&id).map(|e| e.pushes.clone())
    }

    /// 연결 수명에 묶인 취소 토큰.
    pub async fn cancel_token(&self, id: ConnectionId) -> Option<CancellationToken> {
        self.connections.read().await.get(&id).map(|e| e.cancel.clone())
    }

    /// 타이머를 교체합니다. 기존 타이머는 취소됩니다.
    ///
    /// 연결이 이미 제거되었으면 새 타이머를 취소하고 `false`를 반환합니다.
    pub async fn replace_timer(&self, id: ConnectionId, timer: RefreshTimer) -> bool {
        let mut connections = self.connections.write().await;
        match connections.get_mut(&id) {
            Some(entry) => {
                if let Some(old) = entry.timer.replace(timer) {
                    old.cancel();
                }
                true
            }
            None => {
                timer.cancel();
                false
            }
        }
    }

    /// 연결의 푸시 큐에 요청을 넣습니다.
    pub async fn enqueue(&self, id: ConnectionId, request: PushRequest) -> bool {
        self.connections
            .read()
            .await
            .get(&id)
            .map(|e| e.pushes.send(request).is_ok())
            .unwrap_or(false)
    }

    /// `key`를 구독 중인 연결 목록.
    pub async fn matching(&self, key: &SubscriptionKey) -> Vec<ConnectionId> {
        self.connections
            .read()
            .await
            .iter()
            .filter(|(_, e)| &e.key == key)
            .map(|(id, _)| *id)
            .collect()
    }

    /// 연결이 아직 등록되어 있고 `expected`를 구독 중일 때만 전송합니다.
    ///
    /// 읽기 잠금 아래에서 확인과 전송이 이루어지므로 제거와 경합하지 않습니다.
    /// 송신 큐가 가득 차 있으면 기다리지 않고 건너뜁니다.
    pub async fn deliver(&self, id: ConnectionId, expected: &SubscriptionKey, payload: String) -> Delivery {
        let connections = self.connections.read().await;
        let Some(entry) = connections.get(&id) else {
            return Delivery::Gone;
        };
        if &entry.key != expected {
            return Delivery::Stale;
        }
        match entry.outbox.try_send(payload) {
            Ok(()) => Delivery::Sent,
            Err(_) => Delivery::NotReady,
        }
    }

    pub async fn len(&self) -> usize {
        self.connections.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.connections.read().await.is_empty()
    }

    /// 모든 연결을 제거합니다.
    pub async fn clear(&self) {
        let mut connections = self.connections.write().await;
        for (_, entry) in connections.drain() {
            entry.shutdown();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(capacity: usize) -> (ConnectionEntry, mpsc::Receiver<String>) {
        let (outbox, rx) = mpsc::channel(capacity);
        let (pushes, _) = mpsc::unbounded_channel();
        (ConnectionEntry::new(outbox, pushes, CancellationToken::new()), rx)
    }

    #[tokio::test]
    async fn test_deliver_checks_membership_and_key() {
        let registry = ConnectionRegistry::new();
        let id = Uuid::new_v4();
        let (e, mut rx) = entry(4);
        registry.add(id, e).await;

        let btc = SubscriptionKey::new("BTC", "1h");
        assert_eq!(registry.deliver(id, &btc, "x".into()).await, Delivery::Stale);

        registry.set_subscription(id, btc.clone()).await;
        assert_eq!(registry.deliver(id, &btc, "payload".into()).await, Delivery::Sent);
        assert_eq!(rx.recv().await.as_deref(), Some("payload"));

        assert!(registry.remove(id).await);
        assert!(!registry.remove(id).await);
        assert_eq!(registry.deliver(id, &btc, "late".into()).await, Delivery::Gone);
    }

    #[tokio::test]
    async fn test_full_outbox_is_skipped() {
        let registry = ConnectionRegistry::new();
        let id = Uuid::new_v4();
        let (e, _rx) = entry(1);
        registry.add(id, e).await;
        let key = SubscriptionKey::new("ETH", "5m");
        registry.set_subscription(id, key.clone()).await;

        assert_eq!(registry.deliver(id, &key, "1".into()).await, Delivery::Sent);
        assert_eq!(registry.deliver(id, &key, "2".into()).await, Delivery::NotReady);
    }

    #[tokio::test]
    async fn test_matching_filters_by_pair() {
        let registry = ConnectionRegistry::new();
        let keys = [("BTC", "1h"), ("BTC", "1h"), ("BTC", "5m"), ("ETH", "1h")];
        let mut ids = Vec::new();
        for (symbol, interval) in keys {
            let id = Uuid::new_v4();
            let (e, _rx) = entry(1);
            registry.add(id, e).await;
            registry.set_subscription(id, SubscriptionKey::new(symbol, interval)).await;
            ids.push(id);
        }

        let mut matched = registry.matching(&SubscriptionKey::new("BTC", "1h")).await;
        matched.sort();
        let mut expected = vec![ids[0], ids[1]];
        expected.sort();
        assert_eq!(matched, expected);
    }

    #[tokio::test]
    async fn test_remove_cancels_worker_token() {
        let registry = ConnectionRegistry::new();
        let id = Uuid::new_v4();
        let (outbox, _rx) = mpsc::channel(1);
        let (pushes, _) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        registry
            .add(id, ConnectionEntry::new(outbox, pushes, cancel.clone()))
            .await;

        registry.remove(id).await;
        assert!(cancel.is_cancelled());
        assert!(registry.is_empty().await);
    }
}
