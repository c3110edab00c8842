//! WebSocket 연결 handler.
//!
//! 소켓을 송신/수신 태스크로 나누고, 송신은 레지스트리가 소유한 outbox를 통해서만 이루어집니다.

use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
    routing::get,
    Router,
};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::messages::SubscribeMessage;
use super::registry::ConnectionId;
use super::scheduler::BroadcastScheduler;
use crate::metrics::{decrement_websocket_connections, increment_websocket_connections};
use crate::state::AppState;

/// WebSocket 업그레이드 핸들러.
///
/// # 엔드포인트
///
/// `GET /ws`
pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// WebSocket 연결 처리.
async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let (outbox, mut outbox_rx) = mpsc::channel::<String>(state.config.snapshot.outbound_buffer.max(1));
    let scheduler = state.scheduler.clone();
    let connection_id = scheduler.on_connect(outbox).await;

    increment_websocket_connections();

    let (mut sender, mut receiver) = socket.split();

    // 스냅샷 송신 태스크
    let send_task = tokio::spawn(async move {
        while let Some(payload) = outbox_rx.recv().await {
            if sender.send(Message::Text(payload.into())).await.is_err() {
                break;
            }
        }
        let _ = sender.close().await;
    });

    // 구독 메시지 수신 태스크
    let recv_scheduler = scheduler.clone();
    let receive_task = tokio::spawn(async move {
        while let Some(result) = receiver.next().await {
            match result {
                Ok(msg) => {
                    if !handle_client_message(connection_id, msg, &recv_scheduler).await {
                        break;
                    }
                }
                Err(e) => {
                    warn!(connection_id = %connection_id, error = %e, "WebSocket 수신 오류");
                    break;
                }
            }
        }
    });

    let send_abort = send_task.abort_handle();
    let receive_abort = receive_task.abort_handle();

    // 하나의 태스크가 종료되거나 서버가 종료되면 연결 정리
    tokio::select! {
        _ = receive_task => {
            debug!(connection_id = %connection_id, "수신 태스크 종료");
        }
        _ = send_task => {
            debug!(connection_id = %connection_id, "송신 태스크 종료");
        }
        _ = state.shutdown.cancelled() => {
            debug!(connection_id = %connection_id, "서버 종료로 연결 정리");
        }
    }

    scheduler.on_disconnect(connection_id).await;
    receive_abort.abort();
    send_abort.abort();

    decrement_websocket_connections();
}

/// 클라이언트 메시지 처리.
///
/// # Returns
///
/// `true`면 연결 유지, `false`면 연결 종료
async fn handle_client_message(
    connection_id: ConnectionId,
    msg: Message,
    scheduler: &BroadcastScheduler,
) -> bool {
    match msg {
        Message::Text(text) => {
            match SubscribeMessage::from_json(text.as_str()) {
                Ok(subscribe) => {
                    scheduler.on_subscribe(connection_id, subscribe.key()).await;
                }
                Err(e) => {
                    // 기존 구독 유지
                    warn!(connection_id = %connection_id, error = %e, "잘못된 구독 메시지");
                }
            }
            true
        }
        Message::Binary(_) => {
            debug!(connection_id = %connection_id, "바이너리 메시지 무시");
            true
        }
        Message::Ping(_) | Message::Pong(_) => true,
        Message::Close(_) => {
            debug!(connection_id = %connection_id, "Close 메시지 수신");
            false
        }
    }
}

/// WebSocket 라우터 생성.
pub fn websocket_router() -> Router<Arc<AppState>> {
    Router::new().route("/", get(websocket_handler))
}
