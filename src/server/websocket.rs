//! WebSocket 进度推送
//!
//! 连接建立后先推送一次完整快照，之后逐条转发进度事件；
//! 发送端落后导致事件丢失时重新推送快照。

use crate::server::AppState;
use crate::uploader::{ProgressEvent, UploadProgress};
use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::IntoResponse,
};
use futures::{SinkExt, StreamExt};
use serde::Serialize;
use std::collections::HashMap;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// 服务端推送消息
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WsServerMessage {
    /// 全量快照
    Snapshot {
        progress: HashMap<String, UploadProgress>,
    },
    /// 单条进度事件
    Progress { event: ProgressEvent },
}

/// WebSocket 路由处理器
pub async fn handle_websocket(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let connection_id = Uuid::new_v4().to_string();
    info!("新的 WebSocket 连接: {}", connection_id);

    let progress = state.uploader.progress();
    // 先订阅再取快照，避免中间的事件丢失
    let mut events = progress.subscribe();
    let (mut sender, mut receiver) = socket.split();

    let snapshot = WsServerMessage::Snapshot {
        progress: progress.snapshot(),
    };
    if send_message(&mut sender, &snapshot).await.is_err() {
        warn!("发送快照失败: {}", connection_id);
        return;
    }

    loop {
        tokio::select! {
            event = events.recv() => {
                let message = match event {
                    Ok(event) => WsServerMessage::Progress { event },
                    Err(RecvError::Lagged(skipped)) => {
                        debug!("连接落后 {} 条事件，重新推送快照: {}", skipped, connection_id);
                        WsServerMessage::Snapshot { progress: progress.snapshot() }
                    }
                    Err(RecvError::Closed) => break,
                };
                if send_message(&mut sender, &message).await.is_err() {
                    break;
                }
            }
            incoming = receiver.next() => {
                match incoming {
                    Some(Ok(Message::Ping(data))) => {
                        if sender.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None | Some(Err(_)) => break,
                    Some(Ok(_)) => {}
                }
            }
        }
    }

    info!("WebSocket 连接已关闭: {}", connection_id);
}

async fn send_message<S>(sender: &mut S, message: &WsServerMessage) -> Result<(), ()>
where
    S: SinkExt<Message> + Unpin,
{
    let json = serde_json::to_string(message).map_err(|e| {
        warn!("序列化消息失败: {}", e);
    })?;
    sender.send(Message::Text(json)).await.map_err(|_| ())
}
