use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
};
use futures::{sink::SinkExt, stream::StreamExt};
use log::debug;
use std::collections::HashMap;

use crate::api::models::WebSocketMessage;
use crate::server::ServerState;

/// WebSocket 연결 핸들러 (관리자 전용 원장 이벤트 피드)
///
/// 브라우저 WebSocket은 헤더를 지정할 수 없으므로 토큰은 쿼리 파라미터로
/// 받고, 업그레이드 전에 디렉터리로 검증한다.
pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    Query(params): Query<HashMap<String, String>>,
    State(state): State<ServerState>,
) -> Response {
    let token = match params.get("token") {
        Some(token) => token.clone(),
        None => return StatusCode::UNAUTHORIZED.into_response(),
    };

    match state.directory.resolve_actor(&token).await {
        Ok(actor) if actor.is_admin => {
            ws.on_upgrade(move |socket| websocket_connection(socket, state))
        }
        Ok(_) => StatusCode::FORBIDDEN.into_response(),
        Err(_) => StatusCode::UNAUTHORIZED.into_response(),
    }
}

/// WebSocket 연결 처리
async fn websocket_connection(socket: WebSocket, state: ServerState) {
    let (mut sender, mut receiver) = socket.split();
    let mut rx = state.engine.subscribe();

    // 클라이언트로부터 메시지 수신 처리 (종료 감지용)
    let recv_task = tokio::spawn(async move {
        while let Some(msg) = receiver.next().await {
            match msg {
                Ok(Message::Close(_)) | Err(_) => break,
                Ok(other) => {
                    debug!("WebSocket 수신 메시지 무시: {:?}", other);
                }
            }
        }
    });

    // 커밋된 원장 이벤트를 클라이언트로 전송
    let send_task = tokio::spawn(async move {
        while let Ok(event) = rx.recv().await {
            let message = WebSocketMessage::LedgerEvent(event);

            let json_message = match serde_json::to_string(&message) {
                Ok(json) => json,
                Err(_) => continue,
            };

            if sender.send(Message::Text(json_message)).await.is_err() {
                break;
            }
        }
    });

    // 두 태스크 중 하나라도 완료되면 연결 종료
    tokio::select! {
        _ = recv_task => {},
        _ = send_task => {},
    }
}
