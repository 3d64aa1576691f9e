//! 원장 이벤트 Redis Streams 발행
//!
//! 커밋된 원장 이벤트를 외부 감사/리포팅 소비자가 읽어 가는 스트림에
//! 추가합니다. 발행 실패는 원장 커밋에 영향을 주지 않습니다 (원장이
//! 진실의 원천이고 스트림은 파생 피드).

use log::{error, info};
use redis::aio::Connection;
use redis::{AsyncCommands, Client, RedisResult};
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::ledger::model::LedgerEvent;

/// 원장 이벤트 스트림 메시지
#[derive(Debug, Clone)]
pub struct LedgerEventMessage {
    pub event_id: String,
    pub account_id: String,
    pub kind: String,
    pub delta: i64,
    pub reference: String,
    pub resulting_balance: i64,
    pub actor_id: String,
    pub created_at: String,
}

impl From<&LedgerEvent> for LedgerEventMessage {
    fn from(event: &LedgerEvent) -> Self {
        Self {
            event_id: event.event_id.clone(),
            account_id: event.account_id.clone(),
            kind: event.kind.as_str().to_string(),
            delta: event.delta,
            reference: event.reference.clone().unwrap_or_default(),
            resulting_balance: event.resulting_balance,
            actor_id: event.actor_id.clone(),
            created_at: event.created_at.to_rfc3339(),
        }
    }
}

/// Redis Streams Producer
pub struct RedisStreamsPublisher {
    connection: Arc<Mutex<Connection>>,
    stream_name: String,
}

impl RedisStreamsPublisher {
    /// 새 Publisher 생성
    pub async fn new(redis_url: &str, stream_name: &str) -> RedisResult<Self> {
        let client = Client::open(redis_url)?;
        let connection = client.get_async_connection().await?;

        info!("Redis Streams Publisher 초기화 완료: {}", stream_name);

        Ok(Self {
            connection: Arc::new(Mutex::new(connection)),
            stream_name: stream_name.to_string(),
        })
    }

    /// 이벤트 발행
    pub async fn publish(&self, event: &LedgerEvent) -> RedisResult<String> {
        let message = LedgerEventMessage::from(event);
        let mut connection = self.connection.lock().await;

        let fields = [
            ("event_id", message.event_id),
            ("account_id", message.account_id),
            ("kind", message.kind),
            ("delta", message.delta.to_string()),
            ("reference", message.reference),
            ("resulting_balance", message.resulting_balance.to_string()),
            ("actor_id", message.actor_id),
            ("created_at", message.created_at),
        ];

        let id: String = connection.xadd(&self.stream_name, "*", &fields).await?;

        Ok(id)
    }
}

impl std::fmt::Debug for RedisStreamsPublisher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisStreamsPublisher")
            .field("stream_name", &self.stream_name)
            .finish()
    }
}

/// 발행 루프: 브로드캐스트 채널에서 이벤트를 받아 스트림에 추가
pub async fn run_publisher(
    publisher: RedisStreamsPublisher,
    mut rx: tokio::sync::broadcast::Receiver<LedgerEvent>,
) {
    loop {
        match rx.recv().await {
            Ok(event) => {
                if let Err(err) = publisher.publish(&event).await {
                    error!("원장 이벤트 발행 실패: {} ({})", event.event_id, err);
                }
            }
            Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                error!("감사 발행 지연으로 이벤트 {}건 유실", skipped);
            }
            Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
        }
    }

    info!("감사 발행 루프 종료");
}
