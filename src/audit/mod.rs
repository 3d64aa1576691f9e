//! 감사/리포팅 피드
//!
//! 커밋된 원장 이벤트의 파생 피드입니다. 웹소켓 구독자와 Redis Streams
//! 소비자 모두 같은 브로드캐스트 채널을 원천으로 합니다.

pub mod publisher;

pub use publisher::{run_publisher, LedgerEventMessage, RedisStreamsPublisher};
