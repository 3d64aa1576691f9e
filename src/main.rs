use dotenv::dotenv;
use log::info;

use ticket_ledger::server::{start_server, ServerConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 환경 변수 로드 및 로거 초기화
    dotenv().ok();
    env_logger::init();

    let config = ServerConfig::from_env();

    info!("Auto Créateur 티켓 원장 서비스");
    info!(
        "설정: 포트={}, 시작 잔액={}, 감사 스트림={}",
        config.rest_port,
        config.starting_balance,
        if config.redis_url.is_some() { config.audit_stream.as_str() } else { "비활성화" }
    );

    start_server(config).await
}
