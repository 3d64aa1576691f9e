use std::env;
use std::sync::Arc;

use log::{info, warn};
use tokio::sync::broadcast;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::api::create_api_router;
use crate::audit::{run_publisher, RedisStreamsPublisher};
use crate::catalog::CatalogService;
use crate::chat::ChatClient;
use crate::data::seed_catalog;
use crate::db;
use crate::directory::AccountDirectory;
use crate::ledger::LedgerEngine;

/// 서버 설정
#[derive(Clone)]
pub struct ServerConfig {
    pub rest_port: u16,
    pub database_url: String,
    pub redis_url: Option<String>,
    pub audit_stream: String,
    pub openai_api_key: Option<String>,
    pub openai_base_url: String,
    pub starting_balance: i64,
    pub admin_email: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            rest_port: 7000,
            database_url: "sqlite:ticket_ledger.db?mode=rwc".to_string(),
            redis_url: None,
            audit_stream: "ledger-events".to_string(),
            openai_api_key: None,
            openai_base_url: "https://api.openai.com/v1".to_string(),
            // 가입 시 지급되는 무료 티켓
            starting_balance: 100,
            admin_email: None,
        }
    }
}

impl ServerConfig {
    /// 환경 변수에서 설정 로드 (없으면 기본값)
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            rest_port: env::var("REST_PORT")
                .ok()
                .and_then(|value| value.parse().ok())
                .unwrap_or(defaults.rest_port),
            database_url: env::var("DATABASE_URL").unwrap_or(defaults.database_url),
            redis_url: env::var("REDIS_URL").ok(),
            audit_stream: env::var("AUDIT_STREAM").unwrap_or(defaults.audit_stream),
            openai_api_key: env::var("OPENAI_API_KEY").ok(),
            openai_base_url: env::var("OPENAI_BASE_URL").unwrap_or(defaults.openai_base_url),
            starting_balance: env::var("STARTING_BALANCE")
                .ok()
                .and_then(|value| value.parse().ok())
                .unwrap_or(defaults.starting_balance),
            admin_email: env::var("ADMIN_EMAIL").ok(),
        }
    }
}

/// 서버 상태
#[derive(Clone)]
pub struct ServerState {
    pub engine: Arc<LedgerEngine>,
    pub directory: Arc<AccountDirectory>,
    pub catalog: Arc<CatalogService>,
    pub chat: Arc<ChatClient>,
}

/// 서버 시작
pub async fn start_server(config: ServerConfig) -> anyhow::Result<()> {
    info!("티켓 원장 서버 시작 중...");

    // 데이터베이스 초기화
    let pool = db::init_database(&config.database_url).await?;

    // 카탈로그 준비 (비어 있으면 기본 데이터 삽입)
    let catalog = CatalogService::new(pool.clone());
    seed_catalog(&catalog).await?;

    // 커밋 이벤트 브로드캐스트 채널 (웹소켓/감사 발행용)
    let (event_tx, _) = broadcast::channel(1000);

    // 원장 엔진 생성
    let engine = Arc::new(LedgerEngine::new(pool.clone(), catalog.clone(), event_tx.clone()));

    // 계정 디렉터리 생성
    let directory = Arc::new(AccountDirectory::new(
        pool.clone(),
        config.starting_balance,
        config.admin_email.clone(),
    ));

    // 업스트림 생성 프록시
    let chat = Arc::new(ChatClient::new(
        config.openai_base_url.clone(),
        config.openai_api_key.clone(),
    ));
    if !chat.is_configured() {
        warn!("OPENAI_API_KEY 미설정, 생성 API 비활성화");
    }

    // Redis 감사 발행 (설정 시)
    if let Some(redis_url) = &config.redis_url {
        match RedisStreamsPublisher::new(redis_url, &config.audit_stream).await {
            Ok(publisher) => {
                let rx = event_tx.subscribe();
                tokio::spawn(run_publisher(publisher, rx));
            }
            Err(err) => {
                warn!("Redis 연결 실패, 감사 발행 비활성화: {}", err);
            }
        }
    }

    // 서버 상태 생성
    let state = ServerState {
        engine,
        directory,
        catalog: Arc::new(catalog),
        chat,
    };

    // REST API 라우터 생성
    let api_router = create_api_router()
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    // REST API 서버 시작
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.rest_port)).await?;

    info!("서버가 성공적으로 시작되었습니다!");
    info!("REST API: http://localhost:{}", config.rest_port);

    axum::serve(listener, api_router).await?;

    Ok(())
}
