pub mod models;
pub mod repository;

use log::info;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use sqlx::Error as SqlxError;

/// SQLite 데이터베이스 초기화 및 연결
pub async fn init_database(database_url: &str) -> Result<SqlitePool, SqlxError> {
    info!("SQLite 데이터베이스 초기화 중: {}", database_url);

    // 연결 풀 생성
    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect(database_url)
        .await?;

    // 테이블 생성
    create_tables(&pool).await?;

    info!("데이터베이스 초기화 완료");

    Ok(pool)
}

/// 필요한 테이블 생성
pub async fn create_tables(pool: &SqlitePool) -> Result<(), SqlxError> {
    // 계정 테이블
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS accounts (
            account_id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            email TEXT NOT NULL UNIQUE,
            balance INTEGER NOT NULL,
            starting_balance INTEGER NOT NULL,
            is_admin INTEGER NOT NULL DEFAULT 0,
            is_banned INTEGER NOT NULL DEFAULT 0,
            is_deleted INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL
        )"
    )
    .execute(pool)
    .await?;

    // 원장 이벤트 테이블 (append-only, seq가 커밋 순서)
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS ledger_events (
            seq INTEGER PRIMARY KEY AUTOINCREMENT,
            event_id TEXT NOT NULL UNIQUE,
            account_id TEXT NOT NULL,
            kind TEXT NOT NULL,
            delta INTEGER NOT NULL,
            reference TEXT,
            resulting_balance INTEGER NOT NULL,
            actor_id TEXT NOT NULL,
            created_at TEXT NOT NULL
        )"
    )
    .execute(pool)
    .await?;

    // 도구 카탈로그 테이블
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS tools (
            tool_id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            description TEXT NOT NULL,
            ticket_cost INTEGER NOT NULL,
            is_affiliate INTEGER NOT NULL DEFAULT 0,
            category TEXT NOT NULL,
            url TEXT,
            promo_code TEXT,
            icon_name TEXT NOT NULL,
            model TEXT,
            system_prompt TEXT,
            use_api INTEGER NOT NULL DEFAULT 0,
            usage_instructions TEXT
        )"
    )
    .execute(pool)
    .await?;

    // 티켓 팩 테이블
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS ticket_packages (
            package_id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            amount INTEGER NOT NULL,
            price REAL NOT NULL
        )"
    )
    .execute(pool)
    .await?;

    // 세션 테이블 (디렉터리가 발급한 베어러 토큰)
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS sessions (
            token TEXT PRIMARY KEY,
            account_id TEXT NOT NULL,
            created_at TEXT NOT NULL
        )"
    )
    .execute(pool)
    .await?;

    // 인덱스 생성
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_events_account ON ledger_events(account_id)")
        .execute(pool)
        .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_events_kind ON ledger_events(kind)")
        .execute(pool)
        .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_sessions_account ON sessions(account_id)")
        .execute(pool)
        .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_tools_category ON tools(category)")
        .execute(pool)
        .await?;

    info!("테이블 생성 완료");

    Ok(())
}
