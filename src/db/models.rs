use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// 계정 DB 모델
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AccountRecord {
    pub account_id: String,
    pub name: String,
    pub email: String,
    pub balance: i64,
    pub starting_balance: i64,
    pub is_admin: bool,
    pub is_banned: bool,
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
}

/// 원장 이벤트 DB 모델
///
/// seq는 커밋 순서를 그대로 보존하는 단조 증가 값이다.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct LedgerEventRecord {
    pub seq: i64,
    pub event_id: String,
    pub account_id: String,
    pub kind: String,
    pub delta: i64,
    pub reference: Option<String>,
    pub resulting_balance: i64,
    pub actor_id: String,
    pub created_at: DateTime<Utc>,
}

/// 도구 DB 모델
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ToolRecord {
    pub tool_id: String,
    pub name: String,
    pub description: String,
    pub ticket_cost: i64,
    pub is_affiliate: bool,
    pub category: String,
    pub url: Option<String>,
    pub promo_code: Option<String>,
    pub icon_name: String,
    pub model: Option<String>,
    pub system_prompt: Option<String>,
    pub use_api: bool,
    pub usage_instructions: Option<String>,
}

/// 티켓 팩 DB 모델
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PackageRecord {
    pub package_id: String,
    pub name: String,
    pub amount: i64,
    pub price: f64,
}

/// 세션 DB 모델
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SessionRecord {
    pub token: String,
    pub account_id: String,
    pub created_at: DateTime<Utc>,
}

/// 도구별 사용 통계 (관리자 리포트용 집계 결과)
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ToolUsageStatRecord {
    pub tool_id: Option<String>,
    pub tool_name: Option<String>,
    pub uses: i64,
    pub tickets_used: i64,
}
