use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::db::models::{AccountRecord, PackageRecord, ToolRecord, ToolUsageStatRecord};
use crate::ledger::model::LedgerEvent;

/// 계정 등록 요청
#[derive(Debug, Deserialize, Serialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
}

/// 계정 등록 응답
#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub account_id: String,
    pub token: String,
    pub balance: i64,
    pub message: String,
}

/// 잔액 조회 응답
#[derive(Debug, Serialize)]
pub struct BalanceResponse {
    pub account_id: String,
    pub balance: i64,
}

/// 티켓 팩 구매 요청
#[derive(Debug, Deserialize, Serialize)]
pub struct PurchaseRequest {
    pub package_id: String,
}

/// 티켓 팩 구매 응답
#[derive(Debug, Serialize)]
pub struct PurchaseResponse {
    pub new_balance: i64,
    pub event_id: String,
    pub message: String,
}

/// 도구 사용 요청
#[derive(Debug, Deserialize, Serialize)]
pub struct UseToolRequest {
    pub tool_id: String,
}

/// 도구 접근 정보 (사용 승인 후 전달)
#[derive(Debug, Serialize)]
pub struct ToolAccess {
    pub tool_id: String,
    pub name: String,
    pub url: Option<String>,
    pub promo_code: Option<String>,
    pub usage_instructions: Option<String>,
}

impl From<ToolRecord> for ToolAccess {
    fn from(tool: ToolRecord) -> Self {
        Self {
            tool_id: tool.tool_id,
            name: tool.name,
            url: tool.url,
            promo_code: tool.promo_code,
            usage_instructions: tool.usage_instructions,
        }
    }
}

/// 도구 사용 응답
#[derive(Debug, Serialize)]
pub struct UseToolResponse {
    pub new_balance: i64,
    pub event_id: Option<String>,
    pub tool: ToolAccess,
}

/// 생성 요청
#[derive(Debug, Deserialize, Serialize)]
pub struct GenerateRequest {
    pub tool_id: String,
    pub prompt: String,
    pub temperature: Option<f32>,
}

/// 생성 응답
#[derive(Debug, Serialize)]
pub struct GenerateResponse {
    pub content: String,
    pub new_balance: i64,
    pub event_id: Option<String>,
}

/// 이벤트 이력 응답
#[derive(Debug, Serialize)]
pub struct EventsResponse {
    pub account_id: String,
    pub events: Vec<LedgerEvent>,
}

/// 관리자 이벤트 리포트 응답
#[derive(Debug, Serialize)]
pub struct EventReportResponse {
    pub events: Vec<LedgerEvent>,
}

/// 관리자: 잔액 설정 요청
#[derive(Debug, Deserialize, Serialize)]
pub struct AdjustTicketsRequest {
    pub new_balance: i64,
}

/// 관리자: 잔액 설정 응답
#[derive(Debug, Serialize)]
pub struct AdjustTicketsResponse {
    pub account_id: String,
    pub new_balance: i64,
    pub event_id: String,
}

/// 관리자: 차단 요청
#[derive(Debug, Deserialize, Serialize)]
pub struct BanRequest {
    pub banned: bool,
}

/// 관리자: 권한 변경 요청
#[derive(Debug, Deserialize, Serialize)]
pub struct RoleRequest {
    pub is_admin: bool,
}

/// 관리자: 환불 요청
#[derive(Debug, Deserialize, Serialize)]
pub struct RefundRequest {
    pub account_id: String,
    pub amount: i64,
    pub reference: String,
}

/// 관리자: 환불 응답
#[derive(Debug, Serialize)]
pub struct RefundResponse {
    pub account_id: String,
    pub new_balance: i64,
    pub event_id: String,
}

/// 공개 도구 표현
///
/// system_prompt와 model은 서버 내부 설정이므로 노출하지 않는다.
#[derive(Debug, Serialize)]
pub struct PublicTool {
    pub tool_id: String,
    pub name: String,
    pub description: String,
    pub ticket_cost: i64,
    pub is_affiliate: bool,
    pub category: String,
    pub url: Option<String>,
    pub promo_code: Option<String>,
    pub icon_name: String,
    pub use_api: bool,
    pub usage_instructions: Option<String>,
}

impl From<ToolRecord> for PublicTool {
    fn from(tool: ToolRecord) -> Self {
        Self {
            tool_id: tool.tool_id,
            name: tool.name,
            description: tool.description,
            ticket_cost: tool.ticket_cost,
            is_affiliate: tool.is_affiliate,
            category: tool.category,
            url: tool.url,
            promo_code: tool.promo_code,
            icon_name: tool.icon_name,
            use_api: tool.use_api,
            usage_instructions: tool.usage_instructions,
        }
    }
}

/// 도구 목록 응답
#[derive(Debug, Serialize)]
pub struct ToolsResponse {
    pub tools: Vec<PublicTool>,
}

/// 티켓 팩 목록 응답
#[derive(Debug, Serialize)]
pub struct PackagesResponse {
    pub packages: Vec<PackageRecord>,
}

/// 관리자 계정 요약
#[derive(Debug, Serialize)]
pub struct AccountSummary {
    pub account_id: String,
    pub name: String,
    pub email: String,
    pub balance: i64,
    pub is_admin: bool,
    pub is_banned: bool,
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
}

impl From<AccountRecord> for AccountSummary {
    fn from(account: AccountRecord) -> Self {
        Self {
            account_id: account.account_id,
            name: account.name,
            email: account.email,
            balance: account.balance,
            is_admin: account.is_admin,
            is_banned: account.is_banned,
            is_deleted: account.is_deleted,
            created_at: account.created_at,
        }
    }
}

/// 관리자 계정 목록 응답
#[derive(Debug, Serialize)]
pub struct AccountsResponse {
    pub accounts: Vec<AccountSummary>,
}

/// 관리자 사용 통계 응답
#[derive(Debug, Serialize)]
pub struct UsageStatsResponse {
    pub stats: Vec<ToolUsageStatRecord>,
}

/// 도구 생성/갱신 요청 (관리자)
#[derive(Debug, Deserialize, Serialize)]
pub struct ToolRequest {
    pub name: String,
    pub description: String,
    pub ticket_cost: i64,
    #[serde(default)]
    pub is_affiliate: bool,
    pub category: String,
    pub url: Option<String>,
    pub promo_code: Option<String>,
    pub icon_name: String,
    pub model: Option<String>,
    pub system_prompt: Option<String>,
    #[serde(default)]
    pub use_api: bool,
    pub usage_instructions: Option<String>,
}

impl ToolRequest {
    pub fn into_record(self, tool_id: String) -> ToolRecord {
        ToolRecord {
            tool_id,
            name: self.name,
            description: self.description,
            ticket_cost: self.ticket_cost,
            is_affiliate: self.is_affiliate,
            category: self.category,
            url: self.url,
            promo_code: self.promo_code,
            icon_name: self.icon_name,
            model: self.model,
            system_prompt: self.system_prompt,
            use_api: self.use_api,
            usage_instructions: self.usage_instructions,
        }
    }
}

/// 도구 비용 갱신 요청 (관리자)
#[derive(Debug, Deserialize, Serialize)]
pub struct UpdateToolCostRequest {
    pub ticket_cost: i64,
}

/// 티켓 팩 갱신 요청 (관리자)
#[derive(Debug, Deserialize, Serialize)]
pub struct UpdatePackageRequest {
    pub amount: i64,
    pub price: f64,
}

/// 단순 상태 응답
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: String,
    pub message: String,
}

/// 헬스 체크 응답
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// WebSocket 메시지 타입
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum WebSocketMessage {
    /// 커밋된 원장 이벤트
    LedgerEvent(LedgerEvent),
    /// 에러 메시지
    Error { message: String },
}

/// API 오류 응답
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}
