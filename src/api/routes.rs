use axum::{
    routing::{delete, get, post, put},
    Router,
};

use crate::api::handlers::*;
use crate::api::websocket::websocket_handler;
use crate::server::ServerState;

/// API 라우터 생성
pub fn create_api_router() -> Router<ServerState> {
    Router::new()
        // 계정/원장 API
        .route("/v1/account", post(register))
        .route("/v1/balance", get(get_balance))
        .route("/v1/tickets/purchase", post(purchase_tickets))
        .route("/v1/tools/use", post(use_tool))
        .route("/v1/generate", post(generate))
        .route("/v1/events", get(get_events))

        // 카탈로그 공개 API
        .route("/api/v1/tools", get(list_tools))
        .route("/api/v1/packages", get(list_packages))
        .route("/api/v1/health", get(health))

        // 관리자 API
        .route("/v1/admin/accounts", get(admin_list_accounts))
        .route("/v1/admin/accounts/:account_id/tickets", put(admin_adjust_tickets))
        .route("/v1/admin/accounts/:account_id/ban", put(admin_set_ban))
        .route("/v1/admin/accounts/:account_id/role", put(admin_set_role))
        .route("/v1/admin/accounts/:account_id", delete(admin_delete_account))
        .route("/v1/admin/refund", post(admin_refund))
        .route("/v1/admin/events", get(admin_events))
        .route("/v1/admin/usage-stats", get(admin_usage_stats))
        .route("/v1/admin/tools", post(admin_create_tool))
        .route("/v1/admin/tools/:tool_id", put(admin_update_tool).delete(admin_delete_tool))
        .route("/v1/admin/tools/:tool_id/cost", put(admin_update_tool_cost))
        .route("/v1/admin/packages/:package_id", put(admin_update_package))

        // 원장 이벤트 실시간 피드 (관리자)
        .route("/ws", get(websocket_handler))
}
