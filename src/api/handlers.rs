use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::Json,
};
use log::warn;
use std::collections::HashMap;
use uuid::Uuid;

use crate::api::models::*;
use crate::chat::{ChatError, ChatMessage, DEFAULT_MODEL, DEFAULT_TEMPERATURE};
use crate::ledger::error::LedgerError;
use crate::ledger::model::Actor;
use crate::server::ServerState;

type ApiError = (StatusCode, Json<ErrorResponse>);

/// 원장 오류를 HTTP 응답으로 변환
pub(crate) fn ledger_error(err: &LedgerError) -> ApiError {
    let (status, code) = match err {
        LedgerError::InvalidAmount(_) => (StatusCode::BAD_REQUEST, "INVALID_AMOUNT"),
        LedgerError::AccountNotFound(_) => (StatusCode::NOT_FOUND, "ACCOUNT_NOT_FOUND"),
        LedgerError::AccountBanned(_) => (StatusCode::FORBIDDEN, "ACCOUNT_BANNED"),
        LedgerError::InsufficientBalance { .. } => {
            (StatusCode::PAYMENT_REQUIRED, "INSUFFICIENT_BALANCE")
        }
        LedgerError::Forbidden => (StatusCode::FORBIDDEN, "FORBIDDEN"),
        LedgerError::Unauthenticated => (StatusCode::UNAUTHORIZED, "UNAUTHENTICATED"),
        LedgerError::ToolNotFound(_) => (StatusCode::NOT_FOUND, "TOOL_NOT_FOUND"),
        LedgerError::PackageNotFound(_) => (StatusCode::NOT_FOUND, "PACKAGE_NOT_FOUND"),
        LedgerError::DuplicateEmail(_) => (StatusCode::CONFLICT, "EMAIL_TAKEN"),
        LedgerError::Conflict(_) | LedgerError::StorageUnavailable(_) => {
            (StatusCode::SERVICE_UNAVAILABLE, "STORAGE_UNAVAILABLE")
        }
    };

    let message = match err {
        // 잔액 부족은 구매 유도 문구를 함께 전달
        LedgerError::InsufficientBalance { .. } => {
            format!("{}. 티켓 팩을 구매해 주세요.", err)
        }
        LedgerError::Conflict(_) | LedgerError::StorageUnavailable(_) => {
            "일시적인 오류입니다. 잠시 후 다시 시도해 주세요.".to_string()
        }
        other => other.to_string(),
    };

    (status, Json(ErrorResponse { error: code.to_string(), message }))
}

/// 업스트림 프록시 오류를 HTTP 응답으로 변환
fn chat_error(err: &ChatError) -> ApiError {
    let (status, code) = match err {
        ChatError::NotConfigured => (StatusCode::SERVICE_UNAVAILABLE, "CHAT_NOT_CONFIGURED"),
        ChatError::Upstream { .. } => (StatusCode::BAD_GATEWAY, "UPSTREAM_ERROR"),
        ChatError::Network(_) => (StatusCode::BAD_GATEWAY, "UPSTREAM_UNREACHABLE"),
    };

    (status, Json(ErrorResponse { error: code.to_string(), message: err.to_string() }))
}

/// Authorization 헤더의 베어러 토큰을 요청 주체로 해석
pub(crate) async fn authenticate(state: &ServerState, headers: &HeaderMap) -> Result<Actor, ApiError> {
    let token = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .ok_or_else(|| ledger_error(&LedgerError::Unauthenticated))?;

    state
        .directory
        .resolve_actor(token)
        .await
        .map_err(|err| ledger_error(&err))
}

/// 관리자 권한 확인
fn require_admin(actor: &Actor) -> Result<(), ApiError> {
    if actor.is_admin {
        Ok(())
    } else {
        Err(ledger_error(&LedgerError::Forbidden))
    }
}

// ---------- 공개 표면 ----------

/// 헬스 체크 핸들러
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// 계정 등록 핸들러
pub async fn register(
    State(state): State<ServerState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<Json<RegisterResponse>, ApiError> {
    // 입력 검증
    if payload.name.trim().is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: "INVALID_NAME".to_string(),
                message: "이름은 비워 둘 수 없습니다".to_string(),
            }),
        ));
    }

    if !payload.email.contains('@') {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: "INVALID_EMAIL".to_string(),
                message: "이메일 형식이 올바르지 않습니다".to_string(),
            }),
        ));
    }

    let registration = state
        .directory
        .register(&payload.name, &payload.email)
        .await
        .map_err(|err| ledger_error(&err))?;

    Ok(Json(RegisterResponse {
        account_id: registration.account.account_id,
        token: registration.token,
        balance: registration.account.balance,
        message: "계정이 생성되었습니다".to_string(),
    }))
}

/// 도구 목록 조회 핸들러
pub async fn list_tools(
    State(state): State<ServerState>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<ToolsResponse>, ApiError> {
    let category = params.get("category").map(String::as_str);

    let tools = state
        .catalog
        .list_tools(category)
        .await
        .map_err(|err| ledger_error(&err))?;

    Ok(Json(ToolsResponse {
        tools: tools.into_iter().map(PublicTool::from).collect(),
    }))
}

/// 티켓 팩 목록 조회 핸들러
pub async fn list_packages(
    State(state): State<ServerState>,
) -> Result<Json<PackagesResponse>, ApiError> {
    let packages = state
        .catalog
        .list_packages()
        .await
        .map_err(|err| ledger_error(&err))?;

    Ok(Json(PackagesResponse { packages }))
}

// ---------- 인증 표면 ----------

/// 잔액 조회 핸들러
pub async fn get_balance(
    State(state): State<ServerState>,
    headers: HeaderMap,
) -> Result<Json<BalanceResponse>, ApiError> {
    let actor = authenticate(&state, &headers).await?;

    let balance = state
        .engine
        .get_balance(&actor.account_id)
        .await
        .map_err(|err| ledger_error(&err))?;

    Ok(Json(BalanceResponse { account_id: actor.account_id, balance }))
}

/// 티켓 팩 구매 핸들러
///
/// 결제 캡처는 모델링하지 않는다. 이 핸들러가 결제 게이트웨이 확인 뒤에
/// 호출된다고 가정하며, 충전량은 요청이 아니라 팩 카탈로그에서 해석된다.
pub async fn purchase_tickets(
    State(state): State<ServerState>,
    headers: HeaderMap,
    Json(payload): Json<PurchaseRequest>,
) -> Result<Json<PurchaseResponse>, ApiError> {
    let actor = authenticate(&state, &headers).await?;
    let account_id = actor.account_id.clone();

    let result = state
        .engine
        .credit(&account_id, &payload.package_id, actor)
        .await
        .map_err(|err| ledger_error(&err))?;

    Ok(Json(PurchaseResponse {
        new_balance: result.new_balance,
        event_id: result.event_id.unwrap_or_default(),
        message: "구매가 완료되었습니다".to_string(),
    }))
}

/// 도구 사용 핸들러
///
/// 비용은 사용 시점에 카탈로그에서 다시 해석된다. 제휴/무비용 도구는
/// 차감 없이 접근 정보만 돌려준다.
pub async fn use_tool(
    State(state): State<ServerState>,
    headers: HeaderMap,
    Json(payload): Json<UseToolRequest>,
) -> Result<Json<UseToolResponse>, ApiError> {
    let actor = authenticate(&state, &headers).await?;
    let account_id = actor.account_id.clone();

    let result = state
        .engine
        .debit(&account_id, &payload.tool_id, actor)
        .await
        .map_err(|err| ledger_error(&err))?;

    let tool = state
        .catalog
        .get_tool(&payload.tool_id)
        .await
        .map_err(|err| ledger_error(&err))?;

    Ok(Json(UseToolResponse {
        new_balance: result.new_balance,
        event_id: result.event_id,
        tool: ToolAccess::from(tool),
    }))
}

/// 생성 프록시 핸들러
///
/// 차감 후 업스트림에 전달한다. 업스트림 호출이 실패하면 차감분을
/// 자동 환불한다.
pub async fn generate(
    State(state): State<ServerState>,
    headers: HeaderMap,
    Json(payload): Json<GenerateRequest>,
) -> Result<Json<GenerateResponse>, ApiError> {
    let actor = authenticate(&state, &headers).await?;

    if payload.prompt.trim().is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: "EMPTY_PROMPT".to_string(),
                message: "요청 내용이 비어 있습니다".to_string(),
            }),
        ));
    }

    let tool = state
        .catalog
        .get_tool(&payload.tool_id)
        .await
        .map_err(|err| ledger_error(&err))?;

    if !tool.use_api {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: "TOOL_NOT_GENERATIVE".to_string(),
                message: "이 도구는 생성 API를 지원하지 않습니다".to_string(),
            }),
        ));
    }

    let account_id = actor.account_id.clone();
    let debit = state
        .engine
        .debit(&account_id, &payload.tool_id, actor.clone())
        .await
        .map_err(|err| ledger_error(&err))?;

    let mut messages = Vec::new();
    if let Some(system_prompt) = &tool.system_prompt {
        messages.push(ChatMessage::system(system_prompt.clone()));
    }
    messages.push(ChatMessage::user(payload.prompt.clone()));

    let model = tool.model.as_deref().unwrap_or(DEFAULT_MODEL);
    let temperature = payload.temperature.unwrap_or(DEFAULT_TEMPERATURE);

    match state.chat.complete(&messages, model, temperature).await {
        Ok(content) => Ok(Json(GenerateResponse {
            content,
            new_balance: debit.new_balance,
            event_id: debit.event_id,
        })),
        Err(err) => {
            // 업스트림 실패 시 차감분 환불
            if debit.event_id.is_some() {
                if let Err(refund_err) = state
                    .engine
                    .refund(&account_id, tool.ticket_cost, &payload.tool_id, actor)
                    .await
                {
                    warn!("자동 환불 실패: {} ({})", payload.tool_id, refund_err);
                }
            }

            Err(chat_error(&err))
        }
    }
}

/// 본인 이벤트 이력 조회 핸들러
pub async fn get_events(
    State(state): State<ServerState>,
    headers: HeaderMap,
) -> Result<Json<EventsResponse>, ApiError> {
    let actor = authenticate(&state, &headers).await?;
    let account_id = actor.account_id.clone();

    let events = state
        .engine
        .list_events(&account_id, &actor)
        .await
        .map_err(|err| ledger_error(&err))?;

    Ok(Json(EventsResponse { account_id, events }))
}

// ---------- 관리자 표면 ----------

/// 계정 목록 조회 핸들러 (관리자)
pub async fn admin_list_accounts(
    State(state): State<ServerState>,
    headers: HeaderMap,
) -> Result<Json<AccountsResponse>, ApiError> {
    let actor = authenticate(&state, &headers).await?;
    require_admin(&actor)?;

    let accounts = state
        .directory
        .list_accounts()
        .await
        .map_err(|err| ledger_error(&err))?;

    Ok(Json(AccountsResponse {
        accounts: accounts.into_iter().map(AccountSummary::from).collect(),
    }))
}

/// 잔액 설정 핸들러 (관리자)
pub async fn admin_adjust_tickets(
    State(state): State<ServerState>,
    Path(account_id): Path<String>,
    headers: HeaderMap,
    Json(payload): Json<AdjustTicketsRequest>,
) -> Result<Json<AdjustTicketsResponse>, ApiError> {
    let actor = authenticate(&state, &headers).await?;

    let result = state
        .engine
        .admin_adjust(&account_id, payload.new_balance, actor)
        .await
        .map_err(|err| ledger_error(&err))?;

    Ok(Json(AdjustTicketsResponse {
        account_id,
        new_balance: result.new_balance,
        event_id: result.event_id.unwrap_or_default(),
    }))
}

/// 차단 상태 변경 핸들러 (관리자)
pub async fn admin_set_ban(
    State(state): State<ServerState>,
    Path(account_id): Path<String>,
    headers: HeaderMap,
    Json(payload): Json<BanRequest>,
) -> Result<Json<StatusResponse>, ApiError> {
    let actor = authenticate(&state, &headers).await?;
    require_admin(&actor)?;

    state
        .directory
        .set_banned(&account_id, payload.banned)
        .await
        .map_err(|err| ledger_error(&err))?;

    Ok(Json(StatusResponse {
        status: if payload.banned { "BANNED" } else { "UNBANNED" }.to_string(),
        message: "차단 상태가 변경되었습니다".to_string(),
    }))
}

/// 관리자 권한 변경 핸들러 (관리자)
pub async fn admin_set_role(
    State(state): State<ServerState>,
    Path(account_id): Path<String>,
    headers: HeaderMap,
    Json(payload): Json<RoleRequest>,
) -> Result<Json<StatusResponse>, ApiError> {
    let actor = authenticate(&state, &headers).await?;
    require_admin(&actor)?;

    state
        .directory
        .set_admin(&account_id, payload.is_admin)
        .await
        .map_err(|err| ledger_error(&err))?;

    Ok(Json(StatusResponse {
        status: "UPDATED".to_string(),
        message: "관리자 권한이 변경되었습니다".to_string(),
    }))
}

/// 계정 삭제 핸들러 (관리자)
///
/// 원장 이력을 보존하기 위해 물리 삭제가 아니라 익명화한다.
pub async fn admin_delete_account(
    State(state): State<ServerState>,
    Path(account_id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<StatusResponse>, ApiError> {
    let actor = authenticate(&state, &headers).await?;
    require_admin(&actor)?;

    state
        .directory
        .soft_delete(&account_id)
        .await
        .map_err(|err| ledger_error(&err))?;

    Ok(Json(StatusResponse {
        status: "DELETED".to_string(),
        message: "계정이 익명화되었습니다 (이력 보존)".to_string(),
    }))
}

/// 환불 핸들러 (관리자)
pub async fn admin_refund(
    State(state): State<ServerState>,
    headers: HeaderMap,
    Json(payload): Json<RefundRequest>,
) -> Result<Json<RefundResponse>, ApiError> {
    let actor = authenticate(&state, &headers).await?;
    require_admin(&actor)?;

    let result = state
        .engine
        .refund(&payload.account_id, payload.amount, &payload.reference, actor)
        .await
        .map_err(|err| ledger_error(&err))?;

    Ok(Json(RefundResponse {
        account_id: payload.account_id,
        new_balance: result.new_balance,
        event_id: result.event_id.unwrap_or_default(),
    }))
}

/// 이벤트 리포트 핸들러 (관리자)
pub async fn admin_events(
    State(state): State<ServerState>,
    Query(params): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Result<Json<EventReportResponse>, ApiError> {
    let actor = authenticate(&state, &headers).await?;

    let limit = params
        .get("limit")
        .and_then(|value| value.parse::<i64>().ok())
        .unwrap_or(1000);

    let events = match params.get("account_id") {
        Some(account_id) => state
            .engine
            .list_events(account_id, &actor)
            .await
            .map_err(|err| ledger_error(&err))?,
        None => state
            .engine
            .list_all_events(&actor, limit)
            .await
            .map_err(|err| ledger_error(&err))?,
    };

    Ok(Json(EventReportResponse { events }))
}

/// 도구 사용 통계 핸들러 (관리자)
pub async fn admin_usage_stats(
    State(state): State<ServerState>,
    headers: HeaderMap,
) -> Result<Json<UsageStatsResponse>, ApiError> {
    let actor = authenticate(&state, &headers).await?;

    let stats = state
        .engine
        .usage_stats(&actor)
        .await
        .map_err(|err| ledger_error(&err))?;

    Ok(Json(UsageStatsResponse { stats }))
}

/// 도구 등록 핸들러 (관리자)
pub async fn admin_create_tool(
    State(state): State<ServerState>,
    headers: HeaderMap,
    Json(payload): Json<ToolRequest>,
) -> Result<Json<StatusResponse>, ApiError> {
    let actor = authenticate(&state, &headers).await?;
    require_admin(&actor)?;

    let tool = payload.into_record(Uuid::new_v4().to_string());

    state
        .catalog
        .add_tool(&tool)
        .await
        .map_err(|err| ledger_error(&err))?;

    Ok(Json(StatusResponse {
        status: "CREATED".to_string(),
        message: format!("도구가 등록되었습니다: {}", tool.tool_id),
    }))
}

/// 도구 갱신 핸들러 (관리자)
pub async fn admin_update_tool(
    State(state): State<ServerState>,
    Path(tool_id): Path<String>,
    headers: HeaderMap,
    Json(payload): Json<ToolRequest>,
) -> Result<Json<StatusResponse>, ApiError> {
    let actor = authenticate(&state, &headers).await?;
    require_admin(&actor)?;

    let tool = payload.into_record(tool_id);

    state
        .catalog
        .update_tool(&tool)
        .await
        .map_err(|err| ledger_error(&err))?;

    Ok(Json(StatusResponse {
        status: "UPDATED".to_string(),
        message: "도구가 갱신되었습니다".to_string(),
    }))
}

/// 도구 비용 갱신 핸들러 (관리자)
pub async fn admin_update_tool_cost(
    State(state): State<ServerState>,
    Path(tool_id): Path<String>,
    headers: HeaderMap,
    Json(payload): Json<UpdateToolCostRequest>,
) -> Result<Json<StatusResponse>, ApiError> {
    let actor = authenticate(&state, &headers).await?;
    require_admin(&actor)?;

    state
        .catalog
        .update_tool_cost(&tool_id, payload.ticket_cost)
        .await
        .map_err(|err| ledger_error(&err))?;

    Ok(Json(StatusResponse {
        status: "UPDATED".to_string(),
        message: "도구 비용이 갱신되었습니다".to_string(),
    }))
}

/// 도구 삭제 핸들러 (관리자)
pub async fn admin_delete_tool(
    State(state): State<ServerState>,
    Path(tool_id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<StatusResponse>, ApiError> {
    let actor = authenticate(&state, &headers).await?;
    require_admin(&actor)?;

    state
        .catalog
        .delete_tool(&tool_id)
        .await
        .map_err(|err| ledger_error(&err))?;

    Ok(Json(StatusResponse {
        status: "DELETED".to_string(),
        message: "도구가 삭제되었습니다".to_string(),
    }))
}

/// 티켓 팩 갱신 핸들러 (관리자)
pub async fn admin_update_package(
    State(state): State<ServerState>,
    Path(package_id): Path<String>,
    headers: HeaderMap,
    Json(payload): Json<UpdatePackageRequest>,
) -> Result<Json<StatusResponse>, ApiError> {
    let actor = authenticate(&state, &headers).await?;
    require_admin(&actor)?;

    state
        .catalog
        .update_package(&package_id, payload.amount, payload.price)
        .await
        .map_err(|err| ledger_error(&err))?;

    Ok(Json(StatusResponse {
        status: "UPDATED".to_string(),
        message: "티켓 팩이 갱신되었습니다".to_string(),
    }))
}
