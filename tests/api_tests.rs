//! API 표면 통합 테스트
//!
//! 라우터를 실제로 구동하지 않고 tower의 oneshot으로 요청/응답 계약을
//! 검증합니다. 생성 프록시처럼 외부 네트워크가 필요한 경로는 제외합니다.

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use tokio::sync::broadcast;
use tower::ServiceExt;

use ticket_ledger::api::create_api_router;
use ticket_ledger::catalog::CatalogService;
use ticket_ledger::chat::ChatClient;
use ticket_ledger::data::seed_catalog;
use ticket_ledger::db::create_tables;
use ticket_ledger::directory::AccountDirectory;
use ticket_ledger::ledger::LedgerEngine;
use ticket_ledger::server::ServerState;

const ADMIN_EMAIL: &str = "admin@autocreateur.example";

// 테스트용 앱 구성 (인메모리 DB + 기본 카탈로그)
async fn test_app() -> (Router, SqlitePool) {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("인메모리 DB 연결 실패");

    create_tables(&pool).await.expect("테이블 생성 실패");

    let catalog = CatalogService::new(pool.clone());
    seed_catalog(&catalog).await.expect("기본 카탈로그 삽입 실패");

    let (event_tx, _rx) = broadcast::channel(100);

    let state = ServerState {
        engine: Arc::new(LedgerEngine::new(pool.clone(), catalog.clone(), event_tx)),
        directory: Arc::new(AccountDirectory::new(
            pool.clone(),
            100,
            Some(ADMIN_EMAIL.to_string()),
        )),
        catalog: Arc::new(catalog),
        chat: Arc::new(ChatClient::new("http://localhost:1".to_string(), None)),
    };

    (create_api_router().with_state(state), pool)
}

// JSON 요청 헬퍼
fn json_request(method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");

    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }

    let body = match body {
        Some(value) => Body::from(value.to_string()),
        None => Body::empty(),
    };

    builder.body(body).expect("요청 생성 실패")
}

// 응답 본문을 JSON으로 파싱
async fn read_json(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("응답 본문 읽기 실패");

    serde_json::from_slice(&bytes).expect("응답 JSON 파싱 실패")
}

// 계정 등록 후 (account_id, token) 반환
async fn register(app: &Router, name: &str, email: &str) -> (String, String) {
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/v1/account",
            None,
            Some(json!({ "name": name, "email": email })),
        ))
        .await
        .expect("요청 실패");

    assert_eq!(response.status(), StatusCode::OK);

    let body = read_json(response).await;
    (
        body["account_id"].as_str().expect("account_id 누락").to_string(),
        body["token"].as_str().expect("token 누락").to_string(),
    )
}

#[tokio::test]
async fn test_health_endpoint() {
    let (app, _pool) = test_app().await;

    let response = app
        .oneshot(json_request("GET", "/api/v1/health", None, None))
        .await
        .expect("요청 실패");

    assert_eq!(response.status(), StatusCode::OK);

    let body = read_json(response).await;
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_register_grants_starting_balance() {
    let (app, _pool) = test_app().await;

    let (_account_id, token) = register(&app, "Alice", "alice@example.com").await;

    let response = app
        .clone()
        .oneshot(json_request("GET", "/v1/balance", Some(&token), None))
        .await
        .expect("요청 실패");

    assert_eq!(response.status(), StatusCode::OK);

    let body = read_json(response).await;
    assert_eq!(body["balance"], 100);
}

#[tokio::test]
async fn test_balance_requires_authentication() {
    let (app, _pool) = test_app().await;

    let response = app
        .oneshot(json_request("GET", "/v1/balance", None, None))
        .await
        .expect("요청 실패");

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let body = read_json(response).await;
    assert_eq!(body["error"], "UNAUTHENTICATED");
}

#[tokio::test]
async fn test_purchase_and_use_flow() {
    let (app, _pool) = test_app().await;

    let (_account_id, token) = register(&app, "Alice", "alice@example.com").await;

    // 50-pack 구매 → 150
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/v1/tickets/purchase",
            Some(&token),
            Some(json!({ "package_id": "50-pack" })),
        ))
        .await
        .expect("요청 실패");

    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;
    assert_eq!(body["new_balance"], 150);

    // script-generator 사용 (비용 10) → 140
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/v1/tools/use",
            Some(&token),
            Some(json!({ "tool_id": "script-generator" })),
        ))
        .await
        .expect("요청 실패");

    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;
    assert_eq!(body["new_balance"], 140);

    // 이벤트 이력 2건 (구매 + 차감)
    let response = app
        .clone()
        .oneshot(json_request("GET", "/v1/events", Some(&token), None))
        .await
        .expect("요청 실패");

    let body = read_json(response).await;
    let events = body["events"].as_array().expect("events 누락");
    assert_eq!(events.len(), 2);
    assert_eq!(events[0]["kind"], "purchase");
    assert_eq!(events[1]["kind"], "debit");
}

#[tokio::test]
async fn test_affiliate_tool_use_is_free() {
    let (app, _pool) = test_app().await;

    let (_account_id, token) = register(&app, "Alice", "alice@example.com").await;

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/v1/tools/use",
            Some(&token),
            Some(json!({ "tool_id": "hosting-partner" })),
        ))
        .await
        .expect("요청 실패");

    assert_eq!(response.status(), StatusCode::OK);

    let body = read_json(response).await;
    assert_eq!(body["new_balance"], 100);
    assert!(body["event_id"].is_null());
    assert_eq!(body["tool"]["promo_code"], "AUTOCREATEUR10");
}

#[tokio::test]
async fn test_insufficient_balance_prompts_purchase() {
    let (app, _pool) = test_app().await;

    let (account_id, token) = register(&app, "Alice", "alice@example.com").await;
    let (_admin_id, admin_token) = register(&app, "Admin", ADMIN_EMAIL).await;

    // 관리자가 잔액을 0으로 설정
    let response = app
        .clone()
        .oneshot(json_request(
            "PUT",
            &format!("/v1/admin/accounts/{}/tickets", account_id),
            Some(&admin_token),
            Some(json!({ "new_balance": 0 })),
        ))
        .await
        .expect("요청 실패");

    assert_eq!(response.status(), StatusCode::OK);

    // 유료 도구 사용은 402로 거부
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/v1/tools/use",
            Some(&token),
            Some(json!({ "tool_id": "script-generator" })),
        ))
        .await
        .expect("요청 실패");

    assert_eq!(response.status(), StatusCode::PAYMENT_REQUIRED);

    let body = read_json(response).await;
    assert_eq!(body["error"], "INSUFFICIENT_BALANCE");
}

#[tokio::test]
async fn test_admin_surface_forbidden_for_regular_account() {
    let (app, _pool) = test_app().await;

    let (account_id, token) = register(&app, "Alice", "alice@example.com").await;

    // 일반 계정의 잔액 설정 시도 → 403, 잔액 불변
    let response = app
        .clone()
        .oneshot(json_request(
            "PUT",
            &format!("/v1/admin/accounts/{}/tickets", account_id),
            Some(&token),
            Some(json!({ "new_balance": 9999 })),
        ))
        .await
        .expect("요청 실패");

    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
        .clone()
        .oneshot(json_request("GET", "/v1/balance", Some(&token), None))
        .await
        .expect("요청 실패");

    let body = read_json(response).await;
    assert_eq!(body["balance"], 100);

    // 계정 목록도 403
    let response = app
        .clone()
        .oneshot(json_request("GET", "/v1/admin/accounts", Some(&token), None))
        .await
        .expect("요청 실패");

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_admin_ban_revokes_sessions() {
    let (app, _pool) = test_app().await;

    let (account_id, token) = register(&app, "Alice", "alice@example.com").await;
    let (_admin_id, admin_token) = register(&app, "Admin", ADMIN_EMAIL).await;

    let response = app
        .clone()
        .oneshot(json_request(
            "PUT",
            &format!("/v1/admin/accounts/{}/ban", account_id),
            Some(&admin_token),
            Some(json!({ "banned": true })),
        ))
        .await
        .expect("요청 실패");

    assert_eq!(response.status(), StatusCode::OK);

    // 차단된 계정의 기존 토큰은 더 이상 유효하지 않음
    let response = app
        .clone()
        .oneshot(json_request("GET", "/v1/balance", Some(&token), None))
        .await
        .expect("요청 실패");

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_admin_delete_preserves_history() {
    let (app, _pool) = test_app().await;

    let (account_id, token) = register(&app, "Alice", "alice@example.com").await;
    let (_admin_id, admin_token) = register(&app, "Admin", ADMIN_EMAIL).await;

    // 이력을 하나 만들어 둔다
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/v1/tickets/purchase",
            Some(&token),
            Some(json!({ "package_id": "50-pack" })),
        ))
        .await
        .expect("요청 실패");
    assert_eq!(response.status(), StatusCode::OK);

    // 소프트 삭제
    let response = app
        .clone()
        .oneshot(json_request(
            "DELETE",
            &format!("/v1/admin/accounts/{}", account_id),
            Some(&admin_token),
            None,
        ))
        .await
        .expect("요청 실패");

    assert_eq!(response.status(), StatusCode::OK);

    // 관리자는 익명화된 계정의 이벤트를 여전히 볼 수 있음
    let response = app
        .clone()
        .oneshot(json_request(
            "GET",
            &format!("/v1/admin/events?account_id={}", account_id),
            Some(&admin_token),
            None,
        ))
        .await
        .expect("요청 실패");

    assert_eq!(response.status(), StatusCode::OK);

    let body = read_json(response).await;
    assert_eq!(body["events"].as_array().expect("events 누락").len(), 1);

    // 계정 목록에서 이름이 익명화되었는지 확인
    let response = app
        .clone()
        .oneshot(json_request("GET", "/v1/admin/accounts", Some(&admin_token), None))
        .await
        .expect("요청 실패");

    let body = read_json(response).await;
    let accounts = body["accounts"].as_array().expect("accounts 누락");
    let deleted = accounts
        .iter()
        .find(|account| account["account_id"] == account_id.as_str())
        .expect("삭제된 계정 누락");

    assert_eq!(deleted["name"], "compte supprimé");
    assert_eq!(deleted["is_deleted"], true);
}

#[tokio::test]
async fn test_duplicate_email_is_conflict() {
    let (app, _pool) = test_app().await;

    let _ = register(&app, "Alice", "alice@example.com").await;

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/v1/account",
            None,
            Some(json!({ "name": "Alice2", "email": "alice@example.com" })),
        ))
        .await
        .expect("요청 실패");

    assert_eq!(response.status(), StatusCode::CONFLICT);

    let body = read_json(response).await;
    assert_eq!(body["error"], "EMAIL_TAKEN");
}

#[tokio::test]
async fn test_public_catalog_hides_system_prompt() {
    let (app, _pool) = test_app().await;

    let response = app
        .clone()
        .oneshot(json_request("GET", "/api/v1/tools?category=development", None, None))
        .await
        .expect("요청 실패");

    assert_eq!(response.status(), StatusCode::OK);

    let body = read_json(response).await;
    let tools = body["tools"].as_array().expect("tools 누락");
    assert!(!tools.is_empty());

    for tool in tools {
        assert_eq!(tool["category"], "development");
        assert!(tool.get("system_prompt").is_none(), "system_prompt가 노출됨");
        assert!(tool.get("model").is_none(), "model이 노출됨");
    }
}

#[tokio::test]
async fn test_admin_can_update_tool_cost() {
    let (app, _pool) = test_app().await;

    let (_admin_id, admin_token) = register(&app, "Admin", ADMIN_EMAIL).await;

    let response = app
        .clone()
        .oneshot(json_request(
            "PUT",
            "/v1/admin/tools/script-generator/cost",
            Some(&admin_token),
            Some(json!({ "ticket_cost": 25 })),
        ))
        .await
        .expect("요청 실패");

    assert_eq!(response.status(), StatusCode::OK);

    // 다음 차감은 갱신된 비용으로 계산된다 (사용 시점 재조회)
    let (_account_id, token) = register(&app, "Alice", "alice@example.com").await;

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/v1/tools/use",
            Some(&token),
            Some(json!({ "tool_id": "script-generator" })),
        ))
        .await
        .expect("요청 실패");

    let body = read_json(response).await;
    assert_eq!(body["new_balance"], 75);
}
