//! 원장 엔진
//!
//! 잔액 변경의 유일한 경로입니다. 계정마다 하나의 워커 태스크를 두고
//! 해당 계정의 모든 변경 명령을 FIFO 큐로 직렬화합니다. 서로 다른
//! 계정의 명령은 완전히 병렬로 진행됩니다.
//!
//! 각 변경은 하나의 SQLite 트랜잭션으로 수행됩니다: 잔액 갱신과 이벤트
//! 기록이 함께 커밋되거나 함께 롤백됩니다. "읽고 나서 따로 쓰는" 두 번의
//! 왕복은 허용되지 않습니다.

use std::collections::HashMap;
use std::time::Duration;

use chrono::Utc;
use log::{debug, error, info, warn};
use sqlx::sqlite::SqlitePool;
use tokio::sync::{broadcast, mpsc, oneshot, Mutex};
use uuid::Uuid;

use crate::catalog::CatalogService;
use crate::db::models::AccountRecord;
use crate::db::repository::{AccountRepository, EventRepository};
use crate::ledger::error::LedgerError;
use crate::ledger::model::{
    Actor, EventKind, LedgerCommand, LedgerEvent, LedgerOp, MutationResult,
};

/// 저장소 경합 재시도 한도
const MAX_COMMIT_RETRIES: u32 = 3;
/// 재시도 간격 기본값 (선형 백오프)
const RETRY_BACKOFF_MS: u64 = 50;
/// 계정 워커 큐 용량
const WORKER_QUEUE_DEPTH: usize = 64;

/// 원장 엔진
pub struct LedgerEngine {
    pool: SqlitePool,
    catalog: CatalogService,
    accounts: AccountRepository,
    events: EventRepository,
    /// 계정별 워커 큐 (계정당 라이터 하나)
    workers: Mutex<HashMap<String, mpsc::Sender<LedgerCommand>>>,
    /// 커밋된 이벤트 브로드캐스트 (웹소켓 피드/감사 발행용)
    event_tx: broadcast::Sender<LedgerEvent>,
}

impl LedgerEngine {
    /// 새 엔진 생성
    pub fn new(pool: SqlitePool, catalog: CatalogService, event_tx: broadcast::Sender<LedgerEvent>) -> Self {
        Self {
            accounts: AccountRepository::new(pool.clone()),
            events: EventRepository::new(pool.clone()),
            pool,
            catalog,
            workers: Mutex::new(HashMap::new()),
            event_tx,
        }
    }

    /// 현재 잔액 조회
    ///
    /// 읽기 전용 경로. 이 값을 근거로 쓰기를 결정해서는 안 된다 — 쓰기
    /// 판단은 언제나 워커 트랜잭션 안에서 다시 읽는다.
    pub async fn get_balance(&self, account_id: &str) -> Result<i64, LedgerError> {
        let account = self
            .accounts
            .find_by_id(account_id)
            .await?
            .ok_or_else(|| LedgerError::AccountNotFound(account_id.to_string()))?;

        Ok(account.balance)
    }

    /// 티켓 팩 구매 충전
    pub async fn credit(
        &self,
        account_id: &str,
        package_id: &str,
        actor: Actor,
    ) -> Result<MutationResult, LedgerError> {
        self.execute(account_id, LedgerOp::Credit { package_id: package_id.to_string() }, actor)
            .await
    }

    /// 도구 사용 차감
    pub async fn debit(
        &self,
        account_id: &str,
        tool_id: &str,
        actor: Actor,
    ) -> Result<MutationResult, LedgerError> {
        self.execute(account_id, LedgerOp::Debit { tool_id: tool_id.to_string() }, actor)
            .await
    }

    /// 관리자 잔액 설정
    pub async fn admin_adjust(
        &self,
        account_id: &str,
        new_balance: i64,
        actor: Actor,
    ) -> Result<MutationResult, LedgerError> {
        if !actor.is_admin {
            return Err(LedgerError::Forbidden);
        }
        if new_balance < 0 {
            return Err(LedgerError::InvalidAmount(new_balance));
        }

        self.execute(account_id, LedgerOp::AdminAdjust { new_balance }, actor)
            .await
    }

    /// 환불 충전
    pub async fn refund(
        &self,
        account_id: &str,
        amount: i64,
        reference: &str,
        actor: Actor,
    ) -> Result<MutationResult, LedgerError> {
        if amount <= 0 {
            return Err(LedgerError::InvalidAmount(amount));
        }

        self.execute(
            account_id,
            LedgerOp::Refund { amount, reference: reference.to_string() },
            actor,
        )
        .await
    }

    /// 계정 이벤트 이력 조회 (커밋 순서 오름차순)
    ///
    /// 일반 사용자는 자기 계정만 볼 수 있다.
    pub async fn list_events(
        &self,
        account_id: &str,
        actor: &Actor,
    ) -> Result<Vec<LedgerEvent>, LedgerError> {
        if !actor.is_admin && actor.account_id != account_id {
            return Err(LedgerError::Forbidden);
        }

        self.accounts
            .find_by_id(account_id)
            .await?
            .ok_or_else(|| LedgerError::AccountNotFound(account_id.to_string()))?;

        let records = self.events.find_by_account(account_id).await?;
        Ok(records
            .into_iter()
            .filter_map(|record| {
                let seq = record.seq;
                let event = LedgerEvent::from_record(record);
                if event.is_none() {
                    warn!("알 수 없는 이벤트 종류 무시: seq={}", seq);
                }
                event
            })
            .collect())
    }

    /// 전체 계정 이벤트 조회 (관리자 리포팅용)
    pub async fn list_all_events(
        &self,
        actor: &Actor,
        limit: i64,
    ) -> Result<Vec<LedgerEvent>, LedgerError> {
        if !actor.is_admin {
            return Err(LedgerError::Forbidden);
        }

        let records = self.events.find_all(limit).await?;
        Ok(records.into_iter().filter_map(LedgerEvent::from_record).collect())
    }

    /// 도구별 사용 집계 (관리자 리포팅용)
    pub async fn usage_stats(
        &self,
        actor: &Actor,
    ) -> Result<Vec<crate::db::models::ToolUsageStatRecord>, LedgerError> {
        if !actor.is_admin {
            return Err(LedgerError::Forbidden);
        }

        Ok(self.events.usage_stats().await?)
    }

    /// 커밋 이벤트 수신 채널 구독
    pub fn subscribe(&self) -> broadcast::Receiver<LedgerEvent> {
        self.event_tx.subscribe()
    }

    /// 명령을 계정 워커에 넣고 응답을 기다림
    async fn execute(
        &self,
        account_id: &str,
        op: LedgerOp,
        actor: Actor,
    ) -> Result<MutationResult, LedgerError> {
        let sender = self.worker_sender(account_id).await;
        let (reply_tx, reply_rx) = oneshot::channel();

        let command = LedgerCommand { op, actor, reply: reply_tx };
        if sender.send(command).await.is_err() {
            error!("계정 워커 큐가 닫힘: {}", account_id);
            return Err(LedgerError::StorageUnavailable("워커 큐가 닫혔습니다".into()));
        }

        reply_rx
            .await
            .map_err(|_| LedgerError::StorageUnavailable("워커 응답이 유실되었습니다".into()))?
    }

    /// 계정 워커 큐 획득 (없으면 생성)
    async fn worker_sender(&self, account_id: &str) -> mpsc::Sender<LedgerCommand> {
        let mut workers = self.workers.lock().await;

        if let Some(sender) = workers.get(account_id) {
            if !sender.is_closed() {
                return sender.clone();
            }
        }

        let (tx, rx) = mpsc::channel(WORKER_QUEUE_DEPTH);
        let worker = AccountWorker {
            account_id: account_id.to_string(),
            pool: self.pool.clone(),
            catalog: self.catalog.clone(),
            event_tx: self.event_tx.clone(),
        };
        tokio::spawn(worker.run(rx));

        workers.insert(account_id.to_string(), tx.clone());
        debug!("계정 워커 생성: {}", account_id);

        tx
    }
}

/// 적용할 변경 내용 (카탈로그 해석이 끝난 뒤의 형태)
enum Intent {
    /// 이벤트 없이 성공 (무비용/제휴 도구)
    NoOp,
    /// 잔액에 delta를 더함
    Delta(i64),
    /// 잔액을 목표값으로 설정
    SetTo(i64),
}

/// 계정별 단일 라이터 워커
struct AccountWorker {
    account_id: String,
    pool: SqlitePool,
    catalog: CatalogService,
    event_tx: broadcast::Sender<LedgerEvent>,
}

impl AccountWorker {
    /// 명령 처리 루프
    async fn run(self, mut rx: mpsc::Receiver<LedgerCommand>) {
        while let Some(command) = rx.recv().await {
            let result = self.apply_with_retry(&command.op, &command.actor).await;

            match &result {
                Ok((_, Some(event))) => {
                    debug!(
                        "원장 커밋: {} {} delta={} 잔액={}",
                        self.account_id,
                        event.kind.as_str(),
                        event.delta,
                        event.resulting_balance
                    );
                    // 구독자가 없으면 무시
                    let _ = self.event_tx.send(event.clone());
                }
                Ok((result, None)) => {
                    debug!("무비용 사용 통과: {} 잔액={}", self.account_id, result.new_balance);
                }
                Err(err) => {
                    debug!("원장 변경 거부: {} ({})", self.account_id, err);
                }
            }

            // 호출자가 기다리기를 포기했어도 커밋된 변경은 되돌리지 않는다
            let _ = command.reply.send(result.map(|(mutation, _)| mutation));
        }

        info!("계정 워커 종료: {}", self.account_id);
    }

    /// 경합 오류만 제한 횟수 재시도
    async fn apply_with_retry(
        &self,
        op: &LedgerOp,
        actor: &Actor,
    ) -> Result<(MutationResult, Option<LedgerEvent>), LedgerError> {
        let mut attempt = 0;

        loop {
            match self.apply_once(op, actor).await {
                Err(err) if err.is_retryable() => {
                    attempt += 1;
                    if attempt > MAX_COMMIT_RETRIES {
                        warn!("저장소 경합 재시도 소진: {} ({})", self.account_id, err);
                        return Err(LedgerError::StorageUnavailable(err.to_string()));
                    }

                    let backoff = Duration::from_millis(RETRY_BACKOFF_MS * u64::from(attempt));
                    debug!(
                        "저장소 경합, 재시도 {}/{}: {}",
                        attempt, MAX_COMMIT_RETRIES, self.account_id
                    );
                    tokio::time::sleep(backoff).await;
                }
                other => return other,
            }
        }
    }

    /// 변경 1회 적용 (단일 트랜잭션)
    async fn apply_once(
        &self,
        op: &LedgerOp,
        actor: &Actor,
    ) -> Result<(MutationResult, Option<LedgerEvent>), LedgerError> {
        // 금액은 변경 시점에 카탈로그에서 다시 해석한다
        let (kind, intent, reference) = match op {
            LedgerOp::Credit { package_id } => {
                let package = self.catalog.get_package(package_id).await?;
                if package.amount <= 0 {
                    return Err(LedgerError::InvalidAmount(package.amount));
                }
                (EventKind::Purchase, Intent::Delta(package.amount), Some(package_id.clone()))
            }
            LedgerOp::Debit { tool_id } => {
                let tool = self.catalog.get_tool(tool_id).await?;
                if tool.ticket_cost < 0 {
                    return Err(LedgerError::InvalidAmount(tool.ticket_cost));
                }
                if tool.is_affiliate || tool.ticket_cost == 0 {
                    (EventKind::Debit, Intent::NoOp, Some(tool_id.clone()))
                } else {
                    (EventKind::Debit, Intent::Delta(-tool.ticket_cost), Some(tool_id.clone()))
                }
            }
            LedgerOp::AdminAdjust { new_balance } => {
                (EventKind::AdminAdjustment, Intent::SetTo(*new_balance), None)
            }
            LedgerOp::Refund { amount, reference } => {
                (EventKind::Refund, Intent::Delta(*amount), Some(reference.clone()))
            }
        };

        let mut txn = self.pool.begin().await.map_err(LedgerError::from)?;

        let account = sqlx::query_as::<_, AccountRecord>(
            "SELECT account_id, name, email, balance, starting_balance, is_admin, is_banned, is_deleted, created_at
             FROM accounts
             WHERE account_id = ?"
        )
        .bind(&self.account_id)
        .fetch_optional(&mut *txn)
        .await?
        .ok_or_else(|| LedgerError::AccountNotFound(self.account_id.clone()))?;

        // 구매/사용은 차단 계정에 대해 거부. 관리자 설정과 환불은 차단
        // 해제 전 정리 작업에 쓰이므로 허용.
        if account.is_banned && matches!(kind, EventKind::Purchase | EventKind::Debit) {
            return Err(LedgerError::AccountBanned(self.account_id.clone()));
        }

        let (delta, new_balance) = match intent {
            Intent::NoOp => {
                return Ok((
                    MutationResult { new_balance: account.balance, event_id: None },
                    None,
                ));
            }
            Intent::Delta(delta) if delta < 0 => {
                let cost = -delta;
                if account.balance < cost {
                    return Err(LedgerError::InsufficientBalance {
                        required: cost,
                        available: account.balance,
                    });
                }

                // 검사와 차감을 한 문장으로 수행. 워커 직렬화 덕분에 같은
                // 계정의 경쟁 쓰기는 없지만, 다중 프로세스 배치까지 가정해
                // 조건부 UPDATE를 유지한다.
                let updated = sqlx::query(
                    "UPDATE accounts SET balance = balance - ? WHERE account_id = ? AND balance >= ?",
                )
                .bind(cost)
                .bind(&self.account_id)
                .bind(cost)
                .execute(&mut *txn)
                .await?;

                if updated.rows_affected() == 0 {
                    return Err(LedgerError::InsufficientBalance {
                        required: cost,
                        available: account.balance,
                    });
                }

                (delta, account.balance - cost)
            }
            Intent::Delta(delta) => {
                sqlx::query("UPDATE accounts SET balance = balance + ? WHERE account_id = ?")
                    .bind(delta)
                    .bind(&self.account_id)
                    .execute(&mut *txn)
                    .await?;

                (delta, account.balance + delta)
            }
            Intent::SetTo(target) => {
                sqlx::query("UPDATE accounts SET balance = ? WHERE account_id = ?")
                    .bind(target)
                    .bind(&self.account_id)
                    .execute(&mut *txn)
                    .await?;

                // 설정 이벤트도 delta로 기록해 리플레이 불변식을 지킨다
                (target - account.balance, target)
            }
        };

        let event_id = Uuid::new_v4().to_string();
        let created_at = Utc::now();

        let inserted = sqlx::query(
            "INSERT INTO ledger_events
             (event_id, account_id, kind, delta, reference, resulting_balance, actor_id, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)"
        )
        .bind(&event_id)
        .bind(&self.account_id)
        .bind(kind.as_str())
        .bind(delta)
        .bind(&reference)
        .bind(new_balance)
        .bind(&actor.account_id)
        .bind(created_at)
        .execute(&mut *txn)
        .await?;

        let seq = inserted.last_insert_rowid();

        txn.commit().await.map_err(LedgerError::from)?;

        let event = LedgerEvent {
            seq,
            event_id: event_id.clone(),
            account_id: self.account_id.clone(),
            kind,
            delta,
            reference,
            resulting_balance: new_balance,
            actor_id: actor.account_id.clone(),
            created_at,
        };

        Ok((
            MutationResult { new_balance, event_id: Some(event_id) },
            Some(event),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::create_tables;
    use crate::db::models::{PackageRecord, ToolRecord};
    use crate::db::repository::{PackageRepository, ToolRepository};
    use sqlx::sqlite::SqlitePoolOptions;

    // 테스트용 인메모리 풀 생성
    async fn test_pool() -> SqlitePool {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .expect("인메모리 DB 연결 실패");

        create_tables(&pool).await.expect("테이블 생성 실패");

        pool
    }

    // 테스트용 엔진 생성
    fn test_engine(pool: &SqlitePool) -> LedgerEngine {
        let (event_tx, _rx) = broadcast::channel(100);
        LedgerEngine::new(pool.clone(), CatalogService::new(pool.clone()), event_tx)
    }

    // 테스트용 계정 생성 헬퍼 함수
    async fn create_test_account(pool: &SqlitePool, account_id: &str, balance: i64, is_admin: bool, is_banned: bool) {
        let account = AccountRecord {
            account_id: account_id.to_string(),
            name: format!("compte {}", account_id),
            email: format!("{}@example.com", account_id),
            balance,
            starting_balance: balance,
            is_admin,
            is_banned,
            is_deleted: false,
            created_at: Utc::now(),
        };

        AccountRepository::new(pool.clone())
            .save(&account)
            .await
            .expect("계정 생성 실패");
    }

    // 테스트용 도구 생성 헬퍼 함수
    async fn create_test_tool(pool: &SqlitePool, tool_id: &str, ticket_cost: i64, is_affiliate: bool) {
        let tool = ToolRecord {
            tool_id: tool_id.to_string(),
            name: format!("outil {}", tool_id),
            description: "outil de test".to_string(),
            ticket_cost,
            is_affiliate,
            category: "development".to_string(),
            url: None,
            promo_code: None,
            icon_name: "code".to_string(),
            model: None,
            system_prompt: None,
            use_api: false,
            usage_instructions: None,
        };

        ToolRepository::new(pool.clone())
            .save(&tool)
            .await
            .expect("도구 생성 실패");
    }

    // 테스트용 티켓 팩 생성 헬퍼 함수
    async fn create_test_package(pool: &SqlitePool, package_id: &str, amount: i64) {
        let package = PackageRecord {
            package_id: package_id.to_string(),
            name: format!("pack {}", package_id),
            amount,
            price: 9.99,
        };

        PackageRepository::new(pool.clone())
            .save(&package)
            .await
            .expect("티켓 팩 생성 실패");
    }

    fn actor(account_id: &str, is_admin: bool) -> Actor {
        Actor {
            account_id: account_id.to_string(),
            is_admin,
            is_banned: false,
        }
    }

    #[tokio::test]
    async fn test_credit_appends_purchase_event() {
        let pool = test_pool().await;
        let engine = test_engine(&pool);

        create_test_account(&pool, "alice", 100, false, false).await;
        create_test_package(&pool, "50-pack", 50).await;

        let result = engine.credit("alice", "50-pack", actor("alice", false)).await.unwrap();

        assert_eq!(result.new_balance, 150);
        assert!(result.event_id.is_some());

        // 이벤트 검증
        let events = engine.list_events("alice", &actor("alice", false)).await.unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, EventKind::Purchase);
        assert_eq!(events[0].delta, 50);
        assert_eq!(events[0].reference.as_deref(), Some("50-pack"));
        assert_eq!(events[0].resulting_balance, 150);
        assert_eq!(events[0].actor_id, "alice");
    }

    #[tokio::test]
    async fn test_debit_decreases_balance() {
        let pool = test_pool().await;
        let engine = test_engine(&pool);

        create_test_account(&pool, "alice", 100, false, false).await;
        create_test_tool(&pool, "script-generator", 10, false).await;

        let result = engine.debit("alice", "script-generator", actor("alice", false)).await.unwrap();

        assert_eq!(result.new_balance, 90);
        assert_eq!(engine.get_balance("alice").await.unwrap(), 90);

        let events = engine.list_events("alice", &actor("alice", false)).await.unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, EventKind::Debit);
        assert_eq!(events[0].delta, -10);
    }

    #[tokio::test]
    async fn test_debit_insufficient_balance_leaves_state_unchanged() {
        let pool = test_pool().await;
        let engine = test_engine(&pool);

        create_test_account(&pool, "alice", 3, false, false).await;
        create_test_tool(&pool, "script-generator", 10, false).await;

        let err = engine.debit("alice", "script-generator", actor("alice", false)).await.unwrap_err();

        match err {
            LedgerError::InsufficientBalance { required, available } => {
                assert_eq!(required, 10);
                assert_eq!(available, 3);
            }
            other => panic!("예상치 못한 오류: {:?}", other),
        }

        // 잔액과 이벤트 로그 모두 변화 없음
        assert_eq!(engine.get_balance("alice").await.unwrap(), 3);
        let events = engine.list_events("alice", &actor("alice", false)).await.unwrap();
        assert!(events.is_empty());
    }

    #[tokio::test]
    async fn test_affiliate_tool_is_noop_success() {
        let pool = test_pool().await;
        let engine = test_engine(&pool);

        create_test_account(&pool, "alice", 100, false, false).await;
        create_test_tool(&pool, "hosting-partner", 0, true).await;

        let result = engine.debit("alice", "hosting-partner", actor("alice", false)).await.unwrap();

        // 이벤트 없이 성공, 잔액 불변
        assert_eq!(result.new_balance, 100);
        assert!(result.event_id.is_none());

        let events = engine.list_events("alice", &actor("alice", false)).await.unwrap();
        assert!(events.is_empty());
    }

    #[tokio::test]
    async fn test_admin_adjust_records_delta() {
        let pool = test_pool().await;
        let engine = test_engine(&pool);

        create_test_account(&pool, "alice", 30, false, false).await;
        create_test_account(&pool, "admin", 0, true, false).await;

        let result = engine.admin_adjust("alice", 10, actor("admin", true)).await.unwrap();

        assert_eq!(result.new_balance, 10);

        // 설정 이벤트도 복원 가능한 delta로 기록된다
        let events = engine.list_events("alice", &actor("admin", true)).await.unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, EventKind::AdminAdjustment);
        assert_eq!(events[0].delta, -20);
        assert_eq!(events[0].resulting_balance, 10);
        assert_eq!(events[0].actor_id, "admin");
    }

    #[tokio::test]
    async fn test_admin_adjust_forbidden_for_non_admin() {
        let pool = test_pool().await;
        let engine = test_engine(&pool);

        create_test_account(&pool, "alice", 30, false, false).await;

        let err = engine.admin_adjust("alice", 0, actor("alice", false)).await.unwrap_err();
        assert!(matches!(err, LedgerError::Forbidden));

        // 이벤트도 잔액 변화도 없어야 함
        assert_eq!(engine.get_balance("alice").await.unwrap(), 30);
        let events = engine.list_events("alice", &actor("alice", false)).await.unwrap();
        assert!(events.is_empty());
    }

    #[tokio::test]
    async fn test_admin_adjust_rejects_negative_target() {
        let pool = test_pool().await;
        let engine = test_engine(&pool);

        create_test_account(&pool, "alice", 30, false, false).await;
        create_test_account(&pool, "admin", 0, true, false).await;

        let err = engine.admin_adjust("alice", -5, actor("admin", true)).await.unwrap_err();
        assert!(matches!(err, LedgerError::InvalidAmount(-5)));
    }

    #[tokio::test]
    async fn test_refund_appends_positive_event() {
        let pool = test_pool().await;
        let engine = test_engine(&pool);

        create_test_account(&pool, "alice", 90, false, false).await;

        let result = engine.refund("alice", 10, "script-generator", actor("alice", false)).await.unwrap();

        assert_eq!(result.new_balance, 100);

        let events = engine.list_events("alice", &actor("alice", false)).await.unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, EventKind::Refund);
        assert_eq!(events[0].delta, 10);
    }

    #[tokio::test]
    async fn test_banned_account_cannot_purchase_or_debit() {
        let pool = test_pool().await;
        let engine = test_engine(&pool);

        create_test_account(&pool, "alice", 100, false, true).await;
        create_test_package(&pool, "50-pack", 50).await;
        create_test_tool(&pool, "script-generator", 10, false).await;

        let err = engine.credit("alice", "50-pack", actor("alice", false)).await.unwrap_err();
        assert!(matches!(err, LedgerError::AccountBanned(_)));

        let err = engine.debit("alice", "script-generator", actor("alice", false)).await.unwrap_err();
        assert!(matches!(err, LedgerError::AccountBanned(_)));

        // 차단 정리 작업을 위한 관리자 설정은 허용
        create_test_account(&pool, "admin", 0, true, false).await;
        let result = engine.admin_adjust("alice", 0, actor("admin", true)).await.unwrap();
        assert_eq!(result.new_balance, 0);
    }

    #[tokio::test]
    async fn test_unknown_account_and_references() {
        let pool = test_pool().await;
        let engine = test_engine(&pool);

        create_test_account(&pool, "alice", 100, false, false).await;
        create_test_package(&pool, "50-pack", 50).await;

        let err = engine.get_balance("ghost").await.unwrap_err();
        assert!(matches!(err, LedgerError::AccountNotFound(_)));

        let err = engine.credit("ghost", "50-pack", actor("ghost", false)).await.unwrap_err();
        assert!(matches!(err, LedgerError::AccountNotFound(_)));

        let err = engine.credit("alice", "ghost-pack", actor("alice", false)).await.unwrap_err();
        assert!(matches!(err, LedgerError::PackageNotFound(_)));

        let err = engine.debit("alice", "ghost-tool", actor("alice", false)).await.unwrap_err();
        assert!(matches!(err, LedgerError::ToolNotFound(_)));
    }

    #[tokio::test]
    async fn test_list_events_forbidden_for_other_account() {
        let pool = test_pool().await;
        let engine = test_engine(&pool);

        create_test_account(&pool, "alice", 100, false, false).await;
        create_test_account(&pool, "bob", 100, false, false).await;

        let err = engine.list_events("alice", &actor("bob", false)).await.unwrap_err();
        assert!(matches!(err, LedgerError::Forbidden));

        // 관리자는 모든 계정을 볼 수 있음
        create_test_account(&pool, "admin", 0, true, false).await;
        let events = engine.list_events("alice", &actor("admin", true)).await.unwrap();
        assert!(events.is_empty());
    }

    #[tokio::test]
    async fn test_event_ordering_matches_commit_order() {
        let pool = test_pool().await;
        let engine = test_engine(&pool);

        create_test_account(&pool, "alice", 100, false, false).await;
        create_test_account(&pool, "admin", 0, true, false).await;
        create_test_package(&pool, "50-pack", 50).await;
        create_test_tool(&pool, "script-generator", 10, false).await;

        engine.credit("alice", "50-pack", actor("alice", false)).await.unwrap();
        engine.debit("alice", "script-generator", actor("alice", false)).await.unwrap();
        engine.admin_adjust("alice", 200, actor("admin", true)).await.unwrap();

        let events = engine.list_events("alice", &actor("alice", false)).await.unwrap();
        assert_eq!(events.len(), 3);

        // 커밋 순서 보존 + 타임스탬프 비감소
        assert_eq!(events[0].kind, EventKind::Purchase);
        assert_eq!(events[1].kind, EventKind::Debit);
        assert_eq!(events[2].kind, EventKind::AdminAdjustment);

        for pair in events.windows(2) {
            assert!(pair[0].seq < pair[1].seq);
            assert!(pair[0].created_at <= pair[1].created_at);
        }

        // 각 이벤트의 resulting_balance는 prefix-sum과 일치
        let mut replayed = 100;
        for event in &events {
            replayed += event.delta;
            assert_eq!(event.resulting_balance, replayed);
        }
    }
}
