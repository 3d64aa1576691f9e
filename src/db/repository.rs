use super::models::{
    AccountRecord, LedgerEventRecord, PackageRecord, SessionRecord, ToolRecord,
    ToolUsageStatRecord,
};
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqlitePool;
use sqlx::Error as SqlxError;

/// 계정 저장소
///
/// 잔액 변경은 이 저장소를 거치지 않는다. 잔액을 바꾸는 유일한 경로는
/// 원장 엔진의 트랜잭션이다.
#[derive(Clone)]
pub struct AccountRepository {
    pool: SqlitePool,
}

impl AccountRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// 계정 저장
    pub async fn save(&self, account: &AccountRecord) -> Result<(), SqlxError> {
        sqlx::query(
            "INSERT INTO accounts
             (account_id, name, email, balance, starting_balance, is_admin, is_banned, is_deleted, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)"
        )
        .bind(&account.account_id)
        .bind(&account.name)
        .bind(&account.email)
        .bind(account.balance)
        .bind(account.starting_balance)
        .bind(account.is_admin)
        .bind(account.is_banned)
        .bind(account.is_deleted)
        .bind(account.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// 계정 조회
    pub async fn find_by_id(&self, account_id: &str) -> Result<Option<AccountRecord>, SqlxError> {
        sqlx::query_as::<_, AccountRecord>(
            "SELECT account_id, name, email, balance, starting_balance, is_admin, is_banned, is_deleted, created_at
             FROM accounts
             WHERE account_id = ?"
        )
        .bind(account_id)
        .fetch_optional(&self.pool)
        .await
    }

    /// 전체 계정 조회 (관리자용)
    pub async fn find_all(&self) -> Result<Vec<AccountRecord>, SqlxError> {
        sqlx::query_as::<_, AccountRecord>(
            "SELECT account_id, name, email, balance, starting_balance, is_admin, is_banned, is_deleted, created_at
             FROM accounts
             ORDER BY created_at ASC"
        )
        .fetch_all(&self.pool)
        .await
    }

    /// 관리자 권한 변경
    pub async fn set_admin(&self, account_id: &str, is_admin: bool) -> Result<bool, SqlxError> {
        let result = sqlx::query("UPDATE accounts SET is_admin = ? WHERE account_id = ?")
            .bind(is_admin)
            .bind(account_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// 차단 상태 변경
    pub async fn set_banned(&self, account_id: &str, banned: bool) -> Result<bool, SqlxError> {
        let result = sqlx::query("UPDATE accounts SET is_banned = ? WHERE account_id = ?")
            .bind(banned)
            .bind(account_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// 소프트 삭제 (익명화)
    ///
    /// 원장 이벤트가 참조하는 계정은 물리 삭제하지 않는다. 이름과 이메일을
    /// 익명화하고 차단 처리한 뒤 이벤트 이력은 그대로 남긴다.
    pub async fn anonymize(&self, account_id: &str) -> Result<bool, SqlxError> {
        let result = sqlx::query(
            "UPDATE accounts
             SET name = 'compte supprimé',
                 email = 'deleted+' || account_id || '@invalid',
                 is_banned = 1,
                 is_deleted = 1
             WHERE account_id = ? AND is_deleted = 0"
        )
        .bind(account_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}

/// 원장 이벤트 저장소 (조회 전용 표면)
///
/// 이벤트 기록은 엔진 트랜잭션 안에서만 일어난다.
#[derive(Clone)]
pub struct EventRepository {
    pool: SqlitePool,
}

impl EventRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// 계정별 이벤트 조회 (커밋 순서 오름차순)
    pub async fn find_by_account(&self, account_id: &str) -> Result<Vec<LedgerEventRecord>, SqlxError> {
        sqlx::query_as::<_, LedgerEventRecord>(
            "SELECT seq, event_id, account_id, kind, delta, reference, resulting_balance, actor_id, created_at
             FROM ledger_events
             WHERE account_id = ?
             ORDER BY seq ASC"
        )
        .bind(account_id)
        .fetch_all(&self.pool)
        .await
    }

    /// 전체 이벤트 조회 (관리자 리포트용)
    pub async fn find_all(&self, limit: i64) -> Result<Vec<LedgerEventRecord>, SqlxError> {
        sqlx::query_as::<_, LedgerEventRecord>(
            "SELECT seq, event_id, account_id, kind, delta, reference, resulting_balance, actor_id, created_at
             FROM ledger_events
             ORDER BY seq ASC
             LIMIT ?"
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await
    }

    /// 도구별 사용 집계 (debit 이벤트 기준)
    pub async fn usage_stats(&self) -> Result<Vec<ToolUsageStatRecord>, SqlxError> {
        sqlx::query_as::<_, ToolUsageStatRecord>(
            "SELECT e.reference AS tool_id,
                    t.name AS tool_name,
                    COUNT(*) AS uses,
                    CAST(COALESCE(SUM(-e.delta), 0) AS INTEGER) AS tickets_used
             FROM ledger_events e
             LEFT JOIN tools t ON t.tool_id = e.reference
             WHERE e.kind = 'debit'
             GROUP BY e.reference, t.name
             ORDER BY tickets_used DESC"
        )
        .fetch_all(&self.pool)
        .await
    }
}

/// 도구 저장소
#[derive(Clone)]
pub struct ToolRepository {
    pool: SqlitePool,
}

impl ToolRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// 도구 저장
    pub async fn save(&self, tool: &ToolRecord) -> Result<(), SqlxError> {
        sqlx::query(
            "INSERT INTO tools
             (tool_id, name, description, ticket_cost, is_affiliate, category, url, promo_code,
              icon_name, model, system_prompt, use_api, usage_instructions)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"
        )
        .bind(&tool.tool_id)
        .bind(&tool.name)
        .bind(&tool.description)
        .bind(tool.ticket_cost)
        .bind(tool.is_affiliate)
        .bind(&tool.category)
        .bind(&tool.url)
        .bind(&tool.promo_code)
        .bind(&tool.icon_name)
        .bind(&tool.model)
        .bind(&tool.system_prompt)
        .bind(tool.use_api)
        .bind(&tool.usage_instructions)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// 도구 갱신
    pub async fn update(&self, tool: &ToolRecord) -> Result<bool, SqlxError> {
        let result = sqlx::query(
            "UPDATE tools
             SET name = ?, description = ?, ticket_cost = ?, is_affiliate = ?, category = ?,
                 url = ?, promo_code = ?, icon_name = ?, model = ?, system_prompt = ?,
                 use_api = ?, usage_instructions = ?
             WHERE tool_id = ?"
        )
        .bind(&tool.name)
        .bind(&tool.description)
        .bind(tool.ticket_cost)
        .bind(tool.is_affiliate)
        .bind(&tool.category)
        .bind(&tool.url)
        .bind(&tool.promo_code)
        .bind(&tool.icon_name)
        .bind(&tool.model)
        .bind(&tool.system_prompt)
        .bind(tool.use_api)
        .bind(&tool.usage_instructions)
        .bind(&tool.tool_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// 도구 비용만 갱신
    pub async fn update_cost(&self, tool_id: &str, ticket_cost: i64) -> Result<bool, SqlxError> {
        let result = sqlx::query("UPDATE tools SET ticket_cost = ? WHERE tool_id = ?")
            .bind(ticket_cost)
            .bind(tool_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// 도구 삭제
    pub async fn delete(&self, tool_id: &str) -> Result<bool, SqlxError> {
        let result = sqlx::query("DELETE FROM tools WHERE tool_id = ?")
            .bind(tool_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// 도구 조회
    pub async fn find_by_id(&self, tool_id: &str) -> Result<Option<ToolRecord>, SqlxError> {
        sqlx::query_as::<_, ToolRecord>(
            "SELECT tool_id, name, description, ticket_cost, is_affiliate, category, url, promo_code,
                    icon_name, model, system_prompt, use_api, usage_instructions
             FROM tools
             WHERE tool_id = ?"
        )
        .bind(tool_id)
        .fetch_optional(&self.pool)
        .await
    }

    /// 카테고리별 도구 조회 (category가 None이면 전체)
    pub async fn find_by_category(&self, category: Option<&str>) -> Result<Vec<ToolRecord>, SqlxError> {
        match category {
            Some(category) => {
                sqlx::query_as::<_, ToolRecord>(
                    "SELECT tool_id, name, description, ticket_cost, is_affiliate, category, url, promo_code,
                            icon_name, model, system_prompt, use_api, usage_instructions
                     FROM tools
                     WHERE category = ?
                     ORDER BY name"
                )
                .bind(category)
                .fetch_all(&self.pool)
                .await
            }
            None => {
                sqlx::query_as::<_, ToolRecord>(
                    "SELECT tool_id, name, description, ticket_cost, is_affiliate, category, url, promo_code,
                            icon_name, model, system_prompt, use_api, usage_instructions
                     FROM tools
                     ORDER BY name"
                )
                .fetch_all(&self.pool)
                .await
            }
        }
    }

    /// 등록된 도구 수
    pub async fn count(&self) -> Result<i64, SqlxError> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM tools")
            .fetch_one(&self.pool)
            .await?;

        Ok(row.0)
    }
}

/// 티켓 팩 저장소
#[derive(Clone)]
pub struct PackageRepository {
    pool: SqlitePool,
}

impl PackageRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// 팩 저장
    pub async fn save(&self, package: &PackageRecord) -> Result<(), SqlxError> {
        sqlx::query(
            "INSERT INTO ticket_packages (package_id, name, amount, price)
             VALUES (?, ?, ?, ?)"
        )
        .bind(&package.package_id)
        .bind(&package.name)
        .bind(package.amount)
        .bind(package.price)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// 팩 조회
    pub async fn find_by_id(&self, package_id: &str) -> Result<Option<PackageRecord>, SqlxError> {
        sqlx::query_as::<_, PackageRecord>(
            "SELECT package_id, name, amount, price
             FROM ticket_packages
             WHERE package_id = ?"
        )
        .bind(package_id)
        .fetch_optional(&self.pool)
        .await
    }

    /// 전체 팩 조회 (가격 오름차순)
    pub async fn find_all(&self) -> Result<Vec<PackageRecord>, SqlxError> {
        sqlx::query_as::<_, PackageRecord>(
            "SELECT package_id, name, amount, price
             FROM ticket_packages
             ORDER BY price ASC"
        )
        .fetch_all(&self.pool)
        .await
    }

    /// 팩 수량/가격 갱신
    pub async fn update(&self, package_id: &str, amount: i64, price: f64) -> Result<bool, SqlxError> {
        let result = sqlx::query(
            "UPDATE ticket_packages SET amount = ?, price = ? WHERE package_id = ?"
        )
        .bind(amount)
        .bind(price)
        .bind(package_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// 등록된 팩 수
    pub async fn count(&self) -> Result<i64, SqlxError> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM ticket_packages")
            .fetch_one(&self.pool)
            .await?;

        Ok(row.0)
    }
}

/// 세션 저장소
#[derive(Clone)]
pub struct SessionRepository {
    pool: SqlitePool,
}

impl SessionRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// 세션 저장
    pub async fn save(&self, token: &str, account_id: &str, created_at: DateTime<Utc>) -> Result<(), SqlxError> {
        sqlx::query("INSERT INTO sessions (token, account_id, created_at) VALUES (?, ?, ?)")
            .bind(token)
            .bind(account_id)
            .bind(created_at)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// 토큰으로 세션 조회
    pub async fn find_by_token(&self, token: &str) -> Result<Option<SessionRecord>, SqlxError> {
        sqlx::query_as::<_, SessionRecord>(
            "SELECT token, account_id, created_at FROM sessions WHERE token = ?"
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await
    }

    /// 계정의 모든 세션 폐기 (차단/삭제 시)
    pub async fn revoke_for_account(&self, account_id: &str) -> Result<u64, SqlxError> {
        let result = sqlx::query("DELETE FROM sessions WHERE account_id = ?")
            .bind(account_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}
