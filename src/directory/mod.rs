//! 계정 디렉터리
//!
//! "이 요청 주체가 누구인가"에 대한 유일한 신뢰 원천입니다. 관리자 여부를
//! 포함한 모든 권한 판단은 여기서 해석된 계정 레코드에서만 나오며,
//! 별도의 관리자 토큰 체계는 두지 않습니다.

use chrono::Utc;
use log::{info, warn};
use sqlx::sqlite::SqlitePool;
use uuid::Uuid;

use crate::db::models::AccountRecord;
use crate::db::repository::{AccountRepository, SessionRepository};
use crate::ledger::error::LedgerError;
use crate::ledger::model::Actor;

/// 계정 디렉터리 서비스
#[derive(Clone)]
pub struct AccountDirectory {
    accounts: AccountRepository,
    sessions: SessionRepository,
    /// 가입 시 지급되는 시작 잔액 (리플레이 기준점)
    starting_balance: i64,
    /// 이 이메일로 가입하는 계정은 관리자로 승격
    admin_email: Option<String>,
}

/// 가입 결과
#[derive(Debug, Clone)]
pub struct Registration {
    pub account: AccountRecord,
    pub token: String,
}

impl AccountDirectory {
    pub fn new(pool: SqlitePool, starting_balance: i64, admin_email: Option<String>) -> Self {
        Self {
            accounts: AccountRepository::new(pool.clone()),
            sessions: SessionRepository::new(pool),
            starting_balance,
            admin_email,
        }
    }

    /// 계정 등록
    ///
    /// 시작 잔액을 지급하고 세션 토큰을 발급한다. 시작 잔액은 이벤트가
    /// 아니라 계정의 starting_balance 컬럼으로 기록되며, 리플레이 검증의
    /// 기준점이 된다.
    pub async fn register(&self, name: &str, email: &str) -> Result<Registration, LedgerError> {
        let email = email.trim().to_lowercase();
        let name = name.trim();

        let is_admin = self
            .admin_email
            .as_deref()
            .map(|admin| admin.eq_ignore_ascii_case(&email))
            .unwrap_or(false);

        let account = AccountRecord {
            account_id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            email: email.clone(),
            balance: self.starting_balance,
            starting_balance: self.starting_balance,
            is_admin,
            is_banned: false,
            is_deleted: false,
            created_at: Utc::now(),
        };

        if let Err(err) = self.accounts.save(&account).await {
            if is_unique_violation(&err) {
                return Err(LedgerError::DuplicateEmail(email));
            }
            return Err(err.into());
        }

        let token = Uuid::new_v4().to_string();
        self.sessions
            .save(&token, &account.account_id, Utc::now())
            .await?;

        info!(
            "계정 등록: {} (시작 잔액: {}, 관리자: {})",
            account.account_id, self.starting_balance, is_admin
        );

        Ok(Registration { account, token })
    }

    /// 베어러 토큰을 요청 주체로 해석
    ///
    /// 모든 보호 표면이 호출하는 단일 인증 경로. 삭제된 계정의 토큰은
    /// 존재하지 않는 것으로 취급한다.
    pub async fn resolve_actor(&self, token: &str) -> Result<Actor, LedgerError> {
        let session = self
            .sessions
            .find_by_token(token)
            .await?
            .ok_or(LedgerError::Unauthenticated)?;

        let account = self
            .accounts
            .find_by_id(&session.account_id)
            .await?
            .ok_or(LedgerError::Unauthenticated)?;

        if account.is_deleted {
            warn!("삭제된 계정의 토큰 사용 시도: {}", account.account_id);
            return Err(LedgerError::Unauthenticated);
        }

        Ok(Actor {
            account_id: account.account_id,
            is_admin: account.is_admin,
            is_banned: account.is_banned,
        })
    }

    /// 계정 조회
    pub async fn get_account(&self, account_id: &str) -> Result<AccountRecord, LedgerError> {
        self.accounts
            .find_by_id(account_id)
            .await?
            .ok_or_else(|| LedgerError::AccountNotFound(account_id.to_string()))
    }

    /// 전체 계정 목록 (관리자)
    pub async fn list_accounts(&self) -> Result<Vec<AccountRecord>, LedgerError> {
        Ok(self.accounts.find_all().await?)
    }

    /// 관리자 권한 변경 (관리자)
    ///
    /// 관리자 권한은 오직 계정 레코드의 is_admin 플래그로만 표현된다.
    pub async fn set_admin(&self, account_id: &str, is_admin: bool) -> Result<(), LedgerError> {
        if !self.accounts.set_admin(account_id, is_admin).await? {
            return Err(LedgerError::AccountNotFound(account_id.to_string()));
        }

        info!("관리자 권한 변경: {} -> {}", account_id, is_admin);

        Ok(())
    }

    /// 차단 상태 변경 (관리자)
    ///
    /// 차단 시 기존 세션을 모두 폐기한다.
    pub async fn set_banned(&self, account_id: &str, banned: bool) -> Result<(), LedgerError> {
        if !self.accounts.set_banned(account_id, banned).await? {
            return Err(LedgerError::AccountNotFound(account_id.to_string()));
        }

        if banned {
            let revoked = self.sessions.revoke_for_account(account_id).await?;
            info!("계정 차단: {} (세션 {}개 폐기)", account_id, revoked);
        } else {
            info!("계정 차단 해제: {}", account_id);
        }

        Ok(())
    }

    /// 소프트 삭제 (관리자)
    ///
    /// 원장 이벤트 이력을 보존해야 하므로 물리 삭제 대신 익명화한다.
    pub async fn soft_delete(&self, account_id: &str) -> Result<(), LedgerError> {
        if !self.accounts.anonymize(account_id).await? {
            return Err(LedgerError::AccountNotFound(account_id.to_string()));
        }

        self.sessions.revoke_for_account(account_id).await?;
        info!("계정 소프트 삭제: {}", account_id);

        Ok(())
    }
}

/// UNIQUE 제약 위반 판별 (이메일 중복)
fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db) => {
            let code = db.code().map(|c| c.to_string()).unwrap_or_default();
            // SQLITE_CONSTRAINT(19) 계열
            code.starts_with("19") || code == "2067" || db.message().contains("UNIQUE constraint failed")
        }
        _ => false,
    }
}
