use thiserror::Error;

/// 원장 오류 분류
///
/// 검증/권한/조회 실패는 재시도 없이 그대로 호출자에게 전달된다.
/// `Conflict`만 엔진 내부에서 제한 횟수만큼 재시도되고, 소진되면
/// `StorageUnavailable`로 바뀌어 표면화된다.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("금액이 올바르지 않습니다: {0}")]
    InvalidAmount(i64),

    #[error("계정을 찾을 수 없습니다: {0}")]
    AccountNotFound(String),

    #[error("차단된 계정입니다: {0}")]
    AccountBanned(String),

    #[error("티켓이 부족합니다 (필요: {required}, 보유: {available})")]
    InsufficientBalance { required: i64, available: i64 },

    #[error("권한이 없습니다")]
    Forbidden,

    #[error("인증되지 않은 요청입니다")]
    Unauthenticated,

    #[error("도구를 찾을 수 없습니다: {0}")]
    ToolNotFound(String),

    #[error("티켓 팩을 찾을 수 없습니다: {0}")]
    PackageNotFound(String),

    #[error("이미 등록된 이메일입니다: {0}")]
    DuplicateEmail(String),

    #[error("저장소 경합이 발생했습니다: {0}")]
    Conflict(String),

    #[error("저장소를 사용할 수 없습니다: {0}")]
    StorageUnavailable(String),
}

impl LedgerError {
    /// 내부 재시도 대상 여부 (저장소 경합만 해당)
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }
}

impl From<sqlx::Error> for LedgerError {
    fn from(err: sqlx::Error) -> Self {
        if is_busy(&err) {
            Self::Conflict(err.to_string())
        } else {
            Self::StorageUnavailable(err.to_string())
        }
    }
}

/// SQLite 잠금 경합(BUSY/LOCKED) 오류 판별
fn is_busy(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db) => {
            let code = db.code().map(|c| c.to_string()).unwrap_or_default();
            // SQLITE_BUSY(5), SQLITE_LOCKED(6)와 확장 코드
            matches!(code.as_str(), "5" | "6" | "261" | "517" | "518")
                || db.message().contains("database is locked")
                || db.message().contains("database table is locked")
        }
        sqlx::Error::PoolTimedOut => true,
        _ => false,
    }
}
