use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;

use crate::db::models::LedgerEventRecord;
use crate::ledger::error::LedgerError;

/// 원장 이벤트 종류
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// 티켓 팩 구매 (양수 delta)
    Purchase,
    /// 도구 사용 차감 (음수 delta)
    Debit,
    /// 관리자 잔액 설정 (delta = 신규 잔액 - 이전 잔액)
    AdminAdjustment,
    /// 환불 (양수 delta)
    Refund,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Purchase => "purchase",
            Self::Debit => "debit",
            Self::AdminAdjustment => "admin_adjustment",
            Self::Refund => "refund",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "purchase" => Some(Self::Purchase),
            "debit" => Some(Self::Debit),
            "admin_adjustment" => Some(Self::AdminAdjustment),
            "refund" => Some(Self::Refund),
            _ => None,
        }
    }
}

/// 요청 주체
///
/// 디렉터리가 베어러 토큰에서 해석한 신원. 관리자 여부는 오직 계정
/// 레코드에서 오며, 별도의 관리자 자격 증명 경로는 존재하지 않는다.
#[derive(Debug, Clone)]
pub struct Actor {
    pub account_id: String,
    pub is_admin: bool,
    pub is_banned: bool,
}

/// 원장 이벤트
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerEvent {
    pub seq: i64,
    pub event_id: String,
    pub account_id: String,
    pub kind: EventKind,
    pub delta: i64,
    pub reference: Option<String>,
    pub resulting_balance: i64,
    pub actor_id: String,
    pub created_at: DateTime<Utc>,
}

impl LedgerEvent {
    /// DB 레코드에서 변환. 알 수 없는 kind 문자열이면 None.
    pub fn from_record(record: LedgerEventRecord) -> Option<Self> {
        let kind = EventKind::parse(&record.kind)?;
        Some(Self {
            seq: record.seq,
            event_id: record.event_id,
            account_id: record.account_id,
            kind,
            delta: record.delta,
            reference: record.reference,
            resulting_balance: record.resulting_balance,
            actor_id: record.actor_id,
            created_at: record.created_at,
        })
    }
}

/// 변경 결과
///
/// event_id가 None인 경우는 무비용(제휴) 도구 사용처럼 이벤트를 남기지
/// 않는 no-op 성공뿐이다.
#[derive(Debug, Clone, Serialize)]
pub struct MutationResult {
    pub new_balance: i64,
    pub event_id: Option<String>,
}

/// 원장 변경 명령
///
/// 금액은 명령에 싣지 않는다. 비용과 충전량은 변경 시점에 엔진이
/// 카탈로그에서 다시 해석한다 (호출자가 들고 온 값은 신뢰하지 않음).
#[derive(Debug, Clone)]
pub enum LedgerOp {
    /// 티켓 팩 구매 충전
    Credit { package_id: String },
    /// 도구 사용 차감
    Debit { tool_id: String },
    /// 관리자 잔액 설정
    AdminAdjust { new_balance: i64 },
    /// 환불 충전
    Refund { amount: i64, reference: String },
}

/// 계정 워커 큐로 전달되는 명령 봉투
pub struct LedgerCommand {
    pub op: LedgerOp,
    pub actor: Actor,
    pub reply: oneshot::Sender<Result<MutationResult, LedgerError>>,
}
