//! 도구/티켓 팩 카탈로그
//!
//! 원장의 차감/충전 금액은 항상 변경 시점에 이 모듈을 다시 조회해
//! 결정됩니다. 프레젠테이션 계층이 캐시해 둔 비용은 절대 쓰지 않습니다.

use log::info;
use sqlx::sqlite::SqlitePool;

use crate::db::models::{PackageRecord, ToolRecord};
use crate::db::repository::{PackageRepository, ToolRepository};
use crate::ledger::error::LedgerError;

/// 카탈로그 서비스
#[derive(Clone)]
pub struct CatalogService {
    tools: ToolRepository,
    packages: PackageRepository,
}

impl CatalogService {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            tools: ToolRepository::new(pool.clone()),
            packages: PackageRepository::new(pool),
        }
    }

    /// 도구 조회 (없으면 ToolNotFound)
    pub async fn get_tool(&self, tool_id: &str) -> Result<ToolRecord, LedgerError> {
        self.tools
            .find_by_id(tool_id)
            .await?
            .ok_or_else(|| LedgerError::ToolNotFound(tool_id.to_string()))
    }

    /// 티켓 팩 조회 (없으면 PackageNotFound)
    pub async fn get_package(&self, package_id: &str) -> Result<PackageRecord, LedgerError> {
        self.packages
            .find_by_id(package_id)
            .await?
            .ok_or_else(|| LedgerError::PackageNotFound(package_id.to_string()))
    }

    /// 도구 목록 (카테고리 필터 선택)
    pub async fn list_tools(&self, category: Option<&str>) -> Result<Vec<ToolRecord>, LedgerError> {
        Ok(self.tools.find_by_category(category).await?)
    }

    /// 티켓 팩 목록 (가격 오름차순)
    pub async fn list_packages(&self) -> Result<Vec<PackageRecord>, LedgerError> {
        Ok(self.packages.find_all().await?)
    }

    /// 도구 등록 (관리자)
    pub async fn add_tool(&self, tool: &ToolRecord) -> Result<(), LedgerError> {
        if tool.ticket_cost < 0 {
            return Err(LedgerError::InvalidAmount(tool.ticket_cost));
        }

        self.tools.save(tool).await?;
        info!("도구 등록: {} ({})", tool.name, tool.tool_id);

        Ok(())
    }

    /// 도구 갱신 (관리자)
    pub async fn update_tool(&self, tool: &ToolRecord) -> Result<(), LedgerError> {
        if tool.ticket_cost < 0 {
            return Err(LedgerError::InvalidAmount(tool.ticket_cost));
        }

        if !self.tools.update(tool).await? {
            return Err(LedgerError::ToolNotFound(tool.tool_id.clone()));
        }

        Ok(())
    }

    /// 도구 비용 갱신 (관리자)
    pub async fn update_tool_cost(&self, tool_id: &str, ticket_cost: i64) -> Result<(), LedgerError> {
        if ticket_cost < 0 {
            return Err(LedgerError::InvalidAmount(ticket_cost));
        }

        if !self.tools.update_cost(tool_id, ticket_cost).await? {
            return Err(LedgerError::ToolNotFound(tool_id.to_string()));
        }

        info!("도구 비용 갱신: {} -> {} 티켓", tool_id, ticket_cost);

        Ok(())
    }

    /// 도구 삭제 (관리자)
    pub async fn delete_tool(&self, tool_id: &str) -> Result<(), LedgerError> {
        if !self.tools.delete(tool_id).await? {
            return Err(LedgerError::ToolNotFound(tool_id.to_string()));
        }

        info!("도구 삭제: {}", tool_id);

        Ok(())
    }

    /// 티켓 팩 등록 (시드/관리자)
    pub async fn add_package(&self, package: &PackageRecord) -> Result<(), LedgerError> {
        if package.amount <= 0 {
            return Err(LedgerError::InvalidAmount(package.amount));
        }

        self.packages.save(package).await?;
        info!("티켓 팩 등록: {} ({} 티켓)", package.name, package.amount);

        Ok(())
    }

    /// 티켓 팩 수량/가격 갱신 (관리자)
    pub async fn update_package(&self, package_id: &str, amount: i64, price: f64) -> Result<(), LedgerError> {
        if amount <= 0 {
            return Err(LedgerError::InvalidAmount(amount));
        }
        if price < 0.0 {
            return Err(LedgerError::InvalidAmount(price as i64));
        }

        if !self.packages.update(package_id, amount, price).await? {
            return Err(LedgerError::PackageNotFound(package_id.to_string()));
        }

        info!("티켓 팩 갱신: {} ({} 티켓, {:.2} EUR)", package_id, amount, price);

        Ok(())
    }

    /// 카탈로그가 비어 있는지 (시드 필요 여부)
    pub async fn is_empty(&self) -> Result<bool, LedgerError> {
        Ok(self.tools.count().await? == 0 && self.packages.count().await? == 0)
    }
}
