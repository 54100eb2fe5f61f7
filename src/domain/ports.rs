use crate::domain::model::{
    AuditId, ContinueCheckRequest, ExpectedItem, InventoryAudit, StartCheckRequest,
    SubmitReceipt, SubmitRequest, Ticket, TicketId, TicketKind, TicketStatus, Warehouse,
    WarehouseId, Zone, ZoneId,
};
use crate::utils::error::Result;
use async_trait::async_trait;
use std::time::Duration;

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

pub trait ConfigProvider: Send + Sync {
    fn base_url(&self) -> &str;
    fn auth_token(&self) -> &str;
    fn request_timeout(&self) -> Duration;
    fn concurrent_requests(&self) -> usize;
    fn output_path(&self) -> &str;
}

/// 盤點流程需要的後端端點
#[async_trait]
pub trait InventoryBackend: Send + Sync {
    async fn list_warehouses(&self) -> Result<Vec<Warehouse>>;
    async fn list_zones(&self, warehouse_id: WarehouseId) -> Result<Vec<Zone>>;
    async fn list_zone_items(&self, zone_id: ZoneId) -> Result<Vec<ExpectedItem>>;
    /// 目前盤點週期內的所有盤點單（含進行中與已完成）
    async fn list_checks(&self) -> Result<Vec<InventoryAudit>>;
    /// 目前使用者尚未完成的盤點單
    async fn current_check(&self) -> Result<Option<InventoryAudit>>;
    async fn start_check(&self, request: &StartCheckRequest) -> Result<InventoryAudit>;
    async fn continue_check(
        &self,
        audit_id: AuditId,
        request: &ContinueCheckRequest,
    ) -> Result<InventoryAudit>;
    async fn submit_check(&self, request: &SubmitRequest) -> Result<SubmitReceipt>;
}

#[async_trait]
pub trait TicketBackend: Send + Sync {
    async fn list_tickets(
        &self,
        status: Option<TicketStatus>,
        kind: Option<TicketKind>,
    ) -> Result<Vec<Ticket>>;
    async fn approve_ticket(&self, ticket_id: TicketId) -> Result<Ticket>;
    async fn reject_ticket(&self, ticket_id: TicketId, reason: &str) -> Result<Ticket>;
}
