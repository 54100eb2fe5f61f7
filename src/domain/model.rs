use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

pub type WarehouseId = i64;
pub type ZoneId = i64;
pub type NomenclatureId = i64;
pub type ContainerId = i64;
pub type AuditId = i64;
pub type TicketId = i64;

/// 後端所有回應的外層結構 `{ message, body }`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiEnvelope<T> {
    #[serde(default)]
    pub message: Option<String>,
    pub body: Option<T>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Warehouse {
    pub id: WarehouseId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Zone {
    pub id: ZoneId,
    pub warehouse_id: WarehouseId,
    pub name: String,
}

/// 伺服器提供的帳面庫存（每個區域一列）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpectedItem {
    pub nomenclature_id: NomenclatureId,
    #[serde(default)]
    pub container_id: Option<ContainerId>,
    pub zone_id: ZoneId,
    pub name: String,
    #[serde(default)]
    pub article: Option<String>,
    #[serde(default)]
    pub unit: Option<String>,
    pub quantity: f64,
}

/// 盤點列的複合鍵 (nomenclature, container, zone)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineKey {
    pub zone_id: ZoneId,
    pub nomenclature_id: NomenclatureId,
    pub container_id: Option<ContainerId>,
}

impl LineKey {
    pub fn new(
        nomenclature_id: NomenclatureId,
        container_id: Option<ContainerId>,
        zone_id: ZoneId,
    ) -> Self {
        Self {
            zone_id,
            nomenclature_id,
            container_id,
        }
    }
}

impl fmt::Display for LineKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.container_id {
            Some(container) => write!(
                f,
                "zone {} / nomenclature {} / container {}",
                self.zone_id, self.nomenclature_id, container
            ),
            None => write!(
                f,
                "zone {} / nomenclature {}",
                self.zone_id, self.nomenclature_id
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditLine {
    pub nomenclature_id: NomenclatureId,
    #[serde(default)]
    pub container_id: Option<ContainerId>,
    pub zone_id: ZoneId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub article: Option<String>,
    #[serde(default)]
    pub unit: Option<String>,
    pub expected_quantity: f64,
    pub actual_quantity: f64,
    /// 只有送出後由伺服器計算
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discrepancy: Option<f64>,
}

impl AuditLine {
    pub fn key(&self) -> LineKey {
        LineKey::new(self.nomenclature_id, self.container_id, self.zone_id)
    }

    pub fn is_discrepant(&self) -> bool {
        crate::core::quantity::differs(self.actual_quantity, self.expected_quantity)
    }
}

impl From<ExpectedItem> for AuditLine {
    fn from(item: ExpectedItem) -> Self {
        Self {
            nomenclature_id: item.nomenclature_id,
            container_id: item.container_id,
            zone_id: item.zone_id,
            name: item.name,
            article: item.article,
            unit: item.unit,
            expected_quantity: item.quantity,
            actual_quantity: item.quantity,
            discrepancy: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditStatus {
    InProgress,
    Completed,
}

impl fmt::Display for AuditStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InProgress => f.write_str("IN_PROGRESS"),
            Self::Completed => f.write_str("COMPLETED"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryAudit {
    pub id: AuditId,
    pub warehouse_id: WarehouseId,
    pub status: AuditStatus,
    #[serde(default)]
    pub created_by: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub zone_ids: Vec<ZoneId>,
    #[serde(default)]
    pub lines: Vec<AuditLine>,
}

impl InventoryAudit {
    pub fn is_open(&self) -> bool {
        self.status == AuditStatus::InProgress
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartCheckRequest {
    pub warehouse_id: WarehouseId,
    pub zone_ids: Vec<ZoneId>,
}

/// 追加區域或保存部分盤點結果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContinueCheckRequest {
    pub zone_ids: Vec<ZoneId>,
    pub items: Vec<AuditLine>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeltaLine {
    pub nomenclature_id: NomenclatureId,
    pub container_id: Option<ContainerId>,
    pub zone_id: ZoneId,
    pub expected_quantity: f64,
    pub actual_quantity: f64,
}

impl From<&AuditLine> for DeltaLine {
    fn from(line: &AuditLine) -> Self {
        Self {
            nomenclature_id: line.nomenclature_id,
            container_id: line.container_id,
            zone_id: line.zone_id,
            expected_quantity: line.expected_quantity,
            actual_quantity: line.actual_quantity,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitRequest {
    pub audit_id: AuditId,
    pub items: Vec<DeltaLine>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitReceipt {
    pub audit: InventoryAudit,
    #[serde(default)]
    pub discrepancies: Vec<AuditLine>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TicketKind {
    WriteOff,
    Sale,
    Production,
}

impl TicketKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::WriteOff => "WRITE_OFF",
            Self::Sale => "SALE",
            Self::Production => "PRODUCTION",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TicketStatus {
    Pending,
    Approved,
    Rejected,
}

impl TicketStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Approved => "APPROVED",
            Self::Rejected => "REJECTED",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ticket {
    pub id: TicketId,
    #[serde(rename = "type")]
    pub kind: TicketKind,
    pub status: TicketStatus,
    #[serde(default)]
    pub created_by: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub comment: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RejectTicketRequest {
    pub reason: String,
}
