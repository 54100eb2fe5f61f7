//! CLI 子命令背後的流程，與輸出格式無關，方便整合測試

use crate::core::processed::{ProcessedIndex, WarehouseOption, ZoneOption};
use crate::core::quantity::parse_quantity;
use crate::core::session::{ReconciliationSession, ResumeOutcome, SessionOptions};
use crate::core::sheet::{self, CountEntry};
use crate::core::{InventoryBackend, Storage};
use crate::domain::model::{AuditId, AuditLine, InventoryAudit, WarehouseId, ZoneId};
use crate::utils::error::{Result, StocktakeError};
use serde::Serialize;
use std::sync::Arc;

#[derive(Debug, Clone, Serialize)]
pub struct ExportReport {
    pub audit_id: AuditId,
    pub warehouse_id: WarehouseId,
    pub zones: Vec<ZoneId>,
    pub lines: usize,
    pub bundle_path: String,
    pub resumed: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct CountReport {
    pub audit_id: AuditId,
    pub applied: usize,
    pub delta_lines: usize,
    pub submitted: bool,
    pub discrepancies: Vec<AuditLine>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusReport {
    pub audit_id: AuditId,
    pub warehouse_id: WarehouseId,
    pub zones: Vec<ZoneId>,
    pub lines: usize,
    pub delta_lines: usize,
    pub phase: String,
}

pub fn bundle_file_name(audit_id: AuditId) -> String {
    format!("audit_{}.zip", audit_id)
}

pub async fn warehouses<B: InventoryBackend + 'static>(
    backend: Arc<B>,
    options: SessionOptions,
) -> Result<Vec<WarehouseOption>> {
    let mut session = ReconciliationSession::new(backend, options);
    // 先還原自己進行中的盤點單，它的區域不算被佔用
    session.resume().await?;
    session.warehouse_options().await
}

pub async fn zones<B: InventoryBackend + 'static>(
    backend: Arc<B>,
    warehouse_id: WarehouseId,
) -> Result<Vec<ZoneOption>> {
    let own = backend
        .current_check()
        .await?
        .filter(InventoryAudit::is_open)
        .map(|a| a.id);
    let audits = backend.list_checks().await?;
    let zones = backend.list_zones(warehouse_id).await?;
    Ok(ProcessedIndex::from_audits(&audits, own).zone_options(zones))
}

pub async fn status<B: InventoryBackend + 'static>(
    backend: Arc<B>,
    options: SessionOptions,
) -> Result<Option<StatusReport>> {
    let mut session = ReconciliationSession::new(backend, options);
    match session.resume().await? {
        ResumeOutcome::Fresh => Ok(None),
        ResumeOutcome::Resumed {
            audit_id,
            warehouse_id,
            zones,
            lines,
        } => Ok(Some(StatusReport {
            audit_id,
            warehouse_id,
            zones,
            lines,
            delta_lines: session.delta().len(),
            phase: session.phase().to_string(),
        })),
    }
}

/// 開始或延續盤點，載入帳面數量後匯出盤點表 ZIP
pub async fn export<B, S>(
    backend: Arc<B>,
    storage: &S,
    options: SessionOptions,
    warehouse: Option<WarehouseId>,
    zones: &[ZoneId],
) -> Result<ExportReport>
where
    B: InventoryBackend + 'static,
    S: Storage,
{
    let mut session = ReconciliationSession::new(backend, options);

    let resumed = match session.resume().await? {
        ResumeOutcome::Fresh => {
            let warehouse_id = warehouse.ok_or_else(|| {
                StocktakeError::validation("Warehouse is required when no audit is in progress")
            })?;
            session.select_warehouse(warehouse_id).await?;
            session.select_zones(zones)?;
            session.start().await?;
            false
        }
        ResumeOutcome::Resumed { warehouse_id, .. } => {
            if let Some(requested) = warehouse.filter(|w| *w != warehouse_id) {
                return Err(StocktakeError::validation(format!(
                    "An audit for warehouse {} is in progress, finish it before counting warehouse {}",
                    warehouse_id, requested
                )));
            }
            if zones.is_empty() {
                session.load_items().await?;
            } else {
                session.select_zones(zones)?;
                session.start().await?;
            }
            true
        }
    };

    let (audit_id, warehouse_id) = session
        .audit()
        .map(|a| (a.id, a.warehouse_id))
        .ok_or_else(|| StocktakeError::ProcessingError {
            message: "Audit was not opened".to_string(),
        })?;

    let data = sheet::bundle(audit_id, warehouse_id, session.working_set())?;
    let file_name = bundle_file_name(audit_id);
    storage.write_file(&file_name, &data).await?;

    Ok(ExportReport {
        audit_id,
        warehouse_id,
        zones: session.working_set().loaded_zones().collect(),
        lines: session.working_set().len(),
        bundle_path: file_name,
        resumed,
    })
}

/// 讀入填好的盤點表，保存進度或送出差異
pub async fn apply_counts<B: InventoryBackend + 'static>(
    backend: Arc<B>,
    options: SessionOptions,
    sheets: &[Vec<u8>],
    submit: bool,
) -> Result<CountReport> {
    // 盤點表格式與數量先在本機檢查，錯誤時不會碰到後端
    let mut entries: Vec<CountEntry> = Vec::new();
    for data in sheets {
        entries.extend(sheet::read_sheet(data)?);
    }
    for entry in &entries {
        parse_quantity(&entry.actual).map_err(|e| {
            StocktakeError::validation(format!("Row {}: {}", entry.key(), e.user_friendly_message()))
        })?;
    }

    let mut session = ReconciliationSession::new(backend, options);
    let audit_id = match session.resume().await? {
        ResumeOutcome::Fresh => {
            return Err(StocktakeError::validation(
                "No audit in progress, run `stocktake export` first",
            ))
        }
        ResumeOutcome::Resumed { audit_id, .. } => audit_id,
    };

    // 盤點單上有區域但還沒存過明細時，補抓帳面數量
    session.load_items().await?;

    let applied = session.apply_counts(&entries)?;
    let delta_lines = session.delta().len();

    if submit {
        let receipt = session.submit().await?;
        Ok(CountReport {
            audit_id,
            applied,
            delta_lines,
            submitted: true,
            discrepancies: receipt.discrepancies,
        })
    } else {
        session.save_progress().await?;
        Ok(CountReport {
            audit_id,
            applied,
            delta_lines,
            submitted: false,
            discrepancies: Vec::new(),
        })
    }
}
