use crate::core::fetch::fetch_concurrently;
use crate::core::processed::{ProcessedIndex, WarehouseOption, ZoneOption};
use crate::core::quantity::parse_quantity;
use crate::core::sheet::CountEntry;
use crate::core::working_set::WorkingSet;
use crate::domain::model::{
    AuditLine, AuditStatus, ContinueCheckRequest, DeltaLine, InventoryAudit, LineKey,
    StartCheckRequest, SubmitReceipt, SubmitRequest, Warehouse, WarehouseId, Zone, ZoneId,
};
use crate::domain::ports::InventoryBackend;
use crate::utils::error::{Result, StocktakeError};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    NoAudit,
    WarehouseSelected,
    ZonesLoading,
    ItemsLoaded,
    Counting,
    Submitting,
    Completed,
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::NoAudit => "NoAudit",
            Self::WarehouseSelected => "WarehouseSelected",
            Self::ZonesLoading => "ZonesLoading",
            Self::ItemsLoaded => "ItemsLoaded",
            Self::Counting => "Counting",
            Self::Submitting => "Submitting",
            Self::Completed => "Completed",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub concurrent_requests: usize,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            concurrent_requests: 4,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ResumeOutcome {
    Fresh,
    Resumed {
        audit_id: i64,
        warehouse_id: WarehouseId,
        zones: Vec<ZoneId>,
        lines: usize,
    },
}

/// 系統盤點的客戶端狀態機。
///
/// 所有會打後端的步驟都先把資料取回，成功後才改動本地狀態；
/// 任何網路錯誤都會讓 session 維持在呼叫前的樣子。
pub struct ReconciliationSession<B: InventoryBackend + 'static> {
    backend: Arc<B>,
    options: SessionOptions,
    phase: SessionPhase,
    audit: Option<InventoryAudit>,
    warehouse_id: Option<WarehouseId>,
    selected_zones: BTreeSet<ZoneId>,
    warehouses: BTreeMap<WarehouseId, Warehouse>,
    zones: BTreeMap<WarehouseId, Vec<Zone>>,
    processed: ProcessedIndex,
    working: WorkingSet,
}

impl<B: InventoryBackend + 'static> ReconciliationSession<B> {
    pub fn new(backend: Arc<B>, options: SessionOptions) -> Self {
        Self {
            backend,
            options,
            phase: SessionPhase::NoAudit,
            audit: None,
            warehouse_id: None,
            selected_zones: BTreeSet::new(),
            warehouses: BTreeMap::new(),
            zones: BTreeMap::new(),
            processed: ProcessedIndex::default(),
            working: WorkingSet::new(),
        }
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn audit(&self) -> Option<&InventoryAudit> {
        self.audit.as_ref()
    }

    pub fn warehouse_id(&self) -> Option<WarehouseId> {
        self.warehouse_id
    }

    pub fn selected_zones(&self) -> Vec<ZoneId> {
        self.selected_zones.iter().copied().collect()
    }

    pub fn working_set(&self) -> &WorkingSet {
        &self.working
    }

    pub fn processed(&self) -> &ProcessedIndex {
        &self.processed
    }

    fn open_audit_id(&self) -> Option<i64> {
        self.audit.as_ref().filter(|a| a.is_open()).map(|a| a.id)
    }

    /// 進行中盤點單上仍需盤點的區域（排除其他單已完成的）
    fn audit_zones(&self) -> BTreeSet<ZoneId> {
        let completed = self.processed.completed_zones();
        self.audit
            .iter()
            .filter(|a| a.is_open())
            .flat_map(|a| a.zone_ids.iter().copied())
            .filter(|zone| !completed.contains(zone))
            .collect()
    }

    fn ensure_phase(&self, operation: &str, allowed: &[SessionPhase]) -> Result<()> {
        if allowed.contains(&self.phase) {
            Ok(())
        } else {
            Err(StocktakeError::InvalidState {
                operation: operation.to_string(),
                phase: self.phase.to_string(),
            })
        }
    }

    async fn fetch_processed(&self) -> Result<ProcessedIndex> {
        let audits = self.backend.list_checks().await?;
        let processed = ProcessedIndex::from_audits(&audits, self.open_audit_id());
        tracing::debug!("🔄 {} zones already processed in this cycle", processed.zone_count());
        Ok(processed)
    }

    /// 列出倉庫，整倉已盤完的標記為 disabled
    pub async fn warehouse_options(&mut self) -> Result<Vec<WarehouseOption>> {
        let processed = self.fetch_processed().await?;
        let warehouses = self.backend.list_warehouses().await?;

        let backend = self.backend.clone();
        let zones = fetch_concurrently(
            warehouses.iter().map(|w| w.id).collect(),
            self.options.concurrent_requests,
            move |warehouse_id| {
                let backend = backend.clone();
                async move { backend.list_zones(warehouse_id).await }
            },
        )
        .await?;
        let zones: BTreeMap<WarehouseId, Vec<Zone>> = zones.into_iter().collect();

        let options = warehouses
            .iter()
            .map(|warehouse| WarehouseOption {
                disabled: zones
                    .get(&warehouse.id)
                    .map(|z| processed.is_warehouse_processed(z))
                    .unwrap_or(false),
                warehouse: warehouse.clone(),
            })
            .collect();

        self.processed = processed;
        self.warehouses = warehouses.into_iter().map(|w| (w.id, w)).collect();
        self.zones = zones;
        Ok(options)
    }

    /// 目前倉庫的區域，已被其他盤點單佔用的標記為 disabled
    pub async fn zone_options(&mut self) -> Result<Vec<ZoneOption>> {
        let warehouse_id = self
            .warehouse_id
            .ok_or_else(|| StocktakeError::validation("Warehouse is required"))?;
        let processed = self.fetch_processed().await?;
        let zones = self.backend.list_zones(warehouse_id).await?;

        self.processed = processed;
        self.zones.insert(warehouse_id, zones.clone());
        Ok(self.processed.zone_options(zones))
    }

    pub async fn select_warehouse(&mut self, warehouse_id: WarehouseId) -> Result<()> {
        self.ensure_phase(
            "select_warehouse",
            &[
                SessionPhase::NoAudit,
                SessionPhase::WarehouseSelected,
                SessionPhase::Completed,
            ],
        )?;

        if let Some(audit) = self.audit.as_ref().filter(|a| a.is_open()) {
            if audit.warehouse_id != warehouse_id {
                return Err(StocktakeError::validation(format!(
                    "Audit {} is still open for warehouse {}",
                    audit.id, audit.warehouse_id
                )));
            }
        }

        let warehouses = if self.warehouses.contains_key(&warehouse_id) {
            None
        } else {
            Some(self.backend.list_warehouses().await?)
        };
        let known = match &warehouses {
            Some(list) => list.iter().any(|w| w.id == warehouse_id),
            None => true,
        };
        if !known {
            return Err(StocktakeError::validation(format!(
                "Unknown warehouse: {}",
                warehouse_id
            )));
        }

        let processed = self.fetch_processed().await?;
        let zones = self.backend.list_zones(warehouse_id).await?;
        if processed.is_warehouse_processed(&zones) {
            return Err(StocktakeError::validation(format!(
                "Warehouse {} has already been counted in this cycle",
                warehouse_id
            )));
        }

        if let Some(list) = warehouses {
            self.warehouses = list.into_iter().map(|w| (w.id, w)).collect();
        }
        if self.phase == SessionPhase::Completed {
            self.audit = None;
            self.working.clear();
        }
        if self.warehouse_id != Some(warehouse_id) {
            self.selected_zones.clear();
        }
        self.processed = processed;
        self.zones.insert(warehouse_id, zones);
        self.warehouse_id = Some(warehouse_id);
        self.phase = SessionPhase::WarehouseSelected;

        tracing::info!("🏬 Warehouse {} selected", warehouse_id);
        Ok(())
    }

    /// 加入要盤點的區域；已載入的區域會一直保留在選擇中
    pub fn select_zones(&mut self, zone_ids: &[ZoneId]) -> Result<()> {
        let warehouse_id = self
            .warehouse_id
            .ok_or_else(|| StocktakeError::validation("Warehouse is required"))?;
        self.ensure_phase(
            "select_zones",
            &[
                SessionPhase::WarehouseSelected,
                SessionPhase::ItemsLoaded,
                SessionPhase::Counting,
            ],
        )?;

        let known = self.zones.get(&warehouse_id).map(Vec::as_slice).unwrap_or(&[]);
        for zone_id in zone_ids {
            if !known.iter().any(|z| z.id == *zone_id) {
                return Err(StocktakeError::validation(format!(
                    "Zone {} does not belong to warehouse {}",
                    zone_id, warehouse_id
                )));
            }
            if self.processed.is_zone_processed(*zone_id) {
                return Err(StocktakeError::validation(format!(
                    "Zone {} is already counted in another audit",
                    zone_id
                )));
            }
        }

        let mut selection: BTreeSet<ZoneId> = zone_ids.iter().copied().collect();
        selection.extend(self.working.loaded_zones());
        selection.extend(self.audit_zones());
        self.selected_zones = selection;
        tracing::debug!("🗺️ Selected zones: {:?}", self.selected_zones);
        Ok(())
    }

    /// 開啟（或延伸）伺服器上的盤點單，然後載入選定區域的帳面數量
    pub async fn start(&mut self) -> Result<usize> {
        let warehouse_id = self
            .warehouse_id
            .ok_or_else(|| StocktakeError::validation("Warehouse is required"))?;
        if self.selected_zones.is_empty() {
            return Err(StocktakeError::validation("Select at least one zone"));
        }
        self.ensure_phase(
            "start",
            &[
                SessionPhase::WarehouseSelected,
                SessionPhase::ItemsLoaded,
                SessionPhase::Counting,
            ],
        )?;

        let open = self
            .audit
            .as_ref()
            .filter(|a| a.is_open())
            .map(|a| (a.id, a.zone_ids.clone()));

        match open {
            Some((audit_id, zone_ids)) => {
                let new_zones: Vec<ZoneId> = self
                    .selected_zones
                    .iter()
                    .filter(|zone| !zone_ids.contains(zone))
                    .copied()
                    .collect();
                if !new_zones.is_empty() {
                    let request = ContinueCheckRequest {
                        zone_ids: new_zones,
                        items: Vec::new(),
                    };
                    let updated = self.backend.continue_check(audit_id, &request).await?;
                    tracing::info!("➕ Audit {} extended with zones {:?}", updated.id, request.zone_ids);
                    self.audit = Some(updated);
                }
            }
            None => {
                let request = StartCheckRequest {
                    warehouse_id,
                    zone_ids: self.selected_zones.iter().copied().collect(),
                };
                let audit = self.backend.start_check(&request).await?;
                tracing::info!("🆕 Audit {} started for warehouse {}", audit.id, warehouse_id);
                self.audit = Some(audit);
            }
        }

        self.load_items().await
    }

    /// 抓取尚未載入的區域，全部成功才合併進工作集合
    pub async fn load_items(&mut self) -> Result<usize> {
        self.ensure_phase(
            "load_items",
            &[
                SessionPhase::WarehouseSelected,
                SessionPhase::ItemsLoaded,
                SessionPhase::Counting,
            ],
        )?;

        let pending: Vec<ZoneId> = self
            .selected_zones
            .iter()
            .filter(|zone| !self.working.is_loaded(**zone))
            .filter(|zone| !self.processed.is_zone_processed(**zone))
            .copied()
            .collect();

        let previous = self.phase;
        if pending.is_empty() {
            if previous == SessionPhase::WarehouseSelected {
                self.phase = SessionPhase::ItemsLoaded;
            }
            return Ok(0);
        }

        self.phase = SessionPhase::ZonesLoading;
        tracing::info!("📦 Loading expected quantities for zones {:?}", pending);

        let backend = self.backend.clone();
        let fetched = fetch_concurrently(pending, self.options.concurrent_requests, move |zone_id| {
            let backend = backend.clone();
            async move { backend.list_zone_items(zone_id).await }
        })
        .await;

        let fetched = match fetched {
            Ok(fetched) => fetched,
            Err(e) => {
                tracing::warn!("⚠️ Loading zones failed, keeping previous state: {}", e);
                self.phase = previous;
                return Err(e);
            }
        };

        let mut added = 0;
        for (zone_id, items) in fetched {
            let count = self.working.merge_zone(zone_id, items);
            tracing::debug!("📦 Zone {}: {} new lines", zone_id, count);
            added += count;
        }

        self.phase = if previous == SessionPhase::Counting {
            SessionPhase::Counting
        } else {
            SessionPhase::ItemsLoaded
        };
        tracing::info!("📦 {} lines in working set (+{})", self.working.len(), added);
        Ok(added)
    }

    pub fn record_count(&mut self, key: &LineKey, input: &str) -> Result<f64> {
        self.ensure_phase(
            "record_count",
            &[SessionPhase::ItemsLoaded, SessionPhase::Counting],
        )?;
        let quantity = parse_quantity(input)?;
        self.working.set_actual(key, quantity)?;
        self.phase = SessionPhase::Counting;
        Ok(quantity)
    }

    /// 套用整張盤點表；任何一列有錯就完全不套用
    pub fn apply_counts(&mut self, entries: &[CountEntry]) -> Result<usize> {
        self.ensure_phase(
            "apply_counts",
            &[SessionPhase::ItemsLoaded, SessionPhase::Counting],
        )?;

        let mut parsed = Vec::with_capacity(entries.len());
        for (index, entry) in entries.iter().enumerate() {
            let key = entry.key();
            if self.working.get(&key).is_none() {
                return Err(StocktakeError::validation(format!(
                    "Row {}: {} is not part of this audit",
                    index + 1,
                    key
                )));
            }
            let quantity = parse_quantity(&entry.actual).map_err(|e| {
                StocktakeError::validation(format!("Row {}: {}", index + 1, e.user_friendly_message()))
            })?;
            parsed.push((key, quantity));
        }

        for (key, quantity) in &parsed {
            self.working.set_actual(key, *quantity)?;
        }
        self.phase = SessionPhase::Counting;
        Ok(parsed.len())
    }

    pub fn delta(&self) -> Vec<DeltaLine> {
        self.working.delta()
    }

    /// 把目前的盤點數存回伺服器，之後可以 `resume`
    pub async fn save_progress(&mut self) -> Result<()> {
        self.ensure_phase(
            "save_progress",
            &[SessionPhase::ItemsLoaded, SessionPhase::Counting],
        )?;
        let audit_id = self
            .open_audit_id()
            .ok_or_else(|| StocktakeError::validation("No open audit to save"))?;

        let request = ContinueCheckRequest {
            zone_ids: self.working.loaded_zones().collect(),
            items: self.working.lines().cloned().collect(),
        };
        let updated = self.backend.continue_check(audit_id, &request).await?;
        tracing::info!("💾 Saved {} lines to audit {}", request.items.len(), updated.id);
        self.audit = Some(updated);
        Ok(())
    }

    pub async fn submit(&mut self) -> Result<SubmitReceipt> {
        if self.warehouse_id.is_none() {
            return Err(StocktakeError::validation("Warehouse is required"));
        }
        self.ensure_phase(
            "submit",
            &[SessionPhase::ItemsLoaded, SessionPhase::Counting],
        )?;
        let audit_id = self
            .open_audit_id()
            .ok_or_else(|| StocktakeError::validation("No open audit to submit"))?;

        let unloaded: Vec<ZoneId> = self
            .selected_zones
            .iter()
            .filter(|zone| !self.working.is_loaded(**zone))
            .filter(|zone| !self.processed.is_zone_processed(**zone))
            .copied()
            .collect();
        if !unloaded.is_empty() {
            return Err(StocktakeError::validation(format!(
                "Zones {:?} have not been loaded yet, load them before submitting",
                unloaded
            )));
        }

        let items = self.working.delta();
        if items.is_empty() {
            return Err(StocktakeError::validation(
                "No discrepancies to submit: every count matches the expected quantity",
            ));
        }

        let request = SubmitRequest { audit_id, items };
        self.phase = SessionPhase::Submitting;
        tracing::info!("📤 Submitting {} delta lines for audit {}", request.items.len(), audit_id);

        match self.backend.submit_check(&request).await {
            Ok(mut receipt) => {
                if receipt.audit.status != AuditStatus::Completed {
                    tracing::warn!(
                        "⚠️ Server reported audit {} as {} after submit",
                        receipt.audit.id,
                        receipt.audit.status
                    );
                    receipt.audit.status = AuditStatus::Completed;
                }
                self.audit = Some(receipt.audit.clone());
                self.working.clear();
                self.selected_zones.clear();
                self.warehouse_id = None;
                self.phase = SessionPhase::Completed;
                tracing::info!("✅ Audit {} completed", audit_id);
                Ok(receipt)
            }
            Err(e) => {
                tracing::error!("❌ Submit failed for audit {}: {}", audit_id, e);
                self.phase = SessionPhase::Counting;
                Err(e)
            }
        }
    }

    /// 依伺服器上進行中的盤點單還原 session
    pub async fn resume(&mut self) -> Result<ResumeOutcome> {
        self.ensure_phase(
            "resume",
            &[SessionPhase::NoAudit, SessionPhase::Completed],
        )?;

        let current = self.backend.current_check().await?;
        let audit = match current.filter(InventoryAudit::is_open) {
            Some(audit) => audit,
            None => {
                let audits = self.backend.list_checks().await?;
                self.processed = ProcessedIndex::from_audits(&audits, None);
                tracing::info!("🆕 No audit in progress");
                return Ok(ResumeOutcome::Fresh);
            }
        };

        let audits = self.backend.list_checks().await?;
        let processed = ProcessedIndex::from_audits(&audits, Some(audit.id));
        let zones = self.backend.list_zones(audit.warehouse_id).await?;

        let completed = processed.completed_zones();
        let resumed_zones: BTreeSet<ZoneId> = audit
            .zone_ids
            .iter()
            .filter(|zone| !completed.contains(zone))
            .copied()
            .collect();
        let line_zones: Vec<ZoneId> = audit.lines.iter().map(|l| l.zone_id).collect();
        let excluded: BTreeSet<ZoneId> = line_zones
            .iter()
            .filter(|zone| !resumed_zones.contains(zone))
            .copied()
            .collect();

        let mut working = WorkingSet::new();
        working.restore(&line_zones, audit.lines.clone());
        working.drop_zones(&excluded);

        self.phase = if working.is_empty() {
            SessionPhase::WarehouseSelected
        } else if working.lines().any(AuditLine::is_discrepant) {
            SessionPhase::Counting
        } else {
            SessionPhase::ItemsLoaded
        };

        let outcome = ResumeOutcome::Resumed {
            audit_id: audit.id,
            warehouse_id: audit.warehouse_id,
            zones: resumed_zones.iter().copied().collect(),
            lines: working.len(),
        };

        self.warehouse_id = Some(audit.warehouse_id);
        self.zones.insert(audit.warehouse_id, zones);
        self.selected_zones = resumed_zones;
        self.processed = processed;
        self.working = working;
        tracing::info!(
            "♻️ Resumed audit {} ({} zones, {} lines)",
            audit.id,
            self.selected_zones.len(),
            self.working.len()
        );
        self.audit = Some(audit);
        Ok(outcome)
    }
}
