use crate::domain::model::{AuditLine, DeltaLine, ExpectedItem, LineKey, ZoneId};
use crate::utils::error::{Result, StocktakeError};
use std::collections::{BTreeMap, BTreeSet};

/// 盤點中的工作集合，以 (nomenclature, container, zone) 去重
#[derive(Debug, Clone, Default)]
pub struct WorkingSet {
    lines: BTreeMap<LineKey, AuditLine>,
    loaded_zones: BTreeSet<ZoneId>,
}

impl WorkingSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// 合併某個區域的帳面資料；已存在的鍵保留原本的盤點數，不屬於該區域的列略過，回傳新增的列數
    pub fn merge_zone(&mut self, zone_id: ZoneId, items: Vec<ExpectedItem>) -> usize {
        self.loaded_zones.insert(zone_id);
        let mut added = 0;
        for item in items {
            if item.zone_id != zone_id {
                tracing::warn!(
                    "⚠️ Item {} reported zone {} while loading zone {}, skipping",
                    item.nomenclature_id,
                    item.zone_id,
                    zone_id
                );
                continue;
            }
            let line = AuditLine::from(item);
            if let std::collections::btree_map::Entry::Vacant(slot) = self.lines.entry(line.key()) {
                slot.insert(line);
                added += 1;
            }
        }
        added
    }

    /// 從伺服器的盤點單還原，保留其中已輸入的實盤數
    pub fn restore(&mut self, zone_ids: &[ZoneId], lines: Vec<AuditLine>) {
        self.loaded_zones.extend(zone_ids.iter().copied());
        for line in lines {
            self.loaded_zones.insert(line.zone_id);
            self.lines.entry(line.key()).or_insert(line);
        }
    }

    pub fn set_actual(&mut self, key: &LineKey, quantity: f64) -> Result<&AuditLine> {
        let line = self
            .lines
            .get_mut(key)
            .ok_or_else(|| StocktakeError::validation(format!("Unknown line: {}", key)))?;
        line.actual_quantity = quantity;
        Ok(line)
    }

    pub fn delta(&self) -> Vec<DeltaLine> {
        self.lines
            .values()
            .filter(|line| line.is_discrepant())
            .map(DeltaLine::from)
            .collect()
    }

    pub fn get(&self, key: &LineKey) -> Option<&AuditLine> {
        self.lines.get(key)
    }

    pub fn lines(&self) -> impl Iterator<Item = &AuditLine> {
        self.lines.values()
    }

    pub fn zone_lines(&self, zone_id: ZoneId) -> impl Iterator<Item = &AuditLine> {
        self.lines
            .values()
            .filter(move |line| line.zone_id == zone_id)
    }

    pub fn is_loaded(&self, zone_id: ZoneId) -> bool {
        self.loaded_zones.contains(&zone_id)
    }

    pub fn loaded_zones(&self) -> impl Iterator<Item = ZoneId> + '_ {
        self.loaded_zones.iter().copied()
    }

    /// 移除指定區域的明細與載入紀錄
    pub fn drop_zones(&mut self, zone_ids: &BTreeSet<ZoneId>) {
        self.lines.retain(|key, _| !zone_ids.contains(&key.zone_id));
        self.loaded_zones.retain(|zone| !zone_ids.contains(zone));
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn clear(&mut self) {
        self.lines.clear();
        self.loaded_zones.clear();
    }
}
