use crate::domain::model::{AuditId, AuditStatus, InventoryAudit, Warehouse, Zone, ZoneId};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// 本盤點週期內已被其他盤點單佔用（進行中或已完成）的區域
#[derive(Debug, Clone, Default)]
pub struct ProcessedIndex {
    zones: BTreeMap<ZoneId, AuditStatus>,
}

#[derive(Debug, Clone, Serialize)]
pub struct WarehouseOption {
    pub warehouse: Warehouse,
    pub disabled: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ZoneOption {
    pub zone: Zone,
    pub disabled: bool,
}

impl ProcessedIndex {
    /// `own_audit` 是本次 session 的盤點單，不算入排除清單
    pub fn from_audits(audits: &[InventoryAudit], own_audit: Option<AuditId>) -> Self {
        let mut zones = BTreeMap::new();
        for audit in audits.iter().filter(|a| Some(a.id) != own_audit) {
            for zone_id in &audit.zone_ids {
                // COMPLETED 優先於 IN_PROGRESS
                let status = zones.entry(*zone_id).or_insert(audit.status);
                if audit.status == AuditStatus::Completed {
                    *status = AuditStatus::Completed;
                }
            }
        }
        Self { zones }
    }

    pub fn is_zone_processed(&self, zone_id: ZoneId) -> bool {
        self.zones.contains_key(&zone_id)
    }

    pub fn completed_zones(&self) -> BTreeSet<ZoneId> {
        self.zones
            .iter()
            .filter(|(_, status)| **status == AuditStatus::Completed)
            .map(|(zone, _)| *zone)
            .collect()
    }

    /// 倉庫的所有區域都已處理時才視為整倉完成；沒有區域的倉庫不算
    pub fn is_warehouse_processed(&self, zones: &[Zone]) -> bool {
        !zones.is_empty() && zones.iter().all(|zone| self.is_zone_processed(zone.id))
    }

    pub fn zone_options(&self, zones: Vec<Zone>) -> Vec<ZoneOption> {
        zones
            .into_iter()
            .map(|zone| ZoneOption {
                disabled: self.is_zone_processed(zone.id),
                zone,
            })
            .collect()
    }

    pub fn zone_count(&self) -> usize {
        self.zones.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn audit(id: i64, status: AuditStatus, zone_ids: Vec<i64>) -> InventoryAudit {
        InventoryAudit {
            id,
            warehouse_id: 1,
            status,
            created_by: None,
            created_at: Utc::now(),
            zone_ids,
            lines: vec![],
        }
    }

    fn zone(id: i64) -> Zone {
        Zone {
            id,
            warehouse_id: 1,
            name: format!("Z{}", id),
        }
    }

    #[test]
    fn test_own_audit_is_not_excluded() {
        let audits = vec![
            audit(1, AuditStatus::InProgress, vec![1, 2]),
            audit(2, AuditStatus::Completed, vec![3]),
        ];
        let index = ProcessedIndex::from_audits(&audits, Some(1));
        assert!(!index.is_zone_processed(1));
        assert!(index.is_zone_processed(3));
        assert_eq!(index.completed_zones(), BTreeSet::from([3]));
    }

    #[test]
    fn test_other_open_audit_blocks_zone() {
        let audits = vec![audit(7, AuditStatus::InProgress, vec![4])];
        let index = ProcessedIndex::from_audits(&audits, None);
        assert!(index.is_zone_processed(4));
        assert!(index.completed_zones().is_empty());
    }

    #[test]
    fn test_completed_wins_over_in_progress() {
        let audits = vec![
            audit(1, AuditStatus::InProgress, vec![4]),
            audit(2, AuditStatus::Completed, vec![4]),
        ];
        let index = ProcessedIndex::from_audits(&audits, None);
        assert_eq!(index.completed_zones(), BTreeSet::from([4]));
        assert_eq!(index.zone_count(), 1);
    }

    #[test]
    fn test_warehouse_processed_only_when_all_zones_done() {
        let audits = vec![audit(1, AuditStatus::Completed, vec![1])];
        let index = ProcessedIndex::from_audits(&audits, None);
        assert!(index.is_warehouse_processed(&[zone(1)]));
        assert!(!index.is_warehouse_processed(&[zone(1), zone(2)]));
        assert!(!index.is_warehouse_processed(&[]));

        let options = index.zone_options(vec![zone(1), zone(2)]);
        assert!(options[0].disabled);
        assert!(!options[1].disabled);
    }
}
