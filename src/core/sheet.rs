//! 盤點表：匯出給現場人員填寫的 CSV，以及讀回填好的 CSV

use crate::core::working_set::WorkingSet;
use crate::domain::model::{
    AuditId, AuditLine, ContainerId, LineKey, NomenclatureId, WarehouseId, ZoneId,
};
use crate::utils::error::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::Write;
use zip::write::{FileOptions, ZipWriter};

pub const MANIFEST_FILE: &str = "manifest.json";

/// 盤點表的一列
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SheetRow {
    pub zone_id: ZoneId,
    pub nomenclature_id: NomenclatureId,
    pub container_id: Option<ContainerId>,
    pub article: Option<String>,
    pub name: String,
    pub unit: Option<String>,
    pub expected: f64,
    /// 保留原始文字，套用時才正規化（允許 `12,5`）
    pub actual: String,
}

impl From<&AuditLine> for SheetRow {
    fn from(line: &AuditLine) -> Self {
        Self {
            zone_id: line.zone_id,
            nomenclature_id: line.nomenclature_id,
            container_id: line.container_id,
            article: line.article.clone(),
            name: line.name.clone(),
            unit: line.unit.clone(),
            expected: line.expected_quantity,
            actual: line.actual_quantity.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CountEntry {
    pub nomenclature_id: NomenclatureId,
    pub container_id: Option<ContainerId>,
    pub zone_id: ZoneId,
    pub actual: String,
}

impl CountEntry {
    pub fn new(key: LineKey, actual: &str) -> Self {
        Self {
            nomenclature_id: key.nomenclature_id,
            container_id: key.container_id,
            zone_id: key.zone_id,
            actual: actual.to_string(),
        }
    }

    pub fn key(&self) -> LineKey {
        LineKey::new(self.nomenclature_id, self.container_id, self.zone_id)
    }
}

impl From<SheetRow> for CountEntry {
    fn from(row: SheetRow) -> Self {
        Self {
            nomenclature_id: row.nomenclature_id,
            container_id: row.container_id,
            zone_id: row.zone_id,
            actual: row.actual,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BundleManifest {
    pub audit_id: AuditId,
    pub warehouse_id: WarehouseId,
    pub zone_ids: Vec<ZoneId>,
    pub lines: usize,
    pub exported_at: DateTime<Utc>,
}

pub fn write_sheet<'a>(lines: impl IntoIterator<Item = &'a AuditLine>) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    for line in lines {
        writer.serialize(SheetRow::from(line))?;
    }
    let data = writer.into_inner().map_err(|e| e.into_error())?;
    String::from_utf8(data).map_err(|e| crate::utils::error::StocktakeError::ProcessingError {
        message: format!("Count sheet is not valid UTF-8: {}", e),
    })
}

pub fn read_sheet(data: &[u8]) -> Result<Vec<CountEntry>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::Headers)
        .from_reader(data);
    let mut entries = Vec::new();
    for row in reader.deserialize::<SheetRow>() {
        entries.push(CountEntry::from(row?));
    }
    tracing::debug!("📄 Read {} rows from count sheet", entries.len());
    Ok(entries)
}

pub fn zone_file_name(zone_id: ZoneId) -> String {
    format!("zone_{}.csv", zone_id)
}

/// 每個區域一張 CSV，加上 manifest.json
pub fn bundle(audit_id: AuditId, warehouse_id: WarehouseId, working: &WorkingSet) -> Result<Vec<u8>> {
    let mut by_zone: BTreeMap<ZoneId, Vec<&AuditLine>> = BTreeMap::new();
    for zone_id in working.loaded_zones() {
        by_zone.entry(zone_id).or_default();
    }
    for line in working.lines() {
        by_zone.entry(line.zone_id).or_default().push(line);
    }

    let manifest = BundleManifest {
        audit_id,
        warehouse_id,
        zone_ids: by_zone.keys().copied().collect(),
        lines: working.len(),
        exported_at: Utc::now(),
    };

    let mut zip = ZipWriter::new(std::io::Cursor::new(Vec::new()));

    for (zone_id, lines) in &by_zone {
        let sheet = write_sheet(lines.iter().copied())?;
        zip.start_file::<_, ()>(zone_file_name(*zone_id), FileOptions::default())?;
        zip.write_all(sheet.as_bytes())?;
    }

    zip.start_file::<_, ()>(MANIFEST_FILE, FileOptions::default())?;
    zip.write_all(serde_json::to_string_pretty(&manifest)?.as_bytes())?;

    let cursor = zip.finish()?;
    tracing::debug!("🗜️ Bundled {} zone sheets for audit {}", by_zone.len(), audit_id);
    Ok(cursor.into_inner())
}
