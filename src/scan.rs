/**
 * The scan result (spec §6): the structured summary produced by a separate
 * scanner pass, consumed here as plain data. Nothing in this module parses
 * bytes — it's the catalog the scanner already built.
 */
use crate::common::{FormId, MainRecordHeader};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlacedReferenceScan {
    pub header: MainRecordHeader,
    pub base_form_id: FormId,
    pub position: Option<(f32, f32, f32)>,
    pub rotation: Option<(f32, f32, f32)>,
    pub scale: Option<f32>,
    pub enable_parent: Option<FormId>,
    pub is_marker: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TerrainScan {
    pub header: MainRecordHeader,
    pub worldspace_id: Option<FormId>,
    pub grid_x: i32,
    pub grid_y: i32,
    pub heightmap: Option<Vec<u8>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeEditorIdEntry {
    pub form_id: FormId,
    pub editor_id: String,
}

/// One entry from the captured runtime hash table (spec §6, §4.7).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeTableEntry {
    pub form_id: FormId,
    pub kind_code: u32,
    pub editor_id: Option<String>,
    pub tes_form_offset: u64,
    pub display_name: Option<String>,
}

/// The full catalog produced by the scanner (spec §6).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScanResult {
    /// Detected main record headers, grouped by kind tag text for convenient
    /// per-handler lookup.
    pub headers_by_kind: HashMap<String, Vec<MainRecordHeader>>,

    /// Subrecord markers of a few well-known tags the scanner can find cheaply
    /// without a full parse, keyed by the owning record's form-id.
    pub editor_id_subrecords: HashMap<FormId, String>,
    pub full_name_subrecords: HashMap<FormId, String>,

    pub placed_references: Vec<PlacedReferenceScan>,
    pub terrain_records: Vec<TerrainScan>,
    pub runtime_editor_ids: Vec<RuntimeEditorIdEntry>,
    pub runtime_table: Vec<RuntimeTableEntry>,

    /// GRUP-derived cell -> placed-ref map, present only when the scanner
    /// found file-mode group structure (spec §4.6, §6).
    pub cell_to_refs: Option<HashMap<FormId, Vec<FormId>>>,
    /// GRUP-derived topic -> line map (spec §4.8 step 1).
    pub topic_to_lines: Option<HashMap<FormId, Vec<FormId>>>,
    /// land-id -> worldspace-id map (spec §4.6 cell/heightmap linkage).
    pub land_to_worldspace: Option<HashMap<FormId, FormId>>,
}

impl ScanResult {
    pub fn headers_for(&self, kind_tag: &str) -> &[MainRecordHeader] {
        self.headers_by_kind
            .get(kind_tag)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    /// Headers for every tag in `kind_tags`, concatenated in scan order
    /// within each tag group (spec §4.6: "three parent tags map to one
    /// family" for leveled lists).
    pub fn headers_for_any(&self, kind_tags: &[&str]) -> Vec<MainRecordHeader> {
        kind_tags
            .iter()
            .flat_map(|tag| self.headers_for(tag).iter().cloned())
            .collect()
    }
}
