/**
 * World geometry: cell, worldspace, placed reference, terrain heightmap
 * (spec §3 "world", §4.6). Cell/worldspace linkage and virtual-cell synthesis
 * live in `xref::cell_world` since they need the full set of cells and
 * placed references at once; this module only builds each record's own
 * fields from its subrecords.
 */
use crate::accessor::{read_record_data, ByteAccessor};
use crate::common::{FormId, MainRecordHeader, Tag};
use crate::config::ReconConfig;
use crate::identifiers::IdentifierIndex;
use crate::kinds::common::{merge_option, note_common_subrecord, EntityCommon};
use crate::primitives::cstring_from_bytes;
use crate::scan::{PlacedReferenceScan, TerrainScan};
use crate::schema::SCHEMA;
use crate::subrecord::iter_subrecords;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cell {
    pub common: EntityCommon,
    pub full_name: Option<String>,
    pub flags: Option<u8>,
    pub grid: Option<(i32, i32)>,
    pub water_height: Option<f32>,
    pub encounter_zone: Option<FormId>,
    pub music: Option<FormId>,
    pub acoustic_space: Option<FormId>,
    pub image_space: Option<FormId>,
    /// Set by `xref::cell_world` once the owning worldspace is known; `None`
    /// for an interior cell or one that couldn't be linked.
    pub worldspace: Option<FormId>,
    /// Set by `xref::cell_world::link_cell_heightmaps` via the
    /// `(worldspace-id, gridX, gridY)` key, falling back to `(0, gridX,
    /// gridY)` for dump-mode inputs that never resolved a worldspace
    /// (spec §4.6).
    pub heightmap: Option<FormId>,
    /// `true` for a cell synthesized from orphan placed-references rather
    /// than parsed from a `CELL` record (spec §4.6 virtual cells).
    pub is_virtual: bool,
}

impl Cell {
    fn shallow(header: &MainRecordHeader) -> Self {
        Cell {
            common: EntityCommon::shallow(header.form_id, header.offset, header.is_big_endian),
            full_name: None,
            flags: None,
            grid: None,
            water_height: None,
            encounter_zone: None,
            music: None,
            acoustic_space: None,
            image_space: None,
            worldspace: None,
            heightmap: None,
            is_virtual: false,
        }
    }
}

pub fn reconstruct_cells(
    headers: &[MainRecordHeader],
    accessor: Option<&dyn ByteAccessor>,
    idx: &mut IdentifierIndex,
    cfg: &ReconConfig,
) -> Vec<Cell> {
    let parent = Tag::new(*b"CELL");
    headers
        .iter()
        .map(|header| {
            let mut cell = Cell::shallow(header);
            let Some(accessor) = accessor else { return cell };
            let Some(body) = read_record_data(accessor, header, cfg.buffer_size_for("CELL")) else {
                return cell;
            };
            let endian = header.endian();
            for sub in iter_subrecords(body.as_slice(), endian) {
                let data = &body.as_slice()[sub.data_offset..sub.data_offset + sub.data_len];
                let mut editor_id = cell.common.editor_id.clone();
                if note_common_subrecord(sub.tag, data, header.form_id, idx, &mut editor_id) {
                    cell.common.editor_id = editor_id;
                    continue;
                }
                match sub.tag.as_str() {
                    Some("FULL") => cell.full_name = Some(cstring_from_bytes(data)),
                    Some("DATA") => {
                        if let Some(decoded) = SCHEMA.decode(sub.tag, Some(parent), data, endian) {
                            cell.flags = decoded.get("flags").and_then(|v| v.as_u32()).map(|v| v as u8);
                        }
                    }
                    Some("XCLC") => {
                        if let Some(decoded) = SCHEMA.decode(sub.tag, Some(parent), data, endian) {
                            let x = decoded.get("grid_x").and_then(|v| v.as_u32()).map(|v| v as i32);
                            let y = decoded.get("grid_y").and_then(|v| v.as_u32()).map(|v| v as i32);
                            if let (Some(x), Some(y)) = (x, y) {
                                cell.grid = Some((x, y));
                            }
                        }
                    }
                    Some("XCLW") => {
                        if let Some(decoded) = SCHEMA.decode(sub.tag, Some(parent), data, endian) {
                            cell.water_height = decoded.get("water_height").and_then(|v| v.as_f32());
                        }
                    }
                    Some("XEZN") => {
                        if let Some(decoded) = SCHEMA.decode(sub.tag, Some(parent), data, endian) {
                            cell.encounter_zone = decoded.get("encounter_zone").and_then(|v| v.as_u32()).map(FormId);
                        }
                    }
                    Some("XCMO") => {
                        if let Some(decoded) = SCHEMA.decode(sub.tag, Some(parent), data, endian) {
                            cell.music = decoded.get("music").and_then(|v| v.as_u32()).map(FormId);
                        }
                    }
                    Some("XCAS") => {
                        if let Some(decoded) = SCHEMA.decode(sub.tag, Some(parent), data, endian) {
                            cell.acoustic_space = decoded.get("acoustic_space").and_then(|v| v.as_u32()).map(FormId);
                        }
                    }
                    Some("XCIS") => {
                        if let Some(decoded) = SCHEMA.decode(sub.tag, Some(parent), data, endian) {
                            cell.image_space = decoded.get("image_space").and_then(|v| v.as_u32()).map(FormId);
                        }
                    }
                    _ => {}
                }
            }
            cell
        })
        .collect()
}

pub fn enrich_cell_from_runtime(existing: &mut Cell, runtime: Cell) {
    existing.common.from_runtime = true;
    existing.full_name = merge_option(existing.full_name.take(), runtime.full_name);
    existing.flags = merge_option(existing.flags.take(), runtime.flags);
    existing.grid = merge_option(existing.grid.take(), runtime.grid);
    existing.water_height = merge_option(existing.water_height.take(), runtime.water_height);
    existing.encounter_zone = merge_option(existing.encounter_zone.take(), runtime.encounter_zone);
    existing.music = merge_option(existing.music.take(), runtime.music);
    existing.acoustic_space = merge_option(existing.acoustic_space.take(), runtime.acoustic_space);
    existing.image_space = merge_option(existing.image_space.take(), runtime.image_space);
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Worldspace {
    pub common: EntityCommon,
    pub full_name: Option<String>,
    /// Cell-grid bounding box (`XWCL`: min_x, min_y, max_x, max_y), preferred
    /// over `world_bounds` when both are present (spec §4.6).
    pub cell_range_bounds: Option<(i32, i32, i32, i32)>,
    /// World-unit bounding box (`NAM0` min corner, `NAM9` max corner).
    pub world_bounds: Option<(f32, f32, f32, f32)>,
}

impl Worldspace {
    /// The cell-grid bounding box to use for `InferCellWorldspaces`: the
    /// explicit cell range if present, otherwise one derived from the
    /// world-unit bounds at `cell_size_units` world units per cell.
    pub fn cell_grid_bounds(&self, cell_size_units: f32) -> Option<(i32, i32, i32, i32)> {
        if let Some(bounds) = self.cell_range_bounds {
            return Some(bounds);
        }
        let (min_x, min_y, max_x, max_y) = self.world_bounds?;
        Some((
            (min_x / cell_size_units).floor() as i32,
            (min_y / cell_size_units).floor() as i32,
            (max_x / cell_size_units).floor() as i32,
            (max_y / cell_size_units).floor() as i32,
        ))
    }
}

pub fn reconstruct_worldspaces(
    headers: &[MainRecordHeader],
    accessor: Option<&dyn ByteAccessor>,
    idx: &mut IdentifierIndex,
    cfg: &ReconConfig,
) -> Vec<Worldspace> {
    headers
        .iter()
        .map(|header| {
            let mut ws = Worldspace {
                common: EntityCommon::shallow(header.form_id, header.offset, header.is_big_endian),
                full_name: None,
                cell_range_bounds: None,
                world_bounds: None,
            };
            let Some(accessor) = accessor else { return ws };
            let Some(body) = read_record_data(accessor, header, cfg.buffer_size_for("WRLD")) else {
                return ws;
            };
            let endian = header.endian();
            let mut world_min: Option<(f32, f32)> = None;
            let mut world_max: Option<(f32, f32)> = None;
            for sub in iter_subrecords(body.as_slice(), endian) {
                let data = &body.as_slice()[sub.data_offset..sub.data_offset + sub.data_len];
                let mut editor_id = ws.common.editor_id.clone();
                if note_common_subrecord(sub.tag, data, header.form_id, idx, &mut editor_id) {
                    ws.common.editor_id = editor_id;
                    continue;
                }
                match sub.tag.as_str() {
                    Some("FULL") => ws.full_name = Some(cstring_from_bytes(data)),
                    Some("XWCL") if data.len() >= 16 => {
                        let min_x = crate::primitives::read_i32(data, 0, endian);
                        let min_y = crate::primitives::read_i32(data, 4, endian);
                        let max_x = crate::primitives::read_i32(data, 8, endian);
                        let max_y = crate::primitives::read_i32(data, 12, endian);
                        if let (Some(min_x), Some(min_y), Some(max_x), Some(max_y)) = (min_x, min_y, max_x, max_y) {
                            ws.cell_range_bounds = Some((min_x, min_y, max_x, max_y));
                        }
                    }
                    Some("NAM0") if data.len() >= 8 => {
                        let x = crate::primitives::read_f32(data, 0, endian);
                        let y = crate::primitives::read_f32(data, 4, endian);
                        if let (Some(x), Some(y)) = (x, y) {
                            world_min = Some((x, y));
                        }
                    }
                    Some("NAM9") if data.len() >= 8 => {
                        let x = crate::primitives::read_f32(data, 0, endian);
                        let y = crate::primitives::read_f32(data, 4, endian);
                        if let (Some(x), Some(y)) = (x, y) {
                            world_max = Some((x, y));
                        }
                    }
                    _ => {}
                }
            }
            if let (Some((min_x, min_y)), Some((max_x, max_y))) = (world_min, world_max) {
                ws.world_bounds = Some((min_x, min_y, max_x, max_y));
            }
            ws
        })
        .collect()
}

/// A placed reference: base object plus its world transform (spec §3,
/// `ACHR`/`ACRE`/`REFR`). Built straight from the scanner's own
/// `PlacedReferenceScan` entries rather than re-parsing, since the scanner
/// already extracted the transform cheaply during its catalog pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlacedReference {
    pub common: EntityCommon,
    pub base_form_id: FormId,
    pub position: Option<(f32, f32, f32)>,
    pub rotation: Option<(f32, f32, f32)>,
    pub scale: Option<f32>,
    pub enable_parent: Option<FormId>,
    pub is_marker: bool,
    /// Filled in by `xref::cell_world`: the owning cell, found via GRUP
    /// structure when present, otherwise the nearest-offset heuristic (spec
    /// §4.6, §9 Open Questions).
    pub cell: Option<FormId>,
}

pub fn reconstruct_placed_references(scans: &[PlacedReferenceScan]) -> Vec<PlacedReference> {
    scans
        .iter()
        .map(|scan| PlacedReference {
            common: EntityCommon::shallow(scan.header.form_id, scan.header.offset, scan.header.is_big_endian),
            base_form_id: scan.base_form_id,
            position: scan.position,
            rotation: scan.rotation,
            scale: scan.scale,
            enable_parent: scan.enable_parent,
            is_marker: scan.is_marker,
            cell: None,
        })
        .collect()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TerrainHeightmap {
    pub common: EntityCommon,
    pub worldspace_id: Option<FormId>,
    pub grid: (i32, i32),
    pub heightmap: Option<Vec<u8>>,
}

pub fn reconstruct_terrain(scans: &[TerrainScan]) -> Vec<TerrainHeightmap> {
    scans
        .iter()
        .map(|scan| TerrainHeightmap {
            common: EntityCommon::shallow(scan.header.form_id, scan.header.offset, scan.header.is_big_endian),
            worldspace_id: scan.worldspace_id,
            grid: (scan.grid_x, scan.grid_y),
            heightmap: scan.heightmap.clone(),
        })
        .collect()
}

/// Fills in a terrain record's heightmap blob from the runtime land-data
/// table when the image-side scan never carried one (spec §4.10 "enrich
/// terrain records with runtime coordinates"). A scan-only terrain record
/// already carries its best-guess grid coordinates; the runtime table only
/// ever supplements the blob for a record the image pass already found, it
/// never creates a new one (no grid coordinate travels with the runtime
/// land-data blob itself).
pub fn enrich_terrain_from_runtime(terrain: &mut [TerrainHeightmap], runtime_land_data: &[(FormId, Vec<u8>)]) {
    for (form_id, bytes) in runtime_land_data {
        if let Some(t) = terrain.iter_mut().find(|t| t.common.form_id == *form_id) {
            if t.heightmap.is_none() {
                t.heightmap = Some(bytes.clone());
                t.common.from_runtime = true;
            }
        }
    }
}

/// Weather and lighting template ride the common-tag path: spec §3 lists
/// them under "world" but gives no dedicated field detail beyond name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Weather {
    pub common: EntityCommon,
}

pub fn reconstruct_weather(
    headers: &[MainRecordHeader],
    accessor: Option<&dyn ByteAccessor>,
    idx: &mut IdentifierIndex,
    cfg: &ReconConfig,
) -> Vec<Weather> {
    headers
        .iter()
        .map(|header| {
            let mut weather = Weather {
                common: EntityCommon::shallow(header.form_id, header.offset, header.is_big_endian),
            };
            let Some(accessor) = accessor else { return weather };
            let Some(body) = read_record_data(accessor, header, cfg.buffer_size_for("WTHR")) else {
                return weather;
            };
            let endian = header.endian();
            let mut editor_id = None;
            for sub in iter_subrecords(body.as_slice(), endian) {
                let data = &body.as_slice()[sub.data_offset..sub.data_offset + sub.data_len];
                if note_common_subrecord(sub.tag, data, header.form_id, idx, &mut editor_id) {
                    weather.common.editor_id = editor_id.clone();
                }
            }
            weather
        })
        .collect()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LightingTemplate {
    pub common: EntityCommon,
}

pub fn reconstruct_lighting_templates(
    headers: &[MainRecordHeader],
    accessor: Option<&dyn ByteAccessor>,
    idx: &mut IdentifierIndex,
    cfg: &ReconConfig,
) -> Vec<LightingTemplate> {
    headers
        .iter()
        .map(|header| {
            let mut lit = LightingTemplate {
                common: EntityCommon::shallow(header.form_id, header.offset, header.is_big_endian),
            };
            let Some(accessor) = accessor else { return lit };
            let Some(body) = read_record_data(accessor, header, cfg.buffer_size_for("LGTM")) else {
                return lit;
            };
            let endian = header.endian();
            let mut editor_id = None;
            for sub in iter_subrecords(body.as_slice(), endian) {
                let data = &body.as_slice()[sub.data_offset..sub.data_offset + sub.data_len];
                if note_common_subrecord(sub.tag, data, header.form_id, idx, &mut editor_id) {
                    lit.common.editor_id = editor_id.clone();
                }
            }
            lit
        })
        .collect()
}

/// Navigation mesh ride the common-tag path too (spec §3 lists it under
/// "world" alongside weather/lighting template, with no dedicated field
/// detail): the scan result gives us a header and nothing this format
/// schematizes further, so the record carries only the common envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NavigationMesh {
    pub common: EntityCommon,
    pub parent_cell: Option<FormId>,
}

pub fn reconstruct_navigation_meshes(
    headers: &[MainRecordHeader],
    accessor: Option<&dyn ByteAccessor>,
    idx: &mut IdentifierIndex,
    cfg: &ReconConfig,
) -> Vec<NavigationMesh> {
    headers
        .iter()
        .map(|header| {
            let mut navm = NavigationMesh {
                common: EntityCommon::shallow(header.form_id, header.offset, header.is_big_endian),
                parent_cell: None,
            };
            let Some(accessor) = accessor else { return navm };
            let Some(body) = read_record_data(accessor, header, cfg.buffer_size_for("NAVM")) else {
                return navm;
            };
            let endian = header.endian();
            let mut editor_id = None;
            for sub in iter_subrecords(body.as_slice(), endian) {
                let data = &body.as_slice()[sub.data_offset..sub.data_offset + sub.data_len];
                if note_common_subrecord(sub.tag, data, header.form_id, idx, &mut editor_id) {
                    navm.common.editor_id = editor_id.clone();
                    continue;
                }
                if sub.tag.as_str() == Some("NVNM") {
                    navm.parent_cell = crate::primitives::read_u32(data, 0, endian).map(FormId);
                }
            }
            navm
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accessor::SliceAccessor;

    #[test]
    fn cell_grid_and_water_height_decode() {
        let mut body = Vec::new();
        body.extend_from_slice(b"XCLC");
        body.extend_from_slice(&8u16.to_be_bytes());
        body.extend_from_slice(&3i32.to_be_bytes());
        body.extend_from_slice(&(-4i32).to_be_bytes());
        body.extend_from_slice(b"XCLW");
        body.extend_from_slice(&4u16.to_be_bytes());
        body.extend_from_slice(&12.0f32.to_be_bytes());

        let mut wire = vec![0u8; 24];
        wire.extend_from_slice(&body);
        let accessor = SliceAccessor(&wire);
        let header = MainRecordHeader {
            kind: Tag::new(*b"CELL"),
            offset: 0,
            data_size: body.len() as u32,
            flags: 0,
            form_id: FormId(0x200),
            is_compressed: false,
            is_big_endian: true,
        };
        let mut idx = IdentifierIndex::new();
        let cfg = ReconConfig::default();
        let cells = reconstruct_cells(&[header], Some(&accessor), &mut idx, &cfg);
        assert_eq!(cells[0].grid, Some((3, -4)));
        assert_eq!(cells[0].water_height, Some(12.0));
    }

    #[test]
    fn cell_zone_music_acoustic_space_and_image_space_decode() {
        let mut body = Vec::new();
        body.extend_from_slice(b"XEZN");
        body.extend_from_slice(&4u16.to_be_bytes());
        body.extend_from_slice(&0x30u32.to_be_bytes());
        body.extend_from_slice(b"XCMO");
        body.extend_from_slice(&4u16.to_be_bytes());
        body.extend_from_slice(&0x31u32.to_be_bytes());
        body.extend_from_slice(b"XCAS");
        body.extend_from_slice(&4u16.to_be_bytes());
        body.extend_from_slice(&0x32u32.to_be_bytes());
        body.extend_from_slice(b"XCIS");
        body.extend_from_slice(&4u16.to_be_bytes());
        body.extend_from_slice(&0x33u32.to_be_bytes());

        let mut wire = vec![0u8; 24];
        wire.extend_from_slice(&body);
        let accessor = SliceAccessor(&wire);
        let header = MainRecordHeader {
            kind: Tag::new(*b"CELL"),
            offset: 0,
            data_size: body.len() as u32,
            flags: 0,
            form_id: FormId(0x201),
            is_compressed: false,
            is_big_endian: true,
        };
        let mut idx = IdentifierIndex::new();
        let cfg = ReconConfig::default();
        let cells = reconstruct_cells(&[header], Some(&accessor), &mut idx, &cfg);
        assert_eq!(cells[0].encounter_zone, Some(FormId(0x30)));
        assert_eq!(cells[0].music, Some(FormId(0x31)));
        assert_eq!(cells[0].acoustic_space, Some(FormId(0x32)));
        assert_eq!(cells[0].image_space, Some(FormId(0x33)));
    }

    #[test]
    fn terrain_enrichment_fills_missing_heightmap_but_not_existing_one() {
        let mut terrain = vec![
            TerrainHeightmap {
                common: EntityCommon::shallow(FormId(0x400), 0, true),
                worldspace_id: Some(FormId(1)),
                grid: (0, 0),
                heightmap: None,
            },
            TerrainHeightmap {
                common: EntityCommon::shallow(FormId(0x401), 0, true),
                worldspace_id: Some(FormId(1)),
                grid: (1, 0),
                heightmap: Some(vec![9, 9]),
            },
        ];
        let runtime_data = vec![(FormId(0x400), vec![1, 2, 3]), (FormId(0x401), vec![4, 5, 6])];
        enrich_terrain_from_runtime(&mut terrain, &runtime_data);
        assert_eq!(terrain[0].heightmap, Some(vec![1, 2, 3]));
        assert!(terrain[0].common.from_runtime);
        assert_eq!(terrain[1].heightmap, Some(vec![9, 9])); // image value kept
    }

    #[test]
    fn worldspace_prefers_explicit_cell_range_over_world_bounds() {
        let mut body = Vec::new();
        body.extend_from_slice(b"NAM0");
        body.extend_from_slice(&8u16.to_be_bytes());
        body.extend_from_slice(&0.0f32.to_be_bytes());
        body.extend_from_slice(&0.0f32.to_be_bytes());
        body.extend_from_slice(b"NAM9");
        body.extend_from_slice(&8u16.to_be_bytes());
        body.extend_from_slice(&8192.0f32.to_be_bytes());
        body.extend_from_slice(&8192.0f32.to_be_bytes());
        body.extend_from_slice(b"XWCL");
        body.extend_from_slice(&16u16.to_be_bytes());
        body.extend_from_slice(&1i32.to_be_bytes());
        body.extend_from_slice(&1i32.to_be_bytes());
        body.extend_from_slice(&5i32.to_be_bytes());
        body.extend_from_slice(&5i32.to_be_bytes());

        let mut wire = vec![0u8; 24];
        wire.extend_from_slice(&body);
        let accessor = SliceAccessor(&wire);
        let header = MainRecordHeader {
            kind: Tag::new(*b"WRLD"),
            offset: 0,
            data_size: body.len() as u32,
            flags: 0,
            form_id: FormId(0x300),
            is_compressed: false,
            is_big_endian: true,
        };
        let mut idx = IdentifierIndex::new();
        let cfg = ReconConfig::default();
        let worldspaces = reconstruct_worldspaces(&[header], Some(&accessor), &mut idx, &cfg);
        assert_eq!(worldspaces[0].world_bounds, Some((0.0, 0.0, 8192.0, 8192.0)));
        assert_eq!(worldspaces[0].cell_range_bounds, Some((1, 1, 5, 5)));
        assert_eq!(worldspaces[0].cell_grid_bounds(4096.0), Some((1, 1, 5, 5)));
    }

    #[test]
    fn worldspace_derives_cell_bounds_from_world_bounds_when_no_cell_range() {
        let mut body = Vec::new();
        body.extend_from_slice(b"NAM0");
        body.extend_from_slice(&8u16.to_be_bytes());
        body.extend_from_slice(&0.0f32.to_be_bytes());
        body.extend_from_slice(&0.0f32.to_be_bytes());
        body.extend_from_slice(b"NAM9");
        body.extend_from_slice(&8u16.to_be_bytes());
        body.extend_from_slice(&8192.0f32.to_be_bytes());
        body.extend_from_slice(&4096.0f32.to_be_bytes());

        let mut wire = vec![0u8; 24];
        wire.extend_from_slice(&body);
        let accessor = SliceAccessor(&wire);
        let header = MainRecordHeader {
            kind: Tag::new(*b"WRLD"),
            offset: 0,
            data_size: body.len() as u32,
            flags: 0,
            form_id: FormId(0x301),
            is_compressed: false,
            is_big_endian: true,
        };
        let mut idx = IdentifierIndex::new();
        let cfg = ReconConfig::default();
        let worldspaces = reconstruct_worldspaces(&[header], Some(&accessor), &mut idx, &cfg);
        assert_eq!(worldspaces[0].cell_range_bounds, None);
        assert_eq!(worldspaces[0].cell_grid_bounds(4096.0), Some((0, 0, 2, 1)));
    }
}
