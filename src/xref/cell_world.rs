/**
 * Cell/worldspace/placed-reference linking (spec §4.6, §4.8).
 *
 * Four passes, each falling back to the next when its input is missing:
 *
 * 1. `infer_cell_worldspaces` — point-in-box test against each worldspace's
 *    cell-grid bounding box (preferring an explicit cell range over one
 *    derived from world-unit bounds), largest-area worldspace breaking ties;
 *    with no bounds data at all, every exterior cell goes to the first
 *    worldspace.
 * 2. `link_cells_to_worldspaces` — match each exterior cell's grid
 *    coordinate against the terrain heightmap that shares it; the
 *    heightmap already carries its owning worldspace. Runs after step 1 and
 *    only fills cells step 1 left unset.
 * 3. `enrich_placed_references` — resolve each placed reference's owning
 *    cell: the scanner's GRUP-derived map when present, otherwise the
 *    nearest cell by byte offset within `cell_ref_proximity_window` (spec
 *    §9: "a heuristic, no confidence score").
 * 4. virtual cells — placed references nothing in step 3 could place are
 *    grouped by `(floor(x/4096), floor(y/4096))` world grid and each distinct
 *    grid cell becomes one synthetic `Cell` (spec §4.6, §8 Scenario F),
 *    starting at form-id `0xFF00_0001` and counting up, editor-id
 *    `"[Virtual X,Y]"`.
 */
use crate::common::FormId;
use crate::config::ReconConfig;
use crate::kinds::world::{Cell, PlacedReference, TerrainHeightmap, Worldspace};
use std::collections::HashMap;

const FIRST_VIRTUAL_CELL_FORM_ID: u32 = 0xFF00_0001;

/// Assigns each exterior cell without an explicit worldspace link to the
/// worldspace whose cell-grid bounding box contains it (spec §4.6). Ties —
/// and cells when no worldspace carries any bounds data at all — go to the
/// largest-area worldspace, or simply the first one if none has bounds.
pub fn infer_cell_worldspaces(cells: &mut [Cell], worldspaces: &[Worldspace], cfg: &ReconConfig) {
    if worldspaces.is_empty() {
        return;
    }
    let boxes: Vec<(FormId, Option<(i32, i32, i32, i32)>)> = worldspaces
        .iter()
        .map(|ws| (ws.common.form_id, ws.cell_grid_bounds(cfg.cell_size_units)))
        .collect();
    let any_bounds = boxes.iter().any(|(_, b)| b.is_some());

    for cell in cells.iter_mut() {
        if cell.worldspace.is_some() || cell.is_virtual {
            continue;
        }
        let Some((x, y)) = cell.grid else { continue };

        if !any_bounds {
            cell.worldspace = Some(boxes[0].0);
            continue;
        }

        let mut best: Option<(FormId, i64)> = None;
        for (form_id, bounds) in &boxes {
            let Some((min_x, min_y, max_x, max_y)) = bounds else { continue };
            if x < *min_x || x > *max_x || y < *min_y || y > *max_y {
                continue;
            }
            let area = (*max_x as i64 - *min_x as i64 + 1) * (*max_y as i64 - *min_y as i64 + 1);
            if best.map(|(_, best_area)| area > best_area).unwrap_or(true) {
                best = Some((*form_id, area));
            }
        }
        if let Some((form_id, _)) = best {
            cell.worldspace = Some(form_id);
        }
    }
}

pub fn link_cells_to_worldspaces(cells: &mut [Cell], terrain: &[TerrainHeightmap]) {
    let by_grid: HashMap<(i32, i32), FormId> = terrain
        .iter()
        .filter_map(|t| t.worldspace_id.map(|ws| (t.grid, ws)))
        .collect();
    for cell in cells.iter_mut() {
        if cell.worldspace.is_some() {
            continue;
        }
        if let Some(grid) = cell.grid {
            if let Some(&ws) = by_grid.get(&grid) {
                cell.worldspace = Some(ws);
            }
        }
    }
}

/// Resolves each exterior cell's terrain heightmap via the
/// `(worldspace-id, gridX, gridY)` key, falling back to `(0, gridX, gridY)`
/// to cover dump-mode inputs whose cell never resolved a worldspace (spec
/// §4.6 "Cell"). Must run after `link_cells_to_worldspaces`/
/// `infer_cell_worldspaces` so the keyed lookup has the best worldspace
/// guess available.
pub fn link_cell_heightmaps(cells: &mut [Cell], terrain: &[TerrainHeightmap]) {
    let by_key: HashMap<(FormId, i32, i32), FormId> = terrain
        .iter()
        .map(|t| ((t.worldspace_id.unwrap_or(FormId::NONE), t.grid.0, t.grid.1), t.common.form_id))
        .collect();
    for cell in cells.iter_mut() {
        if cell.heightmap.is_some() {
            continue;
        }
        let Some((x, y)) = cell.grid else { continue };
        let key = (cell.worldspace.unwrap_or(FormId::NONE), x, y);
        if let Some(&form_id) = by_key.get(&key) {
            cell.heightmap = Some(form_id);
            continue;
        }
        if let Some(&form_id) = by_key.get(&(FormId::NONE, x, y)) {
            cell.heightmap = Some(form_id);
        }
    }
}

/// Resolves each placed reference's owning cell and, for any reference that
/// resolves to no cell at all, synthesizes one. Returns the virtual cells
/// created so the caller can append them to the result's cell list alongside
/// the parsed ones.
pub fn enrich_placed_references(
    placed_refs: &mut [PlacedReference],
    cells: &[Cell],
    cell_to_refs: Option<&HashMap<FormId, Vec<FormId>>>,
    cfg: &ReconConfig,
) -> Vec<Cell> {
    let mut ref_to_cell: HashMap<FormId, FormId> = HashMap::new();
    if let Some(map) = cell_to_refs {
        for (cell_id, refs) in map {
            for r in refs {
                ref_to_cell.insert(*r, *cell_id);
            }
        }
    }

    let mut cells_by_offset: Vec<(u64, FormId)> = cells.iter().map(|c| (c.common.offset, c.common.form_id)).collect();
    cells_by_offset.sort_by_key(|&(offset, _)| offset);

    // Orphans are grouped by world grid and synthesized once the whole batch
    // is known, so three references sharing a grid cell produce one virtual
    // cell, not three (spec §8 Scenario F).
    let mut orphans_by_grid: HashMap<(i32, i32), Vec<usize>> = HashMap::new();

    for (i, placed) in placed_refs.iter_mut().enumerate() {
        if let Some(&cell_id) = ref_to_cell.get(&placed.common.form_id) {
            placed.cell = Some(cell_id);
            continue;
        }
        if let Some(cell_id) = nearest_cell_within_window(placed.common.offset, &cells_by_offset, cfg.cell_ref_proximity_window) {
            placed.cell = Some(cell_id);
            continue;
        }
        // A position at (or near) the origin is a sentinel for "not set",
        // not a real world position (spec §8 boundary behavior): it is not
        // an orphan candidate and is left with no cell.
        let Some((x, y, _)) = placed.position else { continue };
        if x.abs() <= 1.0 && y.abs() <= 1.0 {
            continue;
        }
        let grid = (
            (x / cfg.cell_size_units).floor() as i32,
            (y / cfg.cell_size_units).floor() as i32,
        );
        orphans_by_grid.entry(grid).or_default().push(i);
    }

    let mut next_virtual_id = FIRST_VIRTUAL_CELL_FORM_ID;
    let mut virtual_cells = Vec::new();
    let mut grids: Vec<(i32, i32)> = orphans_by_grid.keys().copied().collect();
    grids.sort();

    for grid in grids {
        let indices = &orphans_by_grid[&grid];
        let virtual_id = FormId(next_virtual_id);
        next_virtual_id += 1;
        for &i in indices {
            placed_refs[i].cell = Some(virtual_id);
        }
        let offset = indices.iter().map(|&i| placed_refs[i].common.offset).min().unwrap_or(0);
        let is_big_endian = indices.first().map(|&i| placed_refs[i].common.is_big_endian).unwrap_or(true);
        virtual_cells.push(Cell {
            common: crate::kinds::common::EntityCommon {
                form_id: virtual_id,
                editor_id: Some(format!("[Virtual {},{}]", grid.0, grid.1)),
                offset,
                is_big_endian,
                from_runtime: false,
            },
            full_name: None,
            flags: None,
            grid: Some(grid),
            water_height: None,
            encounter_zone: None,
            music: None,
            acoustic_space: None,
            image_space: None,
            worldspace: None,
            heightmap: None,
            is_virtual: true,
        });
    }

    virtual_cells
}

fn nearest_cell_within_window(offset: u64, cells_by_offset: &[(u64, FormId)], window: u64) -> Option<FormId> {
    cells_by_offset
        .iter()
        .filter(|&&(cell_offset, _)| cell_offset.abs_diff(offset) <= window)
        .min_by_key(|&&(cell_offset, _)| cell_offset.abs_diff(offset))
        .map(|&(_, form_id)| form_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kinds::common::EntityCommon;

    fn cell(form_id: u32, offset: u64) -> Cell {
        Cell {
            common: EntityCommon::shallow(FormId(form_id), offset, true),
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

    fn placed(form_id: u32, offset: u64) -> PlacedReference {
        placed_at(form_id, offset, None)
    }

    fn placed_at(form_id: u32, offset: u64, position: Option<(f32, f32, f32)>) -> PlacedReference {
        PlacedReference {
            common: EntityCommon::shallow(FormId(form_id), offset, true),
            base_form_id: FormId(1),
            position,
            rotation: None,
            scale: None,
            enable_parent: None,
            is_marker: false,
            cell: None,
        }
    }

    #[test]
    fn scenario_f_virtual_cells_group_by_grid() {
        let cells: Vec<Cell> = Vec::new();
        let mut placed_refs = vec![
            placed_at(0x21, 1, Some((5000.0, 5000.0, 0.0))),
            placed_at(0x22, 2, Some((5100.0, 5050.0, 0.0))),
            placed_at(0x23, 3, Some((-3000.0, 1000.0, 0.0))),
        ];
        let cfg = ReconConfig::default();
        let virtual_cells = enrich_placed_references(&mut placed_refs, &cells, None, &cfg);
        assert_eq!(virtual_cells.len(), 2);

        let editor_ids: Vec<&str> = virtual_cells.iter().filter_map(|c| c.common.editor_id.as_deref()).collect();
        assert!(editor_ids.contains(&"[Virtual 1,1]"));
        assert!(editor_ids.contains(&"[Virtual -1,0]"));

        let form_ids: Vec<u32> = virtual_cells.iter().map(|c| c.common.form_id.0).collect();
        assert!(form_ids.contains(&0xFF00_0001));
        assert!(form_ids.contains(&0xFF00_0002));

        // the two references sharing a grid cell share the same synthetic cell
        assert_eq!(placed_refs[0].cell, placed_refs[1].cell);
        assert_ne!(placed_refs[0].cell, placed_refs[2].cell);
    }

    #[test]
    fn zero_position_is_not_an_orphan_candidate() {
        let cells: Vec<Cell> = Vec::new();
        let mut placed_refs = vec![placed_at(0x24, 1, Some((0.0, 0.0, 0.0)))];
        let cfg = ReconConfig::default();
        let virtual_cells = enrich_placed_references(&mut placed_refs, &cells, None, &cfg);
        assert!(virtual_cells.is_empty());
        assert_eq!(placed_refs[0].cell, None);
    }

    #[test]
    fn proximity_window_finds_nearest_cell() {
        let cells = vec![cell(0x10, 1000), cell(0x11, 2000)];
        let mut placed_refs = vec![placed(0x20, 1050)];
        let cfg = ReconConfig {
            cell_ref_proximity_window: 500,
            ..ReconConfig::default()
        };
        let virtual_cells = enrich_placed_references(&mut placed_refs, &cells, None, &cfg);
        assert!(virtual_cells.is_empty());
        assert_eq!(placed_refs[0].cell, Some(FormId(0x10)));
    }

    fn worldspace_with_cell_bounds(form_id: u32, bounds: (i32, i32, i32, i32)) -> Worldspace {
        Worldspace {
            common: EntityCommon::shallow(FormId(form_id), 0, true),
            full_name: None,
            cell_range_bounds: Some(bounds),
            world_bounds: None,
        }
    }

    fn cell_with_grid(form_id: u32, grid: (i32, i32)) -> Cell {
        let mut c = cell(form_id, 0);
        c.grid = Some(grid);
        c
    }

    #[test]
    fn infer_assigns_exterior_cell_by_point_in_box() {
        let worldspaces = vec![
            worldspace_with_cell_bounds(0x50, (0, 0, 10, 10)),
            worldspace_with_cell_bounds(0x60, (20, 20, 30, 30)),
        ];
        let mut cells = vec![cell_with_grid(0x70, (5, 5)), cell_with_grid(0x71, (25, 25))];
        infer_cell_worldspaces(&mut cells, &worldspaces, &ReconConfig::default());
        assert_eq!(cells[0].worldspace, Some(FormId(0x50)));
        assert_eq!(cells[1].worldspace, Some(FormId(0x60)));
    }

    fn terrain(form_id: u32, worldspace: Option<u32>, grid: (i32, i32)) -> TerrainHeightmap {
        TerrainHeightmap {
            common: EntityCommon::shallow(FormId(form_id), 0, true),
            worldspace_id: worldspace.map(FormId),
            grid,
            heightmap: None,
        }
    }

    #[test]
    fn heightmap_resolves_by_worldspace_and_grid() {
        let terrain_records = vec![terrain(0x900, Some(0x50), (5, 5))];
        let mut cells = vec![cell_with_grid(0x70, (5, 5))];
        cells[0].worldspace = Some(FormId(0x50));
        link_cell_heightmaps(&mut cells, &terrain_records);
        assert_eq!(cells[0].heightmap, Some(FormId(0x900)));
    }

    #[test]
    fn heightmap_falls_back_to_worldspace_zero_for_dump_mode() {
        let terrain_records = vec![terrain(0x901, None, (7, 7))];
        let mut cells = vec![cell_with_grid(0x71, (7, 7))];
        // no worldspace resolved, as is typical for a memory-dump input
        link_cell_heightmaps(&mut cells, &terrain_records);
        assert_eq!(cells[0].heightmap, Some(FormId(0x901)));
    }

    #[test]
    fn infer_breaks_overlap_tie_with_largest_area() {
        let worldspaces = vec![
            worldspace_with_cell_bounds(0x50, (0, 0, 100, 100)),
            worldspace_with_cell_bounds(0x60, (0, 0, 5, 5)),
        ];
        let mut cells = vec![cell_with_grid(0x70, (2, 2))];
        infer_cell_worldspaces(&mut cells, &worldspaces, &ReconConfig::default());
        assert_eq!(cells[0].worldspace, Some(FormId(0x50)));
    }

    #[test]
    fn infer_falls_back_to_first_worldspace_with_no_bounds_data() {
        let worldspaces = vec![
            Worldspace {
                common: EntityCommon::shallow(FormId(0x50), 0, true),
                full_name: None,
                cell_range_bounds: None,
                world_bounds: None,
            },
            Worldspace {
                common: EntityCommon::shallow(FormId(0x60), 0, true),
                full_name: None,
                cell_range_bounds: None,
                world_bounds: None,
            },
        ];
        let mut cells = vec![cell_with_grid(0x70, (5, 5))];
        infer_cell_worldspaces(&mut cells, &worldspaces, &ReconConfig::default());
        assert_eq!(cells[0].worldspace, Some(FormId(0x50)));
    }

    #[test]
    fn grup_map_takes_priority_over_proximity() {
        let cells = vec![cell(0x10, 1000)];
        let mut placed_refs = vec![placed(0x20, 1000)];
        let mut map = HashMap::new();
        map.insert(FormId(0x10), vec![FormId(0x20)]);
        let cfg = ReconConfig::default();
        let virtual_cells = enrich_placed_references(&mut placed_refs, &cells, Some(&map), &cfg);
        assert!(virtual_cells.is_empty());
        assert_eq!(placed_refs[0].cell, Some(FormId(0x10)));
    }
}
