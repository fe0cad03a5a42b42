/**
 * Orchestrator (component C10, spec §4.10): the fixed sequence that turns a
 * scan result into a `SemanticReconstructionResult`. Single entry point,
 * single-threaded throughout (spec §5) — every phase below runs to
 * completion before the next starts, with `tracing::instrument` spans
 * marking phase boundaries the way the teacher's `main.rs` instruments its
 * own request handlers.
 */
use crate::accessor::ByteAccessor;
use crate::common::Endian;
use crate::config::ReconConfig;
use crate::identifiers::IdentifierIndex;
use crate::kinds::{self, generic};
use crate::merge;
use crate::result::SemanticReconstructionResult;
use crate::runtime::RuntimeReader;
use crate::scan::ScanResult;
use crate::script::{Decompiler, Script};
use crate::xref::{cell_world, dialogue, object_script};
use anyhow::Result;

pub fn reconstruct_all(
    scan: &ScanResult,
    accessor: Option<&dyn ByteAccessor>,
    reader: Option<&dyn RuntimeReader>,
    cfg: &ReconConfig,
) -> Result<SemanticReconstructionResult> {
    let mut idx = build_identifier_index(scan)?;
    let mut result = SemanticReconstructionResult::default();

    parse_image_records(scan, accessor, &mut idx, cfg, &mut result);

    if let Some(reader) = reader {
        kinds::world::enrich_terrain_from_runtime(&mut result.terrain, &reader.read_all_runtime_land_data());
        merge_runtime_records(scan, reader, &mut idx, &mut result);
    }

    kinds::items::enrich_ammunition_from_weapons(&mut result.ammunition, &result.weapons, &result.projectiles);

    result.dialogue_topics = kinds::text::merge_split_dialogue_topics(std::mem::take(&mut result.dialogue_topics));
    result.dialogue_lines = kinds::text::merge_split_dialogue_lines(std::mem::take(&mut result.dialogue_lines));

    decompile_scripts(&mut result.scripts);

    build_cross_references(scan, reader, cfg, &idx, &mut result);

    collect_unmodeled(scan, accessor, &mut idx, cfg, &mut result);

    result.total_records_processed = count_total(&result);
    result.identifiers = idx;

    Ok(result)
}

#[tracing::instrument(skip_all)]
fn build_identifier_index(scan: &ScanResult) -> Result<IdentifierIndex> {
    let mut idx = IdentifierIndex::with_builtin_identifiers();
    for (form_id, editor_id) in &scan.editor_id_subrecords {
        idx.try_add_editor_id(*form_id, editor_id.clone());
    }
    for (form_id, display_name) in &scan.full_name_subrecords {
        idx.try_add_display_name(*form_id, display_name.clone());
    }
    for entry in &scan.runtime_editor_ids {
        idx.try_add_editor_id(entry.form_id, entry.editor_id.clone());
    }
    Ok(idx)
}

#[tracing::instrument(skip_all)]
fn parse_image_records(
    scan: &ScanResult,
    accessor: Option<&dyn ByteAccessor>,
    idx: &mut IdentifierIndex,
    cfg: &ReconConfig,
    result: &mut SemanticReconstructionResult,
) {
    use kinds::abilities::*;
    use kinds::actors::*;
    use kinds::data::*;
    use kinds::items::*;
    use kinds::scenery::*;
    use kinds::text::*;
    use kinds::world::*;

    result.npcs = reconstruct_npcs(scan.headers_for("NPC_"), accessor, idx, cfg);
    result.creatures = reconstruct_creatures(scan.headers_for("CREA"), accessor, idx, cfg);
    result.races = reconstruct_races(scan.headers_for("RACE"), accessor, idx, cfg);
    result.factions = reconstruct_factions(scan.headers_for("FACT"), accessor, idx, cfg);

    result.weapons = reconstruct_weapons(scan.headers_for("WEAP"), accessor, idx, cfg);
    result.ammunition = reconstruct_ammunition(scan.headers_for("AMMO"), accessor, idx, cfg);
    result.armor = reconstruct_armor(scan.headers_for("ARMO"), accessor, idx, cfg);
    result.consumables = reconstruct_consumables(scan.headers_for("ALCH"), accessor, idx, cfg);
    result.misc_items = reconstruct_misc_items(scan.headers_for("MISC"), accessor, idx, cfg);
    result.keys = reconstruct_keys(scan.headers_for("KEYM"), accessor, idx, cfg);
    result.containers = reconstruct_containers(scan.headers_for("CONT"), accessor, idx, cfg);

    result.cells = reconstruct_cells(scan.headers_for("CELL"), accessor, idx, cfg);
    result.worldspaces = reconstruct_worldspaces(scan.headers_for("WRLD"), accessor, idx, cfg);
    result.placed_references = reconstruct_placed_references(&scan.placed_references);
    result.terrain = reconstruct_terrain(&scan.terrain_records);
    result.weather = reconstruct_weather(scan.headers_for("WTHR"), accessor, idx, cfg);
    result.lighting_templates = reconstruct_lighting_templates(scan.headers_for("LGTM"), accessor, idx, cfg);
    result.navigation_meshes = reconstruct_navigation_meshes(scan.headers_for("NAVM"), accessor, idx, cfg);

    result.perks = reconstruct_perks(scan.headers_for("PERK"), accessor, idx, cfg);
    result.spells = reconstruct_spells(scan.headers_for("SPEL"), accessor, idx, cfg);
    result.base_effects = reconstruct_base_effects(scan.headers_for("MGEF"), accessor, idx, cfg);
    result.enchantments = reconstruct_enchantments(scan.headers_for("ENCH"), accessor, idx, cfg);
    result.projectiles = reconstruct_projectiles(scan.headers_for("PROJ"), accessor, idx, cfg);
    result.explosions = reconstruct_explosions(scan.headers_for("EXPL"), accessor, idx, cfg);

    result.globals = reconstruct_globals(scan.headers_for("GLOB"), accessor, idx, cfg);
    result.game_settings = reconstruct_game_settings(scan.headers_for("GMST"), accessor, idx, cfg);
    let leveled_list_headers = scan.headers_for_any(kinds::LEVELED_LIST_KIND_TAGS);
    result.leveled_lists = reconstruct_leveled_lists(&leveled_list_headers, accessor, idx, cfg);
    result.classes = reconstruct_classes(scan.headers_for("CLAS"), accessor, idx, cfg);
    result.challenges = reconstruct_challenges(scan.headers_for("CHAL"), accessor, idx, cfg);
    result.reputations = reconstruct_reputations(scan.headers_for("REPU"), accessor, idx, cfg);
    result.recipes = reconstruct_recipes(scan.headers_for("RCPE"), accessor, idx, cfg);
    result.weapon_mods = reconstruct_weapon_mods(scan.headers_for("WMOD"), accessor, idx, cfg);
    result.packages = reconstruct_packages(scan.headers_for("PACK"), accessor, idx, cfg);

    result.statics = reconstruct_statics(scan.headers_for("STAT"), accessor, idx, cfg);
    result.sounds = reconstruct_sounds(scan.headers_for("SOUN"), accessor, idx, cfg);
    result.texture_sets = reconstruct_texture_sets(scan.headers_for("TXST"), accessor, idx, cfg);
    result.armor_addons = reconstruct_armor_addons(scan.headers_for("ARMA"), accessor, idx, cfg);
    result.actor_value_infos = reconstruct_actor_value_infos(scan.headers_for("AVIF"), accessor, idx, cfg);
    result.waters = reconstruct_waters(scan.headers_for("WATR"), accessor, idx, cfg);
    result.body_part_data = reconstruct_body_part_data(scan.headers_for("BPTD"), accessor, idx, cfg);
    result.combat_styles = reconstruct_combat_styles(scan.headers_for("CSTY"), accessor, idx, cfg);
    result.doors = reconstruct_doors(scan.headers_for("DOOR"), accessor, idx, cfg);
    result.activators = reconstruct_activators(scan.headers_for("ACTI"), accessor, idx, cfg);
    result.furniture = reconstruct_furniture(scan.headers_for("FURN"), accessor, idx, cfg);
    result.lights = reconstruct_lights(scan.headers_for("LIGH"), accessor, idx, cfg);

    result.books = reconstruct_books(scan.headers_for("BOOK"), accessor, idx, cfg);
    result.notes = reconstruct_notes(scan.headers_for("NOTE"), accessor, idx, cfg);
    result.terminals = reconstruct_terminals(scan.headers_for("TERM"), accessor, idx, cfg);
    result.messages = reconstruct_messages(scan.headers_for("MESG"), accessor, idx, cfg);
    result.quests = reconstruct_quests(scan.headers_for("QUST"), accessor, idx, cfg);
    result.dialogue_topics = reconstruct_dialogue_topics(scan.headers_for("DIAL"), accessor, idx, cfg);
    result.dialogue_lines = reconstruct_dialogue_lines(scan.headers_for("INFO"), accessor, idx, cfg);
    result.scripts = crate::script::reconstruct_scripts(scan.headers_for("SCPT"), accessor, idx, cfg);
}

#[tracing::instrument(skip_all)]
fn merge_runtime_records(
    scan: &ScanResult,
    reader: &dyn RuntimeReader,
    idx: &mut IdentifierIndex,
    result: &mut SemanticReconstructionResult,
) {
    merge::merge_npcs(&mut result.npcs, &scan.runtime_table, idx, reader);
    merge::merge_creatures(&mut result.creatures, &scan.runtime_table, idx, reader);
    merge::merge_weapons(&mut result.weapons, &scan.runtime_table, idx, reader);
    merge::merge_containers(&mut result.containers, &scan.runtime_table, idx, reader);
    merge::merge_doors(&mut result.doors, &scan.runtime_table, idx, reader);
    merge::merge_packages(&mut result.packages, &scan.runtime_table, idx, reader);
    merge::merge_dialogue_topics(&mut result.dialogue_topics, &scan.runtime_table, idx, reader);
    merge::merge_dialogue_lines(&mut result.dialogue_lines, &scan.runtime_table, idx, reader);
    merge::merge_scripts(&mut result.scripts, &scan.runtime_table, idx, reader);

    for projectile in result.projectiles.iter_mut() {
        if let Some(entry) = scan
            .runtime_table
            .iter()
            .find(|e| e.form_id == projectile.common.form_id)
        {
            if let Some(physics) = reader.read_projectile_physics(entry) {
                kinds::abilities::apply_runtime_physics(projectile, physics);
            }
        }
    }
}

#[tracing::instrument(skip_all)]
fn decompile_scripts(scripts: &mut [Script]) {
    for script in scripts.iter_mut() {
        let Some(bytecode) = &script.compiled_data else {
            continue;
        };
        let endian = if script.common.from_runtime {
            Endian::Big
        } else {
            Endian::from_is_big(script.common.is_big_endian)
        };
        script.decompiled = Some(match Decompiler::decompile(bytecode, endian, &script.variables) {
            Ok(text) => text,
            Err(err) => format!("; Decompilation failed: {}", err),
        });
    }
}

#[tracing::instrument(skip_all)]
fn build_cross_references(
    scan: &ScanResult,
    reader: Option<&dyn RuntimeReader>,
    cfg: &ReconConfig,
    idx: &IdentifierIndex,
    result: &mut SemanticReconstructionResult,
) {
    cell_world::infer_cell_worldspaces(&mut result.cells, &result.worldspaces, cfg);
    cell_world::link_cells_to_worldspaces(&mut result.cells, &result.terrain);
    cell_world::link_cell_heightmaps(&mut result.cells, &result.terrain);
    let virtual_cells = cell_world::enrich_placed_references(
        &mut result.placed_references,
        &result.cells,
        scan.cell_to_refs.as_ref(),
        cfg,
    );
    result.cells.extend(virtual_cells);

    let object_script_map = object_script::build_object_script_map(
        &result.npcs,
        &result.creatures,
        &result.factions,
        &result.quests,
        &result.weapons,
        &result.armor,
        &result.consumables,
        &result.misc_items,
        &result.keys,
        &result.containers,
        &result.ammunition,
        &result.doors,
        &result.activators,
        &result.furniture,
        &result.lights,
        &result.books,
    );
    let _bindings = object_script::resolve_variable_bindings(&result.scripts, &object_script_map);
    result.variable_db = object_script::build_variable_db(
        &result.scripts,
        &object_script_map,
        &result.placed_references,
        idx,
    );

    dialogue::link_dialogue(&mut result.dialogue_topics, &mut result.dialogue_lines, scan, reader, cfg);
    dialogue::propagate_quest_to_unlinked_topics(&mut result.dialogue_topics, &result.dialogue_lines, cfg);

    result.dialogue_tree = result
        .dialogue_topics
        .iter()
        .map(|t| (t.common.form_id, t.lines.clone()))
        .collect();
}

#[tracing::instrument(skip_all)]
fn collect_unmodeled(
    scan: &ScanResult,
    accessor: Option<&dyn ByteAccessor>,
    idx: &mut IdentifierIndex,
    cfg: &ReconConfig,
    result: &mut SemanticReconstructionResult,
) {
    for (tag, headers) in &scan.headers_by_kind {
        if kinds::KNOWN_KIND_TAGS.contains(&tag.as_str()) {
            continue;
        }
        let records = generic::reconstruct_generic(tag, headers, accessor, idx, cfg);
        result.unmodeled_records.insert(tag.clone(), records);
    }
}

fn count_total(result: &SemanticReconstructionResult) -> u64 {
    let mut total = 0u64;
    total += result.npcs.len() as u64;
    total += result.creatures.len() as u64;
    total += result.races.len() as u64;
    total += result.factions.len() as u64;
    total += result.weapons.len() as u64;
    total += result.ammunition.len() as u64;
    total += result.armor.len() as u64;
    total += result.consumables.len() as u64;
    total += result.misc_items.len() as u64;
    total += result.keys.len() as u64;
    total += result.containers.len() as u64;
    total += result.cells.len() as u64;
    total += result.worldspaces.len() as u64;
    total += result.placed_references.len() as u64;
    total += result.terrain.len() as u64;
    total += result.weather.len() as u64;
    total += result.lighting_templates.len() as u64;
    total += result.navigation_meshes.len() as u64;
    total += result.perks.len() as u64;
    total += result.spells.len() as u64;
    total += result.base_effects.len() as u64;
    total += result.enchantments.len() as u64;
    total += result.projectiles.len() as u64;
    total += result.explosions.len() as u64;
    total += result.globals.len() as u64;
    total += result.game_settings.len() as u64;
    total += result.leveled_lists.len() as u64;
    total += result.classes.len() as u64;
    total += result.challenges.len() as u64;
    total += result.reputations.len() as u64;
    total += result.recipes.len() as u64;
    total += result.weapon_mods.len() as u64;
    total += result.packages.len() as u64;
    total += result.statics.len() as u64;
    total += result.sounds.len() as u64;
    total += result.texture_sets.len() as u64;
    total += result.armor_addons.len() as u64;
    total += result.actor_value_infos.len() as u64;
    total += result.waters.len() as u64;
    total += result.body_part_data.len() as u64;
    total += result.combat_styles.len() as u64;
    total += result.doors.len() as u64;
    total += result.activators.len() as u64;
    total += result.furniture.len() as u64;
    total += result.lights.len() as u64;
    total += result.books.len() as u64;
    total += result.notes.len() as u64;
    total += result.terminals.len() as u64;
    total += result.messages.len() as u64;
    total += result.quests.len() as u64;
    total += result.dialogue_topics.len() as u64;
    total += result.dialogue_lines.len() as u64;
    total += result.scripts.len() as u64;
    total += result.unmodeled_records.values().map(|v| v.len() as u64).sum::<u64>();
    total
}
