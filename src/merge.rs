/**
 * Runtime merger (component C7, spec §4.7): for every kind the
 * `RuntimeReader` trait covers, walk the captured runtime table and either
 * enrich the matching image-derived entity (by form-id) or, if the image
 * pass never produced one, create a new entity straight from the runtime
 * reader. Image wins on every already-populated field; only a default/empty
 * field is filled from the runtime side (spec §3, `kinds::common::merge_*`).
 *
 * A runtime table entry's `kind_code` is the record kind tag's four ASCII
 * bytes packed big-endian into a `u32` — the same value a record's own
 * `MainRecordHeader::kind` carries, so the scanner and this merger agree on
 * it without a separate lookup table.
 */
use crate::common::FormId;
use crate::identifiers::IdentifierIndex;
use crate::kinds::actors::{enrich_creature_from_runtime, enrich_npc_from_runtime, Creature, Npc};
use crate::kinds::data::Package;
use crate::kinds::items::{enrich_weapon_from_runtime, Container, Weapon};
use crate::kinds::scenery::{enrich_door_from_runtime, Door};
use crate::kinds::text::{
    enrich_dialogue_line_from_runtime, enrich_dialogue_topic_from_runtime, DialogueLine, DialogueTopic,
};
use crate::runtime::RuntimeReader;
use crate::scan::RuntimeTableEntry;
use crate::script::Script;

pub fn kind_code_for_tag(tag: &[u8; 4]) -> u32 {
    u32::from_be_bytes(*tag)
}

fn entries_for<'a>(table: &'a [RuntimeTableEntry], tag: &[u8; 4]) -> impl Iterator<Item = &'a RuntimeTableEntry> {
    let code = kind_code_for_tag(tag);
    table.iter().filter(move |e| e.kind_code == code)
}

fn find_mut<T>(items: &mut [T], form_id: FormId, get_id: impl Fn(&T) -> FormId) -> Option<&mut T> {
    items.iter_mut().find(|item| get_id(item) == form_id)
}

pub fn merge_npcs(
    image: &mut Vec<Npc>,
    table: &[RuntimeTableEntry],
    idx: &mut IdentifierIndex,
    reader: &dyn RuntimeReader,
) {
    for entry in entries_for(table, b"NPC_") {
        if let Some(eid) = &entry.editor_id {
            idx.try_add_editor_id(entry.form_id, eid.clone());
        }
        if let Some(existing) = find_mut(image, entry.form_id, |n| n.common.form_id) {
            if let Some(runtime) = reader.read_runtime_npc(entry) {
                enrich_npc_from_runtime(existing, runtime);
            }
        } else if let Some(mut created) = reader.read_runtime_npc(entry) {
            created.common.form_id = entry.form_id;
            created.common.from_runtime = true;
            image.push(created);
        }
    }
}

pub fn merge_creatures(
    image: &mut Vec<Creature>,
    table: &[RuntimeTableEntry],
    idx: &mut IdentifierIndex,
    reader: &dyn RuntimeReader,
) {
    for entry in entries_for(table, b"CREA") {
        if let Some(eid) = &entry.editor_id {
            idx.try_add_editor_id(entry.form_id, eid.clone());
        }
        if let Some(existing) = find_mut(image, entry.form_id, |c| c.common.form_id) {
            if let Some(runtime) = reader.read_runtime_creature(entry) {
                enrich_creature_from_runtime(existing, runtime);
            }
        } else if let Some(mut created) = reader.read_runtime_creature(entry) {
            created.common.form_id = entry.form_id;
            created.common.from_runtime = true;
            image.push(created);
        }
    }
}

pub fn merge_weapons(
    image: &mut Vec<Weapon>,
    table: &[RuntimeTableEntry],
    idx: &mut IdentifierIndex,
    reader: &dyn RuntimeReader,
) {
    for entry in entries_for(table, b"WEAP") {
        if let Some(eid) = &entry.editor_id {
            idx.try_add_editor_id(entry.form_id, eid.clone());
        }
        if let Some(existing) = find_mut(image, entry.form_id, |w| w.common.form_id) {
            if let Some(runtime) = reader.read_runtime_weapon(entry) {
                enrich_weapon_from_runtime(existing, runtime);
            }
        } else if let Some(mut created) = reader.read_runtime_weapon(entry) {
            created.common.form_id = entry.form_id;
            created.common.from_runtime = true;
            image.push(created);
        }
    }
}

pub fn merge_containers(
    image: &mut Vec<Container>,
    table: &[RuntimeTableEntry],
    idx: &mut IdentifierIndex,
    reader: &dyn RuntimeReader,
) {
    for entry in entries_for(table, b"CONT") {
        if let Some(eid) = &entry.editor_id {
            idx.try_add_editor_id(entry.form_id, eid.clone());
        }
        if find_mut(image, entry.form_id, |c| c.common.form_id).is_none() {
            if let Some(mut created) = reader.read_runtime_container(entry) {
                created.common.form_id = entry.form_id;
                created.common.from_runtime = true;
                image.push(created);
            }
        }
    }
}

pub fn merge_doors(
    image: &mut Vec<Door>,
    table: &[RuntimeTableEntry],
    idx: &mut IdentifierIndex,
    reader: &dyn RuntimeReader,
) {
    for entry in entries_for(table, b"DOOR") {
        if let Some(eid) = &entry.editor_id {
            idx.try_add_editor_id(entry.form_id, eid.clone());
        }
        if let Some(existing) = find_mut(image, entry.form_id, |d| d.common.form_id) {
            if let Some(runtime) = reader.read_runtime_door(entry) {
                enrich_door_from_runtime(existing, runtime);
            }
        } else if let Some(mut created) = reader.read_runtime_door(entry) {
            created.common.form_id = entry.form_id;
            created.common.from_runtime = true;
            image.push(created);
        }
    }
}

/// Dialogue topics reached via the runtime hash table directly, independent
/// of the topic-quest-info-list walk `xref::dialogue` does to fill in a
/// topic's own *lines* (spec §4.7: every kind with a known kind-code gets
/// this same create-or-enrich treatment, `DIAL` included).
pub fn merge_dialogue_topics(
    image: &mut Vec<DialogueTopic>,
    table: &[RuntimeTableEntry],
    idx: &mut IdentifierIndex,
    reader: &dyn RuntimeReader,
) {
    for entry in entries_for(table, b"DIAL") {
        if let Some(eid) = &entry.editor_id {
            idx.try_add_editor_id(entry.form_id, eid.clone());
        }
        if let Some(existing) = find_mut(image, entry.form_id, |t| t.common.form_id) {
            if let Some(runtime) = reader.read_runtime_dialogue_topic(entry) {
                enrich_dialogue_topic_from_runtime(existing, runtime);
            }
        } else if let Some(mut created) = reader.read_runtime_dialogue_topic(entry) {
            created.common.form_id = entry.form_id;
            created.common.from_runtime = true;
            image.push(created);
        }
    }
}

/// `INFO` counterpart to `merge_dialogue_topics` (spec §4.7). Lines created
/// here still flow through `xref::dialogue`'s linking cascade afterward like
/// any other line.
pub fn merge_dialogue_lines(
    image: &mut Vec<DialogueLine>,
    table: &[RuntimeTableEntry],
    idx: &mut IdentifierIndex,
    reader: &dyn RuntimeReader,
) {
    for entry in entries_for(table, b"INFO") {
        if let Some(eid) = &entry.editor_id {
            idx.try_add_editor_id(entry.form_id, eid.clone());
        }
        if let Some(existing) = find_mut(image, entry.form_id, |l| l.common.form_id) {
            if let Some(runtime) = reader.read_runtime_dialogue_info(entry) {
                enrich_dialogue_line_from_runtime(existing, runtime);
            }
        } else if let Some(mut created) = reader.read_runtime_dialogue_info(entry) {
            created.common.form_id = entry.form_id;
            created.common.from_runtime = true;
            image.push(created);
        }
    }
}

/// AI packages carry only a name on the image side, so there is nothing to
/// enrich: a runtime entry either creates a new one or is redundant with an
/// already-emitted image record.
pub fn merge_packages(
    image: &mut Vec<Package>,
    table: &[RuntimeTableEntry],
    idx: &mut IdentifierIndex,
    reader: &dyn RuntimeReader,
) {
    for entry in entries_for(table, b"PACK") {
        if let Some(eid) = &entry.editor_id {
            idx.try_add_editor_id(entry.form_id, eid.clone());
        }
        if find_mut(image, entry.form_id, |p| p.common.form_id).is_none() {
            if let Some(mut created) = reader.read_runtime_package(entry) {
                created.common.form_id = entry.form_id;
                created.common.from_runtime = true;
                image.push(created);
            }
        }
    }
}

/// Scripts are discovered by the runtime pass but never decompiled here —
/// bytecode decompilation is deferred to the orchestrator's dedicated script
/// stage so every script, image- and runtime-sourced alike, runs through
/// pass 2 exactly once (spec §4.7 step 4, §4.9).
pub fn merge_scripts(
    image: &mut Vec<Script>,
    table: &[RuntimeTableEntry],
    idx: &mut IdentifierIndex,
    reader: &dyn RuntimeReader,
) {
    for entry in entries_for(table, b"SCPT") {
        if let Some(eid) = &entry.editor_id {
            idx.try_add_editor_id(entry.form_id, eid.clone());
        }
        if find_mut(image, entry.form_id, |s| s.common.form_id).is_none() {
            if let Some(mut created) = reader.read_runtime_script(entry) {
                created.common.form_id = entry.form_id;
                created.common.from_runtime = true;
                image.push(created);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::FormId;
    use crate::kinds::common::EntityCommon;
    use crate::runtime::MockRuntimeReader;

    #[test]
    fn runtime_only_npc_is_created() {
        let mut image: Vec<Npc> = Vec::new();
        let table = vec![RuntimeTableEntry {
            form_id: FormId(0x900),
            kind_code: kind_code_for_tag(b"NPC_"),
            editor_id: Some("RuntimeOnlyNpc".to_string()),
            tes_form_offset: 0,
            display_name: None,
        }];
        let mut reader = MockRuntimeReader::new();
        reader.expect_read_runtime_npc().returning(|_| {
            Some(Npc {
                common: EntityCommon::shallow(FormId(0x900), 0, true),
                full_name: Some("Runtime Npc".to_string()),
                race: None,
                script: None,
                level: None,
                disposition_base: None,
                faction: None,
            })
        });
        let mut idx = IdentifierIndex::new();
        merge_npcs(&mut image, &table, &mut idx, &reader);
        assert_eq!(image.len(), 1);
        assert!(image[0].common.from_runtime);
        assert_eq!(idx.editor_id(FormId(0x900)), Some("RuntimeOnlyNpc"));
    }

    #[test]
    fn existing_image_npc_is_enriched_not_duplicated() {
        let mut image = vec![Npc {
            common: EntityCommon::shallow(FormId(0x901), 10, true),
            full_name: None,
            race: None,
            script: None,
            level: None,
            disposition_base: None,
            faction: None,
        }];
        let table = vec![RuntimeTableEntry {
            form_id: FormId(0x901),
            kind_code: kind_code_for_tag(b"NPC_"),
            editor_id: None,
            tes_form_offset: 0,
            display_name: None,
        }];
        let mut reader = MockRuntimeReader::new();
        reader.expect_read_runtime_npc().returning(|_| {
            Some(Npc {
                common: EntityCommon::shallow(FormId(0x901), 0, true),
                full_name: Some("Filled In".to_string()),
                race: None,
                script: None,
                level: None,
                disposition_base: None,
                faction: None,
            })
        });
        let mut idx = IdentifierIndex::new();
        merge_npcs(&mut image, &table, &mut idx, &reader);
        assert_eq!(image.len(), 1);
        assert_eq!(image[0].full_name.as_deref(), Some("Filled In"));
        assert_eq!(image[0].common.offset, 10); // untouched image field stays
    }

    #[test]
    fn runtime_only_package_is_created_once() {
        let mut image: Vec<Package> = Vec::new();
        let table = vec![RuntimeTableEntry {
            form_id: FormId(0x902),
            kind_code: kind_code_for_tag(b"PACK"),
            editor_id: None,
            tes_form_offset: 0,
            display_name: None,
        }];
        let mut reader = MockRuntimeReader::new();
        reader.expect_read_runtime_package().returning(|_| {
            Some(Package {
                common: EntityCommon::shallow(FormId(0x902), 0, true),
                full_name: Some("GuardPatrol".to_string()),
            })
        });
        let mut idx = IdentifierIndex::new();
        merge_packages(&mut image, &table, &mut idx, &reader);
        assert_eq!(image.len(), 1);
        assert!(image[0].common.from_runtime);
    }
}
