/**
 * Actors: NPC, creature, race, faction (spec §3 "actors").
 *
 * NPC is the family spec §8 Scenario A exercises directly (a zero-length,
 * accessor-less record yields a fully shallow entity) so its handler is
 * written out in full; creature/race/faction follow the identical shape with
 * a smaller field set and share the same enumeration pattern.
 */
use crate::accessor::{read_record_data, ByteAccessor};
use crate::common::{Endian, FormId, MainRecordHeader, Tag};
use crate::config::ReconConfig;
use crate::identifiers::IdentifierIndex;
use crate::kinds::common::{merge_form_id, merge_option, note_common_subrecord, EntityCommon};
use crate::logger::{get_logger, LogLevel};
use crate::primitives::{cstring_from_bytes, read_i16, read_i32, read_u32};
use crate::subrecord::iter_subrecords;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Npc {
    pub common: EntityCommon,
    pub full_name: Option<String>,
    pub race: Option<FormId>,
    pub script: Option<FormId>,
    pub level: Option<i16>,
    pub disposition_base: Option<i16>,
    pub faction: Option<FormId>,
}

impl Npc {
    fn shallow(header: &MainRecordHeader) -> Self {
        Npc {
            common: EntityCommon::shallow(header.form_id, header.offset, header.is_big_endian),
            full_name: None,
            race: None,
            script: None,
            level: None,
            disposition_base: None,
            faction: None,
        }
    }
}

pub fn reconstruct_npcs(
    headers: &[MainRecordHeader],
    accessor: Option<&dyn ByteAccessor>,
    idx: &mut IdentifierIndex,
    cfg: &ReconConfig,
) -> Vec<Npc> {
    let parent = Tag::new(*b"NPC_");
    headers
        .iter()
        .map(|header| reconstruct_one_npc(header, accessor, idx, cfg, parent))
        .collect()
}

fn reconstruct_one_npc(
    header: &MainRecordHeader,
    accessor: Option<&dyn ByteAccessor>,
    idx: &mut IdentifierIndex,
    cfg: &ReconConfig,
    parent: Tag,
) -> Npc {
    let mut npc = Npc::shallow(header);

    let Some(accessor) = accessor else {
        return npc;
    };
    let Some(body) = read_record_data(accessor, header, cfg.buffer_size_for("NPC_")) else {
        return npc;
    };

    let endian = header.endian();
    for sub in iter_subrecords(body.as_slice(), endian) {
        let data = &body.as_slice()[sub.data_offset..sub.data_offset + sub.data_len];
        let mut editor_id = npc.common.editor_id.clone();
        if note_common_subrecord(sub.tag, data, header.form_id, idx, &mut editor_id) {
            npc.common.editor_id = editor_id;
            continue;
        }
        match sub.tag.as_str() {
            Some("FULL") => npc.full_name = Some(cstring_from_bytes(data)),
            Some("RNAM") => npc.race = read_u32(data, 0, endian).map(FormId),
            Some("SCRI") => npc.script = read_u32(data, 0, endian).map(FormId),
            Some("FNAM") => npc.faction = read_u32(data, 0, endian).map(FormId),
            _ => {
                if let Some(decoded) = crate::schema::SCHEMA.decode(sub.tag, Some(parent), data, endian) {
                    npc.level = decoded.get("level").and_then(|v| v.as_u32()).map(|v| v as i16);
                    npc.disposition_base = decoded
                        .get("disposition_base")
                        .and_then(|v| v.as_u32())
                        .map(|v| v as i16);
                } else {
                    get_logger().log_with_source(
                        LogLevel::Debug,
                        format!("NPC_ {}: unrecognized subrecord {}", header.form_id, sub.tag),
                        Some("NpcHandler".to_string()),
                    );
                }
            }
        }
    }
    let _ = read_i16;
    let _ = read_i32;
    npc
}

/// Runtime enrichment (spec §4.7 step 3): copy in any field that is
/// currently unset, preferring the image value otherwise.
pub fn enrich_npc_from_runtime(existing: &mut Npc, runtime: Npc) {
    existing.common.from_runtime = true;
    existing.full_name = merge_option(existing.full_name.take(), runtime.full_name);
    existing.race = merge_form_id(existing.race.unwrap_or(FormId::NONE), runtime.race.unwrap_or(FormId::NONE)).as_option();
    existing.script = merge_option(existing.script.take(), runtime.script);
    existing.level = merge_option(existing.level.take(), runtime.level);
    existing.disposition_base = merge_option(existing.disposition_base.take(), runtime.disposition_base);
    existing.faction = merge_option(existing.faction.take(), runtime.faction);
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Creature {
    pub common: EntityCommon,
    pub full_name: Option<String>,
    pub script: Option<FormId>,
}

pub fn reconstruct_creatures(
    headers: &[MainRecordHeader],
    accessor: Option<&dyn ByteAccessor>,
    idx: &mut IdentifierIndex,
    cfg: &ReconConfig,
) -> Vec<Creature> {
    headers
        .iter()
        .map(|header| {
            let mut creature = Creature {
                common: EntityCommon::shallow(header.form_id, header.offset, header.is_big_endian),
                full_name: None,
                script: None,
            };
            let Some(accessor) = accessor else {
                return creature;
            };
            let Some(body) = read_record_data(accessor, header, cfg.buffer_size_for("CREA")) else {
                return creature;
            };
            let endian = header.endian();
            for sub in iter_subrecords(body.as_slice(), endian) {
                let data = &body.as_slice()[sub.data_offset..sub.data_offset + sub.data_len];
                let mut editor_id = creature.common.editor_id.clone();
                if note_common_subrecord(sub.tag, data, header.form_id, idx, &mut editor_id) {
                    creature.common.editor_id = editor_id;
                    continue;
                }
                match sub.tag.as_str() {
                    Some("FULL") => creature.full_name = Some(cstring_from_bytes(data)),
                    Some("SCRI") => creature.script = read_u32(data, 0, endian).map(FormId),
                    _ => {}
                }
            }
            creature
        })
        .collect()
}

pub fn enrich_creature_from_runtime(existing: &mut Creature, runtime: Creature) {
    existing.common.from_runtime = true;
    existing.full_name = merge_option(existing.full_name.take(), runtime.full_name);
    existing.script = merge_option(existing.script.take(), runtime.script);
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Race {
    pub common: EntityCommon,
    pub full_name: Option<String>,
}

pub fn reconstruct_races(
    headers: &[MainRecordHeader],
    accessor: Option<&dyn ByteAccessor>,
    idx: &mut IdentifierIndex,
    cfg: &ReconConfig,
) -> Vec<Race> {
    headers
        .iter()
        .map(|header| {
            let mut race = Race {
                common: EntityCommon::shallow(header.form_id, header.offset, header.is_big_endian),
                full_name: None,
            };
            let Some(accessor) = accessor else { return race };
            let Some(body) = read_record_data(accessor, header, cfg.buffer_size_for("RACE")) else {
                return race;
            };
            let endian = header.endian();
            for sub in iter_subrecords(body.as_slice(), endian) {
                let data = &body.as_slice()[sub.data_offset..sub.data_offset + sub.data_len];
                let mut editor_id = race.common.editor_id.clone();
                if note_common_subrecord(sub.tag, data, header.form_id, idx, &mut editor_id) {
                    race.common.editor_id = editor_id;
                    continue;
                }
                if sub.tag.as_str() == Some("FULL") {
                    race.full_name = Some(cstring_from_bytes(data));
                }
            }
            race
        })
        .collect()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Faction {
    pub common: EntityCommon,
    pub full_name: Option<String>,
    pub script: Option<FormId>,
}

pub fn reconstruct_factions(
    headers: &[MainRecordHeader],
    accessor: Option<&dyn ByteAccessor>,
    idx: &mut IdentifierIndex,
    cfg: &ReconConfig,
) -> Vec<Faction> {
    headers
        .iter()
        .map(|header| {
            let mut faction = Faction {
                common: EntityCommon::shallow(header.form_id, header.offset, header.is_big_endian),
                full_name: None,
                script: None,
            };
            let Some(accessor) = accessor else { return faction };
            let Some(body) = read_record_data(accessor, header, cfg.buffer_size_for("FACT")) else {
                return faction;
            };
            let endian = header.endian();
            for sub in iter_subrecords(body.as_slice(), endian) {
                let data = &body.as_slice()[sub.data_offset..sub.data_offset + sub.data_len];
                let mut editor_id = faction.common.editor_id.clone();
                if note_common_subrecord(sub.tag, data, header.form_id, idx, &mut editor_id) {
                    faction.common.editor_id = editor_id;
                    continue;
                }
                match sub.tag.as_str() {
                    Some("FULL") => faction.full_name = Some(cstring_from_bytes(data)),
                    Some("SCRI") => faction.script = read_u32(data, 0, endian).map(FormId),
                    _ => {}
                }
            }
            faction
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accessor::SliceAccessor;

    #[test]
    fn scenario_a_minimal_npc() {
        // No accessor, zero data_size -> fully shallow entity.
        let header = MainRecordHeader {
            kind: Tag::new(*b"NPC_"),
            offset: 0,
            data_size: 0,
            flags: 0,
            form_id: FormId(0x0001_4DA0),
            is_compressed: false,
            is_big_endian: true,
        };
        let mut idx = IdentifierIndex::new();
        let cfg = ReconConfig::default();
        let npcs = reconstruct_npcs(&[header], None, &mut idx, &cfg);
        assert_eq!(npcs.len(), 1);
        assert_eq!(npcs[0].common.form_id, FormId(0x0001_4DA0));
        assert!(npcs[0].common.editor_id.is_none());
        assert!(npcs[0].level.is_none());
        assert_eq!(npcs[0].common.is_big_endian, true);
    }

    #[test]
    fn npc_with_accessor_and_zero_data_size_is_shallow() {
        let image = vec![0u8; 24];
        let accessor = SliceAccessor(&image);
        let header = MainRecordHeader {
            kind: Tag::new(*b"NPC_"),
            offset: 0,
            data_size: 0,
            flags: 0,
            form_id: FormId(1),
            is_compressed: false,
            is_big_endian: true,
        };
        let mut idx = IdentifierIndex::new();
        let cfg = ReconConfig::default();
        let npcs = reconstruct_npcs(&[header], Some(&accessor), &mut idx, &cfg);
        assert!(npcs[0].common.editor_id.is_none());
        assert!(npcs[0].race.is_none());
    }
}
