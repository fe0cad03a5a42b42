/**
 * Scenery and fixtures: static, furniture, door, light, activator, sound
 * marker, texture set, armor addon, actor-value info, water, body-part data,
 * combat style (spec §3 "scenery"). Door/activator/furniture keep an
 * explicit `Option` rather than a default-zero sentinel for their script
 * reference, since zero is a valid "no script" value distinct from "not
 * present in this cut" (design notes §9).
 */
use crate::accessor::{read_record_data, ByteAccessor};
use crate::common::{FormId, MainRecordHeader};
use crate::config::ReconConfig;
use crate::identifiers::IdentifierIndex;
use crate::kinds::common::{merge_option, note_common_subrecord, EntityCommon};
use crate::primitives::{cstring_from_bytes, read_u32};
use crate::subrecord::iter_subrecords;
use serde::{Deserialize, Serialize};

macro_rules! name_only_entity {
    ($struct_name:ident, $reconstruct_fn:ident, $buffer_key:literal) => {
        #[derive(Debug, Clone, Serialize, Deserialize)]
        pub struct $struct_name {
            pub common: EntityCommon,
            pub full_name: Option<String>,
        }

        pub fn $reconstruct_fn(
            headers: &[MainRecordHeader],
            accessor: Option<&dyn ByteAccessor>,
            idx: &mut IdentifierIndex,
            cfg: &ReconConfig,
        ) -> Vec<$struct_name> {
            headers
                .iter()
                .map(|header| {
                    let mut entity = $struct_name {
                        common: EntityCommon::shallow(header.form_id, header.offset, header.is_big_endian),
                        full_name: None,
                    };
                    let Some(accessor) = accessor else { return entity };
                    let Some(body) = read_record_data(accessor, header, cfg.buffer_size_for($buffer_key)) else {
                        return entity;
                    };
                    let endian = header.endian();
                    for sub in iter_subrecords(body.as_slice(), endian) {
                        let data = &body.as_slice()[sub.data_offset..sub.data_offset + sub.data_len];
                        let mut editor_id = entity.common.editor_id.clone();
                        if note_common_subrecord(sub.tag, data, header.form_id, idx, &mut editor_id) {
                            entity.common.editor_id = editor_id;
                            continue;
                        }
                        if sub.tag.as_str() == Some("FULL") {
                            entity.full_name = Some(cstring_from_bytes(data));
                        }
                    }
                    entity
                })
                .collect()
        }
    };
}

name_only_entity!(Static, reconstruct_statics, "STAT");
name_only_entity!(Sound, reconstruct_sounds, "SOUN");
name_only_entity!(TextureSet, reconstruct_texture_sets, "TXST");
name_only_entity!(ArmorAddon, reconstruct_armor_addons, "ARMA");
name_only_entity!(ActorValueInfo, reconstruct_actor_value_infos, "AVIF");
name_only_entity!(Water, reconstruct_waters, "WATR");
name_only_entity!(BodyPartData, reconstruct_body_part_data, "BPTD");
name_only_entity!(CombatStyle, reconstruct_combat_styles, "CSTY");

/// Door, activator and furniture all carry an optional attached script
/// (`SCRI`); a present-but-zero form-id means "explicitly scriptless", which
/// is why this is `Option<FormId>` rather than relying on `FormId::NONE`.
macro_rules! scripted_entity {
    ($struct_name:ident, $reconstruct_fn:ident, $buffer_key:literal) => {
        #[derive(Debug, Clone, Serialize, Deserialize)]
        pub struct $struct_name {
            pub common: EntityCommon,
            pub full_name: Option<String>,
            pub script: Option<FormId>,
        }

        pub fn $reconstruct_fn(
            headers: &[MainRecordHeader],
            accessor: Option<&dyn ByteAccessor>,
            idx: &mut IdentifierIndex,
            cfg: &ReconConfig,
        ) -> Vec<$struct_name> {
            headers
                .iter()
                .map(|header| {
                    let mut entity = $struct_name {
                        common: EntityCommon::shallow(header.form_id, header.offset, header.is_big_endian),
                        full_name: None,
                        script: None,
                    };
                    let Some(accessor) = accessor else { return entity };
                    let Some(body) = read_record_data(accessor, header, cfg.buffer_size_for($buffer_key)) else {
                        return entity;
                    };
                    let endian = header.endian();
                    for sub in iter_subrecords(body.as_slice(), endian) {
                        let data = &body.as_slice()[sub.data_offset..sub.data_offset + sub.data_len];
                        let mut editor_id = entity.common.editor_id.clone();
                        if note_common_subrecord(sub.tag, data, header.form_id, idx, &mut editor_id) {
                            entity.common.editor_id = editor_id;
                            continue;
                        }
                        match sub.tag.as_str() {
                            Some("FULL") => entity.full_name = Some(cstring_from_bytes(data)),
                            Some("SCRI") => entity.script = Some(FormId(read_u32(data, 0, endian).unwrap_or(0))),
                            _ => {}
                        }
                    }
                    entity
                })
                .collect()
        }
    };
}

scripted_entity!(Door, reconstruct_doors, "DOOR");
scripted_entity!(Activator, reconstruct_activators, "ACTI");
scripted_entity!(Furniture, reconstruct_furniture, "FURN");

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Light {
    pub common: EntityCommon,
    pub full_name: Option<String>,
    pub script: Option<FormId>,
}

pub fn reconstruct_lights(
    headers: &[MainRecordHeader],
    accessor: Option<&dyn ByteAccessor>,
    idx: &mut IdentifierIndex,
    cfg: &ReconConfig,
) -> Vec<Light> {
    headers
        .iter()
        .map(|header| {
            let mut light = Light {
                common: EntityCommon::shallow(header.form_id, header.offset, header.is_big_endian),
                full_name: None,
                script: None,
            };
            let Some(accessor) = accessor else { return light };
            let Some(body) = read_record_data(accessor, header, cfg.buffer_size_for("LIGH")) else {
                return light;
            };
            let endian = header.endian();
            for sub in iter_subrecords(body.as_slice(), endian) {
                let data = &body.as_slice()[sub.data_offset..sub.data_offset + sub.data_len];
                let mut editor_id = light.common.editor_id.clone();
                if note_common_subrecord(sub.tag, data, header.form_id, idx, &mut editor_id) {
                    light.common.editor_id = editor_id;
                    continue;
                }
                match sub.tag.as_str() {
                    Some("FULL") => light.full_name = Some(cstring_from_bytes(data)),
                    Some("SCRI") => light.script = Some(FormId(read_u32(data, 0, endian).unwrap_or(0))),
                    _ => {}
                }
            }
            light
        })
        .collect()
}

pub fn enrich_door_from_runtime(existing: &mut Door, runtime: Door) {
    existing.common.from_runtime = true;
    existing.full_name = merge_option(existing.full_name.take(), runtime.full_name);
    existing.script = merge_option(existing.script.take(), runtime.script);
}
