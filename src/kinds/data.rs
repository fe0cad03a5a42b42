/**
 * Data-table records: global variable, game setting, leveled list, class,
 * challenge, reputation, recipe, weapon mod, AI package (spec §3 "data").
 *
 * Global variables and game settings both store a typed scalar behind a
 * `DATA`/FNAM byte that says which type it is rather than a fixed schema
 * entry (spec §8 Scenario C), so their handlers branch on that byte
 * themselves instead of going through the schema registry.
 */
use crate::accessor::{read_record_data, ByteAccessor};
use crate::common::{FormId, MainRecordHeader};
use crate::config::ReconConfig;
use crate::identifiers::IdentifierIndex;
use crate::kinds::common::{merge_option, note_common_subrecord, EntityCommon};
use crate::primitives::{cstring_from_bytes, read_f32, read_i32};
use crate::subrecord::iter_subrecords;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum GlobalValue {
    Short(i32),
    Long(i32),
    Float(f32),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlobalVariable {
    pub common: EntityCommon,
    pub value: Option<GlobalValue>,
}

pub fn reconstruct_globals(
    headers: &[MainRecordHeader],
    accessor: Option<&dyn ByteAccessor>,
    idx: &mut IdentifierIndex,
    cfg: &ReconConfig,
) -> Vec<GlobalVariable> {
    headers
        .iter()
        .map(|header| {
            let mut global = GlobalVariable {
                common: EntityCommon::shallow(header.form_id, header.offset, header.is_big_endian),
                value: None,
            };
            let Some(accessor) = accessor else { return global };
            let Some(body) = read_record_data(accessor, header, cfg.buffer_size_for("GLOB")) else {
                return global;
            };
            let endian = header.endian();
            let mut value_type: Option<u8> = None;
            for sub in iter_subrecords(body.as_slice(), endian) {
                let data = &body.as_slice()[sub.data_offset..sub.data_offset + sub.data_len];
                let mut editor_id = global.common.editor_id.clone();
                if note_common_subrecord(sub.tag, data, header.form_id, idx, &mut editor_id) {
                    global.common.editor_id = editor_id;
                    continue;
                }
                match sub.tag.as_str() {
                    Some("FNAM") => value_type = data.first().copied(),
                    Some("FLTV") => {
                        // 's'/'l' store the scalar as a float subrecord regardless of
                        // declared type, truncated by the handler per FNAM (spec §8
                        // Scenario C: "s" -> short truncation of the stored float).
                        let raw = read_f32(data, 0, endian);
                        global.value = match (value_type, raw) {
                            (Some(b's'), Some(f)) => Some(GlobalValue::Short(f as i32)),
                            (Some(b'l'), Some(f)) => Some(GlobalValue::Long(f as i32)),
                            (_, Some(f)) => Some(GlobalValue::Float(f)),
                            _ => None,
                        };
                    }
                    _ => {}
                }
            }
            global
        })
        .collect()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum GameSettingValue {
    Int(i32),
    Float(f32),
    Str(String),
    Bool(bool),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameSetting {
    pub common: EntityCommon,
    pub value: Option<GameSettingValue>,
}

pub fn reconstruct_game_settings(
    headers: &[MainRecordHeader],
    accessor: Option<&dyn ByteAccessor>,
    idx: &mut IdentifierIndex,
    cfg: &ReconConfig,
) -> Vec<GameSetting> {
    headers
        .iter()
        .map(|header| {
            let mut gmst = GameSetting {
                common: EntityCommon::shallow(header.form_id, header.offset, header.is_big_endian),
                value: None,
            };
            let Some(accessor) = accessor else { return gmst };
            let Some(body) = read_record_data(accessor, header, cfg.buffer_size_for("GMST")) else {
                return gmst;
            };
            let endian = header.endian();
            let mut editor_id: Option<String> = None;
            let mut raw_data: Option<Vec<u8>> = None;
            for sub in iter_subrecords(body.as_slice(), endian) {
                let data = &body.as_slice()[sub.data_offset..sub.data_offset + sub.data_len];
                if note_common_subrecord(sub.tag, data, header.form_id, idx, &mut editor_id) {
                    gmst.common.editor_id = editor_id.clone();
                    continue;
                }
                if sub.tag.as_str() == Some("DATA") {
                    raw_data = Some(data.to_vec());
                }
            }
            // The setting's own editor-id prefix names its type (spec §4.3):
            // i=int, f=float, s=string, b=bool.
            if let (Some(eid), Some(data)) = (&editor_id, raw_data.as_deref()) {
                gmst.value = decode_gmst_value(eid, data, endian);
            }
            gmst
        })
        .collect()
}

fn decode_gmst_value(editor_id: &str, data: &[u8], endian: crate::common::Endian) -> Option<GameSettingValue> {
    match editor_id.chars().next()? {
        'i' => read_i32(data, 0, endian).map(GameSettingValue::Int),
        'f' => read_f32(data, 0, endian).map(GameSettingValue::Float),
        's' => Some(GameSettingValue::Str(cstring_from_bytes(data))),
        'b' => read_i32(data, 0, endian).map(|v| GameSettingValue::Bool(v != 0)),
        _ => None,
    }
}

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

name_only_entity!(LeveledList, reconstruct_leveled_lists, "LVLI");
name_only_entity!(Class, reconstruct_classes, "CLAS");
name_only_entity!(Challenge, reconstruct_challenges, "CHAL");
name_only_entity!(Reputation, reconstruct_reputations, "REPU");
name_only_entity!(Recipe, reconstruct_recipes, "RCPE");
name_only_entity!(WeaponMod, reconstruct_weapon_mods, "WMOD");
name_only_entity!(Package, reconstruct_packages, "PACK");

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accessor::SliceAccessor;
    use crate::common::Tag;

    #[test]
    fn scenario_c_short_global_truncates_float() {
        let mut body = Vec::new();
        body.extend_from_slice(b"FNAM");
        body.extend_from_slice(&1u16.to_be_bytes());
        body.push(b's');
        body.extend_from_slice(b"FLTV");
        body.extend_from_slice(&4u16.to_be_bytes());
        body.extend_from_slice(&7.9f32.to_be_bytes());

        let mut wire = vec![0u8; 24];
        wire.extend_from_slice(&body);
        let accessor = SliceAccessor(&wire);
        let header = MainRecordHeader {
            kind: Tag::new(*b"GLOB"),
            offset: 0,
            data_size: body.len() as u32,
            flags: 0,
            form_id: FormId(0x300),
            is_compressed: false,
            is_big_endian: true,
        };
        let mut idx = IdentifierIndex::new();
        let cfg = ReconConfig::default();
        let globals = reconstruct_globals(&[header], Some(&accessor), &mut idx, &cfg);
        match globals[0].value {
            Some(GlobalValue::Short(v)) => assert_eq!(v, 7),
            other => panic!("expected Short(7), got {:?}", other),
        }
    }

    #[test]
    fn gmst_float_setting_decodes_by_editor_id_prefix() {
        let mut body = Vec::new();
        body.extend_from_slice(b"EDID");
        body.extend_from_slice(&9u16.to_be_bytes());
        body.extend_from_slice(b"fMyVal\0\0\0");
        body.extend_from_slice(b"DATA");
        body.extend_from_slice(&4u16.to_be_bytes());
        body.extend_from_slice(&1.5f32.to_be_bytes());

        let mut wire = vec![0u8; 24];
        wire.extend_from_slice(&body);
        let accessor = SliceAccessor(&wire);
        let header = MainRecordHeader {
            kind: Tag::new(*b"GMST"),
            offset: 0,
            data_size: body.len() as u32,
            flags: 0,
            form_id: FormId(0x301),
            is_compressed: false,
            is_big_endian: true,
        };
        let mut idx = IdentifierIndex::new();
        let cfg = ReconConfig::default();
        let settings = reconstruct_game_settings(&[header], Some(&accessor), &mut idx, &cfg);
        match settings[0].value {
            Some(GameSettingValue::Float(v)) => assert!((v - 1.5).abs() < f32::EPSILON),
            ref other => panic!("expected Float(1.5), got {:?}", other),
        }
    }
}
