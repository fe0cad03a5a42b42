/**
 * Inventory items: weapon, armor, ammunition, consumable, misc item, key,
 * container (spec §3 "items"). Weapon and ammunition pull their ballistic
 * fields from the schema registry (the `DATA` layouts registered in
 * `schema.rs`); the rest carry only the common fields plus a value/weight
 * pair where the format actually has one.
 */
use crate::accessor::{read_record_data, ByteAccessor};
use crate::common::{FormId, MainRecordHeader, Tag};
use crate::config::ReconConfig;
use crate::identifiers::IdentifierIndex;
use crate::kinds::common::{merge_option, note_common_subrecord, EntityCommon};
use crate::primitives::{cstring_from_bytes, read_u32};
use crate::schema::SCHEMA;
use crate::subrecord::iter_subrecords;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Weapon {
    pub common: EntityCommon,
    pub full_name: Option<String>,
    pub value: Option<i32>,
    pub weight: Option<f32>,
    pub damage: Option<i16>,
    /// Ammunition this weapon fires (`XNAM`). Drives the weapon/ammo/
    /// projectile cross-enrichment the orchestrator runs right after the
    /// image and runtime passes (spec §4.10).
    pub ammo: Option<FormId>,
    /// Projectile this weapon fires (`VNAM`).
    pub projectile: Option<FormId>,
    pub script: Option<FormId>,
}

pub fn reconstruct_weapons(
    headers: &[MainRecordHeader],
    accessor: Option<&dyn ByteAccessor>,
    idx: &mut IdentifierIndex,
    cfg: &ReconConfig,
) -> Vec<Weapon> {
    let parent = Tag::new(*b"WEAP");
    headers
        .iter()
        .map(|header| {
            let mut weapon = Weapon {
                common: EntityCommon::shallow(header.form_id, header.offset, header.is_big_endian),
                full_name: None,
                value: None,
                weight: None,
                damage: None,
                ammo: None,
                projectile: None,
                script: None,
            };
            let Some(accessor) = accessor else { return weapon };
            let Some(body) = read_record_data(accessor, header, cfg.buffer_size_for("WEAP")) else {
                return weapon;
            };
            let endian = header.endian();
            for sub in iter_subrecords(body.as_slice(), endian) {
                let data = &body.as_slice()[sub.data_offset..sub.data_offset + sub.data_len];
                let mut editor_id = weapon.common.editor_id.clone();
                if note_common_subrecord(sub.tag, data, header.form_id, idx, &mut editor_id) {
                    weapon.common.editor_id = editor_id;
                    continue;
                }
                match sub.tag.as_str() {
                    Some("FULL") => weapon.full_name = Some(cstring_from_bytes(data)),
                    Some("DATA") => {
                        if let Some(decoded) = SCHEMA.decode(sub.tag, Some(parent), data, endian) {
                            weapon.value = decoded.get("value").and_then(|v| v.as_u32()).map(|v| v as i32);
                            weapon.weight = decoded.get("weight").and_then(|v| v.as_f32());
                            weapon.damage = decoded.get("damage").and_then(|v| v.as_u32()).map(|v| v as i16);
                        }
                    }
                    Some("XNAM") => weapon.ammo = read_u32(data, 0, endian).map(FormId),
                    Some("VNAM") => weapon.projectile = read_u32(data, 0, endian).map(FormId),
                    Some("SCRI") => weapon.script = read_u32(data, 0, endian).map(FormId),
                    _ => {}
                }
            }
            weapon
        })
        .collect()
}

pub fn enrich_weapon_from_runtime(existing: &mut Weapon, runtime: Weapon) {
    existing.common.from_runtime = true;
    existing.full_name = merge_option(existing.full_name.take(), runtime.full_name);
    existing.value = merge_option(existing.value.take(), runtime.value);
    existing.weight = merge_option(existing.weight.take(), runtime.weight);
    existing.damage = merge_option(existing.damage.take(), runtime.damage);
    existing.ammo = merge_option(existing.ammo.take(), runtime.ammo);
    existing.projectile = merge_option(existing.projectile.take(), runtime.projectile);
    existing.script = merge_option(existing.script.take(), runtime.script);
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ammunition {
    pub common: EntityCommon,
    pub full_name: Option<String>,
    pub speed: Option<f32>,
    pub value: Option<i32>,
    pub clip_rounds: Option<u8>,
    pub script: Option<FormId>,
    /// Inherited from the weapon(s) that fire this ammunition, not parsed
    /// from the `AMMO` record itself (spec §4.10 weapon/ammo cross-enrichment).
    pub projectile: Option<FormId>,
    pub projectile_model_path: Option<String>,
}

pub fn reconstruct_ammunition(
    headers: &[MainRecordHeader],
    accessor: Option<&dyn ByteAccessor>,
    idx: &mut IdentifierIndex,
    cfg: &ReconConfig,
) -> Vec<Ammunition> {
    let parent = Tag::new(*b"AMMO");
    headers
        .iter()
        .map(|header| {
            let mut ammo = Ammunition {
                common: EntityCommon::shallow(header.form_id, header.offset, header.is_big_endian),
                full_name: None,
                speed: None,
                value: None,
                clip_rounds: None,
                script: None,
                projectile: None,
                projectile_model_path: None,
            };
            let Some(accessor) = accessor else { return ammo };
            let Some(body) = read_record_data(accessor, header, cfg.buffer_size_for("AMMO")) else {
                return ammo;
            };
            let endian = header.endian();
            for sub in iter_subrecords(body.as_slice(), endian) {
                let data = &body.as_slice()[sub.data_offset..sub.data_offset + sub.data_len];
                let mut editor_id = ammo.common.editor_id.clone();
                if note_common_subrecord(sub.tag, data, header.form_id, idx, &mut editor_id) {
                    ammo.common.editor_id = editor_id;
                    continue;
                }
                match sub.tag.as_str() {
                    Some("FULL") => ammo.full_name = Some(cstring_from_bytes(data)),
                    Some("DATA") => {
                        if let Some(decoded) = SCHEMA.decode(sub.tag, Some(parent), data, endian) {
                            ammo.speed = decoded.get("speed").and_then(|v| v.as_f32());
                            ammo.value = decoded.get("value").and_then(|v| v.as_u32()).map(|v| v as i32);
                            ammo.clip_rounds = decoded
                                .get("clip_rounds")
                                .and_then(|v| v.as_u32())
                                .map(|v| v as u8);
                        }
                    }
                    Some("SCRI") => ammo.script = read_u32(data, 0, endian).map(FormId),
                    _ => {}
                }
            }
            ammo
        })
        .collect()
}

/// Weapon/ammo/projectile cross-enrichment (spec §4.10): reconstruct weapons,
/// then ammunition, then run this — each ammunition inherits the projectile
/// form-id and model path of every weapon that fires it. Run after the
/// runtime merge so a runtime-sourced weapon's `ammo`/`projectile` links
/// participate too.
pub fn enrich_ammunition_from_weapons(
    ammunition: &mut [Ammunition],
    weapons: &[Weapon],
    projectiles: &[crate::kinds::abilities::Projectile],
) {
    use std::collections::HashMap;
    let projectile_models: HashMap<FormId, Option<String>> = projectiles
        .iter()
        .map(|p| (p.common.form_id, p.model_path.clone()))
        .collect();

    let mut ammo_projectile: HashMap<FormId, FormId> = HashMap::new();
    for weapon in weapons {
        if let (Some(ammo_id), Some(projectile_id)) = (weapon.ammo, weapon.projectile) {
            ammo_projectile.entry(ammo_id).or_insert(projectile_id);
        }
    }

    for ammo in ammunition.iter_mut() {
        if let Some(&projectile_id) = ammo_projectile.get(&ammo.common.form_id) {
            ammo.projectile = Some(projectile_id);
            ammo.projectile_model_path = projectile_models.get(&projectile_id).cloned().flatten();
        }
    }
}

/// Armor, consumable, misc item, key and container all share the same
/// observed shape in the scan data: a display name, an optional value/weight
/// pair, and an optional attached script (spec §4.8 lists all of these among
/// the kinds that can own a `SCRI` reference) — no further kind-specific
/// schema entries registered (spec §3 calls the kind list "non-exhaustive but
/// representative" — these ride the common-tag path).
macro_rules! name_value_weight_entity {
    ($struct_name:ident, $reconstruct_fn:ident, $kind_tag:literal, $buffer_key:literal) => {
        #[derive(Debug, Clone, Serialize, Deserialize)]
        pub struct $struct_name {
            pub common: EntityCommon,
            pub full_name: Option<String>,
            pub value: Option<i32>,
            pub weight: Option<f32>,
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
                    let mut item = $struct_name {
                        common: EntityCommon::shallow(header.form_id, header.offset, header.is_big_endian),
                        full_name: None,
                        value: None,
                        weight: None,
                        script: None,
                    };
                    let Some(accessor) = accessor else { return item };
                    let Some(body) = read_record_data(accessor, header, cfg.buffer_size_for($buffer_key)) else {
                        return item;
                    };
                    let endian = header.endian();
                    for sub in iter_subrecords(body.as_slice(), endian) {
                        let data = &body.as_slice()[sub.data_offset..sub.data_offset + sub.data_len];
                        let mut editor_id = item.common.editor_id.clone();
                        if note_common_subrecord(sub.tag, data, header.form_id, idx, &mut editor_id) {
                            item.common.editor_id = editor_id;
                            continue;
                        }
                        match sub.tag.as_str() {
                            Some("FULL") => item.full_name = Some(cstring_from_bytes(data)),
                            Some("SCRI") => item.script = read_u32(data, 0, endian).map(FormId),
                            _ => {}
                        }
                    }
                    item
                })
                .collect()
        }
    };
}

name_value_weight_entity!(Armor, reconstruct_armor, "ARMO", "ARMO");
name_value_weight_entity!(Consumable, reconstruct_consumables, "ALCH", "ALCH");
name_value_weight_entity!(MiscItem, reconstruct_misc_items, "MISC", "MISC");
name_value_weight_entity!(Key, reconstruct_keys, "KEYM", "KEYM");
name_value_weight_entity!(Container, reconstruct_containers, "CONT", "CONT");

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accessor::SliceAccessor;

    fn weap_header(offset: u64, data_size: u32) -> MainRecordHeader {
        MainRecordHeader {
            kind: Tag::new(*b"WEAP"),
            offset,
            data_size,
            flags: 0,
            form_id: FormId(0x100),
            is_compressed: false,
            is_big_endian: true,
        }
    }

    #[test]
    fn weapon_data_decodes_ballistic_fields() {
        let mut body = Vec::new();
        body.extend_from_slice(b"DATA");
        body.extend_from_slice(&12u16.to_be_bytes());
        body.extend_from_slice(&50i32.to_be_bytes());
        body.extend_from_slice(&2.5f32.to_be_bytes());
        body.extend_from_slice(&15i16.to_be_bytes());

        let mut wire = vec![0u8; 24];
        wire.extend_from_slice(&body);
        let accessor = SliceAccessor(&wire);
        let header = weap_header(0, body.len() as u32);
        let mut idx = IdentifierIndex::new();
        let cfg = ReconConfig::default();
        let weapons = reconstruct_weapons(&[header], Some(&accessor), &mut idx, &cfg);
        assert_eq!(weapons[0].value, Some(50));
        assert_eq!(weapons[0].weight, Some(2.5));
        assert_eq!(weapons[0].damage, Some(15));
    }

    #[test]
    fn weapon_ammo_and_projectile_decode() {
        let mut body = Vec::new();
        body.extend_from_slice(b"XNAM");
        body.extend_from_slice(&4u16.to_be_bytes());
        body.extend_from_slice(&0x200u32.to_be_bytes());
        body.extend_from_slice(b"VNAM");
        body.extend_from_slice(&4u16.to_be_bytes());
        body.extend_from_slice(&0x300u32.to_be_bytes());

        let mut wire = vec![0u8; 24];
        wire.extend_from_slice(&body);
        let accessor = SliceAccessor(&wire);
        let header = weap_header(0, body.len() as u32);
        let mut idx = IdentifierIndex::new();
        let cfg = ReconConfig::default();
        let weapons = reconstruct_weapons(&[header], Some(&accessor), &mut idx, &cfg);
        assert_eq!(weapons[0].ammo, Some(FormId(0x200)));
        assert_eq!(weapons[0].projectile, Some(FormId(0x300)));
    }

    #[test]
    fn ammunition_inherits_projectile_and_model_path_from_weapon() {
        use crate::kinds::abilities::{Projectile, ProjectilePhysics};
        use crate::kinds::common::EntityCommon;

        let weapon = Weapon {
            common: EntityCommon::shallow(FormId(1), 0, true),
            full_name: None,
            value: None,
            weight: None,
            damage: None,
            ammo: Some(FormId(0x200)),
            projectile: Some(FormId(0x300)),
            script: None,
        };
        let projectile = Projectile {
            common: EntityCommon::shallow(FormId(0x300), 0, true),
            full_name: None,
            model_path: Some("weapons/bullet.nif".to_string()),
            physics: ProjectilePhysics::default(),
        };
        let mut ammo = vec![Ammunition {
            common: EntityCommon::shallow(FormId(0x200), 0, true),
            full_name: None,
            speed: None,
            value: None,
            clip_rounds: None,
            script: None,
            projectile: None,
            projectile_model_path: None,
        }];

        enrich_ammunition_from_weapons(&mut ammo, &[weapon], &[projectile]);
        assert_eq!(ammo[0].projectile, Some(FormId(0x300)));
        assert_eq!(ammo[0].projectile_model_path.as_deref(), Some("weapons/bullet.nif"));
    }
}
