/**
 * Abilities and effects: perk, spell, base effect, enchantment, projectile,
 * explosion (spec §3 "abilities"). Projectile physics (speed/gravity/range)
 * is its own nested struct since the runtime side exposes it through a
 * dedicated reader (`RuntimeReader::read_projectile_physics`, spec §6)
 * independent of the projectile's own record.
 */
use crate::accessor::{read_record_data, ByteAccessor};
use crate::common::{FormId, MainRecordHeader};
use crate::config::ReconConfig;
use crate::identifiers::IdentifierIndex;
use crate::kinds::common::{merge_option, note_common_subrecord, EntityCommon};
use crate::primitives::cstring_from_bytes;
use crate::subrecord::iter_subrecords;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectilePhysics {
    pub speed: Option<f32>,
    pub gravity: Option<f32>,
    pub range: Option<f32>,
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

name_only_entity!(Perk, reconstruct_perks, "PERK");
name_only_entity!(Spell, reconstruct_spells, "SPEL");
name_only_entity!(BaseEffect, reconstruct_base_effects, "MGEF");
name_only_entity!(Enchantment, reconstruct_enchantments, "ENCH");
name_only_entity!(Explosion, reconstruct_explosions, "EXPL");

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Projectile {
    pub common: EntityCommon,
    pub full_name: Option<String>,
    /// World model path (`MODL`) — an ammunition record inherits this from
    /// its weapon's projectile during the weapon/ammo cross-enrichment pass
    /// (spec §4.10).
    pub model_path: Option<String>,
    pub physics: ProjectilePhysics,
}

pub fn reconstruct_projectiles(
    headers: &[MainRecordHeader],
    accessor: Option<&dyn ByteAccessor>,
    idx: &mut IdentifierIndex,
    cfg: &ReconConfig,
) -> Vec<Projectile> {
    headers
        .iter()
        .map(|header| {
            let mut proj = Projectile {
                common: EntityCommon::shallow(header.form_id, header.offset, header.is_big_endian),
                full_name: None,
                model_path: None,
                physics: ProjectilePhysics::default(),
            };
            let Some(accessor) = accessor else { return proj };
            let Some(body) = read_record_data(accessor, header, cfg.buffer_size_for("PROJ")) else {
                return proj;
            };
            let endian = header.endian();
            for sub in iter_subrecords(body.as_slice(), endian) {
                let data = &body.as_slice()[sub.data_offset..sub.data_offset + sub.data_len];
                let mut editor_id = proj.common.editor_id.clone();
                if note_common_subrecord(sub.tag, data, header.form_id, idx, &mut editor_id) {
                    proj.common.editor_id = editor_id;
                    continue;
                }
                match sub.tag.as_str() {
                    Some("FULL") => proj.full_name = Some(cstring_from_bytes(data)),
                    Some("MODL") => proj.model_path = Some(cstring_from_bytes(data)),
                    _ => {}
                }
            }
            proj
        })
        .collect()
}

/// Enriches a projectile's physics from the runtime reader (spec §4.7): the
/// physics block has no image-side counterpart in this representative field
/// set, so it is runtime-only unless the caller already populated it.
pub fn apply_runtime_physics(existing: &mut Projectile, runtime: ProjectilePhysics) {
    existing.physics.speed = merge_option(existing.physics.speed.take(), runtime.speed);
    existing.physics.gravity = merge_option(existing.physics.gravity.take(), runtime.gravity);
    existing.physics.range = merge_option(existing.physics.range.take(), runtime.range);
}

pub fn enrich_perk_from_runtime(existing: &mut Perk, runtime: Perk) {
    existing.common.from_runtime = true;
    existing.full_name = merge_option(existing.full_name.take(), runtime.full_name);
}

pub fn enrich_spell_from_runtime(existing: &mut Spell, runtime: Spell) {
    existing.common.from_runtime = true;
    existing.full_name = merge_option(existing.full_name.take(), runtime.full_name);
}
