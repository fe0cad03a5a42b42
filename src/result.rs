/**
 * The orchestrator's single output type (spec §1, §4.10): every
 * reconstructed entity, grouped by kind, plus the identifier index and a
 * handful of bookkeeping counters. Nothing here is computed lazily — by the
 * time `reconstruct_all` returns, every field is final.
 */
use crate::common::FormId;
use crate::identifiers::IdentifierIndex;
use crate::kinds::abilities::{BaseEffect, Enchantment, Explosion, Perk, Projectile, Spell};
use crate::kinds::actors::{Creature, Faction, Npc, Race};
use crate::kinds::data::{Challenge, Class, GameSetting, GlobalVariable, LeveledList, Package, Recipe, Reputation, WeaponMod};
use crate::kinds::generic::GenericRecord;
use crate::kinds::items::{Ammunition, Armor, Consumable, Container, Key, MiscItem, Weapon};
use crate::kinds::scenery::{
    ActorValueInfo, Activator, ArmorAddon, BodyPartData, CombatStyle, Door, Furniture, Light, Sound, Static,
    TextureSet, Water,
};
use crate::kinds::text::{Book, DialogueLine, DialogueTopic, Message, Note, Quest, Terminal};
use crate::kinds::world::{
    Cell, LightingTemplate, NavigationMesh, PlacedReference, TerrainHeightmap, Weather, Worldspace,
};
use crate::script::Script;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct SemanticReconstructionResult {
    pub npcs: Vec<Npc>,
    pub creatures: Vec<Creature>,
    pub races: Vec<Race>,
    pub factions: Vec<Faction>,

    pub weapons: Vec<Weapon>,
    pub ammunition: Vec<Ammunition>,
    pub armor: Vec<Armor>,
    pub consumables: Vec<Consumable>,
    pub misc_items: Vec<MiscItem>,
    pub keys: Vec<Key>,
    pub containers: Vec<Container>,

    pub cells: Vec<Cell>,
    pub worldspaces: Vec<Worldspace>,
    pub placed_references: Vec<PlacedReference>,
    pub terrain: Vec<TerrainHeightmap>,
    pub weather: Vec<Weather>,
    pub lighting_templates: Vec<LightingTemplate>,
    pub navigation_meshes: Vec<NavigationMesh>,

    pub perks: Vec<Perk>,
    pub spells: Vec<Spell>,
    pub base_effects: Vec<BaseEffect>,
    pub enchantments: Vec<Enchantment>,
    pub projectiles: Vec<Projectile>,
    pub explosions: Vec<Explosion>,

    pub globals: Vec<GlobalVariable>,
    pub game_settings: Vec<GameSetting>,
    pub leveled_lists: Vec<LeveledList>,
    pub classes: Vec<Class>,
    pub challenges: Vec<Challenge>,
    pub reputations: Vec<Reputation>,
    pub recipes: Vec<Recipe>,
    pub weapon_mods: Vec<WeaponMod>,
    pub packages: Vec<Package>,

    pub statics: Vec<Static>,
    pub sounds: Vec<Sound>,
    pub texture_sets: Vec<TextureSet>,
    pub armor_addons: Vec<ArmorAddon>,
    pub actor_value_infos: Vec<ActorValueInfo>,
    pub waters: Vec<Water>,
    pub body_part_data: Vec<BodyPartData>,
    pub combat_styles: Vec<CombatStyle>,
    pub doors: Vec<Door>,
    pub activators: Vec<Activator>,
    pub furniture: Vec<Furniture>,
    pub lights: Vec<Light>,

    pub books: Vec<Book>,
    pub notes: Vec<Note>,
    pub terminals: Vec<Terminal>,
    pub messages: Vec<Message>,
    pub quests: Vec<Quest>,
    pub dialogue_topics: Vec<DialogueTopic>,
    pub dialogue_lines: Vec<DialogueLine>,
    pub scripts: Vec<Script>,

    /// Anything scanned under a kind tag with no bespoke handler, keyed by
    /// that tag's text (spec §3: "kinds (non-exhaustive)").
    pub unmodeled_records: HashMap<String, Vec<GenericRecord>>,

    /// Every resolved editor-id/display-name, plus the reverse lookup the
    /// cross-reference passes used while linking (spec §4.5).
    #[serde(skip)]
    pub identifiers: IdentifierIndex,

    /// Entity counts for each dialogue topic's children, convenient for a
    /// caller building a tree view without re-deriving it.
    pub dialogue_tree: HashMap<FormId, Vec<FormId>>,

    /// Named script variable table inherited by each form that can ask for
    /// one at runtime: the scripted object itself, any quest with a script,
    /// and every placed reference through its base (spec §4.8, §8 Scenario E).
    pub variable_db: HashMap<FormId, HashMap<u32, String>>,

    pub total_records_processed: u64,

    /// Count of scanned main records whose kind tag had neither a bespoke
    /// handler nor a generic fallback attempted — should stay empty; present
    /// so a caller can tell "zero of this kind existed" from "this kind
    /// wasn't processed at all" (spec §7).
    pub unreconstructed_type_counts: HashMap<String, u64>,
}

impl SemanticReconstructionResult {
    pub fn editor_id(&self, form_id: FormId) -> Option<&str> {
        self.identifiers.editor_id(form_id)
    }

    pub fn display_name(&self, form_id: FormId) -> Option<&str> {
        self.identifiers.display_name(form_id)
    }
}
