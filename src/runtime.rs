/**
 * The runtime-reader collaborator (spec §1, §6): an optional interface over
 * a captured in-memory hash-table walk, consumed by the merger (C7) to
 * enrich or create entities the image pass never saw. Every method returns
 * the SAME entity type the image-side handler in `kinds::*` builds, which is
 * what lets `merge` apply one generic create-or-enrich rule per kind instead
 * of maintaining a parallel runtime-only type hierarchy.
 *
 * Mocked in tests via `mockall::automock` the way the teacher mocks its
 * storage layer's query path.
 */
use crate::common::FormId;
use crate::kinds::abilities::ProjectilePhysics;
use crate::kinds::actors::{Creature, Npc};
use crate::kinds::data::Package;
use crate::kinds::items::{Container, Weapon};
use crate::kinds::scenery::Door;
use crate::kinds::text::{DialogueLine, DialogueTopic};
use crate::scan::RuntimeTableEntry;
use crate::script::Script;

#[cfg_attr(test, mockall::automock)]
pub trait RuntimeReader {
    fn read_runtime_npc(&self, entry: &RuntimeTableEntry) -> Option<Npc>;
    fn read_runtime_creature(&self, entry: &RuntimeTableEntry) -> Option<Creature>;
    fn read_runtime_weapon(&self, entry: &RuntimeTableEntry) -> Option<Weapon>;
    fn read_runtime_container(&self, entry: &RuntimeTableEntry) -> Option<Container>;
    fn read_runtime_door(&self, entry: &RuntimeTableEntry) -> Option<Door>;
    fn read_runtime_script(&self, entry: &RuntimeTableEntry) -> Option<Script>;
    /// AI packages have no image-side field detail beyond a name (spec §3
    /// "data"), so the runtime variant only ever creates — never enriches.
    fn read_runtime_package(&self, entry: &RuntimeTableEntry) -> Option<Package>;
    fn read_runtime_dialogue_topic(&self, entry: &RuntimeTableEntry) -> Option<DialogueTopic>;
    fn read_runtime_dialogue_info(&self, entry: &RuntimeTableEntry) -> Option<DialogueLine>;

    /// Reads a projectile's physics block directly, since the runtime layout
    /// keeps it in a nested structure the entry alone doesn't address (spec
    /// §6).
    fn read_projectile_physics(&self, entry: &RuntimeTableEntry) -> Option<ProjectilePhysics>;

    /// Walks a dialogue topic's linked-list of info entries starting at its
    /// virtual address, returning each entry's form-id in list order (spec
    /// §4.8 step 1, runtime-table variant).
    fn walk_topic_quest_info_list(&self, topic_va: u64) -> Vec<FormId>;

    /// Reads one dialogue info entry directly by virtual address, used when
    /// walking a topic's list rather than going through the table entry
    /// (spec §4.8).
    fn read_runtime_dialogue_info_from_va(&self, info_va: u64) -> Option<DialogueLine>;

    /// Reads a length-prefixed runtime string type at a virtual address
    /// (spec §6's `BSStringT`-equivalent).
    fn read_bs_string_t(&self, va: u64) -> Option<String>;

    /// Returns every land-data blob the runtime table exposes, paired with
    /// the worldspace/cell form-id that owns it (spec §4.6 cell linkage).
    fn read_all_runtime_land_data(&self) -> Vec<(FormId, Vec<u8>)>;
}
