/**
 * Record handlers (component C6): one submodule per entity family from
 * spec §3, each exposing a `reconstruct_*` function that turns a slice of
 * scanned main-record headers into typed entities. Kinds with no bespoke
 * field detail in the scan data ride `generic::reconstruct_generic`, the
 * fallback spec §3's "non-exhaustive but representative" kind list calls
 * for explicitly.
 */
pub mod abilities;
pub mod actors;
pub mod common;
pub mod data;
pub mod generic;
pub mod items;
pub mod scenery;
pub mod text;
pub mod world;

/// Every bespoke record kind this engine knows how to decode structurally.
/// Anything else in `ScanResult::headers_by_kind` falls back to
/// `generic::GenericRecord`.
pub const KNOWN_KIND_TAGS: &[&str] = &[
    "NPC_", "CREA", "RACE", "FACT", "WEAP", "AMMO", "ARMO", "ALCH", "MISC", "KEYM", "CONT",
    "CELL", "WRLD", "WTHR", "LGTM", "NAVM", "PERK", "SPEL", "MGEF", "ENCH", "PROJ", "EXPL", "GLOB",
    "GMST", "LVLI", "LVLC", "LVLN", "CLAS", "CHAL", "REPU", "RCPE", "WMOD", "PACK", "STAT", "SOUN", "TXST",
    "ARMA", "AVIF", "WATR", "BPTD", "CSTY", "DOOR", "ACTI", "FURN", "LIGH", "BOOK", "NOTE",
    "TERM", "MESG", "QUST", "DIAL", "INFO", "SCPT",
];

/// The leveled-list family spans three parent tags that share one record
/// shape (spec §4.6 "Leveled list (three parent tags map to one family)"):
/// item lists (`LVLI`), creature lists (`LVLC`), NPC lists (`LVLN`).
pub const LEVELED_LIST_KIND_TAGS: &[&str] = &["LVLI", "LVLC", "LVLN"];
