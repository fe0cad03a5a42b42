/**
 * Semantic Reconstruction Engine for Xbox 360 game-data recovery.
 *
 * Turns a raw byte image plus a low-level scan result into a strongly-typed,
 * cross-referenced graph of game entities (NPCs, creatures, quests, dialogue
 * trees, items, worldspaces with cells and placed references, scripts with
 * decompiled bytecode, and more).
 *
 * Module map:
 *
 * - `primitives`  : endian-aware fixed-width reads, null-terminated strings (C1)
 * - `subrecord`   : lazy subrecord iterator over a record body (C2)
 * - `schema`      : `(subrecord-tag, parent-tag, length) -> fields` registry (C3)
 * - `accessor`    : record-data reads, decompression, pooled scratch buffers (C4)
 * - `identifiers` : form-id <-> editor-id / display-name index (C5)
 * - `kinds`       : one handler family per record kind (C6)
 * - `runtime`     : runtime-table merge against live C++ objects (C7)
 * - `xref`        : object/script, cell/worldspace, dialogue cross-references (C8)
 * - `script`      : two-pass script parsing and bytecode decompilation (C9)
 * - `orchestrator`: fixed-order composition of everything above (C10)
 * - `config`      : tunable heuristics (proximity window, thresholds, buffer sizes)
 * - `logger`      : telemetry sink for recoverable per-record failures
 * - `error`       : the handful of conditions that do abort (`ReconError`)
 * - `result`      : `SemanticReconstructionResult`, the one type this crate produces
 * - `scan`        : the scan-result types consumed from the external scanner
 * - `common`      : shared newtypes (`FormId`, `Tag`) and small helpers
 * - `merge`       : split-record and runtime-enrichment merge helpers shared across kinds
 *
 * Exports publics :
 * - `reconstruct_all` : the sole entry point (orchestrator::reconstruct_all)
 * - `ByteAccessor`, `RuntimeReader` : the two traits this crate consumes
 * - `SemanticReconstructionResult` : the one type this crate produces
 * - `ReconConfig` : tunable engine configuration
 */

pub mod accessor;
pub mod common;
pub mod config;
pub mod error;
pub mod identifiers;
pub mod kinds;
pub mod logger;
pub mod merge;
pub mod orchestrator;
pub mod primitives;
pub mod result;
pub mod runtime;
pub mod scan;
pub mod schema;
pub mod script;
pub mod subrecord;
pub mod xref;

pub use accessor::{read_record_data, ByteAccessor};
pub use common::{FormId, Tag};
pub use config::ReconConfig;
pub use error::ReconError;
pub use orchestrator::reconstruct_all;
pub use result::SemanticReconstructionResult;
pub use runtime::RuntimeReader;
