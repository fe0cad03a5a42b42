/**
 * Script pipeline (component C9): parse a script record's subrecords into a
 * typed `Script` with its variable table and raw compiled bytecode (pass 1,
 * `parser`), then decompile that bytecode into readable pseudo-source (pass
 * 2, `decompile`). The two passes are kept separate because the merger (C7)
 * needs pass 1's output immediately but defers pass 2 until every script has
 * been discovered, matching spec §4.9's two-pass structure.
 */
pub mod decompile;
pub mod parser;

pub use decompile::{DecompileError, Decompiler};
pub use parser::{reconstruct_scripts, Script, ScriptVariable};
