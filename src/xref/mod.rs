/**
 * Cross-reference builder (component C8, spec §4.8): the pass that links
 * independently-reconstructed entities together now that every kind has been
 * built and merged. Split into three focused passes that each need a
 * different slice of the result: `cell_world` (cell/worldspace/placed-ref
 * geometry), `object_script` (script attachment and variable binding),
 * `dialogue` (topic/line linking and propagation).
 */
pub mod cell_world;
pub mod dialogue;
pub mod object_script;
