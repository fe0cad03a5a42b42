/**
 * Engine configuration: the tunable constants spec.md calls out as
 * heuristics rather than fixed library behavior (the proximity window, the
 * dialogue propagation thresholds, the fallback dialogue kind-code, and
 * per-handler buffer-size hints).
 *
 * Loaded the way the teacher's `Settings::load`/`from_path` do: an optional
 * TOML file, falling back to `ReconConfig::default()`, which reproduces every
 * default value `spec.md` names.
 */

pub mod settings;

pub use settings::ReconConfig;
