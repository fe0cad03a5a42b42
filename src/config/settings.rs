use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Engine-wide tunable constants. Every field has a default drawn directly
/// from `spec.md`; callers only need a config file to override a heuristic
/// the Open Questions section flags as unverified.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconConfig {
    /// Memory-dump proximity window for cell-ref resolution, in bytes
    /// (spec §4.6, §9: 500 KiB, explicitly "a heuristic").
    #[serde(default = "default_proximity_window")]
    pub cell_ref_proximity_window: u64,

    /// Per-handler scratch buffer size hints, keyed by record kind tag text
    /// (spec §5: typical sizes 256B–64KiB; unlisted kinds use
    /// `default_buffer_size`).
    #[serde(default)]
    pub buffer_size_hints: HashMap<String, usize>,

    #[serde(default = "default_buffer_size")]
    pub default_buffer_size: usize,

    /// Dialogue sibling-propagation threshold (spec §4.8 step 5): fraction of
    /// lines under a topic that must share an attribute before it propagates.
    #[serde(default = "default_sibling_threshold")]
    pub dialogue_sibling_threshold: f32,

    /// Dialogue quest-level propagation threshold (spec §4.8 step 6).
    #[serde(default = "default_quest_threshold")]
    pub dialogue_quest_threshold: f32,

    /// Fallback dialogue-topic kind code, "empirically verified" per spec §9
    /// Open Questions — re-verify against your build before trusting it.
    #[serde(default = "default_dialogue_kind_code")]
    pub fallback_dialogue_kind_code: u8,

    /// Worldspace cell size in world units, used by `InferCellWorldspaces`
    /// (spec §4.6: 4096 units per cell).
    #[serde(default = "default_cell_size_units")]
    pub cell_size_units: f32,
}

fn default_proximity_window() -> u64 {
    500 * 1024
}
fn default_buffer_size() -> usize {
    4096
}
fn default_sibling_threshold() -> f32 {
    0.5
}
fn default_quest_threshold() -> f32 {
    0.6
}
fn default_dialogue_kind_code() -> u8 {
    0x45
}
fn default_cell_size_units() -> f32 {
    4096.0
}

impl Default for ReconConfig {
    fn default() -> Self {
        Self {
            cell_ref_proximity_window: default_proximity_window(),
            buffer_size_hints: HashMap::new(),
            default_buffer_size: default_buffer_size(),
            dialogue_sibling_threshold: default_sibling_threshold(),
            dialogue_quest_threshold: default_quest_threshold(),
            fallback_dialogue_kind_code: default_dialogue_kind_code(),
            cell_size_units: default_cell_size_units(),
        }
    }
}

impl ReconConfig {
    pub fn from_path(path: impl AsRef<std::path::Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("could not read config file: {:?}", path))?;
        let cfg: ReconConfig = toml::from_str(&content)
            .with_context(|| format!("could not parse config file: {:?}", path))?;
        Ok(cfg)
    }

    pub fn buffer_size_for(&self, kind_tag: &str) -> usize {
        self.buffer_size_hints
            .get(kind_tag)
            .copied()
            .unwrap_or(self.default_buffer_size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec() {
        let cfg = ReconConfig::default();
        assert_eq!(cfg.cell_ref_proximity_window, 500 * 1024);
        assert_eq!(cfg.dialogue_sibling_threshold, 0.5);
        assert_eq!(cfg.dialogue_quest_threshold, 0.6);
        assert_eq!(cfg.fallback_dialogue_kind_code, 0x45);
        assert_eq!(cfg.cell_size_units, 4096.0);
    }

    #[test]
    fn from_toml_overrides_one_field() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("recon.toml");
        std::fs::write(&path, "cell_ref_proximity_window = 1024\n").unwrap();
        let cfg = ReconConfig::from_path(&path).unwrap();
        assert_eq!(cfg.cell_ref_proximity_window, 1024);
        assert_eq!(cfg.dialogue_sibling_threshold, 0.5); // still default
    }
}
