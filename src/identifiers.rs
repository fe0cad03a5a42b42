/**
 * Identifier index (component C5).
 *
 * Bidirectional mapping between form-id and editor-id, plus an overlay of
 * display names. Construction merges four sources in order (spec §4.5):
 * editor-id subrecords correlated to their nearest preceding main record,
 * caller-supplied correlations, runtime table entries, and a short list of
 * hardcoded engine-internal identifiers. Every write is `try_add`:
 * first-write-wins, later writes for the same key are silently discarded.
 *
 * The reverse map (editor-id, case-insensitive -> form-id) is rebuilt lazily
 * from the forward map so it can never go stale relative to it.
 */
use crate::common::FormId;
use std::cell::RefCell;
use std::collections::HashMap;

#[derive(Debug, thiserror::Error)]
pub enum IdentifierIndexError {
    #[error("duplicate editor-id in caller-supplied correlations: {0}")]
    DuplicateCorrelation(String),
}

#[derive(Debug, Default)]
pub struct IdentifierIndex {
    editor_ids: HashMap<FormId, String>,
    display_names: HashMap<FormId, String>,
    reverse: RefCell<Option<HashMap<String, FormId>>>,
}

impl IdentifierIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hardcoded engine-internal identifiers always present (spec §4.5 step 4).
    pub fn with_builtin_identifiers() -> Self {
        let mut idx = Self::new();
        idx.try_add_editor_id(FormId(0x0000_0014), "PlayerRef".to_string());
        idx
    }

    /// First-write-wins: returns `true` if the value was newly inserted.
    pub fn try_add_editor_id(&mut self, form_id: FormId, editor_id: String) -> bool {
        if form_id.is_none() || editor_id.is_empty() {
            return false;
        }
        if self.editor_ids.contains_key(&form_id) {
            return false;
        }
        self.editor_ids.insert(form_id, editor_id);
        self.invalidate_reverse();
        true
    }

    pub fn try_add_display_name(&mut self, form_id: FormId, display_name: String) -> bool {
        if form_id.is_none() || display_name.is_empty() {
            return false;
        }
        if self.display_names.contains_key(&form_id) {
            return false;
        }
        self.display_names.insert(form_id, display_name);
        true
    }

    /// Applies caller-supplied correlations (spec §4.5 step 2). Rejects the
    /// batch if it contains an internal duplicate editor-id — the one fatal
    /// construction-time invariant violation named in spec §7.
    pub fn apply_correlations(
        &mut self,
        correlations: &[(FormId, String)],
    ) -> Result<(), IdentifierIndexError> {
        let mut seen = std::collections::HashSet::new();
        for (_, editor_id) in correlations {
            let key = editor_id.to_lowercase();
            if !seen.insert(key) {
                return Err(IdentifierIndexError::DuplicateCorrelation(editor_id.clone()));
            }
        }
        for (form_id, editor_id) in correlations {
            self.try_add_editor_id(*form_id, editor_id.clone());
        }
        Ok(())
    }

    pub fn editor_id(&self, form_id: FormId) -> Option<&str> {
        self.editor_ids.get(&form_id).map(|s| s.as_str())
    }

    pub fn display_name(&self, form_id: FormId) -> Option<&str> {
        self.display_names.get(&form_id).map(|s| s.as_str())
    }

    fn invalidate_reverse(&mut self) {
        *self.reverse.borrow_mut() = None;
    }

    /// Case-insensitive reverse lookup; collisions resolved by first-seen in
    /// forward-map iteration order is not deterministic over a HashMap, so
    /// the reverse map is built deterministically by sorting form-ids first.
    pub fn form_id_by_editor_id(&self, editor_id: &str) -> Option<FormId> {
        if self.reverse.borrow().is_none() {
            let mut pairs: Vec<_> = self.editor_ids.iter().collect();
            pairs.sort_by_key(|(form_id, _)| **form_id);
            let mut rev = HashMap::new();
            for (form_id, eid) in pairs {
                rev.entry(eid.to_lowercase()).or_insert(*form_id);
            }
            *self.reverse.borrow_mut() = Some(rev);
        }
        self.reverse
            .borrow()
            .as_ref()
            .unwrap()
            .get(&editor_id.to_lowercase())
            .copied()
    }

    pub fn editor_ids(&self) -> &HashMap<FormId, String> {
        &self.editor_ids
    }

    pub fn display_names(&self) -> &HashMap<FormId, String> {
        &self.display_names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_write_wins() {
        let mut idx = IdentifierIndex::new();
        assert!(idx.try_add_editor_id(FormId(1), "Foo".into()));
        assert!(!idx.try_add_editor_id(FormId(1), "Bar".into()));
        assert_eq!(idx.editor_id(FormId(1)), Some("Foo"));
    }

    #[test]
    fn zero_form_id_never_added() {
        let mut idx = IdentifierIndex::new();
        assert!(!idx.try_add_editor_id(FormId::NONE, "X".into()));
    }

    #[test]
    fn reverse_lookup_case_insensitive() {
        let mut idx = IdentifierIndex::new();
        idx.try_add_editor_id(FormId(1), "PlayerRef".into());
        assert_eq!(idx.form_id_by_editor_id("playerref"), Some(FormId(1)));
    }

    #[test]
    fn duplicate_correlation_rejected() {
        let mut idx = IdentifierIndex::new();
        let err = idx
            .apply_correlations(&[(FormId(1), "Dup".into()), (FormId(2), "dup".into())])
            .unwrap_err();
        matches!(err, IdentifierIndexError::DuplicateCorrelation(_));
    }

    #[test]
    fn builtin_player_ref_present() {
        let idx = IdentifierIndex::with_builtin_identifiers();
        assert_eq!(idx.editor_id(FormId(0x14)), Some("PlayerRef"));
    }
}
