/**
 * Object-to-script attachment and variable binding (spec §4.8, §8 Scenario E).
 *
 * Every kind whose image schema carries a direct `SCRI` attachment feeds
 * `build_object_script_map`: actors, quests, factions, every inventory item,
 * and the scripted scenery kinds (door, activator, furniture, light, book).
 * Leveled lists have no script of their own in this record set and are not
 * represented here.
 *
 * A script's reference-typed local variables ("Ref"-suffixed by convention,
 * spec §4.9) need to be bound to the form they actually point at. Two
 * binding paths are resolved in `resolve_variable_bindings`, tried in order:
 *
 * 1. Explicit: the script's own `SCRO` list gives an ordered set of
 *    referenced forms; reference-typed variables are bound to that list
 *    positionally, in variable-index order among reference variables.
 * 2. Self-reference convention: a reference variable left unbound by path 1
 *    binds to the object the script is directly attached to, if any.
 *
 * `build_variable_db` answers a different question — not "what form does
 * this variable point at" but "what named variables does this form carry at
 * all", keyed by the form that would ask for one at runtime (spec §8
 * Scenario E). Four paths feed it, in order:
 *
 * 1. A quest with an attached script inherits that script's variable table.
 * 2. Any other object with an attached script inherits that script's table
 *    the same way.
 * 3. A placed reference inherits its base object's table, transitively
 *    through however many of the above paths produced the base's entry.
 * 4. Naming-convention fallback: an object whose editor-id ends in `REF`
 *    with no base link of its own inherits the table of the object whose
 *    editor-id is the same string with that suffix stripped, if one exists
 *    and already has an entry (spec §9: heuristic, used only when the
 *    structural link is missing).
 *
 * A quest-alias-scoped binding path (a script variable bound through a
 * quest's alias table rather than its own `SCRO` list) is not modeled —
 * quest aliases never made it into the reconstructed `Quest` shape, so that
 * binding stays unresolved (`bound_object: None`) until a future pass adds
 * alias data (recorded as an open question in the grounding ledger).
 */
use crate::common::FormId;
use crate::identifiers::IdentifierIndex;
use crate::kinds::actors::{Creature, Faction, Npc};
use crate::kinds::items::{Ammunition, Armor, Consumable, Container, Key, MiscItem, Weapon};
use crate::kinds::scenery::{Activator, Door, Furniture, Light};
use crate::kinds::text::{Book, Quest};
use crate::kinds::world::PlacedReference;
use crate::script::Script;
use std::collections::HashMap;

#[derive(Debug, Clone)]
pub struct VariableBinding {
    pub script: FormId,
    pub variable_index: u32,
    pub bound_object: Option<FormId>,
}

/// Every kind that can own a `SCRI` attachment, gathered into one
/// object-form-id -> script-form-id map. Order of the calls below doesn't
/// matter: each kind's own form-ids are disjoint from every other's.
#[allow(clippy::too_many_arguments)]
pub fn build_object_script_map(
    npcs: &[Npc],
    creatures: &[Creature],
    factions: &[Faction],
    quests: &[Quest],
    weapons: &[Weapon],
    armor: &[Armor],
    consumables: &[Consumable],
    misc_items: &[MiscItem],
    keys: &[Key],
    containers: &[Container],
    ammunition: &[Ammunition],
    doors: &[Door],
    activators: &[Activator],
    furniture: &[Furniture],
    lights: &[Light],
    books: &[Book],
) -> HashMap<FormId, FormId> {
    let mut map = HashMap::new();
    macro_rules! collect {
        ($entities:expr) => {
            for entity in $entities {
                if let Some(script) = entity.script {
                    map.insert(entity.common.form_id, script);
                }
            }
        };
    }
    collect!(npcs);
    collect!(creatures);
    collect!(factions);
    collect!(quests);
    collect!(weapons);
    collect!(armor);
    collect!(consumables);
    collect!(misc_items);
    collect!(keys);
    collect!(containers);
    collect!(ammunition);
    collect!(doors);
    collect!(activators);
    collect!(furniture);
    collect!(lights);
    collect!(books);
    map
}

pub fn resolve_variable_bindings(
    scripts: &[Script],
    object_script_map: &HashMap<FormId, FormId>,
) -> Vec<VariableBinding> {
    let mut script_to_object: HashMap<FormId, FormId> = HashMap::new();
    for (object, script) in object_script_map {
        script_to_object.insert(*script, *object);
    }

    let mut bindings = Vec::new();
    for script in scripts {
        let attaching_object = script_to_object.get(&script.common.form_id).copied();
        let reference_vars: Vec<&crate::script::ScriptVariable> =
            script.variables.iter().filter(|v| v.is_reference).collect();

        for (position, var) in reference_vars.iter().enumerate() {
            let bound_object = script
                .referenced_forms
                .get(position)
                .copied()
                .filter(|f| !f.is_none())
                .or(attaching_object);
            bindings.push(VariableBinding {
                script: script.common.form_id,
                variable_index: var.index,
                bound_object,
            });
        }
    }
    bindings
}

/// Builds the form-id -> {variable index -> name} database (spec §4.8, §8
/// Scenario E). Strips unnamed slots — a variable with no `SCVR` name isn't
/// addressable by name and has nothing to contribute here.
pub fn build_variable_db(
    scripts: &[Script],
    object_script_map: &HashMap<FormId, FormId>,
    placed_refs: &[PlacedReference],
    idx: &IdentifierIndex,
) -> HashMap<FormId, HashMap<u32, String>> {
    let variables_by_script: HashMap<FormId, HashMap<u32, String>> = scripts
        .iter()
        .map(|script| {
            let vars: HashMap<u32, String> = script
                .variables
                .iter()
                .filter_map(|v| v.name.clone().map(|name| (v.index, name)))
                .collect();
            (script.common.form_id, vars)
        })
        .collect();

    let mut db: HashMap<FormId, HashMap<u32, String>> = HashMap::new();

    // Paths 1 and 2: any object with an attached script (quest included)
    // inherits that script's named variables directly.
    for (object, script) in object_script_map {
        if let Some(vars) = variables_by_script.get(script) {
            if !vars.is_empty() {
                db.insert(*object, vars.clone());
            }
        }
    }

    // Path 3: a placed reference inherits its base object's table.
    for placed in placed_refs {
        if db.contains_key(&placed.common.form_id) {
            continue;
        }
        if let Some(vars) = db.get(&placed.base_form_id) {
            db.insert(placed.common.form_id, vars.clone());
        }
    }

    // Path 4: naming-convention fallback for objects still missing an entry.
    // `["EditorIdREF"]` inherits from the object named `"EditorId"` if that
    // object already has a variable table of its own.
    let candidates: Vec<FormId> = idx
        .editor_ids()
        .iter()
        .filter(|(form_id, editor_id)| !db.contains_key(form_id) && editor_id.ends_with("REF"))
        .map(|(form_id, _)| *form_id)
        .collect();
    for form_id in candidates {
        let Some(editor_id) = idx.editor_id(form_id) else { continue };
        let base_name = &editor_id[..editor_id.len() - "REF".len()];
        if base_name.is_empty() {
            continue;
        }
        if let Some(base_id) = idx.form_id_by_editor_id(base_name) {
            if let Some(vars) = db.get(&base_id) {
                db.insert(form_id, vars.clone());
            }
        }
    }

    db
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kinds::common::EntityCommon;
    use crate::script::ScriptVariable;

    #[test]
    fn explicit_scro_binding_takes_priority() {
        let script = Script {
            common: EntityCommon::shallow(FormId(1), 0, true),
            script_type: None,
            variables: vec![ScriptVariable {
                index: 0,
                name: Some("targetRef".to_string()),
                is_reference: true,
            }],
            referenced_forms: vec![FormId(0xABC)],
            compiled_data: None,
            source_text: None,
            decompiled: None,
        };
        let map = HashMap::new();
        let bindings = resolve_variable_bindings(&[script], &map);
        assert_eq!(bindings[0].bound_object, Some(FormId(0xABC)));
    }

    #[test]
    fn self_reference_convention_used_when_no_scro_entry() {
        let script = Script {
            common: EntityCommon::shallow(FormId(2), 0, true),
            script_type: None,
            variables: vec![ScriptVariable {
                index: 0,
                name: Some("selfRef".to_string()),
                is_reference: true,
            }],
            referenced_forms: vec![],
            compiled_data: None,
            source_text: None,
            decompiled: None,
        };
        let mut map = HashMap::new();
        map.insert(FormId(0x10), FormId(2));
        let bindings = resolve_variable_bindings(&[script], &map);
        assert_eq!(bindings[0].bound_object, Some(FormId(0x10)));
    }

    fn script_with_vars(form_id: u32, vars: &[(u32, &str)]) -> Script {
        Script {
            common: EntityCommon::shallow(FormId(form_id), 0, true),
            script_type: None,
            variables: vars
                .iter()
                .map(|&(index, name)| ScriptVariable {
                    index,
                    name: Some(name.to_string()),
                    is_reference: false,
                })
                .collect(),
            referenced_forms: vec![],
            compiled_data: None,
            source_text: None,
            decompiled: None,
        }
    }

    fn placed(form_id: u32, base: u32) -> PlacedReference {
        PlacedReference {
            common: EntityCommon::shallow(FormId(form_id), 0, true),
            base_form_id: FormId(base),
            position: None,
            rotation: None,
            scale: None,
            enable_parent: None,
            is_marker: false,
            cell: None,
        }
    }

    #[test]
    fn scenario_e_placed_ref_inherits_base_script_variables() {
        let scripts = vec![script_with_vars(5, &[(0, "fTimer"), (1, "iStage")])];
        let mut object_script_map = HashMap::new();
        object_script_map.insert(FormId(9), FormId(5));
        let placed_refs = vec![placed(17, 9)];
        let idx = IdentifierIndex::new();

        let db = build_variable_db(&scripts, &object_script_map, &placed_refs, &idx);
        let vars = db.get(&FormId(17)).expect("placed ref should inherit a variable table");
        assert_eq!(vars.get(&0).map(String::as_str), Some("fTimer"));
        assert_eq!(vars.get(&1).map(String::as_str), Some("iStage"));
    }

    #[test]
    fn naming_convention_fallback_links_ref_suffixed_object() {
        let scripts = vec![script_with_vars(5, &[(0, "fTimer")])];
        let mut object_script_map = HashMap::new();
        object_script_map.insert(FormId(9), FormId(5));
        let mut idx = IdentifierIndex::new();
        idx.try_add_editor_id(FormId(9), "MyTrap".to_string());
        idx.try_add_editor_id(FormId(20), "MyTrapREF".to_string());

        let db = build_variable_db(&scripts, &object_script_map, &[], &idx);
        let vars = db.get(&FormId(20)).expect("REF-suffixed object should inherit via naming convention");
        assert_eq!(vars.get(&0).map(String::as_str), Some("fTimer"));
    }
}
