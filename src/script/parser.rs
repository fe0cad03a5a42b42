/**
 * Script parsing, pass 1 (spec §4.9 step 1): walks a `SCPT` record's
 * subrecords and builds the variable table plus the raw compiled bytecode,
 * without attempting to decompile it yet. `SLSD`/`SCVR` pairs define the
 * local variable table (each `SLSD` carries the slot index, the `SCVR`
 * immediately following it carries the name); `SCRO` entries are the global
 * form-ids the bytecode references by index.
 */
use crate::accessor::{read_record_data, ByteAccessor};
use crate::common::{FormId, MainRecordHeader, Tag};
use crate::config::ReconConfig;
use crate::identifiers::IdentifierIndex;
use crate::kinds::common::{note_common_subrecord, EntityCommon};
use crate::primitives::{cstring_from_bytes, read_i32, read_u32};
use crate::subrecord::iter_subrecords;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScriptVariable {
    pub index: u32,
    pub name: Option<String>,
    /// `true` when the variable's name carries the engine's reference-type
    /// suffix convention (spec §4.9: a name ending in "Ref" holds a form-id
    /// rather than a float).
    pub is_reference: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Script {
    pub common: EntityCommon,
    pub script_type: Option<i32>,
    pub variables: Vec<ScriptVariable>,
    pub referenced_forms: Vec<FormId>,
    pub compiled_data: Option<Vec<u8>>,
    pub source_text: Option<String>,
    /// Filled in by pass 2 (`decompile`) once it runs; `None` until then, and
    /// still `None` if `compiled_data` was never populated.
    pub decompiled: Option<String>,
}

impl Script {
    fn shallow(header: &MainRecordHeader) -> Self {
        Script {
            common: EntityCommon::shallow(header.form_id, header.offset, header.is_big_endian),
            script_type: None,
            variables: Vec::new(),
            referenced_forms: Vec::new(),
            compiled_data: None,
            source_text: None,
            decompiled: None,
        }
    }
}

pub fn reconstruct_scripts(
    headers: &[MainRecordHeader],
    accessor: Option<&dyn ByteAccessor>,
    idx: &mut IdentifierIndex,
    cfg: &ReconConfig,
) -> Vec<Script> {
    let _ = Tag::new(*b"SCPT");
    headers
        .iter()
        .map(|header| parse_one(header, accessor, idx, cfg))
        .collect()
}

fn parse_one(
    header: &MainRecordHeader,
    accessor: Option<&dyn ByteAccessor>,
    idx: &mut IdentifierIndex,
    cfg: &ReconConfig,
) -> Script {
    let mut script = Script::shallow(header);
    let Some(accessor) = accessor else { return script };
    let Some(body) = read_record_data(accessor, header, cfg.buffer_size_for("SCPT")) else {
        return script;
    };

    let endian = header.endian();
    let mut pending_var_index: Option<u32> = None;

    for sub in iter_subrecords(body.as_slice(), endian) {
        let data = &body.as_slice()[sub.data_offset..sub.data_offset + sub.data_len];
        let mut editor_id = script.common.editor_id.clone();
        if note_common_subrecord(sub.tag, data, header.form_id, idx, &mut editor_id) {
            script.common.editor_id = editor_id;
            continue;
        }
        match sub.tag.as_str() {
            Some("SCHR") => {
                // ref_count u32, compiled_size u32, var_count u32, script_type i32
                script.script_type = read_i32(data, 12, endian);
            }
            Some("SLSD") => {
                if let Some(index) = read_u32(data, 0, endian) {
                    script.variables.push(ScriptVariable {
                        index,
                        name: None,
                        is_reference: false,
                    });
                    pending_var_index = Some(index);
                }
            }
            Some("SCVR") => {
                let name = cstring_from_bytes(data);
                let is_reference = name.to_ascii_lowercase().ends_with("ref");
                if let Some(index) = pending_var_index.take() {
                    if let Some(var) = script.variables.iter_mut().find(|v| v.index == index) {
                        var.name = Some(name);
                        var.is_reference = is_reference;
                    }
                }
            }
            Some("SCRO") => {
                if let Some(form_id) = read_u32(data, 0, endian) {
                    script.referenced_forms.push(FormId(form_id));
                }
            }
            Some("SCDA") => script.compiled_data = Some(data.to_vec()),
            Some("SCTX") => script.source_text = Some(cstring_from_bytes(data)),
            _ => {}
        }
    }

    script
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accessor::SliceAccessor;

    #[test]
    fn variable_table_pairs_slsd_with_following_scvr() {
        let mut body = Vec::new();
        body.extend_from_slice(b"SLSD");
        body.extend_from_slice(&12u16.to_be_bytes());
        body.extend_from_slice(&1u32.to_be_bytes());
        body.extend_from_slice(&[0u8; 8]);
        body.extend_from_slice(b"SCVR");
        body.extend_from_slice(&8u16.to_be_bytes());
        body.extend_from_slice(b"doorRef\0");

        let mut wire = vec![0u8; 24];
        wire.extend_from_slice(&body);
        let accessor = SliceAccessor(&wire);
        let header = MainRecordHeader {
            kind: Tag::new(*b"SCPT"),
            offset: 0,
            data_size: body.len() as u32,
            flags: 0,
            form_id: FormId(0x600),
            is_compressed: false,
            is_big_endian: true,
        };
        let mut idx = IdentifierIndex::new();
        let cfg = ReconConfig::default();
        let scripts = reconstruct_scripts(&[header], Some(&accessor), &mut idx, &cfg);
        assert_eq!(scripts[0].variables.len(), 1);
        assert_eq!(scripts[0].variables[0].name.as_deref(), Some("doorRef"));
        assert!(scripts[0].variables[0].is_reference);
    }
}
