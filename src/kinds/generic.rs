/**
 * Fallback for any record kind not given a bespoke struct (spec §3: "kinds
 * (non-exhaustive)"). Stores the editor-id/display-name overlay plus every
 * subrecord tag seen, each mapped to its raw payload bytes. Never decoded
 * further — a caller that cares about a specific unmodeled kind reads the
 * raw bytes itself.
 */
use crate::accessor::{read_record_data, ByteAccessor};
use crate::common::MainRecordHeader;
use crate::config::ReconConfig;
use crate::identifiers::IdentifierIndex;
use crate::kinds::common::{note_common_subrecord, EntityCommon};
use crate::subrecord::iter_subrecords;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenericRecord {
    pub common: EntityCommon,
    pub kind: String,
    pub subrecords: HashMap<String, Vec<u8>>,
}

pub fn reconstruct_generic(
    kind_tag: &str,
    headers: &[MainRecordHeader],
    accessor: Option<&dyn ByteAccessor>,
    idx: &mut IdentifierIndex,
    cfg: &ReconConfig,
) -> Vec<GenericRecord> {
    headers
        .iter()
        .map(|header| {
            let mut record = GenericRecord {
                common: EntityCommon::shallow(header.form_id, header.offset, header.is_big_endian),
                kind: kind_tag.to_string(),
                subrecords: HashMap::new(),
            };
            let Some(accessor) = accessor else { return record };
            let Some(body) = read_record_data(accessor, header, cfg.buffer_size_for(kind_tag)) else {
                return record;
            };
            let endian = header.endian();
            for sub in iter_subrecords(body.as_slice(), endian) {
                let data = &body.as_slice()[sub.data_offset..sub.data_offset + sub.data_len];
                let mut editor_id = record.common.editor_id.clone();
                if note_common_subrecord(sub.tag, data, header.form_id, idx, &mut editor_id) {
                    record.common.editor_id = editor_id;
                    continue;
                }
                record
                    .subrecords
                    .insert(sub.tag.to_string(), data.to_vec());
            }
            record
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accessor::SliceAccessor;
    use crate::common::{FormId, Tag};

    #[test]
    fn unmodeled_kind_keeps_raw_subrecords() {
        let mut body = Vec::new();
        body.extend_from_slice(b"EDID");
        body.extend_from_slice(&4u16.to_be_bytes());
        body.extend_from_slice(b"abc\0");
        body.extend_from_slice(b"ZZZZ");
        body.extend_from_slice(&3u16.to_be_bytes());
        body.extend_from_slice(b"xyz");

        let mut wire = vec![0u8; 24];
        wire.extend_from_slice(&body);
        let accessor = SliceAccessor(&wire);
        let header = MainRecordHeader {
            kind: Tag::new(*b"ZZZZ"),
            offset: 0,
            data_size: body.len() as u32,
            flags: 0,
            form_id: FormId(0x500),
            is_compressed: false,
            is_big_endian: true,
        };
        let mut idx = IdentifierIndex::new();
        let cfg = ReconConfig::default();
        let records = reconstruct_generic("ZZZZ", &[header], Some(&accessor), &mut idx, &cfg);
        assert_eq!(records[0].common.editor_id.as_deref(), Some("abc"));
        assert_eq!(records[0].subrecords.get("ZZZZ"), Some(&b"xyz".to_vec()));
    }
}
