/**
 * Shared scaffolding for every record-kind module: the fields every
 * reconstructed entity carries regardless of kind, and the merge helpers C7
 * uses to reconcile an image-derived value with a runtime-derived one.
 *
 * Merge rule (spec §3): "use the image-derived value unless it is
 * empty/zero, then fall back to the runtime value." `merge_option` covers
 * `Option<T>` fields; `merge_scalar` covers the rare non-optional numeric
 * field where zero means unset.
 */
use crate::common::FormId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityCommon {
    pub form_id: FormId,
    pub editor_id: Option<String>,
    pub offset: u64,
    pub is_big_endian: bool,
    pub from_runtime: bool,
}

impl EntityCommon {
    pub fn shallow(form_id: FormId, offset: u64, is_big_endian: bool) -> Self {
        EntityCommon {
            form_id,
            editor_id: None,
            offset,
            is_big_endian,
            from_runtime: false,
        }
    }
}

pub fn merge_option<T>(image: Option<T>, runtime: Option<T>) -> Option<T> {
    image.or(runtime)
}

pub fn merge_scalar<T: Default + PartialEq>(image: T, runtime: T) -> T {
    if image != T::default() {
        image
    } else {
        runtime
    }
}

pub fn merge_form_id(image: FormId, runtime: FormId) -> FormId {
    if !image.is_none() {
        image
    } else {
        runtime
    }
}

/// Applies the two universal write-through rules every handler follows
/// (spec §4.6): an `EDID` subrecord feeds the identifier index's editor-id,
/// a `FULL` subrecord feeds its display-name. Returns `true` if the
/// subrecord tag was one of these two (callers skip dispatching it further).
pub fn note_common_subrecord(
    tag: crate::common::Tag,
    data: &[u8],
    form_id: FormId,
    idx: &mut crate::identifiers::IdentifierIndex,
    editor_id_out: &mut Option<String>,
) -> bool {
    use crate::primitives::cstring_from_bytes;
    match tag.as_str() {
        Some("EDID") => {
            let s = cstring_from_bytes(data);
            idx.try_add_editor_id(form_id, s.clone());
            *editor_id_out = Some(s);
            true
        }
        Some("FULL") => {
            idx.try_add_display_name(form_id, cstring_from_bytes(data));
            true
        }
        _ => false,
    }
}
