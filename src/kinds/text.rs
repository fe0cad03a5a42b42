/**
 * Text and logic records not owned by the script pipeline: book, note,
 * terminal, message, quest, dialogue topic, dialogue line (spec §3 "text and
 * logic"). Dialogue topic/line linking and the sibling/quest-level
 * propagation pass live in `xref::dialogue`, which needs every line under a
 * topic at once; this module only builds each record's own fields.
 */
use crate::accessor::{read_record_data, ByteAccessor};
use crate::common::{FormId, MainRecordHeader, Tag};
use crate::config::ReconConfig;
use crate::identifiers::IdentifierIndex;
use crate::kinds::common::{merge_form_id, merge_option, note_common_subrecord, EntityCommon};
use crate::primitives::{cstring_from_bytes, read_u32};
use crate::schema::SCHEMA;
use crate::subrecord::iter_subrecords;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Book {
    pub common: EntityCommon,
    pub full_name: Option<String>,
    pub text: Option<String>,
    pub flags: Option<u8>,
    pub skill: Option<i8>,
    pub value: Option<i32>,
    pub weight: Option<f32>,
    pub script: Option<FormId>,
}

pub fn reconstruct_books(
    headers: &[MainRecordHeader],
    accessor: Option<&dyn ByteAccessor>,
    idx: &mut IdentifierIndex,
    cfg: &ReconConfig,
) -> Vec<Book> {
    let parent = Tag::new(*b"BOOK");
    headers
        .iter()
        .map(|header| {
            let mut book = Book {
                common: EntityCommon::shallow(header.form_id, header.offset, header.is_big_endian),
                full_name: None,
                text: None,
                flags: None,
                skill: None,
                value: None,
                weight: None,
                script: None,
            };
            let Some(accessor) = accessor else { return book };
            let Some(body) = read_record_data(accessor, header, cfg.buffer_size_for("BOOK")) else {
                return book;
            };
            let endian = header.endian();
            for sub in iter_subrecords(body.as_slice(), endian) {
                let data = &body.as_slice()[sub.data_offset..sub.data_offset + sub.data_len];
                let mut editor_id = book.common.editor_id.clone();
                if note_common_subrecord(sub.tag, data, header.form_id, idx, &mut editor_id) {
                    book.common.editor_id = editor_id;
                    continue;
                }
                match sub.tag.as_str() {
                    Some("FULL") => book.full_name = Some(cstring_from_bytes(data)),
                    Some("DESC") | Some("CNAM") => book.text = Some(cstring_from_bytes(data)),
                    Some("SCRI") => book.script = read_u32(data, 0, endian).map(FormId),
                    Some("DATA") => {
                        if let Some(decoded) = SCHEMA.decode(sub.tag, Some(parent), data, endian) {
                            book.flags = decoded.get("flags").and_then(|v| v.as_u32()).map(|v| v as u8);
                            book.skill = decoded
                                .get("skill")
                                .and_then(|v| v.as_u32())
                                .map(|v| v as i8);
                            book.value = decoded.get("value").and_then(|v| v.as_u32()).map(|v| v as i32);
                            book.weight = decoded.get("weight").and_then(|v| v.as_f32());
                        }
                    }
                    _ => {}
                }
            }
            book
        })
        .collect()
}

pub fn enrich_book_from_runtime(existing: &mut Book, runtime: Book) {
    existing.common.from_runtime = true;
    existing.full_name = merge_option(existing.full_name.take(), runtime.full_name);
    existing.text = merge_option(existing.text.take(), runtime.text);
    existing.flags = merge_option(existing.flags.take(), runtime.flags);
    existing.skill = merge_option(existing.skill.take(), runtime.skill);
    existing.value = merge_option(existing.value.take(), runtime.value);
    existing.weight = merge_option(existing.weight.take(), runtime.weight);
    existing.script = merge_option(existing.script.take(), runtime.script);
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Note {
    pub common: EntityCommon,
    pub full_name: Option<String>,
    pub text: Option<String>,
}

pub fn reconstruct_notes(
    headers: &[MainRecordHeader],
    accessor: Option<&dyn ByteAccessor>,
    idx: &mut IdentifierIndex,
    cfg: &ReconConfig,
) -> Vec<Note> {
    headers
        .iter()
        .map(|header| {
            let mut note = Note {
                common: EntityCommon::shallow(header.form_id, header.offset, header.is_big_endian),
                full_name: None,
                text: None,
            };
            let Some(accessor) = accessor else { return note };
            let Some(body) = read_record_data(accessor, header, cfg.buffer_size_for("NOTE")) else {
                return note;
            };
            let endian = header.endian();
            for sub in iter_subrecords(body.as_slice(), endian) {
                let data = &body.as_slice()[sub.data_offset..sub.data_offset + sub.data_len];
                let mut editor_id = note.common.editor_id.clone();
                if note_common_subrecord(sub.tag, data, header.form_id, idx, &mut editor_id) {
                    note.common.editor_id = editor_id;
                    continue;
                }
                match sub.tag.as_str() {
                    Some("FULL") => note.full_name = Some(cstring_from_bytes(data)),
                    Some("TNAM") => note.text = Some(cstring_from_bytes(data)),
                    _ => {}
                }
            }
            note
        })
        .collect()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Terminal {
    pub common: EntityCommon,
    pub full_name: Option<String>,
}

pub fn reconstruct_terminals(
    headers: &[MainRecordHeader],
    accessor: Option<&dyn ByteAccessor>,
    idx: &mut IdentifierIndex,
    cfg: &ReconConfig,
) -> Vec<Terminal> {
    headers
        .iter()
        .map(|header| {
            let mut terminal = Terminal {
                common: EntityCommon::shallow(header.form_id, header.offset, header.is_big_endian),
                full_name: None,
            };
            let Some(accessor) = accessor else { return terminal };
            let Some(body) = read_record_data(accessor, header, cfg.buffer_size_for("TERM")) else {
                return terminal;
            };
            let endian = header.endian();
            for sub in iter_subrecords(body.as_slice(), endian) {
                let data = &body.as_slice()[sub.data_offset..sub.data_offset + sub.data_len];
                let mut editor_id = terminal.common.editor_id.clone();
                if note_common_subrecord(sub.tag, data, header.form_id, idx, &mut editor_id) {
                    terminal.common.editor_id = editor_id;
                    continue;
                }
                if sub.tag.as_str() == Some("FULL") {
                    terminal.full_name = Some(cstring_from_bytes(data));
                }
            }
            terminal
        })
        .collect()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub common: EntityCommon,
    pub full_name: Option<String>,
    pub text: Option<String>,
}

pub fn reconstruct_messages(
    headers: &[MainRecordHeader],
    accessor: Option<&dyn ByteAccessor>,
    idx: &mut IdentifierIndex,
    cfg: &ReconConfig,
) -> Vec<Message> {
    headers
        .iter()
        .map(|header| {
            let mut message = Message {
                common: EntityCommon::shallow(header.form_id, header.offset, header.is_big_endian),
                full_name: None,
                text: None,
            };
            let Some(accessor) = accessor else { return message };
            let Some(body) = read_record_data(accessor, header, cfg.buffer_size_for("MESG")) else {
                return message;
            };
            let endian = header.endian();
            for sub in iter_subrecords(body.as_slice(), endian) {
                let data = &body.as_slice()[sub.data_offset..sub.data_offset + sub.data_len];
                let mut editor_id = message.common.editor_id.clone();
                if note_common_subrecord(sub.tag, data, header.form_id, idx, &mut editor_id) {
                    message.common.editor_id = editor_id;
                    continue;
                }
                match sub.tag.as_str() {
                    Some("FULL") => message.full_name = Some(cstring_from_bytes(data)),
                    Some("DESC") => message.text = Some(cstring_from_bytes(data)),
                    _ => {}
                }
            }
            message
        })
        .collect()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Quest {
    pub common: EntityCommon,
    pub full_name: Option<String>,
    pub flags: Option<u8>,
    pub priority: Option<u8>,
    /// Quest-owning script (`SCRI`); its variables are the quest's own local
    /// state and are inherited through the object-script map like any other
    /// scripted entity (spec §4.8 path 1).
    pub script: Option<FormId>,
}

pub fn reconstruct_quests(
    headers: &[MainRecordHeader],
    accessor: Option<&dyn ByteAccessor>,
    idx: &mut IdentifierIndex,
    cfg: &ReconConfig,
) -> Vec<Quest> {
    let parent = Tag::new(*b"QUST");
    headers
        .iter()
        .map(|header| {
            let mut quest = Quest {
                common: EntityCommon::shallow(header.form_id, header.offset, header.is_big_endian),
                full_name: None,
                flags: None,
                priority: None,
                script: None,
            };
            let Some(accessor) = accessor else { return quest };
            let Some(body) = read_record_data(accessor, header, cfg.buffer_size_for("QUST")) else {
                return quest;
            };
            let endian = header.endian();
            for sub in iter_subrecords(body.as_slice(), endian) {
                let data = &body.as_slice()[sub.data_offset..sub.data_offset + sub.data_len];
                let mut editor_id = quest.common.editor_id.clone();
                if note_common_subrecord(sub.tag, data, header.form_id, idx, &mut editor_id) {
                    quest.common.editor_id = editor_id;
                    continue;
                }
                match sub.tag.as_str() {
                    Some("FULL") => quest.full_name = Some(cstring_from_bytes(data)),
                    Some("SCRI") => quest.script = read_u32(data, 0, endian).map(FormId),
                    Some("DATA") => {
                        if let Some(decoded) = SCHEMA.decode(sub.tag, Some(parent), data, endian) {
                            quest.flags = decoded.get("flags").and_then(|v| v.as_u32()).map(|v| v as u8);
                            quest.priority = decoded.get("priority").and_then(|v| v.as_u32()).map(|v| v as u8);
                        }
                    }
                    _ => {}
                }
            }
            quest
        })
        .collect()
}

/// A dialogue topic (`DIAL`). Its list of lines is filled in by
/// `xref::dialogue` after every `DialogueLine` has been built, since the
/// split/merge rule (spec §4.8) needs the whole set at once.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DialogueTopic {
    pub common: EntityCommon,
    pub full_name: Option<String>,
    pub quest: Option<FormId>,
    /// Speaker this topic is attached to (`ANAM`); donated to every line
    /// under it that lacks one (spec §4.8 topic-level speaker propagation).
    pub speaker: Option<FormId>,
    pub lines: Vec<FormId>,
}

/// Runtime enrichment for a topic already present from the image side (spec
/// §4.7 step 3); `lines` is left untouched, since the line list is only ever
/// assembled by `xref::dialogue` after both sources have merged.
pub fn enrich_dialogue_topic_from_runtime(existing: &mut DialogueTopic, runtime: DialogueTopic) {
    existing.common.from_runtime = true;
    existing.full_name = merge_option(existing.full_name.take(), runtime.full_name);
    existing.quest = merge_form_id(existing.quest.unwrap_or(FormId::NONE), runtime.quest.unwrap_or(FormId::NONE)).as_option();
    existing.speaker =
        merge_form_id(existing.speaker.unwrap_or(FormId::NONE), runtime.speaker.unwrap_or(FormId::NONE)).as_option();
}

pub fn reconstruct_dialogue_topics(
    headers: &[MainRecordHeader],
    accessor: Option<&dyn ByteAccessor>,
    idx: &mut IdentifierIndex,
    cfg: &ReconConfig,
) -> Vec<DialogueTopic> {
    headers
        .iter()
        .map(|header| {
            let mut topic = DialogueTopic {
                common: EntityCommon::shallow(header.form_id, header.offset, header.is_big_endian),
                full_name: None,
                quest: None,
                speaker: None,
                lines: Vec::new(),
            };
            let Some(accessor) = accessor else { return topic };
            let Some(body) = read_record_data(accessor, header, cfg.buffer_size_for("DIAL")) else {
                return topic;
            };
            let endian = header.endian();
            for sub in iter_subrecords(body.as_slice(), endian) {
                let data = &body.as_slice()[sub.data_offset..sub.data_offset + sub.data_len];
                let mut editor_id = topic.common.editor_id.clone();
                if note_common_subrecord(sub.tag, data, header.form_id, idx, &mut editor_id) {
                    topic.common.editor_id = editor_id;
                    continue;
                }
                match sub.tag.as_str() {
                    Some("FULL") => topic.full_name = Some(cstring_from_bytes(data)),
                    Some("QNAM") => topic.quest = read_u32(data, 0, endian).map(FormId),
                    Some("ANAM") => topic.speaker = read_u32(data, 0, endian).map(FormId),
                    _ => {}
                }
            }
            topic
        })
        .collect()
}

/// Merges split `DIAL` fragments that share a form-id (spec §4.6: the Xbox
/// 360 variant splits some dialogue records into two fragments). Keeps the
/// fragment seen first, filling in any field it lacks from later siblings.
/// Idempotent: re-running on an already-merged set changes nothing, and
/// `merge_split_dialogue_topics(xs.chain(xs)) == merge_split_dialogue_topics(xs)`.
pub fn merge_split_dialogue_topics(topics: Vec<DialogueTopic>) -> Vec<DialogueTopic> {
    let mut order: Vec<FormId> = Vec::new();
    let mut by_id: std::collections::HashMap<FormId, DialogueTopic> = std::collections::HashMap::new();
    for topic in topics {
        match by_id.entry(topic.common.form_id) {
            std::collections::hash_map::Entry::Vacant(slot) => {
                order.push(topic.common.form_id);
                slot.insert(topic);
            }
            std::collections::hash_map::Entry::Occupied(mut slot) => {
                let existing = slot.get_mut();
                existing.common.editor_id = merge_option(existing.common.editor_id.take(), topic.common.editor_id);
                existing.full_name = merge_option(existing.full_name.take(), topic.full_name);
                existing.quest = merge_option(existing.quest.take(), topic.quest);
                existing.speaker = merge_option(existing.speaker.take(), topic.speaker);
                if existing.lines.is_empty() {
                    existing.lines = topic.lines;
                }
            }
        }
    }
    order.into_iter().map(|id| by_id.remove(&id).unwrap()).collect()
}

/// A dialogue response line (`INFO`). Quest/sibling attributes are filled by
/// `xref::dialogue`'s propagation pass once the whole topic is in hand.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DialogueLine {
    pub common: EntityCommon,
    pub topic: Option<FormId>,
    pub quest: Option<FormId>,
    pub response_text: Option<String>,
    pub emotion_type: Option<i32>,
    pub emotion_value: Option<i32>,
    pub response_number: Option<u8>,
    /// Speaking NPC (`ANAM`, spec §8 Scenario D).
    pub speaker: Option<FormId>,
    pub voice_type: Option<FormId>,
    pub faction: Option<FormId>,
}

/// Runtime enrichment for a line already present from the image side (spec
/// §4.7 step 3).
pub fn enrich_dialogue_line_from_runtime(existing: &mut DialogueLine, runtime: DialogueLine) {
    existing.common.from_runtime = true;
    existing.topic = merge_form_id(existing.topic.unwrap_or(FormId::NONE), runtime.topic.unwrap_or(FormId::NONE)).as_option();
    existing.quest = merge_form_id(existing.quest.unwrap_or(FormId::NONE), runtime.quest.unwrap_or(FormId::NONE)).as_option();
    existing.response_text = merge_option(existing.response_text.take(), runtime.response_text);
    existing.emotion_type = merge_option(existing.emotion_type.take(), runtime.emotion_type);
    existing.emotion_value = merge_option(existing.emotion_value.take(), runtime.emotion_value);
    existing.response_number = merge_option(existing.response_number.take(), runtime.response_number);
    existing.speaker =
        merge_form_id(existing.speaker.unwrap_or(FormId::NONE), runtime.speaker.unwrap_or(FormId::NONE)).as_option();
    existing.voice_type = merge_form_id(existing.voice_type.unwrap_or(FormId::NONE), runtime.voice_type.unwrap_or(FormId::NONE))
        .as_option();
    existing.faction =
        merge_form_id(existing.faction.unwrap_or(FormId::NONE), runtime.faction.unwrap_or(FormId::NONE)).as_option();
}

pub fn reconstruct_dialogue_lines(
    headers: &[MainRecordHeader],
    accessor: Option<&dyn ByteAccessor>,
    idx: &mut IdentifierIndex,
    cfg: &ReconConfig,
) -> Vec<DialogueLine> {
    let parent = Tag::new(*b"INFO");
    headers
        .iter()
        .map(|header| {
            let mut line = DialogueLine {
                common: EntityCommon::shallow(header.form_id, header.offset, header.is_big_endian),
                topic: None,
                quest: None,
                response_text: None,
                emotion_type: None,
                emotion_value: None,
                response_number: None,
                speaker: None,
                voice_type: None,
                faction: None,
            };
            let Some(accessor) = accessor else { return line };
            let Some(body) = read_record_data(accessor, header, cfg.buffer_size_for("INFO")) else {
                return line;
            };
            let endian = header.endian();
            for sub in iter_subrecords(body.as_slice(), endian) {
                let data = &body.as_slice()[sub.data_offset..sub.data_offset + sub.data_len];
                let mut editor_id = line.common.editor_id.clone();
                if note_common_subrecord(sub.tag, data, header.form_id, idx, &mut editor_id) {
                    line.common.editor_id = editor_id;
                    continue;
                }
                match sub.tag.as_str() {
                    Some("NAM1") => line.response_text = Some(cstring_from_bytes(data)),
                    Some("QNAM") => line.quest = read_u32(data, 0, endian).map(FormId),
                    Some("ANAM") => line.speaker = read_u32(data, 0, endian).map(FormId),
                    Some("VNAM") => line.voice_type = read_u32(data, 0, endian).map(FormId),
                    Some("FNAM") => line.faction = read_u32(data, 0, endian).map(FormId),
                    Some("TRDT") => {
                        if let Some(decoded) = SCHEMA.decode(sub.tag, Some(parent), data, endian) {
                            line.emotion_type =
                                decoded.get("emotion_type").and_then(|v| v.as_u32()).map(|v| v as i32);
                            line.emotion_value = decoded
                                .get("emotion_value")
                                .and_then(|v| v.as_u32())
                                .map(|v| v as i32);
                            line.response_number = decoded
                                .get("response_number")
                                .and_then(|v| v.as_u32())
                                .map(|v| v as u8);
                        }
                    }
                    _ => {}
                }
            }
            line
        })
        .collect()
}

/// Merges split `INFO` fragments sharing a form-id (spec §4.6, §8 Scenario D):
/// two image records for the same line, one carrying only a speaker, the
/// other only response text, become one line with both. Field-wise first-
/// non-empty-wins, so re-running on an already-merged set — or on `xs`
/// concatenated with itself — is a no-op (spec §8 idempotence law).
pub fn merge_split_dialogue_lines(lines: Vec<DialogueLine>) -> Vec<DialogueLine> {
    let mut order: Vec<FormId> = Vec::new();
    let mut by_id: std::collections::HashMap<FormId, DialogueLine> = std::collections::HashMap::new();
    for line in lines {
        match by_id.entry(line.common.form_id) {
            std::collections::hash_map::Entry::Vacant(slot) => {
                order.push(line.common.form_id);
                slot.insert(line);
            }
            std::collections::hash_map::Entry::Occupied(mut slot) => {
                let existing = slot.get_mut();
                existing.common.editor_id = merge_option(existing.common.editor_id.take(), line.common.editor_id);
                existing.topic = merge_option(existing.topic.take(), line.topic);
                existing.quest = merge_option(existing.quest.take(), line.quest);
                existing.response_text = merge_option(existing.response_text.take(), line.response_text);
                existing.emotion_type = merge_option(existing.emotion_type.take(), line.emotion_type);
                existing.emotion_value = merge_option(existing.emotion_value.take(), line.emotion_value);
                existing.response_number = merge_option(existing.response_number.take(), line.response_number);
                existing.speaker = merge_option(existing.speaker.take(), line.speaker);
                existing.voice_type = merge_option(existing.voice_type.take(), line.voice_type);
                existing.faction = merge_option(existing.faction.take(), line.faction);
            }
        }
    }
    order.into_iter().map(|id| by_id.remove(&id).unwrap()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accessor::SliceAccessor;

    #[test]
    fn scenario_b_book_decodes_fully() {
        let mut body = Vec::new();
        body.extend_from_slice(b"EDID");
        body.extend_from_slice(&9u16.to_be_bytes());
        body.extend_from_slice(b"NVBook01\0");
        body.extend_from_slice(b"DATA");
        body.extend_from_slice(&10u16.to_be_bytes());
        body.push(0x01);
        body.push(18);
        body.extend_from_slice(&25i32.to_be_bytes());
        body.extend_from_slice(&0.5f32.to_be_bytes());

        let mut wire = vec![0u8; 24];
        wire.extend_from_slice(&body);
        let accessor = SliceAccessor(&wire);
        let header = MainRecordHeader {
            kind: Tag::new(*b"BOOK"),
            offset: 0,
            data_size: body.len() as u32,
            flags: 0,
            form_id: FormId(0x400),
            is_compressed: false,
            is_big_endian: true,
        };
        let mut idx = IdentifierIndex::new();
        let cfg = ReconConfig::default();
        let books = reconstruct_books(&[header], Some(&accessor), &mut idx, &cfg);
        assert_eq!(books[0].common.editor_id.as_deref(), Some("NVBook01"));
        assert_eq!(books[0].flags, Some(1));
        assert_eq!(books[0].skill, Some(18));
        assert_eq!(books[0].value, Some(25));
        assert_eq!(books[0].weight, Some(0.5));
    }
}
