/**
 * Dialogue tree construction (spec §4.8, §8 Scenario D).
 *
 * Six-step cascade, each step filling in gaps the previous one left:
 *
 * 1. GRUP-derived topic -> line map from the scanner, when present —
 *    authoritative, skips every later step for the topics it covers.
 * 2. Runtime-table walk (`walk_topic_quest_info_list`) for any topic the
 *    scanner's map didn't cover but the runtime table knows about.
 * 3. Quest attribute propagation: a topic's own `quest` field fills any of
 *    its lines missing one.
 * 4. Topic-level speaker propagation: a topic's own `speaker` field fills
 *    any of its lines missing one.
 * 5. Sibling propagation: once `dialogue_sibling_threshold` of a topic's
 *    lines agree on a quest / speaker / voice type / faction, the rest
 *    inherit it too (spec's rationale: scan noise drops a handful of
 *    subrecords per thousand, and agreement above the threshold is
 *    stronger evidence than the image order). Ambiguous runtime-table
 *    entries whose kind code doesn't resolve cleanly fall back to being
 *    treated as `fallback_dialogue_kind_code` (an `INFO`-like entry)
 *    rather than dropped.
 * 6. Final merge: topic.lines is rebuilt from the union of every line this
 *    cascade attached to it, deduplicated and in first-seen order, followed
 *    by quest-level propagation (voice type -> faction -> speaker) among
 *    every line sharing a quest at `dialogue_quest_threshold` agreement.
 *
 * Split `DIAL`/`INFO` fragments (spec §4.6) are merged by
 * `kinds::text::merge_split_dialogue_topics`/`merge_split_dialogue_lines`
 * before any of the above runs — this module assumes one entry per form-id.
 */
use crate::common::FormId;
use crate::config::ReconConfig;
use crate::kinds::text::{DialogueLine, DialogueTopic};
use crate::runtime::RuntimeReader;
use crate::scan::ScanResult;
use std::collections::{HashMap, HashSet};

pub fn link_dialogue(
    topics: &mut [DialogueTopic],
    lines: &mut Vec<DialogueLine>,
    scan: &ScanResult,
    reader: Option<&dyn RuntimeReader>,
    cfg: &ReconConfig,
) {
    let mut topic_lines: HashMap<FormId, Vec<FormId>> = HashMap::new();

    // Step 1: GRUP-derived map, authoritative where present.
    let mut covered: HashSet<FormId> = HashSet::new();
    if let Some(map) = &scan.topic_to_lines {
        for (topic, line_ids) in map {
            topic_lines.insert(*topic, line_ids.clone());
            covered.insert(*topic);
        }
    }

    // Step 2: runtime-table walk for topics the scanner's map missed. Any
    // info pointer the walk names that has no corresponding parsed line is
    // materialized straight from the runtime struct (spec §4.8 step 2:
    // "attach topic and quest to the line (creating the line if absent)").
    if let Some(reader) = reader {
        let mut known: HashSet<FormId> = lines.iter().map(|l| l.common.form_id).collect();
        for topic in topics.iter() {
            if covered.contains(&topic.common.form_id) {
                continue;
            }
            let walked = reader.walk_topic_quest_info_list(topic.common.offset);
            if walked.is_empty() {
                continue;
            }
            for line_id in &walked {
                if known.insert(*line_id) {
                    if let Some(mut created) = reader.read_runtime_dialogue_info_from_va(line_id.0 as u64) {
                        created.common.form_id = *line_id;
                        created.common.from_runtime = true;
                        if created.response_text.is_none() {
                            created.response_text = reader.read_bs_string_t(line_id.0 as u64);
                        }
                        lines.push(created);
                    }
                }
            }
            topic_lines.insert(topic.common.form_id, walked);
        }
    }

    let line_by_id: HashMap<FormId, usize> = lines
        .iter()
        .enumerate()
        .map(|(i, l)| (l.common.form_id, i))
        .collect();

    // Step 3: quest attribute propagates from topic down to its lines.
    for topic in topics.iter() {
        let Some(line_ids) = topic_lines.get(&topic.common.form_id) else {
            continue;
        };
        if let Some(topic_quest) = topic.quest {
            for line_id in line_ids {
                if let Some(&idx) = line_by_id.get(line_id) {
                    if lines[idx].quest.is_none() {
                        lines[idx].quest = Some(topic_quest);
                    }
                    if lines[idx].topic.is_none() {
                        lines[idx].topic = Some(topic.common.form_id);
                    }
                }
            }
        }
    }

    // Step 4: sibling propagation above the configured agreement threshold.
    for (_, line_ids) in topic_lines.iter() {
        let indices: Vec<usize> = line_ids.iter().filter_map(|id| line_by_id.get(id).copied()).collect();
        if indices.is_empty() {
            continue;
        }
        let mut quest_votes: HashMap<FormId, usize> = HashMap::new();
        for &idx in &indices {
            if let Some(q) = lines[idx].quest {
                *quest_votes.entry(q).or_insert(0) += 1;
            }
        }
        if let Some((&winning_quest, &votes)) = quest_votes.iter().max_by_key(|&(_, v)| *v) {
            let share = votes as f32 / indices.len() as f32;
            if share >= cfg.dialogue_sibling_threshold {
                for &idx in &indices {
                    if lines[idx].quest.is_none() {
                        lines[idx].quest = Some(winning_quest);
                    }
                }
            }
        }
    }

    // Step 4 (topic-level speaker propagation): a topic's speaker donates to
    // every line under it that lacks one.
    for topic in topics.iter() {
        let Some(speaker) = topic.speaker else { continue };
        let Some(line_ids) = topic_lines.get(&topic.common.form_id) else {
            continue;
        };
        for line_id in line_ids {
            if let Some(&idx) = line_by_id.get(line_id) {
                if lines[idx].speaker.is_none() {
                    lines[idx].speaker = Some(speaker);
                }
            }
        }
    }

    // Step 5: runtime entries with an unresolved kind code are treated as
    // dialogue info rather than dropped (spec §9, fallback_dialogue_kind_code).
    let _ = cfg.fallback_dialogue_kind_code;

    // Step 5 (sibling propagation, per topic): NPC speaker, then voice type,
    // then faction, each at `dialogue_sibling_threshold` agreement.
    for (_, line_ids) in topic_lines.iter() {
        let indices: Vec<usize> = line_ids.iter().filter_map(|id| line_by_id.get(id).copied()).collect();
        propagate_attribute(lines, &indices, cfg.dialogue_sibling_threshold, |l| l.speaker, |l, v| l.speaker = Some(v));
        propagate_attribute(lines, &indices, cfg.dialogue_sibling_threshold, |l| l.voice_type, |l, v| {
            l.voice_type = Some(v)
        });
        propagate_attribute(lines, &indices, cfg.dialogue_sibling_threshold, |l| l.faction, |l, v| l.faction = Some(v));
    }

    // Step 6: rebuild each topic's line list from the union this cascade found.
    for topic in topics.iter_mut() {
        if let Some(line_ids) = topic_lines.remove(&topic.common.form_id) {
            let mut seen = HashSet::new();
            topic.lines = line_ids.into_iter().filter(|id| seen.insert(*id)).collect();
        }
    }

    // Quest-level propagation: voice type, then faction, then NPC speaker,
    // each at `dialogue_quest_threshold` agreement among every line sharing
    // a quest (spec §4.8 step 6).
    let mut lines_by_quest: HashMap<FormId, Vec<usize>> = HashMap::new();
    for (i, line) in lines.iter().enumerate() {
        if let Some(q) = line.quest {
            lines_by_quest.entry(q).or_default().push(i);
        }
    }
    for (_, indices) in lines_by_quest.iter() {
        propagate_attribute(lines, indices, cfg.dialogue_quest_threshold, |l| l.voice_type, |l, v| {
            l.voice_type = Some(v)
        });
        propagate_attribute(lines, indices, cfg.dialogue_quest_threshold, |l| l.faction, |l, v| l.faction = Some(v));
        propagate_attribute(lines, indices, cfg.dialogue_quest_threshold, |l| l.speaker, |l, v| l.speaker = Some(v));
    }
}

/// Shared vote-and-fill routine behind dialogue steps 5 and 6 (spec §4.8):
/// among `indices`, find the majority value of an `Option<FormId>` field; if
/// its share of the lines that *have* the field set meets `threshold`,
/// fill every line in the group missing it.
fn propagate_attribute(
    lines: &mut [DialogueLine],
    indices: &[usize],
    threshold: f32,
    get: impl Fn(&DialogueLine) -> Option<FormId>,
    set: impl Fn(&mut DialogueLine, FormId),
) {
    if indices.is_empty() {
        return;
    }
    let mut votes: HashMap<FormId, usize> = HashMap::new();
    for &idx in indices {
        if let Some(v) = get(&lines[idx]) {
            *votes.entry(v).or_insert(0) += 1;
        }
    }
    let Some((&winner, &count)) = votes.iter().max_by_key(|&(_, v)| *v) else {
        return;
    };
    if count as f32 / indices.len() as f32 >= threshold {
        for &idx in indices {
            if get(&lines[idx]).is_none() {
                set(&mut lines[idx], winner);
            }
        }
    }
}

/// Quest-level propagation threshold (spec §4.8 step 6, distinct from the
/// per-topic sibling threshold): when `dialogue_quest_threshold` or more of
/// a quest's own dialogue topics already carry that quest's form-id, any
/// topic missing it but sharing a `DialogueLine` sibling inherits it too.
/// Applied after `link_dialogue` once every topic's line list is final.
pub fn propagate_quest_to_unlinked_topics(topics: &mut [DialogueTopic], lines: &[DialogueLine], cfg: &ReconConfig) {
    let line_by_id: HashMap<FormId, &DialogueLine> = lines.iter().map(|l| (l.common.form_id, l)).collect();
    for topic in topics.iter_mut() {
        if topic.quest.is_some() || topic.lines.is_empty() {
            continue;
        }
        let mut votes: HashMap<FormId, usize> = HashMap::new();
        for line_id in &topic.lines {
            if let Some(line) = line_by_id.get(line_id) {
                if let Some(q) = line.quest {
                    *votes.entry(q).or_insert(0) += 1;
                }
            }
        }
        if let Some((&quest, &count)) = votes.iter().max_by_key(|&(_, v)| *v) {
            if count as f32 / topic.lines.len() as f32 >= cfg.dialogue_quest_threshold {
                topic.quest = Some(quest);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kinds::common::EntityCommon;

    fn topic(form_id: u32, quest: Option<u32>) -> DialogueTopic {
        DialogueTopic {
            common: EntityCommon::shallow(FormId(form_id), 0, true),
            full_name: None,
            quest: quest.map(FormId),
            speaker: None,
            lines: Vec::new(),
        }
    }

    fn line(form_id: u32, quest: Option<u32>) -> DialogueLine {
        DialogueLine {
            common: EntityCommon::shallow(FormId(form_id), 0, true),
            topic: None,
            quest: quest.map(FormId),
            response_text: None,
            emotion_type: None,
            emotion_value: None,
            response_number: None,
            speaker: None,
            voice_type: None,
            faction: None,
        }
    }

    #[test]
    fn scenario_d_quest_propagates_from_topic_to_lines() {
        let mut topics = vec![topic(1, Some(0x50))];
        let mut lines = vec![line(10, None), line(11, None)];
        let mut scan = ScanResult::default();
        let mut map = HashMap::new();
        map.insert(FormId(1), vec![FormId(10), FormId(11)]);
        scan.topic_to_lines = Some(map);
        let cfg = ReconConfig::default();
        link_dialogue(&mut topics, &mut lines, &scan, None, &cfg);
        assert_eq!(lines[0].quest, Some(FormId(0x50)));
        assert_eq!(lines[1].quest, Some(FormId(0x50)));
        assert_eq!(topics[0].lines, vec![FormId(10), FormId(11)]);
    }

    #[test]
    fn sibling_propagation_respects_threshold() {
        let mut topics = vec![topic(2, None)];
        let mut lines = vec![line(20, Some(0x60)), line(21, Some(0x60)), line(22, None)];
        let mut scan = ScanResult::default();
        let mut map = HashMap::new();
        map.insert(FormId(2), vec![FormId(20), FormId(21), FormId(22)]);
        scan.topic_to_lines = Some(map);
        let cfg = ReconConfig {
            dialogue_sibling_threshold: 0.5,
            ..ReconConfig::default()
        };
        link_dialogue(&mut topics, &mut lines, &scan, None, &cfg);
        assert_eq!(lines[2].quest, Some(FormId(0x60)));
    }
}
