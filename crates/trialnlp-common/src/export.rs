//! CSV export of the trial and entity tables.
//!
//! List columns (`conditions`, `interventions`) are joined with `"; "` so each
//! trial stays one flat record. A `;` or `\` inside an item is backslash-escaped.

use serde::{Deserialize, Serialize};

use crate::entities::{EntityMention, LabelGroup, Trial};
use crate::error::Result;

const LIST_SEP: &str = "; ";

#[derive(Debug, Serialize, Deserialize)]
struct TrialCsvRow {
    nct_id: String,
    title: String,
    overall_status: String,
    phase: String,
    study_type: String,
    sponsor: String,
    conditions: String,
    interventions: String,
    brief_summary: String,
    detailed_description: String,
    has_detailed_description: bool,
    text_used: String,
    text_used_trunc: String,
    text_hash: String,
}

impl From<&Trial> for TrialCsvRow {
    fn from(t: &Trial) -> Self {
        Self {
            nct_id: t.nct_id.clone(),
            title: t.title.clone(),
            overall_status: t.overall_status.clone(),
            phase: t.phase.clone(),
            study_type: t.study_type.clone(),
            sponsor: t.sponsor.clone(),
            conditions: join_list(&t.conditions),
            interventions: join_list(&t.interventions),
            brief_summary: t.brief_summary.clone(),
            detailed_description: t.detailed_description.clone(),
            has_detailed_description: t.has_detailed_description,
            text_used: t.text_used.clone(),
            text_used_trunc: t.text_used_trunc.clone(),
            text_hash: t.text_hash.clone(),
        }
    }
}

impl From<TrialCsvRow> for Trial {
    fn from(r: TrialCsvRow) -> Self {
        Self {
            nct_id: r.nct_id,
            title: r.title,
            overall_status: r.overall_status,
            phase: r.phase,
            study_type: r.study_type,
            sponsor: r.sponsor,
            conditions: split_list(&r.conditions),
            interventions: split_list(&r.interventions),
            brief_summary: r.brief_summary,
            detailed_description: r.detailed_description,
            has_detailed_description: r.has_detailed_description,
            text_used: r.text_used,
            text_used_trunc: r.text_used_trunc,
            text_hash: r.text_hash,
        }
    }
}

fn join_list(items: &[String]) -> String {
    items
        .iter()
        .map(|v| v.replace('\\', "\\\\").replace(';', "\\;"))
        .collect::<Vec<_>>()
        .join(LIST_SEP)
}

/// Inverse of `join_list`; empty items are dropped.
fn split_list(s: &str) -> Vec<String> {
    let mut items = Vec::new();
    let mut current = String::new();
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\\' => current.extend(chars.next()),
            ';' => {
                items.push(std::mem::take(&mut current));
                chars.next_if_eq(&' ');
            }
            _ => current.push(c),
        }
    }
    items.push(current);
    items.retain(|v| !v.is_empty());
    items
}

#[derive(Debug, Serialize, Deserialize)]
struct EntityCsvRow {
    nct_id: String,
    entity_text: String,
    entity_norm: String,
    label_raw: String,
    label_group: String,
    start: usize,
    end: usize,
    score: Option<f32>,
    text_hash: String,
}

impl From<&EntityMention> for EntityCsvRow {
    fn from(m: &EntityMention) -> Self {
        Self {
            nct_id: m.nct_id.clone(),
            entity_text: m.entity_text.clone(),
            entity_norm: m.entity_norm.clone(),
            label_raw: m.label_raw.clone(),
            label_group: m.label_group.to_string(),
            start: m.start,
            end: m.end,
            score: m.score,
            text_hash: m.text_hash.clone(),
        }
    }
}

impl From<EntityCsvRow> for EntityMention {
    fn from(r: EntityCsvRow) -> Self {
        Self {
            nct_id: r.nct_id,
            entity_text: r.entity_text,
            entity_norm: r.entity_norm,
            label_raw: r.label_raw,
            label_group: LabelGroup::from(r.label_group),
            start: r.start,
            end: r.end,
            score: r.score,
            text_hash: r.text_hash,
        }
    }
}

/// Render the trial table as CSV (header row always present).
pub fn trials_to_csv(trials: &[Trial]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(Vec::new());
    if trials.is_empty() {
        wtr.write_record(TRIAL_COLUMNS)?;
    }
    for t in trials {
        wtr.serialize(TrialCsvRow::from(t))?;
    }
    into_string(wtr)
}

/// Render the entity table as CSV (header row always present).
pub fn entities_to_csv(mentions: &[EntityMention]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(Vec::new());
    if mentions.is_empty() {
        wtr.write_record(ENTITY_COLUMNS)?;
    }
    for m in mentions {
        wtr.serialize(EntityCsvRow::from(m))?;
    }
    into_string(wtr)
}

pub fn trials_from_csv(data: &str) -> Result<Vec<Trial>> {
    let mut rdr = csv::Reader::from_reader(data.as_bytes());
    let mut out = Vec::new();
    for row in rdr.deserialize::<TrialCsvRow>() {
        out.push(Trial::from(row?));
    }
    Ok(out)
}

pub fn entities_from_csv(data: &str) -> Result<Vec<EntityMention>> {
    let mut rdr = csv::Reader::from_reader(data.as_bytes());
    let mut out = Vec::new();
    for row in rdr.deserialize::<EntityCsvRow>() {
        out.push(EntityMention::from(row?));
    }
    Ok(out)
}

pub const TRIAL_COLUMNS: [&str; 14] = [
    "nct_id",
    "title",
    "overall_status",
    "phase",
    "study_type",
    "sponsor",
    "conditions",
    "interventions",
    "brief_summary",
    "detailed_description",
    "has_detailed_description",
    "text_used",
    "text_used_trunc",
    "text_hash",
];

pub const ENTITY_COLUMNS: [&str; 9] = [
    "nct_id",
    "entity_text",
    "entity_norm",
    "label_raw",
    "label_group",
    "start",
    "end",
    "score",
    "text_hash",
];

fn into_string(wtr: csv::Writer<Vec<u8>>) -> Result<String> {
    let bytes = wtr
        .into_inner()
        .map_err(|e| anyhow::anyhow!("flushing CSV writer: {}", e))?;
    Ok(String::from_utf8(bytes).map_err(|e| anyhow::anyhow!("CSV output not UTF-8: {}", e))?)
}
