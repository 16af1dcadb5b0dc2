//! Entity aggregation across trials.
//!
//! Derives the tables the dashboard plots from a flat list of mentions:
//! - entity co-occurrence between two label groups (heatmap input)
//! - per-trial entity table (mention counts and representative surface form)
//! - mention counts per label group
//! - label group × label group trial co-occurrence matrix

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use serde::Serialize;
use trialnlp_common::{EntityMention, LabelGroup};

/// One cell of the long-form co-occurrence table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CooccurrenceCell {
    pub left: String,
    pub right: String,
    /// Number of trials containing both entities.
    pub n_trials: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntityTableRow {
    pub label_group: String,
    /// Most frequent surface form for this normalized entity.
    pub entity_text: String,
    pub entity_norm: String,
    pub mentions: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TypeCount {
    pub label: String,
    pub mentions: usize,
}

/// Square matrix of trial counts indexed by `labels` on both axes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TypeCooccurrence {
    pub labels: Vec<String>,
    pub counts: Vec<Vec<usize>>,
}

impl TypeCooccurrence {
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn get(&self, a: &str, b: &str) -> usize {
        let i = self.labels.iter().position(|l| l == a);
        let j = self.labels.iter().position(|l| l == b);
        match (i, j) {
            (Some(i), Some(j)) => self.counts[i][j],
            _ => 0,
        }
    }
}

/// Top `n` entity norms of `group`, ranked by distinct trials then name.
fn top_entities(mentions: &[EntityMention], group: &LabelGroup, n: usize) -> Vec<String> {
    let mut trials_per_norm: HashMap<&str, HashSet<&str>> = HashMap::new();
    for m in mentions.iter().filter(|m| &m.label_group == group) {
        let norm = m.entity_norm.trim();
        if norm.is_empty() {
            continue;
        }
        trials_per_norm.entry(norm).or_default().insert(m.nct_id.as_str());
    }

    let mut ranked: Vec<(&str, usize)> =
        trials_per_norm.into_iter().map(|(norm, trials)| (norm, trials.len())).collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    ranked.into_iter().take(n).map(|(norm, _)| norm.to_string()).collect()
}

/// Count trials in which each (left, right) pair of top entities co-occurs.
///
/// Only the `top_left` / `top_right` entities of each group (by distinct
/// trials) are considered. Each pair counts at most once per trial.
pub fn build_cooccurrence_long(
    mentions: &[EntityMention],
    left_group: &LabelGroup,
    right_group: &LabelGroup,
    top_left: usize,
    top_right: usize,
) -> Vec<CooccurrenceCell> {
    if mentions.is_empty() {
        return Vec::new();
    }

    let left_top: HashSet<String> = top_entities(mentions, left_group, top_left).into_iter().collect();
    let right_top: HashSet<String> = top_entities(mentions, right_group, top_right).into_iter().collect();
    if left_top.is_empty() || right_top.is_empty() {
        return Vec::new();
    }

    // nct_id -> (left norms, right norms)
    let mut per_trial: BTreeMap<&str, (BTreeSet<&str>, BTreeSet<&str>)> = BTreeMap::new();
    for m in mentions {
        let norm = m.entity_norm.trim();
        if &m.label_group == left_group && left_top.contains(norm) {
            per_trial.entry(m.nct_id.as_str()).or_default().0.insert(norm);
        }
        if &m.label_group == right_group && right_top.contains(norm) {
            per_trial.entry(m.nct_id.as_str()).or_default().1.insert(norm);
        }
    }

    let mut pairs: HashMap<(&str, &str), usize> = HashMap::new();
    for (lefts, rights) in per_trial.values() {
        for l in lefts {
            for r in rights {
                *pairs.entry((*l, *r)).or_insert(0) += 1;
            }
        }
    }

    let mut out: Vec<CooccurrenceCell> = pairs
        .into_iter()
        .map(|((left, right), n_trials)| CooccurrenceCell {
            left: left.to_string(),
            right: right.to_string(),
            n_trials,
        })
        .collect();
    out.sort_by(|a, b| {
        b.n_trials
            .cmp(&a.n_trials)
            .then_with(|| a.left.cmp(&b.left))
            .then_with(|| a.right.cmp(&b.right))
    });
    out
}

/// Group one trial's mentions by `(label_group, entity_norm)`.
pub fn per_trial_entity_table(mentions: &[EntityMention], nct_id: &str) -> Vec<EntityTableRow> {
    struct Group<'a> {
        mentions: usize,
        // surface form -> (count, first seen index)
        surfaces: HashMap<&'a str, (usize, usize)>,
    }

    let mut groups: HashMap<(&str, &str), Group<'_>> = HashMap::new();
    for (idx, m) in mentions.iter().enumerate().filter(|(_, m)| m.nct_id == nct_id) {
        let g = groups
            .entry((m.label_group.as_str(), m.entity_norm.as_str()))
            .or_insert_with(|| Group { mentions: 0, surfaces: HashMap::new() });
        g.mentions += 1;
        g.surfaces.entry(m.entity_text.as_str()).or_insert((0, idx)).0 += 1;
    }

    let mut rows: Vec<EntityTableRow> = groups
        .into_iter()
        .map(|((label_group, entity_norm), g)| {
            let entity_text = g
                .surfaces
                .iter()
                .max_by(|a, b| a.1 .0.cmp(&b.1 .0).then_with(|| b.1 .1.cmp(&a.1 .1)))
                .map(|(text, _)| text.to_string())
                .unwrap_or_default();
            EntityTableRow {
                label_group: label_group.to_string(),
                entity_text,
                entity_norm: entity_norm.to_string(),
                mentions: g.mentions,
            }
        })
        .collect();

    rows.sort_by(|a, b| {
        a.label_group
            .cmp(&b.label_group)
            .then_with(|| b.mentions.cmp(&a.mentions))
            .then_with(|| a.entity_norm.cmp(&b.entity_norm))
    });
    rows
}

/// Mentions per label group, blank and `UNKNOWN` labels folded into `Other`.
pub fn label_group_counts<'a, I>(mentions: I) -> Vec<TypeCount>
where
    I: IntoIterator<Item = &'a EntityMention>,
{
    let mut counts: HashMap<String, usize> = HashMap::new();
    for m in mentions {
        *counts.entry(m.label_group.display_name()).or_insert(0) += 1;
    }

    let mut out: Vec<TypeCount> =
        counts.into_iter().map(|(label, mentions)| TypeCount { label, mentions }).collect();
    out.sort_by(|a, b| b.mentions.cmp(&a.mentions).then_with(|| a.label.cmp(&b.label)));
    out
}

/// For each pair of label groups, the number of trials where both appear.
pub fn type_cooccurrence(mentions: &[EntityMention]) -> TypeCooccurrence {
    let mut per_trial: HashMap<&str, BTreeSet<String>> = HashMap::new();
    for m in mentions {
        per_trial.entry(m.nct_id.as_str()).or_default().insert(m.label_group.display_name());
    }

    let labels: Vec<String> = per_trial
        .values()
        .flatten()
        .cloned()
        .collect::<BTreeSet<String>>()
        .into_iter()
        .collect();
    let index: HashMap<&str, usize> =
        labels.iter().enumerate().map(|(i, l)| (l.as_str(), i)).collect();

    let mut counts = vec![vec![0usize; labels.len()]; labels.len()];
    for types in per_trial.values() {
        let ids: Vec<usize> = types.iter().map(|t| index[t.as_str()]).collect();
        for &i in &ids {
            for &j in &ids {
                counts[i][j] += 1;
            }
        }
    }

    TypeCooccurrence { labels, counts }
}
