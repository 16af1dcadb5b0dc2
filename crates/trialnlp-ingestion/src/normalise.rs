//! Normalization of raw studies into dashboard rows.
//!
//! Builds the NER input text for each trial, truncates it to a fixed character
//! budget and fingerprints the truncated text so entity rows can be tied back
//! to the exact text they were extracted from.

use sha2::{Digest, Sha256};
use trialnlp_common::{RawStudy, Trial};

/// Character budget for the text handed to the NER passes.
pub const MAX_TEXT_CHARS: usize = 3000;

pub fn normalize_trials(raw: &[RawStudy], include_detailed: bool) -> Vec<Trial> {
    raw.iter().map(|s| normalize_trial(s, include_detailed)).collect()
}

pub fn normalize_trial(raw: &RawStudy, include_detailed: bool) -> Trial {
    let brief_summary = raw.brief_summary.clone().unwrap_or_default();
    let detailed_description = raw.detailed_description.clone().unwrap_or_default();

    let text_used = if include_detailed {
        format!("{}\n\n{}", brief_summary, detailed_description).trim().to_string()
    } else {
        brief_summary.clone()
    };
    let text_used_trunc = truncate_chars(&text_used, MAX_TEXT_CHARS).to_string();
    let text_hash = stable_hash(&text_used_trunc);

    Trial {
        nct_id: raw.nct_id.clone().unwrap_or_default(),
        title: raw.brief_title.clone().unwrap_or_default(),
        overall_status: raw.overall_status.clone().unwrap_or_default(),
        phase: raw.phase.clone().unwrap_or_default(),
        study_type: raw.study_type.clone().unwrap_or_default(),
        sponsor: raw.sponsor.clone().unwrap_or_default(),
        conditions: clean_list(&raw.conditions),
        interventions: clean_list(&raw.interventions),
        has_detailed_description: !detailed_description.is_empty(),
        brief_summary,
        detailed_description,
        text_used,
        text_used_trunc,
        text_hash,
    }
}

fn clean_list(items: &[String]) -> Vec<String> {
    items
        .iter()
        .filter(|s| !s.trim().is_empty())
        .cloned()
        .collect()
}

/// Longest prefix of `s` holding at most `max_chars` characters.
pub fn truncate_chars(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

/// Hex SHA-256 fingerprint of a text.
pub fn stable_hash(text: &str) -> String {
    format!("{:x}", Sha256::digest(text.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw() -> RawStudy {
        RawStudy {
            nct_id: Some("NCT1".into()),
            brief_title: Some("Title".into()),
            brief_summary: Some("Summary.".into()),
            detailed_description: Some("Detail.".into()),
            conditions: vec!["Asthma".into(), " ".into()],
            ..Default::default()
        }
    }

    #[test]
    fn test_text_used_with_detail() {
        let t = normalize_trial(&raw(), true);
        assert_eq!(t.text_used, "Summary.\n\nDetail.");
        assert_eq!(t.text_used_trunc, t.text_used);
        assert!(t.has_detailed_description);
        assert_eq!(t.conditions, vec!["Asthma"]);
    }

    #[test]
    fn test_text_used_summary_only() {
        let t = normalize_trial(&raw(), false);
        assert_eq!(t.text_used, "Summary.");
        assert!(t.has_detailed_description);
    }

    #[test]
    fn test_missing_fields_become_empty() {
        let t = normalize_trial(&RawStudy::default(), true);
        assert_eq!(t.nct_id, "");
        assert_eq!(t.text_used, "");
        assert!(!t.has_detailed_description);
        assert_eq!(t.text_hash, stable_hash(""));
    }

    #[test]
    fn test_truncation_counts_characters() {
        let mut r = raw();
        r.brief_summary = Some("é".repeat(MAX_TEXT_CHARS + 10));
        r.detailed_description = None;
        let t = normalize_trial(&r, true);
        assert_eq!(t.text_used_trunc.chars().count(), MAX_TEXT_CHARS);
        assert_eq!(t.text_used.chars().count(), MAX_TEXT_CHARS + 10);
    }

    #[test]
    fn test_hash_is_stable_and_tracks_text() {
        let a = normalize_trial(&raw(), true);
        let b = normalize_trial(&raw(), true);
        let c = normalize_trial(&raw(), false);
        assert_eq!(a.text_hash, b.text_hash);
        assert_ne!(a.text_hash, c.text_hash);
        assert_eq!(a.text_hash.len(), 64);
    }

    #[test]
    fn test_empty_input() {
        assert!(normalize_trials(&[], true).is_empty());
    }
}
