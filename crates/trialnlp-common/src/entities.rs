/// Core records shared by the fetch, NER and dashboard layers.
/// All of them live for one session: fetch, annotate, aggregate, display, discard.

use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Raw study (field-mapped API record)
// ---------------------------------------------------------------------------

/// A ClinicalTrials.gov study after straight field mapping, before normalization.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawStudy {
    pub nct_id: Option<String>,
    pub brief_title: Option<String>,
    pub overall_status: Option<String>,
    pub phase: Option<String>,
    pub study_type: Option<String>,
    pub sponsor: Option<String>,
    pub conditions: Vec<String>,
    pub interventions: Vec<String>,
    pub brief_summary: Option<String>,
    pub detailed_description: Option<String>,
}

// ---------------------------------------------------------------------------
// Trial (normalized row)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Trial {
    pub nct_id: String,
    pub title: String,
    pub overall_status: String,
    pub phase: String,
    pub study_type: String,
    pub sponsor: String,
    pub conditions: Vec<String>,
    pub interventions: Vec<String>,
    pub brief_summary: String,
    pub detailed_description: String,
    pub has_detailed_description: bool,
    /// Text the NER passes see (summary, optionally plus detailed description).
    pub text_used: String,
    /// `text_used` cut to the character budget; entity offsets index into this.
    pub text_used_trunc: String,
    /// Hex SHA-256 of `text_used_trunc`.
    pub text_hash: String,
}

impl Trial {
    /// Selector label: `NCT… — <first 90 chars of title>`.
    pub fn display_label(&self) -> String {
        let title: String = self.title.chars().take(90).collect();
        format!("{} — {}", self.nct_id, title)
    }
}

// ---------------------------------------------------------------------------
// Label group
// ---------------------------------------------------------------------------

/// Coarse entity type used for grouping, heatmaps and colouring.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum LabelGroup {
    Disease,
    Drug,
    GeneProtein,
    /// Any other model label, upper-cased.
    Other(String),
}

impl LabelGroup {
    pub fn as_str(&self) -> &str {
        match self {
            LabelGroup::Disease => "DISEASE",
            LabelGroup::Drug => "DRUG",
            LabelGroup::GeneProtein => "GENE_PROTEIN",
            LabelGroup::Other(s) => s.as_str(),
        }
    }

    /// Human-facing name used in chart legends and tables.
    /// Blank or `UNKNOWN` labels collapse into `Other`.
    pub fn display_name(&self) -> String {
        let s = self.as_str().trim();
        if s.is_empty() || s.eq_ignore_ascii_case("UNKNOWN") {
            "Other".to_string()
        } else {
            s.to_string()
        }
    }
}

impl From<String> for LabelGroup {
    fn from(s: String) -> Self {
        match s.trim().to_uppercase().as_str() {
            "DISEASE" => LabelGroup::Disease,
            "DRUG" => LabelGroup::Drug,
            "GENE_PROTEIN" => LabelGroup::GeneProtein,
            other => LabelGroup::Other(other.to_string()),
        }
    }
}

impl From<&str> for LabelGroup {
    fn from(s: &str) -> Self {
        LabelGroup::from(s.to_string())
    }
}

impl From<LabelGroup> for String {
    fn from(g: LabelGroup) -> Self {
        g.as_str().to_string()
    }
}

impl fmt::Display for LabelGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Entity mention
// ---------------------------------------------------------------------------

/// One labelled span found by a NER pass inside a trial's `text_used_trunc`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityMention {
    pub nct_id: String,
    pub entity_text: String,
    pub entity_norm: String,
    /// `<pass source>:<model label>`, e.g. `BC5CDR:Disease`.
    pub label_raw: String,
    pub label_group: LabelGroup,
    /// Byte offsets, always on char boundaries.
    pub start: usize,
    pub end: usize,
    pub score: Option<f32>,
    pub text_hash: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_group_roundtrips_known_names() {
        assert_eq!(LabelGroup::from("disease"), LabelGroup::Disease);
        assert_eq!(LabelGroup::from("GENE_PROTEIN"), LabelGroup::GeneProtein);
        assert_eq!(LabelGroup::from("cell_type"), LabelGroup::Other("CELL_TYPE".into()));
        assert_eq!(String::from(LabelGroup::Drug), "DRUG");
    }

    #[test]
    fn test_display_name_cleans_unknown() {
        assert_eq!(LabelGroup::from("UNKNOWN").display_name(), "Other");
        assert_eq!(LabelGroup::from("").display_name(), "Other");
        assert_eq!(LabelGroup::Disease.display_name(), "DISEASE");
    }

    #[test]
    fn test_display_label_truncates_title() {
        let t = Trial {
            nct_id: "NCT00000001".into(),
            title: "x".repeat(200),
            ..Default::default()
        };
        let label = t.display_label();
        assert!(label.starts_with("NCT00000001 — "));
        assert_eq!(label.chars().count(), "NCT00000001 — ".chars().count() + 90);
    }

    #[test]
    fn test_label_group_serializes_as_string() {
        let json = serde_json::to_string(&LabelGroup::GeneProtein).unwrap();
        assert_eq!(json, "\"GENE_PROTEIN\"");
    }
}
