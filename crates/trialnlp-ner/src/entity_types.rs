//! Label mapping and surface-form normalization.

use std::sync::OnceLock;

use regex::Regex;
use trialnlp_common::LabelGroup;

/// Strip a BIO/BIOES tag prefix (`B-`, `I-`, `E-`, `S-`, `L-`, `U-`).
pub fn strip_bio_prefix(label: &str) -> &str {
    let label = label.trim();
    match label.as_bytes() {
        [b'B' | b'I' | b'E' | b'S' | b'L' | b'U', b'-', ..] => &label[2..],
        _ => label,
    }
}

/// Map a model-specific label onto the coarse label group.
///
/// BC5CDR, JNLPBA, NCBI-disease and the `biomedical-ner-all` label sets
/// collapse onto DISEASE / DRUG / GENE_PROTEIN; anything else keeps its
/// upper-cased label, and an empty label becomes `ENTITY`.
pub fn map_label_group(label: &str) -> LabelGroup {
    let upper = strip_bio_prefix(label).to_uppercase();

    match upper.as_str() {
        "DISEASE" | "DISEASE_DISORDER" | "SPECIFICDISEASE" | "DISEASECLASS"
        | "COMPOSITEMENTION" | "CANCER" => LabelGroup::Disease,
        "CHEMICAL" | "SIMPLE_CHEMICAL" | "DRUG" | "MEDICATION" => LabelGroup::Drug,
        "GENE_OR_GENE_PRODUCT" | "GENE" | "PROTEIN" | "GGP" | "GENETIC" => LabelGroup::GeneProtein,
        "" => LabelGroup::Other("ENTITY".to_string()),
        _ => LabelGroup::Other(upper),
    }
}

/// Normalize an entity surface form for grouping:
/// lower-case, collapse whitespace, en/em dash → `-`, strip leading and
/// trailing non-word characters.
pub fn normalize_entity_text(s: &str) -> String {
    static WS: OnceLock<Regex> = OnceLock::new();
    static EDGES: OnceLock<Regex> = OnceLock::new();
    let ws = WS.get_or_init(|| Regex::new(r"\s+").expect("valid regex"));
    let edges = EDGES.get_or_init(|| Regex::new(r"^[^\w]+|[^\w]+$").expect("valid regex"));

    let lowered = s.trim().to_lowercase();
    let collapsed = ws.replace_all(&lowered, " ");
    let dashed = collapsed.replace(['\u{2013}', '\u{2014}'], "-");
    edges.replace_all(&dashed, "").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bc5cdr_labels() {
        assert_eq!(map_label_group("Disease"), LabelGroup::Disease);
        assert_eq!(map_label_group("CHEMICAL"), LabelGroup::Drug);
        assert_eq!(map_label_group("B-Chemical"), LabelGroup::Drug);
    }

    #[test]
    fn test_jnlpba_labels() {
        assert_eq!(map_label_group("PROTEIN"), LabelGroup::GeneProtein);
        assert_eq!(map_label_group("GENE_OR_GENE_PRODUCT"), LabelGroup::GeneProtein);
        assert_eq!(map_label_group("cell_type"), LabelGroup::Other("CELL_TYPE".into()));
        assert_eq!(map_label_group("I-DNA"), LabelGroup::Other("DNA".into()));
    }

    #[test]
    fn test_biomedical_ner_all_labels() {
        assert_eq!(map_label_group("B-Disease_disorder"), LabelGroup::Disease);
        assert_eq!(map_label_group("I-Medication"), LabelGroup::Drug);
        assert_eq!(map_label_group("Sign_symptom"), LabelGroup::Other("SIGN_SYMPTOM".into()));
    }

    #[test]
    fn test_empty_label_is_entity() {
        assert_eq!(map_label_group(""), LabelGroup::Other("ENTITY".into()));
    }

    #[test]
    fn test_strip_prefix_keeps_plain_labels() {
        assert_eq!(strip_bio_prefix("B-GENE"), "GENE");
        assert_eq!(strip_bio_prefix("Biomarker"), "Biomarker");
        assert_eq!(strip_bio_prefix("O"), "O");
    }

    #[test]
    fn test_normalize_entity_text() {
        assert_eq!(normalize_entity_text("  Type  2\nDiabetes "), "type 2 diabetes");
        assert_eq!(normalize_entity_text("(HbA1c)"), "hba1c");
        assert_eq!(normalize_entity_text("anti\u{2013}PD-1,"), "anti-pd-1");
        assert_eq!(normalize_entity_text("..."), "");
    }
}
