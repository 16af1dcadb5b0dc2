//! Fast NER using an Aho-Corasick trie for dictionary matching.
//!
//! Matches an embedded clinical-trial lexicon (conditions, drugs,
//! genes/proteins, cell types) in linear time. Used when no model download
//! is possible or wanted; the raw labels it emits mirror the label sets of
//! the BC5CDR and JNLPBA corpora so they group the same way model output does.

use aho_corasick::{AhoCorasick, MatchKind};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::recognizer::{EntityRecognizer, NerEntity};
use crate::{NerError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LexiconCategory {
    Disease,
    Chemical,
    GeneProtein,
    CellType,
}

impl LexiconCategory {
    pub const ALL: [LexiconCategory; 4] = [
        LexiconCategory::Disease,
        LexiconCategory::Chemical,
        LexiconCategory::GeneProtein,
        LexiconCategory::CellType,
    ];

    /// Raw label emitted for matches of this category.
    pub fn label(&self) -> &'static str {
        match self {
            LexiconCategory::Disease => "Disease",
            LexiconCategory::Chemical => "Chemical",
            LexiconCategory::GeneProtein => "PROTEIN",
            LexiconCategory::CellType => "CELL_TYPE",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "disease" => Some(LexiconCategory::Disease),
            "chemical" | "drug" => Some(LexiconCategory::Chemical),
            "gene_protein" | "gene" | "protein" => Some(LexiconCategory::GeneProtein),
            "cell_type" => Some(LexiconCategory::CellType),
            _ => None,
        }
    }

    fn terms(&self) -> &'static [&'static str] {
        match self {
            LexiconCategory::Disease => DISEASES,
            LexiconCategory::Chemical => CHEMICALS,
            LexiconCategory::GeneProtein => GENES_PROTEINS,
            LexiconCategory::CellType => CELL_TYPES,
        }
    }
}

/// A fast entity recognizer using an Aho-Corasick automaton.
pub struct TrieNer {
    automaton: AhoCorasick,
    /// Maps pattern index -> category
    pattern_info: Vec<LexiconCategory>,
    stats: TrieStats,
}

#[derive(Debug, Clone, Default)]
pub struct TrieStats {
    pub disease_count: usize,
    pub chemical_count: usize,
    pub gene_protein_count: usize,
    pub cell_type_count: usize,
    pub total_patterns: usize,
}

impl TrieNer {
    /// Build over the embedded lexicon, restricted to `categories`
    /// (all categories when empty).
    pub fn with_categories(categories: &[LexiconCategory]) -> Result<Self> {
        let categories: Vec<LexiconCategory> = if categories.is_empty() {
            LexiconCategory::ALL.to_vec()
        } else {
            categories.to_vec()
        };

        let mut patterns: Vec<&'static str> = Vec::new();
        let mut pattern_info = Vec::new();
        let mut stats = TrieStats::default();

        for cat in &categories {
            let terms = cat.terms();
            patterns.extend_from_slice(terms);
            pattern_info.extend(std::iter::repeat(*cat).take(terms.len()));
            match cat {
                LexiconCategory::Disease => stats.disease_count += terms.len(),
                LexiconCategory::Chemical => stats.chemical_count += terms.len(),
                LexiconCategory::GeneProtein => stats.gene_protein_count += terms.len(),
                LexiconCategory::CellType => stats.cell_type_count += terms.len(),
            }
        }
        stats.total_patterns = patterns.len();

        // Standard semantics so every overlapping candidate is reported;
        // `extract` picks leftmost-longest among those on word boundaries.
        let automaton = AhoCorasick::builder()
            .match_kind(MatchKind::Standard)
            .ascii_case_insensitive(true)
            .build(&patterns)
            .map_err(|e| NerError::ModelLoad(format!("lexicon automaton: {}", e)))?;

        info!(
            "TrieNer loaded: {} diseases, {} chemicals, {} genes/proteins, {} cell types",
            stats.disease_count, stats.chemical_count, stats.gene_protein_count, stats.cell_type_count
        );

        Ok(Self { automaton, pattern_info, stats })
    }

    /// Extract entities from text using trie matching.
    ///
    /// Matches must sit on word boundaries, so "ALS" never fires inside "trials".
    /// Among the valid candidates the leftmost-longest win ("type 2 diabetes"
    /// over "diabetes"); when a long candidate fails the boundary check a
    /// shorter one at the same start can still match ("insulin" in
    /// "insulin receptors").
    pub fn extract(&self, text: &str) -> Vec<NerEntity> {
        let mut candidates: Vec<(usize, usize, usize)> = self
            .automaton
            .find_overlapping_iter(text)
            .filter(|m| on_word_boundary(text, m.start(), m.end()))
            .map(|m| (m.start(), m.end(), m.pattern().as_usize()))
            .collect();
        candidates.sort_by(|a, b| a.0.cmp(&b.0).then(b.1.cmp(&a.1)).then(a.2.cmp(&b.2)));

        let mut entities = Vec::new();
        let mut cursor = 0;
        for (start, end, pattern) in candidates {
            if start < cursor {
                continue;
            }
            cursor = end;
            entities.push(NerEntity {
                text: text[start..end].to_string(),
                label: self.pattern_info[pattern].label().to_string(),
                start,
                end,
                score: None,
            });
        }
        entities
    }

    pub fn stats(&self) -> &TrieStats {
        &self.stats
    }
}

impl EntityRecognizer for TrieNer {
    fn name(&self) -> &str {
        "lexicon"
    }

    fn recognize(&self, text: &str) -> Result<Vec<NerEntity>> {
        Ok(self.extract(text))
    }
}

fn on_word_boundary(text: &str, start: usize, end: usize) -> bool {
    let before = text[..start].chars().next_back();
    let after = text[end..].chars().next();
    !before.is_some_and(char::is_alphanumeric) && !after.is_some_and(char::is_alphanumeric)
}

// ─────────────────────────────────────────────────────────────────────────────
// Embedded lexicon

const DISEASES: &[&str] = &[
    "diabetes", "diabetes mellitus", "type 1 diabetes", "type 2 diabetes",
    "type 1 diabetes mellitus", "type 2 diabetes mellitus", "gestational diabetes",
    "prediabetes", "diabetic nephropathy", "diabetic retinopathy", "diabetic neuropathy",
    "diabetic foot ulcer", "diabetic kidney disease", "hyperglycemia", "hypoglycemia",
    "insulin resistance", "obesity", "overweight", "metabolic syndrome", "hypertension",
    "dyslipidemia", "hypercholesterolemia", "atherosclerosis", "coronary artery disease",
    "heart failure", "atrial fibrillation", "myocardial infarction", "stroke",
    "chronic kidney disease", "kidney failure", "nonalcoholic fatty liver disease", "NAFLD",
    "NASH", "cirrhosis", "hepatitis B", "hepatitis C", "HIV", "HIV infection", "tuberculosis",
    "COVID-19", "influenza", "pneumonia", "sepsis", "asthma", "COPD",
    "chronic obstructive pulmonary disease", "cystic fibrosis", "depression",
    "major depressive disorder", "anxiety", "schizophrenia", "bipolar disorder",
    "Alzheimer's disease", "Alzheimer disease", "dementia", "Parkinson's disease",
    "Parkinson disease", "multiple sclerosis", "epilepsy", "migraine", "ALS",
    "amyotrophic lateral sclerosis", "rheumatoid arthritis", "osteoarthritis", "psoriasis",
    "atopic dermatitis", "lupus", "systemic lupus erythematosus", "Crohn's disease",
    "ulcerative colitis", "inflammatory bowel disease", "celiac disease", "osteoporosis",
    "anemia", "sickle cell disease", "hemophilia", "cancer", "tumor", "tumors",
    "breast cancer", "lung cancer", "non-small cell lung cancer", "NSCLC",
    "small cell lung cancer", "prostate cancer", "colorectal cancer", "pancreatic cancer",
    "ovarian cancer", "gastric cancer", "liver cancer", "hepatocellular carcinoma",
    "melanoma", "glioblastoma", "lymphoma", "leukemia", "acute myeloid leukemia",
    "multiple myeloma", "carcinoma", "adenocarcinoma", "sarcoma", "neuropathy", "retinopathy",
    "nephropathy", "pain", "chronic pain", "infection", "inflammation", "fibrosis",
];

const CHEMICALS: &[&str] = &[
    "metformin", "insulin", "insulin glargine", "insulin degludec", "insulin lispro",
    "insulin aspart", "semaglutide", "liraglutide", "dulaglutide", "exenatide", "tirzepatide",
    "empagliflozin", "dapagliflozin", "canagliflozin", "ertugliflozin", "sitagliptin",
    "linagliptin", "saxagliptin", "alogliptin", "vildagliptin", "pioglitazone",
    "rosiglitazone", "glimepiride", "glipizide", "glyburide", "gliclazide", "acarbose",
    "pramlintide", "glucose", "glucagon", "dextrose", "atorvastatin", "rosuvastatin",
    "simvastatin", "ezetimibe", "aspirin", "clopidogrel", "warfarin", "apixaban",
    "rivaroxaban", "heparin", "lisinopril", "losartan", "valsartan", "amlodipine",
    "hydrochlorothiazide", "spironolactone", "finerenone", "furosemide", "metoprolol",
    "prednisone", "dexamethasone", "methotrexate", "cyclosporine", "tacrolimus",
    "adalimumab", "infliximab", "rituximab", "pembrolizumab", "nivolumab", "atezolizumab",
    "trastuzumab", "bevacizumab", "cetuximab", "cisplatin", "carboplatin", "paclitaxel",
    "docetaxel", "gemcitabine", "doxorubicin", "cyclophosphamide", "fluorouracil",
    "5-fluorouracil", "capecitabine", "oxaliplatin", "irinotecan", "tamoxifen", "letrozole",
    "olaparib", "osimertinib", "erlotinib", "gefitinib", "imatinib", "sorafenib",
    "lenvatinib", "vitamin D", "vitamin D3", "cholecalciferol", "omega-3 fatty acids",
    "placebo", "ibuprofen", "acetaminophen", "morphine", "ketamine", "lidocaine",
    "remdesivir", "hydroxychloroquine", "ivermectin", "sertraline", "fluoxetine",
    "escitalopram", "resveratrol", "curcumin", "probiotics", "caffeine", "ethanol",
];

const GENES_PROTEINS: &[&str] = &[
    "insulin receptor", "GLP-1", "GLP-1 receptor", "GLP-1R", "GIP", "DPP-4", "DPP4",
    "SGLT2", "SGLT1", "HbA1c", "hemoglobin A1c", "glycated hemoglobin", "C-peptide",
    "adiponectin", "leptin", "ghrelin", "TNF-alpha", "TNF", "IL-6", "interleukin-6",
    "IL-1beta", "CRP", "C-reactive protein", "hs-CRP", "VEGF", "EGFR", "HER2", "ERBB2",
    "KRAS", "BRAF", "BRCA1", "BRCA2", "TP53", "ALK", "PD-1", "PD-L1", "CTLA-4", "PCSK9",
    "LDL receptor", "APOE", "amyloid beta", "tau", "alpha-synuclein", "troponin", "NT-proBNP",
    "BNP", "albumin", "creatinine", "cystatin C", "ACE2", "spike protein", "AMPK", "mTOR",
    "PPAR-gamma", "GLUT4", "TCF7L2", "HNF1A", "HNF4A", "GCK", "FGF21", "IGF-1",
    "growth hormone", "cortisol", "erythropoietin", "hemoglobin", "ferritin",
];

const CELL_TYPES: &[&str] = &[
    "beta cells", "beta-cells", "islet cells", "pancreatic islets", "T cells", "T-cells",
    "regulatory T cells", "B cells", "B-cells", "NK cells", "macrophages", "monocytes",
    "neutrophils", "dendritic cells", "stem cells", "mesenchymal stem cells",
    "hematopoietic stem cells", "adipocytes", "hepatocytes", "cardiomyocytes",
    "endothelial cells", "platelets", "red blood cells", "CAR-T cells",
];
