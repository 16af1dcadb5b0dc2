//! trialnlp-ingestion: Trial discovery and normalization.
//! - ClinicalTrials.gov v2 search with page-token paging
//! - Straight field mapping into `RawStudy`
//! - Normalization into dashboard-ready `Trial` rows
//! - TTL result cache in front of any source

pub mod sources;
pub mod normalise;
pub mod cache;

pub use cache::CachedTrialSource;
pub use normalise::{normalize_trials, MAX_TEXT_CHARS};
pub use sources::clinicaltrials::ClinicalTrialsClient;
pub use sources::TrialSource;
