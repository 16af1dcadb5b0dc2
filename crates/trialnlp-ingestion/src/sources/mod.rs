//! Trial registry clients.

pub mod clinicaltrials;

use async_trait::async_trait;
use trialnlp_common::{RawStudy, Result};

/// Common interface for trial registries.
#[async_trait]
pub trait TrialSource: Send + Sync {
    /// Search for studies matching a condition/keyword, at most `max_results`.
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<RawStudy>>;
}
