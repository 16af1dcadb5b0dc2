//! HTTP handlers for all web routes.

pub mod api;
pub mod entities;
pub mod export;
pub mod fetch;
pub mod heatmaps;
pub mod studies;
pub mod trial_nlp;

use serde::Deserialize;

/// `?nct=` trial selection carried by the per-trial tabs.
#[derive(Debug, Default, Deserialize)]
pub struct TrialQuery {
    pub nct: Option<String>,
}
