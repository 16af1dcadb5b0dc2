//! Shared application state for the web server.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, RwLock};

use trialnlp_common::config::Config;
use trialnlp_common::{EntityMention, Trial};
use trialnlp_ingestion::{CachedTrialSource, ClinicalTrialsClient, TrialSource};
use trialnlp_ner::NerPipeline;

/// Events pushed to connected clients via SSE.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AppEvent {
    /// Fetch/NER pipeline progress
    PipelineStatus { stage: String, message: String, count: u64 },
    /// General notification
    Notification { level: String, message: String },
}

/// Timings of the last fetch, shown in the status caption.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Timing {
    pub query: String,
    pub fetched_at: Option<DateTime<Utc>>,
    pub fetch_secs: Option<f64>,
    pub ner_secs: Option<f64>,
    pub n_entities: Option<usize>,
}

/// The single dashboard session. Replaced wholesale by every fetch.
#[derive(Debug, Default)]
pub struct Session {
    pub trials: Vec<Trial>,
    pub entities: Vec<EntityMention>,
    pub timing: Timing,
    /// Selected trial per tab, keyed by tab slug.
    pub selected: HashMap<&'static str, String>,
    pub ner_error: Option<String>,
    pub fetch_error: Option<String>,
    /// Last form values, echoed back into the sidebar.
    pub last_query: Option<String>,
    pub last_max_results: Option<usize>,
    /// Bumped by every successful fetch; stale NER results are discarded.
    pub generation: u64,
}

impl Session {
    pub fn has_trials(&self) -> bool {
        !self.trials.is_empty()
    }

    pub fn trial(&self, nct_id: &str) -> Option<&Trial> {
        self.trials.iter().find(|t| t.nct_id == nct_id)
    }

    /// Resolve the trial shown on `tab`: an explicit choice is remembered,
    /// otherwise the remembered one, otherwise the first trial.
    pub fn select(&mut self, tab: &'static str, requested: Option<&str>) -> Option<Trial> {
        let chosen = requested
            .filter(|id| self.trial(id).is_some())
            .map(str::to_string)
            .or_else(|| self.selected.get(tab).filter(|id| self.trial(id).is_some()).cloned())
            .or_else(|| self.trials.first().map(|t| t.nct_id.clone()))?;

        self.selected.insert(tab, chosen.clone());
        self.trial(&chosen).cloned()
    }

    pub fn mentions_for<'a>(&'a self, nct_id: &'a str) -> impl Iterator<Item = &'a EntityMention> + 'a {
        self.entities.iter().filter(move |m| m.nct_id == nct_id)
    }
}

/// Shared state injected into every Axum handler.
pub struct AppState {
    pub config: Config,
    pub source: Arc<dyn TrialSource>,
    pub pipeline: Arc<NerPipeline>,
    pub session: RwLock<Session>,
    /// Broadcast channel for SSE push events
    pub event_tx: broadcast::Sender<AppEvent>,
}

impl AppState {
    /// Live registry client behind the TTL cache, NER passes from config.
    pub fn new(config: Config) -> anyhow::Result<Self> {
        let client = ClinicalTrialsClient::from_config(&config.fetch)?;
        let source = CachedTrialSource::new(
            client,
            Duration::from_secs(config.fetch.cache_ttl_secs),
            config.fetch.cache_capacity,
        );
        let pipeline = NerPipeline::from_settings(&config.ner);
        Ok(Self::with_parts(config, Arc::new(source), Arc::new(pipeline)))
    }

    pub fn with_parts(config: Config, source: Arc<dyn TrialSource>, pipeline: Arc<NerPipeline>) -> Self {
        let (event_tx, _) = broadcast::channel(256);
        Self {
            config,
            source,
            pipeline,
            session: RwLock::new(Session::default()),
            event_tx,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AppEvent> {
        self.event_tx.subscribe()
    }

    pub fn publish(&self, stage: &str, message: impl Into<String>, count: u64) {
        let _ = self.event_tx.send(AppEvent::PipelineStatus {
            stage: stage.to_string(),
            message: message.into(),
            count,
        });
    }

    pub fn notify(&self, level: &str, message: impl Into<String>) {
        let _ = self.event_tx.send(AppEvent::Notification {
            level: level.to_string(),
            message: message.into(),
        });
    }
}

pub type SharedState = Arc<AppState>;
