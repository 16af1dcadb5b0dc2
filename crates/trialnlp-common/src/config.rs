//! Configuration loading for TrialNLP.
//! Reads trialnlp.toml from the current directory or the path in the TRIALNLP_CONFIG env var.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{Result, TrialNlpError};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default)]
    pub ner: NerSettings,
    #[serde(default)]
    pub display: DisplayConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String { "127.0.0.1".to_string() }
fn default_port() -> u16    { 3001 }

impl Default for ServerConfig {
    fn default() -> Self {
        Self { host: default_host(), port: default_port() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_query")]
    pub default_query: String,
    #[serde(default = "default_max_results")]
    pub default_max_results: usize,
    #[serde(default = "default_max_results_cap")]
    pub max_results_cap: usize,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_cache_ttl")]
    pub cache_ttl_secs: u64,
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: usize,
    #[serde(default = "bool_true")]
    pub include_detailed: bool,
}

fn default_base_url()       -> String { "https://clinicaltrials.gov/api/v2/studies".to_string() }
fn default_query()          -> String { "diabetes".to_string() }
fn default_max_results()    -> usize  { 25 }
fn default_max_results_cap() -> usize { 50 }
fn default_timeout_secs()   -> u64    { 30 }
fn default_cache_ttl()      -> u64    { 3600 }
fn default_cache_capacity() -> usize  { 64 }
fn bool_true()              -> bool   { true }

pub const MIN_RESULTS: usize = 5;

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            default_query: default_query(),
            default_max_results: default_max_results(),
            max_results_cap: default_max_results_cap(),
            timeout_secs: default_timeout_secs(),
            cache_ttl_secs: default_cache_ttl(),
            cache_capacity: default_cache_capacity(),
            include_detailed: true,
        }
    }
}

impl FetchConfig {
    /// Clamp a requested result count into `[MIN_RESULTS, max_results_cap]`.
    pub fn clamp_max_results(&self, requested: usize) -> usize {
        requested.clamp(MIN_RESULTS, self.max_results_cap.max(MIN_RESULTS))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NerBackend {
    /// Candle BERT token classifier pulled from the Hugging Face Hub.
    Model,
    /// Embedded Aho-Corasick lexicon, no downloads.
    Dictionary,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NerPass {
    /// Tag prefixed to every raw label produced by this pass.
    pub source: String,
    pub backend: NerBackend,
    #[serde(default)]
    pub model_id: Option<String>,
    /// Dictionary categories to match (`disease`, `chemical`, `gene_protein`,
    /// `cell_type`). Empty means all of them.
    #[serde(default)]
    pub lexicon: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NerSettings {
    #[serde(default = "default_max_length")]
    pub max_length: usize,
    #[serde(default)]
    pub use_gpu: bool,
    #[serde(default = "default_min_norm_chars")]
    pub min_norm_chars: usize,
    #[serde(default = "default_passes")]
    pub passes: Vec<NerPass>,
}

fn default_max_length()     -> usize { 512 }
fn default_min_norm_chars() -> usize { 2 }

fn default_passes() -> Vec<NerPass> {
    vec![
        NerPass {
            source: "BC5CDR".to_string(),
            backend: NerBackend::Dictionary,
            model_id: Some("alvaroalon2/biobert_diseases_ner".to_string()),
            lexicon: vec!["disease".to_string(), "chemical".to_string()],
        },
        NerPass {
            source: "JNLPBA".to_string(),
            backend: NerBackend::Dictionary,
            model_id: Some("alvaroalon2/biobert_genetic_ner".to_string()),
            lexicon: vec!["gene_protein".to_string(), "cell_type".to_string()],
        },
    ]
}

impl Default for NerSettings {
    fn default() -> Self {
        Self {
            max_length: default_max_length(),
            use_gpu: false,
            min_norm_chars: default_min_norm_chars(),
            passes: default_passes(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisplayConfig {
    #[serde(default = "bool_true")]
    pub show_entity_tags: bool,
    #[serde(default = "default_max_annotated")]
    pub max_annotated_entities: usize,
    #[serde(default = "default_heatmap_top_n")]
    pub heatmap_top_n: usize,
    #[serde(default = "default_overlay_min")]
    pub overlay_numbers_min: usize,
    #[serde(default = "default_entity_table_limit")]
    pub entity_table_limit: usize,
}

fn default_max_annotated()      -> usize { 200 }
fn default_heatmap_top_n()      -> usize { 25 }
fn default_overlay_min()        -> usize { 2 }
fn default_entity_table_limit() -> usize { 2000 }

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            show_entity_tags: true,
            max_annotated_entities: default_max_annotated(),
            heatmap_top_n: default_heatmap_top_n(),
            overlay_numbers_min: default_overlay_min(),
            entity_table_limit: default_entity_table_limit(),
        }
    }
}

impl Config {
    /// Load configuration from trialnlp.toml.
    /// Checks TRIALNLP_CONFIG env var first, then current directory.
    pub fn load() -> Result<Self> {
        let path = std::env::var("TRIALNLP_CONFIG")
            .unwrap_or_else(|_| "trialnlp.toml".to_string());
        Self::from_path(&path)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(TrialNlpError::Config(format!(
                "Config file not found: {}",
                path.display()
            )));
        }

        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)
            .map_err(|e| TrialNlpError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Like [`Config::load`], but a missing or broken file falls back to defaults.
    pub fn load_or_default() -> Self {
        match Self::load() {
            Ok(c) => c,
            Err(e) => {
                tracing::warn!("Using default configuration: {e}");
                Self::default()
            }
        }
    }

    fn validate(&self) -> Result<()> {
        if self.fetch.max_results_cap < MIN_RESULTS {
            return Err(TrialNlpError::Config(format!(
                "fetch.max_results_cap must be at least {MIN_RESULTS}"
            )));
        }
        for pass in &self.ner.passes {
            if pass.source.trim().is_empty() {
                return Err(TrialNlpError::Config("ner.passes[].source must not be empty".into()));
            }
            if pass.backend == NerBackend::Model && pass.model_id.is_none() {
                return Err(TrialNlpError::Config(format!(
                    "ner pass {} uses the model backend but has no model_id",
                    pass.source
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_match_dashboard_constants() {
        let c = Config::default();
        assert_eq!(c.fetch.default_query, "diabetes");
        assert_eq!(c.fetch.default_max_results, 25);
        assert_eq!(c.fetch.max_results_cap, 50);
        assert_eq!(c.display.max_annotated_entities, 200);
        assert_eq!(c.display.heatmap_top_n, 25);
        assert_eq!(c.ner.passes.len(), 2);
    }

    #[test]
    fn test_clamp_max_results() {
        let f = FetchConfig::default();
        assert_eq!(f.clamp_max_results(0), 5);
        assert_eq!(f.clamp_max_results(30), 30);
        assert_eq!(f.clamp_max_results(500), 50);
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let c = Config::from_toml(
            r#"
            [server]
            port = 8080

            [[ner.passes]]
            source = "CUSTOM"
            backend = "dictionary"
            lexicon = ["disease"]
            "#,
        )
        .unwrap();
        assert_eq!(c.server.port, 8080);
        assert_eq!(c.server.host, "127.0.0.1");
        assert_eq!(c.ner.passes.len(), 1);
        assert_eq!(c.ner.passes[0].backend, NerBackend::Dictionary);
        assert_eq!(c.ner.passes[0].lexicon, vec!["disease"]);
        assert_eq!(c.fetch.cache_ttl_secs, 3600);
    }

    #[test]
    fn test_model_pass_requires_model_id() {
        let err = Config::from_toml(
            r#"
            [[ner.passes]]
            source = "BC5CDR"
            backend = "model"
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, TrialNlpError::Config(_)));
    }

    #[test]
    fn test_from_path_reads_file() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        writeln!(f, "[fetch]\ndefault_query = \"asthma\"").unwrap();
        let c = Config::from_path(f.path()).unwrap();
        assert_eq!(c.fetch.default_query, "asthma");
    }

    #[test]
    fn test_missing_file_is_config_error() {
        let err = Config::from_path("/definitely/not/here/trialnlp.toml").unwrap_err();
        assert!(matches!(err, TrialNlpError::Config(_)));
    }
}
