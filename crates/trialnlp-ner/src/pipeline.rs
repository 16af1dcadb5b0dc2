//! Multi-pass biomedical NER over a batch of trials.
//!
//! Each configured pass loads one recognizer, runs it across every trial and
//! drops it before the next pass loads, so only one model is resident at a
//! time. Spans from all passes are turned into `EntityMention` rows,
//! filtered and deduplicated.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info};
use trialnlp_common::config::{NerBackend, NerPass, NerSettings};
use trialnlp_common::{EntityMention, LabelGroup, Trial};

use crate::entity_types::{map_label_group, normalize_entity_text};
use crate::ner_model::{NerConfig, NerModel};
use crate::recognizer::{EntityRecognizer, NerEntity};
use crate::trie_ner::{LexiconCategory, TrieNer};
use crate::{NerError, Result};

/// Builds the recognizer for a pass.
pub trait RecognizerLoader: Send + Sync {
    fn load(&self, pass: &NerPass) -> Result<Box<dyn EntityRecognizer>>;
}

/// Loads candle models from the Hub or builds the embedded dictionary matcher.
#[derive(Debug, Clone)]
pub struct DefaultLoader {
    pub max_length: usize,
    pub use_gpu: bool,
}

impl DefaultLoader {
    pub fn from_settings(settings: &NerSettings) -> Self {
        Self { max_length: settings.max_length, use_gpu: settings.use_gpu }
    }
}

impl RecognizerLoader for DefaultLoader {
    fn load(&self, pass: &NerPass) -> Result<Box<dyn EntityRecognizer>> {
        match pass.backend {
            NerBackend::Model => {
                let model_id = pass.model_id.clone().ok_or_else(|| {
                    NerError::InvalidInput(format!("pass {} has no model_id", pass.source))
                })?;
                let model = NerModel::load(NerConfig {
                    model_id,
                    max_length: self.max_length,
                    use_gpu: self.use_gpu,
                })?;
                Ok(Box::new(model))
            }
            NerBackend::Dictionary => {
                let mut categories = Vec::new();
                for name in &pass.lexicon {
                    let cat = LexiconCategory::parse(name).ok_or_else(|| {
                        NerError::InvalidInput(format!("unknown lexicon category {name:?}"))
                    })?;
                    categories.push(cat);
                }
                Ok(Box::new(TrieNer::with_categories(&categories)?))
            }
        }
    }
}

/// A sequence of NER passes plus the row filters applied to their output.
pub struct NerPipeline {
    passes: Vec<NerPass>,
    loader: Arc<dyn RecognizerLoader>,
    min_norm_chars: usize,
}

impl NerPipeline {
    pub fn new(passes: Vec<NerPass>, loader: Arc<dyn RecognizerLoader>) -> Self {
        Self { passes, loader, min_norm_chars: 2 }
    }

    pub fn from_settings(settings: &NerSettings) -> Self {
        Self {
            passes: settings.passes.clone(),
            loader: Arc::new(DefaultLoader::from_settings(settings)),
            min_norm_chars: settings.min_norm_chars,
        }
    }

    pub fn with_loader(mut self, loader: Arc<dyn RecognizerLoader>) -> Self {
        self.loader = loader;
        self
    }

    pub fn pass_names(&self) -> Vec<&str> {
        self.passes.iter().map(|p| p.source.as_str()).collect()
    }

    /// Run every pass over `trials`. Blocking; call from a blocking task.
    pub fn run(&self, trials: &[Trial]) -> Result<Vec<EntityMention>> {
        if trials.is_empty() {
            return Ok(Vec::new());
        }

        let mut mentions = Vec::new();
        for pass in &self.passes {
            let start = Instant::now();
            info!("Loading NER pass {} ({:?})", pass.source, pass.backend);
            let recognizer = self.loader.load(pass)?;

            let found = run_one_pass(trials, recognizer.as_ref(), &pass.source)?;
            info!(
                "Pass {} [{}] produced {} mentions in {:?}",
                pass.source,
                recognizer.name(),
                found.len(),
                start.elapsed()
            );
            mentions.extend(found);
            // recognizer dropped here, before the next pass loads
        }

        let min = self.min_norm_chars;
        mentions.retain(|m| m.entity_norm.chars().count() >= min);
        Ok(dedupe_mentions(mentions))
    }
}

fn run_one_pass(
    trials: &[Trial],
    recognizer: &dyn EntityRecognizer,
    source: &str,
) -> Result<Vec<EntityMention>> {
    let annotate = |trial: &Trial| -> Result<Vec<EntityMention>> {
        if trial.nct_id.is_empty() || trial.text_used_trunc.trim().is_empty() {
            return Ok(Vec::new());
        }
        let spans = recognizer.recognize(&trial.text_used_trunc)?;
        debug!(nct_id = %trial.nct_id, n = spans.len(), "pass {}", source);
        Ok(spans
            .into_iter()
            .filter_map(|span| to_mention(trial, source, span))
            .collect())
    };

    #[cfg(feature = "parallel")]
    let per_trial: Vec<Vec<EntityMention>> = {
        use rayon::prelude::*;
        trials.par_iter().map(annotate).collect::<Result<_>>()?
    };

    #[cfg(not(feature = "parallel"))]
    let per_trial: Vec<Vec<EntityMention>> = trials.iter().map(annotate).collect::<Result<_>>()?;

    Ok(per_trial.into_iter().flatten().collect())
}

/// Turn a recognizer span into a mention row; blank spans are dropped.
/// Offsets are moved onto the trimmed surface form.
fn to_mention(trial: &Trial, source: &str, span: NerEntity) -> Option<EntityMention> {
    let lead = span.text.len() - span.text.trim_start().len();
    let entity_text = span.text.trim();
    if entity_text.is_empty() {
        return None;
    }
    let start = span.start + lead;
    let end = start + entity_text.len();

    let label_group: LabelGroup = map_label_group(&span.label);
    Some(EntityMention {
        nct_id: trial.nct_id.clone(),
        entity_text: entity_text.to_string(),
        entity_norm: normalize_entity_text(entity_text),
        label_raw: format!("{}:{}", source, span.label),
        label_group,
        start,
        end,
        score: span.score,
        text_hash: trial.text_hash.clone(),
    })
}

/// Keep the first mention per `(nct_id, start, end, label_group, entity_norm)`.
pub fn dedupe_mentions(mentions: Vec<EntityMention>) -> Vec<EntityMention> {
    let mut seen = HashSet::new();
    mentions
        .into_iter()
        .filter(|m| {
            seen.insert((
                m.nct_id.clone(),
                m.start,
                m.end,
                m.label_group.clone(),
                m.entity_norm.clone(),
            ))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn trial(id: &str, text: &str) -> Trial {
        Trial {
            nct_id: id.to_string(),
            text_used_trunc: text.to_string(),
            text_hash: format!("hash-{id}"),
            ..Default::default()
        }
    }

    fn dict_pass(source: &str, lexicon: &[&str]) -> NerPass {
        NerPass {
            source: source.to_string(),
            backend: NerBackend::Dictionary,
            model_id: None,
            lexicon: lexicon.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Emits fixed spans and counts how many recognizers are alive at once.
    struct FixedLoader {
        spans: Vec<NerEntity>,
        alive: Arc<AtomicUsize>,
        peak: Arc<AtomicUsize>,
    }

    struct FixedRecognizer {
        spans: Vec<NerEntity>,
        alive: Arc<AtomicUsize>,
    }

    impl Drop for FixedRecognizer {
        fn drop(&mut self) {
            self.alive.fetch_sub(1, Ordering::SeqCst);
        }
    }

    impl EntityRecognizer for FixedRecognizer {
        fn name(&self) -> &str {
            "fixed"
        }
        fn recognize(&self, _text: &str) -> Result<Vec<NerEntity>> {
            Ok(self.spans.clone())
        }
    }

    impl RecognizerLoader for FixedLoader {
        fn load(&self, _pass: &NerPass) -> Result<Box<dyn EntityRecognizer>> {
            let now = self.alive.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            Ok(Box::new(FixedRecognizer { spans: self.spans.clone(), alive: self.alive.clone() }))
        }
    }

    struct FailingLoader;

    impl RecognizerLoader for FailingLoader {
        fn load(&self, pass: &NerPass) -> Result<Box<dyn EntityRecognizer>> {
            Err(NerError::ModelLoad(format!("no weights for {}", pass.source)))
        }
    }

    fn span(text: &str, label: &str, start: usize) -> NerEntity {
        NerEntity { text: text.to_string(), label: label.to_string(), start, end: start + text.len(), score: None }
    }

    #[test]
    fn test_dictionary_passes_tag_source_and_group() {
        let pipeline = NerPipeline::new(
            vec![dict_pass("BC5CDR", &["disease", "chemical"]), dict_pass("JNLPBA", &["gene_protein"])],
            Arc::new(DefaultLoader { max_length: 512, use_gpu: false }),
        );
        let trials = vec![trial("NCT1", "Metformin lowers HbA1c in type 2 diabetes.")];
        let mentions = pipeline.run(&trials).unwrap();

        let rows: Vec<(&str, &str, &str)> = mentions
            .iter()
            .map(|m| (m.entity_norm.as_str(), m.label_raw.as_str(), m.label_group.as_str()))
            .collect();
        assert_eq!(
            rows,
            vec![
                ("metformin", "BC5CDR:Chemical", "DRUG"),
                ("type 2 diabetes", "BC5CDR:Disease", "DISEASE"),
                ("hba1c", "JNLPBA:PROTEIN", "GENE_PROTEIN"),
            ]
        );
        assert!(mentions.iter().all(|m| m.text_hash == "hash-NCT1"));
    }

    #[test]
    fn test_skips_blank_trials() {
        let pipeline = NerPipeline::new(
            vec![dict_pass("ALL", &[])],
            Arc::new(DefaultLoader { max_length: 512, use_gpu: false }),
        );
        let trials = vec![trial("", "metformin"), trial("NCT2", "   ")];
        assert!(pipeline.run(&trials).unwrap().is_empty());
    }

    #[test]
    fn test_one_recognizer_alive_at_a_time() {
        let alive = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let loader = FixedLoader { spans: vec![span("asthma", "Disease", 0)], alive: alive.clone(), peak: peak.clone() };
        let pipeline = NerPipeline::new(
            vec![dict_pass("A", &[]), dict_pass("B", &[]), dict_pass("C", &[])],
            Arc::new(loader),
        );
        let mentions = pipeline.run(&[trial("NCT1", "asthma")]).unwrap();
        assert_eq!(peak.load(Ordering::SeqCst), 1);
        assert_eq!(alive.load(Ordering::SeqCst), 0);
        // same span, same group from three passes collapses to one row
        assert_eq!(mentions.len(), 1);
        assert_eq!(mentions[0].label_raw, "A:Disease");
    }

    #[test]
    fn test_short_and_blank_norms_dropped_and_offsets_trimmed() {
        let loader = FixedLoader {
            spans: vec![span(" x ", "Disease", 0), span("  ", "Disease", 3), span(" (COPD) ", "Disease", 5)],
            alive: Arc::new(AtomicUsize::new(0)),
            peak: Arc::new(AtomicUsize::new(0)),
        };
        let pipeline = NerPipeline::new(vec![dict_pass("A", &[])], Arc::new(loader));
        let text = " x    (COPD) ";
        let mentions = pipeline.run(&[trial("NCT1", text)]).unwrap();
        assert_eq!(mentions.len(), 1);
        let m = &mentions[0];
        assert_eq!(m.entity_text, "(COPD)");
        assert_eq!(m.entity_norm, "copd");
        assert_eq!(&text[m.start..m.end], "(COPD)");
    }

    #[test]
    fn test_load_failure_aborts() {
        let pipeline = NerPipeline::new(vec![dict_pass("BC5CDR", &[])], Arc::new(FailingLoader));
        let err = pipeline.run(&[trial("NCT1", "asthma")]).unwrap_err();
        assert!(matches!(err, NerError::ModelLoad(_)));
    }

    #[test]
    fn test_unknown_lexicon_category_rejected() {
        let loader = DefaultLoader { max_length: 512, use_gpu: false };
        let err = loader.load(&dict_pass("X", &["weather"])).err().unwrap();
        assert!(matches!(err, NerError::InvalidInput(_)));
    }

    #[test]
    fn test_dedupe_keeps_first() {
        let t = trial("NCT1", "asthma");
        let a = to_mention(&t, "A", span("asthma", "Disease", 0)).unwrap();
        let b = to_mention(&t, "B", span("asthma", "DISEASE", 0)).unwrap();
        let c = to_mention(&t, "B", span("asthma", "CELL_TYPE", 0)).unwrap();
        let out = dedupe_mentions(vec![a.clone(), b, c.clone()]);
        assert_eq!(out, vec![a, c]);
    }
}
