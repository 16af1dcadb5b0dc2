//! Biomedical Named Entity Recognition over clinical-trial text.
//!
//! Two recognizer backends share one trait: a candle BERT token classifier
//! pulled from the Hugging Face Hub, and an embedded dictionary matcher that
//! needs no downloads. The pipeline runs them as sequential passes and turns
//! their spans into `EntityMention` rows; the aggregator derives the
//! co-occurrence and per-trial tables the dashboard renders.

mod entity_types;
mod ner_model;
mod recognizer;

pub mod entity_aggregator;
pub mod pipeline;
pub mod trie_ner;

pub use entity_types::{map_label_group, normalize_entity_text, strip_bio_prefix};
pub use ner_model::{decode_bio, NerConfig, NerModel, TokenTag};
pub use pipeline::{DefaultLoader, NerPipeline, RecognizerLoader};
pub use recognizer::{EntityRecognizer, NerEntity};
pub use trie_ner::{LexiconCategory, TrieNer};

pub type Result<T> = std::result::Result<T, NerError>;

#[derive(Debug, thiserror::Error)]
pub enum NerError {
    #[error("Model loading failed: {0}")]
    ModelLoad(String),

    #[error("Tokenization failed: {0}")]
    Tokenization(String),

    #[error("Inference failed: {0}")]
    Inference(String),

    #[error("Download failed: {0}")]
    Download(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl From<candle_core::Error> for NerError {
    fn from(e: candle_core::Error) -> Self {
        NerError::Inference(e.to_string())
    }
}

impl From<std::io::Error> for NerError {
    fn from(e: std::io::Error) -> Self {
        NerError::Download(e.to_string())
    }
}
