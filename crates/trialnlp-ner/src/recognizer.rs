use crate::Result;

/// A labelled span found in a text.
#[derive(Debug, Clone, PartialEq)]
pub struct NerEntity {
    pub text: String,
    /// Model label with any BIO prefix removed, e.g. `Disease`, `PROTEIN`.
    pub label: String,
    /// Byte offsets into the input text.
    pub start: usize,
    pub end: usize,
    pub score: Option<f32>,
}

/// Anything that turns text into labelled spans.
pub trait EntityRecognizer: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &str;

    fn recognize(&self, text: &str) -> Result<Vec<NerEntity>>;
}
