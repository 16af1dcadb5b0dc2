//! BERT token-classification NER with candle.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Instant;

use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{BertModel, Config, HiddenAct, PositionEmbeddingType};
use hf_hub::api::sync::Api;
use hf_hub::{Repo, RepoType};
use tokenizers::Tokenizer;
use tracing::{debug, info};

use crate::entity_types::strip_bio_prefix;
use crate::recognizer::{EntityRecognizer, NerEntity};
use crate::{NerError, Result};

/// NER configuration.
#[derive(Debug, Clone)]
pub struct NerConfig {
    pub model_id: String,
    pub max_length: usize,
    pub use_gpu: bool,
}

impl Default for NerConfig {
    fn default() -> Self {
        Self {
            model_id: "d4data/biomedical-ner-all".to_string(),
            max_length: 512,
            use_gpu: false,
        }
    }
}

impl NerConfig {
    pub fn biomedical() -> Self {
        Self::default()
    }

    pub fn diseases() -> Self {
        Self { model_id: "alvaroalon2/biobert_diseases_ner".to_string(), ..Self::default() }
    }

    pub fn chemicals() -> Self {
        Self { model_id: "alvaroalon2/biobert_chemical_ner".to_string(), ..Self::default() }
    }

    pub fn genes() -> Self {
        Self { model_id: "alvaroalon2/biobert_genetic_ner".to_string(), ..Self::default() }
    }
}

struct ModelFiles {
    bert_config: Config,
    tokenizer: Tokenizer,
    weights: PathBuf,
    label_map: HashMap<i64, String>,
}

/// NER model wrapper.
pub struct NerModel {
    model: BertModel,
    tokenizer: Tokenizer,
    classifier: Tensor,
    classifier_bias: Option<Tensor>,
    label_map: HashMap<i64, String>,
    config: NerConfig,
    device: Device,
}

impl NerModel {
    /// Load a NER model from the Hugging Face Hub. Blocking: downloads on first use.
    pub fn load(config: NerConfig) -> Result<Self> {
        let start = Instant::now();
        info!("Loading NER model: {}", config.model_id);

        let device = if config.use_gpu {
            Device::cuda_if_available(0).unwrap_or(Device::Cpu)
        } else {
            Device::Cpu
        };
        debug!("Using device: {:?}", device);

        let files = Self::download_model(&config.model_id)?;

        info!("Loading model weights from {:?}", files.weights);
        let vb = unsafe {
            VarBuilder::from_mmaped_safetensors(&[files.weights.clone()], DType::F32, &device)
                .map_err(|e| NerError::ModelLoad(e.to_string()))?
        };

        // Token-classification checkpoints nest the encoder under `bert.`
        let model = BertModel::load(vb.pp("bert"), &files.bert_config)
            .or_else(|_| BertModel::load(vb.clone(), &files.bert_config))
            .map_err(|e| NerError::ModelLoad(format!("BertModel: {}", e)))?;

        let num_labels = files.label_map.len().max(1);
        let hidden_size = files.bert_config.hidden_size;

        // Classifier weight is [num_labels, hidden]; applied as hidden @ weight.T
        let classifier = vb
            .pp("classifier")
            .get((num_labels, hidden_size), "weight")
            .map_err(|e| NerError::ModelLoad(format!("Classifier: {}", e)))?;
        let classifier_bias = vb.pp("classifier").get(num_labels, "bias").ok();

        info!("NER model loaded in {:?} ({} labels)", start.elapsed(), num_labels);

        Ok(Self {
            model,
            tokenizer: files.tokenizer,
            classifier,
            classifier_bias,
            label_map: files.label_map,
            config,
            device,
        })
    }

    fn download_model(model_id: &str) -> Result<ModelFiles> {
        let api = Api::new().map_err(|e| NerError::Download(format!("API init: {}", e)))?;
        let api_repo = api.repo(Repo::new(model_id.to_string(), RepoType::Model));

        let config_path = api_repo
            .get("config.json")
            .map_err(|e| NerError::Download(format!("config.json: {}", e)))?;
        let config_json: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&config_path)?)
            .map_err(|e| NerError::ModelLoad(format!("Parse config: {}", e)))?;

        let label_map: HashMap<i64, String> = config_json["id2label"]
            .as_object()
            .map(|obj| {
                obj.iter()
                    .filter_map(|(k, v)| Some((k.parse().ok()?, v.as_str()?.to_string())))
                    .collect()
            })
            .unwrap_or_default();
        if label_map.is_empty() {
            return Err(NerError::ModelLoad(format!("{} has no id2label map", model_id)));
        }

        let bert_config = bert_config_from_json(&config_json);

        let tokenizer = if let Ok(tok_path) = api_repo.get("tokenizer.json") {
            debug!("Loading tokenizer from: {:?}", tok_path);
            Tokenizer::from_file(&tok_path).map_err(|e| NerError::Tokenization(e.to_string()))?
        } else {
            let vocab_path = api_repo
                .get("vocab.txt")
                .map_err(|e| NerError::Tokenization(format!("No tokenizer found: {}", e)))?;
            let lowercase = api_repo
                .get("tokenizer_config.json")
                .ok()
                .and_then(|p| std::fs::read_to_string(p).ok())
                .and_then(|s| serde_json::from_str::<serde_json::Value>(&s).ok())
                .and_then(|v| v["do_lower_case"].as_bool())
                .unwrap_or(false);
            wordpiece_tokenizer(&vocab_path, lowercase)?
        };

        let weights = api_repo
            .get("model.safetensors")
            .map_err(|e| NerError::Download(format!("Model weights: {}", e)))?;

        Ok(ModelFiles { bert_config, tokenizer, weights, label_map })
    }

    pub fn config(&self) -> &NerConfig {
        &self.config
    }

    /// Extract entities from text. Texts longer than the model window are
    /// processed window by window; offsets always refer to `text`.
    pub fn extract(&self, text: &str) -> Result<Vec<NerEntity>> {
        let start = Instant::now();

        let encoding = self
            .tokenizer
            .encode(text, false)
            .map_err(|e| NerError::Tokenization(e.to_string()))?;

        let ids = encoding.get_ids();
        let offsets = encoding.get_offsets();
        let word_ids = encoding.get_word_ids();
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let cls = self.tokenizer.token_to_id("[CLS]");
        let sep = self.tokenizer.token_to_id("[SEP]");
        let reserved = cls.is_some() as usize + sep.is_some() as usize;
        let window = self.config.max_length.saturating_sub(reserved).max(1);

        let mut tags = Vec::with_capacity(ids.len());
        for (w, chunk) in ids.chunks(window).enumerate() {
            let probs = self.classify_window(chunk, cls, sep)?;
            let lead = cls.is_some() as usize;

            for (i, row) in probs.iter().skip(lead).take(chunk.len()).enumerate() {
                let g = w * window + i;
                let (best, score) = row
                    .iter()
                    .copied()
                    .enumerate()
                    .fold((0usize, f32::MIN), |acc, (j, p)| if p > acc.1 { (j, p) } else { acc });
                let label = self
                    .label_map
                    .get(&(best as i64))
                    .cloned()
                    .unwrap_or_else(|| "O".to_string());
                let continues_word = g > 0 && word_ids[g].is_some() && word_ids[g] == word_ids[g - 1];
                let (s, e) = offsets[g];
                tags.push(TokenTag { label, start: s, end: e, score, continues_word });
            }
        }

        let entities = decode_bio(text, &tags);
        debug!("Extracted {} entities in {:?}", entities.len(), start.elapsed());
        Ok(entities)
    }

    /// Run one window through encoder + classifier; returns per-token label probabilities.
    fn classify_window(&self, chunk: &[u32], cls: Option<u32>, sep: Option<u32>) -> Result<Vec<Vec<f32>>> {
        let mut input: Vec<u32> = Vec::with_capacity(chunk.len() + 2);
        input.extend(cls);
        input.extend_from_slice(chunk);
        input.extend(sep);
        let seq_len = input.len();

        let input_ids = Tensor::new(input.as_slice(), &self.device)?.unsqueeze(0)?;
        let token_type_ids = input_ids.zeros_like()?;
        let attention_mask = Tensor::ones((1, seq_len), DType::F32, &self.device)?;

        // [1, seq, hidden] -> [seq, hidden]
        let hidden = self
            .model
            .forward(&input_ids, &token_type_ids, Some(&attention_mask))?
            .squeeze(0)?;

        let mut logits = hidden.matmul(&self.classifier.t()?)?;
        if let Some(bias) = &self.classifier_bias {
            logits = logits.broadcast_add(bias)?;
        }

        let probs = candle_nn::ops::softmax(&logits, 1)?;
        Ok(probs.to_vec2::<f32>()?)
    }
}

impl EntityRecognizer for NerModel {
    fn name(&self) -> &str {
        &self.config.model_id
    }

    fn recognize(&self, text: &str) -> Result<Vec<NerEntity>> {
        self.extract(text)
    }
}

fn bert_config_from_json(v: &serde_json::Value) -> Config {
    let get = |key: &str, default: u64| v[key].as_u64().unwrap_or(default) as usize;
    let hidden_act = match v["hidden_act"].as_str() {
        Some("relu") => HiddenAct::Relu,
        Some("gelu_new") | Some("gelu_approximate") => HiddenAct::GeluApproximate,
        _ => HiddenAct::Gelu,
    };

    Config {
        vocab_size: get("vocab_size", 30522),
        hidden_size: get("hidden_size", 768),
        num_hidden_layers: get("num_hidden_layers", 12),
        num_attention_heads: get("num_attention_heads", 12),
        intermediate_size: get("intermediate_size", 3072),
        hidden_act,
        hidden_dropout_prob: v["hidden_dropout_prob"].as_f64().unwrap_or(0.1),
        max_position_embeddings: get("max_position_embeddings", 512),
        type_vocab_size: get("type_vocab_size", 2),
        initializer_range: v["initializer_range"].as_f64().unwrap_or(0.02),
        layer_norm_eps: v["layer_norm_eps"].as_f64().unwrap_or(1e-12),
        pad_token_id: get("pad_token_id", 0),
        position_embedding_type: PositionEmbeddingType::Absolute,
        use_cache: true,
        classifier_dropout: None,
        model_type: Some("bert".to_string()),
    }
}

/// WordPiece tokenizer for repos that only ship `vocab.txt`.
fn wordpiece_tokenizer(vocab_path: &std::path::Path, lowercase: bool) -> Result<Tokenizer> {
    use tokenizers::models::wordpiece::WordPiece;
    use tokenizers::normalizers::bert::BertNormalizer;
    use tokenizers::pre_tokenizers::bert::BertPreTokenizer;
    use tokenizers::{
        DecoderWrapper, ModelWrapper, NormalizerWrapper, PostProcessorWrapper, PreTokenizerWrapper,
        TokenizerBuilder,
    };

    let wordpiece = WordPiece::from_file(&vocab_path.to_string_lossy())
        .unk_token("[UNK]".to_string())
        .continuing_subword_prefix("##".to_string())
        .max_input_chars_per_word(100)
        .build()
        .map_err(|e| NerError::Tokenization(format!("WordPiece: {}", e)))?;

    let inner = TokenizerBuilder::<
        ModelWrapper,
        NormalizerWrapper,
        PreTokenizerWrapper,
        PostProcessorWrapper,
        DecoderWrapper,
    >::new()
    .with_model(wordpiece.into())
    .with_normalizer(Some(BertNormalizer::new(true, true, None, lowercase).into()))
    .with_pre_tokenizer(Some(BertPreTokenizer.into()))
    .build()
    .map_err(|e| NerError::Tokenization(e.to_string()))?;

    Ok(Tokenizer::from(inner))
}

/// Per-token prediction fed to BIO decoding.
#[derive(Debug, Clone, PartialEq)]
pub struct TokenTag {
    /// Raw model label, e.g. `B-Disease`, `I-Disease`, `O`.
    pub label: String,
    pub start: usize,
    pub end: usize,
    pub score: f32,
    /// Word-piece continuation of the previous token's word.
    pub continues_word: bool,
}

struct OpenSpan {
    label: String,
    start: usize,
    end: usize,
    score_sum: f32,
    tokens: usize,
}

impl OpenSpan {
    fn new(label: &str, tag: &TokenTag) -> Self {
        Self { label: label.to_string(), start: tag.start, end: tag.end, score_sum: tag.score, tokens: 1 }
    }

    fn extend(&mut self, tag: &TokenTag) {
        self.end = self.end.max(tag.end);
        self.score_sum += tag.score;
        self.tokens += 1;
    }

    fn close(self, text: &str, out: &mut Vec<NerEntity>) {
        if let Some(surface) = text.get(self.start..self.end) {
            out.push(NerEntity {
                text: surface.to_string(),
                label: self.label,
                start: self.start,
                end: self.end,
                score: Some(self.score_sum / self.tokens as f32),
            });
        }
    }
}

/// Merge token predictions into entity spans.
///
/// `B-X` opens a span; `I-X` extends a span of the same type or opens a new
/// one; `O` closes. Word-piece continuations follow the word they belong to.
/// Unprefixed labels (IO schemes) behave like `I-`.
pub fn decode_bio(text: &str, tags: &[TokenTag]) -> Vec<NerEntity> {
    let mut entities = Vec::new();
    let mut current: Option<OpenSpan> = None;

    for tag in tags {
        if tag.continues_word {
            if let Some(span) = current.as_mut() {
                span.extend(tag);
            }
            continue;
        }

        let raw = tag.label.trim();
        if raw.is_empty() || raw == "O" {
            if let Some(span) = current.take() {
                span.close(text, &mut entities);
            }
            continue;
        }

        let entity_type = strip_bio_prefix(raw);
        let is_begin = raw.starts_with("B-") || raw.starts_with("S-") || raw.starts_with("U-");

        match current.as_mut() {
            Some(span) if !is_begin && span.label == entity_type => span.extend(tag),
            _ => {
                if let Some(span) = current.take() {
                    span.close(text, &mut entities);
                }
                current = Some(OpenSpan::new(entity_type, tag));
            }
        }
    }

    if let Some(span) = current {
        span.close(text, &mut entities);
    }

    entities
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tag(label: &str, start: usize, end: usize, continues_word: bool) -> TokenTag {
        TokenTag { label: label.to_string(), start, end, score: 0.9, continues_word }
    }

    #[test]
    fn test_decode_simple_bio() {
        let text = "Type 2 diabetes treated with metformin";
        let tags = vec![
            tag("B-Disease", 0, 4, false),
            tag("I-Disease", 5, 6, false),
            tag("I-Disease", 7, 15, false),
            tag("O", 16, 23, false),
            tag("O", 24, 28, false),
            tag("B-Chemical", 29, 38, false),
        ];
        let ents = decode_bio(text, &tags);
        assert_eq!(ents.len(), 2);
        assert_eq!(ents[0].text, "Type 2 diabetes");
        assert_eq!(ents[0].label, "Disease");
        assert_eq!((ents[0].start, ents[0].end), (0, 15));
        assert_eq!(ents[1].text, "metformin");
        assert_eq!(ents[1].label, "Chemical");
    }

    #[test]
    fn test_wordpiece_continuation_extends_span() {
        let text = "metformin";
        let tags = vec![
            tag("B-Chemical", 0, 3, false),
            tag("O", 3, 6, true),
            tag("I-Chemical", 6, 9, true),
        ];
        let ents = decode_bio(text, &tags);
        assert_eq!(ents.len(), 1);
        assert_eq!(ents[0].text, "metformin");
    }

    #[test]
    fn test_type_switch_starts_new_span() {
        let text = "EGFR cancer";
        let tags = vec![tag("I-GENE", 0, 4, false), tag("I-Disease", 5, 11, false)];
        let ents = decode_bio(text, &tags);
        assert_eq!(ents.len(), 2);
        assert_eq!(ents[0].label, "GENE");
        assert_eq!(ents[1].label, "Disease");
    }

    #[test]
    fn test_consecutive_begins_split() {
        let text = "aspirin ibuprofen";
        let tags = vec![tag("B-Chemical", 0, 7, false), tag("B-Chemical", 8, 17, false)];
        let ents = decode_bio(text, &tags);
        assert_eq!(ents.len(), 2);
    }

    #[test]
    fn test_orphan_continuation_ignored() {
        let tags = vec![tag("I-Disease", 0, 3, true), tag("O", 4, 5, false)];
        assert!(decode_bio("abc d", &tags).is_empty());
    }

    #[test]
    fn test_out_of_range_offsets_dropped() {
        let tags = vec![tag("B-Disease", 0, 50, false)];
        assert!(decode_bio("short", &tags).is_empty());
    }

    #[test]
    fn test_score_is_mean_of_tokens() {
        let mut tags = vec![tag("B-Disease", 0, 2, false), tag("I-Disease", 3, 5, false)];
        tags[0].score = 1.0;
        tags[1].score = 0.5;
        let ents = decode_bio("ab cd", &tags);
        assert_eq!(ents[0].score, Some(0.75));
    }

    #[test]
    fn test_config_presets() {
        assert_eq!(NerConfig::default().model_id, "d4data/biomedical-ner-all");
        assert!(NerConfig::genes().model_id.contains("genetic"));
        assert_eq!(NerConfig::diseases().max_length, 512);
    }

    #[test]
    fn test_bert_config_from_json_defaults() {
        let cfg = bert_config_from_json(&serde_json::json!({ "hidden_size": 384, "hidden_act": "relu" }));
        assert_eq!(cfg.hidden_size, 384);
        assert_eq!(cfg.num_hidden_layers, 12);
        assert!(matches!(cfg.hidden_act, HiddenAct::Relu));
    }
}
