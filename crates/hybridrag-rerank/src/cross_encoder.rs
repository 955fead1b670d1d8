//! Pairwise cross-attention reranker (BERT sequence classifier).

use candle_core::{Device, IndexOp, Module, Tensor};
use candle_nn::{linear, Linear};
use candle_transformers::models::bert::BertModel;
use std::path::Path;
use tracing::info;

use hybridrag_core::config::RerankerSettings;
use hybridrag_core::{Error, Reranker, Result};

use crate::device::select_device;
use crate::model::{load_bundle, resolve_model_dir};
use crate::tokenize::{encode_plain, pack_batch, pair_layout, SpecialTokens};

const NAME: &str = "crossencoder";
const PAIR_BATCH: usize = 16;

pub struct CrossEncoderReranker {
    encoder: BertModel,
    pooler: Linear,
    classifier: Linear,
    tokenizer: tokenizers::Tokenizer,
    special: SpecialTokens,
    device: Device,
    max_len: usize,
}

fn infer_err(e: impl std::fmt::Display) -> Error { Error::provider(NAME, None, e.to_string()) }

impl CrossEncoderReranker {
    pub fn from_settings(settings: &RerankerSettings) -> Result<Self> {
        let dir = resolve_model_dir(&settings.cross_encoder_model)?;
        let device = select_device(settings.device.as_deref())?;
        Self::load(&dir, &device)
    }

    pub fn load(dir: &Path, device: &Device) -> Result<Self> {
        let bundle = load_bundle(dir, device)?;
        let encoder = bundle.load_encoder()?;
        let hidden = bundle.shape.hidden_size;
        let init = |e: candle_core::Error| Error::RerankerInit(format!("{}: {e}", dir.display()));

        let pooler_path = match bundle.encoder_prefix() { Some(prefix) => format!("{prefix}.pooler.dense"), None => "pooler.dense".to_string() };
        let vb = bundle.var_builder();
        let pooler = linear(hidden, hidden, vb.pp(pooler_path)).map_err(init)?;
        let labels = bundle.tensor_dims("classifier.weight").and_then(|d| d.first().copied()).unwrap_or(1);
        let classifier = linear(hidden, labels, vb.pp("classifier")).map_err(init)?;

        let special = SpecialTokens::pair(&bundle.tokenizer)?;
        let max_len = bundle.shape.max_positions();
        info!(path = %dir.display(), max_len, labels, "cross-encoder reranker ready");
        Ok(Self { encoder, pooler, classifier, tokenizer: bundle.tokenizer, special, device: device.clone(), max_len })
    }

    /// First-label logit for each row of the batch.
    fn logits(&self, ids: &Tensor, type_ids: &Tensor, mask: &Tensor) -> candle_core::Result<Vec<f32>> {
        let hidden = self.encoder.forward(ids, type_ids, Some(mask))?;
        let cls = hidden.i((.., 0))?;
        let pooled = self.pooler.forward(&cls)?.tanh()?;
        let logits = self.classifier.forward(&pooled)?;
        logits.i((.., 0))?.to_vec1::<f32>()
    }
}

impl Reranker for CrossEncoderReranker {
    fn name(&self) -> &str { NAME }

    fn score(&self, query: &str, passages: &[String]) -> Result<Vec<f32>> {
        if passages.is_empty() { return Ok(Vec::new()); }
        let q = encode_plain(&self.tokenizer, query)?;
        let mut scores = Vec::with_capacity(passages.len());
        for chunk in passages.chunks(PAIR_BATCH) {
            let rows = chunk
                .iter()
                .map(|p| encode_plain(&self.tokenizer, p).map(|t| pair_layout(&q, &t, &self.special, self.max_len)))
                .collect::<Result<Vec<_>>>()?;
            let (ids, type_ids, mask) = pack_batch(&rows, self.special.pad, &self.device).map_err(infer_err)?;
            scores.extend(self.logits(&ids, &type_ids, &mask).map_err(infer_err)?);
        }
        Ok(scores)
    }
}
