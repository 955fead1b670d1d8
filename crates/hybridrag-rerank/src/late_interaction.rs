//! ColBERT-style late-interaction reranker.
//!
//! Query and passages are encoded independently into L2-normalized token
//! vectors (BERT + linear projection). Every query position, `[MASK]`
//! padding included, scores its best match among the passage's real
//! tokens; punctuation tokens are left out of the passage side.

use candle_core::{Device, Module};
use candle_nn::{linear_no_bias, Linear};
use candle_transformers::models::bert::BertModel;
use std::collections::HashSet;
use std::path::Path;
use tracing::{debug, info};

use hybridrag_core::config::RerankerSettings;
use hybridrag_core::{Error, Reranker, Result};

use crate::device::select_device;
use crate::model::{load_bundle, resolve_model_dir};
use crate::pool::{l2_normalize_tokens, maxsim, select_tokens};
use crate::tokenize::{doc_layout, encode_plain, pack_batch, punctuation_ids, query_layout, Encoded, SpecialTokens};

const NAME: &str = "colbert";
const DOC_BATCH: usize = 16;

pub struct LateInteractionReranker {
    encoder: BertModel,
    projection: Linear,
    tokenizer: tokenizers::Tokenizer,
    special: SpecialTokens,
    skiplist: HashSet<u32>,
    device: Device,
    max_query_len: usize,
    max_doc_len: usize,
}

fn infer_err(e: impl std::fmt::Display) -> Error { Error::provider(NAME, None, e.to_string()) }

impl LateInteractionReranker {
    pub fn from_settings(settings: &RerankerSettings) -> Result<Self> {
        let dir = resolve_model_dir(&settings.colbert_model)?;
        let device = select_device(settings.device.as_deref())?;
        Self::load(&dir, &device, settings.max_query_len, settings.max_doc_len)
    }

    pub fn load(dir: &Path, device: &Device, max_query_len: usize, max_doc_len: usize) -> Result<Self> {
        let bundle = load_bundle(dir, device)?;
        let encoder = bundle.load_encoder()?;

        let out_dim = bundle
            .tensor_dims("linear.weight")
            .and_then(|d| d.first().copied())
            .ok_or_else(|| Error::RerankerInit(format!("{}: no linear.weight projection", dir.display())))?;
        let projection = linear_no_bias(bundle.shape.hidden_size, out_dim, bundle.var_builder().pp("linear"))
            .map_err(|e| Error::RerankerInit(format!("{}: {e}", dir.display())))?;

        let special = SpecialTokens::late_interaction(&bundle.tokenizer)?;
        let skiplist = punctuation_ids(&bundle.tokenizer);
        let max_positions = bundle.shape.max_positions();
        info!(path = %dir.display(), out_dim, max_query_len, max_doc_len, "late-interaction reranker ready");
        Ok(Self {
            encoder,
            projection,
            tokenizer: bundle.tokenizer,
            special,
            skiplist,
            device: device.clone(),
            max_query_len: max_query_len.min(max_positions),
            max_doc_len: max_doc_len.min(max_positions),
        })
    }

    /// Normalized token vectors for each row, restricted to the positions
    /// flagged in `keep`.
    fn encode(&self, rows: &[Encoded], keep: &[Vec<bool>]) -> Result<Vec<Vec<Vec<f32>>>> {
        let (ids, type_ids, mask) = pack_batch(rows, self.special.pad, &self.device).map_err(infer_err)?;
        let hidden = self.encoder.forward(&ids, &type_ids, Some(&mask)).map_err(infer_err)?;
        let projected = self.projection.forward(&hidden).map_err(infer_err)?;
        let unit = l2_normalize_tokens(&projected).map_err(infer_err)?;
        let tokens: Vec<Vec<Vec<f32>>> = unit.to_vec3().map_err(infer_err)?;
        Ok(select_tokens(tokens, keep))
    }

    pub fn encode_query(&self, query: &str) -> Result<Vec<Vec<f32>>> {
        let tokens = encode_plain(&self.tokenizer, query)?;
        let row = query_layout(&tokens, &self.special, self.max_query_len);
        let keep = vec![vec![true; row.len()]];
        Ok(self.encode(std::slice::from_ref(&row), &keep)?.into_iter().next().unwrap_or_default())
    }

    /// Attended, non-punctuation positions of a passage.
    fn doc_keep(&self, row: &Encoded) -> Vec<bool> {
        row.ids.iter().zip(&row.mask).map(|(id, &m)| m != 0 && !self.skiplist.contains(id)).collect()
    }

    pub fn encode_docs(&self, passages: &[String]) -> Result<Vec<Vec<Vec<f32>>>> {
        let mut out = Vec::with_capacity(passages.len());
        for chunk in passages.chunks(DOC_BATCH) {
            let rows = chunk
                .iter()
                .map(|p| encode_plain(&self.tokenizer, p).map(|t| doc_layout(&t, &self.special, self.max_doc_len)))
                .collect::<Result<Vec<_>>>()?;
            let keep: Vec<Vec<bool>> = rows.iter().map(|r| self.doc_keep(r)).collect();
            out.extend(self.encode(&rows, &keep)?);
        }
        Ok(out)
    }
}

impl Reranker for LateInteractionReranker {
    fn name(&self) -> &str { NAME }

    fn score(&self, query: &str, passages: &[String]) -> Result<Vec<f32>> {
        if passages.is_empty() { return Ok(Vec::new()); }
        let q = self.encode_query(query)?;
        let docs = self.encode_docs(passages)?;
        debug!(query_tokens = q.len(), passages = docs.len(), "maxsim scoring");
        Ok(docs.iter().map(|d| maxsim(&q, d)).collect())
    }
}
