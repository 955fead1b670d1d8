//! Deterministic token layouts for the rerankers.
//!
//! Texts are tokenized without special tokens; markers, truncation and padding
//! are applied here so the result does not depend on tokenizer.json settings.

use candle_core::{Device, Tensor};
use std::collections::HashSet;
use tokenizers::Tokenizer;

use hybridrag_core::{Error, Result};

const PUNCTUATION: &str = "!\"#$%&'()*+,-./:;<=>?@[\\]^_`{|}~";

/// One encoded sequence: token ids, segment ids and attention mask.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Encoded {
    pub ids: Vec<u32>,
    pub type_ids: Vec<u32>,
    pub mask: Vec<u32>,
}

impl Encoded {
    pub fn len(&self) -> usize { self.ids.len() }

    pub fn is_empty(&self) -> bool { self.ids.is_empty() }

}

/// Vocabulary ids of the special tokens a reranker needs.
#[derive(Debug, Clone, Copy)]
pub struct SpecialTokens {
    pub cls: u32,
    pub sep: u32,
    pub pad: u32,
    pub mask: u32,
    pub query_marker: u32,
    pub doc_marker: u32,
}

fn token_id(tokenizer: &Tokenizer, token: &str) -> Result<u32> {
    tokenizer.token_to_id(token).ok_or_else(|| Error::RerankerInit(format!("tokenizer has no '{token}' token")))
}

impl SpecialTokens {
    /// Tokens for late interaction: BERT specials plus `[unused0]`/`[unused1]` markers.
    pub fn late_interaction(tokenizer: &Tokenizer) -> Result<Self> {
        Ok(Self {
            cls: token_id(tokenizer, "[CLS]")?,
            sep: token_id(tokenizer, "[SEP]")?,
            pad: token_id(tokenizer, "[PAD]")?,
            mask: token_id(tokenizer, "[MASK]")?,
            query_marker: token_id(tokenizer, "[unused0]")?,
            doc_marker: token_id(tokenizer, "[unused1]")?,
        })
    }

    /// Tokens for pair classification; markers fall back to `[SEP]`.
    pub fn pair(tokenizer: &Tokenizer) -> Result<Self> {
        let sep = token_id(tokenizer, "[SEP]")?;
        Ok(Self {
            cls: token_id(tokenizer, "[CLS]")?,
            sep,
            pad: token_id(tokenizer, "[PAD]")?,
            mask: tokenizer.token_to_id("[MASK]").unwrap_or(sep),
            query_marker: sep,
            doc_marker: sep,
        })
    }
}

/// Plain token ids, no special tokens.
pub fn encode_plain(tokenizer: &Tokenizer, text: &str) -> Result<Vec<u32>> {
    let enc = tokenizer.encode(text, false).map_err(|e| Error::provider("tokenizer", None, format!("tokenization failed: {e}")))?;
    Ok(enc.get_ids().to_vec())
}

/// `[CLS] [unused0] q... [SEP]` padded with `[MASK]` to exactly `max_len`.
/// The padding is not attended by the encoder but still yields output
/// vectors, which take part in MaxSim (query augmentation).
pub fn query_layout(tokens: &[u32], special: &SpecialTokens, max_len: usize) -> Encoded {
    let keep = max_len.saturating_sub(3).min(tokens.len());
    let mut ids = Vec::with_capacity(max_len.max(3));
    ids.push(special.cls);
    ids.push(special.query_marker);
    ids.extend_from_slice(&tokens[..keep]);
    ids.push(special.sep);
    let attended = ids.len();
    while ids.len() < max_len { ids.push(special.mask); }
    let n = ids.len();
    let mask = (0..n).map(|i| u32::from(i < attended)).collect();
    Encoded { ids, type_ids: vec![0; n], mask }
}

/// Vocabulary ids of ASCII punctuation characters present as single tokens.
pub fn punctuation_ids(tokenizer: &Tokenizer) -> HashSet<u32> {
    PUNCTUATION.chars().filter_map(|c| tokenizer.token_to_id(&c.to_string())).collect()
}

/// `[CLS] [unused1] d... [SEP]`, at most `max_len` long; trailing tokens are dropped.
pub fn doc_layout(tokens: &[u32], special: &SpecialTokens, max_len: usize) -> Encoded {
    let keep = max_len.saturating_sub(3).min(tokens.len());
    let mut ids = Vec::with_capacity(keep + 3);
    ids.push(special.cls);
    ids.push(special.doc_marker);
    ids.extend_from_slice(&tokens[..keep]);
    ids.push(special.sep);
    let n = ids.len();
    Encoded { ids, type_ids: vec![0; n], mask: vec![1; n] }
}

/// `[CLS] q... [SEP] p... [SEP]` within `max_len`; the passage is cut first,
/// then the query if it alone does not fit.
pub fn pair_layout(query: &[u32], passage: &[u32], special: &SpecialTokens, max_len: usize) -> Encoded {
    let budget = max_len.saturating_sub(3);
    let q_keep = query.len().min(budget);
    let p_keep = passage.len().min(budget - q_keep);

    let mut ids = Vec::with_capacity(q_keep + p_keep + 3);
    ids.push(special.cls);
    ids.extend_from_slice(&query[..q_keep]);
    ids.push(special.sep);
    let first_segment = ids.len();
    ids.extend_from_slice(&passage[..p_keep]);
    ids.push(special.sep);

    let n = ids.len();
    let type_ids = (0..n).map(|i| u32::from(i >= first_segment)).collect();
    Encoded { ids, type_ids, mask: vec![1; n] }
}

/// Right-pads a batch to its longest row and moves it to `device` as
/// `(input_ids, token_type_ids, attention_mask)`, each `[B, T]`.
pub fn pack_batch(rows: &[Encoded], pad_id: u32, device: &Device) -> candle_core::Result<(Tensor, Tensor, Tensor)> {
    let width = rows.iter().map(Encoded::len).max().unwrap_or(0);
    let mut ids = Vec::with_capacity(rows.len() * width);
    let mut type_ids = Vec::with_capacity(rows.len() * width);
    let mut mask = Vec::with_capacity(rows.len() * width);
    for row in rows {
        let pad = width - row.len();
        ids.extend(row.ids.iter().copied().chain(std::iter::repeat(pad_id).take(pad)));
        type_ids.extend(row.type_ids.iter().copied().chain(std::iter::repeat(0).take(pad)));
        mask.extend(row.mask.iter().copied().chain(std::iter::repeat(0).take(pad)));
    }
    let shape = (rows.len(), width);
    Ok((
        Tensor::from_vec(ids, shape, device)?,
        Tensor::from_vec(type_ids, shape, device)?,
        Tensor::from_vec(mask, shape, device)?,
    ))
}
