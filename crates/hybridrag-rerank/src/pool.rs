use candle_core::{DType, Tensor};

/// L2-normalizes every token vector of a `[B, T, H]` tensor along `H`.
pub fn l2_normalize_tokens(hidden: &Tensor) -> candle_core::Result<Tensor> {
    let eps_val = match hidden.dtype() { DType::F16 | DType::BF16 => 1e-6f32, _ => 1e-12f32 };
    let eps = Tensor::new(&[eps_val], hidden.device())?.to_dtype(hidden.dtype())?;
    let norm = hidden.sqr()?.sum_keepdim(2)?.sqrt()?.broadcast_add(&eps)?;
    hidden.broadcast_div(&norm)
}

/// MaxSim: for each query token the best dot product over the passage
/// tokens, summed. An empty passage scores 0.
pub fn maxsim(query: &[Vec<f32>], doc: &[Vec<f32>]) -> f32 {
    if doc.is_empty() { return 0.0; }
    query
        .iter()
        .map(|q| doc.iter().map(|d| q.iter().zip(d).map(|(a, b)| a * b).sum::<f32>()).fold(f32::NEG_INFINITY, f32::max))
        .sum()
}

/// Keeps token row `t` of batch item `b` only where `keep[b][t]` is set;
/// rows past the end of `keep[b]` (batch padding) are dropped.
pub fn select_tokens(batch: Vec<Vec<Vec<f32>>>, keep: &[Vec<bool>]) -> Vec<Vec<Vec<f32>>> {
    batch
        .into_iter()
        .zip(keep)
        .map(|(rows, flags)| rows.into_iter().zip(flags).filter(|(_, k)| **k).map(|(row, _)| row).collect())
        .collect()
}
