//! hybridrag-rerank
//!
//! Candle-based second-stage rerankers over local BERT checkpoints:
//! late interaction (ColBERT MaxSim) and pairwise cross attention.

pub mod cross_encoder;
pub mod device;
pub mod late_interaction;
pub mod model;
pub mod pool;
pub mod tokenize;

use hybridrag_core::config::{RerankerKind, RerankerSettings};
use hybridrag_core::{Reranker, Result};

pub use cross_encoder::CrossEncoderReranker;
pub use late_interaction::LateInteractionReranker;
pub use pool::maxsim;

/// Loads the reranker for `kind`; `RerankerKind::None` yields `Ok(None)`.
/// Load failures are `Error::RerankerInit`.
pub fn load_reranker(kind: RerankerKind, settings: &RerankerSettings) -> Result<Option<Box<dyn Reranker>>> {
    Ok(match kind {
        RerankerKind::None => None,
        RerankerKind::LateInteraction => Some(Box::new(LateInteractionReranker::from_settings(settings)?)),
        RerankerKind::CrossAttention => Some(Box::new(CrossEncoderReranker::from_settings(settings)?)),
    })
}
