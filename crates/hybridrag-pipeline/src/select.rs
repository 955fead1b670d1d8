//! Reranker selection with init fallback.

use tracing::{info, warn};

use hybridrag_core::config::{RerankerKind, RerankerSettings, Settings};
use hybridrag_core::{Error, Reranker, Result};
use hybridrag_rerank::load_reranker;

/// Reads the `RERANKER` runtime override; unset or blank means none.
pub fn reranker_override_from_env() -> Result<Option<RerankerKind>> {
    match std::env::var("RERANKER") {
        Ok(v) if !v.trim().is_empty() => v.parse().map(Some),
        _ => Ok(None),
    }
}

/// Instantiates `choice` with the given loaders. Late interaction falls back
/// to cross attention; a failed cross attention leaves reranking off.
pub fn init_reranker_with<L, C>(choice: RerankerKind, late: L, cross: C) -> Option<Box<dyn Reranker>>
where
    L: FnOnce() -> Result<Box<dyn Reranker>>,
    C: FnOnce() -> Result<Box<dyn Reranker>>,
{
    let try_cross = |cross: C| match cross() {
        Ok(r) => Some(r),
        Err(e) => {
            warn!(error = %e, "cross-encoder reranker unavailable; continuing without reranking");
            None
        }
    };
    let reranker = match choice {
        RerankerKind::None => None,
        RerankerKind::CrossAttention => try_cross(cross),
        RerankerKind::LateInteraction => match late() {
            Ok(r) => Some(r),
            Err(e) => {
                warn!(error = %e, "late-interaction reranker unavailable; falling back to cross-encoder");
                try_cross(cross)
            }
        },
    };
    if let Some(r) = &reranker { info!(reranker = r.name(), "reranker active"); }
    reranker
}

fn load_model(kind: RerankerKind, settings: &RerankerSettings) -> Result<Box<dyn Reranker>> {
    load_reranker(kind, settings)?.ok_or_else(|| Error::RerankerInit(format!("no model for reranker kind {kind:?}")))
}

pub fn init_reranker(settings: &Settings, runtime_override: Option<RerankerKind>) -> Option<Box<dyn Reranker>> {
    let choice = settings.resolve_reranker(runtime_override);
    let rs = &settings.reranker;
    init_reranker_with(
        choice,
        || load_model(RerankerKind::LateInteraction, rs),
        || load_model(RerankerKind::CrossAttention, rs),
    )
}
