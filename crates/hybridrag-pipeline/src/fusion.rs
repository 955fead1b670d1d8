//! Reciprocal Rank Fusion.
//!
//! A document at 1-based rank `r` of a list contributes `1 / (k + r)`;
//! contributions add up across lists. Only rank positions are used, so the
//! lists' native scores never need to be comparable.

use std::cmp::Ordering;
use std::collections::HashMap;

pub const DEFAULT_RRF_K: u32 = 60;

#[derive(Debug, Clone, PartialEq)]
pub struct FusedEntry {
    pub doc_id: String,
    pub score: f64,
}

/// Fused scores in total order: score descending, then first appearance.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FusedRanking {
    entries: Vec<FusedEntry>,
}

impl FusedRanking {
    pub fn entries(&self) -> &[FusedEntry] { &self.entries }

    pub fn len(&self) -> usize { self.entries.len() }

    pub fn is_empty(&self) -> bool { self.entries.is_empty() }

    pub fn doc_ids(&self) -> impl Iterator<Item = &str> { self.entries.iter().map(|e| e.doc_id.as_str()) }

    pub fn score_of(&self, doc_id: &str) -> Option<f64> { self.entries.iter().find(|e| e.doc_id == doc_id).map(|e| e.score) }
}

/// Fuses ranked id lists. Every position contributes, so an id repeated
/// within one list (several chunks of one document) sums its ranks.
pub fn rrf_fuse<L, S>(lists: &[L], k: u32) -> FusedRanking
where
    L: AsRef<[S]>,
    S: AsRef<str>,
{
    let k = f64::from(k);
    let mut entries: Vec<FusedEntry> = Vec::new();
    let mut position: HashMap<String, usize> = HashMap::new();

    for list in lists {
        for (i, id) in list.as_ref().iter().enumerate() {
            let id = id.as_ref();
            let contribution = 1.0 / (k + (i + 1) as f64);
            let slot = *position.entry(id.to_string()).or_insert_with(|| {
                entries.push(FusedEntry { doc_id: id.to_string(), score: 0.0 });
                entries.len() - 1
            });
            entries[slot].score += contribution;
        }
    }

    // Stable: equal scores keep first-appearance order.
    entries.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
    FusedRanking { entries }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(r: &FusedRanking) -> Vec<&str> { r.doc_ids().collect() }

    #[test]
    fn two_lists_sum_reciprocal_ranks() {
        let fused = rrf_fuse(&[vec!["a", "b"], vec!["b", "c"]], 60);
        assert_eq!(ids(&fused), vec!["b", "a", "c"]);
        assert!((fused.score_of("a").unwrap() - 1.0 / 61.0).abs() < 1e-12);
        assert!((fused.score_of("b").unwrap() - (1.0 / 61.0 + 1.0 / 62.0)).abs() < 1e-12);
        assert!((fused.score_of("c").unwrap() - 1.0 / 62.0).abs() < 1e-12);
    }

    #[test]
    fn ties_keep_first_appearance_order() {
        let fused = rrf_fuse(&[vec!["x", "y"], vec!["y", "x"]], 60);
        assert_eq!(ids(&fused), vec!["x", "y"]);

        let fused = rrf_fuse(&[vec!["p"], vec!["q"]], 60);
        assert_eq!(ids(&fused), vec!["p", "q"]);
    }

    #[test]
    fn repeated_id_in_one_list_sums_its_ranks() {
        let fused = rrf_fuse(&[vec!["a", "a", "b"], vec!["b"]], 60);
        assert!((fused.score_of("a").unwrap() - (1.0 / 61.0 + 1.0 / 62.0)).abs() < 1e-12);
        assert!((fused.score_of("b").unwrap() - (1.0 / 63.0 + 1.0 / 61.0)).abs() < 1e-12);
        assert_eq!(ids(&fused), vec!["a", "b"]);
    }

    #[test]
    fn larger_k_flattens_differences() {
        let small = rrf_fuse(&[vec!["a", "b"]], 1);
        let large = rrf_fuse(&[vec!["a", "b"]], 1000);
        let gap = |r: &FusedRanking| r.score_of("a").unwrap() / r.score_of("b").unwrap();
        assert!(gap(&small) > gap(&large));
    }

    #[test]
    fn empty_inputs_fuse_to_empty() {
        let lists: Vec<Vec<String>> = vec![vec![], vec![]];
        assert!(rrf_fuse(&lists, DEFAULT_RRF_K).is_empty());
    }
}
