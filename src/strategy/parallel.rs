//! Parallel batch extraction
//!
//! Uses Rayon to run independent documents through the extractor at once.
//! Each document gets its own reader and extractor; only the compiled
//! patterns are shared.

use super::matching::extract;
use crate::config::Config;
use crate::dom::Node;
use crate::xpath::PatternSet;
use rayon::prelude::*;
use std::sync::Arc;

/// Extract from every document in parallel, results in input order
pub fn extract_parallel<D>(documents: &[D], patterns: &Arc<PatternSet>, config: &Config) -> Vec<Vec<Node>>
where
    D: AsRef<[u8]> + Sync,
{
    documents
        .par_iter()
        .map(|doc| extract(doc.as_ref(), Arc::clone(patterns), config))
        .collect()
}

/// Extract from every document in parallel and map each result
pub fn extract_map<D, F, T>(documents: &[D], patterns: &Arc<PatternSet>, config: &Config, mapper: F) -> Vec<T>
where
    D: AsRef<[u8]> + Sync,
    F: Fn(Node) -> T + Sync + Send,
    T: Send,
{
    documents
        .par_iter()
        .flat_map_iter(|doc| extract(doc.as_ref(), Arc::clone(patterns), config))
        .map(mapper)
        .collect()
}
