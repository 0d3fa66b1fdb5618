use std::collections::HashSet;

use crate::ingest::types::CandidateArticle;

/// Collapse a batch to one candidate per link, first occurrence wins.
/// Links are compared as exact strings: two links differing only by
/// trailing slash or case are distinct on purpose. Order-preserving.
pub fn dedupe(candidates: Vec<CandidateArticle>) -> Vec<CandidateArticle> {
    let mut seen: HashSet<String> = HashSet::with_capacity(candidates.len());
    let mut keep = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        if seen.insert(candidate.link.clone()) {
            keep.push(candidate);
        }
    }
    keep
}
