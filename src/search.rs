//! Search pipeline : forest candidates, then verification of each candidate.
//!
//! The brute force scan of the whole store is also provided, it gives the reference answer
//! to measure the recall of the forest.

use fxhash::FxHashSet;
use rayon::prelude::*;

use crate::errors::{CgError, CgResult};
use crate::index::{Forest, SeqId};
use crate::seqstore::SeqStore;
use crate::verify::Verifier;

/// number of loci where a and b differ
pub fn hamming_distance(a: &[u8], b: &[u8]) -> usize {
    debug_assert_eq!(a.len(), b.len());
    a.iter().zip(b).filter(|(x, y)| x != y).count()
}

fn check_query<S: SeqStore>(store: &S, query: &[u8]) -> CgResult<()> {
    if query.len() != store.schema_length() {
        return Err(CgError::InvalidInput {
            expected: store.schema_length(),
            got: query.len(),
        });
    }
    Ok(())
}

/// Returns ids of store accepted by verifier among the candidates the forest gives for query.
/// The forest union has no duplicate, so each candidate is verified once. No ordering of the result.
pub fn search<S, V>(forest: &Forest, store: &S, query: &[u8], verifier: &V) -> CgResult<Vec<SeqId>>
where
    S: SeqStore,
    V: Verifier + ?Sized,
{
    check_query(store, query)?;
    let candidates = forest.query(query)?;
    let hits: Vec<SeqId> = candidates
        .iter()
        .copied()
        .filter(|&id| verifier.verify(store.get(id as usize), query).is_some())
        .collect();
    log::debug!("search : nb candidates {}, nb hits {}", candidates.len(), hits.len());
    Ok(hits)
} // end of search

/// same as search, candidates are verified in parallel
pub fn par_search<S, V>(forest: &Forest, store: &S, query: &[u8], verifier: &V) -> CgResult<Vec<SeqId>>
where
    S: SeqStore,
    V: Verifier + ?Sized,
{
    check_query(store, query)?;
    let candidates = forest.query(query)?;
    let hits: Vec<SeqId> = candidates
        .par_iter()
        .copied()
        .filter(|&id| verifier.verify(store.get(id as usize), query).is_some())
        .collect();
    log::debug!("par_search : nb candidates {}, nb hits {}", candidates.len(), hits.len());
    Ok(hits)
} // end of par_search

/// verifies every sequence of store, hits in increasing id order
pub fn naive_search<S, V>(store: &S, query: &[u8], verifier: &V) -> CgResult<Vec<SeqId>>
where
    S: SeqStore,
    V: Verifier + ?Sized,
{
    check_query(store, query)?;
    let hits: Vec<SeqId> = (0..store.len())
        .filter(|&id| verifier.verify(store.get(id), query).is_some())
        .map(|id| id as SeqId)
        .collect();
    log::debug!("naive_search : nb hits {}", hits.len());
    Ok(hits)
} // end of naive_search

/// fraction of expected ids present in found, 1. if expected is empty
pub fn recall(found: &[SeqId], expected: &[SeqId]) -> f64 {
    if expected.is_empty() {
        return 1.;
    }
    let found: FxHashSet<SeqId> = found.iter().copied().collect();
    let nb_found = expected.iter().filter(|id| found.contains(id)).count();
    nb_found as f64 / expected.len() as f64
}

//=====================================================================================

// end of mod tests
