//! Verification of candidates returned by the forest.
//!
//! Two strategies : an exact comparison aborting as soon as the distance threshold is exceeded,
//! and a heuristic one taking early decisions from binomial quantile bounds.

pub mod exact;
pub mod heuristic;

pub use exact::*;
pub use heuristic::*;

use crate::errors::CgResult;
use crate::utils::parameters::HeuristicParams;

/// Decides if a candidate sequence is kept as a match of query.
pub trait Verifier: Sync {
    /// returns Some(candidate) if candidate is accepted, None if rejected
    fn verify<'a>(&self, candidate: &'a [u8], query: &[u8]) -> Option<&'a [u8]>;

    /// the distance threshold
    fn get_maxdist(&self) -> usize;
}

/// The verification strategy to use in a search
#[derive(Clone, Debug, PartialEq)]
pub enum VerifierStrategy {
    Exact,
    Heuristic(HeuristicParams),
}

/// allocates the verifier of strategy for a threshold maxdist on sequences of length schema_length
pub fn make_verifier(strategy: &VerifierStrategy, maxdist: usize, schema_length: usize) -> CgResult<Box<dyn Verifier>> {
    let verifier: Box<dyn Verifier> = match strategy {
        VerifierStrategy::Exact => Box::new(ExactVerifier::new(maxdist)),
        VerifierStrategy::Heuristic(params) => Box::new(HeuristicVerifier::new(params, maxdist, schema_length)?),
    };
    Ok(verifier)
} // end of make_verifier
