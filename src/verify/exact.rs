//! exact verification : Hamming distance with early abort

use super::Verifier;

/// Returns Some(s) if the Hamming distance between s and query is at most maxdist, None otherwise.
/// Scanning stops as soon as the number of mismatches exceeds maxdist.
/// s and query are expected to have the same length.
#[inline]
pub fn compare<'a>(s: &'a [u8], query: &[u8], maxdist: usize) -> Option<&'a [u8]> {
    debug_assert_eq!(s.len(), query.len());
    let mut d = 0;
    for (a, b) in s.iter().zip(query) {
        if a != b {
            d += 1;
            if d > maxdist {
                return None;
            }
        }
    }
    Some(s)
} // end of compare

/// The exact verifier, no false positive nor false negative
#[derive(Copy, Clone, Debug)]
pub struct ExactVerifier {
    maxdist: usize,
}

impl ExactVerifier {
    pub fn new(maxdist: usize) -> Self {
        ExactVerifier { maxdist }
    }
}

impl Verifier for ExactVerifier {
    fn verify<'a>(&self, candidate: &'a [u8], query: &[u8]) -> Option<&'a [u8]> {
        compare(candidate, query, self.maxdist)
    }

    fn get_maxdist(&self) -> usize {
        self.maxdist
    }
}

//=====================================================================================

// end of mod tests
