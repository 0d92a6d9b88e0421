//! Heuristic verification with early decisions.
//!
//! If a candidate is at distance maxdist of the query, the number of mismatches found in the first c loci
//! is approximately binomial with c trials and probability p = maxdist / schema_length.
//! At some checkpoints c we compare the running count with the alpha and 1 - alpha quantiles of this law :
//! a count below the low quantile is accepted at once, a count above the high quantile is rejected at once.
//! Each checkpoint misclassifies a candidate with probability about alpha.

use serde::{Deserialize, Serialize};

use super::Verifier;
use crate::errors::{CgError, CgResult};
use crate::utils::parameters::HeuristicParams;

/// Smallest k in [0, n] such that P(X <= k) >= q for X binomial(n, p).
///
/// The probability mass is computed in log space by recurrence so that large n with
/// moderate p do not underflow at k = 0.
pub fn binomial_quantile(n: usize, p: f64, q: f64) -> usize {
    if p <= 0. || q <= 0. {
        return 0;
    }
    if p >= 1. {
        return n;
    }
    let ln_ratio = p.ln() - (1. - p).ln();
    let mut ln_pmf = n as f64 * (1. - p).ln();
    let mut cdf = 0.;
    for k in 0..=n {
        cdf += ln_pmf.exp();
        if cdf >= q {
            return k;
        }
        // pmf(k+1) = pmf(k) * (n-k)/(k+1) * p/(1-p)
        if k < n {
            ln_pmf += ((n - k) as f64 / (k + 1) as f64).ln() + ln_ratio;
        }
    }
    n
} // end of binomial_quantile

/// bounds on the running mismatch count after checkpoint loci were scanned
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuantileBound {
    pub checkpoint: usize,
    pub low: usize,
    pub high: usize,
}

/// The table of bounds for one query, checkpoints in increasing order.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct QuantileBounds {
    maxdist: usize,
    bounds: Vec<QuantileBound>,
}

impl QuantileBounds {
    /// Computes bounds for a query at distance maxdist in sequences of length schema_length.
    /// Checkpoints beyond schema_length are dropped.
    pub fn new(params: &HeuristicParams, maxdist: usize, schema_length: usize) -> CgResult<Self> {
        if schema_length == 0 {
            return Err(CgError::InvalidParameters("schema length is 0".to_string()));
        }
        if maxdist >= schema_length {
            return Err(CgError::InvalidParameters(format!(
                "maxdist {} must be less than schema length {}",
                maxdist, schema_length
            )));
        }
        if !(params.alpha > 0. && params.alpha < 0.5) {
            return Err(CgError::InvalidParameters(format!(
                "alpha must be in ]0, 0.5[, got {}",
                params.alpha
            )));
        }
        //
        let p = maxdist as f64 / schema_length as f64;
        let mut checkpoints = params.checkpoints.clone();
        checkpoints.sort_unstable();
        checkpoints.dedup();
        checkpoints.retain(|&c| c > 0 && c <= schema_length);
        let bounds: Vec<QuantileBound> = checkpoints
            .into_iter()
            .map(|checkpoint| QuantileBound {
                checkpoint,
                low: binomial_quantile(checkpoint, p, params.alpha),
                high: binomial_quantile(checkpoint, p, 1. - params.alpha),
            })
            .collect();
        log::debug!("quantile bounds for maxdist {} : {:?}", maxdist, bounds);
        //
        Ok(QuantileBounds { maxdist, bounds })
    } // end of new

    pub fn get_bounds(&self) -> &[QuantileBound] {
        &self.bounds
    }

    pub fn get_maxdist(&self) -> usize {
        self.maxdist
    }
} // end of impl QuantileBounds

// adds mismatches of s and query to d, None as soon as d exceeds maxdist
#[inline]
fn count_mismatches(s: &[u8], query: &[u8], mut d: usize, maxdist: usize) -> Option<usize> {
    for (a, b) in s.iter().zip(query) {
        if a != b {
            d += 1;
            if d > maxdist {
                return None;
            }
        }
    }
    Some(d)
}

/// Returns Some(s) if s is taken as a match of query, None otherwise.
///
/// The running count is tested at each checkpoint of bounds : below low s is accepted, above high s is rejected.
/// A count exceeding maxdist rejects at any position. Without early decision s is accepted at the end of the scan.
pub fn compare_heuristic<'a>(s: &'a [u8], query: &[u8], maxdist: usize, bounds: &QuantileBounds) -> Option<&'a [u8]> {
    debug_assert_eq!(s.len(), query.len());
    let mut d = 0;
    let mut pos = 0;
    for bound in &bounds.bounds {
        let end = bound.checkpoint.min(s.len());
        d = count_mismatches(&s[pos..end], &query[pos..end], d, maxdist)?;
        pos = end;
        if d < bound.low {
            return Some(s);
        }
        if d > bound.high {
            return None;
        }
    }
    count_mismatches(&s[pos..], &query[pos..], d, maxdist)?;
    Some(s)
} // end of compare_heuristic

/// The heuristic verifier. Its bounds depend on maxdist and schema length, so it is built per query parameters.
#[derive(Clone, Debug)]
pub struct HeuristicVerifier {
    bounds: QuantileBounds,
}

impl HeuristicVerifier {
    pub fn new(params: &HeuristicParams, maxdist: usize, schema_length: usize) -> CgResult<Self> {
        let bounds = QuantileBounds::new(params, maxdist, schema_length)?;
        Ok(HeuristicVerifier { bounds })
    }

    pub fn get_bounds(&self) -> &QuantileBounds {
        &self.bounds
    }
}

impl Verifier for HeuristicVerifier {
    fn verify<'a>(&self, candidate: &'a [u8], query: &[u8]) -> Option<&'a [u8]> {
        compare_heuristic(candidate, query, self.bounds.maxdist, &self.bounds)
    }

    fn get_maxdist(&self) -> usize {
        self.bounds.maxdist
    }
}

//=====================================================================================

#[cfg(test)]
mod tests {

    use super::*;
    use crate::synth::mutate;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn log_init_test() {
        let _ = env_logger::Builder::from_default_env().is_test(true).try_init();
    }

    #[test]
    fn quantiles_small_cases() {
        // binomial(10, 0.05) : cdf(0) = 0.599, cdf(1) = 0.914, cdf(2) = 0.9885, cdf(3) = 0.99897
        assert_eq!(binomial_quantile(10, 0.05, 0.01), 0);
        assert_eq!(binomial_quantile(10, 0.05, 0.9), 1);
        assert_eq!(binomial_quantile(10, 0.05, 0.99), 3);
        // binomial(4, 0.5) : cdf = 1/16, 5/16, 11/16, 15/16, 1
        assert_eq!(binomial_quantile(4, 0.5, 0.05), 0);
        assert_eq!(binomial_quantile(4, 0.5, 0.5), 2);
        assert_eq!(binomial_quantile(4, 0.5, 0.95), 4);
        // degenerate
        assert_eq!(binomial_quantile(100, 0., 0.99), 0);
        assert_eq!(binomial_quantile(100, 1., 0.01), 100);
    }

    #[test]
    fn quantiles_large_n_do_not_underflow() {
        // mean 1750, sd about 29.6
        let low = binomial_quantile(3500, 0.5, 0.01);
        let high = binomial_quantile(3500, 0.5, 0.99);
        assert!(low > 1650 && low < 1700, "low {}", low);
        assert!(high > 1800 && high < 1850, "high {}", high);
        assert_eq!(low + high, 3500);
    }

    #[test]
    fn bounds_parameters() {
        let params = HeuristicParams::new(vec![1000, 10, 100, 5000, 100], 0.01);
        let bounds = QuantileBounds::new(&params, 100, 2000).unwrap();
        let checkpoints: Vec<usize> = bounds.get_bounds().iter().map(|b| b.checkpoint).collect();
        assert_eq!(checkpoints, vec![10, 100, 1000]);
        for b in bounds.get_bounds() {
            assert!(b.low <= b.high);
        }
        //
        assert!(QuantileBounds::new(&params, 10, 0).is_err());
        assert!(QuantileBounds::new(&params, 2000, 2000).is_err());
        assert!(QuantileBounds::new(&HeuristicParams::new(vec![10], 0.7), 10, 2000).is_err());
        assert!(QuantileBounds::new(&params, 0, 2000).is_ok());
    }

    #[test]
    fn early_decisions() {
        let params = HeuristicParams::new(vec![10, 100], 0.01);
        // p = 0.1
        let bounds = QuantileBounds::new(&params, 20, 200).unwrap();
        let query = vec![0u8; 200];
        // all mismatches in first 10 loci, more than the high bound : rejected though only 10 mismatches
        let mut s = vec![0u8; 200];
        s[..10].iter_mut().for_each(|a| *a = 1);
        assert!(bounds.get_bounds()[0].high < 10);
        assert!(compare_heuristic(&s, &query, 20, &bounds).is_none());
        // no mismatch in first 100 loci : accepted at checkpoint 100 even with 25 mismatches after
        let mut s = vec![0u8; 200];
        s[150..175].iter_mut().for_each(|a| *a = 1);
        assert!(bounds.get_bounds()[1].low > 0);
        assert!(compare_heuristic(&s, &query, 20, &bounds).is_some());
        // mismatches only after last checkpoint : exact rule
        let mut s = vec![0u8; 200];
        s[100..104].iter_mut().for_each(|a| *a = 1);
        s[110..116].iter_mut().for_each(|a| *a = 1);
        let bounds_high = QuantileBounds::new(&HeuristicParams::new(vec![10], 0.01), 8, 200).unwrap();
        assert!(compare_heuristic(&s, &query, 8, &bounds_high).is_none());
        assert!(compare_heuristic(&s, &query, 10, &bounds).is_some());
    }

    // Monte Carlo estimation of the false negative rate on candidates at distance exactly maxdist
    #[test]
    fn false_negative_rate_bounded() {
        log_init_test();
        let schema_length = 2000;
        let maxdist = 100;
        let alpha = 0.01;
        let params = HeuristicParams::new(vec![10, 100, 1000], alpha);
        let verifier = HeuristicVerifier::new(&params, maxdist, schema_length).unwrap();
        let nb_checkpoints = verifier.get_bounds().get_bounds().len();
        //
        let mut rng = StdRng::seed_from_u64(31);
        let query: Vec<u8> = (0..schema_length).map(|_| rng.random_range(0..10u8)).collect();
        let nb_trials = 2000;
        let mut nb_rejected = 0;
        let mut nb_far_accepted = 0;
        for _ in 0..nb_trials {
            let s = mutate(&query, maxdist, 10, &mut rng).unwrap();
            if verifier.verify(&s, &query).is_none() {
                nb_rejected += 1;
            }
            let far = mutate(&query, 3 * maxdist, 10, &mut rng).unwrap();
            if verifier.verify(&far, &query).is_some() {
                nb_far_accepted += 1;
            }
        }
        let fn_rate = nb_rejected as f64 / nb_trials as f64;
        log::info!("false negative rate : {:.4}", fn_rate);
        assert!(fn_rate <= alpha * nb_checkpoints as f64, "false negative rate {}", fn_rate);
        assert_eq!(nb_far_accepted, 0);
    }
} // end of mod tests
