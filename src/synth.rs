//! Generation of synthetic allele profiles.
//!
//! Profiles are generated by successive mutations so that the collection has the clonal structure
//! of a typed population : each new profile is a copy of an earlier one with a few loci receiving
//! a new allele code.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::errors::{CgError, CgResult};
use crate::seqstore::{SeqMatrix, SeqStore};
use crate::utils::parameters::DatasetParams;

fn check_nb_types(nb_types: usize) -> CgResult<()> {
    if !(2..=256).contains(&nb_types) {
        return Err(CgError::InvalidParameters(format!(
            "number of allele types must be in [2, 256], got {}",
            nb_types
        )));
    }
    Ok(())
}

/// Creates params.nb_seqs profiles of length params.schema_length.
///
/// Profile 0 has allele 1 at every locus. Profile n copies a profile chosen uniformly among the n first
/// and mutates each locus with probability diversity / schema_length, so the number of mutated loci is
/// binomial with mean diversity. A mutated locus gets the next allele code of that locus, codes wrap in [1, nb_types).
pub fn create_seqs(params: &DatasetParams) -> CgResult<SeqMatrix> {
    check_nb_types(params.nb_types)?;
    // code 0 is the missing allele, a mutation needs two codes in [1, nb_types)
    if params.nb_types < 3 {
        return Err(CgError::InvalidParameters(format!(
            "create_seqs needs at least 3 allele types, got {}",
            params.nb_types
        )));
    }
    let schema_length = params.schema_length;
    let mut matrix = SeqMatrix::with_capacity(schema_length, params.nb_seqs);
    if params.nb_seqs == 0 {
        return Ok(matrix);
    }
    log::info!(
        "create_seqs : nb_seqs {}, schema length {}, diversity {}, seed {}",
        params.nb_seqs,
        schema_length,
        params.diversity,
        params.seed
    );
    //
    let mut rng = StdRng::seed_from_u64(params.seed);
    let proba = if schema_length > 0 {
        (params.diversity as f64 / schema_length as f64).min(1.)
    } else {
        0.
    };
    let max_code = (params.nb_types - 1) as u16;
    let mut allele_maxima = vec![1u16; schema_length];
    matrix.push(&vec![1u8; schema_length])?;
    //
    let mut newseq = vec![0u8; schema_length];
    for n in 1..params.nb_seqs {
        let parent = rng.random_range(0..n);
        newseq.copy_from_slice(matrix.get(parent));
        for (site, allele) in newseq.iter_mut().enumerate() {
            if rng.random_bool(proba) {
                allele_maxima[site] = allele_maxima[site] % max_code + 1;
                *allele = allele_maxima[site] as u8;
            }
        }
        matrix.push(&newseq)?;
    }
    //
    Ok(matrix)
} // end of create_seqs

/// returns a copy of seq differing from it at exactly nb_sites loci, with codes in [0, nb_types)
pub fn mutate<R: Rng>(seq: &[u8], nb_sites: usize, nb_types: usize, rng: &mut R) -> CgResult<Vec<u8>> {
    check_nb_types(nb_types)?;
    if nb_sites > seq.len() {
        return Err(CgError::InvalidParameters(format!(
            "cannot mutate {} sites in a sequence of length {}",
            nb_sites,
            seq.len()
        )));
    }
    let mut newseq = seq.to_vec();
    for site in rand::seq::index::sample(rng, seq.len(), nb_sites) {
        // draw in nb_types - 1 values and skip the current one
        let mut allele = rng.random_range(0..(nb_types - 1)) as u8;
        if allele >= seq[site] {
            allele += 1;
        }
        newseq[site] = allele;
    }
    Ok(newseq)
} // end of mutate

/// Builds a store of nb_seqs profiles around a random reference (stored at rank 0).
/// Profile i is at Hamming distance exactly i % (schema_length + 1) of the reference, distances are returned with the store.
pub fn create_around_reference(
    nb_seqs: usize,
    schema_length: usize,
    nb_types: usize,
    seed: u64,
) -> CgResult<(SeqMatrix, Vec<usize>)> {
    check_nb_types(nb_types)?;
    let mut rng = StdRng::seed_from_u64(seed);
    let reference: Vec<u8> = (0..schema_length)
        .map(|_| rng.random_range(0..nb_types) as u8)
        .collect();
    let mut matrix = SeqMatrix::with_capacity(schema_length, nb_seqs);
    let mut distances = Vec::with_capacity(nb_seqs);
    for i in 0..nb_seqs {
        let dist = i % (schema_length + 1);
        let seq = mutate(&reference, dist, nb_types, &mut rng)?;
        matrix.push(&seq)?;
        distances.push(dist);
    }
    Ok((matrix, distances))
} // end of create_around_reference

//=====================================================================================

#[cfg(test)]
mod tests {

    use super::*;
    use crate::search::hamming_distance;

    #[test]
    fn mutate_gives_exact_distance() {
        let mut rng = StdRng::seed_from_u64(7);
        let seq: Vec<u8> = (0..100).map(|i| (i % 4) as u8).collect();
        for nb_sites in [0, 1, 17, 100] {
            let newseq = mutate(&seq, nb_sites, 4, &mut rng).unwrap();
            assert_eq!(hamming_distance(&seq, &newseq), nb_sites);
            assert!(newseq.iter().all(|&a| a < 4));
        }
        assert!(mutate(&seq, 101, 4, &mut rng).is_err());
        assert!(mutate(&seq, 1, 1, &mut rng).is_err());
    }

    #[test]
    fn created_seqs_are_reproducible() {
        let params = DatasetParams::new(300, 50, 10, 5, 42);
        let m1 = create_seqs(&params).unwrap();
        let m2 = create_seqs(&params).unwrap();
        assert_eq!(m1.len(), 300);
        assert_eq!(m1.get(0), &[1u8; 50]);
        for i in 0..m1.len() {
            assert_eq!(m1.get(i), m2.get(i));
            assert!(m1.get(i).iter().all(|&a| a >= 1 && a < 10));
        }
        // some mutations occurred
        assert!((1..m1.len()).any(|i| m1.get(i) != m1.get(0)));
    }

    #[test]
    fn smallest_allele_range() {
        // with 3 types codes 1 and 2 alternate, profiles differ
        let m = create_seqs(&DatasetParams::new(100, 40, 3, 5, 1)).unwrap();
        assert!((1..m.len()).any(|i| m.get(i) != m.get(0)));
        assert!((0..m.len()).all(|i| m.get(i).iter().all(|&a| a == 1 || a == 2)));
        // only one non missing code : nothing could mutate
        assert!(matches!(
            create_seqs(&DatasetParams::new(100, 40, 2, 5, 1)),
            Err(CgError::InvalidParameters(_))
        ));
    }

    #[test]
    fn reference_distances() {
        let (matrix, distances) = create_around_reference(120, 50, 4, 3).unwrap();
        assert_eq!(matrix.len(), 120);
        for i in 0..matrix.len() {
            assert_eq!(hamming_distance(matrix.get(0), matrix.get(i)), distances[i]);
        }
    }
} // end of mod tests
