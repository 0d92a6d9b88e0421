//! end to end scenarios : synthetic profiles, forest, verification, dump and reload

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use cgsearch::prelude::*;
use cgsearch::synth::{create_around_reference, create_seqs};

fn log_init_test() {
    let _ = env_logger::Builder::from_default_env().is_test(true).try_init();
}

// 1000 profiles of length 50 on 4 alleles around a reference, maxdist 5 :
// the forest search must give exactly the brute force answer
#[test]
fn reference_scenario_matches_brute_force() {
    log_init_test();
    let (store, distances) = create_around_reference(1000, 50, 4, 1).unwrap();
    let forest = Forest::build(&store, ForestParams::new(20, 200).with_seed(1)).unwrap();
    assert_eq!(forest.size(), store.len());
    let verifier = ExactVerifier::new(5);
    let reference = store.get(0);
    //
    let mut hits = search(&forest, &store, reference, &verifier).unwrap();
    hits.sort_unstable();
    let brute_force: Vec<SeqId> = (0..store.len())
        .filter(|&i| hamming_distance(store.get(i), reference) <= 5)
        .map(|i| i as SeqId)
        .collect();
    let expected: Vec<SeqId> = (0..store.len())
        .filter(|&i| distances[i] <= 5)
        .map(|i| i as SeqId)
        .collect();
    assert_eq!(brute_force, expected);
    assert_eq!(naive_search(&store, reference, &verifier).unwrap(), expected);
    assert_eq!(hits, expected);
}

#[test]
fn self_match_for_every_profile() {
    log_init_test();
    let params = DatasetParams::new(2000, 200, 20, 10, 2);
    let store = create_seqs(&params).unwrap();
    let forest = Forest::build(&store, ForestParams::new(4, 50).with_seed(2)).unwrap();
    let verifier = ExactVerifier::new(0);
    for id in 0..store.len() {
        let hits = search(&forest, &store, store.get(id), &verifier).unwrap();
        assert!(hits.contains(&(id as SeqId)), "profile {} not found", id);
    }
}

#[test]
fn capacity_one_loses_no_id() {
    let (store, _) = create_around_reference(300, 30, 4, 3).unwrap();
    let forest = Forest::build(&store, ForestParams::new(3, 1).with_seed(3)).unwrap();
    for tree in forest.get_trees() {
        let mut ids = tree.bucket_membership();
        assert_eq!(ids.len(), store.len());
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), store.len());
    }
}

#[test]
fn dump_reload_gives_same_queries() {
    log_init_test();
    let (store, _) = create_around_reference(200, 40, 4, 4).unwrap();
    let forest_params = ForestParams::new(5, 10);
    let forest = Forest::build(&store, forest_params).unwrap();
    let processing = ProcessingParams::new(DatasetParams::new(200, 40, 4, 0, 4), forest_params);
    let dir = tempfile::tempdir().unwrap();
    dumpall(dir.path(), &forest, &processing).unwrap();
    let (reloaded, _) = reloadall(dir.path(), &store).unwrap();
    //
    let mut rng = StdRng::seed_from_u64(4);
    for _ in 0..100 {
        let query: Vec<u8> = (0..40).map(|_| rng.random_range(0..4u8)).collect();
        assert_eq!(forest.query(&query).unwrap(), reloaded.query(&query).unwrap());
    }
}

#[test]
fn mmap_store_search() {
    let params = DatasetParams::new(500, 100, 10, 5, 5);
    let matrix = create_seqs(&params).unwrap();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("seqs.bin");
    matrix.dump(&path).unwrap();
    let store = MmapSeqMatrix::open(&path, 500, 100).unwrap();
    //
    let forest = Forest::build(&store, ForestParams::new(6, 20).with_seed(5)).unwrap();
    let strategy = VerifierStrategy::Heuristic(HeuristicParams::new(vec![10, 50], 0.01));
    let verifier = make_verifier(&strategy, 5, store.schema_length()).unwrap();
    let hits = par_search(&forest, &store, store.get(7), verifier.as_ref()).unwrap();
    assert!(hits.contains(&7));
    // degenerate heuristic parameters are refused
    assert!(make_verifier(&strategy, 100, store.schema_length()).is_err());
}
