//! A forest of independently randomized partition trees.
//!
//! Each tree routes a query to one bucket. Two sequences at small Hamming distance have a good chance to
//! reach the same bucket in at least one tree, so the union of the buckets over trees is the candidate set
//! passed to verification. Adding trees raises recall at the cost of memory and construction time.

use std::time::SystemTime;

use cpu_time::ProcessTime;
use fxhash::FxHashSet;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use super::node::SeqId;
use super::tree::IndexTree;
use crate::errors::{CgError, CgResult};
use crate::seqstore::SeqStore;
use crate::utils::parameters::ForestParams;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Forest {
    params: ForestParams,
    schema_length: usize,
    trees: Vec<IndexTree>,
}

impl Forest {
    /// Builds params.nb_trees trees over all ids of store.
    /// Trees are built in parallel, each with its own rng.
    pub fn build<S: SeqStore>(store: &S, params: ForestParams) -> CgResult<Self> {
        params.check()?;
        log::info!(
            "building forest of {} trees, capacity {}, over {} sequences of length {}",
            params.get_nb_trees(),
            params.get_capacity(),
            store.len(),
            store.schema_length()
        );
        let start_t = SystemTime::now();
        let cpu_start = ProcessTime::now();
        //
        let trees: Vec<IndexTree> = (0..params.get_nb_trees())
            .into_par_iter()
            .map(|i| {
                let mut rng = match params.get_seed() {
                    Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(i as u64)),
                    None => StdRng::from_os_rng(),
                };
                let tree = IndexTree::build(store, params.get_capacity(), params.get_dim_policy(), &mut rng);
                log::debug!("tree {} built, stats : {:?}", i, tree.stats());
                tree
            })
            .collect();
        //
        let cpu_time = cpu_start.elapsed().as_secs_f32();
        let elapsed_t = start_t.elapsed().map(|d| d.as_secs_f32()).unwrap_or(0.);
        log::info!("forest built, sys time(s) {:.3} cpu time(s) {:.3}", elapsed_t, cpu_time);
        //
        Ok(Forest {
            params,
            schema_length: store.schema_length(),
            trees,
        })
    } // end of build

    /// union of the buckets seq reaches in each tree, each id once.
    pub fn query(&self, seq: &[u8]) -> CgResult<Vec<SeqId>> {
        self.query_trees(0..self.trees.len(), seq)
    }

    /// union of the buckets reached by seq in the trees of rank given by tree_ranks
    pub fn query_trees<I>(&self, tree_ranks: I, seq: &[u8]) -> CgResult<Vec<SeqId>>
    where
        I: IntoIterator<Item = usize>,
    {
        if seq.len() != self.schema_length {
            return Err(CgError::InvalidInput {
                expected: self.schema_length,
                got: seq.len(),
            });
        }
        let mut seen = FxHashSet::<SeqId>::default();
        let mut candidates = Vec::<SeqId>::new();
        for rank in tree_ranks {
            let tree = self.trees.get(rank).ok_or_else(|| {
                CgError::InvalidParameters(format!("tree rank {} out of range, nb trees : {}", rank, self.trees.len()))
            })?;
            for &id in tree.query(seq)? {
                if seen.insert(id) {
                    candidates.push(id);
                }
            }
        }
        log::debug!("forest query : {} candidates", candidates.len());
        Ok(candidates)
    } // end of query_trees

    /// number of ids indexed, the same in each tree
    pub fn size(&self) -> usize {
        self.trees.first().map_or(0, |t| t.size())
    }

    pub fn get_nb_trees(&self) -> usize {
        self.trees.len()
    }

    pub fn get_trees(&self) -> &[IndexTree] {
        &self.trees
    }

    pub fn get_params(&self) -> &ForestParams {
        &self.params
    }

    pub fn get_schema_length(&self) -> usize {
        self.schema_length
    }

    /// checks the forest indexes store : same sequence length and same number of sequences.
    pub fn check_store<S: SeqStore>(&self, store: &S) -> CgResult<()> {
        if store.schema_length() != self.schema_length {
            log::error!(
                "forest built for length {}, store has length {}",
                self.schema_length,
                store.schema_length()
            );
            return Err(CgError::InvalidInput {
                expected: self.schema_length,
                got: store.schema_length(),
            });
        }
        if self.size() != store.len() {
            log::error!("forest size {} , store size {}", self.size(), store.len());
            return Err(CgError::IndexDatasetMismatch {
                index: self.size(),
                dataset: store.len(),
            });
        }
        Ok(())
    } // end of check_store

    /// binary dump of the whole forest
    pub fn to_bytes(&self) -> CgResult<Vec<u8>> {
        Ok(bincode::serialize(self)?)
    }

    /// reloads a forest from to_bytes output and checks all trees have the same size
    pub fn from_bytes(bytes: &[u8]) -> CgResult<Self> {
        let forest: Forest = bincode::deserialize(bytes)?;
        forest.check_trees()?;
        Ok(forest)
    }

    fn check_trees(&self) -> CgResult<()> {
        if self.trees.is_empty() {
            return Err(CgError::InvalidParameters("forest has no tree".to_string()));
        }
        let size = self.size();
        for tree in &self.trees {
            if tree.size() != size || tree.get_schema_length() != self.schema_length {
                return Err(CgError::InvalidParameters(format!(
                    "inconsistent trees in forest, tree size {} , first tree size {}",
                    tree.size(),
                    size
                )));
            }
        }
        Ok(())
    }
} // end of impl Forest

//=====================================================================================

// end of mod tests
