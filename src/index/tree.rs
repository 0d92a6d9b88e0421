//! A random partition tree over all ids of a sequence store.

use rand::Rng;
use serde::{Deserialize, Serialize};

use super::node::{NodeBuilder, PartitionNode, SeqId};
use crate::errors::{CgError, CgResult};
use crate::seqstore::SeqStore;
use crate::utils::parameters::DimPolicy;

/// Some statistics on tree shape, dumped in log after construction
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct TreeStats {
    pub nb_nodes: usize,
    pub nb_buckets: usize,
    pub max_depth: usize,
    pub max_bucket_size: usize,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct IndexTree {
    schema_length: usize,
    capacity: usize,
    dim_policy: DimPolicy,
    root: PartitionNode,
}

impl IndexTree {
    /// an empty tree for sequences of length schema_length
    pub fn new(schema_length: usize, capacity: usize, dim_policy: DimPolicy) -> Self {
        IndexTree {
            schema_length,
            capacity,
            dim_policy,
            root: PartitionNode::new(),
        }
    }

    /// builds a tree over all ids of store, drawing split dimensions from rng
    pub fn build<S: SeqStore, R: Rng>(store: &S, capacity: usize, dim_policy: DimPolicy, rng: &mut R) -> Self {
        let mut tree = IndexTree::new(store.schema_length(), capacity, dim_policy);
        let mut builder = NodeBuilder::new(store, rng, capacity, dim_policy);
        for id in 0..store.len() {
            tree.root.insert(id as SeqId, &mut builder, 0);
        }
        tree
    } // end of build

    /// inserts one id of store. The store must be the one the tree was built on.
    pub fn insert<S: SeqStore, R: Rng>(&mut self, store: &S, id: SeqId, rng: &mut R) -> CgResult<()> {
        if store.schema_length() != self.schema_length {
            return Err(CgError::InvalidInput {
                expected: self.schema_length,
                got: store.schema_length(),
            });
        }
        if id as usize >= store.len() {
            return Err(CgError::InvalidParameters(format!(
                "id {} out of range, store has {} sequences",
                id,
                store.len()
            )));
        }
        let mut builder = NodeBuilder::new(store, rng, self.capacity, self.dim_policy);
        self.root.insert(id, &mut builder, 0);
        Ok(())
    }

    /// returns the ids of the bucket seq is routed to
    pub fn query(&self, seq: &[u8]) -> CgResult<&[SeqId]> {
        if seq.len() != self.schema_length {
            return Err(CgError::InvalidInput {
                expected: self.schema_length,
                got: seq.len(),
            });
        }
        Ok(self.root.query(seq))
    }

    /// number of ids inserted
    pub fn size(&self) -> usize {
        self.root.size()
    }

    pub fn get_schema_length(&self) -> usize {
        self.schema_length
    }

    pub fn get_capacity(&self) -> usize {
        self.capacity
    }

    pub fn get_root(&self) -> &PartitionNode {
        &self.root
    }

    pub fn stats(&self) -> TreeStats {
        let mut stats = TreeStats::default();
        self.root.visit(|node, depth| {
            stats.nb_nodes += 1;
            stats.max_depth = stats.max_depth.max(depth);
            if let Some(ids) = node.bucket_ids() {
                stats.nb_buckets += 1;
                stats.max_bucket_size = stats.max_bucket_size.max(ids.len());
            }
        });
        stats
    }

    /// all ids held in buckets. Each inserted id appears once.
    pub fn bucket_membership(&self) -> Vec<SeqId> {
        let mut ids = Vec::with_capacity(self.size());
        self.root.visit(|node, _| {
            if let Some(bucket) = node.bucket_ids() {
                ids.extend_from_slice(bucket);
            }
        });
        ids
    }
} // end of impl IndexTree

//=====================================================================================

#[cfg(test)]
mod tests {

    use super::*;
    use crate::seqstore::SeqMatrix;
    use crate::synth::create_around_reference;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn log_init_test() {
        let _ = env_logger::Builder::from_default_env().is_test(true).try_init();
    }

    #[test]
    fn capacity_one_keeps_every_id() {
        log_init_test();
        let (store, _) = create_around_reference(500, 40, 4, 5).unwrap();
        let mut rng = StdRng::seed_from_u64(5);
        let tree = IndexTree::build(&store, 1, DimPolicy::Random, &mut rng);
        assert_eq!(tree.size(), 500);
        let mut ids = tree.bucket_membership();
        ids.sort_unstable();
        let expected: Vec<SeqId> = (0..500).collect();
        assert_eq!(ids, expected);
        log::info!("tree stats : {:?}", tree.stats());
    }

    #[test]
    fn self_match_in_single_tree() {
        log_init_test();
        let (store, _) = create_around_reference(300, 30, 4, 6).unwrap();
        let mut rng = StdRng::seed_from_u64(6);
        for capacity in [1, 5, 50, 300] {
            let tree = IndexTree::build(&store, capacity, DimPolicy::Random, &mut rng);
            for id in 0..store.len() {
                let found = tree.query(store.get(id)).unwrap();
                assert!(found.contains(&(id as SeqId)));
            }
        }
    }

    #[test]
    fn larger_capacity_fewer_nodes() {
        log_init_test();
        let (store, _) = create_around_reference(1000, 50, 4, 7).unwrap();
        let mut rng = StdRng::seed_from_u64(7);
        let small = IndexTree::build(&store, 2, DimPolicy::Random, &mut rng).stats();
        let large = IndexTree::build(&store, 500, DimPolicy::Random, &mut rng).stats();
        let all = IndexTree::build(&store, 1000, DimPolicy::Random, &mut rng).stats();
        log::info!("capacity 2 : {:?}, capacity 500 : {:?}", small, large);
        assert!(large.nb_nodes < small.nb_nodes);
        assert_eq!(all.nb_nodes, 1);
        assert_eq!(all.max_bucket_size, 1000);
    }

    #[test]
    fn query_checks_length() {
        let store = SeqMatrix::from_rows(3, &[vec![0u8, 1, 2]]).unwrap();
        let mut rng = StdRng::seed_from_u64(8);
        let tree = IndexTree::build(&store, 4, DimPolicy::Random, &mut rng);
        assert!(matches!(
            tree.query(&[0, 1]),
            Err(CgError::InvalidInput {
                expected: 3,
                got: 2
            })
        ));
        assert_eq!(tree.query(&[0, 1, 2]).unwrap(), &[0u32]);
    }

    #[test]
    fn insert_after_build() {
        let rows: Vec<Vec<u8>> = (0..20u8).map(|i| vec![i % 3, i % 5, i % 7]).collect();
        let store = SeqMatrix::from_rows(3, &rows).unwrap();
        let mut rng = StdRng::seed_from_u64(9);
        let mut tree = IndexTree::new(3, 2, DimPolicy::RandomExcludingAncestors);
        for id in 0..20 {
            tree.insert(&store, id, &mut rng).unwrap();
        }
        assert_eq!(tree.size(), 20);
        assert_eq!(tree.bucket_membership().len(), 20);
        // an id outside the store is refused and leaves the tree unchanged
        assert!(matches!(
            tree.insert(&store, 20, &mut rng),
            Err(CgError::InvalidParameters(_))
        ));
        assert_eq!(tree.size(), 20);
    }
} // end of mod tests
