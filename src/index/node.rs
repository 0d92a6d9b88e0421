//! Partition nodes : the cells of a random partition tree.
//!
//! A node is first a bucket of sequence ids. When a bucket holds more than the capacity
//! it becomes a split : it draws a dimension (a locus) and dispatches its ids in child buckets
//! keyed by the allele code found at that dimension. Conversion is one way, a split never goes back to a bucket.
//!
//! Insertion, splitting and dropping walk the tree with loops and explicit stacks, as a tree built on
//! many near identical profiles can be as deep as the schema length.
//! A bucket at depth d can be split only if d + 1 < schema_length (or, when ancestors dimensions are excluded,
//! while some dimension is not yet used on the path). A bucket whose ids are all the same profile is never split,
//! no dimension could separate them.

use fxhash::FxHashMap;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::seqstore::SeqStore;
use crate::utils::parameters::DimPolicy;

/// rank of a sequence in its store
pub type SeqId = u32;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub(crate) enum NodeKind {
    Bucket(Vec<SeqId>),
    Split {
        dim: usize,
        children: FxHashMap<u8, PartitionNode>,
    },
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PartitionNode {
    /// number of ids inserted through this node
    size: usize,
    kind: NodeKind,
}

/// What a node needs while ids are inserted : the sequences, the randomness and the splitting rules.
pub(crate) struct NodeBuilder<'a, S: SeqStore, R: Rng> {
    store: &'a S,
    rng: &'a mut R,
    capacity: usize,
    dim_policy: DimPolicy,
    /// dimensions of the splits on the path from root to the current node
    ancestors: Vec<usize>,
}

impl<'a, S: SeqStore, R: Rng> NodeBuilder<'a, S, R> {
    pub(crate) fn new(store: &'a S, rng: &'a mut R, capacity: usize, dim_policy: DimPolicy) -> Self {
        NodeBuilder {
            store,
            rng,
            capacity,
            dim_policy,
            ancestors: Vec::new(),
        }
    }

    #[inline]
    fn value(&self, id: SeqId, dim: usize) -> u8 {
        self.store.get(id as usize)[dim]
    }

    #[inline]
    fn same_profile(&self, a: SeqId, b: SeqId) -> bool {
        self.store.get(a as usize) == self.store.get(b as usize)
    }

    fn all_identical(&self, ids: &[SeqId]) -> bool {
        match ids.split_first() {
            Some((&first, others)) => others.iter().all(|&id| self.same_profile(first, id)),
            None => true,
        }
    }

    // true if a bucket at depth, below the current ancestors, has a dimension left to split on
    fn can_split(&self, depth: usize) -> bool {
        let schema_length = self.store.schema_length();
        match self.dim_policy {
            DimPolicy::Random => depth + 1 < schema_length,
            DimPolicy::RandomExcludingAncestors => self.ancestors.len() < schema_length,
        }
    }

    // returns None if the bucket at depth cannot be split any more
    fn pick_dim(&mut self, depth: usize) -> Option<usize> {
        if !self.can_split(depth) {
            return None;
        }
        let schema_length = self.store.schema_length();
        match self.dim_policy {
            DimPolicy::Random => Some(self.rng.random_range(0..schema_length)),
            DimPolicy::RandomExcludingAncestors => {
                if 2 * self.ancestors.len() < schema_length {
                    // at least half of the dimensions are free, rejection is cheap
                    loop {
                        let dim = self.rng.random_range(0..schema_length);
                        if !self.ancestors.contains(&dim) {
                            return Some(dim);
                        }
                    }
                }
                let mut used = vec![false; schema_length];
                for &d in &self.ancestors {
                    used[d] = true;
                }
                let free: Vec<usize> = (0..schema_length).filter(|&d| !used[d]).collect();
                Some(free[self.rng.random_range(0..free.len())])
            }
        }
    } // end of pick_dim
} // end of impl NodeBuilder

impl Default for PartitionNode {
    fn default() -> Self {
        PartitionNode::new()
    }
}

// children are detached and dropped one by one so that a deep tree does not recurse in drop
impl Drop for PartitionNode {
    fn drop(&mut self) {
        let mut stack = Vec::<PartitionNode>::new();
        if let NodeKind::Split { children, .. } = &mut self.kind {
            stack.extend(children.drain().map(|(_, child)| child));
        }
        while let Some(mut node) = stack.pop() {
            if let NodeKind::Split { children, .. } = &mut node.kind {
                stack.extend(children.drain().map(|(_, child)| child));
            }
        }
    }
}

impl PartitionNode {
    /// an empty bucket
    pub fn new() -> Self {
        PartitionNode {
            size: 0,
            kind: NodeKind::Bucket(Vec::new()),
        }
    }

    /// total number of ids inserted through this node
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn is_bucket(&self) -> bool {
        matches!(self.kind, NodeKind::Bucket(_))
    }

    /// dimension used by a split, None for a bucket
    pub fn get_dim(&self) -> Option<usize> {
        match &self.kind {
            NodeKind::Bucket(_) => None,
            NodeKind::Split { dim, .. } => Some(*dim),
        }
    }

    /// inserts id in the subtree rooted at self, self being at depth depth.
    pub(crate) fn insert<S: SeqStore, R: Rng>(&mut self, id: SeqId, builder: &mut NodeBuilder<S, R>, depth: usize) {
        let nb_ancestors = builder.ancestors.len();
        let mut depth = depth;
        let mut node = self;
        loop {
            node.size += 1;
            if let NodeKind::Bucket(ids) = &mut node.kind {
                ids.push(id);
                if ids.len() > builder.capacity && builder.can_split(depth) {
                    // a bucket already oversized could not be split before : its ids were all identical
                    let identical = if ids.len() > builder.capacity + 1 {
                        builder.same_profile(ids[0], id)
                    } else {
                        builder.all_identical(ids)
                    };
                    if !identical {
                        node.split(builder, depth);
                    }
                }
                break;
            }
            node = match &mut node.kind {
                NodeKind::Split { dim, children } => {
                    let value = builder.value(id, *dim);
                    builder.ancestors.push(*dim);
                    children.entry(value).or_default()
                }
                NodeKind::Bucket(_) => break,
            };
            depth += 1;
        }
        builder.ancestors.truncate(nb_ancestors);
    } // end of insert

    // converts an overflowing bucket in a split and dispatches its ids.
    // Children still overflowing are pushed on a stack and split in turn.
    fn split<S: SeqStore, R: Rng>(&mut self, builder: &mut NodeBuilder<S, R>, depth: usize) {
        let ancestors = std::mem::take(&mut builder.ancestors);
        let mut stack: Vec<(&mut PartitionNode, usize, Vec<usize>)> = vec![(self, depth, ancestors.clone())];
        while let Some((node, depth, path)) = stack.pop() {
            builder.ancestors = path;
            let splittable = match &node.kind {
                NodeKind::Bucket(ids) => builder.can_split(depth) && !builder.all_identical(ids),
                NodeKind::Split { .. } => false,
            };
            if !splittable {
                log::trace!("bucket of {} ids kept at depth {}", node.size, depth);
                continue;
            }
            let dim = match builder.pick_dim(depth) {
                Some(dim) => dim,
                None => continue,
            };
            let held = match &mut node.kind {
                NodeKind::Bucket(ids) => std::mem::take(ids),
                NodeKind::Split { .. } => continue,
            };
            log::trace!("splitting bucket of {} ids at depth {} on dim {}", held.len(), depth, dim);
            //
            let mut children = FxHashMap::<u8, PartitionNode>::default();
            for id in held {
                let child = children.entry(builder.value(id, dim)).or_default();
                child.size += 1;
                if let NodeKind::Bucket(ids) = &mut child.kind {
                    ids.push(id);
                }
            }
            builder.ancestors.push(dim);
            node.kind = NodeKind::Split { dim, children };
            if let NodeKind::Split { children, .. } = &mut node.kind {
                for child in children.values_mut() {
                    if child.size > builder.capacity {
                        stack.push((child, depth + 1, builder.ancestors.clone()));
                    }
                }
            }
        }
        builder.ancestors = ancestors;
    } // end of split

    /// follows the path of seq down to a bucket and returns its ids.
    /// An allele code not seen at a split during construction gives an empty slice.
    pub fn query(&self, seq: &[u8]) -> &[SeqId] {
        let mut node = self;
        loop {
            match &node.kind {
                NodeKind::Bucket(ids) => return ids,
                NodeKind::Split { dim, children } => match children.get(&seq[*dim]) {
                    Some(child) => node = child,
                    None => return &[],
                },
            }
        }
    } // end of query

    /// visits all nodes of the subtree, passing each node and its depth to f
    pub(crate) fn visit<F: FnMut(&PartitionNode, usize)>(&self, mut f: F) {
        let mut stack = vec![(self, 0usize)];
        while let Some((node, depth)) = stack.pop() {
            f(node, depth);
            if let NodeKind::Split { children, .. } = &node.kind {
                stack.extend(children.values().map(|c| (c, depth + 1)));
            }
        }
    }

    /// ids held by the node if it is a bucket
    pub(crate) fn bucket_ids(&self) -> Option<&[SeqId]> {
        match &self.kind {
            NodeKind::Bucket(ids) => Some(ids),
            NodeKind::Split { .. } => None,
        }
    }
} // end of impl PartitionNode

//=====================================================================================

// end of mod tests
