//! The candidate generation index : a forest of random partition trees over Hamming space.

pub mod forest;
pub mod node;
pub mod tree;

pub use forest::*;
pub use node::{PartitionNode, SeqId};
pub use tree::*;
