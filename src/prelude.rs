//! gathers the types needed to build an index and run searches

pub use crate::errors::{CgError, CgResult};
pub use crate::index::{Forest, IndexTree, SeqId};
pub use crate::search::{hamming_distance, naive_search, par_search, recall, search};
pub use crate::seqstore::{MmapSeqMatrix, SeqMatrix, SeqStore};
pub use crate::utils::dumpload::{dumpall, reloadall};
pub use crate::utils::parameters::*;
pub use crate::verify::{make_verifier, ExactVerifier, HeuristicVerifier, Verifier, VerifierStrategy};
