//! Approximate search of allele profiles within a Hamming distance of a query.
//!
//! Profiles (cgMLST allele codes) are indexed by a [Forest](index::Forest) of random partition trees.
//! A query is routed to one bucket in each tree, the union of buckets gives the candidates,
//! and candidates are then checked by a [Verifier](verify::Verifier), exact or heuristic.
//!
//! The index is probabilistic : a true neighbour is missed if it falls in another bucket than
//! the query in every tree. Increasing the number of trees decreases this probability.

pub mod errors;
pub mod index;
pub mod search;
pub mod seqstore;
pub mod synth;
pub mod utils;
pub mod verify;

pub mod prelude;
