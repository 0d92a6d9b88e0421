//! error type shared by index, verifiers and dump/reload functions

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CgError {
    /// a sequence (a query or a row pushed in a store) has not the schema length
    #[error("invalid input : expected sequence length {expected}, got {got}")]
    InvalidInput { expected: usize, got: usize },

    /// a reloaded index was not built on the sequence store it is used with, it must be rebuilt
    #[error("index/dataset mismatch : index size {index}, dataset size {dataset}")]
    IndexDatasetMismatch { index: usize, dataset: usize },

    #[error("invalid parameters : {0}")]
    InvalidParameters(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("binary encoding failed : {0}")]
    Encoding(#[from] bincode::Error),

    #[error("json encoding failed : {0}")]
    Json(#[from] serde_json::Error),
} // end of CgError

pub type CgResult<T> = std::result::Result<T, CgError>;
