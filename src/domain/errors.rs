//! Setup-time data errors.
//!
//! Everything here is fatal and is raised before the first epoch starts.
//! Sequences longer than `max_len` are not errors; the preprocessor drops
//! them silently.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DataError {
    /// More examples were requested than the split holds.
    #[error("corpus split '{split}' has {available} examples but {requested} were requested")]
    CorpusTooSmall {
        split:     String,
        requested: usize,
        available: usize,
    },

    /// The two sides of a parallel corpus have different line counts.
    #[error("misaligned corpus: {source_path:?} has {source_lines} lines, {target_path:?} has {target_lines}")]
    MisalignedCorpus {
        source_path:  PathBuf,
        source_lines: usize,
        target_path:  PathBuf,
        target_lines: usize,
    },

    /// A partition ended up with zero examples after filtering or splitting.
    #[error("partition '{0}' is empty after length filtering (max_len too small or corpus too small?)")]
    EmptyPartition(&'static str),

    /// A sampler was asked to batch an empty index range.
    #[error("no data: cannot build batches over an empty partition")]
    NoData,

    /// A configuration value is outside its valid range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Failure reported by the tokenizers crate.
    #[error("tokenizer error: {0}")]
    Tokenizer(String),
}

impl From<tokenizers::Error> for DataError {
    fn from(err: tokenizers::Error) -> Self {
        Self::Tokenizer(err.to_string())
    }
}
