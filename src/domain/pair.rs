// ============================================================
// Layer 3 - Translation Pair Domain Types
// ============================================================
// A translation example moves through three shapes:
//
//   TranslationPair  ("the cat sat", "con mèo ngồi")
//         │  tokenizer
//         ▼
//   TokenizedPair    ([2, 57, 91, 340, 3], [2, 88, 12, 409, 3])
//         │  learner, after decoding + translate
//         ▼
//   ExampleRow       (epoch, split, source, target, prediction)
//
// Reference: Rust Book §5 (Structs)

use serde::{Deserialize, Serialize};

/// One aligned sentence pair from the parallel corpus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslationPair {
    /// Sentence in the source language
    pub source: String,

    /// Reference translation in the target language
    pub target: String,
}

impl TranslationPair {
    /// Create a new pair. Accepts &str or String for either side.
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
        }
    }
}

/// A pair after tokenization, annotated with its lengths.
///
/// `position` is the index the pair had in the prepared corpus; it
/// survives splitting and sorting so ordering ties stay deterministic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenizedPair {
    pub position:   usize,
    pub source_ids: Vec<u32>,
    pub target_ids: Vec<u32>,
    pub length_src: usize,
    pub length_trg: usize,
}

impl TokenizedPair {
    pub fn new(position: usize, source_ids: Vec<u32>, target_ids: Vec<u32>) -> Self {
        let length_src = source_ids.len();
        let length_trg = target_ids.len();
        Self { position, source_ids, target_ids, length_src, length_trg }
    }

    /// True when both sides fit inside `max_len` tokens.
    pub fn fits(&self, max_len: usize) -> bool {
        self.length_src <= max_len && self.length_trg <= max_len
    }
}

/// Which partition a tracked example was drawn from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Split {
    Train,
    Validation,
}

impl std::fmt::Display for Split {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Split::Train      => write!(f, "Train"),
            Split::Validation => write!(f, "Validation"),
        }
    }
}

/// One row of the qualitative example table flushed at the end of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExampleRow {
    pub epoch:      usize,
    pub split:      Split,
    pub source:     String,
    pub target:     String,
    pub prediction: String,
}
