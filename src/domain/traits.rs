// ============================================================
// Layer 3 - Core Traits (Ports)
// ============================================================
// The training pipeline only ever talks to these traits:
//
//   CorpusSource  - where raw parallel text comes from
//   TextCodec     - text <-> token ids (word level or BPE)
//   MetricsSink   - where scalars and the example table go
//
// Concrete implementations live in data/ and infra/; tests
// plug in small in-memory versions.
//
// Reference: Rust Book §10 (Traits: Defining Shared Behaviour)

use std::path::Path;

use anyhow::Result;

use crate::domain::pair::{ExampleRow, TranslationPair};

// ─── CorpusSource ─────────────────────────────────────────────────────────────
/// Anything that can hand out a named split of a parallel corpus.
pub trait CorpusSource {
    /// Load every pair of `split` ("train", "validation", ...) in file order.
    fn load_split(&self, split: &str) -> Result<Vec<TranslationPair>>;
}

// ─── TextCodec ────────────────────────────────────────────────────────────────
/// Ids of the reserved tokens every codec must provide.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpecialIds {
    pub pad: u32,
    pub unk: u32,
    pub bos: u32,
    pub eos: u32,
}

/// Text <-> token id conversion.
///
/// `encode` returns `[BOS] ... [EOS]` wrapped ids so the decoder input
/// always starts with BOS and the shifted target always ends with EOS.
pub trait TextCodec {
    fn encode(&self, text: &str) -> Result<Vec<u32>>;

    fn decode(&self, ids: &[u32], skip_special_tokens: bool) -> Result<String>;

    fn decode_batch(&self, batch: &[Vec<u32>], skip_special_tokens: bool) -> Result<Vec<String>> {
        batch
            .iter()
            .map(|ids| self.decode(ids, skip_special_tokens))
            .collect()
    }

    fn save(&self, path: &Path) -> Result<()>;

    /// Vocabulary size including special tokens.
    fn vocab_size(&self) -> usize;

    fn specials(&self) -> SpecialIds;
}

// ─── MetricsSink ──────────────────────────────────────────────────────────────
/// The single narrow port for experiment tracking.
///
/// The learner treats every call as best effort: an `Err` is logged as a
/// warning and training carries on.
pub trait MetricsSink {
    /// Record a group of scalars under one monotonically increasing step.
    fn log_scalars(&mut self, step: usize, scalars: &[(&str, f64)]) -> Result<()>;

    /// Record the qualitative example table. Called once per run.
    fn log_examples(&mut self, rows: &[ExampleRow]) -> Result<()>;
}

/// Sink that drops everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullMetrics;

impl MetricsSink for NullMetrics {
    fn log_scalars(&mut self, _step: usize, _scalars: &[(&str, f64)]) -> Result<()> {
        Ok(())
    }

    fn log_examples(&mut self, _rows: &[ExampleRow]) -> Result<()> {
        Ok(())
    }
}
