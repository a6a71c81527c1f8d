// ============================================================
// Layer 4 - Corpus Preparer
// ============================================================
// Turns a full corpus split into the fixed-size working set
// used for one training run:
//
//   load split ──► seeded shuffle ──► take first N ──► normalise
//
// The shuffle uses a StdRng seeded from the config, so the same
// (N, seed) pair always selects the same examples.
//
// Reference: rand crate documentation (SeedableRng, SliceRandom)

use anyhow::Result;
use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};

use crate::data::normalize::SentenceNormalizer;
use crate::domain::errors::DataError;
use crate::domain::pair::TranslationPair;
use crate::domain::traits::CorpusSource;

/// Load `split`, shuffle it deterministically, keep `example_count` pairs.
///
/// # Errors
/// `DataError::CorpusTooSmall` when the split holds fewer than
/// `example_count` pairs; any error from the source itself.
pub fn prepare_corpus(
    source:        &dyn CorpusSource,
    split:         &str,
    example_count: usize,
    seed:          u64,
) -> Result<Vec<TranslationPair>> {
    let mut pairs = source.load_split(split)?;

    if example_count > pairs.len() {
        return Err(DataError::CorpusTooSmall {
            split:     split.to_string(),
            requested: example_count,
            available: pairs.len(),
        }
        .into());
    }

    let mut rng = StdRng::seed_from_u64(seed);
    pairs.shuffle(&mut rng);
    pairs.truncate(example_count);

    let normalizer = SentenceNormalizer::new();
    let pairs: Vec<TranslationPair> = pairs
        .into_iter()
        .map(|p| TranslationPair::new(
            normalizer.normalize(&p.source),
            normalizer.normalize(&p.target),
        ))
        .collect();

    tracing::info!(
        "Prepared {} pairs from split '{}' (seed={})",
        pairs.len(),
        split,
        seed
    );
    Ok(pairs)
}
