// ============================================================
// Layer 4 - Sequence Preprocessor
// ============================================================
// Takes prepared text pairs to two length-sorted partitions:
//
//   TranslationPair ──tokenize──► TokenizedPair (+ lengths)
//                   ──filter───► length_src, length_trg <= max_len
//                   ──split────► train / test (random)
//                   ──sort─────► length_src descending, per partition
//
// Over-long pairs are dropped silently; that is a data quality
// policy, not a failure. The sort is what lets the bucket
// sampler cut near-uniform-length batches out of contiguous
// index ranges.
//
// Sort order for equal length_src: longer target first, then the
// pair's original corpus position. The result never depends on
// how the split happened to shuffle the partition.
//
// Reference: Rust Book §13 (Iterators and Closures)

use anyhow::Result;
use rand::Rng;

use crate::data::splitter::split_train_test;
use crate::domain::errors::DataError;
use crate::domain::pair::{TokenizedPair, TranslationPair};
use crate::domain::traits::TextCodec;

/// The two partitions produced for one training run.
#[derive(Debug, Clone)]
pub struct Partitions {
    pub train: Vec<TokenizedPair>,
    pub test:  Vec<TokenizedPair>,
}

/// Run the full preprocessing pipeline.
///
/// # Errors
/// * `DataError::InvalidConfig` if `test_proportion` is outside (0, 1)
/// * `DataError::EmptyPartition` if either partition has no examples
/// * tokenizer failures
pub fn preprocess_pairs<R: Rng + ?Sized>(
    pairs:           &[TranslationPair],
    codec:           &dyn TextCodec,
    max_len:         usize,
    test_proportion: f64,
    rng:             &mut R,
) -> Result<Partitions> {
    if !(test_proportion > 0.0 && test_proportion < 1.0) {
        return Err(DataError::InvalidConfig(format!(
            "test_proportion must be in (0, 1), got {test_proportion}"
        ))
        .into());
    }

    let tokenized = tokenize_pairs(pairs, codec)?;
    let before    = tokenized.len();
    let kept      = filter_by_length(tokenized, max_len);
    tracing::info!(
        "Length filter (max_len={}): kept {} of {} pairs",
        max_len,
        kept.len(),
        before
    );

    let (mut train, mut test) = split_train_test(kept, test_proportion, rng);
    if train.is_empty() {
        return Err(DataError::EmptyPartition("train").into());
    }
    if test.is_empty() {
        return Err(DataError::EmptyPartition("test").into());
    }

    sort_by_length(&mut train);
    sort_by_length(&mut test);

    tracing::info!("Partitions ready: {} train, {} test", train.len(), test.len());
    Ok(Partitions { train, test })
}

/// Tokenize every pair independently, preserving order.
pub fn tokenize_pairs(
    pairs: &[TranslationPair],
    codec: &dyn TextCodec,
) -> Result<Vec<TokenizedPair>> {
    pairs
        .iter()
        .enumerate()
        .map(|(position, pair)| {
            Ok(TokenizedPair::new(
                position,
                codec.encode(&pair.source)?,
                codec.encode(&pair.target)?,
            ))
        })
        .collect()
}

/// Keep pairs whose both sides are at most `max_len` tokens.
pub fn filter_by_length(pairs: Vec<TokenizedPair>, max_len: usize) -> Vec<TokenizedPair> {
    pairs.into_iter().filter(|p| p.fits(max_len)).collect()
}

/// Sort by length_src descending, ties by length_trg descending then position.
pub fn sort_by_length(pairs: &mut [TokenizedPair]) {
    pairs.sort_by(|a, b| {
        b.length_src
            .cmp(&a.length_src)
            .then(b.length_trg.cmp(&a.length_trg))
            .then(a.position.cmp(&b.position))
    });
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{pairs_with_lengths, WhitespaceCodec};
    use rand::{rngs::StdRng, SeedableRng};

    fn run(lengths: &[usize], max_len: usize, test_proportion: f64) -> Result<Partitions> {
        let pairs   = pairs_with_lengths(lengths);
        let codec   = WhitespaceCodec::from_pairs(&pairs);
        let mut rng = StdRng::seed_from_u64(42);
        preprocess_pairs(&pairs, &codec, max_len, test_proportion, &mut rng)
    }

    #[test]
    fn test_partitions_sorted_descending() {
        let parts = run(&[3, 9, 1, 7, 4, 4, 8, 2, 6, 5], 64, 0.3).unwrap();
        for part in [&parts.train, &parts.test] {
            assert!(part.windows(2).all(|w| w[0].length_src >= w[1].length_src));
        }
    }

    #[test]
    fn test_long_pairs_dropped_silently() {
        // encode adds BOS/EOS: n words → n + 2 source ids, n + 3 target ids
        let parts = run(&[1, 2, 3, 10, 20, 2, 3], 6, 0.3).unwrap();
        let total = parts.train.len() + parts.test.len();
        assert_eq!(total, 5);
        for p in parts.train.iter().chain(&parts.test) {
            assert!(p.length_src <= 6 && p.length_trg <= 6);
        }
    }

    #[test]
    fn test_filter_is_idempotent() {
        let pairs = pairs_with_lengths(&[1, 5, 9, 2, 14, 3]);
        let codec = WhitespaceCodec::from_pairs(&pairs);
        let once  = filter_by_length(tokenize_pairs(&pairs, &codec).unwrap(), 8);
        let twice = filter_by_length(once.clone(), 8);
        assert_eq!(once, twice);
        assert!(twice.iter().all(|p| p.fits(8)));
    }

    #[test]
    fn test_tokenize_preserves_order() {
        let pairs = pairs_with_lengths(&[4, 1, 3]);
        let codec = WhitespaceCodec::from_pairs(&pairs);
        let toks  = tokenize_pairs(&pairs, &codec).unwrap();
        let lens: Vec<usize> = toks.iter().map(|p| p.length_src).collect();
        assert_eq!(lens, vec![6, 3, 5]);
        assert_eq!(toks.iter().map(|p| p.position).collect::<Vec<_>>(), vec![0, 1, 2]);
    }

    #[test]
    fn test_tie_break_is_deterministic() {
        let mut pairs = vec![
            TokenizedPair::new(5, vec![1; 4], vec![1; 3]),
            TokenizedPair::new(2, vec![1; 4], vec![1; 6]),
            TokenizedPair::new(1, vec![1; 4], vec![1; 3]),
            TokenizedPair::new(0, vec![1; 7], vec![1; 2]),
        ];
        sort_by_length(&mut pairs);
        let order: Vec<usize> = pairs.iter().map(|p| p.position).collect();
        assert_eq!(order, vec![0, 2, 1, 5]);
    }

    #[test]
    fn test_everything_filtered_is_fatal() {
        let err = run(&[10, 12, 15], 4, 0.2).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<DataError>(),
            Some(DataError::EmptyPartition(_))
        ));
    }

    #[test]
    fn test_single_survivor_leaves_train_empty() {
        // one pair fits; ceil(1 * 0.5) = 1 goes to test, train is empty
        let err = run(&[1, 30], 8, 0.5).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<DataError>(),
            Some(DataError::EmptyPartition("train"))
        ));
    }

    #[test]
    fn test_invalid_test_proportion() {
        for p in [0.0, 1.0, -0.5, 1.5] {
            let err = run(&[1, 2, 3], 16, p).unwrap_err();
            assert!(matches!(
                err.downcast_ref::<DataError>(),
                Some(DataError::InvalidConfig(_))
            ));
        }
    }
}
