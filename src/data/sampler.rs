// ============================================================
// Layer 4 - Bucketed Batch Sampler
// ============================================================
// Decides which examples go into which batch, and in what order
// batches are visited.
//
// The partition is already sorted by source length, so cutting
// its index range into contiguous chunks gives batches whose
// members have nearly the same length:
//
//   indices:  0 1 2 3 | 4 5 6 7 | 8 9 10 11 | 12 13
//   lengths:  9 9 8 8 | 7 7 7 6 | 5 5  4  4 |  2  1
//
// Chunk contents are fixed at construction. Every epoch the
// ORDER of the chunks is reshuffled, never their contents:
//
//   epoch 1:  [8..12] [0..4] [12..14] [4..8]
//   epoch 2:  [4..8] [12..14] [0..4] [8..12]
//
// Reference: rand crate documentation (SliceRandom)

use std::ops::Range;

use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};

use crate::domain::errors::DataError;

/// Contiguous index chunks over a length-sorted partition.
#[derive(Debug, Clone)]
pub struct BucketSampler {
    /// Fixed chunks in ascending index order
    chunks: Vec<Range<usize>>,
    /// Drives the per-epoch chunk order
    rng: StdRng,
}

impl BucketSampler {
    /// Chunk `[0, len)` into ranges of `batch_size` (the last may be shorter).
    ///
    /// # Errors
    /// `DataError::NoData` for an empty partition,
    /// `DataError::InvalidConfig` for a zero batch size.
    pub fn new(len: usize, batch_size: usize, seed: u64) -> Result<Self, DataError> {
        if batch_size == 0 {
            return Err(DataError::InvalidConfig("batch_size must be at least 1".into()));
        }
        if len == 0 {
            return Err(DataError::NoData);
        }

        let chunks: Vec<Range<usize>> = (0..len)
            .step_by(batch_size)
            .map(|start| start..(start + batch_size).min(len))
            .collect();

        Ok(Self { chunks, rng: StdRng::seed_from_u64(seed) })
    }

    /// Number of batches per pass: ceil(len / batch_size).
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// The fixed chunks, in ascending index order.
    pub fn chunks(&self) -> &[Range<usize>] {
        &self.chunks
    }

    /// Start a new pass: every chunk exactly once, in a fresh random order.
    pub fn epoch(&mut self) -> Vec<Range<usize>> {
        let mut order = self.chunks.clone();
        order.shuffle(&mut self.rng);
        order
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    #[test]
    fn test_number_of_batches_is_ceil() {
        assert_eq!(BucketSampler::new(10, 3, 0).unwrap().len(), 4);
        assert_eq!(BucketSampler::new(9, 3, 0).unwrap().len(), 3);
        assert_eq!(BucketSampler::new(1, 64, 0).unwrap().len(), 1);
    }

    #[test]
    fn test_last_chunk_may_be_short() {
        let s = BucketSampler::new(10, 4, 0).unwrap();
        assert_eq!(s.chunks(), &[0..4, 4..8, 8..10]);
    }

    #[test]
    fn test_pass_covers_every_index_once() {
        let mut s = BucketSampler::new(103, 8, 7).unwrap();
        for _ in 0..3 {
            let mut seen: Vec<usize> = s.epoch().into_iter().flatten().collect();
            seen.sort_unstable();
            assert_eq!(seen, (0..103).collect::<Vec<_>>());
        }
    }

    #[test]
    fn test_order_changes_but_contents_do_not() {
        let mut s = BucketSampler::new(400, 8, 11).unwrap();
        let first  = s.epoch();
        let second = s.epoch();

        // 50 chunks: identical order twice in a row has probability 1/50!
        assert_ne!(first, second);

        let mut a = first.clone();
        let mut b = second.clone();
        a.sort_by_key(|r| r.start);
        b.sort_by_key(|r| r.start);
        assert_eq!(a, b);
        assert_eq!(a, s.chunks());
    }

    #[test]
    fn test_bucketing_beats_random_batching() {
        let mut rng = StdRng::seed_from_u64(5);
        let mut lengths: Vec<usize> = (0..512).map(|_| rng.gen_range(1..80)).collect();
        lengths.sort_unstable_by(|a, b| b.cmp(a));

        let spread = |batch: &[usize]| -> usize {
            let max = batch.iter().map(|&i| lengths[i]).max().unwrap_or(0);
            let min = batch.iter().map(|&i| lengths[i]).min().unwrap_or(0);
            max - min
        };

        let mut sampler = BucketSampler::new(lengths.len(), 16, 5).unwrap();
        let bucketed: usize = sampler
            .epoch()
            .into_iter()
            .map(|r| spread(&r.collect::<Vec<_>>()))
            .sum();

        let mut shuffled: Vec<usize> = (0..lengths.len()).collect();
        shuffled.shuffle(&mut rng);
        let random: usize = shuffled.chunks(16).map(|c| spread(c)).sum();

        assert!(bucketed < random, "bucketed={bucketed} random={random}");
    }

    #[test]
    fn test_empty_partition_is_no_data() {
        assert!(matches!(BucketSampler::new(0, 4, 0), Err(DataError::NoData)));
    }

    #[test]
    fn test_zero_batch_size_rejected() {
        assert!(matches!(
            BucketSampler::new(10, 0, 0),
            Err(DataError::InvalidConfig(_))
        ));
    }
}
