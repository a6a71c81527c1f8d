// ============================================================
// Layer 4 - Bucketed Data Loader
// ============================================================
// Glues one partition, its BucketSampler and the padding
// collator into something the learner can `for`-loop over.
//
//   BucketSampler::epoch()  ── fixed chunks, fresh order
//          │
//          ▼
//   prefetch worker         ── gathers the examples of the next
//          │                   `prefetch` chunks into Vecs
//          ▼  sync_channel
//   TranslationBatcher      ── pads + builds tensors on the
//                              learner's thread and device
//
// The chunk order is drawn before the worker starts, so the
// worker only overlaps example gathering with compute; what
// each batch contains and the order batches arrive in are the
// same as without it.
//
// Reference: Rust Book §16 (Message Passing with channels)
//            Burn Book §4 (Datasets and Dataloaders)

use anyhow::{Context, Result};
use burn::{
    data::{dataloader::batcher::Batcher, dataset::Dataset},
    prelude::*,
};
use std::{
    sync::{mpsc, Arc},
    thread,
};

use crate::data::batcher::{TranslationBatch, TranslationBatcher};
use crate::data::dataset::TranslationDataset;
use crate::data::sampler::BucketSampler;
use crate::domain::errors::DataError;
use crate::domain::pair::TokenizedPair;

/// Iterates one partition in length buckets, reshuffling bucket order each pass.
pub struct BucketedLoader<B: Backend> {
    dataset:  Arc<TranslationDataset>,
    sampler:  BucketSampler,
    batcher:  TranslationBatcher<B>,
    /// Number of gathered batches the worker may run ahead
    prefetch: usize,
}

impl<B: Backend> BucketedLoader<B> {
    /// # Errors
    /// `DataError::NoData` if the partition is empty.
    pub fn new(
        dataset:    Arc<TranslationDataset>,
        batch_size: usize,
        seed:       u64,
        batcher:    TranslationBatcher<B>,
        prefetch:   usize,
    ) -> Result<Self, DataError> {
        let sampler = BucketSampler::new(dataset.len(), batch_size, seed)?;
        Ok(Self { dataset, sampler, batcher, prefetch: prefetch.max(1) })
    }

    /// Batches per pass.
    pub fn num_batches(&self) -> usize {
        self.sampler.len()
    }

    /// Start a new pass over the partition.
    pub fn iter(&mut self) -> Result<BatchIter<B>> {
        let order     = self.sampler.epoch();
        let remaining = order.len();
        let dataset   = Arc::clone(&self.dataset);
        let (tx, rx)  = mpsc::sync_channel::<Vec<TokenizedPair>>(self.prefetch);

        thread::Builder::new()
            .name("batch-prefetch".into())
            .spawn(move || {
                for range in order {
                    let items: Vec<TokenizedPair> =
                        range.filter_map(|i| dataset.get(i)).collect();
                    // The consumer dropped the iterator early; nothing left to do
                    if tx.send(items).is_err() {
                        break;
                    }
                }
            })
            .context("Failed to spawn the batch prefetch worker")?;

        Ok(BatchIter {
            receiver: rx,
            batcher:  self.batcher.clone(),
            remaining,
        })
    }

    /// Examples of the first batch of a fresh pass, before padding.
    pub fn first_items(&mut self) -> Vec<TokenizedPair> {
        self.sampler
            .epoch()
            .into_iter()
            .next()
            .map(|range| range.filter_map(|i| self.dataset.get(i)).collect())
            .unwrap_or_default()
    }
}

/// One pass worth of padded batches.
pub struct BatchIter<B: Backend> {
    receiver:  mpsc::Receiver<Vec<TokenizedPair>>,
    batcher:   TranslationBatcher<B>,
    remaining: usize,
}

impl<B: Backend> Iterator for BatchIter<B> {
    type Item = TranslationBatch<B>;

    fn next(&mut self) -> Option<Self::Item> {
        let items = self.receiver.recv().ok()?;
        self.remaining = self.remaining.saturating_sub(1);
        Some(self.batcher.batch(items))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<B: Backend> ExactSizeIterator for BatchIter<B> {}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    /// 10 pairs with source lengths 10, 9, ..., 1 (already sorted)
    fn loader(batch_size: usize, prefetch: usize) -> BucketedLoader<TestBackend> {
        let pairs: Vec<TokenizedPair> = (0..10)
            .map(|i| TokenizedPair::new(i, vec![7; 10 - i], vec![8; 2 + i % 3]))
            .collect();
        let dataset = Arc::new(TranslationDataset::new(pairs));
        BucketedLoader::new(
            dataset,
            batch_size,
            3,
            TranslationBatcher::new(Default::default()),
            prefetch,
        )
        .unwrap()
    }

    #[test]
    fn test_one_batch_per_chunk() {
        let mut l = loader(4, 2);
        assert_eq!(l.num_batches(), 3);

        let iter = l.iter().unwrap();
        assert_eq!(iter.len(), 3);

        let rows: usize = iter.map(|b| b.source.dims()[0]).sum();
        assert_eq!(rows, 10);
    }

    #[test]
    fn test_batch_width_is_bucket_max() {
        let mut l = loader(4, 1);
        let mut widths: Vec<[usize; 2]> = l.iter().unwrap().map(|b| b.source.dims()).collect();
        widths.sort();
        // chunks: [10,9,8,7] [6,5,4,3] [2,1]
        assert_eq!(widths, vec![[2, 2], [4, 6], [4, 10]]);
    }

    #[test]
    fn test_early_drop_does_not_hang() {
        let mut l = loader(1, 1);
        let first = l.iter().unwrap().next();
        assert!(first.is_some());
        // a second pass still works after the first iterator was abandoned
        assert_eq!(l.iter().unwrap().count(), 10);
    }

    #[test]
    fn test_first_items_is_one_contiguous_chunk() {
        let mut l = loader(4, 2);
        let items = l.first_items();
        assert!(!items.is_empty() && items.len() <= 4);

        let positions: Vec<usize> = items.iter().map(|p| p.position).collect();
        let start = positions[0];
        assert_eq!(positions, (start..start + items.len()).collect::<Vec<_>>());
    }

    #[test]
    fn test_empty_partition_fails() {
        let dataset = Arc::new(TranslationDataset::new(Vec::new()));
        let result  = BucketedLoader::<TestBackend>::new(
            dataset, 4, 0, TranslationBatcher::new(Default::default()), 2,
        );
        assert!(matches!(result, Err(DataError::NoData)));
    }
}
