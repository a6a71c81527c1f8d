// ============================================================
// Layer 4 - Padding Collator
// ============================================================
// Implements Burn's Batcher trait to turn one bucket of
// variable-length examples into two rectangular tensors.
//
// Source and target are padded independently, each to the
// longest sequence of its own side within THIS batch:
//
//   source ids            padded source [3, 5]
//   [2, 7, 3]         →   [2, 7, 3, 0, 0]
//   [2, 8, 9, 4, 3]   →   [2, 8, 9, 4, 3]
//   [2, 3]            →   [2, 3, 0, 0, 0]
//
// Because the sampler groups similar lengths together, the
// amount of padding per batch stays small. Nothing is ever
// truncated and no state is carried between batches.
//
// Reference: Burn Book §4 (Batcher)
//            Rust Book §8 (Vectors)

use burn::{
    data::dataloader::batcher::Batcher,
    prelude::*,
};

use crate::domain::pair::TokenizedPair;

/// Reserved padding id shared by the tokenizer, collator and loss.
pub const PAD_ID: u32 = 0;

// ─── TranslationBatch ─────────────────────────────────────────────────────────
/// A padded batch ready for the model forward pass.
#[derive(Debug, Clone)]
pub struct TranslationBatch<B: Backend> {
    /// Encoder input, shape [batch_size, local_max_src]
    pub source: Tensor<B, 2, Int>,

    /// Decoder sequence (BOS ... EOS), shape [batch_size, local_max_trg]
    pub target: Tensor<B, 2, Int>,
}

// ─── TranslationBatcher ───────────────────────────────────────────────────────
/// Holds the target device so tensors are created in the right place.
#[derive(Clone, Debug)]
pub struct TranslationBatcher<B: Backend> {
    pub device: B::Device,
}

impl<B: Backend> TranslationBatcher<B> {
    pub fn new(device: B::Device) -> Self {
        Self { device }
    }
}

impl<B: Backend> Batcher<TokenizedPair, TranslationBatch<B>> for TranslationBatcher<B> {
    fn batch(&self, items: Vec<TokenizedPair>) -> TranslationBatch<B> {
        let batch_size = items.len();

        let sources: Vec<&[u32]> = items.iter().map(|p| p.source_ids.as_slice()).collect();
        let targets: Vec<&[u32]> = items.iter().map(|p| p.target_ids.as_slice()).collect();

        let (source_flat, src_len) = pad_sequences(&sources, PAD_ID);
        let (target_flat, trg_len) = pad_sequences(&targets, PAD_ID);

        let source = Tensor::<B, 1, Int>::from_ints(
            source_flat.as_slice(), &self.device
        ).reshape([batch_size, src_len]);

        let target = Tensor::<B, 1, Int>::from_ints(
            target_flat.as_slice(), &self.device
        ).reshape([batch_size, trg_len]);

        TranslationBatch { source, target }
    }
}

/// Right-pad every sequence to the longest one, row-major.
///
/// Returns the flat buffer and the padded row length.
pub fn pad_sequences(sequences: &[&[u32]], pad_id: u32) -> (Vec<i32>, usize) {
    let max_len  = sequences.iter().map(|s| s.len()).max().unwrap_or(0);
    let mut flat = Vec::with_capacity(sequences.len() * max_len);

    for seq in sequences {
        flat.extend(seq.iter().map(|&id| id as i32));
        flat.extend(std::iter::repeat(pad_id as i32).take(max_len - seq.len()));
    }

    (flat, max_len)
}
