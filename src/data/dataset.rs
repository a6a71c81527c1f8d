// ============================================================
// Layer 4 - Translation Dataset
// ============================================================
// One preprocessed partition behind Burn's Dataset trait.
// The bucketed loader reads it by index from its prefetch
// worker, so it is shared read-only.
//
// Reference: Burn Book §4 (Datasets and Dataloaders)

use burn::data::dataset::Dataset;

use crate::domain::pair::TokenizedPair;

/// One length-sorted partition exposed through Burn's Dataset trait.
///
/// Built once per run from the preprocessor output and never
/// mutated afterwards; the loader shares it with its prefetch
/// worker behind an `Arc`.
pub struct TranslationDataset {
    pairs: Vec<TokenizedPair>,
}

impl TranslationDataset {
    pub fn new(pairs: Vec<TokenizedPair>) -> Self { Self { pairs } }
}

impl Dataset<TokenizedPair> for TranslationDataset {
    fn get(&self, index: usize) -> Option<TokenizedPair> {
        self.pairs.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.pairs.len()
    }
}
