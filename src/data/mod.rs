// ============================================================
// Layer 4 - Data Pipeline
// ============================================================
// Everything from raw parallel text files to padded tensor
// batches in length-bucketed order.
//
//   <split>.en / <split>.vi
//       │
//       ▼
//   ParallelTextLoader  → reads aligned lines into pairs
//       │
//       ▼
//   prepare_corpus      → seeded shuffle, take N, normalise text
//       │
//       ▼
//   preprocess_pairs    → tokenize, length filter, split, sort
//       │
//       ▼
//   TranslationDataset  → implements Burn's Dataset trait
//       │
//       ▼
//   BucketSampler       → contiguous chunks, shuffled chunk order
//       │
//       ▼
//   TranslationBatcher  → pads each batch to its own max length
//       │
//       ▼
//   BucketedLoader      → prefetching iterator fed to the learner
//
// Reference: Burn Book §4 (Datasets and Dataloaders)
//            Rust Book §13 (Iterators and Closures)

/// Reads line-aligned parallel corpus files
pub mod loader;

/// Cleans individual sentences
pub mod normalize;

/// Deterministic shuffle + subset selection
pub mod corpus;

/// Random train/test split
pub mod splitter;

/// Tokenization, length filtering, splitting, sorting
pub mod preprocessor;

/// Implements Burn's Dataset trait for tokenized pairs
pub mod dataset;

/// Length-bucketed batch index sampler
pub mod sampler;

/// Implements Burn's Batcher trait with per-batch padding
pub mod batcher;

/// Prefetching loader driven by the bucket sampler
pub mod dataloader;
