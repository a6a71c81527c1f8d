// ============================================================
// Layer 6 - Infrastructure Layer
// ============================================================
// Everything that touches the run directory on disk:
//
//   checkpoint.rs      - ranked top-N checkpoints (model,
//                        optimizer, counters), the saved
//                        TrainConfig and the best model
//
//   tokenizer_store.rs - trains a word-level or BPE tokenizer
//                        on the corpus, or loads a pretrained
//                        one, and saves it with the run
//
//   metrics.rs         - step-indexed scalar CSV and the
//                        tracked example table
//
// Reference: Rust Book §7 (Modules)
//            Rust Book §9 (Error Handling with anyhow)
//            Burn Book §5 (Checkpointing)

/// Checkpoint retention and run artefacts
pub mod checkpoint;

/// Tokenizer training, saving, and loading
pub mod tokenizer_store;

/// File-backed metrics sink
pub mod metrics;
