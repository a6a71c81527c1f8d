// ============================================================
// Layer 5 - ML / Model Layer (Burn)
// ============================================================
// All model, optimisation and evaluation code.
//
//   model.rs      - encoder-decoder transformer, loss, greedy
//                   decoding
//   state.rs      - step counters and best-model tracking,
//                   advanced by pure transitions
//   bleu.rs       - corpus BLEU with smoothing
//   schedule.rs   - constant or warmup learning rate
//   learner.rs    - the epoch loop: examples, validation,
//                   training, checkpoints
//   trainer.rs    - wires config, loaders, model and Adam
//                   into a Learner; handles --resume
//   inferencer.rs - loads the best model of a finished run
//
// Reference: Burn Book §3 (Building Blocks)
//            Burn Book §5 (Training)
//            Vaswani et al. (2017) Attention Is All You Need

/// Encoder-decoder translation transformer
pub mod model;

/// Training counters and best-model snapshot
pub mod state;

/// Corpus-level BLEU
pub mod bleu;

/// Learning-rate schedules
pub mod schedule;

/// Epoch loop
pub mod learner;

/// Training setup and resume
pub mod trainer;

/// Inference from a saved run
pub mod inferencer;
