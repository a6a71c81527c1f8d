// ============================================================
// Layer 5 - Training State
// ============================================================
// The counters and best-model bookkeeping that survive across
// epochs (and, for the counters, across restarts).
//
// Every transition takes the state by value and hands back the
// next one, so the learner threads a single value through the
// epoch loop:
//
//   Validating  ── after_validation_batch ──► global_step + 1
//               ── after_summary          ──► global_step + 1
//   Training    ── after_training_batch   ──► global_step + 1
//                                              training_step + 1
//                                              (+ "step now?" flag)
//               ── after_summary          ──► global_step + 1
//               ── observe_epoch_loss     ──► maybe new best
//
// Reference: Rust Book §5 (Method Syntax)

use serde::{Deserialize, Serialize};

/// Step counters. Both start at 1 and never go down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepCounters {
    /// Training batches seen; drives gradient accumulation
    pub training_step: usize,
    /// Step index for every emitted metrics record
    pub global_step:   usize,
}

impl Default for StepCounters {
    fn default() -> Self {
        Self { training_step: 1, global_step: 1 }
    }
}

/// The best epoch seen so far together with a snapshot of its parameters.
#[derive(Debug, Clone)]
pub struct BestModel<S> {
    pub epoch:    usize,
    pub loss:     f64,
    pub snapshot: S,
}

/// Everything the learner carries from one epoch to the next.
#[derive(Debug, Clone)]
pub struct TrainingState<S> {
    pub counters: StepCounters,
    pub best:     Option<BestModel<S>>,
}

impl<S> Default for TrainingState<S> {
    fn default() -> Self {
        Self { counters: StepCounters::default(), best: None }
    }
}

impl<S> TrainingState<S> {
    /// Continue from counters restored out of a checkpoint.
    pub fn resume(counters: StepCounters) -> Self {
        Self { counters, best: None }
    }

    pub fn global_step(&self) -> usize {
        self.counters.global_step
    }

    pub fn training_step(&self) -> usize {
        self.counters.training_step
    }

    /// Lowest average training loss so far, `f64::INFINITY` before the first epoch.
    pub fn best_loss(&self) -> f64 {
        self.best.as_ref().map_or(f64::INFINITY, |b| b.loss)
    }

    pub fn best_epoch(&self) -> Option<usize> {
        self.best.as_ref().map(|b| b.epoch)
    }

    pub fn after_validation_batch(mut self) -> Self {
        self.counters.global_step += 1;
        self
    }

    /// Advance past one training batch.
    ///
    /// The returned flag says whether the optimizer should step now; it is
    /// decided on the training step the batch was processed under.
    pub fn after_training_batch(mut self, grad_accumulation_steps: usize) -> (Self, bool) {
        let due = self.counters.training_step % grad_accumulation_steps.max(1) == 0;
        self.counters.global_step   += 1;
        self.counters.training_step += 1;
        (self, due)
    }

    /// A per-phase summary record was emitted.
    pub fn after_summary(mut self) -> Self {
        self.counters.global_step += 1;
        self
    }

    /// Keep `snapshot()` as the new best when `loss` is strictly lower.
    ///
    /// The snapshot closure only runs on improvement. Returns whether the
    /// best model changed.
    pub fn observe_epoch_loss(
        mut self,
        epoch:    usize,
        loss:     f64,
        snapshot: impl FnOnce() -> S,
    ) -> (Self, bool) {
        if loss < self.best_loss() {
            self.best = Some(BestModel { epoch, loss, snapshot: snapshot() });
            (self, true)
        } else {
            (self, false)
        }
    }
}
