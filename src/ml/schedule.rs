// ============================================================
// Layer 5 - Learning Rate Schedule
// ============================================================
// The learner asks for a learning rate once per optimizer step.
//
//   Constant  lr
//   Noam      lr · d_model^-0.5 · min(step^-0.5, step · warmup^-1.5)
//
// Noam rises linearly for `warmup` steps, then decays with the
// inverse square root of the step number.
//
// Reference: Vaswani et al. (2017) §5.3 Optimizer

#[derive(Debug, Clone, PartialEq)]
pub enum LearningRateSchedule {
    Constant(f64),
    Noam {
        base_lr: f64,
        warmup:  usize,
        d_model: usize,
        /// Optimizer steps taken so far
        step:    usize,
    },
}

impl LearningRateSchedule {
    /// Noam schedule when `warmup_steps` is given, a constant rate otherwise.
    pub fn new(base_lr: f64, warmup_steps: Option<usize>, d_model: usize) -> Self {
        match warmup_steps {
            Some(warmup) => Self::Noam { base_lr, warmup: warmup.max(1), d_model, step: 0 },
            None         => Self::Constant(base_lr),
        }
    }

    /// Learning rate for the next optimizer step.
    pub fn next_lr(&mut self) -> f64 {
        match self {
            Self::Constant(lr) => *lr,
            Self::Noam { base_lr, warmup, d_model, step } => {
                *step += 1;
                let s = *step as f64;
                let w = *warmup as f64;
                *base_lr * (*d_model as f64).powf(-0.5) * s.powf(-0.5).min(s * w.powf(-1.5))
            }
        }
    }

    /// Skip ahead after resuming from a checkpoint.
    pub fn fast_forward(&mut self, optimizer_steps: usize) {
        if let Self::Noam { step, .. } = self {
            *step = optimizer_steps;
        }
    }
}
