// ============================================================
// Layer 5 - Training Setup
// ============================================================
// Builds everything the learner needs from a TrainConfig and
// the preprocessed partitions, then hands over to Learner::fit.
//
// Backends:
//   - Training uses TrainBackend (Autodiff<Wgpu>) for gradients
//   - model.valid() returns the model on the inner backend (Wgpu)
//   - The validation loader therefore batches on the inner backend
//
// Resuming picks the most recent retained checkpoint, restores
// model + optimizer + step counters and continues at the next
// epoch.
//
// Reference: Burn Book §5, Kingma & Ba (2015) Adam

use anyhow::Result;
use burn::{optim::AdamConfig, tensor::backend::AutodiffBackend};
use std::sync::Arc;

use crate::application::train_use_case::TrainConfig;
use crate::data::{
    batcher::TranslationBatcher,
    dataloader::BucketedLoader,
    dataset::TranslationDataset,
    preprocessor::Partitions,
};
use crate::domain::traits::{MetricsSink, TextCodec};
use crate::infra::checkpoint::CheckpointSaver;
use crate::ml::learner::{Learner, LearnerConfig};
use crate::ml::model::{TranslationModel, TranslationModelConfig};
use crate::ml::schedule::LearningRateSchedule;
use crate::ml::state::TrainingState;

type TrainBackend = burn::backend::Autodiff<burn::backend::Wgpu>;

pub fn run_training(
    cfg:         &TrainConfig,
    partitions:  Partitions,
    codec:       &dyn TextCodec,
    checkpoints: CheckpointSaver,
    metrics:     &mut dyn MetricsSink,
) -> Result<()> {
    let device = burn::backend::wgpu::WgpuDevice::default();
    tracing::info!("Using WGPU device: {:?}", device);
    train_loop::<TrainBackend>(cfg, partitions, codec, checkpoints, metrics, device)
}

/// Model hyperparameters derived from the run config and the tokenizer.
pub fn model_config(cfg: &TrainConfig, codec: &dyn TextCodec) -> TranslationModelConfig {
    let specials = codec.specials();
    TranslationModelConfig::new(
        codec.vocab_size(),
        cfg.max_len,
        cfg.d_model,
        cfg.num_heads,
        cfg.num_layers,
        cfg.d_ff,
        cfg.dropout,
    )
    .with_pad_id(specials.pad as usize)
    .with_bos_id(specials.bos as usize)
    .with_eos_id(specials.eos as usize)
}

pub fn train_loop<B: AutodiffBackend>(
    cfg:         &TrainConfig,
    partitions:  Partitions,
    codec:       &dyn TextCodec,
    checkpoints: CheckpointSaver,
    metrics:     &mut dyn MetricsSink,
    device:      B::Device,
) -> Result<()> {
    // ── Loaders ───────────────────────────────────────────────────────────────
    let train_set = Arc::new(TranslationDataset::new(partitions.train));
    let valid_set = Arc::new(TranslationDataset::new(partitions.test));

    let train_loader = BucketedLoader::<B>::new(
        train_set,
        cfg.batch_size,
        cfg.seed,
        TranslationBatcher::new(device.clone()),
        cfg.prefetch,
    )?;
    let valid_loader = BucketedLoader::<B::InnerBackend>::new(
        valid_set,
        cfg.batch_size,
        cfg.seed.wrapping_add(1),
        TranslationBatcher::new(device.clone()),
        cfg.prefetch,
    )?;
    tracing::info!(
        "Batches per epoch: {} train, {} validation",
        train_loader.num_batches(),
        valid_loader.num_batches()
    );

    // ── Model + Adam ──────────────────────────────────────────────────────────
    // m = β1*m + (1-β1)*g        (mean)
    // v = β2*v + (1-β2)*g²       (variance)
    // θ = θ - lr * m / (√v + ε)  (update)
    let model: TranslationModel<B> = model_config(cfg, codec).init(&device);
    let optim = AdamConfig::new()
        .with_beta_2(0.98)
        .with_epsilon(1e-8)
        .init::<B, TranslationModel<B>>();
    let mut schedule = LearningRateSchedule::new(cfg.lr, cfg.warmup_steps, cfg.d_model);
    tracing::info!(
        "Model ready: {} layers, d_model={}, vocab={}",
        cfg.num_layers, cfg.d_model, codec.vocab_size()
    );

    // ── Resume ────────────────────────────────────────────────────────────────
    let mut start_epoch = cfg.start_epoch;
    let mut state       = TrainingState::default();
    let (model, optim) = match checkpoints.latest().filter(|_| cfg.resume).cloned() {
        Some(entry) => {
            let record = checkpoints.load(&entry)?;
            tracing::info!(
                "Resuming after epoch {} (training_step={}, global_step={})",
                record.epoch, record.counters.training_step, record.counters.global_step
            );
            start_epoch = record.epoch + 1;
            state       = TrainingState::resume(record.counters);
            schedule.fast_forward(
                record.counters.training_step.saturating_sub(1) / cfg.grad_accumulation_steps,
            );
            record.restore(model, optim, &device)?
        }
        None => {
            if cfg.resume {
                tracing::warn!("--resume given but no checkpoint found; starting fresh");
            }
            (model, optim)
        }
    };

    // ── Fit ───────────────────────────────────────────────────────────────────
    let mut learner = Learner::new(
        LearnerConfig {
            grad_accumulation_steps: cfg.grad_accumulation_steps,
            save_every:              cfg.save_every,
            num_examples:            cfg.num_examples,
            show_progress:           !cfg.no_progress,
        },
        model,
        optim,
        schedule,
        codec,
        train_loader,
        valid_loader,
        checkpoints,
        metrics,
    )
    .with_state(state);

    learner.fit(start_epoch, cfg.epochs)?;
    tracing::info!("Training complete!");
    Ok(())
}
