// ============================================================
// Layer 5 - Inferencer
// ============================================================
// Rebuilds the architecture from train_config.json, loads the
// best weights and translates with greedy decoding.
//
// The model is built with dropout 0 on a plain (non-autodiff)
// backend, so no gradients are ever tracked here.
//
// Reference: Burn Book §5 (Records and Checkpointing)

use anyhow::Result;
use burn::prelude::*;

use crate::application::train_use_case::TrainConfig;
use crate::domain::traits::TextCodec;
use crate::infra::checkpoint::CheckpointSaver;
use crate::ml::model::TranslationModel;
use crate::ml::trainer::model_config;

pub type InferBackend = burn::backend::Wgpu;

pub struct Inferencer<B: Backend> {
    model: TranslationModel<B>,
}

impl<B: Backend> Inferencer<B> {
    pub fn from_run(
        checkpoints: &CheckpointSaver,
        cfg:         &TrainConfig,
        codec:       &dyn TextCodec,
        device:      &B::Device,
    ) -> Result<Self> {
        // dropout is irrelevant at inference time
        let mut model_cfg = model_config(cfg, codec);
        model_cfg.dropout = 0.0;
        let model: TranslationModel<B> = model_cfg.init(device);
        let model = checkpoints.load_best_model(model, device)?;
        tracing::info!("Best model loaded from '{}'", checkpoints.dir().display());
        Ok(Self { model })
    }

    pub fn translate(&self, text: &str, codec: &dyn TextCodec) -> Result<String> {
        self.model.translate(text, codec)
    }
}
