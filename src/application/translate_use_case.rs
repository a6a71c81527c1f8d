// ============================================================
// Layer 2 - Translate Use Case
// ============================================================
// Loads a finished run directory and translates sentences:
//   1. Read train_config.json
//   2. Load the tokenizer the run saved
//   3. Rebuild the model and load best_model.mpk
//
// Reference: Rust Book §9 (Error Handling)

use anyhow::Result;
use std::path::Path;

use crate::data::normalize::SentenceNormalizer;
use crate::infra::{checkpoint::CheckpointSaver, tokenizer_store::TranslationTokenizer};
use crate::ml::inferencer::{InferBackend, Inferencer};

pub struct TranslateUseCase {
    tokenizer:  TranslationTokenizer,
    inferencer: Inferencer<InferBackend>,
}

impl TranslateUseCase {
    pub fn new(run_dir: impl AsRef<Path>) -> Result<Self> {
        let run_dir     = run_dir.as_ref();
        let checkpoints = CheckpointSaver::new(run_dir, 1, true)?;
        let cfg         = checkpoints.load_config()?;
        let tokenizer   = TranslationTokenizer::from_file(&cfg.tokenizer_path_in(run_dir))?;

        let device     = burn::backend::wgpu::WgpuDevice::default();
        let inferencer = Inferencer::from_run(&checkpoints, &cfg, &tokenizer, &device)?;
        Ok(Self { tokenizer, inferencer })
    }

    pub fn translate(&self, text: &str) -> Result<String> {
        let text = SentenceNormalizer::new().normalize(text);
        self.inferencer.translate(&text, &self.tokenizer)
    }
}
