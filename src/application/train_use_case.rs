// ============================================================
// Layer 2 - TrainUseCase
// ============================================================
// Orchestrates the full training pipeline in order:
//
//   Step 1: Load + shuffle + subset the corpus   (Layer 4 - data)
//   Step 2: Train or load the tokenizer          (Layer 6 - infra)
//   Step 3: Tokenize, filter, split, sort        (Layer 4 - data)
//   Step 4: Open the run directory, save config  (Layer 6 - infra)
//   Step 5: Run the learner                      (Layer 5 - ml)
//
// Every setup failure (corpus too small, empty partition,
// bad configuration) surfaces here, before the first epoch.
//
// Reference: Rust Book §13 (Iterators and Closures)
//            Burn Book §5 (Training)

use anyhow::Result;
use rand::{rngs::StdRng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::data::{
    corpus::prepare_corpus,
    loader::ParallelTextLoader,
    preprocessor::preprocess_pairs,
};
use crate::domain::errors::DataError;
use crate::domain::traits::TextCodec;
use crate::infra::{
    checkpoint::CheckpointSaver,
    metrics::CsvMetrics,
    tokenizer_store::{TokenizerKind, TokenizerStore},
};
use crate::ml::trainer::run_training;

// ─── Training Configuration ──────────────────────────────────────────────────
// All settings for a training run. Saved as train_config.json in
// the run directory so `translate` can rebuild the same model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainConfig {
    // corpus
    pub corpus_dir:      String,
    pub src_lang:        String,
    pub trg_lang:        String,
    pub split:           String,
    pub dataset_size:    usize,
    pub seed:            u64,

    // tokenizer
    pub tokenizer:            TokenizerKind,
    pub vocab_size:           usize,
    /// Relative paths live inside the run directory
    pub tokenizer_save_path:  String,
    pub pretrained_tokenizer: Option<String>,

    // batching
    pub test_proportion: f64,
    pub batch_size:      usize,
    pub max_len:         usize,
    pub prefetch:        usize,

    // optimisation
    pub epochs:                  usize,
    pub start_epoch:             usize,
    pub lr:                      f64,
    pub warmup_steps:            Option<usize>,
    pub grad_accumulation_steps: usize,

    // model
    pub d_model:    usize,
    pub num_heads:  usize,
    pub num_layers: usize,
    pub d_ff:       usize,
    pub dropout:    f64,

    // run bookkeeping
    pub output_dir:   String,
    pub run_name:     String,
    pub save_every:   usize,
    pub top_n:        usize,
    pub num_examples: usize,
    pub resume:       bool,
    pub no_progress:  bool,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            corpus_dir:   "data/iwslt15".to_string(),
            src_lang:     "en".to_string(),
            trg_lang:     "vi".to_string(),
            split:        "train".to_string(),
            dataset_size: 100_000,
            seed:         42,

            tokenizer:            TokenizerKind::Bpe,
            vocab_size:           16_000,
            tokenizer_save_path:  "tokenizer.json".to_string(),
            pretrained_tokenizer: None,

            test_proportion: 0.1,
            batch_size:      64,
            max_len:         64,
            prefetch:        2,

            epochs:                  10,
            start_epoch:             1,
            lr:                      1e-4,
            warmup_steps:            None,
            grad_accumulation_steps: 1,

            d_model:    256,
            num_heads:  8,
            num_layers: 3,
            d_ff:       1024,
            dropout:    0.1,

            output_dir:   "runs".to_string(),
            run_name:     "default".to_string(),
            save_every:   1,
            top_n:        5,
            num_examples: 2,
            resume:       false,
            no_progress:  false,
        }
    }
}

impl TrainConfig {
    /// `<output_dir>/<run_name>`
    pub fn run_dir(&self) -> PathBuf {
        Path::new(&self.output_dir).join(&self.run_name)
    }

    /// Where the tokenizer JSON is kept for a given run directory.
    pub fn tokenizer_path_in(&self, run_dir: &Path) -> PathBuf {
        let path = Path::new(&self.tokenizer_save_path);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            run_dir.join(path)
        }
    }

    /// Reject settings that would only fail later, mid-run.
    pub fn validate(&self) -> Result<(), DataError> {
        let invalid = |msg: String| Err(DataError::InvalidConfig(msg));

        if self.batch_size == 0 {
            return invalid("batch_size must be at least 1".into());
        }
        if self.max_len < 3 {
            return invalid(format!("max_len must leave room for [BOS], [EOS] and one token, got {}", self.max_len));
        }
        if self.grad_accumulation_steps == 0 {
            return invalid("grad_accumulation_steps must be at least 1".into());
        }
        if self.save_every == 0 {
            return invalid("save_every must be at least 1".into());
        }
        if self.top_n == 0 {
            return invalid("top_n must be at least 1".into());
        }
        if self.num_heads == 0 || self.d_model % self.num_heads != 0 {
            return invalid(format!(
                "d_model ({}) must be divisible by num_heads ({})",
                self.d_model, self.num_heads
            ));
        }
        if !(0.0..1.0).contains(&self.dropout) {
            return invalid(format!("dropout must be in [0, 1), got {}", self.dropout));
        }
        if !(self.test_proportion > 0.0 && self.test_proportion < 1.0) {
            return invalid(format!("test_proportion must be in (0, 1), got {}", self.test_proportion));
        }
        Ok(())
    }
}

// ─── TrainUseCase ─────────────────────────────────────────────────────────────
pub struct TrainUseCase {
    config: TrainConfig,
}

impl TrainUseCase {
    pub fn new(config: TrainConfig) -> Self {
        Self { config }
    }

    /// Execute the full training pipeline end to end
    pub fn execute(&self) -> Result<()> {
        let cfg = &self.config;
        cfg.validate()?;
        let run_dir = cfg.run_dir();

        // ── Step 1: Prepare the corpus ────────────────────────────────────────
        tracing::info!(
            "Loading '{}' split ({} → {}) from '{}'",
            cfg.split, cfg.src_lang, cfg.trg_lang, cfg.corpus_dir
        );
        let source = ParallelTextLoader::new(&cfg.corpus_dir, &cfg.src_lang, &cfg.trg_lang);
        let pairs  = prepare_corpus(&source, &cfg.split, cfg.dataset_size, cfg.seed)?;

        // ── Step 2: Tokenizer ─────────────────────────────────────────────────
        // One shared vocabulary for both languages
        let texts: Vec<String> = pairs
            .iter()
            .flat_map(|p| [p.source.clone(), p.target.clone()])
            .collect();
        let store     = TokenizerStore::new(cfg.tokenizer_path_in(&run_dir));
        let pretrained = cfg.pretrained_tokenizer.as_deref().map(Path::new);
        let tokenizer = store.load_or_train(pretrained, cfg.tokenizer, &texts, cfg.vocab_size)?;
        if pretrained.is_some() {
            // keep a copy next to the run so `translate` finds it
            tokenizer.save(store.path())?;
        }

        // ── Step 3: Tokenize, filter, split, sort ─────────────────────────────
        let mut rng    = StdRng::seed_from_u64(cfg.seed);
        let partitions = preprocess_pairs(
            &pairs, &tokenizer, cfg.max_len, cfg.test_proportion, &mut rng,
        )?;

        // ── Step 4: Run directory ─────────────────────────────────────────────
        let checkpoints = CheckpointSaver::new(&run_dir, cfg.top_n, true)?;
        checkpoints.save_config(cfg)?;
        let mut metrics = CsvMetrics::new(&run_dir)?;

        // ── Step 5: Train ─────────────────────────────────────────────────────
        run_training(cfg, partitions, &tokenizer, checkpoints, &mut metrics)?;

        tracing::info!("Run artefacts in '{}'", run_dir.display());
        Ok(())
    }
}
