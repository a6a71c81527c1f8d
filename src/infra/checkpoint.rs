// ============================================================
// Layer 6 - Checkpoint Saver
// ============================================================
// Everything the run directory holds besides metrics:
//
//   runs/<run_name>/
//     checkpoint_epoch_3.bin   ← model + optimizer + counters
//     checkpoint_epoch_5.bin
//     checkpoints.json         ← retained set, best first
//     train_config.json        ← hyperparameters + tokenizer path
//     best_model.mpk           ← lowest-loss weights (CompactRecorder)
//
// A checkpoint is ONE file: a bincode envelope holding the
// epoch, loss, step counters and the burn byte records of the
// model and the optimizer. It is written to a temporary file
// and renamed, so a crash never leaves a half-written file in
// the index.
//
// Retention keeps the `top_n` best checkpoints by loss (lower
// is better when `decreasing`); the rest are deleted on every
// save. Equal losses keep the earlier checkpoint ahead.
//
// Reference: Burn Book §5 (Records and Checkpointing)
//            Rust Book §9 (Error Handling)

use anyhow::{Context, Result};
use burn::{
    optim::Optimizer,
    prelude::*,
    record::{BinBytesRecorder, CompactRecorder, FullPrecisionSettings, Recorder},
    tensor::backend::AutodiffBackend,
};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
};

use crate::application::train_use_case::TrainConfig;
use crate::ml::model::TranslationModel;
use crate::ml::state::StepCounters;

pub const INDEX_FILE:      &str = "checkpoints.json";
pub const CONFIG_FILE:     &str = "train_config.json";
/// CompactRecorder appends `RECORD_EXTENSION`
pub const BEST_MODEL_FILE: &str = "best_model";
/// Extension of CompactRecorder (named MessagePack) files
pub const RECORD_EXTENSION: &str = "mpk";

type BytesRecorder = BinBytesRecorder<FullPrecisionSettings>;

// ─── CheckpointRecord ─────────────────────────────────────────────────────────
/// Everything needed to continue training from the end of an epoch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckpointRecord {
    pub epoch:     usize,
    pub loss:      f64,
    pub counters:  StepCounters,
    /// burn record bytes of the model parameters
    pub model:     Vec<u8>,
    /// burn record bytes of the optimizer state
    pub optimizer: Vec<u8>,
}

impl CheckpointRecord {
    pub fn capture<B, O>(
        model:    &TranslationModel<B>,
        optim:    &O,
        epoch:    usize,
        loss:     f64,
        counters: StepCounters,
    ) -> Result<Self>
    where
        B: AutodiffBackend,
        O: Optimizer<TranslationModel<B>, B>,
    {
        let recorder = BytesRecorder::default();
        let model_bytes = recorder
            .record(model.clone().into_record(), ())
            .context("Failed to serialise model parameters")?;
        let optim_bytes = recorder
            .record(optim.to_record(), ())
            .context("Failed to serialise optimizer state")?;

        Ok(Self { epoch, loss, counters, model: model_bytes, optimizer: optim_bytes })
    }

    /// Load the stored parameters and optimizer state into freshly built ones.
    pub fn restore<B, O>(
        self,
        model:  TranslationModel<B>,
        optim:  O,
        device: &B::Device,
    ) -> Result<(TranslationModel<B>, O)>
    where
        B: AutodiffBackend,
        O: Optimizer<TranslationModel<B>, B>,
    {
        let recorder = BytesRecorder::default();
        let model_record = recorder
            .load(self.model, device)
            .context("Checkpoint model record does not match the model architecture")?;
        let optim_record = recorder
            .load(self.optimizer, device)
            .context("Checkpoint optimizer record is unreadable")?;

        Ok((model.load_record(model_record), optim.load_record(optim_record)))
    }
}

/// One retained checkpoint in the ranked index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckpointEntry {
    pub epoch: usize,
    pub loss:  f64,
    pub file:  String,
}

// ─── CheckpointSaver ──────────────────────────────────────────────────────────
pub struct CheckpointSaver {
    dir:        PathBuf,
    top_n:      usize,
    /// Lower loss ranks higher when true
    decreasing: bool,
    /// Ranked best first
    entries:    Vec<CheckpointEntry>,
}

impl CheckpointSaver {
    /// Open (or create) a run directory, picking up an existing index.
    pub fn new(dir: impl Into<PathBuf>, top_n: usize, decreasing: bool) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .with_context(|| format!("Cannot create run directory '{}'", dir.display()))?;

        let index_path = dir.join(INDEX_FILE);
        let entries = if index_path.exists() {
            let json = fs::read_to_string(&index_path)
                .with_context(|| format!("Cannot read '{}'", index_path.display()))?;
            serde_json::from_str(&json)
                .with_context(|| format!("Corrupt checkpoint index '{}'", index_path.display()))?
        } else {
            Vec::new()
        };

        Ok(Self { dir, top_n: top_n.max(1), decreasing, entries })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Retained checkpoints, best first.
    pub fn entries(&self) -> &[CheckpointEntry] {
        &self.entries
    }

    /// Persist `record` and update the retained set.
    ///
    /// Returns false when the new checkpoint did not make the top N
    /// (its file is removed again).
    pub fn save(&mut self, record: &CheckpointRecord) -> Result<bool> {
        let file = format!("checkpoint_epoch_{}.bin", record.epoch);
        let path = self.dir.join(&file);

        let bytes = bincode::serialize(record).context("Failed to encode checkpoint")?;
        write_atomic(&path, &bytes)?;

        // Saving the same epoch again replaces its entry
        self.entries.retain(|e| e.epoch != record.epoch);

        let position = self
            .entries
            .iter()
            .position(|e| self.ranks_before(record.loss, e.loss))
            .unwrap_or(self.entries.len());
        self.entries.insert(position, CheckpointEntry { epoch: record.epoch, loss: record.loss, file });

        let evicted = if self.entries.len() > self.top_n {
            self.entries.split_off(self.top_n)
        } else {
            Vec::new()
        };
        for entry in &evicted {
            remove_if_present(&self.dir.join(&entry.file))?;
            tracing::debug!("Evicted checkpoint for epoch {} (loss {:.4})", entry.epoch, entry.loss);
        }

        self.write_index()?;
        Ok(position < self.top_n)
    }

    /// Most recent retained checkpoint.
    pub fn latest(&self) -> Option<&CheckpointEntry> {
        self.entries.iter().max_by_key(|e| e.epoch)
    }

    pub fn load(&self, entry: &CheckpointEntry) -> Result<CheckpointRecord> {
        let path  = self.dir.join(&entry.file);
        let bytes = fs::read(&path)
            .with_context(|| format!("Cannot read checkpoint '{}'", path.display()))?;
        bincode::deserialize(&bytes)
            .with_context(|| format!("Corrupt checkpoint '{}'", path.display()))
    }

    /// Strictly better only, so ties keep the existing entry ahead.
    fn ranks_before(&self, new_loss: f64, existing: f64) -> bool {
        if self.decreasing {
            new_loss < existing
        } else {
            new_loss > existing
        }
    }

    fn write_index(&self) -> Result<()> {
        let json = serde_json::to_string_pretty(&self.entries)?;
        write_atomic(&self.dir.join(INDEX_FILE), json.as_bytes())
    }

    // ─── Run artefacts ────────────────────────────────────────────────────────

    pub fn save_config(&self, cfg: &TrainConfig) -> Result<()> {
        let path = self.dir.join(CONFIG_FILE);
        let json = serde_json::to_string_pretty(cfg)?;
        fs::write(&path, json)
            .with_context(|| format!("Cannot write config to '{}'", path.display()))?;
        tracing::debug!("Saved training config to '{}'", path.display());
        Ok(())
    }

    pub fn load_config(&self) -> Result<TrainConfig> {
        let path = self.dir.join(CONFIG_FILE);
        let json = fs::read_to_string(&path).with_context(|| {
            format!(
                "Cannot read config from '{}'. Make sure you have run 'train' first.",
                path.display()
            )
        })?;
        Ok(serde_json::from_str(&json)?)
    }

    /// File the best weights end up in once the recorder adds its extension.
    pub fn best_model_path(&self) -> PathBuf {
        self.dir.join(BEST_MODEL_FILE).with_extension(RECORD_EXTENSION)
    }

    /// Write the best weights with burn's CompactRecorder.
    pub fn save_best_model<B: Backend>(&self, model: &TranslationModel<B>) -> Result<()> {
        let path = self.dir.join(BEST_MODEL_FILE);
        CompactRecorder::new()
            .record(model.clone().into_record(), path.clone())
            .with_context(|| format!("Failed to save best model to '{}'", path.display()))?;
        Ok(())
    }

    pub fn load_best_model<B: Backend>(
        &self,
        model:  TranslationModel<B>,
        device: &B::Device,
    ) -> Result<TranslationModel<B>> {
        let path   = self.dir.join(BEST_MODEL_FILE);
        let record = CompactRecorder::new()
            .load(path.clone(), device)
            .with_context(|| {
                format!("Cannot load '{}'. Has training finished an epoch?", path.display())
            })?;
        Ok(model.load_record(record))
    }
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let tmp = path.with_extension("tmp");
    fs::write(&tmp, bytes).with_context(|| format!("Cannot write '{}'", tmp.display()))?;
    fs::rename(&tmp, path)
        .with_context(|| format!("Cannot move '{}' into place", path.display()))?;
    Ok(())
}

fn remove_if_present(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e).with_context(|| format!("Cannot delete '{}'", path.display())),
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::model::TranslationModelConfig;
    use burn::{
        backend::{Autodiff, NdArray},
        optim::AdamConfig,
    };

    fn record(epoch: usize, loss: f64) -> CheckpointRecord {
        CheckpointRecord {
            epoch,
            loss,
            counters:  StepCounters { training_step: epoch * 10, global_step: epoch * 12 },
            model:     vec![epoch as u8; 4],
            optimizer: Vec::new(),
        }
    }

    fn files_on_disk(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(dir)
            .unwrap()
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .filter(|n| n.ends_with(".bin"))
            .collect();
        names.sort();
        names
    }

    #[test]
    fn test_keeps_top_n_lowest_losses() {
        let dir       = tempfile::tempdir().unwrap();
        let mut saver = CheckpointSaver::new(dir.path(), 2, true).unwrap();

        for (epoch, loss) in [(1, 3.0), (2, 1.0), (3, 2.0), (4, 0.5)] {
            saver.save(&record(epoch, loss)).unwrap();
        }

        let losses: Vec<f64> = saver.entries().iter().map(|e| e.loss).collect();
        assert_eq!(losses, vec![0.5, 1.0]);
        assert_eq!(
            files_on_disk(dir.path()),
            vec!["checkpoint_epoch_2.bin", "checkpoint_epoch_4.bin"]
        );
    }

    #[test]
    fn test_increasing_mode_keeps_highest() {
        let dir       = tempfile::tempdir().unwrap();
        let mut saver = CheckpointSaver::new(dir.path(), 2, false).unwrap();
        for (epoch, score) in [(1, 3.0), (2, 1.0), (3, 2.0)] {
            saver.save(&record(epoch, score)).unwrap();
        }
        let epochs: Vec<usize> = saver.entries().iter().map(|e| e.epoch).collect();
        assert_eq!(epochs, vec![1, 3]);
    }

    #[test]
    fn test_tie_keeps_earlier_entry() {
        let dir       = tempfile::tempdir().unwrap();
        let mut saver = CheckpointSaver::new(dir.path(), 1, true).unwrap();
        assert!(saver.save(&record(1, 1.0)).unwrap());
        assert!(!saver.save(&record(2, 1.0)).unwrap());
        assert_eq!(saver.entries()[0].epoch, 1);
        assert_eq!(files_on_disk(dir.path()), vec!["checkpoint_epoch_1.bin"]);
    }

    #[test]
    fn test_repeated_saves_stay_bounded() {
        let dir       = tempfile::tempdir().unwrap();
        let mut saver = CheckpointSaver::new(dir.path(), 3, true).unwrap();
        for _ in 0..5 {
            saver.save(&record(7, 1.0)).unwrap();
        }
        for epoch in 1..=6 {
            saver.save(&record(epoch, 1.0)).unwrap();
        }
        assert_eq!(saver.entries().len(), 3);
        assert_eq!(files_on_disk(dir.path()).len(), 3);
    }

    #[test]
    fn test_index_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let mut saver = CheckpointSaver::new(dir.path(), 5, true).unwrap();
            saver.save(&record(1, 2.0)).unwrap();
            saver.save(&record(2, 1.5)).unwrap();
        }

        let saver  = CheckpointSaver::new(dir.path(), 5, true).unwrap();
        let latest = saver.latest().unwrap().clone();
        assert_eq!(latest.epoch, 2);

        let loaded = saver.load(&latest).unwrap();
        assert_eq!(loaded.counters, StepCounters { training_step: 20, global_step: 24 });
        assert_eq!(loaded.model, vec![2u8; 4]);
    }

    #[test]
    fn test_no_temporary_files_left() {
        let dir       = tempfile::tempdir().unwrap();
        let mut saver = CheckpointSaver::new(dir.path(), 2, true).unwrap();
        saver.save(&record(1, 1.0)).unwrap();

        let leftovers = fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.path().extension().is_some_and(|x| x == "tmp"))
            .count();
        assert_eq!(leftovers, 0);
    }

    #[test]
    fn test_best_model_file_name() {
        type B = NdArray;
        let dir   = tempfile::tempdir().unwrap();
        let saver = CheckpointSaver::new(dir.path(), 1, true).unwrap();
        let model: TranslationModel<B> =
            TranslationModelConfig::new(16, 8, 8, 2, 1, 16, 0.0).init(&Default::default());

        saver.save_best_model(&model).unwrap();
        assert_eq!(saver.best_model_path(), dir.path().join("best_model.mpk"));
        assert!(saver.best_model_path().exists());
        assert!(saver.load_best_model(model, &Default::default()).is_ok());
    }

    #[test]
    fn test_model_and_optimizer_restore() {
        type B = Autodiff<NdArray>;
        let device = Default::default();
        let config = TranslationModelConfig::new(16, 8, 8, 2, 1, 16, 0.0);

        let model: TranslationModel<B> = config.init(&device);
        let optim = AdamConfig::new().init::<B, TranslationModel<B>>();
        let saved = CheckpointRecord::capture(
            &model, &optim, 3, 1.25, StepCounters { training_step: 9, global_step: 14 },
        )
        .unwrap();

        let fresh: TranslationModel<B> = config.init(&device);
        let fresh_optim = AdamConfig::new().init::<B, TranslationModel<B>>();
        let (restored, _) = saved.restore(fresh, fresh_optim, &device).unwrap();

        restored
            .output
            .weight
            .val()
            .to_data()
            .assert_eq(&model.output.weight.val().to_data(), true);
    }
}
