// ============================================================
// Layer 5 - Learner (Training Orchestrator)
// ============================================================
// Runs the epoch loop. Each epoch walks the same phases:
//
//   TrackingExamples ─► Validating ─► Training ─► (Checkpointing)
//
//   TrackingExamples  model.valid(); first batch of each loader;
//                     greedy translations for `num_examples` rows
//   Validating        model.valid() on the inner backend (no
//                     autodiff, dropout off); loss per batch +
//                     corpus BLEU over the argmax paths
//   Training          forward, backward, accumulate gradients;
//                     optimizer step every `grad_accumulation_steps`
//                     training steps; checkpoint every `save_every`
//                     epochs; keep the lowest-loss snapshot
//
// Every metrics record goes out under the current global step,
// which then advances by one (one per batch, one per summary).
// A failing metrics sink is reported with tracing::warn! and
// training carries on.
//
// Reference: Burn Book §5 (Training)
//            Kingma & Ba (2015) Adam

use anyhow::Result;
use burn::{
    module::AutodiffModule,
    optim::{GradientsAccumulator, GradientsParams, Optimizer},
    prelude::*,
    tensor::backend::AutodiffBackend,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::mem;

use crate::data::dataloader::BucketedLoader;
use crate::domain::pair::{ExampleRow, Split};
use crate::domain::traits::{MetricsSink, TextCodec};
use crate::infra::checkpoint::{CheckpointRecord, CheckpointSaver};
use crate::ml::bleu::corpus_bleu;
use crate::ml::model::TranslationModel;
use crate::ml::schedule::LearningRateSchedule;
use crate::ml::state::TrainingState;

/// Knobs the learner reads every epoch.
#[derive(Debug, Clone)]
pub struct LearnerConfig {
    pub grad_accumulation_steps: usize,
    /// Persist a checkpoint when `epoch % save_every == 0`
    pub save_every:              usize,
    /// Tracked examples per split and epoch
    pub num_examples:            usize,
    pub show_progress:           bool,
}

type Snapshot<B> = TranslationModel<<B as AutodiffBackend>::InnerBackend>;

pub struct Learner<'a, B: AutodiffBackend, O> {
    config:       LearnerConfig,
    model:        TranslationModel<B>,
    optim:        O,
    schedule:     LearningRateSchedule,
    accumulator:  GradientsAccumulator<TranslationModel<B>>,
    codec:        &'a dyn TextCodec,
    train_loader: BucketedLoader<B>,
    valid_loader: BucketedLoader<B::InnerBackend>,
    checkpoints:  CheckpointSaver,
    metrics:      &'a mut dyn MetricsSink,
    state:        TrainingState<Snapshot<B>>,
    examples:     Vec<ExampleRow>,
}

impl<'a, B, O> Learner<'a, B, O>
where
    B: AutodiffBackend,
    O: Optimizer<TranslationModel<B>, B>,
{
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config:       LearnerConfig,
        model:        TranslationModel<B>,
        optim:        O,
        schedule:     LearningRateSchedule,
        codec:        &'a dyn TextCodec,
        train_loader: BucketedLoader<B>,
        valid_loader: BucketedLoader<B::InnerBackend>,
        checkpoints:  CheckpointSaver,
        metrics:      &'a mut dyn MetricsSink,
    ) -> Self {
        Self {
            config,
            model,
            optim,
            schedule,
            accumulator: GradientsAccumulator::new(),
            codec,
            train_loader,
            valid_loader,
            checkpoints,
            metrics,
            state: TrainingState::default(),
            examples: Vec::new(),
        }
    }

    /// Continue from an earlier run: counters come from the checkpoint,
    /// best-model tracking starts over.
    pub fn with_state(mut self, state: TrainingState<Snapshot<B>>) -> Self {
        self.state = state;
        self
    }

    pub fn state(&self) -> &TrainingState<Snapshot<B>> {
        &self.state
    }

    pub fn model(&self) -> &TranslationModel<B> {
        &self.model
    }

    pub fn examples(&self) -> &[ExampleRow] {
        &self.examples
    }

    /// Run epochs `start_epoch .. start_epoch + n_epochs`, then flush the
    /// example table and write the best model.
    pub fn fit(&mut self, start_epoch: usize, n_epochs: usize) -> Result<()> {
        for epoch in start_epoch..start_epoch + n_epochs {
            self.track_examples(epoch)?;
            let (val_loss, bleu) = self.validation_epoch(epoch)?;
            let train_loss       = self.training_epoch(epoch)?;

            tracing::info!(
                "Epoch {:>3} | train_loss={:.4} | val_loss={:.4} | bleu={:.4}",
                epoch, train_loss, val_loss, bleu,
            );
        }

        if let Err(err) = self.metrics.log_examples(&self.examples) {
            tracing::warn!("Could not log the example table: {err:#}");
        }

        if let Some(best) = self.state.best.as_ref() {
            self.checkpoints.save_best_model(&best.snapshot)?;
            tracing::info!("Best model: epoch {} (loss {:.4})", best.epoch, best.loss);
        }
        Ok(())
    }

    // ─── TrackingExamples ─────────────────────────────────────────────────────
    pub fn track_examples(&mut self, epoch: usize) -> Result<()> {
        let model = self.model.valid();

        let tracked = [
            (Split::Train,      self.train_loader.first_items()),
            (Split::Validation, self.valid_loader.first_items()),
        ];

        for (split, items) in tracked {
            for pair in items.into_iter().take(self.config.num_examples) {
                let source     = self.codec.decode(&pair.source_ids, true)?;
                let target     = self.codec.decode(&pair.target_ids, true)?;
                let prediction = model.translate(&source, self.codec)?;

                tracing::info!("Epoch {epoch} [{split}]\n  source:    {source}\n  target:    {target}\n  predicted: {prediction}");
                self.examples.push(ExampleRow { epoch, split, source, target, prediction });
            }
        }
        Ok(())
    }

    // ─── Validating ───────────────────────────────────────────────────────────
    /// Returns (average loss, corpus BLEU).
    pub fn validation_epoch(&mut self, epoch: usize) -> Result<(f64, f64)> {
        let model   = self.model.valid();
        let batches = self.valid_loader.iter()?;
        let total   = batches.len();
        let bar     = self.progress_bar(total, format!("Validation Epoch {epoch:02}"))?;

        let mut loss_sum   = 0.0f64;
        let mut hypotheses = Vec::new();
        let mut references = Vec::new();

        for batch in batches {
            let (loss, logits) = model.forward_loss(batch.source, batch.target.clone());
            let loss: f64 = loss.into_scalar().elem();
            loss_sum += loss;

            self.emit(&[("Epoch", epoch as f64), ("Validation/Loss", loss)]);
            self.state = mem::take(&mut self.state).after_validation_batch();

            let eos       = self.codec.specials().eos;
            let predicted = self.codec.decode_batch(&argmax_paths(logits, eos)?, true)?;
            let expected  = self.codec.decode_batch(&int_rows(batch.target)?, true)?;
            for (hypothesis, reference) in predicted.iter().zip(&expected) {
                hypotheses.push(words(hypothesis));
                references.push(vec![words(reference)]);
            }
            bar.inc(1);
        }
        bar.finish_and_clear();

        let loss_avg = loss_sum / total.max(1) as f64;
        let bleu     = corpus_bleu(&references, &hypotheses);

        self.emit(&[
            ("Epoch", epoch as f64),
            ("Validation/BLEU", bleu),
            ("Validation/Avg_loss", loss_avg),
        ]);
        self.state = mem::take(&mut self.state).after_summary();

        tracing::info!("Validation loss: {loss_avg:.3}, BLEU: {bleu:.3}");
        Ok((loss_avg, bleu))
    }

    // ─── Training ─────────────────────────────────────────────────────────────
    /// Returns the average training loss.
    pub fn training_epoch(&mut self, epoch: usize) -> Result<f64> {
        let batches = self.train_loader.iter()?;
        let total   = batches.len();
        let bar     = self.progress_bar(total, format!("Processing Epoch {epoch:02}"))?;

        let mut loss_sum = 0.0f64;

        for (batch_idx, batch) in batches.enumerate() {
            let (loss, _) = self.model.forward_loss(batch.source, batch.target);
            let loss_value: f64 = loss.clone().into_scalar().elem();
            loss_sum += loss_value;

            let grads = GradientsParams::from_grads(loss.backward(), &self.model);
            self.accumulator.accumulate(&self.model, grads);

            self.emit(&[
                ("Epoch", epoch as f64),
                ("Batch", batch_idx as f64),
                ("Train/Loss", loss_value),
            ]);
            let (state, step_due) = mem::take(&mut self.state)
                .after_training_batch(self.config.grad_accumulation_steps);
            self.state = state;

            if step_due {
                let lr    = self.schedule.next_lr();
                let grads = self.accumulator.grads();
                self.model = self.optim.step(lr, self.model.clone(), grads);
            }

            bar.set_message(format!("loss {loss_value:6.3}"));
            bar.inc(1);
        }
        bar.finish_and_clear();

        let loss_avg = loss_sum / total.max(1) as f64;
        self.emit(&[("Epoch", epoch as f64), ("Train/Avg_loss", loss_avg)]);
        self.state = mem::take(&mut self.state).after_summary();

        if epoch % self.config.save_every.max(1) == 0 {
            let record = CheckpointRecord::capture(
                &self.model, &self.optim, epoch, loss_avg, self.state.counters,
            )?;
            self.checkpoints.save(&record)?;
            tracing::info!("Checkpoint for epoch {epoch} written");
        }

        let model = &self.model;
        let (state, improved) = mem::take(&mut self.state)
            .observe_epoch_loss(epoch, loss_avg, || model.valid());
        self.state = state;
        if improved {
            tracing::info!("New best training loss {loss_avg:.4} at epoch {epoch}");
        }

        Ok(loss_avg)
    }

    /// Send one metrics record under the current global step.
    fn emit(&mut self, scalars: &[(&str, f64)]) {
        let step = self.state.global_step();
        if let Err(err) = self.metrics.log_scalars(step, scalars) {
            tracing::warn!("Metrics logging failed at step {step}: {err:#}");
        }
    }

    fn progress_bar(&self, len: usize, message: String) -> Result<ProgressBar> {
        if !self.config.show_progress {
            return Ok(ProgressBar::hidden());
        }
        let bar = ProgressBar::new(len as u64);
        bar.set_style(ProgressStyle::with_template(
            "{prefix} {bar:40.green/black} {pos}/{len} [{elapsed}<{eta}] {msg}",
        )?);
        bar.set_prefix(message);
        Ok(bar)
    }
}

/// Row-wise ids of a 2-D int tensor.
fn int_rows<B: Backend>(tensor: Tensor<B, 2, Int>) -> Result<Vec<Vec<u32>>> {
    let [_, cols] = tensor.dims();
    let flat = tensor
        .into_data()
        .convert::<i64>()
        .to_vec::<i64>()
        .map_err(|e| anyhow::anyhow!("Cannot read tensor data: {e:?}"))?;

    Ok(flat
        .chunks(cols.max(1))
        .map(|row| row.iter().map(|&id| id as u32).collect())
        .collect())
}

/// Most likely token at every position, each row cut after its first [EOS].
fn argmax_paths<B: Backend>(logits: Tensor<B, 3>, eos: u32) -> Result<Vec<Vec<u32>>> {
    let [batch_size, positions, _] = logits.dims();
    let ids = logits.argmax(2).reshape([batch_size, positions]);

    Ok(int_rows(ids)?
        .into_iter()
        .map(|mut row| {
            if let Some(end) = row.iter().position(|&id| id == eos) {
                row.truncate(end + 1);
            }
            row
        })
        .collect())
}

fn words(text: &str) -> Vec<String> {
    text.split_whitespace().map(String::from).collect()
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{
        batcher::TranslationBatcher,
        dataset::TranslationDataset,
        preprocessor::{sort_by_length, tokenize_pairs},
    };
    use crate::domain::traits::NullMetrics;
    use crate::ml::model::TranslationModelConfig;
    use crate::test_support::{pairs_with_lengths, FailingMetrics, RecordingMetrics, WhitespaceCodec};
    use burn::{
        backend::{ndarray::NdArrayDevice, Autodiff, NdArray},
        optim::AdamConfig,
    };
    use std::sync::Arc;

    type TrainBackend = Autodiff<NdArray>;

    struct Fixture {
        codec: WhitespaceCodec,
        train: Arc<TranslationDataset>,
        valid: Arc<TranslationDataset>,
        dir:   tempfile::TempDir,
    }

    /// 5 training pairs and 3 validation pairs.
    fn fixture() -> Fixture {
        let pairs = pairs_with_lengths(&[5, 4, 4, 3, 2, 3, 2, 1]);
        let codec = WhitespaceCodec::from_pairs(&pairs);
        let mut train = tokenize_pairs(&pairs, &codec).unwrap();
        let mut valid = train.split_off(5);
        sort_by_length(&mut train);
        sort_by_length(&mut valid);

        Fixture {
            codec,
            train: Arc::new(TranslationDataset::new(train)),
            valid: Arc::new(TranslationDataset::new(valid)),
            dir:   tempfile::tempdir().unwrap(),
        }
    }

    fn learner<'a>(
        fx:         &'a Fixture,
        metrics:    &'a mut dyn MetricsSink,
        batch:      usize,
        accum:      usize,
        save_every: usize,
    ) -> Learner<'a, TrainBackend, impl Optimizer<TranslationModel<TrainBackend>, TrainBackend>> {
        let device = NdArrayDevice::Cpu;
        let config = TranslationModelConfig::new(fx.codec.vocab_size(), 10, 16, 2, 1, 32, 0.0);

        let train_loader = BucketedLoader::new(
            Arc::clone(&fx.train), batch, 1, TranslationBatcher::new(device.clone()), 1,
        )
        .unwrap();
        let valid_loader = BucketedLoader::new(
            Arc::clone(&fx.valid), batch, 2, TranslationBatcher::new(device.clone()), 1,
        )
        .unwrap();

        Learner::new(
            LearnerConfig {
                grad_accumulation_steps: accum,
                save_every,
                num_examples: 2,
                show_progress: false,
            },
            config.init(&device),
            AdamConfig::new().init::<TrainBackend, TranslationModel<TrainBackend>>(),
            LearningRateSchedule::new(1e-3, None, 16),
            &fx.codec,
            train_loader,
            valid_loader,
            CheckpointSaver::new(fx.dir.path(), 5, true).unwrap(),
            metrics,
        )
    }

    #[test]
    fn test_global_step_counts_batches_and_summaries() {
        let fx = fixture();
        let mut metrics = RecordingMetrics::default();
        {
            // batch size 1: 5 training and 3 validation batches
            let mut l = learner(&fx, &mut metrics, 1, 1, 1);
            l.fit(1, 1).unwrap();
            assert_eq!(l.state().global_step(), 1 + 3 + 1 + 5 + 1);
            assert_eq!(l.state().training_step(), 6);

            l.fit(2, 1).unwrap();
            assert_eq!(l.state().global_step(), 1 + 2 * 10);
        }

        assert_eq!(metrics.steps_for("Validation/Loss")[..3].to_vec(), vec![1, 2, 3]);
        assert_eq!(metrics.steps_for("Validation/BLEU")[0], 4);
        assert_eq!(metrics.steps_for("Train/Loss")[..5].to_vec(), vec![5, 6, 7, 8, 9]);
        assert_eq!(metrics.steps_for("Train/Avg_loss"), vec![10, 20]);
    }

    #[test]
    fn test_example_rows_per_epoch_flushed_once() {
        let fx = fixture();
        let mut metrics = RecordingMetrics::default();
        {
            // one chunk per split, so both first batches hold >= 2 rows
            let mut l = learner(&fx, &mut metrics, 5, 1, 1);
            l.fit(1, 2).unwrap();
            assert_eq!(l.examples().len(), 2 * 2 * 2);
        }
        assert_eq!(metrics.example_tables.len(), 1);

        let table = &metrics.example_tables[0];
        for epoch in [1, 2] {
            let rows: Vec<&ExampleRow> = table.iter().filter(|r| r.epoch == epoch).collect();
            assert_eq!(rows.len(), 4);
            assert!(rows.iter().any(|r| r.split == Split::Train));
            assert!(rows.iter().any(|r| r.split == Split::Validation));
            assert!(rows.iter().all(|r| !r.source.contains("[BOS]")));
        }
    }

    #[test]
    fn test_full_batches_track_exactly_two_per_split() {
        let fx = fixture();
        let mut metrics = NullMetrics;
        // one chunk per split, so the first batch always has >= 2 rows
        let mut l = learner(&fx, &mut metrics, 8, 1, 1);
        l.track_examples(1).unwrap();
        assert_eq!(l.examples().len(), 4);
    }

    #[test]
    fn test_accumulation_steps_optimizer_less_often() {
        let fx = fixture();
        let mut metrics = NullMetrics;
        let mut l = learner(&fx, &mut metrics, 1, 5, 100);

        let before = l.model().output.weight.val().to_data();
        // 5 batches with accumulation 5: exactly one step, on the last batch
        l.training_epoch(1).unwrap();
        let after = l.model().output.weight.val().to_data();
        assert_ne!(before.to_vec::<f32>().unwrap(), after.to_vec::<f32>().unwrap());
        assert_eq!(l.state().training_step(), 6);
    }

    #[test]
    fn test_best_snapshot_unaffected_by_later_updates() {
        let fx = fixture();
        let mut metrics = NullMetrics;
        let mut l = learner(&fx, &mut metrics, 1, 1, 100);

        l.training_epoch(1).unwrap();
        let best = l.state().best.clone().unwrap();
        assert_eq!(best.epoch, 1);
        let frozen = best.snapshot.output.weight.val().to_data();

        l.training_epoch(2).unwrap();
        let live = l.model().output.weight.val().to_data();

        best.snapshot.output.weight.val().to_data().assert_eq(&frozen, true);
        assert_ne!(frozen.to_vec::<f32>().unwrap(), live.to_vec::<f32>().unwrap());
    }

    #[test]
    fn test_checkpoint_cadence() {
        let fx = fixture();
        let mut metrics = NullMetrics;
        {
            let mut l = learner(&fx, &mut metrics, 2, 1, 2);
            l.fit(1, 4).unwrap();
        }
        let saver = CheckpointSaver::new(fx.dir.path(), 5, true).unwrap();
        let mut epochs: Vec<usize> = saver.entries().iter().map(|e| e.epoch).collect();
        epochs.sort_unstable();
        assert_eq!(epochs, vec![2, 4]);
        assert!(fx.dir.path().join("best_model.mpk").exists());
        assert!(saver.best_model_path().exists());
    }

    #[test]
    fn test_failing_metrics_do_not_abort() {
        let fx = fixture();
        let mut metrics = FailingMetrics;
        let mut l = learner(&fx, &mut metrics, 2, 1, 1);
        assert!(l.fit(1, 1).is_ok());
        assert!(l.state().best_epoch().is_some());
    }

    #[test]
    fn test_argmax_paths_cut_after_eos() {
        // vocab 4, eos = 3: rows predict [1, 3, 2] and [2, 2, 2]
        let device = Default::default();
        let mut data = vec![0.0f32; 2 * 3 * 4];
        for (i, &tok) in [1usize, 3, 2, 2, 2, 2].iter().enumerate() {
            data[i * 4 + tok] = 1.0;
        }
        let logits = Tensor::<NdArray, 1>::from_floats(data.as_slice(), &device).reshape([2, 3, 4]);

        let paths = argmax_paths(logits, 3).unwrap();
        assert_eq!(paths, vec![vec![1, 3], vec![2, 2, 2]]);
    }
}
