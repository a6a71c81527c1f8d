// ============================================================
// Layer 1 - CLI Commands and Arguments
// ============================================================
// Defines the two subcommands, `train` and `translate`, and
// all their configurable flags.
//
// Reference: Rust Book §12 (Building a CLI Program)

use clap::{Args, Subcommand, ValueEnum};

use crate::application::train_use_case::TrainConfig;
use crate::infra::tokenizer_store::TokenizerKind;

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Train an encoder-decoder translation model on a parallel corpus
    Train(TrainArgs),

    /// Translate a sentence with the best model of a finished run
    Translate(TranslateArgs),
}

/// Subword model to train when no pretrained tokenizer is given
#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum TokenizerArg {
    /// One id per lowercased word
    Wordlevel,
    /// Byte-pair encoding
    Bpe,
}

impl From<TokenizerArg> for TokenizerKind {
    fn from(arg: TokenizerArg) -> Self {
        match arg {
            TokenizerArg::Wordlevel => TokenizerKind::WordLevel,
            TokenizerArg::Bpe       => TokenizerKind::Bpe,
        }
    }
}

/// All arguments for the `train` command.
#[derive(Args, Debug)]
pub struct TrainArgs {
    // ── Corpus ────────────────────────────────────────────────
    /// Directory holding `<split>.<lang>` line-aligned files
    #[arg(long, default_value = "data/iwslt15")]
    pub corpus_dir: String,

    #[arg(long, default_value = "en")]
    pub src_lang: String,

    #[arg(long, default_value = "vi")]
    pub trg_lang: String,

    #[arg(long, default_value = "train")]
    pub split: String,

    /// Pairs drawn from the shuffled corpus
    #[arg(long, default_value_t = 100_000)]
    pub dataset_size: usize,

    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    // ── Tokenizer ─────────────────────────────────────────────
    #[arg(long, value_enum, default_value_t = TokenizerArg::Bpe)]
    pub tokenizer: TokenizerArg,

    #[arg(long, default_value_t = 16_000)]
    pub vocab_size: usize,

    /// Where the tokenizer is saved; relative paths go inside the run directory
    #[arg(long, default_value = "tokenizer.json")]
    pub tokenizer_save_path: String,

    /// Use this tokenizer.json instead of training one
    #[arg(long)]
    pub pretrained_tokenizer: Option<String>,

    // ── Batching ──────────────────────────────────────────────
    /// Fraction of pairs held out for validation
    #[arg(long, default_value_t = 0.1)]
    pub test_proportion: f64,

    #[arg(long, default_value_t = 64)]
    pub batch_size: usize,

    /// Longest tokenized sentence kept, [BOS] and [EOS] included
    #[arg(long, default_value_t = 64)]
    pub max_len: usize,

    /// Batches gathered ahead of the training loop
    #[arg(long, default_value_t = 2)]
    pub prefetch: usize,

    // ── Optimisation ──────────────────────────────────────────
    #[arg(long, default_value_t = 10)]
    pub epochs: usize,

    /// Number of the first epoch (checkpoint cadence counts from here)
    #[arg(long, default_value_t = 1)]
    pub start_epoch: usize,

    #[arg(long, default_value_t = 1e-4)]
    pub lr: f64,

    /// Enables the inverse square root warmup schedule
    #[arg(long)]
    pub warmup_steps: Option<usize>,

    /// Training steps per optimizer step
    #[arg(long, default_value_t = 1)]
    pub grad_accumulation_steps: usize,

    // ── Model ─────────────────────────────────────────────────
    #[arg(long, default_value_t = 256)]
    pub d_model: usize,

    /// d_model must be divisible by num_heads
    #[arg(long, default_value_t = 8)]
    pub num_heads: usize,

    /// Encoder and decoder layers each
    #[arg(long, default_value_t = 3)]
    pub num_layers: usize,

    #[arg(long, default_value_t = 1024)]
    pub d_ff: usize,

    #[arg(long, default_value_t = 0.1)]
    pub dropout: f64,

    // ── Run ───────────────────────────────────────────────────
    #[arg(long, default_value = "runs")]
    pub output_dir: String,

    #[arg(long, default_value = "default")]
    pub run_name: String,

    /// Write a checkpoint every N epochs
    #[arg(long, default_value_t = 1)]
    pub save_every: usize,

    /// Checkpoints retained, ranked by training loss
    #[arg(long, default_value_t = 5)]
    pub top_n: usize,

    /// Tracked example translations per split and epoch
    #[arg(long, default_value_t = 2)]
    pub num_examples: usize,

    /// Continue from the latest checkpoint in the run directory
    #[arg(long)]
    pub resume: bool,

    /// Hide progress bars
    #[arg(long)]
    pub no_progress: bool,
}

/// Boundary between Layer 1 and Layer 2: the application layer
/// never sees clap types.
impl From<TrainArgs> for TrainConfig {
    fn from(a: TrainArgs) -> Self {
        TrainConfig {
            corpus_dir:   a.corpus_dir,
            src_lang:     a.src_lang,
            trg_lang:     a.trg_lang,
            split:        a.split,
            dataset_size: a.dataset_size,
            seed:         a.seed,

            tokenizer:            a.tokenizer.into(),
            vocab_size:           a.vocab_size,
            tokenizer_save_path:  a.tokenizer_save_path,
            pretrained_tokenizer: a.pretrained_tokenizer,

            test_proportion: a.test_proportion,
            batch_size:      a.batch_size,
            max_len:         a.max_len,
            prefetch:        a.prefetch,

            epochs:                  a.epochs,
            start_epoch:             a.start_epoch,
            lr:                      a.lr,
            warmup_steps:            a.warmup_steps,
            grad_accumulation_steps: a.grad_accumulation_steps,

            d_model:    a.d_model,
            num_heads:  a.num_heads,
            num_layers: a.num_layers,
            d_ff:       a.d_ff,
            dropout:    a.dropout,

            output_dir:   a.output_dir,
            run_name:     a.run_name,
            save_every:   a.save_every,
            top_n:        a.top_n,
            num_examples: a.num_examples,
            resume:       a.resume,
            no_progress:  a.no_progress,
        }
    }
}

/// All arguments for the `translate` command
#[derive(Args, Debug)]
pub struct TranslateArgs {
    /// Run directory written by `train`
    #[arg(long, default_value = "runs/default")]
    pub run_dir: String,

    /// Sentence in the source language
    #[arg(long)]
    pub text: String,
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use crate::cli::Cli;
    use crate::application::train_use_case::TrainConfig;
    use super::*;
    use clap::Parser;

    #[test]
    fn test_train_defaults_match_config_defaults() {
        let cli = Cli::try_parse_from(["seq2seq-trainer", "train"]).unwrap();
        let Commands::Train(args) = cli.command else { panic!("expected train") };
        assert_eq!(TrainConfig::from(args), TrainConfig::default());
    }

    #[test]
    fn test_train_flags_override_defaults() {
        let cli = Cli::try_parse_from([
            "seq2seq-trainer", "train",
            "--tokenizer", "wordlevel",
            "--warmup-steps", "4000",
            "--resume",
        ])
        .unwrap();
        let Commands::Train(args) = cli.command else { panic!("expected train") };
        let cfg = TrainConfig::from(args);
        assert_eq!(cfg.tokenizer, TokenizerKind::WordLevel);
        assert_eq!(cfg.warmup_steps, Some(4000));
        assert!(cfg.resume);
    }

    #[test]
    fn test_translate_requires_text() {
        assert!(Cli::try_parse_from(["seq2seq-trainer", "translate"]).is_err());
    }
}
