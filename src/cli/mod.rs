// ============================================================
// Layer 1 - CLI / Presentation Layer
// ============================================================
// Parses command line arguments with clap and hands off to
// Layer 2 (application). No training logic lives here.
//
//   1. `train`     - prepares the corpus and runs the learner
//   2. `translate` - loads a run's best model and translates
//
// Reference: Rust Book §7 (Modules), §12 (CLI programs)

pub mod commands;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, TrainArgs, TranslateArgs};

#[derive(Parser, Debug)]
#[command(
    name = "seq2seq-trainer",
    version,
    about = "Train a transformer translation model on a parallel corpus, then translate with it."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Dispatch to the matching use case.
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Train(args)     => Self::run_train(args),
            Commands::Translate(args) => Self::run_translate(args),
        }
    }

    fn run_train(args: TrainArgs) -> Result<()> {
        use crate::application::train_use_case::TrainUseCase;

        tracing::info!(
            "Starting run '{}' on corpus in: {}",
            args.run_name, args.corpus_dir
        );
        TrainUseCase::new(args.into()).execute()?;

        println!("Training complete.");
        Ok(())
    }

    fn run_translate(args: TranslateArgs) -> Result<()> {
        use crate::application::translate_use_case::TranslateUseCase;

        let use_case    = TranslateUseCase::new(&args.run_dir)?;
        let translation = use_case.translate(&args.text)?;
        println!("\nTranslation: {}", translation);
        Ok(())
    }
}
