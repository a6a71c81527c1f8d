// ============================================================
// Layer 6 - Tokenizer Store
// ============================================================
// Builds, saves and loads the shared source/target tokenizer.
//
// Two variants, picked once at setup:
//   WordLevel - frequency-ranked word vocabulary, trained with
//               the crate's WordLevelTrainer
//   Bpe       - trained with the crate's BpeTrainer
//
// Both are trained on a concrete TokenizerImpl with the same
// Lowercase normalizer and Whitespace pre-tokenizer, saved,
// then loaded back as a plain Tokenizer.
//
// Both end up as a `tokenizers::Tokenizer` wrapped in
// TranslationTokenizer, which implements TextCodec.
//
// Reserved ids (checked on every load):
//   [PAD] = 0   [UNK] = 1   [BOS] = 2   [EOS] = 3
//
// Reference: Sennrich et al. (2016) BPE paper
//            tokenizers crate documentation

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{fs, path::{Path, PathBuf}};
use tokenizers::{
    decoders::{bpe::BPEDecoder, DecoderWrapper},
    models::{
        bpe::{BpeTrainerBuilder, BPE},
        wordlevel::{WordLevel, WordLevelTrainer},
    },
    normalizers::{Lowercase, NormalizerWrapper},
    pre_tokenizers::{whitespace::Whitespace, PreTokenizerWrapper},
    processors::PostProcessorWrapper,
    AddedToken, Tokenizer, TokenizerBuilder, TokenizerImpl,
};

use crate::domain::errors::DataError;
use crate::domain::traits::{SpecialIds, TextCodec};

pub const PAD_TOKEN: &str = "[PAD]";
pub const UNK_TOKEN: &str = "[UNK]";
pub const BOS_TOKEN: &str = "[BOS]";
pub const EOS_TOKEN: &str = "[EOS]";

/// Special tokens in id order
const SPECIAL_TOKENS: [&str; 4] = [PAD_TOKEN, UNK_TOKEN, BOS_TOKEN, EOS_TOKEN];

/// Marks the last sub-word of a word in the BPE vocabulary
const END_OF_WORD: &str = "</w>";

/// Which tokenizer model to train.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenizerKind {
    WordLevel,
    Bpe,
}

// ─── TranslationTokenizer ─────────────────────────────────────────────────────
/// A loaded tokenizer plus the ids of its reserved tokens.
#[derive(Debug)]
pub struct TranslationTokenizer {
    inner:    Tokenizer,
    specials: SpecialIds,
}

impl TranslationTokenizer {
    /// Wrap a tokenizer, resolving and validating its special tokens.
    pub fn from_tokenizer(inner: Tokenizer) -> Result<Self> {
        let lookup = |token: &str| -> Result<u32> {
            inner.token_to_id(token).ok_or_else(|| {
                DataError::Tokenizer(format!("special token {token} missing from vocabulary")).into()
            })
        };

        let specials = SpecialIds {
            pad: lookup(PAD_TOKEN)?,
            unk: lookup(UNK_TOKEN)?,
            bos: lookup(BOS_TOKEN)?,
            eos: lookup(EOS_TOKEN)?,
        };

        if specials.pad != 0 {
            return Err(DataError::Tokenizer(format!(
                "{PAD_TOKEN} must have id 0, found {}", specials.pad
            ))
            .into());
        }

        Ok(Self { inner, specials })
    }

    /// Load a tokenizer JSON previously written by `save`.
    pub fn from_file(path: &Path) -> Result<Self> {
        let inner = Tokenizer::from_file(path)
            .map_err(|e| anyhow::anyhow!("Cannot load tokenizer from '{}': {}", path.display(), e))?;
        Self::from_tokenizer(inner)
    }
}

impl TextCodec for TranslationTokenizer {
    fn encode(&self, text: &str) -> Result<Vec<u32>> {
        let enc = self
            .inner
            .encode(text, false)
            .map_err(|e| anyhow::anyhow!("Tokenisation error: {e}"))?;

        let mut ids = Vec::with_capacity(enc.get_ids().len() + 2);
        ids.push(self.specials.bos);
        ids.extend_from_slice(enc.get_ids());
        ids.push(self.specials.eos);
        Ok(ids)
    }

    fn decode(&self, ids: &[u32], skip_special_tokens: bool) -> Result<String> {
        self.inner
            .decode(ids, skip_special_tokens)
            .map_err(|e| anyhow::anyhow!("Decode error: {e}"))
    }

    fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Cannot create tokenizer directory '{}'", parent.display()))?;
        }
        self.inner
            .save(path, true)
            .map_err(|e| anyhow::anyhow!("Cannot save tokenizer to '{}': {e}", path.display()))
    }

    fn vocab_size(&self) -> usize {
        self.inner.get_vocab_size(true)
    }

    fn specials(&self) -> SpecialIds {
        self.specials
    }
}

// ─── TokenizerStore ───────────────────────────────────────────────────────────
/// Trains a tokenizer of the chosen kind and keeps its JSON at `path`.
pub struct TokenizerStore {
    path: PathBuf,
}

impl TokenizerStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Use the pretrained tokenizer when one is given, otherwise train and save.
    pub fn load_or_train(
        &self,
        pretrained: Option<&Path>,
        kind:       TokenizerKind,
        texts:      &[String],
        vocab_size: usize,
    ) -> Result<TranslationTokenizer> {
        match pretrained {
            Some(path) => {
                tracing::info!("Loading pretrained tokenizer from '{}'", path.display());
                TranslationTokenizer::from_file(path)
            }
            None => {
                tracing::info!("Training {:?} tokenizer (vocab_size={})", kind, vocab_size);
                self.train_and_save(kind, texts, vocab_size)
            }
        }
    }

    /// Train a tokenizer on `texts`, write it to the store path, load it back.
    pub fn train_and_save(
        &self,
        kind:       TokenizerKind,
        texts:      &[String],
        vocab_size: usize,
    ) -> Result<TranslationTokenizer> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Cannot create tokenizer directory '{}'", parent.display()))?;
        }

        match kind {
            TokenizerKind::WordLevel => write_word_level(texts, vocab_size, &self.path)?,
            TokenizerKind::Bpe       => write_bpe(texts, vocab_size, &self.path)?,
        }

        let tokenizer = TranslationTokenizer::from_file(&self.path)?;
        tracing::info!(
            "Tokenizer ready: {} entries, saved to '{}'",
            tokenizer.vocab_size(),
            self.path.display()
        );
        Ok(tokenizer)
    }
}

fn special_tokens() -> Vec<AddedToken> {
    SPECIAL_TOKENS
        .iter()
        .map(|t| AddedToken::from(*t, true))
        .collect()
}

/// Train a WordLevel tokenizer on `texts` and write its JSON to `path`.
///
/// Words are counted after the same Lowercase + Whitespace pipeline
/// `encode` runs, so every kept training word has its own id.
fn write_word_level(texts: &[String], vocab_size: usize, path: &Path) -> Result<()> {
    // Specials are placed first, so [PAD] = 0 ... [EOS] = 3
    let mut trainer = WordLevelTrainer::builder()
        .vocab_size(vocab_size)
        .min_frequency(0)
        .show_progress(false)
        .special_tokens(special_tokens())
        .build()
        .map_err(|e| DataError::Tokenizer(e.to_string()))?;

    let model = WordLevel::builder()
        .unk_token(UNK_TOKEN.to_string())
        .build()
        .map_err(DataError::from)?;

    let mut tokenizer: TokenizerImpl<
        WordLevel,
        NormalizerWrapper,
        PreTokenizerWrapper,
        PostProcessorWrapper,
        DecoderWrapper,
    > = TokenizerBuilder::new()
        .with_model(model)
        .with_normalizer(Some(NormalizerWrapper::Lowercase(Lowercase)))
        .with_pre_tokenizer(Some(PreTokenizerWrapper::Whitespace(Whitespace::default())))
        .with_post_processor(None)
        .with_decoder(None)
        .build()
        .map_err(DataError::from)?;

    tokenizer
        .train(&mut trainer, texts.iter())
        .map_err(DataError::from)?;

    tokenizer
        .save(path, true)
        .map_err(DataError::from)
        .with_context(|| format!("Cannot write tokenizer JSON to '{}'", path.display()))?;
    Ok(())
}

/// Train a BPE tokenizer on `texts` and write its JSON to `path`.
fn write_bpe(texts: &[String], vocab_size: usize, path: &Path) -> Result<()> {
    let mut trainer = BpeTrainerBuilder::new()
        .vocab_size(vocab_size)
        .min_frequency(2)
        .show_progress(false)
        .special_tokens(special_tokens())
        .end_of_word_suffix(END_OF_WORD.to_string())
        .build();

    let model = BPE::builder()
        .unk_token(UNK_TOKEN.to_string())
        .end_of_word_suffix(END_OF_WORD.to_string())
        .build()
        .map_err(DataError::from)?;

    let mut tokenizer: TokenizerImpl<
        BPE,
        NormalizerWrapper,
        PreTokenizerWrapper,
        PostProcessorWrapper,
        DecoderWrapper,
    > = TokenizerBuilder::new()
        .with_model(model)
        .with_normalizer(Some(NormalizerWrapper::Lowercase(Lowercase)))
        .with_pre_tokenizer(Some(PreTokenizerWrapper::Whitespace(Whitespace::default())))
        .with_post_processor(None)
        .with_decoder(Some(DecoderWrapper::BPE(BPEDecoder::new(END_OF_WORD.to_string()))))
        .build()
        .map_err(DataError::from)?;

    tokenizer
        .train(&mut trainer, texts.iter())
        .map_err(DataError::from)?;

    tokenizer
        .save(path, true)
        .map_err(DataError::from)
        .with_context(|| format!("Cannot write tokenizer JSON to '{}'", path.display()))?;
    Ok(())
}
