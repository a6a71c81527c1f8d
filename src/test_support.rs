//! Small in-memory collaborators shared by unit tests.

use std::collections::HashMap;
use std::path::Path;

use anyhow::{anyhow, Result};

use crate::domain::pair::{ExampleRow, TranslationPair};
use crate::domain::traits::{MetricsSink, SpecialIds, TextCodec};

pub const SPECIALS: SpecialIds = SpecialIds { pad: 0, unk: 1, bos: 2, eos: 3 };

/// Whitespace word codec with a vocabulary fixed at construction.
pub struct WhitespaceCodec {
    vocab:   HashMap<String, u32>,
    inverse: Vec<String>,
}

impl WhitespaceCodec {
    pub fn from_texts<'a>(texts: impl IntoIterator<Item = &'a str>) -> Self {
        let mut inverse: Vec<String> = ["[PAD]", "[UNK]", "[BOS]", "[EOS]"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let mut vocab: HashMap<String, u32> = inverse
            .iter()
            .enumerate()
            .map(|(i, w)| (w.clone(), i as u32))
            .collect();

        for text in texts {
            for word in text.split_whitespace() {
                if !vocab.contains_key(word) {
                    vocab.insert(word.to_string(), inverse.len() as u32);
                    inverse.push(word.to_string());
                }
            }
        }
        Self { vocab, inverse }
    }

    pub fn from_pairs(pairs: &[TranslationPair]) -> Self {
        Self::from_texts(
            pairs
                .iter()
                .flat_map(|p| [p.source.as_str(), p.target.as_str()]),
        )
    }
}

impl TextCodec for WhitespaceCodec {
    fn encode(&self, text: &str) -> Result<Vec<u32>> {
        let mut ids = vec![SPECIALS.bos];
        ids.extend(
            text.split_whitespace()
                .map(|w| self.vocab.get(w).copied().unwrap_or(SPECIALS.unk)),
        );
        ids.push(SPECIALS.eos);
        Ok(ids)
    }

    fn decode(&self, ids: &[u32], skip_special_tokens: bool) -> Result<String> {
        let words: Vec<&str> = ids
            .iter()
            .filter(|&&id| !(skip_special_tokens && id <= SPECIALS.eos))
            .map(|&id| {
                self.inverse
                    .get(id as usize)
                    .map(String::as_str)
                    .ok_or_else(|| anyhow!("id {id} out of vocabulary"))
            })
            .collect::<Result<_>>()?;
        Ok(words.join(" "))
    }

    fn save(&self, _path: &Path) -> Result<()> {
        Ok(())
    }

    fn vocab_size(&self) -> usize {
        self.inverse.len()
    }

    fn specials(&self) -> SpecialIds {
        SPECIALS
    }
}

/// Metrics sink that keeps everything in memory for assertions.
#[derive(Debug, Default)]
pub struct RecordingMetrics {
    pub scalars:        Vec<(usize, String, f64)>,
    pub example_tables: Vec<Vec<ExampleRow>>,
}

impl RecordingMetrics {
    pub fn steps_for(&self, key: &str) -> Vec<usize> {
        self.scalars
            .iter()
            .filter(|(_, k, _)| k == key)
            .map(|(s, _, _)| *s)
            .collect()
    }
}

impl MetricsSink for RecordingMetrics {
    fn log_scalars(&mut self, step: usize, scalars: &[(&str, f64)]) -> Result<()> {
        for (key, value) in scalars {
            self.scalars.push((step, key.to_string(), *value));
        }
        Ok(())
    }

    fn log_examples(&mut self, rows: &[ExampleRow]) -> Result<()> {
        self.example_tables.push(rows.to_vec());
        Ok(())
    }
}

/// Metrics sink that always fails.
pub struct FailingMetrics;

impl MetricsSink for FailingMetrics {
    fn log_scalars(&mut self, _step: usize, _scalars: &[(&str, f64)]) -> Result<()> {
        Err(anyhow!("tracking backend unreachable"))
    }

    fn log_examples(&mut self, _rows: &[ExampleRow]) -> Result<()> {
        Err(anyhow!("tracking backend unreachable"))
    }
}

/// Pairs whose sides have `n` and `n + 1` words for n in `lengths`.
pub fn pairs_with_lengths(lengths: &[usize]) -> Vec<TranslationPair> {
    lengths
        .iter()
        .enumerate()
        .map(|(i, &n)| {
            let src: Vec<String> = (0..n).map(|k| format!("s{}", (i + k) % 7)).collect();
            let trg: Vec<String> = (0..=n).map(|k| format!("t{}", (i + k) % 5)).collect();
            TranslationPair::new(src.join(" "), trg.join(" "))
        })
        .collect()
}
