// ============================================================
// Layer 4 - Parallel Corpus Loader
// ============================================================
// Reads one split of a line-aligned parallel corpus from disk.
//
// Expected layout (the IWSLT'15 en-vi release uses it):
//
//   data/iwslt15/
//     train.en        ← one English sentence per line
//     train.vi        ← the Vietnamese translation on the same line
//     validation.en
//     validation.vi
//
// Line N of `<split>.<src_lang>` is the translation of line N
// of `<split>.<trg_lang>`. Differing line counts mean the files
// are out of sync and loading fails.
//
// Reference: Rust Book §9 (Error Handling)
//            Rust Book §12 (I/O and File Handling)

use anyhow::{Context, Result};
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::domain::errors::DataError;
use crate::domain::pair::TranslationPair;
use crate::domain::traits::CorpusSource;

/// Loads aligned `<split>.<lang>` files from a corpus directory.
/// Implements the CorpusSource trait from Layer 3.
pub struct ParallelTextLoader {
    /// Directory holding the split files
    dir: PathBuf,
    /// File extension of the source side, e.g. "en"
    src_lang: String,
    /// File extension of the target side, e.g. "vi"
    trg_lang: String,
}

impl ParallelTextLoader {
    pub fn new(
        dir:      impl Into<PathBuf>,
        src_lang: impl Into<String>,
        trg_lang: impl Into<String>,
    ) -> Self {
        Self {
            dir:      dir.into(),
            src_lang: src_lang.into(),
            trg_lang: trg_lang.into(),
        }
    }

    fn split_path(&self, split: &str, lang: &str) -> PathBuf {
        self.dir.join(format!("{split}.{lang}"))
    }
}

impl CorpusSource for ParallelTextLoader {
    fn load_split(&self, split: &str) -> Result<Vec<TranslationPair>> {
        let source_path = self.split_path(split, &self.src_lang);
        let target_path = self.split_path(split, &self.trg_lang);

        let source_lines = read_lines(&source_path)?;
        let target_lines = read_lines(&target_path)?;

        if source_lines.len() != target_lines.len() {
            return Err(DataError::MisalignedCorpus {
                source_path,
                source_lines: source_lines.len(),
                target_path,
                target_lines: target_lines.len(),
            }
            .into());
        }

        let pairs: Vec<TranslationPair> = source_lines
            .into_iter()
            .zip(target_lines)
            .map(|(s, t)| TranslationPair::new(s, t))
            .collect();

        tracing::info!(
            "Loaded {} pairs from split '{}' ({} → {})",
            pairs.len(),
            split,
            self.src_lang,
            self.trg_lang
        );
        Ok(pairs)
    }
}

/// Read a UTF-8 text file into owned lines, without line terminators.
fn read_lines(path: &Path) -> Result<Vec<String>> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Cannot read corpus file '{}'", path.display()))?;
    Ok(text.lines().map(str::to_string).collect())
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_loads_aligned_lines() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("train.en"), "hello\nthank you\n").unwrap();
        fs::write(dir.path().join("train.vi"), "xin chào\ncảm ơn\n").unwrap();

        let loader = ParallelTextLoader::new(dir.path(), "en", "vi");
        let pairs  = loader.load_split("train").unwrap();

        assert_eq!(pairs.len(), 2);
        assert_eq!(pairs[1], TranslationPair::new("thank you", "cảm ơn"));
    }

    #[test]
    fn test_misaligned_files_fail() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("train.en"), "a\nb\nc\n").unwrap();
        fs::write(dir.path().join("train.vi"), "x\ny\n").unwrap();

        let loader = ParallelTextLoader::new(dir.path(), "en", "vi");
        let err    = loader.load_split("train").unwrap_err();

        assert!(matches!(
            err.downcast_ref::<DataError>(),
            Some(DataError::MisalignedCorpus { source_lines: 3, target_lines: 2, .. })
        ));
    }

    #[test]
    fn test_missing_split_is_an_error() {
        let dir    = tempfile::tempdir().unwrap();
        let loader = ParallelTextLoader::new(dir.path(), "en", "vi");
        assert!(loader.load_split("validation").is_err());
    }
}
