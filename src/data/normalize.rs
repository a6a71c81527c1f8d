// ============================================================
// Layer 4 - Sentence Normaliser
// ============================================================
// Cleans one raw corpus line before it becomes half of a
// TranslationPair.
//
// Corpus lines scraped from subtitles and transcripts carry:
//   - Non-breaking spaces (U+00A0) and zero-width spaces (U+200B)
//   - Byte order marks at the start of files
//   - Tabs and stray carriage returns
//   - Runs of spaces from alignment tools
//
// Cleaning steps (applied in order):
//   1. Map Unicode whitespace variants and control chars to a space
//   2. Collapse runs of spaces into one
//   3. Trim both ends
//
// A sentence is a single line, so unlike document cleaning there
// are no paragraph breaks to preserve.
//
// Reference: Rust Book §8 (Strings in Rust)

pub struct SentenceNormalizer;

impl SentenceNormalizer {
    pub fn new() -> Self {
        Self
    }

    /// Clean a single sentence. Takes a &str, returns an owned String.
    pub fn normalize(&self, text: &str) -> String {
        let mut out        = String::with_capacity(text.len());
        let mut last_space = true; // swallows leading whitespace

        for c in text.chars() {
            let c = match c {
                '\t' | '\u{00A0}' | '\u{200B}' | '\u{FEFF}' | '\r' | '\n' => ' ',
                c if c.is_control() => ' ',
                c => c,
            };

            if c == ' ' {
                if !last_space {
                    out.push(' ');
                }
                last_space = true;
            } else {
                out.push(c);
                last_space = false;
            }
        }

        // At most one trailing space can survive the loop
        if out.ends_with(' ') {
            out.pop();
        }
        out
    }
}

impl Default for SentenceNormalizer {
    fn default() -> Self {
        Self::new()
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collapses_multiple_spaces() {
        let n = SentenceNormalizer::new();
        assert_eq!(n.normalize("hello   world"), "hello world");
    }

    #[test]
    fn test_trims_edges() {
        let n = SentenceNormalizer::new();
        assert_eq!(n.normalize("  hello world  "), "hello world");
    }

    #[test]
    fn test_replaces_unicode_spaces_and_controls() {
        let n = SentenceNormalizer::new();
        assert_eq!(n.normalize("\u{FEFF}xin\u{00A0}chào\x01bạn\r"), "xin chào bạn");
    }

    #[test]
    fn test_keeps_diacritics() {
        let n = SentenceNormalizer::new();
        assert_eq!(n.normalize("Tôi là sinh viên ."), "Tôi là sinh viên .");
    }

    #[test]
    fn test_empty_string() {
        let n = SentenceNormalizer::new();
        assert_eq!(n.normalize(""), "");
        assert_eq!(n.normalize(" \t "), "");
    }
}
