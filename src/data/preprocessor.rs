// ============================================================
// Layer 4 — Text Preprocessor
// ============================================================
// Turns one raw sentence from the corpus into word tokens.
//
// Two stages:
//   1. clean()    — our own character-level cleanup. Corpus
//                   sentences are scraped user text and carry
//                   tabs, non-breaking spaces, zero-width
//                   spaces and stray control characters.
//   2. tokenize() — HuggingFace `tokenizers` components:
//                   BertNormalizer (lowercase, strip control
//                   chars, space out CJK characters) followed by
//                   the Whitespace pre-tokenizer, which splits on
//                   whitespace and separates punctuation runs.
//
// The vocabulary is built from these tokens, so the same
// Preprocessor must be used at train and predict time.
//
// Reference: tokenizers crate documentation (normalizers,
//            pre_tokenizers)

use anyhow::Result;
use tokenizers::normalizers::bert::BertNormalizer;
use tokenizers::pre_tokenizers::whitespace::Whitespace;
use tokenizers::{
    NormalizedString, Normalizer, OffsetReferential, OffsetType, PreTokenizedString,
    PreTokenizer,
};

pub struct Preprocessor {
    normalizer:    BertNormalizer,
    pre_tokenizer: Whitespace,
}

impl Preprocessor {
    /// Create a new Preprocessor with lowercasing enabled
    pub fn new() -> Self {
        Self {
            // clean_text, handle_chinese_chars, strip_accents, lowercase
            normalizer:    BertNormalizer::new(true, true, None, true),
            pre_tokenizer: Whitespace::default(),
        }
    }

    /// Clean a raw sentence: map odd whitespace to plain spaces,
    /// drop control characters and collapse runs of spaces.
    pub fn clean(&self, text: &str) -> String {
        let mapped: String = text
            .chars()
            .map(|c| match c {
                '\t' | '\r' | '\n' => ' ',
                // Non-breaking space, zero-width space, byte order mark
                '\u{00A0}' | '\u{200B}' | '\u{FEFF}' => ' ',
                c if c.is_control() => ' ',
                c => c,
            })
            .collect();

        mapped.split_whitespace().collect::<Vec<_>>().join(" ")
    }

    /// Clean, normalise and split a sentence into word tokens.
    pub fn tokenize(&self, text: &str) -> Result<Vec<String>> {
        let cleaned = self.clean(text);

        let mut normalized = NormalizedString::from(cleaned.as_str());
        self.normalizer
            .normalize(&mut normalized)
            .map_err(|e| anyhow::anyhow!("Normalisation error: {e}"))?;

        let mut pretokenized = PreTokenizedString::from(normalized);
        self.pre_tokenizer
            .pre_tokenize(&mut pretokenized)
            .map_err(|e| anyhow::anyhow!("Pre-tokenisation error: {e}"))?;

        Ok(pretokenized
            .get_splits(OffsetReferential::Original, OffsetType::Byte)
            .into_iter()
            .map(|(token, _, _)| token.to_string())
            .collect())
    }
}

/// Implement Default so Preprocessor can be created with Preprocessor::default()
impl Default for Preprocessor {
    fn default() -> Self {
        Self::new()
    }
}
