//! Tokenizer contract for turning document text into (term, position) pairs:
//! `tokenize(text, mode, &out_map, &out_length, ...)`. Grounded in a
//! `Tokenizer` trait shaped like `tokenize(&self, &str) -> Vec<Token>`,
//! generalized to three indexing modes for a dual n-gram/word scheme and to
//! emit the word-boundary key alongside ordinary terms.

use crate::types::{FeatureSet, Key, Position};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenizeMode {
    NgramIndexingOnly,
    WordIndexingOnly,
    Dual,
}

/// Output of one `tokenize` call: the normalized-text length, a term →
/// 1-origin position list map, and (when clustering is enabled) a feature
/// set.
#[derive(Debug, Clone, Default)]
pub struct TokenizeResult {
    pub length: u32,
    pub terms: HashMap<Key, Vec<Position>>,
    pub features: Option<FeatureSet>,
}

pub trait Tokenizer: Send + Sync {
    fn tokenize(&self, text: &str, mode: TokenizeMode) -> TokenizeResult;
    fn name(&self) -> &str;
}

fn push_term(terms: &mut HashMap<Key, Vec<Position>>, key: Key, position: Position) {
    terms.entry(key).or_default().push(position);
}

/// Word-indexing tokenizer: splits on Unicode whitespace, lower-cases,
/// records the word-boundary key once per token so dual indexing can find a
/// document by "any word starts here" queries.
#[derive(Debug, Clone)]
pub struct WhitespaceTokenizer {
    pub case_sensitive: bool,
}

impl Default for WhitespaceTokenizer {
    fn default() -> Self {
        Self { case_sensitive: false }
    }
}

impl Tokenizer for WhitespaceTokenizer {
    fn tokenize(&self, text: &str, mode: TokenizeMode) -> TokenizeResult {
        let mut terms: HashMap<Key, Vec<Position>> = HashMap::new();
        let mut position: Position = 1;
        for word in text.split_whitespace() {
            let normalized = if self.case_sensitive {
                word.to_string()
            } else {
                word.to_lowercase()
            };
            if matches!(mode, TokenizeMode::WordIndexingOnly | TokenizeMode::Dual) {
                push_term(&mut terms, Key::term(normalized), position);
                push_term(&mut terms, Key::WordBoundary, position);
            }
            position += 1;
        }
        TokenizeResult {
            length: position.saturating_sub(1),
            terms,
            features: None,
        }
    }

    fn name(&self) -> &str {
        "whitespace"
    }
}

/// N-gram tokenizer for n-gram-indexing mode: every `n`-character window is
/// a term positioned at its starting offset.
#[derive(Debug, Clone)]
pub struct NgramTokenizer {
    pub n: usize,
}

impl Default for NgramTokenizer {
    fn default() -> Self {
        Self { n: 2 }
    }
}

impl Tokenizer for NgramTokenizer {
    fn tokenize(&self, text: &str, mode: TokenizeMode) -> TokenizeResult {
        let mut terms: HashMap<Key, Vec<Position>> = HashMap::new();
        let chars: Vec<char> = text.chars().collect();
        if matches!(mode, TokenizeMode::NgramIndexingOnly | TokenizeMode::Dual) && chars.len() >= self.n {
            for (i, window) in chars.windows(self.n).enumerate() {
                let gram: String = window.iter().collect();
                push_term(&mut terms, Key::term(gram), (i + 1) as Position);
            }
        }
        TokenizeResult {
            length: chars.len() as u32,
            terms,
            features: None,
        }
    }

    fn name(&self) -> &str {
        "ngram"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whitespace_tokenizer_positions_are_one_origin() {
        let t = WhitespaceTokenizer::default();
        let result = t.tokenize("foo bar", TokenizeMode::WordIndexingOnly);
        assert_eq!(result.terms.get(&Key::term("foo")).unwrap(), &vec![1]);
        assert_eq!(result.terms.get(&Key::term("bar")).unwrap(), &vec![2]);
    }

    #[test]
    fn ngram_tokenizer_emits_overlapping_windows() {
        let t = NgramTokenizer { n: 2 };
        let result = t.tokenize("abcd", TokenizeMode::NgramIndexingOnly);
        assert_eq!(result.terms.len(), 3);
        assert!(result.terms.contains_key(&Key::term("ab")));
        assert!(result.terms.contains_key(&Key::term("cd")));
    }

    #[test]
    fn dual_mode_combines_both() {
        let word = WhitespaceTokenizer::default();
        let r = word.tokenize("foo bar", TokenizeMode::Dual);
        assert!(r.terms.contains_key(&Key::WordBoundary));
    }
}
