//! Term-character tokenizer.
//!
//! A term is a run of alphanumeric characters, extended by any extra
//! characters the index allows. Three character sets shape a term:
//!
//! - `term_chars` may appear anywhere inside a term
//! - `start_term_chars`, when set, replaces `term_chars` for the first character
//! - `end_term_chars`, when set, replaces `term_chars` for the last character
//!
//! Characters that are allowed only at an edge split the run when they show up
//! in the middle.
//!
//! # Examples
//!
//! ```
//! use tessera::analysis::tokenizer::Tokenizer;
//! use tessera::analysis::tokenizer::term_char::TermCharTokenizer;
//!
//! let tokenizer = TermCharTokenizer::new().with_term_chars("-");
//! let tokens: Vec<_> = tokenizer.tokenize("state-of-the-art, again").unwrap().collect();
//!
//! assert_eq!(tokens[0].text, "state-of-the-art");
//! assert_eq!(tokens[1].text, "again");
//! ```

use crate::analysis::token::{Token, TokenStream};
use crate::analysis::tokenizer::Tokenizer;
use crate::error::Result;

/// A tokenizer driven by configurable term character sets.
#[derive(Clone, Debug, Default)]
pub struct TermCharTokenizer {
    term_chars: Vec<char>,
    start_term_chars: Vec<char>,
    end_term_chars: Vec<char>,
}

impl TermCharTokenizer {
    /// Create a tokenizer that accepts alphanumeric characters only.
    pub fn new() -> Self {
        Self::default()
    }

    /// Allow additional characters anywhere within a term.
    pub fn with_term_chars(mut self, chars: &str) -> Self {
        self.term_chars = chars.chars().collect();
        self
    }

    /// Characters allowed as the first character of a term.
    pub fn with_start_term_chars(mut self, chars: &str) -> Self {
        self.start_term_chars = chars.chars().collect();
        self
    }

    /// Characters allowed as the last character of a term.
    pub fn with_end_term_chars(mut self, chars: &str) -> Self {
        self.end_term_chars = chars.chars().collect();
        self
    }

    fn is_inner(&self, c: char) -> bool {
        c.is_alphanumeric() || self.term_chars.contains(&c)
    }

    fn is_start(&self, c: char) -> bool {
        if c.is_alphanumeric() {
            return true;
        }
        if self.start_term_chars.is_empty() {
            self.term_chars.contains(&c)
        } else {
            self.start_term_chars.contains(&c)
        }
    }

    fn is_end(&self, c: char) -> bool {
        if c.is_alphanumeric() {
            return true;
        }
        if self.end_term_chars.is_empty() {
            self.term_chars.contains(&c)
        } else {
            self.end_term_chars.contains(&c)
        }
    }

    fn is_candidate(&self, c: char) -> bool {
        self.is_inner(c) || self.is_start(c) || self.is_end(c)
    }

    /// Cut a candidate run into terms, appending `(start, end)` byte ranges.
    fn split_run(&self, run: &[(usize, char)], spans: &mut Vec<(usize, usize)>) {
        let mut lo = 0;
        let mut hi = run.len();

        while lo < hi && !self.is_start(run[lo].1) {
            lo += 1;
        }
        while hi > lo && !self.is_end(run[hi - 1].1) {
            hi -= 1;
        }
        if lo >= hi {
            return;
        }

        let trimmed = &run[lo..hi];
        // Edge-only characters may repeat at either end ("##tag", "c++").
        let core_start = trimmed
            .iter()
            .position(|&(_, c)| self.is_inner(c))
            .unwrap_or(trimmed.len());
        let core_end = trimmed
            .iter()
            .rposition(|&(_, c)| self.is_inner(c))
            .map_or(0, |i| i + 1);
        let interior_break =
            (core_start..core_end).find(|&i| !self.is_inner(trimmed[i].1));

        match interior_break {
            Some(i) => {
                self.split_run(&trimmed[..i], spans);
                self.split_run(&trimmed[i + 1..], spans);
            }
            None => {
                let start = trimmed[0].0;
                let (last_offset, last_char) = trimmed[trimmed.len() - 1];
                spans.push((start, last_offset + last_char.len_utf8()));
            }
        }
    }
}

impl Tokenizer for TermCharTokenizer {
    fn tokenize(&self, text: &str) -> Result<TokenStream> {
        let mut spans = Vec::new();
        let mut run: Vec<(usize, char)> = Vec::new();

        for (offset, c) in text.char_indices() {
            if self.is_candidate(c) {
                run.push((offset, c));
            } else if !run.is_empty() {
                self.split_run(&run, &mut spans);
                run.clear();
            }
        }
        if !run.is_empty() {
            self.split_run(&run, &mut spans);
        }

        let tokens: Vec<Token> = spans
            .into_iter()
            .enumerate()
            .map(|(position, (start, end))| {
                Token::with_offsets(&text[start..end], position, start, end)
            })
            .collect();

        Ok(Box::new(tokens.into_iter()))
    }

    fn name(&self) -> &'static str {
        "term_char"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(tokenizer: &TermCharTokenizer, text: &str) -> Vec<String> {
        tokenizer
            .tokenize(text)
            .unwrap()
            .map(|token| token.text)
            .collect()
    }

    #[test]
    fn test_alphanumeric_runs() {
        let tokenizer = TermCharTokenizer::new();
        assert_eq!(
            texts(&tokenizer, "Hello, world! Rust 2024 café"),
            vec!["Hello", "world", "Rust", "2024", "café"]
        );
    }

    #[test]
    fn test_offsets_and_positions() {
        let tokenizer = TermCharTokenizer::new();
        let tokens: Vec<_> = tokenizer.tokenize("ab  cd").unwrap().collect();

        assert_eq!(tokens[1].position, 1);
        assert_eq!(tokens[1].start_offset, 4);
        assert_eq!(tokens[1].end_offset, 6);
    }

    #[test]
    fn test_term_chars_extend_terms() {
        let tokenizer = TermCharTokenizer::new().with_term_chars("-'");
        assert_eq!(
            texts(&tokenizer, "don't re-index -edge-"),
            vec!["don't", "re-index", "-edge-"]
        );
    }

    #[test]
    fn test_start_and_end_chars_only_at_edges() {
        let tokenizer = TermCharTokenizer::new()
            .with_start_term_chars("#")
            .with_end_term_chars("+");

        assert_eq!(texts(&tokenizer, "#rust c+"), vec!["#rust", "c+"]);
        assert_eq!(texts(&tokenizer, "a#b"), vec!["a", "b"]);
        assert_eq!(texts(&tokenizer, "+lead trail#"), vec!["lead", "trail"]);
    }

    #[test]
    fn test_repeated_edge_chars() {
        let tokenizer = TermCharTokenizer::new()
            .with_start_term_chars("#")
            .with_end_term_chars("+");

        assert_eq!(texts(&tokenizer, "c++ ##tag"), vec!["c++", "##tag"]);
        assert_eq!(texts(&tokenizer, "c++d"), vec!["c", "d"]);
    }

    #[test]
    fn test_empty_and_punctuation_only() {
        let tokenizer = TermCharTokenizer::new();
        assert!(texts(&tokenizer, "").is_empty());
        assert!(texts(&tokenizer, "... !!! ---").is_empty());
    }
}
