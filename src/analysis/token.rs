//! Token types for text analysis.
//!
//! A [`Token`] is the unit that flows through the analysis pipeline: the
//! tokenizer produces them from raw text and each filter may rewrite or drop
//! them. Positions are assigned by the tokenizer and survive filtering, so a
//! dropped stop word leaves a gap that phrase matching can see.
//!
//! # Examples
//!
//! ```
//! use tessera::analysis::token::Token;
//!
//! let token = Token::with_offsets("world", 1, 6, 11);
//! assert_eq!(token.text, "world");
//! assert_eq!(token.position, 1);
//! assert_eq!(token.start_offset, 6);
//! ```

use serde::{Deserialize, Serialize};

/// A single unit of text after tokenization.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    /// The text content of the token
    pub text: String,

    /// The position of the token in the original token stream (0-based)
    pub position: usize,

    /// The byte offset where this token starts in the original text
    pub start_offset: usize,

    /// The byte offset where this token ends in the original text
    pub end_offset: usize,
}

impl Token {
    /// Create a new token without offsets.
    pub fn new<S: Into<String>>(text: S, position: usize) -> Self {
        let text = text.into();
        let end_offset = text.len();
        Token {
            text,
            position,
            start_offset: 0,
            end_offset,
        }
    }

    /// Create a new token with byte offsets into the source text.
    pub fn with_offsets<S: Into<String>>(
        text: S,
        position: usize,
        start_offset: usize,
        end_offset: usize,
    ) -> Self {
        Token {
            text: text.into(),
            position,
            start_offset,
            end_offset,
        }
    }

    /// Replace the token text, keeping position and offsets.
    pub fn with_text<S: Into<String>>(mut self, text: S) -> Self {
        self.text = text.into();
        self
    }

    /// Length of the token text in characters.
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }

    /// Check if the token text is empty.
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

/// A stream of tokens, as produced by tokenizers and consumed by filters.
pub type TokenStream = Box<dyn Iterator<Item = Token> + Send>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_creation() {
        let token = Token::new("hello", 0);
        assert_eq!(token.text, "hello");
        assert_eq!(token.position, 0);
        assert_eq!(token.end_offset, 5);
    }

    #[test]
    fn test_with_text_keeps_position() {
        let token = Token::with_offsets("Hello", 3, 10, 15).with_text("hello");
        assert_eq!(token.text, "hello");
        assert_eq!(token.position, 3);
        assert_eq!(token.start_offset, 10);
        assert_eq!(token.end_offset, 15);
    }

    #[test]
    fn test_char_len_counts_characters() {
        assert_eq!(Token::new("café", 0).char_len(), 4);
        assert!(Token::new("", 0).is_empty());
    }
}
