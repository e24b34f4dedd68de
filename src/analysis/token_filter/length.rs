//! Minimum term length filter.

use crate::analysis::token::{Token, TokenStream};
use crate::analysis::token_filter::Filter;
use crate::error::Result;

/// A filter that drops tokens shorter than a minimum number of characters.
#[derive(Clone, Debug)]
pub struct MinLengthFilter {
    min_length: usize,
}

impl MinLengthFilter {
    /// Create a new minimum length filter.
    pub fn new(min_length: usize) -> Self {
        MinLengthFilter { min_length }
    }

    /// Get the minimum length.
    pub fn min_length(&self) -> usize {
        self.min_length
    }
}

impl Filter for MinLengthFilter {
    fn filter(&self, tokens: TokenStream) -> Result<TokenStream> {
        let min_length = self.min_length.max(1);
        let filtered_tokens: Vec<Token> = tokens
            .filter(|token| token.char_len() >= min_length)
            .collect();

        Ok(Box::new(filtered_tokens.into_iter()))
    }

    fn name(&self) -> &'static str {
        "min_length"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_min_length_filter() {
        let filter = MinLengthFilter::new(3);
        let tokens = vec![Token::new("a", 0), Token::new("ab", 1), Token::new("abc", 2)];

        let result: Vec<Token> = filter.filter(Box::new(tokens.into_iter())).unwrap().collect();

        assert_eq!(result.len(), 1);
        assert_eq!(result[0].text, "abc");
    }

    #[test]
    fn test_zero_still_drops_empty_tokens() {
        let filter = MinLengthFilter::new(0);
        let tokens = vec![Token::new("", 0), Token::new("x", 1)];

        let result: Vec<Token> = filter.filter(Box::new(tokens.into_iter())).unwrap().collect();
        assert_eq!(result.len(), 1);
    }
}
