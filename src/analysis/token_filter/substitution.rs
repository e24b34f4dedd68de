//! Substitution filter implementation.
//!
//! Replaces whole terms using a fixed mapping, e.g. to fold spelling
//! variants onto one term. A term mapped to the empty string is dropped.

use std::collections::HashMap;

use crate::analysis::token::{Token, TokenStream};
use crate::analysis::token_filter::Filter;
use crate::error::Result;

/// A filter that rewrites terms through a substitution table.
#[derive(Clone, Debug, Default)]
pub struct SubstitutionFilter {
    substitutions: HashMap<String, String>,
}

impl SubstitutionFilter {
    /// Create a new substitution filter.
    pub fn new(substitutions: HashMap<String, String>) -> Self {
        SubstitutionFilter { substitutions }
    }

    /// Check whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.substitutions.is_empty()
    }
}

impl Filter for SubstitutionFilter {
    fn filter(&self, tokens: TokenStream) -> Result<TokenStream> {
        if self.substitutions.is_empty() {
            return Ok(tokens);
        }

        let filtered_tokens: Vec<Token> = tokens
            .filter_map(|token| match self.substitutions.get(&token.text) {
                Some(replacement) if replacement.is_empty() => None,
                Some(replacement) => Some(token.with_text(replacement.clone())),
                None => Some(token),
            })
            .collect();

        Ok(Box::new(filtered_tokens.into_iter()))
    }

    fn name(&self) -> &'static str {
        "substitution"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_substitution_filter() {
        let mut table = HashMap::new();
        table.insert("colour".to_string(), "color".to_string());
        table.insert("um".to_string(), String::new());
        let filter = SubstitutionFilter::new(table);

        let tokens = vec![Token::new("colour", 0), Token::new("um", 1), Token::new("red", 2)];
        let result: Vec<Token> = filter.filter(Box::new(tokens.into_iter())).unwrap().collect();

        assert_eq!(result.len(), 2);
        assert_eq!(result[0].text, "color");
        assert_eq!(result[1].text, "red");
        assert_eq!(result[1].position, 2);
    }
}
