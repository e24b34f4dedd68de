//! Distinct-term limit filter.

use std::collections::HashSet;

use crate::analysis::token::{Token, TokenStream};
use crate::analysis::token_filter::Filter;
use crate::error::Result;

/// A filter that keeps only the first `limit` distinct terms of a stream.
///
/// Every occurrence of an admitted term is kept; terms first seen after the
/// limit is reached are dropped. A limit of 0 means unlimited.
#[derive(Clone, Debug)]
pub struct LimitFilter {
    limit: usize,
}

impl LimitFilter {
    /// Create a new limit filter with the given limit.
    pub fn new(limit: usize) -> Self {
        LimitFilter { limit }
    }

    /// Get the limit.
    pub fn limit(&self) -> usize {
        self.limit
    }
}

impl Filter for LimitFilter {
    fn filter(&self, tokens: TokenStream) -> Result<TokenStream> {
        if self.limit == 0 {
            return Ok(tokens);
        }

        let mut admitted: HashSet<String> = HashSet::new();
        let limited_tokens: Vec<Token> = tokens
            .filter(|token| {
                if admitted.contains(&token.text) {
                    true
                } else if admitted.len() < self.limit {
                    admitted.insert(token.text.clone());
                    true
                } else {
                    false
                }
            })
            .collect();

        Ok(Box::new(limited_tokens.into_iter()))
    }

    fn name(&self) -> &'static str {
        "limit"
    }
}
