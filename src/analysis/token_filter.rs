//! Token filters transform or drop tokens produced by a tokenizer.
//!
//! Filters are applied in the order they were added to an analyzer. The index
//! analyzer applies them as lowercase, substitution, minimum length, stop
//! words, then the distinct-term limit.

use crate::analysis::token::TokenStream;
use crate::error::Result;

pub mod length;
pub mod limit;
pub mod lowercase;
pub mod stop;
pub mod substitution;

/// Trait for filters that transform token streams.
pub trait Filter: Send + Sync {
    /// Apply this filter to a token stream.
    fn filter(&self, tokens: TokenStream) -> Result<TokenStream>;

    /// Get the name of this filter (for debugging and configuration).
    fn name(&self) -> &'static str;
}
