//! Text analysis: tokenization and term normalization.
//!
//! Indexed text and query text pass through the same [`PipelineAnalyzer`],
//! built from the index's [`AnalysisProperty`] list:
//!
//! 1. [`TermCharTokenizer`](tokenizer::term_char::TermCharTokenizer) splits text into terms
//! 2. lowercasing
//! 3. whole-term substitutions
//! 4. minimum term length
//! 5. stop words
//! 6. distinct-term limit

pub mod analyzer;
pub mod property;
pub mod token;
pub mod token_filter;
pub mod tokenizer;

pub use analyzer::{Analyzer, PipelineAnalyzer};
pub use property::{AnalysisProperty, AnalysisSettings};
pub use token::{Token, TokenStream};
