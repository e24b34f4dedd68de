//! Analyzers combine a tokenizer with a chain of token filters.

use std::sync::Arc;

use crate::analysis::property::AnalysisSettings;
use crate::analysis::token::TokenStream;
use crate::analysis::token_filter::Filter;
use crate::analysis::token_filter::length::MinLengthFilter;
use crate::analysis::token_filter::limit::LimitFilter;
use crate::analysis::token_filter::lowercase::LowercaseFilter;
use crate::analysis::token_filter::stop::StopFilter;
use crate::analysis::token_filter::substitution::SubstitutionFilter;
use crate::analysis::tokenizer::Tokenizer;
use crate::analysis::tokenizer::term_char::TermCharTokenizer;
use crate::error::Result;

/// Trait for analyzers that convert text into processed tokens.
pub trait Analyzer: Send + Sync {
    /// Analyze the given text and return a stream of tokens.
    fn analyze(&self, text: &str) -> Result<TokenStream>;

    /// Get the name of this analyzer (for debugging and configuration).
    fn name(&self) -> &'static str;
}

/// A configurable analyzer that combines a tokenizer with a chain of filters.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use tessera::analysis::analyzer::{Analyzer, PipelineAnalyzer};
/// use tessera::analysis::token_filter::lowercase::LowercaseFilter;
/// use tessera::analysis::token_filter::stop::StopFilter;
/// use tessera::analysis::tokenizer::term_char::TermCharTokenizer;
///
/// let analyzer = PipelineAnalyzer::new(Arc::new(TermCharTokenizer::new()))
///     .add_filter(Arc::new(LowercaseFilter::new()))
///     .add_filter(Arc::new(StopFilter::from_words(vec!["the", "and"])));
///
/// let tokens: Vec<_> = analyzer.analyze("Hello THE world AND test").unwrap().collect();
/// assert_eq!(tokens.len(), 3);
/// assert_eq!(tokens[0].text, "hello");
/// ```
#[derive(Clone)]
pub struct PipelineAnalyzer {
    tokenizer: Arc<dyn Tokenizer>,
    filters: Vec<Arc<dyn Filter>>,
}

impl PipelineAnalyzer {
    /// Create a new pipeline analyzer with the given tokenizer.
    pub fn new(tokenizer: Arc<dyn Tokenizer>) -> Self {
        PipelineAnalyzer {
            tokenizer,
            filters: Vec::new(),
        }
    }

    /// Build the analyzer an index uses for both documents and queries.
    pub fn from_settings(settings: &AnalysisSettings) -> Self {
        let tokenizer = TermCharTokenizer::new()
            .with_term_chars(&settings.term_characters)
            .with_start_term_chars(&settings.start_term_characters)
            .with_end_term_chars(&settings.end_term_characters);

        let substitutions = settings
            .substitutions
            .iter()
            .map(|(from, to)| (from.to_lowercase(), to.to_lowercase()))
            .collect();

        PipelineAnalyzer::new(Arc::new(tokenizer))
            .add_filter(Arc::new(LowercaseFilter::new()))
            .add_filter(Arc::new(SubstitutionFilter::new(substitutions)))
            .add_filter(Arc::new(MinLengthFilter::new(settings.min_term_length)))
            .add_filter(Arc::new(StopFilter::from_words(
                settings.stop_words.iter().cloned(),
            )))
            .add_filter(Arc::new(LimitFilter::new(settings.max_terms)))
    }

    /// Add a filter to the pipeline.
    pub fn add_filter(mut self, filter: Arc<dyn Filter>) -> Self {
        self.filters.push(filter);
        self
    }

    /// Get the tokenizer used by this analyzer.
    pub fn tokenizer(&self) -> &Arc<dyn Tokenizer> {
        &self.tokenizer
    }

    /// Get the filters used by this analyzer.
    pub fn filters(&self) -> &[Arc<dyn Filter>] {
        &self.filters
    }
}

impl std::fmt::Debug for PipelineAnalyzer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineAnalyzer")
            .field("tokenizer", &self.tokenizer.name())
            .field(
                "filters",
                &self.filters.iter().map(|f| f.name()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl Analyzer for PipelineAnalyzer {
    fn analyze(&self, text: &str) -> Result<TokenStream> {
        let mut tokens = self.tokenizer.tokenize(text)?;

        for filter in &self.filters {
            tokens = filter.filter(tokens)?;
        }

        Ok(tokens)
    }

    fn name(&self) -> &'static str {
        "pipeline"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::property::AnalysisProperty;

    fn analyze(settings: &AnalysisSettings, text: &str) -> Vec<String> {
        PipelineAnalyzer::from_settings(settings)
            .analyze(text)
            .unwrap()
            .map(|t| t.text)
            .collect()
    }

    #[test]
    fn test_default_settings_lowercase_everything() {
        let settings = AnalysisSettings::default();
        assert_eq!(
            analyze(&settings, "The Quick, brown FOX."),
            vec!["the", "quick", "brown", "fox"]
        );
    }

    #[test]
    fn test_filters_apply_in_order() {
        let settings = AnalysisSettings::from_properties(&[
            AnalysisProperty::MinTermLength(3),
            AnalysisProperty::StopWords(["the".to_string()].into_iter().collect()),
            AnalysisProperty::Substitutions(
                [("Colour".to_string(), "color".to_string())]
                    .into_iter()
                    .collect(),
            ),
            AnalysisProperty::MaxTerms(2),
        ]);

        // "of" is too short, "the" is a stop word, "colour" is substituted,
        // and "shade" is a third distinct term.
        assert_eq!(
            analyze(&settings, "The COLOUR of red, colour, shade"),
            vec!["color", "red", "color"]
        );
    }

    #[test]
    fn test_positions_survive_filtering() {
        let settings = AnalysisSettings::from_properties(&[AnalysisProperty::StopWords(
            ["the".to_string()].into_iter().collect(),
        )]);
        let tokens: Vec<_> = PipelineAnalyzer::from_settings(&settings)
            .analyze("the quick fox")
            .unwrap()
            .collect();

        assert_eq!(tokens[0].position, 1);
        assert_eq!(tokens[1].position, 2);
    }
}
