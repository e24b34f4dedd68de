//! Analysis properties that govern how an index tokenizes text.
//!
//! Properties are fixed when an index is created. They are stored as a list
//! of [`AnalysisProperty`] values (so unknown keys survive a round trip) and
//! resolved into [`AnalysisSettings`] when an analyzer is built. When the same
//! option appears twice the later value wins.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

/// Default minimum term length, in characters.
pub const DEFAULT_MIN_TERM_LENGTH: usize = 1;

/// Default cap on distinct terms per document.
pub const DEFAULT_MAX_TERMS: usize = 2000;

/// A single analysis option.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "value")]
pub enum AnalysisProperty {
    /// Terms shorter than this many characters are dropped (default 1).
    MinTermLength(usize),

    /// Terms that are never indexed (default: none).
    StopWords(BTreeSet<String>),

    /// Whole-term replacements applied after lowercasing.
    Substitutions(BTreeMap<String, String>),

    /// Maximum distinct terms indexed per document (default 2000, 0 = unlimited).
    MaxTerms(usize),

    /// Record term positions so phrase queries match exact adjacency.
    ProximityIndexing(bool),

    /// Additional characters allowed within a term.
    TermCharacters(String),

    /// Overrides `TermCharacters` for the first character of a term.
    StartTermCharacters(String),

    /// Overrides `TermCharacters` for the last character of a term.
    EndTermCharacters(String),

    /// An option this version does not interpret; preserved as-is.
    Other(String, serde_json::Value),
}

impl AnalysisProperty {
    /// The option key, as used in configuration files.
    pub fn key(&self) -> &str {
        match self {
            AnalysisProperty::MinTermLength(_) => "min_term_length",
            AnalysisProperty::StopWords(_) => "stop_words",
            AnalysisProperty::Substitutions(_) => "substitutions",
            AnalysisProperty::MaxTerms(_) => "max_terms",
            AnalysisProperty::ProximityIndexing(_) => "proximity_indexing",
            AnalysisProperty::TermCharacters(_) => "term_characters",
            AnalysisProperty::StartTermCharacters(_) => "start_term_characters",
            AnalysisProperty::EndTermCharacters(_) => "end_term_characters",
            AnalysisProperty::Other(key, _) => key,
        }
    }
}

/// Analysis options resolved from a property list, with defaults filled in.
#[derive(Clone, Debug, PartialEq)]
pub struct AnalysisSettings {
    pub min_term_length: usize,
    pub stop_words: BTreeSet<String>,
    pub substitutions: BTreeMap<String, String>,
    pub max_terms: usize,
    pub proximity_indexing: bool,
    pub term_characters: String,
    pub start_term_characters: String,
    pub end_term_characters: String,
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        AnalysisSettings {
            min_term_length: DEFAULT_MIN_TERM_LENGTH,
            stop_words: BTreeSet::new(),
            substitutions: BTreeMap::new(),
            max_terms: DEFAULT_MAX_TERMS,
            proximity_indexing: false,
            term_characters: String::new(),
            start_term_characters: String::new(),
            end_term_characters: String::new(),
        }
    }
}

impl AnalysisSettings {
    /// Resolve a property list. Unknown options are ignored.
    pub fn from_properties(properties: &[AnalysisProperty]) -> Self {
        let mut settings = AnalysisSettings::default();

        for property in properties {
            match property {
                AnalysisProperty::MinTermLength(length) => settings.min_term_length = *length,
                AnalysisProperty::StopWords(words) => {
                    settings.stop_words = words.iter().map(|w| w.to_lowercase()).collect()
                }
                AnalysisProperty::Substitutions(table) => settings.substitutions = table.clone(),
                AnalysisProperty::MaxTerms(max) => settings.max_terms = *max,
                AnalysisProperty::ProximityIndexing(enabled) => {
                    settings.proximity_indexing = *enabled
                }
                AnalysisProperty::TermCharacters(chars) => settings.term_characters = chars.clone(),
                AnalysisProperty::StartTermCharacters(chars) => {
                    settings.start_term_characters = chars.clone()
                }
                AnalysisProperty::EndTermCharacters(chars) => {
                    settings.end_term_characters = chars.clone()
                }
                AnalysisProperty::Other(key, _) => {
                    log::debug!("Ignoring unknown analysis property '{key}'");
                }
            }
        }

        settings
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = AnalysisSettings::from_properties(&[]);
        assert_eq!(settings.min_term_length, 1);
        assert_eq!(settings.max_terms, 2000);
        assert!(settings.stop_words.is_empty());
        assert!(!settings.proximity_indexing);
    }

    #[test]
    fn test_later_value_wins() {
        let settings = AnalysisSettings::from_properties(&[
            AnalysisProperty::MaxTerms(10),
            AnalysisProperty::Other("x_custom".to_string(), serde_json::json!({"a": 1})),
            AnalysisProperty::MaxTerms(0),
        ]);
        assert_eq!(settings.max_terms, 0);
    }

    #[test]
    fn test_json_round_trip_keeps_unknown_keys() {
        let properties = vec![
            AnalysisProperty::StopWords(["The".to_string()].into_iter().collect()),
            AnalysisProperty::Other("x_custom".to_string(), serde_json::json!([1, 2])),
        ];

        let json = serde_json::to_string(&properties).unwrap();
        let decoded: Vec<AnalysisProperty> = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, properties);
        assert_eq!(decoded[1].key(), "x_custom");

        let settings = AnalysisSettings::from_properties(&decoded);
        assert!(settings.stop_words.contains("the"));
    }
}
