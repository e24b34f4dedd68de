//! Sentence salience.
//!
//! Each content word (lowercased, not a stop word) is weighted by its
//! frequency across the whole text times `ln(1 + S / sf)`, where `S` is the
//! number of sentences and `sf` the number of sentences containing the word.
//! A sentence scores the sum of its distinct word weights divided by the
//! square root of its word count, then receives a bonus for appearing early
//! in the text and another for opening its paragraph.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use ahash::AHashMap;
use unicode_segmentation::UnicodeSegmentation;

use crate::analysis::token_filter::stop::StopFilter;

static STOP_WORDS: LazyLock<StopFilter> = LazyLock::new(StopFilter::english);

/// Weight of the earliest sentence relative to the last one, minus one.
const POSITION_BONUS: f32 = 0.5;

/// Multiplier for the first sentence of a paragraph.
const LEAD_BONUS: f32 = 1.25;

/// Lowercased content words of a sentence, in order.
pub fn content_words(sentence: &str) -> Vec<String> {
    sentence
        .unicode_words()
        .map(str::to_lowercase)
        .filter(|word| !STOP_WORDS.is_stop_word(word))
        .collect()
}

/// A sentence as seen by the scorer.
#[derive(Debug, Clone, Copy)]
pub struct Scored<'a> {
    pub text: &'a str,
    pub leads_paragraph: bool,
}

/// Score every sentence. The result is parallel to the input.
pub fn score_sentences(sentences: &[Scored<'_>]) -> Vec<f32> {
    let words: Vec<Vec<String>> = sentences.iter().map(|s| content_words(s.text)).collect();

    let mut frequency: AHashMap<&str, u32> = AHashMap::new();
    let mut sentence_frequency: AHashMap<&str, u32> = AHashMap::new();
    for sentence_words in &words {
        let mut seen = BTreeSet::new();
        for word in sentence_words {
            *frequency.entry(word.as_str()).or_insert(0) += 1;
            if seen.insert(word.as_str()) {
                *sentence_frequency.entry(word.as_str()).or_insert(0) += 1;
            }
        }
    }

    let total = sentences.len() as f32;
    let weight = |word: &str| -> f32 {
        let tf = frequency.get(word).copied().unwrap_or(0) as f32;
        let sf = sentence_frequency.get(word).copied().unwrap_or(0);
        if sf == 0 {
            return 0.0;
        }
        tf * (1.0 + total / sf as f32).ln()
    };

    sentences
        .iter()
        .zip(&words)
        .enumerate()
        .map(|(position, (sentence, sentence_words))| {
            if sentence_words.is_empty() {
                return 0.0;
            }

            // Sorted iteration keeps the float sum identical between runs.
            let distinct: BTreeSet<&str> = sentence_words.iter().map(String::as_str).collect();
            let base = distinct.iter().map(|word| weight(word)).sum::<f32>()
                / (sentence_words.len() as f32).sqrt();

            let position_bonus = 1.0 + POSITION_BONUS * (1.0 - position as f32 / total);
            let lead_bonus = if sentence.leads_paragraph { LEAD_BONUS } else { 1.0 };

            base * position_bonus * lead_bonus
        })
        .collect()
}

/// 1-based rank of each score: highest first, ties by earlier position.
pub fn rank_orders(scores: &[f32]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| scores[b].total_cmp(&scores[a]).then(a.cmp(&b)));

    let mut ranks = vec![0; scores.len()];
    for (rank, index) in order.into_iter().enumerate() {
        ranks[index] = rank + 1;
    }
    ranks
}
