//! Paragraph and sentence segmentation.
//!
//! Paragraphs are separated by one or more blank lines. Sentences follow the
//! Unicode sentence boundary rules (UAX #29), which already keep decimal
//! numbers such as `3.14` together; breaks that UAX #29 places after a
//! common abbreviation (`Dr.`, `e.g.`) or a single-letter initial are
//! removed.

use std::collections::HashSet;
use std::ops::Range;
use std::sync::LazyLock;

use regex::Regex;
use unicode_segmentation::UnicodeSegmentation;

static PARAGRAPH_BREAK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\r?\n[ \t]*\r?\n\s*").expect("paragraph break pattern is valid"));

const ABBREVIATIONS: &[&str] = &[
    "mr", "mrs", "ms", "dr", "prof", "sr", "jr", "st", "vs", "etc", "inc", "ltd", "co", "e.g",
    "i.e", "cf", "fig", "approx", "dept", "est", "jan", "feb", "mar", "apr", "jun", "jul",
    "aug", "sep", "sept", "oct", "nov", "dec",
];

static ABBREVIATION_SET: LazyLock<HashSet<&'static str>> =
    LazyLock::new(|| ABBREVIATIONS.iter().copied().collect());

/// A segment of the source text, as a byte range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub range: Range<usize>,
}

impl Segment {
    pub fn text<'a>(&self, source: &'a str) -> &'a str {
        &source[self.range.clone()]
    }
}

/// Split text into paragraphs, trimmed, skipping blank ones.
pub fn paragraphs(text: &str) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut start = 0;

    for found in PARAGRAPH_BREAK.find_iter(text) {
        push_trimmed(text, start..found.start(), &mut segments);
        start = found.end();
    }
    push_trimmed(text, start..text.len(), &mut segments);

    segments
}

/// Split one paragraph, given as a range of `text`, into sentences.
pub fn sentences(text: &str, paragraph: &Range<usize>) -> Vec<Segment> {
    // Line breaks inside a paragraph are wrapping, not sentence ends. Both
    // replacements are one byte, so offsets carry over.
    let slice: String = text[paragraph.clone()]
        .chars()
        .map(|c| if c == '\n' || c == '\r' { ' ' } else { c })
        .collect();
    let mut segments: Vec<Segment> = Vec::new();
    let mut pending: Option<Range<usize>> = None;

    for (offset, piece) in slice.split_sentence_bound_indices() {
        let range = paragraph.start + offset..paragraph.start + offset + piece.len();
        let current = match pending.take() {
            Some(open) => open.start..range.end,
            None => range,
        };

        if continues_after(&text[current.clone()]) {
            pending = Some(current);
        } else {
            push_trimmed(text, current, &mut segments);
        }
    }
    if let Some(open) = pending {
        push_trimmed(text, open, &mut segments);
    }

    segments
}

/// Whether a candidate sentence ends in something that does not end a
/// sentence: an abbreviation or a single-letter initial.
fn continues_after(candidate: &str) -> bool {
    let trimmed = candidate.trim_end();
    let Some(without_dot) = trimmed.strip_suffix('.') else {
        return false;
    };

    let last_word = without_dot
        .rsplit(|c: char| c.is_whitespace() || c == '(' || c == '"')
        .next()
        .unwrap_or_default();

    if last_word.is_empty() {
        return false;
    }

    let mut chars = last_word.chars();
    let single_initial = matches!((chars.next(), chars.next()), (Some(c), None) if c.is_uppercase());

    single_initial || ABBREVIATION_SET.contains(last_word.to_lowercase().as_str())
}

fn push_trimmed(text: &str, range: Range<usize>, segments: &mut Vec<Segment>) {
    let slice = &text[range.clone()];
    let trimmed_start = slice.len() - slice.trim_start().len();
    let trimmed = slice.trim();
    if trimmed.is_empty() {
        return;
    }

    let start = range.start + trimmed_start;
    segments.push(Segment {
        range: start..start + trimmed.len(),
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paragraph_texts(text: &str) -> Vec<&str> {
        paragraphs(text).iter().map(|s| s.text(text)).collect()
    }

    fn sentence_texts(text: &str) -> Vec<&str> {
        let whole = 0..text.len();
        sentences(text, &whole).iter().map(|s| s.text(text)).collect()
    }

    #[test]
    fn test_paragraphs_split_on_blank_lines() {
        let text = "First line.\nStill first.\n\nSecond.\n   \n\n  Third.  ";
        assert_eq!(
            paragraph_texts(text),
            vec!["First line.\nStill first.", "Second.", "Third."]
        );
        assert!(paragraphs("   \n\n ").is_empty());
    }

    #[test]
    fn test_sentences_split_on_terminal_punctuation() {
        assert_eq!(
            sentence_texts("It rained. Did it stop? Yes!"),
            vec!["It rained.", "Did it stop?", "Yes!"]
        );
    }

    #[test]
    fn test_sentences_keep_abbreviations_and_decimals() {
        assert_eq!(
            sentence_texts("Dr. Smith paid 3.50 dollars. He left."),
            vec!["Dr. Smith paid 3.50 dollars.", "He left."]
        );
        assert_eq!(
            sentence_texts("Written by J. R. Tolkien. Read it."),
            vec!["Written by J. R. Tolkien.", "Read it."]
        );
    }

    #[test]
    fn test_wrapped_lines_stay_one_sentence() {
        assert_eq!(
            sentence_texts("A sentence that\nwraps. Another one."),
            vec!["A sentence that\nwraps.", "Another one."]
        );
    }

    #[test]
    fn test_trailing_abbreviation_closes_paragraph() {
        assert_eq!(sentence_texts("Apples, pears, etc."), vec!["Apples, pears, etc."]);
    }
}
