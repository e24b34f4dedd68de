//! Extractive summarization.
//!
//! A [`Summary`] splits free text into paragraphs and sentences, scores each
//! sentence for salience and ranks them. A paragraph scores the maximum of
//! its sentences' scores. Summaries pick the top-ranked items and return
//! them in their original order.
//!
//! The analysis runs once, on first access, and is cached for the lifetime
//! of the summary. It does not touch any index.
//!
//! # Example
//!
//! ```
//! use tessera::summary::Summary;
//!
//! let summary = Summary::new(
//!     "Rust is fast. Rust is safe and rust is fun.\n\nThe weather was mild.",
//! );
//! assert_eq!(summary.sentence_count(), 3);
//! assert_eq!(summary.paragraph_count(), 2);
//! assert_eq!(summary.summarize_sentences(0), "");
//! assert_eq!(
//!     summary.summarize_paragraphs(1),
//!     "Rust is fast. Rust is safe and rust is fun."
//! );
//! ```

pub mod salience;
pub mod segment;

use std::ops::Range;
use std::sync::OnceLock;

use log::debug;

use self::salience::Scored;

/// A sentence of the summarized text.
#[derive(Debug, Clone, PartialEq)]
pub struct Sentence {
    /// Position among all sentences, from 0.
    pub index: usize,
    /// Position of the containing paragraph.
    pub paragraph: usize,
    /// Byte range in the source text.
    pub range: Range<usize>,
    pub text: String,
    pub score: f32,
    /// 1 for the most salient sentence.
    pub rank_order: usize,
}

/// A paragraph of the summarized text.
#[derive(Debug, Clone, PartialEq)]
pub struct Paragraph {
    pub index: usize,
    pub range: Range<usize>,
    pub text: String,
    /// Indices of the sentences in this paragraph.
    pub sentences: Range<usize>,
    pub score: f32,
    pub rank_order: usize,
}

#[derive(Debug, Clone)]
struct Analysis {
    sentences: Vec<Sentence>,
    paragraphs: Vec<Paragraph>,
}

/// Summary of a piece of text.
#[derive(Debug, Clone)]
pub struct Summary {
    text: String,
    analysis: OnceLock<Analysis>,
}

impl Summary {
    pub fn new(text: impl Into<String>) -> Self {
        Summary {
            text: text.into(),
            analysis: OnceLock::new(),
        }
    }

    /// The source text.
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn sentence_count(&self) -> usize {
        self.analysis().sentences.len()
    }

    pub fn paragraph_count(&self) -> usize {
        self.analysis().paragraphs.len()
    }

    /// Sentences in document order.
    pub fn sentences(&self) -> &[Sentence] {
        &self.analysis().sentences
    }

    /// Paragraphs in document order.
    pub fn paragraphs(&self) -> &[Paragraph] {
        &self.analysis().paragraphs
    }

    /// The paragraph containing a sentence of this summary.
    pub fn paragraph_of(&self, sentence: &Sentence) -> Option<&Paragraph> {
        self.analysis().paragraphs.get(sentence.paragraph)
    }

    /// The `max_sentences` most salient sentences, in document order, joined
    /// by a space.
    pub fn summarize_sentences(&self, max_sentences: usize) -> String {
        self.analysis()
            .sentences
            .iter()
            .filter(|sentence| sentence.rank_order <= max_sentences)
            .map(|sentence| sentence.text.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// The `max_paragraphs` most salient paragraphs, in document order,
    /// separated by a blank line.
    pub fn summarize_paragraphs(&self, max_paragraphs: usize) -> String {
        self.analysis()
            .paragraphs
            .iter()
            .filter(|paragraph| paragraph.rank_order <= max_paragraphs)
            .map(|paragraph| paragraph.text.as_str())
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    fn analysis(&self) -> &Analysis {
        self.analysis.get_or_init(|| analyze(&self.text))
    }
}

fn analyze(text: &str) -> Analysis {
    let paragraph_segments = segment::paragraphs(text);

    let mut spans = Vec::with_capacity(paragraph_segments.len());
    let mut sentence_segments = Vec::new();
    let mut scored = Vec::new();
    for paragraph in &paragraph_segments {
        let start = sentence_segments.len();
        for (position, sentence) in segment::sentences(text, &paragraph.range)
            .into_iter()
            .enumerate()
        {
            scored.push(Scored {
                text: sentence.text(text),
                leads_paragraph: position == 0,
            });
            sentence_segments.push(sentence);
        }
        spans.push(start..sentence_segments.len());
    }

    let scores = salience::score_sentences(&scored);
    let sentence_ranks = salience::rank_orders(&scores);

    let paragraph_scores: Vec<f32> = spans
        .iter()
        .map(|span| scores[span.clone()].iter().copied().fold(0.0, f32::max))
        .collect();
    let paragraph_ranks = salience::rank_orders(&paragraph_scores);

    let mut sentences = Vec::with_capacity(sentence_segments.len());
    for (paragraph, span) in spans.iter().enumerate() {
        for index in span.clone() {
            let range = sentence_segments[index].range.clone();
            sentences.push(Sentence {
                index,
                paragraph,
                text: text[range.clone()].to_string(),
                range,
                score: scores[index],
                rank_order: sentence_ranks[index],
            });
        }
    }

    let paragraphs = paragraph_segments
        .into_iter()
        .zip(spans)
        .enumerate()
        .map(|(index, (segment, span))| Paragraph {
            index,
            text: segment.text(text).to_string(),
            range: segment.range,
            sentences: span,
            score: paragraph_scores[index],
            rank_order: paragraph_ranks[index],
        })
        .collect::<Vec<_>>();

    debug!(
        "Summarized {} sentences in {} paragraphs",
        sentences.len(),
        paragraphs.len()
    );

    Analysis {
        sentences,
        paragraphs,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ARTICLE: &str = "Tessera builds search indices. Search indices map terms to documents.\n\n\
        The weather was pleasant yesterday.\n\n\
        Search indices rank documents by term frequency. Search indices also support summaries.";

    #[test]
    fn test_segments_in_document_order() {
        let summary = Summary::new(ARTICLE);
        assert_eq!(summary.paragraph_count(), 3);
        assert_eq!(summary.sentence_count(), 5);

        let sentences = summary.sentences();
        assert_eq!(sentences[0].text, "Tessera builds search indices.");
        assert_eq!(sentences[2].text, "The weather was pleasant yesterday.");
        assert_eq!(sentences[2].paragraph, 1);
        assert_eq!(&ARTICLE[sentences[4].range.clone()], sentences[4].text);

        let paragraphs = summary.paragraphs();
        assert_eq!(paragraphs[2].sentences, 3..5);
        assert_eq!(summary.paragraph_of(&sentences[3]), Some(&paragraphs[2]));
    }

    #[test]
    fn test_rank_orders_are_a_permutation() {
        let summary = Summary::new(ARTICLE);
        let mut ranks: Vec<usize> = summary.sentences().iter().map(|s| s.rank_order).collect();
        ranks.sort_unstable();
        assert_eq!(ranks, vec![1, 2, 3, 4, 5]);

        let mut ranks: Vec<usize> = summary.paragraphs().iter().map(|p| p.rank_order).collect();
        ranks.sort_unstable();
        assert_eq!(ranks, vec![1, 2, 3]);
    }

    #[test]
    fn test_paragraph_score_is_max_of_sentences() {
        let summary = Summary::new(ARTICLE);
        for paragraph in summary.paragraphs() {
            let best = summary.sentences()[paragraph.sentences.clone()]
                .iter()
                .map(|s| s.score)
                .fold(0.0, f32::max);
            assert_eq!(paragraph.score, best);
        }
    }

    #[test]
    fn test_off_topic_sentence_ranks_last() {
        let summary = Summary::new(ARTICLE);
        let weather = &summary.sentences()[2];
        assert_eq!(weather.rank_order, 5);

        let digest = summary.summarize_paragraphs(2);
        assert!(!digest.contains("weather"));
        assert_eq!(digest.matches("\n\n").count(), 1);
    }

    #[test]
    fn test_summaries_keep_document_order() {
        let summary = Summary::new(ARTICLE);
        let all = summary.summarize_sentences(summary.sentence_count());
        let joined = summary
            .sentences()
            .iter()
            .map(|s| s.text.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        assert_eq!(all, joined);
        assert_eq!(summary.summarize_sentences(0), "");
        assert_eq!(summary.summarize_paragraphs(0), "");
    }

    #[test]
    fn test_summary_is_deterministic() {
        let first = Summary::new(ARTICLE).summarize_sentences(1);
        for _ in 0..10 {
            assert_eq!(Summary::new(ARTICLE).summarize_sentences(1), first);
        }
        let summary = Summary::new(ARTICLE);
        assert_eq!(summary.summarize_sentences(1), summary.summarize_sentences(1));
    }

    #[test]
    fn test_empty_text() {
        let summary = Summary::new("  \n\n ");
        assert_eq!(summary.sentence_count(), 0);
        assert_eq!(summary.paragraph_count(), 0);
        assert_eq!(summary.summarize_sentences(3), "");
    }
}
