//! Stateful, resumable search handles.

use std::cmp::Ordering as CmpOrdering;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use rayon::prelude::*;

use crate::document::{Document, DocumentId};
use crate::error::{Result, TesseraError};
use crate::index::generation::Generation;
use crate::index::shared::IndexShared;
use crate::index::term::TermId;
use crate::search::options::SearchOptions;
use crate::search::query::{Matcher, QueryParser};
use crate::search::scorer::{ConstantScorer, Scorer, SimilarityScorer, TfIdfScorer};

/// Number of candidates scored between deadline and cancellation checks.
const SCORE_CHUNK: usize = 256;

/// Batch size `find_all` pages with.
pub const FIND_ALL_BATCH: usize = 64;

/// One search result.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Match {
    pub document_id: DocumentId,
    /// Relevance; meaningless when scores were not requested.
    pub score: f32,
}

fn rank(a: &Match, b: &Match) -> CmpOrdering {
    b.score
        .partial_cmp(&a.score)
        .unwrap_or(CmpOrdering::Equal)
        .then_with(|| a.document_id.cmp(&b.document_id))
}

#[derive(Debug)]
enum Phase {
    /// Candidates are being scored; `scored` holds the finished part.
    Scoring {
        candidates: Vec<DocumentId>,
        next: usize,
        scored: Vec<Match>,
    },
    /// Results are ranked; `cursor` is the next one to hand out.
    Ranked { results: Vec<Match>, cursor: usize },
    Cancelled,
}

#[derive(Debug)]
struct SearchState {
    phase: Phase,
    /// Work done so far; strictly increases on every call that reports
    /// `has_more`.
    progress: usize,
}

/// Cancels a [`Search`] from another thread.
#[derive(Debug, Clone)]
pub struct SearchCanceller {
    flag: Arc<AtomicBool>,
}

impl SearchCanceller {
    /// Request cancellation. The search stops at its next check.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Release);
    }

    /// Whether cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }
}

/// A search over one committed generation of an index.
///
/// The handle is single-direction: each [`find_matches`](Search::find_matches)
/// call continues where the previous one stopped, and once the results are
/// exhausted it keeps returning `(vec![], false)`. Flushes and compactions
/// after the search was created are not visible to it.
pub struct Search {
    index: Weak<IndexShared>,
    query: String,
    options: SearchOptions,
    generation: Arc<Generation>,
    scorer: Box<dyn Scorer>,
    cancelled: Arc<AtomicBool>,
    state: Mutex<SearchState>,
}

impl std::fmt::Debug for Search {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Search")
            .field("query", &self.query)
            .field("options", &self.options)
            .field("generation", &self.generation.number())
            .field("scorer", &self.scorer.name())
            .finish()
    }
}

impl Search {
    pub(crate) fn new(shared: &Arc<IndexShared>, query: &str, options: SearchOptions) -> Result<Self> {
        let generation = shared.snapshot()?;
        let index_type = shared.index_type();

        let (candidates, scorer): (Vec<DocumentId>, Box<dyn Scorer>) = if options.find_similar {
            if !index_type.supports_vector() {
                return Err(TesseraError::unsupported(format!(
                    "similarity search needs a vector index, not {index_type:?}"
                )));
            }
            similar_candidates(shared, &generation, query)?
        } else {
            if !index_type.supports_inverted() {
                return Err(TesseraError::unsupported(format!(
                    "term search needs an inverted index, not {index_type:?}"
                )));
            }
            literal_candidates(shared, &generation, query, options)?
        };

        log::debug!(
            "Search {query:?} on generation {}: {} candidates",
            generation.number(),
            candidates.len()
        );

        Ok(Search {
            index: Arc::downgrade(shared),
            query: query.to_string(),
            options,
            generation,
            scorer,
            cancelled: Arc::new(AtomicBool::new(false)),
            state: Mutex::new(SearchState {
                phase: Phase::Scoring {
                    candidates,
                    next: 0,
                    scored: Vec::new(),
                },
                progress: 0,
            }),
        })
    }

    /// The query string.
    pub fn query(&self) -> &str {
        &self.query
    }

    /// The options the search was started with.
    pub fn options(&self) -> SearchOptions {
        self.options
    }

    /// Request early termination. Later calls return no matches.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    /// Whether the search was cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    /// A handle that cancels this search from another thread.
    pub fn canceller(&self) -> SearchCanceller {
        SearchCanceller {
            flag: Arc::clone(&self.cancelled),
        }
    }

    fn check_index(&self) -> Result<Arc<IndexShared>> {
        let shared = self.index.upgrade().ok_or(TesseraError::IndexClosed)?;
        shared.check_open()?;
        Ok(shared)
    }

    /// Resolve a match to its document.
    pub fn document(&self, id: DocumentId) -> Result<Document> {
        let shared = self.check_index()?;
        shared.document_by_id(id, true)
    }

    /// Return the next batch of matches.
    ///
    /// At most `maximum_count` matches are returned (0 = no limit), ordered
    /// by descending score and then ascending document ID. `maximum_time`
    /// bounds how long this call scores (zero = no limit). The flag is true
    /// when more matches may follow on the next call.
    pub fn find_matches(&self, maximum_count: usize, maximum_time: Duration) -> Result<(Vec<Match>, bool)> {
        self.check_index()?;
        let deadline = (!maximum_time.is_zero()).then(|| Instant::now() + maximum_time);
        let mut guard = self.state.lock();
        let state = &mut *guard;

        if self.is_cancelled() {
            self.enter_cancelled(state);
            return Ok((Vec::new(), false));
        }

        if let Phase::Scoring {
            candidates,
            next,
            scored,
        } = &mut state.phase
        {
            let mut processed = 0;
            while *next < candidates.len() && !self.is_cancelled() {
                if processed > 0 && deadline.is_some_and(|d| Instant::now() >= d) {
                    break;
                }

                let end = (*next + SCORE_CHUNK).min(candidates.len());
                scored.extend(self.score_chunk(&candidates[*next..end]));
                processed += end - *next;
                *next = end;
            }
            state.progress += processed;

            if self.is_cancelled() {
                self.enter_cancelled(state);
                return Ok((Vec::new(), false));
            }
            if *next < candidates.len() {
                return Ok((Vec::new(), true));
            }

            let mut results = std::mem::take(scored);
            results.sort_by(rank);
            state.phase = Phase::Ranked { results, cursor: 0 };
        }

        match &mut state.phase {
            Phase::Ranked { results, cursor } => {
                let remaining = results.len() - *cursor;
                let take = if maximum_count == 0 {
                    remaining
                } else {
                    maximum_count.min(remaining)
                };

                let batch = results[*cursor..*cursor + take].to_vec();
                *cursor += take;
                let has_more = *cursor < results.len();
                state.progress += take;
                Ok((batch, has_more))
            }
            Phase::Cancelled => Ok((Vec::new(), false)),
            Phase::Scoring { .. } => Err(TesseraError::invariant(
                "search left the scoring phase unfinished",
            )),
        }
    }

    /// Collect every remaining match, paging in batches of
    /// [`FIND_ALL_BATCH`]. Stops early, with what it has, when
    /// `maximum_time` (zero = no limit) runs out.
    ///
    /// Fails with [`TesseraError::InvariantViolation`] if a batch reports
    /// more results without making progress.
    pub fn find_all(&self, maximum_time: Duration) -> Result<Vec<Match>> {
        let deadline = (!maximum_time.is_zero()).then(|| Instant::now() + maximum_time);
        let mut all = Vec::new();

        loop {
            let budget = match deadline {
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        break;
                    }
                    deadline - now
                }
                None => Duration::ZERO,
            };

            let before = self.progress();
            let (batch, has_more) = self.find_matches(FIND_ALL_BATCH, budget)?;
            all.extend(batch);
            if !has_more {
                break;
            }
            if self.progress() == before {
                return Err(TesseraError::invariant(format!(
                    "search {:?} reported more results without progress",
                    self.query
                )));
            }
        }

        Ok(all)
    }

    fn progress(&self) -> usize {
        self.state.lock().progress
    }

    fn enter_cancelled(&self, state: &mut SearchState) {
        if !matches!(state.phase, Phase::Cancelled) {
            log::debug!("Search {:?} cancelled", self.query);
            state.phase = Phase::Cancelled;
        }
    }

    fn score_chunk(&self, chunk: &[DocumentId]) -> Vec<Match> {
        let generation = self.generation.as_ref();
        let scorer = self.scorer.as_ref();
        let similar = self.options.find_similar;
        let unscored = self.options.no_relevance_scores;

        chunk
            .par_iter()
            .filter_map(|&document_id| {
                let vector = generation.vector(document_id)?;
                let score = scorer.score(generation, vector);
                if similar && score <= 0.0 {
                    return None;
                }
                let score = if unscored { 0.0 } else { score };
                Some(Match { document_id, score })
            })
            .collect()
    }
}

type Plan = (Vec<DocumentId>, Box<dyn Scorer>);

fn literal_candidates(
    shared: &IndexShared,
    generation: &Generation,
    query: &str,
    options: SearchOptions,
) -> Result<Plan> {
    let parsed = QueryParser::new(options.space_means_or).parse(query);
    let matcher = match parsed {
        Some(node) => Matcher::resolve(
            &node,
            generation,
            shared.analyzer(),
            shared.settings().proximity_indexing,
        )?,
        None => None,
    };

    let Some(matcher) = matcher else {
        return Ok((Vec::new(), Box::new(ConstantScorer)));
    };

    let candidates = matcher.matching_documents(generation).into_iter().collect();
    let scorer: Box<dyn Scorer> = if options.no_relevance_scores {
        Box::new(ConstantScorer)
    } else {
        Box::new(TfIdfScorer::new(generation, matcher.positive_terms()))
    };
    Ok((candidates, scorer))
}

fn similar_candidates(
    shared: &IndexShared,
    generation: &Generation,
    query: &str,
) -> Result<Plan> {
    let dictionary = generation.dictionary();
    let mut profile: Vec<(TermId, u32)> = Vec::new();
    for token in shared.analyze(query)? {
        let id = dictionary.id_for_term(&token.text);
        if !id.is_found() {
            continue;
        }
        match profile.iter_mut().find(|(term, _)| *term == id) {
            Some((_, tf)) => *tf += 1,
            None => profile.push((id, 1)),
        }
    }

    let scorer = SimilarityScorer::new(generation, &profile);
    if scorer.is_empty() {
        return Ok((Vec::new(), Box::new(ConstantScorer)));
    }

    Ok((generation.document_ids(), Box::new(scorer)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::{IndexConfig, WritableIndex};

    fn corpus(count: usize) -> WritableIndex {
        let index = WritableIndex::create_in_memory("s", IndexConfig::default()).unwrap();
        for i in 0..count {
            let doc = Document::new(Some("mem"), None, &format!("doc{i}")).unwrap();
            index.add(&doc, "shared words here").unwrap();
        }
        index.flush().unwrap();
        index
    }

    #[test]
    fn test_ties_break_by_ascending_id() {
        let index = corpus(5);
        let search = index.search("shared", SearchOptions::default()).unwrap();
        let (matches, has_more) = search.find_matches(0, Duration::ZERO).unwrap();

        assert!(!has_more);
        let ids: Vec<u64> = matches.iter().map(|m| m.document_id.value()).collect();
        assert_eq!(ids, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_exhausted_handle_stays_empty() {
        let index = corpus(2);
        let search = index.search("shared", SearchOptions::default()).unwrap();

        assert_eq!(search.find_matches(0, Duration::ZERO).unwrap().0.len(), 2);
        assert_eq!(search.find_matches(0, Duration::ZERO).unwrap(), (vec![], false));
    }

    #[test]
    fn test_canceller_stops_search() {
        let index = corpus(3);
        let search = index.search("shared", SearchOptions::default()).unwrap();
        let canceller = search.canceller();

        let (first, _) = search.find_matches(1, Duration::ZERO).unwrap();
        assert_eq!(first.len(), 1);

        canceller.cancel();
        assert!(search.is_cancelled());
        assert_eq!(search.find_matches(1, Duration::ZERO).unwrap(), (vec![], false));
        assert!(search.find_all(Duration::ZERO).unwrap().is_empty());
    }

    #[test]
    fn test_search_survives_flush() {
        let index = corpus(2);
        let search = index.search("shared", SearchOptions::default()).unwrap();

        let extra = Document::new(Some("mem"), None, "late").unwrap();
        index.add(&extra, "shared").unwrap();
        index.flush().unwrap();
        index.compact().unwrap();

        assert_eq!(search.find_all(Duration::ZERO).unwrap().len(), 2);
        let fresh = index.search("shared", SearchOptions::default()).unwrap();
        assert_eq!(fresh.find_all(Duration::ZERO).unwrap().len(), 3);
    }

    #[test]
    fn test_closed_index_fails_search() {
        let index = corpus(1);
        let search = index.search("shared", SearchOptions::default()).unwrap();
        index.close().unwrap();

        assert!(matches!(
            search.find_matches(1, Duration::ZERO),
            Err(TesseraError::IndexClosed)
        ));
    }
}
