use std::thread;
use std::time::Duration;

use tessera::analysis::AnalysisProperty;
use tessera::document::{Document, DocumentId};
use tessera::error::TesseraError;
use tessera::index::{Index, IndexConfig, IndexType, WritableIndex};
use tessera::search::{Match, SearchOptions};

fn init() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn build(config: IndexConfig, texts: &[&str]) -> WritableIndex {
    let index = WritableIndex::create_in_memory("search", config).unwrap();
    for (i, text) in texts.iter().enumerate() {
        let doc = Document::new(Some("mem"), None, &format!("doc{}", i + 1)).unwrap();
        index.add(&doc, text).unwrap();
    }
    index.flush().unwrap();
    index
}

fn ids(index: &Index, query: &str, options: SearchOptions) -> Vec<u64> {
    index
        .search(query, options)
        .unwrap()
        .find_all(Duration::ZERO)
        .unwrap()
        .iter()
        .map(|m| m.document_id.value())
        .collect()
}

#[test]
fn test_score_grows_with_term_frequency() {
    init();
    let index = build(
        IndexConfig::default(),
        &["cat", "cat cat cat", "cat cat", "dog"],
    );

    let matches = index
        .search("cat", SearchOptions::default())
        .unwrap()
        .find_all(Duration::ZERO)
        .unwrap();
    let order: Vec<u64> = matches.iter().map(|m| m.document_id.value()).collect();
    assert_eq!(order, vec![2, 3, 1]);
    assert!(matches[0].score > matches[1].score);
    assert!(matches[1].score > matches[2].score);
    assert!(matches[2].score > 0.0);
}

#[test]
fn test_rarer_terms_score_higher() {
    init();
    let index = build(
        IndexConfig::default(),
        &["alpha", "gamma", "alpha other", "alpha more"],
    );

    let matches = index
        .search("alpha | gamma", SearchOptions::default())
        .unwrap()
        .find_all(Duration::ZERO)
        .unwrap();
    let order: Vec<u64> = matches.iter().map(|m| m.document_id.value()).collect();
    assert_eq!(order, vec![2, 1, 3, 4]);
    // Equal scores are ordered by ascending ID.
    assert_eq!(matches[1].score, matches[2].score);
}

#[test]
fn test_pagination_resumes() {
    init();
    let texts = vec!["shared text"; 10];
    let index = build(IndexConfig::default(), &texts);
    let search = index.search("shared", SearchOptions::default()).unwrap();

    let mut seen: Vec<Match> = Vec::new();
    for expected in [3, 3, 3] {
        let (batch, has_more) = search.find_matches(3, Duration::ZERO).unwrap();
        assert_eq!(batch.len(), expected);
        assert!(has_more);
        seen.extend(batch);
    }

    let (last, has_more) = search.find_matches(3, Duration::ZERO).unwrap();
    assert_eq!(last.len(), 1);
    assert!(!has_more);
    seen.extend(last);

    let order: Vec<u64> = seen.iter().map(|m| m.document_id.value()).collect();
    assert_eq!(order, (1..=10).collect::<Vec<u64>>());

    let (empty, has_more) = search.find_matches(3, Duration::ZERO).unwrap();
    assert!(empty.is_empty());
    assert!(!has_more);
}

#[test]
fn test_cancel_before_and_during_paging() {
    init();
    let index = build(IndexConfig::default(), &["one word", "two word", "three word"]);

    let search = index.search("word", SearchOptions::default()).unwrap();
    search.cancel();
    assert_eq!(search.find_matches(0, Duration::ZERO).unwrap(), (vec![], false));
    assert!(search.find_all(Duration::ZERO).unwrap().is_empty());

    let search = index.search("word", SearchOptions::default()).unwrap();
    let (first, has_more) = search.find_matches(1, Duration::ZERO).unwrap();
    assert_eq!(first.len(), 1);
    assert!(has_more);

    let canceller = search.canceller();
    thread::spawn(move || canceller.cancel()).join().unwrap();
    assert!(search.is_cancelled());
    assert_eq!(search.find_matches(1, Duration::ZERO).unwrap(), (vec![], false));

    // The index is untouched by cancellation.
    assert_eq!(ids(&index, "word", SearchOptions::default()), vec![1, 2, 3]);
}

#[test]
fn test_boolean_operators() {
    init();
    let index = build(
        IndexConfig::default(),
        &["quick brown fox", "brown quick fox", "lazy fox", "lazy dog"],
    );
    let default = SearchOptions::default();

    assert_eq!(ids(&index, "quick fox", default), vec![1, 2]);
    assert_eq!(ids(&index, "quick AND lazy", default), Vec::<u64>::new());
    assert_eq!(ids(&index, "quick OR lazy", default).len(), 4);
    assert_eq!(ids(&index, "fox NOT quick", default), vec![3]);
    assert_eq!(ids(&index, "fox -quick", default), vec![3]);
    assert_eq!(ids(&index, "lazy & !(fox)", default), vec![4]);
    assert_eq!(
        ids(&index, "brown dog", default.with_space_means_or(true)).len(),
        3
    );
    assert_eq!(ids(&index, "bro*", default).len(), 2);
    assert_eq!(ids(&index, "unknown", default), Vec::<u64>::new());
    assert_eq!(ids(&index, "", default), Vec::<u64>::new());
}

#[test]
fn test_phrases_need_proximity_indexing() {
    init();
    let texts = ["quick brown fox", "brown quick fox"];

    let plain = build(IndexConfig::default(), &texts);
    assert_eq!(ids(&plain, "\"quick brown\"", SearchOptions::default()), vec![1, 2]);

    let config = IndexConfig::default().with_property(AnalysisProperty::ProximityIndexing(true));
    let proximity = build(config, &texts);
    assert_eq!(ids(&proximity, "\"quick brown\"", SearchOptions::default()), vec![1]);
    assert_eq!(ids(&proximity, "\"brown quick fox\"", SearchOptions::default()), vec![2]);
}

#[test]
fn test_no_relevance_scores() {
    init();
    let index = build(IndexConfig::default(), &["cat", "cat cat cat", "cat cat"]);
    let matches = index
        .search("cat", SearchOptions::default().with_no_relevance_scores(true))
        .unwrap()
        .find_all(Duration::ZERO)
        .unwrap();

    assert_eq!(matches.len(), 3);
    assert!(matches.iter().all(|m| m.score == 0.0));
}

#[test]
fn test_find_similar() {
    init();
    let index = build(
        IndexConfig::default(),
        &[
            "rust compiler borrow checker",
            "garden flowers roses",
            "rust borrow lifetimes",
        ],
    );
    let similar = SearchOptions::default().with_find_similar(true);

    assert_eq!(ids(&index, "rust borrow", similar), vec![3, 1]);
    assert!(ids(&index, "nothing known", similar).is_empty());
}

#[test]
fn test_search_needs_a_matching_index_type() {
    init();
    let vector_only = build(
        IndexConfig::default().with_index_type(IndexType::Vector),
        &["rust borrow"],
    );
    assert!(matches!(
        vector_only.search("rust", SearchOptions::default()),
        Err(TesseraError::Unsupported(_))
    ));
    assert_eq!(
        ids(&vector_only, "rust", SearchOptions::default().with_find_similar(true)),
        vec![1]
    );

    let inverted_only = build(
        IndexConfig::default().with_index_type(IndexType::Inverted),
        &["rust borrow"],
    );
    assert!(matches!(
        inverted_only.search("rust", SearchOptions::default().with_find_similar(true)),
        Err(TesseraError::Unsupported(_))
    ));
}

#[test]
fn test_concurrent_searches_are_independent() {
    init();
    let texts: Vec<String> = (0..200)
        .map(|i| format!("common term{} {}", i % 7, "filler ".repeat(i % 5)))
        .collect();
    let refs: Vec<&str> = texts.iter().map(String::as_str).collect();
    let index = build(IndexConfig::default(), &refs);

    let expected = ids(&index, "common", SearchOptions::default());
    assert_eq!(expected.len(), 200);

    thread::scope(|scope| {
        for batch_size in [1, 7, 64, 0] {
            let index = &index;
            let expected = &expected;
            scope.spawn(move || {
                let search = index.search("common", SearchOptions::default()).unwrap();
                let mut order = Vec::new();
                loop {
                    let (batch, has_more) = search.find_matches(batch_size, Duration::ZERO).unwrap();
                    order.extend(batch.iter().map(|m| m.document_id.value()));
                    if !has_more {
                        break;
                    }
                }
                assert_eq!(&order, expected);
            });
        }
    });
}

#[test]
fn test_flush_is_a_commit_boundary() {
    init();
    let index = build(IndexConfig::default(), &["first entry"]);
    let before = index.search("entry", SearchOptions::default()).unwrap();

    let doc = Document::new(Some("mem"), None, "late").unwrap();
    index.add(&doc, "late entry").unwrap();
    assert_eq!(ids(&index, "entry", SearchOptions::default()), vec![1]);

    index.flush().unwrap();
    assert_eq!(ids(&index, "entry", SearchOptions::default()), vec![1, 2]);

    let old: Vec<DocumentId> = before
        .find_all(Duration::ZERO)
        .unwrap()
        .iter()
        .map(|m| m.document_id)
        .collect();
    assert_eq!(old, vec![DocumentId(1)]);
    assert_eq!(before.document(DocumentId(1)).unwrap().name(), "doc1");
}

#[test]
fn test_read_only_copy_searches_like_the_original() {
    init();
    let index = build(IndexConfig::default(), &["alpha beta", "beta gamma"]);
    let copy = Index::open_from_bytes(index.to_bytes().unwrap()).unwrap();

    assert_eq!(
        ids(&copy, "beta", SearchOptions::default()),
        ids(&index, "beta", SearchOptions::default())
    );
    let bound = copy.document(DocumentId(1)).unwrap();
    assert!(!bound.is_mutable());
    assert!(matches!(
        bound.set_properties(None),
        Err(TesseraError::ReadOnly(_))
    ));
}

#[test]
fn test_time_bounded_scoring_resumes() {
    init();
    let texts: Vec<String> = (0..2000)
        .map(|i| format!("{} filler{}", "common ".repeat(i % 9 + 1), i % 13))
        .collect();
    let refs: Vec<&str> = texts.iter().map(String::as_str).collect();
    let index = build(IndexConfig::default(), &refs);

    let expected = index
        .search("common", SearchOptions::default())
        .unwrap()
        .find_all(Duration::ZERO)
        .unwrap();
    assert_eq!(expected.len(), 2000);

    let search = index.search("common", SearchOptions::default()).unwrap();
    let mut seen: Vec<Match> = Vec::new();
    let mut empty_calls = 0;
    for _ in 0..10_000 {
        let (batch, has_more) = search.find_matches(100, Duration::from_nanos(1)).unwrap();
        if batch.is_empty() && has_more {
            empty_calls += 1;
        }
        seen.extend(batch);
        if !has_more {
            break;
        }
    }
    // Each call scores at least one chunk before checking its deadline.
    assert!(empty_calls > 0);
    assert_eq!(seen, expected);

    let unique: std::collections::BTreeSet<u64> =
        seen.iter().map(|m| m.document_id.value()).collect();
    assert_eq!(unique.len(), 2000);
}

#[test]
fn test_find_all_stops_at_its_time_bound() {
    init();
    let texts: Vec<String> = (0..2000)
        .map(|i| format!("common {}", "word ".repeat(i % 4)))
        .collect();
    let refs: Vec<&str> = texts.iter().map(String::as_str).collect();
    let index = build(IndexConfig::default(), &refs);
    let expected = ids(&index, "common", SearchOptions::default());

    let search = index.search("common", SearchOptions::default()).unwrap();
    let partial: Vec<u64> = search
        .find_all(Duration::from_nanos(1))
        .unwrap()
        .iter()
        .map(|m| m.document_id.value())
        .collect();
    assert!(partial.len() < expected.len());
    assert_eq!(&expected[..partial.len()], partial.as_slice());

    // A generous bound finishes the same search.
    let rest: Vec<u64> = search
        .find_all(Duration::from_secs(60))
        .unwrap()
        .iter()
        .map(|m| m.document_id.value())
        .collect();
    assert_eq!([partial, rest].concat(), expected);
}
