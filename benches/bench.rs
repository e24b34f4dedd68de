//! Criterion benchmarks for Tessera.
//!
//! Covers the three hot paths:
//! - Text analysis and indexing with flush
//! - Literal and similarity search
//! - Summarization

use std::hint::black_box;
use std::time::Duration;

use criterion::{Criterion, Throughput, criterion_group, criterion_main};
use tessera::analysis::{AnalysisSettings, Analyzer, PipelineAnalyzer};
use tessera::document::Document;
use tessera::index::{IndexConfig, WritableIndex};
use tessera::search::SearchOptions;
use tessera::summary::Summary;

/// Generate test documents for benchmarking.
fn generate_test_documents(count: usize) -> Vec<String> {
    let words = [
        "search", "engine", "full", "text", "index", "query", "document", "tree", "term",
        "phrase", "boolean", "vector", "similarity", "relevance", "score", "analysis",
        "summary", "sentence", "paragraph", "salience", "flush", "compact", "posting",
        "dictionary", "storage", "retrieval", "ranking", "filtering",
    ];

    let mut documents = Vec::with_capacity(count);
    for i in 0..count {
        let doc_length = 50 + (i % 100);
        let mut doc_words = Vec::with_capacity(doc_length);

        for j in 0..doc_length {
            let word_idx = (i * 7 + j * 13) % words.len(); // Pseudo-random distribution
            doc_words.push(words[word_idx]);
        }

        documents.push(doc_words.join(" "));
    }

    documents
}

fn build_index(texts: &[String]) -> WritableIndex {
    let index = WritableIndex::create_in_memory("bench", IndexConfig::default()).unwrap();
    for (i, text) in texts.iter().enumerate() {
        let doc = Document::new(Some("bench"), None, &format!("doc{i}")).unwrap();
        index.add(&doc, text).unwrap();
    }
    index.flush().unwrap();
    index
}

fn bench_indexing(c: &mut Criterion) {
    let mut group = c.benchmark_group("indexing");
    let texts = generate_test_documents(1000);

    let analyzer = PipelineAnalyzer::from_settings(&AnalysisSettings::default());
    group.bench_function("analyze_single_document", |b| {
        b.iter(|| {
            let tokens: Vec<_> = analyzer.analyze(black_box(&texts[0])).unwrap().collect();
            black_box(tokens)
        })
    });

    group.sample_size(20);
    group.throughput(Throughput::Elements(200));
    group.bench_function("add_and_flush_200", |b| {
        b.iter(|| black_box(build_index(&texts[..200])))
    });

    group.finish();
}

fn bench_search(c: &mut Criterion) {
    let mut group = c.benchmark_group("search");
    let texts = generate_test_documents(2000);
    let index = build_index(&texts);

    group.bench_function("single_term", |b| {
        b.iter(|| {
            let search = index.search(black_box("salience"), SearchOptions::default()).unwrap();
            black_box(search.find_all(Duration::ZERO).unwrap())
        })
    });

    group.bench_function("boolean", |b| {
        b.iter(|| {
            let search = index
                .search(black_box("(search | query) -vector"), SearchOptions::default())
                .unwrap();
            black_box(search.find_all(Duration::ZERO).unwrap())
        })
    });

    group.bench_function("first_page", |b| {
        b.iter(|| {
            let search = index.search(black_box("document"), SearchOptions::default()).unwrap();
            black_box(search.find_matches(10, Duration::ZERO).unwrap())
        })
    });

    group.sample_size(20);
    group.bench_function("find_similar", |b| {
        let options = SearchOptions::default().with_find_similar(true);
        b.iter(|| {
            let search = index.search(black_box(&texts[3]), options).unwrap();
            black_box(search.find_matches(10, Duration::ZERO).unwrap())
        })
    });

    group.finish();
}

fn bench_summary(c: &mut Criterion) {
    let mut group = c.benchmark_group("summary");

    let text = generate_test_documents(60)
        .chunks(4)
        .map(|chunk| {
            chunk
                .iter()
                .map(|sentence| format!("{sentence}."))
                .collect::<Vec<_>>()
                .join(" ")
        })
        .collect::<Vec<_>>()
        .join("\n\n");

    group.throughput(Throughput::Bytes(text.len() as u64));
    group.bench_function("summarize_sentences", |b| {
        b.iter(|| {
            let summary = Summary::new(black_box(text.as_str()));
            black_box(summary.summarize_sentences(5))
        })
    });

    group.finish();
}

criterion_group!(benches, bench_indexing, bench_search, bench_summary);
criterion_main!(benches);
