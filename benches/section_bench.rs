use criterion::{black_box, criterion_group, criterion_main, Criterion};
use fulltext_inverted::list::ListIterator;
use fulltext_inverted::{EngineConfig, InvertedSection, Key, TokenizeMode, WhitespaceTokenizer};
use std::sync::Arc;

fn section() -> InvertedSection {
    InvertedSection::open(
        EngineConfig::for_testing(),
        Arc::new(WhitespaceTokenizer { case_sensitive: false }),
        TokenizeMode::WordIndexingOnly,
    )
}

fn bench_insert(c: &mut Criterion) {
    c.bench_function("section_insert_1000_documents", |b| {
        b.iter(|| {
            let s = section();
            for id in 0..1000u32 {
                s.insert(black_box(id), "the quick brown fox jumps over the lazy dog", 0.0, 9).unwrap();
            }
        })
    });
}

fn bench_search(c: &mut Criterion) {
    let s = section();
    for id in 0..1000u32 {
        s.insert(id, "the quick brown fox jumps over the lazy dog", 0.0, 9).unwrap();
    }
    s.sync_merge().unwrap();
    let key = Key::term("fox");

    c.bench_function("section_search_merged_term", |b| {
        b.iter(|| {
            let mut it = s.get_iterator(black_box(&key)).unwrap().unwrap();
            let mut count = 0u32;
            while it.next() != fulltext_inverted::UNDEFINED_DOCUMENT_ID {
                count += 1;
            }
            count
        })
    });
}

criterion_group!(benches, bench_insert, bench_search);
criterion_main!(benches);
