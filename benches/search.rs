use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use mathwiki_rs::{CorpusSource, LinkResolver, Repository, SearchEngine, markup};
use once_cell::sync::Lazy;
use std::collections::HashSet;

static REPOSITORY: Lazy<Repository> = Lazy::new(|| {
    Repository::load(&CorpusSource::Bundled).expect("bundled corpus loads for benchmarks")
});
static ENGINE: Lazy<SearchEngine> = Lazy::new(|| SearchEngine::new(REPOSITORY.pages()));
static RESOLVER: Lazy<LinkResolver> = Lazy::new(|| LinkResolver::new(REPOSITORY.pages()));

fn bench_cold_load(c: &mut Criterion) {
    c.bench_function("cold_load::decode_and_validate", |b| {
        b.iter(|| {
            let repository =
                Repository::load(&CorpusSource::Bundled).expect("bundled corpus loads");
            black_box(repository.pages().len());
        });
    });
}

fn bench_search_queries(c: &mut Criterion) {
    const QUERIES: &[&str] = &["", "pi", "formula", "distribution", "bayes theorem"];
    let tags = HashSet::new();
    for &query in QUERIES {
        let label = if query.is_empty() { "<empty>" } else { query };
        c.bench_with_input(BenchmarkId::new("search", label), &query, |b, &query| {
            b.iter(|| {
                let results = ENGINE.search(query, &tags, 80);
                black_box(results.len());
            });
        });
    }
}

fn bench_link_resolution(c: &mut Criterion) {
    const PARAGRAPH: &str = "The quadratic formula and the golden ratio both trace back to \
        algebra, while the normal distribution and standard deviation organize statistics. \
        A sine wave completes one cycle every 2 pi radians, and a linear function never curves.";
    c.bench_function("linker::linked_segments", |b| {
        b.iter(|| {
            let segments = RESOLVER.linked_segments(PARAGRAPH, "eulers-number");
            black_box(segments.len());
        });
    });
}

fn bench_markup_render(c: &mut Criterion) {
    const EQUATION: &str = r"x = (-b \pm \sqrt{b^2 - 4ac})/(2a), e^{2n} \to \infty";
    c.bench_function("markup::render", |b| {
        b.iter(|| {
            let rendered = markup::render(EQUATION);
            black_box(rendered.len());
        });
    });
}

criterion_group!(
    benches,
    bench_cold_load,
    bench_search_queries,
    bench_link_resolution,
    bench_markup_render
);
criterion_main!(benches);
