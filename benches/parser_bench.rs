use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use std::sync::Arc;

use quarry::analysis::StandardAnalyzer;
use quarry::config::{AnalyzerConfig, QueryParserConfig};
use quarry::index::{Document, MemoryIndex};
use quarry::query::{QueryNode, QueryParser};

const QUERIES: &[(&str, &str)] = &[
    ("term", "rust"),
    ("signs", "+title:rust -body:java guide^2"),
    ("boolean", "(rust OR cargo) AND NOT java AND title:\"programming rust\"~2"),
    ("range", "title:[a TO m] OR body:{java TO rust}"),
    ("ipv6", "ip:[2a02:5180:0:2669:0:0:0:0 TO 2a02:5180:0:2669:ffff:ffff:ffff:ffff]"),
    ("fallback", "contents:[business TO by}"),
];

fn build_index(doc_count: usize) -> MemoryIndex {
    let analyzer = Arc::new(StandardAnalyzer::new(&AnalyzerConfig::default()).unwrap());
    let mut index = MemoryIndex::new(analyzer);
    let words = ["rust", "cargo", "java", "guide", "programming", "systems", "language"];

    for i in 0..doc_count {
        let title = format!("{} {}", words[i % words.len()], words[(i / 3) % words.len()]);
        let body = format!("{} document {}", words[(i * 7) % words.len()], i);
        index.add_document(Document::new().text("title", title).text("body", body));
    }
    index
}

fn bench_parse(c: &mut Criterion) {
    let parser = QueryParser::new(QueryParserConfig::default()).unwrap();

    let mut group = c.benchmark_group("parse");
    for (name, query) in QUERIES {
        group.bench_with_input(BenchmarkId::from_parameter(name), query, |b, query| {
            b.iter(|| parser.parse(black_box(query)).unwrap())
        });
    }
    group.finish();
}

fn bench_rewrite_and_execute(c: &mut Criterion) {
    let parser = QueryParser::new(QueryParserConfig::default()).unwrap();

    let mut group = c.benchmark_group("rewrite_execute");
    for &count in &[1_000usize, 10_000] {
        let index = build_index(count);
        group.bench_with_input(BenchmarkId::from_parameter(count), &index, |b, index| {
            b.iter(|| {
                let mut parsed = parser.parse("(rust OR cargo) AND prog*").unwrap();
                let mut query = parsed
                    .rewrite(index)
                    .unwrap()
                    .optimize(index)
                    .unwrap();
                query.execute(index, None).unwrap();
                black_box(query.matched_docs().unwrap().len())
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_parse, bench_rewrite_and_execute);
criterion_main!(benches);
