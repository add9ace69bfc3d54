use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use langrevs::detector::LanguageDetector;
use regex::Regex;

// mimics the texture of revision bodies: mostly plain wikitext, a few lines
// that hit the cheap tier without being headers, and one real header
fn generate_body_lines(count: usize) -> Vec<String> {
    const TEMPLATES: &[&str] = &[
        "* derived term, see also",
        "# definition of the word, narrow sense",
        "[[category:nouns]]",
        "{{inflection|pl|noun}}",
        "==Etymology==",
        "plain prose paragraph about usage notes and citations",
        "| align=left",
        "'''bold headword''' (plural forms vary)",
        "prose mentioning the Polish language inline",
        "===Polish proverbs===",
        ": translation gloss goes here",
        "<comment>minor cleanup</comment>",
        "* second derived term in the list",
        "# another sense, archaic",
        "==Polish==",
        "{{conjugation table|rows=6}}",
    ];
    (0..count)
        .map(|i| format!("{} {}", TEMPLATES[i % TEMPLATES.len()], i))
        .collect()
}

fn bench_header_matching(c: &mut Criterion) {
    let detector = LanguageDetector::new("Polish").unwrap();
    let full_pattern = Regex::new(r"(^|[^=])==\s*(\[\[Polish\]\]|Polish)\s*==([^=]|$)").unwrap();

    let mut group = c.benchmark_group("header_matching");
    for count in [1_000usize, 10_000usize] {
        let lines = generate_body_lines(count);
        group.throughput(Throughput::Elements(count as u64));

        group.bench_with_input(BenchmarkId::new("gated", count), &lines, |b, lines| {
            b.iter(|| {
                lines
                    .iter()
                    .filter(|line| detector.matches(line.as_str()))
                    .count()
            })
        });
        group.bench_with_input(BenchmarkId::new("regex_only", count), &lines, |b, lines| {
            b.iter(|| {
                lines
                    .iter()
                    .filter(|line| full_pattern.is_match(line.as_str()))
                    .count()
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_header_matching);
criterion_main!(benches);
