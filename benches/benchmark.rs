use criterion::{black_box, criterion_group, criterion_main, Criterion};
use screenshot_api::{payload, strip_ansi, HookSet};
use std::time::Duration;

// Fast settings for all benchmarks
fn configure_fast_group(group: &mut criterion::BenchmarkGroup<criterion::measurement::WallTime>) {
    group.warm_up_time(Duration::from_millis(500));
    group.measurement_time(Duration::from_millis(500));
    group.sample_size(20);
}

fn benchmark_payload_parsing(c: &mut Criterion) {
    let mut group = c.benchmark_group("payload");
    configure_fast_group(&mut group);

    let full_body = r#"{
        "url": "https://example.com/pricing",
        "selector": "#plans",
        "args": ["--lang=en", "--force-dark-mode"],
        "userAgent": "probe/1.0",
        "viewport": {"width": 1280.4, "height": 800},
        "waitFor": ".loaded",
        "colorScheme": "dark",
        "timeout": 20000
    }"#;

    group.bench_function("parse_full", |b| {
        b.iter(|| {
            let parsed = payload::parse(black_box(full_body));
            black_box(parsed).ok();
        });
    });

    group.bench_function("parse_minimal", |b| {
        b.iter(|| {
            let parsed = payload::parse(black_box(r#"{"url":"https://example.com"}"#));
            black_box(parsed).ok();
        });
    });

    group.bench_function("parse_invalid", |b| {
        b.iter(|| {
            let parsed = payload::parse(black_box(r#"{"url":"not-a-url"}"#));
            black_box(parsed).ok();
        });
    });

    group.finish();
}

fn benchmark_hook_resolution(c: &mut Criterion) {
    let mut group = c.benchmark_group("hooks");
    configure_fast_group(&mut group);

    group.bench_function("merge_and_resolve", |b| {
        let base = HookSet::default();
        let overlay = HookSet::default();
        b.iter(|| {
            let resolved = HookSet::merge([&base, &overlay]).resolve();
            black_box(resolved);
        });
    });

    group.finish();
}

fn benchmark_ansi_stripping(c: &mut Criterion) {
    let mut group = c.benchmark_group("ansi");
    configure_fast_group(&mut group);

    let colored = "\u{1b}[31mpage.goto\u{1b}[0m: Timeout \u{1b}[1m15000ms\u{1b}[0m exceeded";
    let plain = "page.goto: Timeout 15000ms exceeded";

    group.bench_function("strip_colored", |b| {
        b.iter(|| {
            let stripped = strip_ansi(black_box(colored));
            black_box(stripped);
        });
    });

    group.bench_function("strip_plain", |b| {
        b.iter(|| {
            let stripped = strip_ansi(black_box(plain));
            black_box(stripped);
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    benchmark_payload_parsing,
    benchmark_hook_resolution,
    benchmark_ansi_stripping
);
criterion_main!(benches);
