// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Criterion benchmarks for the full generation pipeline and its stages in
// the laserwerk-engine crate.

use criterion::{Criterion, black_box, criterion_group, criterion_main};

use laserwerk_core::types::Machine;
use laserwerk_engine::fonts::FontStore;
use laserwerk_engine::generator::Generator;
use laserwerk_engine::svg;

// ---------------------------------------------------------------------------
// Helper: synthesize markup with a configurable element count
// ---------------------------------------------------------------------------

fn markup_with_rects(count: usize) -> String {
    let mut body = String::new();
    for i in 0..count {
        let x = (i % 20) * 12 + 2;
        let y = (i / 20) * 12 + 2;
        body.push_str(&format!(
            r#"<rect x="{x}" y="{y}" width="8" height="8" fill="none" stroke="black" stroke-width="0.5"/>"#
        ));
    }
    format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="260mm" height="260mm" viewBox="0 0 260 260">{body}</svg>"#
    )
}

const SETTINGS: &str = r#"{
    "job_name": "bench",
    "processes": [
        {
            "_of": "vector_process",
            "name": "CutAll",
            "filter": { "_of": "color_filter", "colors": ["black"] },
            "speed": 100.0,
            "power": 25.0,
            "vector_sorting": "optimize"
        }
    ]
}"#;

fn bench_parse(c: &mut Criterion) {
    let markup = markup_with_rects(100);
    c.bench_function("svg_parse_100_rects", |b| {
        b.iter(|| {
            let doc = svg::parse(black_box(&markup), &FontStore::new(), 0.1).unwrap();
            black_box(doc.outlines.len())
        })
    });
}

fn bench_generate(c: &mut Criterion) {
    let markup = markup_with_rects(100);
    c.bench_function("generate_100_rects", |b| {
        b.iter(|| {
            let mut job = Generator::new(markup.as_str(), SETTINGS, Machine::Pro48);
            let payload = job.run_to_completion().unwrap();
            black_box(payload.len())
        })
    });
}

fn bench_generate_chunked(c: &mut Criterion) {
    let markup = markup_with_rects(100);
    c.bench_function("generate_100_rects_chunked", |b| {
        b.iter(|| {
            let mut job = Generator::new(markup.as_str(), SETTINGS, Machine::Pro48);
            let mut chunks = 0u32;
            while job.step() {
                chunks += 1;
            }
            black_box(chunks)
        })
    });
}

criterion_group!(benches, bench_parse, bench_generate, bench_generate_chunked);
criterion_main!(benches);
