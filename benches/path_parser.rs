use criterion::{black_box, criterion_group, criterion_main, Criterion};

use pagesvg::bench_only::PathBuilder;

static INPUT: &str = "M10 20 C 30,40 50 60-70,80,90 100,110 120,130,140";

// Arc flags without separators, as written by some editors.
static ARCS: &str = "M0 0a5 5 0 1010 0a5 5 0 0110 0A10 10 30 1 0 50 50z";

fn long_path() -> String {
    (0..1000)
        .map(|i| format!("L{} {} q 1,2 3,4 ", i, i * 2))
        .fold(String::from("M0 0 "), |acc, s| acc + &s)
}

fn path_parser(c: &mut Criterion) {
    c.bench_function("parse path into builder", |b| {
        let input = black_box(INPUT);

        b.iter(|| {
            let mut builder = PathBuilder::default();
            let _ = builder.parse(input);
        });
    });

    c.bench_function("parse arcs with packed flags", |b| {
        let input = black_box(ARCS);

        b.iter(|| {
            let mut builder = PathBuilder::default();
            let _ = builder.parse(input);
            builder.into_path()
        });
    });

    let long = long_path();

    c.bench_function("parse long path", |b| {
        b.iter(|| {
            let mut builder = PathBuilder::default();
            let _ = builder.parse(black_box(&long));
        });
    });

    c.bench_function("parse invalid path prefix", |b| {
        let input = black_box("M10 20 L30 40 L50 60 C 1 2 3 4 5 A 1 1 0 2 1 3 3");

        b.iter(|| {
            let mut builder = PathBuilder::default();
            let _ = builder.parse(input);
            builder.into_path()
        });
    });
}

criterion_group!(benches, path_parser);
criterion_main!(benches);
