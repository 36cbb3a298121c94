use criterion::{black_box, criterion_group, criterion_main, Criterion};

use cinema_booking::models::SeatLabel;
use cinema_booking::services::seat_map;

fn generate(c: &mut Criterion) {
    c.bench_function("generate 12x12", |b| b.iter(|| seat_map::generate(black_box(12), black_box(12))));
    c.bench_function("generate 26x99", |b| b.iter(|| seat_map::generate(black_box(26), black_box(99))));
}

fn parse(c: &mut Criterion) {
    let labels: Vec<String> = seat_map::generate(26, 40).iter().map(ToString::to_string).collect();
    c.bench_function("parse 1040 labels", |b| {
        b.iter(|| {
            labels
                .iter()
                .filter_map(|l| l.parse::<SeatLabel>().ok())
                .count()
        })
    });
}

criterion_group!(benches, generate, parse);
criterion_main!(benches);
