use criterion::{Criterion, black_box, criterion_group, criterion_main};
use xew_core::Shape;
use xew_ops::resolve_aligned;

fn bench_resolve(c: &mut Criterion) {
    let mut group = c.benchmark_group("resolve_aligned");

    let x = Shape::new(vec![8, 64, 56, 56]);
    let y = Shape::new(vec![64, 1, 1]);
    group.bench_function("nchw_auto_axis", |b| {
        b.iter(|| resolve_aligned(black_box(4), black_box(&x), black_box(&y), -1))
    });

    let bias = Shape::new(vec![64]);
    group.bench_function("nchw_channel_axis", |b| {
        b.iter(|| resolve_aligned(black_box(4), black_box(&x), black_box(&bias), 1))
    });

    let same = Shape::new(vec![8, 64, 56, 56]);
    group.bench_function("equal_rank", |b| {
        b.iter(|| resolve_aligned(black_box(4), black_box(&x), black_box(&same), -1))
    });

    group.finish();
}

criterion_group!(benches, bench_resolve);
criterion_main!(benches);
