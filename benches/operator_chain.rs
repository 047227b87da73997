use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rs2_observe::{from_iter, Observable, Observer, Stream, StreamError};
use std::cell::Cell;
use std::rc::Rc;

fn drain(stream: &Stream<i64>) -> i64 {
    let last = Rc::new(Cell::new(0));
    let sink = last.clone();
    stream
        .subscribe(Observer::<i64, StreamError>::new().next(move |value| {
            sink.set(black_box(value));
            Ok(())
        }))
        .unwrap();
    last.get()
}

fn bench_operator_chain(c: &mut Criterion) {
    let mut group = c.benchmark_group("operator_chain");

    for size in [1_000i64, 10_000, 100_000].iter() {
        group.bench_with_input(BenchmarkId::new("map_filter_fold", size), size, |b, &size| {
            let stream: Stream<i64> = from_iter(0..size)
                .map(|x| Ok(black_box(x * 2)))
                .filter(|x| Ok(black_box(x % 4 == 0)))
                .fold(0i64, |acc, x| Ok(acc + x));
            b.iter(|| black_box(drain(&stream)));
        });

        group.bench_with_input(BenchmarkId::new("flat_map", size), size, |b, &size| {
            let stream: Stream<i64> = from_iter(0..size / 10).flat_map(|x| Ok(vec![x; 10]));
            b.iter(|| black_box(drain(&stream)));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_operator_chain);
criterion_main!(benches);
