use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use std::hint::black_box;
use std::time::Duration;

use tincan_use::image::srcset;
use tincan_use::{watch, AsyncState, AsyncStateOptions, ImageSource, Signal, Viewport};

fn signal_write_benchmark(c: &mut Criterion) {
    let signal: Signal<i32> = Signal::new(0);

    c.bench_function("signal_write", |b| {
        let mut i = 0;
        b.iter(|| {
            signal.set(black_box(i));
            i += 1;
        });
    });
}

fn signal_subscribe_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("signal_subscribe");

    for subscriber_count in [1, 10, 100].iter() {
        let signal = Signal::new(0usize);
        let _subscriptions: Vec<_> = (0..*subscriber_count)
            .map(|_| {
                signal.subscribe(|_| {
                    // Empty subscriber
                })
            })
            .collect();

        group.bench_with_input(
            BenchmarkId::from_parameter(subscriber_count),
            subscriber_count,
            |b, _| {
                let mut i = 0;
                b.iter(|| {
                    signal.update(|value| *value = black_box(i));
                    i += 1;
                });
            },
        );
    }
    group.finish();
}

fn watch_deep_equality_benchmark(c: &mut Criterion) {
    let source = Signal::new(ImageSource::new("a.png").unwrap());
    let _watch = watch(&source, |_, _| {});
    let unchanged = source.get();

    c.bench_function("watch_unchanged_source", |b| {
        b.iter(|| source.set(black_box(unchanged.clone())));
    });
}

fn srcset_select_benchmark(c: &mut Criterion) {
    let candidates =
        srcset::parse_srcset("a-320.png 320w, a-640.png 640w, a-1280.png 1280w, a-2560.png 2560w")
            .unwrap();
    let sizes = srcset::parse_sizes("(max-width: 600px) 100vw, (max-width: 1200px) 50vw, 800px")
        .unwrap();
    let viewport = Viewport::new(1440.0, 2.0);

    c.bench_function("srcset_select", |b| {
        b.iter(|| {
            black_box(srcset::select(
                "a.png",
                black_box(&candidates),
                &sizes,
                &viewport,
            ));
        });
    });
}

fn async_state_execute_benchmark(c: &mut Criterion) {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .build()
        .unwrap();
    let state = AsyncState::new(
        || async { Ok::<u64, String>(1) },
        AsyncStateOptions::default().with_immediate(false),
    );

    c.bench_function("async_state_execute", |b| {
        b.iter(|| runtime.block_on(state.execute(black_box(Duration::ZERO))));
    });
}

criterion_group!(
    benches,
    signal_write_benchmark,
    signal_subscribe_benchmark,
    watch_deep_equality_benchmark,
    srcset_select_benchmark,
    async_state_execute_benchmark,
);
criterion_main!(benches);
