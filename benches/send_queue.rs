//! Benchmarks for the producer path and batch assembly.

use criterion::{BatchSize, Criterion, black_box, criterion_group, criterion_main};
use femtobatch::{
    FemtoMessage, SendQueue, SharedMessageFormatter,
    http_device::{BatchLimits, build_batch},
};

const MESSAGE: &str = "GET /index.html 200 1532 0.004s user=42 region=eu-west-1";

fn filled_queue(count: usize) -> SendQueue {
    let queue = SendQueue::new(usize::MAX);
    for _ in 0..count {
        queue.enqueue(FemtoMessage::text(MESSAGE));
    }
    queue
}

fn bench_enqueue(c: &mut Criterion) {
    let queue = SendQueue::new(1 << 27);
    c.bench_function("send_queue_enqueue_dequeue", |b| {
        b.iter(|| {
            queue.enqueue(black_box(FemtoMessage::text(MESSAGE)));
            black_box(queue.dequeue());
        });
    });
}

fn bench_build_batch(c: &mut Criterion) {
    let formatter = SharedMessageFormatter::default();
    let limits = BatchLimits {
        max_batch_size: 100,
        max_message_bytesize: 1 << 16,
        byte_budget: 100 * (1 << 16) - (1 << 16) - 2,
        max_batch_bytesize: 100 * (1 << 16),
    };
    c.bench_function("build_batch_100", |b| {
        b.iter_batched(
            || filled_queue(100),
            |queue| black_box(build_batch(&queue, &formatter, limits).payload()),
            BatchSize::SmallInput,
        );
    });
}

criterion_group!(benches, bench_enqueue, bench_build_batch);
criterion_main!(benches);
