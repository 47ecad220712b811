use criterion::{Criterion, Throughput, criterion_group, criterion_main};
use roomlink::EventBus;
use roomlink::queue::OutboundQueue;
use roomlink_proto::Envelope;
use serde_json::json;
use std::hint::black_box;

// Baselines for the two synchronous hot paths on every emit: local fan-out
// through the bus and draining the outbound queue on activation.

fn bus_publish_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("bus");
    group.throughput(Throughput::Elements(1));

    let bus = EventBus::new();
    for _ in 0..8 {
        bus.subscribe("message", |payload| {
            black_box(payload);
        });
    }
    let payload = json!({"id": "ab12cd34", "author": "ada", "text": "Hello world"});

    group.bench_function("publish_8_subscribers", |b| {
        b.iter(|| bus.publish(black_box("message"), black_box(&payload)))
    });

    group.finish();
}

fn queue_drain_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("queue");
    const BATCH: usize = 1024;
    group.throughput(Throughput::Elements(BATCH as u64));

    let envelope = Envelope::new("message", json!({"text": "Hello world"}));

    group.bench_function("enqueue_then_drain_1024", |b| {
        b.iter(|| {
            let mut queue = OutboundQueue::new(BATCH);
            for _ in 0..BATCH {
                queue.enqueue(envelope.clone());
            }
            queue.drain_into(|env| {
                black_box(env);
            })
        })
    });

    group.finish();
}

criterion_group!(benches, bus_publish_benchmark, queue_drain_benchmark);
criterion_main!(benches);
