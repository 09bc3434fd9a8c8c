//! # Stream Benchmarks
//!
//! Performance benchmarks for trellis-core hashes, streams and the model.
//!
//! Run with: `cargo bench -p trellis-core`

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use std::hint::black_box;
use std::rc::Rc;
use trellis_core::{Hash, Model, Node, PutFlags, Statement, StatementField, Stream, World};

fn object(i: usize) -> Rc<Node> {
    Rc::new(Node::literal(i.to_string()))
}

fn prototype() -> Statement {
    Statement::from_nodes(
        Node::resource("http://example.org/s").expect("uri"),
        Node::resource("http://example.org/p").expect("uri"),
        Node::blank("o"),
    )
}

/// Create a memory hash with N keys, one value each.
fn create_hash(size: usize) -> Hash {
    let mut hash = Hash::memory().expect("hash");
    for i in 0..size {
        hash.put(format!("key{i:06}"), i.to_string(), PutFlags::REPLACE)
            .expect("put");
    }
    hash
}

// =============================================================================
// BENCHMARKS
// =============================================================================

fn bench_hash_put(c: &mut Criterion) {
    let mut group = c.benchmark_group("hash_put");

    for size in [100, 1000, 10000] {
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
            b.iter(|| black_box(create_hash(size)));
        });
    }

    group.finish();
}

fn bench_hash_cursor_walk(c: &mut Criterion) {
    let mut group = c.benchmark_group("hash_cursor_walk");

    for size in [100, 1000, 10000] {
        let hash = create_hash(size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &hash, |b, hash| {
            b.iter(|| black_box(hash.entries().expect("entries").count()));
        });
    }

    group.finish();
}

fn bench_mapped_stream(c: &mut Criterion) {
    let mut group = c.benchmark_group("mapped_stream");

    for size in [100, 1000, 10000] {
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
            let proto = prototype();
            b.iter(|| {
                let mut stream = Stream::from_node_iterator(
                    (0..size).map(object),
                    &proto,
                    StatementField::Object,
                );
                let mut keep = false;
                stream.set_map(move |s| {
                    keep = !keep;
                    keep.then(|| s.clone())
                });
                black_box(stream.into_statements().count())
            });
        });
    }

    group.finish();
}

fn bench_model_targets(c: &mut Criterion) {
    let mut group = c.benchmark_group("model_targets");
    let world = World::new().expect("world");

    for size in [100, 1000] {
        let mut model = Model::new(&world, None, Some("bench")).expect("model");
        let proto = prototype();
        let mut input =
            Stream::from_node_iterator((0..size).map(object), &proto, StatementField::Object);
        model.add_statements(&mut input).expect("add");

        group.bench_with_input(BenchmarkId::from_parameter(size), &model, |b, model| {
            b.iter(|| {
                let stream = model
                    .targets_stream(&proto.subject, &proto.predicate)
                    .expect("query");
                black_box(stream.into_statements().count())
            });
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_hash_put,
    bench_hash_cursor_walk,
    bench_mapped_stream,
    bench_model_targets,
);
criterion_main!(benches);
