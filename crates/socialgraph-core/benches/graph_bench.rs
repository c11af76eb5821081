//! # Graph Benchmarks
//!
//! Performance benchmarks for socialgraph-core queries.
//!
//! Run with: `cargo bench -p socialgraph-core`

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use socialgraph_core::{NewUser, SocialGraph, Timestamp};
use std::hint::black_box;

/// Create a graph with N users where user i follows the next `degree` users.
fn create_ring_graph(size: usize, degree: usize) -> SocialGraph {
    let mut graph = SocialGraph::new(true);
    for i in 0..size {
        graph
            .register(
                &NewUser::new(
                    format!("user{}", i),
                    format!("Synthetic User {}", i),
                    format!("user{}@example.com", i),
                    "",
                ),
                Timestamp(0),
            )
            .expect("register");
    }
    for i in 0..size {
        for step in 1..=degree {
            let j = (i + step) % size;
            graph
                .follow(&format!("user{}", i), &format!("user{}", j), Timestamp(0))
                .expect("follow");
        }
    }
    graph
}

// =============================================================================
// BENCHMARKS
// =============================================================================

fn bench_registration(c: &mut Criterion) {
    let mut group = c.benchmark_group("registration");

    for size in [100, 1000].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, &size| {
            b.iter(|| black_box(create_ring_graph(size, 0)));
        });
    }

    group.finish();
}

fn bench_recommend(c: &mut Criterion) {
    let mut group = c.benchmark_group("recommend");

    for size in [100, 1000, 10000].iter() {
        let graph = create_ring_graph(*size, 8);
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| black_box(graph.recommend("user0", 10)));
        });
    }

    group.finish();
}

fn bench_mutual(c: &mut Criterion) {
    let graph = create_ring_graph(1000, 16);
    c.bench_function("mutual_connections_1000", |b| {
        b.iter(|| black_box(graph.mutual_connections("user0", "user1", 100)));
    });
}

fn bench_popular(c: &mut Criterion) {
    let graph = create_ring_graph(10000, 4);
    c.bench_function("popular_10000", |b| {
        b.iter(|| black_box(graph.popular(10)));
    });
}

fn bench_search(c: &mut Criterion) {
    let mut group = c.benchmark_group("search");
    let graph = create_ring_graph(10000, 0);

    group.bench_function("ranked_prefix", |b| {
        b.iter(|| black_box(graph.search("synth", 25)));
    });
    group.bench_function("ranked_exact", |b| {
        b.iter(|| black_box(graph.search("user42", 25)));
    });

    let plain = {
        let mut g = SocialGraph::new(false);
        for user in graph.users() {
            g.commit_user(user.clone());
        }
        g
    };
    group.bench_function("substring", |b| {
        b.iter(|| black_box(plain.search("42", 25)));
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_registration,
    bench_recommend,
    bench_mutual,
    bench_popular,
    bench_search
);
criterion_main!(benches);
