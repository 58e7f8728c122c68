//! Benchmarks for the topology distributor hot path.

use std::hint::black_box;

use criterion::{Criterion, criterion_group, criterion_main};
use daqforge_core::{PartialBunchPolicy, TopologyRequest};
use daqforge_topology::distribute;

fn bench_synthetic_distribution(c: &mut Criterion) {
    let mut group = c.benchmark_group("synthetic_distribution");

    for &channels in &[64usize, 512, 4096] {
        let request = TopologyRequest::new(channels * 2, channels, 16, 16)
            .with_streams_per_channel(2)
            .with_partial_bunch_policy(PartialBunchPolicy::Absorb);

        group.bench_function(format!("channels_{channels}"), |b| {
            b.iter(|| distribute(None, black_box(&request)).expect("distribution succeeds"));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_synthetic_distribution);
criterion_main!(benches);
