use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use driftbench::{ActivePtw, ActivePtwPolicy, BanditPolicy};
use std::hint::black_box;

fn bench_ptw(c: &mut Criterion) {
    // A deterministic pull/reward stream (length chosen to dwarf setup costs).
    let n = 4096usize;
    let mut stream: Vec<(bool, usize)> = Vec::with_capacity(n);
    for i in 0..n {
        // two regimes so the tree keeps real segment structure alive
        let arm = i % 10;
        let reward = if i < n / 2 { arm == 3 } else { i % 7 != 0 };
        stream.push((reward, arm));
    }

    let mut group = c.benchmark_group("ptw_update");

    for depth in [20usize, 30usize] {
        group.bench_with_input(BenchmarkId::new("tree", depth), &depth, |b, &d| {
            b.iter(|| {
                let mut tree = ActivePtw::new(d, 10);
                for &(r, k) in &stream {
                    tree.update(r, k);
                }
                black_box(tree.log_marginal());
            })
        });
    }

    group.bench_function("level_posterior", |b| {
        let mut tree = ActivePtw::new(30, 10);
        for &(r, k) in &stream {
            tree.update(r, k);
        }
        b.iter(|| black_box(tree.level_posterior()))
    });

    group.bench_function("policy_step", |b| {
        b.iter(|| {
            let mut policy = ActivePtwPolicy::new(1, 10);
            for &(r, k) in &stream[..512] {
                let arm = policy.get_action();
                black_box(arm);
                policy.update(k, r);
            }
        })
    });

    group.finish();
}

criterion_group!(benches, bench_ptw);
criterion_main!(benches);
