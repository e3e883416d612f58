use airdrop_merkle::{
    encode_leaf, verify_with, BuildConfig, Digest, Distribution, HashAlgorithm, Identity,
    Recipient, TreeBuilder,
};
use criterion::{
    black_box, criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion, Throughput,
};

fn make_recipients(count: usize) -> Vec<Recipient> {
    (0..count)
        .map(|i| {
            let mut bytes = [0u8; 20];
            bytes[12..].copy_from_slice(&(i as u64 + 1).to_be_bytes());
            Recipient::new(Identity(bytes), (i as u64 + 1) * 1_000)
        })
        .collect()
}

fn make_leaves(count: usize, hash: HashAlgorithm) -> Vec<Digest> {
    make_recipients(count)
        .iter()
        .map(|r| encode_leaf(&hash, r))
        .collect()
}

fn bench_build(c: &mut Criterion) {
    let sizes = [1_024usize, 16_384, 65_536];
    for hash in [HashAlgorithm::Sha256, HashAlgorithm::Keccak256] {
        let mut group = c.benchmark_group(format!("build_{}", hash));
        for &size in &sizes {
            let leaves = make_leaves(size, hash);
            group.throughput(Throughput::Elements(size as u64));
            group.bench_with_input(BenchmarkId::from_parameter(size), &leaves, |b, leaves| {
                let builder = TreeBuilder::new(hash);
                b.iter_batched(
                    || leaves.clone(),
                    |leaves| builder.build(leaves).unwrap(),
                    BatchSize::LargeInput,
                );
            });
        }
        group.finish();
    }
}

fn bench_parallel_build(c: &mut Criterion) {
    let size = 65_536usize;
    let leaves = make_leaves(size, HashAlgorithm::Sha256);
    let mut group = c.benchmark_group("build_parallel");
    group.throughput(Throughput::Elements(size as u64));
    for parallel in [false, true] {
        let builder = TreeBuilder::new(HashAlgorithm::Sha256)
            .parallel(parallel)
            .min_parallel_pairs(256);
        group.bench_with_input(BenchmarkId::from_parameter(parallel), &leaves, |b, leaves| {
            b.iter_batched(
                || leaves.clone(),
                |leaves| builder.build(leaves).unwrap(),
                BatchSize::LargeInput,
            );
        });
    }
    group.finish();
}

fn bench_prove_verify(c: &mut Criterion) {
    let (distribution, tree) =
        Distribution::build(make_recipients(1 << 14), &BuildConfig::default()).unwrap();
    let index = distribution.len() / 3;
    let leaf = distribution.leaf(index).unwrap();
    let proof = tree.prove(index).unwrap();
    let root = distribution.root();

    c.bench_function("prove_16384", |b| b.iter(|| tree.prove(black_box(index)).unwrap()));
    c.bench_function("verify_16384", |b| {
        b.iter(|| verify_with(&HashAlgorithm::Sha256, black_box(&leaf), &proof, &root))
    });
}

criterion_group!(benches, bench_build, bench_parallel_build, bench_prove_verify);
criterion_main!(benches);
