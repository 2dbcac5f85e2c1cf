//! Digest engine benchmarks: payload sizes representative of audit/log
//! records (small) through journal payloads (large).

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use jald_digest::{digest_buffer, digest_fd};
use std::io::Write;

fn bench_digest_buffer_sizes(c: &mut Criterion) {
    let sizes: &[usize] = &[64, 1024, 8192, 65536, 1 << 20];
    let mut group = c.benchmark_group("digest_buffer");

    for &size in sizes {
        let data = vec![0xABu8; size];
        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::new("sha256", size), &size, |b, _| {
            b.iter(|| black_box(digest_buffer(&data)));
        });
    }
    group.finish();
}

fn bench_digest_fd_sizes(c: &mut Criterion) {
    let sizes: &[usize] = &[8192, 65536, 1 << 20];
    let mut group = c.benchmark_group("digest_fd");

    for &size in sizes {
        let data = vec![0xCDu8; size];
        let mut tmp = tempfile::tempfile().unwrap();
        tmp.write_all(&data).unwrap();
        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::new("sha256", size), &size, |b, _| {
            b.iter(|| black_box(digest_fd(&mut tmp).unwrap()));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_digest_buffer_sizes, bench_digest_fd_sizes);
criterion_main!(benches);
