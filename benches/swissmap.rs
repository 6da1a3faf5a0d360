use criterion::{black_box, criterion_group, criterion_main, Criterion};
use std::collections::HashMap;
use swissmap_rs::{Builder, SwissMap};

fn bench_insert_get_remove_swissmap(c: &mut Criterion) {
    c.bench_function("swissmap_insert_get_remove", |b| {
        b.iter(|| {
            let mut m = SwissMap::<u64, u64>::with_capacity(8192);
            for i in 0..50_000 {
                m.insert(i, i);
            }
            for i in 0..50_000 {
                let _ = m.get(&i);
            }
            for i in 0..50_000 {
                let _ = m.remove(&i);
            }
            black_box(m.len())
        })
    });
}

fn bench_insert_get_remove_hashmap(c: &mut Criterion) {
    c.bench_function("hashmap_insert_get_remove", |b| {
        b.iter(|| {
            let mut m = HashMap::<u64, u64>::with_capacity(8192);
            for i in 0..50_000 {
                m.insert(i, i);
            }
            for i in 0..50_000 {
                let _ = m.get(&i);
            }
            for i in 0..50_000 {
                let _ = m.remove(&i);
            }
            black_box(m.len())
        })
    });
}

fn bench_read_heavy_swissmap(c: &mut Criterion) {
    c.bench_function("swissmap_read_heavy", |b| {
        let mut m = SwissMap::<u64, u64>::with_capacity(8192);
        for i in 0..10_000 {
            m.insert(i, i);
        }

        b.iter(|| {
            for i in 0..50_000 {
                let _ = black_box(m.get(&(i % 10_000)));
            }
        })
    });
}

fn bench_read_heavy_hashmap(c: &mut Criterion) {
    c.bench_function("hashmap_read_heavy", |b| {
        let mut m = HashMap::<u64, u64>::with_capacity(8192);
        for i in 0..10_000 {
            m.insert(i, i);
        }

        b.iter(|| {
            for i in 0..50_000 {
                let _ = black_box(m.get(&(i % 10_000)));
            }
        })
    });
}

// Growth cost at a large size: one bucket split against one full-table
// resize. Splits should show a much flatter tail.
fn bench_grow_split_vs_resize(c: &mut Criterion) {
    c.bench_function("swissmap_grow_splitting", |b| {
        b.iter(|| {
            let mut m: SwissMap<u64, u64> = Builder::new().max_bucket_capacity(4095).build(0);
            for i in 0..200_000u64 {
                m.insert(i.wrapping_mul(0x9e37_79b9_7f4a_7c15), i);
            }
            black_box(m.len())
        })
    });

    c.bench_function("swissmap_grow_resizing", |b| {
        b.iter(|| {
            let mut m: SwissMap<u64, u64> = Builder::new().max_bucket_capacity(usize::MAX).build(0);
            for i in 0..200_000u64 {
                m.insert(i.wrapping_mul(0x9e37_79b9_7f4a_7c15), i);
            }
            black_box(m.len())
        })
    });
}

criterion_group!(
    benches,
    bench_insert_get_remove_swissmap,
    bench_insert_get_remove_hashmap,
    bench_read_heavy_swissmap,
    bench_read_heavy_hashmap,
    bench_grow_split_vs_resize,
);
criterion_main!(benches);
