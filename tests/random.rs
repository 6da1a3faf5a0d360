use std::collections::HashMap;
use std::hash::{BuildHasher, Hasher};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use swissmap_rs::{Builder, SwissMap};

/// Hasher that maps every key to the same value. Exercises probe-sequence
/// termination, tombstone recycling, and the degenerate split paths.
#[derive(Clone)]
struct ConstBuildHasher(u64);

struct ConstHasher(u64);

impl Hasher for ConstHasher {
    fn finish(&self) -> u64 {
        self.0
    }

    fn write(&mut self, _bytes: &[u8]) {}
}

impl BuildHasher for ConstBuildHasher {
    type Hasher = ConstHasher;

    fn build_hasher(&self) -> ConstHasher {
        ConstHasher(self.0)
    }
}

fn random_workload<S: BuildHasher>(mut m: SwissMap<u64, u64, S>, rng: &mut StdRng, ops: usize) {
    let mut model: HashMap<u64, u64> = HashMap::new();
    let mut live: Vec<u64> = Vec::new();

    for op in 0..ops {
        match rng.gen_range(0..100) {
            0..=49 => {
                // insert
                let k: u64 = rng.gen_range(0..1 << 16);
                let v: u64 = rng.gen();
                let was_present = model.contains_key(&k);
                assert_eq!(m.insert(k, v), model.insert(k, v), "insert key {k}");
                if !was_present {
                    live.push(k);
                }
            }
            50..=64 => {
                // update an existing key
                if !live.is_empty() {
                    let k = live[rng.gen_range(0..live.len())];
                    let v: u64 = rng.gen();
                    assert_eq!(m.insert(k, v), model.insert(k, v));
                }
            }
            65..=79 => {
                // delete
                if !live.is_empty() {
                    let idx = rng.gen_range(0..live.len());
                    let k = live.swap_remove(idx);
                    assert_eq!(m.remove(&k), model.remove(&k));
                }
            }
            _ => {
                // lookup
                if !live.is_empty() {
                    let idx = rng.gen_range(0..live.len());
                    let k = live[idx];
                    assert_eq!(m.get(&k), model.get(&k));
                }
            }
        }
        assert_eq!(m.len(), model.len());

        if op % 1000 == 999 {
            let snapshot: HashMap<u64, u64> = m.iter().map(|(k, v)| (*k, *v)).collect();
            assert_eq!(snapshot, model);
        }
    }

    let snapshot: HashMap<u64, u64> = m.iter().map(|(k, v)| (*k, *v)).collect();
    assert_eq!(snapshot, model);
}

#[test]
fn test_random_workload_default() {
    let mut rng = StdRng::seed_from_u64(0x5115_5a9d);
    random_workload(SwissMap::new(), &mut rng, 10_000);
}

#[test]
fn test_random_workload_tiny_buckets() {
    // max_bucket_capacity 7 makes every growth a split, driving the
    // directory code end to end.
    let mut rng = StdRng::seed_from_u64(0x7a11_b0c4);
    let m: SwissMap<u64, u64> = Builder::new().max_bucket_capacity(7).build(0);
    random_workload(m, &mut rng, 10_000);
}

#[test]
fn test_random_workload_degenerate_hash() {
    // A constant hash forces every entry into one probe-heavy bucket and
    // makes every split degenerate.
    let mut rng = StdRng::seed_from_u64(0xdead_beef);
    for h in [0u64, u64::MAX, 0x0123_4567_89ab_cdef, 0x8000_0000_0000_0000] {
        let m: SwissMap<u64, u64, ConstBuildHasher> = Builder::new()
            .hasher(ConstBuildHasher(h))
            .max_bucket_capacity(512)
            .build(0);
        random_workload(m, &mut rng, 10_000);

        let m: SwissMap<u64, u64, ConstBuildHasher> = Builder::new()
            .hasher(ConstBuildHasher(h))
            .max_bucket_capacity(7)
            .build(0);
        random_workload(m, &mut rng, 2_000);
    }
}

#[test]
fn test_split_and_resize_agree() {
    // The always-split and the never-split configuration must hold exactly
    // the same entries after a large identical workload.
    let mut rng = StdRng::seed_from_u64(0xca7_f00d);
    let count = 300_000 + rng.gen_range(0..100_000);

    let mut split: SwissMap<u64, u64> = Builder::new().max_bucket_capacity(7).build(count);
    let mut resize: SwissMap<u64, u64> = Builder::new().max_bucket_capacity(usize::MAX).build(count);

    let mut x = 0u64;
    for _ in 0..count {
        x += rng.gen_range(1..128);
        split.insert(x, x);
        resize.insert(x, x);
    }
    assert_eq!(split.len(), resize.len());

    let mut a: Vec<(u64, u64)> = split.iter().map(|(k, v)| (*k, *v)).collect();
    let mut b: Vec<(u64, u64)> = resize.iter().map(|(k, v)| (*k, *v)).collect();
    a.sort_unstable();
    b.sort_unstable();
    assert_eq!(a, b);
}
