use std::collections::BTreeMap;

use proptest::prelude::*;

use swissmap_rs::{Builder, SwissMap};

/// Actions applied identically to the map and to a BTreeMap model. Keys are
/// `u16` so sequences collide often enough to hit tombstones and rehashes.
#[derive(Debug, Clone)]
enum Action {
    Insert(u16, u64),
    Get(u16),
    Remove(u16),
    Clear,
}

fn action() -> impl Strategy<Value = Action> {
    prop_oneof![
        4 => (any::<u16>(), any::<u64>()).prop_map(|(k, v)| Action::Insert(k, v)),
        2 => any::<u16>().prop_map(Action::Get),
        2 => any::<u16>().prop_map(Action::Remove),
        1 => Just(Action::Clear),
    ]
}

fn run(mut m: SwissMap<u16, u64>, actions: &[Action]) {
    let mut model: BTreeMap<u16, u64> = BTreeMap::new();

    for a in actions {
        match *a {
            Action::Insert(k, v) => {
                assert_eq!(m.insert(k, v), model.insert(k, v));
            }
            Action::Get(k) => {
                assert_eq!(m.get(&k), model.get(&k));
            }
            Action::Remove(k) => {
                assert_eq!(m.remove(&k), model.remove(&k));
            }
            Action::Clear => {
                m.clear();
                model.clear();
            }
        }
        assert_eq!(m.len(), model.len());
    }

    let snapshot: BTreeMap<u16, u64> = m.iter().map(|(k, v)| (*k, *v)).collect();
    assert_eq!(snapshot, model);
    assert_eq!(m.iter().count(), model.len());
}

proptest! {
    #[test]
    fn matches_model(actions in prop::collection::vec(action(), 1..400)) {
        run(SwissMap::new(), &actions);
    }

    #[test]
    fn matches_model_tiny_buckets(actions in prop::collection::vec(action(), 1..400)) {
        let m: SwissMap<u16, u64> = Builder::new().max_bucket_capacity(7).build(0);
        run(m, &actions);
    }
}
