//! End-to-end chained hash set scenarios

use slabkit::{ChainedHashSet, HashSetConfig, Hashable, SlabBackend, SystemBackend};
use std::rc::Rc;

/// Key whose hash is chosen by the test
#[derive(Debug, Clone, PartialEq, Eq)]
struct Keyed {
    hash: u32,
    name: &'static str,
}

impl Hashable for Keyed {
    fn hash32(&self) -> u32 {
        self.hash
    }
}

fn keyed(hash: u32, name: &'static str) -> Keyed {
    Keyed { hash, name }
}

#[test]
fn test_colliding_hashes_stay_distinct() {
    let mut set: ChainedHashSet<Keyed> = ChainedHashSet::new(8, 0);
    set.add(keyed(5, "a")).unwrap();
    set.add(keyed(5, "b")).unwrap();
    set.add(keyed(13, "c")).unwrap();
    assert_eq!(set.len(), 3);
    assert_eq!(set.bucket_lengths()[5], 3);

    assert!(set.remove(&keyed(5, "a")));
    assert!(!set.contains(&keyed(5, "a")));
    assert!(set.contains(&keyed(5, "b")));
    assert!(set.contains(&keyed(13, "c")));
}

#[test]
fn test_growth_keeps_every_item_reachable() {
    let mut set: ChainedHashSet<String> = ChainedHashSet::with_config(&HashSetConfig {
        initial_bins: 3,
        initial_trigger: 0,
    });
    assert_eq!(set.bins(), 4);

    let words: Vec<String> = (0..2_000).map(|i| format!("word-{}", i)).collect();
    for word in &words {
        set.add(word.clone()).unwrap();
    }
    assert_eq!(set.len(), words.len());
    assert!(set.bins().is_power_of_two());
    assert!(set.len() <= set.trigger());

    for word in &words {
        assert_eq!(set.find(word.as_str()), Some(word));
    }
    assert!(!set.contains("word-2000"));
}

#[test]
fn test_bucket_lengths_sum_to_len() {
    let set: ChainedHashSet<u64> = (0..777u64).map(|i| i * 31).collect();
    assert_eq!(set.bucket_lengths().iter().sum::<usize>(), set.len());
    assert!(set.longest_chain() >= 1);
}

#[test]
fn test_interleaved_add_remove() {
    let mut set: ChainedHashSet<u32> = ChainedHashSet::new(16, 0);
    for i in 0..1_000u32 {
        set.add(i).unwrap();
        if i % 4 == 3 {
            assert!(set.remove(&(i - 2)));
        }
    }
    assert_eq!(set.len(), 750);
    for i in 0..1_000u32 {
        assert_eq!(set.contains(&i), i % 4 != 1, "membership of {}", i);
    }
}

#[test]
fn test_shared_items() {
    let names: Vec<Rc<str>> = ["ada", "grace", "edsger"].iter().map(|&s| Rc::from(s)).collect();
    let mut set: ChainedHashSet<Rc<str>> = ChainedHashSet::new(4, 0);
    for name in &names {
        set.add(Rc::clone(name)).unwrap();
    }
    assert_eq!(Rc::strong_count(&names[1]), 2);

    let taken = set.take(&Rc::<str>::from("grace")).unwrap();
    assert!(Rc::ptr_eq(&taken, &names[1]));
    drop(taken);
    assert_eq!(Rc::strong_count(&names[1]), 1);

    drop(set);
    assert!(names.iter().all(|n| Rc::strong_count(n) == 1));
}

#[test]
fn test_backends_agree() {
    let mut slab: ChainedHashSet<u64, SlabBackend> = ChainedHashSet::new(2, 0);
    let mut system: ChainedHashSet<u64, SystemBackend> = ChainedHashSet::new(2, 0);
    for i in (0..500u64).map(|i| i * 7919) {
        slab.add(i).unwrap();
        system.add(i).unwrap();
    }
    for i in (0..500u64).step_by(3).map(|i| i * 7919) {
        assert!(slab.remove(&i));
        assert!(system.remove(&i));
    }

    let mut a: Vec<u64> = slab.iter().copied().collect();
    let mut b: Vec<u64> = system.iter().copied().collect();
    a.sort_unstable();
    b.sort_unstable();
    assert_eq!(a, b);
    assert_eq!(slab.backend().pool().live_items(), slab.len());
    assert_eq!(system.backend().live_nodes(), system.len());
}

#[test]
fn test_clone_is_independent() {
    let mut original: ChainedHashSet<String> =
        ["x", "y", "z"].iter().map(|s| s.to_string()).collect();
    let copy = original.clone();
    original.clear();
    assert!(original.is_empty());
    assert_eq!(copy.len(), 3);
    assert!(copy.contains("y"));
}
