use std::{
    cmp::Ordering,
    panic::{self, AssertUnwindSafe},
    thread,
    time::{SystemTime, UNIX_EPOCH},
};

use rand::{rngs::StdRng, seq::SliceRandom, Rng, SeedableRng};

use crate::llrb::Llrb;

#[test]
fn test_cursor_empty() {
    let llrb: Llrb<i64> = Llrb::new("test-cursor");
    let mut cursor = llrb.cursor();
    assert!(!cursor.has_next(&llrb));
    assert_eq!(cursor.peek(&llrb), None);
    assert_eq!(cursor.advance(&llrb), None);
}

#[test]
fn test_cursor_walk() {
    let seed = make_seed();
    println!("test_cursor_walk seed {}", seed);
    let mut rng = StdRng::seed_from_u64(seed);

    let llrb = Llrb::load_from("test-cursor", shuffled(1000, &mut rng));
    let mut cursor = llrb.cursor();
    for expected in 0..1000 {
        assert!(cursor.has_next(&llrb));
        assert_eq!(cursor.peek(&llrb), Some(&expected));
        assert_eq!(cursor.peek(&llrb), Some(&expected));
        assert_eq!(cursor.advance(&llrb), Some(&expected));
    }
    assert!(!cursor.has_next(&llrb));
    assert_eq!(cursor.advance(&llrb), None);

    let items: Vec<i64> = (&llrb).into_iter().cloned().collect();
    assert_eq!(items, (0..1000).collect::<Vec<i64>>());
}

#[test]
fn test_cursor_remove_yielded() {
    let seed = make_seed();
    println!("test_cursor_remove_yielded seed {}", seed);
    let mut rng = StdRng::seed_from_u64(seed);

    for _ in 0..100 {
        let n = 20;
        let mut llrb = Llrb::load_from("test-cursor", shuffled(n, &mut rng));
        let mut cursor = llrb.cursor();
        for expected in 0..n {
            assert!(cursor.has_next(&llrb));
            let value = *cursor.advance(&llrb).unwrap();
            assert_eq!(value, expected);
            assert_eq!(llrb.remove(&value), Some(value));
            assert!(cursor.is_stale(&llrb));
            assert!(llrb.validate().is_ok());
        }
        assert!(!cursor.has_next(&llrb));
        assert!(llrb.is_empty());
    }
}

#[test]
fn test_cursor_remove_midway() {
    let (val, size) = (56, 5000);
    let seed = make_seed();
    println!("test_cursor_remove_midway seed {}", seed);
    let mut rng = StdRng::seed_from_u64(seed);

    let mut llrb = Llrb::load_from("test-cursor", shuffled(size, &mut rng));

    let mut cursor = llrb.cursor();
    for expected in 0..=val {
        assert_eq!(cursor.advance(&llrb), Some(&expected));
    }
    assert_eq!(llrb.remove(&val), Some(val));
    assert!(!llrb.contains(&val));

    for expected in (val + 1)..size {
        assert!(cursor.has_next(&llrb));
        assert_eq!(cursor.advance(&llrb), Some(&expected));
    }
    assert!(!cursor.has_next(&llrb));
    assert_eq!(llrb.len(), (size - 1) as usize);
}

#[test]
fn test_cursor_remove_pending() {
    let mut llrb = Llrb::load_from("test-cursor", 0..100_i64);
    let mut cursor = llrb.cursor();
    for expected in 0..=10 {
        assert_eq!(cursor.advance(&llrb), Some(&expected));
    }
    // 11 is where the cursor stands, resume at its successor.
    assert_eq!(cursor.peek(&llrb), Some(&11));
    llrb.remove(&11);
    llrb.remove(&12);
    assert_eq!(cursor.peek(&llrb), Some(&13));
    assert_eq!(cursor.advance(&llrb), Some(&13));

    // remove everything ahead of the cursor.
    for value in 14..100 {
        llrb.remove(&value);
    }
    assert!(!cursor.has_next(&llrb));
    assert_eq!(cursor.advance(&llrb), None);
    assert_eq!(llrb.len(), 12);
}

#[test]
fn test_cursor_add_ahead() {
    let mut llrb = Llrb::load_from("test-cursor", (0..20_i64).map(|x| x * 2));
    let mut cursor = llrb.cursor();
    assert_eq!(cursor.advance(&llrb), Some(&0));

    // 1 sorts before the cursor position, 3 and 41 after it.
    llrb.add(1);
    llrb.add(3);
    llrb.add(41);

    let mut items = vec![];
    while let Some(value) = cursor.advance(&llrb) {
        items.push(*value);
    }
    let mut expected: Vec<i64> = (1..20).map(|x| x * 2).collect();
    expected.extend_from_slice(&[3, 41]);
    expected.sort();
    assert_eq!(items, expected);
}

#[test]
fn test_cursor_exhausted() {
    let mut llrb = Llrb::load_from("test-cursor", 0..10_i64);
    let mut cursor = llrb.cursor();
    while cursor.advance(&llrb).is_some() {}

    llrb.add(100);
    assert!(cursor.is_stale(&llrb));
    assert!(!cursor.has_next(&llrb));
    assert!(!cursor.is_stale(&llrb));
    assert_eq!(cursor.advance(&llrb), None);
}

#[test]
fn test_cursor_clear() {
    let mut llrb = Llrb::load_from("test-cursor", 0..10_i64);
    let mut cursor = llrb.cursor();
    assert_eq!(cursor.advance(&llrb), Some(&0));
    llrb.clear();
    assert!(!cursor.has_next(&llrb));

    llrb.extend(0..10);
    let mut cursor = llrb.cursor();
    assert_eq!(cursor.advance(&llrb), Some(&0));
}

#[test]
#[should_panic]
fn test_cursor_other_tree() {
    let llrb = Llrb::load_from("test-cursor", 0..10_i64);
    let other = Llrb::load_from("test-cursor", 0..10_i64);
    let mut cursor = llrb.cursor();
    cursor.advance(&other);
}

#[test]
#[should_panic]
fn test_cursor_cloned_tree() {
    let llrb = Llrb::load_from("test-cursor", 0..10_i64);
    let mut cursor = llrb.cursor();
    let other = llrb.clone();
    cursor.has_next(&other);
}

#[test]
fn test_cursor_random_mutations() {
    let size = 1000;
    let seed = make_seed();
    println!("test_cursor_random_mutations seed {}", seed);
    let mut rng = StdRng::seed_from_u64(seed);

    let mut llrb: Llrb<i64> = Llrb::new("test-cursor");
    let mut refns = RefNodes::new(size);
    for value in shuffled(size as i64, &mut rng).into_iter().step_by(2) {
        llrb.add(value);
        refns.add(value);
    }

    let mut cursor = llrb.cursor();
    // value the cursor stands on, None once exhausted.
    let mut anchor = refns.ceil(0);
    for _ in 0..20_000 {
        let value: i64 = rng.gen_range(0..size as i64);
        match rng.gen_range(0..10) {
            0..=2 => assert_eq!(llrb.add(value), refns.add(value)),
            3..=5 => assert_eq!(llrb.remove(&value), refns.remove(value)),
            6 => {
                anchor = anchor.and_then(|a| refns.ceil(a));
                assert_eq!(cursor.peek(&llrb).copied(), anchor);
            }
            _ => {
                let expected = anchor.and_then(|a| refns.ceil(a));
                assert_eq!(cursor.advance(&llrb).copied(), expected);
                anchor = expected.and_then(|a| refns.ceil(a + 1));
            }
        }
        if anchor.is_none() {
            cursor = llrb.cursor();
            anchor = refns.ceil(0);
        }
    }
    assert!(llrb.validate().is_ok());
}

// Ord that panics when either side is negative.
#[derive(Clone, Debug, PartialEq, Eq)]
struct Fused(i64);

impl PartialOrd for Fused {
    fn partial_cmp(&self, other: &Fused) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Fused {
    fn cmp(&self, other: &Fused) -> Ordering {
        if self.0 < 0 || other.0 < 0 {
            panic!("comparing fused value");
        }
        self.0.cmp(&other.0)
    }
}

#[test]
fn test_cursor_cmp_panic() {
    let mut llrb = Llrb::load_from("test-cursor", (0..64).map(Fused));
    let mut cursor = llrb.cursor();
    assert_eq!(cursor.advance(&llrb), Some(&Fused(0)));

    let version = llrb.version();
    let res = panic::catch_unwind(AssertUnwindSafe(|| llrb.add(Fused(-1))));
    assert!(res.is_err());

    // the half done add lost the tree, cursor must not trust its stack.
    assert_ne!(llrb.version(), version);
    assert!(cursor.is_stale(&llrb));
    assert!(!cursor.has_next(&llrb));
    assert_eq!(cursor.peek(&llrb), None);
    assert_eq!(cursor.advance(&llrb), None);
}

// value whose original panics on drop, clones are harmless.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord)]
struct Armed(i64, bool);

impl Clone for Armed {
    fn clone(&self) -> Armed {
        Armed(self.0, false)
    }
}

impl Drop for Armed {
    fn drop(&mut self) {
        if self.1 && !thread::panicking() {
            panic!("dropping armed value {}", self.0);
        }
    }
}

#[test]
fn test_cursor_drop_panic() {
    let values = (0..64).map(|x| Armed(x, x == 40));
    let mut llrb = Llrb::load_from("test-cursor", values);
    let mut cursor = llrb.cursor();
    assert_eq!(cursor.advance(&llrb).map(|x| x.0), Some(0));

    let version = llrb.version();
    let res = panic::catch_unwind(AssertUnwindSafe(|| llrb.clear()));
    assert!(res.is_err());

    assert_ne!(llrb.version(), version);
    assert!(cursor.is_stale(&llrb));
    assert!(!cursor.has_next(&llrb));
    assert!(llrb.is_empty());
}

include!("./ref_test.rs");
