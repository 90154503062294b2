use crate::byte_set::ByteSet;

#[test]
fn insert_contains_remove() {
    let mut s = ByteSet::new();
    assert!(s.is_empty());

    s.insert(0);
    s.insert(b'a');
    s.insert(255);
    assert!(s.contains(0));
    assert!(s.contains(b'a'));
    assert!(s.contains(255));
    assert!(!s.contains(b'b'));
    assert_eq!(s.len(), 3);

    s.remove(b'a');
    assert!(!s.contains(b'a'));
    assert_eq!(s.len(), 2);
}

#[test]
fn range_is_inclusive() {
    let s = ByteSet::range(b'0', b'9');
    assert_eq!(s.len(), 10);
    assert!(s.contains(b'0'));
    assert!(s.contains(b'9'));
    assert!(!s.contains(b'a'));

    let full = ByteSet::range(0, 255);
    assert_eq!(full.len(), 256);
    assert_eq!(full, ByteSet::full());
}

#[test]
fn iter_ascending() {
    let s = ByteSet::from_bytes([b'z', b'a', b'm']);
    let bytes: Vec<u8> = s.iter().collect();
    assert_eq!(bytes, vec![b'a', b'm', b'z']);
}

#[test]
fn set_algebra() {
    let digits = ByteSet::range(b'0', b'9');
    let hex = digits.union(&ByteSet::range(b'a', b'f'));
    assert_eq!(hex.len(), 16);

    assert_eq!(hex.intersection(&digits), digits);
    assert_eq!(hex.difference(&digits), ByteSet::range(b'a', b'f'));
    assert_eq!(digits.complement().len(), 246);
}

#[test]
fn min_and_singleton() {
    assert_eq!(ByteSet::new().min(), None);
    assert_eq!(ByteSet::singleton(7).min(), Some(7));
    assert_eq!(ByteSet::from_bytes([200, 3, 90]).min(), Some(3));
}

#[test]
fn debug_renders_ranges() {
    let mut s = ByteSet::range(b'a', b'c');
    s.insert(b'0');
    assert_eq!(format!("{s:?}"), "{30, 61-63}");
}
