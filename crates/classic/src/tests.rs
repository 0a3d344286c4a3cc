use super::*;

fn opts(name: &str, n: u64, error_rate: f64) -> FilterOptions {
    FilterOptions {
        name: name.to_string(),
        n,
        error_rate,
    }
}

#[test]
fn create_add_test_scenario() {
    let f = ClassicFilter::new(opts("t1", 100, 0.1)).unwrap();
    assert_eq!(f.capacity(), 480);
    assert_eq!(f.k(), 4);

    assert!(!f.test(b"a"));
    f.add(b"a");
    assert!(f.test(b"a"));
    assert!(!f.test(b"c"));
}

#[test]
fn fill_ratio_exact_scenario() {
    let f = ClassicFilter::new(opts("t1", 100, 0.1)).unwrap();
    f.add(b"a");
    f.add(b"b");
    f.add(b"c");
    assert_eq!(f.fill_ratio(), 0.025);
}

#[test]
fn no_false_negatives() {
    let f = ClassicFilter::new(opts("t3", 1000, 0.05)).unwrap();
    let keys: Vec<String> = (0..500).map(|i| format!("key-{i}")).collect();
    for k in &keys {
        f.add(k.as_bytes());
    }
    for k in &keys {
        assert!(f.test(k.as_bytes()), "false negative for {k}");
    }
}

#[test]
fn test_and_add_returns_prewrite_verdict() {
    let f = ClassicFilter::new(opts("t4", 100, 0.1)).unwrap();
    assert!(!f.test_and_add(b"x"));
    assert!(f.test_and_add(b"x"));
    assert_eq!(f.count(), 2);
}

#[test]
fn reset_clears_buckets_and_count() {
    let f = ClassicFilter::new(opts("t5", 100, 0.1)).unwrap();
    f.add(b"a");
    f.add(b"b");
    f.reset();
    assert_eq!(f.count(), 0);
    assert_eq!(f.fill_ratio(), 0.0);
    assert!(!f.test(b"a"));
}

#[test]
fn invalid_options_rejected() {
    assert!(matches!(
        ClassicFilter::new(opts("bad", 0, 0.1)),
        Err(ClassicFilterError::InvalidOptions)
    ));
    assert!(matches!(
        ClassicFilter::new(opts("bad", 100, 0.0)),
        Err(ClassicFilterError::InvalidOptions)
    ));
    assert!(matches!(
        ClassicFilter::new(opts("bad", 100, 0.2)),
        Err(ClassicFilterError::InvalidOptions)
    ));
}

#[test]
fn dump_load_roundtrip() {
    let f = ClassicFilter::new(opts("t6", 100, 0.1)).unwrap();
    f.add(b"a");
    f.add(b"b");

    let mut buf = Vec::new();
    f.dump(&mut buf).unwrap();

    let loaded = ClassicFilter::load(&mut &buf[..]).unwrap();
    assert_eq!(loaded.name(), f.name());
    assert_eq!(loaded.capacity(), f.capacity());
    assert_eq!(loaded.k(), f.k());
    assert_eq!(loaded.count(), f.count());
    assert!(loaded.test(b"a"));
    assert!(loaded.test(b"b"));
    assert!(!loaded.test(b"z"));
}

#[test]
fn estimated_fill_ratio_matches_closed_form() {
    let f = ClassicFilter::new(opts("t7", 1000, 0.05)).unwrap();
    for i in 0..200 {
        f.add(format!("k{i}").as_bytes());
    }
    let expected = 1.0 - (-(f.count() as f64) * f.k() as f64 / f.capacity() as f64).exp();
    assert!((f.estimated_fill_ratio() - expected).abs() < 1e-12);
}
