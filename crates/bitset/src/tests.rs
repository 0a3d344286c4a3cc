use super::*;
use rand::Rng;

#[test]
fn single_bit_get_set_roundtrip() {
    let bb = BitBuckets::new(100, 1).unwrap();
    bb.set(0, 1);
    bb.set(63, 1);
    bb.set(99, 1);
    assert_eq!(bb.get(0), 1);
    assert_eq!(bb.get(63), 1);
    assert_eq!(bb.get(99), 1);
    assert_eq!(bb.get(1), 0);
    assert_eq!(bb.get(64), 0);
}

#[test]
fn byte_boundary_crossing() {
    // bucket_size=3 means cells cross byte boundaries at various offsets.
    let bb = BitBuckets::new(20, 3).unwrap();
    for i in 0..20u64 {
        bb.set(i, (i % 8) as u32);
    }
    for i in 0..20u64 {
        assert_eq!(bb.get(i), (i % 8) as u32, "mismatch at index {i}");
    }
}

#[test]
fn set_clamps_to_max() {
    let bb = BitBuckets::new(8, 3).unwrap();
    bb.set(0, 255);
    assert_eq!(bb.get(0), bb.max_bucket_value() as u32);
    assert_eq!(bb.max_bucket_value(), 7);
}

#[test]
fn increment_saturates() {
    let bb = BitBuckets::new(8, 2).unwrap();
    bb.increment(0, 10);
    assert_eq!(bb.get(0), 3);
    bb.increment(0, -10);
    assert_eq!(bb.get(0), 0);
}

#[test]
fn reset_zeroes_all() {
    let bb = BitBuckets::new(50, 1).unwrap();
    for i in 0..50 {
        bb.set(i, 1);
    }
    bb.reset();
    for i in 0..50 {
        assert_eq!(bb.get(i), 0);
    }
}

#[test]
fn dump_load_roundtrip() {
    let bb = BitBuckets::new(480, 1).unwrap();
    let mut rng = rand::thread_rng();
    let mut expected = vec![0u32; 480];
    for i in 0..480u64 {
        let v = rng.gen_range(0..=1);
        bb.set(i, v);
        expected[i as usize] = v;
    }

    let mut buf = Vec::new();
    bb.dump(&mut buf).unwrap();

    let loaded = BitBuckets::load(&mut &buf[..]).unwrap();
    assert_eq!(loaded.count(), bb.count());
    assert_eq!(loaded.bucket_size(), bb.bucket_size());
    for i in 0..480u64 {
        assert_eq!(loaded.get(i), expected[i as usize]);
    }
}

#[test]
fn load_rejects_length_mismatch() {
    let mut buf = Vec::new();
    buf.push(1u8); // bucket_size
    buf.push(1u8); // max
    buf.extend_from_slice(&100u64.to_be_bytes()); // count
    buf.extend_from_slice(&4u64.to_be_bytes()); // wrong data_len (should be 13)
    buf.extend_from_slice(&[0u8; 4]);

    let err = BitBuckets::load(&mut &buf[..]).unwrap_err();
    assert!(matches!(err, BitBucketsError::LengthMismatch { .. }));
}

#[test]
fn invalid_bucket_size_rejected() {
    assert!(matches!(
        BitBuckets::new(10, 0),
        Err(BitBucketsError::InvalidBucketSize(0))
    ));
    assert!(matches!(
        BitBuckets::new(10, 9),
        Err(BitBucketsError::InvalidBucketSize(9))
    ));
}

#[test]
fn property_random_bit_addressing() {
    let mut rng = rand::thread_rng();
    for _ in 0..20 {
        let count: u64 = rng.gen_range(1..=2000);
        let bucket_size: u8 = rng.gen_range(1..=8);
        let bb = BitBuckets::new(count, bucket_size).unwrap();
        let max = bb.max_bucket_value() as u32;
        let mut expected = vec![0u32; count as usize];
        for i in 0..count {
            let v = rng.gen_range(0..=max);
            bb.set(i, v);
            expected[i as usize] = v;
        }
        for i in 0..count {
            assert_eq!(bb.get(i), expected[i as usize]);
        }
    }
}
