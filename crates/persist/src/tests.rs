use super::*;
use std::io::Read as _;
use tempfile::tempdir;

#[test]
fn write_then_read_roundtrip() {
    let dir = tempdir().unwrap();
    let provider = FsPersistenceProvider::new(dir.path()).unwrap();

    let mut w = provider.new_writer("t1").unwrap();
    w.write_all(b"hello").unwrap();
    w.finish().unwrap();

    let mut r = provider.new_reader("t1").unwrap();
    let mut buf = Vec::new();
    r.read_to_end(&mut buf).unwrap();
    assert_eq!(buf, b"hello");
}

#[test]
fn republish_same_name_does_not_fail() {
    let dir = tempdir().unwrap();
    let provider = FsPersistenceProvider::new(dir.path()).unwrap();

    for i in 0..3 {
        let mut w = provider.new_writer("t1").unwrap();
        w.write_all(format!("gen-{i}").as_bytes()).unwrap();
        w.finish().unwrap();
    }

    let mut r = provider.new_reader("t1").unwrap();
    let mut buf = Vec::new();
    r.read_to_end(&mut buf).unwrap();
    assert_eq!(buf, b"gen-2");
}

#[test]
fn list_filter_names_only_sees_published() {
    let dir = tempdir().unwrap();
    let provider = FsPersistenceProvider::new(dir.path()).unwrap();

    let mut w = provider.new_writer("alpha").unwrap();
    w.write_all(b"x").unwrap();
    w.finish().unwrap();

    let names = provider.list_filter_names().unwrap();
    assert_eq!(names, vec!["alpha".to_string()]);
}

#[test]
fn reader_never_sees_unfinished_writer() {
    let dir = tempdir().unwrap();
    let provider = FsPersistenceProvider::new(dir.path()).unwrap();

    let mut w = provider.new_writer("beta").unwrap();
    w.write_all(b"partial").unwrap();
    // writer dropped without finish() -- nothing published.

    assert!(provider.new_reader("beta").is_err());
    assert!(provider.list_filter_names().unwrap().is_empty());
}

#[test]
fn empty_name_rejected() {
    let dir = tempdir().unwrap();
    let provider = FsPersistenceProvider::new(dir.path()).unwrap();
    assert!(matches!(
        provider.new_writer(""),
        Err(PersistError::EmptyName)
    ));
}
