use super::*;
use config::EngineConfig;
use persist::FsPersistenceProvider;
use std::sync::Arc;

fn fresh_registry() -> (FilterRegistry, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let provider = Arc::new(FsPersistenceProvider::new(dir.path()).unwrap());
    let cfg = EngineConfig {
        persist_base_path: dir.path().to_string_lossy().to_string(),
        force_dump_period_secs: 3600,
        use_gzip: true,
    };
    (FilterRegistry::new(provider, &cfg), dir)
}

#[tokio::test]
async fn create_add_test_info_roundtrip() {
    let (registry, _dir) = fresh_registry();

    create(
        &registry,
        CreateRequest::Classic {
            name: "t1".to_string(),
            n: 100,
            error_rate: 0.1,
        },
    )
    .await
    .unwrap();

    add(
        &registry,
        AddRequest {
            name: "t1".to_string(),
            keys: vec![b"a".to_vec(), b"b".to_vec()],
            wait: true,
        },
    )
    .await
    .unwrap();

    let resp = test(
        &registry,
        TestRequest {
            name: "t1".to_string(),
            keys: vec![b"a".to_vec(), b"z".to_vec()],
        },
    )
    .await
    .unwrap();
    assert_eq!(resp.bits, vec![true, false]);
    assert_eq!(resp.positives_count, 1);

    let info_resp = info(&registry, "t1").await.unwrap();
    assert_eq!(info_resp.capacity, 480);
    assert_eq!(info_resp.k, 4);
    assert_eq!(info_resp.count, 2);
}

#[tokio::test]
async fn create_rejects_invalid_rotated_options() {
    let (registry, _dir) = fresh_registry();
    let err = create(
        &registry,
        CreateRequest::Rotated {
            name: "bad".to_string(),
            n: 100,
            error_rate: 0.1,
            r: 1,
            interval_hours: 1,
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, EngineError::InvalidOptions(_)));
}

#[tokio::test]
async fn test_against_unknown_filter_is_not_found() {
    let (registry, _dir) = fresh_registry();
    let err = test(
        &registry,
        TestRequest {
            name: "ghost".to_string(),
            keys: vec![b"a".to_vec()],
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, EngineError::NotFound(_)));
}
