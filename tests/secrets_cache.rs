//! Secrets cache integration tests.

mod support;
use support::Test;

use educates_local::core::domain::SecretRecord;
use educates_local::core::remote::MemoryStore;
use educates_local::error::{Error, RemoteError, ValidationError};

const NAMESPACE: &str = "educates-secrets";

#[test]
fn test_sync_creates_missing_and_patches_existing() {
    let t = Test::new();
    let cache = t.cache();
    cache
        .add("alpha", &SecretRecord::tls("alpha", "A-CERT", "A-KEY"))
        .unwrap();
    cache
        .add(
            "beta",
            &SecretRecord::registry("beta", "registry.example.com", "robot", "pw"),
        )
        .unwrap();

    let store = MemoryStore::new();
    store.insert_secret(
        NAMESPACE,
        SecretRecord::tls("beta", "OLD", "OLD").to_manifest(Some(NAMESPACE)),
    );
    store.insert_secret(
        NAMESPACE,
        SecretRecord::tls("gamma", "REMOTE", "ONLY").to_manifest(Some(NAMESPACE)),
    );

    let report = cache.sync_to_cluster(&store).unwrap();

    assert_eq!(report.created, vec!["alpha".to_string()]);
    assert_eq!(report.patched, vec!["beta".to_string()]);
    assert!(!report.namespace_created);
    assert_eq!(store.count("create_secret"), 1);
    assert_eq!(store.count("patch_secret"), 1);
    assert!(store.calls().iter().all(|c| !c.operation.starts_with("delete")));

    // Remote-only secrets are never removed.
    assert!(store.secret(NAMESPACE, "gamma").is_some());

    let beta = SecretRecord::from_manifest(store.secret(NAMESPACE, "beta").unwrap());
    assert!(beta.slot(".dockerconfigjson").is_some());
}

#[test]
fn test_sync_creates_namespace_once() {
    let t = Test::new();
    let cache = t.cache();
    cache.add("tls", &SecretRecord::tls("tls", "C", "K")).unwrap();
    let store = MemoryStore::new();

    let first = cache.sync_to_cluster(&store).unwrap();
    let second = cache.sync_to_cluster(&store).unwrap();

    assert!(first.namespace_created);
    assert!(!second.namespace_created);
    assert_eq!(store.count("create_namespace"), 1);
    assert_eq!(second.patched, vec!["tls".to_string()]);
}

#[test]
fn test_sync_preserves_domain_annotation_on_create() {
    let t = Test::new();
    let cache = t.cache();
    cache
        .add(
            "wildcard",
            &SecretRecord::tls("wildcard", "C", "K").with_domain("labs.example.com"),
        )
        .unwrap();
    let store = MemoryStore::new();

    cache.sync_to_cluster(&store).unwrap();

    let remote = SecretRecord::from_manifest(store.secret(NAMESPACE, "wildcard").unwrap());
    assert_eq!(remote.domain.as_deref(), Some("labs.example.com"));
    assert_eq!(remote.slot("tls.crt"), Some(&b"C"[..]));
}

#[test]
fn test_sync_failure_names_the_secret() {
    let t = Test::new();
    let cache = t.cache();
    cache.add("tls", &SecretRecord::tls("tls", "C", "K")).unwrap();
    let store = MemoryStore::new();
    store.fail_on("create_secret");

    let err = cache.sync_to_cluster(&store).unwrap_err();
    match err {
        Error::Remote(RemoteError { resource, .. }) => assert_eq!(resource, "secret/tls"),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_sync_of_empty_cache_only_ensures_namespace() {
    let t = Test::new();
    let store = MemoryStore::new();

    let report = t.cache().sync_to_cluster(&store).unwrap();

    assert_eq!(report.total(), 0);
    assert!(store.has_namespace(NAMESPACE));
    assert_eq!(store.calls().len(), 1);
}

#[test]
fn test_invalid_name_writes_nothing() {
    let t = Test::new();
    let cache = t.cache();

    for name in ["Upper", "-leading", "trailing-", "a", "with space"] {
        let err = cache
            .add(name, &SecretRecord::tls(name, "C", "K"))
            .unwrap_err();
        assert!(
            matches!(err, Error::Validation(ValidationError::InvalidName { .. })),
            "{name} should be rejected"
        );
    }
    assert!(cache.list().unwrap().is_empty());
}

#[test]
fn test_add_remove_round_trip() {
    let t = Test::new();
    let cache = t.cache();
    let record = SecretRecord::tls("ingress-tls", "C", "K").with_domain("example.com");

    cache.add("ingress-tls", &record).unwrap();
    assert_eq!(cache.list().unwrap(), vec!["ingress-tls".to_string()]);
    assert_eq!(cache.get("ingress-tls").unwrap(), record);
    assert_eq!(
        cache.lookup_by_domain("example.com").as_deref(),
        Some("ingress-tls")
    );

    assert!(cache.remove("ingress-tls").unwrap());
    assert!(cache.list().unwrap().is_empty());
    assert_eq!(cache.lookup_by_domain("example.com"), None);
}

#[test]
fn test_sync_aborts_on_malformed_cached_file() {
    let t = Test::new();
    let cache = t.cache();
    cache.add("alpha", &SecretRecord::tls("alpha", "C", "K")).unwrap();
    std::fs::write(cache.dir().join("broken.yaml"), "kind: [").unwrap();
    let store = MemoryStore::new();

    let err = cache.sync_to_cluster(&store).unwrap_err();

    assert!(err.to_string().contains("broken.yaml"), "{err}");
    assert!(store.calls().is_empty());
    assert!(store.secret(NAMESPACE, "alpha").is_none());
}
