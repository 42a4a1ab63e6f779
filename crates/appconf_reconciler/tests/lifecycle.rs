//! Entry lifecycle against an in-memory store.

use appconf_client::{
    AnonymousAuthorizer, ClientConfig, ClientRegistry, InMemoryStore, Method, RetryPolicy,
    Transport,
};
use appconf_core::{
    AppConfigError, ContentType, ErrorKind, IdentifierKind, KeyValueEntry, Label, Payload,
    PayloadKind, ResourceIdentifier,
};
use appconf_reconciler::{Declaration, ReadOutcome, Reconciler, ReconcilerConfig};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

const ENDPOINT: &str = "https://host";

fn fast_retry() -> RetryPolicy {
    RetryPolicy::eventual_consistency().with_initial_delay(Duration::ZERO)
}

fn setup(store: InMemoryStore) -> (Arc<InMemoryStore>, Reconciler) {
    let store = Arc::new(store);
    let shared = store.clone();
    let registry = ClientRegistry::new(move |endpoint| {
        Ok(Transport::new(
            endpoint,
            shared.clone(),
            Arc::new(AnonymousAuthorizer),
            ClientConfig::default(),
        ))
    });
    let config = ReconcilerConfig::new().with_read_retry(fast_retry());
    (store, Reconciler::with_config(Arc::new(registry), config))
}

fn seeded(key: &str, label: Label, value: &str) -> KeyValueEntry {
    KeyValueEntry {
        key: key.to_string(),
        label,
        value: value.to_string(),
        content_type: ContentType::KeyValue,
        last_modified: None,
        tags: BTreeMap::new(),
    }
}

#[test]
fn end_to_end_scenario() {
    let (_store, reconciler) = setup(InMemoryStore::new());

    let created = reconciler
        .create(&Declaration::key_value(ENDPOINT, Label::new(""), "k1", "v1"))
        .unwrap();
    assert_eq!(created.id.encode(), "host//k1");

    let id = ResourceIdentifier::decode("host//k1").unwrap();
    let read = reconciler.read(&id, PayloadKind::Plain).unwrap();
    assert_eq!(read.into_present().unwrap().value(), "v1");

    reconciler.update(&id, &Payload::plain("v2")).unwrap();
    let read = reconciler.read(&id, PayloadKind::Plain).unwrap();
    assert_eq!(read.into_present().unwrap().value(), "v2");

    reconciler.delete(&id).unwrap();
    assert_eq!(
        reconciler.read(&id, PayloadKind::Plain).unwrap(),
        ReadOutcome::Absent
    );
}

#[test]
fn create_refuses_existing_entry() {
    let (store, reconciler) = setup(InMemoryStore::new());
    store.insert(seeded("k1", Label::None, "remote"));

    for value in ["remote", "something else"] {
        let err = reconciler
            .create(&Declaration::key_value(ENDPOINT, Label::None, "k1", value))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NeedsImport);
        assert_eq!(
            err.to_string(),
            "the resource needs to be imported: key_value host//k1"
        );
    }

    assert_eq!(store.entry(&Label::None, "k1").unwrap().value, "remote");
    assert_eq!(store.request_count(Method::Put), 0);
}

#[test]
fn create_guard_is_per_label() {
    let (store, reconciler) = setup(InMemoryStore::new());
    store.insert(seeded("k1", Label::new("a"), "va"));

    let created = reconciler
        .create(&Declaration::key_value(ENDPOINT, Label::new("b"), "k1", "vb"))
        .unwrap();
    assert_eq!(created.id.encode(), "host/b/k1");
    assert_eq!(store.len(), 2);
}

#[test]
fn create_surfaces_other_errors_from_existence_check() {
    let (store, reconciler) = setup(InMemoryStore::new());
    store.inject_status(401);

    let err = reconciler
        .create(&Declaration::key_value(ENDPOINT, Label::None, "k1", "v1"))
        .unwrap_err();
    assert!(matches!(err, AppConfigError::Unauthorized));
    assert!(store.is_empty());
}

#[test]
fn create_rejects_empty_key_before_any_request() {
    let (store, reconciler) = setup(InMemoryStore::new());

    let declarations = [
        Declaration::key_value(ENDPOINT, Label::None, "", "v"),
        Declaration::feature(ENDPOINT, Label::None, "", true, "d"),
    ];
    for declaration in &declarations {
        let err = reconciler.create(declaration).unwrap_err();
        assert!(matches!(err, AppConfigError::InvalidIdentifier(_)), "got {err:?}");
    }

    assert!(store.requests().is_empty());
    assert!(store.is_empty());
}

#[test]
fn forbidden_write_is_distinct() {
    let (store, reconciler) = setup(InMemoryStore::new());
    let id = ResourceIdentifier::new("host", Label::None, "k1");

    store.inject_status(403);
    let err = reconciler.update(&id, &Payload::plain("v")).unwrap_err();
    assert!(matches!(err, AppConfigError::Forbidden));
    assert_eq!(err.kind(), ErrorKind::Unexpected);
}

#[test]
fn create_rides_out_visibility_lag() {
    let (store, reconciler) = setup(InMemoryStore::new().with_visibility_lag(4));

    let created = reconciler
        .create(&Declaration::key_value(ENDPOINT, Label::None, "k1", "v1"))
        .unwrap();
    assert_eq!(created.value(), "v1");

    // 5 existence-check reads, then 4 hidden reads and one success.
    assert_eq!(store.request_count(Method::Get), 10);
}

#[test]
fn read_after_five_misses_is_absent() {
    let (store, reconciler) = setup(InMemoryStore::new());
    store.insert(seeded("k1", Label::None, "v1"));
    store.hide_next_reads(&Label::None, "k1", 5);

    let id = ResourceIdentifier::new("host", Label::None, "k1");
    assert!(reconciler.read(&id, PayloadKind::Plain).unwrap().is_absent());
    assert_eq!(store.request_count(Method::Get), 5);
}

#[test]
fn read_succeeds_on_last_attempt() {
    let (store, reconciler) = setup(InMemoryStore::new());
    store.insert(seeded("k1", Label::None, "v1"));
    store.hide_next_reads(&Label::None, "k1", 4);

    let id = ResourceIdentifier::new("host", Label::None, "k1");
    let managed = reconciler
        .read(&id, PayloadKind::Plain)
        .unwrap()
        .into_present()
        .unwrap();
    assert_eq!(managed.value(), "v1");
}

#[test]
fn delete_of_absent_entry_succeeds() {
    let (store, reconciler) = setup(InMemoryStore::new());
    let id = ResourceIdentifier::new("host", Label::None, "never-created");

    reconciler.delete(&id).unwrap();
    reconciler.delete(&id).unwrap();
    assert_eq!(store.request_count(Method::Delete), 2);
}

#[test]
fn plain_value_fidelity() {
    let (store, reconciler) = setup(InMemoryStore::new());

    let created = reconciler
        .create(&Declaration::key_value(ENDPOINT, Label::None, "k1", "a \"quoted\" value"))
        .unwrap();
    assert_eq!(created.value(), "a \"quoted\" value");
    assert_eq!(created.entry.content_type, ContentType::KeyValue);

    let stored = store.entry(&Label::None, "k1").unwrap();
    assert_eq!(stored.value, "a \"quoted\" value");
}

#[test]
fn secret_reference_fidelity() {
    let (store, reconciler) = setup(InMemoryStore::new());

    let declaration = Declaration::secret_reference(
        ENDPOINT,
        Label::None,
        "pinned",
        "https://vault/secrets/name/v1",
        false,
    )
    .unwrap();
    let created = reconciler.create(&declaration).unwrap();
    assert_eq!(created.value(), "https://vault/secrets/name/v1");
    assert_eq!(created.entry.content_type, ContentType::KeyVaultReference);
    assert_eq!(
        store.entry(&Label::None, "pinned").unwrap().value,
        r#"{"uri":"https://vault/secrets/name/v1"}"#
    );

    let declaration = Declaration::secret_reference(
        ENDPOINT,
        Label::None,
        "latest",
        "https://vault/secrets/name/v1",
        true,
    )
    .unwrap();
    let created = reconciler.create(&declaration).unwrap();
    assert_eq!(created.value(), "https://vault/secrets/name");
    assert_eq!(
        store.entry(&Label::None, "latest").unwrap().value,
        r#"{"uri":"https://vault/secrets/name"}"#
    );
}

#[test]
fn secret_reference_update_and_read() {
    let (_store, reconciler) = setup(InMemoryStore::new());
    let declaration = Declaration::secret_reference(
        ENDPOINT,
        Label::new("prod"),
        "db",
        "https://vault/secrets/db/v1",
        false,
    )
    .unwrap();
    let created = reconciler.create(&declaration).unwrap();

    let payload = Payload::secret_reference("https://vault/secrets/db/v2", false).unwrap();
    reconciler.update(&created.id, &payload).unwrap();

    let read = reconciler
        .read(&created.id, PayloadKind::KeyVaultReference)
        .unwrap()
        .into_present()
        .unwrap();
    assert_eq!(read.value(), "https://vault/secrets/db/v2");
}

#[test]
fn feature_lifecycle() {
    let (store, reconciler) = setup(InMemoryStore::new());

    let created = reconciler
        .create(&Declaration::feature(ENDPOINT, Label::new("lbl"), "f1", true, "desc"))
        .unwrap();
    assert_eq!(created.id.kind(), IdentifierKind::Feature);
    assert_eq!(created.id.encode(), "host/feature/lbl/f1");

    let stored = store
        .entry(&Label::new("lbl"), ".appconfig.featureflag/f1")
        .unwrap();
    assert_eq!(stored.content_type, ContentType::FeatureFlag);

    let feature = created.as_feature().unwrap();
    assert_eq!(feature.name, "f1");
    assert_eq!(feature.label, Label::new("lbl"));
    assert!(feature.enabled);
    assert_eq!(feature.description, "desc");

    let updated = reconciler
        .update(&created.id, &Payload::feature(false, "off for now"))
        .unwrap();
    assert!(!updated.as_feature().unwrap().enabled);

    reconciler.delete(&created.id).unwrap();
    assert!(store.is_empty());
    assert!(reconciler
        .read(&created.id, PayloadKind::FeatureFlag)
        .unwrap()
        .is_absent());
}

#[test]
fn feature_and_key_value_do_not_collide() {
    let (store, reconciler) = setup(InMemoryStore::new());

    reconciler
        .create(&Declaration::key_value(ENDPOINT, Label::None, "f1", "plain"))
        .unwrap();
    reconciler
        .create(&Declaration::feature(ENDPOINT, Label::None, "f1", true, "flag"))
        .unwrap();
    assert_eq!(store.len(), 2);
}

#[test]
fn label_sentinel() {
    let (store, reconciler) = setup(InMemoryStore::new());

    reconciler
        .create(&Declaration::key_value(ENDPOINT, Label::None, "k1", "v1"))
        .unwrap();

    let puts: Vec<_> = store
        .requests()
        .into_iter()
        .filter(|r| r.method == Method::Put)
        .collect();
    assert_eq!(puts[0].label.as_deref(), Some(""));

    let managed = reconciler
        .lookup_key_value(ENDPOINT, &Label::new("%00"), "k1")
        .unwrap();
    assert_eq!(managed.label(), &Label::None);
    assert_eq!(managed.label().as_declared(), "%00");
}

#[test]
fn import_adopts_existing_entry() {
    let (store, reconciler) = setup(InMemoryStore::new());
    store.insert(seeded("k1", Label::new("prod"), "remote"));

    let managed = reconciler.import("host/prod/k1", PayloadKind::Plain).unwrap();
    assert_eq!(managed.value(), "remote");
    assert_eq!(managed.id.encode(), "host/prod/k1");

    let err = reconciler
        .import("host/prod/missing", PayloadKind::Plain)
        .unwrap_err();
    assert!(err.is_not_found());
}

#[test]
fn import_accepts_raw_none_label() {
    let (store, reconciler) = setup(InMemoryStore::new());
    store.insert(seeded("k1", Label::None, "v1"));

    let managed = reconciler.import("host/%00/k1", PayloadKind::Plain).unwrap();
    assert_eq!(managed.id.encode(), "host//k1");
}

#[test]
fn keys_with_slashes_survive_the_identifier() {
    let (store, reconciler) = setup(InMemoryStore::new());

    let created = reconciler
        .create(&Declaration::key_value(ENDPOINT, Label::new("a/b"), "app/color", "blue"))
        .unwrap();
    assert_eq!(created.id.encode(), "host/a%2Fb/app%2Fcolor");

    let id = ResourceIdentifier::decode(&created.id.encode()).unwrap();
    let read = reconciler
        .read(&id, PayloadKind::Plain)
        .unwrap()
        .into_present()
        .unwrap();
    assert_eq!(read.value(), "blue");
    assert!(store.entry(&Label::new("a/b"), "app/color").is_some());
}

#[test]
fn lookups_report_missing_entries() {
    let (store, reconciler) = setup(InMemoryStore::new());

    let err = reconciler
        .lookup_key_value(ENDPOINT, &Label::None, "missing")
        .unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(store.request_count(Method::Get), 5);

    let err = reconciler
        .lookup_feature(ENDPOINT, &Label::None, "missing")
        .unwrap_err();
    assert!(err.is_not_found());
}

#[test]
fn lookups_decode_each_payload() {
    let (_store, reconciler) = setup(InMemoryStore::new());
    reconciler
        .create(
            &Declaration::secret_reference(
                ENDPOINT,
                Label::None,
                "db",
                "https://vault/secrets/db/v3",
                true,
            )
            .unwrap(),
        )
        .unwrap();
    reconciler
        .create(&Declaration::feature(ENDPOINT, Label::None, "beta", true, "beta users"))
        .unwrap();

    let secret = reconciler
        .lookup_secret_reference(ENDPOINT, &Label::None, "db")
        .unwrap();
    assert_eq!(secret.value(), "https://vault/secrets/db");
    assert_eq!(secret.id.encode(), "host//db");

    let feature = reconciler
        .lookup_feature(ENDPOINT, &Label::None, "beta")
        .unwrap();
    assert_eq!(feature.name, "beta");
    assert!(feature.enabled);
    assert_eq!(feature.description, "beta users");
}

#[test]
fn reading_with_the_wrong_codec_fails() {
    let (store, reconciler) = setup(InMemoryStore::new());
    store.insert(seeded("k1", Label::None, "not json"));

    let id = ResourceIdentifier::new("host", Label::None, "k1");
    let err = reconciler
        .read(&id, PayloadKind::KeyVaultReference)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Unexpected);
}

#[test]
fn one_transport_per_endpoint() {
    let store = Arc::new(InMemoryStore::new());
    let built = Arc::new(AtomicUsize::new(0));

    let registry = {
        let store = store.clone();
        let built = built.clone();
        ClientRegistry::new(move |endpoint| {
            built.fetch_add(1, Ordering::SeqCst);
            Ok(Transport::new(
                endpoint,
                store.clone(),
                Arc::new(AnonymousAuthorizer),
                ClientConfig::default(),
            ))
        })
    };
    let reconciler = Reconciler::with_config(
        Arc::new(registry),
        ReconcilerConfig::new().with_read_retry(fast_retry()),
    );

    for key in ["a", "b", "c"] {
        reconciler
            .create(&Declaration::key_value(ENDPOINT, Label::None, key, "v"))
            .unwrap();
    }
    reconciler
        .create(&Declaration::key_value("https://other", Label::None, "a", "v"))
        .unwrap();

    assert_eq!(built.load(Ordering::SeqCst), 2);
    assert!(reconciler.registry().contains("https://host"));
    assert!(reconciler.registry().contains("https://other"));
}

#[test]
fn entries_reconcile_in_parallel() {
    let (store, reconciler) = setup(InMemoryStore::new().with_visibility_lag(1));

    std::thread::scope(|scope| {
        for n in 0..16 {
            let reconciler = &reconciler;
            scope.spawn(move || {
                let key = format!("key-{n}");
                let created = reconciler
                    .create(&Declaration::key_value(ENDPOINT, Label::None, &key, "v1"))
                    .unwrap();
                let updated = reconciler
                    .update(&created.id, &Payload::plain(format!("v{n}")))
                    .unwrap();
                assert_eq!(updated.value(), format!("v{n}"));
            });
        }
    });

    assert_eq!(store.len(), 16);
    assert_eq!(reconciler.registry().len(), 1);
    assert_eq!(store.entry(&Label::None, "key-7").unwrap().value, "v7");
}
