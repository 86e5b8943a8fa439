use std::time::Duration;

use metastore::storage::{KeyAlgorithm, KeyFetch, RotatingKey};

use crate::fixture::{TABLE, TestFixture};

const DAY: Duration = Duration::from_secs(86_400);

#[test]
fn polling_with_held_timestamp_is_unchanged() {
    let fixture = TestFixture::prepared();
    let db = fixture.open();
    let store = db.meta_store(TABLE).unwrap();

    let first = store.fetch_private_key("jwt.key", 256, DAY, 0).unwrap();
    assert!(first.is_fresh());
    let second = store
        .fetch_private_key("jwt.key", 256, DAY, first.modify_at())
        .unwrap();
    assert!(matches!(second, KeyFetch::Unchanged { .. }));
}

#[test]
fn other_process_loads_the_same_key() {
    let fixture = TestFixture::prepared();
    let a = fixture.open();
    let b = fixture.open();

    let key_a = a
        .meta_store(TABLE)
        .unwrap()
        .fetch_private_key("jwt.key", 384, DAY, 0)
        .unwrap()
        .into_key()
        .unwrap();
    let fetched_b = b
        .meta_store(TABLE)
        .unwrap()
        .fetch_private_key("jwt.key", 384, DAY, 0)
        .unwrap();
    let KeyFetch::Loaded { key, generated, .. } = fetched_b else {
        panic!("expected loaded key");
    };
    assert!(!generated);
    assert_eq!(key.public_key(), key_a.public_key());
}

#[test]
fn expired_key_rotates_with_newer_timestamp() {
    let fixture = TestFixture::prepared();
    let db = fixture.open();
    let store = db.meta_store(TABLE).unwrap();

    let first = store.fetch_private_key("jwt.key", 256, DAY, 0).unwrap();
    let stored = first.modify_at() - 2 * 86_400;
    fixture
        .raw()
        .execute(
            "UPDATE conf SET modify_at = ?1 WHERE meta_key = 'jwt.key'",
            [stored],
        )
        .unwrap();

    let rotated = store.fetch_private_key("jwt.key", 256, DAY, stored).unwrap();
    assert!(rotated.is_fresh());
    assert!(rotated.modify_at() > stored);
    let row = store.fetch("jwt.key").unwrap().unwrap();
    assert_eq!(row.value, rotated.into_key().unwrap().encode());
}

#[test]
fn unsupported_key_size_is_rejected_before_io() {
    let fixture = TestFixture::new();
    let db = fixture.open();
    let store = db.meta_store(TABLE).unwrap();
    let err = store.fetch_private_key("jwt.key", 2048, DAY, 0).unwrap_err();
    assert!(matches!(err, metastore::MetaStoreError::UnsupportedKeySize(2048)));
}

#[test]
fn rotation_that_loses_the_write_adopts_the_stored_key() {
    let fixture = TestFixture::prepared();
    let winner = RotatingKey::generate(KeyAlgorithm::EcdsaP256).unwrap();
    // Another writer lands right after this process's upsert.
    fixture
        .raw()
        .execute_batch(&format!(
            "CREATE TRIGGER competing_rotation AFTER INSERT ON conf
             WHEN NEW.meta_key = 'jwt.key'
             BEGIN
                 UPDATE conf SET meta_value = '{}' WHERE meta_key = 'jwt.key';
             END;",
            winner.encode()
        ))
        .unwrap();

    let loser = fixture.open();
    let fetched = loser
        .meta_store(TABLE)
        .unwrap()
        .fetch_private_key("jwt.key", 256, DAY, 0)
        .unwrap();
    let KeyFetch::Loaded { key, generated, modify_at } = fetched else {
        panic!("expected loaded key");
    };
    assert!(!generated);
    assert_eq!(key.public_key(), winner.public_key());

    let other = fixture.open();
    let held = other
        .meta_store(TABLE)
        .unwrap()
        .fetch_private_key("jwt.key", 256, DAY, 0)
        .unwrap()
        .into_key()
        .unwrap();
    assert_eq!(held.public_key(), winner.public_key());
    let row = other.meta_store(TABLE).unwrap().fetch("jwt.key").unwrap().unwrap();
    assert_eq!(row.modify_at, modify_at);
}
