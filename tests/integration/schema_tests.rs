use std::thread;
use std::time::Duration;

use metastore::storage::{CURRENT_REVISION, revision_key};
use metastore::{Database, MetaStoreError};

use crate::fixture::{TABLE, TestFixture};

#[test]
fn fresh_table_is_created_then_left_alone() {
    let fixture = TestFixture::new();
    let db = fixture.open();
    let store = db.meta_store(TABLE).unwrap();

    assert!(store.prepare_schema().unwrap());
    assert!(!store.prepare_schema().unwrap());
    assert_eq!(store.schema_revision().unwrap(), CURRENT_REVISION);
}

#[test]
fn second_process_sees_prepared_schema() {
    let fixture = TestFixture::prepared();
    let other = fixture.open();
    let store = other.meta_store(TABLE).unwrap();
    assert!(!store.prepare_schema().unwrap());
}

#[test]
fn revision_row_lives_in_governed_table() {
    let fixture = TestFixture::prepared();
    let raw = fixture.raw();
    let value: String = raw
        .query_row(
            "SELECT meta_value FROM conf WHERE meta_key = ?1",
            [revision_key(TABLE)],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(value, CURRENT_REVISION.to_string());
}

#[test]
fn rev1_upgrade_preserves_rows() {
    let fixture = TestFixture::new();
    {
        let raw = fixture.raw();
        raw.execute_batch(
            "CREATE TABLE conf (
                 meta_key TEXT NOT NULL PRIMARY KEY,
                 meta_value TEXT NOT NULL,
                 modify_at INTEGER NOT NULL DEFAULT 0
             );
             INSERT INTO conf VALUES ('meta-store.schema:conf', '1', 10);
             INSERT INTO conf VALUES ('feature.enabled', '1', 11);
             INSERT INTO conf VALUES ('retries', '3', 12);",
        )
        .unwrap();
    }
    let db = fixture.open();
    let store = db.meta_store(TABLE).unwrap();

    assert!(store.prepare_schema().unwrap());
    assert_eq!(store.schema_revision().unwrap(), 2);
    let enabled = store.fetch_bool("feature.enabled", false).unwrap();
    assert!(enabled.value);
    assert_eq!(enabled.modify_at, 11);
    assert_eq!(store.fetch_i64("retries", 0).unwrap().value, 3);
    assert!(!store.prepare_schema().unwrap());
}

#[test]
fn newer_revision_is_not_downgraded() {
    let fixture = TestFixture::prepared();
    let db = fixture.open();
    let store = db.meta_store(TABLE).unwrap();
    store.store_revision(&revision_key(TABLE), 3).unwrap();

    let err = store.prepare_schema().unwrap_err();
    assert!(matches!(err, MetaStoreError::UnknownRevision { revision: 3, .. }));
    assert!(err.to_string().contains(TABLE));
}

#[test]
fn tables_are_versioned_independently() {
    let fixture = TestFixture::prepared();
    let db = fixture.open();
    let other = db.meta_store("other_conf").unwrap();
    assert_eq!(other.schema_revision().unwrap(), 0);
    assert!(other.prepare_schema().unwrap());
    assert_eq!(other.schema_revision().unwrap(), CURRENT_REVISION);
}

#[test]
fn legacy_revision_key_then_prepare_is_noop() {
    let fixture = TestFixture::new();
    {
        let raw = fixture.raw();
        raw.execute_batch(
            "CREATE TABLE conf (
                 meta_key TEXT NOT NULL PRIMARY KEY,
                 meta_value TEXT NOT NULL,
                 modify_at INTEGER NOT NULL DEFAULT 0
             );
             INSERT INTO conf VALUES ('app.schema.meta', '1', 1);",
        )
        .unwrap();
    }
    let db = fixture.open();
    let store = db.meta_store(TABLE).unwrap();

    assert!(store.migrate_legacy_revision_key("app.schema.meta").unwrap());
    assert_eq!(store.schema_revision().unwrap(), 1);
    assert!(store.prepare_schema().unwrap());
    assert_eq!(store.schema_revision().unwrap(), 2);
    assert!(!store.migrate_legacy_revision_key("app.schema.meta").unwrap());
}

#[test]
fn preparer_blocked_behind_concurrent_migration_reports_unchanged() {
    let fixture = TestFixture::new();
    let holder = fixture.open();
    holder
        .conn()
        .execute_batch(
            "BEGIN IMMEDIATE;
             CREATE TABLE conf (
                 meta_key TEXT NOT NULL PRIMARY KEY,
                 meta_value TEXT NOT NULL,
                 modify_at INTEGER NOT NULL DEFAULT 0
             ) WITHOUT ROWID;
             INSERT INTO conf VALUES ('meta-store.schema:conf', '2', 1);",
        )
        .unwrap();

    let db_path = fixture.db_path.clone();
    let preparer = thread::spawn(move || {
        let db = Database::open(&db_path).unwrap();
        let store = db.meta_store(TABLE).unwrap();
        store.prepare_schema().map_err(|err| err.to_string())
    });

    thread::sleep(Duration::from_millis(300));
    holder.conn().execute_batch("COMMIT;").unwrap();

    assert_eq!(preparer.join().unwrap(), Ok(false));
    let store = holder.meta_store(TABLE).unwrap();
    assert_eq!(store.schema_revision().unwrap(), CURRENT_REVISION);
}

#[test]
fn concurrent_preparers_agree_on_current_revision() {
    let fixture = TestFixture::new();
    drop(fixture.open());
    let handles: Vec<_> = (0..4)
        .map(|_| {
            let db_path = fixture.db_path.clone();
            thread::spawn(move || {
                let db = Database::open(&db_path).unwrap();
                let store = db.meta_store(TABLE).unwrap();
                store.prepare_schema().map_err(|err| err.to_string())
            })
        })
        .collect();

    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert!(results.iter().all(Result::is_ok), "{results:?}");
    assert_eq!(results.iter().filter(|r| **r == Ok(true)).count(), 1);
}
