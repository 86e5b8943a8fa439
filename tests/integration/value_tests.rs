use crate::fixture::{TABLE, TestFixture, now};

#[test]
fn conf_scenario_stores_and_reads_retries() {
    let fixture = TestFixture::new();
    let db = fixture.open();
    let store = db.meta_store(TABLE).unwrap();

    assert!(store.prepare_schema().unwrap());
    assert_eq!(store.schema_revision().unwrap(), 2);

    let before = now();
    store.store_i64("retries", 3).unwrap();
    let fetched = store.fetch_i64("retries", 0).unwrap();
    assert_eq!(fetched.value, 3);
    assert!(fetched.modify_at >= before);
    assert!(fetched.modify_at - before <= 1);
}

#[test]
fn never_written_keys_are_absent() {
    let fixture = TestFixture::prepared();
    let db = fixture.open();
    let store = db.meta_store(TABLE).unwrap();
    for key in ["a", "b.c", "meta-store.schema:elsewhere"] {
        assert_eq!(store.fetch(key).unwrap(), None);
    }
    let fetched = store.fetch_i32("a", 9).unwrap();
    assert_eq!((fetched.value, fetched.modify_at), (9, 0));
}

#[test]
fn initialize_is_first_write_wins_across_connections() {
    let fixture = TestFixture::prepared();
    let first = fixture.open();
    let second = fixture.open();

    first.meta_store(TABLE).unwrap().initialize("owner", "first").unwrap();
    second.meta_store(TABLE).unwrap().initialize("owner", "second").unwrap();

    let row = second.meta_store(TABLE).unwrap().fetch("owner").unwrap().unwrap();
    assert_eq!(row.value, "first");
}

#[test]
fn initialize_on_absent_key_behaves_like_store() {
    let fixture = TestFixture::prepared();
    let db = fixture.open();
    let store = db.meta_store(TABLE).unwrap();
    let before = now();
    store.initialize("seed", "v").unwrap();
    let row = store.fetch("seed").unwrap().unwrap();
    assert_eq!(row.value, "v");
    assert!(row.modify_at >= before);
}

#[test]
fn last_store_wins() {
    let fixture = TestFixture::prepared();
    let first = fixture.open();
    let second = fixture.open();
    first.meta_store(TABLE).unwrap().store("mode", "a").unwrap();
    second.meta_store(TABLE).unwrap().store("mode", "b").unwrap();
    let row = first.meta_store(TABLE).unwrap().fetch("mode").unwrap().unwrap();
    assert_eq!(row.value, "b");
}

#[test]
fn typed_bool_roundtrip() {
    let fixture = TestFixture::prepared();
    let db = fixture.open();
    let store = db.meta_store(TABLE).unwrap();
    store.store_bool("flag", true).unwrap();
    assert!(store.fetch_bool("flag", false).unwrap().value);
}

#[test]
fn out_of_range_i32_falls_back_to_default() {
    let fixture = TestFixture::prepared();
    let db = fixture.open();
    let store = db.meta_store(TABLE).unwrap();
    store.store_i64("limit", i64::from(i32::MAX) + 1).unwrap();
    let fetched = store.fetch_i32("limit", 100).unwrap();
    assert_eq!(fetched.value, 100);
    assert!(fetched.modify_at > 0);
    assert_eq!(store.fetch_i64("limit", 0).unwrap().value, i64::from(i32::MAX) + 1);
}

#[test]
fn missing_table_is_surfaced_to_typed_getters() {
    let fixture = TestFixture::new();
    let db = fixture.open();
    let store = db.meta_store(TABLE).unwrap();
    let err = store.fetch_i64("retries", 0).unwrap_err();
    assert!(err.is_table_missing());
    assert!(store.store_i64("retries", 1).unwrap_err().is_table_missing());
}
