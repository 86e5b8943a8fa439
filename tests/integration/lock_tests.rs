use std::time::Duration;

use metastore::MetaTx;

use crate::fixture::{TABLE, TestFixture};

#[test]
fn held_lock_blocks_other_lockers_until_commit() {
    let fixture = TestFixture::prepared();
    let mut holder = fixture.open();
    let mut contender = fixture.open_with_timeout(Duration::from_millis(50));
    holder.meta_store(TABLE).unwrap().store_i64("job", 0).unwrap();

    {
        let tx = holder.transaction().unwrap();
        {
            let meta_tx = MetaTx::new(&tx, TABLE).unwrap();
            let _lock = meta_tx.required_lock("job").unwrap();

            let blocked = contender.transaction();
            assert!(blocked.is_err(), "second writer must wait on the held lock");
        }
        tx.commit().unwrap();
    }

    let tx = contender.transaction().unwrap();
    let meta_tx = MetaTx::new(&tx, TABLE).unwrap();
    assert!(meta_tx.required_lock("job").is_ok());
}

#[test]
fn deferred_transaction_blocks_on_locking_read() {
    let fixture = TestFixture::prepared();
    let mut holder = fixture.open();
    let mut contender = fixture.open_with_timeout(Duration::from_millis(50));

    let tx = holder.transaction().unwrap();
    let meta_tx = MetaTx::new(&tx, TABLE).unwrap();
    assert!(meta_tx.optional_lock("job").unwrap().is_none());

    let other_tx = contender.conn_mut().transaction().unwrap();
    let other = MetaTx::new(&other_tx, TABLE).unwrap();
    assert!(other.optional_lock("job").is_err());
}

#[test]
fn non_transactional_readers_see_unlock_after_commit() {
    let fixture = TestFixture::prepared();
    let mut worker = fixture.open();
    let reader = fixture.open();
    fixture
        .raw()
        .execute("INSERT INTO conf VALUES ('job', '0', 5)", [])
        .unwrap();

    {
        let tx = worker.transaction().unwrap();
        {
            let meta_tx = MetaTx::new(&tx, TABLE).unwrap();
            let lock = meta_tx.required_lock("job").unwrap();
            assert_eq!(lock.modify_at(), 5);
            meta_tx.store_i64("job.result", 42).unwrap();
            lock.unlock().unwrap();

            let seen = reader.meta_store(TABLE).unwrap().fetch("job").unwrap().unwrap();
            assert_eq!(seen.modify_at, 5);
        }
        tx.commit().unwrap();
    }

    let store = reader.meta_store(TABLE).unwrap();
    assert!(store.fetch("job").unwrap().unwrap().modify_at > 5);
    assert_eq!(store.fetch_i64("job.result", 0).unwrap().value, 42);
}

#[test]
fn required_lock_on_missing_row_is_not_found() {
    let fixture = TestFixture::prepared();
    let mut db = fixture.open();
    let tx = db.transaction().unwrap();
    let meta_tx = MetaTx::new(&tx, TABLE).unwrap();
    let err = meta_tx.required_lock("absent").unwrap_err();
    assert!(err.is_not_found());
}
