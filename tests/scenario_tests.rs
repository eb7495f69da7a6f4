mod common;

use common::{after_expiry, test_session, test_table};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;

use sharestate::{LocalTransactionService, LockKind, NtStatus, OpenParams, SharedAccess};

/// Two sessions on their own threads share a file, contend for a byte
/// range, close it, and the sweep evicts the state afterwards.
#[test]
fn test_two_session_open_lock_close_sweep() {
    let table = test_table();
    let service = Arc::new(LocalTransactionService::new());

    let (to_second, second_rx) = mpsc::channel::<&'static str>();
    let (to_first, first_rx) = mpsc::channel::<&'static str>();

    let first = {
        let table = Arc::clone(&table);
        let service = Arc::clone(&service);
        thread::spawn(move || {
            let mut session = test_session(1, &service);
            let file = session
                .open_file(&table, "/a/b.txt", OpenParams::read_write(1).with_create(true))
                .unwrap();
            assert_eq!(file.state().open_count(), 1);
            assert_eq!(file.state().shared_access(), SharedAccess::READWRITE);
            session.end_transaction().unwrap();
            to_second.send("opened").unwrap();

            assert_eq!(first_rx.recv().unwrap(), "opened");
            session.lock_file(&file, 0, 100, LockKind::Exclusive).unwrap();
            session.end_transaction().unwrap();
            to_second.send("locked").unwrap();

            assert_eq!(first_rx.recv().unwrap(), "lock-refused");
            assert_eq!(session.close_file(&table, file).unwrap(), 1);
            session.end_transaction().unwrap();
            to_second.send("closed").unwrap();
        })
    };

    let second = {
        let table = Arc::clone(&table);
        let service = Arc::clone(&service);
        thread::spawn(move || {
            let mut session = test_session(2, &service);
            assert_eq!(second_rx.recv().unwrap(), "opened");
            let file = session
                .open_file(&table, "/a/b.txt", OpenParams::read_write(2))
                .unwrap();
            assert_eq!(file.state().open_count(), 2);
            session.end_transaction().unwrap();
            to_first.send("opened").unwrap();

            assert_eq!(second_rx.recv().unwrap(), "locked");
            let err = session
                .lock_file(&file, 50, 100, LockKind::Exclusive)
                .unwrap_err();
            assert_eq!(err.status(), NtStatus::LockNotGranted);
            assert_eq!(file.state().open_count(), 2);
            assert_eq!(file.state().number_of_locks(), 1);
            session.end_transaction().unwrap();
            to_first.send("lock-refused").unwrap();

            assert_eq!(second_rx.recv().unwrap(), "closed");
            assert_eq!(session.close_file(&table, file).unwrap(), 0);
            session.end_transaction().unwrap();
        })
    };

    first.join().unwrap();
    second.join().unwrap();

    let state = table.find_file_state("/a/b.txt", false, false).unwrap();
    assert_eq!(state.open_count(), 0);
    assert!(!state.has_active_locks());
    drop(state);

    assert_eq!(table.remove_expired_file_states_at(after_expiry(&table)), 1);
    assert_eq!(table.number_of_states(), 0);
}
