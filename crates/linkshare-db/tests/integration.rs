use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use linkshare_db::{Store, StoreError, StoreSettings};
use tempfile::TempDir;

const TEST_SCHEMA: &str = "
CREATE TABLE settings (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL,
    kind TEXT CHECK(kind IN ('int', 'string', 'bool', 'json', 'glob')) NOT NULL
);

INSERT INTO settings (key, value, kind) VALUES ('schema-version', '1', 'int');

CREATE TABLE notes (id INTEGER PRIMARY KEY, body TEXT NOT NULL);
";

fn write_schema(dir: &Path, script: &str) -> PathBuf {
    let schema_dir = dir.join("schema");
    std::fs::create_dir_all(&schema_dir).expect("failed to create schema dir");
    std::fs::write(schema_dir.join("current.sql"), script).expect("failed to write schema");
    schema_dir
}

fn open_store(dir: &TempDir) -> Store {
    Store::open(dir.path().join("test.db"), StoreSettings::default()).expect("failed to open db")
}

fn exec(store: &Store, sql: &str) {
    store
        .transaction(|tx| tx.execute_batch(sql).map_err(StoreError::db("test setup")))
        .expect("setup statement failed");
}

fn count(store: &Store, sql: &str) -> i64 {
    store
        .transaction(|tx| {
            tx.query_row(sql, [], |row| row.get(0))
                .map_err(StoreError::db("test count"))
        })
        .expect("count query failed")
}

#[test]
fn open_creates_file_and_close_is_idempotent() {
    let dir = TempDir::new().expect("failed to create temp dir");
    let path = dir.path().join("fresh.db");
    assert!(!path.exists());

    let mut store = Store::open(&path, StoreSettings::default()).expect("failed to open db");
    assert!(path.exists(), "open should create the store file");
    assert!(store.is_open());

    store.close();
    assert!(!store.is_open());
    store.close();

    let err = store
        .check_initialized()
        .expect_err("closed handle should refuse work");
    assert!(matches!(err, StoreError::Closed));
}

#[test]
fn open_fails_fast_when_file_cannot_be_created() {
    let dir = TempDir::new().expect("failed to create temp dir");
    let path = dir.path().join("missing").join("nested").join("test.db");

    let started = Instant::now();
    let err = Store::open(&path, StoreSettings::default()).expect_err("open should fail");
    assert!(
        started.elapsed() < Duration::from_secs(1),
        "open took {:?}",
        started.elapsed()
    );
    assert!(matches!(err, StoreError::Connection { .. }), "got {err:?}");
    assert!(
        err.to_string().contains("unable to open database file"),
        "the SQLite error should be reported, got: {err}"
    );
}

#[test]
fn open_fails_fast_on_non_database_file() {
    let dir = TempDir::new().expect("failed to create temp dir");
    let path = dir.path().join("junk.db");
    std::fs::write(&path, vec![0x5a_u8; 4096]).expect("failed to write junk file");

    let started = Instant::now();
    let err = Store::open(&path, StoreSettings::default()).expect_err("open should fail");
    assert!(
        started.elapsed() < Duration::from_secs(1),
        "open took {:?}",
        started.elapsed()
    );
    assert!(matches!(err, StoreError::Connection { .. }), "got {err:?}");
    assert!(
        err.to_string().contains("not a database"),
        "the SQLite error should be reported, got: {err}"
    );
}

#[test]
fn initialize_applies_bootstrap_script() {
    let dir = TempDir::new().expect("failed to create temp dir");
    let schema_dir = write_schema(dir.path(), TEST_SCHEMA);
    let store = open_store(&dir);

    assert!(matches!(
        store.check_initialized(),
        Err(StoreError::NotInitialized)
    ));

    store.initialize(&schema_dir).expect("initialization failed");
    store.check_initialized().expect("store should be initialized");
    assert_eq!(store.schema_version().expect("version should read"), 1);
}

#[test]
fn initialize_twice_leaves_data_untouched() {
    let dir = TempDir::new().expect("failed to create temp dir");
    let schema_dir = write_schema(dir.path(), TEST_SCHEMA);
    let store = open_store(&dir);

    store.initialize(&schema_dir).expect("initialization failed");
    exec(&store, "INSERT INTO notes (body) VALUES ('keep me')");

    let err = store
        .initialize(&schema_dir)
        .expect_err("second initialization should fail");
    assert!(matches!(err, StoreError::AlreadyInitialized));
    assert_eq!(count(&store, "SELECT COUNT(*) FROM notes"), 1);
}

#[test]
fn initialize_reports_missing_script() {
    let dir = TempDir::new().expect("failed to create temp dir");
    let store = open_store(&dir);

    let err = store
        .initialize(dir.path().join("nowhere"))
        .expect_err("missing script should fail");
    assert!(matches!(err, StoreError::SchemaFile { .. }), "got {err:?}");
}

#[test]
fn failed_initialization_leaves_store_clean() {
    let dir = TempDir::new().expect("failed to create temp dir");
    let schema_dir = write_schema(
        dir.path(),
        "CREATE TABLE settings (key TEXT PRIMARY KEY, value TEXT NOT NULL, kind TEXT NOT NULL);
         THIS IS NOT SQL;",
    );
    let store = open_store(&dir);

    let err = store
        .initialize(&schema_dir)
        .expect_err("malformed script should fail");
    assert!(matches!(err, StoreError::Initialization(_)), "got {err:?}");

    assert!(
        matches!(store.check_initialized(), Err(StoreError::NotInitialized)),
        "partial schema should have been rolled back"
    );
}

#[test]
fn shipped_schema_initializes() {
    let schema_dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../schema");
    let store = Store::open_in_memory(StoreSettings::default()).expect("failed to open db");

    store.initialize(&schema_dir).expect("shipped schema should apply");
    assert_eq!(store.check_schema_version().expect("versions should match"), 1);
    assert_eq!(count(&store, "SELECT COUNT(*) FROM links"), 0);
}

#[test]
fn schema_version_rejects_bad_values() {
    let dir = TempDir::new().expect("failed to create temp dir");
    let store = open_store(&dir);

    assert!(matches!(
        store.schema_version(),
        Err(StoreError::NotInitialized)
    ));

    exec(
        &store,
        "CREATE TABLE settings (key TEXT PRIMARY KEY, value TEXT NOT NULL, kind TEXT NOT NULL)",
    );
    assert!(matches!(
        store.schema_version(),
        Err(StoreError::InvalidVersion(_))
    ));

    exec(
        &store,
        "INSERT INTO settings (key, value, kind) VALUES ('schema-version', 'invalid', 'int')",
    );
    assert!(matches!(
        store.schema_version(),
        Err(StoreError::InvalidVersion(_))
    ));

    exec(&store, "UPDATE settings SET value = '0' WHERE key = 'schema-version'");
    assert!(matches!(
        store.schema_version(),
        Err(StoreError::InvalidVersion(_))
    ));

    exec(&store, "UPDATE settings SET value = '3' WHERE key = 'schema-version'");
    assert_eq!(store.schema_version().expect("version should read"), 3);
}

#[test]
fn check_schema_version_compares_with_expected() {
    let dir = TempDir::new().expect("failed to create temp dir");
    let path = dir.path().join("test.db");
    let store = Store::open(&path, StoreSettings::default()).expect("failed to open db");

    assert!(matches!(
        store.check_schema_version(),
        Err(StoreError::NotInitialized)
    ));

    exec(
        &store,
        "CREATE TABLE settings (key TEXT PRIMARY KEY, value TEXT NOT NULL, kind TEXT NOT NULL);
         INSERT INTO settings (key, value, kind) VALUES ('schema-version', '1', 'int');",
    );
    assert_eq!(store.check_schema_version().expect("should match"), 1);
    drop(store);

    let newer_build = Store::open(
        &path,
        StoreSettings {
            expected_schema_version: 2,
            ..StoreSettings::default()
        },
    )
    .expect("failed to reopen db");
    assert!(matches!(
        newer_build.check_schema_version(),
        Err(StoreError::SchemaOutdated {
            stored: 1,
            expected: 2
        })
    ));
    drop(newer_build);

    let store = Store::open(&path, StoreSettings::default()).expect("failed to reopen db");
    exec(&store, "UPDATE settings SET value = '2' WHERE key = 'schema-version'");
    assert!(matches!(
        store.check_schema_version(),
        Err(StoreError::SchemaUnsupported {
            stored: 2,
            expected: 1
        })
    ));
}

#[test]
fn transaction_commits_on_success() {
    let dir = TempDir::new().expect("failed to create temp dir");
    let store = open_store(&dir);
    exec(&store, "CREATE TABLE test (id INTEGER PRIMARY KEY, value TEXT)");

    let id = store
        .transaction(|tx| {
            tx.execute("INSERT INTO test (value) VALUES (?1)", ["test-value"])
                .map_err(StoreError::db("insert"))?;
            Ok(tx.last_insert_rowid())
        })
        .expect("transaction failed");

    assert_eq!(id, 1);
    assert_eq!(
        count(&store, "SELECT COUNT(*) FROM test WHERE value = 'test-value'"),
        1
    );
}

#[test]
fn transaction_rolls_back_on_error() {
    let dir = TempDir::new().expect("failed to create temp dir");
    let store = open_store(&dir);
    exec(&store, "CREATE TABLE test (id INTEGER PRIMARY KEY, value TEXT)");

    let err = store
        .transaction(|tx| -> Result<(), StoreError> {
            tx.execute("INSERT INTO test (value) VALUES (?1)", ["should-rollback"])
                .map_err(StoreError::db("insert"))?;
            Err(StoreError::InvalidVersion("forced".to_string()))
        })
        .expect_err("transaction should fail");

    assert!(
        matches!(err, StoreError::InvalidVersion(ref msg) if msg == "forced"),
        "the unit of work's error should come back unchanged, got {err:?}"
    );
    assert_eq!(
        count(&store, "SELECT COUNT(*) FROM test WHERE value = 'should-rollback'"),
        0
    );
}

#[test]
fn failed_rollback_keeps_the_original_error() {
    let dir = TempDir::new().expect("failed to create temp dir");
    let store = open_store(&dir);

    let err = store
        .transaction(|tx| -> Result<(), StoreError> {
            // Ending the transaction early makes the wrapper's ROLLBACK fail.
            tx.execute_batch("ROLLBACK")
                .map_err(StoreError::db("early rollback"))?;
            Err(StoreError::InvalidVersion("forced".to_string()))
        })
        .expect_err("transaction should fail");

    match err {
        StoreError::Rollback { original, .. } => assert!(
            matches!(*original, StoreError::InvalidVersion(ref msg) if msg == "forced"),
            "original error should be preserved, got {original:?}"
        ),
        other => panic!("expected a rollback failure, got {other:?}"),
    }

    // The handle is still usable.
    assert_eq!(count(&store, "SELECT 1"), 1);
}

#[test]
fn failed_commit_is_reported() {
    let dir = TempDir::new().expect("failed to create temp dir");
    let store = open_store(&dir);

    let err = store
        .transaction(|tx| {
            tx.execute_batch("COMMIT")
                .map_err(StoreError::db("early commit"))?;
            Ok(())
        })
        .expect_err("commit should fail");

    assert!(matches!(err, StoreError::Commit(_)), "got {err:?}");
    assert_eq!(count(&store, "SELECT 1"), 1);
}

#[test]
fn transaction_rolls_back_and_propagates_panic() {
    let dir = TempDir::new().expect("failed to create temp dir");
    let store = open_store(&dir);
    exec(&store, "CREATE TABLE test (id INTEGER PRIMARY KEY, value TEXT)");

    let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        let _ = store.transaction(|tx| -> Result<(), StoreError> {
            tx.execute("INSERT INTO test (value) VALUES (?1)", ["panicked"])
                .map_err(StoreError::db("insert"))?;
            panic!("test panic");
        });
    }));

    let payload = outcome.expect_err("panic should reach the caller");
    assert_eq!(payload.downcast_ref::<&str>(), Some(&"test panic"));

    // The connection is usable again and the write is gone.
    assert_eq!(
        count(&store, "SELECT COUNT(*) FROM test WHERE value = 'panicked'"),
        0
    );
}

#[test]
fn concurrent_transactions_queue_on_the_single_connection() {
    let dir = TempDir::new().expect("failed to create temp dir");
    let store = open_store(&dir);
    exec(&store, "CREATE TABLE test (id INTEGER PRIMARY KEY, worker INTEGER)");

    std::thread::scope(|scope| {
        for worker in 0..4_i64 {
            let store = &store;
            scope.spawn(move || {
                for _ in 0..25 {
                    store
                        .transaction(|tx| {
                            tx.execute("INSERT INTO test (worker) VALUES (?1)", [worker])
                                .map_err(StoreError::db("insert"))?;
                            Ok(())
                        })
                        .expect("concurrent insert failed");
                }
            });
        }
    });

    assert_eq!(count(&store, "SELECT COUNT(*) FROM test"), 100);
}

#[test]
fn backup_writes_a_readable_copy() {
    let dir = TempDir::new().expect("failed to create temp dir");
    let schema_dir = write_schema(dir.path(), TEST_SCHEMA);
    let store = open_store(&dir);
    store.initialize(&schema_dir).expect("initialization failed");
    exec(&store, "INSERT INTO notes (body) VALUES ('backed up')");

    let destination = dir.path().join("backup.db");
    store.backup(&destination).expect("backup failed");

    let copy = Store::open(&destination, StoreSettings::default()).expect("failed to open backup");
    assert_eq!(copy.check_schema_version().expect("backup should match"), 1);
    assert_eq!(count(&copy, "SELECT COUNT(*) FROM notes"), 1);

    let err = store
        .backup(&destination)
        .expect_err("existing destination should be refused");
    assert!(matches!(err, StoreError::Backup { .. }));
}
