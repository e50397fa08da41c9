#![allow(dead_code)]

use diesel::SqliteConnection;
use tempfile::TempDir;

use quote_store::db::{connect_sqlite, migrate};

/// A migrated SQLite database on a temp directory, dropped with the test.
pub struct TestDb {
    dir: TempDir,
    url: String,
}

impl TestDb {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("create temp dir");
        let url = dir
            .path()
            .join("quotes.db")
            .to_string_lossy()
            .into_owned();
        migrate::run(&url).expect("run migrations");
        Self { dir, url }
    }

    pub fn conn(&self) -> SqliteConnection {
        connect_sqlite(&self.url).expect("open connection")
    }

    /// A scratch path inside the test's temp dir.
    pub fn path(&self, name: &str) -> std::path::PathBuf {
        self.dir.path().join(name)
    }
}
