mod connection;
mod migrations;

pub mod helpers;
pub mod models;

pub(crate) mod repositories {
    pub mod presets;
    pub mod sessions;
    pub mod settings;
    pub mod tasks;
}

pub use connection::Database;

#[cfg(test)]
pub(crate) fn temp_database() -> (tempfile::TempDir, Database) {
    let dir = tempfile::tempdir().expect("create temp dir");
    let db = Database::new(dir.path().join("pomodoro-test.sqlite3")).expect("open database");
    (dir, db)
}
