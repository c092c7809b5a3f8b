use crate::error::LedgerError;
use crate::models::LEDGER_SCHEMA_VERSION;
use rusqlite::{params, Connection, OptionalExtension, Result};
use std::fs;
use std::path::Path;

const MIGRATION_LEDGER_SQL: &str = "
CREATE TABLE IF NOT EXISTS ledger_rows (
    id TEXT PRIMARY KEY NOT NULL,
    owner TEXT NOT NULL,
    isbn TEXT NOT NULL,
    title TEXT NOT NULL,
    author TEXT NOT NULL,
    status TEXT NOT NULL,
    borrower TEXT NOT NULL DEFAULT '',
    due_date TEXT NOT NULL DEFAULT '',
    cover_url TEXT NOT NULL DEFAULT '',
    reading_progress TEXT NOT NULL DEFAULT '',
    added_at INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS ledger_rows_owner_idx ON ledger_rows (owner);
";

const MIGRATION_USERS_SQL: &str = "
CREATE TABLE IF NOT EXISTS users (
    username TEXT PRIMARY KEY NOT NULL,
    password_hash TEXT NOT NULL,
    salt TEXT NOT NULL,
    created_at INTEGER NOT NULL
);
";

const MIGRATION_META_SQL: &str = "
CREATE TABLE IF NOT EXISTS meta (
    key TEXT PRIMARY KEY NOT NULL,
    value TEXT NOT NULL
);
";

const MIGRATIONS: &[(&str, &str)] = &[
    ("0000_ledger_rows", MIGRATION_LEDGER_SQL),
    ("0001_users", MIGRATION_USERS_SQL),
    ("0002_meta", MIGRATION_META_SQL),
];

const SCHEMA_VERSION_KEY: &str = "ledger_schema_version";

/// Open (creating if needed) the database file and bring its schema up to date.
pub fn open_db(path: &Path) -> std::result::Result<Connection, LedgerError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent).map_err(|source| LedgerError::CreateDir {
                path: parent.display().to_string(),
                source,
            })?;
        }
    }
    let conn = Connection::open(path)?;
    migrate(&conn)?;
    check_schema_version(&conn)?;
    Ok(conn)
}

pub fn open_in_memory() -> std::result::Result<Connection, LedgerError> {
    let conn = Connection::open_in_memory()?;
    migrate(&conn)?;
    check_schema_version(&conn)?;
    Ok(conn)
}

pub fn migrate(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            id TEXT PRIMARY KEY NOT NULL,
            applied_at INTEGER NOT NULL
        );",
    )?;
    for (id, sql) in MIGRATIONS {
        apply_migration(conn, id, sql)?;
    }
    Ok(())
}

/// Stamp a fresh database with [`LEDGER_SCHEMA_VERSION`] and refuse one
/// written by a build with a newer ledger column layout.
pub fn check_schema_version(conn: &Connection) -> std::result::Result<u32, LedgerError> {
    let stored: Option<String> = conn
        .query_row(
            "SELECT value FROM meta WHERE key = ?1",
            params![SCHEMA_VERSION_KEY],
            |row| row.get(0),
        )
        .optional()?;
    let Some(stored) = stored else {
        conn.execute(
            "INSERT INTO meta (key, value) VALUES (?1, ?2)",
            params![SCHEMA_VERSION_KEY, LEDGER_SCHEMA_VERSION.to_string()],
        )?;
        return Ok(LEDGER_SCHEMA_VERSION);
    };
    let found: u32 = stored.trim().parse().map_err(|_| LedgerError::InvalidValue {
        column: SCHEMA_VERSION_KEY.to_string(),
        message: format!("not a version number: {}", stored),
    })?;
    if found > LEDGER_SCHEMA_VERSION {
        return Err(LedgerError::SchemaTooNew {
            found,
            supported: LEDGER_SCHEMA_VERSION,
        });
    }
    Ok(found)
}

fn apply_migration(conn: &Connection, id: &str, sql: &str) -> Result<()> {
    let existing: Option<String> = conn
        .query_row(
            "SELECT id FROM schema_migrations WHERE id = ?1",
            params![id],
            |row| row.get(0),
        )
        .optional()?;
    if existing.is_some() {
        return Ok(());
    }
    conn.execute_batch(sql)?;
    conn.execute(
        "INSERT INTO schema_migrations (id, applied_at) VALUES (?1, ?2)",
        params![id, chrono::Utc::now().timestamp_millis()],
    )?;
    log::info!("applied migration {}", id);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn migrations_are_recorded_once() {
        let conn = open_in_memory().expect("in-memory db");
        migrate(&conn).expect("second migrate is a no-op");

        let applied: i64 = conn
            .query_row("SELECT COUNT(*) FROM schema_migrations", [], |row| row.get(0))
            .expect("count migrations");
        assert_eq!(applied, MIGRATIONS.len() as i64);
    }

    #[test]
    fn fresh_database_is_stamped_with_schema_version() {
        let conn = open_in_memory().expect("in-memory db");

        let stored: String = conn
            .query_row(
                "SELECT value FROM meta WHERE key = ?1",
                params![SCHEMA_VERSION_KEY],
                |row| row.get(0),
            )
            .expect("schema version row");
        assert_eq!(stored, LEDGER_SCHEMA_VERSION.to_string());
        assert_eq!(check_schema_version(&conn).expect("same version"), LEDGER_SCHEMA_VERSION);
    }

    #[test]
    fn newer_schema_version_is_refused() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("ledger.db");
        let conn = open_db(&path).expect("db should open");
        conn.execute(
            "UPDATE meta SET value = ?1 WHERE key = ?2",
            params![(LEDGER_SCHEMA_VERSION + 1).to_string(), SCHEMA_VERSION_KEY],
        )
        .expect("bump version");
        drop(conn);

        match open_db(&path) {
            Err(LedgerError::SchemaTooNew { found, supported }) => {
                assert_eq!(found, LEDGER_SCHEMA_VERSION + 1);
                assert_eq!(supported, LEDGER_SCHEMA_VERSION);
            }
            other => panic!("expected SchemaTooNew, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn open_db_creates_missing_parent_directory() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("nested").join("ledger.db");

        let conn = open_db(&path).expect("db should open");
        drop(conn);

        assert!(path.exists());
    }
}
