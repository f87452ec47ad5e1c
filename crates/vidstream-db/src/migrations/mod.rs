//! Embedded schema migrations.
//!
//! The schema version lives in SQLite's `user_version` pragma. Migration `n`
//! (1-based) is the `n`th entry of [`MIGRATIONS`] and moves the database from
//! version `n - 1` to `n`.

use rusqlite::Connection;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MigrationError {
    #[error("migration {version} failed: {source}")]
    Failed {
        version: u32,
        #[source]
        source: rusqlite::Error,
    },

    #[error("database schema version {found} is newer than this build supports ({supported})")]
    NewerSchema { found: u32, supported: u32 },

    #[error("cannot read schema version: {0}")]
    Version(#[source] rusqlite::Error),
}

const MIGRATIONS: &[&str] = &[include_str!("001_initial.sql")];

fn schema_version(conn: &Connection) -> Result<u32, MigrationError> {
    conn.query_row("PRAGMA user_version", [], |row| row.get(0))
        .map_err(MigrationError::Version)
}

/// Bring the schema up to date. Each migration and its version bump commit
/// together.
///
/// Returns the number of migrations applied.
pub fn run_migrations(conn: &Connection) -> Result<usize, MigrationError> {
    let supported = MIGRATIONS.len() as u32;
    let found = schema_version(conn)?;
    if found > supported {
        return Err(MigrationError::NewerSchema { found, supported });
    }

    for (version, sql) in (found + 1..).zip(&MIGRATIONS[found as usize..]) {
        let failed = |source| MigrationError::Failed { version, source };

        let tx = conn.unchecked_transaction().map_err(failed)?;
        tx.execute_batch(sql).map_err(failed)?;
        tx.pragma_update(None, "user_version", version).map_err(failed)?;
        tx.commit().map_err(failed)?;

        tracing::info!(version, "Applied schema migration");
    }

    Ok((supported - found) as usize)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_database_is_migrated_once() {
        let conn = Connection::open_in_memory().unwrap();

        assert_eq!(run_migrations(&conn).unwrap(), MIGRATIONS.len());
        assert_eq!(schema_version(&conn).unwrap(), MIGRATIONS.len() as u32);
        assert_eq!(run_migrations(&conn).unwrap(), 0);

        let indexes: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='index' AND tbl_name='videos' AND name LIKE 'idx_%' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<rusqlite::Result<_>>()
            .unwrap();
        assert_eq!(indexes, vec!["idx_videos_created_at", "idx_videos_title"]);
    }

    #[test]
    fn test_newer_schema_is_refused() {
        let conn = Connection::open_in_memory().unwrap();
        conn.pragma_update(None, "user_version", 99).unwrap();

        let err = run_migrations(&conn).unwrap_err();
        assert!(matches!(err, MigrationError::NewerSchema { found: 99, .. }));
    }
}
