//! Database schema migrations.

use rusqlite::Connection;
use tracing::info;

use cvscout_core::error::CvScoutError;

/// Run all pending database migrations.
pub fn run_migrations(conn: &Connection) -> Result<(), CvScoutError> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version     INTEGER PRIMARY KEY NOT NULL,
            name        TEXT NOT NULL,
            applied_at  INTEGER NOT NULL DEFAULT (strftime('%s', 'now'))
        );",
    )
    .map_err(|e| CvScoutError::Storage(format!("Failed to create migrations table: {}", e)))?;

    let current_version: i64 = conn
        .query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
            [],
            |row| row.get(0),
        )
        .map_err(|e| CvScoutError::Storage(format!("Failed to query migration version: {}", e)))?;

    if current_version < 1 {
        apply_v1(conn)?;
        info!("Applied migration v1: candidates");
    }

    Ok(())
}

/// Version 1: candidate profiles. List-valued columns hold JSON arrays.
fn apply_v1(conn: &Connection) -> Result<(), CvScoutError> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS candidates (
            id              INTEGER PRIMARY KEY AUTOINCREMENT,
            full_name       TEXT NOT NULL,
            email           TEXT NOT NULL UNIQUE,
            phone           TEXT,
            education       TEXT NOT NULL DEFAULT '[]',
            work_experience TEXT NOT NULL DEFAULT '[]',
            skills          TEXT NOT NULL DEFAULT '[]',
            projects        TEXT NOT NULL DEFAULT '[]',
            certifications  TEXT NOT NULL DEFAULT '[]',
            created_at      INTEGER NOT NULL DEFAULT (strftime('%s', 'now')),
            updated_at      INTEGER NOT NULL DEFAULT (strftime('%s', 'now'))
        );

        CREATE INDEX IF NOT EXISTS idx_candidates_email
            ON candidates (email);

        INSERT OR IGNORE INTO schema_migrations (version, name) VALUES (1, 'candidates');
        ",
    )
    .map_err(|e| CvScoutError::Storage(format!("Failed to apply migration v1: {}", e)))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migrations_run_once() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        run_migrations(&conn).unwrap();

        let version: i64 = conn
            .query_row("SELECT MAX(version) FROM schema_migrations", [], |row| {
                row.get(0)
            })
            .unwrap();
        assert_eq!(version, 1);
    }

    #[test]
    fn test_candidate_defaults() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();

        conn.execute(
            "INSERT INTO candidates (full_name, email) VALUES ('Jane', 'jane@example.com')",
            [],
        )
        .unwrap();

        let skills: String = conn
            .query_row(
                "SELECT skills FROM candidates WHERE email = 'jane@example.com'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(skills, "[]");
    }

    #[test]
    fn test_email_unique() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();

        conn.execute(
            "INSERT INTO candidates (full_name, email) VALUES ('A', 'dup@example.com')",
            [],
        )
        .unwrap();
        let result = conn.execute(
            "INSERT INTO candidates (full_name, email) VALUES ('B', 'dup@example.com')",
            [],
        );
        assert!(result.is_err());
    }
}
