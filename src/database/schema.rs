use rusqlite::Connection;
use anyhow::{Result, Context};
use tracing::info;

pub const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS arts (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        data TEXT NOT NULL,
        title TEXT,
        palette TEXT,
        complexity INTEGER,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    );
";

/// Columns that may be added to an `arts` table created by an older build.
/// `id` and `data` are never missing, so they are not listed.
const ADDITIVE_COLUMNS: &[(&str, &str)] = &[
    ("title", "TEXT"),
    ("palette", "TEXT"),
    ("complexity", "INTEGER"),
    ("created_at", "TEXT NOT NULL DEFAULT '1970-01-01T00:00:00.000Z'"),
    ("updated_at", "TEXT NOT NULL DEFAULT '1970-01-01T00:00:00.000Z'"),
];

/// Creates the `arts` table if needed and adds any known column it lacks.
/// Never drops columns or rows, so it is safe to run on every startup.
pub fn migrate(conn: &Connection) -> Result<()> {
    conn.execute_batch(SCHEMA).context("Failed to initialize schema")?;

    let existing = table_columns(conn, "arts")?;
    for (name, decl) in ADDITIVE_COLUMNS {
        if existing.iter().any(|c| c == name) {
            continue;
        }
        conn.execute_batch(&format!("ALTER TABLE arts ADD COLUMN {name} {decl}"))
            .with_context(|| format!("Failed to add column '{name}' to arts"))?;
        info!(column = name, "Added missing column to arts");
    }

    Ok(())
}

fn table_columns(conn: &Connection, table: &str) -> Result<Vec<String>> {
    let mut stmt = conn
        .prepare(&format!("PRAGMA table_info({table})"))
        .context("Failed to read table info")?;
    let names = stmt
        .query_map([], |row| row.get::<_, String>(1))?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migrate_is_idempotent() -> Result<()> {
        let conn = Connection::open_in_memory()?;
        migrate(&conn)?;
        migrate(&conn)?;

        let columns = table_columns(&conn, "arts")?;
        assert_eq!(
            columns,
            vec!["id", "data", "title", "palette", "complexity", "created_at", "updated_at"]
        );
        Ok(())
    }

    #[test]
    fn test_migrate_adds_missing_columns_and_keeps_rows() -> Result<()> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(
            "CREATE TABLE arts (id INTEGER PRIMARY KEY AUTOINCREMENT, data TEXT NOT NULL, title TEXT);
             INSERT INTO arts (data, title) VALUES ('legacy', 'Old');",
        )?;

        migrate(&conn)?;

        let columns = table_columns(&conn, "arts")?;
        assert!(columns.iter().any(|c| c == "palette"));
        assert!(columns.iter().any(|c| c == "created_at"));

        let (data, created_at): (String, String) = conn.query_row(
            "SELECT data, created_at FROM arts WHERE title = 'Old'",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        assert_eq!(data, "legacy");
        assert_eq!(created_at, "1970-01-01T00:00:00.000Z");
        Ok(())
    }
}
