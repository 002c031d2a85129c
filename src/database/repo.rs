use std::path::Path;
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OpenFlags, OptionalExtension, Row};

use crate::database::schema;

/// A saved artwork as stored in the `arts` table.
#[derive(Debug, Clone, PartialEq)]
pub struct ArtRecord {
    pub id: i64,
    pub data: String,
    pub title: Option<String>,
    pub palette: Option<String>,
    pub complexity: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields supplied by the caller when inserting an artwork.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewArt {
    pub data: String,
    pub title: Option<String>,
    pub palette: Option<String>,
    pub complexity: Option<i32>,
}

/// Storage capability set used by the API handlers.
#[async_trait]
pub trait ArtStore: Send + Sync {
    /// Cheap round trip proving the store is reachable.
    async fn ping(&self) -> Result<()>;

    /// Creates the table or adds missing columns.
    async fn migrate(&self) -> Result<()>;

    async fn insert(&self, art: NewArt) -> Result<ArtRecord>;

    /// All records, most recently created first.
    async fn find_all(&self) -> Result<Vec<ArtRecord>>;

    async fn find_by_id(&self, id: i64) -> Result<Option<ArtRecord>>;

    /// Returns whether a row existed.
    async fn delete_by_id(&self, id: i64) -> Result<bool>;
}

/// `ArtStore` backed by a single SQLite connection.
///
/// rusqlite is blocking, so every call hops onto tokio's blocking pool and
/// takes the connection lock there.
#[derive(Clone)]
pub struct SqliteArtStore {
    conn: Arc<Mutex<Connection>>,
}

const SELECT_COLUMNS: &str =
    "SELECT id, data, title, palette, complexity, created_at, updated_at FROM arts";

impl SqliteArtStore {
    /// Opens (or creates) the database file. The parent directory must
    /// already exist.
    pub fn open(path: &Path) -> Result<Self> {
        let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_CREATE
            | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        let conn = Connection::open_with_flags(path, flags)
            .with_context(|| format!("Failed to open database at {}", path.display()))?;
        Ok(Self::from_connection(conn))
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("Failed to open in-memory database")?;
        Ok(Self::from_connection(conn))
    }

    fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
        }
    }

    async fn with_conn<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let guard = conn
                .lock()
                .map_err(|_| anyhow!("Database connection lock poisoned"))?;
            f(&guard)
        })
        .await
        .context("Database task panicked")?
    }
}

#[async_trait]
impl ArtStore for SqliteArtStore {
    async fn ping(&self) -> Result<()> {
        self.with_conn(|conn| {
            conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))
                .context("Database did not answer")?;
            Ok(())
        })
        .await
    }

    async fn migrate(&self) -> Result<()> {
        self.with_conn(schema::migrate).await
    }

    async fn insert(&self, art: NewArt) -> Result<ArtRecord> {
        self.with_conn(move |conn| {
            let now = Utc::now();
            let stamp = format_timestamp(&now);
            let id: i64 = conn
                .query_row(
                    "INSERT INTO arts (data, title, palette, complexity, created_at, updated_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?5)
                     RETURNING id",
                    params![art.data, art.title, art.palette, art.complexity, stamp],
                    |row| row.get(0),
                )
                .context("Failed to insert artwork")?;

            // Round-trip through the text format so the returned record
            // matches what a later read produces.
            let stored = parse_timestamp(&stamp).context("Failed to parse stored timestamp")?;
            Ok(ArtRecord {
                id,
                data: art.data,
                title: art.title,
                palette: art.palette,
                complexity: art.complexity,
                created_at: stored,
                updated_at: stored,
            })
        })
        .await
    }

    async fn find_all(&self) -> Result<Vec<ArtRecord>> {
        self.with_conn(|conn| {
            let mut stmt = conn
                .prepare(&format!("{SELECT_COLUMNS} ORDER BY created_at DESC, id DESC"))
                .context("Failed to prepare artwork listing")?;
            let records = stmt
                .query_map([], map_row)?
                .collect::<rusqlite::Result<Vec<_>>>()
                .context("Failed to read artworks")?;
            Ok(records)
        })
        .await
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<ArtRecord>> {
        self.with_conn(move |conn| {
            conn.query_row(&format!("{SELECT_COLUMNS} WHERE id = ?1"), params![id], map_row)
                .optional()
                .with_context(|| format!("Failed to read artwork {id}"))
        })
        .await
    }

    async fn delete_by_id(&self, id: i64) -> Result<bool> {
        self.with_conn(move |conn| {
            let removed = conn
                .execute("DELETE FROM arts WHERE id = ?1", params![id])
                .with_context(|| format!("Failed to delete artwork {id}"))?;
            Ok(removed > 0)
        })
        .await
    }
}

fn map_row(row: &Row<'_>) -> rusqlite::Result<ArtRecord> {
    Ok(ArtRecord {
        id: row.get(0)?,
        data: row.get(1)?,
        title: row.get(2)?,
        palette: row.get(3)?,
        complexity: row.get(4)?,
        created_at: timestamp_column(row, 5)?,
        updated_at: timestamp_column(row, 6)?,
    })
}

fn timestamp_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    parse_timestamp(&raw).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

/// Fixed-width RFC 3339 with milliseconds, so text order is time order.
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn parse_timestamp(raw: &str) -> std::result::Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(raw).map(|ts| ts.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn store() -> Result<SqliteArtStore> {
        let store = SqliteArtStore::open_in_memory()?;
        store.migrate().await?;
        Ok(store)
    }

    fn new_art(data: &str, title: Option<&str>) -> NewArt {
        NewArt {
            data: data.to_string(),
            title: title.map(str::to_string),
            ..NewArt::default()
        }
    }

    #[tokio::test]
    async fn test_insert_assigns_id_and_timestamps() -> Result<()> {
        let store = store().await?;
        let art = store
            .insert(NewArt {
                data: "data:image/png;base64,AAAA".to_string(),
                title: Some("Tide".to_string()),
                palette: Some("Ocean Breeze".to_string()),
                complexity: Some(15),
            })
            .await?;

        assert_eq!(art.id, 1);
        assert_eq!(art.created_at, art.updated_at);

        let fetched = store.find_by_id(art.id).await?;
        assert_eq!(fetched, Some(art));
        Ok(())
    }

    #[tokio::test]
    async fn test_find_all_lists_newest_first() -> Result<()> {
        let store = store().await?;
        let a = store.insert(new_art("a", Some("A"))).await?;
        let b = store.insert(new_art("b", Some("B"))).await?;

        let ids: Vec<i64> = store.find_all().await?.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![b.id, a.id]);
        Ok(())
    }

    #[tokio::test]
    async fn test_delete_reports_whether_row_existed() -> Result<()> {
        let store = store().await?;
        let art = store.insert(new_art("x", None)).await?;

        assert!(store.delete_by_id(art.id).await?);
        assert!(!store.delete_by_id(art.id).await?);
        assert_eq!(store.find_by_id(art.id).await?, None);
        Ok(())
    }

    #[tokio::test]
    async fn test_ids_are_not_reused_after_delete() -> Result<()> {
        let store = store().await?;
        let first = store.insert(new_art("x", None)).await?;
        store.delete_by_id(first.id).await?;
        let second = store.insert(new_art("y", None)).await?;
        assert!(second.id > first.id);
        Ok(())
    }

    #[test]
    fn test_open_fails_when_directory_is_missing() {
        let path = std::env::temp_dir()
            .join("dreamscapes-missing-dir")
            .join("nested")
            .join("database.sqlite");
        assert!(SqliteArtStore::open(&path).is_err());
    }

    #[test]
    fn test_timestamp_format_is_fixed_width() {
        let ts = DateTime::parse_from_rfc3339("2024-03-01T08:05:09Z")
            .map(|t| t.with_timezone(&Utc))
            .unwrap();
        assert_eq!(format_timestamp(&ts), "2024-03-01T08:05:09.000Z");
    }
}
