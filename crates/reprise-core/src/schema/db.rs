use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use rusqlite::Connection;

use crate::error::Result;
use crate::model::IndexedTrack;

use super::migrations::MIGRATIONS;

/// The library index: a SQLite database with CRUD methods for indexed
/// tracks and the artist-tag cache.
#[derive(Debug)]
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open (or create) a database at the given path and apply migrations.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path)?;
        let db = Self { conn };
        db.apply_migrations()?;
        Ok(db)
    }

    /// Open an in-memory database (for tests).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.apply_migrations()?;
        Ok(db)
    }

    /// Get a reference to the underlying connection (for advanced queries).
    #[must_use]
    pub const fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Start a transaction covering subsequent statements on this
    /// connection. Reconciliation commits a whole pass as a unit through
    /// this.
    pub fn transaction(&self) -> Result<rusqlite::Transaction<'_>> {
        Ok(self.conn.unchecked_transaction()?)
    }

    fn apply_migrations(&self) -> Result<()> {
        // Create migrations table if it doesn't exist
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS schema_migrations (
                version INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                applied_at TEXT NOT NULL DEFAULT (datetime('now'))
            )",
            [],
        )?;

        let mut stmt = self
            .conn
            .prepare("SELECT version FROM schema_migrations ORDER BY version")?;
        let applied: Vec<u32> = stmt
            .query_map([], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        for migration in MIGRATIONS {
            if !applied.contains(&migration.version) {
                log::info!(
                    "Applying migration {} ({})",
                    migration.version,
                    migration.name
                );
                self.conn.execute_batch(migration.sql)?;
                self.conn.execute(
                    "INSERT INTO schema_migrations (version, name) VALUES (?1, ?2)",
                    rusqlite::params![migration.version, migration.name],
                )?;
            }
        }

        Ok(())
    }
}

// Track CRUD
impl Database {
    /// Total number of indexed tracks.
    pub fn track_count(&self) -> Result<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM tracks", [], |row| row.get(0))?;
        Ok(count.max(0) as u64)
    }

    /// Every indexed path.
    pub fn all_paths(&self) -> Result<HashSet<String>> {
        let mut stmt = self.conn.prepare("SELECT path FROM tracks")?;
        let paths = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<HashSet<_>>>()?;
        Ok(paths)
    }

    /// Map of indexed path to stored modification fingerprint.
    pub fn indexed_mtimes(&self) -> Result<HashMap<String, DateTime<Utc>>> {
        let mut stmt = self.conn.prepare("SELECT path, modified_at FROM tracks")?;
        let rows = stmt
            .query_map([], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, DateTime<Utc>>(1)?))
            })?
            .collect::<rusqlite::Result<HashMap<_, _>>>()?;
        Ok(rows)
    }

    /// Every indexed track, for linear match scans.
    pub fn all_tracks(&self) -> Result<Vec<IndexedTrack>> {
        let mut stmt = self.conn.prepare(
            "SELECT path, artist, artist_norm, title, title_norm, modified_at FROM tracks",
        )?;
        let tracks = stmt
            .query_map([], row_to_track)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(tracks)
    }

    /// Insert or replace a track by path, rewriting the normalized fields
    /// together with the display strings.
    pub fn upsert_track(&self, track: &IndexedTrack) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO tracks
                (path, artist, artist_norm, title, title_norm, modified_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            rusqlite::params![
                track.path.to_string_lossy().as_ref(),
                track.artist,
                track.artist_norm,
                track.title,
                track.title_norm,
                track.modified_at,
            ],
        )?;
        Ok(())
    }

    /// Delete rows for files that no longer exist on disk.
    pub fn delete_paths(&self, paths: &HashSet<String>) -> Result<usize> {
        let mut deleted = 0;
        let mut stmt = self.conn.prepare("DELETE FROM tracks WHERE path = ?1")?;
        for path in paths {
            deleted += stmt.execute([path])?;
        }
        Ok(deleted)
    }

    /// Distinct (artist_norm, artist) pairs with a non-empty canonical form.
    pub fn unique_artists(&self) -> Result<Vec<(String, String)>> {
        let mut stmt = self
            .conn
            .prepare("SELECT DISTINCT artist_norm, artist FROM tracks WHERE artist_norm != ''")?;
        let artists = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(artists)
    }

    /// All tracks belonging to any of the given normalized artists.
    pub fn tracks_by_artist_norms(&self, artist_norms: &[String]) -> Result<Vec<IndexedTrack>> {
        let mut tracks = Vec::new();
        let mut stmt = self.conn.prepare(
            "SELECT path, artist, artist_norm, title, title_norm, modified_at
             FROM tracks WHERE artist_norm = ?1",
        )?;
        for norm in artist_norms {
            let rows = stmt
                .query_map([norm], row_to_track)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            tracks.extend(rows);
        }
        Ok(tracks)
    }
}

// Artist-tag cache
impl Database {
    /// Cached tags for a normalized artist, or `None` if never fetched.
    pub fn artist_tags(&self, artist_norm: &str) -> Result<Option<Vec<String>>> {
        let mut stmt = self
            .conn
            .prepare("SELECT tags FROM artist_tags WHERE artist_norm = ?1")?;
        let mut rows = stmt.query([artist_norm])?;
        match rows.next()? {
            Some(row) => {
                let raw: String = row.get(0)?;
                Ok(Some(serde_json::from_str(&raw)?))
            }
            None => Ok(None),
        }
    }

    /// Cache tags for an artist. An empty list marks the artist as
    /// "attempted, nothing found" so it is not re-fetched.
    pub fn set_artist_tags(&self, artist_norm: &str, artist: &str, tags: &[String]) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO artist_tags (artist_norm, artist, tags, fetched_at)
             VALUES (?1, ?2, ?3, ?4)",
            rusqlite::params![artist_norm, artist, serde_json::to_string(tags)?, Utc::now()],
        )?;
        Ok(())
    }

    /// The whole cache, keyed by normalized artist.
    pub fn all_artist_tags(&self) -> Result<HashMap<String, Vec<String>>> {
        let mut stmt = self.conn.prepare("SELECT artist_norm, tags FROM artist_tags")?;
        let mut out = HashMap::new();
        let mut rows = stmt.query([])?;
        while let Some(row) = rows.next()? {
            let norm: String = row.get(0)?;
            let raw: String = row.get(1)?;
            out.insert(norm, serde_json::from_str(&raw)?);
        }
        Ok(out)
    }

    /// Normalized artists carrying the given tag (case-insensitive).
    pub fn artists_with_tag(&self, tag: &str) -> Result<Vec<String>> {
        let tag_lower = tag.to_lowercase();
        let all = self.all_artist_tags()?;
        let mut matching: Vec<String> = all
            .into_iter()
            .filter(|(_, tags)| tags.iter().any(|t| t.to_lowercase() == tag_lower))
            .map(|(norm, _)| norm)
            .collect();
        matching.sort();
        Ok(matching)
    }
}

fn row_to_track(row: &rusqlite::Row) -> rusqlite::Result<IndexedTrack> {
    let path: String = row.get(0)?;
    Ok(IndexedTrack {
        path: PathBuf::from(path),
        artist: row.get(1)?,
        artist_norm: row.get(2)?,
        title: row.get(3)?,
        title_norm: row.get(4)?,
        modified_at: row.get(5)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::Normalizer;

    fn track(db_normalizer: &Normalizer, path: &str, artist: &str, title: &str) -> IndexedTrack {
        IndexedTrack::new(path, artist, title, Utc::now(), db_normalizer)
    }

    #[test]
    fn test_database_open_in_memory() {
        let db = Database::open_in_memory().unwrap();
        let count: i64 = db
            .conn()
            .query_row("SELECT COUNT(*) FROM schema_migrations", [], |row| {
                row.get(0)
            })
            .unwrap();
        assert_eq!(count, 1); // One migration applied
    }

    #[test]
    fn test_track_round_trip() {
        let db = Database::open_in_memory().unwrap();
        let n = Normalizer::default();

        db.upsert_track(&track(&n, "/music/a.mp3", "Daft Punk", "One More Time"))
            .unwrap();

        let tracks = db.all_tracks().unwrap();
        assert_eq!(tracks.len(), 1);
        assert_eq!(tracks[0].artist, "Daft Punk");
        assert_eq!(tracks[0].artist_norm, "daft punk");
        assert_eq!(tracks[0].title_norm, "one more time");
        assert_eq!(db.track_count().unwrap(), 1);
    }

    #[test]
    fn test_upsert_replaces_by_path_and_recomputes_norms() {
        let db = Database::open_in_memory().unwrap();
        let n = Normalizer::default();

        db.upsert_track(&track(&n, "/music/a.mp3", "Unknown", "a"))
            .unwrap();
        db.upsert_track(&track(&n, "/music/a.mp3", "Café Tacvba", "Eres (Remaster)"))
            .unwrap();

        let tracks = db.all_tracks().unwrap();
        assert_eq!(tracks.len(), 1);
        assert_eq!(tracks[0].artist_norm, "cafe tacvba");
        assert_eq!(tracks[0].title_norm, "eres");
    }

    #[test]
    fn test_delete_paths() {
        let db = Database::open_in_memory().unwrap();
        let n = Normalizer::default();

        db.upsert_track(&track(&n, "/music/a.mp3", "A", "One")).unwrap();
        db.upsert_track(&track(&n, "/music/b.mp3", "B", "Two")).unwrap();

        let gone: HashSet<String> = ["/music/a.mp3".to_string()].into_iter().collect();
        assert_eq!(db.delete_paths(&gone).unwrap(), 1);
        assert_eq!(db.track_count().unwrap(), 1);
        assert!(db.all_paths().unwrap().contains("/music/b.mp3"));
    }

    #[test]
    fn test_unique_artists_skips_empty_norm() {
        let db = Database::open_in_memory().unwrap();
        let n = Normalizer::default();

        db.upsert_track(&track(&n, "/music/a.mp3", "Daft Punk", "One")).unwrap();
        db.upsert_track(&track(&n, "/music/b.mp3", "Daft Punk", "Two")).unwrap();
        db.upsert_track(&track(&n, "/music/c.mp3", "", "Three")).unwrap();

        let artists = db.unique_artists().unwrap();
        assert_eq!(artists.len(), 1);
        assert_eq!(artists[0].0, "daft punk");
    }

    #[test]
    fn test_artist_tags_round_trip() {
        let db = Database::open_in_memory().unwrap();

        assert!(db.artist_tags("daft punk").unwrap().is_none());

        let tags = vec!["electronic".to_string(), "house".to_string()];
        db.set_artist_tags("daft punk", "Daft Punk", &tags).unwrap();

        assert_eq!(db.artist_tags("daft punk").unwrap(), Some(tags));

        // Empty list means "attempted", which is distinct from never fetched.
        db.set_artist_tags("obscure", "Obscure", &[]).unwrap();
        assert_eq!(db.artist_tags("obscure").unwrap(), Some(vec![]));
    }

    #[test]
    fn test_artists_with_tag_is_case_insensitive() {
        let db = Database::open_in_memory().unwrap();
        db.set_artist_tags("daft punk", "Daft Punk", &["Electronic".to_string()])
            .unwrap();
        db.set_artist_tags("bob dylan", "Bob Dylan", &["folk".to_string()])
            .unwrap();

        assert_eq!(db.artists_with_tag("electronic").unwrap(), vec!["daft punk"]);
        assert!(db.artists_with_tag("metal").unwrap().is_empty());
    }

    #[test]
    fn test_tracks_by_artist_norms() {
        let db = Database::open_in_memory().unwrap();
        let n = Normalizer::default();

        db.upsert_track(&track(&n, "/music/a.mp3", "Daft Punk", "One")).unwrap();
        db.upsert_track(&track(&n, "/music/b.mp3", "Bob Dylan", "Two")).unwrap();

        let tracks = db
            .tracks_by_artist_norms(&["daft punk".to_string()])
            .unwrap();
        assert_eq!(tracks.len(), 1);
        assert_eq!(tracks[0].title, "One");

        assert!(db.tracks_by_artist_norms(&[]).unwrap().is_empty());
    }
}
