/// A schema migration.
#[derive(Debug)]
pub struct Migration {
    pub version: u32,
    pub name: &'static str,
    pub sql: &'static str,
}

const MIGRATION_001: &str = r#"
-- Schema version tracking
CREATE TABLE IF NOT EXISTS schema_migrations (
    version INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    applied_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- Library index: one row per known local audio file, keyed by path.
-- artist_norm/title_norm are derived caches of the canonical forms and are
-- rewritten together with the display strings on every upsert.
CREATE TABLE IF NOT EXISTS tracks (
    path TEXT PRIMARY KEY,
    artist TEXT NOT NULL DEFAULT '',
    artist_norm TEXT NOT NULL DEFAULT '',
    title TEXT NOT NULL DEFAULT '',
    title_norm TEXT NOT NULL DEFAULT '',
    modified_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_tracks_artist_norm ON tracks(artist_norm);

-- Cached Last.fm artist tags for playlist generation, independently keyed
-- and invalidated. tags is a JSON array of strings; an empty array marks an
-- artist whose lookup was attempted but returned nothing.
CREATE TABLE IF NOT EXISTS artist_tags (
    artist_norm TEXT PRIMARY KEY,
    artist TEXT NOT NULL,
    tags TEXT NOT NULL,
    fetched_at TEXT NOT NULL
);
"#;

pub const MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    name: "initial schema",
    sql: MIGRATION_001,
}];
