//! Domain models for the library cache
//!
//! Every catalog entity carries a stable local `id` (UUID v4) that survives
//! updates and a `remote_id` assigned by the media server. Remote identity is
//! scoped to a [`Source`].

use crate::genre;
use bridge_traits::ServerKind;
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row};
use uuid::Uuid;

fn new_id() -> String {
    Uuid::new_v4().to_string()
}

/// Normalize a name for case-insensitive matching (trimmed, lowercased)
pub fn normalize_name(s: &str) -> String {
    s.trim().to_lowercase()
}

fn decode_server_kind(row: &SqliteRow, column: &str) -> sqlx::Result<ServerKind> {
    let raw: String = row.try_get(column)?;
    raw.parse().map_err(|e| sqlx::Error::ColumnDecode {
        index: column.to_string(),
        source: Box::new(e),
    })
}

// =============================================================================
// Source
// =============================================================================

/// A configured media server account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    pub id: String,
    pub display_name: String,
    pub server_kind: ServerKind,
    pub base_url: String,
    /// Server-side user the catalog is read as
    pub user_id: Option<String>,
    /// Exactly one Source is active at a time
    pub is_active: bool,
    /// Last successful full sync (unix seconds)
    pub last_synced_at: Option<i64>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Source {
    pub fn new(
        display_name: impl Into<String>,
        server_kind: ServerKind,
        base_url: impl Into<String>,
        now: i64,
    ) -> Self {
        Self {
            id: new_id(),
            display_name: display_name.into(),
            server_kind,
            base_url: base_url.into(),
            user_id: None,
            is_active: false,
            last_synced_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Validate source data
    pub fn validate(&self) -> Result<(), String> {
        if self.display_name.trim().is_empty() {
            return Err("Source display name cannot be empty".to_string());
        }

        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(format!("Source base URL must be http(s): {}", self.base_url));
        }

        Ok(())
    }
}

impl<'r> FromRow<'r, SqliteRow> for Source {
    fn from_row(row: &'r SqliteRow) -> sqlx::Result<Self> {
        Ok(Self {
            id: row.try_get("id")?,
            display_name: row.try_get("display_name")?,
            server_kind: decode_server_kind(row, "server_kind")?,
            base_url: row.try_get("base_url")?,
            user_id: row.try_get("user_id")?,
            is_active: row.try_get("is_active")?,
            last_synced_at: row.try_get("last_synced_at")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

// =============================================================================
// Catalog entities
// =============================================================================

/// Artist; `remote_id == None` marks a placeholder awaiting a full sync
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Artist {
    pub id: String,
    pub source_id: String,
    pub remote_id: Option<String>,
    pub name: String,
    /// Normalized name for case-insensitive linkage
    pub normalized_name: String,
    pub sort_name: Option<String>,
    /// Primary image reference
    pub image_tag: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Artist {
    pub fn new(source_id: &str, remote_id: &str, name: &str, now: i64) -> Self {
        Self {
            id: new_id(),
            source_id: source_id.to_string(),
            remote_id: Some(remote_id.to_string()),
            name: name.to_string(),
            normalized_name: normalize_name(name),
            sort_name: None,
            image_tag: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Artist known only by name, referenced before its remote record was seen
    pub fn placeholder(source_id: &str, name: &str, now: i64) -> Self {
        Self {
            remote_id: None,
            ..Self::new(source_id, "", name, now)
        }
    }

    pub fn is_placeholder(&self) -> bool {
        self.remote_id.as_deref().map_or(true, str::is_empty)
    }

    /// Validate artist data
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("Artist name cannot be empty".to_string());
        }

        Ok(())
    }
}

/// Album with a weak reference to its owning artist
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Album {
    pub id: String,
    pub source_id: String,
    pub remote_id: String,
    pub title: String,
    pub normalized_title: String,
    pub sort_title: Option<String>,
    pub production_year: Option<i32>,
    pub image_tag: Option<String>,
    pub artist_id: Option<String>,
    /// Album artist name as last reported by the server
    pub artist_name: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Album {
    pub fn new(source_id: &str, remote_id: &str, title: &str, now: i64) -> Self {
        Self {
            id: new_id(),
            source_id: source_id.to_string(),
            remote_id: remote_id.to_string(),
            title: title.to_string(),
            normalized_title: normalize_name(title),
            sort_title: None,
            production_year: None,
            image_tag: None,
            artist_id: None,
            artist_name: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Validate album data
    pub fn validate(&self) -> Result<(), String> {
        if self.remote_id.trim().is_empty() {
            return Err("Album remote id cannot be empty".to_string());
        }

        if let Some(year) = self.production_year {
            if !(0..=9999).contains(&year) {
                return Err(format!("Album year {} is out of valid range", year));
            }
        }

        Ok(())
    }
}

/// Genre keyed by its normalized name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Genre {
    pub id: String,
    pub source_id: String,
    /// Display spelling as first seen on the server
    pub raw_name: String,
    pub normalized_name: String,
    pub umbrella_name: String,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Genre {
    pub fn new(source_id: &str, raw_name: &str, normalized_name: &str, now: i64) -> Self {
        Self {
            id: new_id(),
            source_id: source_id.to_string(),
            raw_name: raw_name.to_string(),
            normalized_name: normalized_name.to_string(),
            umbrella_name: genre::resolve(normalized_name).to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    /// The synthetic genre assigned to tracks without any
    pub fn unknown(source_id: &str, now: i64) -> Self {
        Self::new(source_id, genre::UNKNOWN, genre::UNKNOWN_KEY, now)
    }

    pub fn is_unknown(&self) -> bool {
        self.normalized_name == genre::UNKNOWN_KEY
    }
}

/// Track with denormalized genre lists
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Track {
    pub id: String,
    pub source_id: String,
    pub remote_id: String,
    pub title: String,
    pub normalized_title: String,
    /// Duration in seconds; 0 when the server reported nothing usable
    pub duration_secs: f64,
    pub track_number: Option<i32>,
    pub disc_number: Option<i32>,
    /// When the track was added on the server (unix seconds)
    pub date_added: Option<i64>,
    pub play_count: i64,
    pub is_liked: bool,
    pub container: Option<String>,
    pub album_id: Option<String>,
    pub artist_id: Option<String>,
    #[sqlx(json)]
    pub raw_genres: Vec<String>,
    #[sqlx(json)]
    pub normalized_genres: Vec<String>,
    #[sqlx(json)]
    pub umbrella_genres: Vec<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Track {
    pub fn new(source_id: &str, remote_id: &str, title: &str, now: i64) -> Self {
        let unknown = genre::classify_genres::<&str>(&[]);
        Self {
            id: new_id(),
            source_id: source_id.to_string(),
            remote_id: remote_id.to_string(),
            title: title.to_string(),
            normalized_title: normalize_name(title),
            duration_secs: 0.0,
            track_number: None,
            disc_number: None,
            date_added: None,
            play_count: 0,
            is_liked: false,
            container: None,
            album_id: None,
            artist_id: None,
            raw_genres: unknown.raw,
            normalized_genres: unknown.normalized,
            umbrella_genres: unknown.umbrella,
            created_at: now,
            updated_at: now,
        }
    }

    /// Validate track data
    pub fn validate(&self) -> Result<(), String> {
        if self.remote_id.trim().is_empty() {
            return Err("Track remote id cannot be empty".to_string());
        }

        if !self.duration_secs.is_finite() || self.duration_secs < 0.0 {
            return Err(format!("Track duration {} is invalid", self.duration_secs));
        }

        if self.normalized_genres.is_empty() {
            return Err("Track must belong to at least one genre".to_string());
        }

        Ok(())
    }
}

/// Remote playlist mirrored into the cache
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Playlist {
    pub id: String,
    pub source_id: String,
    pub remote_id: String,
    /// Server flavour the playlist belongs to
    pub origin: ServerKind,
    pub name: String,
    pub summary: Option<String>,
    pub owner_id: Option<String>,
    /// File-backed playlists cannot be edited from the client
    pub is_read_only: bool,
    pub path: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Playlist {
    pub fn new(source_id: &str, remote_id: &str, origin: ServerKind, name: &str, now: i64) -> Self {
        Self {
            id: new_id(),
            source_id: source_id.to_string(),
            remote_id: remote_id.to_string(),
            origin,
            name: name.to_string(),
            summary: None,
            owner_id: None,
            is_read_only: false,
            path: None,
            created_at: now,
            updated_at: now,
        }
    }
}

impl<'r> FromRow<'r, SqliteRow> for Playlist {
    fn from_row(row: &'r SqliteRow) -> sqlx::Result<Self> {
        Ok(Self {
            id: row.try_get("id")?,
            source_id: row.try_get("source_id")?,
            remote_id: row.try_get("remote_id")?,
            origin: decode_server_kind(row, "origin")?,
            name: row.try_get("name")?,
            summary: row.try_get("summary")?,
            owner_id: row.try_get("owner_id")?,
            is_read_only: row.try_get("is_read_only")?,
            path: row.try_get("path")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placeholder_artist() {
        let artist = Artist::placeholder("src-1", "  Nina Simone ", 10);
        assert!(artist.is_placeholder());
        assert_eq!(artist.normalized_name, "nina simone");

        let resolved = Artist::new("src-1", "ar-9", "Nina Simone", 10);
        assert!(!resolved.is_placeholder());
        assert_ne!(artist.id, resolved.id);
    }

    #[test]
    fn test_new_track_defaults_to_unknown_genre() {
        let track = Track::new("src-1", "t-1", "Intro", 10);
        assert_eq!(track.raw_genres, vec!["Unknown"]);
        assert_eq!(track.normalized_genres, vec!["unknown"]);
        assert_eq!(track.umbrella_genres, vec!["Unknown"]);
        assert!(track.validate().is_ok());
    }

    #[test]
    fn test_track_validation_rejects_bad_duration() {
        let mut track = Track::new("src-1", "t-1", "Intro", 10);
        track.duration_secs = f64::NAN;
        assert!(track.validate().is_err());
    }

    #[test]
    fn test_genre_resolves_umbrella() {
        let genre = Genre::new("src-1", "Alternative Rock", "alternative rock", 10);
        assert_eq!(genre.umbrella_name, "Rock");
        assert!(Genre::unknown("src-1", 10).is_unknown());
    }

    #[test]
    fn test_source_validation() {
        let source = Source::new("Home", ServerKind::Jellyfin, "https://media.local", 10);
        assert!(source.validate().is_ok());

        let bad = Source::new("Home", ServerKind::Emby, "media.local", 10);
        assert!(bad.validate().is_err());
    }
}
