//! # Repository Pattern Implementation
//!
//! Read-side repositories for the UI context plus the connection-level
//! statements used by [`LibraryTransaction`](crate::LibraryTransaction).
//!
//! ## Architecture
//!
//! - Traits define the read interface for each entity, scoped to a source
//! - SQLite implementations hold a `SqlitePool` and never write catalog rows
//! - Writes are free functions over `&mut SqliteConnection`, so a sync run can
//!   chain them inside one transaction
//! - Pagination is supported via the `Page<T>` wrapper
//!
//! ## Available Repositories
//!
//! - `SourceRepository` - Media server accounts and the active flag
//! - `ArtistRepository` - Artists, including unresolved placeholders
//! - `AlbumRepository` - Albums with their weak artist link
//! - `GenreRepository` - Normalized genres and umbrella categories
//! - `TrackRepository` - Tracks with genre associations
//! - `PlaylistRepository` - Mirrored playlists and their ordered membership

pub mod album;
pub mod artist;
pub mod genre;
pub mod pagination;
pub mod playlist;
pub mod source;
pub mod track;

pub use album::{AlbumRepository, SqliteAlbumRepository};
pub use artist::{ArtistRepository, SqliteArtistRepository};
pub use genre::{GenreRepository, SqliteGenreRepository};
pub use pagination::{Page, PageRequest};
pub use playlist::{PlaylistRepository, SqlitePlaylistRepository};
pub use source::{SourceRepository, SqliteSourceRepository};
pub use track::{SqliteTrackRepository, TrackRepository};

use crate::error::Result;
use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, QueryBuilder, Sqlite, SqliteConnection};

/// Upper bound on bound parameters per `IN (...)` statement
const MAX_BIND_CHUNK: usize = 500;

/// Delete rows of `table` by local id, chunked to stay under SQLite's
/// parameter limit.
pub(crate) async fn delete_by_ids(
    conn: &mut SqliteConnection,
    table: &'static str,
    ids: &[String],
) -> Result<u64> {
    let mut deleted = 0;

    for chunk in ids.chunks(MAX_BIND_CHUNK) {
        let mut builder = QueryBuilder::<Sqlite>::new(format!("DELETE FROM {} WHERE id IN (", table));
        let mut separated = builder.separated(", ");
        for id in chunk {
            separated.push_bind(id);
        }
        separated.push_unseparated(")");

        deleted += builder.build().execute(&mut *conn).await?.rows_affected();
    }

    Ok(deleted)
}

/// Load rows of `table` belonging to `source_id` whose remote id is in `remote_ids`.
pub(crate) async fn fetch_by_remote_ids<T>(
    conn: &mut SqliteConnection,
    table: &'static str,
    source_id: &str,
    remote_ids: &[String],
) -> Result<Vec<T>>
where
    T: for<'r> FromRow<'r, SqliteRow> + Send + Unpin,
{
    let mut rows = Vec::with_capacity(remote_ids.len());

    for chunk in remote_ids.chunks(MAX_BIND_CHUNK) {
        let mut builder = QueryBuilder::<Sqlite>::new(format!("SELECT * FROM {} WHERE source_id = ", table));
        builder.push_bind(source_id);
        builder.push(" AND remote_id IN (");
        let mut separated = builder.separated(", ");
        for remote_id in chunk {
            separated.push_bind(remote_id);
        }
        separated.push_unseparated(")");

        rows.extend(builder.build_query_as::<T>().fetch_all(&mut *conn).await?);
    }

    Ok(rows)
}
