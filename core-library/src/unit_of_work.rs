//! Transactional write context for sync runs
//!
//! A [`LibraryTransaction`] wraps one SQLite transaction. Every write made by a
//! full or incremental sync goes through it, so a run either lands completely
//! on `commit` or not at all. Dropping it without committing rolls back.
//!
//! Transactions start with `BEGIN IMMEDIATE`: the write lock is taken up front,
//! so a second writer waits out the connection's busy timeout instead of
//! failing when it upgrades from a read snapshot another run has committed past.

use crate::error::Result;
use crate::models::{Album, Artist, Genre, Playlist, Source, Track};
use crate::repositories::{album, artist, genre, playlist, source, track};
use bridge_traits::ServerKind;
use sqlx::{Sqlite, SqlitePool, Transaction};
use tracing::debug;

pub struct LibraryTransaction {
    tx: Transaction<'static, Sqlite>,
}

impl LibraryTransaction {
    /// Begin a write transaction on a pooled connection.
    pub async fn begin(pool: &SqlitePool) -> Result<Self> {
        let tx = pool.begin_with("BEGIN IMMEDIATE").await?;
        Ok(Self { tx })
    }

    pub async fn commit(self) -> Result<()> {
        self.tx.commit().await?;
        debug!("Library transaction committed");
        Ok(())
    }

    pub async fn rollback(self) -> Result<()> {
        self.tx.rollback().await?;
        debug!("Library transaction rolled back");
        Ok(())
    }

    pub async fn source(&mut self, source_id: &str) -> Result<Option<Source>> {
        source::find(&mut self.tx, source_id).await
    }

    /// Stamp the completion time of a full sync.
    pub async fn mark_source_synced(&mut self, source_id: &str, at: i64) -> Result<()> {
        source::mark_synced(&mut self.tx, source_id, at).await
    }

    // Artists

    pub async fn artists(&mut self, source_id: &str) -> Result<Vec<Artist>> {
        artist::list_for_source(&mut self.tx, source_id).await
    }

    pub async fn upsert_artist(&mut self, artist: &Artist) -> Result<()> {
        artist::upsert(&mut self.tx, artist).await
    }

    pub async fn delete_artists(&mut self, ids: &[String]) -> Result<u64> {
        artist::delete_many(&mut self.tx, ids).await
    }

    // Albums

    pub async fn albums(&mut self, source_id: &str) -> Result<Vec<Album>> {
        album::list_for_source(&mut self.tx, source_id).await
    }

    pub async fn albums_by_remote_ids(
        &mut self,
        source_id: &str,
        remote_ids: &[String],
    ) -> Result<Vec<Album>> {
        album::find_by_remote_ids(&mut self.tx, source_id, remote_ids).await
    }

    pub async fn upsert_album(&mut self, album: &Album) -> Result<()> {
        album::upsert(&mut self.tx, album).await
    }

    pub async fn delete_albums(&mut self, ids: &[String]) -> Result<u64> {
        album::delete_many(&mut self.tx, ids).await
    }

    // Genres

    pub async fn genres(&mut self, source_id: &str) -> Result<Vec<Genre>> {
        genre::list_for_source(&mut self.tx, source_id).await
    }

    pub async fn upsert_genre(&mut self, genre: &Genre) -> Result<()> {
        genre::upsert(&mut self.tx, genre).await
    }

    /// Prune genres without tracks; the Unknown genre is never pruned.
    pub async fn delete_unreferenced_genres(&mut self, source_id: &str) -> Result<u64> {
        genre::delete_unreferenced(&mut self.tx, source_id).await
    }

    // Tracks

    pub async fn tracks(&mut self, source_id: &str) -> Result<Vec<Track>> {
        track::list_for_source(&mut self.tx, source_id).await
    }

    pub async fn tracks_by_remote_ids(
        &mut self,
        source_id: &str,
        remote_ids: &[String],
    ) -> Result<Vec<Track>> {
        track::find_by_remote_ids(&mut self.tx, source_id, remote_ids).await
    }

    pub async fn upsert_track(&mut self, track: &Track) -> Result<()> {
        track::upsert(&mut self.tx, track).await
    }

    pub async fn replace_track_genres(&mut self, track_id: &str, genre_ids: &[String]) -> Result<()> {
        track::replace_genres(&mut self.tx, track_id, genre_ids).await
    }

    pub async fn delete_tracks(&mut self, ids: &[String]) -> Result<u64> {
        track::delete_many(&mut self.tx, ids).await
    }

    // Playlists

    pub async fn playlists(&mut self, source_id: &str, origin: ServerKind) -> Result<Vec<Playlist>> {
        playlist::list_for_origin(&mut self.tx, source_id, origin).await
    }

    pub async fn upsert_playlist(&mut self, playlist: &Playlist) -> Result<()> {
        playlist::upsert(&mut self.tx, playlist).await
    }

    pub async fn replace_playlist_tracks(
        &mut self,
        playlist_id: &str,
        track_ids: &[String],
    ) -> Result<()> {
        playlist::replace_tracks(&mut self.tx, playlist_id, track_ids).await
    }

    pub async fn delete_playlists(&mut self, ids: &[String]) -> Result<u64> {
        playlist::delete_many(&mut self.tx, ids).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, insert_test_source};
    use crate::repositories::{ArtistRepository, SqliteArtistRepository};

    #[tokio::test]
    async fn test_commit_persists_writes() {
        let pool = create_test_pool().await.unwrap();
        let source = insert_test_source(&pool, ServerKind::Jellyfin).await.unwrap();

        let mut tx = LibraryTransaction::begin(&pool).await.unwrap();
        let artist = Artist::new(&source.id, "ar-1", "Portishead", 10);
        tx.upsert_artist(&artist).await.unwrap();
        assert_eq!(tx.artists(&source.id).await.unwrap().len(), 1);
        tx.mark_source_synced(&source.id, 99).await.unwrap();
        tx.commit().await.unwrap();

        let repo = SqliteArtistRepository::new(pool.clone());
        assert_eq!(repo.count(&source.id).await.unwrap(), 1);

        let mut tx = LibraryTransaction::begin(&pool).await.unwrap();
        let stored = tx.source(&source.id).await.unwrap().unwrap();
        assert_eq!(stored.last_synced_at, Some(99));
        tx.rollback().await.unwrap();
    }

    #[tokio::test]
    async fn test_dropped_transaction_rolls_back() {
        let pool = create_test_pool().await.unwrap();
        let source = insert_test_source(&pool, ServerKind::Jellyfin).await.unwrap();

        {
            let mut tx = LibraryTransaction::begin(&pool).await.unwrap();
            tx.upsert_genre(&Genre::unknown(&source.id, 10))
                .await
                .unwrap();
            tx.upsert_track(&Track::new(&source.id, "t-1", "Glory Box", 10))
                .await
                .unwrap();
        }

        let mut tx = LibraryTransaction::begin(&pool).await.unwrap();
        assert!(tx.tracks(&source.id).await.unwrap().is_empty());
        assert!(tx.genres(&source.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failed_write_then_rollback_keeps_previous_state() {
        let pool = create_test_pool().await.unwrap();
        let source = insert_test_source(&pool, ServerKind::Emby).await.unwrap();

        let mut tx = LibraryTransaction::begin(&pool).await.unwrap();
        tx.upsert_album(&Album::new(&source.id, "al-1", "Dummy", 10))
            .await
            .unwrap();
        let invalid = Album::new(&source.id, "", "Broken", 10);
        assert!(tx.upsert_album(&invalid).await.is_err());
        tx.rollback().await.unwrap();

        let mut tx = LibraryTransaction::begin(&pool).await.unwrap();
        assert!(tx.albums(&source.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_second_writer_waits_for_first_commit() {
        let dir = tempfile::tempdir().unwrap();
        let pool = crate::db::create_pool(crate::db::DatabaseConfig::new(dir.path().join("cache.db")))
            .await
            .unwrap();
        let first_source = insert_test_source(&pool, ServerKind::Jellyfin).await.unwrap();
        let second_source = insert_test_source(&pool, ServerKind::Emby).await.unwrap();

        let mut first = LibraryTransaction::begin(&pool).await.unwrap();
        first.artists(&first_source.id).await.unwrap();
        first
            .upsert_artist(&Artist::new(&first_source.id, "ar-1", "Air", 10))
            .await
            .unwrap();

        let writer_pool = pool.clone();
        let writer_source = second_source.id.clone();
        let second = tokio::spawn(async move {
            let mut tx = LibraryTransaction::begin(&writer_pool).await?;
            tx.artists(&writer_source).await?;
            tx.upsert_artist(&Artist::new(&writer_source, "ar-1", "Moloko", 10))
                .await?;
            tx.commit().await
        });

        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        first.commit().await.unwrap();
        second.await.unwrap().unwrap();

        let repo = SqliteArtistRepository::new(pool.clone());
        assert_eq!(repo.count(&first_source.id).await.unwrap(), 1);
        assert_eq!(repo.count(&second_source.id).await.unwrap(), 1);
    }
}
