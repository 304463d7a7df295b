//! # Host Bridge Traits
//!
//! Contracts between the library sync core and the collaborators it does not own.
//!
//! ## Traits
//!
//! ### Remote catalog
//! - [`MediaServerClient`](catalog::MediaServerClient) - Authenticated reads of a
//!   Jellyfin/Emby catalog (artists, albums, tracks, playlists)
//!
//! ### Offline storage
//! - [`OfflineCacheCleaner`](downloads::OfflineCacheCleaner) - Drops downloaded audio
//!   for tracks removed by a sync
//!
//! ### Utilities
//! - [`Clock`](time::Clock) - Time source for deterministic testing
//! - [`LoggerSink`](logging::LoggerSink) - Forward structured logs to host logging
//!
//! ## Error Handling
//!
//! All bridge traits use [`BridgeError`](error::BridgeError). Implementations convert
//! transport and platform failures into it and keep messages actionable.
//!
//! ## Thread Safety
//!
//! All bridge traits require `Send + Sync`; the core shares them across Tokio tasks.

pub mod catalog;
pub mod downloads;
pub mod error;
pub mod logging;
pub mod time;

pub use error::BridgeError;

pub use catalog::{
    AlbumRecord, ArtistRecord, ImageTags, ItemsResponse, MediaServerClient, PlaylistRecord,
    ServerKind, TrackRecord, UserItemData,
};
pub use downloads::{OfflineCacheCleaner, RemovedTrack};
pub use logging::{LogEntry, LogLevel, LoggerSink};
pub use time::{Clock, FixedClock, SystemClock};
