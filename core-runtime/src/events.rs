//! # Event Bus System
//!
//! Typed event broadcasting for the library sync core using `tokio::sync::broadcast`.
//!
//! ## Overview
//!
//! - **Event Types**: `CoreEvent` wraps per-domain enums (`SyncEvent`, `LibraryEvent`)
//! - **EventBus**: Central broadcast channel for publishing events
//! - **EventStream**: Receiver wrapper with optional filtering
//!
//! ```text
//! ┌──────────────────┐   emit   ┌───────────┐  subscribe  ┌────────────┐
//! │ SyncCoordinator  ├─────────>│ EventBus  ├────────────>│ UI / host  │
//! └──────────────────┘          │ (broadcast│             └────────────┘
//! ┌──────────────────┐   emit   │  channel) │  subscribe  ┌────────────┐
//! │ Orphan cleanup   ├─────────>│           ├────────────>│ Downloads  │
//! └──────────────────┘          └───────────┘             └────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use core_runtime::events::{CoreEvent, EventBus, SyncEvent};
//!
//! let event_bus = EventBus::new(100);
//! let mut subscriber = event_bus.subscribe();
//!
//! event_bus
//!     .emit(CoreEvent::Sync(SyncEvent::Cancelled {
//!         job_id: "job-1".to_string(),
//!         source_id: "jf-home".to_string(),
//!         stage: "Importing tracks".to_string(),
//!     }))
//!     .ok();
//!
//! assert!(subscriber.try_recv().is_ok());
//! ```
//!
//! ## Error Handling
//!
//! - `RecvError::Lagged(n)`: the subscriber missed `n` events and can keep receiving.
//! - `RecvError::Closed`: every sender was dropped; treat it as shutdown.
//!
//! Emitting with no subscribers returns an error that publishers ignore with `.ok()`.

use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast;

pub use tokio::sync::broadcast::error::{RecvError, SendError};
pub use tokio::sync::broadcast::Receiver;

/// Default buffer size for the event bus channel.
///
/// Subscribers that fall further behind receive `RecvError::Lagged`.
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 100;

// ============================================================================
// Core Event Types
// ============================================================================

/// Top-level event enum published through the event bus.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "payload")]
pub enum CoreEvent {
    /// Sync run lifecycle
    Sync(SyncEvent),
    /// Cached library content changes
    Library(LibraryEvent),
}

impl CoreEvent {
    /// Source the event belongs to.
    pub fn source_id(&self) -> &str {
        match self {
            CoreEvent::Sync(e) => e.source_id(),
            CoreEvent::Library(e) => e.source_id(),
        }
    }
}

// ============================================================================
// Sync Events
// ============================================================================

/// Events emitted over the life of a sync run against one Source.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum SyncEvent {
    /// Full sync accepted and running.
    Started {
        job_id: String,
        source_id: String,
    },
    /// Progress update; `percent` never decreases within a run.
    Progress {
        job_id: String,
        source_id: String,
        /// Overall progress (0-100).
        percent: u8,
        /// Human-readable stage label (e.g. "Fetching tracks").
        stage: String,
    },
    /// Catalog import and orphan cleanup committed. Emitted before the
    /// playlist phase starts, so a later playlist failure leaves it standing.
    CatalogSynced {
        job_id: String,
        source_id: String,
        items_added: u64,
        items_updated: u64,
        items_unchanged: u64,
        items_deleted: u64,
    },
    /// Catalog, cleanup and playlists all committed.
    Completed {
        job_id: String,
        source_id: String,
        items_added: u64,
        items_updated: u64,
        items_deleted: u64,
        playlists_synced: u64,
        duration_secs: u64,
    },
    /// Run stopped on an error.
    Failed {
        job_id: String,
        source_id: String,
        message: String,
        /// Stage label active when the failure happened.
        stage: String,
    },
    /// Run stopped at a cancellation checkpoint.
    Cancelled {
        job_id: String,
        source_id: String,
        stage: String,
    },
    /// Playlist reconciliation finished (also emitted for standalone playlist syncs).
    PlaylistsSynced {
        source_id: String,
        upserted: u64,
        deleted: u64,
    },
}

impl SyncEvent {
    fn source_id(&self) -> &str {
        match self {
            SyncEvent::Started { source_id, .. }
            | SyncEvent::Progress { source_id, .. }
            | SyncEvent::CatalogSynced { source_id, .. }
            | SyncEvent::Completed { source_id, .. }
            | SyncEvent::Failed { source_id, .. }
            | SyncEvent::Cancelled { source_id, .. }
            | SyncEvent::PlaylistsSynced { source_id, .. } => source_id,
        }
    }
}

// ============================================================================
// Library Events
// ============================================================================

/// Events describing changes to the cached library.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum LibraryEvent {
    /// Tracks deleted because they vanished from the remote catalog.
    TracksRemoved {
        source_id: String,
        /// Local track ids
        track_ids: Vec<String>,
    },
    /// Placeholder artists created by an incremental sync.
    PlaceholderArtistsCreated {
        source_id: String,
        names: Vec<String>,
    },
    /// A different Source became the active one.
    ActiveSourceChanged { source_id: String },
}

impl LibraryEvent {
    fn source_id(&self) -> &str {
        match self {
            LibraryEvent::TracksRemoved { source_id, .. }
            | LibraryEvent::PlaceholderArtistsCreated { source_id, .. }
            | LibraryEvent::ActiveSourceChanged { source_id } => source_id,
        }
    }
}

// ============================================================================
// Event Bus
// ============================================================================

/// Central broadcast channel. Cheap to clone; clones share the channel.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<CoreEvent>,
}

impl EventBus {
    /// Creates a new event bus with the specified buffer size.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publishes an event to all subscribers.
    ///
    /// Returns the number of subscribers that received the event, or an error
    /// when nobody is listening.
    pub fn emit(&self, event: CoreEvent) -> Result<usize, SendError<CoreEvent>> {
        self.sender.send(event)
    }

    /// Creates a new subscriber. Past events are not replayed.
    pub fn subscribe(&self) -> Receiver<CoreEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER_SIZE)
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscribers", &self.sender.receiver_count())
            .finish()
    }
}

// ============================================================================
// Event Stream Wrapper
// ============================================================================

type EventFilter = Box<dyn Fn(&CoreEvent) -> bool + Send + Sync>;

/// A wrapper around `broadcast::Receiver` with filtering.
///
/// ```rust
/// use core_runtime::events::{CoreEvent, EventBus, EventStream};
///
/// let event_bus = EventBus::new(100);
/// let home_only = EventStream::new(event_bus.subscribe())
///     .filter(|event| event.source_id() == "jf-home");
/// ```
pub struct EventStream {
    receiver: Receiver<CoreEvent>,
    filter: Option<EventFilter>,
}

impl EventStream {
    pub fn new(receiver: Receiver<CoreEvent>) -> Self {
        Self {
            receiver,
            filter: None,
        }
    }

    /// Only events matching `predicate` are returned by `recv()`/`try_recv()`.
    pub fn filter<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&CoreEvent) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Box::new(predicate));
        self
    }

    fn accepts(&self, event: &CoreEvent) -> bool {
        self.filter.as_ref().map_or(true, |filter| filter(event))
    }

    /// Receives the next event that passes the filter.
    pub async fn recv(&mut self) -> Result<CoreEvent, RecvError> {
        loop {
            let event = self.receiver.recv().await?;
            if self.accepts(&event) {
                return Ok(event);
            }
        }
    }

    /// Attempts to receive an event without blocking.
    ///
    /// Returns `None` if no matching event is currently buffered.
    pub fn try_recv(&mut self) -> Option<Result<CoreEvent, RecvError>> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => {
                    if self.accepts(&event) {
                        return Some(Ok(event));
                    }
                }
                Err(broadcast::error::TryRecvError::Empty) => return None,
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    return Some(Err(RecvError::Lagged(n)))
                }
                Err(broadcast::error::TryRecvError::Closed) => return Some(Err(RecvError::Closed)),
            }
        }
    }
}

impl fmt::Debug for EventStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventStream")
            .field("has_filter", &self.filter.is_some())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
