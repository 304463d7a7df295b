//! # Core Runtime Module
//!
//! Foundational runtime infrastructure for the library sync core:
//! - Logging and tracing infrastructure
//! - Configuration management
//! - Event bus system
//!
//! ## Overview
//!
//! Every other core crate depends on this one for its logging conventions,
//! `CoreConfig`, and the `EventBus` that carries sync and library events to
//! the host.

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use config::{CoreConfig, CoreConfigBuilder, SyncSettings};
pub use error::{Error, Result};
pub use events::{CoreEvent, EventBus, LibraryEvent, SyncEvent};
