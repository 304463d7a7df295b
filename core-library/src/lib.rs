//! # Library Cache Module
//!
//! Owns the local SQLite cache that mirrors a media server's catalog.
//!
//! ## Overview
//!
//! This module manages:
//! - SQLite schema and migrations, partitioned by [`Source`]
//! - Domain models for artists, albums, genres, tracks and playlists
//! - Read repositories with pagination for the UI
//! - [`LibraryTransaction`], the unit of work every sync run writes through
//! - The [`genre`] classifier that normalizes genre strings into umbrella categories

pub mod db;
pub mod error;
pub mod genre;
pub mod models;
pub mod repositories;
pub mod unit_of_work;

pub use error::{LibraryError, Result};
pub use genre::{classify_genres, GenreClassification};
pub use models::{Album, Artist, Genre, Playlist, Source, Track};
pub use unit_of_work::LibraryTransaction;
