//! Core library for reorderify: reverse the track order of a Spotify
//! playlist in place or into a backup copy.
pub mod aggregate;
pub mod api;
pub mod backup;
pub mod config;
pub mod error;
pub mod models;
pub mod reorder;
pub mod retry;
pub mod reverse;

pub use error::{ReorderError, Result};
