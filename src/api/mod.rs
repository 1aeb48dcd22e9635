pub mod mock;
pub mod spotify;
pub mod spotify_auth;

use crate::error::Result;
use crate::models::{MoveResult, PlaylistPage, TrackMove, TrackPage, TrackUri};

/// The remote playlist operations the aggregator, backup and reversal need.
/// Implementations: spotify::SpotifyClient and mock::MockService.
///
/// The access token is passed on every call; implementations hold no
/// per-user state.
#[async_trait::async_trait]
pub trait PlaylistService: Send + Sync {
    /// Fetch one page of the current user's playlists. `next` is `None` for
    /// the first page, otherwise the value returned by the previous page.
    async fn playlists_page(&self, token: &str, next: Option<&str>, limit: usize) -> Result<PlaylistPage>;

    /// Fetch `limit` raw track URIs of a playlist starting at `offset`.
    async fn tracks_page(&self, token: &str, playlist_id: &str, offset: usize, limit: usize) -> Result<TrackPage>;

    /// Create a private, non-collaborative playlist and return its id.
    async fn create_playlist(&self, token: &str, name: &str, description: &str) -> Result<String>;

    /// Append tracks (batching done by caller). Returns the new snapshot id
    /// when the service reports one.
    async fn add_tracks(&self, token: &str, playlist_id: &str, uris: &[TrackUri]) -> Result<Option<String>>;

    /// Apply a single-range move. `snapshot_id` is omitted when unknown.
    async fn move_tracks(
        &self,
        token: &str,
        playlist_id: &str,
        mv: TrackMove,
        snapshot_id: Option<&str>,
    ) -> MoveResult;

    /// Return the service name (for logging)
    fn name(&self) -> &str;
}
