use super::PlaylistService;
use crate::error::{ReorderError, Result};
use crate::models::{PlaylistPage, PlaylistSummary, TrackMove, TrackPage, TrackUri};
use async_trait::async_trait;
use log::{debug, warn};
use reqwest::header::{HeaderMap, AUTHORIZATION, CONTENT_TYPE, RETRY_AFTER};
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use serde_json::json;
use std::env;
use std::time::Duration;

/// Spotify Web API client. Holds no token: every call takes the bearer
/// token from its caller.
///
/// The base URL defaults to `SPOTIFY_API_BASE` (falling back to the public
/// endpoint) and can be pinned with [`SpotifyClient::with_base_url`] in tests.
pub struct SpotifyClient {
    client: Client,
    api_base: String,
}

#[derive(Debug, Deserialize)]
struct PlaylistsResponse {
    #[serde(default)]
    items: Vec<Option<PlaylistItem>>,
    next: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PlaylistItem {
    id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    snapshot_id: String,
    #[serde(default, alias = "items")]
    tracks: Option<TrackTotal>,
}

#[derive(Debug, Deserialize)]
struct TrackTotal {
    #[serde(default)]
    total: usize,
}

#[derive(Debug, Deserialize)]
struct TracksResponse {
    #[serde(default)]
    items: Vec<TrackItem>,
}

#[derive(Debug, Deserialize)]
struct TrackItem {
    track: Option<TrackObject>,
}

#[derive(Debug, Deserialize)]
struct TrackObject {
    uri: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CreatedPlaylist {
    id: String,
}

#[derive(Debug, Deserialize)]
struct SnapshotResponse {
    snapshot_id: Option<String>,
}

/// Web API errors are `{"error":{"status":..,"message":..}}`; the accounts
/// service uses `{"error":"..","error_description":".."}`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ErrorBody {
    Api { error: ApiErrorDetail },
    OAuth { error: String, error_description: Option<String> },
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: Option<String>,
}

/// Derive a human-readable message from an error body, falling back to the
/// status text.
pub(crate) fn error_message(status: StatusCode, body: &str) -> String {
    let reason = status.canonical_reason().unwrap_or("error").to_string();
    match serde_json::from_str::<ErrorBody>(body) {
        Ok(ErrorBody::Api { error }) => match error.message {
            Some(m) if !m.is_empty() => format!("{} {}", reason, m),
            _ => reason,
        },
        Ok(ErrorBody::OAuth { error, error_description }) => match error_description {
            Some(d) if !d.is_empty() => format!("{}: {}", error, d),
            _ => error,
        },
        Err(_) => reason,
    }
}

/// Translate a non-success response into the typed error taxonomy.
pub(crate) fn error_from_parts(status: StatusCode, headers: &HeaderMap, body: &str) -> ReorderError {
    match status {
        StatusCode::TOO_MANY_REQUESTS => {
            let retry_after = headers
                .get(RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.trim().parse::<u64>().ok());
            ReorderError::RateLimited { retry_after }
        }
        StatusCode::UNAUTHORIZED => ReorderError::Auth(error_message(status, body)),
        StatusCode::CONFLICT | StatusCode::PRECONDITION_FAILED => ReorderError::ConcurrencyConflict {
            message: error_message(status, body),
        },
        _ => ReorderError::RemoteApi {
            status: status.as_u16(),
            message: error_message(status, body),
        },
    }
}

impl SpotifyClient {
    pub fn new() -> Self {
        Self::with_base_url(Self::api_base())
    }

    pub fn with_base_url(base: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_base: base.into().trim_end_matches('/').to_string(),
        }
    }

    /// Client whose requests give up after `timeout`.
    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            api_base: Self::api_base().trim_end_matches('/').to_string(),
        })
    }

    fn api_base() -> String {
        // include v1 path by default
        env::var("SPOTIFY_API_BASE").unwrap_or_else(|_| "https://api.spotify.com/v1".into())
    }

    pub fn base_url(&self) -> &str {
        &self.api_base
    }

    /// 200 and 201 are the only success statuses.
    async fn check(resp: Response, what: &str) -> Result<Response> {
        let status = resp.status();
        if status == StatusCode::OK || status == StatusCode::CREATED {
            return Ok(resp);
        }
        let headers = resp.headers().clone();
        let body = resp.text().await.unwrap_or_default();
        let err = error_from_parts(status, &headers, &body);
        warn!("{} failed: {} => {}", what, status, err);
        Err(err)
    }
}

impl Default for SpotifyClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PlaylistService for SpotifyClient {
    fn name(&self) -> &str {
        "spotify"
    }

    async fn playlists_page(&self, token: &str, next: Option<&str>, limit: usize) -> Result<PlaylistPage> {
        let url = match next {
            Some(u) => u.to_string(),
            None => format!("{}/me/playlists?offset=0&limit={}", self.api_base, limit),
        };
        debug!("GET {}", url);
        let resp = self
            .client
            .get(&url)
            .bearer_auth(token)
            .send()
            .await?;
        let resp = Self::check(resp, "list playlists").await?;
        let body: PlaylistsResponse = resp.json().await?;
        let items = body
            .items
            .into_iter()
            .flatten()
            .map(|pl| PlaylistSummary {
                id: pl.id,
                name: pl.name,
                track_count: pl.tracks.map(|t| t.total).unwrap_or(0),
                snapshot_id: pl.snapshot_id,
            })
            .collect();
        Ok(PlaylistPage { items, next: body.next })
    }

    async fn tracks_page(&self, token: &str, playlist_id: &str, offset: usize, limit: usize) -> Result<TrackPage> {
        let url = format!(
            "{}/playlists/{}/tracks?limit={}&offset={}&fields=items.track.uri",
            self.api_base,
            urlencoding::encode(playlist_id),
            limit,
            offset
        );
        debug!("GET {}", url);
        let resp = self
            .client
            .get(&url)
            .bearer_auth(token)
            .send()
            .await?;
        let resp = Self::check(resp, "fetch playlist tracks").await?;
        let body: TracksResponse = resp.json().await?;
        let uris = body
            .items
            .into_iter()
            .filter_map(|it| it.track.and_then(|t| t.uri))
            .collect();
        Ok(TrackPage { uris })
    }

    async fn create_playlist(&self, token: &str, name: &str, description: &str) -> Result<String> {
        let url = format!("{}/me/playlists", self.api_base);
        let body = json!({
            "name": name,
            "description": description,
            "public": false,
            "collaborative": false
        });
        let resp = self
            .client
            .post(&url)
            .bearer_auth(token)
            .header(CONTENT_TYPE, "application/json")
            .json(&body)
            .send()
            .await?;
        let resp = Self::check(resp, "create playlist").await?;
        let created: CreatedPlaylist = resp.json().await?;
        debug!("Created playlist {} ({})", name, created.id);
        Ok(created.id)
    }

    async fn add_tracks(&self, token: &str, playlist_id: &str, uris: &[TrackUri]) -> Result<Option<String>> {
        let url = format!("{}/playlists/{}/tracks", self.api_base, urlencoding::encode(playlist_id));
        let body = json!({ "uris": uris });
        let resp = self
            .client
            .post(&url)
            .header(AUTHORIZATION, format!("Bearer {}", token))
            .json(&body)
            .send()
            .await?;
        let resp = Self::check(resp, "add tracks").await?;
        let snap: SnapshotResponse = resp.json().await.unwrap_or(SnapshotResponse { snapshot_id: None });
        Ok(snap.snapshot_id)
    }

    async fn move_tracks(
        &self,
        token: &str,
        playlist_id: &str,
        mv: TrackMove,
        snapshot_id: Option<&str>,
    ) -> Result<String> {
        let url = format!("{}/playlists/{}/tracks", self.api_base, urlencoding::encode(playlist_id));
        let mut body = json!({
            "range_start": mv.range_start,
            "insert_before": mv.insert_before,
            "range_length": mv.range_length,
        });
        if let Some(s) = snapshot_id.filter(|s| !s.is_empty()) {
            body["snapshot_id"] = json!(s);
        }
        let resp = self
            .client
            .put(&url)
            .header(AUTHORIZATION, format!("Bearer {}", token))
            .json(&body)
            .send()
            .await?;
        let resp = Self::check(resp, "move track").await?;
        let snap: SnapshotResponse = resp.json().await?;
        snap.snapshot_id
            .ok_or_else(|| ReorderError::Decode("move response without snapshot_id".into()))
    }
}
