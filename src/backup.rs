use crate::api::PlaylistService;
use crate::error::Result;
use crate::models::{AppendReport, TrackUri};
use crate::retry::RetryPolicy;
use chrono::Local;
use tracing::{debug, info};

/// Most URIs the remote API accepts in one append request.
pub const MAX_APPEND_BATCH: usize = 100;

pub const DEFAULT_BACKUP_SUFFIX: &str = "Reordered";

pub fn backup_playlist_name(name: &str, suffix: &str) -> String {
    format!("{}{}", name, suffix)
}

pub fn backup_description() -> String {
    format!(
        "A copy of the playlist which shows what it would be like after it was reordered. Created {}",
        Local::now().format("%a %b %d %Y %H:%M:%S %z")
    )
}

/// Create an empty private copy target named `<source_name><suffix>`.
pub async fn create_backup(
    service: &dyn PlaylistService,
    token: &str,
    source_name: &str,
    suffix: &str,
) -> Result<String> {
    let name = backup_playlist_name(source_name, suffix);
    let id = service
        .create_playlist(token, &name, &backup_description())
        .await?;
    info!("Successfully created backup playlist {} with ID {}", name, id);
    Ok(id)
}

/// Append `tracks` to `playlist_id` in order, `batch_size` (at most 100) per
/// request. Each batch is retried under `retry`; when a batch runs out of
/// attempts the error carries the index of its first track and later
/// batches are not sent.
pub async fn append_all(
    service: &dyn PlaylistService,
    token: &str,
    tracks: &[TrackUri],
    playlist_id: &str,
    batch_size: usize,
    retry: &RetryPolicy,
) -> Result<AppendReport> {
    let batch_size = batch_size.clamp(1, MAX_APPEND_BATCH);
    let mut snapshot_id = None;
    let mut batches = 0;
    for (n, chunk) in tracks.chunks(batch_size).enumerate() {
        let start = n * batch_size;
        let snap = retry
            .run("add tracks", start, || service.add_tracks(token, playlist_id, chunk))
            .await?;
        debug!("Added tracks {}..{} to {}", start, start + chunk.len(), playlist_id);
        if snap.is_some() {
            snapshot_id = snap;
        }
        batches += 1;
    }
    info!("Appended {} tracks to {} in {} batches", tracks.len(), playlist_id, batches);
    Ok(AppendReport { batches, snapshot_id })
}
