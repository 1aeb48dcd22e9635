use crate::api::PlaylistService;
use crate::error::{ReorderError, Result};
use crate::models::{PlaylistSummary, TrackUri};
use futures::stream::{self, StreamExt, TryStreamExt};
use tracing::{debug, info};

/// Page size of both listings; the remote API caps playlist and track pages at 50.
pub const PAGE_SIZE: usize = 50;

/// Every playlist in the user's library, sorted by name ignoring case.
///
/// Pages are fetched one after another because each page's location comes
/// from the previous response. Any failed page fails the whole listing.
pub async fn list_all_playlists(service: &dyn PlaylistService, token: &str) -> Result<Vec<PlaylistSummary>> {
    let mut playlists = Vec::new();
    let mut next: Option<String> = None;
    loop {
        let page = service.playlists_page(token, next.as_deref(), PAGE_SIZE).await?;
        debug!("Fetched {} playlists", page.items.len());
        playlists.extend(page.items);
        match page.next {
            Some(n) => next = Some(n),
            None => break,
        }
    }
    playlists.sort_by(|a, b| {
        a.name
            .to_lowercase()
            .cmp(&b.name.to_lowercase())
            .then_with(|| a.name.cmp(&b.name))
    });
    info!("Listed {} playlists from {}", playlists.len(), service.name());
    Ok(playlists)
}

/// Look a playlist up by exact name.
pub fn find_playlist<'a>(playlists: &'a [PlaylistSummary], name: &str) -> Result<&'a PlaylistSummary> {
    playlists
        .iter()
        .find(|p| p.name == name)
        .ok_or_else(|| ReorderError::not_found(name))
}

/// List the playlists and pick the one called `name`.
pub async fn find_playlist_by_name(
    service: &dyn PlaylistService,
    token: &str,
    name: &str,
) -> Result<PlaylistSummary> {
    let playlists = list_all_playlists(service, token).await?;
    find_playlist(&playlists, name).cloned()
}

/// Split `raw` into writable catalog tracks, dropping local ones.
pub fn catalog_tracks<I, S>(raw: I) -> Vec<TrackUri>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    raw.into_iter()
        .filter_map(|uri| {
            let uri = uri.as_ref();
            let parsed = TrackUri::parse(uri);
            if parsed.is_none() {
                debug!("Not using track \"{}\"", uri);
            }
            parsed
        })
        .collect()
}

/// All catalog tracks of a playlist in playlist order.
///
/// Pages at offsets `0, 50, ..` below `total` are requested with up to
/// `concurrency` in flight; results are concatenated in offset order no
/// matter which page resolves first.
pub async fn list_all_tracks(
    service: &dyn PlaylistService,
    token: &str,
    playlist_id: &str,
    total: usize,
    concurrency: usize,
) -> Result<Vec<TrackUri>> {
    let offsets: Vec<usize> = (0..total).step_by(PAGE_SIZE).collect();
    let pages: Vec<Vec<String>> = stream::iter(offsets)
        .map(|offset| async move {
            service
                .tracks_page(token, playlist_id, offset, PAGE_SIZE)
                .await
                .map(|page| page.uris)
        })
        .buffered(concurrency.max(1))
        .try_collect()
        .await?;
    let fetched: usize = pages.iter().map(Vec::len).sum();
    let tracks = catalog_tracks(pages.into_iter().flatten());
    info!(
        "Fetched {} tracks from playlist {} ({} local tracks skipped)",
        tracks.len(),
        playlist_id,
        fetched - tracks.len()
    );
    Ok(tracks)
}
