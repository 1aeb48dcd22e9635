use crate::aggregate::list_all_tracks;
use crate::api::PlaylistService;
use crate::backup::{append_all, backup_playlist_name, create_backup, DEFAULT_BACKUP_SUFFIX, MAX_APPEND_BATCH};
use crate::config::Config;
use crate::error::Result;
use crate::models::{PlaylistSummary, PlaylistWorkingSet, ReorderOutcome};
use crate::retry::RetryPolicy;
use crate::reverse::reverse_slots;
use tracing::info;

/// Knobs of one reorder run.
#[derive(Debug, Clone)]
pub struct ReorderOptions {
    /// Reverse a backup copy instead of the original.
    pub dry_run: bool,
    /// On a dry run, copy only the first n tracks into the backup.
    pub dry_run_track_limit: Option<usize>,
    pub backup_suffix: String,
    pub batch_size: usize,
    pub page_concurrency: usize,
    pub retry: RetryPolicy,
}

impl Default for ReorderOptions {
    fn default() -> Self {
        Self {
            dry_run: false,
            dry_run_track_limit: Some(10),
            backup_suffix: DEFAULT_BACKUP_SUFFIX.to_string(),
            batch_size: MAX_APPEND_BATCH,
            page_concurrency: 4,
            retry: RetryPolicy::default(),
        }
    }
}

impl ReorderOptions {
    pub fn from_config(cfg: &Config, dry_run: bool) -> Self {
        Self {
            dry_run,
            dry_run_track_limit: cfg.dry_run_limit(),
            backup_suffix: cfg.backup_suffix.clone(),
            batch_size: cfg.max_batch_size,
            page_concurrency: cfg.page_concurrency,
            retry: cfg.retry_policy(),
        }
    }
}

/// Reverse the track order of `playlist`.
///
/// Live run: fetch every track and reverse all `track_count` positions of the
/// original in place, local files included, starting from the snapshot id
/// the listing reported.
///
/// Dry run: create `<name><suffix>`, copy the (optionally truncated) track
/// list into it and reverse the copy, starting from the snapshot id of the
/// last append. The original is only read.
pub async fn reorder_playlist(
    service: &dyn PlaylistService,
    token: &str,
    playlist: &PlaylistSummary,
    opts: &ReorderOptions,
) -> Result<ReorderOutcome> {
    let mut ws = PlaylistWorkingSet::from_summary(playlist);

    let target_name = if opts.dry_run {
        let backup_id = create_backup(service, token, &playlist.name, &opts.backup_suffix).await?;
        ws.backup_id = Some(backup_id);
        backup_playlist_name(&playlist.name, &opts.backup_suffix)
    } else {
        playlist.name.clone()
    };

    ws.tracks = list_all_tracks(
        service,
        token,
        &ws.original_id,
        ws.track_count,
        opts.page_concurrency,
    )
    .await?;

    // The backup holds catalog tracks only; the original also keeps its
    // local files, which occupy positions the moves must cover.
    let slots = if let Some(backup_id) = ws.backup_id.clone() {
        if let Some(limit) = opts.dry_run_track_limit {
            ws.tracks.truncate(limit);
        }
        let appended = append_all(service, token, &ws.tracks, &backup_id, opts.batch_size, &opts.retry).await?;
        ws.snapshot_id = appended.snapshot_id;
        ws.tracks.len()
    } else {
        ws.track_count
    };

    let report = reverse_slots(
        service,
        token,
        ws.target_id(),
        slots,
        ws.snapshot_id.clone(),
        &opts.retry,
    )
    .await?;

    let outcome = ReorderOutcome {
        target_id: ws.target_id().to_string(),
        target_name,
        tracks_reversed: report.moves,
        dry_run: opts.dry_run,
    };
    info!("{}", outcome);
    Ok(outcome)
}
