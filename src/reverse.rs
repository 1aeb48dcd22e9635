use crate::api::PlaylistService;
use crate::error::Result;
use crate::models::{ReversalReport, TrackMove, TrackUri};
use crate::retry::RetryPolicy;
use tracing::{debug, info};

/// Moves that reverse a playlist of `len` tracks.
///
/// Move `i` takes the current head and inserts it before position
/// `len - i`, i.e. just above the tracks already placed at the bottom:
///
/// ```text
/// 1    2    3    4    5
/// 2    3    4    5    4
/// 3 -> 4 -> 5 -> 3 -> 3
/// 4    5    2    2    2
/// 5    1    1    1    1
/// ```
///
/// Positions are relative to the live order after the previous move, so
/// `len` moves suffice. The last move leaves the order unchanged.
pub fn plan_reversal(len: usize) -> Vec<TrackMove> {
    (0..len)
        .map(|i| TrackMove {
            range_start: 0,
            insert_before: len - i,
            range_length: 1,
        })
        .collect()
}

/// Reverse `tracks`, which must be the current contents of `playlist_id`, in place.
///
/// See [`reverse_slots`] for how moves are sent and retried.
pub async fn reverse_tracks(
    service: &dyn PlaylistService,
    token: &str,
    playlist_id: &str,
    tracks: &[TrackUri],
    initial_snapshot: Option<String>,
    retry: &RetryPolicy,
) -> Result<ReversalReport> {
    reverse_slots(service, token, playlist_id, tracks.len(), initial_snapshot, retry).await
}

/// Reverse the first `len` positions of `playlist_id` in place.
///
/// `len` counts every slot of the remote playlist, local files included:
/// moves address positions, and a local file still occupies one.
///
/// Moves are sent one at a time, each carrying the snapshot id returned by
/// the previous one (`initial_snapshot` for the first, omitted if `None`).
/// A failed move is resent unchanged under `retry`; when it runs out of
/// attempts, or fails in a way a resend cannot fix, the error carries the
/// index of the stalled move and the playlist keeps the moves applied so far.
pub async fn reverse_slots(
    service: &dyn PlaylistService,
    token: &str,
    playlist_id: &str,
    len: usize,
    initial_snapshot: Option<String>,
    retry: &RetryPolicy,
) -> Result<ReversalReport> {
    info!("Reversing {} tracks in {}", len, playlist_id);
    let mut snapshot_id = initial_snapshot;
    let plan = plan_reversal(len);
    for (i, mv) in plan.iter().enumerate() {
        debug!("Moving head of {} before {}", playlist_id, mv.insert_before);
        let snap = snapshot_id.as_deref();
        let next = retry
            .run("move track", i, || service.move_tracks(token, playlist_id, *mv, snap))
            .await?;
        snapshot_id = Some(next);
    }
    Ok(ReversalReport {
        moves: plan.len(),
        snapshot_id,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plan_has_one_move_per_track() {
        let plan = plan_reversal(5);
        assert_eq!(plan.len(), 5);
        let dests: Vec<usize> = plan.iter().map(|m| m.insert_before).collect();
        assert_eq!(dests, vec![5, 4, 3, 2, 1]);
        assert!(plan.iter().all(|m| m.range_start == 0 && m.range_length == 1));
        assert!(plan_reversal(0).is_empty());
    }
}
