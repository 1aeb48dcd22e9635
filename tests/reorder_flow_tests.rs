use reorderify::aggregate::find_playlist_by_name;
use reorderify::api::mock::{Call, MockService, Op};
use reorderify::reorder::{reorder_playlist, ReorderOptions};
use reorderify::retry::RetryPolicy;
use reorderify::ReorderError;

fn opts(dry_run: bool, limit: Option<usize>) -> ReorderOptions {
    ReorderOptions {
        dry_run,
        dry_run_track_limit: limit,
        retry: RetryPolicy::immediate(3),
        ..ReorderOptions::default()
    }
}

fn starred(svc: &MockService, n: usize, with_local: bool) -> Vec<String> {
    let mut raw: Vec<String> = (0..n).map(|i| format!("spotify:track:s{}", i)).collect();
    if with_local {
        raw.insert(1, "spotify:local:Artist:Album:Song:180".into());
    }
    let refs: Vec<&str> = raw.iter().map(String::as_str).collect();
    svc.add_playlist("Starred", &refs);
    raw
}

#[tokio::test]
async fn live_run_reverses_original_in_place() {
    let svc = MockService::new();
    let raw = starred(&svc, 60, false);
    let pl = find_playlist_by_name(&svc, "tok", "Starred").await.unwrap();

    let outcome = reorder_playlist(&svc, "tok", &pl, &opts(false, Some(10))).await.unwrap();

    assert!(!outcome.dry_run);
    assert_eq!(outcome.target_id, pl.id);
    assert_eq!(outcome.tracks_reversed, 60);
    assert_eq!(svc.count(Op::Create), 0);
    assert_eq!(svc.count(Op::Append), 0);
    assert_eq!(svc.count(Op::Move), 60);

    let expected: Vec<String> = raw.iter().rev().cloned().collect();
    assert_eq!(svc.tracks(&pl.id), expected);

    // the first move is made against the listed snapshot
    let first_move_snapshot = svc.calls().into_iter().find_map(|c| match c {
        Call::Move { snapshot_id, .. } => Some(snapshot_id),
        _ => None,
    });
    assert_eq!(first_move_snapshot, Some(Some(pl.snapshot_id.clone())));
    assert_eq!(outcome.to_string(), "All 60 tracks in Starred reversed");
}

#[tokio::test]
async fn dry_run_reverses_a_truncated_backup() {
    let svc = MockService::new();
    let raw = starred(&svc, 25, true);
    let pl = find_playlist_by_name(&svc, "tok", "Starred").await.unwrap();

    let outcome = reorder_playlist(&svc, "tok", &pl, &opts(true, Some(10))).await.unwrap();

    assert!(outcome.dry_run);
    assert_eq!(outcome.target_name, "StarredReordered");
    assert_eq!(outcome.tracks_reversed, 10);
    assert_eq!(svc.tracks(&pl.id), raw, "original must be untouched");

    let backup = svc.playlist_named("StarredReordered").unwrap();
    assert_eq!(backup.id, outcome.target_id);
    let expected: Vec<String> = (0..10).rev().map(|i| format!("spotify:track:s{}", i)).collect();
    assert_eq!(svc.tracks(&backup.id), expected);
    assert_eq!(outcome.to_string(), "All tracks in backup playlist StarredReordered reversed");
}

#[tokio::test]
async fn dry_run_without_limit_copies_everything() {
    let svc = MockService::new();
    starred(&svc, 130, true);
    let pl = find_playlist_by_name(&svc, "tok", "Starred").await.unwrap();

    let outcome = reorder_playlist(&svc, "tok", &pl, &opts(true, None)).await.unwrap();

    assert_eq!(outcome.tracks_reversed, 130);
    assert_eq!(svc.count(Op::Append), 2);
    let backup = svc.tracks(&outcome.target_id);
    assert_eq!(backup.first().map(String::as_str), Some("spotify:track:s129"));
    assert_eq!(backup.last().map(String::as_str), Some("spotify:track:s0"));
    assert!(backup.iter().all(|u| !u.starts_with("spotify:local:")));
}

#[tokio::test]
async fn failed_track_listing_stops_before_any_write() {
    let svc = MockService::new();
    starred(&svc, 80, false);
    let pl = find_playlist_by_name(&svc, "tok", "Starred").await.unwrap();
    svc.fail_next(Op::ListTracks, ReorderError::Transport("timed out".into()));

    let err = reorder_playlist(&svc, "tok", &pl, &opts(false, None)).await.unwrap_err();

    assert!(matches!(err, ReorderError::Transport(_)));
    assert_eq!(svc.count(Op::Move), 0);
}

#[tokio::test]
async fn stalled_reversal_is_reported_to_caller() {
    let svc = MockService::new();
    starred(&svc, 8, false);
    let pl = find_playlist_by_name(&svc, "tok", "Starred").await.unwrap();
    svc.pass_next(Op::Move, 5);
    svc.fail_times(Op::Move, 3);

    let err = reorder_playlist(&svc, "tok", &pl, &opts(false, None)).await.unwrap_err();
    assert_eq!(err.stalled_index(), Some(5));
}

#[tokio::test]
async fn live_run_reverses_local_tracks_with_the_rest() {
    let svc = MockService::new();
    let id = svc.add_playlist(
        "Starred",
        &[
            "spotify:track:a",
            "spotify:local:Artist:Album:Song:180",
            "spotify:track:b",
            "spotify:track:c",
            "spotify:track:d",
        ],
    );
    let pl = find_playlist_by_name(&svc, "tok", "Starred").await.unwrap();

    let outcome = reorder_playlist(&svc, "tok", &pl, &opts(false, None)).await.unwrap();

    assert_eq!(outcome.tracks_reversed, 5);
    assert_eq!(svc.count(Op::Move), 5);
    assert_eq!(
        svc.tracks(&id),
        vec![
            "spotify:track:d",
            "spotify:track:c",
            "spotify:track:b",
            "spotify:local:Artist:Album:Song:180",
            "spotify:track:a",
        ]
    );
}

#[tokio::test]
async fn expired_token_mid_reversal_reports_the_move_index() {
    let svc = MockService::new();
    starred(&svc, 6, false);
    let pl = find_playlist_by_name(&svc, "tok", "Starred").await.unwrap();
    svc.pass_next(Op::Move, 2);
    svc.fail_next(Op::Move, ReorderError::Auth("The access token expired".into()));

    let err = reorder_playlist(&svc, "tok", &pl, &opts(false, None)).await.unwrap_err();

    assert_eq!(err.stalled_index(), Some(2));
    assert!(matches!(err.cause(), ReorderError::Auth(_)));
    // not retried
    assert_eq!(svc.count(Op::Move), 3);
}
