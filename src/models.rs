use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

static CATALOG_TRACK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^spotify:track:[0-9A-Za-z]+$").expect("valid track uri regex"));

/// A playlist as seen in the user's library, including the snapshot id
/// needed for the next write against it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaylistSummary {
    pub id: String,
    pub name: String,
    pub track_count: usize,
    pub snapshot_id: String,
}

/// A catalog track URI (`spotify:track:<id>`).
///
/// Local files (`spotify:local:...`) and episodes cannot be written back
/// through the API, so they never parse.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct TrackUri(String);

impl TrackUri {
    pub fn parse(raw: &str) -> Option<Self> {
        if CATALOG_TRACK.is_match(raw) {
            Some(Self(raw.to_string()))
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TrackUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One page of the playlist listing. `next` is the opaque location of the
/// following page, `None` on the last one.
#[derive(Debug, Clone, Default)]
pub struct PlaylistPage {
    pub items: Vec<PlaylistSummary>,
    pub next: Option<String>,
}

/// Raw track URIs of one page, unfiltered.
#[derive(Debug, Clone, Default)]
pub struct TrackPage {
    pub uris: Vec<String>,
}

/// Single-range move, in the remote API's `insert_before` terms: positions
/// refer to the order *before* the range is taken out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TrackMove {
    pub range_start: usize,
    pub insert_before: usize,
    pub range_length: usize,
}

/// Outcome of one move: the new snapshot id on success.
pub type MoveResult = crate::error::Result<String>;

/// Everything one reorder operation knows about its target. Built per
/// request and dropped when the request resolves.
#[derive(Debug, Clone, Default)]
pub struct PlaylistWorkingSet {
    pub original_id: String,
    pub backup_id: Option<String>,
    pub track_count: usize,
    pub snapshot_id: Option<String>,
    pub tracks: Vec<TrackUri>,
}

impl PlaylistWorkingSet {
    pub fn from_summary(summary: &PlaylistSummary) -> Self {
        Self {
            original_id: summary.id.clone(),
            backup_id: None,
            track_count: summary.track_count,
            snapshot_id: Some(summary.snapshot_id.clone()).filter(|s| !s.is_empty()),
            tracks: Vec::new(),
        }
    }

    /// Playlist the reversal writes to: the backup when one exists.
    pub fn target_id(&self) -> &str {
        self.backup_id.as_deref().unwrap_or(&self.original_id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReversalReport {
    pub moves: usize,
    pub snapshot_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppendReport {
    pub batches: usize,
    pub snapshot_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReorderOutcome {
    pub target_id: String,
    pub target_name: String,
    pub tracks_reversed: usize,
    pub dry_run: bool,
}

impl fmt::Display for ReorderOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.dry_run {
            write!(f, "All tracks in backup playlist {} reversed", self.target_name)
        } else {
            write!(f, "All {} tracks in {} reversed", self.tracks_reversed, self.target_name)
        }
    }
}
